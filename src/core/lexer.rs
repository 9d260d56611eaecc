//! Turns source text into tokens.
//!
//! [`Lexer::lex`] skips whitespace and comments and calls `lex_token` for
//! everything else, which dispatches on the first character. [`CharStream`]
//! tracks the start of the token being built so `emit` can slice it out.

use crate::domain::model::{Token, TokenKind};
use crate::utils::error::LexError;

/// Keywords after which a `+`/`-` still starts a signed number.
const SIGN_PREFIX_KEYWORDS: &[&str] = &["RETURN", "IF", "IN", "DO", "ELSE", "AND", "OR"];

pub struct Lexer {
    chars: CharStream,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: CharStream::new(input),
        }
    }

    pub fn lex(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens: Vec<Token> = Vec::new();
        while self.chars.has(0) {
            if self.chars.accept(&[Class::Whitespace]) {
                while self.chars.accept(&[Class::Whitespace]) {}
                self.chars.skip();
            } else if self.chars.peek(&[Class::Char('/'), Class::Char('/')]) {
                self.lex_comment();
            } else {
                let token = self.lex_token(tokens.last())?;
                tokens.push(token);
            }
        }
        tracing::trace!(tokens = tokens.len(), "lexed source");
        Ok(tokens)
    }

    fn lex_comment(&mut self) {
        while self.chars.has(0) && !self.chars.peek(&[Class::LineBreak]) {
            self.chars.advance();
        }
        self.chars.skip();
    }

    fn lex_token(&mut self, previous: Option<&Token>) -> Result<Token, LexError> {
        if self.chars.peek(&[Class::IdentifierStart]) {
            Ok(self.lex_identifier())
        } else if self.chars.peek(&[Class::Digit])
            || (self.chars.peek(&[Class::Sign, Class::Digit]) && sign_allowed(previous))
        {
            Ok(self.lex_number())
        } else if self.chars.peek(&[Class::Char('\'')]) {
            self.lex_character()
        } else if self.chars.peek(&[Class::Char('"')]) {
            self.lex_string()
        } else {
            Ok(self.lex_operator())
        }
    }

    fn lex_identifier(&mut self) -> Token {
        self.chars.accept(&[Class::IdentifierStart]);
        while self.chars.accept(&[Class::IdentifierPart]) {}
        Token::new(TokenKind::Identifier, self.chars.emit())
    }

    fn lex_number(&mut self) -> Token {
        self.chars.accept(&[Class::Sign]);
        while self.chars.accept(&[Class::Digit]) {}

        let mut kind = TokenKind::Integer;
        if self.chars.peek(&[Class::Char('.'), Class::Digit]) {
            self.chars.advance();
            while self.chars.accept(&[Class::Digit]) {}
            kind = TokenKind::Decimal;
        }

        if self.chars.peek(&[Class::Char('e'), Class::Digit])
            || self.chars.peek(&[Class::Char('e'), Class::Sign, Class::Digit])
        {
            self.chars.advance();
            self.chars.accept(&[Class::Sign]);
            while self.chars.accept(&[Class::Digit]) {}
        }

        Token::new(kind, self.chars.emit())
    }

    fn lex_character(&mut self) -> Result<Token, LexError> {
        let start = self.chars.index;
        self.chars.advance();

        if self.chars.peek(&[Class::Char('\'')]) {
            return Err(LexError::new("Empty character literal.", start));
        } else if self.chars.peek(&[Class::Char('\\'), Class::Char('\'')])
            && !self.chars.peek(&[Class::Char('\\'), Class::Char('\''), Class::Char('\'')])
        {
            // `'\'` is a lone backslash, `'\''` an escaped quote.
            self.chars.advance();
        } else if self.chars.peek(&[Class::Char('\\')]) {
            self.lex_escape()?;
        } else if self.chars.has(0) && !self.chars.peek(&[Class::LineBreak]) {
            self.chars.advance();
        } else {
            return Err(LexError::new("Unterminated character literal.", start));
        }

        if !self.chars.accept(&[Class::Char('\'')]) {
            let message = if self.chars.has(0) && !self.chars.peek(&[Class::LineBreak]) {
                "Character literal contains more than one character."
            } else {
                "Unterminated character literal."
            };
            return Err(LexError::new(message, start));
        }
        Ok(Token::new(TokenKind::Character, self.chars.emit()))
    }

    fn lex_string(&mut self) -> Result<Token, LexError> {
        let start = self.chars.index;
        self.chars.advance();

        loop {
            if self.chars.accept(&[Class::Char('"')]) {
                break;
            }
            if !self.chars.has(0) || self.chars.peek(&[Class::LineBreak]) {
                return Err(LexError::new("Unterminated string literal.", start));
            }
            if self.chars.peek(&[Class::Char('\\')]) {
                self.lex_escape()?;
            } else {
                self.chars.advance();
            }
        }
        Ok(Token::new(TokenKind::String, self.chars.emit()))
    }

    fn lex_escape(&mut self) -> Result<(), LexError> {
        let start = self.chars.index;
        self.chars.advance();
        if !self.chars.accept(&[Class::Escapable]) {
            return Err(LexError::new("Invalid escape sequence.", start));
        }
        Ok(())
    }

    fn lex_operator(&mut self) -> Token {
        if self.chars.accept(&[Class::Comparator]) {
            self.chars.accept(&[Class::Char('=')]);
        } else {
            self.chars.advance();
        }
        Token::new(TokenKind::Operator, self.chars.emit())
    }
}

/// A sign belongs to a number only where an operand is expected.
fn sign_allowed(previous: Option<&Token>) -> bool {
    match previous {
        None => true,
        Some(token) => match token.kind {
            TokenKind::Operator => token.literal != ")",
            TokenKind::Identifier => SIGN_PREFIX_KEYWORDS.contains(&token.literal.as_str()),
            _ => false,
        },
    }
}

#[derive(Debug, Clone, Copy)]
enum Class {
    Char(char),
    Digit,
    Sign,
    IdentifierStart,
    IdentifierPart,
    Whitespace,
    LineBreak,
    Escapable,
    Comparator,
}

impl Class {
    fn matches(self, c: char) -> bool {
        match self {
            Class::Char(expected) => c == expected,
            Class::Digit => c.is_ascii_digit(),
            Class::Sign => c == '+' || c == '-',
            Class::IdentifierStart => c.is_ascii_alphabetic() || c == '_',
            Class::IdentifierPart => c.is_ascii_alphanumeric() || c == '_' || c == '-',
            Class::Whitespace => matches!(c, ' ' | '\u{8}' | '\n' | '\r' | '\t'),
            Class::LineBreak => c == '\n' || c == '\r',
            Class::Escapable => matches!(c, 'b' | 'n' | 'r' | 't' | '\'' | '"' | '\\'),
            Class::Comparator => matches!(c, '<' | '>' | '!' | '='),
        }
    }
}

/// Character state of the lexer plus the length of the token being built.
struct CharStream {
    input: Vec<char>,
    index: usize,
    length: usize,
}

impl CharStream {
    fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            index: 0,
            length: 0,
        }
    }

    fn has(&self, offset: usize) -> bool {
        self.index + offset < self.input.len()
    }

    /// True if the next characters match the classes one for one.
    fn peek(&self, classes: &[Class]) -> bool {
        classes.iter().enumerate().all(|(offset, class)| {
            self.input
                .get(self.index + offset)
                .is_some_and(|&c| class.matches(c))
        })
    }

    /// Like `peek`, but also consumes the matched characters.
    fn accept(&mut self, classes: &[Class]) -> bool {
        let matched = self.peek(classes);
        if matched {
            self.index += classes.len();
            self.length += classes.len();
        }
        matched
    }

    fn advance(&mut self) {
        self.index += 1;
        self.length += 1;
    }

    /// Returns the characters consumed since the last emit or skip.
    fn emit(&mut self) -> String {
        let literal = self.input[self.index - self.length..self.index].iter().collect();
        self.length = 0;
        literal
    }

    fn skip(&mut self) {
        self.length = 0;
    }
}
