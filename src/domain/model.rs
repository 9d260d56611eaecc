use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    Identifier,
    Integer,
    Decimal,
    Character,
    String,
    Operator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source text, including quotes for character and string tokens.
    pub literal: String,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>) -> Self {
        Self {
            kind,
            literal: literal.into(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.literal)
    }
}

pub const KEYWORDS: &[&str] = &[
    "LET", "DEF", "IF", "DO", "ELSE", "END", "FOR", "IN", "RETURN", "AND", "OR", "OBJECT", "NIL",
    "TRUE", "FALSE",
];

pub fn is_keyword(literal: &str) -> bool {
    KEYWORDS.contains(&literal)
}
