use crate::core::analyzer::Analyzer;
use crate::core::environment;
use crate::core::evaluator::Evaluator;
use crate::core::lexer::Lexer;
use crate::core::parser::Parser;
use crate::domain::model::Token;
use crate::domain::ports::{ConfigProvider, Storage};
use crate::domain::scope::Scope;
use crate::domain::types::Type;
use crate::domain::value::RuntimeValue;
use crate::domain::{ast, ir};
use crate::utils::error::Result;
use std::io::Write;

/// Loads programs through a [`Storage`] and runs the phases up to the one asked for.
pub struct Engine<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> Engine<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    pub fn lex(&self, path: &str) -> Result<Vec<Token>> {
        let input = self.load(path)?;
        lex_source(&input)
    }

    pub fn parse(&self, path: &str) -> Result<ast::Source> {
        let input = self.load(path)?;
        parse_source(&input)
    }

    pub fn check(&self, path: &str) -> Result<ir::Source> {
        let input = self.load(path)?;
        check_source(&input)
    }

    /// Evaluates the program, writing its output to `out`. Type checks first
    /// unless analysis is turned off in the configuration.
    pub fn run<W: Write>(&self, path: &str, out: W) -> Result<RuntimeValue> {
        let input = self.load(path)?;
        let mut session = Session::new(self.config.analyze(), out);
        let value = session.run(&input)?;
        tracing::info!(path, "program finished");
        Ok(value)
    }

    fn load(&self, path: &str) -> Result<String> {
        tracing::debug!(path, source_level = self.config.source_level(), "loading program");
        self.storage.read_source(path)
    }
}

pub fn lex_source(input: &str) -> Result<Vec<Token>> {
    Ok(Lexer::new(input).lex()?)
}

pub fn parse_source(input: &str) -> Result<ast::Source> {
    let tokens = lex_source(input)?;
    tracing::debug!(tokens = tokens.len(), "parsing");
    Ok(Parser::new(tokens).parse_source()?)
}

pub fn check_source(input: &str) -> Result<ir::Source> {
    let ast = parse_source(input)?;
    Ok(Analyzer::new(environment::type_scope()).analyze_source(&ast)?)
}

/// Analyzes and evaluates `input` against fresh builtin scopes.
pub fn run_source<W: Write>(input: &str, out: W) -> Result<RuntimeValue> {
    Session::new(true, out).run(input)
}

/// Analyzer and evaluator state that survives between inputs, so a later
/// input can use what an earlier one defined.
///
/// An input that fails in any phase has its new top-level bindings dropped
/// from both scopes, so the two stay in step.
pub struct Session<W: Write> {
    types: Option<Scope<Type>>,
    values: Scope<RuntimeValue>,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(analyze: bool, out: W) -> Self {
        Self {
            types: analyze.then(environment::type_scope),
            values: environment::runtime_scope(),
            out,
        }
    }

    pub fn check(&mut self, input: &str) -> Result<ir::Source> {
        let ast = parse_source(input)?;
        let types = self.types.get_or_insert_with(environment::type_scope);
        let mark = types.local_count();
        let result = Analyzer::new(types.clone()).analyze_source(&ast);
        if result.is_err() {
            types.truncate(mark);
        }
        Ok(result?)
    }

    pub fn run(&mut self, input: &str) -> Result<RuntimeValue> {
        let ast = parse_source(input)?;
        let type_mark = self.types.as_ref().map(Scope::local_count);
        let value_mark = self.values.local_count();

        let result = self.analyze_and_evaluate(&ast);
        if result.is_err() {
            if let (Some(types), Some(mark)) = (&self.types, type_mark) {
                types.truncate(mark);
            }
            self.values.truncate(value_mark);
        }
        result
    }

    fn analyze_and_evaluate(&mut self, ast: &ast::Source) -> Result<RuntimeValue> {
        if let Some(types) = &self.types {
            Analyzer::new(types.clone()).analyze_source(ast)?;
        }
        Ok(Evaluator::new(self.values.clone(), &mut self.out).evaluate_source(ast)?)
    }

    pub fn into_output(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::PlcError;
    use std::collections::HashMap;

    struct MemoryStorage {
        files: HashMap<String, String>,
    }

    impl Storage for MemoryStorage {
        fn read_source(&self, path: &str) -> Result<String> {
            self.files.get(path).cloned().ok_or_else(|| {
                PlcError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }
    }

    struct StaticConfig {
        analyze: bool,
    }

    impl ConfigProvider for StaticConfig {
        fn analyze(&self) -> bool {
            self.analyze
        }

        fn source_level(&self) -> u32 {
            23
        }
    }

    fn engine(source: &str, analyze: bool) -> Engine<MemoryStorage, StaticConfig> {
        let mut files = HashMap::new();
        files.insert("main.plc".to_string(), source.to_string());
        Engine::new(MemoryStorage { files }, StaticConfig { analyze })
    }

    #[test]
    fn test_run_writes_program_output() {
        let mut out = Vec::new();
        engine("print(1 + 2);", true).run("main.plc", &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "3\n");
    }

    #[test]
    fn test_run_reports_missing_file() {
        let result = engine("", true).run("missing.plc", Vec::new());
        assert!(matches!(result, Err(PlcError::IoError(_))));
    }

    #[test]
    fn test_analysis_can_be_disabled() {
        let source = "LET x: String = 1;";
        assert!(matches!(
            engine(source, true).run("main.plc", Vec::new()),
            Err(PlcError::AnalyzeError(_))
        ));
        assert!(engine(source, false).run("main.plc", Vec::new()).is_ok());
    }

    #[test]
    fn test_rejected_input_leaves_no_bindings() {
        let mut session = Session::new(true, Vec::new());
        assert!(session.run("LET y = 1; LET z: String = 2;").is_err());
        assert!(session.run("LET y = 5;").is_ok());

        assert!(session.run("LET a = 1; LET b = 1 / 0;").is_err());
        assert!(session.run("LET a = 2; print(a);").is_ok());
        assert_eq!(String::from_utf8(session.into_output()).unwrap(), "2\n");
    }

    #[test]
    fn test_session_keeps_definitions() {
        let mut session = Session::new(true, Vec::new());
        session.run("LET x = 40;").unwrap();
        let value = session.run("print(x); x + 2;").unwrap();
        assert_eq!(value, RuntimeValue::from(42));
        assert_eq!(String::from_utf8(session.into_output()).unwrap(), "40\n");
    }
}
