use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at character {index})")]
pub struct LexError {
    pub message: String,
    pub index: usize,
}

impl LexError {
    pub fn new(message: impl Into<String>, index: usize) -> Self {
        Self {
            message: message.into(),
            index,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at token {index})")]
pub struct ParseError {
    pub message: String,
    pub index: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, index: usize) -> Self {
        Self {
            message: message.into(),
            index,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AnalyzeError {
    pub message: String,
}

impl AnalyzeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EvaluateError {
    pub message: String,
}

impl EvaluateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PlcError {
    #[error("Lex error: {0}")]
    LexError(#[from] LexError),

    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error("Analysis error: {0}")]
    AnalyzeError(#[from] AnalyzeError),

    #[error("Runtime error: {0}")]
    EvaluateError(#[from] EvaluateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Syntax,
    Semantic,
    Runtime,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PlcError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PlcError::LexError(_) | PlcError::ParseError(_) => ErrorCategory::Syntax,
            PlcError::AnalyzeError(_) => ErrorCategory::Semantic,
            PlcError::EvaluateError(_) => ErrorCategory::Runtime,
            PlcError::ConfigError { .. }
            | PlcError::MissingConfigError { .. }
            | PlcError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            PlcError::IoError(_) | PlcError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Syntax | ErrorCategory::Semantic => ErrorSeverity::Medium,
            ErrorCategory::Runtime | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PlcError::LexError(_) => {
                "Check string and character literals for missing quotes or invalid escapes"
            }
            PlcError::ParseError(_) => {
                "Check for a missing ';', 'DO' or 'END' near the reported token"
            }
            PlcError::AnalyzeError(_) => {
                "Check variable declarations and that operand types match"
            }
            PlcError::EvaluateError(_) => "Check the values flowing into the failing expression",
            PlcError::IoError(_) => "Make sure the file exists and is readable",
            PlcError::SerializationError(_) => "Report this as a bug",
            PlcError::ConfigError { .. }
            | PlcError::MissingConfigError { .. }
            | PlcError::InvalidConfigValueError { .. } => {
                "Fix plc.toml or pass a different file with --config"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PlcError::LexError(e) => format!("Could not read the program text: {}", e),
            PlcError::ParseError(e) => format!("The program is not well formed: {}", e),
            PlcError::AnalyzeError(e) => format!("The program does not type check: {}", e),
            PlcError::EvaluateError(e) => format!("The program failed while running: {}", e),
            other => other.to_string(),
        }
    }

    /// Process exit code for the binary.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_errors_convert_into_plc_error() {
        let error: PlcError = ParseError::new("Expected ';'.", 3).into();
        assert_eq!(error.category(), ErrorCategory::Syntax);
        assert_eq!(error.exit_code(), 2);
        assert!(error.to_string().contains("at token 3"));
    }

    #[test]
    fn test_severity_by_category() {
        let runtime: PlcError = EvaluateError::new("Division by zero.").into();
        assert_eq!(runtime.severity(), ErrorSeverity::High);

        let io: PlcError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(io.severity(), ErrorSeverity::Critical);
        assert_eq!(io.exit_code(), 3);
    }
}
