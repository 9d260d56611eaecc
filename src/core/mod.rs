pub mod analyzer;
pub mod engine;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod parser;

pub use crate::domain::ports::{ConfigProvider, Storage};
pub use crate::utils::error::Result;
pub use engine::{check_source, lex_source, parse_source, run_source, Engine, Session};
