pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, toml_config::ProjectConfig};

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command, Stage};

pub use core::{check_source, lex_source, parse_source, run_source, Engine, Session};
pub use domain::value::RuntimeValue;
pub use utils::error::{PlcError, Result};
