pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use self::command::{CliConfig, Command, Stage};

#[cfg(feature = "cli")]
mod command {
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate};
    use clap::{Parser, Subcommand, ValueEnum};
    use std::path::PathBuf;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "plc")]
    #[command(about = "Lexer, parser, analyzer and interpreter for the PLC language")]
    #[command(version)]
    pub struct CliConfig {
        /// Project manifest; missing file means built-in defaults.
        #[arg(long, global = true, default_value = "plc.toml")]
        pub config: PathBuf,

        #[arg(short, long, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        /// Overrides `[logging].format` from the manifest.
        #[arg(long, global = true)]
        pub log_format: Option<String>,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Print the tokens of a program
        Lex {
            file: String,
            #[arg(long)]
            json: bool,
        },
        /// Print the syntax tree of a program
        Parse { file: String },
        /// Type check a program and print the typed tree
        Check { file: String },
        /// Evaluate a program (defaults to `[run].entry`)
        Run { file: Option<String> },
        /// Read blocks from stdin, each ended by an empty line
        Repl {
            #[arg(long, value_enum, default_value_t = Stage::Run)]
            stage: Stage,
        },
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
    pub enum Stage {
        Lex,
        Parse,
        Check,
        Run,
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            if let Some(format) = &self.log_format {
                validation::validate_one_of("--log-format", format, &["compact", "json"])?;
            }
            match &self.command {
                Command::Lex { file, .. } | Command::Parse { file } | Command::Check { file } => {
                    validation::validate_path("FILE", file)
                }
                Command::Run { file: Some(file) } => validation::validate_path("FILE", file),
                Command::Run { file: None } | Command::Repl { .. } => Ok(()),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_run_with_globals() {
            let config = CliConfig::try_parse_from(["plc", "run", "main.plc", "-v", "--log-format", "json"]).unwrap();
            assert!(config.verbose);
            assert_eq!(config.log_format.as_deref(), Some("json"));
            assert!(matches!(config.command, Command::Run { file: Some(ref f) } if f == "main.plc"));
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_repl_stage_defaults_to_run() {
            let config = CliConfig::try_parse_from(["plc", "repl"]).unwrap();
            assert!(matches!(config.command, Command::Repl { stage: Stage::Run }));

            let config = CliConfig::try_parse_from(["plc", "repl", "--stage", "lex"]).unwrap();
            assert!(matches!(config.command, Command::Repl { stage: Stage::Lex }));
        }

        #[test]
        fn test_rejects_unknown_log_format() {
            let config = CliConfig::try_parse_from(["plc", "--log-format", "xml", "lex", "a.plc"]).unwrap();
            assert!(config.validate().is_err());
        }
    }
}
