use anyhow::Context;
use clap::Parser;
use plc_project::core::ConfigProvider;
use plc_project::utils::error::PlcError;
use plc_project::utils::logger::{self, LogFormat};
use plc_project::utils::validation::Validate;
use plc_project::{CliConfig, Command, Engine, LocalStorage, ProjectConfig, Session, Stage};
use std::io::{self, BufRead, Write};

fn main() {
    let cli = CliConfig::parse();

    let project = match ProjectConfig::load_or_default(&cli.config) {
        Ok(project) => project,
        Err(e) => fail(&e),
    };

    let format = cli
        .log_format
        .as_deref()
        .or(project.log_format())
        .and_then(LogFormat::parse)
        .unwrap_or_default();
    logger::init_cli_logger(cli.verbose, project.log_level(), format);
    tracing::debug!(config = %cli.config.display(), "starting plc");

    if let Err(e) = cli.validate() {
        fail(&e);
    }

    if let Err(err) = execute(cli.command, project) {
        match err.downcast_ref::<PlcError>() {
            Some(e) => fail(e),
            None => {
                tracing::error!("{:#}", err);
                eprintln!("{:#}", err);
                std::process::exit(1);
            }
        }
    }
}

fn fail(e: &PlcError) -> ! {
    tracing::error!(
        category = ?e.category(),
        severity = ?e.severity(),
        "{}",
        e
    );
    eprintln!("{}", e.user_friendly_message());
    eprintln!("Suggestion: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code())
}

fn execute(command: Command, project: ProjectConfig) -> anyhow::Result<()> {
    let analyze = project.analyze();
    let entry = project.entry().map(str::to_string);
    let engine = Engine::new(LocalStorage::new("."), project);
    let stdout = io::stdout();

    match command {
        Command::Lex { file, json } => {
            let tokens = engine.lex(&file)?;
            if json {
                let rendered = serde_json::to_string_pretty(&tokens).map_err(PlcError::from)?;
                println!("{}", rendered);
            } else {
                for token in tokens {
                    println!("{}", token);
                }
            }
        }
        Command::Parse { file } => println!("{:#?}", engine.parse(&file)?),
        Command::Check { file } => println!("{:#?}", engine.check(&file)?),
        Command::Run { file } => {
            let file = file
                .or(entry)
                .ok_or_else(|| PlcError::MissingConfigError {
                    field: "run.entry".to_string(),
                })?;
            engine.run(&file, stdout.lock())?;
        }
        Command::Repl { stage } => repl(stage, analyze)?,
    }
    Ok(())
}

/// Reads blocks separated by empty lines and feeds each through `stage`.
/// Errors are reported and the loop continues.
fn repl(stage: Stage, analyze: bool) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut session = Session::new(analyze, io::stdout());
    let mut lines = stdin.lock().lines();

    let mut eof = false;
    while !eof {
        let mut block = String::new();
        prompt(">>> ")?;
        loop {
            let line = match lines.next() {
                Some(line) => line.context("failed to read from stdin")?,
                None => {
                    eof = true;
                    break;
                }
            };
            if line.trim().is_empty() {
                break;
            }
            block.push_str(&line);
            block.push('\n');
            prompt("... ")?;
        }
        if block.is_empty() {
            continue;
        }

        let result = match stage {
            Stage::Lex => plc_project::lex_source(&block).map(|tokens| {
                for token in tokens {
                    println!("{}", token);
                }
            }),
            Stage::Parse => plc_project::parse_source(&block).map(|ast| println!("{:#?}", ast)),
            Stage::Check => session.check(&block).map(|ir| println!("{:#?}", ir)),
            Stage::Run => session.run(&block).map(|value| println!("{}", value.print())),
        };
        if let Err(e) = result {
            tracing::debug!(category = ?e.category(), "repl input rejected");
            eprintln!("{}", e.user_friendly_message());
        }
    }
    Ok(())
}

fn prompt(text: &str) -> anyhow::Result<()> {
    print!("{}", text);
    io::stdout().flush().context("failed to flush stdout")
}
