use std::{
    io::{self, BufRead},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use logwire::{Config, Field, Level};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(version, about = "Validate log targets and encode lines through them", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Emit this tool's own diagnostics as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Resolve one or more config files without opening their targets
    Check {
        /// Config files to check
        #[arg(required = true)]
        configs: Vec<PathBuf>,
    },
    /// Log each line read from stdin through the configured target
    Pipe {
        /// Config file describing the target
        config: PathBuf,

        /// Level to log lines at
        #[arg(short, long, default_value = "info")]
        level: Level,

        /// Override the config's target
        #[arg(short, long)]
        target: Option<String>,

        /// Extra `key=value` field attached to every line (repeatable)
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got {s:?}"))
}

fn init_tracing(json: bool) {
    // Diagnostics stay quiet unless RUST_LOG asks for more.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(io::stderr))
            .init();
    }
}

fn run_check(configs: &[PathBuf]) -> ExitCode {
    let mut failed = false;
    for path in configs {
        match check_one(path) {
            Ok(summary) => println!("ok\t{}\t{summary}", path.display()),
            Err(err) => {
                failed = true;
                eprintln!("error\t{}\t{err}", path.display());
            }
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn check_one(path: &Path) -> Result<String, logwire::Error> {
    let config = Config::from_file(path)?;
    // Same validation as `Config::check`, but keeps the resolved encoder.
    let (encoder, level) = config.resolve()?;
    Ok(format!(
        "target={} encoder={encoder} level={}",
        config.target,
        level.level()
    ))
}

fn run_pipe(
    path: &Path,
    level: Level,
    target: Option<String>,
    fields: Vec<(String, String)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_file(path)?;
    if let Some(target) = target {
        config.target = target;
    }

    let fields: Vec<Field> = fields
        .into_iter()
        .map(|(key, value)| Field::string(key, value))
        .collect();
    let logger = config.build_logger()?.with(&fields);
    tracing::debug!(log_target = %config.target, "Piping stdin");

    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        logger.log(level, &line, &[])?;
    }
    logger.sync()?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_json);

    match args.command {
        Command::Check { configs } => run_check(&configs),
        Command::Pipe {
            config,
            level,
            target,
            fields,
        } => match run_pipe(&config, level, target, fields) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("Error: {err}");
                ExitCode::FAILURE
            }
        },
    }
}
