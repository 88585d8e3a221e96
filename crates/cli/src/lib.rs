pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use renoquote_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat, LoggingConfig};

use commands::quote::QuoteArgs;
use commands::reference::ReferenceArgs;
use commands::transcript::TranscriptArgs;

#[derive(Debug, Parser)]
#[command(
    name = "renoquote",
    about = "Renovation quote engine CLI",
    long_about = "Price renovation task lists, read client transcripts, and inspect reference data and configuration.",
    after_help = "Examples:\n  renoquote quote --input request.json --pretty\n  renoquote transcript --text \"retile my 4m2 bathroom in Lyon\"\n  renoquote doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file to load instead of renoquote.toml")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Log level: trace, debug, info, warn or error")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Log format: compact, pretty or json")]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price a JSON quote request and print the quote as JSON")]
    Quote {
        #[arg(long, help = "Path to the JSON request, or - for stdin")]
        input: PathBuf,
        #[arg(long, help = "Reference data TOML file to use instead of the configured one")]
        reference: Option<PathBuf>,
        #[arg(long, help = "Pretty-print the JSON output")]
        pretty: bool,
        #[arg(long, help = "Include the risk, VAT and confidence report")]
        report: bool,
    },
    #[command(about = "Turn a free-text renovation request into a priced quote")]
    Transcript {
        #[arg(long, conflicts_with = "file", help = "Transcript text")]
        text: Option<String>,
        #[arg(long, help = "File containing the transcript, or - for stdin")]
        file: Option<PathBuf>,
        #[arg(long, help = "Client location to use when the transcript names no city")]
        location: Option<String>,
        #[arg(long, help = "Pretty-print the JSON output")]
        pretty: bool,
    },
    #[command(about = "Validate and describe the reference data tables")]
    Reference {
        #[arg(long, help = "Reference data TOML file to use instead of the configured one")]
        reference: Option<PathBuf>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, reference data and pricing rules")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        overrides: ConfigOverrides {
            log_level: cli.log_level,
            log_format: cli.log_format,
            ..ConfigOverrides::default()
        },
    };

    let logging = AppConfig::load(options.clone())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init_logging(&logging);

    let result = match cli.command {
        Command::Quote { input, reference, pretty, report } => {
            commands::quote::run(options, &QuoteArgs { input, reference, pretty, report })
        }
        Command::Transcript { text, file, location, pretty } => {
            commands::transcript::run(options, &TranscriptArgs { text, file, location, pretty })
        }
        Command::Reference { reference, json } => {
            commands::reference::run(options, &ReferenceArgs { reference, json })
        }
        Command::Config => commands::config::run(options),
        Command::Doctor { json } => commands::doctor::run(options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(logging: &LoggingConfig) {
    use tracing::Level;
    use LogFormat::*;

    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder =
        tracing_subscriber::fmt().with_target(false).with_max_level(log_level).with_writer(std::io::stderr);

    match logging.format {
        Compact => {
            builder.compact().init();
        }
        Pretty => {
            builder.pretty().init();
        }
        Json => {
            builder.json().init();
        }
    }
}
