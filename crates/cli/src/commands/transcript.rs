use std::path::PathBuf;
use std::sync::Arc;

use renoquote_agent::{
    KeywordTranscriptParser, ParserDefaults, TranscriptAnalysis, TranscriptParser,
};
use renoquote_core::config::LoadOptions;
use renoquote_core::Quote;
use serde::Serialize;

use super::quote::price;
use super::{correlation_id, load_catalog, load_config, read_input, CommandResult, EXIT_INPUT};

const COMMAND: &str = "transcript";

#[derive(Clone, Debug, Default)]
pub struct TranscriptArgs {
    pub text: Option<String>,
    pub file: Option<PathBuf>,
    pub location: Option<String>,
    pub pretty: bool,
}

#[derive(Serialize)]
struct TranscriptQuote<'a> {
    analysis: &'a TranscriptAnalysis,
    quote: &'a Quote,
}

pub fn run(mut options: LoadOptions, args: &TranscriptArgs) -> CommandResult {
    if args.location.is_some() {
        options.overrides.default_location = args.location.clone();
    }
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let catalog = match load_catalog(COMMAND, &config) {
        Ok(catalog) => Arc::new(catalog),
        Err(result) => return result,
    };
    let transcript = match (&args.text, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => match read_input(COMMAND, path) {
            Ok(raw) => raw,
            Err(result) => return result,
        },
        (None, None) => {
            return CommandResult::failure(
                COMMAND,
                "input_missing",
                "provide the transcript with --text or --file",
                EXIT_INPUT,
            )
        }
    };

    let parser = KeywordTranscriptParser::new(
        Arc::clone(&catalog),
        ParserDefaults::from(&config.transcript),
    );
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            )
        }
    };
    let project = match runtime.block_on(parser.parse(&transcript)) {
        Ok(project) => project,
        Err(error) => {
            return CommandResult::failure(COMMAND, "transcript_unrecognised", error.to_string(), EXIT_INPUT)
        }
    };

    let correlation_id = correlation_id();
    match price(catalog, config.pricing, &project.request) {
        Ok(assembled) => CommandResult::json(
            COMMAND,
            &TranscriptQuote { analysis: &project.analysis, quote: &assembled.quote },
            args.pretty,
        ),
        Err(error) => super::quote::render(COMMAND, Err(error), &correlation_id, false, false),
    }
}
