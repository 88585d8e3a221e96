use std::path::PathBuf;

use chrono::Utc;
use renoquote_core::config::LoadOptions;
use renoquote_core::{
    ApplicationError, AssembledQuote, DeterministicQuoteEngine, PricingRules, Quote, QuoteError,
    QuoteReport, QuoteRequest, QuoteRequestInput, ReferenceDataProvider,
};
use serde::Serialize;

use super::{correlation_id, load_catalog, load_config, read_input, CommandResult, EXIT_INPUT};

const COMMAND: &str = "quote";

#[derive(Clone, Debug, Default)]
pub struct QuoteArgs {
    pub input: PathBuf,
    pub reference: Option<PathBuf>,
    pub pretty: bool,
    pub report: bool,
}

#[derive(Serialize)]
struct QuoteWithReport<'a> {
    quote: &'a Quote,
    report: QuoteReport,
}

pub fn run(mut options: LoadOptions, args: &QuoteArgs) -> CommandResult {
    if args.reference.is_some() {
        options.overrides.reference_path = args.reference.clone();
    }
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let catalog = match load_catalog(COMMAND, &config) {
        Ok(catalog) => catalog,
        Err(result) => return result,
    };
    let raw = match read_input(COMMAND, &args.input) {
        Ok(raw) => raw,
        Err(result) => return result,
    };
    let input: QuoteRequestInput = match serde_json::from_str(&raw) {
        Ok(input) => input,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "input_invalid",
                format!("quote request is not valid JSON: {error}"),
                EXIT_INPUT,
            )
        }
    };

    let correlation_id = correlation_id();
    let outcome = input
        .into_request(Utc::now().date_naive())
        .and_then(|request| price(catalog, config.pricing, &request));
    render(COMMAND, outcome, &correlation_id, args.pretty, args.report)
}

pub(crate) fn price<R: ReferenceDataProvider>(
    reference: R,
    rules: PricingRules,
    request: &QuoteRequest,
) -> Result<AssembledQuote, QuoteError> {
    DeterministicQuoteEngine::new(reference, rules).assemble_with_insights(request)
}

pub(crate) fn render(
    command: &str,
    outcome: Result<AssembledQuote, QuoteError>,
    correlation_id: &str,
    pretty: bool,
    report: bool,
) -> CommandResult {
    match outcome {
        Ok(assembled) if report => CommandResult::json(
            command,
            &QuoteWithReport { quote: &assembled.quote, report: assembled.report() },
            pretty,
        ),
        Ok(assembled) => CommandResult::json(command, &assembled.quote, pretty),
        Err(error) => CommandResult::from_application_error(
            command,
            ApplicationError::from(error),
            correlation_id,
        ),
    }
}
