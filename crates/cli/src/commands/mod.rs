pub mod config;
pub mod doctor;
pub mod quote;
pub mod reference;
pub mod transcript;

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use renoquote_core::config::{AppConfig, LoadOptions};
use renoquote_core::{ApplicationError, QuoteId, ReferenceCatalog};
use serde::Serialize;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_REFERENCE_DATA: u8 = 3;
pub const EXIT_INPUT: u8 = 4;
pub const EXIT_REJECTED: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl CommandResult {
    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            correlation_id: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps an application error through the interface layer so the payload
    /// carries the same error class and correlation id a service caller sees.
    pub fn from_application_error(
        command: &str,
        error: ApplicationError,
        correlation_id: &str,
    ) -> Self {
        let exit_code = match &error {
            ApplicationError::Quote(_) => EXIT_REJECTED,
            ApplicationError::ReferenceData(_) => EXIT_REFERENCE_DATA,
            ApplicationError::Configuration(_) => EXIT_CONFIG,
        };
        let interface = error.into_interface(correlation_id);
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(interface.error_class().to_string()),
            message: interface.message().to_string(),
            correlation_id: Some(correlation_id.to_string()),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Successful command whose stdout is a JSON document rather than an
    /// outcome envelope.
    pub fn json<T: Serialize>(command: &str, value: &T, pretty: bool) -> Self {
        let rendered =
            if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
        match rendered {
            Ok(output) => Self { exit_code: 0, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn correlation_id() -> String {
    QuoteId::generate().0
}

pub(crate) fn load_config(command: &str, options: LoadOptions) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options).map_err(|error| {
        let error = ApplicationError::Configuration(error.to_string());
        CommandResult::from_application_error(command, error, &correlation_id())
    })
}

pub(crate) fn load_catalog(command: &str, config: &AppConfig) -> Result<ReferenceCatalog, CommandResult> {
    config.reference.load_catalog().map_err(|error| {
        let error = ApplicationError::ReferenceData(error.to_string());
        CommandResult::from_application_error(command, error, &correlation_id())
    })
}

/// Reads a file, or stdin when the path is `-`.
pub(crate) fn read_input(command: &str, path: &Path) -> Result<String, CommandResult> {
    let outcome = if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).map(|_| buffer)
    } else {
        fs::read_to_string(path)
    };
    outcome.map_err(|error| {
        CommandResult::failure(
            command,
            "input_unreadable",
            format!("could not read `{}`: {error}", path.display()),
            EXIT_INPUT,
        )
    })
}
