use std::env;
use std::fs;
use std::path::Path;

use renoquote_core::config::{resolve_config_path, ConfigOverrides, LoadOptions};
use toml::Value;

use super::{load_config, CommandResult};

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let flags = flag_overrides(&options.overrides);
    let config = match load_config("config", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let reference_path = config
        .reference
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<builtin>".to_string());
    let default_tasks = config
        .transcript
        .default_tasks
        .iter()
        .map(|category| category.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let rows: [(&str, &[&str], String); 10] = [
        ("reference.path", &["RENOQUOTE_REFERENCE_PATH"], reference_path),
        (
            "pricing.tax.boiler_cutoff",
            &["RENOQUOTE_PRICING_BOILER_CUTOFF"],
            config.pricing.tax.boiler_cutoff.to_string(),
        ),
        (
            "pricing.tax.min_dwelling_age_years",
            &["RENOQUOTE_PRICING_MIN_DWELLING_AGE_YEARS"],
            config.pricing.tax.min_dwelling_age_years.to_string(),
        ),
        (
            "pricing.margin.base",
            &["RENOQUOTE_PRICING_MARGIN_BASE"],
            config.pricing.margin.base.to_string(),
        ),
        (
            "transcript.default_location",
            &["RENOQUOTE_TRANSCRIPT_DEFAULT_LOCATION"],
            config.transcript.default_location.clone(),
        ),
        (
            "transcript.default_room_size_sqm",
            &["RENOQUOTE_TRANSCRIPT_DEFAULT_ROOM_SIZE_SQM"],
            config.transcript.default_room_size_sqm.to_string(),
        ),
        (
            "transcript.dwelling_age_years",
            &["RENOQUOTE_TRANSCRIPT_DWELLING_AGE_YEARS"],
            config.transcript.dwelling_age_years.to_string(),
        ),
        ("transcript.default_tasks", &[], default_tasks),
        (
            "logging.level",
            &["RENOQUOTE_LOGGING_LEVEL", "RENOQUOTE_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        (
            "logging.format",
            &["RENOQUOTE_LOGGING_FORMAT", "RENOQUOTE_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
        ),
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for (key_path, env_keys, value) in rows {
        let source = match flags.iter().find(|(flagged, _)| *flagged == key_path) {
            Some((_, flag)) => format!("flag ({flag})"),
            None => field_source(
                key_path,
                env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        };
        lines.push(render_line(key_path, &value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

/// Key paths set from the command line, with the flag that set them.
fn flag_overrides(overrides: &ConfigOverrides) -> Vec<(&'static str, &'static str)> {
    let mut flags = Vec::new();
    if overrides.reference_path.is_some() {
        flags.push(("reference.path", "--reference"));
    }
    if overrides.default_location.is_some() {
        flags.push(("transcript.default_location", "--location"));
    }
    if overrides.log_level.is_some() {
        flags.push(("logging.level", "--log-level"));
    }
    if overrides.log_format.is_some() {
        flags.push(("logging.format", "--log-format"));
    }
    flags
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| {
        env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false)
    }) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use renoquote_core::config::ConfigOverrides;

    use super::{contains_path, flag_overrides};

    #[test]
    fn nested_keys_resolve_through_tables() {
        let doc: toml::Value = "[pricing.tax]\nboiler_cutoff = 2025-03-01\n"
            .parse()
            .expect("valid toml");
        assert!(contains_path(&doc, "pricing.tax.boiler_cutoff"));
        assert!(!contains_path(&doc, "pricing.margin.base"));
    }

    #[test]
    fn command_line_overrides_are_attributed_to_their_flag() {
        let overrides = ConfigOverrides {
            log_level: Some("debug".to_string()),
            ..ConfigOverrides::default()
        };
        assert_eq!(flag_overrides(&overrides), [("logging.level", "--log-level")]);
        assert!(flag_overrides(&ConfigOverrides::default()).is_empty());
    }
}
