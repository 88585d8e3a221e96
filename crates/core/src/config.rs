use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::task::TaskCategory;
use crate::pricing::rules::PricingRules;
use crate::reference::{ReferenceCatalog, ReferenceDataError};

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["renoquote.toml", "config/renoquote.toml"];

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub reference: ReferenceConfig,
    pub pricing: PricingRules,
    pub transcript: TranscriptConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceConfig {
    /// Reference table file; the embedded catalog is used when unset.
    pub path: Option<PathBuf>,
}

impl ReferenceConfig {
    pub fn load_catalog(&self) -> Result<ReferenceCatalog, ReferenceDataError> {
        match &self.path {
            Some(path) => ReferenceCatalog::load(path),
            None => ReferenceCatalog::builtin(),
        }
    }
}

/// Defaults the transcript parser falls back to when a transcript is silent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptConfig {
    pub default_location: String,
    pub default_room_size_sqm: Decimal,
    pub dwelling_age_years: u32,
    /// Work assumed when a transcript names no recognisable task.
    pub default_tasks: Vec<TaskCategory>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub reference_path: Option<PathBuf>,
    pub default_location: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reference: ReferenceConfig::default(),
            pricing: PricingRules::default(),
            transcript: TranscriptConfig {
                default_location: "Paris".to_string(),
                default_room_size_sqm: Decimal::new(4, 0),
                dwelling_age_years: 10,
                default_tasks: vec![
                    TaskCategory::TileRemoval,
                    TaskCategory::Plumbing,
                    TaskCategory::Tiling,
                    TaskCategory::Painting,
                    TaskCategory::FixtureInstallation,
                ],
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(reference) = patch.reference {
            if let Some(path) = reference.path {
                self.reference.path = Some(path);
            }
        }

        if let Some(pricing) = patch.pricing {
            self.pricing = pricing;
        }

        if let Some(transcript) = patch.transcript {
            if let Some(default_location) = transcript.default_location {
                self.transcript.default_location = default_location;
            }
            if let Some(default_room_size_sqm) = transcript.default_room_size_sqm {
                self.transcript.default_room_size_sqm = default_room_size_sqm;
            }
            if let Some(dwelling_age_years) = transcript.dwelling_age_years {
                self.transcript.dwelling_age_years = dwelling_age_years;
            }
            if let Some(default_tasks) = transcript.default_tasks {
                self.transcript.default_tasks = default_tasks;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RENOQUOTE_REFERENCE_PATH") {
            self.reference.path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("RENOQUOTE_PRICING_BOILER_CUTOFF") {
            self.pricing.tax.boiler_cutoff = parse_date("RENOQUOTE_PRICING_BOILER_CUTOFF", &value)?;
        }
        if let Some(value) = read_env("RENOQUOTE_PRICING_MIN_DWELLING_AGE_YEARS") {
            self.pricing.tax.min_dwelling_age_years =
                parse_u32("RENOQUOTE_PRICING_MIN_DWELLING_AGE_YEARS", &value)?;
        }
        if let Some(value) = read_env("RENOQUOTE_PRICING_MARGIN_BASE") {
            self.pricing.margin.base = parse_decimal("RENOQUOTE_PRICING_MARGIN_BASE", &value)?;
        }

        if let Some(value) = read_env("RENOQUOTE_TRANSCRIPT_DEFAULT_LOCATION") {
            self.transcript.default_location = value;
        }
        if let Some(value) = read_env("RENOQUOTE_TRANSCRIPT_DEFAULT_ROOM_SIZE_SQM") {
            self.transcript.default_room_size_sqm =
                parse_decimal("RENOQUOTE_TRANSCRIPT_DEFAULT_ROOM_SIZE_SQM", &value)?;
        }
        if let Some(value) = read_env("RENOQUOTE_TRANSCRIPT_DWELLING_AGE_YEARS") {
            self.transcript.dwelling_age_years =
                parse_u32("RENOQUOTE_TRANSCRIPT_DWELLING_AGE_YEARS", &value)?;
        }

        let log_level =
            read_env("RENOQUOTE_LOGGING_LEVEL").or_else(|| read_env("RENOQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RENOQUOTE_LOGGING_FORMAT").or_else(|| read_env("RENOQUOTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(reference_path) = overrides.reference_path {
            self.reference.path = Some(reference_path);
        }
        if let Some(default_location) = overrides.default_location {
            self.transcript.default_location = default_location;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_reference(&self.reference)?;
        self.pricing.validate().map_err(|error| ConfigError::Validation(error.0))?;
        validate_transcript(&self.transcript)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// First config file that exists, honouring an explicit path when given.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_reference(reference: &ReferenceConfig) -> Result<(), ConfigError> {
    if let Some(path) = &reference.path {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "reference.path must not be empty when set".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_transcript(transcript: &TranscriptConfig) -> Result<(), ConfigError> {
    if transcript.default_location.trim().is_empty() {
        return Err(ConfigError::Validation(
            "transcript.default_location must not be empty".to_string(),
        ));
    }
    if transcript.default_room_size_sqm <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "transcript.default_room_size_sqm must be greater than zero".to_string(),
        ));
    }
    if transcript.default_tasks.is_empty() {
        return Err(ConfigError::Validation(
            "transcript.default_tasks must name at least one task category".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| invalid_override(key, value))
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    value.trim().parse::<NaiveDate>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    reference: Option<ReferencePatch>,
    pricing: Option<PricingRules>,
    transcript: Option<TranscriptPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ReferencePatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct TranscriptPatch {
    default_location: Option<String>,
    default_room_size_sqm: Option<Decimal>,
    dwelling_age_years: Option<u32>,
    default_tasks: Option<Vec<TaskCategory>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::domain::task::TaskCategory;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn write_config(dir: &TempDir, contents: &str) -> Result<PathBuf, String> {
        let path = dir.path().join("renoquote.toml");
        fs::write(&path, contents).map_err(|err| err.to_string())?;
        Ok(path)
    }

    #[test]
    fn defaults_are_valid_without_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("does/not/exist.toml")),
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.reference.path.is_none(), "embedded catalog should be the default")?;
        ensure(config.transcript.default_location == "Paris", "default location should be Paris")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn missing_required_file_is_reported() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("does/not/exist.toml")),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("file is required");
        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_RENOQUOTE_CITY", "Bordeaux");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[transcript]
default_location = "${TEST_RENOQUOTE_CITY}"
"#,
            )?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.transcript.default_location == "Bordeaux",
                "location should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_RENOQUOTE_CITY"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_fails() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(&dir, "[reference]\npath = \"${RENOQUOTE_TEST_UNSET_VAR}\"\n")?;

        let error = AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
            .err()
            .ok_or_else(|| "expected interpolation failure".to_string())?;
        ensure(
            matches!(error, ConfigError::MissingEnvInterpolation { ref var } if var == "RENOQUOTE_TEST_UNSET_VAR"),
            "error should name the missing variable",
        )
    }

    #[test]
    fn pricing_section_overrides_rule_tables() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(
            &dir,
            r#"
[pricing.margin]
base = 0.18

[pricing.tax]
boiler_cutoff = "2026-01-01"
"#,
        )?;

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.pricing.margin.base == Decimal::new(18, 2), "margin base from file")?;
        ensure(
            config.pricing.margin.ceiling == Decimal::new(30, 2),
            "unspecified margin values keep defaults",
        )?;
        ensure(
            config.pricing.tax.boiler_cutoff.to_string() == "2026-01-01",
            "boiler cutoff from file",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RENOQUOTE_LOG_LEVEL", "warn");
        env::set_var("RENOQUOTE_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )
        })();

        clear_vars(&["RENOQUOTE_LOG_LEVEL", "RENOQUOTE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RENOQUOTE_TRANSCRIPT_DEFAULT_LOCATION", "Nantes");
        env::set_var("RENOQUOTE_REFERENCE_PATH", "/srv/env-reference.toml");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[reference]
path = "/srv/file-reference.toml"

[transcript]
default_location = "Lille"
dwelling_age_years = 25

[logging]
level = "warn"
"#,
            )?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    reference_path: Some(PathBuf::from("/srv/override-reference.toml")),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.reference.path == Some(PathBuf::from("/srv/override-reference.toml")),
                "override reference path should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.transcript.default_location == "Nantes",
                "env location should win over file and defaults",
            )?;
            ensure(config.transcript.dwelling_age_years == 25, "file value should beat default")
        })();

        clear_vars(&["RENOQUOTE_TRANSCRIPT_DEFAULT_LOCATION", "RENOQUOTE_REFERENCE_PATH"]);
        result
    }

    #[test]
    fn invalid_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RENOQUOTE_PRICING_BOILER_CUTOFF", "next spring");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected invalid override but load succeeded".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. }
                        if key == "RENOQUOTE_PRICING_BOILER_CUTOFF"
                ),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["RENOQUOTE_PRICING_BOILER_CUTOFF"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(
            &dir,
            r#"
[pricing.confidence]
clarity = 0.6
"#,
        )?;

        let error =
            match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
            {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains("sum to 1")),
            "validation failure should explain the weight constraint",
        )
    }

    #[test]
    fn default_tasks_come_from_file_and_must_not_be_empty() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(&dir, "[transcript]\ndefault_tasks = [\"painting\", \"flooring\"]\n")?;
        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;
        ensure(
            config.transcript.default_tasks == [TaskCategory::Painting, TaskCategory::Flooring],
            "default tasks should be read from the file",
        )?;

        let path = write_config(&dir, "[transcript]\ndefault_tasks = []\n")?;
        let error = AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
            .err()
            .ok_or_else(|| "an empty default task list should be rejected".to_string())?;
        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains("default_tasks")),
            "validation failure should name transcript.default_tasks",
        )
    }
}
