use chrono::Utc;
use renoquote_core::config::{AppConfig, LoadOptions};
use renoquote_core::domain::task::{BudgetTier, Complexity, ConfidenceSignals, TaxContext, Urgency};
use renoquote_core::{
    DeterministicQuoteEngine, QuoteRequest, QuoteRuntime, ReferenceCatalog, Task,
};
use rust_decimal::Decimal;
use serde::Serialize;

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match config.reference.load_catalog() {
                Ok(catalog) => {
                    checks.push(check_reference_coverage(&catalog));
                    checks.push(check_pricing_smoke(catalog, &config));
                }
                Err(error) => {
                    checks.push(DoctorCheck {
                        name: "reference_data",
                        status: CheckStatus::Fail,
                        details: error.to_string(),
                    });
                    checks.push(skipped("pricing_smoke", "reference data did not load"));
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("reference_data", "configuration did not load"));
            checks.push(skipped("pricing_smoke", "configuration did not load"));
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: format!("skipped because {reason}"),
    }
}

fn check_reference_coverage(catalog: &ReferenceCatalog) -> DoctorCheck {
    let unpriced = catalog.unpriced_categories();
    let summary = format!(
        "version `{}` with {} materials, {} labor standards, {} bundles",
        catalog.version(),
        catalog.materials().count(),
        catalog.labor_standards().count(),
        catalog.bundle_count()
    );
    if unpriced.is_empty() {
        return DoctorCheck { name: "reference_data", status: CheckStatus::Pass, details: summary };
    }

    let names: Vec<_> = unpriced.iter().map(|category| category.as_str()).collect();
    DoctorCheck {
        name: "reference_data",
        status: CheckStatus::Warn,
        details: format!("{summary}; no labor standard for: {}", names.join(", ")),
    }
}

/// Prices one material-free task per labor standard and checks the totals
/// reconcile.
fn check_pricing_smoke(catalog: ReferenceCatalog, config: &AppConfig) -> DoctorCheck {
    let tasks: Vec<Task> = catalog
        .labor_standards()
        .map(|standard| Task {
            name: format!("doctor {}", standard.category),
            zone: "doctor".to_string(),
            category: standard.category,
            quantity: Decimal::ONE,
            budget_tier: BudgetTier::Standard,
            complexity: Complexity::Moderate,
            materials: Vec::new(),
            tax: TaxContext::default(),
            signals: ConfidenceSignals::default(),
            urgency: Urgency::Standard,
        })
        .collect();
    if tasks.is_empty() {
        return DoctorCheck {
            name: "pricing_smoke",
            status: CheckStatus::Fail,
            details: "reference data defines no labor standards".to_string(),
        };
    }

    let request = QuoteRequest {
        client_location: config.transcript.default_location.clone(),
        project_summary: "doctor smoke quote".to_string(),
        quote_date: Utc::now().date_naive(),
        tasks,
    };
    let engine = DeterministicQuoteEngine::new(catalog, config.pricing.clone());
    match engine.assemble(&request) {
        Ok(quote) if quote.grand_total == quote.total_before_vat + quote.total_vat => DoctorCheck {
            name: "pricing_smoke",
            status: CheckStatus::Pass,
            details: format!("priced {} tasks, grand total {}", quote.task_count(), quote.grand_total),
        },
        Ok(_) => DoctorCheck {
            name: "pricing_smoke",
            status: CheckStatus::Fail,
            details: "quote totals do not reconcile".to_string(),
        },
        Err(error) => DoctorCheck {
            name: "pricing_smoke",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
