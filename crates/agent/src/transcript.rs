use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use renoquote_core::config::{AppConfig, TranscriptConfig};
use renoquote_core::domain::quote::QuoteRequest;
use renoquote_core::domain::task::{
    BudgetTier, ClaritySignals, Complexity, ConfidenceSignals, MaterialRequirement, Task,
    TaskCategory, TaxContext, Urgency,
};
use renoquote_core::reference::ReferenceDataProvider;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// What could be read out of a free-text renovation description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscriptAnalysis {
    pub location: Option<String>,
    pub room_type: String,
    pub room_size_sqm: Decimal,
    pub room_size_stated: bool,
    pub tasks: Vec<TaskCategory>,
    /// Set when `tasks` is the assumed default scope rather than what was said.
    #[serde(default)]
    pub tasks_inferred: bool,
    pub budget_tier: BudgetTier,
    pub budget_stated: bool,
    pub timeline_stated: bool,
    /// Completeness of the description, 0..=1.
    pub clarity: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedProject {
    pub analysis: TranscriptAnalysis,
    pub request: QuoteRequest,
}

/// Turns a transcript into a quote request the engine can price.
#[async_trait]
pub trait TranscriptParser: Send + Sync {
    async fn parse(&self, transcript: &str) -> Result<ParsedProject>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserDefaults {
    pub location: String,
    pub room_size_sqm: Decimal,
    pub dwelling_age_years: u32,
    pub fallback_tasks: Vec<TaskCategory>,
}

impl Default for ParserDefaults {
    fn default() -> Self {
        Self::from(&AppConfig::default().transcript)
    }
}

impl From<&TranscriptConfig> for ParserDefaults {
    fn from(config: &TranscriptConfig) -> Self {
        Self {
            location: config.default_location.clone(),
            room_size_sqm: config.default_room_size_sqm,
            dwelling_age_years: config.dwelling_age_years,
            fallback_tasks: config.default_tasks.clone(),
        }
    }
}

/// Expands an analysis into priced-ready tasks using the reference tables for
/// quantities and material bundles.
#[derive(Clone, Debug)]
pub struct ProjectBuilder<R> {
    reference: R,
    defaults: ParserDefaults,
}

impl<R> ProjectBuilder<R>
where
    R: ReferenceDataProvider,
{
    pub fn new(reference: R, defaults: ParserDefaults) -> Self {
        Self { reference, defaults }
    }

    pub fn defaults(&self) -> &ParserDefaults {
        &self.defaults
    }

    /// Builds the quote request. A transcript with no recognisable work is
    /// quoted for the default scope, flagged through `tasks_inferred`.
    pub fn build(
        &self,
        mut analysis: TranscriptAnalysis,
        quote_date: NaiveDate,
    ) -> Result<ParsedProject> {
        if analysis.tasks.is_empty() {
            if self.defaults.fallback_tasks.is_empty() {
                bail!("no renovation tasks were recognised and no default scope is configured");
            }
            info!(
                event_name = "transcript.tasks.defaulted",
                tasks = self.defaults.fallback_tasks.len(),
                "no tasks recognised, quoting the default renovation scope"
            );
            analysis.tasks = self.defaults.fallback_tasks.clone();
            analysis.tasks_inferred = true;
        }

        let location = analysis.location.clone().unwrap_or_else(|| self.defaults.location.clone());
        let tasks = analysis.tasks.iter().map(|category| self.task(*category, &analysis)).collect();
        let request = QuoteRequest {
            project_summary: project_summary(&analysis, &location),
            client_location: location,
            quote_date,
            tasks,
        };

        Ok(ParsedProject { analysis, request })
    }

    fn task(&self, category: TaskCategory, analysis: &TranscriptAnalysis) -> Task {
        let area = analysis.room_size_sqm;
        let quantity = self
            .reference
            .labor_standard(category)
            .map(|standard| standard.unit.quantity_for_area(area))
            .unwrap_or(area);
        let materials = self
            .reference
            .bundle(category)
            .map(|bundle| {
                bundle
                    .items
                    .iter()
                    .map(|item| MaterialRequirement {
                        material: item.material.clone(),
                        coverage: item.coverage_for(quantity),
                        quality: None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Task {
            name: task_label(category).to_string(),
            zone: analysis.room_type.clone(),
            category,
            quantity,
            budget_tier: analysis.budget_tier,
            complexity: task_complexity(category, analysis),
            materials,
            tax: TaxContext {
                dwelling_age_years: self.defaults.dwelling_age_years,
                ..TaxContext::default()
            },
            signals: ConfidenceSignals {
                clarity: ClaritySignals {
                    description_clarity: analysis.clarity,
                    task_clarity: if analysis.tasks_inferred { 0.3 } else { 0.8 },
                    dimensions_provided: analysis.room_size_stated,
                    budget_specified: analysis.budget_stated,
                    timeline_specified: analysis.timeline_stated,
                },
                ..ConfidenceSignals::default()
            },
            urgency: Urgency::Standard,
        }
    }
}

/// Room size, budget and trade risk push a task towards higher complexity.
pub fn task_complexity(category: TaskCategory, analysis: &TranscriptAnalysis) -> Complexity {
    let mut score = 1.0;
    if analysis.room_size_sqm > Decimal::new(6, 0) {
        score += 1.0;
    } else if analysis.room_size_sqm < Decimal::new(3, 0) {
        score += 0.5;
    }
    if matches!(analysis.budget_tier, BudgetTier::Premium | BudgetTier::Luxury) {
        score += 1.0;
    }
    if matches!(
        category,
        TaskCategory::Plumbing | TaskCategory::Electrical | TaskCategory::Waterproofing
    ) {
        score += 0.5;
    }

    if score >= 2.5 {
        Complexity::Complex
    } else if score >= 1.5 {
        Complexity::Moderate
    } else {
        Complexity::Simple
    }
}

pub fn task_label(category: TaskCategory) -> &'static str {
    match category {
        TaskCategory::Demolition => "Demolition",
        TaskCategory::TileRemoval => "Remove old tiles",
        TaskCategory::Plumbing => "Plumbing work",
        TaskCategory::Electrical => "Electrical work",
        TaskCategory::Tiling => "Tiling",
        TaskCategory::Painting => "Painting",
        TaskCategory::Flooring => "Flooring",
        TaskCategory::Waterproofing => "Waterproofing",
        TaskCategory::FixtureInstallation => "Install fixtures",
        TaskCategory::Insulation => "Insulation",
        TaskCategory::Ventilation => "Ventilation",
        TaskCategory::HeatPump => "Heat pump installation",
        TaskCategory::SolarPanels => "Solar panel installation",
        TaskCategory::BoilerInstallation => "Boiler installation",
    }
}

fn project_summary(analysis: &TranscriptAnalysis, location: &str) -> String {
    let tasks = analysis.tasks.iter().map(|category| task_label(*category)).collect::<Vec<_>>();
    format!(
        "{}sqm {} renovation in {location}: {}. Budget preference: {}.",
        analysis.room_size_sqm.normalize(),
        analysis.room_type,
        tasks.join(", "),
        analysis.budget_tier
    )
}
