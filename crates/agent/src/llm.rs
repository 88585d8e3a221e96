use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use renoquote_core::domain::task::{BudgetTier, TaskCategory};
use renoquote_core::reference::ReferenceDataProvider;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::keyword::KeywordTranscriptParser;
use crate::transcript::{ParsedProject, TranscriptAnalysis, TranscriptParser};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

const EXTRACTION_PROMPT: &str = "You read renovation requests for a French building contractor. \
Reply with a single JSON object and nothing else, using these keys: \
\"location\" (city or null), \"room_type\" (string), \"room_size\" (square meters or null), \
\"tasks\" (array of: demolition, tile_removal, plumbing, electrical, tiling, painting, flooring, \
waterproofing, fixture_installation, insulation, ventilation, heat_pump, solar_panels, \
boiler_installation), \"budget_tier\" (budget, standard, premium, luxury or null), \
\"timeline\" (string or null), \"clarity_score\" (0 to 1, how complete the request is).\n\nRequest:\n";

#[derive(Debug, Deserialize)]
struct LlmExtraction {
    location: Option<String>,
    room_type: Option<String>,
    room_size: Option<f64>,
    #[serde(default)]
    tasks: Vec<String>,
    budget_tier: Option<String>,
    timeline: Option<String>,
    clarity_score: Option<f64>,
}

/// Asks a language model to read the transcript. Any failure on the model side
/// degrades to the keyword parser instead of failing the request.
pub struct LlmTranscriptParser<C, R> {
    client: C,
    fallback: KeywordTranscriptParser<R>,
}

impl<C, R> LlmTranscriptParser<C, R>
where
    C: LlmClient,
    R: ReferenceDataProvider,
{
    pub fn new(client: C, fallback: KeywordTranscriptParser<R>) -> Self {
        Self { client, fallback }
    }

    async fn extract(&self, transcript: &str) -> Result<TranscriptAnalysis> {
        let prompt = format!("{EXTRACTION_PROMPT}{transcript}");
        let response = self.client.complete(&prompt).await.context("llm completion failed")?;
        let analysis = self.analysis_from_response(&response)?;
        if analysis.tasks.is_empty() {
            bail!("llm response named no recognised tasks");
        }
        Ok(analysis)
    }

    fn analysis_from_response(&self, response: &str) -> Result<TranscriptAnalysis> {
        let start = response.find('{').ok_or_else(|| anyhow!("llm response has no JSON object"))?;
        let end = response.rfind('}').ok_or_else(|| anyhow!("llm response has no JSON object"))?;
        if end < start {
            bail!("llm response has no JSON object");
        }
        let extraction: LlmExtraction = serde_json::from_str(&response[start..=end])
            .context("llm response is not the expected JSON shape")?;

        let defaults = self.fallback.builder().defaults();
        let stated_size = extraction
            .room_size
            .filter(|size| size.is_finite() && *size > 0.0)
            .and_then(|size| Decimal::try_from(size).ok())
            .map(|size| size.round_dp(2));
        let budget = extraction.budget_tier.as_deref().and_then(budget_tier);

        let mut tasks = Vec::new();
        for raw in &extraction.tasks {
            match TaskCategory::from_str(raw.trim()) {
                Ok(category) if !tasks.contains(&category) => tasks.push(category),
                Ok(_) => {}
                Err(_) => debug!(
                    event_name = "transcript.llm.task_ignored",
                    task = %raw,
                    "llm proposed a task outside the known categories"
                ),
            }
        }

        Ok(TranscriptAnalysis {
            location: extraction.location.filter(|location| !location.trim().is_empty()),
            room_type: extraction
                .room_type
                .map(|room| room.trim().to_lowercase())
                .filter(|room| !room.is_empty())
                .unwrap_or_else(|| "bathroom".to_string()),
            room_size_sqm: stated_size.unwrap_or(defaults.room_size_sqm),
            room_size_stated: stated_size.is_some(),
            tasks,
            tasks_inferred: false,
            budget_tier: budget.unwrap_or(BudgetTier::Standard),
            budget_stated: budget.is_some(),
            timeline_stated: extraction.timeline.is_some_and(|timeline| !timeline.trim().is_empty()),
            clarity: extraction.clarity_score.unwrap_or(0.5).clamp(0.0, 1.0),
        })
    }
}

#[async_trait]
impl<C, R> TranscriptParser for LlmTranscriptParser<C, R>
where
    C: LlmClient,
    R: ReferenceDataProvider,
{
    async fn parse(&self, transcript: &str) -> Result<ParsedProject> {
        match self.extract(transcript).await {
            Ok(analysis) => {
                debug!(
                    event_name = "transcript.llm.analyzed",
                    tasks = analysis.tasks.len(),
                    "transcript analyzed by llm"
                );
                self.fallback.builder().build(analysis, Utc::now().date_naive())
            }
            Err(error) => {
                warn!(
                    event_name = "transcript.llm.fallback",
                    error = %error,
                    "llm extraction failed, using keyword rules"
                );
                self.fallback.parse(transcript).await
            }
        }
    }
}

fn budget_tier(raw: &str) -> Option<BudgetTier> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "budget" | "low" => Some(BudgetTier::Budget),
        "standard" | "mid" | "medium" => Some(BudgetTier::Standard),
        "premium" | "high" => Some(BudgetTier::Premium),
        "luxury" => Some(BudgetTier::Luxury),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use renoquote_core::domain::task::{BudgetTier, TaskCategory};
    use renoquote_core::reference::ReferenceCatalog;
    use rust_decimal::Decimal;

    use super::{LlmClient, LlmTranscriptParser};
    use crate::keyword::KeywordTranscriptParser;
    use crate::transcript::{ParserDefaults, TranscriptParser};

    struct CannedClient(Result<String, String>);

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn complete(&self, prompt: &str) -> Result<String> {
            assert!(prompt.contains("Request:"));
            self.0.clone().map_err(|message| anyhow!(message))
        }
    }

    fn parser(reply: Result<String, String>) -> LlmTranscriptParser<CannedClient, Arc<ReferenceCatalog>> {
        let catalog = Arc::new(ReferenceCatalog::builtin().expect("builtin catalog loads"));
        let fallback = KeywordTranscriptParser::new(catalog, ParserDefaults::default());
        LlmTranscriptParser::new(CannedClient(reply), fallback)
    }

    #[tokio::test]
    async fn uses_model_extraction_when_valid() {
        let reply = r#"Sure! {"location": "Bordeaux", "room_type": "Kitchen", "room_size": 9.5,
            "tasks": ["painting", "flooring", "painting", "jacuzzi"], "budget_tier": "luxury",
            "timeline": "next month", "clarity_score": 0.9}"#;
        let project = parser(Ok(reply.to_string())).parse("kitchen refresh").await.expect("parses");

        let analysis = &project.analysis;
        assert_eq!(analysis.location.as_deref(), Some("Bordeaux"));
        assert_eq!(analysis.room_type, "kitchen");
        assert_eq!(analysis.room_size_sqm, Decimal::new(95, 1));
        assert_eq!(analysis.tasks, vec![TaskCategory::Painting, TaskCategory::Flooring]);
        assert_eq!(analysis.budget_tier, BudgetTier::Luxury);
        assert!(analysis.timeline_stated);
        assert_eq!(project.request.client_location, "Bordeaux");
        assert_eq!(project.request.tasks.len(), 2);
    }

    #[tokio::test]
    async fn falls_back_to_keywords_on_client_error() {
        let project = parser(Err("timeout".to_string()))
            .parse("Paint my 6 m2 bathroom in Lille")
            .await
            .expect("keyword fallback parses");

        assert_eq!(project.analysis.location.as_deref(), Some("Lille"));
        assert_eq!(project.analysis.tasks, vec![TaskCategory::Painting]);
    }

    #[tokio::test]
    async fn falls_back_when_model_returns_prose_or_no_tasks() {
        let prose = parser(Ok("I cannot help with that".to_string()));
        let project = prose.parse("retile the bathroom floor").await.expect("fallback parses");
        assert_eq!(project.analysis.tasks, vec![TaskCategory::Tiling]);

        let empty = parser(Ok(r#"{"tasks": []}"#.to_string()));
        let project = empty.parse("install a heat pump").await.expect("fallback parses");
        assert_eq!(project.analysis.tasks, vec![TaskCategory::HeatPump]);
    }
}
