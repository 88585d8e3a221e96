use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use renoquote_core::domain::task::{BudgetTier, TaskCategory};
use renoquote_core::reference::ReferenceDataProvider;
use rust_decimal::Decimal;
use tracing::debug;

use crate::transcript::{
    ParsedProject, ParserDefaults, ProjectBuilder, TranscriptAnalysis, TranscriptParser,
};

const CITIES: [&str; 11] = [
    "paris",
    "marseille",
    "lyon",
    "toulouse",
    "nice",
    "nantes",
    "strasbourg",
    "montpellier",
    "bordeaux",
    "lille",
    "rennes",
];

const ROOMS: [(&str, &[&str]); 5] = [
    ("kitchen", &["kitchen", "cuisine"]),
    ("bedroom", &["bedroom", "chambre"]),
    ("living room", &["living room", "lounge", "salon"]),
    ("attic", &["attic", "loft", "combles", "grenier"]),
    ("bathroom", &["bathroom", "shower room", "salle de bain"]),
];

/// Keyword triggers per category, checked in this order.
const TASK_KEYWORDS: [(TaskCategory, &[&str]); 13] = [
    (TaskCategory::Demolition, &["demolish", "demolition", "knock down", "démolition"]),
    (
        TaskCategory::TileRemoval,
        &["remove tile", "remove the tile", "remove old tile", "remove the old tile", "tile removal", "old tiles", "dépose carrelage"],
    ),
    (TaskCategory::Plumbing, &["plumbing", "toilet", "shower", "pipe", "plomberie"]),
    (TaskCategory::Electrical, &["electric", "wiring", "lighting", "socket", "électri"]),
    (
        TaskCategory::Tiling,
        &[
            "tiling", "retile", "new tile", "tile the", "lay tile", "floor tile",
            "wall tile", "tile installation", "install tile", "ceramic", "carrelage",
        ],
    ),
    (TaskCategory::Painting, &["paint", "peinture"]),
    (TaskCategory::Flooring, &["flooring", "laminate", "parquet"]),
    (TaskCategory::Waterproofing, &["waterproof", "étanchéité"]),
    (TaskCategory::FixtureInstallation, &["fixture", "vanity", "sink", "toilet", "lavabo"]),
    (TaskCategory::Insulation, &["insulat", "isolation"]),
    (TaskCategory::Ventilation, &["ventilation", "vmc", "extractor fan"]),
    (TaskCategory::HeatPump, &["heat pump", "pompe à chaleur"]),
    (TaskCategory::BoilerInstallation, &["boiler", "chaudière"]),
];

const SOLAR_KEYWORDS: [&str; 3] = ["solar", "photovolta", "panneaux solaires"];

const TIMELINE_HINTS: [&str; 10] =
    ["week", "month", "asap", "urgent", "before", "by the end", "semaine", "mois", "rapidement", "deadline"];

/// Rule-based transcript reader. Needs no network access and always yields the
/// same analysis for the same text.
#[derive(Clone, Debug)]
pub struct KeywordTranscriptParser<R> {
    builder: ProjectBuilder<R>,
}

impl<R> KeywordTranscriptParser<R>
where
    R: ReferenceDataProvider,
{
    pub fn new(reference: R, defaults: ParserDefaults) -> Self {
        Self { builder: ProjectBuilder::new(reference, defaults) }
    }

    pub fn builder(&self) -> &ProjectBuilder<R> {
        &self.builder
    }

    pub fn analyze(&self, transcript: &str) -> TranscriptAnalysis {
        let normalized = normalize_text(transcript);
        let tokens = tokenize(&normalized);
        let defaults = self.builder.defaults();

        let stated_size = extract_room_size(&tokens);
        let room_size_sqm = stated_size
            .or_else(|| size_hint(&tokens))
            .unwrap_or(defaults.room_size_sqm);
        let budget = extract_budget_tier(&normalized);

        TranscriptAnalysis {
            location: extract_location(&tokens),
            room_type: extract_room_type(&normalized).to_string(),
            room_size_sqm,
            room_size_stated: stated_size.is_some(),
            tasks: extract_tasks(&normalized),
            tasks_inferred: false,
            budget_tier: budget.unwrap_or(BudgetTier::Standard),
            budget_stated: budget.is_some() || normalized.contains('€') || normalized.contains("euro"),
            timeline_stated: TIMELINE_HINTS.iter().any(|hint| normalized.contains(hint)),
            clarity: (transcript.split_whitespace().count() as f64 / 20.0).min(1.0),
        }
    }

    /// Parses against a fixed quote date.
    pub fn parse_on(&self, transcript: &str, quote_date: NaiveDate) -> Result<ParsedProject> {
        let analysis = self.analyze(transcript);
        debug!(
            event_name = "transcript.keyword.analyzed",
            tasks = analysis.tasks.len(),
            room_size_sqm = %analysis.room_size_sqm,
            clarity = analysis.clarity,
            "transcript analyzed with keyword rules"
        );
        self.builder.build(analysis, quote_date)
    }
}

#[async_trait]
impl<R> TranscriptParser for KeywordTranscriptParser<R>
where
    R: ReferenceDataProvider,
{
    async fn parse(&self, transcript: &str) -> Result<ParsedProject> {
        self.parse_on(transcript, Utc::now().date_naive())
    }
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
}

fn tokenize(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_alphanumeric() || matches!(character, '.' | ',' | '²') {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized
        .split_whitespace()
        .map(|token| token.trim_end_matches(['.', ',']).to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

fn extract_location(tokens: &[String]) -> Option<String> {
    tokens.iter().find(|token| CITIES.contains(&token.as_str())).map(|city| title_case(city))
}

fn title_case(word: &str) -> String {
    let mut characters = word.chars();
    match characters.next() {
        Some(first) => first.to_uppercase().chain(characters).collect(),
        None => String::new(),
    }
}

fn extract_room_type(normalized_text: &str) -> &'static str {
    ROOMS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| normalized_text.contains(keyword)))
        .map(|(room, _)| *room)
        .unwrap_or("bathroom")
}

fn extract_room_size(tokens: &[String]) -> Option<Decimal> {
    for (index, token) in tokens.iter().enumerate() {
        if let Some(number) = strip_area_unit(token) {
            if let Some(size) = parse_number(number) {
                return Some(size);
            }
        }

        let Some(size) = parse_number(token) else {
            continue;
        };
        let next = tokens.get(index + 1).map(String::as_str);
        let after = tokens.get(index + 2).map(String::as_str);
        if next.is_some_and(is_area_unit) || is_spelled_area_unit(next, after) {
            return Some(size);
        }
    }
    None
}

fn strip_area_unit(token: &str) -> Option<&str> {
    ["m²", "m2", "sqm"]
        .iter()
        .find_map(|unit| token.strip_suffix(unit))
        .filter(|number| !number.is_empty())
}

fn is_area_unit(token: &str) -> bool {
    matches!(token, "m²" | "m2" | "sqm" | "m")
}

fn is_spelled_area_unit(next: Option<&str>, after: Option<&str>) -> bool {
    matches!(
        (next, after),
        (Some("square"), Some("meter" | "meters" | "metre" | "metres"))
            | (Some("mètres" | "metres" | "mètre"), Some("carrés" | "carres" | "carré"))
    )
}

fn parse_number(token: &str) -> Option<Decimal> {
    if !token.starts_with(|character: char| character.is_ascii_digit()) {
        return None;
    }
    Decimal::from_str(&token.replace(',', ".")).ok().filter(|size| *size > Decimal::ZERO)
}

fn size_hint(tokens: &[String]) -> Option<Decimal> {
    let has = |words: &[&str]| tokens.iter().any(|token| words.contains(&token.as_str()));
    if has(&["small", "petite", "petit", "tiny"]) {
        Some(Decimal::new(3, 0))
    } else if has(&["large", "grande", "grand", "big"]) {
        Some(Decimal::new(8, 0))
    } else {
        None
    }
}

fn extract_tasks(normalized_text: &str) -> Vec<TaskCategory> {
    let mut tasks: Vec<TaskCategory> = TASK_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|keyword| normalized_text.contains(keyword)))
        .map(|(category, _)| *category)
        .collect();
    if SOLAR_KEYWORDS.iter().any(|keyword| normalized_text.contains(keyword)) {
        tasks.push(TaskCategory::SolarPanels);
    }
    tasks
}

fn extract_budget_tier(normalized_text: &str) -> Option<BudgetTier> {
    let mentions = |words: &[&str]| words.iter().any(|word| normalized_text.contains(word));
    if mentions(&["luxury", "designer", "custom", "luxe"]) {
        Some(BudgetTier::Luxury)
    } else if mentions(&["premium", "high-end", "high end", "quality", "haut de gamme"]) {
        Some(BudgetTier::Premium)
    } else if mentions(&["budget", "cheap", "affordable", "économique", "pas cher"]) {
        Some(BudgetTier::Budget)
    } else {
        None
    }
}
