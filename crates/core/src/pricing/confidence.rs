//! Confidence scoring for priced tasks.
//!
//! A task score is a weighted blend of three sub-scores, each normalised to
//! `[0, 1]`:
//!
//! - **clarity**: how well the request was described
//! - **material availability**: how reliably the referenced materials can be sourced
//! - **labor accuracy**: how predictable the labor estimate is
//!
//! The quote-level score is the plain mean of task scores. Bands are an
//! annotation for humans and never influence pricing.

use serde::{Deserialize, Serialize};

use crate::domain::quote::mean;
use crate::domain::task::{ClaritySignals, LaborSignals};
use crate::pricing::rules::ConfidenceWeights;
use crate::reference::MaterialRecord;

/// Neutral availability for tasks that use no materials.
const NEUTRAL_AVAILABILITY: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub clarity: f64,
    pub material_availability: f64,
    pub labor_accuracy: f64,
    pub score: f64,
}

impl ConfidenceBreakdown {
    pub fn level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.score)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    /// Lower bounds are inclusive.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            Self::VeryHigh
        } else if score >= 0.8 {
            Self::High
        } else if score >= 0.7 {
            Self::Medium
        } else if score >= 0.6 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VeryHigh => "Very High",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::VeryLow => "Very Low",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ConfidenceScorer {
    weights: ConfidenceWeights,
}

impl ConfidenceScorer {
    pub fn new(weights: ConfidenceWeights) -> Self {
        Self { weights }
    }

    /// Weighted blend of already-extracted sub-scores, clamped to `[0, 1]`.
    pub fn combine(&self, clarity: f64, material_availability: f64, labor_accuracy: f64) -> f64 {
        let total = unit(clarity) * self.weights.clarity
            + unit(material_availability) * self.weights.material_availability
            + unit(labor_accuracy) * self.weights.labor_accuracy;
        unit(total)
    }

    pub fn score(
        &self,
        clarity: &ClaritySignals,
        materials: &[&MaterialRecord],
        labor: &LaborSignals,
        default_standardization: f64,
    ) -> ConfidenceBreakdown {
        let clarity = clarity_score(clarity);
        let material_availability = material_availability_score(materials);
        let labor_accuracy = labor_accuracy_score(labor, default_standardization);

        ConfidenceBreakdown {
            clarity,
            material_availability,
            labor_accuracy,
            score: self.combine(clarity, material_availability, labor_accuracy),
        }
    }
}

pub fn clarity_score(signals: &ClaritySignals) -> f64 {
    let mut score = signals.description_clarity;
    if signals.dimensions_provided {
        score += 0.10;
    }
    if signals.budget_specified {
        score += 0.10;
    }
    if signals.timeline_specified {
        score += 0.05;
    }
    score += (signals.task_clarity - 0.5) * 0.2;
    unit(score)
}

pub fn material_availability_score(materials: &[&MaterialRecord]) -> f64 {
    let per_material = materials.iter().map(|record| {
        0.5 * record.availability_score
            + 0.3 * record.price_stability
            + 0.2 * record.supplier_reliability
    });
    unit(mean(per_material).unwrap_or(NEUTRAL_AVAILABILITY))
}

pub fn labor_accuracy_score(signals: &LaborSignals, default_standardization: f64) -> f64 {
    let mut score = signals.task_standardization.unwrap_or(default_standardization);
    score += (signals.complexity_certainty - 0.5) * 0.2;
    score += if signals.local_rates_available { 0.1 } else { -0.1 };
    score += (signals.skill_clarity - 0.5) * 0.1;
    unit(score)
}

/// Quote-level score: mean over every priced task, not over zones.
pub fn global_confidence(task_scores: impl IntoIterator<Item = f64>) -> f64 {
    mean(task_scores.into_iter()).map(unit).unwrap_or(0.0)
}

/// Follow-up actions suggested by a low score or a weak sub-score.
pub fn recommendations(breakdown: &ConfidenceBreakdown) -> Vec<&'static str> {
    let mut out = Vec::new();

    if breakdown.score < 0.6 {
        out.push("Recommend a site visit before finalizing the quote");
        out.push("Request additional project details from the client");
    } else if breakdown.score < 0.7 {
        out.push("Consider adding a contingency margin");
        out.push("Verify material specifications with the client");
    } else if breakdown.score < 0.8 {
        out.push("Quote ready with minor clarifications");
    }

    if breakdown.clarity < 0.7 {
        out.push("Request clearer project specifications");
    }
    if breakdown.material_availability < 0.8 {
        out.push("Verify current material prices and availability");
    }
    if breakdown.labor_accuracy < 0.75 {
        out.push("Consider a second opinion on labor estimates");
    }

    out
}

fn unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
