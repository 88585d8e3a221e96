//! Read-only views derived from an assembled quote: risk assessment, VAT
//! breakdown and per-task explanations. Nothing here changes a price.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::{Quote, QuoteId};
use crate::pricing::confidence::{recommendations, ConfidenceBreakdown, ConfidenceLevel};
use crate::pricing::tax::VatRule;
use crate::reference::SkillLevel;

const MAX_OVERRUN_SHARE: Decimal = Decimal::from_parts(3, 0, 0, false, 1);
const MAX_SAVING_SHARE: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    pub fn from_confidence(score: f64) -> Self {
        match ConfidenceLevel::from_score(score) {
            ConfidenceLevel::VeryHigh => Self::VeryLow,
            ConfidenceLevel::High => Self::Low,
            ConfidenceLevel::Medium => Self::Medium,
            ConfidenceLevel::Low => Self::High,
            ConfidenceLevel::VeryLow => Self::VeryHigh,
        }
    }

    pub fn recommended_action(self) -> &'static str {
        match self {
            Self::VeryLow => "Proceed with quote as-is",
            Self::Low => "Proceed with minor review",
            Self::Medium => "Review and add 5-10% contingency",
            Self::High => "Detailed review required, consider a site visit",
            Self::VeryHigh => "Do not quote without additional information",
        }
    }

    pub fn contingency(self) -> &'static str {
        match self {
            Self::VeryLow => "0-5% contingency recommended",
            Self::Low => "5-10% contingency recommended",
            Self::Medium => "10-15% contingency recommended",
            Self::High => "15-20% contingency recommended",
            Self::VeryHigh => "20%+ contingency required or decline quote",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRiskAssessment {
    pub risk_level: RiskLevel,
    pub confidence_score: f64,
    pub recommended_action: String,
    pub contingency_suggestion: String,
    pub potential_overrun: Decimal,
    pub potential_saving: Decimal,
}

impl QuoteRiskAssessment {
    pub fn assess(quote: &Quote) -> Self {
        let score = quote.global_confidence_score.clamp(0.0, 1.0);
        let risk_level = RiskLevel::from_confidence(score);
        let uncertainty = Decimal::try_from(1.0 - score).unwrap_or(Decimal::ONE);
        let exposure = quote.grand_total * uncertainty;

        Self {
            risk_level,
            confidence_score: score,
            recommended_action: risk_level.recommended_action().to_string(),
            contingency_suggestion: risk_level.contingency().to_string(),
            potential_overrun: (exposure * MAX_OVERRUN_SHARE).round_dp(2),
            potential_saving: (exposure * MAX_SAVING_SHARE).round_dp(2),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatBand {
    pub rate: Decimal,
    pub task_count: usize,
    pub subtotal: Decimal,
    pub vat_amount: Decimal,
}

/// Quote totals grouped by VAT rate, lowest rate first.
pub fn vat_breakdown(quote: &Quote) -> Vec<VatBand> {
    let mut bands: BTreeMap<Decimal, VatBand> = BTreeMap::new();
    for task in quote.tasks() {
        let band = bands.entry(task.vat_rate).or_insert_with(|| VatBand {
            rate: task.vat_rate,
            task_count: 0,
            subtotal: Decimal::ZERO,
            vat_amount: Decimal::ZERO,
        });
        band.task_count += 1;
        band.subtotal += task.subtotal;
        band.vat_amount += task.vat_amount;
    }
    bands.into_values().collect()
}

/// Why a task was priced the way it was.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskInsight {
    pub zone: String,
    pub task: String,
    pub vat_rule: VatRule,
    pub vat_explanation: String,
    pub skill_level: SkillLevel,
    pub sell_price: Decimal,
    pub confidence: ConfidenceBreakdown,
    pub confidence_level: ConfidenceLevel,
    pub recommendations: Vec<String>,
}

impl TaskInsight {
    pub fn new(
        zone: &str,
        task: &str,
        vat_rule: VatRule,
        skill_level: SkillLevel,
        sell_price: Decimal,
        confidence: ConfidenceBreakdown,
    ) -> Self {
        Self {
            zone: zone.to_string(),
            task: task.to_string(),
            vat_rule,
            vat_explanation: vat_rule.explanation().to_string(),
            skill_level,
            sell_price,
            confidence,
            confidence_level: confidence.level(),
            recommendations: recommendations(&confidence)
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub quote_id: QuoteId,
    pub client_location: String,
    pub grand_total: Decimal,
    pub global_confidence_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub risk_level: RiskLevel,
    pub zone_count: usize,
    pub task_count: usize,
    pub recommended_action: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteReport {
    pub summary: QuoteSummary,
    pub risk: QuoteRiskAssessment,
    pub vat_breakdown: Vec<VatBand>,
    pub tasks: Vec<TaskInsight>,
}

impl QuoteReport {
    pub fn build(quote: &Quote, insights: Vec<TaskInsight>) -> Self {
        let risk = QuoteRiskAssessment::assess(quote);
        let summary = QuoteSummary {
            quote_id: quote.quote_id.clone(),
            client_location: quote.client_location.clone(),
            grand_total: quote.grand_total,
            global_confidence_score: quote.global_confidence_score,
            confidence_level: ConfidenceLevel::from_score(quote.global_confidence_score),
            risk_level: risk.risk_level,
            zone_count: quote.zones.len(),
            task_count: quote.task_count(),
            recommended_action: risk.recommended_action.clone(),
        };

        Self { summary, risk, vat_breakdown: vat_breakdown(quote), tasks: insights }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use super::{vat_breakdown, QuoteReport, QuoteRiskAssessment, RiskLevel, TaskInsight};
    use crate::domain::quote::{LaborLine, PricedTask, Quote, QuoteId, Zone};
    use crate::pricing::confidence::{ConfidenceBreakdown, ConfidenceLevel};
    use crate::pricing::tax::VatRule;
    use crate::reference::SkillLevel;

    fn task(name: &str, subtotal: i64, vat_rate: Decimal, confidence: f64) -> PricedTask {
        let subtotal = Decimal::new(subtotal, 0);
        let vat_amount = subtotal * vat_rate;
        PricedTask {
            name: name.to_string(),
            labor: LaborLine { hours: Decimal::ONE, rate: subtotal, total: subtotal },
            materials: Vec::new(),
            vat_rate,
            estimated_duration: "1 day".to_string(),
            subtotal,
            vat_amount,
            total_price: subtotal + vat_amount,
            margin: Decimal::new(15, 2),
            confidence_score: confidence,
        }
    }

    fn quote(confidence: f64) -> Quote {
        let mut bathroom = Zone::new("bathroom");
        bathroom.tasks.push(task("tiling", 1000, Decimal::new(10, 2), confidence));
        bathroom.tasks.push(task("painting", 500, Decimal::new(10, 2), confidence));
        let mut attic = Zone::new("attic");
        attic.tasks.push(task("insulation", 2000, Decimal::new(55, 3), confidence));

        let zones: BTreeMap<_, _> =
            [bathroom, attic].into_iter().map(|zone| (zone.name.clone(), zone)).collect();
        let total_before_vat = Decimal::new(3500, 0);
        let total_vat = Decimal::new(260, 0);
        Quote {
            quote_id: QuoteId("q-1".to_string()),
            client_location: "Lyon".to_string(),
            project_summary: "bathroom and attic".to_string(),
            zones,
            global_confidence_score: confidence,
            total_before_vat,
            total_vat,
            grand_total: total_before_vat + total_vat,
        }
    }

    #[test]
    fn risk_is_inverse_of_confidence() {
        assert_eq!(RiskLevel::from_confidence(0.95), RiskLevel::VeryLow);
        assert_eq!(RiskLevel::from_confidence(0.85), RiskLevel::Low);
        assert_eq!(RiskLevel::from_confidence(0.75), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_confidence(0.65), RiskLevel::High);
        assert_eq!(RiskLevel::from_confidence(0.2), RiskLevel::VeryHigh);
    }

    #[test]
    fn variance_scales_with_uncertainty() {
        let assessment = QuoteRiskAssessment::assess(&quote(0.75));
        // 3760 * 0.25 = 940; overrun 30%, saving 10%.
        assert_eq!(assessment.potential_overrun, Decimal::new(282, 0));
        assert_eq!(assessment.potential_saving, Decimal::new(94, 0));
        assert_eq!(assessment.contingency_suggestion, "10-15% contingency recommended");

        let certain = QuoteRiskAssessment::assess(&quote(1.0));
        assert_eq!(certain.potential_overrun, Decimal::ZERO);
    }

    #[test]
    fn vat_breakdown_groups_by_rate() {
        let bands = vat_breakdown(&quote(0.8));
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0].rate, Decimal::new(55, 3));
        assert_eq!(bands[0].vat_amount, Decimal::new(110, 0));
        assert_eq!(bands[1].task_count, 2);
        assert_eq!(bands[1].subtotal, Decimal::new(1500, 0));
        assert_eq!(bands[1].vat_amount, Decimal::new(150, 0));
    }

    #[test]
    fn report_summarises_quote() {
        let confidence = ConfidenceBreakdown {
            clarity: 0.6,
            material_availability: 0.9,
            labor_accuracy: 0.9,
            score: 0.78,
        };
        let insight = TaskInsight::new(
            "bathroom",
            "tiling",
            VatRule::DwellingRenovation,
            SkillLevel::Skilled,
            Decimal::new(1150, 0),
            confidence,
        );
        assert_eq!(insight.confidence_level, ConfidenceLevel::Medium);
        assert!(insight.recommendations.iter().any(|advice| advice.contains("clearer")));

        let report = QuoteReport::build(&quote(0.82), vec![insight]);
        assert_eq!(report.summary.task_count, 3);
        assert_eq!(report.summary.zone_count, 2);
        assert_eq!(report.summary.risk_level, RiskLevel::Low);
        assert_eq!(report.summary.recommended_action, "Proceed with minor review");
        assert_eq!(report.tasks.len(), 1);
    }
}
