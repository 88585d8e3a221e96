//! Tunable business parameters for the pricing pipeline.
//!
//! Every numeric constant the calculators use lives here with its documented
//! default. Deployments override individual values through the `[pricing]`
//! section of the config file.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::task::{BudgetTier, Complexity, Urgency};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid pricing rules: {0}")]
pub struct InvalidRules(pub String);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingRules {
    pub complexity: ComplexityMultipliers,
    pub urgency: UrgencyMultipliers,
    pub margin: MarginRules,
    pub tax: TaxRules,
    pub confidence: ConfidenceWeights,
    pub duration: DurationRules,
}

impl PricingRules {
    pub fn validate(&self) -> Result<(), InvalidRules> {
        self.complexity.validate()?;
        self.urgency.validate()?;
        self.margin.validate()?;
        self.tax.validate()?;
        self.confidence.validate()?;
        self.duration.validate()
    }
}

/// Labor-hour multipliers; must be strictly increasing with complexity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityMultipliers {
    pub simple: Decimal,
    pub moderate: Decimal,
    pub complex: Decimal,
}

impl Default for ComplexityMultipliers {
    fn default() -> Self {
        Self { simple: Decimal::ONE, moderate: Decimal::new(115, 2), complex: Decimal::new(13, 1) }
    }
}

impl ComplexityMultipliers {
    pub fn get(&self, complexity: Complexity) -> Decimal {
        match complexity {
            Complexity::Simple => self.simple,
            Complexity::Moderate => self.moderate,
            Complexity::Complex => self.complex,
        }
    }

    fn validate(&self) -> Result<(), InvalidRules> {
        if self.simple <= Decimal::ZERO {
            return Err(InvalidRules("complexity.simple must be greater than zero".to_string()));
        }
        if !(self.simple < self.moderate && self.moderate < self.complex) {
            return Err(InvalidRules(
                "complexity multipliers must satisfy simple < moderate < complex".to_string(),
            ));
        }
        Ok(())
    }
}

/// Hourly-rate surcharges for rushed work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencyMultipliers {
    pub standard: Decimal,
    pub urgent: Decimal,
    pub emergency: Decimal,
}

impl Default for UrgencyMultipliers {
    fn default() -> Self {
        Self { standard: Decimal::ONE, urgent: Decimal::new(125, 2), emergency: Decimal::new(15, 1) }
    }
}

impl UrgencyMultipliers {
    pub fn get(&self, urgency: Urgency) -> Decimal {
        match urgency {
            Urgency::Standard => self.standard,
            Urgency::Urgent => self.urgent,
            Urgency::Emergency => self.emergency,
        }
    }

    fn validate(&self) -> Result<(), InvalidRules> {
        if self.standard < Decimal::ONE || self.urgent < self.standard || self.emergency < self.urgent
        {
            return Err(InvalidRules(
                "urgency multipliers must satisfy 1 <= standard <= urgent <= emergency".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginRules {
    pub base: Decimal,
    pub floor: Decimal,
    pub ceiling: Decimal,
    pub simple: Decimal,
    pub moderate: Decimal,
    pub complex: Decimal,
    pub budget: Decimal,
    pub standard: Decimal,
    pub premium: Decimal,
    pub luxury: Decimal,
}

impl Default for MarginRules {
    fn default() -> Self {
        Self {
            base: Decimal::new(15, 2),
            floor: Decimal::new(15, 2),
            ceiling: Decimal::new(30, 2),
            simple: Decimal::ZERO,
            moderate: Decimal::new(2, 2),
            complex: Decimal::new(5, 2),
            budget: Decimal::new(-2, 2),
            standard: Decimal::ZERO,
            premium: Decimal::new(5, 2),
            luxury: Decimal::new(10, 2),
        }
    }
}

impl MarginRules {
    pub fn complexity_adjustment(&self, complexity: Complexity) -> Decimal {
        match complexity {
            Complexity::Simple => self.simple,
            Complexity::Moderate => self.moderate,
            Complexity::Complex => self.complex,
        }
    }

    pub fn budget_adjustment(&self, tier: BudgetTier) -> Decimal {
        match tier {
            BudgetTier::Budget => self.budget,
            BudgetTier::Standard => self.standard,
            BudgetTier::Premium => self.premium,
            BudgetTier::Luxury => self.luxury,
        }
    }

    fn validate(&self) -> Result<(), InvalidRules> {
        if self.floor.is_sign_negative() || self.ceiling > Decimal::ONE || self.floor > self.ceiling {
            return Err(InvalidRules(
                "margin band must satisfy 0 <= floor <= ceiling <= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxRules {
    /// Certified energy-efficiency renovation.
    pub reduced_rate: Decimal,
    /// Renovation of an established dwelling.
    pub intermediate_rate: Decimal,
    /// Everything else, including the fallback.
    pub standard_rate: Decimal,
    /// Boiler installs on or after this date are taxed at the standard rate.
    pub boiler_cutoff: NaiveDate,
    pub min_dwelling_age_years: u32,
}

impl Default for TaxRules {
    fn default() -> Self {
        Self {
            reduced_rate: Decimal::new(55, 3),
            intermediate_rate: Decimal::new(10, 2),
            standard_rate: Decimal::new(20, 2),
            boiler_cutoff: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap_or_default(),
            min_dwelling_age_years: 2,
        }
    }
}

impl TaxRules {
    fn validate(&self) -> Result<(), InvalidRules> {
        for (name, rate) in [
            ("reduced_rate", self.reduced_rate),
            ("intermediate_rate", self.intermediate_rate),
            ("standard_rate", self.standard_rate),
        ] {
            if rate.is_sign_negative() || rate > Decimal::ONE {
                return Err(InvalidRules(format!("tax.{name} must be within 0..=1")));
            }
        }
        Ok(())
    }
}

/// Weights of the three confidence sub-scores; they must sum to 1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub clarity: f64,
    pub material_availability: f64,
    pub labor_accuracy: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self { clarity: 0.40, material_availability: 0.30, labor_accuracy: 0.30 }
    }
}

impl ConfidenceWeights {
    fn validate(&self) -> Result<(), InvalidRules> {
        let weights = [self.clarity, self.material_availability, self.labor_accuracy];
        if weights.iter().any(|weight| !(0.0..=1.0).contains(weight)) {
            return Err(InvalidRules("confidence weights must be within 0..=1".to_string()));
        }
        if (weights.iter().sum::<f64>() - 1.0).abs() > 1e-9 {
            return Err(InvalidRules("confidence weights must sum to 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationRules {
    /// Share of labor hours that cannot overlap with other work.
    pub overlap_factor: Decimal,
    pub hours_per_day: Decimal,
}

impl Default for DurationRules {
    fn default() -> Self {
        Self { overlap_factor: Decimal::new(7, 1), hours_per_day: Decimal::new(8, 0) }
    }
}

impl DurationRules {
    fn validate(&self) -> Result<(), InvalidRules> {
        if self.overlap_factor <= Decimal::ZERO || self.hours_per_day <= Decimal::ZERO {
            return Err(InvalidRules(
                "duration.overlap_factor and duration.hours_per_day must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{ComplexityMultipliers, ConfidenceWeights, MarginRules, PricingRules};

    #[test]
    fn defaults_are_valid() {
        assert_eq!(PricingRules::default().validate(), Ok(()));
    }

    #[test]
    fn non_monotonic_complexity_is_rejected() {
        let rules = PricingRules {
            complexity: ComplexityMultipliers {
                simple: Decimal::ONE,
                moderate: Decimal::new(14, 1),
                complex: Decimal::new(13, 1),
            },
            ..PricingRules::default()
        };
        let error = rules.validate().expect_err("moderate > complex");
        assert!(error.0.contains("simple < moderate < complex"));
    }

    #[test]
    fn inverted_margin_band_is_rejected() {
        let rules = PricingRules {
            margin: MarginRules {
                floor: Decimal::new(40, 2),
                ..MarginRules::default()
            },
            ..PricingRules::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn confidence_weights_must_sum_to_one() {
        let rules = PricingRules {
            confidence: ConfidenceWeights { clarity: 0.5, ..ConfidenceWeights::default() },
            ..PricingRules::default()
        };
        let error = rules.validate().expect_err("weights sum to 1.1");
        assert!(error.0.contains("sum to 1"));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let rules: PricingRules = toml::from_str(
            r#"
[complexity]
moderate = 1.2

[tax]
boiler_cutoff = "2026-01-01"
"#,
        )
        .expect("partial rules parse");

        assert_eq!(rules.complexity.moderate, Decimal::new(12, 1));
        assert_eq!(rules.complexity.complex, Decimal::new(13, 1));
        assert_eq!(rules.tax.boiler_cutoff.to_string(), "2026-01-01");
        assert_eq!(rules.tax.min_dwelling_age_years, 2);
        assert_eq!(rules.margin, MarginRules::default());
    }
}
