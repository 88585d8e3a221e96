//! VAT classification for renovation work.
//!
//! Rules are evaluated in priority order and the first match wins. The
//! classifier never fails: anything the table does not recognise falls through
//! to the standard rate.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::task::{TaskCategory, TaxContext};
use crate::pricing::rules::TaxRules;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VatRule {
    EnergyEfficiency,
    BoilerCutoff,
    DwellingRenovation,
    StandardFallback,
}

impl VatRule {
    pub fn explanation(self) -> &'static str {
        match self {
            Self::EnergyEfficiency => "reduced rate: certified energy-efficiency renovation",
            Self::BoilerCutoff => "standard rate: boiler installation on or after the cutoff date",
            Self::DwellingRenovation => "intermediate rate: renovation of an established dwelling",
            Self::StandardFallback => {
                "standard rate: new construction, extension, non-residential or unmatched work"
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxClassification {
    pub rate: Decimal,
    pub rule: VatRule,
}

pub struct TaxClassifier<'a> {
    rules: &'a TaxRules,
}

impl<'a> TaxClassifier<'a> {
    pub fn new(rules: &'a TaxRules) -> Self {
        Self { rules }
    }

    /// `reference_date` is used when the context carries no installation date.
    pub fn classify(
        &self,
        category: TaskCategory,
        context: &TaxContext,
        reference_date: NaiveDate,
    ) -> TaxClassification {
        let rule = self.matching_rule(category, context, reference_date);
        let rate = match rule {
            VatRule::EnergyEfficiency => self.rules.reduced_rate,
            VatRule::DwellingRenovation => self.rules.intermediate_rate,
            VatRule::BoilerCutoff | VatRule::StandardFallback => self.rules.standard_rate,
        };
        TaxClassification { rate, rule }
    }

    fn matching_rule(
        &self,
        category: TaskCategory,
        context: &TaxContext,
        reference_date: NaiveDate,
    ) -> VatRule {
        let installed_on = context.installation_date.unwrap_or(reference_date);
        let boiler_cutoff_applies =
            category.is_boiler_installation() && installed_on >= self.rules.boiler_cutoff;

        // Certification never rescues a boiler past the cutoff.
        if category.is_energy_efficiency() && context.energy_certified && !boiler_cutoff_applies {
            return VatRule::EnergyEfficiency;
        }
        if boiler_cutoff_applies {
            return VatRule::BoilerCutoff;
        }
        if context.work_type.is_renovation()
            && context.residential
            && context.dwelling_age_years >= self.rules.min_dwelling_age_years
        {
            return VatRule::DwellingRenovation;
        }
        VatRule::StandardFallback
    }
}
