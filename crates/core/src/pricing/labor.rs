use rust_decimal::Decimal;

use crate::domain::quote::LaborLine;
use crate::domain::task::{Complexity, TaskCategory, Urgency};
use crate::errors::PricingError;
use crate::pricing::rules::{DurationRules, PricingRules};
use crate::reference::{ReferenceDataProvider, SkillLevel};

#[derive(Clone, Debug, PartialEq)]
pub struct LaborEstimate {
    pub line: LaborLine,
    pub skill_level: SkillLevel,
    /// Category default for the labor-accuracy confidence signal.
    pub standardization: f64,
}

pub struct LaborCostCalculator<'a, R: ?Sized> {
    reference: &'a R,
    rules: &'a PricingRules,
}

impl<'a, R> LaborCostCalculator<'a, R>
where
    R: ReferenceDataProvider + ?Sized,
{
    pub fn new(reference: &'a R, rules: &'a PricingRules) -> Self {
        Self { reference, rules }
    }

    pub fn estimate(
        &self,
        category: TaskCategory,
        quantity: Decimal,
        complexity: Complexity,
        urgency: Urgency,
    ) -> Result<LaborEstimate, PricingError> {
        let standard = self.reference.labor_standard(category).ok_or_else(|| {
            PricingError::UnknownTaskCategory { category: category.to_string() }
        })?;
        let hourly_rate = self
            .reference
            .hourly_rate(standard.skill_level)
            .ok_or(PricingError::MissingLaborRate { skill: standard.skill_level })?;

        let hours = standard
            .hours_per_unit
            .checked_mul(quantity)
            .and_then(|hours| hours.checked_mul(self.rules.complexity.get(complexity)))
            .ok_or_else(|| PricingError::too_large("quantity"))?;
        let rate = hourly_rate
            .checked_mul(self.rules.urgency.get(urgency))
            .ok_or_else(|| PricingError::too_large("urgency"))?;
        let total = hours.checked_mul(rate).ok_or_else(|| PricingError::too_large("quantity"))?;

        Ok(LaborEstimate {
            line: LaborLine { hours, rate, total },
            skill_level: standard.skill_level,
            standardization: standard.standardization,
        })
    }
}

/// Human-readable calendar estimate for a number of labor hours.
pub fn estimate_duration(hours: Decimal, rules: &DurationRules) -> String {
    let days = hours
        .checked_mul(rules.overlap_factor)
        .and_then(|scaled| scaled.checked_div(rules.hours_per_day))
        .unwrap_or(Decimal::MAX);
    let five = Decimal::new(5, 0);

    if days <= Decimal::ONE {
        "1 day".to_string()
    } else if days <= Decimal::TWO {
        "1-2 days".to_string()
    } else if days <= five {
        let low = days.floor();
        format!("{low}-{} days", low + Decimal::ONE)
    } else if days <= Decimal::TEN {
        "1-2 weeks".to_string()
    } else {
        let low = (days / five).floor();
        format!("{low}-{} weeks", low + Decimal::ONE)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{estimate_duration, LaborCostCalculator};
    use crate::domain::task::{Complexity, TaskCategory, Urgency};
    use crate::errors::PricingError;
    use crate::pricing::rules::{DurationRules, PricingRules};
    use crate::reference::{ReferenceCatalog, SkillLevel};

    fn catalog() -> ReferenceCatalog {
        ReferenceCatalog::from_toml_str(
            r#"
version = "test"

[[labor_rates]]
skill_level = "skilled"
hourly_rate = 45

[[labor_standards]]
category = "tiling"
hours_per_unit = 2.5
skill_level = "skilled"
standardization = 0.8
"#,
        )
        .expect("fixture is valid")
    }

    #[test]
    fn moderate_tiling_scenario() {
        let catalog = catalog();
        let rules = PricingRules::default();
        let estimate = LaborCostCalculator::new(&catalog, &rules)
            .estimate(TaskCategory::Tiling, Decimal::new(10, 0), Complexity::Moderate, Urgency::Standard)
            .expect("priced");

        assert_eq!(estimate.line.hours, Decimal::new(2875, 2));
        assert_eq!(estimate.line.rate, Decimal::new(45, 0));
        assert_eq!(estimate.line.total, Decimal::new(129375, 2));
        assert_eq!(estimate.skill_level, SkillLevel::Skilled);
    }

    #[test]
    fn complexity_increases_hours_monotonically() {
        let catalog = catalog();
        let rules = PricingRules::default();
        let calculator = LaborCostCalculator::new(&catalog, &rules);
        let hours = Complexity::ALL.map(|complexity| {
            calculator
                .estimate(TaskCategory::Tiling, Decimal::new(4, 0), complexity, Urgency::Standard)
                .map(|estimate| estimate.line.hours)
                .unwrap_or_default()
        });

        assert_eq!(hours[0], Decimal::new(10, 0));
        assert!(hours[0] < hours[1] && hours[1] < hours[2]);
    }

    #[test]
    fn urgency_raises_rate_not_hours() {
        let catalog = catalog();
        let rules = PricingRules::default();
        let estimate = LaborCostCalculator::new(&catalog, &rules)
            .estimate(TaskCategory::Tiling, Decimal::new(2, 0), Complexity::Simple, Urgency::Urgent)
            .expect("priced");

        assert_eq!(estimate.line.hours, Decimal::new(5, 0));
        assert_eq!(estimate.line.rate, Decimal::new(5625, 2));
        assert_eq!(estimate.line.total, Decimal::new(28125, 2));
    }

    #[test]
    fn category_without_standard_fails() {
        let catalog = catalog();
        let rules = PricingRules::default();
        let error = LaborCostCalculator::new(&catalog, &rules)
            .estimate(TaskCategory::Plumbing, Decimal::ONE, Complexity::Simple, Urgency::Standard)
            .expect_err("plumbing is not in the fixture table");
        assert_eq!(error, PricingError::UnknownTaskCategory { category: "plumbing".to_string() });
    }

    #[test]
    fn quantity_beyond_money_range_is_malformed() {
        let catalog = catalog();
        let rules = PricingRules::default();
        let error = LaborCostCalculator::new(&catalog, &rules)
            .estimate(TaskCategory::Tiling, Decimal::MAX, Complexity::Simple, Urgency::Standard)
            .expect_err("hours overflow");
        assert_eq!(error.kind(), "malformed_task_input");
        assert!(error.to_string().contains("`quantity` is too large to price"));
    }

    #[test]
    fn duration_bands() {
        let rules = DurationRules::default();
        assert_eq!(estimate_duration(Decimal::ZERO, &rules), "1 day");
        assert_eq!(estimate_duration(Decimal::new(20, 0), &rules), "1-2 days");
        assert_eq!(estimate_duration(Decimal::new(2875, 2), &rules), "2-3 days");
        assert_eq!(estimate_duration(Decimal::new(80, 0), &rules), "1-2 weeks");
        assert_eq!(estimate_duration(Decimal::new(200, 0), &rules), "3-4 weeks");
        assert!(estimate_duration(Decimal::MAX, &rules).ends_with("weeks"));
    }
}
