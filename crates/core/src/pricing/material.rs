
use crate::domain::quote::MaterialLine;
use crate::domain::task::{MaterialRequirement, QualityTier};
use crate::errors::PricingError;
use crate::reference::{MaterialRecord, ReferenceDataProvider};

pub struct MaterialCostCalculator<'a, R: ?Sized> {
    reference: &'a R,
}

impl<'a, R> MaterialCostCalculator<'a, R>
where
    R: ReferenceDataProvider + ?Sized,
{
    pub fn new(reference: &'a R) -> Self {
        Self { reference }
    }

    pub fn record(&self, material: &str) -> Result<&'a MaterialRecord, PricingError> {
        self.reference
            .material(material)
            .ok_or_else(|| PricingError::UnknownMaterial { material: material.to_string() })
    }

    /// Prices one requirement. Partial purchase units are not sold, so the
    /// quantity is always rounded up.
    pub fn price(
        &self,
        requirement: &MaterialRequirement,
        quality: QualityTier,
    ) -> Result<MaterialLine, PricingError> {
        let record = self.record(&requirement.material)?;
        let multiplier = record.quality_multipliers.get(quality).ok_or_else(|| {
            PricingError::InvalidQualityTier { material: record.name.clone(), tier: quality }
        })?;

        if requirement.coverage.is_sign_negative() {
            return Err(PricingError::MalformedTaskInput {
                field: "materials[].coverage".to_string(),
                reason: format!("must be non-negative, got {}", requirement.coverage),
            });
        }

        let too_large = || PricingError::too_large("materials[].coverage");
        let unit_price = record.base_price.checked_mul(multiplier).ok_or_else(too_large)?;
        let quantity = requirement
            .coverage
            .checked_div(record.coverage_per_unit)
            .ok_or_else(too_large)?
            .ceil();
        let total = quantity.checked_mul(unit_price).ok_or_else(too_large)?;

        Ok(MaterialLine { name: record.name.clone(), quantity, unit_price, total })
    }
}
