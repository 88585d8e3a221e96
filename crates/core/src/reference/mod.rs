//! Read-only material and labor lookup tables.
//!
//! The tables are loaded once from a versioned TOML artifact and then only read.
//! Calculators receive them through [`ReferenceDataProvider`] so tests can swap in
//! small fixtures.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::task::{QualityTier, TaskCategory};

const BUILTIN_REFERENCE_DATA: &str = include_str!("../../data/reference_data.toml");

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Unskilled,
    SemiSkilled,
    Skilled,
    Specialist,
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unskilled => "unskilled",
            Self::SemiSkilled => "semi_skilled",
            Self::Skilled => "skilled",
            Self::Specialist => "specialist",
        })
    }
}

/// How a category's quantity is counted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaborUnit {
    #[default]
    SquareMeter,
    Fixture,
    Point,
    Unit,
}

impl LaborUnit {
    /// Task quantity implied by a room's floor area.
    pub fn quantity_for_area(self, area: Decimal) -> Decimal {
        match self {
            Self::SquareMeter => area,
            Self::Fixture => (area / Decimal::TWO).floor().max(Decimal::ONE),
            Self::Point => area.floor().max(Decimal::TWO),
            Self::Unit => Decimal::ONE,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityMultipliers {
    pub basic: Option<Decimal>,
    pub premium: Option<Decimal>,
    pub luxury: Option<Decimal>,
}

impl QualityMultipliers {
    pub fn get(&self, tier: QualityTier) -> Option<Decimal> {
        match tier {
            QualityTier::Basic => self.basic,
            QualityTier::Premium => self.premium,
            QualityTier::Luxury => self.luxury,
        }
    }

    fn entries(&self) -> impl Iterator<Item = (QualityTier, Decimal)> + '_ {
        [QualityTier::Basic, QualityTier::Premium, QualityTier::Luxury]
            .into_iter()
            .filter_map(|tier| self.get(tier).map(|multiplier| (tier, multiplier)))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub supplier: Option<String>,
    pub base_price: Decimal,
    pub quality_multipliers: QualityMultipliers,
    pub availability_score: f64,
    pub coverage_per_unit: Decimal,
    #[serde(default = "default_price_stability")]
    pub price_stability: f64,
    #[serde(default = "default_supplier_reliability")]
    pub supplier_reliability: f64,
}

fn default_price_stability() -> f64 {
    0.8
}

fn default_supplier_reliability() -> f64 {
    0.85
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborRate {
    pub skill_level: SkillLevel,
    pub hourly_rate: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaborStandard {
    pub category: TaskCategory,
    pub hours_per_unit: Decimal,
    pub skill_level: SkillLevel,
    #[serde(default)]
    pub unit: LaborUnit,
    /// How repeatable this kind of work is, used as the default labor-accuracy signal.
    #[serde(default = "default_standardization")]
    pub standardization: f64,
}

fn default_standardization() -> f64 {
    0.75
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleItem {
    pub material: String,
    /// Coverage required per unit of task quantity.
    #[serde(default)]
    pub coverage_factor: Decimal,
    /// Coverage required regardless of task quantity.
    #[serde(default)]
    pub fixed_coverage: Decimal,
}

impl BundleItem {
    pub fn coverage_for(&self, quantity: Decimal) -> Decimal {
        self.fixed_coverage + self.coverage_factor * quantity
    }
}

/// Materials a category typically consumes, used when a task list arrives
/// without explicit material requirements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialBundle {
    pub category: TaskCategory,
    pub items: Vec<BundleItem>,
}

pub trait ReferenceDataProvider: Send + Sync {
    fn material(&self, name: &str) -> Option<&MaterialRecord>;
    fn hourly_rate(&self, skill: SkillLevel) -> Option<Decimal>;
    fn labor_standard(&self, category: TaskCategory) -> Option<&LaborStandard>;

    fn bundle(&self, _category: TaskCategory) -> Option<&MaterialBundle> {
        None
    }
}

#[derive(Debug, Error)]
pub enum ReferenceDataError {
    #[error("could not read reference data `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse reference data: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("reference data version must not be empty")]
    MissingVersion,
    #[error("material `{0}` is listed more than once")]
    DuplicateMaterial(String),
    #[error("material `{material}` is invalid: {reason}")]
    InvalidMaterial { material: String, reason: String },
    #[error("labor rate for `{0}` is listed more than once")]
    DuplicateLaborRate(SkillLevel),
    #[error("labor rate for `{skill}` is invalid: {reason}")]
    InvalidLaborRate { skill: SkillLevel, reason: String },
    #[error("labor standard for `{category}` is invalid: {reason}")]
    InvalidLaborStandard { category: TaskCategory, reason: String },
    #[error("labor standard for `{category}` needs a `{skill}` rate that is not defined")]
    MissingLaborRate { category: TaskCategory, skill: SkillLevel },
    #[error("bundle for `{category}` references unknown material `{material}`")]
    UnknownBundleMaterial { category: TaskCategory, material: String },
}

#[derive(Debug, Deserialize)]
struct ReferenceFile {
    version: String,
    #[serde(default)]
    materials: Vec<MaterialRecord>,
    #[serde(default)]
    labor_rates: Vec<LaborRate>,
    #[serde(default)]
    labor_standards: Vec<LaborStandard>,
    #[serde(default)]
    bundles: Vec<MaterialBundle>,
}

/// Validated, immutable reference tables.
#[derive(Clone, Debug, Default)]
pub struct ReferenceCatalog {
    version: String,
    materials: BTreeMap<String, MaterialRecord>,
    labor_rates: BTreeMap<SkillLevel, Decimal>,
    labor_standards: BTreeMap<TaskCategory, LaborStandard>,
    bundles: BTreeMap<TaskCategory, MaterialBundle>,
}

impl ReferenceCatalog {
    /// Tables compiled into the binary.
    pub fn builtin() -> Result<Self, ReferenceDataError> {
        Self::from_toml_str(BUILTIN_REFERENCE_DATA)
    }

    pub fn load(path: &Path) -> Result<Self, ReferenceDataError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ReferenceDataError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ReferenceDataError> {
        let file = toml::from_str::<ReferenceFile>(raw)?;
        Self::from_parts(
            file.version,
            file.materials,
            file.labor_rates,
            file.labor_standards,
            file.bundles,
        )
    }

    pub fn from_parts(
        version: impl Into<String>,
        materials: Vec<MaterialRecord>,
        labor_rates: Vec<LaborRate>,
        labor_standards: Vec<LaborStandard>,
        bundles: Vec<MaterialBundle>,
    ) -> Result<Self, ReferenceDataError> {
        let version = version.into().trim().to_string();
        if version.is_empty() {
            return Err(ReferenceDataError::MissingVersion);
        }

        let mut catalog = Self { version, ..Self::default() };

        for record in materials {
            validate_material(&record)?;
            let key = material_key(&record.name);
            if catalog.materials.contains_key(&key) {
                return Err(ReferenceDataError::DuplicateMaterial(record.name));
            }
            catalog.materials.insert(key, record);
        }

        for rate in labor_rates {
            if rate.hourly_rate.is_sign_negative() {
                return Err(ReferenceDataError::InvalidLaborRate {
                    skill: rate.skill_level,
                    reason: "hourly_rate must be non-negative".to_string(),
                });
            }
            if catalog.labor_rates.insert(rate.skill_level, rate.hourly_rate).is_some() {
                return Err(ReferenceDataError::DuplicateLaborRate(rate.skill_level));
            }
        }

        for standard in labor_standards {
            validate_standard(&standard)?;
            if !catalog.labor_rates.contains_key(&standard.skill_level) {
                return Err(ReferenceDataError::MissingLaborRate {
                    category: standard.category,
                    skill: standard.skill_level,
                });
            }
            catalog.labor_standards.insert(standard.category, standard);
        }

        for bundle in bundles {
            if let Some(item) =
                bundle.items.iter().find(|item| catalog.material(&item.material).is_none())
            {
                return Err(ReferenceDataError::UnknownBundleMaterial {
                    category: bundle.category,
                    material: item.material.clone(),
                });
            }
            catalog.bundles.insert(bundle.category, bundle);
        }

        Ok(catalog)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn materials(&self) -> impl Iterator<Item = &MaterialRecord> {
        self.materials.values()
    }

    pub fn labor_rates(&self) -> impl Iterator<Item = LaborRate> + '_ {
        self.labor_rates
            .iter()
            .map(|(skill_level, hourly_rate)| LaborRate { skill_level: *skill_level, hourly_rate: *hourly_rate })
    }

    pub fn labor_standards(&self) -> impl Iterator<Item = &LaborStandard> {
        self.labor_standards.values()
    }

    /// Categories the enum knows about but the table does not price.
    pub fn unpriced_categories(&self) -> Vec<TaskCategory> {
        TaskCategory::ALL
            .into_iter()
            .filter(|category| !self.labor_standards.contains_key(category))
            .collect()
    }

    pub fn bundle_count(&self) -> usize {
        self.bundles.len()
    }
}

impl<T> ReferenceDataProvider for Arc<T>
where
    T: ReferenceDataProvider + ?Sized,
{
    fn material(&self, name: &str) -> Option<&MaterialRecord> {
        (**self).material(name)
    }

    fn hourly_rate(&self, skill: SkillLevel) -> Option<Decimal> {
        (**self).hourly_rate(skill)
    }

    fn labor_standard(&self, category: TaskCategory) -> Option<&LaborStandard> {
        (**self).labor_standard(category)
    }

    fn bundle(&self, category: TaskCategory) -> Option<&MaterialBundle> {
        (**self).bundle(category)
    }
}

impl ReferenceDataProvider for ReferenceCatalog {
    fn material(&self, name: &str) -> Option<&MaterialRecord> {
        self.materials.get(&material_key(name))
    }

    fn hourly_rate(&self, skill: SkillLevel) -> Option<Decimal> {
        self.labor_rates.get(&skill).copied()
    }

    fn labor_standard(&self, category: TaskCategory) -> Option<&LaborStandard> {
        self.labor_standards.get(&category)
    }

    fn bundle(&self, category: TaskCategory) -> Option<&MaterialBundle> {
        self.bundles.get(&category)
    }
}

fn material_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn validate_material(record: &MaterialRecord) -> Result<(), ReferenceDataError> {
    let invalid = |reason: &str| ReferenceDataError::InvalidMaterial {
        material: record.name.clone(),
        reason: reason.to_string(),
    };

    if record.name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if record.base_price.is_sign_negative() {
        return Err(invalid("base_price must be non-negative"));
    }
    if record.coverage_per_unit <= Decimal::ZERO {
        return Err(invalid("coverage_per_unit must be greater than zero"));
    }
    if record.quality_multipliers.entries().next().is_none() {
        return Err(invalid("at least one quality multiplier is required"));
    }
    if record.quality_multipliers.entries().any(|(_, multiplier)| multiplier < Decimal::ONE) {
        return Err(invalid("quality multipliers must be >= 1"));
    }
    for (field, value) in [
        ("availability_score", record.availability_score),
        ("price_stability", record.price_stability),
        ("supplier_reliability", record.supplier_reliability),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid(&format!("{field} must be within 0..=1")));
        }
    }

    Ok(())
}

fn validate_standard(standard: &LaborStandard) -> Result<(), ReferenceDataError> {
    if standard.hours_per_unit.is_sign_negative() {
        return Err(ReferenceDataError::InvalidLaborStandard {
            category: standard.category,
            reason: "hours_per_unit must be non-negative".to_string(),
        });
    }
    if !(0.0..=1.0).contains(&standard.standardization) {
        return Err(ReferenceDataError::InvalidLaborStandard {
            category: standard.category,
            reason: "standardization must be within 0..=1".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        LaborUnit, QualityMultipliers, ReferenceCatalog, ReferenceDataError,
        ReferenceDataProvider, SkillLevel,
    };
    use crate::domain::task::{QualityTier, TaskCategory};

    const FIXTURE: &str = r#"
version = "test-1"

[[materials]]
name = "Ceramic Tile"
category = "tiles"
base_price = 20
availability_score = 0.9
coverage_per_unit = 1
quality_multipliers = { basic = 1.0, premium = 1.5 }

[[labor_rates]]
skill_level = "skilled"
hourly_rate = 45

[[labor_standards]]
category = "tiling"
hours_per_unit = 2.5
skill_level = "skilled"

[[bundles]]
category = "tiling"
items = [{ material = "ceramic tile", coverage_factor = 1.1 }]
"#;

    #[test]
    fn builtin_catalog_loads_and_prices_every_category() {
        let catalog = ReferenceCatalog::builtin().expect("builtin reference data is valid");
        assert!(!catalog.version().is_empty());
        assert!(catalog.unpriced_categories().is_empty());
        for category in TaskCategory::ALL {
            let standard = catalog.labor_standard(category).expect("standard exists");
            assert!(catalog.hourly_rate(standard.skill_level).is_some());
        }
    }

    #[test]
    fn fixture_parses_with_defaults() {
        let catalog = ReferenceCatalog::from_toml_str(FIXTURE).expect("fixture is valid");
        let tile = catalog.material("  ceramic tile ").expect("lookup is case-insensitive");
        assert_eq!(tile.base_price, Decimal::new(20, 0));
        assert_eq!(tile.quality_multipliers.get(QualityTier::Premium), Some(Decimal::new(15, 1)));
        assert_eq!(tile.quality_multipliers.get(QualityTier::Luxury), None);
        assert!((tile.price_stability - 0.8).abs() < f64::EPSILON);

        let standard = catalog.labor_standard(TaskCategory::Tiling).expect("tiling standard");
        assert_eq!(standard.unit, LaborUnit::SquareMeter);
        assert_eq!(catalog.hourly_rate(SkillLevel::Skilled), Some(Decimal::new(45, 0)));
        assert_eq!(catalog.hourly_rate(SkillLevel::Specialist), None);

        let bundle = catalog.bundle(TaskCategory::Tiling).expect("tiling bundle");
        assert_eq!(bundle.items[0].coverage_for(Decimal::new(10, 0)), Decimal::new(11, 0));
        assert_eq!(catalog.unpriced_categories().len(), TaskCategory::ALL.len() - 1);
    }

    #[test]
    fn standard_without_rate_is_rejected() {
        let raw = FIXTURE.replace("skill_level = \"skilled\"\nhourly_rate = 45", "skill_level = \"unskilled\"\nhourly_rate = 25");
        let error = ReferenceCatalog::from_toml_str(&raw).expect_err("skilled rate missing");
        assert!(matches!(
            error,
            ReferenceDataError::MissingLaborRate { category: TaskCategory::Tiling, skill: SkillLevel::Skilled }
        ));
    }

    #[test]
    fn multiplier_below_one_is_rejected() {
        let raw = FIXTURE.replace("premium = 1.5", "premium = 0.5");
        let error = ReferenceCatalog::from_toml_str(&raw).expect_err("multiplier < 1");
        assert!(matches!(error, ReferenceDataError::InvalidMaterial { .. }));
    }

    #[test]
    fn bundle_with_unknown_material_is_rejected() {
        let raw = FIXTURE.replace("material = \"ceramic tile\"", "material = \"marble\"");
        let error = ReferenceCatalog::from_toml_str(&raw).expect_err("unknown bundle material");
        assert!(matches!(error, ReferenceDataError::UnknownBundleMaterial { .. }));
    }

    #[test]
    fn duplicate_material_names_are_rejected() {
        let raw = format!(
            "{FIXTURE}\n[[materials]]\nname = \"CERAMIC TILE\"\ncategory = \"tiles\"\nbase_price = 1\navailability_score = 1.0\ncoverage_per_unit = 1\nquality_multipliers = {{ basic = 1.0 }}\n"
        );
        let error = ReferenceCatalog::from_toml_str(&raw).expect_err("duplicate");
        assert!(matches!(error, ReferenceDataError::DuplicateMaterial(_)));
    }

    #[test]
    fn empty_multipliers_are_rejected() {
        assert_eq!(QualityMultipliers::default().get(QualityTier::Basic), None);
        let raw = FIXTURE.replace("{ basic = 1.0, premium = 1.5 }", "{}");
        let error = ReferenceCatalog::from_toml_str(&raw).expect_err("no multipliers");
        assert!(matches!(error, ReferenceDataError::InvalidMaterial { .. }));
    }

    #[test]
    fn labor_units_derive_quantity_from_area() {
        let area = Decimal::new(55, 1);
        assert_eq!(LaborUnit::SquareMeter.quantity_for_area(area), area);
        assert_eq!(LaborUnit::Fixture.quantity_for_area(area), Decimal::TWO);
        assert_eq!(LaborUnit::Point.quantity_for_area(area), Decimal::new(5, 0));
        assert_eq!(LaborUnit::Unit.quantity_for_area(area), Decimal::ONE);

        let cupboard = Decimal::ONE;
        assert_eq!(LaborUnit::Fixture.quantity_for_area(cupboard), Decimal::ONE);
        assert_eq!(LaborUnit::Point.quantity_for_area(cupboard), Decimal::TWO);
    }

    #[test]
    fn shared_catalog_serves_lookups() {
        let shared = std::sync::Arc::new(ReferenceCatalog::from_toml_str(FIXTURE).expect("fixture"));
        assert_eq!(shared.hourly_rate(SkillLevel::Skilled), Some(Decimal::new(45, 0)));
        assert!(shared.labor_standard(TaskCategory::Tiling).is_some());
    }
}
