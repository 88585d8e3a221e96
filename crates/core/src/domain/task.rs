use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::PricingError;

/// Closed set of work categories the engine knows how to price.
///
/// Each category maps through the reference data's labor-standard table to a
/// base hours-per-unit figure and a skill level. Adding a category means adding a
/// variant here and a row in the table; no calculator changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Demolition,
    TileRemoval,
    Plumbing,
    Electrical,
    Tiling,
    Painting,
    Flooring,
    Waterproofing,
    FixtureInstallation,
    Insulation,
    Ventilation,
    HeatPump,
    SolarPanels,
    BoilerInstallation,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 14] = [
        Self::Demolition,
        Self::TileRemoval,
        Self::Plumbing,
        Self::Electrical,
        Self::Tiling,
        Self::Painting,
        Self::Flooring,
        Self::Waterproofing,
        Self::FixtureInstallation,
        Self::Insulation,
        Self::Ventilation,
        Self::HeatPump,
        Self::SolarPanels,
        Self::BoilerInstallation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Demolition => "demolition",
            Self::TileRemoval => "tile_removal",
            Self::Plumbing => "plumbing",
            Self::Electrical => "electrical",
            Self::Tiling => "tiling",
            Self::Painting => "painting",
            Self::Flooring => "flooring",
            Self::Waterproofing => "waterproofing",
            Self::FixtureInstallation => "fixture_installation",
            Self::Insulation => "insulation",
            Self::Ventilation => "ventilation",
            Self::HeatPump => "heat_pump",
            Self::SolarPanels => "solar_panels",
            Self::BoilerInstallation => "boiler_installation",
        }
    }

    /// Work eligible for the reduced energy-renovation VAT rate when certified.
    pub fn is_energy_efficiency(self) -> bool {
        matches!(
            self,
            Self::Insulation
                | Self::Ventilation
                | Self::HeatPump
                | Self::SolarPanels
                | Self::BoilerInstallation
        )
    }

    /// Fossil-fuel boiler and heating installs, subject to the boiler cutoff date.
    pub fn is_boiler_installation(self) -> bool {
        matches!(self, Self::BoilerInstallation)
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = PricingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let category = match normalized.as_str() {
            "demolition" | "demo" => Self::Demolition,
            "tile_removal" | "remove_tiles" | "remove_old_tiles" => Self::TileRemoval,
            "plumbing" | "plumbing_work" | "redo_plumbing" => Self::Plumbing,
            "electrical" | "electrical_work" | "rewiring" => Self::Electrical,
            "tiling" | "tile_installation" | "lay_tiles" => Self::Tiling,
            "painting" | "paint" | "repaint" => Self::Painting,
            "flooring" | "floor_installation" | "lay_flooring" => Self::Flooring,
            "waterproofing" | "waterproof" => Self::Waterproofing,
            "fixture_installation" | "fixtures" | "install_fixtures" => Self::FixtureInstallation,
            "insulation" => Self::Insulation,
            "ventilation" => Self::Ventilation,
            "heat_pump" => Self::HeatPump,
            "solar_panels" | "solar" => Self::SolarPanels,
            "boiler_installation" | "boiler" | "gas_boiler" | "oil_boiler" => {
                Self::BoilerInstallation
            }
            _ => return Err(PricingError::UnknownTaskCategory { category: value.to_string() }),
        };
        Ok(category)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    pub const ALL: [Complexity; 3] = [Self::Simple, Self::Moderate, Self::Complex];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    Budget,
    Standard,
    Premium,
    Luxury,
}

impl BudgetTier {
    pub const ALL: [BudgetTier; 4] = [Self::Budget, Self::Standard, Self::Premium, Self::Luxury];

    /// Material quality used when a requirement does not name one explicitly.
    pub fn default_quality(self) -> QualityTier {
        match self {
            Self::Budget | Self::Standard => QualityTier::Basic,
            Self::Premium => QualityTier::Premium,
            Self::Luxury => QualityTier::Luxury,
        }
    }
}

impl fmt::Display for BudgetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Budget => "budget",
            Self::Standard => "standard",
            Self::Premium => "premium",
            Self::Luxury => "luxury",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Basic,
    Premium,
    Luxury,
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Luxury => "luxury",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Standard,
    Urgent,
    Emergency,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    #[default]
    Renovation,
    Maintenance,
    Transformation,
    NewConstruction,
    Extension,
}

impl WorkType {
    pub fn is_renovation(self) -> bool {
        matches!(self, Self::Renovation | Self::Maintenance | Self::Transformation)
    }
}

/// Facts about the dwelling and the work that drive VAT classification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxContext {
    pub work_type: WorkType,
    pub residential: bool,
    pub dwelling_age_years: u32,
    pub energy_certified: bool,
    pub installation_date: Option<NaiveDate>,
}

impl Default for TaxContext {
    fn default() -> Self {
        Self {
            work_type: WorkType::Renovation,
            residential: true,
            dwelling_age_years: 10,
            energy_certified: false,
            installation_date: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaritySignals {
    /// Overall clarity of the source description, 0..=1.
    pub description_clarity: f64,
    /// How clearly this particular task was described, 0..=1.
    pub task_clarity: f64,
    pub dimensions_provided: bool,
    pub budget_specified: bool,
    pub timeline_specified: bool,
}

impl Default for ClaritySignals {
    fn default() -> Self {
        Self {
            description_clarity: 0.7,
            task_clarity: 0.5,
            dimensions_provided: false,
            budget_specified: false,
            timeline_specified: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaborSignals {
    /// Falls back to the category's standardization from the reference table.
    pub task_standardization: Option<f64>,
    pub complexity_certainty: f64,
    pub local_rates_available: bool,
    pub skill_clarity: f64,
}

impl Default for LaborSignals {
    fn default() -> Self {
        Self {
            task_standardization: None,
            complexity_certainty: 0.7,
            local_rates_available: true,
            skill_clarity: 0.8,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceSignals {
    pub clarity: ClaritySignals,
    pub labor: LaborSignals,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    pub material: String,
    /// Area or count to cover, in the material's coverage unit.
    pub coverage: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityTier>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub zone: String,
    pub category: TaskCategory,
    pub quantity: Decimal,
    pub budget_tier: BudgetTier,
    pub complexity: Complexity,
    pub materials: Vec<MaterialRequirement>,
    pub tax: TaxContext,
    pub signals: ConfidenceSignals,
    pub urgency: Urgency,
}

impl Task {
    pub fn quality_for(&self, requirement: &MaterialRequirement) -> QualityTier {
        requirement.quality.unwrap_or_else(|| self.budget_tier.default_quality())
    }
}

/// Loosely-typed task as produced by an upstream parser or a JSON request file.
///
/// Required fields are optional here so that a missing one surfaces as
/// `MalformedTaskInput` instead of a generic deserialization failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskInput {
    pub name: Option<String>,
    pub zone: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<Decimal>,
    pub budget_tier: Option<BudgetTier>,
    pub complexity: Option<Complexity>,
    pub materials: Vec<MaterialRequirement>,
    pub tax: TaxContext,
    pub signals: ConfidenceSignals,
    pub urgency: Urgency,
}

impl TaskInput {
    pub fn into_task(self) -> Result<Task, PricingError> {
        let name = required_text(self.name, "name")?;
        let zone = required_text(self.zone, "zone")?;
        let category = required_text(self.category, "category")?.parse::<TaskCategory>()?;
        let quantity = self.quantity.ok_or_else(|| missing("quantity"))?;
        if quantity.is_sign_negative() {
            return Err(PricingError::MalformedTaskInput {
                field: "quantity".to_string(),
                reason: format!("must be non-negative, got {quantity}"),
            });
        }
        let budget_tier = self.budget_tier.ok_or_else(|| missing("budget_tier"))?;
        let complexity = self.complexity.ok_or_else(|| missing("complexity"))?;

        for requirement in &self.materials {
            if requirement.material.trim().is_empty() {
                return Err(missing("materials[].material"));
            }
        }

        Ok(Task {
            name,
            zone,
            category,
            quantity,
            budget_tier,
            complexity,
            materials: self.materials,
            tax: self.tax,
            signals: self.signals,
            urgency: self.urgency,
        })
    }

    /// Best available label for error reporting before the task is validated.
    pub fn label(&self, index: usize) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("task #{index}"))
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String, PricingError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| missing(field))
}

fn missing(field: &str) -> PricingError {
    PricingError::MalformedTaskInput {
        field: field.to_string(),
        reason: "is required".to_string(),
    }
}
