use std::path::PathBuf;

use renoquote_core::config::LoadOptions;
use renoquote_core::reference::{LaborRate, LaborUnit};
use renoquote_core::{ReferenceCatalog, SkillLevel, TaskCategory};
use serde::Serialize;

use super::{load_catalog, load_config, CommandResult};

const COMMAND: &str = "reference";

#[derive(Clone, Debug, Default)]
pub struct ReferenceArgs {
    pub reference: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StandardView {
    category: TaskCategory,
    hours_per_unit: String,
    skill_level: SkillLevel,
    unit: LaborUnit,
}

#[derive(Debug, Serialize)]
struct ReferenceDescription {
    source: String,
    version: String,
    material_count: usize,
    labor_rates: Vec<LaborRate>,
    labor_standards: Vec<StandardView>,
    bundle_count: usize,
    unpriced_categories: Vec<TaskCategory>,
}

pub fn run(mut options: LoadOptions, args: &ReferenceArgs) -> CommandResult {
    if args.reference.is_some() {
        options.overrides.reference_path = args.reference.clone();
    }
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let catalog = match load_catalog(COMMAND, &config) {
        Ok(catalog) => catalog,
        Err(result) => return result,
    };

    let source = config
        .reference
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "builtin".to_string());
    let description = describe(&catalog, source);

    if args.json {
        return CommandResult::json(COMMAND, &description, true);
    }
    CommandResult { exit_code: 0, output: render_human(&description) }
}

fn describe(catalog: &ReferenceCatalog, source: String) -> ReferenceDescription {
    ReferenceDescription {
        source,
        version: catalog.version().to_string(),
        material_count: catalog.materials().count(),
        labor_rates: catalog.labor_rates().collect(),
        labor_standards: catalog
            .labor_standards()
            .map(|standard| StandardView {
                category: standard.category,
                hours_per_unit: standard.hours_per_unit.to_string(),
                skill_level: standard.skill_level,
                unit: standard.unit,
            })
            .collect(),
        bundle_count: catalog.bundle_count(),
        unpriced_categories: catalog.unpriced_categories(),
    }
}

fn render_human(description: &ReferenceDescription) -> String {
    let mut lines = vec![
        format!("reference data `{}` (source: {})", description.version, description.source),
        format!("- materials: {}", description.material_count),
        format!("- bundles: {}", description.bundle_count),
        "- labor rates:".to_string(),
    ];
    for rate in &description.labor_rates {
        lines.push(format!("  - {} = {} EUR/h", rate.skill_level, rate.hourly_rate));
    }
    lines.push("- labor standards:".to_string());
    for standard in &description.labor_standards {
        lines.push(format!(
            "  - {} = {} h per {} ({})",
            standard.category,
            standard.hours_per_unit,
            unit_label(standard.unit),
            standard.skill_level
        ));
    }
    if !description.unpriced_categories.is_empty() {
        let names: Vec<_> =
            description.unpriced_categories.iter().map(|category| category.as_str()).collect();
        lines.push(format!("- unpriced categories: {}", names.join(", ")));
    }
    lines.join("\n")
}

fn unit_label(unit: LaborUnit) -> &'static str {
    match unit {
        LaborUnit::SquareMeter => "m2",
        LaborUnit::Fixture => "fixture",
        LaborUnit::Point => "point",
        LaborUnit::Unit => "unit",
    }
}
