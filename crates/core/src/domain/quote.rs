use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::task::{Task, TaskInput};
use crate::errors::QuoteError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborLine {
    pub hours: Decimal,
    pub rate: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricedTask {
    pub name: String,
    pub labor: LaborLine,
    pub materials: Vec<MaterialLine>,
    pub vat_rate: Decimal,
    pub estimated_duration: String,
    pub subtotal: Decimal,
    pub vat_amount: Decimal,
    pub total_price: Decimal,
    pub margin: Decimal,
    pub confidence_score: f64,
}

impl PricedTask {
    pub fn material_total(&self) -> Decimal {
        self.materials.iter().map(|line| line.total).sum()
    }

    /// Sell price implied by the margin, before VAT. Not part of the billed
    /// totals. `None` when it exceeds the representable range.
    pub fn sell_price(&self) -> Option<Decimal> {
        self.subtotal.checked_mul(Decimal::ONE + self.margin)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(skip)]
    pub name: String,
    pub tasks: Vec<PricedTask>,
}

impl Zone {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), tasks: Vec::new() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub quote_id: QuoteId,
    pub client_location: String,
    pub project_summary: String,
    pub zones: BTreeMap<String, Zone>,
    pub global_confidence_score: f64,
    pub total_before_vat: Decimal,
    pub total_vat: Decimal,
    pub grand_total: Decimal,
}

impl Quote {
    pub fn tasks(&self) -> impl Iterator<Item = &PricedTask> {
        self.zones.values().flat_map(|zone| zone.tasks.iter())
    }

    pub fn task_count(&self) -> usize {
        self.zones.values().map(|zone| zone.tasks.len()).sum()
    }
}

/// Validated input to the quote engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub client_location: String,
    pub project_summary: String,
    /// Reference date for date-sensitive tax rules when a task carries none.
    pub quote_date: NaiveDate,
    pub tasks: Vec<Task>,
}

/// Wire shape of a quote request before validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteRequestInput {
    pub client_location: Option<String>,
    pub project_summary: Option<String>,
    pub quote_date: Option<NaiveDate>,
    pub tasks: Vec<TaskInput>,
}

impl QuoteRequestInput {
    pub fn into_request(self, today: NaiveDate) -> Result<QuoteRequest, QuoteError> {
        let client_location = self
            .client_location
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| QuoteError::MalformedRequest { field: "client_location".to_string() })?;
        let project_summary = self.project_summary.unwrap_or_default().trim().to_string();

        if self.tasks.is_empty() {
            return Err(QuoteError::EmptyTaskList);
        }

        let tasks = self
            .tasks
            .into_iter()
            .enumerate()
            .map(|(index, input)| {
                let label = input.label(index);
                input.into_task().map_err(|source| QuoteError::Task { index, task: label, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QuoteRequest {
            client_location,
            project_summary,
            quote_date: self.quote_date.unwrap_or(today),
            tasks,
        })
    }
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}
