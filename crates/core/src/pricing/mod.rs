pub mod confidence;
pub mod labor;
pub mod margin;
pub mod material;
pub mod report;
pub mod rules;
pub mod tax;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::domain::quote::{PricedTask, Quote, QuoteId, QuoteRequest, Zone};
use crate::domain::task::Task;
use crate::errors::{PricingError, QuoteError};
use crate::reference::ReferenceDataProvider;

use self::{
    confidence::{global_confidence, ConfidenceScorer},
    labor::{estimate_duration, LaborCostCalculator},
    margin::MarginEngine,
    material::MaterialCostCalculator,
    report::{QuoteReport, TaskInsight},
    rules::PricingRules,
    tax::TaxClassifier,
};

pub trait QuoteRuntime: Send + Sync {
    fn assemble(&self, request: &QuoteRequest) -> Result<Quote, QuoteError>;
}

/// A quote together with the per-task reasoning behind it, in input order.
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledQuote {
    pub quote: Quote,
    pub insights: Vec<TaskInsight>,
}

impl AssembledQuote {
    pub fn report(&self) -> QuoteReport {
        QuoteReport::build(&self.quote, self.insights.clone())
    }
}

/// Pure, synchronous quote pipeline over an immutable reference catalog.
///
/// Holds no mutable state, so one instance can serve concurrent requests.
pub struct DeterministicQuoteEngine<R> {
    reference: R,
    rules: PricingRules,
}

impl<R> DeterministicQuoteEngine<R>
where
    R: ReferenceDataProvider,
{
    pub fn new(reference: R, rules: PricingRules) -> Self {
        Self { reference, rules }
    }

    pub fn reference(&self) -> &R {
        &self.reference
    }

    pub fn rules(&self) -> &PricingRules {
        &self.rules
    }

    /// Prices a single task. `quote_date` stands in for the installation date
    /// when the task's tax context has none.
    ///
    /// `Task` values can be built without going through `TaskInput`, so the
    /// quantity sign is checked again here.
    pub fn price_task(
        &self,
        task: &Task,
        quote_date: NaiveDate,
    ) -> Result<(PricedTask, TaskInsight), PricingError> {
        if task.quantity.is_sign_negative() {
            return Err(PricingError::MalformedTaskInput {
                field: "quantity".to_string(),
                reason: format!("must be non-negative, got {}", task.quantity),
            });
        }

        let labor = LaborCostCalculator::new(&self.reference, &self.rules).estimate(
            task.category,
            task.quantity,
            task.complexity,
            task.urgency,
        )?;

        let materials = MaterialCostCalculator::new(&self.reference);
        let mut lines = Vec::with_capacity(task.materials.len());
        let mut records = Vec::with_capacity(task.materials.len());
        for requirement in &task.materials {
            lines.push(materials.price(requirement, task.quality_for(requirement))?);
            records.push(materials.record(&requirement.material)?);
        }

        let classification =
            TaxClassifier::new(&self.rules.tax).classify(task.category, &task.tax, quote_date);
        let margin = MarginEngine::new(&self.rules.margin).margin(task.complexity, task.budget_tier);
        let confidence = ConfidenceScorer::new(self.rules.confidence).score(
            &task.signals.clarity,
            &records,
            &task.signals.labor,
            labor.standardization,
        );

        let too_large = || PricingError::too_large("quantity");
        let subtotal = lines
            .iter()
            .try_fold(labor.line.total, |sum, line| sum.checked_add(line.total))
            .ok_or_else(too_large)?;
        let vat_amount = subtotal.checked_mul(classification.rate).ok_or_else(too_large)?;
        let total_price = subtotal.checked_add(vat_amount).ok_or_else(too_large)?;

        let priced = PricedTask {
            name: task.name.clone(),
            estimated_duration: estimate_duration(labor.line.hours, &self.rules.duration),
            labor: labor.line,
            materials: lines,
            vat_rate: classification.rate,
            subtotal,
            vat_amount,
            total_price,
            margin,
            confidence_score: confidence.score,
        };
        let sell_price = priced.sell_price().ok_or_else(too_large)?;
        let insight = TaskInsight::new(
            &task.zone,
            &task.name,
            classification.rule,
            labor.skill_level,
            sell_price,
            confidence,
        );

        debug!(
            event_name = "quote.task.priced",
            zone = %task.zone,
            task = %task.name,
            category = %task.category,
            subtotal = %priced.subtotal,
            vat_rate = %priced.vat_rate,
            vat_rule = ?classification.rule,
            confidence_score = priced.confidence_score,
            "task priced"
        );

        Ok((priced, insight))
    }

    /// Prices every task in input order and groups them into zones. The first
    /// failing task aborts the whole quote.
    pub fn assemble_with_insights(
        &self,
        request: &QuoteRequest,
    ) -> Result<AssembledQuote, QuoteError> {
        if request.tasks.is_empty() {
            warn!(
                event_name = "quote.assembly.rejected",
                client_location = %request.client_location,
                error_kind = "empty_task_list",
                "quote request has no tasks"
            );
            return Err(QuoteError::EmptyTaskList);
        }

        let quote_id = QuoteId::generate();
        let mut zones: BTreeMap<String, Zone> = BTreeMap::new();
        let mut insights = Vec::with_capacity(request.tasks.len());
        let mut scores = Vec::with_capacity(request.tasks.len());
        let mut total_before_vat = Decimal::ZERO;
        let mut total_vat = Decimal::ZERO;
        let mut grand_total = Decimal::ZERO;

        for (index, task) in request.tasks.iter().enumerate() {
            let abort = |source: PricingError| {
                warn!(
                    event_name = "quote.assembly.failed",
                    quote_id = %quote_id.0,
                    task_index = index,
                    task = %task.name,
                    error_kind = source.kind(),
                    error = %source,
                    "task could not be priced, aborting quote"
                );
                QuoteError::Task { index, task: task.name.clone(), source }
            };
            let (priced, insight) = self.price_task(task, request.quote_date).map_err(abort)?;

            // Each task fits, but the running totals can still overflow.
            let (Some(before_vat), Some(vat), Some(grand)) = (
                total_before_vat.checked_add(priced.subtotal),
                total_vat.checked_add(priced.vat_amount),
                grand_total.checked_add(priced.total_price),
            ) else {
                return Err(abort(PricingError::too_large("quantity")));
            };
            total_before_vat = before_vat;
            total_vat = vat;
            grand_total = grand;
            scores.push(priced.confidence_score);
            insights.push(insight);
            zones
                .entry(task.zone.clone())
                .or_insert_with(|| Zone::new(task.zone.clone()))
                .tasks
                .push(priced);
        }

        let quote = Quote {
            quote_id,
            client_location: request.client_location.clone(),
            project_summary: request.project_summary.clone(),
            zones,
            global_confidence_score: global_confidence(scores),
            total_before_vat,
            total_vat,
            grand_total,
        };

        info!(
            event_name = "quote.assembled",
            quote_id = %quote.quote_id.0,
            zone_count = quote.zones.len(),
            task_count = quote.task_count(),
            grand_total = %quote.grand_total,
            global_confidence_score = quote.global_confidence_score,
            "quote assembled"
        );

        Ok(AssembledQuote { quote, insights })
    }
}

impl<R> QuoteRuntime for DeterministicQuoteEngine<R>
where
    R: ReferenceDataProvider,
{
    fn assemble(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        self.assemble_with_insights(request).map(|assembled| assembled.quote)
    }
}
