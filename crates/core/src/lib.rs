pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod reference;

pub use domain::quote::{
    LaborLine, MaterialLine, PricedTask, Quote, QuoteId, QuoteRequest, QuoteRequestInput, Zone,
};
pub use domain::task::{
    BudgetTier, Complexity, ConfidenceSignals, MaterialRequirement, QualityTier, Task,
    TaskCategory, TaskInput, TaxContext, Urgency, WorkType,
};
pub use errors::{ApplicationError, InterfaceError, PricingError, QuoteError};
pub use pricing::confidence::{ConfidenceBreakdown, ConfidenceLevel};
pub use pricing::report::{QuoteReport, QuoteRiskAssessment, QuoteSummary, RiskLevel};
pub use pricing::rules::PricingRules;
pub use pricing::tax::{TaxClassification, VatRule};
pub use pricing::{AssembledQuote, DeterministicQuoteEngine, QuoteRuntime};
pub use reference::{ReferenceCatalog, ReferenceDataError, ReferenceDataProvider, SkillLevel};
