use thiserror::Error;

use crate::domain::task::QualityTier;
use crate::reference::SkillLevel;

/// Per-task pricing failures. All stem from caller input or reference-data
/// mismatches, so none of them are retryable.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("unknown material `{material}`")]
    UnknownMaterial { material: String },
    #[error("material `{material}` has no `{tier}` quality variant")]
    InvalidQualityTier { material: String, tier: QualityTier },
    #[error("unknown task category `{category}`")]
    UnknownTaskCategory { category: String },
    #[error("malformed task input: `{field}` {reason}")]
    MalformedTaskInput { field: String, reason: String },
    #[error("reference data has no hourly rate for skill level `{skill}`")]
    MissingLaborRate { skill: SkillLevel },
}

impl PricingError {
    /// Arithmetic on `field` would exceed the representable money range.
    pub(crate) fn too_large(field: &str) -> Self {
        Self::MalformedTaskInput { field: field.to_string(), reason: "is too large to price".to_string() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownMaterial { .. } => "unknown_material",
            Self::InvalidQualityTier { .. } => "invalid_quality_tier",
            Self::UnknownTaskCategory { .. } => "unknown_task_category",
            Self::MalformedTaskInput { .. } => "malformed_task_input",
            Self::MissingLaborRate { .. } => "missing_labor_rate",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QuoteError {
    #[error("task #{index} `{task}` could not be priced: {source}")]
    Task {
        index: usize,
        task: String,
        #[source]
        source: PricingError,
    },
    #[error("quote request contains no tasks")]
    EmptyTaskList,
    #[error("malformed quote request: `{field}` is required")]
    MalformedRequest { field: String },
}

impl QuoteError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Task { source, .. } => source.kind(),
            Self::EmptyTaskList => "empty_task_list",
            Self::MalformedRequest { .. } => "malformed_request",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Quote(#[from] QuoteError),
    #[error("reference data failure: {0}")]
    ReferenceData(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, error_class: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, error_class: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn error_class(&self) -> &str {
        match self {
            Self::BadRequest { error_class, .. } | Self::Internal { error_class, .. } => error_class,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. } | Self::Internal { message, .. } => message,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Quote(error) => Self::BadRequest {
                message: error.to_string(),
                error_class: error.kind().to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Configuration(message) => Self::BadRequest {
                message,
                error_class: "config_validation".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::ReferenceData(message) => Self::Internal {
                message,
                error_class: "reference_data".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, InterfaceError, PricingError, QuoteError};

    fn unknown_material() -> QuoteError {
        QuoteError::Task {
            index: 2,
            task: "Lay floor tiles".to_owned(),
            source: PricingError::UnknownMaterial { material: "marble slab".to_owned() },
        }
    }

    #[test]
    fn task_error_names_task_and_kind() {
        let error = unknown_material();
        assert_eq!(error.kind(), "unknown_material");
        assert_eq!(
            error.to_string(),
            "task #2 `Lay floor tiles` could not be priced: unknown material `marble slab`"
        );
    }

    #[test]
    fn quote_error_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(unknown_material()).into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ref error_class,
                ..
            } if correlation_id == "req-1" && error_class == "unknown_material"
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn configuration_error_maps_to_bad_request() {
        let interface = ApplicationError::Configuration("logging.level is invalid".to_owned())
            .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
        assert_eq!(interface.error_class(), "config_validation");
        assert_eq!(interface.message(), "logging.level is invalid");
    }

    #[test]
    fn reference_data_error_maps_to_internal() {
        let interface =
            ApplicationError::ReferenceData("missing labor rate".to_owned()).into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.error_class(), "reference_data");
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
