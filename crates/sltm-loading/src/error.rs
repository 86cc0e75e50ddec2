//! Error types for network loading.

use crate::node_model::NodeModelError;
use sltm_core::SltmError;
use thiserror::Error;

/// Errors that can occur while setting up or running a network loading.
#[derive(Error, Debug)]
pub enum LoadingError {
    /// Unrecoverable setup problem detected before or at initialisation.
    #[error("Configuration error: {what}")]
    Configuration { what: String },

    #[error("Invalid state: {what}")]
    InvalidState { what: String },

    #[error("Node model error: {0}")]
    NodeModel(#[from] NodeModelError),

    #[error("Network error: {0}")]
    Network(#[from] sltm_network::NetworkError),

    #[error("Numeric error: {what}")]
    Numeric { what: String },
}

pub type LoadingResult<T> = Result<T, LoadingError>;

impl LoadingError {
    pub(crate) fn configuration(what: impl Into<String>) -> Self {
        LoadingError::Configuration { what: what.into() }
    }
}

impl From<LoadingError> for SltmError {
    fn from(e: LoadingError) -> Self {
        match e {
            LoadingError::Configuration { what } => SltmError::Invariant {
                what: format!("loading configuration: {what}"),
            },
            LoadingError::InvalidState { what } => SltmError::Invariant { what },
            LoadingError::NodeModel(err) => SltmError::Invariant {
                what: err.to_string(),
            },
            LoadingError::Network(err) => err.into(),
            LoadingError::Numeric { what } => SltmError::Invariant {
                what: format!("numeric: {what}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_message() {
        let err = LoadingError::configuration("no paths");
        assert!(err.to_string().contains("no paths"));
    }

    #[test]
    fn converts_into_core_error() {
        let err: SltmError = LoadingError::InvalidState {
            what: "not initialised".into(),
        }
        .into();
        assert!(matches!(err, SltmError::Invariant { .. }));
    }

    #[test]
    fn core_error_keeps_configuration_and_numeric_text() {
        let err: SltmError = LoadingError::configuration("no paths").into();
        assert!(err.to_string().contains("no paths"));
        let err: SltmError = LoadingError::Numeric {
            what: "flow acceptance gap is NaN".into(),
        }
        .into();
        assert!(err.to_string().contains("flow acceptance gap is NaN"));
    }
}
