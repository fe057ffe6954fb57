//! Remote agreements API.
//!
//! Every view talks to the server through the [`AcuerdosApi`] trait so the
//! view-models can be driven by an in-memory double in tests. The production
//! implementation is [`http::HttpApi`].

pub mod http;
pub mod models;

#[cfg(test)]
pub(crate) mod fake;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

pub use http::HttpApi;
pub use models::{
    Agent, Agreement, AgreementPage, AssignedRate, Rate, RateAssignment, calendar_date, display_date,
    parse_calendar_date,
};

/// Field name → messages, as returned under `errors` by a 400 response.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("validation failed for {} field(s)", .0.len())]
    Validation(FieldErrors),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Serialization error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(String),
}

impl ApiError {
    /// One `field: msg1, msg2` line per offending field, or `None` when this is
    /// not a validation failure.
    pub fn validation_lines(&self) -> Option<Vec<String>> {
        match self {
            ApiError::Validation(errors) => Some(
                errors
                    .iter()
                    .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Operations offered by the agreements backend.
///
/// Create and update take an already-assembled JSON body because an edit
/// forwards every field of the original record, including ones this client
/// does not model.
#[async_trait]
pub trait AcuerdosApi: Send + Sync {
    async fn list_agreements(&self, page: u32, page_size: u32) -> Result<AgreementPage, ApiError>;

    async fn list_agents(&self) -> Result<Vec<Agent>, ApiError>;

    async fn create_agreement(&self, payload: &Value) -> Result<(), ApiError>;

    async fn update_agreement(&self, id: i64, payload: &Value) -> Result<(), ApiError>;

    async fn delete_agreement(&self, id: i64) -> Result<(), ApiError>;

    /// Rates currently linked to one agreement.
    async fn assigned_rates(&self, agreement_id: i64) -> Result<Vec<AssignedRate>, ApiError>;

    /// The full rate catalog.
    async fn rate_catalog(&self) -> Result<Vec<Rate>, ApiError>;

    /// Replaces the agreement's whole assignment set with `assignments`.
    async fn replace_rates(
        &self,
        agreement_id: i64,
        assignments: &[RateAssignment],
    ) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_lines_join_messages_per_field() {
        let mut errors = FieldErrors::new();
        errors.insert("Ambito".into(), vec!["Requerido".into(), "Muy corto".into()]);
        errors.insert("DuracionMeses".into(), vec!["Fuera de rango".into()]);
        let lines = ApiError::Validation(errors).validation_lines().unwrap();
        assert_eq!(
            lines,
            vec![
                "Ambito: Requerido, Muy corto".to_string(),
                "DuracionMeses: Fuera de rango".to_string(),
            ]
        );
    }

    #[test]
    fn other_failures_have_no_validation_lines() {
        let err = ApiError::Status {
            status: 500,
            body: "boom".into(),
        };
        assert!(err.validation_lines().is_none());
    }
}
