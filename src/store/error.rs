use serde::{Deserialize, Serialize};
use thiserror::Error;

/// SQLSTATE and PostgREST codes the console gives a fixed meaning to
pub mod codes {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const NOT_NULL_VIOLATION: &str = "23502";
    pub const INSUFFICIENT_PRIVILEGE: &str = "42501";
    /// Single-row request matched no row (or none visible to the caller)
    pub const NO_ROWS: &str = "PGRST116";
}

/// Error body returned by the store when it refuses a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl Rejection {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.to_string()),
            message: Some(message.into()),
            details: None,
            hint: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn no_rows() -> Self {
        Self::new(
            codes::NO_ROWS,
            "JSON object requested, multiple (or no) rows returned",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or answered with something unreadable
    #[error("{0}")]
    Transport(String),
    /// The store refused the request (constraint, permission, missing row)
    #[error("{}", .0.message.as_deref().unwrap_or("request rejected by store"))]
    Rejected(Rejection),
    /// The request could not be built (bad collection, column or select)
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl StoreError {
    pub fn rejected(code: &str, message: impl Into<String>) -> Self {
        StoreError::Rejected(Rejection::new(code, message))
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            StoreError::Rejected(rejection) => rejection.code.as_deref(),
            _ => None,
        }
    }
}

impl From<Rejection> for StoreError {
    fn from(rejection: Rejection) -> Self {
        StoreError::Rejected(rejection)
    }
}
