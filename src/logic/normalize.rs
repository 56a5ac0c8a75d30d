use serde::Serialize;
use thiserror::Error;

use crate::store::{codes, StoreError};

pub const MSG_DUPLICATE: &str = "Dữ liệu đã tồn tại.";
pub const MSG_REFERENCED: &str = "Dữ liệu đang được tham chiếu hoặc tham chiếu không hợp lệ.";
pub const MSG_NOT_FOUND: &str = "Không tìm thấy dữ liệu hoặc bạn không có quyền truy cập.";
pub const MSG_FORBIDDEN: &str = "Bạn không có quyền thực hiện thao tác này.";
pub const MSG_UNKNOWN: &str = "Đã xảy ra lỗi không xác định.";

/// Coarse classification of a failed store call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UniqueViolation,
    ForeignKeyViolation,
    NotFound,
    Forbidden,
    /// Store unreachable or answered with something unreadable
    Transport,
    InvalidQuery,
    /// Rejected for a reason without a fixed message
    Rejected,
}

/// A store failure in the form shown to the operator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NormalizedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl NormalizedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<StoreError> for NormalizedError {
    fn from(err: StoreError) -> Self {
        normalize_error(&err)
    }
}

fn non_empty(message: Option<&str>) -> Option<&str> {
    message.filter(|m| !m.trim().is_empty())
}

/// Map a store error to its user-facing message. Total: every error
/// yields a message.
pub fn normalize_error(err: &StoreError) -> NormalizedError {
    let (kind, fixed) = match err.code() {
        Some(codes::UNIQUE_VIOLATION) => (ErrorKind::UniqueViolation, Some(MSG_DUPLICATE)),
        Some(codes::FOREIGN_KEY_VIOLATION) => (ErrorKind::ForeignKeyViolation, Some(MSG_REFERENCED)),
        Some(codes::NO_ROWS) => (ErrorKind::NotFound, Some(MSG_NOT_FOUND)),
        Some(codes::INSUFFICIENT_PRIVILEGE) => (ErrorKind::Forbidden, Some(MSG_FORBIDDEN)),
        _ => match err {
            StoreError::Transport(_) => (ErrorKind::Transport, None),
            StoreError::InvalidQuery(_) => (ErrorKind::InvalidQuery, None),
            StoreError::Rejected(_) => (ErrorKind::Rejected, None),
        },
    };

    if let Some(message) = fixed {
        return NormalizedError::new(kind, message);
    }

    let raw = match err {
        StoreError::Transport(message) => non_empty(Some(message.as_str())).map(str::to_string),
        StoreError::Rejected(rejection) => non_empty(rejection.message.as_deref()).map(str::to_string),
        StoreError::InvalidQuery(_) => Some(err.to_string()),
    };
    NormalizedError::new(kind, raw.unwrap_or_else(|| MSG_UNKNOWN.to_string()))
}

/// The user-facing message alone
pub fn format_store_error(err: &StoreError) -> String {
    normalize_error(err).message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Rejection;

    #[test]
    fn test_fixed_messages_by_code() {
        let err = StoreError::rejected("23505", "duplicate key value violates unique constraint");
        let normalized = normalize_error(&err);
        assert_eq!(normalized.kind, ErrorKind::UniqueViolation);
        assert_eq!(normalized.message, "Dữ liệu đã tồn tại.");

        assert_eq!(format_store_error(&StoreError::rejected("23503", "fk")), MSG_REFERENCED);
        assert_eq!(format_store_error(&Rejection::no_rows().into()), MSG_NOT_FOUND);
        assert_eq!(format_store_error(&StoreError::rejected("42501", "denied")), MSG_FORBIDDEN);
    }

    #[test]
    fn test_unknown_code_keeps_store_message() {
        let err = StoreError::rejected("22P02", "invalid input syntax for type uuid");
        let normalized = normalize_error(&err);
        assert_eq!(normalized.kind, ErrorKind::Rejected);
        assert_eq!(normalized.message, "invalid input syntax for type uuid");
    }

    #[test]
    fn test_codeless_error_without_message() {
        let err = StoreError::Rejected(Rejection::default());
        assert_eq!(format_store_error(&err), "Đã xảy ra lỗi không xác định.");

        let blank = StoreError::Transport("  ".to_string());
        let normalized = normalize_error(&blank);
        assert_eq!(normalized.kind, ErrorKind::Transport);
        assert_eq!(normalized.message, MSG_UNKNOWN);
    }

    #[test]
    fn test_transport_message_passes_through() {
        let err = StoreError::Transport("connection refused".to_string());
        assert_eq!(format_store_error(&err), "connection refused");
        assert_eq!(NormalizedError::from(err).to_string(), "connection refused");
    }
}
