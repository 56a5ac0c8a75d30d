use serde::Serialize;
use std::time::Duration;

/// How long a toast stays on screen
pub const TOAST_DURATION: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

/// Transient notification for the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub duration_ms: u64,
}

impl Toast {
    fn new(kind: ToastKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            duration_ms: TOAST_DURATION.as_millis() as u64,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Warning, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_json_shape() {
        let json = serde_json::to_value(Toast::error("Dữ liệu đã tồn tại.")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "error", "message": "Dữ liệu đã tồn tại.", "duration_ms": 4000})
        );
        assert_eq!(Toast::warning("x").kind, ToastKind::Warning);
        assert_eq!(Toast::info("x").kind, ToastKind::Info);
    }
}
