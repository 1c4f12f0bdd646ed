use serde::Serialize;

/// Uniform result of a user-triggered action. Failures are data, not errors,
/// so the caller can render them inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome<T = ()> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ActionOutcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
