use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted login state. Every API request carries `token` as a bearer header.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Session {
    pub token: String,
    /// Identity the invoice collection is scoped to
    #[serde(default)]
    pub user: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>, user: Option<String>) -> Self {
        Self {
            token: token.into(),
            user,
            created_at: Utc::now(),
        }
    }

    /// Identity the invoice collection is scoped to; the token holder if unnamed.
    pub fn identity(&self) -> String {
        self.user.clone().unwrap_or_else(|| "me".to_string())
    }
}
