use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Config directory not found at {0}. Run 'portal init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write {path}: {reason}")]
    ConfigWrite { path: PathBuf, reason: String },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Not logged in. Run 'portal login --token <TOKEN>' first.")]
    NotLoggedIn,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Session expired. Run 'portal login' again.")]
    Auth,

    #[error("{message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response ({status}): {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("Could not load invoices: {0}. Run the command again to retry.")]
    LoadFailed(String),

    #[error("{0}")]
    ActionFailed(String),
}

impl PortalError {
    /// True for a 401 from the API, which callers treat as a sign-out.
    pub fn is_auth(&self) -> bool {
        matches!(self, PortalError::Auth)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortalError::NotFound(_))
    }

    /// Text suitable for inline display next to the failed action.
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Validation { message, fields } if !fields.is_empty() => {
                let detail: Vec<String> = fields
                    .iter()
                    .map(|(field, msgs)| format!("{}: {}", field, msgs.join(" ")))
                    .collect();
                format!("{} ({})", message, detail.join("; "))
            }
            PortalError::Server { message, .. } | PortalError::UnexpectedStatus { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_includes_field_detail() {
        let mut fields = BTreeMap::new();
        fields.insert("email".to_string(), vec!["Enter a valid email.".to_string()]);
        let err = PortalError::Validation {
            message: "Invalid request".to_string(),
            fields,
        };
        assert_eq!(
            err.user_message(),
            "Invalid request (email: Enter a valid email.)"
        );
    }

    #[test]
    fn server_message_is_passed_through() {
        let err = PortalError::Server {
            status: 503,
            message: "Service unavailable".to_string(),
        };
        assert_eq!(err.user_message(), "Service unavailable");
        assert!(!err.is_auth());
    }

    #[test]
    fn auth_is_detected() {
        assert!(PortalError::Auth.is_auth());
        assert!(PortalError::NotFound("invoice 4".into()).is_not_found());
    }
}
