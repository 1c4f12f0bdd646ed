use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::PortalError;

const MESSAGE_KEYS: [&str; 4] = ["detail", "message", "error", "non_field_errors"];

/// Pull a human-readable message out of an error body.
pub fn extract_message(body: &Value) -> Option<String> {
    let map = body.as_object()?;
    MESSAGE_KEYS
        .iter()
        .filter_map(|key| map.get(*key))
        .find_map(message_text)
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        _ => None,
    }
}

/// Field-level detail from a `{field: [msg, ...]}` validation body
fn extract_fields(body: &Value) -> BTreeMap<String, Vec<String>> {
    let Some(map) = body.as_object() else {
        return BTreeMap::new();
    };
    map.iter()
        .filter(|(key, _)| !MESSAGE_KEYS.contains(&key.as_str()))
        .filter_map(|(key, value)| {
            let msgs = match value {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                _ => Vec::new(),
            };
            (!msgs.is_empty()).then(|| (key.clone(), msgs))
        })
        .collect()
}

/// Map a non-success status and its body to the error taxonomy.
pub fn error_for_status(status: u16, body: &str, what: &str) -> PortalError {
    let json: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let message = extract_message(&json);

    match status {
        401 => PortalError::Auth,
        404 => PortalError::NotFound(message.unwrap_or_else(|| what.to_string())),
        400 => {
            let fields = extract_fields(&json);
            PortalError::Validation {
                message: message.unwrap_or_else(|| "Invalid request".to_string()),
                fields,
            }
        }
        500..=599 => PortalError::Server {
            status,
            message: message.unwrap_or_else(|| "The server could not complete the request".to_string()),
        },
        _ => PortalError::UnexpectedStatus {
            status,
            message: message.unwrap_or_else(|| format!("Request failed with status {}", status)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_keys_in_priority_order() {
        assert_eq!(
            extract_message(&json!({"message": "b", "detail": "a"})).as_deref(),
            Some("a")
        );
        assert_eq!(
            extract_message(&json!({"non_field_errors": ["x", "y"]})).as_deref(),
            Some("x y")
        );
        assert_eq!(extract_message(&json!({"other": 1})), None);
        assert_eq!(extract_message(&json!("plain")), None);
    }

    #[test]
    fn statuses_map_to_taxonomy() {
        assert!(matches!(error_for_status(401, "", "invoice 1"), PortalError::Auth));
        assert!(matches!(
            error_for_status(404, "", "invoice 1"),
            PortalError::NotFound(ref what) if what == "invoice 1"
        ));
        assert!(matches!(
            error_for_status(502, "<html>", "x"),
            PortalError::Server { status: 502, .. }
        ));
        assert!(matches!(
            error_for_status(418, "{\"error\": \"teapot\"}", "x"),
            PortalError::UnexpectedStatus { status: 418, ref message } if message == "teapot"
        ));
    }

    #[test]
    fn validation_collects_fields() {
        let err = error_for_status(400, r#"{"status": ["Not a valid choice."]}"#, "x");
        match err {
            PortalError::Validation { message, fields } => {
                assert_eq!(message, "Invalid request");
                assert_eq!(fields["status"], vec!["Not a valid choice.".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
