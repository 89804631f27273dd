//! Inbound payload normalization.
//!
//! The backend sends either a bare string or an object with the text under
//! `message`. Anything else is shown as received (compact JSON) rather than
//! dropped, so server output is never silently lost.

use serde_json::Value;

/// Field that carries the text in structured payloads.
pub const MESSAGE_FIELD: &str = "message";

pub fn normalize(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        Value::Object(map) => match map.get(MESSAGE_FIELD) {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => payload.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_string_passes_through() {
        assert_eq!(normalize(&json!("hi")), "hi");
    }

    #[test]
    fn structured_payload_matches_bare_string() {
        assert_eq!(normalize(&json!({"message": "hi"})), normalize(&json!("hi")));
    }

    #[test]
    fn extra_fields_are_ignored() {
        assert_eq!(normalize(&json!({"message": "hi", "model": "x"})), "hi");
    }

    #[test]
    fn non_string_message_field_shows_its_json() {
        assert_eq!(normalize(&json!({"message": 42})), "42");
        assert_eq!(normalize(&json!({"message": ["a"]})), r#"["a"]"#);
    }

    #[test]
    fn malformed_payloads_display_as_received() {
        assert_eq!(normalize(&json!({"text": "hi"})), r#"{"text":"hi"}"#);
        assert_eq!(normalize(&json!(3.5)), "3.5");
        assert_eq!(normalize(&Value::Null), "null");
    }
}
