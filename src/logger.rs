//! Structured logging setup
//!
//! - `tracing` events everywhere, targets in UPPERCASE (`APP`, `DATABASE`, `ORDER`, ...)
//! - Human-readable output in development, JSON lines in production
//! - Sensitive data redaction for payloads that end up in logs or audit metadata

use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

const REDACTED: &str = "***REDACTED***";

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if config.json_format {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()
    } else {
        fmt().with_env_filter(filter).with_target(true).try_init()
    };

    if let Err(e) = result {
        tracing::debug!(target: "APP", "logger already initialized: {e}");
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_lowercase();
    ["password", "secret", "token", "key"]
        .iter()
        .any(|needle| key.contains(needle))
}

/// Redact sensitive fields from JSON
pub fn redact_sensitive_data(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, val)| {
                    if is_sensitive_key(&key) {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, redact_sensitive_data(val))
                    }
                })
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.into_iter().map(redact_sensitive_data).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_nested_credentials() {
        let redacted = redact_sensitive_data(json!({
            "username": "owner",
            "password": "Secret123",
            "session": { "session_token": "abc", "user_id": 7 },
            "items": [{ "api_key": "k" }, { "name": "Tea" }]
        }));

        assert_eq!(redacted["username"], "owner");
        assert_eq!(redacted["password"], REDACTED);
        assert_eq!(redacted["session"]["session_token"], REDACTED);
        assert_eq!(redacted["session"]["user_id"], 7);
        assert_eq!(redacted["items"][0]["api_key"], REDACTED);
        assert_eq!(redacted["items"][1]["name"], "Tea");
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(redact_sensitive_data(json!(5)), json!(5));
        assert_eq!(redact_sensitive_data(json!("password")), json!("password"));
    }
}
