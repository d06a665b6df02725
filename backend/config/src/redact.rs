//! Safe-to-print config snapshots: secret fields are masked before display.

use serde_json::Value;

use crate::schema::HermesConfig;

/// Keys whose string values are always masked.
static SECRET_KEYS: &[&str] = &["apiKey", "botToken", "assistantId", "token", "secret"];

/// Redact a config value tree, replacing secrets with a short prefix hint.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let masked = match v {
                        Value::String(s) if is_secret_key(k) => mask(s),
                        other => redact(other),
                    };
                    (k.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

/// Serialize and redact a typed config in one step.
pub fn redacted_config(config: &HermesConfig) -> Value {
    serde_json::to_value(config)
        .map(|v| redact(&v))
        .unwrap_or(Value::Null)
}

fn is_secret_key(key: &str) -> bool {
    SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn mask(s: &str) -> Value {
    if s.is_empty() {
        return Value::String(String::new());
    }
    let hint = if s.chars().count() > 8 {
        format!("{}***", s.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    };
    Value::String(hint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_tokens_and_keys() {
        let mut config = HermesConfig::default();
        config.telegram.bot_token = Some("123456789:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".into());
        config.completion.api_key = Some("sk-proj-abcdefghijklmnop".into());
        config.completion.assistant_id = Some("asst_123".into());

        let out = redacted_config(&config);
        assert_eq!(out["telegram"]["botToken"], "1234***");
        assert_eq!(out["completion"]["apiKey"], "sk-p***");
        assert_eq!(out["completion"]["assistantId"], "***");
        assert_eq!(out["completion"]["model"], config.completion.model.as_str());
    }

    #[test]
    fn unset_secrets_stay_null() {
        let out = redacted_config(&HermesConfig::default());
        assert!(out["telegram"]["botToken"].is_null());
    }
}
