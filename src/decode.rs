use serde_json::Value;

use crate::app::{ChatMessage, SentimentResult};

/// Longest slice of a non-JSON error body that is surfaced to the user,
/// counted in characters. Longer bodies are silently cut.
pub const SNIPPET_MAX: usize = 120;

/// Shown when the server declares JSON but the body does not parse.
pub const INVALID_RESPONSE: &str = "Respuesta del servidor no válida.";

/// Result of normalizing one HTTP response body.
///
/// The tag only says whether JSON could be extracted. The HTTP status never
/// picks the branch: a 500 with a well-formed JSON error body decodes to `Ok`,
/// and the caller reads its `error` field after checking the status itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Ok(Value),
    Err(String),
}

/// Normalize a response into [`Decoded`]. Priority-ordered, first match wins:
/// a non-JSON content type beats parsing, a parse failure beats success.
pub fn decode(status: u16, content_type: Option<&str>, body: &str) -> Decoded {
    if !is_json(content_type) {
        return Decoded::Err(non_json_error(status, body));
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => Decoded::Ok(value),
        Err(_) => Decoded::Err(INVALID_RESPONSE.to_string()),
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().ends_with("json"))
        .unwrap_or(false)
}

fn non_json_error(status: u16, body: &str) -> String {
    let snippet: String = body.chars().take(SNIPPET_MAX).collect();
    format!("Error del servidor (HTTP {}): {}", status, snippet)
}

/// Pull the `history` field out of a decoded payload. A missing or misshapen
/// field is an empty conversation, never an error.
pub fn history_from(value: &Value) -> Vec<ChatMessage> {
    value
        .get("history")
        .and_then(|history| serde_json::from_value(history.clone()).ok())
        .unwrap_or_default()
}

/// Pull the server's `error` field, falling back to a generic message when the
/// field is absent or not a string.
pub fn error_from(value: &Value, fallback: &str) -> String {
    value
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

/// Interpret a decoded payload as a sentiment result. Missing fields take
/// their defaults rather than failing the whole display.
pub fn sentiment_from(value: &Value) -> SentimentResult {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ChatRole;
    use serde_json::json;

    #[test]
    fn test_json_body_decodes_to_parsed_value() {
        let body = r#"{"history":[{"role":"user","content":"hola"}]}"#;
        let decoded = decode(200, Some("application/json"), body);
        assert_eq!(
            decoded,
            Decoded::Ok(json!({"history": [{"role": "user", "content": "hola"}]}))
        );
    }

    #[test]
    fn test_json_error_body_on_failure_status_still_decodes() {
        let body = r#"{"error":"modelo no disponible"}"#;
        let decoded = decode(500, Some("application/json; charset=utf-8"), body);
        assert_eq!(decoded, Decoded::Ok(json!({"error": "modelo no disponible"})));
    }

    #[test]
    fn test_non_json_content_type_embeds_status_and_body() {
        let decoded = decode(502, Some("text/html"), "Bad Gateway");
        match decoded {
            Decoded::Err(message) => {
                assert!(message.contains("502"));
                assert!(message.contains("Bad Gateway"));
            }
            Decoded::Ok(_) => panic!("expected Err for text/html body"),
        }
    }

    #[test]
    fn test_missing_content_type_is_not_json() {
        let decoded = decode(200, None, r#"{"ok":true}"#);
        assert!(matches!(decoded, Decoded::Err(_)));
    }

    #[test]
    fn test_snippet_truncates_at_120_characters() {
        let body = "x".repeat(300);
        let decoded = decode(500, Some("text/plain"), &body);
        match decoded {
            Decoded::Err(message) => {
                assert!(message.contains(&"x".repeat(SNIPPET_MAX)));
                assert!(!message.contains(&"x".repeat(SNIPPET_MAX + 1)));
            }
            Decoded::Ok(_) => panic!("expected Err for text/plain body"),
        }
    }

    #[test]
    fn test_snippet_counts_characters_not_bytes() {
        // Two-byte characters must not be split or over-counted
        let body = "á".repeat(130);
        let decoded = decode(400, Some("text/plain"), &body);
        match decoded {
            Decoded::Err(message) => {
                assert!(message.contains(&"á".repeat(SNIPPET_MAX)));
                assert!(!message.contains(&"á".repeat(SNIPPET_MAX + 1)));
            }
            Decoded::Ok(_) => panic!("expected Err for text/plain body"),
        }
    }

    #[test]
    fn test_invalid_json_yields_fixed_message_regardless_of_status() {
        for status in [200u16, 400, 500] {
            let decoded = decode(status, Some("application/json"), "{not json");
            assert_eq!(decoded, Decoded::Err(INVALID_RESPONSE.to_string()));
        }
    }

    #[test]
    fn test_history_from_parses_messages_in_order() {
        let value = json!({"history": [
            {"role": "user", "content": "¿Qué es la inflación?"},
            {"role": "assistant", "content": "Es la subida de precios."},
        ]});
        let history = history_from(&value);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[0].content, "¿Qué es la inflación?");
        assert_eq!(history[1].role, ChatRole::Assistant);
    }

    #[test]
    fn test_history_from_missing_field_is_empty() {
        assert!(history_from(&json!({})).is_empty());
        assert!(history_from(&json!({"history": "nope"})).is_empty());
    }

    #[test]
    fn test_unknown_role_normalizes_to_assistant() {
        let value = json!({"history": [{"role": "system", "content": "hola"}]});
        let history = history_from(&value);
        assert_eq!(history[0].role, ChatRole::Assistant);
    }

    #[test]
    fn test_error_from_prefers_server_message() {
        let value = json!({"error": "modelo no disponible"});
        assert_eq!(error_from(&value, "fallback"), "modelo no disponible");
        assert_eq!(error_from(&json!({}), "fallback"), "fallback");
        assert_eq!(error_from(&json!({"error": 42}), "fallback"), "fallback");
    }

    #[test]
    fn test_sentiment_from_reads_the_three_fields() {
        let value = json!({
            "sentimiento": "positivo",
            "confianza": 92,
            "explicacion": "Expresa entusiasmo."
        });
        let result = sentiment_from(&value);
        assert_eq!(result.sentimiento, "positivo");
        assert_eq!(result.confianza, 92.0);
        assert_eq!(result.explicacion, "Expresa entusiasmo.");
    }

    #[test]
    fn test_sentiment_from_defaults_missing_fields() {
        let result = sentiment_from(&json!({"sentimiento": "neutro"}));
        assert_eq!(result.sentimiento, "neutro");
        assert_eq!(result.confianza, 0.0);
        assert!(result.explicacion.is_empty());
    }
}
