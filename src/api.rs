use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Serialize;

use crate::decode::{decode, error_from, Decoded};

/// Fixed name of the downloaded batch result file.
pub const ARTIFACT_FILENAME: &str = "analisis_sentimientos.csv";

/// Shown when no HTTP response exists at all (server unreachable, connection
/// dropped mid-body).
pub const CONNECT_ERROR: &str = "No se pudo conectar con el servidor.";

pub const SEND_FALLBACK: &str = "Error al enviar el mensaje.";
pub const TEXT_FALLBACK: &str = "No se pudo analizar el texto.";
pub const CSV_FALLBACK: &str = "No se pudo procesar el archivo.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

/// One HTTP round trip: whether the status was 2xx, the status itself, and
/// the decoded body. Expected server failures are values here, never `Err`.
#[derive(Debug)]
pub struct ApiResponse {
    pub ok: bool,
    pub status: u16,
    pub decoded: Decoded,
}

impl ApiResponse {
    fn unreachable() -> Self {
        Self {
            ok: false,
            status: 0,
            decoded: Decoded::Err(CONNECT_ERROR.to_string()),
        }
    }
}

/// Outcome of the batch upload. The artifact bytes are opaque; they are
/// written to disk as-is and never parsed.
#[derive(Debug)]
pub enum BatchOutcome {
    Artifact(Vec<u8>),
    Failed(String),
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn fetch_history(&self) -> ApiResponse {
        let url = format!("{}/api/chat/history", self.base_url);
        tracing::debug!("Fetching chat history from {}", url);

        match self.client.get(&url).send().await {
            Ok(response) => Self::decode_response(response).await,
            Err(e) => {
                tracing::warn!("History fetch failed: {}", e);
                ApiResponse::unreachable()
            }
        }
    }

    pub async fn send_message(&self, message: &str) -> ApiResponse {
        let url = format!("{}/api/chat", self.base_url);
        tracing::debug!("Sending chat message ({} chars)", message.chars().count());

        let request = self.client.post(&url).json(&ChatRequest { message });
        match request.send().await {
            Ok(response) => Self::decode_response(response).await,
            Err(e) => {
                tracing::warn!("Chat send failed: {}", e);
                ApiResponse::unreachable()
            }
        }
    }

    /// Dispatch the reset and drop the result. The conversation view clears
    /// before this resolves; the server's answer is deliberately ignored.
    pub async fn reset_chat(&self) {
        let url = format!("{}/api/chat/reset", self.base_url);
        if let Err(e) = self.client.post(&url).send().await {
            tracing::warn!("Reset call failed (ignored): {}", e);
        }
    }

    pub async fn analyze_text(&self, text: &str) -> ApiResponse {
        let url = format!("{}/api/sentiment/text", self.base_url);
        tracing::debug!("Submitting text for sentiment analysis");

        let request = self.client.post(&url).json(&TextRequest { text });
        match request.send().await {
            Ok(response) => Self::decode_response(response).await,
            Err(e) => {
                tracing::warn!("Text analysis failed: {}", e);
                ApiResponse::unreachable()
            }
        }
    }

    /// Upload a CSV for batch analysis. A 2xx body is the opaque result
    /// artifact; anything else decodes JSON-or-text into a display message.
    pub async fn analyze_csv(&self, filename: &str, bytes: Vec<u8>) -> BatchOutcome {
        let url = format!("{}/api/sentiment/csv", self.base_url);
        tracing::debug!("Uploading {} ({} bytes)", filename, bytes.len());

        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new().part("file", part);

        let response = match self.client.post(&url).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("CSV upload failed: {}", e);
                return BatchOutcome::Failed(CONNECT_ERROR.to_string());
            }
        };

        if !response.status().is_success() {
            let failure = Self::decode_response(response).await;
            let message = match failure.decoded {
                Decoded::Ok(value) => error_from(&value, CSV_FALLBACK),
                Decoded::Err(message) => message,
            };
            return BatchOutcome::Failed(message);
        }

        match response.bytes().await {
            Ok(bytes) => BatchOutcome::Artifact(bytes.to_vec()),
            Err(e) => {
                tracing::warn!("Reading CSV result body failed: {}", e);
                BatchOutcome::Failed(CONNECT_ERROR.to_string())
            }
        }
    }

    async fn decode_response(response: reqwest::Response) -> ApiResponse {
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        ApiResponse {
            ok: status.is_success(),
            status: status.as_u16(),
            decoded: decode(status.as_u16(), content_type.as_deref(), &body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{history_from, SNIPPET_MAX};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_server(m: &str, p: &str, template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method(m))
            .and(path(p))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_fetch_history_returns_messages_in_order() {
        let body = json!({"history": [
            {"role": "user", "content": "¿Qué es la inflación?"},
            {"role": "assistant", "content": "Es la subida de precios."},
        ]});
        let server = mock_server(
            "GET",
            "/api/chat/history",
            ResponseTemplate::new(200).set_body_json(&body),
        )
        .await;

        let response = ApiClient::new(&server.uri()).fetch_history().await;
        assert!(response.ok);
        match response.decoded {
            Decoded::Ok(value) => {
                let history = history_from(&value);
                assert_eq!(history.len(), 2);
                assert_eq!(history[0].content, "¿Qué es la inflación?");
            }
            Decoded::Err(message) => panic!("unexpected decode failure: {}", message),
        }
    }

    #[tokio::test]
    async fn test_fetch_history_without_the_field_is_empty() {
        let server = mock_server(
            "GET",
            "/api/chat/history",
            ResponseTemplate::new(200).set_body_json(json!({})),
        )
        .await;

        let response = ApiClient::new(&server.uri()).fetch_history().await;
        match response.decoded {
            Decoded::Ok(value) => assert!(history_from(&value).is_empty()),
            Decoded::Err(message) => panic!("unexpected decode failure: {}", message),
        }
    }

    #[tokio::test]
    async fn test_send_message_posts_the_expected_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(json!({"message": "hola"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"history": []})))
            .expect(1)
            .mount(&server)
            .await;

        let response = ApiClient::new(&server.uri()).send_message("hola").await;
        assert!(response.ok);
    }

    #[tokio::test]
    async fn test_structured_error_on_500_decodes_to_ok() {
        let server = mock_server(
            "POST",
            "/api/chat",
            ResponseTemplate::new(500).set_body_json(json!({"error": "modelo no disponible"})),
        )
        .await;

        let response = ApiClient::new(&server.uri()).send_message("hola").await;
        assert!(!response.ok);
        assert_eq!(response.status, 500);
        match response.decoded {
            Decoded::Ok(value) => {
                assert_eq!(error_from(&value, SEND_FALLBACK), "modelo no disponible")
            }
            Decoded::Err(message) => panic!("structured error should decode: {}", message),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_truncated_into_the_message() {
        let body = "y".repeat(400);
        let server = mock_server(
            "POST",
            "/api/chat",
            ResponseTemplate::new(503).set_body_raw(body.into_bytes(), "text/plain"),
        )
        .await;

        let response = ApiClient::new(&server.uri()).send_message("hola").await;
        match response.decoded {
            Decoded::Err(message) => {
                assert!(message.contains("503"));
                assert!(message.contains(&"y".repeat(SNIPPET_MAX)));
                assert!(!message.contains(&"y".repeat(SNIPPET_MAX + 1)));
            }
            Decoded::Ok(_) => panic!("text/plain must not decode to Ok"),
        }
    }

    #[tokio::test]
    async fn test_declared_json_that_does_not_parse() {
        let server = mock_server(
            "GET",
            "/api/chat/history",
            ResponseTemplate::new(200).set_body_raw(b"{broken".to_vec(), "application/json"),
        )
        .await;

        let response = ApiClient::new(&server.uri()).fetch_history().await;
        assert_eq!(
            response.decoded,
            Decoded::Err(crate::decode::INVALID_RESPONSE.to_string())
        );
    }

    #[tokio::test]
    async fn test_analyze_text_success() {
        let body = json!({
            "sentimiento": "positivo",
            "confianza": 92,
            "explicacion": "Expresa entusiasmo."
        });
        let server = mock_server(
            "POST",
            "/api/sentiment/text",
            ResponseTemplate::new(200).set_body_json(&body),
        )
        .await;

        let response = ApiClient::new(&server.uri())
            .analyze_text("Me encanta este producto")
            .await;
        assert!(response.ok);
        assert_eq!(response.decoded, Decoded::Ok(body));
    }

    #[tokio::test]
    async fn test_batch_success_returns_opaque_bytes() {
        // Not valid UTF-8; the artifact must come back byte-for-byte, unparsed
        let artifact = vec![0xEF, 0xBB, 0xBF, 0x00, 0xFF, b'a', b'\n'];
        let server = mock_server(
            "POST",
            "/api/sentiment/csv",
            ResponseTemplate::new(200).set_body_raw(artifact.clone(), "text/csv"),
        )
        .await;

        let outcome = ApiClient::new(&server.uri())
            .analyze_csv("datos.csv", b"frase\nhola\n".to_vec())
            .await;
        match outcome {
            BatchOutcome::Artifact(bytes) => assert_eq!(bytes, artifact),
            BatchOutcome::Failed(message) => panic!("upload should succeed: {}", message),
        }
    }

    #[tokio::test]
    async fn test_batch_plain_text_failure_does_not_propagate_a_parse_error() {
        let server = mock_server(
            "POST",
            "/api/sentiment/csv",
            ResponseTemplate::new(400).set_body_raw(b"not json at all".to_vec(), "text/plain"),
        )
        .await;

        let outcome = ApiClient::new(&server.uri())
            .analyze_csv("datos.csv", b"frase\n".to_vec())
            .await;
        match outcome {
            BatchOutcome::Failed(message) => {
                assert!(message.contains("400"));
                assert!(message.contains("not json at all"));
            }
            BatchOutcome::Artifact(_) => panic!("400 must not yield an artifact"),
        }
    }

    #[tokio::test]
    async fn test_batch_structured_failure_surfaces_the_server_message() {
        let server = mock_server(
            "POST",
            "/api/sentiment/csv",
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "El archivo debe tener formato .csv"})),
        )
        .await;

        let outcome = ApiClient::new(&server.uri())
            .analyze_csv("datos.txt", b"x".to_vec())
            .await;
        match outcome {
            BatchOutcome::Failed(message) => {
                assert_eq!(message, "El archivo debe tener formato .csv")
            }
            BatchOutcome::Artifact(_) => panic!("400 must not yield an artifact"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_maps_to_the_connectivity_message() {
        // Nothing listens on port 1
        let client = ApiClient::new("http://127.0.0.1:1");

        let response = client.fetch_history().await;
        assert!(!response.ok);
        assert_eq!(response.decoded, Decoded::Err(CONNECT_ERROR.to_string()));

        let outcome = client.analyze_csv("datos.csv", b"x".to_vec()).await;
        assert!(matches!(outcome, BatchOutcome::Failed(message) if message == CONNECT_ERROR));

        // Fire-and-forget reset swallows the failure
        client.reset_chat().await;
    }
}
