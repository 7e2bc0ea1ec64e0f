//! HTTP client for the chat backend.
//!
//! Every public operation returns an [`ApiResponse`]: failures are logged and
//! turned into a user-facing message instead of being propagated.
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::config::Config;
use crate::message::{ChatMessage, Role};

pub const HEALTH_ERROR: &str = "Cannot connect to backend. The server might be down.";
pub const STATS_ERROR: &str = "Failed to load statistics";
pub const CHAT_ERROR: &str = "Error: Could not get response. Check if backend is running.";

/// Outcome of a backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success { data: T },
    Failure { error: String },
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiResponse::Success { data } => Some(data),
            ApiResponse::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ApiResponse::Success { .. } => None,
            ApiResponse::Failure { error } => Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            ApiResponse::Success { data } => Ok(data),
            ApiResponse::Failure { error } => Err(error),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
    #[error("Request to backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Backend request failed with status {status}")]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("Unexpected backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Server supplied `detail` of an error response, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

/// Catalogue statistics reported by `/api/stats`.
///
/// Fields of an unexpected shape read as absent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Stats {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_products: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_outlets: Option<u64>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub regions: Option<Vec<String>>,
}

/// Body of a successful `/api/chat` response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ChatReply {
    #[serde(default, alias = "answer", deserialize_with = "lenient_text")]
    pub response: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub search_info: Option<Value>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub products_found: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub outlets_found: Option<u64>,
    #[serde(default)]
    pub planning_info: Option<Value>,
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_to_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(value_to_text(Value::deserialize(deserializer)?).filter(|id| !id.is_empty()))
}

/// Accepts integers, floats (truncated) and numeric strings.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let count = match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| *f >= 0.0)
            .map(|f| f as u64),
        _ => None,
    };
    Ok(count)
}

fn lenient_strings<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(items.into_iter().filter_map(value_to_text).collect())),
        _ => Ok(None),
    }
}

impl ChatReply {
    /// Turns the reply into the agent message appended to the conversation.
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage {
            search_info: self.search_info.clone(),
            products_found: self.products_found,
            outlets_found: self.outlets_found,
            planning_info: self.planning_info.clone(),
            ..ChatMessage::new(Role::Agent, self.response.clone())
        }
    }
}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    question: &'a str,
    session_id: Option<&'a str>,
}

/// Client for the three backend endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: Url) -> Result<Self, ApiError> {
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url,
            client: Client::new(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(config.api_url.clone())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GET `/health`.
    pub async fn check_health(&self) -> ApiResponse<Value> {
        match self.get_json::<Value>(&["health"]).await {
            Ok(data) => ApiResponse::Success { data },
            Err(e) => {
                debug!("Health check failed: {e}");
                ApiResponse::Failure {
                    error: HEALTH_ERROR.to_string(),
                }
            }
        }
    }

    /// GET `/api/stats`.
    pub async fn get_stats(&self) -> ApiResponse<Stats> {
        match self.get_json::<Stats>(&["api", "stats"]).await {
            Ok(data) => ApiResponse::Success { data },
            Err(e) => {
                error!("Error loading stats: {e}");
                ApiResponse::Failure {
                    error: STATS_ERROR.to_string(),
                }
            }
        }
    }

    /// POST `/api/chat` with `{question, session_id}`.
    pub async fn send_chat_message(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> ApiResponse<ChatReply> {
        let body = ChatRequest {
            question: message,
            session_id,
        };
        match self.post_json::<_, ChatReply>(&["api", "chat"], &body).await {
            Ok(data) => ApiResponse::Success { data },
            Err(e) => {
                error!("Error sending message: {e}");
                ApiResponse::Failure {
                    error: e.detail().unwrap_or(CHAT_ERROR).to_string(),
                }
            }
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        read_json(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        debug!("POST {url}");
        let response = self.client.post(url).json(body).send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status,
            detail: extract_detail(&text),
        });
    }
    let body = parse_body(&response.text().await?);
    Ok(serde_json::from_value(body)?)
}

/// Any 2xx body is accepted: JSON when it parses, the raw text otherwise, and
/// `null` when empty.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Pulls `detail` out of an error body. Empty, null, false and zero count as absent.
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(Url::parse(&server.uri()).unwrap()).unwrap()
    }

    fn unreachable_client() -> ApiClient {
        ApiClient::new(Url::parse("http://127.0.0.1:1").unwrap()).unwrap()
    }

    #[test]
    fn test_extract_detail() {
        assert_eq!(
            extract_detail(r#"{"detail": "rate limited"}"#),
            Some("rate limited".to_string())
        );
        assert_eq!(extract_detail(r#"{"detail": ""}"#), None);
        assert_eq!(extract_detail(r#"{"detail": null}"#), None);
        assert_eq!(extract_detail(r#"{"message": "nope"}"#), None);
        assert_eq!(extract_detail("Internal Server Error"), None);
        assert_eq!(
            extract_detail(r#"{"detail": [{"msg": "field required"}]}"#),
            Some(r#"[{"msg":"field required"}]"#.to_string())
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = ApiClient::new(Url::parse("https://example.com/backend/").unwrap()).unwrap();
        assert_eq!(
            client.endpoint(&["api", "chat"]).unwrap().as_str(),
            "https://example.com/backend/api/chat"
        );

        let client = ApiClient::new(Url::parse("http://localhost:8000").unwrap()).unwrap();
        assert_eq!(
            client.endpoint(&["health"]).unwrap().as_str(),
            "http://localhost:8000/health"
        );
    }

    #[test]
    fn test_new_rejects_non_base_url() {
        let result = ApiClient::new(Url::parse("mailto:ops@example.com").unwrap());
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_chat_request_body() {
        let body = ChatRequest {
            question: "hi",
            session_id: None,
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"question": "hi", "session_id": null})
        );
    }

    #[tokio::test]
    async fn test_check_health_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&server)
            .await;

        let result = client_for(&server).check_health().await;
        assert_eq!(
            result,
            ApiResponse::Success {
                data: json!({"status": "ok"})
            }
        );
    }

    #[tokio::test]
    async fn test_check_health_plain_text_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .mount(&server)
            .await;

        let result = client_for(&server).check_health().await;
        assert_eq!(
            result,
            ApiResponse::Success {
                data: Value::String("OK".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_check_health_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let result = client_for(&server).check_health().await;
        assert_eq!(result, ApiResponse::Success { data: Value::Null });
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("  \n"), Value::Null);
        assert_eq!(parse_body(r#"{"a": 1}"#), json!({"a": 1}));
        assert_eq!(parse_body("healthy"), json!("healthy"));
    }

    #[test]
    fn test_stats_lenient_fields() {
        let stats: Stats = serde_json::from_value(json!({
            "total_products": 12.0,
            "total_outlets": "210",
            "regions": ["KL", 5, null]
        }))
        .unwrap();
        assert_eq!(stats.total_products, Some(12));
        assert_eq!(stats.total_outlets, Some(210));
        assert_eq!(stats.regions, Some(vec!["KL".to_string(), "5".to_string()]));

        let stats: Stats = serde_json::from_value(json!({
            "total_products": -3,
            "total_outlets": {"n": 1},
            "regions": "Selangor"
        }))
        .unwrap();
        assert_eq!(stats, Stats::default());
    }

    #[tokio::test]
    async fn test_send_chat_message_null_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": null,
                "session_id": "s",
                "products_found": "2"
            })))
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .send_chat_message("hello", None)
            .await
            .into_result()
            .unwrap();
        assert_eq!(reply.response, "");
        assert_eq!(reply.session_id.as_deref(), Some("s"));
        assert_eq!(reply.products_found, Some(2));
    }

    #[tokio::test]
    async fn test_send_chat_message_non_object_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let result = client_for(&server).send_chat_message("hello", None).await;
        assert_eq!(result.error(), Some(CHAT_ERROR));
    }

    #[tokio::test]
    async fn test_check_health_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client_for(&server).check_health().await;
        assert_eq!(result.error(), Some(HEALTH_ERROR));
    }

    #[tokio::test]
    async fn test_check_health_unreachable() {
        let result = unreachable_client().check_health().await;
        assert!(!result.is_success());
        assert_eq!(result.error(), Some(HEALTH_ERROR));
    }

    #[tokio::test]
    async fn test_get_stats_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_products": 12,
                "total_outlets": 210,
                "regions": ["Kuala Lumpur", "Selangor"],
                "last_updated": "yesterday"
            })))
            .mount(&server)
            .await;

        let stats = client_for(&server).get_stats().await.into_result().unwrap();
        assert_eq!(
            stats,
            Stats {
                total_products: Some(12),
                total_outlets: Some(210),
                regions: Some(vec!["Kuala Lumpur".to_string(), "Selangor".to_string()]),
            }
        );
    }

    #[tokio::test]
    async fn test_get_stats_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "db down"})))
            .mount(&server)
            .await;

        let result = client_for(&server).get_stats().await;
        assert_eq!(
            result,
            ApiResponse::Failure {
                error: STATS_ERROR.to_string()
            }
        );
        assert!(result.data().is_none());
    }

    #[tokio::test]
    async fn test_send_chat_message_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(json!({"question": "Any tumblers?", "session_id": null})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "We have 3 tumblers.",
                "session_id": "sess-1",
                "products_found": 3,
                "planning_info": {"steps": ["search"]}
            })))
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .send_chat_message("Any tumblers?", None)
            .await
            .into_result()
            .unwrap();
        assert_eq!(reply.response, "We have 3 tumblers.");
        assert_eq!(reply.session_id.as_deref(), Some("sess-1"));

        let message = reply.to_message();
        assert_eq!(message.role, Role::Agent);
        assert_eq!(message.products_found, Some(3));
        assert!(message.planning_info.is_some());
    }

    #[tokio::test]
    async fn test_send_chat_message_forwards_session_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(json!({"question": "and in KL?", "session_id": "sess-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "5 outlets"})))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .send_chat_message("and in KL?", Some("sess-1"))
            .await;
        assert_eq!(result.data().unwrap().response, "5 outlets");
    }

    #[tokio::test]
    async fn test_send_chat_message_server_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"detail": "rate limited"})),
            )
            .mount(&server)
            .await;

        let result = client_for(&server).send_chat_message("hi", None).await;
        assert_eq!(
            result,
            ApiResponse::Failure {
                error: "rate limited".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_send_chat_message_generic_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let result = client_for(&server).send_chat_message("hi", None).await;
        assert_eq!(result.error(), Some(CHAT_ERROR));

        let result = unreachable_client().send_chat_message("hi", None).await;
        assert_eq!(result.error(), Some(CHAT_ERROR));
    }
}
