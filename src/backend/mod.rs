//! Generative backends.
//!
//! A [`Backend`] turns a prompt into a fresh answer on a cache miss. The
//! shipped implementation talks to an Ollama-compatible `/api/generate`
//! endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::BackendConfig;
use crate::error::{EvictaError, Result};

/// Source of fresh responses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Non-streaming client for Ollama's `/api/generate`.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    url: String,
    model: String,
    client: Client,
}

impl OllamaBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| EvictaError::Backend(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            url: config.url.clone(),
            model: config.model.clone(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn extract_response(json: &Value) -> Result<String> {
        json.get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| EvictaError::Backend("response field missing from backend reply".into()))
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, url = %self.url, "Backend request");

        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EvictaError::Backend(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EvictaError::Backend(format!(
                "backend returned {}: {}",
                status.as_u16(),
                text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| EvictaError::Backend(format!("failed to parse backend reply: {}", e)))?;
        Self::extract_response(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let body = GenerateRequest {
            model: "gemma:2b",
            prompt: "hello",
            stream: false,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"model": "gemma:2b", "prompt": "hello", "stream": false})
        );
    }

    #[test]
    fn test_extract_response() {
        let reply = json!({"model": "gemma:2b", "response": "Hi there", "done": true});
        assert_eq!(OllamaBackend::extract_response(&reply).unwrap(), "Hi there");
    }

    #[test]
    fn test_missing_response_field_is_backend_error() {
        let err = OllamaBackend::extract_response(&json!({"done": true})).unwrap_err();
        assert!(matches!(err, EvictaError::Backend(_)));
        let err = OllamaBackend::extract_response(&json!({"response": 42})).unwrap_err();
        assert!(matches!(err, EvictaError::Backend(_)));
    }

    #[test]
    fn test_new_from_config() {
        let backend = OllamaBackend::new(&BackendConfig::default()).unwrap();
        assert_eq!(backend.model(), "gemma:2b");
    }

    #[tokio::test]
    async fn test_unreachable_backend_errors() {
        let config = BackendConfig {
            url: "http://127.0.0.1:1/api/generate".into(),
            timeout_secs: 1,
            ..BackendConfig::default()
        };
        let backend = OllamaBackend::new(&config).unwrap();
        let err = backend.generate("hello").await.unwrap_err();
        assert!(matches!(err, EvictaError::Backend(_)));
    }

    #[cfg(feature = "server")]
    mod http {
        use super::*;
        use axum::http::StatusCode;
        use axum::routing::post;
        use axum::{Json, Router};

        async fn serve(router: Router) -> String {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });
            format!("http://{}/api/generate", addr)
        }

        fn backend(url: String) -> OllamaBackend {
            OllamaBackend::new(&BackendConfig {
                url,
                ..BackendConfig::default()
            })
            .unwrap()
        }

        #[tokio::test]
        async fn test_generate_round_trip() {
            let router = Router::new().route(
                "/api/generate",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["stream"], false);
                    assert_eq!(body["model"], "gemma:2b");
                    let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
                    Json(json!({"response": format!("echo: {prompt}"), "done": true}))
                }),
            );
            let url = serve(router).await;
            assert_eq!(backend(url).generate("hi").await.unwrap(), "echo: hi");
        }

        #[tokio::test]
        async fn test_non_success_status_is_backend_error() {
            let router = Router::new().route(
                "/api/generate",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model not loaded") }),
            );
            let url = serve(router).await;
            let err = backend(url).generate("hi").await.unwrap_err();
            match err {
                EvictaError::Backend(msg) => {
                    assert!(msg.contains("500"));
                    assert!(msg.contains("model not loaded"));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
