use async_trait::async_trait;
use indexmap::IndexMap;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::config::Config;

/// Label to confidence in `[0, 1]`, in the order the service returned them.
pub type ConfidenceMap = IndexMap<String, f64>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AnalysisResult {
    #[serde(default)]
    pub race: ConfidenceMap,
    #[serde(default)]
    pub age: ConfidenceMap,
    #[serde(default)]
    pub gender: ConfidenceMap,
}

#[derive(Serialize)]
struct IdentityRequest<'a> {
    name: &'a str,
    location: &'a str,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    image: &'a str,
}

#[derive(Deserialize)]
struct PhaseTwoResponse {
    data: Option<AnalysisResult>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status} {reason}: {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },
    #[error("No analysis data returned from API")]
    MissingData,
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Inline message for the location form.
    pub fn submission_message(&self) -> String {
        match self {
            ApiError::Status { body, .. } if body.trim().is_empty() => {
                "Submission failed.".to_string()
            }
            ApiError::Status { body, .. } => format!("Submission failed: {}", body),
            other => format!("Submission failed: {}", other),
        }
    }

    /// Message shown on the capture screen.
    pub fn upload_message(&self) -> String {
        match self {
            ApiError::Status { reason, .. } => format!("Upload failed: {}", reason),
            other => other.to_string(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub trait ApiBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> ApiBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait ApiBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> ApiBounds for T {}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait AnalysisApi: ApiBounds {
    /// Phase one: identity intake. Any 2xx is success.
    async fn submit_identity(&self, name: &str, location: &str) -> Result<(), ApiError>;

    /// Phase two: `base64_image` is the bare payload, no data-URI prefix.
    async fn upload_image(&self, base64_image: &str) -> Result<AnalysisResult, ApiError>;
}

pub struct SkinstricClient {
    phase_one_url: String,
    phase_two_url: String,
    client: Client,
}

impl SkinstricClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        #[cfg(not(target_arch = "wasm32"))]
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_seconds))
            .build()?;
        #[cfg(target_arch = "wasm32")]
        let client = Client::new();

        Ok(Self {
            phase_one_url: config.phase_one_url.clone(),
            phase_two_url: config.phase_two_url.clone(),
            client,
        })
    }
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let reason = status.canonical_reason().unwrap_or("").to_string();
    let body = resp.text().await.unwrap_or_default();
    warn!("Request failed with {}: {}", status, body);
    Err(ApiError::Status {
        status: status.as_u16(),
        reason,
        body,
    })
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AnalysisApi for SkinstricClient {
    async fn submit_identity(&self, name: &str, location: &str) -> Result<(), ApiError> {
        info!("Submitting identity for {}", name);
        let resp = self
            .client
            .post(&self.phase_one_url)
            .json(&IdentityRequest { name, location })
            .send()
            .await?;
        error_for_status(resp).await?;
        Ok(())
    }

    async fn upload_image(&self, base64_image: &str) -> Result<AnalysisResult, ApiError> {
        debug!("Uploading image ({} base64 chars)", base64_image.len());
        let resp = self
            .client
            .post(&self.phase_two_url)
            .json(&ImageRequest { image: base64_image })
            .send()
            .await?;
        let resp = error_for_status(resp).await?;

        let text = resp.text().await?;
        let parsed: PhaseTwoResponse = serde_json::from_str(&text)?;
        let data = parsed.data.ok_or(ApiError::MissingData)?;
        info!(
            "Analysis returned {} race, {} age, {} gender labels",
            data.race.len(),
            data.age.len(),
            data.gender.len()
        );
        Ok(data)
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn spawn_endpoints() -> String {
        let app = Router::new()
            .route(
                "/one/ok",
                post(|Json(body): Json<Value>| async move {
                    if body["name"].is_string() && body["location"].is_string() {
                        (StatusCode::OK, "saved".to_string())
                    } else {
                        (StatusCode::BAD_REQUEST, "missing fields".to_string())
                    }
                }),
            )
            .route(
                "/one/fail",
                post(|| async { (StatusCode::BAD_REQUEST, "location is required") }),
            )
            .route(
                "/one/empty",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "") }),
            )
            .route(
                "/two/ok",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["image"], "/9j/");
                    Json(json!({
                        "message": "success",
                        "data": {
                            "race": {"white": 0.2, "east asian": 0.7, "black": 0.1},
                            "age": {"20-29": 0.6, "30-39": 0.4},
                            "gender": {"female": 0.55, "male": 0.45}
                        }
                    }))
                }),
            )
            .route(
                "/two/nodata",
                post(|| async { Json(json!({"message": "no face detected"})) }),
            )
            .route(
                "/two/fail",
                post(|| async { (StatusCode::BAD_REQUEST, "bad image") }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn client(base: &str, one: &str, two: &str) -> SkinstricClient {
        let config = Config {
            phase_one_url: format!("{}/one/{}", base, one),
            phase_two_url: format!("{}/two/{}", base, two),
            request_timeout_seconds: 5,
            ..Config::default()
        };
        SkinstricClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_submit_identity_ok() {
        let base = spawn_endpoints().await;
        let api = client(&base, "ok", "ok");
        api.submit_identity("Ada", "London").await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_identity_failure_message() {
        let base = spawn_endpoints().await;

        let err = client(&base, "fail", "ok")
            .submit_identity("Ada", "London")
            .await
            .unwrap_err();
        assert_eq!(err.submission_message(), "Submission failed: location is required");

        let err = client(&base, "empty", "ok")
            .submit_identity("Ada", "London")
            .await
            .unwrap_err();
        assert_eq!(err.submission_message(), "Submission failed.");
    }

    #[tokio::test]
    async fn test_submit_identity_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = client(&base, "ok", "ok")
            .submit_identity("Ada", "London")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(err.submission_message().starts_with("Submission failed: "));
    }

    #[tokio::test]
    async fn test_upload_image_keeps_response_order() {
        let base = spawn_endpoints().await;
        let data = client(&base, "ok", "ok").upload_image("/9j/").await.unwrap();
        let race: Vec<&str> = data.race.keys().map(|k| k.as_str()).collect();
        assert_eq!(race, vec!["white", "east asian", "black"]);
        assert_eq!(data.gender["female"], 0.55);
    }

    #[tokio::test]
    async fn test_upload_image_missing_data() {
        let base = spawn_endpoints().await;
        let err = client(&base, "ok", "nodata").upload_image("/9j/").await.unwrap_err();
        assert!(matches!(err, ApiError::MissingData));
        assert_eq!(err.upload_message(), "No analysis data returned from API");
    }

    #[tokio::test]
    async fn test_upload_image_bad_status() {
        let base = spawn_endpoints().await;
        let err = client(&base, "ok", "fail").upload_image("/9j/").await.unwrap_err();
        assert_eq!(err.upload_message(), "Upload failed: Bad Request");
    }
}
