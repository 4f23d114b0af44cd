//! Remote face comparison over HTTP.
//!
//! Speaks the CompareFaces JSON shape: base64 image bytes in, a list of
//! `FaceMatches` with percentage similarities out. The endpoint is usually
//! a signing gateway in front of the cloud face API.

use crate::comparator::{CompareError, Comparator};
use crate::types::ComparisonResult;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_SIMILARITY_THRESHOLD: f32 = 80.0;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the remote comparison API.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Full URL of the CompareFaces endpoint.
    pub endpoint: String,
    /// Sent as `Authorization: Bearer <key>` when set.
    pub api_key: Option<String>,
    /// Minimum similarity the API itself uses to report a face match.
    pub similarity_threshold: f32,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CompareFacesRequest {
    source_image: ImagePayload,
    target_image: ImagePayload,
    similarity_threshold: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ImagePayload {
    bytes: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CompareFacesResponse {
    #[serde(default)]
    face_matches: Vec<FaceMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FaceMatch {
    similarity: f32,
}

/// Comparator backed by a remote face-comparison API.
///
/// Holds its own pooled HTTP client; construct once and share.
pub struct RemoteFaceComparator {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl RemoteFaceComparator {
    pub fn new(config: RemoteConfig) -> Result<Self, CompareError> {
        if config.endpoint.trim().is_empty() {
            return Err(CompareError::InvalidConfig(
                "remote endpoint URL is empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn build_request(&self, reference: &[u8], captured: &[u8]) -> CompareFacesRequest {
        CompareFacesRequest {
            source_image: ImagePayload {
                bytes: STANDARD.encode(reference),
            },
            target_image: ImagePayload {
                bytes: STANDARD.encode(captured),
            },
            similarity_threshold: self.config.similarity_threshold,
        }
    }
}

/// Interpret a CompareFaces response body.
///
/// Any face match means the leg matched; the best similarity among them is
/// reported.
fn parse_response(body: serde_json::Value) -> Result<ComparisonResult, CompareError> {
    let response: CompareFacesResponse = serde_json::from_value(body)
        .map_err(|e| CompareError::InvalidResponse(e.to_string()))?;

    let best = response
        .face_matches
        .iter()
        .map(|m| m.similarity)
        .filter(|s| !s.is_nan())
        .fold(None, |best: Option<f32>, s| Some(best.map_or(s, |b| b.max(s))));

    tracing::debug!(
        face_matches = response.face_matches.len(),
        best_similarity = ?best,
        "remote comparison response"
    );

    Ok(match best {
        Some(similarity) => ComparisonResult::matched(similarity),
        None => ComparisonResult::unmatched(),
    })
}

#[async_trait]
impl Comparator for RemoteFaceComparator {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn compare(
        &self,
        reference: &[u8],
        captured: &[u8],
    ) -> Result<ComparisonResult, CompareError> {
        let payload = self.build_request(reference, captured);

        let mut request = self.client.post(&self.config.endpoint).json(&payload);
        if let Some(key) = self.config.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    tracing::debug!(status, error = %err, "failed to read error response body");
                    format!("<unreadable body: {err}>")
                }
            };
            return Err(CompareError::Api { status, body });
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| CompareError::InvalidResponse(e.to_string()))?;
        parse_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// Authorization header and JSON body of the last request a stub saw.
    type Seen = Arc<Mutex<Option<(Option<String>, Value)>>>;

    /// Serve `router` on an ephemeral local port and return its endpoint URL.
    async fn serve_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}/compare-faces")
    }

    /// Stub CompareFaces endpoint that records each request and replies
    /// with `reply`.
    async fn recording_stub(reply: Value) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let router = Router::new()
            .route(
                "/compare-faces",
                post(
                    move |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| {
                        let reply = reply.clone();
                        async move {
                            let auth = headers
                                .get(header::AUTHORIZATION)
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string);
                            *seen.lock().unwrap() = Some((auth, body));
                            Json(reply)
                        }
                    },
                ),
            )
            .with_state(seen.clone());
        (serve_stub(router).await, seen)
    }

    fn comparator(endpoint: String, api_key: Option<&str>) -> RemoteFaceComparator {
        let mut config = RemoteConfig::new(endpoint);
        config.api_key = api_key.map(str::to_string);
        config.timeout = Duration::from_secs(5);
        RemoteFaceComparator::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_compare_sends_bearer_and_reads_face_matches() {
        let (endpoint, seen) =
            recording_stub(json!({ "FaceMatches": [{ "Similarity": 91.5 }, { "Similarity": 84.0 }] }))
                .await;

        let result = comparator(endpoint, Some("secret"))
            .compare(b"ref", b"cap")
            .await
            .unwrap();
        assert!(result.matched);
        assert_eq!(result.score, Some(91.5));

        let (auth, body) = seen.lock().unwrap().take().unwrap();
        assert_eq!(auth.as_deref(), Some("Bearer secret"));
        assert_eq!(body["SourceImage"]["Bytes"], "cmVm");
        assert_eq!(body["TargetImage"]["Bytes"], "Y2Fw");
    }

    #[tokio::test]
    async fn test_compare_without_key_sends_no_authorization() {
        let (endpoint, seen) = recording_stub(json!({ "FaceMatches": [] })).await;

        let result = comparator(endpoint, None).compare(b"ref", b"cap").await.unwrap();
        assert_eq!(result, ComparisonResult::unmatched());

        let (auth, _) = seen.lock().unwrap().take().unwrap();
        assert!(auth.is_none());
    }

    #[tokio::test]
    async fn test_compare_maps_error_status() {
        let router = Router::new().route(
            "/compare-faces",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "throttled") }),
        );
        let endpoint = serve_stub(router).await;

        let err = comparator(endpoint, Some("secret"))
            .compare(b"ref", b"cap")
            .await
            .unwrap_err();
        match err {
            CompareError::Api { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "throttled");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_compare_rejects_non_json_success() {
        let router = Router::new().route("/compare-faces", post(|| async { "not json" }));
        let endpoint = serve_stub(router).await;

        let err = comparator(endpoint, None)
            .compare(b"ref", b"cap")
            .await
            .unwrap_err();
        assert!(matches!(err, CompareError::InvalidResponse(_)));
    }

    #[test]
    fn test_request_shape() {
        let cmp = RemoteFaceComparator::new(RemoteConfig::new("http://localhost:9/compare")).unwrap();
        let body = serde_json::to_value(cmp.build_request(b"ref", b"cap")).unwrap();
        assert_eq!(
            body,
            json!({
                "SourceImage": { "Bytes": "cmVm" },
                "TargetImage": { "Bytes": "Y2Fw" },
                "SimilarityThreshold": 80.0,
            })
        );
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let err = RemoteFaceComparator::new(RemoteConfig::new("  ")).err().unwrap();
        assert!(matches!(err, CompareError::InvalidConfig(_)));
    }

    #[test]
    fn test_parse_best_face_match() {
        let result = parse_response(json!({
            "SourceImageFace": { "Confidence": 99.9 },
            "FaceMatches": [
                { "Similarity": 88.25, "Face": {} },
                { "Similarity": 97.5, "Face": {} },
            ],
            "UnmatchedFaces": [],
        }))
        .unwrap();
        assert!(result.matched);
        assert_eq!(result.score, Some(97.5));
    }

    #[test]
    fn test_parse_no_face_matches() {
        let result = parse_response(json!({ "FaceMatches": [], "UnmatchedFaces": [{}] })).unwrap();
        assert_eq!(result, ComparisonResult::unmatched());

        let result = parse_response(json!({})).unwrap();
        assert!(!result.matched);
    }

    #[test]
    fn test_parse_malformed_response() {
        let err = parse_response(json!({ "FaceMatches": "nope" })).unwrap_err();
        assert!(matches!(err, CompareError::InvalidResponse(_)));
    }
}
