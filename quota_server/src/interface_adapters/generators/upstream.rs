use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::entities::{GenerationKind, GenerationParams};
use crate::domain::errors::GeneratorError;
use crate::domain::ports::Generator;

// Number of candidates requested from the upstream model per run.
const CANDIDATES_PER_REQUEST: u32 = 3;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamRequest<'a> {
    kind: GenerationKind,
    profile_text: &'a str,
    tone: Option<&'a str>,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct UpstreamResponse {
    results: Vec<String>,
}

// Thin reqwest client for the hosted text-generation backend.
#[derive(Clone)]
pub struct UpstreamGenerator {
    http: Client,
    base_url: String,
}

impl UpstreamGenerator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl Generator for UpstreamGenerator {
    async fn generate(&self, params: &GenerationParams) -> Result<Vec<String>, GeneratorError> {
        let url = format!("{}/v1/generate", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .json(&UpstreamRequest {
                kind: params.kind,
                profile_text: &params.profile_text,
                tone: params.tone.as_deref(),
                count: CANDIDATES_PER_REQUEST,
            })
            .send()
            .await
            .map_err(|err| GeneratorError::Unavailable(format!("transport: {err}")))?;

        let status = res.status();
        if status == StatusCode::PAYMENT_REQUIRED {
            return Err(GeneratorError::CreditsExhausted);
        }
        if !status.is_success() {
            return Err(GeneratorError::Unavailable(format!("upstream status {status}")));
        }

        res.json::<UpstreamResponse>()
            .await
            .map(|body| body.results)
            .map_err(|err| GeneratorError::Unavailable(format!("decode: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode as AxumStatus, response::IntoResponse, routing::post};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    // Serves `reply` on POST /v1/generate and records the last request body.
    async fn spawn_upstream(
        status: AxumStatus,
        body: &'static str,
    ) -> (String, Arc<Mutex<Option<Value>>>) {
        let seen = Arc::new(Mutex::new(None));
        let recorder = seen.clone();
        let app = Router::new().route(
            "/v1/generate",
            post(move |Json(request): Json<Value>| {
                let recorder = recorder.clone();
                async move {
                    *recorder.lock().expect("recorder mutex poisoned") = Some(request);
                    (status, [("content-type", "application/json")], body).into_response()
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub upstream");
        let address = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub upstream stopped");
        });

        (format!("http://{address}/"), seen)
    }

    fn params() -> GenerationParams {
        GenerationParams {
            kind: GenerationKind::BioReview,
            profile_text: "Weekend sailor".to_string(),
            tone: Some("playful".to_string()),
        }
    }

    fn generator(base_url: String) -> UpstreamGenerator {
        UpstreamGenerator::new(base_url, Duration::from_secs(2)).expect("build client")
    }

    #[tokio::test]
    async fn when_upstream_succeeds_then_results_are_returned_and_request_is_camel_case() {
        let (base_url, seen) = spawn_upstream(AxumStatus::OK, r#"{"results":["a","b","c"]}"#).await;

        let results = generator(base_url).generate(&params()).await.expect("generate");

        assert_eq!(results, vec!["a", "b", "c"]);
        let request = seen.lock().expect("recorder mutex poisoned").clone();
        assert_eq!(
            request,
            Some(json!({
                "kind": "bio_review",
                "profileText": "Weekend sailor",
                "tone": "playful",
                "count": CANDIDATES_PER_REQUEST,
            }))
        );
    }

    #[tokio::test]
    async fn when_upstream_returns_402_then_credits_are_exhausted() {
        let (base_url, _) = spawn_upstream(AxumStatus::PAYMENT_REQUIRED, r#"{"error":"credits"}"#).await;

        let result = generator(base_url).generate(&params()).await;

        assert!(matches!(result, Err(GeneratorError::CreditsExhausted)));
    }

    #[tokio::test]
    async fn when_upstream_returns_other_non_2xx_then_it_is_unavailable() {
        for status in [AxumStatus::INTERNAL_SERVER_ERROR, AxumStatus::TOO_MANY_REQUESTS, AxumStatus::UNAUTHORIZED] {
            let (base_url, _) = spawn_upstream(status, r#"{"results":["ignored"]}"#).await;

            let result = generator(base_url).generate(&params()).await;

            assert!(
                matches!(&result, Err(GeneratorError::Unavailable(reason)) if reason.contains("status")),
                "status {status} gave {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn when_upstream_body_does_not_decode_then_it_is_unavailable() {
        let (base_url, _) = spawn_upstream(AxumStatus::OK, r#"{"choices":[]}"#).await;

        let result = generator(base_url).generate(&params()).await;

        assert!(matches!(&result, Err(GeneratorError::Unavailable(reason)) if reason.starts_with("decode")));
    }

    #[tokio::test]
    async fn when_upstream_is_unreachable_then_it_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        drop(listener);

        let result = generator(format!("http://{address}")).generate(&params()).await;

        assert!(matches!(&result, Err(GeneratorError::Unavailable(reason)) if reason.starts_with("transport")));
    }
}
