use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::domain::errors::GenerationFailure;
use crate::domain::generation::{GenerationRequest, GenerationSuccess};
use crate::domain::identity::{Caller, GuestIdentity};
use crate::domain::ports::GenerationService;
use crate::domain::quota::ServerGuestLimits;
use crate::interface_adapters::protocol::{
    GenerateRequestBody, classify_failure, decode_limits, decode_success,
};

// Thin reqwest client for the quota server.
#[derive(Clone)]
pub struct GenerationClient {
    http: Client,
    base_url: Url,
}

impl GenerationClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GenerationFailure> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GenerationFailure::Transport(format!("invalid base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // Returns the status and raw body, or a transport failure.
    async fn read(response: reqwest::Response) -> Result<(u16, String), GenerationFailure> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| GenerationFailure::Transport(err.to_string()))?;
        Ok((status, body))
    }
}

#[async_trait]
impl GenerationService for GenerationClient {
    async fn generate(
        &self,
        caller: &Caller,
        request: &GenerationRequest,
    ) -> Result<GenerationSuccess, GenerationFailure> {
        let url = self.endpoint(&["generate"])?;
        let body = GenerateRequestBody {
            guest_id: match caller {
                Caller::Guest(guest) => Some(guest.as_str()),
                Caller::Member { .. } => None,
            },
            kind: request.kind,
            profile_text: &request.profile_text,
            tone: request.tone.as_deref(),
        };

        let mut builder = self.http.post(url).json(&body);
        if let Caller::Member { access_token } = caller {
            builder = builder.bearer_auth(access_token);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| GenerationFailure::Transport(err.to_string()))?;
        let (status, body) = Self::read(response).await?;

        if (200..300).contains(&status) {
            decode_success(&body)
        } else {
            Err(classify_failure(status, &body))
        }
    }

    async fn guest_limits(
        &self,
        guest: &GuestIdentity,
    ) -> Result<ServerGuestLimits, GenerationFailure> {
        let mut url = self.endpoint(&["guest", "limits"])?;
        url.query_pairs_mut().append_pair("guestId", guest.as_str());

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| GenerationFailure::Transport(err.to_string()))?;
        let (status, body) = Self::read(response).await?;

        if (200..300).contains(&status) {
            decode_limits(&body)
        } else {
            Err(classify_failure(status, &body))
        }
    }
}
