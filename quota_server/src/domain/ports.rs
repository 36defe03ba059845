use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::entities::GenerationParams;
use crate::domain::errors::GeneratorError;

// Port for the per-guest daily run counters.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn runs_used(&self, guest_id: &str, day: NaiveDate) -> Result<u32, String>;

    // Atomically consumes one run. Returns the new count, or None when the
    // guest is already at `limit` for `day`.
    async fn try_consume(
        &self,
        guest_id: &str,
        day: NaiveDate,
        limit: u32,
    ) -> Result<Option<u32>, String>;
}

// Port for whatever produces the text.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, params: &GenerationParams) -> Result<Vec<String>, GeneratorError>;
}

// Port for checking member access tokens.
pub trait MemberVerifier: Send + Sync {
    fn is_member(&self, access_token: &str) -> bool;
}

// Port for retrieving the current UTC day.
pub trait Clock: Send + Sync {
    fn today_utc(&self) -> NaiveDate;
}
