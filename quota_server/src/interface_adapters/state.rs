use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::ports::{Clock, MemberVerifier, UsageStore};
use crate::interface_adapters::generators::{FallbackGenerator, TemplateGenerator, UpstreamGenerator};

pub type UsageTable = Arc<Mutex<HashMap<(String, NaiveDate), u32>>>;

// Application state shared by the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub usage: UsageBackend,
    pub generator: FallbackGenerator<UpstreamGenerator, TemplateGenerator>,
    pub members: StaticMemberTokens,
}

impl AppState {
    // Memory-backed counters and template output; no outside services needed.
    pub fn in_memory(member_tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            usage: UsageBackend::Memory(InMemoryUsageStore::default()),
            generator: FallbackGenerator {
                primary: None,
                fallback: TemplateGenerator,
            },
            members: StaticMemberTokens::new(member_tokens),
        }
    }
}

// Member access tokens accepted by this instance.
#[derive(Clone, Default)]
pub struct StaticMemberTokens {
    tokens: Arc<HashSet<String>>,
}

impl StaticMemberTokens {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: Arc::new(
                tokens
                    .into_iter()
                    .map(|token| token.trim().to_string())
                    .filter(|token| !token.is_empty())
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl MemberVerifier for StaticMemberTokens {
    fn is_member(&self, access_token: &str) -> bool {
        !access_token.is_empty() && self.tokens.contains(access_token)
    }
}

// Usage store selected once at startup.
#[derive(Clone)]
pub enum UsageBackend {
    Memory(InMemoryUsageStore),
    Postgres(PostgresUsageStore),
}

#[async_trait]
impl UsageStore for UsageBackend {
    async fn runs_used(&self, guest_id: &str, day: NaiveDate) -> Result<u32, String> {
        match self {
            UsageBackend::Memory(store) => store.runs_used(guest_id, day).await,
            UsageBackend::Postgres(store) => store.runs_used(guest_id, day).await,
        }
    }

    async fn try_consume(
        &self,
        guest_id: &str,
        day: NaiveDate,
        limit: u32,
    ) -> Result<Option<u32>, String> {
        match self {
            UsageBackend::Memory(store) => store.try_consume(guest_id, day, limit).await,
            UsageBackend::Postgres(store) => store.try_consume(guest_id, day, limit).await,
        }
    }
}

// In-memory usage counters for single-instance deployments and tests.
#[derive(Clone, Default)]
pub struct InMemoryUsageStore {
    pub usage: UsageTable,
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn runs_used(&self, guest_id: &str, day: NaiveDate) -> Result<u32, String> {
        let usage = self.usage.lock().await;
        Ok(usage
            .get(&(guest_id.to_string(), day))
            .copied()
            .unwrap_or(0))
    }

    async fn try_consume(
        &self,
        guest_id: &str,
        day: NaiveDate,
        limit: u32,
    ) -> Result<Option<u32>, String> {
        let mut usage = self.usage.lock().await;
        // Counters for earlier days can never be read again.
        usage.retain(|(_, counted_day), _| *counted_day >= day);

        let used = usage.entry((guest_id.to_string(), day)).or_insert(0);
        if *used >= limit {
            return Ok(None);
        }
        *used += 1;
        Ok(Some(*used))
    }
}

// PostgreSQL-backed usage counters shared across server instances.
#[derive(Clone)]
pub struct PostgresUsageStore {
    pub db: PgPool,
}

#[async_trait]
impl UsageStore for PostgresUsageStore {
    async fn runs_used(&self, guest_id: &str, day: NaiveDate) -> Result<u32, String> {
        let runs: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT runs_used FROM guest_usage
            WHERE guest_id = $1 AND usage_day = $2
            "#,
        )
        .bind(guest_id)
        .bind(day)
        .fetch_optional(&self.db)
        .await
        .map_err(|err| err.to_string())?;

        Ok(runs.map(|value| value.max(0) as u32).unwrap_or(0))
    }

    async fn try_consume(
        &self,
        guest_id: &str,
        day: NaiveDate,
        limit: u32,
    ) -> Result<Option<u32>, String> {
        if limit == 0 {
            return Ok(None);
        }

        // Single statement so concurrent requests cannot overshoot the limit.
        let runs: Option<i32> = sqlx::query_scalar(
            r#"
            INSERT INTO guest_usage (guest_id, usage_day, runs_used)
            VALUES ($1, $2, 1)
            ON CONFLICT (guest_id, usage_day) DO UPDATE SET
                runs_used = guest_usage.runs_used + 1,
                updated_at = now()
            WHERE guest_usage.runs_used < $3
            RETURNING runs_used
            "#,
        )
        .bind(guest_id)
        .bind(day)
        .bind(limit as i32)
        .fetch_optional(&self.db)
        .await
        .map_err(|err| err.to_string())?;

        Ok(runs.map(|value| value.max(0) as u32))
    }
}

// System clock adapter; quota days follow UTC.
#[derive(Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today_utc(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}
