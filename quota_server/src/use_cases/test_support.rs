use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::entities::GenerationParams;
use crate::domain::errors::GeneratorError;
use crate::domain::ports::{Clock, Generator, UsageStore};

pub(crate) type UsageTable = Arc<Mutex<HashMap<(String, NaiveDate), u32>>>;

pub(crate) fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

// Shared fixed UTC day for deterministic use-case tests.
pub(crate) struct FixedClock(pub(crate) NaiveDate);

impl Clock for FixedClock {
    fn today_utc(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub read: bool,
    pub consume: bool,
}

#[derive(Clone)]
pub(crate) struct RecordingUsageStore {
    usage: UsageTable,
    failures: FailureFlags,
}

impl RecordingUsageStore {
    pub(crate) fn new() -> Self {
        Self {
            usage: Arc::new(Mutex::new(HashMap::new())),
            failures: FailureFlags::default(),
        }
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn seed(&self, guest_id: &str, day: NaiveDate, runs_used: u32) {
        let mut guard = self.usage.lock().expect("usage mutex poisoned");
        guard.insert((guest_id.to_string(), day), runs_used);
    }

    pub(crate) fn runs_for(&self, guest_id: &str, day: NaiveDate) -> u32 {
        let guard = self.usage.lock().expect("usage mutex poisoned");
        guard
            .get(&(guest_id.to_string(), day))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl UsageStore for RecordingUsageStore {
    async fn runs_used(&self, guest_id: &str, day: NaiveDate) -> Result<u32, String> {
        if self.failures.read {
            return Err("read failed".to_string());
        }
        Ok(self.runs_for(guest_id, day))
    }

    async fn try_consume(
        &self,
        guest_id: &str,
        day: NaiveDate,
        limit: u32,
    ) -> Result<Option<u32>, String> {
        if self.failures.consume {
            return Err("consume failed".to_string());
        }

        let mut guard = self.usage.lock().expect("usage mutex poisoned");
        let used = guard.entry((guest_id.to_string(), day)).or_insert(0);
        if *used >= limit {
            return Ok(None);
        }
        *used += 1;
        Ok(Some(*used))
    }
}

// Generator double that replays a fixed outcome and counts calls.
#[derive(Clone)]
pub(crate) struct StubGenerator {
    outcome: StubOutcome,
    calls: Arc<AtomicUsize>,
}

#[derive(Clone)]
pub(crate) enum StubOutcome {
    Results(Vec<String>),
    Unavailable,
    CreditsExhausted,
}

impl StubGenerator {
    pub(crate) fn returning(results: &[&str]) -> Self {
        Self {
            outcome: StubOutcome::Results(results.iter().map(|r| r.to_string()).collect()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn failing(outcome: StubOutcome) -> Self {
        Self {
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, _params: &GenerationParams) -> Result<Vec<String>, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            StubOutcome::Results(results) => Ok(results.clone()),
            StubOutcome::Unavailable => Err(GeneratorError::Unavailable("stub down".to_string())),
            StubOutcome::CreditsExhausted => Err(GeneratorError::CreditsExhausted),
        }
    }
}
