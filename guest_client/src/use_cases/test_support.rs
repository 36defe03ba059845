use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::errors::GenerationFailure;
use crate::domain::generation::{GenerationRequest, GenerationSuccess};
use crate::domain::identity::{Caller, GuestIdentity};
use crate::domain::ports::{Clock, GenerationService, KeyValueStore};
use crate::domain::quota::ServerGuestLimits;
use crate::interface_adapters::stores::InMemoryStore;
use crate::use_cases::gate::DisposeHandle;

pub(crate) fn limits(remaining: i64, reset: &str) -> ServerGuestLimits {
    ServerGuestLimits {
        remaining_runs_today: remaining,
        reset_date_utc: reset.to_string(),
    }
}

pub(crate) fn success(results: &[&str], guest_limits: Option<ServerGuestLimits>) -> GenerationSuccess {
    GenerationSuccess {
        results: results.iter().map(|item| item.to_string()).collect(),
        guest_limits,
    }
}

// Local day that tests can move forward.
#[derive(Clone)]
pub(crate) struct FixedClock {
    day: Arc<Mutex<String>>,
}

impl FixedClock {
    pub(crate) fn new(day: &str) -> Self {
        Self {
            day: Arc::new(Mutex::new(day.to_string())),
        }
    }

    pub(crate) fn set_day(&self, day: &str) {
        *self.day.lock().expect("clock mutex poisoned") = day.to_string();
    }
}

impl Clock for FixedClock {
    fn today_key(&self) -> String {
        self.day.lock().expect("clock mutex poisoned").clone()
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct StoreFailures {
    pub get: bool,
    pub set: bool,
    pub remove: bool,
}

// Key/value store whose operations fail on demand.
#[derive(Clone)]
pub(crate) struct FailingStore {
    inner: InMemoryStore,
    failures: StoreFailures,
    // Fails `set` for this key only.
    failing_set_key: Option<&'static str>,
    attempts: Arc<AtomicUsize>,
}

impl FailingStore {
    pub(crate) fn new(failures: StoreFailures) -> Self {
        Self {
            inner: InMemoryStore::default(),
            failures,
            failing_set_key: None,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn failing_set_of(key: &'static str) -> Self {
        Self {
            failing_set_key: Some(key),
            ..Self::new(StoreFailures::default())
        }
    }

    // Writes straight to the backing store, bypassing injected failures.
    pub(crate) fn seed(&self, key: &str, value: &str) {
        self.inner.set(key, value).expect("seed store");
    }

    pub(crate) fn peek(&self, key: &str) -> Option<String> {
        self.inner.get(key).expect("peek store")
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failures.get {
            return Err("storage read denied".to_string());
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failures.set || self.failing_set_key == Some(key) {
            return Err("storage quota exceeded".to_string());
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failures.remove {
            return Err("storage write denied".to_string());
        }
        self.inner.remove(key)
    }
}

type Scripted<T> = Arc<Mutex<VecDeque<Result<T, GenerationFailure>>>>;

// Generation service that replays queued responses and records its callers.
#[derive(Clone, Default)]
pub(crate) struct ScriptedService {
    generations: Scripted<GenerationSuccess>,
    lookups: Scripted<ServerGuestLimits>,
    calls: Arc<AtomicUsize>,
    callers: Arc<Mutex<Vec<Caller>>>,
    dispose_during_call: Arc<Mutex<Option<DisposeHandle>>>,
    hang: bool,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // Every call waits forever; used to drop in-flight futures.
    pub(crate) fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub(crate) fn respond(&self, response: Result<GenerationSuccess, GenerationFailure>) -> &Self {
        self.generations
            .lock()
            .expect("script mutex poisoned")
            .push_back(response);
        self
    }

    pub(crate) fn respond_limits(&self, response: Result<ServerGuestLimits, GenerationFailure>) -> &Self {
        self.lookups
            .lock()
            .expect("script mutex poisoned")
            .push_back(response);
        self
    }

    // Disposes the gate while the request is outstanding.
    pub(crate) fn dispose_during_call(&self, handle: DisposeHandle) {
        *self
            .dispose_during_call
            .lock()
            .expect("script mutex poisoned") = Some(handle);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_caller(&self) -> Option<Caller> {
        self.callers
            .lock()
            .expect("script mutex poisoned")
            .last()
            .cloned()
    }

    async fn on_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self
            .dispose_during_call
            .lock()
            .expect("script mutex poisoned")
            .as_ref()
        {
            handle.dispose();
        }
        if self.hang {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn generate(
        &self,
        caller: &Caller,
        _request: &GenerationRequest,
    ) -> Result<GenerationSuccess, GenerationFailure> {
        self.callers
            .lock()
            .expect("script mutex poisoned")
            .push(caller.clone());
        self.on_call().await;
        self.generations
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(GenerationFailure::Transport("no scripted response".to_string())))
    }

    async fn guest_limits(
        &self,
        guest: &GuestIdentity,
    ) -> Result<ServerGuestLimits, GenerationFailure> {
        self.callers
            .lock()
            .expect("script mutex poisoned")
            .push(Caller::Guest(guest.clone()));
        self.on_call().await;
        self.lookups
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(GenerationFailure::Transport("no scripted response".to_string())))
    }
}
