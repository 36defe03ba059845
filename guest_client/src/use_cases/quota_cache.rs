use crate::domain::ports::{Clock, KeyValueStore};
use crate::domain::quota::{
    GuestQuotaState, QuotaEvent, ServerRemaining, apply_event, clamp_runs,
};

// Stable storage keys; renaming any of these resets every device's quota.
pub const KEY_DATE: &str = "guest_quota_date";
pub const KEY_USED: &str = "guest_quota_used";
pub const KEY_SERVER_REMAINING: &str = "guest_quota_server_remaining";
pub const KEY_SERVER_RESET_DATE: &str = "guest_quota_server_reset_date_utc";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageMode {
    Persistent,
    // Storage failed at least once; state lives only as long as this cache.
    Memory,
}

// Day-scoped guest counter. Every operation succeeds from the caller's view:
// the first storage failure moves the cache to memory for the rest of its life.
pub struct LocalQuotaCache<S, C> {
    store: S,
    clock: C,
    fallback: Option<GuestQuotaState>,
}

impl<S, C> LocalQuotaCache<S, C>
where
    S: KeyValueStore,
    C: Clock,
{
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            fallback: None,
        }
    }

    pub fn storage_mode(&self) -> StorageMode {
        if self.fallback.is_some() {
            StorageMode::Memory
        } else {
            StorageMode::Persistent
        }
    }

    pub fn read_state(&mut self) -> GuestQuotaState {
        let today = self.clock.today_key();
        let stored = self.load();
        let state = apply_event(stored.clone(), QuotaEvent::LocalCheck { today });
        if state != stored {
            self.persist(&state);
        }
        state
    }

    pub fn write_used(&mut self, used: i64) -> GuestQuotaState {
        self.apply(QuotaEvent::SetUsed(used))
    }

    pub fn write_server_remaining(&mut self, remaining: i64, reset_date_utc: &str) -> GuestQuotaState {
        self.apply(QuotaEvent::ServerSync {
            remaining,
            reset_date_utc: reset_date_utc.to_string(),
        })
    }

    pub fn force_exhausted(&mut self) -> GuestQuotaState {
        self.apply(QuotaEvent::ForceExhausted)
    }

    // Applies an event on top of today's state and persists the result.
    pub fn apply(&mut self, event: QuotaEvent) -> GuestQuotaState {
        let current = self.read_state();
        let next = apply_event(current.clone(), event);
        if next != current {
            self.persist(&next);
        }
        next
    }

    fn load(&mut self) -> GuestQuotaState {
        if let Some(state) = &self.fallback {
            return state.clone();
        }

        match self.load_persisted() {
            Ok(state) => state,
            Err(err) => {
                // Empty date forces a rollover on the caller's next check.
                let state = GuestQuotaState::fresh("");
                self.degrade(&err, state.clone());
                state
            }
        }
    }

    fn load_persisted(&self) -> Result<GuestQuotaState, String> {
        let date = self.store.get(KEY_DATE)?.unwrap_or_default();
        let used = self
            .store
            .get(KEY_USED)?
            .and_then(|value| value.trim().parse::<i64>().ok())
            .map(clamp_runs)
            .unwrap_or(0);

        let remaining = self.store.get(KEY_SERVER_REMAINING)?;
        let reset_date = self.store.get(KEY_SERVER_RESET_DATE)?;
        let server_remaining = match (remaining, reset_date) {
            (Some(remaining), Some(reset_date_utc)) => remaining
                .trim()
                .parse::<i64>()
                .ok()
                .map(|remaining| ServerRemaining {
                    remaining: clamp_runs(remaining),
                    reset_date_utc,
                }),
            _ => None,
        };

        Ok(GuestQuotaState {
            date,
            used,
            server_remaining,
        })
    }

    fn persist(&mut self, state: &GuestQuotaState) {
        if self.fallback.is_some() {
            self.fallback = Some(state.clone());
            return;
        }

        if let Err(err) = self.write_persisted(state) {
            self.degrade(&err, state.clone());
        }
    }

    // The date goes last: a partially applied write leaves yesterday's date
    // behind, so the next read rolls over instead of trusting stale counts.
    fn write_persisted(&self, state: &GuestQuotaState) -> Result<(), String> {
        let used = state.used.to_string();
        let server_remaining = state
            .server_remaining
            .as_ref()
            .map(|server| (server.remaining.to_string(), server.reset_date_utc.as_str()));

        self.store.write_batch(&[
            (KEY_USED, Some(used.as_str())),
            (
                KEY_SERVER_REMAINING,
                server_remaining.as_ref().map(|(remaining, _)| remaining.as_str()),
            ),
            (
                KEY_SERVER_RESET_DATE,
                server_remaining.as_ref().map(|(_, reset)| *reset),
            ),
            (KEY_DATE, Some(state.date.as_str())),
        ])
    }

    fn degrade(&mut self, err: &str, state: GuestQuotaState) {
        tracing::warn!(
            error = %err,
            "guest quota storage unavailable; limiting per session from now on"
        );
        self.fallback = Some(state);
    }
}
