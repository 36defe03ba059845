//! Client-side gate in front of the generation service.
//!
//! The gate blocks a guest locally once the cached quota says no runs are
//! left, so an exhausted guest never reaches the network. The server stays
//! the authority: its responses are reconciled into the cache and its 429
//! rejection blocks the gate even when the local count disagreed.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::errors::GenerationFailure;
use crate::domain::generation::GenerationRequest;
use crate::domain::identity::Caller;
use crate::domain::ports::{Clock, GenerationService, KeyValueStore};
use crate::domain::quota::{GuestQuotaState, OPENERS_PER_RUN};
use crate::use_cases::identity::GuestIdentityStore;
use crate::use_cases::quota_cache::{LocalQuotaCache, StorageMode};
use crate::use_cases::reconcile;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatePhase {
    Idle,
    Checking,
    InFlight,
    Blocked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockReason {
    QuotaExhaustedLocal,
    QuotaExhaustedServer,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::QuotaExhaustedLocal => write!(f, "no guest runs left on this device today"),
            BlockReason::QuotaExhaustedServer => write!(f, "the server reports no guest runs left today"),
        }
    }
}

/// What the UI shows a blocked guest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuestPrompt {
    pub reason: BlockReason,
    pub remaining: Option<u32>,
    /// Server reset date, when the server has reported one.
    pub reset_date_utc: Option<String>,
}

impl GuestPrompt {
    pub fn call_to_action(&self) -> String {
        match &self.reset_date_utc {
            Some(reset) => format!(
                "{}. Sign up or log in for unlimited runs, or come back after {reset} (UTC).",
                self.reason
            ),
            None => format!(
                "{}. Sign up or log in for unlimited runs, or come back tomorrow.",
                self.reason
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    Generated {
        results: Vec<String>,
        // None for members, who are not metered.
        remaining: Option<u32>,
    },
    Blocked(GuestPrompt),
    // Retryable; quota was not touched.
    TransientFailure(GenerationFailure),
    // The gate was disposed while the request was outstanding.
    Ignored,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateStatus {
    pub phase: GatePhase,
    pub remaining: Option<u32>,
    pub reset_date_utc: Option<String>,
    pub storage_mode: StorageMode,
    pub guest: bool,
}

// Cloneable kill switch for a gate; checked after every await.
#[derive(Clone, Debug, Default)]
pub struct DisposeHandle {
    disposed: Arc<AtomicBool>,
}

impl DisposeHandle {
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

// Holds the phase at InFlight for one service call. Dropping the attempt
// future mid-call still returns the gate to Idle.
struct InFlight<'a> {
    phase: &'a mut GatePhase,
}

impl<'a> InFlight<'a> {
    fn enter(phase: &'a mut GatePhase) -> Self {
        *phase = GatePhase::InFlight;
        Self { phase }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.phase = GatePhase::Idle;
    }
}

pub struct GenerationGate<S, C, G> {
    cache: LocalQuotaCache<S, C>,
    identity: GuestIdentityStore<S>,
    service: G,
    phase: GatePhase,
    member_token: Option<String>,
    disposal: DisposeHandle,
}

impl<S, C, G> GenerationGate<S, C, G>
where
    S: KeyValueStore + Clone,
    C: Clock,
    G: GenerationService,
{
    pub fn new(store: S, clock: C, service: G) -> Self {
        Self {
            cache: LocalQuotaCache::new(store.clone(), clock),
            identity: GuestIdentityStore::new(store),
            service,
            phase: GatePhase::Idle,
            member_token: None,
            disposal: DisposeHandle::default(),
        }
    }

    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    pub fn is_guest(&self) -> bool {
        self.member_token.is_none()
    }

    pub fn dispose_handle(&self) -> DisposeHandle {
        self.disposal.clone()
    }

    // Re-reads the cache; a day rollover moves a blocked gate back to idle.
    pub fn refresh(&mut self) -> GateStatus {
        if !self.is_guest() {
            self.phase = GatePhase::Idle;
            return GateStatus {
                phase: self.phase,
                remaining: None,
                reset_date_utc: None,
                storage_mode: self.cache.storage_mode(),
                guest: false,
            };
        }

        let state = self.cache.read_state();
        self.settle_phase(&state);
        GateStatus {
            phase: self.phase,
            remaining: Some(state.remaining()),
            reset_date_utc: reset_date(&state),
            storage_mode: self.cache.storage_mode(),
            guest: true,
        }
    }

    // Pulls the server's view of today's allowance. Failures leave quota alone.
    pub async fn refresh_from_server(&mut self) -> Result<Option<u32>, GenerationFailure> {
        if !self.is_guest() || self.disposal.is_disposed() {
            return Ok(None);
        }

        let guest = self.identity.ensure();
        let limits = self.service.guest_limits(&guest).await;
        if self.disposal.is_disposed() {
            return Ok(None);
        }

        match limits {
            Ok(limits) => {
                let remaining = reconcile::sync_from_server(&mut self.cache, &limits);
                let state = self.cache.read_state();
                self.settle_phase(&state);
                tracing::debug!(guest_id = %guest.as_str(), remaining, "synced guest limits");
                Ok(Some(remaining))
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch guest limits");
                Err(err)
            }
        }
    }

    // Switches to member mode: the guest identity is dropped and the quota
    // cache is no longer consulted.
    pub fn exit_guest_mode(&mut self, access_token: impl Into<String>) {
        self.identity.clear();
        self.member_token = Some(access_token.into());
        self.phase = GatePhase::Idle;
        tracing::info!("left guest mode");
    }

    // One generation attempt. Taking `&mut self` keeps a single request
    // outstanding per gate.
    pub async fn attempt(&mut self, request: GenerationRequest) -> GateOutcome {
        if self.disposal.is_disposed() {
            return GateOutcome::Ignored;
        }

        if let Some(access_token) = self.member_token.clone() {
            return self.attempt_as_member(access_token, request).await;
        }

        self.phase = GatePhase::Checking;
        let state = self.cache.read_state();
        if state.is_exhausted() {
            self.phase = GatePhase::Blocked;
            tracing::info!("guest quota exhausted locally; skipping request");
            return GateOutcome::Blocked(GuestPrompt {
                reason: BlockReason::QuotaExhaustedLocal,
                remaining: Some(0),
                reset_date_utc: reset_date(&state),
            });
        }

        let guest = self.identity.ensure();
        let response = {
            let _in_flight = InFlight::enter(&mut self.phase);
            self.service
                .generate(&Caller::Guest(guest.clone()), &request)
                .await
        };

        if self.disposal.is_disposed() {
            tracing::debug!("gate disposed while request was in flight; dropping response");
            return GateOutcome::Ignored;
        }

        match response {
            Ok(success) => {
                let remaining = match &success.guest_limits {
                    Some(limits) => reconcile::sync_from_server(&mut self.cache, limits),
                    None => reconcile::bump_local_on_success(&mut self.cache),
                };
                self.phase = GatePhase::Idle;

                let mut results = success.results;
                results.truncate(OPENERS_PER_RUN);
                tracing::info!(guest_id = %guest.as_str(), remaining, "guest run succeeded");
                GateOutcome::Generated {
                    results,
                    remaining: Some(remaining),
                }
            }
            Err(GenerationFailure::GuestLimitReached { guest_limits }) => {
                let remaining = match &guest_limits {
                    Some(limits) => reconcile::sync_from_server(&mut self.cache, limits),
                    None => {
                        reconcile::force_exhausted_on_rejection(&mut self.cache);
                        0
                    }
                };
                self.phase = GatePhase::Blocked;
                tracing::info!(guest_id = %guest.as_str(), "server rejected guest run: limit reached");
                GateOutcome::Blocked(GuestPrompt {
                    reason: BlockReason::QuotaExhaustedServer,
                    remaining: Some(remaining),
                    reset_date_utc: guest_limits.map(|limits| limits.reset_date_utc),
                })
            }
            Err(err) => {
                self.phase = GatePhase::Idle;
                tracing::warn!(error = %err, "guest generation failed");
                GateOutcome::TransientFailure(err)
            }
        }
    }

    async fn attempt_as_member(&mut self, access_token: String, request: GenerationRequest) -> GateOutcome {
        let response = {
            let _in_flight = InFlight::enter(&mut self.phase);
            self.service
                .generate(&Caller::Member { access_token }, &request)
                .await
        };

        if self.disposal.is_disposed() {
            return GateOutcome::Ignored;
        }

        match response {
            Ok(success) => GateOutcome::Generated {
                results: success.results,
                remaining: None,
            },
            Err(err) => {
                tracing::warn!(error = %err, "member generation failed");
                GateOutcome::TransientFailure(err)
            }
        }
    }

    fn settle_phase(&mut self, state: &GuestQuotaState) {
        self.phase = if state.is_exhausted() {
            GatePhase::Blocked
        } else {
            GatePhase::Idle
        };
    }
}

fn reset_date(state: &GuestQuotaState) -> Option<String> {
    state
        .server_remaining
        .as_ref()
        .map(|server| server.reset_date_utc.clone())
}
