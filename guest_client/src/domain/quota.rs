//! Guest quota state and the reducer that owns every transition on it.
//!
//! The local counter is advisory: it saves a round trip when the guest is
//! visibly out of runs. Whenever the server reports a remaining count, that
//! value wins over anything derived locally.

use chrono::NaiveDate;

/// Generation runs a guest may consume per day.
pub const DAILY_LIMIT: u32 = 3;
/// Result items surfaced to a guest per successful run.
pub const OPENERS_PER_RUN: usize = 2;

/// Remaining runs as declared by the server. Values are untrusted until
/// clamped by [`apply_event`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerGuestLimits {
    pub remaining_runs_today: i64,
    pub reset_date_utc: String,
}

/// Last remaining count the server reported, already clamped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerRemaining {
    pub remaining: u32,
    pub reset_date_utc: String,
}

/// Per-device quota snapshot.
///
/// `used + remaining() == DAILY_LIMIT` holds for every state produced by
/// [`apply_event`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuestQuotaState {
    /// Local calendar day key, `YYYY-MM-DD`.
    pub date: String,
    pub used: u32,
    pub server_remaining: Option<ServerRemaining>,
}

impl GuestQuotaState {
    pub fn fresh(today: impl Into<String>) -> Self {
        Self {
            date: today.into(),
            used: 0,
            server_remaining: None,
        }
    }

    pub fn remaining(&self) -> u32 {
        match &self.server_remaining {
            Some(server) => server.remaining.min(DAILY_LIMIT),
            None => DAILY_LIMIT - self.used.min(DAILY_LIMIT),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

/// Everything that can happen to the quota state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuotaEvent {
    /// A read on `today`; rolls the state over when the stored day differs.
    LocalCheck { today: String },
    /// Unconditional reset to a fresh day.
    DayRollover { today: String },
    /// The server declared how many runs remain.
    ServerSync {
        remaining: i64,
        reset_date_utc: String,
    },
    /// A run succeeded without server-reported limits.
    LocalBump,
    /// The server rejected a run as over the limit without a payload.
    ForceExhausted,
    /// Direct write of the local used-count.
    SetUsed(i64),
}

pub fn clamp_runs(value: i64) -> u32 {
    value.clamp(0, i64::from(DAILY_LIMIT)) as u32
}

/// Applies one event and returns the next state.
///
/// Precedence rules:
/// - a different day always resets `used` and drops the server value;
/// - a server value is ignored when it carries an older reset date than the
///   one already cached (last write wins on freshness, not arrival);
/// - local writes clear the server value so the two never disagree.
pub fn apply_event(state: GuestQuotaState, event: QuotaEvent) -> GuestQuotaState {
    match event {
        QuotaEvent::LocalCheck { today } => {
            if state.date == today {
                normalize(state)
            } else {
                apply_event(state, QuotaEvent::DayRollover { today })
            }
        }
        QuotaEvent::DayRollover { today } => GuestQuotaState::fresh(today),
        QuotaEvent::ServerSync {
            remaining,
            reset_date_utc,
        } => {
            if let Some(cached) = &state.server_remaining {
                if is_older(&reset_date_utc, &cached.reset_date_utc) {
                    return state;
                }
            }
            let remaining = clamp_runs(remaining);
            GuestQuotaState {
                date: state.date,
                used: DAILY_LIMIT - remaining,
                server_remaining: Some(ServerRemaining {
                    remaining,
                    reset_date_utc,
                }),
            }
        }
        QuotaEvent::LocalBump => {
            let used = (DAILY_LIMIT - state.remaining()).saturating_add(1).min(DAILY_LIMIT);
            GuestQuotaState {
                date: state.date,
                used,
                server_remaining: None,
            }
        }
        QuotaEvent::ForceExhausted => GuestQuotaState {
            date: state.date,
            used: DAILY_LIMIT,
            server_remaining: None,
        },
        QuotaEvent::SetUsed(used) => GuestQuotaState {
            date: state.date,
            used: clamp_runs(used),
            server_remaining: None,
        },
    }
}

// Re-derives `used` from whichever representation is authoritative.
fn normalize(state: GuestQuotaState) -> GuestQuotaState {
    let used = match &state.server_remaining {
        Some(server) => DAILY_LIMIT - server.remaining.min(DAILY_LIMIT),
        None => state.used.min(DAILY_LIMIT),
    };
    GuestQuotaState { used, ..state }
}

// Unparseable dates never count as older, so they cannot pin stale state.
fn is_older(incoming: &str, cached: &str) -> bool {
    match (parse_day(incoming), parse_day(cached)) {
        (Some(incoming), Some(cached)) => incoming < cached,
        _ => false,
    }
}

fn parse_day(value: &str) -> Option<NaiveDate> {
    let day = value.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
