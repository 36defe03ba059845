use std::fmt;

use crate::domain::quota::ServerGuestLimits;

// Machine-readable rejection code the quota server sends with HTTP 429.
pub const GUEST_LIMIT_REACHED: &str = "GUEST_LIMIT_REACHED";

// Failures reported by the generation service. Only `GuestLimitReached`
// touches quota state; everything else is a transient, retryable failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationFailure {
    GuestLimitReached {
        guest_limits: Option<ServerGuestLimits>,
    },
    Unauthorized {
        status: u16,
    },
    CreditsExhausted,
    Upstream {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },
    Transport(String),
    Decode(String),
}

impl GenerationFailure {
    pub fn is_quota_rejection(&self) -> bool {
        matches!(self, GenerationFailure::GuestLimitReached { .. })
    }
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationFailure::GuestLimitReached { .. } => write!(f, "guest limit reached"),
            GenerationFailure::Unauthorized { status } => {
                write!(f, "generation rejected as unauthorized ({status})")
            }
            GenerationFailure::CreditsExhausted => {
                write!(f, "generation backend is out of credits")
            }
            GenerationFailure::Upstream {
                status,
                code,
                message,
            } => {
                write!(f, "generation upstream error {status}")?;
                if let Some(code) = code {
                    write!(f, " [{code}]")?;
                }
                if let Some(message) = message {
                    write!(f, ": {message}")?;
                }
                Ok(())
            }
            GenerationFailure::Transport(err) => write!(f, "generation transport error: {err}"),
            GenerationFailure::Decode(err) => write!(f, "generation response decode error: {err}"),
        }
    }
}

impl std::error::Error for GenerationFailure {}
