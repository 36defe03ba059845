use crate::domain::entities::GuestLimits;

// Domain-level errors for the generation workflow.
#[derive(Debug)]
pub enum GenerationError {
    InvalidGuestId,
    Unauthorized,
    InvalidRequest(&'static str),
    GuestLimitReached(GuestLimits),
    UpstreamCreditsExhausted,
    GenerationFailed,
    StorageFailure,
}

// Failures reported by a generator backend.
#[derive(Debug)]
pub enum GeneratorError {
    Unavailable(String),
    CreditsExhausted,
}
