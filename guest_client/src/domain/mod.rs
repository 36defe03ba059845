// Domain layer: quota state, the reducer that owns its rules, and ports.

pub mod errors;
pub mod generation;
pub mod identity;
pub mod ports;
pub mod quota;

pub use errors::{GUEST_LIMIT_REACHED, GenerationFailure};
pub use generation::{GenerationKind, GenerationRequest, GenerationSuccess};
pub use identity::{Caller, GuestIdentity};
pub use ports::{Clock, GenerationService, KeyValueStore};
pub use quota::{
    DAILY_LIMIT, GuestQuotaState, OPENERS_PER_RUN, QuotaEvent, ServerGuestLimits,
    ServerRemaining, apply_event,
};
