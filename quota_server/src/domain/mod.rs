// Domain layer: quota entities, errors and ports.

pub mod entities;
pub mod errors;
pub mod ports;

pub use entities::{DAILY_LIMIT, GenerationKind, GenerationParams, GuestLimits, OPENERS_PER_RUN};
pub use errors::{GenerationError, GeneratorError};
pub use ports::{Clock, Generator, UsageStore};
