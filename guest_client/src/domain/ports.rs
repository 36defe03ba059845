use async_trait::async_trait;

use crate::domain::errors::GenerationFailure;
use crate::domain::generation::{GenerationRequest, GenerationSuccess};
use crate::domain::identity::{Caller, GuestIdentity};
use crate::domain::quota::ServerGuestLimits;

// Port for device-local key/value storage. Failures are reported, never
// panicked on; callers decide how to degrade.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn remove(&self, key: &str) -> Result<(), String>;

    // Applies `Some` as a set and `None` as a remove, in order. Stores that
    // can commit the whole batch at once override this.
    fn write_batch(&self, changes: &[(&str, Option<&str>)]) -> Result<(), String> {
        for (key, value) in changes {
            match value {
                Some(value) => self.set(key, value)?,
                None => self.remove(key)?,
            }
        }
        Ok(())
    }
}

// Port for the device's local calendar day.
pub trait Clock: Send + Sync {
    // `YYYY-MM-DD` in the device's local time zone.
    fn today_key(&self) -> String;
}

// Port for the remote generation service.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(
        &self,
        caller: &Caller,
        request: &GenerationRequest,
    ) -> Result<GenerationSuccess, GenerationFailure>;

    async fn guest_limits(
        &self,
        guest: &GuestIdentity,
    ) -> Result<ServerGuestLimits, GenerationFailure>;
}
