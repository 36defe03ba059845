use crate::domain::entities::GuestLimits;
use crate::domain::errors::GenerationError;
use crate::domain::ports::{Clock, UsageStore};
use crate::use_cases::generate::validate_guest_id;

// Read-only lookup of a guest's remaining runs for today.
pub struct GuestLimitsUseCase<C, S> {
    pub clock: C,
    pub store: S,
    pub daily_limit: u32,
}

impl<C, S> GuestLimitsUseCase<C, S>
where
    C: Clock,
    S: UsageStore,
{
    pub async fn execute(&self, guest_id: &str) -> Result<GuestLimits, GenerationError> {
        let guest_id = validate_guest_id(guest_id)?;
        let today = self.clock.today_utc();

        let used = self
            .store
            .runs_used(guest_id, today)
            .await
            .map_err(|_| GenerationError::StorageFailure)?;

        Ok(GuestLimits::for_day(used, self.daily_limit, today))
    }
}
