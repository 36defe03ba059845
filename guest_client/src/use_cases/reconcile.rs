use crate::domain::ports::{Clock, KeyValueStore};
use crate::domain::quota::{QuotaEvent, ServerGuestLimits};
use crate::use_cases::quota_cache::LocalQuotaCache;

// Applies server-declared limits. Returns the remaining count now in effect,
// which is the cached value when the incoming one carries an older reset date.
pub fn sync_from_server<S, C>(cache: &mut LocalQuotaCache<S, C>, limits: &ServerGuestLimits) -> u32
where
    S: KeyValueStore,
    C: Clock,
{
    cache
        .write_server_remaining(limits.remaining_runs_today, &limits.reset_date_utc)
        .remaining()
}

// Counts a successful run the server did not report limits for.
pub fn bump_local_on_success<S, C>(cache: &mut LocalQuotaCache<S, C>) -> u32
where
    S: KeyValueStore,
    C: Clock,
{
    cache.apply(QuotaEvent::LocalBump).remaining()
}

pub fn force_exhausted_on_rejection<S, C>(cache: &mut LocalQuotaCache<S, C>)
where
    S: KeyValueStore,
    C: Clock,
{
    cache.force_exhausted();
}
