use crate::domain::entities::{GenerationParams, GuestLimits};
use crate::domain::errors::{GenerationError, GeneratorError};
use crate::domain::ports::{Clock, Generator, UsageStore};

// Output returned by the generate use case.
#[derive(Debug)]
pub struct GenerateOutput {
    pub results: Vec<String>,
    pub limits: GuestLimits,
}

// Guest generation use case with injected dependencies.
pub struct GenerateUseCase<C, S, G> {
    pub clock: C,
    pub store: S,
    pub generator: G,
    pub daily_limit: u32,
    pub results_per_run: usize,
}

impl<C, S, G> GenerateUseCase<C, S, G>
where
    C: Clock,
    S: UsageStore,
    G: Generator,
{
    pub async fn execute(
        &self,
        guest_id: &str,
        params: GenerationParams,
    ) -> Result<GenerateOutput, GenerationError> {
        let guest_id = validate_guest_id(guest_id)?;
        let params = validate_params(params)?;
        let today = self.clock.today_utc();

        let used = self
            .store
            .runs_used(guest_id, today)
            .await
            .map_err(|_| GenerationError::StorageFailure)?;
        if used >= self.daily_limit {
            return Err(GenerationError::GuestLimitReached(GuestLimits::exhausted(
                today,
            )));
        }

        // Generate before consuming so a failed generation costs nothing.
        let mut results = self
            .generator
            .generate(&params)
            .await
            .map_err(map_generator_error)?;
        results.retain(|item| !item.trim().is_empty());
        if results.is_empty() {
            return Err(GenerationError::GenerationFailed);
        }

        // A concurrent request may have taken the last run in the meantime.
        let runs_used = self
            .store
            .try_consume(guest_id, today, self.daily_limit)
            .await
            .map_err(|_| GenerationError::StorageFailure)?
            .ok_or_else(|| GenerationError::GuestLimitReached(GuestLimits::exhausted(today)))?;

        results.truncate(self.results_per_run);

        Ok(GenerateOutput {
            results,
            limits: GuestLimits::for_day(runs_used, self.daily_limit, today),
        })
    }
}

pub(crate) fn validate_guest_id(value: &str) -> Result<&str, GenerationError> {
    const MAX_LEN: usize = 64;

    if value.is_empty() || value.len() > MAX_LEN {
        return Err(GenerationError::InvalidGuestId);
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    {
        return Err(GenerationError::InvalidGuestId);
    }

    Ok(value)
}

pub(crate) fn validate_params(params: GenerationParams) -> Result<GenerationParams, GenerationError> {
    const MAX_PROFILE_CHARS: usize = 2000;
    const MAX_TONE_CHARS: usize = 32;

    let profile_text = params.profile_text.trim();
    if profile_text.is_empty() {
        return Err(GenerationError::InvalidRequest("profileText is required"));
    }
    if profile_text.chars().count() > MAX_PROFILE_CHARS {
        return Err(GenerationError::InvalidRequest("profileText is too long"));
    }

    let tone = params
        .tone
        .map(|tone| tone.trim().to_lowercase())
        .filter(|tone| !tone.is_empty());
    if tone
        .as_ref()
        .is_some_and(|tone| tone.chars().count() > MAX_TONE_CHARS)
    {
        return Err(GenerationError::InvalidRequest("tone is too long"));
    }

    Ok(GenerationParams {
        kind: params.kind,
        profile_text: profile_text.to_string(),
        tone,
    })
}

pub(crate) fn map_generator_error(err: GeneratorError) -> GenerationError {
    match err {
        GeneratorError::CreditsExhausted => GenerationError::UpstreamCreditsExhausted,
        GeneratorError::Unavailable(reason) => {
            tracing::warn!(%reason, "generator unavailable");
            GenerationError::GenerationFailed
        }
    }
}
