use serde::Serialize;
use serde_json::Value;

use crate::domain::errors::{GUEST_LIMIT_REACHED, GenerationFailure};
use crate::domain::generation::{GenerationKind, GenerationSuccess};
use crate::domain::quota::ServerGuestLimits;

// Body of `POST /generate`; `guestId` is omitted for members.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequestBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<&'a str>,
    pub kind: GenerationKind,
    pub profile_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<&'a str>,
}

// Reads `{ remainingRunsToday, resetDateUtc }` without trusting the number:
// floats and out-of-range integers saturate instead of failing the decode.
pub fn parse_guest_limits(value: &Value) -> Option<ServerGuestLimits> {
    let remaining = value.get("remainingRunsToday")?;
    let remaining_runs_today = remaining
        .as_i64()
        .or_else(|| remaining.as_u64().map(|_| i64::MAX))
        .or_else(|| {
            remaining
                .as_f64()
                .filter(|value| value.is_finite())
                .map(|value| value as i64)
        })?;
    let reset_date_utc = value.get("resetDateUtc")?.as_str()?.to_string();

    Some(ServerGuestLimits {
        remaining_runs_today,
        reset_date_utc,
    })
}

pub fn decode_success(body: &str) -> Result<GenerationSuccess, GenerationFailure> {
    let value: Value =
        serde_json::from_str(body).map_err(|err| GenerationFailure::Decode(err.to_string()))?;

    let results = value
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| GenerationFailure::Decode("missing results array".to_string()))?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    let guest_limits = value.get("guestLimits").and_then(parse_guest_limits);

    Ok(GenerationSuccess {
        results,
        guest_limits,
    })
}

pub fn decode_limits(body: &str) -> Result<ServerGuestLimits, GenerationFailure> {
    let value: Value =
        serde_json::from_str(body).map_err(|err| GenerationFailure::Decode(err.to_string()))?;
    parse_guest_limits(&value)
        .ok_or_else(|| GenerationFailure::Decode("malformed guest limits".to_string()))
}

// Maps a non-2xx response onto the failure taxonomy. Only a 429 carrying the
// guest-limit code counts as a quota rejection.
pub fn classify_failure(status: u16, body: &str) -> GenerationFailure {
    let value = serde_json::from_str::<Value>(body).unwrap_or(Value::Null);
    let code = value.get("error").and_then(Value::as_str).map(str::to_string);
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);

    match status {
        429 if code.as_deref() == Some(GUEST_LIMIT_REACHED) => GenerationFailure::GuestLimitReached {
            guest_limits: value.get("guestLimits").and_then(parse_guest_limits),
        },
        401 | 403 => GenerationFailure::Unauthorized { status },
        402 => GenerationFailure::CreditsExhausted,
        _ => GenerationFailure::Upstream {
            status,
            code,
            message,
        },
    }
}
