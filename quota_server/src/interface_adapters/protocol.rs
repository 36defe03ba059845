use serde::{Deserialize, Serialize};

use crate::domain::entities::{GenerationKind, GuestLimits};

// Machine-readable code clients use to tell quota exhaustion apart from other failures.
pub const GUEST_LIMIT_REACHED: &str = "GUEST_LIMIT_REACHED";

// Request payload for a generation run. Members authenticate with a bearer
// token and omit `guestId`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub guest_id: Option<String>,
    pub kind: GenerationKind,
    pub profile_text: String,
    #[serde(default)]
    pub tone: Option<String>,
}

// Response payload for a successful run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub results: Vec<String>,
    // Absent for members, who are not metered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_limits: Option<GuestLimitsBody>,
}

// Remaining runs as reported to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestLimitsBody {
    pub remaining_runs_today: u32,
    pub reset_date_utc: String,
}

impl From<GuestLimits> for GuestLimitsBody {
    fn from(limits: GuestLimits) -> Self {
        Self {
            remaining_runs_today: limits.remaining_runs_today,
            reset_date_utc: limits.reset_date_utc.format("%Y-%m-%d").to_string(),
        }
    }
}

// Query string for the limits lookup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestLimitsQuery {
    pub guest_id: String,
}

// Error envelope for JSON responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_limits: Option<GuestLimitsBody>,
}
