use serde::{Deserialize, Serialize};

use crate::domain::quota::ServerGuestLimits;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    Opener,
    BioReview,
}

// Parameters for one generation run; the service decides the wording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    pub kind: GenerationKind,
    pub profile_text: String,
    pub tone: Option<String>,
}

impl GenerationRequest {
    pub fn opener(profile_text: impl Into<String>) -> Self {
        Self {
            kind: GenerationKind::Opener,
            profile_text: profile_text.into(),
            tone: None,
        }
    }

    pub fn bio_review(profile_text: impl Into<String>) -> Self {
        Self {
            kind: GenerationKind::BioReview,
            profile_text: profile_text.into(),
            tone: None,
        }
    }
}

// A successful run as reported by the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationSuccess {
    pub results: Vec<String>,
    // Absent when talking to servers that predate guest limits.
    pub guest_limits: Option<ServerGuestLimits>,
}
