use crate::domain::entities::{DAILY_LIMIT, GenerationParams, OPENERS_PER_RUN};
use crate::domain::errors::GenerationError;
use crate::interface_adapters::protocol::{
    ErrorResponse, GUEST_LIMIT_REACHED, GenerateRequest, GenerateResponse, GuestLimitsBody,
    GuestLimitsQuery,
};
use crate::interface_adapters::state::{AppState, SystemClock};
use crate::use_cases::generate::GenerateUseCase;
use crate::use_cases::limits::GuestLimitsUseCase;
use crate::use_cases::member::MemberGenerateUseCase;
use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};

type ApiError = (StatusCode, Json<ErrorResponse>);

// Handler for one generation run. A bearer token selects the member path;
// everyone else is metered by guestId.
#[tracing::instrument(
    name = "generate",
    skip_all,
    fields(guest_id = ?payload.guest_id, kind = ?payload.kind)
)]
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let params = GenerationParams {
        kind: payload.kind,
        profile_text: payload.profile_text,
        tone: payload.tone,
    };

    if let Some(access_token) = bearer_token(&headers) {
        let use_case = MemberGenerateUseCase {
            verifier: state.members.clone(),
            generator: state.generator.clone(),
        };
        let results = use_case
            .execute(access_token, params)
            .await
            .map_err(map_generation_error)?;

        tracing::info!(results = results.len(), "member run served");
        return Ok(Json(GenerateResponse {
            results,
            guest_limits: None,
        }));
    }

    let guest_id = payload.guest_id.unwrap_or_default();
    let use_case = GenerateUseCase {
        clock: SystemClock,
        store: state.usage.clone(),
        generator: state.generator.clone(),
        daily_limit: DAILY_LIMIT,
        results_per_run: OPENERS_PER_RUN,
    };

    let output = use_case
        .execute(&guest_id, params)
        .await
        .map_err(map_generation_error)?;

    tracing::info!(
        remaining = output.limits.remaining_runs_today,
        "guest run consumed"
    );

    Ok(Json(GenerateResponse {
        results: output.results,
        guest_limits: Some(output.limits.into()),
    }))
}

// Handler for reading a guest's remaining runs without consuming one.
#[tracing::instrument(name = "guest_limits", skip_all, fields(guest_id = %query.guest_id))]
pub async fn guest_limits(
    State(state): State<AppState>,
    Query(query): Query<GuestLimitsQuery>,
) -> Result<Json<GuestLimitsBody>, ApiError> {
    let use_case = GuestLimitsUseCase {
        clock: SystemClock,
        store: state.usage.clone(),
        daily_limit: DAILY_LIMIT,
    };

    let limits = use_case
        .execute(&query.guest_id)
        .await
        .map_err(map_generation_error)?;

    Ok(Json(limits.into()))
}

pub async fn health() -> &'static str {
    "ok"
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// Helper to build a JSON error response.
fn error_response(status: StatusCode, code: &str, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: message.to_string(),
            guest_limits: None,
        }),
    )
}

fn map_generation_error(err: GenerationError) -> ApiError {
    match err {
        GenerationError::InvalidGuestId => error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_GUEST_ID",
            "guestId is required",
        ),
        GenerationError::Unauthorized => error_response(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "member access token is not recognized",
        ),
        GenerationError::InvalidRequest(message) => {
            error_response(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
        }
        GenerationError::GuestLimitReached(limits) => {
            tracing::info!("guest limit reached");
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorResponse {
                    error: GUEST_LIMIT_REACHED.to_string(),
                    message: "daily guest limit reached; sign up to keep generating".to_string(),
                    guest_limits: Some(limits.into()),
                }),
            )
        }
        GenerationError::UpstreamCreditsExhausted => {
            tracing::error!("upstream generator credits exhausted");
            error_response(
                StatusCode::PAYMENT_REQUIRED,
                "UPSTREAM_CREDITS_EXHAUSTED",
                "generation is temporarily unavailable",
            )
        }
        GenerationError::GenerationFailed => error_response(
            StatusCode::BAD_GATEWAY,
            "GENERATION_FAILED",
            "generation failed",
        ),
        GenerationError::StorageFailure => {
            tracing::error!("usage store failure");
            error_response(StatusCode::BAD_GATEWAY, "STORAGE_ERROR", "storage error")
        }
    }
}
