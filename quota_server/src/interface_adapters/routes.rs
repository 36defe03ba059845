use crate::interface_adapters::handlers::{generate, guest_limits, health};
use crate::interface_adapters::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/guest/limits", get(guest_limits))
        .route("/health", get(health))
        .with_state(state)
}
