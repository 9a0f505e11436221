//! Lock manager introspection.

use axum::{extract::State, Json};

use crate::core::{LockStats, LockStatus};
use crate::web::router::AppState;

/// Cheap counters; never waits on the queue lock.
pub async fn get_status(State(state): State<AppState>) -> Json<LockStatus> {
    Json(state.dispatcher.locks().status())
}

/// Full snapshot including per-conversation queue depths.
pub async fn get_stats(State(state): State<AppState>) -> Json<LockStats> {
    Json(state.dispatcher.locks().stats())
}
