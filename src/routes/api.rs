// SPDX-License-Identifier: MIT

//! Control panel API routes.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{CollectedShift, ScheduleFilter};
use crate::services::PollerStatus;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/state", get(get_state))
        .route("/toggle", post(toggle))
        .route("/auth/status", get(auth_status))
        .route("/filters", get(get_filters).post(put_filters))
        .route("/collected", get(get_collected))
}

/// Poller status snapshot.
async fn get_state(State(state): State<Arc<AppState>>) -> Json<PollerStatus> {
    Json(state.poller.status().await)
}

#[derive(Serialize)]
struct ToggleResponse {
    running: bool,
}

/// Flip the acquisition loop on or off.
async fn toggle(State(state): State<Arc<AppState>>) -> Result<Json<ToggleResponse>> {
    let running = state.poller.toggle().await?;
    Ok(Json(ToggleResponse { running }))
}

#[derive(Serialize)]
struct AuthStatus {
    authenticated: bool,
}

/// Whether a user is signed in with stored tokens.
async fn auth_status(State(state): State<Arc<AppState>>) -> Result<Json<AuthStatus>> {
    let authenticated = match state.store.current_user().await? {
        Some(user_id) => state.store.get_tokens(&user_id).await?.is_some(),
        None => false,
    };
    Ok(Json(AuthStatus { authenticated }))
}

async fn current_user(state: &AppState) -> Result<String> {
    state
        .store
        .current_user()
        .await?
        .ok_or_else(|| AppError::BadRequest("no authenticated user".to_string()))
}

/// Current schedule filter, defaulting to match-nothing.
async fn get_filters(State(state): State<Arc<AppState>>) -> Result<Json<ScheduleFilter>> {
    let user_id = current_user(&state).await?;
    let filter = state
        .store
        .get_filter(&user_id)
        .await?
        .unwrap_or_default();
    Ok(Json(filter))
}

/// Replace the schedule filter wholesale after validation.
async fn put_filters(
    State(state): State<Arc<AppState>>,
    Json(filter): Json<ScheduleFilter>,
) -> Result<Json<ScheduleFilter>> {
    let user_id = current_user(&state).await?;
    filter.validate().map_err(AppError::BadRequest)?;
    state.store.put_filter(&user_id, &filter).await?;
    Ok(Json(filter))
}

/// Confirmed shifts grouped by civil date, ascending.
async fn get_collected(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, Vec<CollectedShift>>>> {
    let user_id = current_user(&state).await?;
    let mut grouped: BTreeMap<String, Vec<CollectedShift>> = BTreeMap::new();
    for record in state.store.list_collected(&user_id).await? {
        grouped.entry(record.shift_date.clone()).or_default().push(record);
    }
    Ok(Json(grouped))
}
