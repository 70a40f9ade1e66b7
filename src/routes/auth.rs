// SPDX-License-Identifier: MIT

//! Interactive login routes.
//!
//! `/connect` starts the provider login in the operator's own browser;
//! the provider redirects back to `/callback` with the authorization
//! code, which we capture and exchange.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::Result;
use crate::services::CapturedAuth;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/connect", get(connect))
        .route("/callback", get(callback))
}

/// Start the login flow: register a state and redirect to the provider.
async fn connect(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let auth_url = state.login.begin().await?;
    tracing::info!("starting interactive login");
    Ok(Redirect::temporary(&auth_url))
}

/// Provider redirect parameters.
#[derive(Deserialize)]
pub struct CallbackParams {
    code: String,
    state: String,
    #[serde(default)]
    session_state: String,
}

/// Capture the authorization code the provider redirected back with.
async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let outcome = state
        .login
        .capture(CapturedAuth {
            code: params.code,
            state: params.state,
            session_state: params.session_state,
        })
        .await?;

    tracing::info!(
        user_id = %outcome.user_id,
        exchanged = outcome.exchanged,
        "login captured"
    );

    // A failed immediate exchange keeps the artifact for retry, but the
    // operator still needs to see that sign-in is not complete.
    if outcome.exchanged {
        Ok(Redirect::temporary("/"))
    } else {
        Ok(Redirect::temporary("/?error=exchange_failed"))
    }
}
