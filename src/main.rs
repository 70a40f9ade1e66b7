// SPDX-License-Identifier: MIT

//! Shift-catcher control server.
//!
//! Hosts the login callback and the control panel API, and owns the
//! background shift acquisition loop.

use shift_catcher::{
    config::Config,
    services::{
        CycleDeps, HeadlessBrowser, LoginCaptureFlow, OidcClient, Poller, ShiftsClient,
        TokenManager,
    },
    store::FileStore,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting shift-catcher");

    let store = FileStore::new(config.data_dir.clone());

    let oidc = Arc::new(OidcClient::new(
        config.auth_url.clone(),
        config.token_url.clone(),
        config.client_id.clone(),
        config.redirect_uri.clone(),
    ));
    let tokens = TokenManager::new(oidc.clone(), store.clone());
    let login = LoginCaptureFlow::new(oidc, tokens.clone(), store.clone());

    let browser = Arc::new(HeadlessBrowser::new(config.browser_binary.clone()));
    let shifts = ShiftsClient::new(
        config.shifts_api_base.clone(),
        config.app_token.clone(),
        config.tenant_id.clone(),
        config.user_agent.clone(),
        config.filter_timezone.name().to_string(),
    );

    let poller = Poller::new(CycleDeps {
        store: store.clone(),
        tokens,
        shifts,
        browser,
        tz: config.filter_timezone,
        interval: config.poll_interval_secs,
    });

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        login,
        poller,
    });

    let app = shift_catcher::routes::create_router(state);

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_logging() {
    let format = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shift_catcher=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
