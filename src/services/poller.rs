// SPDX-License-Identifier: MIT

//! Background acquisition loop.
//!
//! One cycle lists available shifts, filters them against the stored
//! schedule, and confirms the matches. The loop sleeps a randomized
//! interval between cycles and stops promptly on cancellation or when
//! credentials can no longer be recovered.

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use rand::Rng;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{CollectedShift, ScheduleFilter};
use crate::services::browser::BrowserSession;
use crate::services::shifts::ShiftsClient;
use crate::services::tokens::TokenManager;
use crate::store::FileStore;

/// How long a cancelled loop gets to finish its in-flight cycle before
/// being aborted outright.
const STOP_GRACE: std::time::Duration = std::time::Duration::from_secs(30);

/// Snapshot reported to the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct PollerStatus {
    pub running: bool,
    pub last_error: Option<String>,
}

/// What one cycle saw and did.
#[derive(Debug, Clone, Copy)]
pub struct CycleSummary {
    pub available: usize,
    pub confirmed: usize,
}

pub struct CycleDeps {
    pub store: FileStore,
    pub tokens: TokenManager,
    pub shifts: ShiftsClient,
    pub browser: Arc<dyn BrowserSession>,
    pub tz: Tz,
    /// inclusive (min, max) seconds between cycles
    pub interval: (u64, u64),
}

struct PollerInner {
    running: bool,
    handle: Option<JoinHandle<()>>,
    cancel: CancellationToken,
    last_error: Option<String>,
}

#[derive(Clone)]
pub struct Poller {
    inner: Arc<Mutex<PollerInner>>,
    deps: Arc<CycleDeps>,
}

impl Poller {
    pub fn new(deps: CycleDeps) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PollerInner {
                running: false,
                handle: None,
                cancel: CancellationToken::new(),
                last_error: None,
            })),
            deps: Arc::new(deps),
        }
    }

    /// Flip the loop on or off. Starting verifies the browser capability
    /// first so a broken environment is reported immediately rather than
    /// on the first cycle. Returns the new running state.
    pub async fn toggle(&self) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;

        if inner.running {
            inner.cancel.cancel();
            inner.running = false;
            if let Some(mut handle) = inner.handle.take() {
                // Don't block the toggle on an in-flight cycle's network
                // calls; let it drain on its own and abort a straggler.
                tokio::spawn(async move {
                    if tokio::time::timeout(STOP_GRACE, &mut handle).await.is_err() {
                        handle.abort();
                    }
                });
            }
            info!("poller stopped");
            return Ok(false);
        }

        if let Err(e) = self.deps.browser.verify().await {
            inner.last_error = Some(e.to_string());
            return Err(e);
        }

        let cancel = CancellationToken::new();
        inner.cancel = cancel.clone();
        inner.last_error = None;
        inner.running = true;
        let poller = self.clone();
        inner.handle = Some(tokio::spawn(async move {
            poller.run_loop(cancel).await;
        }));
        info!("poller started");
        Ok(true)
    }

    pub async fn status(&self) -> PollerStatus {
        let inner = self.inner.lock().await;
        PollerStatus {
            running: inner.running,
            last_error: inner.last_error.clone(),
        }
    }

    async fn run_loop(&self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                return;
            }

            match self.run_cycle().await {
                Ok(summary) => {
                    info!(
                        available = summary.available,
                        confirmed = summary.confirmed,
                        "cycle complete"
                    );
                }
                Err(AppError::AuthExpired) => {
                    // Nothing left that can mint a token; stop rather
                    // than hammering the provider.
                    warn!("credentials expired, stopping poller");
                    if cancel.is_cancelled() {
                        return;
                    }
                    let mut inner = self.inner.lock().await;
                    inner.running = false;
                    inner.handle = None;
                    inner.last_error = Some(AppError::AuthExpired.to_string());
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "cycle failed, will retry");
                    if !cancel.is_cancelled() {
                        let mut inner = self.inner.lock().await;
                        inner.last_error = Some(e.to_string());
                    }
                }
            }

            // thread_rng is not Send, so pick the duration before awaiting
            let secs = {
                let (min, max) = self.deps.interval;
                rand::thread_rng().gen_range(min..=max)
            };
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(std::time::Duration::from_secs(secs)) => {}
            }
        }
    }

    /// One acquisition cycle. Public so tests can drive cycles without
    /// the loop's sleeps.
    pub async fn run_once(&self) -> Result<CycleSummary, AppError> {
        self.run_cycle().await
    }

    async fn run_cycle(&self) -> Result<CycleSummary, AppError> {
        let deps = &self.deps;

        let user_id = deps
            .store
            .current_user()
            .await?
            .ok_or(AppError::AuthExpired)?;

        let tokens = deps.tokens.ensure_fresh_set(&user_id).await?;
        let courier_id = tokens
            .courier_id
            .clone()
            .ok_or_else(|| AppError::Provider("access token carries no courier id".to_string()))?;

        let available = deps
            .shifts
            .list_available(deps.browser.as_ref(), &tokens.access_token, &courier_id)
            .await?;

        let filter = deps
            .store
            .get_filter(&user_id)
            .await?
            .unwrap_or_else(ScheduleFilter::default);

        let mut collected = Vec::new();
        for shift in &available {
            if !filter.matches(shift.shift_time.start, deps.tz) {
                continue;
            }
            match deps
                .shifts
                .confirm(&tokens.access_token, &courier_id, &shift.id)
                .await
            {
                Ok(()) => {
                    info!(shift_id = %shift.id, "confirmed shift");
                    if let Some(record) = CollectedShift::record(shift, deps.tz, Utc::now()) {
                        collected.push(record);
                    }
                }
                Err(e) => {
                    // One failed confirmation must not block the rest of
                    // the batch.
                    warn!(shift_id = %shift.id, error = %e, "confirmation failed");
                }
            }
        }

        let confirmed = collected.len();
        if !collected.is_empty() {
            deps.store.append_collected(&user_id, &collected).await?;
        }

        Ok(CycleSummary {
            available: available.len(),
            confirmed,
        })
    }
}
