// SPDX-License-Identifier: MIT

//! Shared test fixtures: a scripted browser capability, fake provider
//! servers bound to ephemeral ports, and app construction helpers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::json;

use shift_catcher::config::Config;
use shift_catcher::error::AppError;
use shift_catcher::routes::create_router;
use shift_catcher::services::{
    BrowserResponse, BrowserSession, CycleDeps, LoginCaptureFlow, OidcClient, Poller,
    ShiftsClient, TokenManager,
};
use shift_catcher::store::FileStore;
use shift_catcher::AppState;

/// Browser capability that replays canned responses instead of driving
/// a real binary.
pub struct ScriptedBrowser {
    verify_error: Option<String>,
    stall_fetch: bool,
    pub verify_calls: AtomicUsize,
    responses: Mutex<VecDeque<BrowserResponse>>,
}

#[allow(dead_code)]
impl ScriptedBrowser {
    /// A browser whose capability check always passes.
    pub fn working() -> Self {
        Self {
            verify_error: None,
            stall_fetch: false,
            verify_calls: AtomicUsize::new(0),
            responses: Mutex::new(VecDeque::new()),
        }
    }

    /// A browser whose capability check always fails.
    pub fn broken(message: &str) -> Self {
        Self {
            verify_error: Some(message.to_string()),
            ..Self::working()
        }
    }

    /// A browser whose fetches hang forever, for shutdown-latency tests.
    pub fn stalled() -> Self {
        Self {
            stall_fetch: true,
            ..Self::working()
        }
    }

    pub fn push_json(&self, body: &str) {
        self.responses.lock().unwrap().push_back(BrowserResponse {
            status: 200,
            content_type: "application/json".to_string(),
            body: body.to_string(),
        });
    }

    pub fn push_html(&self, body: &str) {
        self.responses.lock().unwrap().push_back(BrowserResponse {
            status: 200,
            content_type: "text/html".to_string(),
            body: body.to_string(),
        });
    }
}

#[async_trait]
impl BrowserSession for ScriptedBrowser {
    async fn verify(&self) -> Result<(), AppError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        match &self.verify_error {
            Some(message) => Err(AppError::CapabilityUnavailable(message.clone())),
            None => Ok(()),
        }
    }

    async fn fetch_via_browser_context(
        &self,
        _url: &str,
        _headers: &[(String, String)],
    ) -> Result<BrowserResponse, AppError> {
        if self.stall_fetch {
            std::future::pending::<()>().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::Provider("no scripted response queued".to_string()))
    }
}

/// Unsigned JWT-shaped token whose payload carries a courier id claim.
#[allow(dead_code)]
pub fn jwt_with_courier(courier_id: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "courier_id": courier_id }).to_string());
    format!("{header}.{payload}.sig")
}

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

struct TokenServerState {
    grants: Arc<Mutex<Vec<String>>>,
    refresh_ok: Arc<AtomicBool>,
    exchange_ok: Arc<AtomicBool>,
    courier_id: String,
}

/// Fake identity provider token endpoint. Records every grant type it
/// sees; refresh and exchange can be failed independently.
#[allow(dead_code)]
pub struct FakeTokenServer {
    pub token_url: String,
    pub grants: Arc<Mutex<Vec<String>>>,
    pub refresh_ok: Arc<AtomicBool>,
    pub exchange_ok: Arc<AtomicBool>,
}

impl FakeTokenServer {
    #[allow(dead_code)]
    pub async fn start(courier_id: &str) -> Self {
        let grants = Arc::new(Mutex::new(Vec::new()));
        let refresh_ok = Arc::new(AtomicBool::new(true));
        let exchange_ok = Arc::new(AtomicBool::new(true));

        let state = Arc::new(TokenServerState {
            grants: grants.clone(),
            refresh_ok: refresh_ok.clone(),
            exchange_ok: exchange_ok.clone(),
            courier_id: courier_id.to_string(),
        });
        let app = Router::new()
            .route("/token", post(token_handler))
            .with_state(state);
        let base = spawn_server(app).await;

        Self {
            token_url: format!("{base}/token"),
            grants,
            refresh_ok,
            exchange_ok,
        }
    }

    #[allow(dead_code)]
    pub fn grant_count(&self) -> usize {
        self.grants.lock().unwrap().len()
    }
}

async fn token_handler(
    State(state): State<Arc<TokenServerState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let grant = form.get("grant_type").cloned().unwrap_or_default();
    state.grants.lock().unwrap().push(grant.clone());

    let ok = match grant.as_str() {
        "refresh_token" => state.refresh_ok.load(Ordering::SeqCst),
        "authorization_code" => state.exchange_ok.load(Ordering::SeqCst),
        _ => false,
    };
    if !ok {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response();
    }

    Json(json!({
        "access_token": jwt_with_courier(&state.courier_id),
        "refresh_token": "rt-new",
        "expires_in": 3600,
    }))
    .into_response()
}

struct ShiftsServerState {
    confirmed: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

/// Fake shifts API for confirmation calls. Listing goes through the
/// scripted browser, so only the confirm endpoint lives here.
#[allow(dead_code)]
pub struct FakeShiftsServer {
    pub base_url: String,
    pub confirmed: Arc<Mutex<Vec<String>>>,
    pub failing: Arc<Mutex<HashSet<String>>>,
}

impl FakeShiftsServer {
    #[allow(dead_code)]
    pub async fn start() -> Self {
        let confirmed = Arc::new(Mutex::new(Vec::new()));
        let failing = Arc::new(Mutex::new(HashSet::new()));

        let state = Arc::new(ShiftsServerState {
            confirmed: confirmed.clone(),
            failing: failing.clone(),
        });
        let app = Router::new()
            .route("/{courier_id}/shifts/{shift_id}/confirm", post(confirm_handler))
            .with_state(state);
        let base = spawn_server(app).await;

        Self {
            base_url: base,
            confirmed,
            failing,
        }
    }

    #[allow(dead_code)]
    pub fn fail_shift(&self, shift_id: &str) {
        self.failing.lock().unwrap().insert(shift_id.to_string());
    }

    #[allow(dead_code)]
    pub fn confirmed_ids(&self) -> Vec<String> {
        self.confirmed.lock().unwrap().clone()
    }
}

async fn confirm_handler(
    State(state): State<Arc<ShiftsServerState>>,
    Path((_courier_id, shift_id)): Path<(String, String)>,
) -> Response {
    if state.failing.lock().unwrap().contains(&shift_id) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "confirmation rejected" })),
        )
            .into_response();
    }
    state.confirmed.lock().unwrap().push(shift_id);
    Json(json!({ "status": "confirmed" })).into_response()
}

/// All the moving parts a test can need, wired against fakes.
#[allow(dead_code)]
pub struct TestEnv {
    pub store: FileStore,
    pub tokens: TokenManager,
    pub login: LoginCaptureFlow,
    pub poller: Poller,
    pub browser: Arc<ScriptedBrowser>,
    pub token_server: FakeTokenServer,
    pub shifts_server: FakeShiftsServer,
}

/// Build the full service graph against fake servers and a scripted
/// browser, persisting under `data_dir`.
#[allow(dead_code)]
pub async fn test_env(data_dir: &std::path::Path, browser: ScriptedBrowser) -> TestEnv {
    let token_server = FakeTokenServer::start("courier-1").await;
    let shifts_server = FakeShiftsServer::start().await;

    let store = FileStore::new(data_dir);
    let oidc = Arc::new(OidcClient::new(
        "http://127.0.0.1:1/auth".to_string(),
        token_server.token_url.clone(),
        "test_client".to_string(),
        "http://localhost:8080/callback".to_string(),
    ));
    let tokens = TokenManager::new(oidc.clone(), store.clone());
    let login = LoginCaptureFlow::new(oidc, tokens.clone(), store.clone());

    let browser = Arc::new(browser);
    let shifts = ShiftsClient::new(
        shifts_server.base_url.clone(),
        "test-app-token".to_string(),
        "uk".to_string(),
        "test-agent".to_string(),
        "Europe/London".to_string(),
    );
    let poller = Poller::new(CycleDeps {
        store: store.clone(),
        tokens: tokens.clone(),
        shifts,
        browser: browser.clone(),
        tz: chrono_tz::Europe::London,
        interval: (30, 60),
    });

    TestEnv {
        store,
        tokens,
        login,
        poller,
        browser,
        token_server,
        shifts_server,
    }
}

/// Handles to the fakes backing a `create_test_app` router.
#[allow(dead_code)]
pub struct TestHandles {
    pub browser: Arc<ScriptedBrowser>,
    pub token_server: FakeTokenServer,
    pub shifts_server: FakeShiftsServer,
}

/// Router plus state for control-surface tests, persisting under
/// `data_dir`.
#[allow(dead_code)]
pub async fn create_test_app(
    data_dir: &std::path::Path,
) -> (Router, Arc<AppState>, TestHandles) {
    let env = test_env(data_dir, ScriptedBrowser::working()).await;

    let mut config = Config::test_default();
    config.data_dir = data_dir.to_path_buf();

    let state = Arc::new(AppState {
        config,
        store: env.store,
        login: env.login,
        poller: env.poller,
    });

    let handles = TestHandles {
        browser: env.browser,
        token_server: env.token_server,
        shifts_server: env.shifts_server,
    };
    (create_router(state.clone()), state, handles)
}
