use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Form, Router,
};
#[allow(unused)]
use metrics::{counter, gauge, histogram};
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Shared state of the mock service.
#[derive(Clone, Default)]
pub struct MockState {
    hits: Arc<AtomicU64>,
}

impl MockState {
    fn hit(&self) -> u64 {
        counter!("mock-service.requests").increment(1);
        self.hits.fetch_add(1, Ordering::Relaxed) + 1
    }
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/delay/ms/:delay_ms", get(delay))
        .route("/jitter/ms/:mean_ms/:std_ms", get(jitter))
        .route("/status/:code", get(status))
        .route("/flaky/:every", get(flaky))
        .route("/echo", post(echo))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(MockState::default())).await?;
    Ok(())
}

/// A mock service running in the background of the current tokio runtime.
pub struct MockService {
    pub addr: SocketAddr,
    state: MockState,
}

impl MockService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests handled so far, over every route.
    pub fn hits(&self) -> u64 {
        self.state.hits.load(Ordering::Relaxed)
    }
}

/// Serves on an ephemeral localhost port.
pub async fn spawn() -> anyhow::Result<MockService> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = MockState::default();

    let app = router(state.clone());
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!("Mock service stopped: {err}");
        }
    });
    debug!("Mock service listening on {addr}");

    Ok(MockService { addr, state })
}

#[debug_handler]
async fn index(State(state): State<MockState>) -> &'static str {
    state.hit();
    "ok"
}

#[debug_handler]
async fn delay(State(state): State<MockState>, Path(delay_ms): Path<u64>) -> &'static str {
    state.hit();
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    "ok"
}

#[debug_handler]
async fn jitter(
    State(state): State<MockState>,
    Path((mean_ms, std_ms)): Path<(f64, f64)>,
) -> Result<&'static str, StatusCode> {
    state.hit();
    let normal = Normal::new(mean_ms, std_ms).map_err(|_| StatusCode::BAD_REQUEST)?;
    let delay_ms = normal.sample(&mut rand::thread_rng()).max(0.);
    histogram!("mock-service.jitter_ms").record(delay_ms);
    tokio::time::sleep(Duration::from_secs_f64(delay_ms / 1_000.)).await;
    Ok("ok")
}

#[debug_handler]
async fn status(State(state): State<MockState>, Path(code): Path<u16>) -> StatusCode {
    state.hit();
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Every `every`-th request fails with a 500.
#[debug_handler]
async fn flaky(State(state): State<MockState>, Path(every): Path<u64>) -> StatusCode {
    let n = state.hit();
    if every > 0 && n % every == 0 {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

#[debug_handler]
async fn echo(
    State(state): State<MockState>,
    Form(fields): Form<HashMap<String, String>>,
) -> String {
    state.hit();
    let mut keys: Vec<_> = fields.into_keys().collect();
    keys.sort();
    keys.join(",")
}
