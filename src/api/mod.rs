//! HTTP and WebSocket front end.
//!
//! The server runs on its own tokio runtime thread so the broadcast loop's
//! blocking sleep never stalls connection handling. Every `/ws` client gets
//! its own receiver on the event hub; a client that cannot keep up skips the
//! events it missed and keeps receiving.

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, oneshot};
use tower_http::cors::{Any, CorsLayer};

use crate::hub::{Broadcaster, EventHub};
use crate::pipeline::PipelineStatus;

pub const INDEX_BODY: &str = "Drone Camera Server Running...";

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
    pub worker_threads: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:5005".to_string(),
            worker_threads: 2,
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

/// Body of `GET /status`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub running: bool,
    pub frames_emitted: u64,
    pub subscribers: usize,
    pub last_error: Option<String>,
}

#[derive(Clone)]
struct AppState {
    hub: Arc<EventHub>,
    status: Arc<PipelineStatus>,
}

/// Message a dashboard may send over the socket.
#[derive(Debug, Deserialize)]
struct ClientEvent {
    event: String,
}

pub struct ApiServer {
    cfg: ApiConfig,
    hub: Arc<EventHub>,
    status: Arc<PipelineStatus>,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, hub: Arc<EventHub>, status: Arc<PipelineStatus>) -> Self {
        Self { cfg, hub, status }
    }

    /// Bind the listener and serve on a background thread.
    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self
            .cfg
            .addr
            .parse()
            .with_context(|| format!("invalid server address '{}'", self.cfg.addr))?;
        let listener = TcpListener::bind(configured_addr)
            .with_context(|| format!("failed to bind {}", configured_addr))?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.cfg.worker_threads.max(1))
            .thread_name("skyfeed-api")
            .enable_all()
            .build()
            .context("failed to build server runtime")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = router(self.hub, self.status);
        let join = std::thread::Builder::new()
            .name("skyfeed-api".to_string())
            .spawn(move || {
                let result = runtime.block_on(async move {
                    let listener = tokio::net::TcpListener::from_std(listener)?;
                    axum::serve(
                        listener,
                        app.into_make_service_with_connect_info::<SocketAddr>(),
                    )
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await?;
                    Ok::<(), std::io::Error>(())
                });
                if let Err(err) = result {
                    log::error!("api server stopped: {}", err);
                }
            })
            .context("failed to spawn server thread")?;

        log::info!("api server listening on {}", addr);
        Ok(ApiHandle {
            addr,
            shutdown: Some(shutdown_tx),
            join: Some(join),
        })
    }
}

/// Routes served by the daemon. CORS is open to any origin.
pub fn router(hub: Arc<EventHub>, status: Arc<PipelineStatus>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/status", get(status_report))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(AppState { hub, status })
}

async fn index() -> &'static str {
    INDEX_BODY
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn status_report(State(state): State<AppState>) -> Json<StatusReport> {
    Json(StatusReport {
        running: state.status.is_running(),
        frames_emitted: state.status.frames_emitted(),
        subscribers: state.hub.subscriber_count(),
        last_error: state.status.last_error(),
    })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // Receiver must exist before the handshake completes.
    let events = state.hub.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, events, peer))
}

async fn handle_socket(
    socket: WebSocket,
    mut events: broadcast::Receiver<Arc<str>>,
    peer: SocketAddr,
) {
    log::info!("client connected: {}", peer);
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(text) => {
                    if let Err(err) = sender.send(Message::Text(text.to_string())).await {
                        log::debug!("send to {} failed: {}", peer, err);
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("client {} lagging, skipped {} events", peer, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => handle_client_event(peer, &text),
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    log::debug!("websocket error from {}: {}", peer, err);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    log::info!("client disconnected: {}", peer);
}

fn handle_client_event(peer: SocketAddr, text: &str) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(msg) if msg.event == "connect" => log::info!("client {} announced connect", peer),
        Ok(msg) => log::debug!("client {} sent unhandled event '{}'", peer, msg.event),
        Err(err) => log::debug!("client {} sent unparseable message: {}", peer, err),
    }
}
