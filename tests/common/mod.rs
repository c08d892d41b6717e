//! In-process fake AstroPixels controller for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use astropixels_link::auth::TokenStore;
use astropixels_link::domain::BackoffPolicy;
use astropixels_link::{LinkConfig, Observers, Session};
use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::broadcast;

/// Sentinel pushed on the device channel to make it drop every client.
const KICK: &str = "\u{0}kick";

/// One recorded write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub path: String,
    pub body: String,
    pub token: Option<String>,
    pub content_type: Option<String>,
}

/// Shared recording state of the fake device.
#[derive(Debug, Clone)]
pub struct Device {
    pub addr: SocketAddr,
    ws_frames: Arc<Mutex<Vec<String>>>,
    posts: Arc<Mutex<Vec<Post>>>,
    state_gets: Arc<AtomicU16>,
    write_status: Arc<AtomicU16>,
    push: broadcast::Sender<String>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Device {
    /// Starts a device on an ephemeral port. Without `with_ws` the `/ws`
    /// route does not exist, so the live channel can never open.
    pub async fn start(with_ws: bool) -> Self {
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind fake device");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("local addr");
        };
        let (push, _) = broadcast::channel(64);
        let device = Self {
            addr,
            ws_frames: Arc::default(),
            posts: Arc::default(),
            state_gets: Arc::default(),
            write_status: Arc::new(AtomicU16::new(200)),
            push,
        };

        let mut router = Router::new()
            .route("/api/cmd", post(record_write))
            .route("/api/pref", post(record_write).get(read_prefs))
            .route("/api/reboot", post(record_write))
            .route("/upload/firmware", post(record_upload))
            .route("/api/state", get(state));
        if with_ws {
            router = router.route("/ws", get(ws_upgrade));
        }
        let app = router.with_state(device.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        device
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_write_status(&self, status: u16) {
        self.write_status.store(status, Ordering::SeqCst);
    }

    pub fn ws_frames(&self) -> Vec<String> {
        lock(&self.ws_frames).clone()
    }

    pub fn posts(&self) -> Vec<Post> {
        lock(&self.posts).clone()
    }

    pub fn state_gets(&self) -> u16 {
        self.state_gets.load(Ordering::SeqCst)
    }

    /// Pushes one text frame to every connected client.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.push.send(frame.into());
    }

    /// Closes every live channel, as a device reboot would.
    pub fn kick(&self) {
        self.push(KICK);
    }

    /// Starts a session against this device with fast backoff and no
    /// periodic polling.
    pub fn session(&self, observers: Observers, token: TokenStore) -> Session {
        self.session_with(observers, token, Duration::ZERO)
    }

    pub fn session_with(
        &self,
        observers: Observers,
        token: TokenStore,
        poll: Duration,
    ) -> Session {
        let Ok(mut config) = LinkConfig::new(&self.base_url()) else {
            panic!("config");
        };
        config.backoff = BackoffPolicy {
            floor: Duration::from_millis(20),
            ceiling: Duration::from_millis(100),
            factor: 1.5,
        };
        config.state_poll_interval = poll;
        config.request_timeout = Some(Duration::from_secs(5));
        let Ok(session) = Session::start(&config, observers, token) else {
            panic!("session start");
        };
        session
    }
}

async fn record_write(
    State(device): State<Device>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    lock(&device.posts).push(Post {
        path: uri.path().to_string(),
        body,
        token: header("x-ap-token"),
        content_type: header("content-type"),
    });
    StatusCode::from_u16(device.write_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn record_upload(
    State(device): State<Device>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    lock(&device.posts).push(Post {
        path: "/upload/firmware".into(),
        body: String::from_utf8_lossy(&body).into_owned(),
        token: headers
            .get("x-ap-token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        content_type: headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });
    "Update OK - Rebooting..."
}

async fn read_prefs(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let mut out = serde_json::Map::new();
    for key in params.get("keys").map(String::as_str).unwrap_or("").split(',') {
        let key = key.trim();
        if !key.is_empty() {
            let val = if key == "msound" { "1" } else { "" };
            out.insert(key.to_string(), json!(val));
        }
    }
    Json(Value::Object(out))
}

async fn state(State(device): State<Device>) -> Json<Value> {
    device.state_gets.fetch_add(1, Ordering::SeqCst);
    Json(json!({"wifiEnabled": true, "source": "poll"}))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(device): State<Device>) -> impl IntoResponse {
    let push_rx = device.push.subscribe();
    ws.on_upgrade(move |socket| device_socket(socket, device, push_rx))
}

async fn device_socket(
    socket: WebSocket,
    device: Device,
    mut push_rx: broadcast::Receiver<String>,
) {
    let (mut tx, mut rx) = socket.split();
    loop {
        tokio::select! {
            msg = rx.next() => match msg {
                Some(Ok(Message::Text(text))) => lock(&device.ws_frames).push(text.as_str().to_owned()),
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                _ => {}
            },
            frame = push_rx.recv() => match frame {
                Ok(frame) if frame == KICK => {
                    let _ = tx.send(Message::Close(None)).await;
                    break;
                }
                Ok(frame) => {
                    if tx.send(Message::text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
        }
    }
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Waits until the session reports a connected live channel.
pub async fn wait_connected(session: &Session) -> bool {
    let mut rx = session.watch_connection();
    let waited = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|state| state.is_connected()),
    )
    .await;
    matches!(waited, Ok(Ok(_)))
}

pub fn shared<T: Default>() -> Arc<Mutex<T>> {
    Arc::new(Mutex::new(T::default()))
}

pub fn read<T: Clone>(m: &Mutex<T>) -> T {
    lock(m).clone()
}

pub fn push_to<T>(m: &Mutex<Vec<T>>, item: T) {
    lock(m).push(item);
}
