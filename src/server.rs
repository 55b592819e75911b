// src/server.rs

use crate::config::Config;
use crate::error::ScanError;
use crate::extract;
use crate::pairing::PairingRegistry;
use crate::projection::FieldPath;
use crate::session::Session;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

// Multi-page photo batches arrive as base64 data URIs, so leave generous
// headroom over the default 2 MB limit.
const MAX_BODY_SIZE_32MB: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    session: Arc<Mutex<Session>>,
    pairing: PairingRegistry,
    http: Client,
}

pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState {
        config: Arc::new(config),
        session: Arc::new(Mutex::new(Session::default())),
        pairing: PairingRegistry::new(),
        http: Client::new(),
    };

    let app = router(state);

    info!("Starting scan server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    // The phone opens the pairing link from another host, so the API must
    // answer cross-origin requests.
    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/scan", post(scan))
        .route("/api/record", get(get_record))
        .route("/api/record/field", post(edit_field))
        .route("/api/order/drag-start", post(drag_start))
        .route("/api/order/drag-over", post(drag_over))
        .route("/api/order/drop", post(drop_dragged))
        .route("/api/export", get(export))
        .route("/api/pairing", post(create_pairing))
        .route("/api/pairing/{code}", axum::routing::delete(end_pairing))
        .route("/api/pairing/{code}/pending", get(pairing_pending))
        .route("/api/pairing/{code}/ws", get(pairing_ws))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_32MB))
        .layer(CorsLayer::permissive())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "ratecon_scan" }))
}

#[derive(Debug, Deserialize)]
struct ScanRequest {
    /// Ordered page photos as data URIs, front of the document first.
    #[serde(default)]
    images: Vec<String>,
    /// When present, photos buffered under this pairing code are drained
    /// and appended after the uploaded ones.
    code: Option<String>,
}

async fn scan(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<Value>, ScanError> {
    let mut images = req.images;
    if let Some(code) = &req.code {
        images.extend(state.pairing.drain(code)?);
    }

    let batch_id = state.session.lock().expect("session lock").begin_batch();

    let raw_pages = extract::extract_batch(&state.http, &state.config.llm, &images).await?;

    let mut session = state.session.lock().expect("session lock");
    let applied = session.apply_batch(batch_id, &raw_pages);
    if !applied {
        // A newer upload superseded this one while it was extracting.
        return Ok(Json(json!({ "applied": false })));
    }

    Ok(Json(json!({
        "applied": true,
        "record": session.record(),
        "stops": session.stops(),
        "order": session.order(),
    })))
}

async fn get_record(State(state): State<AppState>) -> Json<Value> {
    let session = state.session.lock().expect("session lock");
    Json(json!({
        "record": session.record(),
        "stops": session.stops(),
        "order": session.order(),
    }))
}

#[derive(Debug, Deserialize)]
struct EditRequest {
    path: String,
    value: String,
}

async fn edit_field(
    State(state): State<AppState>,
    Json(req): Json<EditRequest>,
) -> Result<Json<Value>, ScanError> {
    let path =
        FieldPath::from_str(&req.path).map_err(|_| ScanError::UnknownFieldPath(req.path.clone()))?;
    let mut session = state.session.lock().expect("session lock");
    session.edit(path, &req.value)?;
    Ok(Json(json!({ "record": session.record() })))
}

#[derive(Debug, Deserialize)]
struct DragRequest {
    index: usize,
}

async fn drag_start(State(state): State<AppState>, Json(req): Json<DragRequest>) -> Json<Value> {
    let mut session = state.session.lock().expect("session lock");
    session.drag_start(req.index);
    Json(json!({ "order": session.order() }))
}

async fn drag_over(State(state): State<AppState>, Json(req): Json<DragRequest>) -> Json<Value> {
    let mut session = state.session.lock().expect("session lock");
    session.drag_over(req.index);
    Json(json!({ "order": session.order() }))
}

async fn drop_dragged(State(state): State<AppState>) -> Json<Value> {
    let mut session = state.session.lock().expect("session lock");
    let moved = session.drop_dragged();
    Json(json!({ "moved": moved, "order": session.order() }))
}

/// Tab-separated line in the user's field order, ready for the caller to
/// place on the clipboard.
async fn export(State(state): State<AppState>) -> Result<Response, ScanError> {
    let line = state.session.lock().expect("session lock").export()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        line,
    )
        .into_response())
}

async fn create_pairing(State(state): State<AppState>) -> Json<Value> {
    let code = state.pairing.create();
    let url = PairingRegistry::link(&state.config.pairing.base_url, &code);
    info!(code = %code, "Pairing code created");
    Json(json!({ "code": code, "url": url }))
}

async fn end_pairing(State(state): State<AppState>, Path(code): Path<String>) -> Json<Value> {
    state.pairing.remove(&code);
    info!(code = %code, "Pairing ended");
    Json(json!({ "removed": true }))
}

async fn pairing_pending(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Value>, ScanError> {
    let pending = state.pairing.pending(&code)?;
    Ok(Json(json!({ "pending": pending })))
}

async fn pairing_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, ScanError> {
    // Reject unknown codes before upgrading so the phone gets a plain 404.
    state.pairing.pending(&code)?;
    Ok(ws.on_upgrade(move |socket| ferry_images(socket, state, code)))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum PairingFrame {
    Image {
        #[serde(rename = "dataUri")]
        data_uri: String,
    },
}

/// Receive `{"type":"image","dataUri":...}` frames from the phone and
/// buffer each photo under the pairing code, acking with the buffer size.
async fn ferry_images(mut socket: WebSocket, state: AppState, code: String) {
    info!(code = %code, "Phone connected");

    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else { continue };

        let frame: PairingFrame = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(code = %code, error = %e, "Ignoring malformed pairing frame");
                continue;
            }
        };

        let PairingFrame::Image { data_uri } = frame;
        let reply = match state.pairing.push_image(&code, data_uri) {
            Ok(pending) => json!({ "type": "ack", "pending": pending }),
            // The desktop ended the pairing while the phone was connected.
            Err(e) => json!({ "type": "error", "error": e.to_string() }),
        };
        if socket
            .send(Message::Text(reply.to_string().into()))
            .await
            .is_err()
        {
            break;
        }
    }

    info!(code = %code, "Phone disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairing_frames_use_camel_case_data_uri() {
        let frame: PairingFrame =
            serde_json::from_str(r#"{"type":"image","dataUri":"data:image/jpeg;base64,AAAA"}"#)
                .unwrap();
        let PairingFrame::Image { data_uri } = frame;
        assert_eq!(data_uri, "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn scan_requests_default_to_no_images() {
        let req: ScanRequest = serde_json::from_str("{}").unwrap();
        assert!(req.images.is_empty());
        assert!(req.code.is_none());
    }
}
