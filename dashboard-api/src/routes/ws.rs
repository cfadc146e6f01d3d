//! WebSocket route handler
//!
//! Each connection mounts one live view for the authenticated user. Renders
//! of the view are pushed as `view` messages; client messages drive the view.
//! The view is torn down when the socket closes or its session signs out.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use dashboard_core::{ClientMessage, DashboardError, ErrorCode, ServerMessage, Session, ViewKind};
use dashboard_services::ViewHandle;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{error, info, warn};

use crate::auth::access_token;
use crate::error::{client_message, ws_code_for, ApiResult};
use crate::AppState;

/// Time allowed to flush queued messages after the view ends
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// crypto, stocks, watchlist or overview
    pub view: Option<String>,
    /// For clients that cannot send headers on the upgrade
    pub token: Option<String>,
}

/// Create WebSocket routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let view = params.view.unwrap_or_default();
    let kind = ViewKind::from_str(&view)
        .ok_or_else(|| DashboardError::validation(format!("Unknown view: {}", view)))?;

    let token = access_token(&headers)
        .or(params.token)
        .ok_or_else(|| DashboardError::auth("Missing access token"))?;
    let session = state.sessions.resolve(&token).await?;

    info!("WebSocket upgrade for {} view of {}", kind.as_str(), session.user_id());
    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state, session, kind))
        .into_response())
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, session: Session, kind: ViewKind) {
    let user_id = session.user_id().to_string();
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(100);

    // Subscribe before mounting so a sign-out during mount is not missed
    let mut sign_outs = state.sessions.sign_outs();
    let view = ViewHandle::mount(state.view_context(), kind, user_id.clone()).await;
    let mut updates = view.updates();

    // Task: Forward queued messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize server message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    // Task: Queue every render of the view, starting with the current one
    let render_tx = tx.clone();
    let render_task = tokio::spawn(async move {
        loop {
            let snapshot = updates.borrow_and_update().clone();
            match snapshot.to_message() {
                Ok(msg) => {
                    if render_tx.send(msg).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to render view: {}", e),
            }
            if updates.changed().await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_text(&view, text.as_str()).await {
                        if tx.send(reply).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Ping/pong frames are answered by the socket itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error for {}: {}", user_id, e);
                    break;
                }
            },
            signed_out = sign_outs.recv() => match signed_out {
                Ok(token) if token == session.access_token => {
                    info!("Closing {} view of {} after sign-out", kind.as_str(), user_id);
                    let _ = tx
                        .send(ServerMessage::Error {
                            code: ErrorCode::Unauthorized,
                            message: "Signed out".to_string(),
                        })
                        .await;
                    break;
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    // Stop the view first so nothing new is rendered
    drop(view);
    render_task.abort();
    let _ = render_task.await;
    drop(tx);
    let send_abort = send_task.abort_handle();
    if tokio::time::timeout(FLUSH_TIMEOUT, send_task).await.is_err() {
        warn!("Timed out flushing messages to {}", user_id);
        send_abort.abort();
    }
    info!("WebSocket closed for {}", user_id);
}

/// Apply one text frame to the view; returns the reply to send, if any
async fn handle_text(view: &ViewHandle, text: &str) -> Option<ServerMessage> {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            return Some(ServerMessage::Error {
                code: ErrorCode::InvalidMessage,
                message: format!("Invalid message: {}", e),
            })
        }
    };

    match view.handle(message).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("View message failed: {}", e);
            Some(ServerMessage::Error {
                code: ws_code_for(&e),
                message: client_message(&e),
            })
        }
    }
}
