//! Watchlist live updates against an in-process Phoenix socket
//!
//! Run with: cargo test -p dashboard-supabase --test realtime_mock

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashboard_core::{ChangeCallback, DashboardError, WatchlistStore};
use dashboard_supabase::types::PhoenixMessage;
use dashboard_supabase::{SupabaseClient, SupabaseConfig, SupabaseWatchlistStore};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// Frames the mock server saw, plus the upgrade request's URI
#[derive(Debug)]
enum Seen {
    Uri(String),
    Frame(PhoenixMessage),
}

/// How the mock server answers a join
#[derive(Debug, Clone, Copy, PartialEq)]
enum OnJoin {
    /// Confirm, then push one change
    Accept,
    Reject,
    /// Confirm, then close the socket
    AcceptAndClose,
}

/// Accept one socket and answer its join per `on_join`
async fn spawn_socket(on_join: OnJoin) -> (SupabaseWatchlistStore, mpsc::UnboundedReceiver<Seen>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let uri_tx = seen_tx.clone();
        let ws = tokio_tungstenite::accept_hdr_async(stream, move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let _ = uri_tx.send(Seen::Uri(req.uri().to_string()));
            Ok(resp)
        })
        .await
        .unwrap();
        let (mut write, mut read) = ws.split();

        while let Some(Ok(frame)) = read.next().await {
            let Message::Text(text) = frame else { continue };
            let msg: PhoenixMessage = serde_json::from_str(&text).unwrap();
            let _ = seen_tx.send(Seen::Frame(msg.clone()));

            if msg.event == "phx_join" {
                let status = if on_join == OnJoin::Reject { "error" } else { "ok" };
                let reply = json!({
                    "topic": msg.topic,
                    "event": "phx_reply",
                    "payload": {"status": status, "response": {}},
                    "ref": msg.reference
                });
                write.send(Message::Text(reply.to_string().into())).await.unwrap();

                if on_join == OnJoin::AcceptAndClose {
                    let _ = write.send(Message::Close(None)).await;
                    return;
                }
                if on_join == OnJoin::Accept {
                    let change = json!({
                        "topic": msg.topic,
                        "event": "postgres_changes",
                        "payload": {"data": {"type": "INSERT", "table": "watchlist"}},
                        "ref": null
                    });
                    write.send(Message::Text(change.to_string().into())).await.unwrap();
                }
            }
        }
    });

    let client = SupabaseClient::new(SupabaseConfig::new(format!("http://{}", addr), "anon-key")).unwrap();
    (SupabaseWatchlistStore::new(client), seen_rx)
}

async fn next_frame(seen: &mut mpsc::UnboundedReceiver<Seen>) -> PhoenixMessage {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), seen.recv()).await {
            Ok(Some(Seen::Frame(msg))) => return msg,
            Ok(Some(Seen::Uri(_))) => continue,
            other => panic!("no frame received: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_change_fires_callback_and_release_leaves() {
    let (store, mut seen) = spawn_socket(OnJoin::Accept).await;

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    let on_change: ChangeCallback = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let subscription = store.subscribe("u1", on_change).await.unwrap();
    assert_eq!(subscription.label(), "realtime:watchlist:u1");

    match seen.recv().await {
        Some(Seen::Uri(uri)) => {
            assert!(uri.starts_with("/realtime/v1/websocket"));
            assert!(uri.contains("apikey=anon-key"));
            assert!(uri.contains("vsn=1.0.0"));
        }
        other => panic!("expected upgrade request, got {other:?}"),
    }

    let join = next_frame(&mut seen).await;
    assert_eq!(join.event, "phx_join");
    assert_eq!(join.topic, "realtime:watchlist:u1");
    assert_eq!(
        join.payload["config"]["postgres_changes"][0]["filter"],
        "user_id=eq.u1"
    );
    // No signed-in token: the join carries none
    assert!(join.payload.get("access_token").is_none());

    tokio::time::timeout(Duration::from_secs(5), async {
        while changes.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("change callback fired");

    drop(subscription);

    let leave = next_frame(&mut seen).await;
    assert_eq!(leave.event, "phx_leave");
    assert_eq!(leave.topic, "realtime:watchlist:u1");
}

#[tokio::test]
async fn test_server_close_deactivates_subscription() {
    let (store, _seen) = spawn_socket(OnJoin::AcceptAndClose).await;

    let subscription = store.subscribe("u1", Arc::new(|| {})).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while subscription.is_active() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("subscription reported the closed channel");
}

#[tokio::test]
async fn test_rejected_join_is_store_error() {
    let (store, _seen) = spawn_socket(OnJoin::Reject).await;

    let err = store.subscribe("u1", Arc::new(|| {})).await.unwrap_err();
    assert!(matches!(err, DashboardError::Store(_)));
}

#[tokio::test]
async fn test_unreachable_socket_is_store_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = SupabaseClient::new(SupabaseConfig::new(format!("http://{}", addr), "anon-key")).unwrap();
    let store = SupabaseWatchlistStore::new(client);

    let err = store.subscribe("u1", Arc::new(|| {})).await.unwrap_err();
    assert!(err.is_store_error());
}
