//! Realtime row-change channel
//!
//! Speaks the Phoenix channel protocol (vsn 1.0.0) used by the hosted
//! realtime service: join a topic with a `postgres_changes` filter, keep the
//! socket alive with heartbeats, and leave on release.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashboard_core::{ChangeCallback, DashboardError, DashboardResult, Subscription};
use futures_util::{Sink, SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::oneshot;
use tokio::time::{interval_at, timeout, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::types::{events, PhoenixMessage, PostgresChangesFilter, PHOENIX_TOPIC};

/// Interval between socket heartbeats
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

/// How long to wait for the server to confirm a join
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

const JOIN_REF: u64 = 1;

/// Parameters of one channel join
#[derive(Debug, Clone)]
pub struct ChannelJoin {
    pub topic: String,
    pub filter: PostgresChangesFilter,
    /// User token so row-level security applies to the change feed
    pub access_token: Option<String>,
}

impl ChannelJoin {
    fn payload(&self) -> serde_json::Value {
        let mut payload = json!({
            "config": {
                "broadcast": {"ack": false, "self": false},
                "presence": {"key": ""},
                "postgres_changes": [self.filter],
                "private": false
            }
        });
        if let Some(token) = &self.access_token {
            payload["access_token"] = json!(token);
        }
        payload
    }
}

/// Open a channel and invoke `on_change` for every row change it delivers
///
/// Returns once the server has confirmed the join. The channel runs until the
/// returned guard is released, the server closes it, or the socket fails; in
/// the latter two cases the guard stops reporting itself active.
pub async fn subscribe(
    url: Url,
    join: ChannelJoin,
    on_change: ChangeCallback,
) -> DashboardResult<Subscription> {
    info!("[Realtime] Connecting for {}", join.topic);

    let (ws_stream, _) = connect_async(url.as_str())
        .await
        .map_err(|e| DashboardError::store(format!("Realtime connection failed: {}", e)))?;
    let (mut write, mut read) = ws_stream.split();

    let join_msg = PhoenixMessage::new(join.topic.clone(), events::JOIN, join.payload(), JOIN_REF);
    let json = serde_json::to_string(&join_msg)
        .map_err(|e| DashboardError::internal(format!("Failed to encode join: {}", e)))?;
    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| DashboardError::store(format!("Failed to join {}: {}", join.topic, e)))?;

    // Wait for the join reply; change events cannot arrive before it
    let join_ref = JOIN_REF.to_string();
    let confirmed = timeout(JOIN_TIMEOUT, async {
        while let Some(frame) = read.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => return Err(DashboardError::store(format!("Realtime socket error: {}", e))),
            };
            let Ok(msg) = serde_json::from_str::<PhoenixMessage>(&text) else {
                continue;
            };
            if msg.topic == join.topic && msg.reference.as_deref() == Some(join_ref.as_str()) {
                return match msg.reply_status() {
                    Some("ok") => Ok(()),
                    _ => Err(DashboardError::store(format!(
                        "Realtime join rejected for {}: {}",
                        join.topic, msg.payload
                    ))),
                };
            }
        }
        Err(DashboardError::store(format!(
            "Realtime socket closed before joining {}",
            join.topic
        )))
    })
    .await
    .map_err(|_| DashboardError::store(format!("Timed out joining {}", join.topic)))?;
    confirmed?;

    info!("[Realtime] Joined {}", join.topic);

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let topic = join.topic.clone();
    let alive = Arc::new(AtomicBool::new(true));
    let channel_alive = Arc::clone(&alive);

    tokio::spawn(async move {
        let mut next_ref = JOIN_REF + 1;
        let mut heartbeat = interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);

        loop {
            tokio::select! {
                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            handle_frame(&text, &topic, &on_change);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                warn!("[Realtime] Failed to send pong: {}", e);
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("[Realtime] Connection closed by server ({})", topic);
                            break;
                        }
                        Some(Err(e)) => {
                            error!("[Realtime] Error on {}: {}", topic, e);
                            break;
                        }
                        None => {
                            info!("[Realtime] Stream ended ({})", topic);
                            break;
                        }
                        _ => {}
                    }
                }

                _ = heartbeat.tick() => {
                    let msg = PhoenixMessage::new(PHOENIX_TOPIC, events::HEARTBEAT, json!({}), next_ref);
                    next_ref += 1;
                    if let Err(e) = send_message(&mut write, &msg).await {
                        warn!("[Realtime] Heartbeat failed on {}: {}", topic, e);
                        break;
                    }
                }

                _ = &mut shutdown_rx => {
                    let msg = PhoenixMessage::new(topic.clone(), events::LEAVE, json!({}), next_ref);
                    if let Err(e) = send_message(&mut write, &msg).await {
                        debug!("[Realtime] Leave failed on {}: {}", topic, e);
                    }
                    if let Err(e) = write.close().await {
                        debug!("[Realtime] Close failed on {}: {}", topic, e);
                    }
                    info!("[Realtime] Left {}", topic);
                    return;
                }
            }
        }

        // Socket ended on its own; the guard's release becomes a no-op
        channel_alive.store(false, Ordering::SeqCst);
        warn!("[Realtime] Channel {} stopped receiving changes", topic);
    });

    Ok(Subscription::new(join.topic, move || {
        let _ = shutdown_tx.send(());
    })
    .with_liveness(alive))
}

async fn send_message<S>(write: &mut S, msg: &PhoenixMessage) -> Result<(), String>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| e.to_string())
}

fn handle_frame(text: &str, topic: &str, on_change: &ChangeCallback) {
    let msg = match serde_json::from_str::<PhoenixMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!("[Realtime] Unknown frame: {} (error: {})", text, e);
            return;
        }
    };

    match msg.event.as_str() {
        events::POSTGRES_CHANGES if msg.topic == topic => {
            let change = msg
                .payload
                .pointer("/data/type")
                .and_then(|v| v.as_str())
                .unwrap_or("UNKNOWN");
            debug!("[Realtime] {} on {}", change, topic);
            on_change();
        }
        events::REPLY => {
            if msg.reply_status() != Some("ok") {
                warn!("[Realtime] Error reply on {}: {}", msg.topic, msg.payload);
            }
        }
        events::ERROR | events::CLOSE => {
            warn!("[Realtime] {} on {}", msg.event, msg.topic);
        }
        _ => {
            debug!("[Realtime] Ignoring {} on {}", msg.event, msg.topic);
        }
    }
}
