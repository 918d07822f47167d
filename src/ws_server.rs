// WebSocket gateway for clients entering contests and drafting.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::broadcast::ChannelBroadcast;
use crate::error::EngineError;
use crate::protocol::{decode_client, encode_server, ClientMessage, ServerMessage};
use crate::rooms::{RoomAssignmentManager, RoomRegistry};

/// How many times a join is retried when the per-(contest, user) lease is
/// briefly held by another request, and the pause between attempts.
const JOIN_RETRIES: u32 = 3;
const JOIN_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Shared collaborators handed to every connection task.
pub struct Gateway {
    pub manager: Arc<RoomAssignmentManager>,
    pub registry: Arc<RoomRegistry>,
    pub broadcast: Arc<ChannelBroadcast>,
}

/// One entry this connection is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Session {
    entry_id: String,
    room_id: u64,
}

/// Per-connection state: the identified user and the entries the
/// connection currently speaks for.
#[derive(Default)]
pub struct ConnState {
    user_id: Option<String>,
    sessions: Vec<Session>,
}

impl ConnState {
    fn entry_for_room(&self, room_id: u64) -> Option<&str> {
        self.sessions
            .iter()
            .find(|s| s.room_id == room_id)
            .map(|s| s.entry_id.as_str())
    }
}

/// Run the gateway on the given port. Each accepted connection gets its
/// own task; the server runs until the task is cancelled or the process
/// exits.
pub async fn run(gateway: Arc<Gateway>, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    let local_addr = listener.local_addr()?;
    info!("gateway listening on {local_addr}");

    loop {
        let (stream, addr) = listener.accept().await?;
        let addr_str = addr.to_string();
        let gateway = Arc::clone(&gateway);

        tokio::spawn(async move {
            let ws_stream = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {addr_str}: {e}");
                    return;
                }
            };
            info!("client connected from {addr_str}");

            let (mut write, read) = ws_stream.split();
            let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();

            // Writer half: serialize outbound frames until the channel
            // closes or the socket rejects a write.
            let writer = tokio::spawn(async move {
                while let Some(msg) = out_rx.recv().await {
                    let text = encode_server(&msg);
                    if write.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
            });

            let mut conn = ConnState::default();
            process_client_stream(&gateway, read, &out_tx, &mut conn).await;

            // Connection gone: detach its entries and tell their rooms.
            for session in &conn.sessions {
                gateway.broadcast.unregister(&session.entry_id);
                gateway
                    .registry
                    .disconnected(session.room_id, &session.entry_id)
                    .await;
            }
            drop(out_tx);
            let _ = writer.await;
            info!("client {addr_str} disconnected");
        });
    }
}

/// Drive one connection's inbound messages to completion. Generic over the
/// stream type so protocol handling is testable with in-memory streams.
pub async fn process_client_stream<St>(
    gateway: &Gateway,
    mut stream: St,
    out_tx: &mpsc::UnboundedSender<ServerMessage>,
    conn: &mut ConnState,
) where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                handle_text(gateway, conn, out_tx, text.as_ref()).await;
            }
            Ok(Message::Close(_)) => {
                debug!("client sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error: {e}");
                break;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
}

async fn handle_text(
    gateway: &Gateway,
    conn: &mut ConnState,
    out_tx: &mpsc::UnboundedSender<ServerMessage>,
    text: &str,
) {
    let msg = match decode_client(text) {
        Ok(msg) => msg,
        Err(e) => {
            send(
                out_tx,
                ServerMessage::Error {
                    code: "bad_request".to_string(),
                    message: format!("unparseable message: {e}"),
                },
            );
            return;
        }
    };

    match msg {
        ClientMessage::Hello { user_id } => {
            debug!(user_id, "connection identified");
            conn.user_id = Some(user_id);
        }
        ClientMessage::Join { contest_id } => {
            let Some(user_id) = conn.user_id.clone() else {
                send_unidentified(out_tx);
                return;
            };
            match join_with_retry(gateway, &contest_id, &user_id).await {
                Ok(receipt) => {
                    gateway.broadcast.register(&receipt.entry_id, out_tx.clone());
                    gateway.broadcast.subscribe(receipt.room_id, &receipt.entry_id);
                    conn.sessions.push(Session {
                        entry_id: receipt.entry_id.clone(),
                        room_id: receipt.room_id,
                    });
                    send(
                        out_tx,
                        ServerMessage::Joined {
                            contest_id: receipt.contest_id,
                            room_id: receipt.room_id,
                            seat_index: receipt.seat_index,
                            entry_id: receipt.entry_id,
                        },
                    );
                }
                Err(err) => send(out_tx, ServerMessage::error(&err)),
            }
        }
        ClientMessage::Resume { room_id, entry_id } => {
            if gateway.manager.room_of(&entry_id).await != Some(room_id) {
                send(
                    out_tx,
                    ServerMessage::error(&EngineError::NotParticipant { id: entry_id }),
                );
                return;
            }
            gateway.broadcast.register(&entry_id, out_tx.clone());
            gateway.broadcast.subscribe(room_id, &entry_id);
            if !conn.sessions.iter().any(|s| s.entry_id == entry_id) {
                conn.sessions.push(Session {
                    entry_id: entry_id.clone(),
                    room_id,
                });
            }
            gateway.registry.reconnected(room_id, &entry_id).await;
        }
        ClientMessage::MakePick { room_id, cell, slot } => {
            let Some(entry_id) = conn.entry_for_room(room_id) else {
                send(
                    out_tx,
                    ServerMessage::error(&EngineError::RoomNotFound { room_id }),
                );
                return;
            };
            if let Err(err) = gateway.registry.make_pick(room_id, entry_id, cell, slot).await {
                send(out_tx, ServerMessage::error(&err));
            }
        }
        ClientMessage::SkipTurn { room_id } => {
            let Some(entry_id) = conn.entry_for_room(room_id) else {
                send(
                    out_tx,
                    ServerMessage::error(&EngineError::RoomNotFound { room_id }),
                );
                return;
            };
            if let Err(err) = gateway.registry.skip_turn(room_id, entry_id).await {
                send(out_tx, ServerMessage::error(&err));
            }
        }
        ClientMessage::Withdraw { entry_id } => {
            let Some(user_id) = conn.user_id.clone() else {
                send_unidentified(out_tx);
                return;
            };
            match gateway.manager.withdraw(&entry_id, &user_id).await {
                Ok(()) => {
                    gateway.broadcast.unregister(&entry_id);
                    conn.sessions.retain(|s| s.entry_id != entry_id);
                    send(out_tx, ServerMessage::Withdrawn { entry_id });
                }
                Err(err) => send(out_tx, ServerMessage::error(&err)),
            }
        }
    }
}

/// Join with bounded retries when the entry lease is briefly contended by
/// a concurrent request for the same (contest, user) pair.
async fn join_with_retry(
    gateway: &Gateway,
    contest_id: &str,
    user_id: &str,
) -> Result<crate::rooms::JoinReceipt, EngineError> {
    let mut attempt = 0;
    loop {
        match gateway.manager.join(contest_id, user_id).await {
            Err(EngineError::LockContended { key }) if attempt < JOIN_RETRIES => {
                attempt += 1;
                debug!(key, attempt, "entry lease contended, retrying");
                tokio::time::sleep(JOIN_RETRY_DELAY).await;
            }
            other => return other,
        }
    }
}

fn send(out_tx: &mpsc::UnboundedSender<ServerMessage>, msg: ServerMessage) {
    let _ = out_tx.send(msg);
}

fn send_unidentified(out_tx: &mpsc::UnboundedSender<ServerMessage>) {
    send(
        out_tx,
        ServerMessage::Error {
            code: "unidentified".to_string(),
            message: "send hello before any other message".to_string(),
        },
    );
}
