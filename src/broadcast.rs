// Fan-out of engine state to observers.
//
// Broadcast is fire-and-forget and at-least-once: the engine never blocks
// on delivery and never treats a failed send as an error. Receivers use the
// turn index carried in the frames to drop stale or duplicated messages.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::ServerMessage;

/// Delivery seam between the engine and the real-time transport.
#[async_trait]
pub trait Broadcast: Send + Sync + 'static {
    /// Deliver to every subscriber of a room's channel.
    async fn emit(&self, room_id: u64, msg: &ServerMessage);

    /// Deliver on a single entry's direct channel.
    async fn emit_to(&self, entry_id: &str, msg: &ServerMessage);

    /// Forget a room's membership list once the room has exited.
    fn drop_room(&self, room_id: u64);
}

#[derive(Default)]
struct ChannelState {
    /// Direct channels keyed by entry id.
    entries: HashMap<String, mpsc::UnboundedSender<ServerMessage>>,
    /// Room membership: entry ids subscribed to each room.
    rooms: HashMap<u64, Vec<String>>,
}

/// Channel-backed broadcast used by the WebSocket gateway. Connections
/// register an outbound sender per entry; dropped connections leave a dead
/// sender behind, which is pruned on the next delivery attempt.
#[derive(Default)]
pub struct ChannelBroadcast {
    state: Mutex<ChannelState>,
}

impl ChannelBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach (or replace, on reconnect) an entry's outbound channel.
    pub fn register(&self, entry_id: &str, tx: mpsc::UnboundedSender<ServerMessage>) {
        let mut state = self.state.lock().expect("broadcast mutex poisoned");
        state.entries.insert(entry_id.to_string(), tx);
    }

    /// Subscribe an entry to a room's channel.
    pub fn subscribe(&self, room_id: u64, entry_id: &str) {
        let mut state = self.state.lock().expect("broadcast mutex poisoned");
        let members = state.rooms.entry(room_id).or_default();
        if !members.iter().any(|e| e == entry_id) {
            members.push(entry_id.to_string());
        }
    }

    /// Detach an entry's outbound channel (connection closed).
    pub fn unregister(&self, entry_id: &str) {
        let mut state = self.state.lock().expect("broadcast mutex poisoned");
        state.entries.remove(entry_id);
    }
}

#[async_trait]
impl Broadcast for ChannelBroadcast {
    async fn emit(&self, room_id: u64, msg: &ServerMessage) {
        let mut state = self.state.lock().expect("broadcast mutex poisoned");
        let Some(members) = state.rooms.get(&room_id).cloned() else {
            return;
        };
        for entry_id in members {
            let dead = match state.entries.get(&entry_id) {
                Some(tx) => tx.send(msg.clone()).is_err(),
                None => false,
            };
            if dead {
                debug!("pruning dead outbound channel for entry {entry_id}");
                state.entries.remove(&entry_id);
            }
        }
    }

    async fn emit_to(&self, entry_id: &str, msg: &ServerMessage) {
        let mut state = self.state.lock().expect("broadcast mutex poisoned");
        let dead = match state.entries.get(entry_id) {
            Some(tx) => tx.send(msg.clone()).is_err(),
            None => false,
        };
        if dead {
            state.entries.remove(entry_id);
        }
    }

    fn drop_room(&self, room_id: u64) {
        let mut state = self.state.lock().expect("broadcast mutex poisoned");
        state.rooms.remove(&room_id);
    }
}

/// Test double that records every emitted frame.
#[derive(Default)]
pub struct RecordingBroadcast {
    frames: Mutex<Vec<(BroadcastTarget, ServerMessage)>>,
    dropped: Mutex<Vec<u64>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastTarget {
    Room(u64),
    Entry(String),
}

impl RecordingBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<(BroadcastTarget, ServerMessage)> {
        self.frames.lock().expect("frames mutex poisoned").clone()
    }

    /// Room ids whose membership has been dropped, in call order.
    pub fn dropped_rooms(&self) -> Vec<u64> {
        self.dropped.lock().expect("dropped mutex poisoned").clone()
    }

    /// All room-channel frames for `room_id`, in emission order.
    pub fn room_frames(&self, room_id: u64) -> Vec<ServerMessage> {
        self.frames()
            .into_iter()
            .filter_map(|(target, msg)| match target {
                BroadcastTarget::Room(id) if id == room_id => Some(msg),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Broadcast for RecordingBroadcast {
    async fn emit(&self, room_id: u64, msg: &ServerMessage) {
        self.frames
            .lock()
            .expect("frames mutex poisoned")
            .push((BroadcastTarget::Room(room_id), msg.clone()));
    }

    async fn emit_to(&self, entry_id: &str, msg: &ServerMessage) {
        self.frames
            .lock()
            .expect("frames mutex poisoned")
            .push((BroadcastTarget::Entry(entry_id.to_string()), msg.clone()));
    }

    fn drop_room(&self, room_id: u64) {
        self.dropped
            .lock()
            .expect("dropped mutex poisoned")
            .push(room_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(room_id: u64, remaining_secs: u32) -> ServerMessage {
        ServerMessage::CountdownTick {
            room_id,
            remaining_secs,
        }
    }

    #[tokio::test]
    async fn room_emit_reaches_subscribers_only() {
        let bus = ChannelBroadcast::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        bus.register("e-a", tx_a);
        bus.register("e-b", tx_b);
        bus.subscribe(1, "e-a");

        bus.emit(1, &tick(1, 9)).await;

        assert_eq!(rx_a.try_recv().unwrap(), tick(1, 9));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn emit_to_unknown_entry_is_silent() {
        let bus = ChannelBroadcast::new();
        bus.emit_to("nobody", &tick(1, 1)).await;
    }

    #[tokio::test]
    async fn dead_channel_is_pruned_not_fatal() {
        let bus = ChannelBroadcast::new();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        bus.register("e-a", tx);
        bus.subscribe(1, "e-a");

        // Both sends hit the dead channel without erroring.
        bus.emit(1, &tick(1, 5)).await;
        bus.emit_to("e-a", &tick(1, 4)).await;
    }

    #[tokio::test]
    async fn dropped_room_no_longer_receives() {
        let bus = ChannelBroadcast::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.register("e-a", tx);
        bus.subscribe(1, "e-a");

        bus.drop_room(1);
        bus.emit(1, &tick(1, 3)).await;
        assert!(rx.try_recv().is_err());

        // The direct channel survives; only room membership is gone.
        bus.emit_to("e-a", &tick(1, 2)).await;
        assert_eq!(rx.try_recv().unwrap(), tick(1, 2));
    }

    #[tokio::test]
    async fn recording_broadcast_captures_order() {
        let bus = RecordingBroadcast::new();
        bus.emit(3, &tick(3, 2)).await;
        bus.emit_to("e-1", &tick(3, 1)).await;

        let frames = bus.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].0, BroadcastTarget::Room(3));
        assert_eq!(frames[1].0, BroadcastTarget::Entry("e-1".into()));
        assert_eq!(bus.room_frames(3), vec![tick(3, 2)]);
    }
}
