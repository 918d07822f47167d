// Wire protocol: inbound client events and outbound broadcast frames.
//
// Every state-bearing outbound frame carries the room's current turn index
// so receivers can discard stale or duplicated messages; delivery is
// at-least-once and unordered by design.

use serde::{Deserialize, Serialize};

use crate::draft::pick::PickKind;
use crate::draft::seat::SlotKind;
use crate::draft::RoomPhase;

/// Messages sent by clients over the real-time transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Identify the connection. Must precede any other message.
    Hello { user_id: String },
    /// Enter a contest; the engine assigns a room and seat.
    Join { contest_id: String },
    /// Re-attach an existing entry after a dropped connection.
    Resume { room_id: u64, entry_id: String },
    /// Submit a pick for the caller's seat.
    MakePick {
        room_id: u64,
        cell: usize,
        slot: SlotKind,
    },
    /// Voluntarily pass the caller's turn.
    SkipTurn { room_id: u64 },
    /// Withdraw a waiting-room entry for a refund.
    Withdraw { entry_id: String },
}

/// Public summary of one seat, included in room-wide state frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatView {
    pub index: usize,
    pub is_bot: bool,
    pub connected: bool,
    pub budget_remaining: u32,
    pub slots_filled: usize,
}

/// One filled or open roster slot, for seat-specific frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterSlotView {
    pub slot: SlotKind,
    pub player_name: Option<String>,
    pub price: Option<u32>,
}

/// Messages emitted by the engine to room and per-seat channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Direct reply to a successful join.
    Joined {
        contest_id: String,
        room_id: u64,
        seat_index: usize,
        entry_id: String,
    },
    /// Direct reply to a successful withdrawal.
    Withdrawn { entry_id: String },
    /// Direct reply confirming a seat assignment (also sent on resume).
    SeatAssigned { room_id: u64, seat_index: usize },
    /// Room-wide state frame.
    RoomState {
        room_id: u64,
        phase: RoomPhase,
        turn_index: usize,
        /// Seat currently on the clock, if the draft is active.
        on_clock: Option<usize>,
        /// Milliseconds until the current pick clock expires, if armed.
        pick_deadline_ms: Option<u64>,
        seats: Vec<SeatView>,
    },
    /// Seat-specific state frame delivered on the seat's direct channel.
    SeatState {
        room_id: u64,
        turn_index: usize,
        seat_index: usize,
        budget_remaining: u32,
        roster: Vec<RosterSlotView>,
    },
    CountdownTick { room_id: u64, remaining_secs: u32 },
    CountdownCancelled { room_id: u64 },
    DraftStarted { room_id: u64, order: Vec<usize> },
    PickApplied {
        room_id: u64,
        turn_index: usize,
        seat: usize,
        cell: usize,
        slot: SlotKind,
        player_name: String,
        price: u32,
        kind: PickKind,
    },
    TurnSkipped {
        room_id: u64,
        turn_index: usize,
        seat: usize,
    },
    DraftCompleted { room_id: u64, total_turns: usize },
    RoomTornDown { room_id: u64 },
    /// Synchronous error reply to the originating caller.
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn error(err: &crate::error::EngineError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Decode an inbound JSON text frame.
pub fn decode_client(text: &str) -> Result<ClientMessage, serde_json::Error> {
    serde_json::from_str(text)
}

/// Encode an outbound frame as JSON text.
pub fn encode_server(msg: &ServerMessage) -> String {
    // ServerMessage contains only infallibly-serializable fields.
    serde_json::to_string(msg).expect("server message serialization")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;

    #[test]
    fn decode_join() {
        let msg = decode_client(r#"{"type":"join","contest_id":"cash-1"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Join {
                contest_id: "cash-1".into()
            }
        );
    }

    #[test]
    fn decode_make_pick_with_slot_strings() {
        let msg =
            decode_client(r#"{"type":"make_pick","room_id":4,"cell":12,"slot":"FLEX"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::MakePick {
                room_id: 4,
                cell: 12,
                slot: SlotKind::Flex
            }
        );

        let msg = decode_client(r#"{"type":"make_pick","room_id":4,"cell":0,"slot":"RB"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::MakePick {
                room_id: 4,
                cell: 0,
                slot: SlotKind::Pos(Position::RunningBack)
            }
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_client("not json").is_err());
        assert!(decode_client(r#"{"type":"no_such_event"}"#).is_err());
        assert!(decode_client(r#"{"type":"make_pick","room_id":4,"cell":0,"slot":"XX"}"#).is_err());
    }

    #[test]
    fn server_frames_carry_turn_index() {
        let frame = encode_server(&ServerMessage::PickApplied {
            room_id: 1,
            turn_index: 7,
            seat: 2,
            cell: 3,
            slot: SlotKind::Flex,
            player_name: "P".into(),
            price: 4,
            kind: PickKind::Auto,
        });
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["turn_index"], 7);
        assert_eq!(value["type"], "pick_applied");
        assert_eq!(value["kind"], "auto");
        assert_eq!(value["slot"], "FLEX");
    }

    #[test]
    fn error_frame_uses_stable_codes() {
        let err = crate::error::EngineError::NotYourTurn {
            seat: 1,
            turn_index: 3,
        };
        let frame = encode_server(&ServerMessage::error(&err));
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["code"], "not_your_turn");
    }

    #[test]
    fn roundtrip_room_state() {
        let msg = ServerMessage::RoomState {
            room_id: 9,
            phase: RoomPhase::Active,
            turn_index: 3,
            on_clock: Some(1),
            pick_deadline_ms: Some(30_000),
            seats: vec![SeatView {
                index: 0,
                is_bot: false,
                connected: true,
                budget_remaining: 11,
                slots_filled: 2,
            }],
        };
        let decoded: ServerMessage = serde_json::from_str(&encode_server(&msg)).unwrap();
        assert_eq!(decoded, msg);
    }
}
