// Draft engine: turn order, validation, bot policy, and the per-room
// orchestrator that drives a draft from lobby to completion.

pub mod bot;
pub mod orchestrator;
pub mod pick;
pub mod seat;
pub mod sequencer;
pub mod validator;

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a draft room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    /// Accepting joins and withdrawals; seats may be empty.
    Waiting,
    /// Full and counting down to the first turn. Reverts to `Waiting` if
    /// a participant disconnects before the countdown elapses.
    Countdown,
    /// Turns in progress. Joins and withdrawals are rejected.
    Active,
    /// All turns consumed. The room lingers briefly for late readers and
    /// is then torn down.
    Completed,
}

pub use bot::{select_pick, PickCandidate};
pub use orchestrator::{spawn_room, DraftOrchestrator, RoomDeps, RoomEvent, RoomSnapshot};
pub use pick::{Pick, PickKind};
pub use seat::{Roster, RosterSlot, RosteredPlayer, Seat, SeatIdentity, SlotKind};
pub use sequencer::generate;
pub use validator::eligible_slots;
