// Immutable pick records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::seat::SlotKind;

/// How a turn was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickKind {
    /// A human seat submitted the pick before the clock expired.
    Human,
    /// A permanent bot seat picked.
    Bot,
    /// A human seat timed out and the bot policy picked for it.
    Auto,
    /// No legal pick existed for the seat; the turn was skipped.
    Skip,
}

impl PickKind {
    pub fn is_bot(&self) -> bool {
        matches!(self, PickKind::Bot)
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, PickKind::Auto)
    }
}

/// One committed turn in a room. Picks are appended in turn order and never
/// mutated or removed; a skip is a first-class record with no cell or slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pick {
    /// Zero-based turn number within the room.
    pub turn: usize,
    /// Seat index that was on the clock.
    pub seat: usize,
    /// Board cell index, `None` for a skip.
    pub cell: Option<usize>,
    /// Roster slot the player filled, `None` for a skip.
    pub slot: Option<SlotKind>,
    pub player_name: Option<String>,
    pub price: u32,
    pub kind: PickKind,
    pub at: DateTime<Utc>,
}

impl Pick {
    pub fn is_skip(&self) -> bool {
        self.kind == PickKind::Skip
    }

    /// Build a skip record for `seat` at `turn`.
    pub fn skip(turn: usize, seat: usize) -> Self {
        Pick {
            turn,
            seat,
            cell: None,
            slot: None,
            player_name: None,
            price: 0,
            kind: PickKind::Skip,
            at: Utc::now(),
        }
    }
}
