// Seats and rosters.
//
// A seat binds one identity (human entry or synthetic bot) to a budget and
// a roster. Seat identity is fixed at creation; roster and budget mutate
// only through validated picks applied by the orchestrator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::board::Position;

/// A roster slot designation: either a dedicated position slot or the
/// shared FLEX slot fillable by any flex-eligible position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SlotKind {
    Pos(Position),
    Flex,
}

impl SlotKind {
    pub fn is_flex(&self) -> bool {
        matches!(self, SlotKind::Flex)
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Pos(p) => write!(f, "{p}"),
            SlotKind::Flex => write!(f, "FLEX"),
        }
    }
}

impl FromStr for SlotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("FLEX") {
            Ok(SlotKind::Flex)
        } else {
            s.parse::<Position>().map(SlotKind::Pos)
        }
    }
}

impl TryFrom<String> for SlotKind {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SlotKind> for String {
    fn from(k: SlotKind) -> String {
        k.to_string()
    }
}

/// A player assigned to a roster slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosteredPlayer {
    pub name: String,
    pub position: Position,
    pub price: u32,
    /// Board cell index the player came from.
    pub cell: usize,
}

/// A single slot on a seat's roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterSlot {
    pub kind: SlotKind,
    pub player: Option<RosteredPlayer>,
}

/// A seat's complete roster, in the configured slot order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    pub slots: Vec<RosterSlot>,
}

impl Roster {
    /// Create an empty roster from the configured slot list.
    pub fn new(slot_kinds: &[SlotKind]) -> Self {
        Roster {
            slots: slot_kinds
                .iter()
                .map(|&kind| RosterSlot { kind, player: None })
                .collect(),
        }
    }

    /// Whether a slot of `kind` exists and is unfilled.
    pub fn has_open(&self, kind: SlotKind) -> bool {
        self.slots
            .iter()
            .any(|s| s.kind == kind && s.player.is_none())
    }

    /// Place a player into the first open slot of `kind`. Returns `false`
    /// without mutating if no such slot is open. At most one player ever
    /// occupies a slot.
    pub fn place(&mut self, kind: SlotKind, player: RosteredPlayer) -> bool {
        match self
            .slots
            .iter_mut()
            .find(|s| s.kind == kind && s.player.is_none())
        {
            Some(slot) => {
                slot.player = Some(player);
                true
            }
            None => false,
        }
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.player.is_some()).count()
    }

    pub fn open_count(&self) -> usize {
        self.slots.len() - self.filled_count()
    }

    pub fn is_full(&self) -> bool {
        self.open_count() == 0
    }

    /// Total price of all rostered players.
    pub fn total_spent(&self) -> u32 {
        self.slots
            .iter()
            .filter_map(|s| s.player.as_ref())
            .map(|p| p.price)
            .sum()
    }
}

/// Who occupies a seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SeatIdentity {
    Human { entry_id: String, user_id: String },
    Bot { bot_id: String },
}

impl SeatIdentity {
    pub fn is_bot(&self) -> bool {
        matches!(self, SeatIdentity::Bot { .. })
    }

    /// The entry id for a human seat, `None` for a bot.
    pub fn entry_id(&self) -> Option<&str> {
        match self {
            SeatIdentity::Human { entry_id, .. } => Some(entry_id),
            SeatIdentity::Bot { .. } => None,
        }
    }
}

/// One participant slot within a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub index: usize,
    pub identity: SeatIdentity,
    pub roster: Roster,
    pub budget_spent: u32,
    pub budget_remaining: u32,
    /// Connectivity flag; meaningful for human seats only. Bots are always
    /// treated as connected.
    pub connected: bool,
}

impl Seat {
    pub fn human(index: usize, entry_id: &str, user_id: &str, budget: u32, slots: &[SlotKind]) -> Self {
        Seat {
            index,
            identity: SeatIdentity::Human {
                entry_id: entry_id.to_string(),
                user_id: user_id.to_string(),
            },
            roster: Roster::new(slots),
            budget_spent: 0,
            budget_remaining: budget,
            connected: true,
        }
    }

    pub fn bot(index: usize, bot_id: &str, budget: u32, slots: &[SlotKind]) -> Self {
        Seat {
            index,
            identity: SeatIdentity::Bot {
                bot_id: bot_id.to_string(),
            },
            roster: Roster::new(slots),
            budget_spent: 0,
            budget_remaining: budget,
            connected: true,
        }
    }

    pub fn is_bot(&self) -> bool {
        self.identity.is_bot()
    }

    /// Apply a validated spend to the seat's budget counters.
    pub fn spend(&mut self, price: u32) {
        self.budget_spent += price;
        self.budget_remaining = self.budget_remaining.saturating_sub(price);
    }
}
