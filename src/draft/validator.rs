// Pick legality: which roster slots a candidate player could fill.

use crate::board::{PlayerCell, Position};

use super::seat::{Seat, SlotKind};

/// Return every roster slot the given player could legally fill for `seat`:
/// the dedicated position slot if unfilled, plus FLEX if the player's
/// position is flex-eligible and FLEX is unfilled.
///
/// Returns empty when the cell is already drafted, the price exceeds the
/// seat's remaining budget, or no compatible slot is open. A pick is legal
/// iff this set is non-empty and the chosen slot is a member.
pub fn eligible_slots(seat: &Seat, cell: &PlayerCell, flex_positions: &[Position]) -> Vec<SlotKind> {
    if cell.is_drafted() || cell.price > seat.budget_remaining {
        return Vec::new();
    }

    let mut slots = Vec::with_capacity(2);
    let primary = SlotKind::Pos(cell.position);
    if seat.roster.has_open(primary) {
        slots.push(primary);
    }
    if flex_positions.contains(&cell.position) && seat.roster.has_open(SlotKind::Flex) {
        slots.push(SlotKind::Flex);
    }
    slots
}
