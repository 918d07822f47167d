// Deterministic greedy bot policy.
//
// One policy serves both launch-time bot seats and auto-picks for humans
// that miss their pick clock; the two differ only in the PickKind tag the
// orchestrator stamps on the resulting record.

use crate::board::{PlayerBoard, Position};

use super::seat::{Seat, SlotKind};
use super::validator::eligible_slots;

/// A candidate pick produced by the bot policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickCandidate {
    pub cell: usize,
    pub slot: SlotKind,
}

/// Select the best affordable pick for `seat`, or `None` if no legal pick
/// exists (the seat is then skipped, not stuck).
///
/// Preference order:
/// 1. Among candidates that fill a currently-unfilled dedicated position
///    slot (not FLEX): highest price, ties broken by lowest board index.
/// 2. Otherwise, among all affordable candidates with any eligible slot:
///    highest price, ties broken by lowest board index.
pub fn select_pick(
    seat: &Seat,
    board: &PlayerBoard,
    flex_positions: &[Position],
) -> Option<PickCandidate> {
    let mut best_required: Option<(u32, usize, SlotKind)> = None;
    let mut best_any: Option<(u32, usize, SlotKind)> = None;

    for (idx, cell) in board.undrafted() {
        let slots = eligible_slots(seat, cell, flex_positions);
        let Some(&first) = slots.first() else {
            continue;
        };

        // eligible_slots lists the dedicated position slot before FLEX, so
        // `first` is the required slot whenever one is open.
        if !first.is_flex() && better(&best_required, cell.price, idx) {
            best_required = Some((cell.price, idx, first));
        }
        if better(&best_any, cell.price, idx) {
            best_any = Some((cell.price, idx, first));
        }
    }

    best_required
        .or(best_any)
        .map(|(_, cell, slot)| PickCandidate { cell, slot })
}

/// Whether `(price, idx)` beats the current best: strictly higher price, or
/// equal price at a lower board index.
fn better(current: &Option<(u32, usize, SlotKind)>, price: u32, idx: usize) -> bool {
    match current {
        None => true,
        Some((best_price, best_idx, _)) => {
            price > *best_price || (price == *best_price && idx < *best_idx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::PlayerCell;
    use crate::draft::seat::RosteredPlayer;

    fn flex() -> Vec<Position> {
        vec![Position::RunningBack, Position::WideReceiver, Position::TightEnd]
    }

    fn slots() -> Vec<SlotKind> {
        vec![
            SlotKind::Pos(Position::Quarterback),
            SlotKind::Pos(Position::RunningBack),
            SlotKind::Pos(Position::WideReceiver),
            SlotKind::Pos(Position::TightEnd),
            SlotKind::Flex,
        ]
    }

    fn cell(name: &str, pos: Position, price: u32) -> PlayerCell {
        PlayerCell {
            name: name.into(),
            team: "FA".into(),
            position: pos,
            price,
            drafted_by: None,
        }
    }

    fn fill(seat: &mut Seat, kind: SlotKind, pos: Position, price: u32) {
        assert!(seat.roster.place(
            kind,
            RosteredPlayer {
                name: "X".into(),
                position: pos,
                price,
                cell: 0,
            }
        ));
        seat.spend(price);
    }

    #[test]
    fn prefers_highest_priced_required_fill() {
        let seat = Seat::human(0, "e1", "u1", 15, &slots());
        let board = PlayerBoard::new(vec![
            cell("cheap qb", Position::Quarterback, 2),
            cell("star rb", Position::RunningBack, 9),
            cell("mid wr", Position::WideReceiver, 5),
        ]);
        let pick = select_pick(&seat, &board, &flex()).unwrap();
        assert_eq!(pick.cell, 1);
        assert_eq!(pick.slot, SlotKind::Pos(Position::RunningBack));
    }

    #[test]
    fn tie_broken_by_board_index() {
        let seat = Seat::human(0, "e1", "u1", 15, &slots());
        let board = PlayerBoard::new(vec![
            cell("rb a", Position::RunningBack, 6),
            cell("wr b", Position::WideReceiver, 6),
        ]);
        let pick = select_pick(&seat, &board, &flex()).unwrap();
        assert_eq!(pick.cell, 0);
    }

    #[test]
    fn required_slot_beats_pricier_flex_only_candidate() {
        let mut seat = Seat::human(0, "e1", "u1", 15, &slots());
        // RB slot already filled: further RBs are flex-only candidates.
        fill(&mut seat, SlotKind::Pos(Position::RunningBack), Position::RunningBack, 1);
        let board = PlayerBoard::new(vec![
            cell("star rb", Position::RunningBack, 9),
            cell("mid te", Position::TightEnd, 4),
        ]);
        let pick = select_pick(&seat, &board, &flex()).unwrap();
        assert_eq!(pick.cell, 1, "TE fills a required slot, RB only FLEX");
        assert_eq!(pick.slot, SlotKind::Pos(Position::TightEnd));
    }

    #[test]
    fn falls_back_to_flex_when_no_required_fill() {
        let mut seat = Seat::human(0, "e1", "u1", 15, &slots());
        fill(&mut seat, SlotKind::Pos(Position::RunningBack), Position::RunningBack, 1);
        // Only RBs remain; the dedicated RB slot is taken.
        let board = PlayerBoard::new(vec![
            cell("rb a", Position::RunningBack, 3),
            cell("rb b", Position::RunningBack, 7),
        ]);
        let pick = select_pick(&seat, &board, &flex()).unwrap();
        assert_eq!(pick.cell, 1);
        assert_eq!(pick.slot, SlotKind::Flex);
    }

    #[test]
    fn respects_budget() {
        let mut seat = Seat::human(0, "e1", "u1", 15, &slots());
        seat.spend(12);
        let board = PlayerBoard::new(vec![
            cell("star rb", Position::RunningBack, 9),
            cell("budget wr", Position::WideReceiver, 3),
        ]);
        let pick = select_pick(&seat, &board, &flex()).unwrap();
        assert_eq!(pick.cell, 1);
    }

    #[test]
    fn skips_drafted_cells() {
        let seat = Seat::human(0, "e1", "u1", 15, &slots());
        let mut board = PlayerBoard::new(vec![
            cell("star rb", Position::RunningBack, 9),
            cell("mid wr", Position::WideReceiver, 5),
        ]);
        board.mark_drafted(0, 3).unwrap();
        let pick = select_pick(&seat, &board, &flex()).unwrap();
        assert_eq!(pick.cell, 1);
    }

    #[test]
    fn none_when_nothing_affordable() {
        let mut seat = Seat::human(0, "e1", "u1", 15, &slots());
        seat.spend(15);
        let board = PlayerBoard::new(vec![cell("rb", Position::RunningBack, 1)]);
        assert_eq!(select_pick(&seat, &board, &flex()), None);
    }

    #[test]
    fn none_when_no_compatible_slot() {
        let mut seat = Seat::human(0, "e1", "u1", 15, &slots());
        fill(&mut seat, SlotKind::Pos(Position::Quarterback), Position::Quarterback, 1);
        // Only QBs left and QB is not flex-eligible.
        let board = PlayerBoard::new(vec![cell("qb2", Position::Quarterback, 2)]);
        assert_eq!(select_pick(&seat, &board, &flex()), None);
    }

    #[test]
    fn deterministic_across_calls() {
        let seat = Seat::human(0, "e1", "u1", 15, &slots());
        let board = PlayerBoard::new(vec![
            cell("a", Position::RunningBack, 4),
            cell("b", Position::WideReceiver, 4),
            cell("c", Position::TightEnd, 4),
        ]);
        let first = select_pick(&seat, &board, &flex());
        for _ in 0..10 {
            assert_eq!(select_pick(&seat, &board, &flex()), first);
        }
    }
}
