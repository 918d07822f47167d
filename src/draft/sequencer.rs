// Snake draft order generation.

/// Generate the full pick order for `seat_count` seats over `rounds` rounds.
///
/// Round 0 runs in ascending seat order; each subsequent round reverses
/// direction (serpentine), so average draft position is fair across rounds.
/// For 3 seats and 3 rounds: `[0,1,2, 2,1,0, 0,1,2]`.
///
/// Pure and deterministic; clients use the same function to predict whose
/// turn is next.
pub fn generate(seat_count: usize, rounds: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(seat_count * rounds);
    for round in 0..rounds {
        if round % 2 == 0 {
            order.extend(0..seat_count);
        } else {
            order.extend((0..seat_count).rev());
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_by_three() {
        assert_eq!(generate(3, 3), vec![0, 1, 2, 2, 1, 0, 0, 1, 2]);
    }

    #[test]
    fn five_by_five_length_and_shape() {
        let order = generate(5, 5);
        assert_eq!(order.len(), 25);
        assert_eq!(&order[0..5], &[0, 1, 2, 3, 4]);
        assert_eq!(&order[5..10], &[4, 3, 2, 1, 0]);
        assert_eq!(&order[10..15], &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn every_seat_picks_once_per_round() {
        let order = generate(5, 8);
        for round in 0..8 {
            let mut block: Vec<usize> = order[round * 5..(round + 1) * 5].to_vec();
            block.sort_unstable();
            assert_eq!(block, vec![0, 1, 2, 3, 4], "round {round}");
        }
    }

    #[test]
    fn boundary_positions_are_fair() {
        // Seat 0 picks first in even rounds, last in odd rounds.
        let order = generate(4, 2);
        assert_eq!(order.first(), Some(&0));
        assert_eq!(order.last(), Some(&0));
    }

    #[test]
    fn degenerate_shapes() {
        assert!(generate(0, 5).is_empty());
        assert!(generate(5, 0).is_empty());
        assert_eq!(generate(1, 3), vec![0, 0, 0]);
    }
}
