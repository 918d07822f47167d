// Player board: the priced grid of draftable players for one room.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Football positions used for board cells and roster slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Position {
    Quarterback,
    RunningBack,
    WideReceiver,
    TightEnd,
    Kicker,
    Defense,
}

impl Position {
    /// Parse a position abbreviation (case-insensitive).
    pub fn from_abbrev(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "K" => Some(Position::Kicker),
            "DEF" | "DST" => Some(Position::Defense),
            _ => None,
        }
    }

    pub fn abbrev(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Kicker => "K",
            Position::Defense => "DEF",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbrev())
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::from_abbrev(s).ok_or_else(|| format!("unknown position `{s}`"))
    }
}

impl TryFrom<String> for Position {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Position> for String {
    fn from(p: Position) -> String {
        p.abbrev().to_string()
    }
}

/// One draftable player on the board.
///
/// A cell moves from undrafted to drafted exactly once; `drafted_by` is set
/// only by the orchestrator when a validated pick is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerCell {
    pub name: String,
    pub team: String,
    pub position: Position,
    pub price: u32,
    /// Seat index that drafted this cell, if any.
    pub drafted_by: Option<usize>,
}

impl PlayerCell {
    pub fn is_drafted(&self) -> bool {
        self.drafted_by.is_some()
    }
}

/// The fixed-size grid of players shared by all seats in a room.
///
/// The cell list is immutable after construction; only the `drafted_by`
/// markers mutate, and only through [`PlayerBoard::mark_drafted`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerBoard {
    cells: Vec<PlayerCell>,
}

impl PlayerBoard {
    pub fn new(cells: Vec<PlayerCell>) -> Self {
        PlayerBoard { cells }
    }

    /// Load a board template from a CSV file with columns
    /// `name,team,position,price`.
    pub fn from_csv(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open board csv at {}", path.display()))?;

        let mut cells = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("bad board csv record at line {line}"))?;
            let name = record.get(0).unwrap_or("").trim().to_string();
            let team = record.get(1).unwrap_or("").trim().to_string();
            let pos_str = record.get(2).unwrap_or("").trim();
            let price: u32 = record
                .get(3)
                .unwrap_or("")
                .trim()
                .parse()
                .with_context(|| format!("bad price in board csv at line {line}"))?;
            let position = Position::from_abbrev(pos_str)
                .ok_or_else(|| anyhow::anyhow!("unknown position `{pos_str}` at line {line}"))?;
            cells.push(PlayerCell {
                name,
                team,
                position,
                price,
                drafted_by: None,
            });
        }

        anyhow::ensure!(!cells.is_empty(), "board csv {} is empty", path.display());
        Ok(PlayerBoard { cells })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, idx: usize) -> Option<&PlayerCell> {
        self.cells.get(idx)
    }

    pub fn cells(&self) -> &[PlayerCell] {
        &self.cells
    }

    /// Iterate over `(index, cell)` pairs for cells not yet drafted.
    pub fn undrafted(&self) -> impl Iterator<Item = (usize, &PlayerCell)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_drafted())
    }

    /// Mark a cell drafted by `seat`. Fails if the index is out of range or
    /// the cell was already drafted; the drafted transition happens at most
    /// once per cell.
    pub fn mark_drafted(&mut self, idx: usize, seat: usize) -> Result<(), String> {
        match self.cells.get_mut(idx) {
            None => Err(format!("cell index {idx} out of range")),
            Some(cell) if cell.is_drafted() => {
                Err(format!("cell {idx} ({}) already drafted", cell.name))
            }
            Some(cell) => {
                cell.drafted_by = Some(seat);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn cell(name: &str, pos: Position, price: u32) -> PlayerCell {
        PlayerCell {
            name: name.to_string(),
            team: "FA".to_string(),
            position: pos,
            price,
            drafted_by: None,
        }
    }

    #[test]
    fn position_abbrev_roundtrip() {
        for pos in [
            Position::Quarterback,
            Position::RunningBack,
            Position::WideReceiver,
            Position::TightEnd,
            Position::Kicker,
            Position::Defense,
        ] {
            assert_eq!(Position::from_abbrev(pos.abbrev()), Some(pos));
        }
    }

    #[test]
    fn position_parse_case_insensitive() {
        assert_eq!(Position::from_abbrev("qb"), Some(Position::Quarterback));
        assert_eq!(Position::from_abbrev("dst"), Some(Position::Defense));
        assert_eq!(Position::from_abbrev("XX"), None);
    }

    #[test]
    fn mark_drafted_sets_seat() {
        let mut board = PlayerBoard::new(vec![cell("A", Position::Quarterback, 5)]);
        board.mark_drafted(0, 2).unwrap();
        assert_eq!(board.cell(0).unwrap().drafted_by, Some(2));
    }

    #[test]
    fn mark_drafted_twice_fails() {
        let mut board = PlayerBoard::new(vec![cell("A", Position::Quarterback, 5)]);
        board.mark_drafted(0, 0).unwrap();
        let err = board.mark_drafted(0, 1).unwrap_err();
        assert!(err.contains("already drafted"));
        // First seat's claim is untouched.
        assert_eq!(board.cell(0).unwrap().drafted_by, Some(0));
    }

    #[test]
    fn mark_drafted_out_of_range() {
        let mut board = PlayerBoard::new(vec![cell("A", Position::Quarterback, 5)]);
        assert!(board.mark_drafted(7, 0).is_err());
    }

    #[test]
    fn undrafted_skips_taken_cells() {
        let mut board = PlayerBoard::new(vec![
            cell("A", Position::Quarterback, 5),
            cell("B", Position::RunningBack, 4),
            cell("C", Position::WideReceiver, 3),
        ]);
        board.mark_drafted(1, 0).unwrap();
        let remaining: Vec<usize> = board.undrafted().map(|(i, _)| i).collect();
        assert_eq!(remaining, vec![0, 2]);
    }
}
