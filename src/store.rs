// SQLite persistence: entries, picks, and the balance ledger.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::draft::pick::{Pick, PickKind};
use crate::draft::seat::{Roster, SlotKind};
use crate::error::EngineError;

/// Lifecycle status of a persisted entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Active,
    Withdrawn,
    Completed,
}

impl EntryStatus {
    fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Active => "active",
            EntryStatus::Withdrawn => "withdrawn",
            EntryStatus::Completed => "completed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(EntryStatus::Active),
            "withdrawn" => Some(EntryStatus::Withdrawn),
            "completed" => Some(EntryStatus::Completed),
            _ => None,
        }
    }
}

/// A persisted contest entry.
#[derive(Debug, Clone)]
pub struct EntryRecord {
    pub entry_id: String,
    pub contest_id: String,
    pub user_id: String,
    pub room_id: u64,
    pub seat_index: usize,
    pub status: EntryStatus,
    pub total_spent: Option<u32>,
}

/// Persistence contract used by the orchestrator and assignment manager.
///
/// `record_pick` must be idempotent under at-least-once delivery: picks are
/// keyed by `(room_id, turn)` and re-recording is a no-op.
pub trait Persistence: Send + Sync + 'static {
    fn create_entry(&self, entry: &EntryRecord) -> Result<()>;
    fn record_pick(&self, room_id: u64, entry_id: Option<&str>, pick: &Pick) -> Result<()>;
    fn complete_entry(&self, entry_id: &str, roster: &Roster, total_spent: u32) -> Result<()>;
    fn withdraw_entry(&self, entry_id: &str) -> Result<()>;
    fn entry(&self, entry_id: &str) -> Result<Option<EntryRecord>>;
    fn room_entries(&self, room_id: u64) -> Result<Vec<EntryRecord>>;
    fn room_picks(&self, room_id: u64) -> Result<Vec<Pick>>;
}

/// Balance ledger contract. Debits and credits are issued exactly once per
/// join/withdraw/completion event by the callers; the ledger itself only
/// guarantees atomicity of each individual operation.
pub trait BalanceLedger: Send + Sync + 'static {
    fn balance(&self, user_id: &str) -> Result<u32>;
    fn debit(&self, user_id: &str, amount: u32, reason: &str) -> Result<u32, EngineError>;
    fn credit(&self, user_id: &str, amount: u32, reason: &str) -> Result<u32, EngineError>;
}

/// SQLite-backed implementation of both persistence contracts.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path` and ensure the schema
    /// exists. Pass `":memory:"` for an ephemeral database in tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS entries (
                entry_id    TEXT PRIMARY KEY,
                contest_id  TEXT NOT NULL,
                user_id     TEXT NOT NULL,
                room_id     INTEGER NOT NULL,
                seat_index  INTEGER NOT NULL,
                status      TEXT NOT NULL DEFAULT 'active',
                total_spent INTEGER,
                roster      TEXT,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_entries_room ON entries(room_id);

            CREATE TABLE IF NOT EXISTS picks (
                room_id     INTEGER NOT NULL,
                turn        INTEGER NOT NULL,
                seat        INTEGER NOT NULL,
                entry_id    TEXT,
                cell        INTEGER,
                slot        TEXT,
                player_name TEXT,
                price       INTEGER NOT NULL,
                kind        TEXT NOT NULL,
                at          TEXT NOT NULL,
                PRIMARY KEY (room_id, turn)
            );

            CREATE TABLE IF NOT EXISTS balances (
                user_id TEXT PRIMARY KEY,
                amount  INTEGER NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Seed a user's balance, overwriting any previous amount. Used by
    /// operational tooling and tests.
    pub fn set_balance(&self, user_id: &str, amount: u32) -> Result<()> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO balances (user_id, amount) VALUES (?1, ?2)",
                params![user_id, amount],
            )
            .context("failed to set balance")?;
        Ok(())
    }
}

impl Persistence for Store {
    fn create_entry(&self, entry: &EntryRecord) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO entries (entry_id, contest_id, user_id, room_id, seat_index, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.entry_id,
                    entry.contest_id,
                    entry.user_id,
                    entry.room_id as i64,
                    entry.seat_index as i64,
                    entry.status.as_str(),
                ],
            )
            .context("failed to create entry")?;
        Ok(())
    }

    /// Insert a pick keyed by `(room_id, turn)`. Uses INSERT OR IGNORE so
    /// re-recording the same turn is a no-op, satisfying idempotency under
    /// at-least-once delivery.
    fn record_pick(&self, room_id: u64, entry_id: Option<&str>, pick: &Pick) -> Result<()> {
        self.conn()
            .execute(
                "INSERT OR IGNORE INTO picks
                    (room_id, turn, seat, entry_id, cell, slot, player_name, price, kind, at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    room_id as i64,
                    pick.turn as i64,
                    pick.seat as i64,
                    entry_id,
                    pick.cell.map(|c| c as i64),
                    pick.slot.map(|s| s.to_string()),
                    pick.player_name,
                    pick.price,
                    serde_json::to_string(&pick.kind)
                        .context("failed to serialize pick kind")?
                        .trim_matches('"')
                        .to_string(),
                    pick.at.to_rfc3339(),
                ],
            )
            .context("failed to record pick")?;
        Ok(())
    }

    fn complete_entry(&self, entry_id: &str, roster: &Roster, total_spent: u32) -> Result<()> {
        let roster_json =
            serde_json::to_string(roster).context("failed to serialize roster")?;
        self.conn()
            .execute(
                "UPDATE entries SET status = 'completed', total_spent = ?2, roster = ?3
                 WHERE entry_id = ?1",
                params![entry_id, total_spent, roster_json],
            )
            .context("failed to complete entry")?;
        Ok(())
    }

    fn withdraw_entry(&self, entry_id: &str) -> Result<()> {
        self.conn()
            .execute(
                "UPDATE entries SET status = 'withdrawn' WHERE entry_id = ?1",
                params![entry_id],
            )
            .context("failed to withdraw entry")?;
        Ok(())
    }

    fn entry(&self, entry_id: &str) -> Result<Option<EntryRecord>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT entry_id, contest_id, user_id, room_id, seat_index, status, total_spent
                 FROM entries WHERE entry_id = ?1",
                params![entry_id],
                map_entry_row,
            )
            .optional()
            .context("failed to query entry")?;
        Ok(row)
    }

    fn room_entries(&self, room_id: u64) -> Result<Vec<EntryRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT entry_id, contest_id, user_id, room_id, seat_index, status, total_spent
                 FROM entries WHERE room_id = ?1 ORDER BY seat_index",
            )
            .context("failed to prepare room_entries query")?;
        let rows = stmt
            .query_map(params![room_id as i64], map_entry_row)
            .context("failed to query room entries")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map entry rows")?;
        Ok(rows)
    }

    fn room_picks(&self, room_id: u64) -> Result<Vec<Pick>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT turn, seat, cell, slot, player_name, price, kind, at
                 FROM picks WHERE room_id = ?1 ORDER BY turn",
            )
            .context("failed to prepare room_picks query")?;
        let rows = stmt
            .query_map(params![room_id as i64], |row| {
                let turn: i64 = row.get(0)?;
                let seat: i64 = row.get(1)?;
                let cell: Option<i64> = row.get(2)?;
                let slot: Option<String> = row.get(3)?;
                let player_name: Option<String> = row.get(4)?;
                let price: u32 = row.get(5)?;
                let kind: String = row.get(6)?;
                let at: String = row.get(7)?;
                Ok((turn, seat, cell, slot, player_name, price, kind, at))
            })
            .context("failed to query room picks")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map pick rows")?;

        let mut picks = Vec::with_capacity(rows.len());
        for (turn, seat, cell, slot, player_name, price, kind, at) in rows {
            let slot = match slot {
                Some(s) => Some(
                    s.parse::<SlotKind>()
                        .map_err(|e| anyhow::anyhow!("bad slot in picks row: {e}"))?,
                ),
                None => None,
            };
            let kind: PickKind = serde_json::from_str(&format!("\"{kind}\""))
                .context("bad pick kind in picks row")?;
            let at = DateTime::parse_from_rfc3339(&at)
                .context("bad timestamp in picks row")?
                .with_timezone(&Utc);
            picks.push(Pick {
                turn: turn as usize,
                seat: seat as usize,
                cell: cell.map(|c| c as usize),
                slot,
                player_name,
                price,
                kind,
                at,
            });
        }
        Ok(picks)
    }
}

fn map_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRecord> {
    let room_id: i64 = row.get(3)?;
    let seat_index: i64 = row.get(4)?;
    let status: String = row.get(5)?;
    Ok(EntryRecord {
        entry_id: row.get(0)?,
        contest_id: row.get(1)?,
        user_id: row.get(2)?,
        room_id: room_id as u64,
        seat_index: seat_index as usize,
        status: EntryStatus::parse(&status).unwrap_or(EntryStatus::Active),
        total_spent: row.get(6)?,
    })
}

impl BalanceLedger for Store {
    fn balance(&self, user_id: &str) -> Result<u32> {
        let amount: Option<u32> = self
            .conn()
            .query_row(
                "SELECT amount FROM balances WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query balance")?;
        Ok(amount.unwrap_or(0))
    }

    /// Atomically subtract `amount` from the user's balance. The UPDATE's
    /// WHERE clause enforces sufficiency so a concurrent debit can never
    /// drive the balance negative.
    fn debit(&self, user_id: &str, amount: u32, reason: &str) -> Result<u32, EngineError> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE balances SET amount = amount - ?2
                 WHERE user_id = ?1 AND amount >= ?2",
                params![user_id, amount],
            )
            .map_err(|e| EngineError::Internal(format!("debit failed: {e}")))?;
        if changed == 0 {
            let balance: u32 = conn
                .query_row(
                    "SELECT amount FROM balances WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| EngineError::Internal(format!("balance lookup failed: {e}")))?
                .unwrap_or(0);
            return Err(EngineError::InsufficientFunds {
                balance,
                required: amount,
            });
        }
        let new_balance: u32 = conn
            .query_row(
                "SELECT amount FROM balances WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .map_err(|e| EngineError::Internal(format!("balance lookup failed: {e}")))?;
        tracing::debug!(user_id, amount, reason, new_balance, "debit");
        Ok(new_balance)
    }

    fn credit(&self, user_id: &str, amount: u32, reason: &str) -> Result<u32, EngineError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO balances (user_id, amount) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET amount = amount + excluded.amount",
            params![user_id, amount],
        )
        .map_err(|e| EngineError::Internal(format!("credit failed: {e}")))?;
        let new_balance: u32 = conn
            .query_row(
                "SELECT amount FROM balances WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .map_err(|e| EngineError::Internal(format!("balance lookup failed: {e}")))?;
        tracing::debug!(user_id, amount, reason, new_balance, "credit");
        Ok(new_balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use chrono::Utc;

    fn store() -> Store {
        Store::open(":memory:").expect("open in-memory store")
    }

    fn entry(entry_id: &str, room_id: u64, seat: usize) -> EntryRecord {
        EntryRecord {
            entry_id: entry_id.to_string(),
            contest_id: "cash-1".to_string(),
            user_id: format!("user-{entry_id}"),
            room_id,
            seat_index: seat,
            status: EntryStatus::Active,
            total_spent: None,
        }
    }

    fn pick(turn: usize, seat: usize, cell: usize, price: u32) -> Pick {
        Pick {
            turn,
            seat,
            cell: Some(cell),
            slot: Some(SlotKind::Pos(Position::RunningBack)),
            player_name: Some(format!("player-{cell}")),
            price,
            kind: PickKind::Human,
            at: Utc::now(),
        }
    }

    #[test]
    fn create_and_fetch_entry() {
        let store = store();
        store.create_entry(&entry("e1", 1, 0)).unwrap();

        let fetched = store.entry("e1").unwrap().unwrap();
        assert_eq!(fetched.contest_id, "cash-1");
        assert_eq!(fetched.room_id, 1);
        assert_eq!(fetched.status, EntryStatus::Active);
        assert!(store.entry("missing").unwrap().is_none());
    }

    #[test]
    fn room_entries_ordered_by_seat() {
        let store = store();
        store.create_entry(&entry("e2", 1, 2)).unwrap();
        store.create_entry(&entry("e1", 1, 0)).unwrap();
        store.create_entry(&entry("e3", 2, 0)).unwrap();

        let entries = store.room_entries(1).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_id, "e1");
        assert_eq!(entries[1].entry_id, "e2");
    }

    #[test]
    fn record_pick_is_idempotent_by_turn() {
        let store = store();
        let first = pick(0, 1, 4, 6);
        store.record_pick(9, Some("e1"), &first).unwrap();

        // Same turn re-delivered with different payload: ignored.
        let mut duplicate = pick(0, 3, 8, 2);
        duplicate.kind = PickKind::Auto;
        store.record_pick(9, None, &duplicate).unwrap();

        let picks = store.room_picks(9).unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].seat, 1);
        assert_eq!(picks[0].cell, Some(4));
        assert_eq!(picks[0].kind, PickKind::Human);
    }

    #[test]
    fn picks_roundtrip_including_skip() {
        let store = store();
        store.record_pick(5, Some("e1"), &pick(0, 0, 2, 7)).unwrap();
        store.record_pick(5, None, &Pick::skip(1, 4)).unwrap();

        let picks = store.room_picks(5).unwrap();
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].slot, Some(SlotKind::Pos(Position::RunningBack)));
        assert!(picks[1].is_skip());
        assert!(picks[1].cell.is_none());
        assert!(picks[1].slot.is_none());
    }

    #[test]
    fn complete_entry_sets_status_and_spend() {
        let store = store();
        store.create_entry(&entry("e1", 1, 0)).unwrap();
        let roster = Roster::new(&[SlotKind::Pos(Position::Quarterback)]);
        store.complete_entry("e1", &roster, 13).unwrap();

        let fetched = store.entry("e1").unwrap().unwrap();
        assert_eq!(fetched.status, EntryStatus::Completed);
        assert_eq!(fetched.total_spent, Some(13));
    }

    #[test]
    fn withdraw_entry_sets_status() {
        let store = store();
        store.create_entry(&entry("e1", 1, 0)).unwrap();
        store.withdraw_entry("e1").unwrap();
        let fetched = store.entry("e1").unwrap().unwrap();
        assert_eq!(fetched.status, EntryStatus::Withdrawn);
    }

    #[test]
    fn debit_and_credit_flow() {
        let store = store();
        store.set_balance("u1", 20).unwrap();

        assert_eq!(store.debit("u1", 5, "entry fee").unwrap(), 15);
        assert_eq!(store.credit("u1", 3, "refund").unwrap(), 18);
        assert_eq!(store.balance("u1").unwrap(), 18);
    }

    #[test]
    fn debit_insufficient_funds() {
        let store = store();
        store.set_balance("u1", 4).unwrap();

        let err = store.debit("u1", 5, "entry fee").unwrap_err();
        match err {
            EngineError::InsufficientFunds { balance, required } => {
                assert_eq!(balance, 4);
                assert_eq!(required, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Balance untouched on a failed debit.
        assert_eq!(store.balance("u1").unwrap(), 4);
    }

    #[test]
    fn debit_unknown_user_is_insufficient() {
        let store = store();
        let err = store.debit("ghost", 1, "fee").unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { balance: 0, .. }));
    }

    #[test]
    fn credit_creates_missing_balance_row() {
        let store = store();
        assert_eq!(store.credit("new", 7, "promo").unwrap(), 7);
    }
}
