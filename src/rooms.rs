// Room registry and contest entry management.
//
// The registry maps room ids to live room event queues. The assignment
// manager owns contest bookkeeping (capacity, per-user entry limits, the
// debit/credit flow) and places each accepted entry into a waiting room,
// creating rooms with sequential ids as needed. All join/withdraw work for
// a (contest, user) pair is serialized through a named lease so concurrent
// requests cannot double-enter or double-charge.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::board::PlayerBoard;
use crate::broadcast::Broadcast;
use crate::config::{ContestKind, ContestSpec, DraftConfig};
use crate::draft::orchestrator::{spawn_room, RoomDeps, RoomEvent, RoomSnapshot};
use crate::draft::seat::SlotKind;
use crate::error::EngineError;
use crate::settle::Settlement;
use crate::store::{BalanceLedger, EntryRecord, EntryStatus, Persistence};

/// TTL for the per-(contest, user) join/withdraw lease. Generous compared
/// to the work done under it; only a crashed holder ever reaches expiry.
const ENTRY_LOCK_TTL: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Room registry
// ---------------------------------------------------------------------------

/// Address of a live room.
#[derive(Clone)]
pub struct RoomHandle {
    pub room_id: u64,
    pub contest_id: String,
    tx: mpsc::Sender<RoomEvent>,
}

/// Maps room ids to live rooms and routes turn-scoped events to them.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<u64, RoomHandle>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, handle: RoomHandle) {
        self.rooms.lock().await.insert(handle.room_id, handle);
    }

    pub async fn remove(&self, room_id: u64) {
        self.rooms.lock().await.remove(&room_id);
    }

    pub async fn get(&self, room_id: u64) -> Option<RoomHandle> {
        self.rooms.lock().await.get(&room_id).cloned()
    }

    /// Send an event to a room, building the reply plumbing. A missing or
    /// exited room yields `RoomNotFound`; exited rooms are pruned.
    async fn send<T>(
        &self,
        room_id: u64,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomEvent,
    ) -> Result<T, EngineError> {
        let handle = self
            .get(room_id)
            .await
            .ok_or(EngineError::RoomNotFound { room_id })?;
        let (reply, rx) = oneshot::channel();
        if handle.tx.send(make(reply)).await.is_err() {
            self.remove(room_id).await;
            return Err(EngineError::RoomNotFound { room_id });
        }
        rx.await
            .map_err(|_| EngineError::RoomNotFound { room_id })
    }

    /// Fire-and-forget event to a room; silently dropped if the room is gone.
    async fn notify(&self, room_id: u64, event: RoomEvent) {
        if let Some(handle) = self.get(room_id).await {
            if handle.tx.send(event).await.is_err() {
                self.remove(room_id).await;
            }
        }
    }

    pub async fn snapshot(&self, room_id: u64) -> Result<RoomSnapshot, EngineError> {
        self.send(room_id, |reply| RoomEvent::Snapshot { reply }).await
    }

    pub async fn make_pick(
        &self,
        room_id: u64,
        entry_id: &str,
        cell: usize,
        slot: SlotKind,
    ) -> Result<(), EngineError> {
        let entry_id = entry_id.to_string();
        self.send(room_id, |reply| RoomEvent::MakePick {
            entry_id,
            cell,
            slot,
            reply,
        })
        .await?
    }

    pub async fn skip_turn(&self, room_id: u64, entry_id: &str) -> Result<(), EngineError> {
        let entry_id = entry_id.to_string();
        self.send(room_id, |reply| RoomEvent::SkipTurn { entry_id, reply })
            .await?
    }

    pub async fn disconnected(&self, room_id: u64, entry_id: &str) {
        self.notify(
            room_id,
            RoomEvent::Disconnected {
                entry_id: entry_id.to_string(),
            },
        )
        .await;
    }

    pub async fn reconnected(&self, room_id: u64, entry_id: &str) {
        self.notify(
            room_id,
            RoomEvent::Reconnected {
                entry_id: entry_id.to_string(),
            },
        )
        .await;
    }
}

// ---------------------------------------------------------------------------
// Contest bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestStatus {
    Open,
    Closed,
}

struct ContestState {
    spec: ContestSpec,
    status: ContestStatus,
    entry_count: u32,
    user_entries: HashMap<String, u32>,
    /// Set when the contest closed because it filled, as opposed to being
    /// closed operationally. Only capacity closures reopen on withdrawal.
    closed_by_capacity: bool,
}

struct RoomMeta {
    room_id: u64,
    contest_id: String,
    /// User ids currently holding a seat, for per-room duplicate checks.
    humans: HashSet<String>,
    /// Set once the room stops accepting joins.
    launched: bool,
}

struct EntryMeta {
    contest_id: String,
    user_id: String,
    room_id: u64,
}

struct ManagerState {
    contests: HashMap<String, ContestState>,
    rooms: Vec<RoomMeta>,
    entries: HashMap<String, EntryMeta>,
    next_room_id: u64,
    next_entry_seq: u64,
    /// Per-family counter for numbered cash replacement contests.
    family_seq: HashMap<String, u64>,
}

/// Successful join outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinReceipt {
    pub contest_id: String,
    pub room_id: u64,
    pub seat_index: usize,
    pub entry_id: String,
}

/// Public summary of one contest, for lobby listings.
#[derive(Debug, Clone)]
pub struct ContestSummary {
    pub contest_id: String,
    pub kind: ContestKind,
    pub entry_fee: u32,
    pub capacity: u32,
    pub entry_count: u32,
    pub open: bool,
}

// ---------------------------------------------------------------------------
// Assignment manager
// ---------------------------------------------------------------------------

/// Accepts contest entries, charges fees, and places entries into rooms.
pub struct RoomAssignmentManager {
    state: Arc<Mutex<ManagerState>>,
    locks: crate::lock::ResourceLock,
    registry: Arc<RoomRegistry>,
    cfg: Arc<DraftConfig>,
    board_template: PlayerBoard,
    store: Arc<dyn Persistence>,
    ledger: Arc<dyn BalanceLedger>,
    broadcast: Arc<dyn Broadcast>,
    settlement: Arc<dyn Settlement>,
}

impl RoomAssignmentManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: Arc<DraftConfig>,
        contests: &[ContestSpec],
        board_template: PlayerBoard,
        registry: Arc<RoomRegistry>,
        store: Arc<dyn Persistence>,
        ledger: Arc<dyn BalanceLedger>,
        broadcast: Arc<dyn Broadcast>,
        settlement: Arc<dyn Settlement>,
    ) -> Self {
        let contests = contests
            .iter()
            .map(|spec| {
                (
                    spec.family.clone(),
                    ContestState {
                        spec: spec.clone(),
                        status: ContestStatus::Open,
                        entry_count: 0,
                        user_entries: HashMap::new(),
                        closed_by_capacity: false,
                    },
                )
            })
            .collect();

        RoomAssignmentManager {
            state: Arc::new(Mutex::new(ManagerState {
                contests,
                rooms: Vec::new(),
                entries: HashMap::new(),
                next_room_id: 1,
                next_entry_seq: 1,
                family_seq: HashMap::new(),
            })),
            locks: crate::lock::ResourceLock::new(),
            registry,
            cfg,
            board_template,
            store,
            ledger,
            broadcast,
            settlement,
        }
    }

    /// Enter `user_id` into `contest_id`: check limits and funds, find or
    /// create a waiting room, reserve a seat, then charge the entry fee.
    /// The fee is debited exactly once, after the seat is held; a failed
    /// debit releases the seat.
    pub async fn join(&self, contest_id: &str, user_id: &str) -> Result<JoinReceipt, EngineError> {
        let lock_key = format!("entry:{contest_id}:{user_id}");
        let _lease = self
            .locks
            .lease(&lock_key, ENTRY_LOCK_TTL)
            .ok_or_else(|| EngineError::LockContended {
                key: lock_key.clone(),
            })?;

        let mut state = self.state.lock().await;

        let contest = state
            .contests
            .get(contest_id)
            .ok_or_else(|| EngineError::ContestNotAcceptingEntries {
                contest_id: contest_id.to_string(),
            })?;
        if contest.status != ContestStatus::Open {
            return Err(EngineError::ContestNotAcceptingEntries {
                contest_id: contest_id.to_string(),
            });
        }
        let spec = contest.spec.clone();
        let user_count = contest.user_entries.get(user_id).copied().unwrap_or(0);
        if user_count >= spec.max_entries_per_user {
            return Err(EngineError::EntryLimitExceeded {
                contest_id: contest_id.to_string(),
                max: spec.max_entries_per_user,
            });
        }
        let balance = self
            .ledger
            .balance(user_id)
            .map_err(|e| EngineError::Internal(format!("balance lookup failed: {e:#}")))?;
        if balance < spec.entry_fee {
            return Err(EngineError::InsufficientFunds {
                balance,
                required: spec.entry_fee,
            });
        }

        let entry_id = format!("entry-{}", state.next_entry_seq);
        state.next_entry_seq += 1;

        // Place the entry into the oldest joinable room, creating one if
        // every existing room is launched, full, or already holds this user.
        let (room_id, seat_index) = self
            .place_in_room(&mut state, contest_id, &entry_id, user_id)
            .await?;

        if let Err(err) = self.ledger.debit(user_id, spec.entry_fee, "entry fee") {
            // Roll the seat back; the room is still waiting, so this cannot
            // legitimately fail.
            let _ = self
                .registry
                .send(room_id, |reply| RoomEvent::Withdraw {
                    entry_id: entry_id.clone(),
                    reply,
                })
                .await;
            if let Some(meta) = state.rooms.iter_mut().find(|r| r.room_id == room_id) {
                meta.humans.remove(user_id);
            }
            return Err(err);
        }

        if let Err(e) = self.store.create_entry(&EntryRecord {
            entry_id: entry_id.clone(),
            contest_id: contest_id.to_string(),
            user_id: user_id.to_string(),
            room_id,
            seat_index,
            status: EntryStatus::Active,
            total_spent: None,
        }) {
            warn!(%entry_id, "failed to persist entry: {e:#}");
        }

        state.entries.insert(
            entry_id.clone(),
            EntryMeta {
                contest_id: contest_id.to_string(),
                user_id: user_id.to_string(),
                room_id,
            },
        );
        let contest = state
            .contests
            .get_mut(contest_id)
            .ok_or_else(|| EngineError::Internal("contest vanished mid-join".to_string()))?;
        contest.entry_count += 1;
        *contest
            .user_entries
            .entry(user_id.to_string())
            .or_insert(0) += 1;

        let filled = contest.entry_count >= spec.capacity;
        if filled {
            contest.status = ContestStatus::Closed;
            contest.closed_by_capacity = true;
            info!(contest_id, "contest filled");
        }
        drop(state);

        // A filled cash contest immediately spawns its numbered successor
        // so the lobby always lists an open instance of the family.
        if filled && spec.kind == ContestKind::Cash {
            self.spawn_replacement(&spec).await;
        }

        info!(contest_id, user_id, %entry_id, room_id, seat_index, "entry accepted");
        Ok(JoinReceipt {
            contest_id: contest_id.to_string(),
            room_id,
            seat_index,
            entry_id,
        })
    }

    async fn place_in_room(
        &self,
        state: &mut ManagerState,
        contest_id: &str,
        entry_id: &str,
        user_id: &str,
    ) -> Result<(u64, usize), EngineError> {
        for meta in state.rooms.iter_mut() {
            if meta.contest_id != contest_id
                || meta.launched
                || meta.humans.contains(user_id)
                || meta.humans.len() >= self.cfg.seat_count
            {
                continue;
            }
            let outcome = self
                .registry
                .send(meta.room_id, |reply| RoomEvent::Join {
                    entry_id: entry_id.to_string(),
                    user_id: user_id.to_string(),
                    reply,
                })
                .await
                .and_then(|inner| inner);
            match outcome {
                Ok(seat_index) => {
                    meta.humans.insert(user_id.to_string());
                    return Ok((meta.room_id, seat_index));
                }
                Err(EngineError::ContestNotAcceptingEntries { .. })
                | Err(EngineError::RoomNotFound { .. }) => {
                    debug!(room_id = meta.room_id, "room no longer joinable");
                    meta.launched = true;
                }
                Err(other) => return Err(other),
            }
        }

        // No joinable room; create the next one.
        let room_id = state.next_room_id;
        state.next_room_id += 1;
        let tx = spawn_room(
            room_id,
            contest_id,
            Arc::clone(&self.cfg),
            self.board_template.clone(),
            RoomDeps {
                store: Arc::clone(&self.store),
                broadcast: Arc::clone(&self.broadcast),
                settlement: Arc::clone(&self.settlement),
            },
        );
        self.spawn_room_reaper(room_id, tx.clone());
        self.registry
            .insert(RoomHandle {
                room_id,
                contest_id: contest_id.to_string(),
                tx,
            })
            .await;
        info!(room_id, contest_id, "room created");

        let seat_index = self
            .registry
            .send(room_id, |reply| RoomEvent::Join {
                entry_id: entry_id.to_string(),
                user_id: user_id.to_string(),
                reply,
            })
            .await??;

        state.rooms.push(RoomMeta {
            room_id,
            contest_id: contest_id.to_string(),
            humans: HashSet::from([user_id.to_string()]),
            launched: false,
        });
        Ok((room_id, seat_index))
    }

    /// Watch for the room task to exit (teardown, post-completion grace, or
    /// an abandoned lobby) and clear its bookkeeping everywhere: the
    /// registry handle, the broadcast membership list, the room meta, and
    /// the per-user concurrent-entry counts. The queue sender only reports
    /// closed once the room task has dropped its receiver.
    fn spawn_room_reaper(&self, room_id: u64, tx: mpsc::Sender<RoomEvent>) {
        let state = Arc::clone(&self.state);
        let registry = Arc::clone(&self.registry);
        let broadcast = Arc::clone(&self.broadcast);
        tokio::spawn(async move {
            tx.closed().await;
            registry.remove(room_id).await;
            broadcast.drop_room(room_id);

            let mut state = state.lock().await;
            state.rooms.retain(|r| r.room_id != room_id);
            let finished: Vec<String> = state
                .entries
                .iter()
                .filter(|(_, m)| m.room_id == room_id)
                .map(|(id, _)| id.clone())
                .collect();
            for entry_id in finished {
                let Some(meta) = state.entries.remove(&entry_id) else {
                    continue;
                };
                if let Some(contest) = state.contests.get_mut(&meta.contest_id) {
                    if let Some(count) = contest.user_entries.get_mut(&meta.user_id) {
                        *count = count.saturating_sub(1);
                        if *count == 0 {
                            contest.user_entries.remove(&meta.user_id);
                        }
                    }
                }
            }
            debug!(room_id, "room bookkeeping reaped");
        });
    }

    async fn spawn_replacement(&self, spec: &ContestSpec) {
        let mut state = self.state.lock().await;
        let seq = state.family_seq.entry(spec.family.clone()).or_insert(1);
        *seq += 1;
        let contest_id = format!("{}-{}", spec.family, seq);
        info!(%contest_id, "spawned replacement cash contest");
        state.contests.insert(
            contest_id,
            ContestState {
                spec: spec.clone(),
                status: ContestStatus::Open,
                entry_count: 0,
                user_entries: HashMap::new(),
                closed_by_capacity: false,
            },
        );
    }

    /// Withdraw a waiting entry: release the seat, refund the fee, and
    /// reopen the contest if it had closed on capacity.
    pub async fn withdraw(&self, entry_id: &str, user_id: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        let meta = state
            .entries
            .get(entry_id)
            .ok_or_else(|| EngineError::NotParticipant {
                id: entry_id.to_string(),
            })?;
        if meta.user_id != user_id {
            return Err(EngineError::NotParticipant {
                id: entry_id.to_string(),
            });
        }
        let contest_id = meta.contest_id.clone();
        let room_id = meta.room_id;
        drop(state);

        let lock_key = format!("entry:{contest_id}:{user_id}");
        let _lease = self
            .locks
            .lease(&lock_key, ENTRY_LOCK_TTL)
            .ok_or_else(|| EngineError::LockContended {
                key: lock_key.clone(),
            })?;

        // The room decides whether withdrawal is still allowed.
        self.registry
            .send(room_id, |reply| RoomEvent::Withdraw {
                entry_id: entry_id.to_string(),
                reply,
            })
            .await??;

        state = self.state.lock().await;
        state.entries.remove(entry_id);
        if let Some(meta) = state.rooms.iter_mut().find(|r| r.room_id == room_id) {
            meta.humans.remove(user_id);
        }
        let mut entry_fee = 0;
        if let Some(contest) = state.contests.get_mut(&contest_id) {
            entry_fee = contest.spec.entry_fee;
            contest.entry_count = contest.entry_count.saturating_sub(1);
            if let Some(count) = contest.user_entries.get_mut(user_id) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    contest.user_entries.remove(user_id);
                }
            }
            if contest.closed_by_capacity {
                contest.status = ContestStatus::Open;
                contest.closed_by_capacity = false;
                info!(%contest_id, "contest reopened after withdrawal");
            }
        }
        drop(state);

        if let Err(e) = self.ledger.credit(user_id, entry_fee, "entry refund") {
            warn!(entry_id, "refund failed: {e}");
        }
        if let Err(e) = self.store.withdraw_entry(entry_id) {
            warn!(entry_id, "failed to persist withdrawal: {e:#}");
        }
        info!(entry_id, user_id, room_id, "entry withdrawn");
        Ok(())
    }

    /// Operational abort: tear a room down and refund every live entry in
    /// it, regardless of phase.
    pub async fn teardown_room(&self, room_id: u64) -> Result<(), EngineError> {
        let handle = self
            .registry
            .get(room_id)
            .await
            .ok_or(EngineError::RoomNotFound { room_id })?;
        let _ = handle.tx.send(RoomEvent::Teardown).await;
        self.registry.remove(room_id).await;

        let mut state = self.state.lock().await;
        let affected: Vec<(String, String, String)> = state
            .entries
            .iter()
            .filter(|(_, m)| m.room_id == room_id)
            .map(|(id, m)| (id.clone(), m.user_id.clone(), m.contest_id.clone()))
            .collect();
        state.rooms.retain(|r| r.room_id != room_id);

        for (entry_id, user_id, contest_id) in &affected {
            state.entries.remove(entry_id);
            if let Some(contest) = state.contests.get_mut(contest_id) {
                contest.entry_count = contest.entry_count.saturating_sub(1);
                if let Some(count) = contest.user_entries.get_mut(user_id) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        contest.user_entries.remove(user_id);
                    }
                }
            }
        }
        let fees: Vec<(String, String, u32)> = affected
            .iter()
            .map(|(entry_id, user_id, contest_id)| {
                let fee = state
                    .contests
                    .get(contest_id)
                    .map(|c| c.spec.entry_fee)
                    .unwrap_or(0);
                (entry_id.clone(), user_id.clone(), fee)
            })
            .collect();
        drop(state);

        for (entry_id, user_id, fee) in fees {
            if let Err(e) = self.ledger.credit(&user_id, fee, "room teardown refund") {
                warn!(%entry_id, "teardown refund failed: {e}");
            }
            if let Err(e) = self.store.withdraw_entry(&entry_id) {
                warn!(%entry_id, "failed to persist teardown withdrawal: {e:#}");
            }
        }
        info!(room_id, "room torn down");
        Ok(())
    }

    /// Lobby listing of every known contest.
    pub async fn contests(&self) -> Vec<ContestSummary> {
        let state = self.state.lock().await;
        let mut out: Vec<ContestSummary> = state
            .contests
            .iter()
            .map(|(id, c)| ContestSummary {
                contest_id: id.clone(),
                kind: c.spec.kind,
                entry_fee: c.spec.entry_fee,
                capacity: c.spec.capacity,
                entry_count: c.entry_count,
                open: c.status == ContestStatus::Open,
            })
            .collect();
        out.sort_by(|a, b| a.contest_id.cmp(&b.contest_id));
        out
    }

    /// Room id for a live entry, for resume routing.
    pub async fn room_of(&self, entry_id: &str) -> Option<u64> {
        let state = self.state.lock().await;
        state.entries.get(entry_id).map(|m| m.room_id)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
