// Per-room draft orchestration.
//
// Each room runs as a single task that owns all mutable room state and
// consumes a serialized event queue. At most one timer is armed at any
// moment; arming a new deadline replaces the old one, so a phase change
// implicitly cancels the previous phase's timer.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::board::PlayerBoard;
use crate::broadcast::Broadcast;
use crate::config::DraftConfig;
use crate::draft::bot;
use crate::draft::pick::{Pick, PickKind};
use crate::draft::seat::{RosteredPlayer, Seat, SlotKind};
use crate::draft::validator::eligible_slots;
use crate::draft::{sequencer, RoomPhase};
use crate::error::EngineError;
use crate::protocol::{RosterSlotView, SeatView, ServerMessage};
use crate::settle::{CompletionNotice, Settlement};
use crate::store::Persistence;

/// How many times a failed pick write is retried before the in-memory
/// state is allowed to win.
const PERSIST_ATTEMPTS: u32 = 3;

// ---------------------------------------------------------------------------
// Events and supporting types
// ---------------------------------------------------------------------------

/// Commands delivered to a room's event queue. All room mutation flows
/// through here; callers that need an answer attach a oneshot reply.
pub enum RoomEvent {
    Join {
        entry_id: String,
        user_id: String,
        reply: oneshot::Sender<Result<usize, EngineError>>,
    },
    Withdraw {
        entry_id: String,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    MakePick {
        entry_id: String,
        cell: usize,
        slot: SlotKind,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    SkipTurn {
        entry_id: String,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Disconnected {
        entry_id: String,
    },
    Reconnected {
        entry_id: String,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    Teardown,
}

/// Point-in-time copy of a room's state, for routing and inspection.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub room_id: u64,
    pub phase: RoomPhase,
    pub turn_index: usize,
    pub seats: Vec<Seat>,
    pub picks: Vec<Pick>,
    pub order: Vec<usize>,
}

/// Collaborators injected into every room.
#[derive(Clone)]
pub struct RoomDeps {
    pub store: Arc<dyn Persistence>,
    pub broadcast: Arc<dyn Broadcast>,
    pub settlement: Arc<dyn Settlement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    /// Waiting lobby has been short-handed too long; fill with bots.
    LobbyFill,
    /// One-second countdown tick before the draft starts.
    CountdownTick,
    /// The human on the clock has run out of time.
    PickClock,
    /// Small pause before a bot seat picks.
    BotDelay,
    /// Completed room has lingered long enough; tear down.
    Grace,
}

#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    kind: TimerKind,
    at: Instant,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Owns one room's state and drives it from lobby to teardown.
pub struct DraftOrchestrator {
    room_id: u64,
    contest_id: String,
    cfg: Arc<DraftConfig>,
    deps: RoomDeps,
    phase: RoomPhase,
    board: PlayerBoard,
    seats: Vec<Seat>,
    order: Vec<usize>,
    turn_index: usize,
    picks: Vec<Pick>,
    timer: Option<ArmedTimer>,
    countdown_remaining: u32,
    started_at: Option<Instant>,
}

/// Spawn a room task and return the sender half of its event queue.
pub fn spawn_room(
    room_id: u64,
    contest_id: &str,
    cfg: Arc<DraftConfig>,
    board: PlayerBoard,
    deps: RoomDeps,
) -> mpsc::Sender<RoomEvent> {
    let (tx, rx) = mpsc::channel(64);
    let orchestrator = DraftOrchestrator::new(room_id, contest_id, cfg, board, deps);
    tokio::spawn(orchestrator.run(rx));
    tx
}

impl DraftOrchestrator {
    pub fn new(
        room_id: u64,
        contest_id: &str,
        cfg: Arc<DraftConfig>,
        board: PlayerBoard,
        deps: RoomDeps,
    ) -> Self {
        DraftOrchestrator {
            room_id,
            contest_id: contest_id.to_string(),
            cfg,
            deps,
            phase: RoomPhase::Waiting,
            board,
            seats: Vec::new(),
            order: Vec::new(),
            turn_index: 0,
            picks: Vec::new(),
            timer: None,
            countdown_remaining: 0,
            started_at: None,
        }
    }

    /// Run the room to completion. Exits after teardown or when every
    /// sender half of the event queue has been dropped.
    pub async fn run(mut self, mut rx: mpsc::Receiver<RoomEvent>) {
        info!(room_id = self.room_id, contest_id = %self.contest_id, "room started");
        self.arm(TimerKind::LobbyFill, self.cfg.fill_wait);

        loop {
            let deadline = self.timer.map(|t| t.at);
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(event) => {
                            if self.handle_event(event).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    if self.handle_timer().await {
                        break;
                    }
                }
            }
        }

        info!(room_id = self.room_id, "room exited");
    }

    fn arm(&mut self, kind: TimerKind, after: std::time::Duration) {
        self.timer = Some(ArmedTimer {
            kind,
            at: Instant::now() + after,
        });
    }

    fn disarm(&mut self) {
        self.timer = None;
    }

    fn seat_of(&self, entry_id: &str) -> Option<usize> {
        self.seats
            .iter()
            .position(|s| s.identity.entry_id() == Some(entry_id))
    }

    fn on_clock(&self) -> Option<usize> {
        if self.phase == RoomPhase::Active {
            self.order.get(self.turn_index).copied()
        } else {
            None
        }
    }

    // -----------------------------------------------------------------------
    // Event handling
    // -----------------------------------------------------------------------

    /// Returns `true` when the room should exit its loop.
    async fn handle_event(&mut self, event: RoomEvent) -> bool {
        match event {
            RoomEvent::Join {
                entry_id,
                user_id,
                reply,
            } => {
                let result = self.handle_join(&entry_id, &user_id).await;
                let _ = reply.send(result);
            }
            RoomEvent::Withdraw { entry_id, reply } => {
                let result = self.handle_withdraw(&entry_id).await;
                let _ = reply.send(result);
            }
            RoomEvent::MakePick {
                entry_id,
                cell,
                slot,
                reply,
            } => {
                let result = self.handle_make_pick(&entry_id, cell, slot).await;
                let _ = reply.send(result);
            }
            RoomEvent::SkipTurn { entry_id, reply } => {
                let result = self.handle_skip_turn(&entry_id).await;
                let _ = reply.send(result);
            }
            RoomEvent::Disconnected { entry_id } => {
                self.handle_disconnected(&entry_id).await;
            }
            RoomEvent::Reconnected { entry_id } => {
                self.handle_reconnected(&entry_id).await;
            }
            RoomEvent::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            RoomEvent::Teardown => {
                self.deps
                    .broadcast
                    .emit(self.room_id, &ServerMessage::RoomTornDown { room_id: self.room_id })
                    .await;
                return true;
            }
        }
        false
    }

    async fn handle_join(&mut self, entry_id: &str, user_id: &str) -> Result<usize, EngineError> {
        if self.phase != RoomPhase::Waiting {
            return Err(EngineError::ContestNotAcceptingEntries {
                contest_id: self.contest_id.clone(),
            });
        }
        if self.seats.len() >= self.cfg.seat_count {
            return Err(EngineError::ContestNotAcceptingEntries {
                contest_id: self.contest_id.clone(),
            });
        }
        let already_seated = self.seats.iter().any(|s| match &s.identity {
            crate::draft::seat::SeatIdentity::Human { user_id: u, .. } => u == user_id,
            _ => false,
        });
        if already_seated {
            return Err(EngineError::Internal(format!(
                "user {user_id} already holds a seat in room {}",
                self.room_id
            )));
        }

        let index = self.seats.len();
        self.seats.push(Seat::human(
            index,
            entry_id,
            user_id,
            self.cfg.budget,
            &self.cfg.roster_slots,
        ));
        debug!(room_id = self.room_id, entry_id, seat = index, "seat assigned");

        self.deps
            .broadcast
            .emit_to(
                entry_id,
                &ServerMessage::SeatAssigned {
                    room_id: self.room_id,
                    seat_index: index,
                },
            )
            .await;

        if self.seats.len() == self.cfg.seat_count && self.all_humans_connected() {
            self.start_countdown().await;
        } else {
            self.broadcast_state().await;
        }

        Ok(index)
    }

    async fn handle_withdraw(&mut self, entry_id: &str) -> Result<(), EngineError> {
        if self.phase != RoomPhase::Waiting {
            return Err(EngineError::WithdrawalNotAllowed);
        }
        let Some(index) = self.seat_of(entry_id) else {
            return Err(EngineError::NotParticipant {
                id: entry_id.to_string(),
            });
        };

        self.seats.remove(index);
        for (i, seat) in self.seats.iter_mut().enumerate() {
            seat.index = i;
        }
        debug!(room_id = self.room_id, entry_id, "seat withdrawn");
        self.broadcast_state().await;
        Ok(())
    }

    async fn handle_make_pick(
        &mut self,
        entry_id: &str,
        cell: usize,
        slot: SlotKind,
    ) -> Result<(), EngineError> {
        let seat_index = self.gate_turn_action(entry_id)?;

        let player_cell = self.board.cell(cell).ok_or_else(|| EngineError::IllegalPick {
            reason: format!("no board cell {cell}"),
        })?;
        let eligible = eligible_slots(
            &self.seats[seat_index],
            player_cell,
            &self.cfg.flex_positions,
        );
        if !eligible.contains(&slot) {
            let reason = if player_cell.is_drafted() {
                "player already drafted".to_string()
            } else if player_cell.price > self.seats[seat_index].budget_remaining {
                format!(
                    "price {} exceeds remaining budget {}",
                    player_cell.price, self.seats[seat_index].budget_remaining
                )
            } else {
                format!("slot {slot} is not open for this player")
            };
            return Err(EngineError::IllegalPick { reason });
        }

        self.apply_pick(seat_index, cell, slot, PickKind::Human).await;
        Ok(())
    }

    async fn handle_skip_turn(&mut self, entry_id: &str) -> Result<(), EngineError> {
        let seat_index = self.gate_turn_action(entry_id)?;
        self.record_skip(seat_index).await;
        Ok(())
    }

    /// Common gating for turn-scoped actions: the room must be active, the
    /// caller must hold a seat, and that seat must be on the clock.
    fn gate_turn_action(&self, entry_id: &str) -> Result<usize, EngineError> {
        if self.phase != RoomPhase::Active {
            return Err(EngineError::IllegalPick {
                reason: "room is not drafting".to_string(),
            });
        }
        let Some(seat_index) = self.seat_of(entry_id) else {
            return Err(EngineError::NotParticipant {
                id: entry_id.to_string(),
            });
        };
        if self.on_clock() != Some(seat_index) {
            return Err(EngineError::NotYourTurn {
                seat: seat_index,
                turn_index: self.turn_index,
            });
        }
        Ok(seat_index)
    }

    async fn handle_disconnected(&mut self, entry_id: &str) {
        let Some(index) = self.seat_of(entry_id) else {
            return;
        };
        self.seats[index].connected = false;
        debug!(room_id = self.room_id, entry_id, "seat disconnected");

        // A disconnect during countdown reverts the room to waiting; the
        // draft must not start while a confirmed participant is away.
        if self.phase == RoomPhase::Countdown {
            self.phase = RoomPhase::Waiting;
            self.deps
                .broadcast
                .emit(
                    self.room_id,
                    &ServerMessage::CountdownCancelled { room_id: self.room_id },
                )
                .await;
            self.arm(TimerKind::LobbyFill, self.cfg.fill_wait);
        }
        self.broadcast_state().await;
    }

    async fn handle_reconnected(&mut self, entry_id: &str) {
        let Some(index) = self.seat_of(entry_id) else {
            return;
        };
        self.seats[index].connected = true;
        debug!(room_id = self.room_id, entry_id, "seat reconnected");

        self.deps
            .broadcast
            .emit_to(
                entry_id,
                &ServerMessage::SeatAssigned {
                    room_id: self.room_id,
                    seat_index: index,
                },
            )
            .await;

        if self.phase == RoomPhase::Waiting
            && self.seats.len() == self.cfg.seat_count
            && self.all_humans_connected()
        {
            self.start_countdown().await;
        } else {
            self.broadcast_state().await;
        }
    }

    fn all_humans_connected(&self) -> bool {
        self.seats.iter().all(|s| s.is_bot() || s.connected)
    }

    // -----------------------------------------------------------------------
    // Timer handling
    // -----------------------------------------------------------------------

    /// Returns `true` when the room should exit its loop.
    async fn handle_timer(&mut self) -> bool {
        let Some(timer) = self.timer.take() else {
            return false;
        };
        match timer.kind {
            TimerKind::LobbyFill => self.handle_lobby_fill().await,
            TimerKind::CountdownTick => {
                self.handle_countdown_tick().await;
                false
            }
            TimerKind::PickClock => {
                self.handle_pick_clock_expired().await;
                false
            }
            TimerKind::BotDelay => {
                self.handle_bot_turn().await;
                false
            }
            TimerKind::Grace => {
                self.deps
                    .broadcast
                    .emit(self.room_id, &ServerMessage::RoomTornDown { room_id: self.room_id })
                    .await;
                true
            }
        }
    }

    /// The lobby never filled with humans in time. Fill the remaining
    /// seats with bots and start, as long as at least one human is present
    /// and connected. An empty lobby is torn down instead.
    async fn handle_lobby_fill(&mut self) -> bool {
        if self.phase != RoomPhase::Waiting {
            return false;
        }
        if self.seats.is_empty() {
            info!(room_id = self.room_id, "empty lobby expired, tearing down");
            self.deps
                .broadcast
                .emit(self.room_id, &ServerMessage::RoomTornDown { room_id: self.room_id })
                .await;
            return true;
        }

        let mut n = 0;
        while self.seats.len() < self.cfg.seat_count {
            let index = self.seats.len();
            let bot_id = format!("bot-{}-{}", self.room_id, n);
            self.seats
                .push(Seat::bot(index, &bot_id, self.cfg.budget, &self.cfg.roster_slots));
            n += 1;
        }
        info!(room_id = self.room_id, bots = n, "lobby filled with bots");

        if self.all_humans_connected() {
            self.start_countdown().await;
        } else {
            // Wait for the disconnected human before counting down.
            self.arm(TimerKind::LobbyFill, self.cfg.fill_wait);
            self.broadcast_state().await;
        }
        false
    }

    async fn start_countdown(&mut self) {
        self.phase = RoomPhase::Countdown;
        self.countdown_remaining = self.cfg.countdown.as_secs() as u32;
        info!(
            room_id = self.room_id,
            secs = self.countdown_remaining,
            "countdown started"
        );
        self.deps
            .broadcast
            .emit(
                self.room_id,
                &ServerMessage::CountdownTick {
                    room_id: self.room_id,
                    remaining_secs: self.countdown_remaining,
                },
            )
            .await;
        self.broadcast_state().await;
        self.arm(TimerKind::CountdownTick, std::time::Duration::from_secs(1));
    }

    async fn handle_countdown_tick(&mut self) {
        if self.phase != RoomPhase::Countdown {
            return;
        }
        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
        if self.countdown_remaining == 0 {
            self.start_active().await;
            return;
        }
        self.deps
            .broadcast
            .emit(
                self.room_id,
                &ServerMessage::CountdownTick {
                    room_id: self.room_id,
                    remaining_secs: self.countdown_remaining,
                },
            )
            .await;
        self.arm(TimerKind::CountdownTick, std::time::Duration::from_secs(1));
    }

    async fn start_active(&mut self) {
        self.phase = RoomPhase::Active;
        self.order = sequencer::generate(self.seats.len(), self.cfg.rounds());
        self.turn_index = 0;
        self.started_at = Some(Instant::now());
        info!(
            room_id = self.room_id,
            turns = self.order.len(),
            "draft started"
        );
        self.deps
            .broadcast
            .emit(
                self.room_id,
                &ServerMessage::DraftStarted {
                    room_id: self.room_id,
                    order: self.order.clone(),
                },
            )
            .await;
        self.schedule_turn();
        self.broadcast_state().await;
    }

    /// A human ran out their pick clock. The bot policy decides for them;
    /// if nothing fits, the turn is skipped.
    async fn handle_pick_clock_expired(&mut self) {
        let Some(seat_index) = self.on_clock() else {
            return;
        };
        debug!(room_id = self.room_id, seat = seat_index, "pick clock expired");
        match bot::select_pick(&self.seats[seat_index], &self.board, &self.cfg.flex_positions) {
            Some(candidate) => {
                self.apply_pick(seat_index, candidate.cell, candidate.slot, PickKind::Auto)
                    .await;
            }
            None => self.record_skip(seat_index).await,
        }
    }

    async fn handle_bot_turn(&mut self) {
        let Some(seat_index) = self.on_clock() else {
            return;
        };
        match bot::select_pick(&self.seats[seat_index], &self.board, &self.cfg.flex_positions) {
            Some(candidate) => {
                self.apply_pick(seat_index, candidate.cell, candidate.slot, PickKind::Bot)
                    .await;
            }
            None => self.record_skip(seat_index).await,
        }
    }

    // -----------------------------------------------------------------------
    // Turn progression
    // -----------------------------------------------------------------------

    fn schedule_turn(&mut self) {
        let Some(seat_index) = self.on_clock() else {
            return;
        };
        if self.seats[seat_index].is_bot() {
            self.arm(TimerKind::BotDelay, self.cfg.bot_delay);
        } else {
            self.arm(TimerKind::PickClock, self.cfg.pick_clock);
        }
    }

    /// Apply a validated pick: mutate the board, the seat, and the log,
    /// persist, broadcast, and advance the turn. Callers have already
    /// checked eligibility; a board conflict here is a logic error and is
    /// downgraded to a skip.
    async fn apply_pick(&mut self, seat_index: usize, cell: usize, slot: SlotKind, kind: PickKind) {
        if let Err(e) = self.board.mark_drafted(cell, seat_index) {
            warn!(room_id = self.room_id, cell, "pick conflicted with board: {e}");
            self.record_skip(seat_index).await;
            return;
        }

        // mark_drafted validated the index.
        let (name, position, price) = {
            let c = &self.board.cells()[cell];
            (c.name.clone(), c.position, c.price)
        };

        let seat = &mut self.seats[seat_index];
        seat.roster.place(
            slot,
            RosteredPlayer {
                name: name.clone(),
                position,
                price,
                cell,
            },
        );
        seat.spend(price);

        let pick = Pick {
            turn: self.turn_index,
            seat: seat_index,
            cell: Some(cell),
            slot: Some(slot),
            player_name: Some(name.clone()),
            price,
            kind,
            at: Utc::now(),
        };
        let entry_id = self.seats[seat_index]
            .identity
            .entry_id()
            .map(str::to_string);
        self.persist_pick(entry_id.as_deref(), &pick);

        info!(
            room_id = self.room_id,
            turn = self.turn_index,
            seat = seat_index,
            player = %name,
            price,
            ?kind,
            "pick applied"
        );

        self.deps
            .broadcast
            .emit(
                self.room_id,
                &ServerMessage::PickApplied {
                    room_id: self.room_id,
                    turn_index: self.turn_index,
                    seat: seat_index,
                    cell,
                    slot,
                    player_name: name,
                    price,
                    kind,
                },
            )
            .await;

        self.picks.push(pick);
        self.advance().await;
    }

    async fn record_skip(&mut self, seat_index: usize) {
        let pick = Pick::skip(self.turn_index, seat_index);
        let entry_id = self.seats[seat_index]
            .identity
            .entry_id()
            .map(str::to_string);
        self.persist_pick(entry_id.as_deref(), &pick);

        debug!(
            room_id = self.room_id,
            turn = self.turn_index,
            seat = seat_index,
            "turn skipped"
        );
        self.deps
            .broadcast
            .emit(
                self.room_id,
                &ServerMessage::TurnSkipped {
                    room_id: self.room_id,
                    turn_index: self.turn_index,
                    seat: seat_index,
                },
            )
            .await;

        self.picks.push(pick);
        self.advance().await;
    }

    /// Write a pick with bounded retries. The in-memory room state is
    /// authoritative; a write that keeps failing is logged and dropped
    /// rather than stalling the draft.
    fn persist_pick(&self, entry_id: Option<&str>, pick: &Pick) {
        for attempt in 1..=PERSIST_ATTEMPTS {
            match self.deps.store.record_pick(self.room_id, entry_id, pick) {
                Ok(()) => return,
                Err(e) => warn!(
                    room_id = self.room_id,
                    turn = pick.turn,
                    attempt,
                    "failed to persist pick: {e:#}"
                ),
            }
        }
    }

    async fn advance(&mut self) {
        self.turn_index += 1;
        if self.turn_index >= self.order.len() {
            self.complete().await;
        } else {
            self.schedule_turn();
            self.broadcast_state().await;
        }
    }

    async fn complete(&mut self) {
        self.phase = RoomPhase::Completed;
        self.disarm();
        let duration_ms = self
            .started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        info!(room_id = self.room_id, duration_ms, "draft completed");

        for seat in &self.seats {
            let Some(entry_id) = seat.identity.entry_id() else {
                continue;
            };
            if let Err(e) =
                self.deps
                    .store
                    .complete_entry(entry_id, &seat.roster, seat.budget_spent)
            {
                warn!(room_id = self.room_id, entry_id, "failed to complete entry: {e:#}");
            }
            let notice = CompletionNotice {
                entry_id: entry_id.to_string(),
                roster: seat.roster.clone(),
                total_spent: seat.budget_spent,
                duration_ms,
            };
            let settlement = Arc::clone(&self.deps.settlement);
            tokio::spawn(async move {
                settlement.draft_completed(notice).await;
            });
        }

        self.deps
            .broadcast
            .emit(
                self.room_id,
                &ServerMessage::DraftCompleted {
                    room_id: self.room_id,
                    total_turns: self.order.len(),
                },
            )
            .await;
        self.broadcast_state().await;
        self.arm(TimerKind::Grace, self.cfg.completed_grace);
    }

    // -----------------------------------------------------------------------
    // State publication
    // -----------------------------------------------------------------------

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id,
            phase: self.phase,
            turn_index: self.turn_index,
            seats: self.seats.clone(),
            picks: self.picks.clone(),
            order: self.order.clone(),
        }
    }

    /// Publish the room-wide frame plus a seat-specific frame per human.
    async fn broadcast_state(&self) {
        let pick_deadline_ms = self.timer.and_then(|t| {
            if t.kind == TimerKind::PickClock {
                Some(t.at.saturating_duration_since(Instant::now()).as_millis() as u64)
            } else {
                None
            }
        });

        let seats = self
            .seats
            .iter()
            .map(|s| SeatView {
                index: s.index,
                is_bot: s.is_bot(),
                connected: s.connected,
                budget_remaining: s.budget_remaining,
                slots_filled: s.roster.filled_count(),
            })
            .collect();

        self.deps
            .broadcast
            .emit(
                self.room_id,
                &ServerMessage::RoomState {
                    room_id: self.room_id,
                    phase: self.phase,
                    turn_index: self.turn_index,
                    on_clock: self.on_clock(),
                    pick_deadline_ms,
                    seats,
                },
            )
            .await;

        for seat in &self.seats {
            let Some(entry_id) = seat.identity.entry_id() else {
                continue;
            };
            let roster = seat
                .roster
                .slots
                .iter()
                .map(|s| RosterSlotView {
                    slot: s.kind,
                    player_name: s.player.as_ref().map(|p| p.name.clone()),
                    price: s.player.as_ref().map(|p| p.price),
                })
                .collect();
            self.deps
                .broadcast
                .emit_to(
                    entry_id,
                    &ServerMessage::SeatState {
                        room_id: self.room_id,
                        turn_index: self.turn_index,
                        seat_index: seat.index,
                        budget_remaining: seat.budget_remaining,
                        roster,
                    },
                )
                .await;
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
