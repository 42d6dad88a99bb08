use crate::database::models::{
    EntrantKind, Registration, Tournament, TournamentMode, TournamentStatus,
};
use crate::database::{SqliteDatabase, TournamentDatabase};
use crate::error::CommonError;
use crate::EngineError;
use tracing::info;

/// Everything needed to open a new tournament.
#[derive(Debug, Clone)]
pub struct TournamentSpec {
    pub name: String,
    pub mode: TournamentMode,
    pub max_participants: i64,
    pub entry_fee: i64,
    pub prize_pool: i64,
    pub start_time: Option<i64>,
}

/// The result of asking for a capacity slot.
#[derive(Debug)]
pub enum SlotReservation {
    /// A fresh slot is now held under this registration row id.
    Held(i64),
    /// This entrant already holds a registration for the tournament, either
    /// confirmed (an idempotent replay) or reserved (an interrupted attempt
    /// to resume).
    Existing(Registration),
}

/// Owns the tournament lifecycle and its capacity accounting.
///
/// `current_participants` is never a stored counter: the capacity guard and
/// the visible participant count are both derived from registration rows.
#[derive(Debug, Clone)]
pub struct TournamentRegistry {
    db: SqliteDatabase,
}

impl TournamentRegistry {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }

    /// Opens a tournament in `upcoming` status.
    pub async fn open(&self, spec: &TournamentSpec) -> Result<Tournament, EngineError> {
        if spec.max_participants <= 0 {
            return Err(CommonError::InvalidAmount(spec.max_participants).into());
        }
        if spec.entry_fee < 0 {
            return Err(CommonError::InvalidAmount(spec.entry_fee).into());
        }
        if spec.prize_pool < 0 {
            return Err(CommonError::InvalidAmount(spec.prize_pool).into());
        }

        let tournament = self
            .db
            .create_tournament(
                &spec.name,
                spec.mode,
                spec.max_participants,
                spec.entry_fee,
                spec.prize_pool,
                spec.start_time,
            )
            .await?;
        info!(
            "Opened {} tournament {} ({}) for {} entrants",
            tournament.mode, tournament.name, tournament.tournament_id, tournament.max_participants
        );
        Ok(tournament)
    }

    /// Retrieves a tournament, or fails with `TournamentNotFound`.
    pub async fn get(&self, tournament_id: i64) -> Result<Tournament, EngineError> {
        self.db
            .get_tournament(tournament_id)
            .await?
            .ok_or_else(|| CommonError::TournamentNotFound(tournament_id).into())
    }

    /// Moves a tournament along the one-way progression
    /// `upcoming -> live -> ended`. Anything else is an `InvalidTransition`.
    pub async fn transition(
        &self,
        tournament_id: i64,
        to: TournamentStatus,
    ) -> Result<Tournament, EngineError> {
        let current = self.get(tournament_id).await?;
        let from = match to.predecessor() {
            Some(from) if current.status == from => from,
            _ => {
                return Err(CommonError::InvalidTransition {
                    from: current.status.to_string(),
                    to: to.to_string(),
                }
                .into())
            }
        };
        if !self.db.set_tournament_status(tournament_id, from, to).await? {
            // Someone transitioned it between our read and our update.
            return Err(CommonError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            }
            .into());
        }
        info!("Tournament {} is now {}", tournament_id, to);

        self.get(tournament_id).await
    }

    /// Atomically holds a capacity slot for an entrant. The occupied-slot
    /// count goes up as part of reserving, before any payment is attempted,
    /// so concurrent joins can never oversell the tournament; a failed
    /// payment releases the slot again.
    pub async fn reserve_slot(
        &self,
        tournament_id: i64,
        entrant_id: &str,
        entrant_kind: EntrantKind,
    ) -> Result<SlotReservation, EngineError> {
        // The guarded insert can lose a race against a release or a status
        // change between its failure and our diagnosis; re-checking in a
        // short loop keeps the diagnosis truthful.
        for _ in 0..3 {
            if let Some(registration_id) = self
                .db
                .reserve_slot(tournament_id, entrant_id, entrant_kind)
                .await?
            {
                return Ok(SlotReservation::Held(registration_id));
            }

            if let Some(existing) = self.db.get_registration(tournament_id, entrant_id).await? {
                return Ok(SlotReservation::Existing(existing));
            }
            let tournament = self.get(tournament_id).await?;
            if tournament.status != TournamentStatus::Upcoming {
                return Err(CommonError::TournamentNotJoinable(tournament_id).into());
            }
            if self.db.occupied_slots(tournament_id).await? >= tournament.max_participants {
                return Err(CommonError::TournamentFull(tournament_id).into());
            }
        }
        Err(EngineError::msg(
            "Slot reservation kept losing races; caller should retry",
        ))
    }

    /// Finalizes a held slot with the ledger entry that paid for it.
    /// Returns `None` when no reserved row remains under this id, which
    /// happens when a concurrent duplicate join confirmed the slot first;
    /// the caller then falls back to the committed registration.
    pub async fn confirm(
        &self,
        registration_id: i64,
        ledger_entry_id: Option<i64>,
    ) -> Result<Option<Registration>, EngineError> {
        self.db.confirm_slot(registration_id, ledger_entry_id).await
    }

    /// Releases a held slot as part of rolling a join back.
    pub async fn release(&self, registration_id: i64) -> Result<(), EngineError> {
        self.db.release_slot(registration_id).await
    }

    /// The number of confirmed registrations for a tournament.
    pub async fn participant_count(&self, tournament_id: i64) -> Result<i64, EngineError> {
        self.get(tournament_id).await?;
        self.db.participant_count(tournament_id).await
    }

    /// An entrant's registration for a tournament, if any.
    pub async fn registration(
        &self,
        tournament_id: i64,
        entrant_id: &str,
    ) -> Result<Option<Registration>, EngineError> {
        self.db.get_registration(tournament_id, entrant_id).await
    }
}
