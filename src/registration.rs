use crate::database::models::{
    EntrantKind, LedgerEntryKind, Registration, RegistrationState, Tournament, TournamentMode,
    TournamentStatus,
};
use crate::database::{SqliteDatabase, TeamDatabase, UserDatabase};
use crate::error::CommonError;
use crate::tournament::{SlotReservation, TournamentRegistry};
use crate::wallet::WalletService;
use crate::EngineError;
use tracing::{debug, info, warn};

/// The states a join attempt moves through. A join either runs all the way
/// to `Confirmed`, or exits at `Rejected` with no funds moved, or exits at
/// `Compensated` after its held slot has been released again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinState {
    Validating,
    SlotReserved,
    FeeDebited,
    Confirmed,
    Rejected,
    Compensated,
}

/// Orchestrates a join request as one atomic unit: tournament status and
/// capacity, team eligibility, the entry-fee debit, and the registration
/// record either all commit or all roll back.
#[derive(Debug, Clone)]
pub struct RegistrationEngine {
    db: SqliteDatabase,
    wallet: WalletService,
    tournaments: TournamentRegistry,
}

impl RegistrationEngine {
    pub fn new(db: SqliteDatabase, wallet: WalletService, tournaments: TournamentRegistry) -> Self {
        Self {
            db,
            wallet,
            tournaments,
        }
    }

    /// Joins an entrant into a tournament.
    ///
    /// For a user entrant, `entrant_id` must be the acting user's own id.
    /// For a team entrant, `entrant_id` is the team id and the acting user
    /// must be its captain, whose wallet pays the entry fee.
    ///
    /// Calling again for an entrant that already joined returns the existing
    /// registration without a second debit: the ledger's idempotency key and
    /// the uniqueness of `(tournament, entrant)` guarantee it.
    pub async fn join(
        &self,
        tournament_id: i64,
        entrant_kind: EntrantKind,
        entrant_id: &str,
        acting_user_id: &str,
    ) -> Result<Registration, EngineError> {
        debug!(
            "Join attempt for tournament {} by {} ({:?})",
            tournament_id,
            entrant_id,
            JoinState::Validating
        );

        if let Some(existing) = self.tournaments.registration(tournament_id, entrant_id).await? {
            if existing.state == RegistrationState::Confirmed {
                info!(
                    "Entrant {} already registered for tournament {}, returning prior registration",
                    entrant_id, tournament_id
                );
                return Ok(existing);
            }
        }

        let tournament = self.tournaments.get(tournament_id).await?;
        if tournament.status != TournamentStatus::Upcoming {
            debug!("Join {:?}: tournament {} not joinable", JoinState::Rejected, tournament_id);
            return Err(CommonError::TournamentNotJoinable(tournament_id).into());
        }
        let payer = self
            .validate_entrant(&tournament, entrant_kind, entrant_id, acting_user_id)
            .await?;

        // Hold the capacity slot before touching any money. A reserved row
        // left behind by an interrupted attempt is picked up and resumed;
        // the ledger key makes the debit replay-safe.
        let registration_id = match self
            .tournaments
            .reserve_slot(tournament_id, entrant_id, entrant_kind)
            .await?
        {
            SlotReservation::Held(id) => id,
            SlotReservation::Existing(existing) => match existing.state {
                RegistrationState::Confirmed => return Ok(existing),
                RegistrationState::Reserved => {
                    warn!(
                        "Resuming interrupted join for entrant {} in tournament {}",
                        entrant_id, tournament_id
                    );
                    existing.registration_id
                }
            },
        };
        debug!("Join {:?}: slot {} held", JoinState::SlotReserved, registration_id);

        let ledger_entry_id = if tournament.entry_fee > 0 {
            let idempotency_key = format!("tournament:{}:{}", tournament_id, entrant_id);
            match self
                .wallet
                .debit(
                    &payer,
                    tournament.entry_fee,
                    LedgerEntryKind::TournamentEntry,
                    &idempotency_key,
                )
                .await
            {
                Ok(entry) => {
                    debug!("Join {:?}: entry {} committed", JoinState::FeeDebited, entry.entry_id);
                    Some(entry.entry_id)
                }
                Err(err) => {
                    // The slot must never stay held past a failed debit,
                    // whatever the failure was. If the release itself fails
                    // the caller has to know the slot may still be occupied;
                    // a retried join picks the reserved row back up.
                    if let Err(release_err) = self.tournaments.release(registration_id).await {
                        warn!(
                            "Failed to release slot {} after debit failure: {}",
                            registration_id, release_err
                        );
                        return Err(err.context(format!(
                            "slot release for registration {} is still pending; retrying the join resumes it",
                            registration_id
                        )));
                    }
                    debug!("Join {:?}: slot {} released", JoinState::Compensated, registration_id);
                    return Err(err);
                }
            }
        } else {
            None
        };

        let registration = match self.tournaments.confirm(registration_id, ledger_entry_id).await? {
            Some(registration) => registration,
            None => {
                // A concurrent join for this entrant confirmed the slot
                // first; its committed registration is this call's result
                // too, and the shared ledger key means the fee was only
                // taken once.
                self.tournaments
                    .registration(tournament_id, entrant_id)
                    .await?
                    .filter(|r| r.state == RegistrationState::Confirmed)
                    .ok_or_else(|| {
                        EngineError::msg("Held slot vanished before it could be confirmed")
                    })?
            }
        };
        debug!("Join {:?}: registration {}", JoinState::Confirmed, registration.registration_id);
        info!(
            "Entrant {} confirmed for tournament {} (fee {})",
            entrant_id, tournament_id, tournament.entry_fee
        );
        Ok(registration)
    }

    /// Credits a tournament win to a user's wallet. Only permitted once the
    /// tournament has ended; replaying the award credits exactly once.
    pub async fn award_prize(
        &self,
        tournament_id: i64,
        user_id: &str,
        amount: i64,
    ) -> Result<(), EngineError> {
        let tournament = self.tournaments.get(tournament_id).await?;
        if tournament.status != TournamentStatus::Ended {
            return Err(CommonError::NotPermitted(
                "prizes are only awarded after a tournament has ended".to_string(),
            )
            .into());
        }

        let idempotency_key = format!("win:{}:{}", tournament_id, user_id);
        self.wallet
            .credit(user_id, amount, LedgerEntryKind::TournamentWin, &idempotency_key)
            .await?;
        info!(
            "Awarded {} to {} for tournament {}",
            amount, user_id, tournament_id
        );
        Ok(())
    }

    /// Checks that the entrant fits the tournament's mode and that the
    /// acting user may enter them, returning the id of the wallet that pays.
    async fn validate_entrant(
        &self,
        tournament: &Tournament,
        entrant_kind: EntrantKind,
        entrant_id: &str,
        acting_user_id: &str,
    ) -> Result<String, EngineError> {
        match (tournament.mode, entrant_kind) {
            (TournamentMode::Solo, EntrantKind::User) => {
                if entrant_id != acting_user_id {
                    return Err(CommonError::NotPermitted(
                        "users may only enter a tournament as themselves".to_string(),
                    )
                    .into());
                }
                self.ensure_user(entrant_id).await?;
                Ok(entrant_id.to_string())
            }
            (TournamentMode::Duo | TournamentMode::Squad, EntrantKind::Team) => {
                let team_id: i64 = entrant_id
                    .parse()
                    .map_err(|_| CommonError::TeamNotFound(entrant_id.to_string()))?;
                let team = self
                    .db
                    .get_team(team_id)
                    .await?
                    .filter(|t| !t.archived)
                    .ok_or_else(|| CommonError::TeamNotFound(entrant_id.to_string()))?;
                if team.captain_id != acting_user_id {
                    return Err(CommonError::NotPermitted(
                        "only the captain may enter a team into a tournament".to_string(),
                    )
                    .into());
                }
                let roster_size = self.db.member_count(team_id).await?;
                let needed = tournament.mode.min_roster_size();
                if roster_size < needed {
                    return Err(CommonError::InvalidEntrantKind(format!(
                        "team {} has {} members but {} mode needs at least {}",
                        team_id, roster_size, tournament.mode, needed
                    ))
                    .into());
                }
                self.ensure_user(&team.captain_id).await?;
                Ok(team.captain_id)
            }
            (mode, kind) => Err(CommonError::InvalidEntrantKind(format!(
                "a {} cannot enter a {} tournament",
                kind, mode
            ))
            .into()),
        }
    }

    async fn ensure_user(&self, user_id: &str) -> Result<(), EngineError> {
        self.db
            .get_user(user_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| CommonError::UserNotFound(user_id.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::TournamentSpec;
    use crate::Engine;

    fn spec(mode: TournamentMode, max: i64, fee: i64) -> TournamentSpec {
        TournamentSpec {
            name: "Weekly Cup".to_string(),
            mode,
            max_participants: max,
            entry_fee: fee,
            prize_pool: 1000,
            start_time: None,
        }
    }

    async fn engine() -> Engine {
        Engine::new(SqliteDatabase::connect_in_memory().await.unwrap())
    }

    async fn funded_user(engine: &Engine, id: &str, balance: i64) {
        engine.accounts.register(id, id).await.unwrap();
        if balance > 0 {
            engine
                .wallet
                .fund(id, balance, &format!("seed-{id}"))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn solo_join_debits_fee_and_confirms() {
        let engine = engine().await;
        funded_user(&engine, "alice", 500).await;
        let t = engine
            .tournaments
            .open(&spec(TournamentMode::Solo, 16, 100))
            .await
            .unwrap();

        let registration = engine
            .registration
            .join(t.tournament_id, EntrantKind::User, "alice", "alice")
            .await
            .unwrap();

        assert_eq!(registration.state, RegistrationState::Confirmed);
        assert!(registration.ledger_entry_id.is_some());
        assert_eq!(engine.wallet.current_balance("alice").await.unwrap(), 400);
        assert_eq!(
            engine.tournaments.participant_count(t.tournament_id).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn insufficient_funds_leaves_no_trace() {
        let engine = engine().await;
        funded_user(&engine, "alice", 50).await;
        let t = engine
            .tournaments
            .open(&spec(TournamentMode::Solo, 16, 100))
            .await
            .unwrap();

        let err = engine
            .registration
            .join(t.tournament_id, EntrantKind::User, "alice", "alice")
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommonError>(),
            Some(&CommonError::InsufficientFunds {
                required: 100,
                available: 50
            })
        );

        // Rollback: the balance and the participant count are untouched, and
        // the held slot is gone so the entrant can retry after funding.
        assert_eq!(engine.wallet.current_balance("alice").await.unwrap(), 50);
        assert_eq!(
            engine.tournaments.participant_count(t.tournament_id).await.unwrap(),
            0
        );
        assert!(engine
            .tournaments
            .registration(t.tournament_id, "alice")
            .await
            .unwrap()
            .is_none());

        engine.wallet.fund("alice", 100, "topup").await.unwrap();
        engine
            .registration
            .join(t.tournament_id, EntrantKind::User, "alice", "alice")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn joining_twice_is_a_no_op() {
        let engine = engine().await;
        funded_user(&engine, "alice", 500).await;
        let t = engine
            .tournaments
            .open(&spec(TournamentMode::Solo, 16, 100))
            .await
            .unwrap();

        let first = engine
            .registration
            .join(t.tournament_id, EntrantKind::User, "alice", "alice")
            .await
            .unwrap();
        let second = engine
            .registration
            .join(t.tournament_id, EntrantKind::User, "alice", "alice")
            .await
            .unwrap();

        assert_eq!(first.registration_id, second.registration_id);
        // Exactly one debit happened.
        assert_eq!(engine.wallet.current_balance("alice").await.unwrap(), 400);
        let history = engine.wallet.history("alice", 10, None).await.unwrap();
        assert_eq!(history.len(), 2); // the seed deposit and one entry fee
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_entrant_joining_concurrently_registers_once() {
        let engine = engine().await;
        funded_user(&engine, "alice", 100).await;
        let t = engine
            .tournaments
            .open(&spec(TournamentMode::Solo, 16, 100))
            .await
            .unwrap();

        // Racing duplicate joins may split one reserved row between them;
        // whichever loses the confirmation must still come back with the
        // committed registration, not an error.
        for round in 0..10 {
            let attempts = (0..4).map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine
                        .registration
                        .join(t.tournament_id, EntrantKind::User, "alice", "alice")
                        .await
                })
            });
            let outcomes = futures::future::join_all(attempts).await;

            let mut ids = Vec::new();
            for outcome in outcomes {
                let registration = outcome.unwrap().unwrap_or_else(|err| {
                    panic!("duplicate join failed in round {}: {}", round, err)
                });
                assert_eq!(registration.state, RegistrationState::Confirmed);
                ids.push(registration.registration_id);
            }
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), 1);
        }

        // One slot, one debit.
        assert_eq!(engine.wallet.current_balance("alice").await.unwrap(), 0);
        assert_eq!(
            engine.tournaments.participant_count(t.tournament_id).await.unwrap(),
            1
        );
        let history = engine.wallet.history("alice", 10, None).await.unwrap();
        assert_eq!(history.len(), 2); // the seed deposit and one entry fee
    }

    #[tokio::test]
    async fn retrying_resumes_a_slot_left_reserved() {
        let engine = engine().await;
        funded_user(&engine, "alice", 100).await;
        let t = engine
            .tournaments
            .open(&spec(TournamentMode::Solo, 16, 100))
            .await
            .unwrap();

        // A slot held by an attempt that never reached the debit, as after
        // a crash mid-join.
        let held = engine
            .tournaments
            .reserve_slot(t.tournament_id, "alice", EntrantKind::User)
            .await
            .unwrap();
        let SlotReservation::Held(held_id) = held else {
            panic!("expected a fresh slot");
        };

        let registration = engine
            .registration
            .join(t.tournament_id, EntrantKind::User, "alice", "alice")
            .await
            .unwrap();
        assert_eq!(registration.registration_id, held_id);
        assert_eq!(registration.state, RegistrationState::Confirmed);
        assert_eq!(engine.wallet.current_balance("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mode_and_entrant_kind_must_match() {
        let engine = engine().await;
        funded_user(&engine, "alice", 500).await;
        let solo = engine
            .tournaments
            .open(&spec(TournamentMode::Solo, 16, 0))
            .await
            .unwrap();
        let duo = engine
            .tournaments
            .open(&spec(TournamentMode::Duo, 16, 0))
            .await
            .unwrap();

        let err = engine
            .registration
            .join(solo.tournament_id, EntrantKind::Team, "1", "alice")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommonError>(),
            Some(CommonError::InvalidEntrantKind(_))
        ));

        let err = engine
            .registration
            .join(duo.tournament_id, EntrantKind::User, "alice", "alice")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommonError>(),
            Some(CommonError::InvalidEntrantKind(_))
        ));
    }

    #[tokio::test]
    async fn users_cannot_enter_someone_else() {
        let engine = engine().await;
        funded_user(&engine, "alice", 500).await;
        funded_user(&engine, "bob", 500).await;
        let t = engine
            .tournaments
            .open(&spec(TournamentMode::Solo, 16, 100))
            .await
            .unwrap();

        let err = engine
            .registration
            .join(t.tournament_id, EntrantKind::User, "bob", "alice")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommonError>(),
            Some(CommonError::NotPermitted(_))
        ));
    }

    #[tokio::test]
    async fn team_join_requires_captain_and_roster() {
        let engine = engine().await;
        funded_user(&engine, "cap", 500).await;
        funded_user(&engine, "mate", 0).await;
        let team = engine.teams.create("cap", "Night Owls", "SG").await.unwrap();
        let duo = engine
            .tournaments
            .open(&spec(TournamentMode::Duo, 16, 100))
            .await
            .unwrap();
        let team_ref = team.team_id.to_string();

        // One member is not enough for duo mode.
        let err = engine
            .registration
            .join(duo.tournament_id, EntrantKind::Team, &team_ref, "cap")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommonError>(),
            Some(CommonError::InvalidEntrantKind(_))
        ));

        engine.teams.join_by_code("mate", &team.join_code).await.unwrap();

        // Only the captain may enter the team.
        let err = engine
            .registration
            .join(duo.tournament_id, EntrantKind::Team, &team_ref, "mate")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommonError>(),
            Some(CommonError::NotPermitted(_))
        ));

        let registration = engine
            .registration
            .join(duo.tournament_id, EntrantKind::Team, &team_ref, "cap")
            .await
            .unwrap();
        assert_eq!(registration.entrant_kind, EntrantKind::Team);

        // The captain's wallet paid the fee.
        assert_eq!(engine.wallet.current_balance("cap").await.unwrap(), 400);
    }

    #[tokio::test]
    async fn free_tournaments_skip_the_ledger() {
        let engine = engine().await;
        funded_user(&engine, "alice", 0).await;
        let t = engine
            .tournaments
            .open(&spec(TournamentMode::Solo, 16, 0))
            .await
            .unwrap();

        let registration = engine
            .registration
            .join(t.tournament_id, EntrantKind::User, "alice", "alice")
            .await
            .unwrap();

        assert_eq!(registration.state, RegistrationState::Confirmed);
        assert!(registration.ledger_entry_id.is_none());
        assert_eq!(engine.wallet.current_balance("alice").await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_never_oversell() {
        let engine = engine().await;
        const CAPACITY: i64 = 2;
        const JOINERS: usize = 5;
        for i in 0..JOINERS {
            funded_user(&engine, &format!("user-{i}"), 100).await;
        }
        let t = engine
            .tournaments
            .open(&spec(TournamentMode::Solo, CAPACITY, 100))
            .await
            .unwrap();

        let attempts = (0..JOINERS).map(|i| {
            let engine = engine.clone();
            let id = format!("user-{i}");
            tokio::spawn(async move {
                engine
                    .registration
                    .join(t.tournament_id, EntrantKind::User, &id, &id)
                    .await
            })
        });
        let outcomes = futures::future::join_all(attempts).await;

        let mut confirmed = 0;
        let mut full = 0;
        for outcome in outcomes {
            match outcome.unwrap() {
                Ok(_) => confirmed += 1,
                Err(err) => {
                    assert_eq!(
                        err.downcast_ref::<CommonError>(),
                        Some(&CommonError::TournamentFull(t.tournament_id))
                    );
                    full += 1;
                }
            }
        }
        assert_eq!(confirmed, CAPACITY);
        assert_eq!(full as i64, JOINERS as i64 - CAPACITY);
        assert_eq!(
            engine.tournaments.participant_count(t.tournament_id).await.unwrap(),
            CAPACITY
        );

        // Nobody was charged without getting a slot.
        for i in 0..JOINERS {
            let id = format!("user-{i}");
            let balance = engine.wallet.current_balance(&id).await.unwrap();
            let registered = engine
                .tournaments
                .registration(t.tournament_id, &id)
                .await
                .unwrap()
                .is_some();
            assert_eq!(balance == 0, registered);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn two_joiners_one_slot() {
        let engine = engine().await;
        funded_user(&engine, "alice", 100).await;
        funded_user(&engine, "bob", 100).await;
        let t = engine
            .tournaments
            .open(&spec(TournamentMode::Solo, 1, 100))
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            {
                let engine = engine.clone();
                async move {
                    engine
                        .registration
                        .join(t.tournament_id, EntrantKind::User, "alice", "alice")
                        .await
                }
            },
            {
                let engine = engine.clone();
                async move {
                    engine
                        .registration
                        .join(t.tournament_id, EntrantKind::User, "bob", "bob")
                        .await
                }
            }
        );

        assert_eq!(a.is_ok() as i32 + b.is_ok() as i32, 1);
        assert_eq!(
            engine.tournaments.participant_count(t.tournament_id).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn prizes_only_after_the_end() {
        let engine = engine().await;
        funded_user(&engine, "alice", 100).await;
        let t = engine
            .tournaments
            .open(&spec(TournamentMode::Solo, 16, 100))
            .await
            .unwrap();
        engine
            .registration
            .join(t.tournament_id, EntrantKind::User, "alice", "alice")
            .await
            .unwrap();

        let err = engine
            .registration
            .award_prize(t.tournament_id, "alice", 1000)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommonError>(),
            Some(CommonError::NotPermitted(_))
        ));

        engine
            .tournaments
            .transition(t.tournament_id, TournamentStatus::Live)
            .await
            .unwrap();
        engine
            .tournaments
            .transition(t.tournament_id, TournamentStatus::Ended)
            .await
            .unwrap();

        engine
            .registration
            .award_prize(t.tournament_id, "alice", 1000)
            .await
            .unwrap();
        // Replaying the award credits exactly once.
        engine
            .registration
            .award_prize(t.tournament_id, "alice", 1000)
            .await
            .unwrap();
        assert_eq!(engine.wallet.current_balance("alice").await.unwrap(), 1000);
    }

    #[tokio::test]
    async fn joins_close_when_the_tournament_goes_live() {
        let engine = engine().await;
        funded_user(&engine, "alice", 500).await;
        let t = engine
            .tournaments
            .open(&spec(TournamentMode::Solo, 16, 100))
            .await
            .unwrap();
        engine
            .tournaments
            .transition(t.tournament_id, TournamentStatus::Live)
            .await
            .unwrap();

        let err = engine
            .registration
            .join(t.tournament_id, EntrantKind::User, "alice", "alice")
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommonError>(),
            Some(&CommonError::TournamentNotJoinable(t.tournament_id))
        );
        assert_eq!(engine.wallet.current_balance("alice").await.unwrap(), 500);
    }
}
