use std::str::FromStr;
use std::time::Duration;

use crate::EngineError;
use models::*;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Models for the database.
///
/// These models are specific to the current database design and schema.
/// Most if not all are directly mapped to a table in the database.
pub mod models;

/// The SQLite database used for the tournament registration engine.
///
/// Note that changing the backing store only requires re-implementing the
/// database traits below (e.g. for Postgres); the service layer is written
/// against the traits, not against SQLite.
///
/// Every capacity and balance rule is enforced by a single guarded SQL
/// statement, so correctness does not depend on the pool being a single
/// connection. The pool is pinned to one persistent connection anyway because
/// an in-memory SQLite database lives and dies with its connection.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pub pool: SqlitePool,
}

impl SqliteDatabase {
    /// Connects to the database named by the `DATABASE_URL` environment
    /// variable, creating the file if it does not exist yet.
    pub async fn connect() -> Result<Self, EngineError> {
        #[cfg(debug_assertions)]
        dotenv::dotenv().ok();

        let db_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                return Err(EngineError::msg("DATABASE_URL environment variable not found"));
            }
        };
        let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);
        let pool = Self::pool_options().connect_with(options).await?;
        info!("Successfully connected to the database.");

        Ok(SqliteDatabase { pool })
    }

    /// Connects to a fresh in-memory database and runs the migrations.
    /// This is what the test suite and the smoke binary run against.
    pub async fn connect_in_memory() -> Result<Self, EngineError> {
        let pool = Self::pool_options().connect("sqlite::memory:").await?;
        let db = SqliteDatabase { pool };
        db.migrate().await?;
        Ok(db)
    }

    fn pool_options() -> SqlitePoolOptions {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(None)
            .max_lifetime(None)
    }

    pub async fn migrate(&self) -> Result<(), EngineError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn now_timestamp() -> i64 {
    chrono::offset::Utc::now().timestamp()
}

/// The append-only wallet ledger. `append` and `append_if_covered` are the
/// only mutation paths for a balance; no entry is ever updated or deleted.
pub trait LedgerDatabase {
    type Error;

    /// Appends a credit entry. A pre-existing idempotency key is not an
    /// error: the previously committed entry is returned so retries are safe.
    async fn append(
        &self,
        user_id: &str,
        kind: LedgerEntryKind,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<LedgerEntry, Self::Error>;

    /// Appends a signed entry only if the user's resulting balance stays
    /// non-negative, evaluated atomically with the write. Returns `None` when
    /// the balance does not cover the amount and no entry with this key
    /// exists; returns the prior entry on an idempotency-key replay.
    async fn append_if_covered(
        &self,
        user_id: &str,
        kind: LedgerEntryKind,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<Option<LedgerEntry>, Self::Error>;

    /// The user's spendable balance, summed from the ledger at read time.
    async fn balance_of(&self, user_id: &str) -> Result<i64, Self::Error>;

    /// A page of the user's entries, newest first. Pass the last entry id of
    /// the previous page as `before_id` to continue where iteration left off.
    async fn history(
        &self,
        user_id: &str,
        limit: i64,
        before_id: Option<i64>,
    ) -> Result<Vec<LedgerEntry>, Self::Error>;

    /// Retrieves the entry committed under an idempotency key, if any.
    async fn entry_by_key(&self, idempotency_key: &str)
        -> Result<Option<LedgerEntry>, Self::Error>;
}

impl LedgerDatabase for SqliteDatabase {
    type Error = EngineError;

    async fn append(
        &self,
        user_id: &str,
        kind: LedgerEntryKind,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<LedgerEntry, Self::Error> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (user_id, kind, amount, idempotency_key, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(amount)
        .bind(idempotency_key)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        self.entry_by_key(idempotency_key)
            .await?
            .ok_or_else(|| EngineError::msg("Ledger entry missing right after append"))
    }

    async fn append_if_covered(
        &self,
        user_id: &str,
        kind: LedgerEntryKind,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<Option<LedgerEntry>, Self::Error> {
        // Single conditional insert: the balance check and the write are one
        // atomic statement, so two concurrent debits cannot both observe a
        // stale "sufficient" balance.
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_entries (user_id, kind, amount, idempotency_key, created_at)
            SELECT ?, ?, ?, ?, ?
            WHERE (SELECT COALESCE(SUM(amount), 0) FROM ledger_entries WHERE user_id = ?) + ? >= 0
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(amount)
        .bind(idempotency_key)
        .bind(now_timestamp())
        .bind(user_id)
        .bind(amount)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(self.entry_by_key(idempotency_key).await?);
        }

        // Nothing was written: either the key already exists (replay, return
        // the prior entry) or the balance did not cover the amount.
        self.entry_by_key(idempotency_key).await
    }

    async fn balance_of(&self, user_id: &str) -> Result<i64, Self::Error> {
        let balance = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(amount), 0) FROM ledger_entries WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(balance)
    }

    async fn history(
        &self,
        user_id: &str,
        limit: i64,
        before_id: Option<i64>,
    ) -> Result<Vec<LedgerEntry>, Self::Error> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT entry_id, user_id, kind, amount, idempotency_key, created_at
            FROM ledger_entries
            WHERE user_id = ? AND (? IS NULL OR entry_id < ?)
            ORDER BY entry_id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(before_id)
        .bind(before_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn entry_by_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<LedgerEntry>, Self::Error> {
        let entry = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT entry_id, user_id, kind, amount, idempotency_key, created_at
            FROM ledger_entries
            WHERE idempotency_key = ?
            LIMIT 1
            "#,
        )
        .bind(idempotency_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }
}

pub trait UserDatabase {
    type Error;

    /// Adds a user to the database. Re-registering an existing id refreshes
    /// the display name and reactivates the account. Returns `false` when
    /// the referral code collided with another user's, so the caller can
    /// retry with a fresh code.
    async fn create_user(&self, user: &User) -> Result<bool, Self::Error>;

    /// Retrieves an active user with a given id.
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, Self::Error>;

    /// Deactivates a user. Accounts are never deleted because their ledger
    /// entries must remain auditable.
    async fn deactivate_user(&self, user_id: &str) -> Result<(), Self::Error>;
}

impl UserDatabase for SqliteDatabase {
    type Error = EngineError;

    async fn create_user(&self, user: &User) -> Result<bool, Self::Error> {
        // A referral-code collision falls through to the catch-all clause
        // and writes nothing, so uniqueness is decided inside the insert
        // rather than by a separate lookup.
        let result = sqlx::query(
            r#"
            INSERT INTO users (user_id, display_name, referral_code, bonus_coins, created_at, deactivated)
            VALUES (?, ?, ?, ?, ?, 0)
            ON CONFLICT (user_id)
            DO UPDATE SET
                display_name = EXCLUDED.display_name,
                deactivated = 0
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.display_name)
        .bind(&user.referral_code)
        .bind(user.bonus_coins)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, Self::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, display_name, referral_code, bonus_coins, created_at, deactivated
            FROM users
            WHERE user_id = ? AND deactivated = 0
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn deactivate_user(&self, user_id: &str) -> Result<(), Self::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET deactivated = 1
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

}

pub trait TeamDatabase {
    type Error;

    /// Inserts a team and its captain's membership in one transaction.
    /// Returns `None` when the insert hit a uniqueness conflict (name or
    /// join code); the caller works out which and retries or reports.
    async fn create_team(
        &self,
        name: &str,
        captain_id: &str,
        country: &str,
        join_code: &str,
    ) -> Result<Option<Team>, Self::Error>;

    async fn get_team(&self, team_id: i64) -> Result<Option<Team>, Self::Error>;

    /// Looks up a live (non-archived) team by its join code.
    async fn get_team_by_code(&self, join_code: &str) -> Result<Option<Team>, Self::Error>;

    async fn get_team_by_name(&self, name: &str) -> Result<Option<Team>, Self::Error>;

    /// Adds a member to a team's roster, guarded by the team's capacity.
    /// Returns `None` when nothing was inserted; the caller disambiguates
    /// between an unknown team, a full roster and an existing membership.
    async fn insert_member(
        &self,
        team_id: i64,
        user_id: &str,
        role: TeamRole,
    ) -> Result<Option<TeamMembership>, Self::Error>;

    async fn get_membership(
        &self,
        team_id: i64,
        user_id: &str,
    ) -> Result<Option<TeamMembership>, Self::Error>;

    /// All memberships of a team, captain first.
    async fn get_members(&self, team_id: i64) -> Result<Vec<TeamMembership>, Self::Error>;

    /// The roster size, counted from membership rows.
    async fn member_count(&self, team_id: i64) -> Result<i64, Self::Error>;

    async fn delete_membership(&self, team_id: i64, user_id: &str) -> Result<(), Self::Error>;

    /// Archives a team whose last member has left.
    async fn archive_team(&self, team_id: i64) -> Result<(), Self::Error>;
}

impl TeamDatabase for SqliteDatabase {
    type Error = EngineError;

    async fn create_team(
        &self,
        name: &str,
        captain_id: &str,
        country: &str,
        join_code: &str,
    ) -> Result<Option<Team>, Self::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO teams (name, captain_id, country, join_code, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(name)
        .bind(captain_id)
        .bind(country)
        .bind(join_code)
        .bind(now_timestamp())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }
        let team_id = result.last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO team_members (team_id, user_id, role, joined_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(team_id)
        .bind(captain_id)
        .bind(TeamRole::Captain)
        .bind(now_timestamp())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_team(team_id).await
    }

    async fn get_team(&self, team_id: i64) -> Result<Option<Team>, Self::Error> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            SELECT team_id, name, captain_id, country, join_code, max_members,
                   wins, matches_played, rank, created_at, archived
            FROM teams
            WHERE team_id = ?
            LIMIT 1
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    async fn get_team_by_code(&self, join_code: &str) -> Result<Option<Team>, Self::Error> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            SELECT team_id, name, captain_id, country, join_code, max_members,
                   wins, matches_played, rank, created_at, archived
            FROM teams
            WHERE join_code = ? AND archived = 0
            LIMIT 1
            "#,
        )
        .bind(join_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    async fn get_team_by_name(&self, name: &str) -> Result<Option<Team>, Self::Error> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            SELECT team_id, name, captain_id, country, join_code, max_members,
                   wins, matches_played, rank, created_at, archived
            FROM teams
            WHERE name = ?
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    async fn insert_member(
        &self,
        team_id: i64,
        user_id: &str,
        role: TeamRole,
    ) -> Result<Option<TeamMembership>, Self::Error> {
        // Capacity check and insert in one statement so concurrent joins
        // cannot push the roster past max_members.
        let result = sqlx::query(
            r#"
            INSERT INTO team_members (team_id, user_id, role, joined_at)
            SELECT t.team_id, ?, ?, ?
            FROM teams AS t
            WHERE t.team_id = ? AND t.archived = 0
              AND (SELECT COUNT(*) FROM team_members AS m WHERE m.team_id = t.team_id) < t.max_members
            ON CONFLICT (team_id, user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role)
        .bind(now_timestamp())
        .bind(team_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_membership(team_id, user_id).await
    }

    async fn get_membership(
        &self,
        team_id: i64,
        user_id: &str,
    ) -> Result<Option<TeamMembership>, Self::Error> {
        let membership = sqlx::query_as::<_, TeamMembership>(
            r#"
            SELECT team_id, user_id, role, joined_at
            FROM team_members
            WHERE team_id = ? AND user_id = ?
            LIMIT 1
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    async fn get_members(&self, team_id: i64) -> Result<Vec<TeamMembership>, Self::Error> {
        let members = sqlx::query_as::<_, TeamMembership>(
            r#"
            SELECT team_id, user_id, role, joined_at
            FROM team_members
            WHERE team_id = ?
            ORDER BY role ASC, joined_at ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn member_count(&self, team_id: i64) -> Result<i64, Self::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM team_members WHERE team_id = ?
            "#,
        )
        .bind(team_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn delete_membership(&self, team_id: i64, user_id: &str) -> Result<(), Self::Error> {
        sqlx::query(
            r#"
            DELETE FROM team_members WHERE team_id = ? AND user_id = ?
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn archive_team(&self, team_id: i64) -> Result<(), Self::Error> {
        sqlx::query(
            r#"
            UPDATE teams SET archived = 1 WHERE team_id = ?
            "#,
        )
        .bind(team_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

pub trait TournamentDatabase {
    type Error;

    /// Creates a tournament in the database, returning it with its id.
    async fn create_tournament(
        &self,
        name: &str,
        mode: TournamentMode,
        max_participants: i64,
        entry_fee: i64,
        prize_pool: i64,
        start_time: Option<i64>,
    ) -> Result<Tournament, Self::Error>;

    async fn get_tournament(&self, tournament_id: i64)
        -> Result<Option<Tournament>, Self::Error>;

    /// Moves a tournament from `from` to `to`. Affects no row when the
    /// tournament is not currently in `from`, which the caller reports as an
    /// invalid transition.
    async fn set_tournament_status(
        &self,
        tournament_id: i64,
        from: TournamentStatus,
        to: TournamentStatus,
    ) -> Result<bool, Self::Error>;

    /// Holds a capacity slot for an entrant: a single guarded insert that
    /// checks the tournament is upcoming and has room, and bumps the occupied
    /// slot count, atomically. Returns the held registration row id, or
    /// `None` when nothing was inserted (the caller disambiguates).
    async fn reserve_slot(
        &self,
        tournament_id: i64,
        entrant_id: &str,
        entrant_kind: EntrantKind,
    ) -> Result<Option<i64>, Self::Error>;

    /// Finalizes a held slot, linking it to the ledger entry that paid for it.
    async fn confirm_slot(
        &self,
        registration_id: i64,
        ledger_entry_id: Option<i64>,
    ) -> Result<Option<Registration>, Self::Error>;

    /// Releases a held slot as part of rollback. Confirmed registrations are
    /// never released this way.
    async fn release_slot(&self, registration_id: i64) -> Result<(), Self::Error>;

    async fn get_registration(
        &self,
        tournament_id: i64,
        entrant_id: &str,
    ) -> Result<Option<Registration>, Self::Error>;

    /// The number of confirmed registrations, counted from registration rows.
    async fn participant_count(&self, tournament_id: i64) -> Result<i64, Self::Error>;

    /// Confirmed registrations plus held reservations. This is the number the
    /// capacity guard compares against `max_participants`.
    async fn occupied_slots(&self, tournament_id: i64) -> Result<i64, Self::Error>;
}

impl TournamentDatabase for SqliteDatabase {
    type Error = EngineError;

    async fn create_tournament(
        &self,
        name: &str,
        mode: TournamentMode,
        max_participants: i64,
        entry_fee: i64,
        prize_pool: i64,
        start_time: Option<i64>,
    ) -> Result<Tournament, Self::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO tournaments (name, status, mode, max_participants, entry_fee, prize_pool, start_time, created_at)
            VALUES (?, 'upcoming', ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(mode)
        .bind(max_participants)
        .bind(entry_fee)
        .bind(prize_pool)
        .bind(start_time)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        self.get_tournament(result.last_insert_rowid())
            .await?
            .ok_or_else(|| EngineError::msg("Tournament missing right after insert"))
    }

    async fn get_tournament(
        &self,
        tournament_id: i64,
    ) -> Result<Option<Tournament>, Self::Error> {
        let tournament = sqlx::query_as::<_, Tournament>(
            r#"
            SELECT tournament_id, name, status, mode, max_participants,
                   entry_fee, prize_pool, start_time, created_at
            FROM tournaments
            WHERE tournament_id = ?
            LIMIT 1
            "#,
        )
        .bind(tournament_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tournament)
    }

    async fn set_tournament_status(
        &self,
        tournament_id: i64,
        from: TournamentStatus,
        to: TournamentStatus,
    ) -> Result<bool, Self::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tournaments
            SET status = ?
            WHERE tournament_id = ? AND status = ?
            "#,
        )
        .bind(to)
        .bind(tournament_id)
        .bind(from)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn reserve_slot(
        &self,
        tournament_id: i64,
        entrant_id: &str,
        entrant_kind: EntrantKind,
    ) -> Result<Option<i64>, Self::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO registrations (tournament_id, entrant_id, entrant_kind, state, registered_at)
            SELECT t.tournament_id, ?, ?, 'reserved', ?
            FROM tournaments AS t
            WHERE t.tournament_id = ? AND t.status = 'upcoming'
              AND (SELECT COUNT(*) FROM registrations AS r WHERE r.tournament_id = t.tournament_id) < t.max_participants
            ON CONFLICT (tournament_id, entrant_id) DO NOTHING
            "#,
        )
        .bind(entrant_id)
        .bind(entrant_kind)
        .bind(now_timestamp())
        .bind(tournament_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(result.last_insert_rowid()))
    }

    async fn confirm_slot(
        &self,
        registration_id: i64,
        ledger_entry_id: Option<i64>,
    ) -> Result<Option<Registration>, Self::Error> {
        let result = sqlx::query(
            r#"
            UPDATE registrations
            SET state = 'confirmed', ledger_entry_id = ?
            WHERE registration_id = ? AND state = 'reserved'
            "#,
        )
        .bind(ledger_entry_id)
        .bind(registration_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let registration = sqlx::query_as::<_, Registration>(
            r#"
            SELECT registration_id, tournament_id, entrant_id, entrant_kind,
                   state, ledger_entry_id, registered_at
            FROM registrations
            WHERE registration_id = ?
            LIMIT 1
            "#,
        )
        .bind(registration_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    async fn release_slot(&self, registration_id: i64) -> Result<(), Self::Error> {
        sqlx::query(
            r#"
            DELETE FROM registrations WHERE registration_id = ? AND state = 'reserved'
            "#,
        )
        .bind(registration_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_registration(
        &self,
        tournament_id: i64,
        entrant_id: &str,
    ) -> Result<Option<Registration>, Self::Error> {
        let registration = sqlx::query_as::<_, Registration>(
            r#"
            SELECT registration_id, tournament_id, entrant_id, entrant_kind,
                   state, ledger_entry_id, registered_at
            FROM registrations
            WHERE tournament_id = ? AND entrant_id = ?
            LIMIT 1
            "#,
        )
        .bind(tournament_id)
        .bind(entrant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    async fn participant_count(&self, tournament_id: i64) -> Result<i64, Self::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM registrations
            WHERE tournament_id = ? AND state = 'confirmed'
            "#,
        )
        .bind(tournament_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn occupied_slots(&self, tournament_id: i64) -> Result<i64, Self::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM registrations WHERE tournament_id = ?
            "#,
        )
        .bind(tournament_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
