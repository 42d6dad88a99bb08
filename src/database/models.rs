use serde::{Deserialize, Serialize};
use strum::Display;

/// A platform user within the database.
///
/// The id comes from the out-of-scope identity provider and is trusted as
/// given. The wallet balance is never stored here; it is always derived from
/// the ledger (see [`super::LedgerDatabase`]).
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: String,
    pub display_name: String,
    pub referral_code: String,
    pub bonus_coins: i64,
    pub created_at: i64,
    pub deactivated: bool,
}

/// The role a user holds on a team roster.
///
/// A tagged variant rather than a boolean so the "last captain" rule is a
/// single match on the membership row.
#[derive(Debug, PartialEq, Eq, Clone, Copy, sqlx::Type, Serialize, Deserialize, Display)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    #[strum(to_string = "Captain")]
    Captain,
    #[strum(to_string = "Member")]
    Member,
}

/// A team within the database.
///
/// `current_members` is not a column; it is counted from `team_members` rows
/// whenever it is needed so it can never drift.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Team {
    pub team_id: i64,
    pub name: String,
    pub captain_id: String,
    pub country: String,
    pub join_code: String,
    pub max_members: i64,
    pub wins: i64,
    pub matches_played: i64,
    pub rank: i64,
    pub created_at: i64,
    pub archived: bool,
}

/// A relational object linking a user to a team they've joined.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct TeamMembership {
    pub team_id: i64,
    pub user_id: String,
    pub role: TeamRole,
    pub joined_at: i64,
}

/// The status of a tournament. Progression is one-way: upcoming tournaments
/// go live, live tournaments end, and nothing else is a legal move.
#[derive(Debug, PartialEq, Eq, Clone, Copy, sqlx::Type, Serialize, Deserialize, Display, Default)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    #[strum(to_string = "Upcoming")]
    #[default]
    Upcoming,
    #[strum(to_string = "Live")]
    Live,
    #[strum(to_string = "Ended")]
    Ended,
}

impl TournamentStatus {
    /// The status a tournament must currently hold for a transition into
    /// `self` to be legal, if any.
    pub fn predecessor(&self) -> Option<TournamentStatus> {
        match self {
            TournamentStatus::Upcoming => None,
            TournamentStatus::Live => Some(TournamentStatus::Upcoming),
            TournamentStatus::Ended => Some(TournamentStatus::Live),
        }
    }
}

/// The play mode of a tournament, which dictates what kind of entrant may
/// join and how large a team roster has to be.
#[derive(Debug, PartialEq, Eq, Clone, Copy, sqlx::Type, Serialize, Deserialize, Display)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TournamentMode {
    #[strum(to_string = "Solo")]
    Solo,
    #[strum(to_string = "Duo")]
    Duo,
    #[strum(to_string = "Squad")]
    Squad,
}

impl TournamentMode {
    /// The smallest roster a team needs to enter a tournament of this mode.
    /// Solo tournaments take individual users, not teams.
    pub fn min_roster_size(&self) -> i64 {
        match self {
            TournamentMode::Solo => 1,
            TournamentMode::Duo => 2,
            TournamentMode::Squad => 4,
        }
    }
}

/// A tournament within the database.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Tournament {
    pub tournament_id: i64,
    pub name: String,
    pub status: TournamentStatus,
    pub mode: TournamentMode,
    pub max_participants: i64,
    pub entry_fee: i64,
    pub prize_pool: i64,
    pub start_time: Option<i64>,
    pub created_at: i64,
}

/// What kind of entity occupies a tournament slot.
#[derive(Debug, PartialEq, Eq, Clone, Copy, sqlx::Type, Serialize, Deserialize, Display)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntrantKind {
    #[strum(to_string = "User")]
    User,
    #[strum(to_string = "Team")]
    Team,
}

/// The lifecycle of a registration row.
///
/// A `reserved` row is a capacity slot held while the entry fee is being
/// collected; it either becomes `confirmed` with its paying ledger entry or
/// is deleted when the join is rolled back.
#[derive(Debug, PartialEq, Eq, Clone, Copy, sqlx::Type, Serialize, Deserialize, Display)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    #[strum(to_string = "Reserved")]
    Reserved,
    #[strum(to_string = "Confirmed")]
    Confirmed,
}

/// A confirmed (or still-held) binding of an entrant to a tournament.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Registration {
    pub registration_id: i64,
    pub tournament_id: i64,
    pub entrant_id: String,
    pub entrant_kind: EntrantKind,
    pub state: RegistrationState,
    pub ledger_entry_id: Option<i64>,
    pub registered_at: i64,
}

/// The business meaning of a ledger entry.
#[derive(Debug, PartialEq, Eq, Clone, Copy, sqlx::Type, Serialize, Deserialize, Display)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    #[strum(to_string = "Deposit")]
    Deposit,
    #[strum(to_string = "Withdrawal")]
    Withdrawal,
    #[strum(to_string = "Tournament entry")]
    TournamentEntry,
    #[strum(to_string = "Tournament win")]
    TournamentWin,
    #[strum(to_string = "Referral bonus")]
    ReferralBonus,
}

/// An immutable, signed balance change. Positive amounts credit the wallet,
/// negative amounts debit it; a user's balance is the sum of their entries.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct LedgerEntry {
    pub entry_id: i64,
    pub user_id: String,
    pub kind: LedgerEntryKind,
    pub amount: i64,
    pub idempotency_key: String,
    pub created_at: i64,
}
