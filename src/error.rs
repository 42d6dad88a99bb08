/// Every user-visible failure the engine can produce.
///
/// System faults (pool exhaustion, SQL errors) are deliberately not part of
/// this enum; they travel as opaque errors so callers can retry them with the
/// same idempotency key instead of mistaking them for a state conflict.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum CommonError {
    InvalidAmount(i64),
    InvalidEntrantKind(String),
    InsufficientFunds { required: i64, available: i64 },
    UserNotFound(String),
    TeamNotFound(String),
    TeamFull(i64),
    AlreadyMember(i64),
    DuplicateName(String),
    LastMemberIsCaptain(i64),
    NotPermitted(String),
    TournamentNotFound(i64),
    TournamentNotJoinable(i64),
    TournamentFull(i64),
    InvalidTransition { from: String, to: String },
}

impl std::fmt::Display for CommonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CommonError::*;
        match self {
            InvalidAmount(amount) => write!(f, "Amount {} is not a valid amount.", amount),
            InvalidEntrantKind(detail) => write!(f, "Invalid entrant for this tournament: {}.", detail),
            InsufficientFunds { required, available } => write!(
                f,
                "Insufficient funds: {} required but only {} available.",
                required, available
            ),
            UserNotFound(id) => write!(f, "User {} does not exist.", id),
            TeamNotFound(code) => write!(f, "No team found for {}.", code),
            TeamFull(id) => write!(f, "Team {} is already full.", id),
            AlreadyMember(id) => write!(f, "Already a member of team {}.", id),
            DuplicateName(name) => write!(f, "The name {} is already taken.", name),
            LastMemberIsCaptain(id) => write!(
                f,
                "The captain of team {} cannot leave while other members remain.",
                id
            ),
            NotPermitted(detail) => write!(f, "Not permitted: {}.", detail),
            TournamentNotFound(id) => write!(f, "Tournament {} does not exist.", id),
            TournamentNotJoinable(id) => {
                write!(f, "Tournament {} is no longer accepting entrants.", id)
            }
            TournamentFull(id) => write!(f, "Tournament {} is already full.", id),
            InvalidTransition { from, to } => {
                write!(f, "A tournament cannot move from {} to {}.", from, to)
            }
        }
    }
}

impl std::error::Error for CommonError {}
