use crate::database::models::User;
use crate::database::{SqliteDatabase, UserDatabase};
use crate::error::CommonError;
use crate::utils::generate_code;
use crate::EngineError;
use tracing::{info, warn};

/// How many characters a referral code carries.
const REFERRAL_CODE_LENGTH: usize = 8;

/// How many times to retry referral-code generation before giving up.
const CODE_ISSUE_ATTEMPTS: usize = 5;

/// Registers and looks up user accounts.
///
/// The user id itself comes from the out-of-scope identity provider; this
/// service only attaches the engine-side account record (referral code,
/// bonus coins, active flag) to it.
#[derive(Debug, Clone)]
pub struct AccountService {
    db: SqliteDatabase,
}

impl AccountService {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }

    /// Registers a user, issuing a unique referral code. Registering an id
    /// that already exists refreshes the display name and reactivates the
    /// account; the original referral code is kept.
    pub async fn register(&self, user_id: &str, display_name: &str) -> Result<User, EngineError> {
        for _ in 0..CODE_ISSUE_ATTEMPTS {
            let user = User {
                user_id: user_id.to_string(),
                display_name: display_name.to_string(),
                referral_code: generate_code(REFERRAL_CODE_LENGTH),
                bonus_coins: 0,
                created_at: chrono::offset::Utc::now().timestamp(),
                deactivated: false,
            };
            // Code uniqueness is settled by the insert itself, so two
            // registrations racing on the same code cannot both claim it.
            if self.db.create_user(&user).await? {
                info!("Registered user {}", user_id);
                return self.get(user_id).await;
            }
            warn!("Referral code collision on {}, regenerating", user.referral_code);
        }
        Err(EngineError::msg(
            "Unable to issue a unique referral code after repeated attempts",
        ))
    }

    /// Retrieves an active user, or fails with `UserNotFound`.
    pub async fn get(&self, user_id: &str) -> Result<User, EngineError> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| CommonError::UserNotFound(user_id.to_string()).into())
    }

    /// Deactivates an account. The ledger keeps the user's entries; only the
    /// ability to act is revoked.
    pub async fn deactivate(&self, user_id: &str) -> Result<(), EngineError> {
        self.get(user_id).await?;
        self.db.deactivate_user(user_id).await?;
        info!("Deactivated user {}", user_id);
        Ok(())
    }
}
