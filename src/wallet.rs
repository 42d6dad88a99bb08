use crate::database::models::{LedgerEntry, LedgerEntryKind};
use crate::database::{LedgerDatabase, SqliteDatabase, UserDatabase};
use crate::error::CommonError;
use crate::EngineError;
use tracing::info;

/// Executes funding and debit operations against the ledger.
///
/// There is no stored balance anywhere: every decision that depends on a
/// balance recomputes it from the ledger inside the same atomic scope as the
/// write. Anything cached for display is advisory only.
#[derive(Debug, Clone)]
pub struct WalletService {
    db: SqliteDatabase,
}

impl WalletService {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }

    /// Credits a verified deposit to the user's wallet.
    ///
    /// The funding source is treated as already confirmed by the out-of-scope
    /// payment collaborator; there is no partial-funding state. Calling again
    /// with the same idempotency key returns the original entry.
    pub async fn fund(
        &self,
        user_id: &str,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<LedgerEntry, EngineError> {
        self.credit(user_id, amount, LedgerEntryKind::Deposit, idempotency_key)
            .await
    }

    /// Credits the user's wallet with a non-deposit entry, such as a
    /// tournament win or a referral bonus.
    pub async fn credit(
        &self,
        user_id: &str,
        amount: i64,
        kind: LedgerEntryKind,
        idempotency_key: &str,
    ) -> Result<LedgerEntry, EngineError> {
        if amount <= 0 {
            return Err(CommonError::InvalidAmount(amount).into());
        }
        self.ensure_user(user_id).await?;

        let entry = self.db.append(user_id, kind, amount, idempotency_key).await?;
        info!("Credited {} to {} ({})", amount, user_id, kind);
        Ok(entry)
    }

    /// Debits the user's wallet, failing with `InsufficientFunds` when the
    /// ledger-derived balance does not cover the amount. The balance check
    /// and the entry write happen in one atomic statement, so concurrent
    /// debits cannot both spend the same funds. Retrying with the same
    /// idempotency key returns the original entry without a second charge.
    pub async fn debit(
        &self,
        user_id: &str,
        amount: i64,
        kind: LedgerEntryKind,
        idempotency_key: &str,
    ) -> Result<LedgerEntry, EngineError> {
        if amount <= 0 {
            return Err(CommonError::InvalidAmount(amount).into());
        }
        self.ensure_user(user_id).await?;

        match self
            .db
            .append_if_covered(user_id, kind, -amount, idempotency_key)
            .await?
        {
            Some(entry) => {
                info!("Debited {} from {} ({})", amount, user_id, kind);
                Ok(entry)
            }
            None => {
                // The rejection itself was decided inside the guarded
                // insert; this balance is a separate read afterwards, so
                // under concurrent funding the reported figure can already
                // be stale. It is diagnostic only.
                let available = self.db.balance_of(user_id).await?;
                Err(CommonError::InsufficientFunds {
                    required: amount,
                    available,
                }
                .into())
            }
        }
    }

    /// The user's spendable balance, derived from the ledger at read time.
    pub async fn current_balance(&self, user_id: &str) -> Result<i64, EngineError> {
        self.ensure_user(user_id).await?;
        self.db.balance_of(user_id).await
    }

    /// A page of the user's ledger history, newest first. Feed the last
    /// entry id back in as `before_id` to fetch the next page.
    pub async fn history(
        &self,
        user_id: &str,
        limit: i64,
        before_id: Option<i64>,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        self.ensure_user(user_id).await?;
        self.db.history(user_id, limit, before_id).await
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
    use crate::account::AccountService;

    async fn setup() -> (WalletService, AccountService) {
        let db = SqliteDatabase::connect_in_memory().await.unwrap();
        (
            WalletService::new(db.clone()),
            AccountService::new(db),
        )
    }

    #[tokio::test]
    async fn funding_rejects_non_positive_amounts() {
        let (wallet, accounts) = setup().await;
        accounts.register("alice", "Alice").await.unwrap();

        for amount in [0, -50] {
            let err = wallet.fund("alice", amount, "key").await.unwrap_err();
            assert_eq!(
                err.downcast_ref::<CommonError>(),
                Some(&CommonError::InvalidAmount(amount))
            );
        }
    }

    #[tokio::test]
    async fn funding_twice_with_same_key_credits_once() {
        let (wallet, accounts) = setup().await;
        accounts.register("alice", "Alice").await.unwrap();

        let first = wallet.fund("alice", 500, "abc").await.unwrap();
        let second = wallet.fund("alice", 500, "abc").await.unwrap();

        assert_eq!(first.entry_id, second.entry_id);
        assert_eq!(wallet.current_balance("alice").await.unwrap(), 500);
    }

    #[tokio::test]
    async fn debit_fails_when_balance_does_not_cover() {
        let (wallet, accounts) = setup().await;
        accounts.register("bob", "Bob").await.unwrap();
        wallet.fund("bob", 50, "dep").await.unwrap();

        let err = wallet
            .debit("bob", 100, LedgerEntryKind::Withdrawal, "wd")
            .await
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<CommonError>(),
            Some(&CommonError::InsufficientFunds {
                required: 100,
                available: 50
            })
        );
        assert_eq!(wallet.current_balance("bob").await.unwrap(), 50);
    }

    #[tokio::test]
    async fn balance_is_the_sum_of_all_entries() {
        let (wallet, accounts) = setup().await;
        accounts.register("carol", "Carol").await.unwrap();

        wallet.fund("carol", 300, "d1").await.unwrap();
        wallet.fund("carol", 200, "d2").await.unwrap();
        wallet
            .debit("carol", 150, LedgerEntryKind::Withdrawal, "w1")
            .await
            .unwrap();

        assert_eq!(wallet.current_balance("carol").await.unwrap(), 350);

        let history = wallet.history("carol", 10, None).await.unwrap();
        let summed: i64 = history.iter().map(|e| e.amount).sum();
        assert_eq!(summed, 350);
    }

    #[tokio::test]
    async fn concurrent_debits_cannot_overspend() {
        let (wallet, accounts) = setup().await;
        accounts.register("dave", "Dave").await.unwrap();
        wallet.fund("dave", 100, "dep").await.unwrap();

        let attempts = (0..4).map(|i| {
            let wallet = wallet.clone();
            tokio::spawn(async move {
                wallet
                    .debit("dave", 60, LedgerEntryKind::Withdrawal, &format!("wd-{i}"))
                    .await
            })
        });
        let outcomes = futures::future::join_all(attempts).await;

        let successes = outcomes
            .into_iter()
            .filter(|o| matches!(o, Ok(Ok(_))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(wallet.current_balance("dave").await.unwrap(), 40);
    }

    #[tokio::test]
    async fn unknown_user_cannot_transact() {
        let (wallet, _) = setup().await;
        let err = wallet.fund("ghost", 100, "k").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommonError>(),
            Some(&CommonError::UserNotFound("ghost".to_string()))
        );
    }
}
