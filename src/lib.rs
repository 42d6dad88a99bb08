//! The registration and settlement engine behind the tournament platform:
//! wallet funding and debits against an append-only ledger, team rosters with
//! join codes, capacity-bounded tournaments, and the atomic join flow that
//! ties them together.

use crate::account::AccountService;
use crate::database::SqliteDatabase;
use crate::registration::RegistrationEngine;
use crate::team::TeamRegistry;
use crate::tournament::TournamentRegistry;
use crate::wallet::WalletService;

/// User account registration and lookup.
pub mod account;
/// Traits and types used for interacting with the database.
pub mod database;
/// The domain error kinds surfaced to callers.
pub mod error;
/// The per-join state machine orchestrating tournaments, teams and wallets.
pub mod registration;
/// Team identity, rosters and join codes.
pub mod team;
/// Tournament lifecycle and capacity slots.
pub mod tournament;
/// Wallet funding, debits and balance queries over the ledger.
pub mod wallet;

mod utils;

/// A thread-safe Error type used throughout the engine.
pub type EngineError = anyhow::Error;

/// All engine services wired up over one database.
///
/// Every service holds its own handle to the shared pool, so `Engine` is
/// cheap to clone and safe to share across request handlers.
#[derive(Debug, Clone)]
pub struct Engine {
    pub accounts: AccountService,
    pub wallet: WalletService,
    pub teams: TeamRegistry,
    pub tournaments: TournamentRegistry,
    pub registration: RegistrationEngine,
}

impl Engine {
    pub fn new(db: SqliteDatabase) -> Self {
        let wallet = WalletService::new(db.clone());
        let tournaments = TournamentRegistry::new(db.clone());
        Self {
            accounts: AccountService::new(db.clone()),
            teams: TeamRegistry::new(db.clone()),
            registration: RegistrationEngine::new(db, wallet.clone(), tournaments.clone()),
            wallet,
            tournaments,
        }
    }
}
