use std::fs::File;

use arena_engine::database::models::{EntrantKind, TournamentMode};
use arena_engine::database::SqliteDatabase;
use arena_engine::tournament::TournamentSpec;
use arena_engine::{Engine, EngineError};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

#[tokio::main]
async fn main() {
    if let Err(e) = setup_tracing() {
        panic!("Error trying to setup tracing: {}", e);
    }

    if let Err(e) = run().await {
        panic!("Error trying to run the smoke test: {}", e);
    }
}

/// Exercises one funding and one paid tournament join end to end against a
/// fresh in-memory database, so a deployment can verify the engine and its
/// migrations before pointing it at real storage.
async fn run() -> Result<(), EngineError> {
    // Load the .env file only in the development environment (bypassed with the --release flag)
    #[cfg(debug_assertions)]
    dotenv::dotenv().ok();

    // Run against the configured database when one is given, otherwise
    // against a throwaway in-memory one.
    let db = match std::env::var("DATABASE_URL") {
        Ok(_) => {
            let db = SqliteDatabase::connect().await?;
            db.migrate().await?;
            db
        }
        Err(_) => SqliteDatabase::connect_in_memory().await?,
    };
    info!("Database ready, migrations applied");
    let engine = Engine::new(db);

    let alice = engine.accounts.register("alice", "Alice").await?;
    info!("Registered {} with referral code {}", alice.user_id, alice.referral_code);

    let funding_key = uuid::Uuid::new_v4().to_string();
    engine.wallet.fund("alice", 500, &funding_key).await?;
    info!("Wallet balance: {}", engine.wallet.current_balance("alice").await?);

    let tournament = engine
        .tournaments
        .open(&TournamentSpec {
            name: "Smoke Cup".to_string(),
            mode: TournamentMode::Solo,
            max_participants: 16,
            entry_fee: 100,
            prize_pool: 1000,
            start_time: None,
        })
        .await?;

    let registration = engine
        .registration
        .join(tournament.tournament_id, EntrantKind::User, "alice", "alice")
        .await?;
    info!(
        "Registration {} confirmed, balance now {}",
        registration.registration_id,
        engine.wallet.current_balance("alice").await?
    );

    info!("Smoke test passed");
    Ok(())
}

/// Sets up the tracing subscriber for the smoke binary.
fn setup_tracing() -> Result<(), EngineError> {
    if cfg!(debug_assertions) {
        let filter = EnvFilter::from_default_env()
            .add_directive("none".parse()?)
            .add_directive("arena_engine=info".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::NONE)
            .pretty()
            .init();

        return Ok(());
    }

    let log_file = File::create("debug.log")?;

    // Only errors are logged in production.
    tracing_subscriber::fmt::fmt()
        .with_span_events(FmtSpan::NONE)
        .with_max_level(LevelFilter::ERROR)
        .with_writer(log_file)
        .pretty()
        .init();

    Ok(())
}
