use std::sync::{Arc, Mutex};

use anyhow::Context;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use barbershop::config::AppConfig;
use barbershop::db::{self, queries};
use barbershop::handlers;
use barbershop::models::Roster;
use barbershop::services::availability::AvailabilityResolver;
use barbershop::services::booking::BookingCommitter;
use barbershop::services::directory::{NewAccount, SqliteDirectory};
use barbershop::services::ledger::{BookingLedger, SqliteLedger};
use barbershop::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    if config.auth_secret == "changeme" {
        tracing::warn!("AUTH_SECRET is not set, using the insecure default");
    }

    let conn = db::init_db(&config.database_url)?;
    let roster = Roster::new(queries::list_staff(&conn).context("failed to load staff roster")?);
    anyhow::ensure!(!roster.is_empty(), "staff roster is empty");
    tracing::info!(staff = roster.len(), "loaded staff roster");

    let db = Arc::new(Mutex::new(conn));

    let directory = SqliteDirectory::new(
        db.clone(),
        config.auth_secret.clone(),
        config.session_ttl_hours,
    );
    if let Some(admin) = &config.admin {
        directory
            .ensure_admin(NewAccount {
                name: admin.name.clone(),
                email: admin.email.clone(),
                phone: String::from("-"),
                password: admin.password.clone(),
            })
            .await
            .context("failed to provision admin account")?;
    }

    let ledger: Arc<dyn BookingLedger> = Arc::new(SqliteLedger::new(db));
    let resolver = AvailabilityResolver::new(ledger.clone(), roster);
    let (events_tx, _) = broadcast::channel(256);
    let committer = BookingCommitter::new(ledger.clone(), resolver.clone(), events_tx);

    let state = Arc::new(AppState {
        directory: Arc::new(directory),
        ledger,
        resolver,
        committer,
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
