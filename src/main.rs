use anyhow::{anyhow, Context};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use quire::auth::jwt::JwtService;
use quire::config::AppConfig;
use quire::db::{self, PgPool};
use quire::routes;
use quire::state::AppState;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    info!(
        database_url = %config.redacted_database_url(),
        "starting quire backend"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;

    // Schema gate: all migrations must be applied before we serve a single
    // request, so handlers never have to probe for missing columns.
    run_migrations(&pool)?;

    let jwt = JwtService::from_config(&config)?;
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(pool, config, jwt);
    let router = routes::create_router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, router).await?;
    Ok(())
}

fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    let mut conn = pool
        .get()
        .map_err(|err| anyhow!("failed to acquire migration connection: {err}"))?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
    if !applied.is_empty() {
        info!(count = applied.len(), "applied pending migrations");
    }
    Ok(())
}
