use sqlx::{
    error::ErrorKind,
    mysql::{MySqlConnectOptions, MySqlPoolOptions},
    MySqlPool,
};
use crate::config::Config;

pub type Db = MySqlPool;

fn connect_options(config: &Config) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.db_host)
        .port(config.db_port)
        .username(&config.db_user)
        .password(&config.db_password)
        .database(&config.db_name)
        .charset("utf8mb4")
}

pub async fn connect(config: &Config) -> anyhow::Result<Db> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect_with(connect_options(config))
        .await?;

    tracing::info!(
        host = %config.db_host,
        db = %config.db_name,
        "Database connection pool established"
    );
    Ok(pool)
}

/// A pool that opens connections on first use. Lets the router be built
/// without a reachable database.
pub fn connect_lazy(config: &Config) -> Db {
    MySqlPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect_lazy_with(connect_options(config))
}

/// Run all SQLx migrations from the `migrations/` directory embedded at compile time.
pub async fn run_migrations(pool: &Db) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

// ── Constraint classification ─────────────────────────────────

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    constraint_kind(err) == Some(ErrorKind::UniqueViolation)
}

/// True when a DELETE was refused because other rows still reference the target.
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    constraint_kind(err) == Some(ErrorKind::ForeignKeyViolation)
}

fn constraint_kind(err: &sqlx::Error) -> Option<ErrorKind> {
    match err {
        sqlx::Error::Database(db_err) => Some(db_err.kind()),
        _ => None,
    }
}
