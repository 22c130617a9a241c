use crate::auth::hash_password;
use crate::config::Config;
use crate::db::Db;

/// Seeds the first admin account from `SEED_ADMIN_EMAIL` / `SEED_ADMIN_PASSWORD`.
/// Safe to call on every startup: existence is checked before inserting, and
/// an existing account is left untouched.
pub async fn seed_admin(pool: &Db, config: &Config) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (&config.seed_admin_email, &config.seed_admin_password) else {
        tracing::debug!("No seed admin configured");
        return Ok(());
    };

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)",
    )
    .bind(email)
    .fetch_one(pool)
    .await?;

    if exists {
        tracing::debug!(%email, "Seed admin already present");
        return Ok(());
    }

    let hash = hash_password(password)?;
    sqlx::query(
        "INSERT INTO users (first_name, last_name, phone, email, password, role)
         VALUES ('System', 'Administrator', '0000000000', ?, ?, 'admin')",
    )
    .bind(email)
    .bind(hash)
    .execute(pool)
    .await?;
    tracing::info!(%email, "Seeded admin account");

    Ok(())
}
