use brokerlink_core::{LinkUpdate, UserBrokerLink};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

/// Run embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Load a user's link.
pub async fn load_link(pool: &PgPool, user_id: &str) -> Result<Option<UserBrokerLink>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT user_id, account_id, server, login, platform, email,
                connected_at, updated_at, disconnected_at
         FROM user_broker_links
         WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(r) = row else {
        return Ok(None);
    };

    Ok(Some(UserBrokerLink {
        user_id: r.try_get("user_id")?,
        account_id: r.try_get("account_id")?,
        server: r.try_get("server")?,
        login: r.try_get("login")?,
        platform: r.try_get("platform")?,
        email: r.try_get("email")?,
        connected_at: r.try_get("connected_at")?,
        updated_at: r.try_get("updated_at")?,
        disconnected_at: r.try_get("disconnected_at")?,
    }))
}

/// Merge-upsert a link. NULL parameters keep whatever the row already holds.
pub async fn upsert_link(
    pool: &PgPool,
    user_id: &str,
    update: &LinkUpdate,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_broker_links (
            user_id, account_id, server, login, platform, email, connected_at, updated_at
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (user_id) DO UPDATE
         SET account_id   = COALESCE(EXCLUDED.account_id, user_broker_links.account_id),
             server       = COALESCE(EXCLUDED.server, user_broker_links.server),
             login        = COALESCE(EXCLUDED.login, user_broker_links.login),
             platform     = COALESCE(EXCLUDED.platform, user_broker_links.platform),
             email        = COALESCE(EXCLUDED.email, user_broker_links.email),
             connected_at = COALESCE(EXCLUDED.connected_at, user_broker_links.connected_at),
             updated_at   = COALESCE(EXCLUDED.updated_at, user_broker_links.updated_at)",
    )
    .bind(user_id)
    .bind(&update.account_id)
    .bind(&update.server)
    .bind(&update.login)
    .bind(&update.platform)
    .bind(&update.email)
    .bind(update.connected_at)
    .bind(update.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Drop the account fields of an existing link. Returns the number of rows touched.
pub async fn clear_link_account(
    pool: &PgPool,
    user_id: &str,
    at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE user_broker_links
         SET account_id = NULL, server = NULL, login = NULL, platform = NULL,
             disconnected_at = $2, updated_at = $2
         WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
