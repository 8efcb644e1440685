// src/db.rs

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::models::team::DEFAULT_TEAMS;
use crate::utils::hash::hash_password;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Opens the pool, creating the database file when missing.
/// Foreign keys are enforced so cascades fire.
///
/// SQLite admits one writer; a single pooled connection makes concurrent
/// transactions queue instead of failing a lock upgrade with SQLITE_BUSY.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        // An in-memory database lives only as long as its connection.
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Inserts the default teams when none exist.
pub async fn seed_teams(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM teams")
        .fetch_one(pool)
        .await?;

    if count == 0 {
        for (name, team_type) in DEFAULT_TEAMS {
            sqlx::query("INSERT INTO teams (name, type) VALUES (?, ?)")
                .bind(name)
                .bind(team_type.as_str())
                .execute(pool)
                .await?;
        }
        tracing::info!("Teams seeded successfully.");
    }
    Ok(())
}

/// Creates the admin account when configured and absent.
/// The admin is not enrolled in 2FA.
pub async fn seed_admin_user(
    pool: &SqlitePool,
    email: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let user_exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    if user_exists.is_none() {
        tracing::info!("Seeding admin user: {}", email);
        let hashed_password = hash_password(password)?;

        sqlx::query(
            "INSERT INTO users (name, email, password, role, using_2fa) VALUES ('Admin', ?, ?, 'ADMIN', 0)",
        )
        .bind(email)
        .bind(hashed_password)
        .execute(pool)
        .await?;
        tracing::info!("Admin user created successfully.");
    }
    Ok(())
}
