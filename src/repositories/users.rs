use sqlx::sqlite::SqliteExecutor;

use crate::models::{
    team::Team,
    user::{User, UserResponse},
};

const USER_COLUMNS: &str = "id, name, email, password, role, team_id, team_lead_name, description, using_2fa, created_at";

const USER_RESPONSE_SELECT: &str = "
    SELECT
        u.id, u.name, u.email, u.role, u.team_id, tm.name AS team_name,
        u.team_lead_name, u.description, u.using_2fa, u.created_at
    FROM users u
    LEFT JOIN teams tm ON tm.id = u.team_id";

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
        .bind(email)
        .fetch_optional(executor)
        .await
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub team_id: Option<i64>,
    pub team_lead_name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub using_2fa: bool,
}

/// Fails on the unique email constraint for a duplicate registration.
pub async fn insert<'e, E>(executor: E, user: &NewUser<'_>) -> Result<i64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO users
        (name, email, password, role, team_id, team_lead_name, description, using_2fa)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.name)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.role)
    .bind(user.team_id)
    .bind(user.team_lead_name)
    .bind(user.description)
    .bind(user.using_2fa)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_role<'e, E>(executor: E, id: i64, role: &str) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn find_response<'e, E>(executor: E, id: i64) -> Result<Option<UserResponse>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, UserResponse>(&format!("{USER_RESPONSE_SELECT} WHERE u.id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// All users, or only one team's when `team_id` is set.
pub async fn list<'e, E>(executor: E, team_id: Option<i64>) -> Result<Vec<UserResponse>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    match team_id {
        Some(team_id) => {
            sqlx::query_as::<_, UserResponse>(&format!(
                "{USER_RESPONSE_SELECT} WHERE u.team_id = ? ORDER BY u.id DESC"
            ))
            .bind(team_id)
            .fetch_all(executor)
            .await
        }
        None => {
            sqlx::query_as::<_, UserResponse>(&format!("{USER_RESPONSE_SELECT} ORDER BY u.id DESC"))
                .fetch_all(executor)
                .await
        }
    }
}

pub async fn find_team<'e, E>(executor: E, id: i64) -> Result<Option<Team>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Team>("SELECT id, name, type FROM teams WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn list_teams<'e, E>(executor: E) -> Result<Vec<Team>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Team>("SELECT id, name, type FROM teams ORDER BY id")
        .fetch_all(executor)
        .await
}
