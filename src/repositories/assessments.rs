use std::collections::HashMap;

use sqlx::SqliteConnection;
use sqlx::sqlite::SqliteExecutor;

use crate::models::{
    question::{Question, QuestionOption, QuestionWithOptions},
    test::Test,
};

const TEST_SELECT: &str = "
    SELECT
        t.id,
        t.title,
        t.description,
        t.time_limit_minutes,
        t.assigned_role,
        t.assigned_team_id,
        tm.name AS assigned_team_name,
        t.created_by,
        u.name AS created_by_name,
        t.results_released,
        t.total_submissions,
        t.average_score_percent,
        t.pass_rate_percent,
        t.created_at
    FROM tests t
    JOIN teams tm ON tm.id = t.assigned_team_id
    JOIN users u ON u.id = t.created_by";

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Test>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Test>(&format!("{TEST_SELECT} WHERE t.id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Case-insensitive exact title match; the oldest test wins on duplicates.
pub async fn find_by_title<'e, E>(executor: E, title: &str) -> Result<Option<Test>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Test>(&format!(
        "{TEST_SELECT} WHERE LOWER(t.title) = LOWER(?) ORDER BY t.id LIMIT 1"
    ))
    .bind(title)
    .fetch_optional(executor)
    .await
}

pub async fn list_all<'e, E>(executor: E) -> Result<Vec<Test>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Test>(&format!("{TEST_SELECT} ORDER BY t.id DESC"))
        .fetch_all(executor)
        .await
}

pub async fn list_by_team<'e, E>(executor: E, team_id: i64) -> Result<Vec<Test>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Test>(&format!(
        "{TEST_SELECT} WHERE t.assigned_team_id = ? ORDER BY t.id DESC"
    ))
    .bind(team_id)
    .fetch_all(executor)
    .await
}

pub async fn list_assigned<'e, E>(
    executor: E,
    team_id: i64,
    role: &str,
) -> Result<Vec<Test>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Test>(&format!(
        "{TEST_SELECT} WHERE t.assigned_team_id = ? AND t.assigned_role = ? ORDER BY t.id DESC"
    ))
    .bind(team_id)
    .bind(role)
    .fetch_all(executor)
    .await
}

/// Questions of a test with their options, both in storage order.
pub async fn load_questions(
    conn: &mut SqliteConnection,
    test_id: i64,
) -> Result<Vec<QuestionWithOptions>, sqlx::Error> {
    let questions = sqlx::query_as::<_, Question>(
        "SELECT id, test_id, question_text FROM questions WHERE test_id = ? ORDER BY id",
    )
    .bind(test_id)
    .fetch_all(&mut *conn)
    .await?;

    let options = sqlx::query_as::<_, QuestionOption>(
        r#"
        SELECT o.id, o.question_id, o.option_text, o.is_correct
        FROM options o
        JOIN questions q ON q.id = o.question_id
        WHERE q.test_id = ?
        ORDER BY o.id
        "#,
    )
    .bind(test_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_question: HashMap<i64, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }

    Ok(questions
        .into_iter()
        .map(|question| {
            let options = by_question.remove(&question.id).unwrap_or_default();
            QuestionWithOptions { question, options }
        })
        .collect())
}

pub struct NewTest<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub time_limit_minutes: i64,
    pub assigned_role: &'a str,
    pub assigned_team_id: i64,
    pub created_by: i64,
}

pub async fn insert_test(conn: &mut SqliteConnection, test: &NewTest<'_>) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO tests
        (title, description, time_limit_minutes, assigned_role, assigned_team_id, created_by)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(test.title)
    .bind(test.description)
    .bind(test.time_limit_minutes)
    .bind(test.assigned_role)
    .bind(test.assigned_team_id)
    .bind(test.created_by)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_question(
    conn: &mut SqliteConnection,
    test_id: i64,
    question_text: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO questions (test_id, question_text) VALUES (?, ?)")
        .bind(test_id)
        .bind(question_text)
        .execute(&mut *conn)
        .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_option(
    conn: &mut SqliteConnection,
    question_id: i64,
    option_text: &str,
    is_correct: bool,
) -> Result<i64, sqlx::Error> {
    let result =
        sqlx::query("INSERT INTO options (question_id, option_text, is_correct) VALUES (?, ?, ?)")
            .bind(question_id)
            .bind(option_text)
            .bind(is_correct)
            .execute(&mut *conn)
            .await?;

    Ok(result.last_insert_rowid())
}

/// Flips `results_released` only while it is still false.
/// Returns false when another caller already released the test.
pub async fn mark_released<'e, E>(executor: E, test_id: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result =
        sqlx::query("UPDATE tests SET results_released = 1 WHERE id = ? AND results_released = 0")
            .bind(test_id)
            .execute(executor)
            .await?;

    Ok(result.rows_affected() == 1)
}

/// Stores release aggregates and clears the description.
pub async fn store_aggregates<'e, E>(
    executor: E,
    test_id: i64,
    total_submissions: i64,
    average_score_percent: f64,
    pass_rate_percent: f64,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE tests
        SET total_submissions = ?,
            average_score_percent = ?,
            pass_rate_percent = ?,
            description = NULL
        WHERE id = ?
        "#,
    )
    .bind(total_submissions)
    .bind(average_score_percent)
    .bind(pass_rate_percent)
    .bind(test_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Deletes every question of a test and their options.
pub async fn purge_questions(conn: &mut SqliteConnection, test_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "DELETE FROM options WHERE question_id IN (SELECT id FROM questions WHERE test_id = ?)",
    )
    .bind(test_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM questions WHERE test_id = ?")
        .bind(test_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn delete_test<'e, E>(executor: E, test_id: i64) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("DELETE FROM tests WHERE id = ?")
        .bind(test_id)
        .execute(executor)
        .await?;

    Ok(())
}
