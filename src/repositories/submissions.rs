use sqlx::sqlite::SqliteExecutor;

use crate::models::submission::{AnswerRow, SubmissionDetail};

const SUBMISSION_SELECT: &str = "
    SELECT
        s.id,
        s.user_id,
        u.name AS user_name,
        u.email AS user_email,
        u.role AS user_role,
        tm.name AS team_name,
        s.test_id,
        t.title AS test_title,
        s.start_time,
        s.end_time,
        s.score,
        s.total_marks
    FROM submissions s
    JOIN users u ON u.id = s.user_id
    LEFT JOIN teams tm ON tm.id = u.team_id
    JOIN tests t ON t.id = s.test_id";

pub async fn exists<'e, E>(executor: E, user_id: i64, test_id: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM submissions WHERE user_id = ? AND test_id = ?")
            .bind(user_id)
            .bind(test_id)
            .fetch_optional(executor)
            .await?;

    Ok(row.is_some())
}

/// Inserts the submission shell. A second insert for the same (user, test)
/// fails on the unique constraint.
pub async fn insert<'e, E>(
    executor: E,
    user_id: i64,
    test_id: i64,
    start_time: chrono::NaiveDateTime,
    end_time: chrono::NaiveDateTime,
    total_marks: i64,
) -> Result<i64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO submissions (user_id, test_id, start_time, end_time, total_marks)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(test_id)
    .bind(start_time)
    .bind(end_time)
    .bind(total_marks)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// `option_id = None` records a skipped question.
pub async fn insert_answer<'e, E>(
    executor: E,
    submission_id: i64,
    question_id: i64,
    option_id: Option<i64>,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("INSERT INTO answers (submission_id, question_id, option_id) VALUES (?, ?, ?)")
        .bind(submission_id)
        .bind(question_id)
        .bind(option_id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn set_score<'e, E>(executor: E, submission_id: i64, score: i64) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE submissions SET score = ? WHERE id = ?")
        .bind(score)
        .bind(submission_id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn find_detail<'e, E>(
    executor: E,
    submission_id: i64,
) -> Result<Option<SubmissionDetail>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, SubmissionDetail>(&format!("{SUBMISSION_SELECT} WHERE s.id = ?"))
        .bind(submission_id)
        .fetch_optional(executor)
        .await
}

pub async fn list_for_test<'e, E>(
    executor: E,
    test_id: i64,
) -> Result<Vec<SubmissionDetail>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, SubmissionDetail>(&format!(
        "{SUBMISSION_SELECT} WHERE s.test_id = ? ORDER BY s.id"
    ))
    .bind(test_id)
    .fetch_all(executor)
    .await
}

/// The user's submissions on tests whose results are out.
pub async fn list_released_for_user<'e, E>(
    executor: E,
    user_id: i64,
) -> Result<Vec<SubmissionDetail>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, SubmissionDetail>(&format!(
        "{SUBMISSION_SELECT} WHERE s.user_id = ? AND t.results_released = 1 ORDER BY s.id DESC"
    ))
    .bind(user_id)
    .fetch_all(executor)
    .await
}

/// Answer trail of a submission in insertion order.
pub async fn answers_for<'e, E>(
    executor: E,
    submission_id: i64,
) -> Result<Vec<AnswerRow>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, AnswerRow>(
        r#"
        SELECT a.question_id, a.option_id, o.option_text
        FROM answers a
        LEFT JOIN options o ON o.id = a.option_id
        WHERE a.submission_id = ?
        ORDER BY a.id
        "#,
    )
    .bind(submission_id)
    .fetch_all(executor)
    .await
}

/// Deletes the answer trail of every submission on a test; submissions stay.
pub async fn purge_answers_for_test<'e, E>(executor: E, test_id: i64) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "DELETE FROM answers WHERE submission_id IN (SELECT id FROM submissions WHERE test_id = ?)",
    )
    .bind(test_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
