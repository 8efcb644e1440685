// src/services/lifecycle.rs

// Test lifecycle: `Open -> Released`, and which operations each state allows.
//
// Release is one transaction: the conditional flag flip, the aggregates and the
// purge commit together. No operation ever clears the flag. Mail goes out only
// after the commit.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    config::ReleaseMode,
    error::AppError,
    models::{
        test::{Test, TestResponse, TestState},
        user::{AuthUser, User},
    },
    repositories::{assessments, submissions, users},
    services::{
        mailer::{self, SharedMailer},
        release::{self, ReleaseStats},
    },
};

/// A test is assigned to a user whose team and role both match.
pub fn is_assigned(test: &Test, user: &User) -> bool {
    user.team_id == Some(test.assigned_team_id) && user.role.eq_ignore_ascii_case(&test.assigned_role)
}

/// Tests assigned to the caller, each flagged with whether it was already submitted.
pub async fn assigned_tests(pool: &SqlitePool, caller: &AuthUser) -> Result<Vec<TestResponse>, AppError> {
    let user = users::find_by_id(pool, caller.id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let Some(team_id) = user.team_id else {
        return Ok(Vec::new());
    };

    let tests = assessments::list_assigned(pool, team_id, &user.role).await?;

    let mut conn = pool.acquire().await?;
    let mut responses = Vec::with_capacity(tests.len());
    for test in tests {
        let submitted = submissions::exists(&mut *conn, user.id, test.id).await?;
        let questions = assessments::load_questions(&mut conn, test.id).await?;
        responses.push(TestResponse::build(test, &questions, false, submitted));
    }

    Ok(responses)
}

/// Fetches a test for taking it.
///
/// Gates run in order and the first failure wins: not assigned, already
/// submitted, closed by release.
pub async fn fetch_for_taking(
    pool: &SqlitePool,
    caller: &AuthUser,
    test_id: i64,
) -> Result<TestResponse, AppError> {
    let test = assessments::find_by_id(pool, test_id)
        .await?
        .ok_or_else(AppError::test_not_found)?;

    let user = users::find_by_id(pool, caller.id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if !is_assigned(&test, &user) {
        return Err(AppError::not_assigned());
    }

    if submissions::exists(pool, user.id, test_id).await? {
        return Err(AppError::already_submitted());
    }

    if test.state() == TestState::Released {
        return Err(AppError::test_closed());
    }

    let mut conn = pool.acquire().await?;
    let questions = assessments::load_questions(&mut conn, test_id).await?;

    Ok(TestResponse::build(test, &questions, false, false))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReleaseOutcome {
    /// Nobody submitted: the test and its questions were deleted.
    Deleted,
    /// Aggregates stored, detail purged, every submitter mailed their score.
    Aggregated(ReleaseStats),
    /// Detail kept, every submitter mailed their answer breakdown.
    AnswerKeysSent { submissions: usize },
}

/// Releases a test's results. A second call fails with `AlreadyReleased` and
/// leaves the first call's aggregates untouched.
pub async fn release(
    pool: &SqlitePool,
    mailer: &SharedMailer,
    mode: ReleaseMode,
    test_id: i64,
) -> Result<ReleaseOutcome, AppError> {
    let mut tx = pool.begin().await?;

    let test = assessments::find_by_id(&mut *tx, test_id)
        .await?
        .ok_or_else(AppError::test_not_found)?;

    if test.state() == TestState::Released {
        return Err(AppError::already_released());
    }

    if !assessments::mark_released(&mut *tx, test_id).await? {
        return Err(AppError::already_released());
    }

    let taken = submissions::list_for_test(&mut *tx, test_id).await?;

    let (outcome, outbox) = if taken.is_empty() {
        assessments::purge_questions(&mut tx, test_id).await?;
        assessments::delete_test(&mut *tx, test_id).await?;
        (ReleaseOutcome::Deleted, Vec::new())
    } else {
        match mode {
            ReleaseMode::Aggregate => {
                let (stats, outbox) = release::aggregate_and_purge(&mut tx, &test, &taken).await?;
                (ReleaseOutcome::Aggregated(stats), outbox)
            }
            ReleaseMode::AnswerKey => {
                let outbox = release::answer_key_mails(&mut tx, &test, &taken).await?;
                (
                    ReleaseOutcome::AnswerKeysSent {
                        submissions: taken.len(),
                    },
                    outbox,
                )
            }
        }
    };

    tx.commit().await?;

    tracing::info!(
        "Released results for test {} ('{}'): {:?}",
        test_id,
        test.title,
        outcome
    );

    for message in outbox {
        mailer::dispatch(mailer, message);
    }

    Ok(outcome)
}
