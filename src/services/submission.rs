// src/services/submission.rs

// Exactly-once submission and scoring.
//
// The whole protocol runs in one transaction. The existence check is a fast
// path; the UNIQUE(user_id, test_id) constraint is what stops a concurrent
// duplicate, and its violation surfaces as `Conflict`.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        question::QuestionWithOptions,
        submission::{SubmissionResponse, SubmitTestRequest},
        user::AuthUser,
    },
    repositories::{assessments, submissions, users},
    services::{grading, lifecycle},
};

pub async fn submit(
    pool: &SqlitePool,
    caller: &AuthUser,
    test_id: i64,
    req: SubmitTestRequest,
) -> Result<SubmissionResponse, AppError> {
    if req.answers.is_empty() {
        return Err(AppError::BadRequest("Answers are required".to_string()));
    }

    let mut tx = pool.begin().await?;

    let user = users::find_by_id(&mut *tx, caller.id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let test = assessments::find_by_id(&mut *tx, test_id)
        .await?
        .ok_or_else(AppError::test_not_found)?;

    if submissions::exists(&mut *tx, user.id, test_id).await? {
        return Err(AppError::already_submitted());
    }

    if test.results_released {
        return Err(AppError::test_closed());
    }

    if !lifecycle::is_assigned(&test, &user) {
        return Err(AppError::not_assigned());
    }

    let start_time = parse_start_time(&req.start_time)?;

    let questions = assessments::load_questions(&mut tx, test_id).await?;
    let total_marks = questions.len() as i64;
    let by_id: HashMap<i64, &QuestionWithOptions> = questions.iter().map(|q| (q.id(), q)).collect();

    let submission_id = submissions::insert(
        &mut *tx,
        user.id,
        test_id,
        start_time,
        Utc::now().naive_utc(),
        total_marks,
    )
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "You have already submitted this test"))?;

    let mut score = 0i64;
    let mut seen_questions = HashSet::new();

    for answer in &req.answers {
        if !seen_questions.insert(answer.question_id) {
            return Err(AppError::BadRequest(format!(
                "Duplicate answer for question: {}",
                answer.question_id
            )));
        }

        let question = by_id
            .get(&answer.question_id)
            .ok_or_else(|| AppError::NotFound(format!("Question not found: {}", answer.question_id)))?;

        let selected = dedup_preserving_order(&answer.selected_option_ids);

        if grading::is_correct(&question.correct_option_ids(), &selected) {
            score += 1;
        }

        for option_id in &selected {
            let option = question
                .option(*option_id)
                .ok_or_else(|| AppError::NotFound(format!("Option not found: {}", option_id)))?;

            submissions::insert_answer(&mut *tx, submission_id, question.id(), Some(option.id))
                .await?;
        }

        if selected.is_empty() {
            submissions::insert_answer(&mut *tx, submission_id, question.id(), None).await?;
        }
    }

    submissions::set_score(&mut *tx, submission_id, score).await?;

    let detail = submissions::find_detail(&mut *tx, submission_id)
        .await?
        .ok_or(AppError::InternalServerError(
            "Submission vanished inside its own transaction".to_string(),
        ))?;

    tx.commit().await?;

    tracing::info!(
        "User {} submitted test {} scoring {}/{}",
        user.id,
        test_id,
        score,
        total_marks
    );

    Ok(SubmissionResponse::summary(detail))
}

/// Parses a client start time as a local date-time.
///
/// A trailing `Z` and fractional seconds are stripped first; when that fails,
/// RFC 3339 (normalised to UTC) and plain ISO local forms are tried.
pub fn parse_start_time(raw: &str) -> Result<NaiveDateTime, AppError> {
    let trimmed = raw.trim();
    let without_zone = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    let without_fraction = without_zone.split('.').next().unwrap_or(without_zone);

    NaiveDateTime::parse_from_str(without_fraction, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.naive_utc()))
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M"))
        .map_err(|_| AppError::BadRequest(format!("Invalid start time: {}", raw)))
}

fn dedup_preserving_order(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
