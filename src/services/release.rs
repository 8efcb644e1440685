// src/services/release.rs

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    error::AppError,
    models::{
        question::QuestionWithOptions,
        submission::{AnswerResponse, AnswerRow, SubmissionDetail, SubmissionResponse},
        test::Test,
        user::AuthUser,
    },
    repositories::{assessments, submissions},
    services::{
        grading,
        mailer::{self, MailMessage},
    },
};

/// Aggregates stored on a released test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReleaseStats {
    pub total_submissions: i64,
    pub average_score_percent: f64,
    pub pass_rate_percent: f64,
}

/// Folds `(score, total_marks)` pairs into release aggregates.
/// Every ratio is 0 for an empty slice.
pub fn aggregate(results: &[(i64, i64)]) -> ReleaseStats {
    let total = results.len() as i64;
    if total == 0 {
        return ReleaseStats {
            total_submissions: 0,
            average_score_percent: 0.0,
            pass_rate_percent: 0.0,
        };
    }

    let mut percent_sum = 0.0;
    let mut passed = 0i64;
    for &(score, total_marks) in results {
        let percent = grading::score_percent(score, total_marks);
        percent_sum += percent;
        if grading::is_pass(percent) {
            passed += 1;
        }
    }

    ReleaseStats {
        total_submissions: total,
        average_score_percent: percent_sum / total as f64,
        pass_rate_percent: passed as f64 / total as f64 * 100.0,
    }
}

/// Stores the aggregates, then purges answers and questions. Submissions stay
/// with their final scores. Returns the score mail for every submitter.
pub async fn aggregate_and_purge(
    conn: &mut SqliteConnection,
    test: &Test,
    taken: &[SubmissionDetail],
) -> Result<(ReleaseStats, Vec<MailMessage>), AppError> {
    let pairs: Vec<(i64, i64)> = taken.iter().map(|s| (s.score(), s.total_marks())).collect();
    let stats = aggregate(&pairs);

    assessments::store_aggregates(
        &mut *conn,
        test.id,
        stats.total_submissions,
        stats.average_score_percent,
        stats.pass_rate_percent,
    )
    .await?;

    let purged = submissions::purge_answers_for_test(&mut *conn, test.id).await?;
    assessments::purge_questions(conn, test.id).await?;
    tracing::debug!("Purged {} answer rows of test {}", purged, test.id);

    let outbox = taken
        .iter()
        .map(|s| {
            mailer::result_message(&s.user_email, &s.user_name, &test.title, s.score(), s.total_marks())
        })
        .collect();

    Ok((stats, outbox))
}

/// Rebuilds every submitter's breakdown and returns it as mail. Nothing is purged.
pub async fn answer_key_mails(
    conn: &mut SqliteConnection,
    test: &Test,
    taken: &[SubmissionDetail],
) -> Result<Vec<MailMessage>, AppError> {
    let questions = assessments::load_questions(&mut *conn, test.id).await?;

    let mut outbox = Vec::with_capacity(taken.len());
    for submission in taken {
        let rows = submissions::answers_for(&mut *conn, submission.id).await?;
        let breakdown = breakdown(&rows, &questions);
        outbox.push(mailer::answer_key_message(
            &submission.user_email,
            &submission.user_name,
            &test.title,
            submission.score(),
            submission.total_marks(),
            &breakdown,
        ));
    }

    Ok(outbox)
}

/// Groups answer rows by question, in the order questions were answered.
/// Rows whose question no longer exists are dropped.
pub fn breakdown(rows: &[AnswerRow], questions: &[QuestionWithOptions]) -> Vec<AnswerResponse> {
    let by_id: HashMap<i64, &QuestionWithOptions> = questions.iter().map(|q| (q.id(), q)).collect();

    let mut order: Vec<i64> = Vec::new();
    let mut selected: HashMap<i64, Vec<(i64, String)>> = HashMap::new();
    for row in rows {
        let picks = selected.entry(row.question_id).or_insert_with(|| {
            order.push(row.question_id);
            Vec::new()
        });
        if let Some(option_id) = row.option_id {
            picks.push((option_id, row.option_text.clone().unwrap_or_default()));
        }
    }

    order
        .into_iter()
        .filter_map(|question_id| {
            let question = by_id.get(&question_id)?;
            let picks = selected.remove(&question_id).unwrap_or_default();
            let picked_ids: Vec<i64> = picks.iter().map(|(id, _)| *id).collect();
            let is_correct = grading::is_correct(&question.correct_option_ids(), &picked_ids);
            let correct = question
                .options
                .iter()
                .filter(|o| o.is_correct)
                .map(|o| (o.id, o.option_text.clone()))
                .collect();

            Some(AnswerResponse::new(
                question_id,
                question.question.question_text.clone(),
                picks,
                correct,
                is_correct,
            ))
        })
        .collect()
}

/// The caller's submissions on released tests. The breakdown is attached only
/// while answer detail still exists.
pub async fn my_results(pool: &SqlitePool, caller: &AuthUser) -> Result<Vec<SubmissionResponse>, AppError> {
    let mut conn = pool.acquire().await?;
    let released = submissions::list_released_for_user(&mut *conn, caller.id).await?;

    let mut results = Vec::with_capacity(released.len());
    for detail in released {
        let rows = submissions::answers_for(&mut *conn, detail.id).await?;
        let answers = if rows.is_empty() {
            None
        } else {
            let questions = assessments::load_questions(&mut conn, detail.test_id).await?;
            Some(breakdown(&rows, &questions)).filter(|b| !b.is_empty())
        };
        results.push(SubmissionResponse::with_answers(detail, answers));
    }

    Ok(results)
}
