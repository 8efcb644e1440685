// src/models/submission.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A 'submissions' row joined with its user, team and test.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubmissionDetail {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub user_role: String,
    pub team_name: Option<String>,
    pub test_id: i64,
    pub test_title: String,
    pub start_time: chrono::NaiveDateTime,
    pub end_time: Option<chrono::NaiveDateTime>,
    pub score: Option<i64>,
    pub total_marks: Option<i64>,
}

impl SubmissionDetail {
    pub fn score(&self) -> i64 {
        self.score.unwrap_or(0)
    }

    pub fn total_marks(&self) -> i64 {
        self.total_marks.unwrap_or(0)
    }
}

/// An 'answers' row joined with the texts needed to rebuild a breakdown.
/// `option_id` is `None` for a skipped question.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerRow {
    pub question_id: i64,
    pub option_id: Option<i64>,
    pub option_text: Option<String>,
}

/// DTO for submitting a test attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitTestRequest {
    /// Client clock at start, ISO-8601. A trailing `Z` and fractional seconds are tolerated.
    pub start_time: String,
    pub answers: Vec<AnswerRequest>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_id: i64,

    /// One id for single-correct questions, several for multi-correct, empty when skipped.
    #[serde(default)]
    pub selected_option_ids: Vec<i64>,
}

/// Per-question breakdown of a submission.
///
/// The singular fields are a derived view of the lists: populated only when the
/// matching list has exactly one element.
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub question_id: i64,
    pub question_text: String,
    pub selected_option_ids: Vec<i64>,
    pub selected_option_texts: Vec<String>,
    pub correct_option_ids: Vec<i64>,
    pub correct_option_texts: Vec<String>,
    pub is_correct: bool,
    pub selected_option_id: Option<i64>,
    pub selected_option_text: Option<String>,
    pub correct_option_id: Option<i64>,
    pub correct_option_text: Option<String>,
}

impl AnswerResponse {
    pub fn new(
        question_id: i64,
        question_text: String,
        selected: Vec<(i64, String)>,
        correct: Vec<(i64, String)>,
        is_correct: bool,
    ) -> Self {
        let (selected_option_ids, selected_option_texts): (Vec<_>, Vec<_>) =
            selected.into_iter().unzip();
        let (correct_option_ids, correct_option_texts): (Vec<_>, Vec<_>) =
            correct.into_iter().unzip();

        Self {
            question_id,
            question_text,
            selected_option_id: single(&selected_option_ids),
            selected_option_text: single(&selected_option_texts),
            correct_option_id: single(&correct_option_ids),
            correct_option_text: single(&correct_option_texts),
            selected_option_ids,
            selected_option_texts,
            correct_option_ids,
            correct_option_texts,
            is_correct,
        }
    }
}

fn single<T: Clone>(items: &[T]) -> Option<T> {
    match items {
        [only] => Some(only.clone()),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub test_id: i64,
    pub test_title: String,
    pub start_time: chrono::NaiveDateTime,
    pub end_time: Option<chrono::NaiveDateTime>,
    pub score: i64,
    pub total_marks: i64,
    pub answers: Option<Vec<AnswerResponse>>,
}

impl SubmissionResponse {
    pub fn summary(detail: SubmissionDetail) -> Self {
        Self::with_answers(detail, None)
    }

    pub fn with_answers(detail: SubmissionDetail, answers: Option<Vec<AnswerResponse>>) -> Self {
        Self {
            score: detail.score(),
            total_marks: detail.total_marks(),
            id: detail.id,
            user_id: detail.user_id,
            user_name: detail.user_name,
            user_email: detail.user_email,
            test_id: detail.test_id,
            test_title: detail.test_title,
            start_time: detail.start_time,
            end_time: detail.end_time,
            answers,
        }
    }
}
