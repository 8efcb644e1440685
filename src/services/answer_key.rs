// src/services/answer_key.rs

use sqlx::SqlitePool;

use crate::{
    config::AnswerKeySecret,
    error::AppError,
    models::question::QuestionWithOptions,
    repositories::assessments,
};

/// Looks a test up by title and returns its compact answer key, e.g. `1A2BC3D`.
///
/// The secret check runs before the lookup, so an unknown title and a known one
/// fail the same way without the secret.
pub async fn answer_key(
    pool: &SqlitePool,
    secret: &AnswerKeySecret,
    test_title: &str,
    provided: &str,
) -> Result<String, AppError> {
    let title = test_title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Test name is required".to_string()));
    }

    if provided.trim().is_empty() {
        return Err(AppError::BadRequest("Answer key is required".to_string()));
    }

    if !secret.verify(provided) {
        tracing::warn!("Rejected answer key request for test '{}'", title);
        return Err(AppError::AuthError("Invalid answer key".to_string()));
    }

    let test = assessments::find_by_title(pool, title)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test not found: {}", title)))?;

    let mut conn = pool.acquire().await?;
    let questions = assessments::load_questions(&mut conn, test.id).await?;

    Ok(format_answer_key(&questions))
}

/// `<question number><letters of correct options>` for every question, no
/// separators. Letters follow option position. `N/A` for a test with no questions.
pub fn format_answer_key(questions: &[QuestionWithOptions]) -> String {
    let mut key = String::new();
    for (index, question) in questions.iter().enumerate() {
        key.push_str(&(index + 1).to_string());
        key.extend(
            question
                .options
                .iter()
                .enumerate()
                .filter(|(_, option)| option.is_correct)
                .map(|(position, _)| option_letter(position)),
        );
    }

    if key.is_empty() { "N/A".to_string() } else { key }
}

fn option_letter(position: usize) -> char {
    char::from_u32('A' as u32 + position as u32).unwrap_or('?')
}
