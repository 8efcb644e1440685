// src/models/question.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub test_id: i64,
    pub question_text: String,
}

/// Represents the 'options' table in the database.
/// Position within the question is storage order (ascending id).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: i64,
    pub question_id: i64,
    pub option_text: String,
    pub is_correct: bool,
}

/// A question together with its options in storage order.
#[derive(Debug, Clone)]
pub struct QuestionWithOptions {
    pub question: Question,
    pub options: Vec<QuestionOption>,
}

impl QuestionWithOptions {
    pub fn id(&self) -> i64 {
        self.question.id
    }

    /// The correct-option set. Its size is never stored, only counted.
    pub fn correct_option_ids(&self) -> HashSet<i64> {
        self.options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| o.id)
            .collect()
    }

    pub fn is_multi_correct(&self) -> bool {
        self.options.iter().filter(|o| o.is_correct).count() > 1
    }

    pub fn option(&self, option_id: i64) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// DTO for one question inside a create-test request.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionRequest {
    #[validate(length(min = 1, max = 2000, message = "Question text is required"))]
    pub question_text: String,
    #[validate(nested)]
    pub options: Vec<OptionRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OptionRequest {
    #[validate(length(min = 1, max = 500, message = "Option text is required"))]
    pub option_text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Option as shown to clients. `is_correct` is `None` while a test is being taken.
#[derive(Debug, Serialize)]
pub struct OptionResponse {
    pub id: i64,
    pub option_text: String,
    pub is_correct: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub id: i64,
    pub question_text: String,
    pub options: Vec<OptionResponse>,
    pub multi_correct: bool,
}

impl QuestionResponse {
    pub fn from_question(q: &QuestionWithOptions, show_correct: bool) -> Self {
        Self {
            id: q.question.id,
            question_text: q.question.question_text.clone(),
            options: q
                .options
                .iter()
                .map(|o| OptionResponse {
                    id: o.id,
                    option_text: o.option_text.clone(),
                    is_correct: show_correct.then_some(o.is_correct),
                })
                .collect(),
            multi_correct: q.is_multi_correct(),
        }
    }
}
