use serde::{Deserialize, Serialize};
use validator::Validate;

/// DTO for asking the text-generation API for a batch of questions.
#[derive(Debug, Deserialize, Validate)]
pub struct AiQuestionRequest {
    #[validate(length(min = 1, max = 100, message = "Role is required"))]
    pub role: String,
    #[validate(length(min = 1, max = 500, message = "Tech stack is required"))]
    pub tech_stack: String,
    #[validate(length(min = 1, max = 1000, message = "Progress description is required"))]
    pub progress: String,
    #[validate(range(min = 1, max = 15, message = "Question count must be between 1 and 15"))]
    pub question_count: i64,
}

/// One generated question as returned by the API.
/// Field names follow the JSON shape requested in the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiQuestionItem {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(rename = "correctIndex")]
    pub correct_index: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiQuestionResponse {
    #[serde(default)]
    pub questions: Vec<AiQuestionItem>,
}
