// src/services/question_gen.rs

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::{Config, MAX_GENERATED_QUESTIONS},
    error::AppError,
    models::ai_question::{AiQuestionRequest, AiQuestionResponse},
};

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Sends a prompt and returns the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String, AppError>;
}

pub type SharedGenerator = Arc<dyn QuestionGenerator>;

/// `None` when no API key is configured.
pub fn from_config(config: &Config) -> Result<Option<SharedGenerator>, AppError> {
    match &config.ai_api_key {
        Some(key) => Ok(Some(Arc::new(GeminiGenerator::new(
            config.ai_base_url.clone(),
            config.ai_model.clone(),
            key.clone(),
        )?))),
        None => Ok(None),
    }
}

/// Client for the `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiGenerator {
    pub fn new(base_url: String, model: String, api_key: String) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        })
    }
}

#[async_trait]
impl QuestionGenerator for GeminiGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.3, "maxOutputTokens": 4096 }
        });

        tracing::info!("Calling text-generation model {}", self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::BadRequest(format!("AI request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::BadRequest(format!(
                "AI request failed with status {}",
                response.status()
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|_| AppError::BadRequest("Invalid response structure from AI API".to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(AppError::BadRequest("Empty text in AI response".to_string()))
    }
}

pub async fn generate_questions(
    generator: &dyn QuestionGenerator,
    req: &AiQuestionRequest,
) -> Result<AiQuestionResponse, AppError> {
    let count = req.question_count.clamp(1, MAX_GENERATED_QUESTIONS as i64);
    let text = generator.complete(&build_prompt(req, count)).await?;
    tracing::debug!("AI response: {}", text);

    let mut parsed = parse_questions(&text)?;
    validate_questions(&parsed)?;
    parsed.questions.truncate(MAX_GENERATED_QUESTIONS);

    tracing::info!("Generated {} questions", parsed.questions.len());
    Ok(parsed)
}

fn build_prompt(req: &AiQuestionRequest, count: i64) -> String {
    format!(
        "Generate {} multiple-choice questions for a {} candidate. Tech stack: {}. Level/Progress: {}. \
         Return ONLY valid JSON with this exact structure and nothing else: \
         {{\"questions\":[{{\"question\":\"string\",\"options\":[\"A\",\"B\",\"C\",\"D\"],\"correctIndex\":0}}]}} \
         Do not include markdown, code fences, explanations, or any extra text. Only the JSON object.",
        count, req.role, req.tech_stack, req.progress
    )
}

static FENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$").expect("fence pattern is valid")
});

/// Strips markdown fences and reduces the text to its outermost JSON object.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    let unfenced = FENCED
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if end > start => &unfenced[start..=end],
        _ => unfenced,
    }
}

fn parse_questions(text: &str) -> Result<AiQuestionResponse, AppError> {
    serde_json::from_str(extract_json(text)).map_err(|e| {
        tracing::error!("Failed to parse AI response as JSON: {}", e);
        AppError::BadRequest(format!("Failed to parse AI response as JSON: {}", e))
    })
}

fn validate_questions(response: &AiQuestionResponse) -> Result<(), AppError> {
    if response.questions.is_empty() {
        return Err(AppError::BadRequest("No questions generated".to_string()));
    }

    for item in &response.questions {
        if item.question.trim().is_empty() {
            return Err(AppError::BadRequest("Question text is empty".to_string()));
        }
        if item.options.len() < 2 {
            return Err(AppError::BadRequest(
                "Question must have at least 2 options".to_string(),
            ));
        }
        match item.correct_index {
            Some(i) if i >= 0 && (i as usize) < item.options.len() => {}
            _ => {
                return Err(AppError::BadRequest(
                    "Invalid correctIndex for question".to_string(),
                ));
            }
        }
    }

    Ok(())
}
