// src/handlers/public.rs

use axum::{
    extract::{Query, State},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{error::AppError, services::answer_key, state::AppState};

#[derive(Debug, Deserialize)]
pub struct AnswerKeyQuery {
    #[serde(default)]
    pub test_name: String,
    pub key: Option<String>,
}

/// Reveals the correct-option letters of a test, e.g. `1A2BC`.
///
/// The secret comes from `?key=`, or from the `X-Answer-Key` header when the
/// query parameter is absent or blank.
pub async fn get_answer_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AnswerKeyQuery>,
) -> Result<impl IntoResponse, AppError> {
    let provided = query
        .key
        .filter(|k| !k.trim().is_empty())
        .or_else(|| {
            headers
                .get("x-answer-key")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_default();

    let key = answer_key::answer_key(
        &state.pool,
        &state.config.answer_key_secret,
        &query.test_name,
        &provided,
    )
    .await?;

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], key))
}
