// src/handlers/test_taking.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::submission::SubmitTestRequest,
    services::{lifecycle, submission},
    utils::jwt::Claims,
};

/// Lists the tests assigned to the caller's team and role.
pub async fn list_tests(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let caller = claims.auth_user()?;
    let tests = lifecycle::assigned_tests(&pool, &caller).await?;
    Ok(Json(tests))
}

/// Fetches a test for taking it. Option correctness is hidden.
pub async fn get_test(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let caller = claims.auth_user()?;
    let test = lifecycle::fetch_for_taking(&pool, &caller, id).await?;
    Ok(Json(test))
}

/// Submits the caller's one attempt at a test and returns the score.
pub async fn submit_test(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = claims.auth_user()?;
    let result = submission::submit(&pool, &caller, id, req).await?;
    Ok((StatusCode::CREATED, Json(result)))
}
