use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{error::AppError, services::release, utils::jwt::Claims};

/// The caller's results on released tests.
pub async fn my_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let caller = claims.auth_user()?;
    Ok(Json(release::my_results(&pool, &caller).await?))
}
