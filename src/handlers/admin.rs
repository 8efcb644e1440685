// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::{MAX_OPTIONS_PER_QUESTION, MAX_QUESTIONS_PER_TEST},
    error::AppError,
    models::{
        ai_question::AiQuestionRequest,
        submission::SubmissionResponse,
        test::{CreateTestRequest, TestResponse},
        user::{AuthUser, ChangeRoleRequest, Role, User},
    },
    repositories::{
        assessments::{self, NewTest},
        submissions, users,
    },
    services::{export, lifecycle, question_gen},
    state::AppState,
    utils::{
        html::{clean_html, clean_optional},
        jwt::Claims,
    },
};

/// Creates a test with its questions and options in one transaction.
/// Staff only.
pub async fn create_test(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    check_authoring_limits(&payload)?;

    let caller = claims.auth_user()?;
    let assigned_role: Role = payload.assigned_role.parse()?;

    let mut tx = pool.begin().await?;

    users::find_by_id(&mut *tx, caller.id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    users::find_team(&mut *tx, payload.assigned_team_id)
        .await?
        .ok_or(AppError::NotFound("Team not found".to_string()))?;

    let title = clean_html(payload.title.trim());
    let description = clean_optional(payload.description.as_deref());

    let test_id = assessments::insert_test(
        &mut tx,
        &NewTest {
            title: &title,
            description: description.as_deref(),
            time_limit_minutes: payload.time_limit_minutes,
            assigned_role: assigned_role.as_str(),
            assigned_team_id: payload.assigned_team_id,
            created_by: caller.id,
        },
    )
    .await?;

    for question in &payload.questions {
        let question_id =
            assessments::insert_question(&mut tx, test_id, &clean_html(&question.question_text))
                .await?;
        for option in &question.options {
            assessments::insert_option(
                &mut tx,
                question_id,
                &clean_html(&option.option_text),
                option.is_correct,
            )
            .await?;
        }
    }

    let test = assessments::find_by_id(&mut *tx, test_id)
        .await?
        .ok_or_else(AppError::test_not_found)?;
    let questions = assessments::load_questions(&mut tx, test_id).await?;

    tx.commit().await?;

    tracing::info!(
        "User {} created test {} ('{}') with {} questions",
        caller.id,
        test_id,
        test.title,
        questions.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(TestResponse::build(test, &questions, true, false)),
    ))
}

/// Question/option counts and the at-least-one-correct rule.
fn check_authoring_limits(payload: &CreateTestRequest) -> Result<(), AppError> {
    if payload.questions.is_empty() {
        return Err(AppError::BadRequest(
            "At least one question is required".to_string(),
        ));
    }
    if payload.questions.len() > MAX_QUESTIONS_PER_TEST {
        return Err(AppError::BadRequest(format!(
            "Too many questions. Max allowed: {}",
            MAX_QUESTIONS_PER_TEST
        )));
    }

    for question in &payload.questions {
        if question.options.is_empty() {
            return Err(AppError::BadRequest(
                "Each question must have options".to_string(),
            ));
        }
        if question.options.len() > MAX_OPTIONS_PER_QUESTION {
            return Err(AppError::BadRequest(format!(
                "Too many options. Max allowed: {}",
                MAX_OPTIONS_PER_QUESTION
            )));
        }
        if !question.options.iter().any(|o| o.is_correct) {
            return Err(AppError::BadRequest(format!(
                "Question has no correct option: {}",
                question.question_text
            )));
        }
    }

    Ok(())
}

/// All tests with answers visible. TL/TR only see their own team's tests.
pub async fn list_tests(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let caller = claims.auth_user()?;
    let scope = team_scope(&pool, &caller).await?;

    let tests = match scope {
        Some(team_id) => assessments::list_by_team(&pool, team_id).await?,
        None => assessments::list_all(&pool).await?,
    };

    let mut conn = pool.acquire().await?;
    let mut responses = Vec::with_capacity(tests.len());
    for test in tests {
        let questions = assessments::load_questions(&mut conn, test.id).await?;
        responses.push(TestResponse::build(test, &questions, true, false));
    }

    Ok(Json(responses))
}

pub async fn list_submissions(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    assessments::find_by_id(&pool, id)
        .await?
        .ok_or_else(AppError::test_not_found)?;

    let taken = submissions::list_for_test(&pool, id).await?;
    let responses: Vec<SubmissionResponse> =
        taken.into_iter().map(SubmissionResponse::summary).collect();

    Ok(Json(responses))
}

/// Releases results under the configured release mode. Irreversible.
pub async fn release_results(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let outcome =
        lifecycle::release(&state.pool, &state.mailer, state.config.release_mode, id).await?;
    Ok(Json(outcome))
}

pub async fn scores_csv(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = export::export_scores(&pool, id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"test-scores-{}.csv\"", id),
            ),
        ],
        bytes,
    ))
}

/// Lists users. TL/TR only see their own team.
pub async fn list_users(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let caller = claims.auth_user()?;
    let scope = team_scope(&pool, &caller).await?;
    Ok(Json(users::list(&pool, scope).await?))
}

pub async fn change_role(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<ChangeRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let role: Role = payload.role.parse()?;

    if !users::update_role(&pool, id, role.as_str()).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!("Changed role of user {} to {}", id, role);

    let user = users::find_response(&pool, id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

pub async fn list_teams(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(users::list_teams(&pool).await?))
}

/// Drafts questions with the text-generation API. Nothing is stored.
pub async fn generate_ai_questions(
    State(state): State<AppState>,
    Json(payload): Json<AiQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let generator = state
        .generator
        .as_ref()
        .ok_or(AppError::BadRequest("AI is not configured".to_string()))?;

    let questions = question_gen::generate_questions(generator.as_ref(), &payload).await?;
    Ok(Json(questions))
}

/// `Some(team)` for team-scoped staff, `None` for unrestricted callers.
async fn team_scope(pool: &SqlitePool, caller: &AuthUser) -> Result<Option<i64>, AppError> {
    if !caller.role.is_team_scoped() {
        return Ok(None);
    }

    let user: User = users::find_by_id(pool, caller.id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    user.team_id
        .map(Some)
        .ok_or(AppError::BadRequest("User has no team assigned".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{OptionRequest, QuestionRequest};

    fn option(text: &str, is_correct: bool) -> OptionRequest {
        OptionRequest {
            option_text: text.to_string(),
            is_correct,
        }
    }

    fn request(questions: Vec<QuestionRequest>) -> CreateTestRequest {
        CreateTestRequest {
            title: "Quiz1".to_string(),
            description: None,
            time_limit_minutes: 30,
            assigned_role: "TRAINEE".to_string(),
            assigned_team_id: 1,
            questions,
        }
    }

    fn question(options: Vec<OptionRequest>) -> QuestionRequest {
        QuestionRequest {
            question_text: "Q".to_string(),
            options,
        }
    }

    #[test]
    fn accepts_single_and_multi_correct_questions() {
        let payload = request(vec![
            question(vec![option("A", true), option("B", false)]),
            question(vec![option("A", true), option("B", true)]),
        ]);
        assert!(check_authoring_limits(&payload).is_ok());
    }

    #[test]
    fn rejects_question_without_correct_option() {
        let payload = request(vec![question(vec![option("A", false), option("B", false)])]);
        let err = check_authoring_limits(&payload).unwrap_err();
        assert_eq!(err.message(), "Question has no correct option: Q");
    }

    #[test]
    fn rejects_counts_outside_limits() {
        assert_eq!(
            check_authoring_limits(&request(vec![])).unwrap_err().message(),
            "At least one question is required"
        );

        let too_many: Vec<_> = (0..=MAX_QUESTIONS_PER_TEST)
            .map(|_| question(vec![option("A", true)]))
            .collect();
        assert_eq!(
            check_authoring_limits(&request(too_many)).unwrap_err().message(),
            "Too many questions. Max allowed: 50"
        );

        let wide: Vec<_> = (0..=MAX_OPTIONS_PER_QUESTION).map(|_| option("A", true)).collect();
        assert_eq!(
            check_authoring_limits(&request(vec![question(wide)])).unwrap_err().message(),
            "Too many options. Max allowed: 6"
        );

        assert_eq!(
            check_authoring_limits(&request(vec![question(vec![])])).unwrap_err().message(),
            "Each question must have options"
        );
    }
}
