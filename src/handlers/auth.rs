// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{AuthResponse, AuthUser, LoginRequest, OtpVerifyRequest, RegisterRequest, Role, User},
    repositories::users::{self, NewUser},
    services::mailer,
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        html::clean_optional,
        jwt::sign_jwt,
    },
};

/// Registers a new user enrolled in 2FA and mails the first OTP.
///
/// Returns 201 Created with `requires_2fa = true`; the token comes from `verify_otp`.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let email = payload.email.trim();

    if users::find_by_email(&state.pool, email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    users::find_team(&state.pool, payload.team_id)
        .await?
        .ok_or(AppError::NotFound("Team not found".to_string()))?;

    let role: Role = payload.role.parse()?;
    if role == Role::Admin {
        return Err(AppError::BadRequest(
            "ADMIN accounts cannot be self-registered".to_string(),
        ));
    }

    let hashed_password = hash_password(&payload.password)?;
    let team_lead_name = clean_optional(payload.team_lead_name.as_deref());
    let description = clean_optional(payload.description.as_deref());

    let id = users::insert(
        &state.pool,
        &NewUser {
            name: payload.name.trim(),
            email,
            password_hash: &hashed_password,
            role: role.as_str(),
            team_id: Some(payload.team_id),
            team_lead_name: team_lead_name.as_deref(),
            description: description.as_deref(),
            using_2fa: true,
        },
    )
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "Email already registered"))?;

    let user = users::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::InternalServerError("Registered user vanished".to_string()))?;

    tracing::info!("Registered user {} ({})", user.id, role);
    send_otp(&state, &user);

    Ok((StatusCode::CREATED, Json(AuthResponse::pending_otp(&user))))
}

/// Checks credentials. Users enrolled in 2FA get an OTP mailed instead of a token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let invalid = || AppError::AuthError("Invalid email or password".to_string());

    let user = users::find_by_email(&state.pool, payload.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password)? {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(invalid());
    }

    if user.using_2fa {
        send_otp(&state, &user);
        return Ok(Json(AuthResponse::pending_otp(&user)));
    }

    Ok(Json(issue_token(&state, &user).await?))
}

/// Exchanges a valid OTP for a JWT. The code is consumed on success.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<OtpVerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let email = payload.email.trim();

    if !state.otp.verify(email, &payload.otp) {
        tracing::warn!("Rejected OTP for: {}", email);
        return Err(AppError::AuthError("Invalid or expired OTP".to_string()));
    }

    let user = users::find_by_email(&state.pool, email)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(issue_token(&state, &user).await?))
}

fn send_otp(state: &AppState, user: &User) {
    let code = state.otp.issue(&user.email);
    mailer::dispatch(
        &state.mailer,
        mailer::otp_message(&user.email, &code, state.config.otp_ttl_minutes),
    );
}

async fn issue_token(state: &AppState, user: &User) -> Result<AuthResponse, AppError> {
    let role: Role = user.role.parse()?;
    let identity = AuthUser {
        id: user.id,
        role,
        team_id: user.team_id,
    };

    let token = sign_jwt(&identity, &state.config.jwt_secret, state.config.jwt_expiration)?;

    let team_name = match user.team_id {
        Some(team_id) => users::find_team(&state.pool, team_id).await?.map(|t| t.name),
        None => None,
    };

    Ok(AuthResponse {
        token: Some(token),
        email: user.email.clone(),
        name: user.name.clone(),
        role: Some(role.as_str().to_string()),
        user_id: Some(user.id),
        team_id: user.team_id,
        team_name,
        requires_2fa: false,
    })
}
