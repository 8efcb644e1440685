// src/models/user.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::AppError;

/// Enumerated user roles.
/// ADMIN, TL (team lead) and TR (team representative) are staff; the rest take tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Tl,
    Tr,
    Trainee,
    Intern,
    Ppo,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Tl => "TL",
            Role::Tr => "TR",
            Role::Trainee => "TRAINEE",
            Role::Intern => "INTERN",
            Role::Ppo => "PPO",
        }
    }

    /// Roles allowed onto the administrative routes.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Tl | Role::Tr)
    }

    /// Staff roles whose listings are restricted to their own team.
    pub fn is_team_scoped(&self) -> bool {
        matches!(self, Role::Tl | Role::Tr)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; an unknown value is a `BadRequest`.
impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "TL" => Ok(Role::Tl),
            "TR" => Ok(Role::Tr),
            "TRAINEE" => Ok(Role::Trainee),
            "INTERN" => Ok(Role::Intern),
            "PPO" => Ok(Role::Ppo),
            _ => Err(AppError::BadRequest(format!("Invalid role: {}", s))),
        }
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,

    /// Unique login identity, also the OTP key.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub role: String,
    pub team_id: Option<i64>,
    pub team_lead_name: Option<String>,
    pub description: Option<String>,

    /// Whether login must pass the OTP gate.
    pub using_2fa: bool,

    pub created_at: Option<chrono::NaiveDateTime>,
}

/// The authenticated caller, passed explicitly into every core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
    pub team_id: Option<i64>,
}

/// User row joined with its team name, for listings.
#[derive(Debug, Serialize, FromRow)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
    pub team_lead_name: Option<String>,
    pub description: Option<String>,
    pub using_2fa: bool,
    pub created_at: Option<chrono::NaiveDateTime>,
}

/// DTO for self-registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub password: String,
    pub team_id: i64,
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
    #[validate(length(max = 100))]
    pub team_lead_name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for completing login/registration with the mailed code.
#[derive(Debug, Deserialize, Validate)]
pub struct OtpVerifyRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "OTP is required"))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangeRoleRequest {
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
}

/// Returned by register/login/verify. `token` is present only once the OTP gate is passed.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: Option<String>,
    pub email: String,
    pub name: String,
    pub role: Option<String>,
    pub user_id: Option<i64>,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
    pub requires_2fa: bool,
}

impl AuthResponse {
    pub fn pending_otp(user: &User) -> Self {
        Self {
            token: None,
            email: user.email.clone(),
            name: user.name.clone(),
            role: None,
            user_id: None,
            team_id: None,
            team_name: None,
            requires_2fa: true,
        }
    }
}
