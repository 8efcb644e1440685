// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

/// Percentage at or above which a submission counts as passed.
pub const PASSING_SCORE_PERCENTAGE: f64 = 60.0;

/// Authoring limits for a single test.
pub const MAX_QUESTIONS_PER_TEST: usize = 50;
pub const MAX_OPTIONS_PER_QUESTION: usize = 6;

/// Upper bound on questions requested from the text-generation API.
pub const MAX_GENERATED_QUESTIONS: usize = 15;

/// How often expired OTP entries are swept out of memory.
pub const OTP_SWEEP_INTERVAL_SECS: u64 = 60;

/// What happens to per-question detail when results are released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseMode {
    /// Store pass-rate/average statistics and purge questions and answers.
    #[default]
    Aggregate,
    /// Mail every submitter their full answer breakdown and keep the detail.
    AnswerKey,
}

impl FromStr for ReleaseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aggregate" => Ok(ReleaseMode::Aggregate),
            "answer_key" | "answer-key" => Ok(ReleaseMode::AnswerKey),
            other => Err(format!("unknown release mode '{}'", other)),
        }
    }
}

/// Deployment-held secret guarding the answer-key endpoint.
///
/// `Debug` never prints the value. An unset secret rejects every request.
#[derive(Clone, Default)]
pub struct AnswerKeySecret(Option<SecretString>);

impl AnswerKeySecret {
    pub fn new(secret: Option<String>) -> Self {
        Self(
            secret
                .filter(|s| !s.trim().is_empty())
                .map(SecretString::from),
        )
    }

    /// Compares without short-circuiting on the first differing byte.
    /// Slices of different length compare unequal without an early exit.
    pub fn verify(&self, provided: &str) -> bool {
        match &self.0 {
            Some(secret) => secret
                .expose_secret()
                .as_bytes()
                .ct_eq(provided.as_bytes())
                .into(),
            None => false,
        }
    }
}

impl std::fmt::Debug for AnswerKeySecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(_) => write!(f, "AnswerKeySecret([REDACTED])"),
            None => write!(f, "AnswerKeySecret(None)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,

    pub admin_email: Option<String>,
    pub admin_password: Option<String>,

    pub otp_ttl_minutes: u64,
    pub release_mode: ReleaseMode,
    pub answer_key_secret: AnswerKeySecret,

    pub mail_from: String,
    pub mail_relay_url: Option<String>,
    pub mail_relay_token: Option<String>,

    pub ai_api_key: Option<String>,
    pub ai_base_url: String,
    pub ai_model: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = parse_or("JWT_EXPIRATION", 86_400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let release_mode = match env::var("RELEASE_MODE") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, falling back to aggregate", e);
                ReleaseMode::Aggregate
            }),
            Err(_) => ReleaseMode::Aggregate,
        };

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port: parse_or("PORT", 3000),
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
            otp_ttl_minutes: parse_or("OTP_TTL_MINUTES", 5),
            release_mode,
            answer_key_secret: AnswerKeySecret::new(optional("ANSWER_KEY_SECRET")),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@assessment.local".to_string()),
            mail_relay_url: optional("MAIL_RELAY_URL"),
            mail_relay_token: optional("MAIL_RELAY_TOKEN"),
            ai_api_key: optional("AI_API_KEY"),
            ai_base_url: env::var("AI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1".to_string()),
            ai_model: env::var("AI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
