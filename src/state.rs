use std::time::Duration;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::services::{mailer::SharedMailer, otp::OtpStore, question_gen::SharedGenerator};

/// Shared application state. Every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub otp: OtpStore,
    pub mailer: SharedMailer,
    /// `None` when no text-generation API key is configured.
    pub generator: Option<SharedGenerator>,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        config: Config,
        mailer: SharedMailer,
        generator: Option<SharedGenerator>,
    ) -> Self {
        let otp = OtpStore::new(Duration::from_secs(config.otp_ttl_minutes * 60));
        Self {
            pool,
            config,
            otp,
            mailer,
            generator,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
