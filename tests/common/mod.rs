// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assessment_platform::{
    config::{AnswerKeySecret, Config, ReleaseMode},
    db,
    models::user::{AuthUser, Role},
    repositories::{
        assessments::{self, NewTest},
        users::{self, NewUser},
    },
    routes,
    services::mailer::{MailMessage, Mailer, SharedMailer},
    state::AppState,
    utils::{hash::hash_password, jwt::sign_jwt},
};
use async_trait::async_trait;
use sqlx::SqlitePool;

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";
pub const ANSWER_KEY: &str = "letmein";
pub const PASSWORD: &str = "password123";

/// Team ids seeded by `db::seed_teams`.
pub const DEV_TEAM: i64 = 1;
pub const DATA_TEAM: i64 = 3;

/// Keeps every message instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        message: &MailMessage,
    ) -> Result<(), assessment_platform::error::AppError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Mail is dispatched on background tasks, so poll until `count` messages
    /// to `to` have arrived.
    pub async fn wait_for(&self, to: &str, count: usize) -> Vec<MailMessage> {
        for _ in 0..100 {
            let matching: Vec<_> = self.sent().into_iter().filter(|m| m.to == to).collect();
            if matching.len() >= count {
                return matching;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {} mail(s) to {}, got {:?}", count, to, self.sent());
    }
}

/// Rejects every message, like a relay that is down.
#[derive(Default)]
pub struct FailingMailer {
    attempts: AtomicUsize,
}

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(
        &self,
        _message: &MailMessage,
    ) -> Result<(), assessment_platform::error::AppError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(assessment_platform::error::AppError::InternalServerError(
            "mail relay unavailable".to_string(),
        ))
    }
}

impl FailingMailer {
    /// Polls until at least `count` deliveries have been attempted.
    pub async fn wait_for_attempts(&self, count: usize) {
        for _ in 0..100 {
            if self.attempts.load(Ordering::SeqCst) >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "expected {} delivery attempt(s), got {}",
            count,
            self.attempts.load(Ordering::SeqCst)
        );
    }
}

pub fn test_config(release_mode: ReleaseMode) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        admin_email: None,
        admin_password: None,
        otp_ttl_minutes: 5,
        release_mode,
        answer_key_secret: AnswerKeySecret::new(Some(ANSWER_KEY.to_string())),
        mail_from: "no-reply@test.local".to_string(),
        mail_relay_url: None,
        mail_relay_token: None,
        ai_api_key: None,
        ai_base_url: "http://127.0.0.1:9".to_string(),
        ai_model: "test-model".to_string(),
    }
}

pub struct TestApp {
    pub pool: SqlitePool,
    pub mailer: Arc<RecordingMailer>,
    pub state: AppState,
}

impl TestApp {
    pub fn shared_mailer(&self) -> SharedMailer {
        self.mailer.clone()
    }
}

/// Fresh in-memory database, migrated, with the default teams.
pub async fn setup(release_mode: ReleaseMode) -> TestApp {
    let pool = db::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to migrate database");
    db::seed_teams(&pool).await.expect("Failed to seed teams");

    let mailer = Arc::new(RecordingMailer::default());
    let shared: SharedMailer = mailer.clone();
    let state = AppState::new(pool.clone(), test_config(release_mode), shared, None);

    TestApp {
        pool,
        mailer,
        state,
    }
}

/// Binds the router to a random port and returns its base URL.
pub async fn spawn_app(state: AppState) -> String {
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

/// Inserts a user directly, not enrolled in 2FA.
pub async fn create_user(pool: &SqlitePool, email: &str, role: Role, team_id: Option<i64>) -> AuthUser {
    let hashed = hash_password(PASSWORD).unwrap();
    let id = users::insert(
        pool,
        &NewUser {
            name: email.split('@').next().unwrap(),
            email,
            password_hash: &hashed,
            role: role.as_str(),
            team_id,
            team_lead_name: None,
            description: None,
            using_2fa: false,
        },
    )
    .await
    .unwrap();

    AuthUser { id, role, team_id }
}

/// A fresh address for tests that only need some unregistered email.
pub fn unique_email() -> String {
    format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8])
}

pub fn token_for(user: &AuthUser) -> String {
    sign_jwt(user, JWT_SECRET, 600).unwrap()
}

/// Ids of the two-question scenario test: one single-correct question (A) and
/// one multi-correct question (B and C).
#[derive(Debug, Clone, Copy)]
pub struct Quiz {
    pub test_id: i64,
    pub q1: i64,
    pub a: i64,
    pub d: i64,
    pub q2: i64,
    pub b: i64,
    pub c: i64,
    pub e: i64,
}

pub async fn create_quiz(
    pool: &SqlitePool,
    title: &str,
    creator: &AuthUser,
    team_id: i64,
    role: Role,
) -> Quiz {
    let mut conn = pool.acquire().await.unwrap();

    let test_id = assessments::insert_test(
        &mut conn,
        &NewTest {
            title,
            description: Some("scenario"),
            time_limit_minutes: 30,
            assigned_role: role.as_str(),
            assigned_team_id: team_id,
            created_by: creator.id,
        },
    )
    .await
    .unwrap();

    let q1 = assessments::insert_question(&mut conn, test_id, "Pick A").await.unwrap();
    let a = assessments::insert_option(&mut conn, q1, "A", true).await.unwrap();
    let d = assessments::insert_option(&mut conn, q1, "D", false).await.unwrap();

    let q2 = assessments::insert_question(&mut conn, test_id, "Pick B and C").await.unwrap();
    let b = assessments::insert_option(&mut conn, q2, "B", true).await.unwrap();
    let c = assessments::insert_option(&mut conn, q2, "C", true).await.unwrap();
    let e = assessments::insert_option(&mut conn, q2, "E", false).await.unwrap();

    Quiz {
        test_id,
        q1,
        a,
        d,
        q2,
        b,
        c,
        e,
    }
}

pub fn answers(picks: &[(i64, &[i64])]) -> serde_json::Value {
    serde_json::json!({
        "start_time": "2024-05-01T10:00:00.000Z",
        "answers": picks
            .iter()
            .map(|(question_id, selected)| serde_json::json!({
                "question_id": question_id,
                "selected_option_ids": selected,
            }))
            .collect::<Vec<_>>(),
    })
}

pub fn submit_request(picks: &[(i64, &[i64])]) -> assessment_platform::models::submission::SubmitTestRequest {
    serde_json::from_value(answers(picks)).unwrap()
}
