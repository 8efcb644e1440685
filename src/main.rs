// src/main.rs

use std::net::SocketAddr;
use std::time::Duration;

use assessment_platform::config::{Config, OTP_SWEEP_INTERVAL_SECS};
use assessment_platform::services::{mailer, question_gen};
use assessment_platform::state::AppState;
use assessment_platform::{db, routes};
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match db::connect(&config.database_url).await {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to open database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    if let Err(e) = db::seed_teams(&pool).await {
        tracing::error!("Failed to seed teams: {:?}", e);
    }

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        if let Err(e) = db::seed_admin_user(&pool, email, password).await {
            tracing::error!("Failed to seed admin user: {:?}", e);
        }
    }

    let mailer = mailer::from_config(&config).expect("Failed to build mailer");
    let generator = question_gen::from_config(&config).expect("Failed to build AI client");
    if generator.is_none() {
        tracing::warn!("AI_API_KEY not set, question generation is disabled");
    }

    let state = AppState::new(pool, config.clone(), mailer, generator);

    // Expiry is still checked on verify; this only frees memory.
    state
        .otp
        .spawn_sweeper(Duration::from_secs(OTP_SWEEP_INTERVAL_SECS));

    let app = routes::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    axum::serve(listener, app).await.unwrap();
}
