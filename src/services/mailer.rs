// src/services/mailer.rs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::{config::Config, error::AppError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), AppError>;
}

pub type SharedMailer = Arc<dyn Mailer>;

/// Hands the message to a background task and returns immediately.
pub fn dispatch(mailer: &SharedMailer, message: MailMessage) {
    let mailer = Arc::clone(mailer);
    tokio::spawn(async move {
        match mailer.send(&message).await {
            Ok(()) => tracing::info!("Email '{}' sent to: {}", message.subject, message.to),
            Err(e) => tracing::error!(
                "Failed to send email '{}' to {}: {}",
                message.subject,
                message.to,
                e
            ),
        }
    });
}

/// Picks the relay mailer when a relay URL is configured, else logs mail only.
pub fn from_config(config: &Config) -> Result<SharedMailer, AppError> {
    match &config.mail_relay_url {
        Some(url) => Ok(Arc::new(HttpRelayMailer::new(
            url.clone(),
            config.mail_relay_token.clone(),
            config.mail_from.clone(),
        )?)),
        None => {
            tracing::warn!("MAIL_RELAY_URL not set, outbound email will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), AppError> {
        tracing::info!(to = %message.to, subject = %message.subject, "mail not delivered (log mailer)");
        Ok(())
    }
}

/// Posts `{from, to, subject, text}` as JSON to an HTTP mail relay.
#[derive(Debug, Clone)]
pub struct HttpRelayMailer {
    client: Client,
    url: String,
    token: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpRelayMailer {
    pub fn new(url: String, token: Option<String>, from: String) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(Self {
            client,
            url,
            token,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpRelayMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), AppError> {
        let mut request = self.client.post(&self.url).json(&RelayPayload {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::InternalServerError(format!(
                "mail relay responded with {}",
                response.status()
            )));
        }
        Ok(())
    }
}

pub fn otp_message(to: &str, code: &str, ttl_minutes: u64) -> MailMessage {
    MailMessage {
        to: to.to_owned(),
        subject: "Assessment Platform - OTP Verification".to_string(),
        body: format!(
            "Your OTP code is: {}\n\nThis code will expire in {} minutes.\n\nDo not share this code with anyone.",
            code, ttl_minutes
        ),
    }
}

pub fn result_message(
    to: &str,
    user_name: &str,
    test_title: &str,
    score: i64,
    total_marks: i64,
) -> MailMessage {
    MailMessage {
        to: to.to_owned(),
        subject: format!("Assessment Platform - Test Results: {}", test_title),
        body: format!(
            "Dear {},\n\nYour results for \"{}\" have been released.\n\nScore: {} / {}\n\nRegards,\nAssessment Platform",
            user_name, test_title, score, total_marks
        ),
    }
}

/// One line pair per question: what was chosen and what was right.
pub fn answer_key_message(
    to: &str,
    user_name: &str,
    test_title: &str,
    score: i64,
    total_marks: i64,
    breakdown: &[crate::models::submission::AnswerResponse],
) -> MailMessage {
    let mut lines = String::new();
    for (index, answer) in breakdown.iter().enumerate() {
        let selected = if answer.selected_option_texts.is_empty() {
            "Not Answered".to_string()
        } else {
            answer.selected_option_texts.join(", ")
        };
        lines.push_str(&format!(
            "{}. {}\n   Your answer: {}\n   Correct answer: {}\n   Result: {}\n\n",
            index + 1,
            answer.question_text,
            selected,
            answer.correct_option_texts.join(", "),
            if answer.is_correct { "Correct" } else { "Incorrect" }
        ));
    }

    MailMessage {
        to: to.to_owned(),
        subject: format!("Assessment Platform - Answer Key: {}", test_title),
        body: format!(
            "Dear {},\n\nYour results for \"{}\" have been released.\n\nScore: {} / {}\n\n{}Regards,\nAssessment Platform",
            user_name, test_title, score, total_marks, lines
        ),
    }
}
