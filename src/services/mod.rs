pub mod answer_key;
pub mod export;
pub mod grading;
pub mod lifecycle;
pub mod mailer;
pub mod otp;
pub mod question_gen;
pub mod release;
pub mod submission;
