use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::submission::SubmissionDetail,
    repositories::{assessments, submissions},
    services::grading,
};

pub const SCORES_CSV_HEADER: &str =
    "Serial No.,User ID,User Name,Email,Role,Team,Score,Total Questions,Accuracy %,Submission Date";

/// Scores of every submission on a test as UTF-8 CSV bytes.
pub async fn export_scores(pool: &SqlitePool, test_id: i64) -> Result<Vec<u8>, AppError> {
    assessments::find_by_id(pool, test_id)
        .await?
        .ok_or_else(AppError::test_not_found)?;

    let taken = submissions::list_for_test(pool, test_id).await?;
    tracing::info!("Exporting {} scores for test {}", taken.len(), test_id);

    Ok(scores_csv(&taken).into_bytes())
}

/// One row per submission. Totals come from the submission itself, so the
/// export still works after release has purged the questions.
pub fn scores_csv(taken: &[SubmissionDetail]) -> String {
    let mut csv = String::from(SCORES_CSV_HEADER);
    csv.push('\n');

    for (index, submission) in taken.iter().enumerate() {
        let accuracy = grading::score_percent(submission.score(), submission.total_marks());
        let submitted_at = submission
            .end_time
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
            .unwrap_or_default();

        let row = [
            (index + 1).to_string(),
            submission.user_id.to_string(),
            escape_csv(&submission.user_name),
            escape_csv(&submission.user_email),
            escape_csv(&submission.user_role),
            escape_csv(submission.team_name.as_deref().unwrap_or("N/A")),
            submission.score().to_string(),
            submission.total_marks().to_string(),
            format!("{:.2}", accuracy),
            submitted_at,
        ];
        csv.push_str(&row.join(","));
        csv.push('\n');
    }

    csv
}

fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
