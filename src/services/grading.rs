// src/services/grading.rs

// Per-question pass/fail decision.
//
// A single rule covers single- and multi-correct questions: the selection must
// equal the correct-option set. A question with no correct option can never be
// satisfied.

use std::collections::HashSet;

use crate::config::PASSING_SCORE_PERCENTAGE;

/// True iff `correct` is non-empty and the distinct selections are exactly `correct`.
pub fn is_correct(correct: &HashSet<i64>, selected: &[i64]) -> bool {
    if correct.is_empty() {
        return false;
    }

    let distinct: HashSet<i64> = selected.iter().copied().collect();
    distinct.len() == correct.len() && distinct.iter().all(|id| correct.contains(id))
}

/// `score / total_marks * 100`, or 0 for a test with no questions.
pub fn score_percent(score: i64, total_marks: i64) -> f64 {
    if total_marks > 0 {
        score as f64 / total_marks as f64 * 100.0
    } else {
        0.0
    }
}

pub fn is_pass(percent: f64) -> bool {
    percent >= PASSING_SCORE_PERCENTAGE
}
