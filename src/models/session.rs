// src/models/session.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{
    question::Question,
    wire::{clamp_percentage, int_bool, timestamp},
};

/// User's answers.
/// Key: Question ID
/// Value: selected option text, byte-exact as displayed
pub type AnswerMap = HashMap<i64, String>;

/// Response of the status check made before an exam can start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStatus {
    pub has_taken_test: bool,
    #[serde(default)]
    pub existing_session_id: Option<String>,
    #[serde(default)]
    pub test_question_count: u32,
    #[serde(default)]
    pub total_available_tests: u32,
}

/// DTO for starting an exam.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct StartSessionRequest {
    #[validate(range(min = 1, message = "At least one question must be requested."))]
    pub num_questions: u32,
}

/// Freshly started exam: the session id and the questions to answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartedSession {
    pub session_id: String,
    pub questions: Vec<Question>,
}

/// DTO for submitting an exam. `question_ids` lists every question shown,
/// so unanswered ones are scored as incorrect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitSessionRequest {
    pub session_id: String,
    pub answers: AnswerMap,
    pub question_ids: Vec<i64>,
}

/// A scored exam attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(alias = "session_id")]
    pub id: String,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub score_percentage: f64,
    #[serde(with = "int_bool")]
    pub passed: bool,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub test_data: Option<SessionDetails>,
}

impl Session {
    /// `correct_answers <= total_questions` and the score lies in `0..=100`.
    pub fn is_consistent(&self) -> bool {
        self.correct_answers <= self.total_questions
            && (0.0..=100.0).contains(&self.score_percentage)
    }

    /// Score used for display; out-of-range values from a misbehaving server are clamped.
    pub fn display_percentage(&self) -> f64 {
        clamp_percentage(self.score_percentage)
    }

    pub fn results(&self) -> &[QuestionResult] {
        self.test_data
            .as_ref()
            .map(|d| d.results.as_slice())
            .unwrap_or_default()
    }
}

/// Per-question breakdown stored with a scored session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetails {
    #[serde(default)]
    pub results: Vec<QuestionResult>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub test_id: i64,
    pub question: String,
    #[serde(default)]
    pub user_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    #[serde(default)]
    pub material_id: Option<i64>,
}

/// History envelope, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistory {
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub total_sessions: u32,
}
