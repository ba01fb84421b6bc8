// src/models/progress.rs

use serde::{Deserialize, Deserializer, Serialize};

use super::{
    session::AnswerMap,
    wire::{clamp_percentage, int_bool},
};

/// Server-computed completion summary for one material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub material_id: i64,
    #[serde(default, deserialize_with = "lenient_percentage")]
    pub percentage: f64,
    #[serde(default)]
    pub completed_tests: u32,
    #[serde(default)]
    pub total_tests: u32,
    #[serde(default)]
    pub pdf_completed: bool,
    #[serde(default)]
    pub pdf_attachment_id: Option<String>,
    #[serde(default)]
    pub video_completed: bool,
    #[serde(default)]
    pub video_attachment_id: Option<String>,
    #[serde(default)]
    pub test_progress: Vec<TestProgress>,
    /// Whether the material's practice test has been submitted once.
    /// Read as-is; never inferred from the counts above.
    #[serde(default)]
    pub test_submitted: bool,
}

impl ProgressRecord {
    /// Progress of a material nothing has been recorded for.
    pub fn empty(material_id: i64) -> Self {
        Self {
            material_id,
            percentage: 0.0,
            completed_tests: 0,
            total_tests: 0,
            pdf_completed: false,
            pdf_attachment_id: None,
            video_completed: false,
            video_attachment_id: None,
            test_progress: Vec::new(),
            test_submitted: false,
        }
    }

    /// Whole-number percentage for progress bars.
    pub fn rounded_percentage(&self) -> u8 {
        clamp_percentage(self.percentage).round() as u8
    }

    /// `completed/total` text for the tests line; `0/0` when the material has no tests.
    pub fn tests_label(&self) -> String {
        format!(
            "{}/{}",
            self.completed_tests.min(self.total_tests),
            self.total_tests
        )
    }

    pub fn is_test_completed(&self, test_id: i64) -> bool {
        self.test_progress
            .iter()
            .any(|t| t.test_id == test_id && t.completed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestProgress {
    pub test_id: i64,
    pub completed: bool,
}

/// `null`, missing and non-finite percentages all decode as 0.
fn lenient_percentage<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<f64> = Option::deserialize(deserializer)?;
    Ok(raw.map(clamp_percentage).unwrap_or(0.0))
}

/// DTO for marking an attachment (or a single test) as completed.
/// The user is taken from the credential, never from the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkCompleteRequest {
    pub attachment_id: Option<String>,
    pub test_id: Option<i64>,
}

/// Progress entry returned after a completion mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub test_id: Option<i64>,
    #[serde(default, with = "int_bool")]
    pub is_completed: bool,
}

/// DTO for submitting a material's practice test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitMaterialTestRequest {
    pub material_id: i64,
    pub answers: AnswerMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialTestResult {
    pub correct_count: u32,
    pub total_tests: u32,
    #[serde(default)]
    pub results: Vec<MaterialTestAnswer>,
}

impl MaterialTestResult {
    /// Share of correct answers in percent; 0 when the material had no tests.
    pub fn percentage(&self) -> f64 {
        if self.total_tests == 0 {
            return 0.0;
        }
        clamp_percentage(f64::from(self.correct_count) / f64::from(self.total_tests) * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialTestAnswer {
    pub test_id: i64,
    pub question: String,
    #[serde(default)]
    pub user_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
}
