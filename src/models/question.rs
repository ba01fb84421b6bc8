// src/models/question.rs

use serde::{Deserialize, Serialize};

/// A question as served to the exam taker (no correct answer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The text content of the question.
    pub question: String,

    /// Options in display order. The selected option's exact text is the answer.
    pub options: Vec<String>,
}

impl Question {
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// A practice test attached to a material, as returned by the catalogue endpoints.
///
/// `correct_answer` is present only on admin-facing payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: i64,
    #[serde(default)]
    pub material_id: Option<i64>,
    pub question: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

impl From<Test> for Question {
    fn from(test: Test) -> Self {
        Question {
            id: test.id,
            question: test.question,
            options: test.options,
        }
    }
}
