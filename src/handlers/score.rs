// src/handlers/score.rs

use std::fmt;

use crate::models::session::{QuestionResult, Session};

/// Presentation tier of a score. The same bands apply wherever a score is shown
/// (result screen, history list, already-taken recap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Top,
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            ScoreBand::Top
        } else if percentage >= 60.0 {
            ScoreBand::Good
        } else if percentage >= 40.0 {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            ScoreBand::Top => "#52c41a",
            ScoreBand::Good => "#1890ff",
            ScoreBand::Fair => "#faad14",
            ScoreBand::Poor => "#f5222d",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Top => "Excellent",
            ScoreBand::Good => "Good",
            ScoreBand::Fair => "Satisfactory",
            ScoreBand::Poor => "Unsatisfactory",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything a result screen needs about one scored session.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub session_id: String,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub score_percentage: f64,
    pub band: ScoreBand,
    pub passed: bool,
    /// Certificate action is offered only for passed sessions.
    pub show_certificate: bool,
    pub breakdown: Vec<QuestionResult>,
}

impl From<&Session> for ResultView {
    fn from(session: &Session) -> Self {
        let percentage = session.display_percentage();
        ResultView {
            session_id: session.id.clone(),
            correct_answers: session.correct_answers,
            total_questions: session.total_questions,
            score_percentage: percentage,
            band: ScoreBand::from_percentage(percentage),
            passed: session.passed,
            show_certificate: session.passed,
            breakdown: session.results().to_vec(),
        }
    }
}

impl ResultView {
    /// One-line summary, e.g. `27/30 correct, 90% (Excellent)`.
    pub fn summary(&self) -> String {
        format!(
            "{}/{} correct, {}% ({})",
            self.correct_answers,
            self.total_questions,
            format_percentage(self.score_percentage),
            self.band
        )
    }
}

/// Integers print without decimals; fractions keep up to two.
pub fn format_percentage(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        let s = format!("{:.2}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
