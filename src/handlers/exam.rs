// src/handlers/exam.rs

//! Final exam session state machine.
//!
//! ```text
//! initial --mount(taken)--------------------------> already_taken
//! initial --start--> loading --ok--> testing --submit--> submitted
//!                            \--err--> initial
//! ```
//!
//! `submitted` and `already_taken` are terminal: a new `ExamMachine` is needed to
//! run the flow again.

use std::fmt;

use crate::{
    api::ExamBackend,
    error::ClientError,
    handlers::score::ResultView,
    models::{
        question::Question,
        session::{AnswerMap, Session, SubmitSessionRequest, TestStatus},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamState {
    Initial,
    Loading,
    Testing,
    Submitted,
    AlreadyTaken,
}

impl fmt::Display for ExamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExamState::Initial => "initial",
            ExamState::Loading => "loading",
            ExamState::Testing => "testing",
            ExamState::Submitted => "submitted",
            ExamState::AlreadyTaken => "already_taken",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    /// The user declined to send a partial attempt. Nothing changed.
    Declined,
}

#[derive(Debug)]
pub struct ExamMachine {
    state: ExamState,
    status: Option<TestStatus>,
    session_id: Option<String>,
    questions: Vec<Question>,
    answers: AnswerMap,
    cursor: usize,
    result: Option<Session>,
}

impl Default for ExamMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamMachine {
    pub fn new() -> Self {
        Self {
            state: ExamState::Initial,
            status: None,
            session_id: None,
            questions: Vec::new(),
            answers: AnswerMap::new(),
            cursor: 0,
            result: None,
        }
    }

    pub fn state(&self) -> ExamState {
        self.state
    }

    /// Last status reported by the server, if the check succeeded.
    pub fn status(&self) -> Option<&TestStatus> {
        self.status.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    pub fn selected_answer(&self, question_id: i64) -> Option<&str> {
        self.answers.get(&question_id).map(String::as_str)
    }

    /// The scored session: the fresh result after submit, or the recap when the
    /// exam was already taken (absent if that fetch failed).
    pub fn result(&self) -> Option<&Session> {
        self.result.as_ref()
    }

    pub fn result_view(&self) -> Option<ResultView> {
        self.result.as_ref().map(ResultView::from)
    }

    fn ensure(&self, expected: ExamState, action: &str) -> Result<(), ClientError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ClientError::Validation(format!(
                "Cannot {} while the exam is {}",
                action, self.state
            )))
        }
    }

    fn clear_attempt(&mut self) {
        self.session_id = None;
        self.questions.clear();
        self.answers.clear();
        self.cursor = 0;
    }

    /// Checks whether the user already has an attempt.
    ///
    /// On failure the machine stays in `initial` and the error is returned;
    /// the caller may mount again.
    pub async fn mount<B>(&mut self, api: &B) -> Result<ExamState, ClientError>
    where
        B: ExamBackend + ?Sized,
    {
        self.ensure(ExamState::Initial, "check the exam status")?;

        let status = api.check_status().await.map_err(|e| {
            tracing::warn!("Exam status check failed: {}", e);
            e
        })?;

        let taken = status.has_taken_test;
        let existing = status.existing_session_id.clone();
        self.status = Some(status);

        if taken {
            self.enter_already_taken(api, existing.as_deref()).await;
        }

        Ok(self.state)
    }

    /// Shows the existing attempt. Lands in `already_taken` even when the recap
    /// cannot be fetched, so a completed exam can never be restarted from here.
    async fn enter_already_taken<B>(&mut self, api: &B, session_id: Option<&str>)
    where
        B: ExamBackend + ?Sized,
    {
        self.result = match session_id {
            Some(id) => match api.get_session(id).await {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!("Could not load existing session {}: {}", id, e);
                    None
                }
            },
            None => None,
        };

        self.clear_attempt();
        self.state = ExamState::AlreadyTaken;
    }

    /// Starts a new attempt with `num_questions` questions.
    ///
    /// Never calls the start endpoint when the status already says the exam was
    /// taken. A server-side "already taken" answer routes to the recap instead of
    /// being reported as an error.
    pub async fn start<B>(&mut self, api: &B, num_questions: u32) -> Result<ExamState, ClientError>
    where
        B: ExamBackend + ?Sized,
    {
        self.ensure(ExamState::Initial, "start the exam")?;

        if let Some(status) = self.status.as_ref().filter(|s| s.has_taken_test) {
            let existing = status.existing_session_id.clone();
            self.enter_already_taken(api, existing.as_deref()).await;
            return Ok(self.state);
        }

        self.state = ExamState::Loading;

        match api.start_session(num_questions).await {
            Ok(started) if started.questions.is_empty() => {
                self.clear_attempt();
                self.state = ExamState::Initial;
                Err(ClientError::Validation(
                    "No questions are available yet".to_string(),
                ))
            }
            Ok(started) => {
                self.session_id = Some(started.session_id);
                self.questions = started.questions;
                self.answers.clear();
                self.cursor = 0;
                self.state = ExamState::Testing;
                Ok(self.state)
            }
            // A second attempt is refused with 400 (or 409). A fresh status check
            // tells that refusal apart from a plain bad request.
            Err(e @ (ClientError::AlreadyTaken(_) | ClientError::Validation(_))) => {
                let refreshed = match api.check_status().await {
                    Ok(status) => Some(status),
                    Err(err) => {
                        tracing::warn!("Status refresh after refused start failed: {}", err);
                        None
                    }
                };

                let taken = matches!(e, ClientError::AlreadyTaken(_))
                    || refreshed.as_ref().is_some_and(|s| s.has_taken_test);
                let existing = refreshed
                    .as_ref()
                    .and_then(|s| s.existing_session_id.clone());
                if let Some(status) = refreshed {
                    self.status = Some(status);
                }

                if taken {
                    tracing::info!("Start refused, exam already taken: {}", e);
                    self.enter_already_taken(api, existing.as_deref()).await;
                    Ok(self.state)
                } else {
                    self.clear_attempt();
                    self.state = ExamState::Initial;
                    Err(e)
                }
            }
            Err(e) => {
                self.clear_attempt();
                self.state = ExamState::Initial;
                Err(e)
            }
        }
    }

    /// Records `option` as the answer to `question_id`. Other answers are untouched.
    pub fn select_answer(
        &mut self,
        question_id: i64,
        option: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.ensure(ExamState::Testing, "answer")?;
        let option = option.into();

        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| {
                ClientError::Validation(format!("Question {} is not part of this exam", question_id))
            })?;

        if !question.has_option(&option) {
            return Err(ClientError::Validation(format!(
                "'{}' is not an option of question {}",
                option, question_id
            )));
        }

        self.answers.insert(question_id, option);
        Ok(())
    }

    /// Moves to the next question. Returns `false` at the last one.
    pub fn next(&mut self) -> bool {
        self.jump_to(self.cursor + 1)
    }

    /// Moves to the previous question. Returns `false` at the first one.
    pub fn prev(&mut self) -> bool {
        match self.cursor.checked_sub(1) {
            Some(index) => self.jump_to(index),
            None => false,
        }
    }

    /// Moves to `index`. Out-of-range indices are ignored.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if self.state != ExamState::Testing || index >= self.questions.len() {
            return false;
        }
        self.cursor = index;
        true
    }

    /// Snapshot of what would be sent on submit.
    ///
    /// With fewer answers than questions, `confirm(answered, total)` decides;
    /// `Ok(None)` means the user declined. The snapshot carries every question id
    /// shown, answered or not.
    pub fn prepare_submission<F>(&self, confirm: F) -> Result<Option<SubmitSessionRequest>, ClientError>
    where
        F: FnOnce(usize, usize) -> bool,
    {
        self.ensure(ExamState::Testing, "submit")?;

        let session_id = self
            .session_id
            .clone()
            .ok_or_else(|| ClientError::Validation("No active session".to_string()))?;

        let answered = self.answers.len();
        let total = self.questions.len();
        if answered < total && !confirm(answered, total) {
            return Ok(None);
        }

        Ok(Some(SubmitSessionRequest {
            session_id,
            answers: self.answers.clone(),
            question_ids: self.questions.iter().map(|q| q.id).collect(),
        }))
    }

    /// Applies the server's answer to a submission made from `prepare_submission`.
    ///
    /// A response for a session this machine is no longer testing is discarded.
    /// An auth failure discards the attempt; any other failure keeps the answers
    /// so the user can retry.
    pub fn apply_submission(
        &mut self,
        submission: &SubmitSessionRequest,
        outcome: Result<Session, ClientError>,
    ) -> Result<ExamState, ClientError> {
        let current = self.state == ExamState::Testing
            && self.session_id.as_deref() == Some(submission.session_id.as_str());
        if !current {
            tracing::warn!(
                "Discarding submit response for session {} (machine is {})",
                submission.session_id,
                self.state
            );
            return Ok(self.state);
        }

        match outcome {
            Ok(session) => {
                if session.id != submission.session_id {
                    tracing::warn!(
                        "Submit for {} answered with session {}",
                        submission.session_id,
                        session.id
                    );
                }
                self.answers.clear();
                self.result = Some(session);
                self.state = ExamState::Submitted;
                Ok(self.state)
            }
            Err(e @ ClientError::Auth(_)) => {
                tracing::warn!("Credential rejected on submit; discarding answers");
                self.clear_attempt();
                self.state = ExamState::Initial;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Prepares, sends and applies a submission in one go.
    pub async fn submit<B, F>(&mut self, api: &B, confirm: F) -> Result<SubmitOutcome, ClientError>
    where
        B: ExamBackend + ?Sized,
        F: FnOnce(usize, usize) -> bool,
    {
        let Some(submission) = self.prepare_submission(confirm)? else {
            return Ok(SubmitOutcome::Declined);
        };

        let outcome = api.submit_session(&submission).await;
        self.apply_submission(&submission, outcome)?;
        Ok(SubmitOutcome::Submitted)
    }
}

/// Past attempts, newest first, ready for display. Available in any exam state.
pub async fn load_history<B>(api: &B, limit: u32) -> Result<Vec<ResultView>, ClientError>
where
    B: ExamBackend + ?Sized,
{
    let sessions = api.history(limit).await?;
    Ok(sessions.iter().map(ResultView::from).collect())
}
