// src/api/test_sessions.rs

use async_trait::async_trait;
use validator::Validate;

use super::{Access, ApiClient, CertificateBackend, CertificateFile, ExamBackend};
use crate::{
    error::ClientError,
    models::session::{
        Session, SessionHistory, StartSessionRequest, StartedSession, SubmitSessionRequest,
        TestStatus,
    },
    routes,
    utils::disposition::filename_from_header,
};

#[async_trait]
impl ExamBackend for ApiClient {
    /// Whether the user already took the exam, and how many questions it will have.
    async fn check_status(&self) -> Result<TestStatus, ClientError> {
        self.get_json(routes::SESSION_STATUS, Access::Authenticated)
            .await
    }

    /// Starts a new attempt. The server may clamp `num_questions` to its pool size.
    ///
    /// A user with a completed attempt is refused. The backend answers 400
    /// (`Validation`); a 409 surfaces as `ClientError::AlreadyTaken`. Callers
    /// must not retry either and should re-check the status.
    async fn start_session(&self, num_questions: u32) -> Result<StartedSession, ClientError> {
        let request = StartSessionRequest { num_questions };
        request
            .validate()
            .map_err(|e| ClientError::Validation(e.to_string()))?;

        let started: StartedSession = self
            .post_json(routes::SESSION_START, &request, Access::Authenticated)
            .await?;

        tracing::info!(
            "Exam session {} started with {} questions",
            started.session_id,
            started.questions.len()
        );
        Ok(started)
    }

    async fn submit_session(
        &self,
        request: &SubmitSessionRequest,
    ) -> Result<Session, ClientError> {
        if request.session_id.trim().is_empty() {
            return Err(ClientError::Validation("Missing session id".to_string()));
        }

        let session: Session = self
            .post_json(routes::SESSION_SUBMIT, request, Access::Authenticated)
            .await?;

        if !session.is_consistent() {
            tracing::warn!(
                "Session {} reported {}/{} at {}%",
                session.id,
                session.correct_answers,
                session.total_questions,
                session.score_percentage
            );
        }
        Ok(session)
    }

    async fn history(&self, limit: u32) -> Result<Vec<Session>, ClientError> {
        if limit == 0 {
            return Err(ClientError::Validation(
                "History limit must be at least 1".to_string(),
            ));
        }

        let history: SessionHistory = self
            .get_json(&routes::session_history(limit), Access::Authenticated)
            .await?;

        let mut sessions = history.sessions;
        sessions.truncate(limit as usize);
        Ok(sessions)
    }

    async fn get_session(&self, session_id: &str) -> Result<Session, ClientError> {
        self.get_json(&routes::session(session_id), Access::Authenticated)
            .await
    }
}

#[async_trait]
impl CertificateBackend for ApiClient {
    /// Downloads the certificate PDF with the credential in the `Authorization`
    /// header, never in the URL.
    async fn download_certificate(
        &self,
        session_id: &str,
    ) -> Result<CertificateFile, ClientError> {
        let (bytes, disposition) = self.get_bytes(&routes::certificate(session_id)).await?;

        if bytes.is_empty() {
            return Err(ClientError::Network(
                "Certificate download returned an empty body".to_string(),
            ));
        }

        Ok(CertificateFile {
            suggested_name: disposition.as_deref().and_then(filename_from_header),
            bytes,
        })
    }
}
