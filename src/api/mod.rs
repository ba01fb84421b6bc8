// src/api/mod.rs

//! HTTP transport to the lesson backend.
//!
//! `ApiClient` owns the `reqwest::Client` (fixed timeout) and the shared
//! [`AuthState`]. Handlers talk to it through the backend traits below so they can
//! be driven by in-memory doubles in tests.

pub mod auth;
pub mod catalogue;
pub mod progress;
pub mod test_sessions;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, header};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use crate::{
    config::Config,
    error::ClientError,
    models::{
        material::Material,
        progress::{
            CompletionEntry, MarkCompleteRequest, MaterialTestResult, ProgressRecord,
            SubmitMaterialTestRequest,
        },
        question::Test,
        session::{Session, StartedSession, SubmitSessionRequest, TestStatus},
    },
    state::AuthState,
};

/// Final exam session endpoints.
#[async_trait]
pub trait ExamBackend: Send + Sync {
    async fn check_status(&self) -> Result<TestStatus, ClientError>;

    async fn start_session(&self, num_questions: u32) -> Result<StartedSession, ClientError>;

    async fn submit_session(&self, request: &SubmitSessionRequest)
    -> Result<Session, ClientError>;

    /// Newest first, at most `limit` entries.
    async fn history(&self, limit: u32) -> Result<Vec<Session>, ClientError>;

    async fn get_session(&self, session_id: &str) -> Result<Session, ClientError>;
}

/// Certificate download on top of the session endpoints.
#[async_trait]
pub trait CertificateBackend: ExamBackend {
    async fn download_certificate(&self, session_id: &str)
    -> Result<CertificateFile, ClientError>;
}

/// Per-material progress endpoints.
#[async_trait]
pub trait ProgressBackend: Send + Sync {
    async fn material_progress(&self, material_id: i64) -> Result<ProgressRecord, ClientError>;

    async fn mark_complete(
        &self,
        request: &MarkCompleteRequest,
    ) -> Result<CompletionEntry, ClientError>;
}

/// Material catalogue and the per-material practice test.
#[async_trait]
pub trait MaterialBackend: ProgressBackend {
    async fn material(&self, material_id: i64) -> Result<Material, ClientError>;

    async fn tests_by_material(&self, material_id: i64) -> Result<Vec<Test>, ClientError>;

    async fn submit_material_test(
        &self,
        request: &SubmitMaterialTestRequest,
    ) -> Result<MaterialTestResult, ClientError>;
}

/// A downloaded certificate document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateFile {
    /// Server-suggested name when one was sent.
    pub suggested_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Whether a request carries the bearer credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Public,
    Authenticated,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    auth: AuthState,
}

impl ApiClient {
    pub fn new(config: &Config, auth: AuthState) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            auth,
        })
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Validation(format!("Invalid path '{}': {}", path, e)))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self.url(path)?;
        tracing::debug!("{} {}", method, url);
        Ok(self
            .http
            .request(method, url)
            .header(header::ACCEPT, "application/json"))
    }

    /// Sends the request and turns any non-2xx status into a `ClientError`.
    ///
    /// The credential is checked for expiry before sending. A 401 on an
    /// authenticated call clears the credential it was sent with.
    async fn send(&self, builder: RequestBuilder, access: Access) -> Result<Response, ClientError> {
        let (builder, sent_token) = match access {
            Access::Public => (builder, None),
            Access::Authenticated => {
                let token = self.auth.bearer()?;
                (builder.bearer_auth(&token), Some(token))
            }
        };

        let response = builder.send().await.map_err(|e| {
            tracing::warn!("Request failed: {}", e);
            ClientError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            if let Some(token) = sent_token.as_deref() {
                self.auth.invalidate_token(token);
            }
        }

        Err(ClientError::from_status(status, &body))
    }

    pub(crate) async fn get_json<T>(&self, path: &str, access: Access) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let builder = self.request(Method::GET, path)?;
        let response = self.send(builder, access).await?;
        Ok(response.json::<T>().await?)
    }

    pub(crate) async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        access: Access,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path)?.json(body);
        let response = self.send(builder, access).await?;
        Ok(response.json::<T>().await?)
    }

    /// Binary download. Returns the body and the `Content-Disposition` header, if any.
    pub(crate) async fn get_bytes(
        &self,
        path: &str,
    ) -> Result<(Vec<u8>, Option<String>), ClientError> {
        let url = self.url(path)?;
        tracing::debug!("GET {} (binary)", url);
        let builder = self.http.get(url);
        let response = self.send(builder, Access::Authenticated).await?;

        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), disposition))
    }
}
