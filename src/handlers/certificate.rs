// src/handlers/certificate.rs

use std::path::{Path, PathBuf};

use crate::{
    api::CertificateBackend,
    error::ClientError,
    models::session::Session,
    utils::disposition::sanitize_filename,
};

/// What the certificate page shows for a session id.
#[derive(Debug, Clone, PartialEq)]
pub enum CertificateView {
    /// Unknown session: empty state, no error banner.
    NotFound,
    /// The session did not pass; only its score is shown.
    Rejected { score_percentage: f64 },
    Available(Session),
}

impl CertificateView {
    pub fn is_available(&self) -> bool {
        matches!(self, CertificateView::Available(_))
    }
}

/// Loads the session and decides whether a certificate may be offered.
/// Only the server's `passed` flag counts; the score is never re-checked here.
pub async fn open<B>(api: &B, session_id: &str) -> Result<CertificateView, ClientError>
where
    B: CertificateBackend + ?Sized,
{
    match api.get_session(session_id).await {
        Ok(session) if session.passed => Ok(CertificateView::Available(session)),
        Ok(session) => Ok(CertificateView::Rejected {
            score_percentage: session.display_percentage(),
        }),
        Err(ClientError::NotFound(_)) => Ok(CertificateView::NotFound),
        Err(e) => Err(e),
    }
}

/// Downloads the certificate of a passed session into `dir` and returns the file path.
pub async fn download<B>(api: &B, session: &Session, dir: &Path) -> Result<PathBuf, ClientError>
where
    B: CertificateBackend + ?Sized,
{
    if !session.passed {
        return Err(ClientError::Validation(format!(
            "Session {} did not pass; no certificate is available",
            session.id
        )));
    }

    let file = api.download_certificate(&session.id).await?;
    let name = file
        .suggested_name
        .map(|n| sanitize_filename(&n))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_file_name(&session.id));

    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        tracing::error!("Failed to create certificate directory: {:?}", e);
        ClientError::Validation(format!("Cannot create {}: {}", dir.display(), e))
    })?;

    let path = dir.join(name);
    tokio::fs::write(&path, &file.bytes).await.map_err(|e| {
        tracing::error!("Failed to write certificate: {:?}", e);
        ClientError::Validation(format!("Cannot write {}: {}", path.display(), e))
    })?;

    tracing::info!("Certificate for session {} saved to {}", session.id, path.display());
    Ok(path)
}

fn default_file_name(session_id: &str) -> String {
    format!("certificate_{}.pdf", sanitize_filename(session_id))
}
