// src/api/progress.rs

use async_trait::async_trait;

use super::{Access, ApiClient, ProgressBackend};
use crate::{
    error::ClientError,
    models::progress::{CompletionEntry, MarkCompleteRequest, ProgressRecord},
    routes,
};

#[async_trait]
impl ProgressBackend for ApiClient {
    async fn material_progress(&self, material_id: i64) -> Result<ProgressRecord, ClientError> {
        let mut record: ProgressRecord = self
            .get_json(&routes::material_progress(material_id), Access::Authenticated)
            .await?;

        // Results are keyed by the id that was asked for.
        if record.material_id != material_id {
            tracing::warn!(
                "Progress for material {} came back labelled {}",
                material_id,
                record.material_id
            );
            record.material_id = material_id;
        }
        Ok(record)
    }

    /// Marks an attachment (or a single test) as completed for the current user.
    async fn mark_complete(
        &self,
        request: &MarkCompleteRequest,
    ) -> Result<CompletionEntry, ClientError> {
        if request.attachment_id.is_none() && request.test_id.is_none() {
            return Err(ClientError::Validation(
                "attachment_id or test_id is required".to_string(),
            ));
        }

        self.post_json(routes::PROGRESS_COMPLETE, request, Access::Authenticated)
            .await
    }
}
