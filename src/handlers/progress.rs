// src/handlers/progress.rs

//! Client side view of server-computed material progress.
//!
//! The client never computes a percentage itself. It fetches, keys the answer by
//! the material id it asked for, and drops answers that arrive for a request
//! that has since been superseded.

use std::collections::HashMap;

use tokio::task::JoinSet;

use crate::{
    api::ProgressBackend,
    error::ClientError,
    models::{
        material::{AttachmentKind, Material},
        progress::{MarkCompleteRequest, ProgressRecord},
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum CardProgress {
    Loading,
    Loaded(ProgressRecord),
    Failed(ClientError),
}

impl CardProgress {
    pub fn record(&self) -> Option<&ProgressRecord> {
        match self {
            CardProgress::Loaded(record) => Some(record),
            _ => None,
        }
    }
}

/// Identifies one progress request for a card. Only the latest ticket of a card
/// may update it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

#[derive(Debug)]
struct Card {
    ticket: Ticket,
    progress: CardProgress,
}

/// Progress of every material card on a listing page.
#[derive(Debug, Default)]
pub struct ProgressBoard {
    cards: HashMap<i64, Card>,
    next_ticket: u64,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `material_id` as loading and returns the ticket its response must carry.
    pub fn request(&mut self, material_id: i64) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.cards.insert(
            material_id,
            Card {
                ticket,
                progress: CardProgress::Loading,
            },
        );
        ticket
    }

    /// Applies a response. Returns `false` when it was stale and got dropped.
    pub fn apply(
        &mut self,
        material_id: i64,
        ticket: Ticket,
        result: Result<ProgressRecord, ClientError>,
    ) -> bool {
        let Some(card) = self.cards.get_mut(&material_id) else {
            tracing::debug!("Dropping progress for unknown material {}", material_id);
            return false;
        };
        if card.ticket != ticket {
            tracing::debug!("Dropping stale progress for material {}", material_id);
            return false;
        }

        card.progress = match result {
            Ok(record) => CardProgress::Loaded(record),
            Err(e) => {
                tracing::warn!("Progress for material {} failed: {}", material_id, e);
                CardProgress::Failed(e)
            }
        };
        true
    }

    /// Fetches every id concurrently and applies results as they resolve.
    ///
    /// Returns the ids in the order their responses were applied. One failing
    /// fetch only fails its own card.
    pub async fn fetch_all<B>(&mut self, api: &B, material_ids: &[i64]) -> Vec<i64>
    where
        B: ProgressBackend + Clone + 'static,
    {
        let mut tasks = JoinSet::new();
        for &material_id in material_ids {
            let ticket = self.request(material_id);
            let api = api.clone();
            tasks.spawn(async move {
                let result = api.material_progress(material_id).await;
                (material_id, ticket, result)
            });
        }

        let mut applied = Vec::with_capacity(material_ids.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((material_id, ticket, result)) => {
                    if self.apply(material_id, ticket, result) {
                        applied.push(material_id);
                    }
                }
                Err(e) => tracing::error!("Progress task failed: {:?}", e),
            }
        }

        // A task that died never answered; don't leave its card spinning.
        for &material_id in material_ids {
            if let Some(card) = self.cards.get_mut(&material_id)
                && card.progress == CardProgress::Loading
            {
                card.progress =
                    CardProgress::Failed(ClientError::Network("Progress request aborted".into()));
            }
        }

        applied
    }

    pub fn get(&self, material_id: i64) -> Option<&CardProgress> {
        self.cards.get(&material_id).map(|c| &c.progress)
    }

    /// Rounded percentage for a card's bar, once loaded.
    pub fn percentage(&self, material_id: i64) -> Option<u8> {
        self.get(material_id)
            .and_then(CardProgress::record)
            .map(ProgressRecord::rounded_percentage)
    }
}

/// Completion checkbox state of one attachment on a detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentCheck {
    pub attachment_id: String,
    pub name: String,
    pub kind: AttachmentKind,
    pub completed: bool,
}

/// Progress of the single material shown on a detail page.
#[derive(Debug)]
pub struct MaterialProgressView {
    material_id: i64,
    progress: Option<ProgressRecord>,
    error: Option<ClientError>,
}

impl MaterialProgressView {
    pub fn new(material_id: i64) -> Self {
        Self {
            material_id,
            progress: None,
            error: None,
        }
    }

    pub fn material_id(&self) -> i64 {
        self.material_id
    }

    pub fn progress(&self) -> Option<&ProgressRecord> {
        self.progress.as_ref()
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    /// Switches to another material. Whatever was shown belongs to the old one.
    pub fn rebind(&mut self, material_id: i64) {
        if self.material_id != material_id {
            self.material_id = material_id;
            self.progress = None;
            self.error = None;
        }
    }

    /// Applies a response fetched for `requested_id`; ignored if the view has moved on.
    pub fn apply(
        &mut self,
        requested_id: i64,
        result: Result<ProgressRecord, ClientError>,
    ) -> bool {
        if requested_id != self.material_id {
            tracing::debug!(
                "Ignoring progress for material {} (now showing {})",
                requested_id,
                self.material_id
            );
            return false;
        }

        match result {
            Ok(record) => {
                self.progress = Some(record);
                self.error = None;
            }
            Err(e) => {
                tracing::warn!("Progress for material {} failed: {}", requested_id, e);
                self.error = Some(e);
            }
        }
        true
    }

    pub async fn refresh<B>(&mut self, api: &B) -> Result<(), ClientError>
    where
        B: ProgressBackend + ?Sized,
    {
        let requested_id = self.material_id;
        let result = api.material_progress(requested_id).await;
        self.apply(requested_id, result);

        match &self.error {
            Some(e) if self.material_id == requested_id => Err(e.clone()),
            _ => Ok(()),
        }
    }

    /// Marks an attachment as completed, then re-reads the server's progress.
    pub async fn mark_complete<B>(&mut self, api: &B, attachment_id: &str) -> Result<(), ClientError>
    where
        B: ProgressBackend + ?Sized,
    {
        let request = MarkCompleteRequest {
            attachment_id: Some(attachment_id.to_string()),
            test_id: None,
        };
        api.mark_complete(&request).await?;
        tracing::info!(
            "Marked attachment {} of material {} complete",
            attachment_id,
            self.material_id
        );

        self.refresh(api).await
    }

    /// Checkbox state for each PDF and video attachment of `material`.
    pub fn attachment_checks(&self, material: &Material) -> Vec<AttachmentCheck> {
        material
            .attachments
            .iter()
            .filter(|a| a.kind() != AttachmentKind::Other)
            .map(|a| {
                let completed = self.progress.as_ref().is_some_and(|p| match a.kind() {
                    AttachmentKind::Pdf => {
                        p.pdf_completed && p.pdf_attachment_id.as_deref() == Some(a.id.as_str())
                    }
                    AttachmentKind::VideoFile | AttachmentKind::VideoLink => {
                        p.video_completed
                            && p.video_attachment_id.as_deref() == Some(a.id.as_str())
                    }
                    AttachmentKind::Other => false,
                });
                AttachmentCheck {
                    attachment_id: a.id.clone(),
                    name: a.display_name().to_string(),
                    kind: a.kind(),
                    completed,
                }
            })
            .collect()
    }
}
