// src/models/material.rs

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::question::Test;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub name: String,
}

/// A content unit belonging to a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    #[serde(default)]
    pub section_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub tests: Vec<Test>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    File,
    Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    #[serde(rename = "type")]
    pub attachment_type: AttachmentType,
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// How an attachment counts towards progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Pdf,
    VideoFile,
    VideoLink,
    Other,
}

fn video_extension() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\.(mp4|avi|mov|mkv)$")
            .unwrap_or_else(|e| panic!("invalid video pattern: {}", e))
    })
}

impl Attachment {
    pub fn kind(&self) -> AttachmentKind {
        match self.attachment_type {
            AttachmentType::Link => AttachmentKind::VideoLink,
            AttachmentType::File if self.path.to_lowercase().ends_with(".pdf") => {
                AttachmentKind::Pdf
            }
            AttachmentType::File if video_extension().is_match(&self.path) => {
                AttachmentKind::VideoFile
            }
            AttachmentType::File => AttachmentKind::Other,
        }
    }

    /// Name shown on the card: explicit name, else the last path segment.
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.as_str(),
            _ => self
                .path
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(&self.path),
        }
    }
}

/// `GET /materials/{id}` has been seen returning a one-element list instead of an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MaterialPayload {
    One(Material),
    Many(Vec<Material>),
}

impl MaterialPayload {
    pub(crate) fn into_first(self) -> Option<Material> {
        match self {
            MaterialPayload::One(m) => Some(m),
            MaterialPayload::Many(list) => list.into_iter().next(),
        }
    }
}
