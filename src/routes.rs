// src/routes.rs

//! Backend endpoint paths, relative to the configured base URL.
//!
//! Paths never start with `/` so that `Url::join` keeps any prefix of the base
//! (e.g. `https://host/api/`).

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

// Auth (no bearer attached)
pub const LOGIN: &str = "auth/login";
pub const REGISTER: &str = "user";
pub const ME: &str = "auth/me";

// Final exam sessions
pub const SESSION_STATUS: &str = "test-sessions/check/status";
pub const SESSION_START: &str = "test-sessions/start";
pub const SESSION_SUBMIT: &str = "test-sessions/submit";

// Progress
pub const PROGRESS_COMPLETE: &str = "progress/complete";
pub const PROGRESS_SUBMIT_TEST: &str = "progress/submit-test";

// Catalogue
pub const SECTIONS: &str = "sections/";

pub fn session_history(limit: u32) -> String {
    format!("test-sessions/history?limit={}", limit)
}

pub fn session(session_id: &str) -> String {
    format!("test-sessions/{}", encode_segment(session_id))
}

pub fn certificate(session_id: &str) -> String {
    format!("test-sessions/certificate/{}", encode_segment(session_id))
}

pub fn material_progress(material_id: i64) -> String {
    format!("progress/material/{}", material_id)
}

pub fn materials_by_section(section_id: i64) -> String {
    format!("materials/sectionId/{}", section_id)
}

pub fn material(material_id: i64) -> String {
    format!("materials/{}", material_id)
}

pub fn tests_by_material(material_id: i64) -> String {
    format!("tests/material/{}", material_id)
}

/// Session ids are opaque; anything outside the unreserved set is percent-encoded
/// so an id can never add path segments or a query.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}
