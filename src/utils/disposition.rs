// src/utils/disposition.rs

use std::sync::OnceLock;

use regex::Regex;

fn filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)filename\s*=\s*(?:"([^"]+)"|([^;\s]+))"#)
            .unwrap_or_else(|e| panic!("invalid filename pattern: {}", e))
    })
}

/// Extracts the suggested filename from a `Content-Disposition` header value.
pub fn filename_from_header(value: &str) -> Option<String> {
    let caps = filename_regex().captures(value)?;
    let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
    let cleaned = sanitize_filename(raw);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Keeps a filename inside the target directory: path separators and control
/// characters are replaced, leading dots are stripped.
pub fn sanitize_filename(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    replaced.trim().trim_start_matches('.').to_string()
}
