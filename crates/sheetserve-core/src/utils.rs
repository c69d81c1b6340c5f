//! Utility functions for sheetserve

use std::path::Path;

/// Characters that are replaced during filename sanitization
const DANGEROUS_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum length (in characters) of a sanitized filename
const MAX_FILENAME_LEN: usize = 255;

/// Validate file extension against an allow-list (case-insensitive)
#[must_use]
pub fn validate_file_extension(filename: &str, allowed: &[&str]) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

/// Sanitize a client-supplied filename for safe storage
///
/// Strips directory components, replaces dangerous characters with `_`, and
/// truncates to a maximum length while preserving the extension.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    // Drop directory components regardless of separator style
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let mut sanitized: String = base
        .chars()
        .map(|c| if DANGEROUS_CHARS.contains(&c) { '_' } else { c })
        .collect();

    if sanitized.chars().count() > MAX_FILENAME_LEN {
        let ext: String = Path::new(&sanitized)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let keep = MAX_FILENAME_LEN.saturating_sub(5 + ext.chars().count());
        let stem: String = sanitized.chars().take(keep).collect();
        sanitized = format!("{stem}{ext}");
    }

    sanitized
}

/// Storage filename for a session: `{token}_{sanitized original name}`
#[must_use]
pub fn session_filename(token: &str, original: &str) -> String {
    format!("{token}_{}", sanitize_filename(original))
}

/// Recover the original filename from a stored session filename
///
/// The session token never contains `_`, so splitting at the first one is
/// exact.
#[must_use]
pub fn original_filename(stored: &str) -> &str {
    stored.split_once('_').map_or(stored, |(_, rest)| rest)
}

/// Render a 1-based (row, column) pair as an A1-style coordinate
#[must_use]
pub fn coordinate(row: u32, col: u32) -> String {
    format!("{}{row}", column_letters(col))
}

/// Convert a 1-based column index to Excel column letters (1 -> A, 27 -> AA)
#[must_use]
pub fn column_letters(col: u32) -> String {
    let mut n = col;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}
