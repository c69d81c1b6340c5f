//! Upload security validation
//!
//! Pure inspection of a candidate upload: size and name checks, container
//! structure for OOXML workbooks, byte signatures, and a bounded scan for
//! known-dangerous content. Nothing here mutates the file.

use crate::{Error, Result, utils};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default maximum upload size (50 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Workbook extensions accepted for upload
pub const ALLOWED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];

/// Substrings rejected anywhere in a claimed filename (matched lowercase)
const SUSPICIOUS_NAME_PATTERNS: &[&str] = &[
    "../",
    "..\\",
    "/etc/",
    "/var/",
    "cmd.exe",
    "powershell",
    "<script",
    "javascript:",
    "vbscript:",
    "data:",
];

/// Archive entry extensions that mark a workbook as hostile
const ARCHIVE_DENY_EXTENSIONS: &[&str] = &["exe", "bat", "cmd", "scr", "vbs", "js"];

/// Entries every OOXML workbook container must carry
const REQUIRED_ARCHIVE_ENTRIES: &[&str] = &["[Content_Types].xml", "_rels/.rels"];

/// OLE compound file signature (legacy .xls)
const OLE_SIGNATURE: &[u8] = &[0xd0, 0xcf, 0x11, 0xe0, 0xa1, 0xb1, 0x1a, 0xe1];

/// ZIP local file header signature (.xlsx / .xlsm)
const ZIP_SIGNATURE: &[u8] = b"PK";

/// Byte signatures that reject a file when found in the scanned prefix
const SUSPICIOUS_SIGNATURES: &[&[u8]] = &[b"MZ", b"\x7fELF", b"<script", b"javascript:", b"vbscript:"];

/// How many leading bytes are scanned for suspicious signatures
const SCAN_PREFIX_LEN: u64 = 512;

/// Cheap checks that need no file on disk: size bounds, claimed filename
/// patterns, and the extension allow-list
///
/// # Errors
///
/// Returns a validation error describing the first failed check.
pub fn preflight(size: u64, original_name: &str, max_bytes: u64) -> Result<()> {
    if size == 0 {
        return Err(Error::validation("file is empty"));
    }
    if size > max_bytes {
        return Err(Error::FileSizeExceeded {
            size,
            max_size: max_bytes,
        });
    }
    check_claimed_name(original_name)
}

/// Full validation of an upload already written to disk
///
/// Checks run in order and short-circuit on the first failure: existence and
/// size, claimed filename, extension, archive structure (OOXML formats),
/// byte signature, and a bounded scan of the file prefix.
///
/// # Errors
///
/// Returns a validation error with a human-readable reason on the first
/// failed check.
pub fn validate_upload(path: &Path, original_name: &str, max_bytes: u64) -> Result<()> {
    let metadata = std::fs::metadata(path)
        .map_err(|_| Error::validation(format!("file does not exist: {}", path.display())))?;
    preflight(metadata.len(), original_name, max_bytes)?;

    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if extension == "xlsx" || extension == "xlsm" {
        validate_archive(path)?;
    }

    let header = read_prefix(path)?;
    check_signature(&header, &extension)?;
    scan_for_suspicious_content(&header)?;

    Ok(())
}

fn check_claimed_name(original_name: &str) -> Result<()> {
    let lowered = original_name.to_lowercase();
    for pattern in SUSPICIOUS_NAME_PATTERNS {
        if lowered.contains(pattern) {
            return Err(Error::validation(format!(
                "suspicious pattern in filename: {pattern}"
            )));
        }
    }

    if !utils::validate_file_extension(original_name, ALLOWED_EXTENSIONS) {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        return Err(Error::validation(format!(
            "file extension '{ext}' is not allowed"
        )));
    }

    Ok(())
}

/// Validate the ZIP container of an OOXML workbook
fn validate_archive(path: &Path) -> Result<()> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::validation(format!("file is not a valid ZIP archive: {e}")))?;

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();

    for required in REQUIRED_ARCHIVE_ENTRIES {
        if !names.iter().any(|n| n == required) {
            return Err(Error::validation(format!(
                "missing required archive entry: {required}"
            )));
        }
    }

    for name in &names {
        let entry_ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if ARCHIVE_DENY_EXTENSIONS.contains(&entry_ext.as_str()) {
            return Err(Error::validation(format!(
                "suspicious entry in archive: {name}"
            )));
        }
    }

    let mut content_types = String::new();
    archive
        .by_name("[Content_Types].xml")
        .map_err(|e| Error::validation(format!("cannot read content types: {e}")))?
        .read_to_string(&mut content_types)
        .map_err(|e| Error::validation(format!("cannot read content types: {e}")))?;

    if !content_types.contains("application/vnd.openxmlformats") {
        return Err(Error::validation("invalid workbook content types"));
    }

    Ok(())
}

fn read_prefix(path: &Path) -> Result<Vec<u8>> {
    let mut header = Vec::new();
    File::open(path)?
        .take(SCAN_PREFIX_LEN)
        .read_to_end(&mut header)?;
    Ok(header)
}

fn check_signature(header: &[u8], extension: &str) -> Result<()> {
    let valid = match extension {
        "xlsx" | "xlsm" => header.starts_with(ZIP_SIGNATURE),
        "xls" => header.starts_with(OLE_SIGNATURE),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "invalid file signature for '{extension}' workbook"
        )))
    }
}

fn scan_for_suspicious_content(header: &[u8]) -> Result<()> {
    for signature in SUSPICIOUS_SIGNATURES {
        if header
            .windows(signature.len())
            .any(|window| window == *signature)
        {
            return Err(Error::validation("suspicious content detected"));
        }
    }
    Ok(())
}
