//! Input validation run before anything is sent to the backend.
//!
//! Every function here is pure: no I/O, no hidden state, same output for the
//! same input. `FileCandidate::from_path` is the only place that touches the
//! filesystem, and it only reads metadata.

use std::path::Path;

use serde::Serialize;

/// Upload ceiling for documents and markdown files (50 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Accepted job description / resume uploads.
pub const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx", ".txt"];

/// Accepted markdown conversion inputs.
pub const MARKDOWN_EXTENSIONS: &[&str] = &[".md"];

/// Minimum trimmed length for pasted job descriptions and resumes.
pub const MIN_TEXT_CHARS: usize = 10;

/// A local file the user wants to upload or convert. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub byte_size: u64,
    /// Advisory only; guessed from the extension.
    pub mime_type: String,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, byte_size: u64) -> Self {
        let name = name.into();
        let mime_type = guess_mime_type(&name).to_string();
        Self {
            name,
            byte_size,
            mime_type,
        }
    }

    /// Reads the size of a local file and builds a candidate from it.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, metadata.len()))
    }

    /// Lower-cased, dot-prefixed extension, or `None` when the name has no `.`.
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error_message: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            error_message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error_message: Some(message.into()),
        }
    }
}

/// Checks a candidate against the size ceiling and an extension allow-list.
///
/// `allowed_extensions` holds lower-case, dot-prefixed suffixes such as `".pdf"`.
/// Only the extension is compared case-insensitively.
pub fn validate_file(file: Option<&FileCandidate>, allowed_extensions: &[&str]) -> ValidationResult {
    let Some(file) = file else {
        return ValidationResult::invalid("No file provided");
    };

    if file.byte_size > MAX_UPLOAD_BYTES {
        return ValidationResult::invalid(format!(
            "File size exceeds {}MB limit",
            MAX_UPLOAD_BYTES / 1024 / 1024
        ));
    }

    let allowed = file
        .extension()
        .map(|ext| allowed_extensions.contains(&ext.as_str()))
        .unwrap_or(false);

    if !allowed {
        return ValidationResult::invalid(format!(
            "File type not allowed. Accepted types: {}",
            allowed_extensions.join(", ")
        ));
    }

    ValidationResult::ok()
}

/// Returns `None` when the text is acceptable, otherwise a message naming the field.
pub fn validate_text_input(text: &str, field_label: &str) -> Option<String> {
    let trimmed_len = text.trim().chars().count();

    if trimmed_len == 0 {
        return Some(format!("{field_label} is required"));
    }

    if trimmed_len < MIN_TEXT_CHARS {
        return Some(format!(
            "{field_label} must be at least {MIN_TEXT_CHARS} characters"
        ));
    }

    None
}

/// Replaces every character outside `[A-Za-z0-9.-]` with `_`, one for one.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn file_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

fn guess_mime_type(name: &str) -> &'static str {
    match file_extension(name).as_deref() {
        Some(".pdf") => "application/pdf",
        Some(".doc") => "application/msword",
        Some(".docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some(".txt") => "text/plain",
        Some(".md") => "text/markdown",
        _ => "application/octet-stream",
    }
}
