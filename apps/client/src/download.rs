use std::path::PathBuf;

use tracing::info;

use crate::api_client::DownloadedFile;
use crate::errors::Result;
use crate::validation::sanitize_filename;

/// Local save target for downloaded and converted documents.
#[derive(Debug, Clone)]
pub struct Downloads {
    dir: PathBuf,
}

impl Downloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes the file under a sanitized version of its name and returns the path.
    /// Never renames anything on the server.
    pub async fn save(&self, file: &DownloadedFile) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self
            .dir
            .join(local_name(&file.filename, file.content_type.as_deref()));
        tokio::fs::write(&path, &file.bytes).await?;

        info!(
            "Saved {} ({} bytes, {})",
            path.display(),
            file.bytes.len(),
            file.content_type.as_deref().unwrap_or("unknown type")
        );
        Ok(path)
    }
}

fn local_name(server_name: &str, content_type: Option<&str>) -> String {
    let name = sanitize_filename(server_name);
    let name = if name.chars().all(|c| c == '.') {
        "download".to_string()
    } else {
        name
    };

    let has_extension = name.rsplit_once('.').is_some_and(|(stem, _)| !stem.is_empty());
    match content_type.and_then(extension_for) {
        Some(ext) if !has_extension => format!("{name}.{ext}"),
        _ => name,
    }
}

/// Extension for the document types the backend produces.
fn extension_for(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    match mime.to_ascii_lowercase().as_str() {
        "application/pdf" => Some("pdf"),
        "text/markdown" => Some("md"),
        "text/plain" => Some("txt"),
        "text/html" => Some("html"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        _ => None,
    }
}
