//! API client: the single point of entry for every backend call.
//!
//! No other module builds HTTP requests. The file synchronizer talks to this
//! module through the `FileApi` trait so it can be driven by a fake in tests.
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{ClientError, Result};

pub mod requests;

use requests::ApiRequest;

const FILES_PATH: &str = "/api/files";
const HEALTH_PATH: &str = "/api/health";
/// Uniform timeout for every request unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A server-known artifact as reported by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    /// ISO-8601 timestamp, empty when the server omits it.
    #[serde(
        rename = "date",
        alias = "uploadedDate",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub uploaded_date: String,
    #[serde(rename = "size", default, deserialize_with = "lenient_size")]
    pub size_bytes: Option<u64>,
    #[serde(rename = "url", default, deserialize_with = "null_as_empty")]
    pub download_url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListingBody {
    Wrapped { files: Vec<FileRecord> },
    Bare(Vec<FileRecord>),
}

/// Binary content fetched from the backend, with the name to save it under.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: String,
}

/// Result of a submitted backend action.
#[derive(Debug, Clone)]
pub enum ApiResponse {
    Json(Value),
    Blob(DownloadedFile),
}

/// The file-history operations the synchronizer depends on.
#[async_trait]
pub trait FileApi: Send + Sync {
    async fn list_files(&self) -> Result<Vec<FileRecord>>;
    async fn download_file(&self, name: &str) -> Result<DownloadedFile>;
    async fn delete_file(&self, name: &str) -> Result<DeleteResponse>;
}

/// HTTP client for the resume backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of a single file, with the name percent-encoded as one path segment.
    fn file_url(&self, name: &str) -> Result<Url> {
        let mut url = Url::parse(&self.build_url(FILES_PATH))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .push(name);
        Ok(url)
    }

    /// GET /api/health
    pub async fn health(&self) -> Result<Value> {
        let response = self.client.get(self.build_url(HEALTH_PATH)).send().await?;
        let response = ensure_success(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Validates, serializes and posts one backend action.
    /// Validation failures never reach the network.
    pub async fn submit(&self, request: &ApiRequest) -> Result<ApiResponse> {
        request.validate()?;
        let form = request.to_form().await?;

        debug!("POST {} ({})", request.endpoint(), request.action_name());

        let response = self
            .client
            .post(self.build_url(request.endpoint()))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);

        if is_json {
            let body = response.bytes().await?;
            return Ok(ApiResponse::Json(serde_json::from_slice(&body)?));
        }

        let fallback = request.output_filename().unwrap_or_else(|| "download".to_string());
        Ok(ApiResponse::Blob(read_download(response, &fallback).await?))
    }
}

#[async_trait]
impl FileApi for ApiClient {
    /// GET /api/files. Accepts a bare array or `{ "files": [...] }`.
    async fn list_files(&self) -> Result<Vec<FileRecord>> {
        let response = self.client.get(self.build_url(FILES_PATH)).send().await?;
        let response = ensure_success(response).await?;
        let body = response.bytes().await?;

        let files = match serde_json::from_slice::<ListingBody>(&body)? {
            ListingBody::Wrapped { files } | ListingBody::Bare(files) => files,
        };

        debug!("Listing returned {} file(s)", files.len());
        Ok(files)
    }

    /// GET /api/files/{name}. The saved name comes from `Content-Disposition`
    /// when the server sends one.
    async fn download_file(&self, name: &str) -> Result<DownloadedFile> {
        let response = self.client.get(self.file_url(name)?).send().await?;
        let response = ensure_success(response).await?;
        read_download(response, name).await
    }

    /// DELETE /api/files/{name}
    async fn delete_file(&self, name: &str) -> Result<DeleteResponse> {
        let response = self.client.delete(self.file_url(name)?).send().await?;
        let status = response.status().as_u16();
        let response = ensure_success(response).await?;
        let body = response.bytes().await?;

        let parsed: DeleteResponse = if body.iter().all(u8::is_ascii_whitespace) {
            DeleteResponse::default()
        } else {
            serde_json::from_slice(&body)?
        };

        if parsed.success == Some(false) {
            return Err(ClientError::Api {
                status,
                message: parsed.message,
            });
        }

        Ok(parsed)
    }
}

/// Turns a non-2xx response into `ClientError::Api`, keeping the server's message.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("Backend returned {}: {}", status, body);
    Err(ClientError::from_response_body(status.as_u16(), &body))
}

async fn read_download(response: Response, fallback_name: &str) -> Result<DownloadedFile> {
    let headers = response.headers();
    let filename = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_content_disposition)
        .unwrap_or_else(|| fallback_name.to_string());
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = response.bytes().await?;
    Ok(DownloadedFile {
        filename,
        content_type,
        bytes,
    })
}

/// Extracts `filename=` from a `Content-Disposition` header value, quotes stripped.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let lower = header.to_ascii_lowercase();
    let start = lower.find("filename=")? + "filename=".len();
    let value = header[start..].split(';').next().unwrap_or_default();
    let value = value.trim().replace('"', "");
    (!value.is_empty()).then_some(value)
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Sizes arrive as numbers from some backends and as strings from others.
fn lenient_size<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_quoted() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="resume-optimized.docx""#)
                .as_deref(),
            Some("resume-optimized.docx")
        );
    }

    #[test]
    fn test_content_disposition_unquoted_with_trailing_params() {
        assert_eq!(
            filename_from_content_disposition("attachment; FILENAME=cover.pdf; size=10").as_deref(),
            Some("cover.pdf")
        );
    }

    #[test]
    fn test_content_disposition_without_filename() {
        assert_eq!(filename_from_content_disposition("inline"), None);
        assert_eq!(filename_from_content_disposition(r#"attachment; filename="""#), None);
    }

    #[test]
    fn test_file_record_wire_names() {
        let record: FileRecord = serde_json::from_str(
            r#"{"name": "a.pdf", "url": "http://x/api/files/a.pdf", "date": "2024-05-01T10:00:00Z", "size": 2048}"#,
        )
        .unwrap();
        assert_eq!(record.name, "a.pdf");
        assert_eq!(record.download_url, "http://x/api/files/a.pdf");
        assert_eq!(record.uploaded_date, "2024-05-01T10:00:00Z");
        assert_eq!(record.size_bytes, Some(2048));
    }

    #[test]
    fn test_file_record_tolerates_missing_and_odd_fields() {
        let record: FileRecord = serde_json::from_str(
            r#"{"name": "b.md", "uploadedDate": null, "size": "10 mb"}"#,
        )
        .unwrap();
        assert_eq!(record.uploaded_date, "");
        assert_eq!(record.size_bytes, None);
        assert_eq!(record.download_url, "");

        let record: FileRecord =
            serde_json::from_str(r#"{"name": "c.md", "uploadedDate": "2024-01-01", "size": "512"}"#)
                .unwrap();
        assert_eq!(record.uploaded_date, "2024-01-01");
        assert_eq!(record.size_bytes, Some(512));
    }

    #[test]
    fn test_file_url_encodes_name_as_single_segment() {
        let client = ApiClient::new("http://localhost:8080/", DEFAULT_TIMEOUT).unwrap();
        let url = client.file_url("my resume#1.pdf").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/files/my%20resume%231.pdf"
        );
    }

    #[tokio::test]
    async fn test_list_files_accepts_bare_array() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/files")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"name":"b.pdf","url":"u","date":"2024-05-02T00:00:00Z"},
                    {"name":"a.pdf","url":"u","date":"2024-05-01T00:00:00Z"}]"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), DEFAULT_TIMEOUT).unwrap();
        let files = client.list_files().await.unwrap();

        mock.assert_async().await;
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "a.pdf"]);
    }

    #[tokio::test]
    async fn test_list_files_accepts_wrapped_object() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/files")
            .with_status(200)
            .with_body(r#"{"files":[{"name":"x.docx","url":"u","date":"d","size":1}]}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), DEFAULT_TIMEOUT).unwrap();
        let files = client.list_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size_bytes, Some(1));
    }

    #[tokio::test]
    async fn test_list_files_server_error_keeps_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/files")
            .with_status(500)
            .with_body(r#"{"message":"storage offline"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), DEFAULT_TIMEOUT).unwrap();
        let err = client.list_files().await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 500, .. }));
        assert_eq!(err.user_message(), "storage offline");
    }

    #[tokio::test]
    async fn test_download_uses_server_filename() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/files/resume.md")
            .with_status(200)
            .with_header("content-disposition", r#"attachment; filename="resume-final.md""#)
            .with_body("# Resume")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), DEFAULT_TIMEOUT).unwrap();
        let file = client.download_file("resume.md").await.unwrap();
        assert_eq!(file.filename, "resume-final.md");
        assert_eq!(&file.bytes[..], b"# Resume");
    }

    #[tokio::test]
    async fn test_download_falls_back_to_requested_name() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/files/cover.pdf")
            .with_status(200)
            .with_body("%PDF")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), DEFAULT_TIMEOUT).unwrap();
        let file = client.download_file("cover.pdf").await.unwrap();
        assert_eq!(file.filename, "cover.pdf");
    }

    #[tokio::test]
    async fn test_delete_not_found_surfaces_server_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/files/missing.pdf")
            .with_status(404)
            .with_body(r#"{"message":"The file does not exist!"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), DEFAULT_TIMEOUT).unwrap();
        let err = client.delete_file("missing.pdf").await.unwrap_err();
        assert_eq!(err.user_message(), "The file does not exist!");
    }

    #[tokio::test]
    async fn test_delete_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/files/a.pdf")
            .with_status(200)
            .with_body(r#"{"message":"Delete the file successfully: a.pdf"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), DEFAULT_TIMEOUT).unwrap();
        let response = client.delete_file("a.pdf").await.unwrap();
        assert_eq!(response.message, "Delete the file successfully: a.pdf");
    }

    #[tokio::test]
    async fn test_delete_reported_failure_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/files/locked.pdf")
            .with_status(200)
            .with_body(r#"{"success":false,"message":"file is locked"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), DEFAULT_TIMEOUT).unwrap();
        let err = client.delete_file("locked.pdf").await.unwrap_err();
        assert_eq!(err.user_message(), "file is locked");
    }

    #[tokio::test]
    async fn test_health() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/health")
            .with_status(200)
            .with_body(r#"{"status":"UP"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), DEFAULT_TIMEOUT).unwrap();
        let health = client.health().await.unwrap();
        assert_eq!(health["status"], "UP");
    }
}
