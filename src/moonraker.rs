//! Moonraker client: status polling and G-code file upload for one printer.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The only printer state the dispatcher selects on. Exact, case-sensitive
/// match: sub-states like "printing" or "error" are not ready.
pub const READY_STATE: &str = "ready";

/// Sentinel label used in aggregate reports when a printer's state could not
/// be determined. Distinct from any state a printer reports about itself.
pub const UNREACHABLE_STATE: &str = "Error";

/// Base URL of one printer's control API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrinterEndpoint(String);

impl PrinterEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut url = base_url.into();
        while url.ends_with('/') {
            url.pop();
        }
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl fmt::Display for PrinterEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status reported by `GET /printer/info`.
///
/// Only `state` drives dispatch. Everything else is descriptive metadata the
/// printer sends along; unknown extra fields are ignored so newer Moonraker
/// versions keep parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterInfo {
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub klipper_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_info: Option<String>,
}

impl PrinterInfo {
    /// A status carrying only a state label, no descriptive metadata.
    pub fn with_state(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            state_message: None,
            hostname: None,
            klipper_path: None,
            python_path: None,
            log_file: None,
            config_file: None,
            software_version: None,
            cpu_info: None,
        }
    }
}

/// Wire envelope of `GET /printer/info`.
#[derive(Debug, Deserialize)]
pub struct InfoResponse {
    pub result: PrinterInfo,
}

/// One inbound G-code file, alive for the duration of a single request.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub filename: String,
    pub data: Vec<u8>,
}

impl UploadJob {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }

    /// Moonraker file-item metadata derived from the job.
    pub fn upload_meta(&self) -> UploadMeta {
        UploadMeta {
            item: UploadItem {
                path: self.filename.clone(),
                root: "gcodes".to_string(),
                size: self.data.len(),
                permissions: "rw".to_string(),
            },
            print: "true".to_string(),
            action: "create_file".to_string(),
        }
    }
}

/// Destination metadata for an uploaded file: where it lands in the
/// printer's virtual filesystem and whether it prints on arrival.
#[derive(Debug, Clone, Serialize)]
pub struct UploadMeta {
    pub item: UploadItem,
    pub print: String,
    pub action: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadItem {
    pub path: String,
    pub root: String,
    pub size: usize,
    pub permissions: String,
}

/// Why a status poll produced no usable state.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status code {0}")]
    Http(StatusCode),
    #[error("malformed printer info: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status code {0}")]
    Http(StatusCode),
}

/// The printer-facing surface of the dispatcher. Implemented over HTTP by
/// [`MoonrakerClient`] and by in-memory fakes in tests.
#[async_trait]
pub trait PrinterApi: Send + Sync {
    /// Fetch the printer's current status. Fresh on every call, never cached.
    async fn query_status(&self, printer: &PrinterEndpoint) -> Result<PrinterInfo, PollError>;

    /// Transfer a G-code file to the printer.
    async fn upload(&self, printer: &PrinterEndpoint, job: &UploadJob) -> Result<(), UploadError>;

    /// True iff the printer currently reports exactly [`READY_STATE`].
    async fn is_ready(&self, printer: &PrinterEndpoint) -> bool {
        matches!(self.query_status(printer).await, Ok(info) if info.state == READY_STATE)
    }
}

/// HTTP implementation of [`PrinterApi`] against Moonraker's API.
pub struct MoonrakerClient {
    http: reqwest::Client,
    poll_timeout: Duration,
    upload_timeout: Duration,
}

impl MoonrakerClient {
    pub fn new(poll_timeout: Duration, upload_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            poll_timeout,
            upload_timeout,
        }
    }
}

#[async_trait]
impl PrinterApi for MoonrakerClient {
    async fn query_status(&self, printer: &PrinterEndpoint) -> Result<PrinterInfo, PollError> {
        let response = self
            .http
            .get(printer.join("/printer/info"))
            .timeout(self.poll_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Http(status));
        }

        let body = response.text().await?;
        let parsed: InfoResponse = serde_json::from_str(&body)?;
        Ok(parsed.result)
    }

    async fn upload(&self, printer: &PrinterEndpoint, job: &UploadJob) -> Result<(), UploadError> {
        let boundary = unique_boundary(&job.data);
        let body = encode_multipart(&boundary, &job.filename, &job.data);

        let response = self
            .http
            .post(printer.join("/server/files/upload"))
            .timeout(self.upload_timeout)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Http(status));
        }

        tracing::info!("File uploaded to printer: {}", printer);
        Ok(())
    }
}

/// Assemble a multipart/form-data body with a single `file` part.
fn encode_multipart(boundary: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let header = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    );
    let trailer = format!("\r\n--{boundary}--\r\n");

    let mut body = Vec::with_capacity(header.len() + data.len() + trailer.len());
    body.extend_from_slice(header.as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(trailer.as_bytes());
    body
}

/// Pick a boundary token that appears nowhere in the payload.
///
/// The millisecond timestamp alone is not unique across concurrent uploads,
/// so a random component is appended; a candidate that happens to occur in
/// the file's own bytes is rejected and regenerated. Total length stays
/// under the 70-character boundary limit of RFC 2046.
fn unique_boundary(payload: &[u8]) -> String {
    loop {
        let candidate = format!(
            "----------{}-{}",
            chrono::Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4().simple(),
        );
        if !contains(payload, candidate.as_bytes()) {
            return candidate;
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
