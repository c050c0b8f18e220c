//! HTTP client for the audio conversion service.
//!
//! Supports both `/convert` contracts: servers that answer with the
//! converted binary directly, and servers that accept the job and hand back
//! a session id whose progress is observed over a server-sent-event stream
//! until a terminal snapshot, after which the artifact is fetched from
//! `/download/{session_id}`.

use std::{collections::VecDeque, pin::Pin};

use futures::{Stream, StreamExt};
use reqwest::{header, multipart, Client, Response};
use shared::{
    domain::{OutputFormat, SessionId},
    error::ServerErrorBody,
    protocol::{ConvertAccepted, ProgressUpdate},
};
use tracing::{debug, info};

pub mod error;
pub mod sse;

pub use error::ClientError;

use sse::SseDecoder;

/// Header that tells a tunnel intermediary to skip its browser-warning
/// interstitial and pass the request straight through to the service.
const TUNNEL_WARNING_HEADER: &str = "ngrok-skip-browser-warning";

/// A finished conversion: the artifact bytes plus the filename the server
/// suggested through `Content-Disposition`, when it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub suggested_filename: Option<String>,
}

impl Artifact {
    /// Name to save the artifact under: the server's suggestion when
    /// present, otherwise a default built from the chosen format.
    pub fn download_name(&self, format: OutputFormat) -> String {
        self.suggested_filename
            .clone()
            .unwrap_or_else(|| format.default_download_name())
    }
}

/// The two supported `/convert` server contracts.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The server converted synchronously and returned the binary directly.
    Finished(Artifact),
    /// The server accepted the job; progress is tracked by session id.
    Accepted(SessionId),
}

pub struct ConversionClient {
    http: Client,
    base_url: String,
}

impl ConversionClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            TUNNEL_WARNING_HEADER,
            header::HeaderValue::from_static("true"),
        );
        let http = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Submit a local audio file for conversion.
    pub async fn convert_file(
        &self,
        filename: &str,
        mime_type: Option<String>,
        bytes: Vec<u8>,
        format: OutputFormat,
    ) -> Result<SubmitOutcome, ClientError> {
        info!(
            filename,
            size_bytes = bytes.len(),
            format = format.as_str(),
            "submitting file for conversion"
        );
        let mut part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        if let Some(mime) = mime_type {
            part = part.mime_str(&mime)?;
        }
        let form = multipart::Form::new()
            .part("audio", part)
            .text("format", format.as_str());
        self.submit(form).await
    }

    /// Submit a remote-media URL for the server to fetch and convert.
    pub async fn convert_remote(
        &self,
        url: &str,
        format: OutputFormat,
    ) -> Result<SubmitOutcome, ClientError> {
        info!(url, format = format.as_str(), "submitting remote media for conversion");
        let form = multipart::Form::new()
            .text("youtube_url", url.to_string())
            .text("format", format.as_str());
        self.submit(form).await
    }

    async fn submit(&self, form: multipart::Form) -> Result<SubmitOutcome, ClientError> {
        let response = self
            .http
            .post(format!("{}/convert", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;

        if is_json(&response) {
            let accepted: ConvertAccepted = response.json().await?;
            debug!(session_id = %accepted.session_id, "conversion accepted");
            return Ok(SubmitOutcome::Accepted(accepted.session_id));
        }

        let suggested_filename = suggested_filename(&response);
        let bytes = response.bytes().await?.to_vec();
        debug!(size_bytes = bytes.len(), "conversion finished synchronously");
        Ok(SubmitOutcome::Finished(Artifact {
            bytes,
            suggested_filename,
        }))
    }

    /// Open the progress stream for an accepted session. The stream yields
    /// every snapshot up to and including the first terminal one, then ends.
    pub async fn stream_progress(
        &self,
        session_id: &SessionId,
    ) -> Result<ProgressStream, ClientError> {
        let response = self
            .http
            .get(format!("{}/progress/{}", self.base_url, session_id))
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(ProgressStream::new(response))
    }

    /// Fetch the finished artifact for a session.
    pub async fn download(&self, session_id: &SessionId) -> Result<Artifact, ClientError> {
        let response = self
            .http
            .get(format!("{}/download/{}", self.base_url, session_id))
            .send()
            .await?;
        let response = check_status(response).await?;
        let suggested_filename = suggested_filename(&response);
        let bytes = response.bytes().await?.to_vec();
        Ok(Artifact {
            bytes,
            suggested_filename,
        })
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/json"))
        .unwrap_or(false)
}

fn suggested_filename(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(filename_from_content_disposition)
}

/// Extract the filename from a `Content-Disposition` header value,
/// accepting both the bare (`filename=out.mp3`) and quoted
/// (`filename="out.mp3"`) forms.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let lowered = value.to_ascii_lowercase();
    let start = lowered.find("filename=")? + "filename=".len();
    let raw = value[start..].trim_start();
    let name = match raw.strip_prefix('"') {
        Some(rest) => rest.split('"').next()?,
        None => raw.split(';').next()?.trim(),
    };
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ServerErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    Err(ClientError::Status { status, message })
}

type BodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;

/// Server-sent progress snapshots for one conversion session.
///
/// Delivery stops after the first terminal snapshot even if the server keeps
/// writing, so a consumer can never act twice on a finished session. A body
/// that ends without a terminal snapshot is reported as a transport failure.
pub struct ProgressStream {
    body: BodyStream,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

impl ProgressStream {
    fn new(response: Response) -> Self {
        let body = response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec()));
        Self {
            body: Box::pin(body),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Next snapshot, or `None` once a terminal snapshot or failure has been
    /// delivered.
    pub async fn next_update(&mut self) -> Option<Result<ProgressUpdate, ClientError>> {
        if self.finished {
            return None;
        }
        loop {
            if let Some(data) = self.pending.pop_front() {
                match serde_json::from_str::<ProgressUpdate>(&data) {
                    Ok(update) => {
                        if update.status.is_terminal() {
                            self.finished = true;
                            self.pending.clear();
                        }
                        return Some(Ok(update));
                    }
                    Err(err) => {
                        self.finished = true;
                        return Some(Err(ClientError::Stream(format!(
                            "malformed progress event: {err}"
                        ))));
                    }
                }
            }

            match self.body.next().await {
                Some(Ok(chunk)) => {
                    self.pending.extend(self.decoder.feed(&chunk));
                }
                Some(Err(err)) => {
                    self.finished = true;
                    return Some(Err(ClientError::Stream(format!(
                        "progress stream transport failure: {err}"
                    ))));
                }
                None => {
                    self.finished = true;
                    return Some(Err(ClientError::Stream(
                        "progress stream ended before a terminal status".to_string(),
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
