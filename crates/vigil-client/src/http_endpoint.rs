//! JSON-over-HTTP implementation of [`SubmissionEndpoint`].
//!
//! - `POST {base}/media`   raw bytes, answers `{"location": "..."}`
//! - `POST {base}/reports` [`ReportRecord`] JSON, answers `{"id": "..."}`
//! - `GET  {base}/health`  health check
//!
//! 4xx responses are rejections. Everything else that is not a success
//! (transport errors, timeouts, 5xx, unreadable bodies) is a network error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use vigil_shared::{MediaAsset, ReportId};

use crate::endpoint::{EndpointError, ReportReceipt, ReportRecord, SubmissionEndpoint};

const FILE_NAME_HEADER: &str = "X-File-Name";
const REPORT_ID_HEADER: &str = "X-Report-Id";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Longest error body kept in a [`EndpointError::Rejected`] message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Deserialize)]
struct UploadResponse {
    location: String,
}

#[derive(Deserialize)]
struct CreateResponse {
    id: String,
}

#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: Client,
    base_url: String,
}

impl HttpEndpoint {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EndpointError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EndpointError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `true` if `GET /health` answers with a success status.
    pub async fn check_health(&self) -> bool {
        match self.client.get(self.url("health")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Health check failed");
                false
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl SubmissionEndpoint for HttpEndpoint {
    async fn upload_media(
        &self,
        report: ReportId,
        asset: &MediaAsset,
        bytes: Vec<u8>,
    ) -> Result<String, EndpointError> {
        let resp = self
            .client
            .post(self.url("media"))
            .header(CONTENT_TYPE, asset.mime_type.as_str())
            .header(FILE_NAME_HEADER, asset.name.as_str())
            .header(REPORT_ID_HEADER, report.to_string())
            .body(bytes)
            .send()
            .await
            .map_err(transport_error)?;

        let body: UploadResponse = check(resp).await?.json().await.map_err(transport_error)?;
        debug!(report_id = %report, name = %asset.name, location = %body.location, "Media uploaded");
        Ok(body.location)
    }

    async fn create_report(&self, record: &ReportRecord) -> Result<ReportReceipt, EndpointError> {
        let resp = self
            .client
            .post(self.url("reports"))
            .header(IDEMPOTENCY_HEADER, record.id.to_string())
            .json(record)
            .send()
            .await
            .map_err(transport_error)?;

        let body: CreateResponse = check(resp).await?.json().await.map_err(transport_error)?;
        Ok(ReportReceipt { remote_id: body.id })
    }
}

fn transport_error(e: reqwest::Error) -> EndpointError {
    if e.is_timeout() {
        EndpointError::Network(format!("Request timed out: {e}"))
    } else {
        EndpointError::Network(e.to_string())
    }
}

async fn check(resp: Response) -> Result<Response, EndpointError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let mut message = resp.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }

    if status.is_client_error() {
        warn!(status = status.as_u16(), message = %message, "Endpoint rejected request");
        Err(EndpointError::Rejected {
            status: status.as_u16(),
            message,
        })
    } else {
        Err(EndpointError::Network(server_error(status, &message)))
    }
}

fn server_error(status: StatusCode, message: &str) -> String {
    if message.is_empty() {
        format!("Server responded {status}")
    } else {
        format!("Server responded {status}: {message}")
    }
}
