//! Site imports REST API client
//!
//! - `GET  /sites/{site}/imports/`             list sessions
//! - `POST /sites/{site}/imports/{importId}`   state-change order (form field `importStatus`)
//! - `POST /sites/{site}/imports/new`          multipart export upload

use super::{ImportTransport, UploadRequest};
use crate::error::{TransportError, TransportResult};
use async_trait::async_trait;
use futures::StreamExt;
use importer_common::api::RawImporterStatus;
use importer_common::config::ClientConfig;
use importer_common::models::{SiteId, UploadProgress};
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::Deserialize;

const USER_AGENT: &str = concat!("site-importer/", env!("CARGO_PKG_VERSION"));
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Fetch responses are either one record or a list of records
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<RawImporterStatus>),
    One(Box<RawImporterStatus>),
    Empty(Option<()>),
}

/// reqwest-backed `ImportTransport`
pub struct HttpTransport {
    http_client: reqwest::Client,
    api_base: String,
    access_token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> TransportResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> TransportResult<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TransportError::Api(status.as_u16(), error_text));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| TransportError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ImportTransport for HttpTransport {
    async fn fetch_sessions(&self, site_id: SiteId) -> TransportResult<Vec<RawImporterStatus>> {
        let url = self.url(&format!("/sites/{}/imports/", site_id));
        tracing::debug!(site_id, url = %url, "Fetching import sessions");

        let response = self.authorize(self.http_client.get(&url)).send().await?;

        Ok(match Self::parse_response::<OneOrMany>(response).await? {
            OneOrMany::Many(list) => list,
            OneOrMany::One(raw) => vec![*raw],
            OneOrMany::Empty(_) => Vec::new(),
        })
    }

    async fn update_session(
        &self,
        site_id: SiteId,
        order: RawImporterStatus,
    ) -> TransportResult<RawImporterStatus> {
        let url = self.url(&format!("/sites/{}/imports/{}", site_id, order.import_id));
        let import_status =
            serde_json::to_string(&order).map_err(|e| TransportError::Parse(e.to_string()))?;
        tracing::debug!(site_id, url = %url, import_status = %import_status, "Updating import session");

        let response = self
            .authorize(self.http_client.post(&url))
            .form(&[("importStatus", import_status)])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn upload_file(
        &self,
        site_id: SiteId,
        request: UploadRequest,
    ) -> TransportResult<RawImporterStatus> {
        let UploadRequest {
            import_status,
            file,
            on_progress,
            abort,
        } = request;

        let url = self.url(&format!("/sites/{}/imports/new", site_id));
        let import_status =
            serde_json::to_string(&import_status).map_err(|e| TransportError::Parse(e.to_string()))?;

        let total = file.len();
        tracing::debug!(site_id, url = %url, filename = %file.name, total, "Uploading export file");

        let chunks: Vec<Vec<u8>> = file
            .contents
            .chunks(UPLOAD_CHUNK_SIZE)
            .map(|chunk| chunk.to_vec())
            .collect();
        let mut loaded = 0u64;
        let stream = futures::stream::iter(chunks).map(move |chunk| {
            loaded += chunk.len() as u64;
            on_progress(UploadProgress { loaded, total });
            Ok::<_, std::io::Error>(chunk)
        });

        let part = multipart::Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(file.name);
        let form = multipart::Form::new()
            .text("importStatus", import_status)
            .part("import", part);

        let send = self
            .authorize(self.http_client.post(&url))
            .multipart(form)
            .send();

        let response = tokio::select! {
            _ = abort.cancelled() => {
                tracing::info!(site_id, "Upload aborted");
                return Err(TransportError::Aborted);
            }
            result = send => result?,
        };

        Self::parse_response(response).await
    }
}
