use reqwest::{Client, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::errors::{KwirthError, KwirthResult};
use crate::types::{ClusterTarget, Scope};

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

/// HTTP client for the Kwirth backend plugin.
#[derive(Debug, Clone)]
pub struct AccessClient {
    base_url: String,
    client: Client,
}

impl AccessClient {
    pub fn new(base_url: &str, timeout: Duration) -> KwirthResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| KwirthError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        what: &str,
        request: reqwest::RequestBuilder,
    ) -> KwirthResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| KwirthError::Network(format!("{} error: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KwirthError::Network(format!("{} error: {}", what, e)))?;

        if !status.is_success() {
            return Err(KwirthError::Network(format!(
                "{} error: status {}: {}",
                what, status, body
            )));
        }

        decode(what, &body)
    }

    /// Backend version string.
    pub async fn get_version(&self) -> KwirthResult<String> {
        let request = self.client.get(self.endpoint("version"));
        let data: VersionResponse = self.request_json("getVersion", request).await?;
        Ok(data.version)
    }

    /// Clusters (and their pods) where `entity` has been discovered.
    pub async fn get_resources(&self, entity: &serde_json::Value) -> KwirthResult<Vec<ClusterTarget>> {
        let request = self.client.post(self.endpoint("start")).json(entity);
        self.request_json("getResources", request).await
    }

    /// Clusters where `entity` runs, with access keys for the requested scopes
    /// on `channel`.
    pub async fn request_access(
        &self,
        entity: &serde_json::Value,
        channel: &str,
        scopes: &[Scope],
    ) -> KwirthResult<Vec<ClusterTarget>> {
        let scopes = scopes
            .iter()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join(",");
        debug!("Requesting access: channel={} scopes={}", channel, scopes);
        let request = self
            .client
            .post(self.endpoint("access"))
            .query(&[("scopes", scopes.as_str()), ("channel", channel)])
            .json(entity);
        self.request_json("requestAccess", request).await
    }
}

fn decode<T: DeserializeOwned>(what: &str, body: &str) -> KwirthResult<T> {
    serde_json::from_str(body)
        .map_err(|e| KwirthError::Network(format!("{} error: malformed response: {}", what, e)))
}
