//! Cloudflare v4 API client.
//!
//! Only the two calls the purge subsystem needs are implemented: listing
//! zones and purging files by URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::application::provider::{EdgeCacheProvider, ProviderError};
use crate::domain::types::{Credentials, PurgeTarget, Zone};

use super::error::InfraError;

pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";
const ZONES_PER_PAGE: u32 = 50;
/// Cloudflare rejects purge-by-URL requests with more files than this.
const MAX_FILES_PER_PURGE: usize = 30;
const HEADER_AUTH_EMAIL: &str = "X-Auth-Email";
const HEADER_AUTH_KEY: &str = "X-Auth-Key";
const UNKNOWN_ERROR_MESSAGE: &str = "unknown Cloudflare error";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Serialize)]
struct PurgeFilesBody<'a> {
    files: Vec<&'a str>,
}

#[derive(Clone, Debug)]
pub struct CloudflareClient {
    client: Client,
    base: Url,
}

impl CloudflareClient {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, InfraError> {
        let base = Url::parse(api_base.trim_end_matches('/')).map_err(|err| {
            InfraError::configuration(format!("invalid Cloudflare API base `{api_base}`: {err}"))
        })?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("cfpurge/", env!("CARGO_PKG_VERSION"))
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::InvalidRequest("API base cannot hold a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
        request
            .header(HEADER_AUTH_EMAIL, credentials.email.as_str())
            .header(HEADER_AUTH_KEY, credentials.auth_key.as_str())
    }

    async fn send<T: DeserializeOwned>(
        request: RequestBuilder,
    ) -> Result<Envelope<T>, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        Self::handle(response).await
    }

    async fn handle<T: DeserializeOwned>(resp: Response) -> Result<Envelope<T>, ProviderError> {
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        let envelope: Envelope<T> = serde_json::from_slice(&bytes).map_err(|err| {
            let text = String::from_utf8_lossy(&bytes);
            ProviderError::Decode(format!("status {status}: {err}; body {text}"))
        })?;

        if !envelope.success || !status.is_success() {
            return Err(first_error(&envelope.errors));
        }
        Ok(envelope)
    }

    async fn list_zone_page(
        &self,
        credentials: &Credentials,
        page: u32,
    ) -> Result<(Vec<Zone>, u32), ProviderError> {
        let mut url = self.url(&["zones"])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &ZONES_PER_PAGE.to_string());

        let request = self.authorized(self.client.get(url), credentials);
        let envelope: Envelope<Vec<Zone>> = Self::send(request).await?;
        let total_pages = envelope
            .result_info
            .as_ref()
            .map(|info| info.total_pages.max(info.page))
            .unwrap_or(page);
        let zones = envelope
            .result
            .ok_or_else(|| first_error(&envelope.errors))?;
        Ok((zones, total_pages))
    }
}

fn first_error(errors: &[ApiMessage]) -> ProviderError {
    match errors.first() {
        Some(error) => ProviderError::api(error.message.clone(), error.code),
        None => ProviderError::api(UNKNOWN_ERROR_MESSAGE, 0),
    }
}

#[async_trait]
impl EdgeCacheProvider for CloudflareClient {
    #[instrument(skip_all)]
    async fn list_zones(&self, credentials: &Credentials) -> Result<Vec<Zone>, ProviderError> {
        let mut zones = Vec::new();
        let mut page = 1;
        loop {
            let (mut batch, total_pages) = self.list_zone_page(credentials, page).await?;
            zones.append(&mut batch);
            if page >= total_pages {
                break;
            }
            page += 1;
        }

        debug!(zone_count = zones.len(), "zones listed");
        Ok(zones)
    }

    #[instrument(skip_all, fields(zone_id = %zone_id, target_count = targets.len()))]
    async fn purge_files(
        &self,
        credentials: &Credentials,
        zone_id: &str,
        targets: &[PurgeTarget],
    ) -> Result<(), ProviderError> {
        if zone_id.trim().is_empty() {
            return Err(ProviderError::InvalidRequest("zone id is empty".into()));
        }

        let url = self.url(&["zones", zone_id, "purge_cache"])?;
        for chunk in targets.chunks(MAX_FILES_PER_PURGE) {
            let body = PurgeFilesBody {
                files: chunk.iter().map(PurgeTarget::as_str).collect(),
            };
            let request = self
                .authorized(self.client.post(url.clone()), credentials)
                .json(&body);
            let _: Envelope<serde_json::Value> = Self::send(request).await?;
            debug!(file_count = chunk.len(), "purge chunk accepted");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use serde_json::json;

    use super::*;

    fn client(server: &MockServer) -> CloudflareClient {
        CloudflareClient::new(&server.base_url(), Duration::from_secs(5)).expect("client")
    }

    fn credentials() -> Credentials {
        Credentials::new("ops@example.com", "secret")
    }

    #[tokio::test]
    async fn lists_zones_with_auth_headers() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("GET")
                    .path("/zones")
                    .query_param("page", "1")
                    .header("x-auth-email", "ops@example.com")
                    .header("x-auth-key", "secret");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "success": true,
                        "errors": [],
                        "result": [{"id": "z1", "name": "example.com", "status": "active"}],
                        "result_info": {"page": 1, "total_pages": 1}
                    }));
            })
            .await;

        let zones = client(&server)
            .list_zones(&credentials())
            .await
            .expect("zones");
        mock.assert_async().await;
        assert_eq!(
            zones,
            vec![Zone {
                id: "z1".into(),
                name: "example.com".into()
            }]
        );
    }

    #[tokio::test]
    async fn walks_every_zone_page() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method("GET").path("/zones").query_param("page", "1");
                then.status(200).json_body(json!({
                    "success": true,
                    "result": [{"id": "z1", "name": "a.com"}],
                    "result_info": {"page": 1, "total_pages": 2}
                }));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method("GET").path("/zones").query_param("page", "2");
                then.status(200).json_body(json!({
                    "success": true,
                    "result": [{"id": "z2", "name": "b.com"}],
                    "result_info": {"page": 2, "total_pages": 2}
                }));
            })
            .await;

        let zones = client(&server)
            .list_zones(&credentials())
            .await
            .expect("zones");
        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[1].name, "b.com");
    }

    #[tokio::test]
    async fn zone_error_carries_message_and_code() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/zones");
                then.status(403).json_body(json!({
                    "success": false,
                    "errors": [{"code": 9103, "message": "Unknown X-Auth-Key or X-Auth-Email"}],
                    "result": null
                }));
            })
            .await;

        match client(&server).list_zones(&credentials()).await {
            Err(ProviderError::Api { message, code }) => {
                assert_eq!(message, "Unknown X-Auth-Key or X-Auth-Email");
                assert_eq!(code, 9103);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_zone_result_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/zones");
                then.status(200).json_body(json!({"success": true, "errors": []}));
            })
            .await;

        let err = client(&server)
            .list_zones(&credentials())
            .await
            .expect_err("missing result");
        assert!(matches!(err, ProviderError::Api { code: 0, .. }));
    }

    #[tokio::test]
    async fn purges_files_in_chunks() {
        let server = MockServer::start_async().await;
        let targets: Vec<PurgeTarget> = (0..31)
            .map(|i| PurgeTarget::new(format!("https://example.com/{i}")))
            .collect();
        let first_files: Vec<&str> = targets[..30].iter().map(PurgeTarget::as_str).collect();

        let first = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/zones/zone-1/purge_cache")
                    .header("x-auth-email", "ops@example.com")
                    .json_body(json!({ "files": first_files }));
                then.status(200)
                    .json_body(json!({"success": true, "errors": [], "result": {"id": "zone-1"}}));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/zones/zone-1/purge_cache")
                    .json_body(json!({ "files": ["https://example.com/30"] }));
                then.status(200)
                    .json_body(json!({"success": true, "errors": [], "result": {"id": "zone-1"}}));
            })
            .await;

        client(&server)
            .purge_files(&credentials(), "zone-1", &targets)
            .await
            .expect("purge");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn purge_failure_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST").path("/zones/zone-1/purge_cache");
                then.status(400).json_body(json!({
                    "success": false,
                    "errors": [{"code": 1012, "message": "Request must contain one of \"purge_everything\" or \"files\""}]
                }));
            })
            .await;

        let err = client(&server)
            .purge_files(&credentials(), "zone-1", &[PurgeTarget::from("https://a.com/")])
            .await
            .expect_err("purge should fail");
        assert!(matches!(err, ProviderError::Api { code: 1012, .. }));
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST").path("/zones/zone-1/purge_cache");
                then.status(502).body("<html>bad gateway</html>");
            })
            .await;

        let err = client(&server)
            .purge_files(&credentials(), "zone-1", &[PurgeTarget::from("https://a.com/")])
            .await
            .expect_err("purge should fail");
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[test]
    fn rejects_invalid_api_base() {
        let err = CloudflareClient::new("not a url", Duration::from_secs(1)).expect_err("invalid");
        assert!(matches!(err, InfraError::Configuration { .. }));
    }
}
