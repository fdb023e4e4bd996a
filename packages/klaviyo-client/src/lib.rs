//! Pure Klaviyo REST API client.
//!
//! A minimal client for the Klaviyo JSON:API. Supports paging through the
//! members of a segment and recording events against profiles.
//!
//! # Example
//!
//! ```rust,ignore
//! use klaviyo_client::{CreateEventRequest, KlaviyoClient, PatchProperties};
//!
//! let client = KlaviyoClient::new("pk_live_...")?;
//!
//! let mut cursor = None;
//! loop {
//!     let page = client.segment_profiles_page("SEG123", 100, cursor.as_deref()).await?;
//!     for profile in &page.data {
//!         println!("{}", profile.id);
//!     }
//!     match page.links.next {
//!         Some(next) => cursor = Some(next),
//!         None => break,
//!     }
//! }
//!
//! client
//!     .create_event(
//!         &CreateEventRequest::new("Joined Segment", "01HXYZ")
//!             .patch(PatchProperties::append("Is in Segment", "VIPs")),
//!     )
//!     .await?;
//! ```

pub mod error;
pub mod types;

pub use error::{KlaviyoError, Result};
pub use types::{
    ApiListResponse, CreateEventRequest, Links, PatchProperties, Profile, ProfileAttributes,
    ProfilePage,
};

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretBox};
use serde::de::DeserializeOwned;

pub const DEFAULT_BASE_URL: &str = "https://a.klaviyo.com/api";

/// API revision sent with every request.
pub const DEFAULT_REVISION: &str = "2025-01-15";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest `page[size]` the segment profiles endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

const JSON_API: &str = "application/vnd.api+json";

pub struct KlaviyoClient {
    client: reqwest::Client,
    api_key: SecretBox<str>,
    base_url: String,
    revision: String,
}

impl KlaviyoClient {
    /// Create a client with the default base URL, revision and timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_http_client(DEFAULT_TIMEOUT)?,
            api_key: SecretBox::new(Box::from(api_key.into().as_str())),
            base_url: DEFAULT_BASE_URL.to_string(),
            revision: DEFAULT_REVISION.to_string(),
        })
    }

    /// Set a custom base URL (proxies, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    /// Replace the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_http_client(timeout)?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the first page of a segment's members.
    pub fn segment_profiles_url(&self, segment_id: &str) -> String {
        format!("{}/segments/{}/profiles/", self.base_url, segment_id)
    }

    /// Fetch one page of a segment's members.
    ///
    /// With no cursor the first page is requested with `page[size]`. A cursor
    /// is the `links.next` URL of the previous page and is followed verbatim,
    /// since it already encodes the page size.
    pub async fn segment_profiles_page(
        &self,
        segment_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<ProfilePage> {
        let request = match cursor {
            Some(next) => self.client.get(next),
            None => self
                .client
                .get(self.segment_profiles_url(segment_id))
                .query(&[("page[size]", page_size)]),
        };

        let resp = self
            .authorized(request)
            .send()
            .await
            .map_err(KlaviyoError::Network)?;

        let page: ProfilePage = parse_json(check_status(resp).await?).await?;
        tracing::debug!(
            segment_id,
            count = page.data.len(),
            has_next = page.links.next.is_some(),
            "Fetched segment profiles page"
        );
        Ok(page)
    }

    /// Record an event against a profile.
    ///
    /// Klaviyo answers `202 Accepted` on success; any 2xx is treated as success.
    pub async fn create_event(&self, request: &CreateEventRequest) -> Result<()> {
        let body = serde_json::to_vec(&request.to_document())
            .map_err(|e| KlaviyoError::Parse(format!("Failed to serialize event: {}", e)))?;

        let resp = self
            .authorized(self.client.post(format!("{}/events/", self.base_url)))
            .header(CONTENT_TYPE, JSON_API)
            .body(body)
            .send()
            .await
            .map_err(KlaviyoError::Network)?;

        check_status(resp).await?;
        tracing::debug!(
            metric = %request.metric_name,
            profile_id = %request.profile_id,
            "Event accepted"
        );
        Ok(())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(
                AUTHORIZATION,
                format!("Klaviyo-API-Key {}", self.api_key.expose_secret()),
            )
            .header(ACCEPT, JSON_API)
            .header("revision", self.revision.as_str())
    }
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| KlaviyoError::Config(format!("Failed to create HTTP client: {}", e)))
}

async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(KlaviyoError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

async fn parse_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let text = resp.text().await.map_err(KlaviyoError::Network)?;
    serde_json::from_str(&text)
        .map_err(|e| KlaviyoError::Parse(format!("Unexpected response body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_profiles_url_uses_base() {
        let client = KlaviyoClient::new("pk_test").unwrap();
        assert_eq!(
            client.segment_profiles_url("Xy12"),
            "https://a.klaviyo.com/api/segments/Xy12/profiles/"
        );
    }

    #[test]
    fn test_with_base_url_strips_trailing_slash() {
        let client = KlaviyoClient::new("pk_test")
            .unwrap()
            .with_base_url("http://localhost:9000/api/");
        assert_eq!(client.base_url(), "http://localhost:9000/api");
        assert_eq!(
            client.segment_profiles_url("S1"),
            "http://localhost:9000/api/segments/S1/profiles/"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = KlaviyoClient::new("pk_test")
            .unwrap()
            .with_base_url("http://127.0.0.1:1")
            .with_timeout(Duration::from_secs(2))
            .unwrap();

        let err = client
            .segment_profiles_page("S1", 10, None)
            .await
            .unwrap_err();

        assert!(matches!(err, KlaviyoError::Network(_)));
        assert!(err.status().is_none());
    }
}
