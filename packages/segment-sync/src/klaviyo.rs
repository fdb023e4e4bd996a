//! Klaviyo implementations of the membership source and event emitter.

use async_trait::async_trait;
use klaviyo_client::{CreateEventRequest, KlaviyoClient, KlaviyoError, PatchProperties};

use crate::config::Config;
use crate::error::{ConfigError, EmitError, FetchError};
use crate::traits::{EventEmitter, MembershipPage, MembershipSource};
use crate::types::{EventKind, LifecycleEvent, ProfileId};

/// Profile list property that mirrors the segments a profile belongs to.
pub const SEGMENT_LIST_PROPERTY: &str = "Is in Segment";

/// Build a client from validated configuration.
pub fn client_from_config(config: &Config) -> Result<KlaviyoClient, ConfigError> {
    let client = KlaviyoClient::new(config.api_key())
        .and_then(|c| c.with_timeout(config.request_timeout))
        .map_err(client_build_error)?;

    Ok(client
        .with_base_url(config.api_base_url.as_str())
        .with_revision(config.api_revision.as_str()))
}

fn client_build_error(e: KlaviyoError) -> ConfigError {
    match e {
        KlaviyoError::Config(reason) => ConfigError::Client(reason),
        other => ConfigError::Client(other.to_string()),
    }
}

/// Translate a lifecycle event into a Klaviyo event submission.
///
/// Besides the metric, the event patches the profile's segment list so
/// flows can filter on current membership.
pub fn event_request(event: &LifecycleEvent) -> CreateEventRequest {
    let patch = match event.kind {
        EventKind::Joined => PatchProperties::append(SEGMENT_LIST_PROPERTY, &event.segment_name),
        EventKind::Left => PatchProperties::unappend(SEGMENT_LIST_PROPERTY, &event.segment_name),
    };

    CreateEventRequest::new(event.kind.metric_name(), event.profile_id.as_str())
        .property("segment_id", event.segment_id.as_str())
        .property("segment_name", event.segment_name.as_str())
        .property("timestamp", event.occurred_at.to_rfc3339())
        .time(event.occurred_at)
        .patch(patch)
}

#[async_trait]
impl MembershipSource for KlaviyoClient {
    async fn fetch_page(
        &self,
        segment_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<MembershipPage, FetchError> {
        let page = self
            .segment_profiles_page(segment_id, page_size, cursor)
            .await
            .map_err(|e| match e {
                KlaviyoError::Api { status, body } => FetchError::Status { status, body },
                KlaviyoError::Parse(msg) => FetchError::Decode(msg),
                other => FetchError::Transport(other.to_string()),
            })?;

        Ok(MembershipPage {
            profile_ids: page.data.into_iter().map(|p| ProfileId::from(p.id)).collect(),
            next_cursor: page.links.next,
        })
    }
}

#[async_trait]
impl EventEmitter for KlaviyoClient {
    async fn emit(&self, event: &LifecycleEvent) -> Result<(), EmitError> {
        self.create_event(&event_request(event))
            .await
            .map_err(|e| match e {
                KlaviyoError::Api { status, body } => EmitError::Status { status, body },
                other => EmitError::Transport(other.to_string()),
            })
    }
}
