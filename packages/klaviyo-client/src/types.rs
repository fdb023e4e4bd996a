//! Klaviyo JSON:API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Segment profiles
// =============================================================================

/// One page of a JSON:API collection response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiListResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub links: Links,
}

/// Pagination links. `next` is absent or null on the last page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: Option<String>,
    pub next: Option<String>,
    pub prev: Option<String>,
}

/// A profile resource as returned by `GET /segments/{id}/profiles/`.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub attributes: ProfileAttributes,
}

/// The subset of profile attributes this client reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileAttributes {
    pub email: Option<String>,
    pub external_id: Option<String>,
}

/// A page of segment members.
pub type ProfilePage = ApiListResponse<Profile>;

// =============================================================================
// Events
// =============================================================================

/// Property list updates applied to the event's profile.
///
/// Keys map to profile properties; values are appended to (or removed from)
/// list-valued properties.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatchProperties {
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub append: Map<String, Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub unappend: Map<String, Value>,
}

impl PatchProperties {
    /// Append `value` to the list property `key`.
    pub fn append(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut patch = Self::default();
        patch
            .append
            .insert(key.into(), Value::Array(vec![Value::String(value.into())]));
        patch
    }

    /// Remove `value` from the list property `key`.
    pub fn unappend(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut patch = Self::default();
        patch
            .unappend
            .insert(key.into(), Value::Array(vec![Value::String(value.into())]));
        patch
    }

    pub fn is_empty(&self) -> bool {
        self.append.is_empty() && self.unappend.is_empty()
    }
}

/// A single event to record against an existing profile.
#[derive(Debug, Clone)]
pub struct CreateEventRequest {
    /// Metric name, e.g. "Joined Segment"
    pub metric_name: String,
    /// Klaviyo profile id the event belongs to
    pub profile_id: String,
    /// Free-form event properties
    pub properties: Map<String, Value>,
    /// When the event happened. Klaviyo uses receipt time when absent.
    pub time: Option<DateTime<Utc>>,
    pub patch_properties: Option<PatchProperties>,
}

impl CreateEventRequest {
    pub fn new(metric_name: impl Into<String>, profile_id: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
            profile_id: profile_id.into(),
            properties: Map::new(),
            time: None,
            patch_properties: None,
        }
    }

    /// Add an event property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn patch(mut self, patch: PatchProperties) -> Self {
        self.patch_properties = Some(patch);
        self
    }

    /// Build the JSON:API document sent to `POST /events/`.
    pub fn to_document(&self) -> EventDocument<'_> {
        let profile_attributes = self
            .patch_properties
            .as_ref()
            .filter(|p| !p.is_empty())
            .map(|patch| ProfileMetaAttributes {
                meta: ProfileMeta {
                    patch_properties: patch,
                },
            });

        EventDocument {
            data: EventData {
                kind: "event",
                attributes: EventAttributes {
                    properties: &self.properties,
                    time: self.time,
                    metric: Relationship {
                        data: MetricData {
                            kind: "metric",
                            attributes: MetricAttributes {
                                name: &self.metric_name,
                            },
                        },
                    },
                    profile: Relationship {
                        data: ProfileData {
                            kind: "profile",
                            id: &self.profile_id,
                            attributes: profile_attributes,
                        },
                    },
                },
            },
        }
    }
}

/// Wire shape of an event creation request.
#[derive(Debug, Serialize)]
pub struct EventDocument<'a> {
    data: EventData<'a>,
}

#[derive(Debug, Serialize)]
struct EventData<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    attributes: EventAttributes<'a>,
}

#[derive(Debug, Serialize)]
struct EventAttributes<'a> {
    properties: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<DateTime<Utc>>,
    metric: Relationship<MetricData<'a>>,
    profile: Relationship<ProfileData<'a>>,
}

#[derive(Debug, Serialize)]
struct Relationship<T> {
    data: T,
}

#[derive(Debug, Serialize)]
struct MetricData<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    attributes: MetricAttributes<'a>,
}

#[derive(Debug, Serialize)]
struct MetricAttributes<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct ProfileData<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<ProfileMetaAttributes<'a>>,
}

#[derive(Debug, Serialize)]
struct ProfileMetaAttributes<'a> {
    meta: ProfileMeta<'a>,
}

#[derive(Debug, Serialize)]
struct ProfileMeta<'a> {
    patch_properties: &'a PatchProperties,
}
