use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while decoding a storage event message
#[derive(Error, Debug)]
pub enum EventParseError {
    /// Body is not one of the accepted event formats
    #[error("Invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// Record carries neither a version id nor an `ETag`
    #[error("Event for {0} has no object version")]
    MissingVersion(String),
}

/// Notification that an object write completed.
///
/// Delivered at-least-once and unordered across keys. Two events with the same
/// `(object_key, object_version)` describe the same upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEvent {
    /// Key of the written object
    pub object_key: String,
    /// Version id, or `ETag` for unversioned buckets
    pub object_version: String,
    /// Object size as reported by storage
    pub size_bytes: u64,
    /// When the write completed
    pub event_time: DateTime<Utc>,
    /// Identifier of this particular delivery
    #[serde(default)]
    pub delivery_id: String,
}

impl StorageEvent {
    /// Decodes a queue message body into the storage events it carries.
    ///
    /// Accepts S3 event notifications (only `ObjectCreated:*` records are kept),
    /// the S3 `s3:TestEvent` message (yields no events) and a flat
    /// `{objectKey, objectVersion, sizeBytes, eventTime}` document.
    ///
    /// # Errors
    ///
    /// Returns `EventParseError` if the body matches none of the formats or a
    /// record has no usable version
    pub fn from_message_body(body: &str, delivery_id: &str) -> Result<Vec<Self>, EventParseError> {
        match serde_json::from_str::<MessageBody>(body)? {
            MessageBody::Notification(notification) => notification
                .records
                .into_iter()
                .filter(|record| record.event_name.starts_with("ObjectCreated:"))
                .map(|record| record.into_storage_event(delivery_id))
                .collect(),
            MessageBody::Test(_) => Ok(Vec::new()),
            MessageBody::Flat(mut event) => {
                event.delivery_id = delivery_id.to_string();
                Ok(vec![event])
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
#[allow(dead_code)]
enum MessageBody {
    Notification(S3EventNotification),
    Test(S3TestEvent),
    Flat(StorageEvent),
}

#[derive(Deserialize)]
struct S3EventNotification {
    #[serde(rename = "Records")]
    records: Vec<S3EventRecord>,
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct S3TestEvent {
    #[serde(rename = "Event")]
    event: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct S3EventRecord {
    event_name: String,
    event_time: DateTime<Utc>,
    s3: S3Entity,
}

#[derive(Deserialize)]
struct S3Entity {
    object: S3Object,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct S3Object {
    key: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    e_tag: Option<String>,
    #[serde(default)]
    version_id: Option<String>,
}

impl S3EventRecord {
    fn into_storage_event(self, delivery_id: &str) -> Result<StorageEvent, EventParseError> {
        let object_key = decode_object_key(&self.s3.object.key);

        let object_version = self
            .s3
            .object
            .version_id
            .filter(|v| !v.is_empty() && v != "null")
            .or(self.s3.object.e_tag)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| EventParseError::MissingVersion(object_key.clone()))?;

        Ok(StorageEvent {
            object_key,
            object_version,
            size_bytes: self.s3.object.size,
            event_time: self.event_time,
            delivery_id: delivery_id.to_string(),
        })
    }
}

/// S3 notifications carry keys form-URL-encoded (`+` for spaces)
fn decode_object_key(raw: &str) -> String {
    url::form_urlencoded::parse(raw.as_bytes())
        .next()
        .map_or_else(|| raw.to_string(), |(key, _)| key.into_owned())
}
