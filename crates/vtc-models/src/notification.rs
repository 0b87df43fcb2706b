//! Upload notification parsing.
//!
//! Queue message bodies arrive as opaque bytes and decode into one of
//! two envelope shapes: a system self-test (`Service` + `Event`) that
//! carries no object references, or a `Records` sequence where every
//! record yields exactly one [`StorageObjectRef`].

use serde::Deserialize;
use thiserror::Error;

use crate::object_ref::StorageObjectRef;

/// Event value the storage service sends when probing a queue.
pub const TEST_EVENT_SENTINEL: &str = "s3:TestEvent";

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed notification body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Notification has no Records sequence")]
    MissingRecords,

    #[error("Record {0} has no bucket name")]
    MissingBucket(usize),

    #[error("Record {0} has no object key")]
    MissingKey(usize),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Service")]
    service: Option<String>,
    #[serde(rename = "Event")]
    event: Option<String>,
    #[serde(rename = "Records")]
    records: Option<Vec<EventRecord>>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    s3: Option<S3Entity>,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: Option<BucketEntity>,
    object: Option<ObjectEntity>,
}

#[derive(Debug, Deserialize)]
struct BucketEntity {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectEntity {
    key: Option<String>,
}

/// Decode a raw message body into the object references it names.
///
/// Self-test envelopes yield an empty vector: they are explicitly
/// ignored, not an error. Everything else must carry a `Records`
/// sequence; record order is preserved in the output.
///
/// Pure function, no side effects.
pub fn parse_notification(body: &[u8]) -> ParseResult<Vec<StorageObjectRef>> {
    let envelope: Envelope = serde_json::from_slice(body)?;

    // Self-test probe: Service and Event present, Event matches the sentinel.
    if envelope.service.is_some() && envelope.event.as_deref() == Some(TEST_EVENT_SENTINEL) {
        return Ok(Vec::new());
    }

    let records = envelope.records.ok_or(ParseError::MissingRecords)?;

    let mut refs = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let s3 = record.s3.ok_or(ParseError::MissingBucket(index))?;
        let bucket = s3
            .bucket
            .and_then(|b| b.name)
            .ok_or(ParseError::MissingBucket(index))?;
        let key = s3
            .object
            .and_then(|o| o.key)
            .ok_or(ParseError::MissingKey(index))?;
        refs.push(StorageObjectRef::new(bucket, key));
    }

    Ok(refs)
}
