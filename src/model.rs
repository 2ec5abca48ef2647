//! Feedback record models.
//!
//! A record has two representations: [`FeedbackDocument`] is the BSON shape
//! persisted in MongoDB (`ObjectId` identifier, BSON datetimes), and
//! [`Feedback`] is the JSON shape returned to clients (24-char hex string
//! identifier, RFC 3339 timestamps). Conversion is lossless and one-way;
//! documents are only ever constructed by the store.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored shape of a feedback record.
///
/// Field names match the collection's document keys, so this struct is the
/// single source of truth for the persisted layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(rename = "createdAt")]
    pub created_at: bson::DateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: bson::DateTime,
}

/// Wire shape of a feedback record.
///
/// `id` is the hex rendering of the stored `ObjectId`; timestamps serialize
/// as RFC 3339 strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FeedbackDocument> for Feedback {
    fn from(doc: FeedbackDocument) -> Self {
        Self {
            id: doc.id.to_hex(),
            name: doc.name,
            email: doc.email,
            message: doc.message,
            created_at: doc.created_at.to_chrono(),
            updated_at: doc.updated_at.to_chrono(),
        }
    }
}
