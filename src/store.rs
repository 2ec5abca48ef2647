//! MongoDB-backed persistence for feedback records.
//!
//! [`FeedbackStore`] is an explicitly constructed handle around the driver's
//! connection pool: opened once at startup, cloned cheaply into the shared
//! state, and shut down during graceful shutdown. There is no cache or
//! in-memory mirror - every read is a fresh query.
//!
//! Writes re-run the full rule set from [`crate::validation`] even though
//! the handlers already validated the payload. The store is the last line
//! of defense: the collection never holds a record that violates the field
//! constraints, no matter which caller reached it.
//!
//! The service applies no optimistic concurrency control. Concurrent
//! mutations of the same record race and the later store operation wins; an
//! update issued just after a delete observes `NotFound`.

use bson::oid::ObjectId;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection, IndexModel};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::FeedbackError;
use crate::model::{Feedback, FeedbackDocument};
use crate::validation::{self, FeedbackFields};

const DEFAULT_DATABASE: &str = "parknet";
const COLLECTION: &str = "feedbacks";

/// Parse a client-supplied identifier into an `ObjectId`.
///
/// A string that is not 24 hex characters is a malformed identifier, which
/// is a different failure from a well-formed identifier that matches no
/// record.
pub fn parse_feedback_id(id: &str) -> Result<ObjectId, FeedbackError> {
    ObjectId::parse_str(id).map_err(|_| FeedbackError::MalformedId { id: id.to_string() })
}

/// Handle to the `feedbacks` collection.
#[derive(Clone)]
pub struct FeedbackStore {
    client: Client,
    collection: Collection<FeedbackDocument>,
}

impl std::fmt::Debug for FeedbackStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackStore")
            .field("namespace", &self.collection.namespace())
            .finish()
    }
}

impl FeedbackStore {
    /// Open the store: connect, then ensure the secondary indexes exist.
    ///
    /// The index round-trip doubles as a connectivity probe so a bad
    /// `MONGODB_URL` is caught at startup rather than on the first request.
    pub async fn open(config: &AppConfig) -> Result<Self, FeedbackError> {
        let store = Self::connect(&config.mongodb_url).await?;
        store.ensure_indexes().await?;
        info!(namespace = %store.collection.namespace(), "MongoDB store opened");
        Ok(store)
    }

    /// Build the handle without touching the server. Connections are
    /// established lazily by the driver on first operation.
    pub(crate) async fn connect(url: &str) -> Result<Self, FeedbackError> {
        let client = Client::with_uri_str(url).await?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));
        let collection = database.collection::<FeedbackDocument>(COLLECTION);
        Ok(Self { client, collection })
    }

    /// Secondary indexes: `email` ascending and `createdAt` descending, the
    /// latter backing chronological listing.
    async fn ensure_indexes(&self) -> Result<(), FeedbackError> {
        let indexes = [
            IndexModel::builder().keys(doc! { "email": 1 }).build(),
            IndexModel::builder().keys(doc! { "createdAt": -1 }).build(),
        ];
        self.collection.create_indexes(indexes).await?;
        Ok(())
    }

    /// Shut the connection pool down. Called once during graceful shutdown.
    pub async fn close(self) {
        self.client.shutdown().await;
        info!("MongoDB store closed");
    }

    /// Insert a new record. All three fields are required and re-validated
    /// at this boundary; timestamps and the identifier are assigned here.
    pub async fn create(&self, fields: &FeedbackFields) -> Result<Feedback, FeedbackError> {
        let missing = fields.missing_for_create();
        if !missing.is_empty() {
            return Err(FeedbackError::missing_create_fields(missing));
        }
        let normalized = validation::validate(fields).map_err(FeedbackError::Validation)?;
        let (Some(name), Some(email), Some(message)) =
            (normalized.name, normalized.email, normalized.message)
        else {
            return Err(FeedbackError::missing_create_fields(vec![
                "name", "email", "message",
            ]));
        };

        let now = bson::DateTime::now();
        let document = FeedbackDocument {
            id: ObjectId::new(),
            name,
            email,
            message,
            created_at: now,
            updated_at: now,
        };
        self.collection.insert_one(&document).await?;
        debug!(id = %document.id, "Feedback record created");
        Ok(document.into())
    }

    /// All records, most recent first. An empty collection is a valid,
    /// non-error result.
    pub async fn list_all(&self) -> Result<Vec<Feedback>, FeedbackError> {
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .await?;
        let documents: Vec<FeedbackDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(Feedback::from).collect())
    }

    /// Fetch one record by identifier.
    pub async fn get_by_id(&self, id: &str) -> Result<Feedback, FeedbackError> {
        let oid = parse_feedback_id(id)?;
        let document = self.collection.find_one(doc! { "_id": oid }).await?;
        document
            .map(Feedback::from)
            .ok_or_else(|| FeedbackError::NotFound { id: id.to_string() })
    }

    /// Apply a partial update: at least one field must be supplied, each
    /// supplied field is re-validated, omitted fields are retained, and
    /// `updatedAt` is refreshed.
    pub async fn update_partial(
        &self,
        id: &str,
        fields: &FeedbackFields,
    ) -> Result<Feedback, FeedbackError> {
        let oid = parse_feedback_id(id)?;
        if fields.is_empty() {
            return Err(FeedbackError::empty_update());
        }
        let normalized = validation::validate(fields).map_err(FeedbackError::Validation)?;

        let mut set = Document::new();
        if let Some(name) = normalized.name {
            set.insert("name", name);
        }
        if let Some(email) = normalized.email {
            set.insert("email", email);
        }
        if let Some(message) = normalized.message {
            set.insert("message", message);
        }
        set.insert("updatedAt", bson::DateTime::now());

        let updated = self
            .collection
            .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        updated
            .map(Feedback::from)
            .ok_or_else(|| FeedbackError::NotFound { id: id.to_string() })
    }

    /// Remove a record and return it. Deletion is terminal: a second delete
    /// of the same identifier fails with `NotFound`.
    pub async fn delete_by_id(&self, id: &str) -> Result<Feedback, FeedbackError> {
        let oid = parse_feedback_id(id)?;
        let deleted = self.collection.find_one_and_delete(doc! { "_id": oid }).await?;
        match deleted {
            Some(document) => {
                debug!(id = %document.id, "Feedback record deleted");
                Ok(document.into())
            }
            None => Err(FeedbackError::NotFound { id: id.to_string() }),
        }
    }
}
