//! MongoDB implementation of PurchaseRepository

use crate::error::{PurchaseError, Result};
use crate::models::{PurchaseEvent, StoredPurchase};
use crate::repository::{InsertOutcome, PurchaseRepository};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc, to_document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use tracing::{debug, instrument};

/// Server error code for a unique index violation
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Name of the unique index on `timestamp`
pub const TIMESTAMP_INDEX: &str = "timestamp_unique";

/// MongoDB-based purchase repository
#[derive(Clone)]
pub struct MongoPurchaseRepository {
    database: Database,
    collection: Collection<Document>,
}

impl MongoPurchaseRepository {
    pub fn new(database: &Database, collection: &str) -> Self {
        Self {
            database: database.clone(),
            collection: database.collection(collection),
        }
    }

    fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
            ErrorKind::Command(e) => e.code == DUPLICATE_KEY_CODE,
            _ => false,
        }
    }

    /// A write error other than a duplicate key is tied to the document,
    /// not to the store's availability.
    fn is_document_rejected(err: &mongodb::error::Error) -> bool {
        matches!(
            err.kind.as_ref(),
            ErrorKind::Write(WriteFailure::WriteError(e)) if e.code != DUPLICATE_KEY_CODE
        )
    }

    /// Render a stored document with its `_id` as a plain string.
    fn to_stored(mut document: Document) -> Result<StoredPurchase> {
        let id = match document.remove("_id") {
            Some(Bson::ObjectId(oid)) => oid.to_hex(),
            Some(Bson::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        match Bson::Document(document).into_relaxed_extjson() {
            serde_json::Value::Object(fields) => Ok(StoredPurchase { id, fields }),
            other => Err(PurchaseError::InvalidEvent(format!(
                "stored purchase is not a document: {other}"
            ))),
        }
    }
}

#[async_trait]
impl PurchaseRepository for MongoPurchaseRepository {
    #[instrument(skip(self, event), fields(timestamp = %event.timestamp))]
    async fn insert(&self, event: &PurchaseEvent) -> Result<InsertOutcome> {
        let document = to_document(event)?;

        match self.collection.insert_one(document).await {
            Ok(result) => {
                let id = match result.inserted_id {
                    Bson::ObjectId(oid) => oid.to_hex(),
                    other => other.to_string(),
                };
                Ok(InsertOutcome::Inserted { id })
            }
            Err(e) if Self::is_duplicate_key(&e) => {
                debug!("Purchase already stored");
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) if Self::is_document_rejected(&e) => {
                Err(PurchaseError::Rejected(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<StoredPurchase>> {
        let documents: Vec<Document> = self.collection.find(doc! {}).await?.try_collect().await?;
        documents.into_iter().map(Self::to_stored).collect()
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "timestamp": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name(TIMESTAMP_INDEX.to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(index).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        database::mongodb::ping(&self.database)
            .await
            .map(|_| ())
            .map_err(|e| PurchaseError::StoreUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;
    use serde_json::json;

    #[test]
    fn test_object_id_rendered_as_hex() {
        let oid = ObjectId::new();
        let document = doc! {
            "_id": oid,
            "item": "book",
            "qty": 2_i64,
            "timestamp": "2024-05-01T12:00:00.000000+03:00",
        };

        let stored = MongoPurchaseRepository::to_stored(document).unwrap();

        assert_eq!(stored.id, oid.to_hex());
        assert_eq!(stored.fields.get("item"), Some(&json!("book")));
        assert_eq!(stored.fields.get("qty"), Some(&json!(2)));
        assert_eq!(stored.timestamp(), Some("2024-05-01T12:00:00.000000+03:00"));
        assert!(!stored.fields.contains_key("_id"));
    }

    #[test]
    fn test_string_id_kept() {
        let stored = MongoPurchaseRepository::to_stored(doc! { "_id": "custom" }).unwrap();
        assert_eq!(stored.id, "custom");
    }

    #[test]
    fn test_event_document_shape() {
        let event: PurchaseEvent = serde_json::from_value(json!({
            "item": "book",
            "timestamp": "2024-05-01T12:00:00.000000+03:00",
        }))
        .unwrap();

        let document = to_document(&event).unwrap();
        assert_eq!(
            document.get_str("timestamp").unwrap(),
            "2024-05-01T12:00:00.000000+03:00"
        );
        assert_eq!(document.get_str("item").unwrap(), "book");
    }

    #[tokio::test]
    #[ignore] // Requires actual MongoDB
    async fn test_duplicate_timestamp_is_reported() {
        let url = std::env::var("MONGODB_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let client = mongodb::Client::with_uri_str(&url).await.unwrap();
        let database = client.database("purchases_test");
        let repo = MongoPurchaseRepository::new(&database, &format!("p_{}", ObjectId::new()));
        repo.ensure_indexes().await.unwrap();

        let event: PurchaseEvent = serde_json::from_value(json!({
            "item": "book",
            "timestamp": "2024-05-01T12:00:00.000000+03:00",
        }))
        .unwrap();

        assert!(matches!(
            repo.insert(&event).await.unwrap(),
            InsertOutcome::Inserted { .. }
        ));
        assert_eq!(repo.insert(&event).await.unwrap(), InsertOutcome::Duplicate);
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }
}
