//! In-memory implementation of PurchaseRepository

use crate::error::{PurchaseError, Result};
use crate::models::{PurchaseEvent, StoredPurchase};
use crate::repository::{InsertOutcome, PurchaseRepository};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Records {
    purchases: Vec<StoredPurchase>,
    timestamps: HashSet<String>,
}

/// Purchase store held in process memory.
///
/// Used by tests and local runs without MongoDB. Uniqueness is checked and
/// the record written under one write lock.
#[derive(Clone, Default)]
pub struct InMemoryPurchaseRepository {
    records: Arc<RwLock<Records>>,
    unavailable: Arc<AtomicBool>,
    failing_inserts: Arc<AtomicU32>,
}

impl InMemoryPurchaseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with `StoreUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next `count` inserts with `StoreUnavailable`.
    pub fn fail_next_inserts(&self, count: u32) {
        self.failing_inserts.store(count, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.purchases.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PurchaseError::StoreUnavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PurchaseRepository for InMemoryPurchaseRepository {
    async fn insert(&self, event: &PurchaseEvent) -> Result<InsertOutcome> {
        self.check_available()?;
        if self.take_injected_failure() {
            return Err(PurchaseError::StoreUnavailable(
                "injected insert failure".to_string(),
            ));
        }

        let fields = match serde_json::to_value(event) {
            Ok(Value::Object(fields)) => fields,
            Ok(other) => {
                return Err(PurchaseError::InvalidEvent(format!(
                    "purchase did not serialize to an object: {other}"
                )));
            }
            Err(e) => return Err(PurchaseError::InvalidEvent(e.to_string())),
        };

        let mut records = self.records.write().await;
        if !records.timestamps.insert(event.timestamp.as_str().to_string()) {
            return Ok(InsertOutcome::Duplicate);
        }

        let id = Uuid::now_v7().simple().to_string();
        records.purchases.push(StoredPurchase {
            id: id.clone(),
            fields,
        });
        Ok(InsertOutcome::Inserted { id })
    }

    async fn find_all(&self) -> Result<Vec<StoredPurchase>> {
        self.check_available()?;
        Ok(self.records.read().await.purchases.clone())
    }

    async fn ensure_indexes(&self) -> Result<()> {
        self.check_available()
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }
}
