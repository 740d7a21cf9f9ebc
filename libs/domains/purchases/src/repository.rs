//! Purchase store trait

use crate::error::Result;
use crate::models::{PurchaseEvent, StoredPurchase};
use async_trait::async_trait;

/// Result of an insert-if-absent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Stored under the given identifier
    Inserted { id: String },
    /// A purchase with the same timestamp already exists; nothing was written
    Duplicate,
}

impl InsertOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate)
    }
}

/// Repository trait for purchase storage.
///
/// Implementations must make [`PurchaseRepository::insert`] atomic with
/// respect to the timestamp: concurrent inserts of the same timestamp store
/// exactly one record.
#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// Store the purchase unless one with the same timestamp exists
    async fn insert(&self, event: &PurchaseEvent) -> Result<InsertOutcome>;

    /// Every stored purchase, order undefined
    async fn find_all(&self) -> Result<Vec<StoredPurchase>>;

    /// Create the unique timestamp index
    async fn ensure_indexes(&self) -> Result<()>;

    /// Check the store is reachable
    async fn ping(&self) -> Result<()>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use mockall::mock;

    mock! {
        pub PurchaseRepository {}

        #[async_trait]
        impl PurchaseRepository for PurchaseRepository {
            async fn insert(&self, event: &PurchaseEvent) -> Result<InsertOutcome>;
            async fn find_all(&self) -> Result<Vec<StoredPurchase>>;
            async fn ensure_indexes(&self) -> Result<()>;
            async fn ping(&self) -> Result<()>;
        }
    }
}
