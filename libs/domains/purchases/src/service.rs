//! Purchase query service

use crate::error::Result;
use crate::models::StoredPurchase;
use crate::repository::PurchaseRepository;
use tracing::instrument;

/// Read side over the purchase store
pub struct PurchaseService<R: PurchaseRepository> {
    repository: R,
}

impl<R: PurchaseRepository> PurchaseService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Every stored purchase. A store failure is returned whole, never as a
    /// partial list.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<StoredPurchase>> {
        let purchases = self.repository.find_all().await?;
        tracing::debug!(count = purchases.len(), "Listed purchases");
        Ok(purchases)
    }

    /// Whether the store is reachable.
    pub async fn ready(&self) -> Result<()> {
        self.repository.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PurchaseError;
    use crate::repository::mock::MockPurchaseRepository;
    use serde_json::{Map, json};

    #[tokio::test]
    async fn test_list_all_returns_store_contents() {
        let mut repo = MockPurchaseRepository::new();
        repo.expect_find_all().times(1).returning(|| {
            let mut fields = Map::new();
            fields.insert("item".into(), json!("book"));
            Ok(vec![StoredPurchase {
                id: "1".into(),
                fields,
            }])
        });

        let service = PurchaseService::new(repo);
        let purchases = service.list_all().await.unwrap();

        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].id, "1");
    }

    #[tokio::test]
    async fn test_list_all_propagates_store_failure() {
        let mut repo = MockPurchaseRepository::new();
        repo.expect_find_all()
            .returning(|| Err(PurchaseError::StoreUnavailable("timed out".into())));

        let service = PurchaseService::new(repo);
        let err = service.list_all().await.unwrap_err();

        assert!(matches!(err, PurchaseError::StoreUnavailable(msg) if msg == "timed out"));
    }

    #[tokio::test]
    async fn test_ready_pings_store() {
        let mut repo = MockPurchaseRepository::new();
        repo.expect_ping().times(1).returning(|| Ok(()));

        assert!(PurchaseService::new(repo).ready().await.is_ok());
    }
}
