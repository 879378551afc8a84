/// 호출 시간 제한 카탈로그
/// 모든 저장소 호출을 제한 시간 안에 끝내고, 넘기면 `CatalogError::Timeout`
// region:    --- Imports
use super::CatalogGateway;
use crate::bidding::model::{Award, Bid, Item, Participant, Settlement};
use crate::error::CatalogError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

// endregion: --- Imports

pub struct TimedCatalog {
    inner: Arc<dyn CatalogGateway>,
    timeout: Duration,
}

impl TimedCatalog {
    pub fn new(inner: Arc<dyn CatalogGateway>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T, CatalogError>> + Send,
    ) -> Result<T, CatalogError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{:<12} --> {} 시간 초과 ({:?})", "Catalog", operation, self.timeout);
                Err(CatalogError::Timeout)
            }
        }
    }
}

#[async_trait]
impl CatalogGateway for TimedCatalog {
    async fn find_remaining_count(&self, category: &str) -> Result<i64, CatalogError> {
        self.bounded("find_remaining_count", self.inner.find_remaining_count(category))
            .await
    }

    async fn find_assignment(
        &self,
        bidder_id: i64,
        category: &str,
    ) -> Result<Option<Item>, CatalogError> {
        self.bounded("find_assignment", self.inner.find_assignment(bidder_id, category))
            .await
    }

    async fn find_item(&self, item_id: i64) -> Result<Option<Item>, CatalogError> {
        self.bounded("find_item", self.inner.find_item(item_id)).await
    }

    async fn list_items(&self) -> Result<Vec<Item>, CatalogError> {
        self.bounded("list_items", self.inner.list_items()).await
    }

    async fn find_bidder(&self, bidder_id: i64) -> Result<Option<Participant>, CatalogError> {
        self.bounded("find_bidder", self.inner.find_bidder(bidder_id)).await
    }

    async fn list_all_bidders(&self) -> Result<Vec<Participant>, CatalogError> {
        self.bounded("list_all_bidders", self.inner.list_all_bidders()).await
    }

    async fn list_bids(&self, item_id: i64) -> Result<Vec<Bid>, CatalogError> {
        self.bounded("list_bids", self.inner.list_bids(item_id)).await
    }

    async fn deduct_budget(&self, bidder_id: i64, amount: i64) -> Result<i64, CatalogError> {
        self.bounded("deduct_budget", self.inner.deduct_budget(bidder_id, amount))
            .await
    }

    async fn persist_award(
        &self,
        item_id: i64,
        bidder_id: i64,
        price: i64,
    ) -> Result<Item, CatalogError> {
        self.bounded(
            "persist_award",
            self.inner.persist_award(item_id, bidder_id, price),
        )
        .await
    }

    async fn settle_sale(&self, award: &Award) -> Result<Settlement, CatalogError> {
        self.bounded("settle_sale", self.inner.settle_sale(award)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;

    struct StalledCatalog;

    #[async_trait]
    impl CatalogGateway for StalledCatalog {
        async fn find_remaining_count(&self, _: &str) -> Result<i64, CatalogError> {
            std::future::pending().await
        }
        async fn find_assignment(&self, _: i64, _: &str) -> Result<Option<Item>, CatalogError> {
            std::future::pending().await
        }
        async fn find_item(&self, _: i64) -> Result<Option<Item>, CatalogError> {
            std::future::pending().await
        }
        async fn list_items(&self) -> Result<Vec<Item>, CatalogError> {
            std::future::pending().await
        }
        async fn find_bidder(&self, _: i64) -> Result<Option<Participant>, CatalogError> {
            std::future::pending().await
        }
        async fn list_all_bidders(&self) -> Result<Vec<Participant>, CatalogError> {
            std::future::pending().await
        }
        async fn list_bids(&self, _: i64) -> Result<Vec<Bid>, CatalogError> {
            std::future::pending().await
        }
        async fn deduct_budget(&self, _: i64, _: i64) -> Result<i64, CatalogError> {
            std::future::pending().await
        }
        async fn persist_award(&self, _: i64, _: i64, _: i64) -> Result<Item, CatalogError> {
            std::future::pending().await
        }
        async fn settle_sale(&self, _: &Award) -> Result<Settlement, CatalogError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_times_out() {
        let catalog = TimedCatalog::new(Arc::new(StalledCatalog), Duration::from_secs(5));
        assert!(matches!(
            catalog.list_all_bidders().await,
            Err(CatalogError::Timeout)
        ));
    }

    #[tokio::test]
    async fn fast_store_passes_through() {
        let memory = Arc::new(MemoryCatalog::new());
        memory.insert_bidder(1, "alice", "Alice", 10);
        let catalog = TimedCatalog::new(memory, Duration::from_secs(5));
        assert_eq!(catalog.list_all_bidders().await.unwrap().len(), 1);
    }
}
