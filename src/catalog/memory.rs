/// 메모리 기반 카탈로그
/// 데이터베이스 없이 코디네이터를 구동할 때(테스트, 로컬 데모) 사용한다.
// region:    --- Imports
use super::CatalogGateway;
use crate::bidding::model::{Award, Bid, Item, Participant, Settlement};
use crate::error::CatalogError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

// endregion: --- Imports

#[derive(Default)]
struct Tables {
    items: BTreeMap<i64, Item>,
    bidders: BTreeMap<i64, Participant>,
    bids: Vec<Bid>,
}

/// 메모리 카탈로그
#[derive(Default)]
pub struct MemoryCatalog {
    tables: Mutex<Tables>,
    /// 쓰기 장애 주입용 스위치
    fail_writes: AtomicBool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 코치 추가
    pub fn insert_bidder(&self, id: i64, username: &str, name: &str, budget: i64) -> Participant {
        let bidder = Participant {
            id,
            username: username.to_string(),
            name: name.to_string(),
            budget,
        };
        self.lock().bidders.insert(id, bidder.clone());
        bidder
    }

    /// 아이템 추가 (낙찰되지 않은 상태)
    pub fn insert_item(&self, id: i64, name: &str, category: &str, base_price: i64) -> Item {
        let item = Item {
            id,
            name: name.to_string(),
            description: format!("{} ({})", name, category),
            category: category.to_string(),
            tier: "Gold".to_string(),
            base_price,
            current_price: base_price,
            buyer_id: None,
            created_at: Utc::now(),
        };
        self.lock().items.insert(id, item.clone());
        item
    }

    /// 저장된 입찰 이력
    pub fn bids(&self) -> Vec<Bid> {
        self.lock().bids.clone()
    }

    /// 이후 쓰기 요청을 실패시킨다.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self) -> Result<(), CatalogError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CatalogError::Other("쓰기 실패 (주입된 장애)".to_string()));
        }
        Ok(())
    }
}

fn award_item(tables: &mut Tables, item_id: i64, bidder_id: i64, price: i64) -> Result<Item, CatalogError> {
    if !tables.bidders.contains_key(&bidder_id) {
        return Err(CatalogError::ParticipantNotFound(bidder_id));
    }
    let item = tables
        .items
        .get_mut(&item_id)
        .ok_or(CatalogError::ItemNotFound(item_id))?;
    if item.is_assigned() {
        return Err(CatalogError::ItemAlreadyAssigned(item_id));
    }
    item.buyer_id = Some(bidder_id);
    item.current_price = price;
    Ok(item.clone())
}

fn check_budget(tables: &Tables, bidder_id: i64, amount: i64) -> Result<i64, CatalogError> {
    let bidder = tables
        .bidders
        .get(&bidder_id)
        .ok_or(CatalogError::ParticipantNotFound(bidder_id))?;
    if bidder.budget < amount {
        return Err(CatalogError::InsufficientBudget {
            amount,
            budget: bidder.budget,
        });
    }
    Ok(bidder.budget - amount)
}

#[async_trait]
impl CatalogGateway for MemoryCatalog {
    async fn find_remaining_count(&self, category: &str) -> Result<i64, CatalogError> {
        let count = self
            .lock()
            .items
            .values()
            .filter(|item| item.category == category && !item.is_assigned())
            .count();
        Ok(count as i64)
    }

    async fn find_assignment(
        &self,
        bidder_id: i64,
        category: &str,
    ) -> Result<Option<Item>, CatalogError> {
        Ok(self
            .lock()
            .items
            .values()
            .find(|item| item.category == category && item.buyer_id == Some(bidder_id))
            .cloned())
    }

    async fn find_item(&self, item_id: i64) -> Result<Option<Item>, CatalogError> {
        Ok(self.lock().items.get(&item_id).cloned())
    }

    async fn list_items(&self) -> Result<Vec<Item>, CatalogError> {
        Ok(self.lock().items.values().cloned().collect())
    }

    async fn find_bidder(&self, bidder_id: i64) -> Result<Option<Participant>, CatalogError> {
        Ok(self.lock().bidders.get(&bidder_id).cloned())
    }

    async fn list_all_bidders(&self) -> Result<Vec<Participant>, CatalogError> {
        Ok(self.lock().bidders.values().cloned().collect())
    }

    async fn list_bids(&self, item_id: i64) -> Result<Vec<Bid>, CatalogError> {
        Ok(self
            .lock()
            .bids
            .iter()
            .rev()
            .filter(|bid| bid.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn deduct_budget(&self, bidder_id: i64, amount: i64) -> Result<i64, CatalogError> {
        self.check_writable()?;
        let mut tables = self.lock();
        let remaining = check_budget(&tables, bidder_id, amount)?;
        if let Some(bidder) = tables.bidders.get_mut(&bidder_id) {
            bidder.budget = remaining;
        }
        Ok(remaining)
    }

    async fn persist_award(
        &self,
        item_id: i64,
        bidder_id: i64,
        price: i64,
    ) -> Result<Item, CatalogError> {
        self.check_writable()?;
        award_item(&mut self.lock(), item_id, bidder_id, price)
    }

    async fn settle_sale(&self, award: &Award) -> Result<Settlement, CatalogError> {
        self.check_writable()?;
        let mut tables = self.lock();

        // 모든 검증을 먼저 끝낸 뒤 반영한다.
        let remaining_budget = check_budget(&tables, award.bidder_id, award.price)?;
        let item = award_item(&mut tables, award.item_id, award.bidder_id, award.price)?;
        if let Some(bidder) = tables.bidders.get_mut(&award.bidder_id) {
            bidder.budget = remaining_budget;
        }
        tables.bids.extend(award.bids.iter().cloned());

        Ok(Settlement {
            item,
            remaining_budget,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn award(item_id: i64, bidder_id: i64, price: i64) -> Award {
        Award {
            item_id,
            bidder_id,
            price,
            bids: vec![Bid {
                item_id,
                bidder_id,
                amount: price,
                bid_time: Utc::now(),
            }],
        }
    }

    #[tokio::test]
    async fn settle_sale_applies_all_effects() {
        let catalog = MemoryCatalog::new();
        catalog.insert_bidder(1, "alice", "Alice", 100);
        catalog.insert_item(10, "Faker", "TOP", 0);

        let settlement = catalog.settle_sale(&award(10, 1, 30)).await.unwrap();
        assert_eq!(settlement.remaining_budget, 70);
        assert_eq!(settlement.item.buyer_id, Some(1));
        assert_eq!(settlement.item.current_price, 30);
        assert_eq!(catalog.bids().len(), 1);
        assert_eq!(catalog.find_remaining_count("TOP").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_bids_returns_newest_first() {
        let catalog = MemoryCatalog::new();
        catalog.insert_bidder(1, "alice", "Alice", 100);
        catalog.insert_bidder(2, "bob", "Bob", 100);
        catalog.insert_item(10, "Faker", "TOP", 0);
        catalog.insert_item(11, "Zeus", "TOP", 0);
        let mut sale = award(10, 1, 30);
        sale.bids.insert(
            0,
            Bid {
                item_id: 10,
                bidder_id: 2,
                amount: 20,
                bid_time: Utc::now(),
            },
        );
        catalog.settle_sale(&sale).await.unwrap();

        let amounts: Vec<i64> = catalog
            .list_bids(10)
            .await
            .unwrap()
            .iter()
            .map(|bid| bid.amount)
            .collect();
        assert_eq!(amounts, vec![30, 20]);
        assert!(catalog.list_bids(11).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn settle_sale_over_budget_changes_nothing() {
        let catalog = MemoryCatalog::new();
        catalog.insert_bidder(1, "alice", "Alice", 20);
        catalog.insert_item(10, "Faker", "TOP", 0);

        let err = catalog.settle_sale(&award(10, 1, 30)).await.unwrap_err();
        assert!(matches!(err, CatalogError::InsufficientBudget { amount: 30, budget: 20 }));
        assert_eq!(catalog.find_bidder(1).await.unwrap().unwrap().budget, 20);
        assert!(!catalog.find_item(10).await.unwrap().unwrap().is_assigned());
        assert!(catalog.bids().is_empty());
    }

    #[tokio::test]
    async fn deduct_budget_rejects_overdraft() {
        let catalog = MemoryCatalog::new();
        catalog.insert_bidder(1, "alice", "Alice", 50);

        assert_eq!(catalog.deduct_budget(1, 20).await.unwrap(), 30);
        assert!(matches!(
            catalog.deduct_budget(1, 31).await,
            Err(CatalogError::InsufficientBudget { amount: 31, budget: 30 })
        ));
    }

    #[tokio::test]
    async fn persist_award_refuses_sold_item() {
        let catalog = MemoryCatalog::new();
        catalog.insert_bidder(1, "alice", "Alice", 50);
        catalog.insert_bidder(2, "bob", "Bob", 50);
        catalog.insert_item(10, "Faker", "TOP", 0);

        catalog.persist_award(10, 1, 0).await.unwrap();
        assert!(matches!(
            catalog.persist_award(10, 2, 0).await,
            Err(CatalogError::ItemAlreadyAssigned(10))
        ));
        assert_eq!(catalog.find_assignment(1, "TOP").await.unwrap().unwrap().id, 10);
    }
}
