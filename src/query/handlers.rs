// region:    --- Imports
use crate::bidding::model::{Bid, Item, Participant};
use crate::catalog::CatalogGateway;
use crate::error::CatalogError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

// endregion: --- Imports

// region:    --- Roster View
/// 팀 로스터의 한 자리
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSlot {
    pub item_id: Option<i64>,
    pub name: String,
    pub tier: String,
    pub category: String,
    pub price: i64,
}

/// 코치 한 명의 로스터
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRoster {
    pub bidder_id: i64,
    pub name: String,
    pub username: String,
    pub budget: i64,
    /// 포지션별 자리. 비어 있으면 None
    pub slots: BTreeMap<String, Option<RosterSlot>>,
}

// endregion: --- Roster View

// region:    --- Query Handlers

/// 전체 팀 로스터 조회
/// 예약 포지션은 코치 본인으로 채운다.
pub async fn get_rosters(
    catalog: &dyn CatalogGateway,
    reserved_category: &str,
) -> Result<Vec<TeamRoster>, CatalogError> {
    info!("{:<12} --> 팀 로스터 조회", "Query");
    let bidders = catalog.list_all_bidders().await?;
    let items = catalog.list_items().await?;
    Ok(build_rosters(&bidders, &items, reserved_category))
}

/// 낙찰되지 않은 아이템 조회 (다음 라운드 후보)
pub async fn get_unassigned_items(catalog: &dyn CatalogGateway) -> Result<Vec<Item>, CatalogError> {
    info!("{:<12} --> 미낙찰 아이템 조회", "Query");
    Ok(catalog
        .list_items()
        .await?
        .into_iter()
        .filter(|item| !item.is_assigned())
        .collect())
}

/// 아이템 입찰 이력 (최신순). 없는 아이템이면 `ItemNotFound`
pub async fn get_item_bids(catalog: &dyn CatalogGateway, item_id: i64) -> Result<Vec<Bid>, CatalogError> {
    info!("{:<12} --> 입찰 이력 조회: {}", "Query", item_id);
    if catalog.find_item(item_id).await?.is_none() {
        return Err(CatalogError::ItemNotFound(item_id));
    }
    catalog.list_bids(item_id).await
}

fn build_rosters(bidders: &[Participant], items: &[Item], reserved_category: &str) -> Vec<TeamRoster> {
    let categories: BTreeSet<&str> = items
        .iter()
        .map(|item| item.category.as_str())
        .chain(std::iter::once(reserved_category))
        .collect();

    bidders
        .iter()
        .map(|bidder| {
            let mut slots: BTreeMap<String, Option<RosterSlot>> = categories
                .iter()
                .map(|category| (category.to_string(), None))
                .collect();

            slots.insert(
                reserved_category.to_string(),
                Some(RosterSlot {
                    item_id: None,
                    name: bidder.name.clone(),
                    tier: "Coach".to_string(),
                    category: reserved_category.to_string(),
                    price: 0,
                }),
            );

            for item in items.iter().filter(|item| {
                item.buyer_id == Some(bidder.id) && item.category != reserved_category
            }) {
                slots.insert(
                    item.category.clone(),
                    Some(RosterSlot {
                        item_id: Some(item.id),
                        name: item.name.clone(),
                        tier: item.tier.clone(),
                        category: item.category.clone(),
                        price: item.current_price,
                    }),
                );
            }

            TeamRoster {
                bidder_id: bidder.id,
                name: bidder.name.clone(),
                username: bidder.username.clone(),
                budget: bidder.budget,
                slots,
            }
        })
        .collect()
}

// endregion: --- Query Handlers

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;

    #[tokio::test]
    async fn roster_fills_reserved_slot_with_bidder() {
        let catalog = MemoryCatalog::new();
        catalog.insert_bidder(1, "alice", "Alice", 100);
        catalog.insert_bidder(2, "bob", "Bob", 100);
        catalog.insert_item(10, "Zeus", "TOP", 0);
        catalog.insert_item(11, "Gumayusi", "ADC", 0);
        catalog.persist_award(10, 1, 0).await.unwrap();

        let rosters = get_rosters(&catalog, "MID").await.unwrap();
        assert_eq!(rosters.len(), 2);

        let alice = &rosters[0];
        assert_eq!(alice.slots["MID"].as_ref().unwrap().name, "Alice");
        assert_eq!(alice.slots["TOP"].as_ref().unwrap().item_id, Some(10));
        assert!(alice.slots["ADC"].is_none());

        let bob = &rosters[1];
        assert!(bob.slots["TOP"].is_none());
    }

    #[tokio::test]
    async fn unassigned_items_exclude_sold() {
        let catalog = MemoryCatalog::new();
        catalog.insert_bidder(1, "alice", "Alice", 100);
        catalog.insert_item(10, "Zeus", "TOP", 0);
        catalog.insert_item(11, "Oner", "JGL", 0);
        catalog.persist_award(10, 1, 0).await.unwrap();

        let items = get_unassigned_items(&catalog).await.unwrap();
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![11]);
    }

    #[tokio::test]
    async fn item_bids_require_known_item() {
        let catalog = MemoryCatalog::new();
        catalog.insert_item(10, "Zeus", "TOP", 0);

        assert!(get_item_bids(&catalog, 10).await.unwrap().is_empty());
        assert!(matches!(
            get_item_bids(&catalog, 77).await,
            Err(CatalogError::ItemNotFound(77))
        ));
    }
}
