/// 입찰 관련 커맨드 검증
/// 1. 입찰 (포인트, 포지션 제한)
// region:    --- Imports
use crate::auth::Identity;
use crate::bidding::model::{Item, Participant};
use crate::catalog::CatalogGateway;
use crate::error::AuctionError;
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Commands
/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlaceBidCommand {
    pub item_id: i64,
    pub amount: i64,
    /// 클라이언트가 보낸 입찰자 아이디 (선택)
    pub bidder: Option<String>,
}

/// 1. 입찰 검증
/// 가격 검증은 경매 상태에서 먼저 끝났다고 가정한다.
pub async fn validate_bid(
    catalog: &dyn CatalogGateway,
    bidder: &Identity,
    cmd: &PlaceBidCommand,
    item: &Item,
    reserved_category: &str,
) -> Result<Participant, AuctionError> {
    info!("{:<12} --> 입찰 검증: {:?}", "Command", cmd);

    if bidder.is_admin() {
        return Err(AuctionError::Forbidden("입찰"));
    }
    if let Some(claimed) = &cmd.bidder {
        if claimed != &bidder.username {
            return Err(AuctionError::Forbidden("다른 코치 명의의 입찰"));
        }
    }

    // 저장된 포인트 기준 검증
    let participant = catalog
        .find_bidder(bidder.participant_id)
        .await?
        .ok_or_else(|| AuctionError::ParticipantNotFound(bidder.username.clone()))?;
    if cmd.amount > participant.budget {
        return Err(AuctionError::InsufficientBudget {
            amount: cmd.amount,
            budget: participant.budget,
        });
    }

    // 코치 본인이 채우는 포지션
    if item.category == reserved_category {
        return Err(AuctionError::CategoryFilled(item.category.clone()));
    }

    // 이미 같은 포지션의 선수를 보유한 경우
    if let Some(existing) = catalog
        .find_assignment(bidder.participant_id, &item.category)
        .await?
    {
        info!(
            "{:<12} --> {} 는 이미 {} 포지션에 {} 보유",
            "Command", bidder.username, item.category, existing.name
        );
        return Err(AuctionError::CategoryFilled(item.category.clone()));
    }

    Ok(participant)
}

// endregion: --- Commands

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::model::Role;
    use crate::catalog::MemoryCatalog;

    fn coach(id: i64, username: &str) -> Identity {
        Identity {
            participant_id: id,
            username: username.to_string(),
            name: username.to_uppercase(),
            role: Role::Bidder,
        }
    }

    fn bid(item_id: i64, amount: i64) -> PlaceBidCommand {
        PlaceBidCommand {
            item_id,
            amount,
            bidder: None,
        }
    }

    #[tokio::test]
    async fn rejects_bid_over_budget() {
        let catalog = MemoryCatalog::new();
        catalog.insert_bidder(1, "alice", "Alice", 50);
        let item = catalog.insert_item(10, "Zeus", "TOP", 0);

        let err = validate_bid(&catalog, &coach(1, "alice"), &bid(10, 51), &item, "MID")
            .await
            .unwrap_err();
        assert_eq!(err, AuctionError::InsufficientBudget { amount: 51, budget: 50 });
    }

    #[tokio::test]
    async fn rejects_filled_and_reserved_categories() {
        let catalog = MemoryCatalog::new();
        catalog.insert_bidder(1, "alice", "Alice", 100);
        catalog.insert_item(10, "Zeus", "TOP", 0);
        let second_top = catalog.insert_item(11, "Kiin", "TOP", 0);
        let mid = catalog.insert_item(12, "Faker", "MID", 0);
        catalog.persist_award(10, 1, 0).await.unwrap();

        let alice = coach(1, "alice");
        assert_eq!(
            validate_bid(&catalog, &alice, &bid(11, 10), &second_top, "MID").await,
            Err(AuctionError::CategoryFilled("TOP".to_string()))
        );
        assert_eq!(
            validate_bid(&catalog, &alice, &bid(12, 10), &mid, "MID").await,
            Err(AuctionError::CategoryFilled("MID".to_string()))
        );
    }

    #[tokio::test]
    async fn rejects_bid_in_another_coachs_name() {
        let catalog = MemoryCatalog::new();
        catalog.insert_bidder(1, "alice", "Alice", 100);
        let item = catalog.insert_item(10, "Zeus", "TOP", 0);
        let cmd = PlaceBidCommand {
            item_id: 10,
            amount: 10,
            bidder: Some("bob".to_string()),
        };

        assert!(matches!(
            validate_bid(&catalog, &coach(1, "alice"), &cmd, &item, "MID").await,
            Err(AuctionError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn accepts_valid_bid() {
        let catalog = MemoryCatalog::new();
        catalog.insert_bidder(1, "alice", "Alice", 100);
        let item = catalog.insert_item(10, "Zeus", "TOP", 0);

        let participant = validate_bid(&catalog, &coach(1, "alice"), &bid(10, 100), &item, "MID")
            .await
            .unwrap();
        assert_eq!(participant.budget, 100);
    }
}
