/// 자동 배정
/// 포지션의 마지막 아이템이고 그 포지션이 빈 코치가 한 명뿐이면 경매 없이 0포인트로 배정한다.
// region:    --- Imports
use crate::bidding::model::{Item, Participant};
use crate::catalog::CatalogGateway;
use crate::error::{AuctionError, CatalogError};
use tracing::{info, warn};

// endregion: --- Imports

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 일반 경매 진행
    Deferred,
    /// 자동 배정 완료
    Assigned { item: Item, bidder: Participant },
}

/// 자동 배정 확인
/// 조회 실패는 경매 진행으로 처리하고, 배정 기록 실패만 오류로 돌려준다.
pub async fn resolve(
    catalog: &dyn CatalogGateway,
    item: &Item,
    reserved_category: &str,
) -> Result<Resolution, AuctionError> {
    if item.category == reserved_category {
        return Ok(Resolution::Deferred);
    }

    let eligible = match eligible_bidders(catalog, &item.category).await {
        Ok(Some(eligible)) => eligible,
        Ok(None) => return Ok(Resolution::Deferred),
        Err(e) => {
            warn!(
                "{:<12} --> 자동 배정 확인 실패, 경매 진행: {}",
                "AutoAssign", e
            );
            return Ok(Resolution::Deferred);
        }
    };

    info!(
        "{:<12} --> {} 포지션 마지막 아이템, 배정 가능 코치 {}명",
        "AutoAssign",
        item.category,
        eligible.len()
    );

    let Ok([bidder]) = <[Participant; 1]>::try_from(eligible) else {
        return Ok(Resolution::Deferred);
    };

    let assigned = catalog.persist_award(item.id, bidder.id, 0).await?;
    info!(
        "{:<12} --> 자동 배정 완료: {} -> {}",
        "AutoAssign", assigned.name, bidder.name
    );
    Ok(Resolution::Assigned {
        item: assigned,
        bidder,
    })
}

/// 남은 아이템이 정확히 하나일 때만 그 포지션이 빈 코치 목록을 돌려준다.
async fn eligible_bidders(
    catalog: &dyn CatalogGateway,
    category: &str,
) -> Result<Option<Vec<Participant>>, CatalogError> {
    let remaining = catalog.find_remaining_count(category).await?;
    if remaining != 1 {
        return Ok(None);
    }

    let mut eligible = Vec::new();
    for bidder in catalog.list_all_bidders().await? {
        if catalog.find_assignment(bidder.id, category).await?.is_none() {
            eligible.push(bidder);
        }
    }
    Ok(Some(eligible))
}
