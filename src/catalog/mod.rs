/// 아이템 카탈로그 게이트웨이
/// 경매 코디네이터가 외부 저장소(선수, 코치 포인트, 낙찰 기록)에 접근하는 경계
// region:    --- Imports
use crate::bidding::model::{Award, Bid, Item, Participant, Settlement};
use crate::error::CatalogError;
use async_trait::async_trait;

// endregion: --- Imports

// region:    --- Modules
pub mod memory;
pub mod postgres;
pub mod timed;

pub use memory::MemoryCatalog;
pub use postgres::PostgresCatalog;
pub use timed::TimedCatalog;

// endregion: --- Modules

// region:    --- Catalog Gateway Trait
/// 카탈로그 게이트웨이 트레이트
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// 해당 포지션에서 아직 낙찰되지 않은 아이템 수
    async fn find_remaining_count(&self, category: &str) -> Result<i64, CatalogError>;

    /// 코치가 해당 포지션에서 이미 보유한 아이템
    async fn find_assignment(
        &self,
        bidder_id: i64,
        category: &str,
    ) -> Result<Option<Item>, CatalogError>;

    /// 아이템 조회
    async fn find_item(&self, item_id: i64) -> Result<Option<Item>, CatalogError>;

    /// 전체 아이템 조회
    async fn list_items(&self) -> Result<Vec<Item>, CatalogError>;

    /// 코치 조회
    async fn find_bidder(&self, bidder_id: i64) -> Result<Option<Participant>, CatalogError>;

    /// 전체 코치 조회 (진행자 제외)
    async fn list_all_bidders(&self) -> Result<Vec<Participant>, CatalogError>;

    /// 아이템 입찰 이력 (최신순)
    async fn list_bids(&self, item_id: i64) -> Result<Vec<Bid>, CatalogError>;

    /// 포인트 차감. 저장된 포인트보다 많으면 `InsufficientBudget`
    async fn deduct_budget(&self, bidder_id: i64, amount: i64) -> Result<i64, CatalogError>;

    /// 배정 기록 (포인트 차감 없음, 감사 로그에는 `ItemAwarded`)
    async fn persist_award(
        &self,
        item_id: i64,
        bidder_id: i64,
        price: i64,
    ) -> Result<Item, CatalogError>;

    /// 낙찰 정산: 포인트 차감, 낙찰 기록, 입찰 이력 저장을 한 번에 처리한다.
    /// 실패하면 아무것도 반영되지 않는다.
    async fn settle_sale(&self, award: &Award) -> Result<Settlement, CatalogError>;
}

// endregion: --- Catalog Gateway Trait
