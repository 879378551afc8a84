// region:    --- Imports
use serde::Serialize;
use thiserror::Error;

// endregion: --- Imports

// region:    --- Auction Error
/// 경매 요청 처리 중 발생하는 오류
///
/// 요청별 오류는 요청한 연결에만 전달되고 전체에 방송되지 않는다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("인증되지 않은 연결입니다.")]
    Unauthenticated,

    #[error("{0} 권한이 없습니다.")]
    Forbidden(&'static str),

    #[error("이미 진행 중인 경매가 있습니다.")]
    AuctionBusy,

    #[error("진행 중인 경매가 없습니다.")]
    NoActiveAuction,

    #[error("현재 경매 중인 아이템이 아닙니다: {0}")]
    NotCurrentItem(i64),

    #[error("입찰 금액({amount})은 현재 가격({current})보다 높아야 합니다.")]
    BidTooLow { amount: i64, current: i64 },

    #[error("포인트가 부족합니다: 입찰 {amount}, 보유 {budget}")]
    InsufficientBudget { amount: i64, budget: i64 },

    #[error("{0} 포지션은 이미 채워져 있습니다.")]
    CategoryFilled(String),

    #[error("아이템을 찾을 수 없습니다: {0}")]
    ItemNotFound(i64),

    #[error("이미 낙찰된 아이템입니다: {0}")]
    ItemAlreadyAssigned(i64),

    #[error("참가자를 찾을 수 없습니다: {0}")]
    ParticipantNotFound(String),

    #[error("저장소 처리 실패: {0}")]
    PersistenceFailure(String),

    #[error("잘못된 메시지 형식입니다: {0}")]
    InvalidMessage(String),

    #[error("경매 코디네이터를 사용할 수 없습니다.")]
    Unavailable,
}

impl AuctionError {
    /// 클라이언트 분기용 오류 코드
    pub fn code(&self) -> &'static str {
        match self {
            AuctionError::Unauthenticated => "UNAUTHENTICATED",
            AuctionError::Forbidden(_) => "FORBIDDEN",
            AuctionError::AuctionBusy => "AUCTION_BUSY",
            AuctionError::NoActiveAuction => "NO_ACTIVE_AUCTION",
            AuctionError::NotCurrentItem(_) => "NOT_CURRENT_ITEM",
            AuctionError::BidTooLow { .. } => "LOW_BID",
            AuctionError::InsufficientBudget { .. } => "INSUFFICIENT_BUDGET",
            AuctionError::CategoryFilled(_) => "CATEGORY_FILLED",
            AuctionError::ItemNotFound(_) => "ITEM_NOT_FOUND",
            AuctionError::ItemAlreadyAssigned(_) => "ITEM_ALREADY_ASSIGNED",
            AuctionError::ParticipantNotFound(_) => "PARTICIPANT_NOT_FOUND",
            AuctionError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            AuctionError::InvalidMessage(_) => "INVALID_MESSAGE",
            AuctionError::Unavailable => "UNAVAILABLE",
        }
    }
}

// endregion: --- Auction Error

// region:    --- Catalog Error
/// 아이템 카탈로그(외부 저장소) 오류
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("데이터베이스 오류: {0}")]
    Database(#[from] sqlx::Error),

    #[error("포인트 부족: 차감 {amount}, 보유 {budget}")]
    InsufficientBudget { amount: i64, budget: i64 },

    #[error("아이템 없음: {0}")]
    ItemNotFound(i64),

    #[error("이미 낙찰된 아이템: {0}")]
    ItemAlreadyAssigned(i64),

    #[error("참가자 없음: {0}")]
    ParticipantNotFound(i64),

    #[error("저장소 응답 시간 초과")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

impl CatalogError {
    /// 다시 시도하면 성공할 수 있는 오류 (저장소 장애, 시간 초과)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CatalogError::Database(_) | CatalogError::Timeout | CatalogError::Other(_)
        )
    }
}

impl From<CatalogError> for AuctionError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::InsufficientBudget { amount, budget } => {
                AuctionError::InsufficientBudget { amount, budget }
            }
            CatalogError::ItemNotFound(id) => AuctionError::ItemNotFound(id),
            CatalogError::ItemAlreadyAssigned(id) => AuctionError::ItemAlreadyAssigned(id),
            CatalogError::ParticipantNotFound(id) => AuctionError::ParticipantNotFound(id.to_string()),
            other => AuctionError::PersistenceFailure(other.to_string()),
        }
    }
}

// endregion: --- Catalog Error

// region:    --- Error Body
/// `error` 이벤트 본문
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl From<&AuctionError> for ErrorBody {
    fn from(e: &AuctionError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

// endregion: --- Error Body

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_budget_error_keeps_its_kind() {
        let err: AuctionError = CatalogError::InsufficientBudget {
            amount: 30,
            budget: 10,
        }
        .into();
        assert_eq!(
            err,
            AuctionError::InsufficientBudget {
                amount: 30,
                budget: 10
            }
        );
    }

    #[test]
    fn only_store_failures_are_transient() {
        assert!(CatalogError::Timeout.is_transient());
        assert!(CatalogError::Other("down".to_string()).is_transient());
        assert!(!CatalogError::ItemAlreadyAssigned(1).is_transient());
        assert!(!CatalogError::ParticipantNotFound(1).is_transient());
        assert!(!CatalogError::InsufficientBudget {
            amount: 10,
            budget: 5
        }
        .is_transient());
    }

    #[test]
    fn timeout_becomes_persistence_failure() {
        let err: AuctionError = CatalogError::Timeout.into();
        assert_eq!(err.code(), "PERSISTENCE_FAILURE");
    }
}
