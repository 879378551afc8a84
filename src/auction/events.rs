use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 감사 로그(events 테이블)와 Kafka로 내보내는 경매 결과 이벤트
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum AuctionEvent {
    // 낙찰 이벤트
    PlayerSold {
        item_id: i64,
        bidder_id: i64,
        price: i64,
        remaining_budget: i64,
        timestamp: DateTime<Utc>,
    },
    // 포인트 차감 없는 배정 이벤트
    ItemAwarded {
        item_id: i64,
        bidder_id: i64,
        price: i64,
        timestamp: DateTime<Utc>,
    },
}

impl AuctionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AuctionEvent::PlayerSold { .. } => "PlayerSold",
            AuctionEvent::ItemAwarded { .. } => "ItemAwarded",
        }
    }

    pub fn item_id(&self) -> i64 {
        match self {
            AuctionEvent::PlayerSold { item_id, .. }
            | AuctionEvent::ItemAwarded { item_id, .. } => *item_id,
        }
    }
}
