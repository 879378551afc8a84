use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 참가자 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 포인트를 가지고 입찰하는 코치
    Bidder,
    /// 진행자. 로스터에서 제외되고 아이템을 배정받지 않는다.
    Admin,
}

// 선수(아이템) 모델
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// 포지션 (TOP, JGL, MID, ADC, SUPP)
    pub category: String,
    pub tier: String,
    pub base_price: i64,
    pub current_price: i64,
    pub buyer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn is_assigned(&self) -> bool {
        self.buyer_id.is_some()
    }
}

// 코치(입찰 참가자) 모델
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub budget: i64,
}

// 입찰 모델
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub item_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
    pub bid_time: DateTime<Utc>,
}

// 낙찰 기록 (아이템, 낙찰자, 최종 가격, 입찰 이력)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Award {
    pub item_id: i64,
    pub bidder_id: i64,
    pub price: i64,
    pub bids: Vec<Bid>,
}

// 낙찰 정산 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub item: Item,
    pub remaining_budget: i64,
}
