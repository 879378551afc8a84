/// WebSocket 메시지 (한 줄에 JSON 하나, `type` 필드로 구분)
// region:    --- Imports
use super::state::AuctionSnapshot;
use crate::bidding::model::Item;
use crate::error::ErrorBody;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Client Message
/// 클라이언트 -> 서버
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Join {
        #[serde(default)]
        coach_name: Option<String>,
    },
    Leave,
    AdminStatusRequest,
    Started,
    DrawPlayer {
        #[serde(alias = "itemId")]
        player_id: i64,
    },
    PlaceBid {
        amount: i64,
        #[serde(alias = "itemId")]
        player_id: i64,
        /// 입찰자 아이디. 연결의 인증 정보와 다르면 거부한다.
        #[serde(default)]
        bidder: Option<String>,
    },
    EndAuction,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

// endregion: --- Client Message

// region:    --- Server Event
/// 로스터의 코치 한 명 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachStatus {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub points: i64,
    pub is_connected: bool,
    pub connected_at: Option<DateTime<Utc>>,
}

/// `coaches_update` 본문
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterUpdate {
    /// 접속 중인 코치 이름
    pub coaches: Vec<String>,
    /// 접속 중인 코치 상세
    pub coach_details: Vec<CoachStatus>,
    /// 접속 여부와 관계없는 전체 코치
    pub all_coaches_status: Vec<CoachStatus>,
    pub count: usize,
}

impl RosterUpdate {
    pub fn from_statuses(all: Vec<CoachStatus>) -> Self {
        let connected: Vec<CoachStatus> = all.iter().filter(|c| c.is_connected).cloned().collect();
        Self {
            coaches: connected.iter().map(|c| c.name.clone()).collect(),
            count: connected.len(),
            coach_details: connected,
            all_coaches_status: all,
        }
    }
}

/// 서버 -> 클라이언트
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Connected {
        message: String,
        auction_state: AuctionSnapshot,
    },
    Joined {
        message: String,
        auction_state: AuctionSnapshot,
    },
    CoachesUpdate(RosterUpdate),
    AuctionStarted {
        message: String,
        started_by: String,
        started_at: DateTime<Utc>,
        auction_state: AuctionSnapshot,
    },
    AuctionStartConfirmed {
        message: String,
        auction_state: AuctionSnapshot,
    },
    PlayerDrawn {
        player: Item,
        auction_state: AuctionSnapshot,
    },
    BidPlaced {
        amount: i64,
        bidder: String,
        bidder_name: String,
        player_id: i64,
        time_remaining: u32,
        auction_state: AuctionSnapshot,
    },
    TimerUpdate {
        time_remaining: u32,
    },
    PlayerSold {
        player: Item,
        winner: Option<String>,
        winner_username: Option<String>,
        final_price: i64,
        remaining_budget: Option<i64>,
        auction_state: AuctionSnapshot,
    },
    PlayerAutoAssigned {
        player: Item,
        assigned_to: String,
        assigned_to_username: String,
        reason: String,
        message: String,
    },
    Error(ErrorBody),
}

impl ServerEvent {
    /// 로그용 이벤트 이름
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::Joined { .. } => "joined",
            ServerEvent::CoachesUpdate(_) => "coaches_update",
            ServerEvent::AuctionStarted { .. } => "auction_started",
            ServerEvent::AuctionStartConfirmed { .. } => "auction_start_confirmed",
            ServerEvent::PlayerDrawn { .. } => "player_drawn",
            ServerEvent::BidPlaced { .. } => "bid_placed",
            ServerEvent::TimerUpdate { .. } => "timer_update",
            ServerEvent::PlayerSold { .. } => "player_sold",
            ServerEvent::PlayerAutoAssigned { .. } => "player_auto_assigned",
            ServerEvent::Error(_) => "error",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// endregion: --- Server Event

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_place_bid() {
        let msg = ClientMessage::parse(
            r#"{"type":"place_bid","amount":30,"playerId":4,"bidder":"alice"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::PlaceBid {
                amount: 30,
                player_id: 4,
                bidder: Some("alice".to_string()),
            }
        );
    }

    #[test]
    fn parses_unit_messages() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"end_auction"}"#).unwrap(),
            ClientMessage::EndAuction
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"join","coachName":"Alice"}"#).unwrap(),
            ClientMessage::Join {
                coach_name: Some("Alice".to_string())
            }
        );
        assert!(ClientMessage::parse(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn timer_update_wire_shape() {
        let value = serde_json::to_value(ServerEvent::TimerUpdate { time_remaining: 4 }).unwrap();
        assert_eq!(value, json!({"type": "timer_update", "timeRemaining": 4}));
    }

    #[test]
    fn error_wire_shape() {
        let value = serde_json::to_value(ServerEvent::Error(ErrorBody {
            code: "AUCTION_BUSY",
            message: "busy".to_string(),
        }))
        .unwrap();
        assert_eq!(
            value,
            json!({"type": "error", "code": "AUCTION_BUSY", "message": "busy"})
        );
    }
}
