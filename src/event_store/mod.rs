// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::message_broker::KafkaProducer;
use crate::query::queries;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, Row, Transaction};
use tracing::{info, warn};

// endregion: --- Imports

/// 낙찰 이벤트 토픽
pub const AUCTION_EVENTS_TOPIC: &str = "auction-events";

// region:    --- Event Model
/// 이벤트 저장소에 저장되는 이벤트 모델
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Event {
    pub id: i64,
    pub aggregate_id: i64,
    pub event_type: String,
    pub data: serde_json::Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: i64,
}
// endregion: --- Event Model

// region:    --- Event Append
/// 낙찰 트랜잭션 안에서 이벤트 추가
/// 같은 버전이 이미 있으면 트랜잭션 전체를 실패시킨다.
pub async fn append_event(
    tx: &mut Transaction<'_, Postgres>,
    auction_event: &AuctionEvent,
) -> Result<Event, sqlx::Error> {
    let aggregate_id = auction_event.item_id();
    let current_version: i64 = sqlx::query(queries::GET_ITEM_VERSION)
        .bind(aggregate_id)
        .fetch_one(&mut **tx)
        .await?
        .get("version");

    let data =
        serde_json::to_value(auction_event).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
    let timestamp = chrono::Utc::now();
    let version = current_version + 1;

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO events (aggregate_id, event_type, data, timestamp, version)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (aggregate_id, version) DO NOTHING
        RETURNING id",
    )
    .bind(aggregate_id)
    .bind(auction_event.event_type())
    .bind(&data)
    .bind(timestamp)
    .bind(version)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| sqlx::Error::Protocol("버전 충돌".to_string()))?;

    info!(
        "{:<12} --> {} 이벤트 저장: item={}, version={}",
        "EventStore",
        auction_event.event_type(),
        aggregate_id,
        version
    );

    Ok(Event {
        id,
        aggregate_id,
        event_type: auction_event.event_type().to_string(),
        data,
        timestamp,
        version,
    })
}

// endregion: --- Event Append

// region:    --- Event Publish
/// 커밋된 이벤트를 Kafka에 발행
/// 발행 실패는 낙찰 결과에 영향을 주지 않는다. (이벤트는 이미 events 테이블에 있다)
pub async fn publish_event(producer: Option<&KafkaProducer>, event: &Event) {
    let Some(producer) = producer else {
        return;
    };
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("{:<12} --> 이벤트 직렬화 실패: {:?}", "EventStore", e);
            return;
        }
    };
    if let Err(e) = producer
        .send_message(AUCTION_EVENTS_TOPIC, &event.id.to_string(), &payload)
        .await
    {
        warn!("{:<12} --> 이벤트 발행 실패: {}", "EventStore", e);
    }
}

// endregion: --- Event Publish
