/// Postgres 기반 카탈로그
// region:    --- Imports
use super::CatalogGateway;
use crate::auction::events::AuctionEvent;
use crate::bidding::model::{Award, Bid, Item, Participant, Settlement};
use crate::database::DatabaseManager;
use crate::error::CatalogError;
use crate::event_store::{self, Event};
use crate::message_broker::KafkaProducer;
use crate::query::queries;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Postgres, Row, Transaction};
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

// region:    --- Postgres Catalog
pub struct PostgresCatalog {
    db_manager: Arc<DatabaseManager>,
    kafka_producer: Option<Arc<KafkaProducer>>,
}

impl PostgresCatalog {
    pub fn new(db_manager: Arc<DatabaseManager>, kafka_producer: Option<Arc<KafkaProducer>>) -> Self {
        Self {
            db_manager,
            kafka_producer,
        }
    }

    /// 커밋 이후 발행. 브로커 지연이 저장소 호출 시간에 포함되지 않도록 별도 태스크에서 보낸다.
    fn publish(&self, event: Event) {
        let Some(producer) = self.kafka_producer.clone() else {
            return;
        };
        tokio::spawn(async move {
            event_store::publish_event(Some(producer.as_ref()), &event).await;
        });
    }
}

// endregion: --- Postgres Catalog

// region:    --- Transaction Steps
/// 잔액이 충분할 때만 포인트 차감
async fn deduct_budget_tx(
    tx: &mut Transaction<'_, Postgres>,
    bidder_id: i64,
    amount: i64,
) -> Result<i64, CatalogError> {
    let updated = sqlx::query_scalar::<_, i64>(queries::DEDUCT_BUDGET)
        .bind(bidder_id)
        .bind(amount)
        .fetch_optional(&mut **tx)
        .await?;
    if let Some(budget) = updated {
        return Ok(budget);
    }

    // 차감 실패 원인 확인
    let budget = sqlx::query_scalar::<_, i64>(queries::GET_BUDGET)
        .bind(bidder_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(CatalogError::ParticipantNotFound(bidder_id))?;
    Err(CatalogError::InsufficientBudget { amount, budget })
}

/// 미낙찰 아이템에 낙찰자 기록
async fn award_tx(
    tx: &mut Transaction<'_, Postgres>,
    item_id: i64,
    bidder_id: i64,
    price: i64,
) -> Result<Item, CatalogError> {
    let item = sqlx::query_as::<_, Item>(queries::GET_ITEM_FOR_UPDATE)
        .bind(item_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(CatalogError::ItemNotFound(item_id))?;
    if item.is_assigned() {
        return Err(CatalogError::ItemAlreadyAssigned(item_id));
    }

    sqlx::query_as::<_, Item>(queries::AWARD_ITEM)
        .bind(item_id)
        .bind(bidder_id)
        .bind(price)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(CatalogError::ItemAlreadyAssigned(item_id))
}

// endregion: --- Transaction Steps

// region:    --- Catalog Gateway Impl
#[async_trait]
impl CatalogGateway for PostgresCatalog {
    async fn find_remaining_count(&self, category: &str) -> Result<i64, CatalogError> {
        let row = sqlx::query(queries::COUNT_REMAINING_IN_CATEGORY)
            .bind(category)
            .fetch_one(self.db_manager.pool())
            .await?;
        Ok(row.get("remaining"))
    }

    async fn find_assignment(
        &self,
        bidder_id: i64,
        category: &str,
    ) -> Result<Option<Item>, CatalogError> {
        Ok(sqlx::query_as::<_, Item>(queries::GET_ASSIGNMENT)
            .bind(bidder_id)
            .bind(category)
            .fetch_optional(self.db_manager.pool())
            .await?)
    }

    async fn find_item(&self, item_id: i64) -> Result<Option<Item>, CatalogError> {
        Ok(sqlx::query_as::<_, Item>(queries::GET_ITEM)
            .bind(item_id)
            .fetch_optional(self.db_manager.pool())
            .await?)
    }

    async fn list_items(&self) -> Result<Vec<Item>, CatalogError> {
        Ok(sqlx::query_as::<_, Item>(queries::GET_ALL_ITEMS)
            .fetch_all(self.db_manager.pool())
            .await?)
    }

    async fn find_bidder(&self, bidder_id: i64) -> Result<Option<Participant>, CatalogError> {
        Ok(sqlx::query_as::<_, Participant>(queries::GET_BIDDER)
            .bind(bidder_id)
            .fetch_optional(self.db_manager.pool())
            .await?)
    }

    async fn list_all_bidders(&self) -> Result<Vec<Participant>, CatalogError> {
        Ok(sqlx::query_as::<_, Participant>(queries::GET_ALL_BIDDERS)
            .fetch_all(self.db_manager.pool())
            .await?)
    }

    async fn list_bids(&self, item_id: i64) -> Result<Vec<Bid>, CatalogError> {
        Ok(sqlx::query_as::<_, Bid>(queries::GET_ITEM_BIDS)
            .bind(item_id)
            .fetch_all(self.db_manager.pool())
            .await?)
    }

    async fn deduct_budget(&self, bidder_id: i64, amount: i64) -> Result<i64, CatalogError> {
        self.db_manager
            .transaction(|tx| Box::pin(async move { deduct_budget_tx(tx, bidder_id, amount).await }))
            .await
    }

    async fn persist_award(
        &self,
        item_id: i64,
        bidder_id: i64,
        price: i64,
    ) -> Result<Item, CatalogError> {
        info!(
            "{:<12} --> 낙찰 기록: item={}, bidder={}, price={}",
            "Catalog", item_id, bidder_id, price
        );
        let (item, event) = self
            .db_manager
            .transaction(|tx| {
                Box::pin(async move {
                    let item = award_tx(tx, item_id, bidder_id, price).await?;
                    let event = event_store::append_event(
                        tx,
                        &AuctionEvent::ItemAwarded {
                            item_id,
                            bidder_id,
                            price,
                            timestamp: Utc::now(),
                        },
                    )
                    .await?;
                    Ok::<_, CatalogError>((item, event))
                })
            })
            .await?;

        self.publish(event);
        Ok(item)
    }

    async fn settle_sale(&self, award: &Award) -> Result<Settlement, CatalogError> {
        info!(
            "{:<12} --> 낙찰 정산: item={}, bidder={}, price={}",
            "Catalog", award.item_id, award.bidder_id, award.price
        );
        let award = award.clone();
        let (settlement, event) = self
            .db_manager
            .transaction(move |tx| {
                Box::pin(async move {
                    let item = award_tx(tx, award.item_id, award.bidder_id, award.price).await?;
                    let remaining_budget = deduct_budget_tx(tx, award.bidder_id, award.price).await?;

                    for bid in &award.bids {
                        sqlx::query(queries::INSERT_BID)
                            .bind(bid.item_id)
                            .bind(bid.bidder_id)
                            .bind(bid.amount)
                            .bind(bid.bid_time)
                            .execute(&mut **tx)
                            .await?;
                    }

                    let event = event_store::append_event(
                        tx,
                        &AuctionEvent::PlayerSold {
                            item_id: award.item_id,
                            bidder_id: award.bidder_id,
                            price: award.price,
                            remaining_budget,
                            timestamp: Utc::now(),
                        },
                    )
                    .await?;

                    Ok::<_, CatalogError>((
                        Settlement {
                            item,
                            remaining_budget,
                        },
                        event,
                    ))
                })
            })
            .await?;

        self.publish(event);
        Ok(settlement)
    }
}

// endregion: --- Catalog Gateway Impl
