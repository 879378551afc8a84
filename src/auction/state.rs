/// 단일 아이템 경매 상태 머신
///
/// Idle -> Active -> Resolving -> Idle 로만 움직인다. 저장소 I/O는 코디네이터가
/// 담당하고, 이 타입은 메모리 상태 전이와 그 검증만 맡는다.
// region:    --- Imports
use crate::auth::Identity;
use crate::bidding::model::{Bid, Item};
use crate::error::AuctionError;
use chrono::{DateTime, Utc};
use serde::Serialize;

// endregion: --- Imports

// region:    --- Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Waiting,
    Started,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Active,
    Resolving,
}

/// 현재 최고 입찰자
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leader {
    pub participant_id: i64,
    pub username: String,
    pub name: String,
}

impl From<&Identity> for Leader {
    fn from(identity: &Identity) -> Self {
        Self {
            participant_id: identity.participant_id,
            username: identity.username.clone(),
            name: identity.name.clone(),
        }
    }
}

/// 클라이언트에 내려주는 경매 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSnapshot {
    pub session_status: SessionStatus,
    pub phase: Phase,
    pub current_item: Option<Item>,
    pub current_price: i64,
    pub leader: Option<Leader>,
    pub time_remaining: u32,
    pub is_active: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub started_by: Option<String>,
}

/// 경매 종료 시 결정되는 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Sale {
        item: Item,
        leader: Leader,
        price: i64,
        bids: Vec<Bid>,
    },
    NoSale {
        item: Item,
    },
}

/// 타이머 1초 경과 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Running(u32),
    Expired,
}

// endregion: --- Types

// region:    --- Auction State
#[derive(Debug)]
pub struct AuctionState {
    session: SessionStatus,
    phase: Phase,
    item: Option<Item>,
    current_price: i64,
    leader: Option<Leader>,
    time_remaining: u32,
    countdown_secs: u32,
    started_at: Option<DateTime<Utc>>,
    started_by: Option<String>,
    bids: Vec<Bid>,
    round: u64,
}

impl AuctionState {
    pub fn new(countdown_secs: u32) -> Self {
        Self {
            session: SessionStatus::Waiting,
            phase: Phase::Idle,
            item: None,
            current_price: 0,
            leader: None,
            time_remaining: countdown_secs,
            countdown_secs,
            started_at: None,
            started_by: None,
            bids: Vec::new(),
            round: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    pub fn current_price(&self) -> i64 {
        self.current_price
    }

    pub fn leader(&self) -> Option<&Leader> {
        self.leader.as_ref()
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    /// 아이템이 올라올 때마다 증가하는 라운드 번호
    pub fn round(&self) -> u64 {
        self.round
    }

    /// 세션 시작 기록
    pub fn start_session(&mut self, started_by: &str, at: DateTime<Utc>) {
        self.session = SessionStatus::Started;
        self.started_at = Some(at);
        self.started_by = Some(started_by.to_string());
    }

    pub fn ensure_idle(&self) -> Result<(), AuctionError> {
        match self.phase {
            Phase::Idle => Ok(()),
            Phase::Active | Phase::Resolving => Err(AuctionError::AuctionBusy),
        }
    }

    pub fn ensure_active(&self) -> Result<(), AuctionError> {
        match self.phase {
            Phase::Active => Ok(()),
            Phase::Idle | Phase::Resolving => Err(AuctionError::NoActiveAuction),
        }
    }

    /// 아이템 경매 시작. 새 라운드 번호를 돌려준다.
    pub fn begin(&mut self, item: Item) -> Result<u64, AuctionError> {
        self.ensure_idle()?;
        self.current_price = item.base_price;
        self.item = Some(item);
        self.leader = None;
        self.bids.clear();
        self.time_remaining = self.countdown_secs;
        self.phase = Phase::Active;
        self.round += 1;
        Ok(self.round)
    }

    /// 상태만으로 판단 가능한 입찰 검증 (진행 여부, 대상 아이템, 금액)
    pub fn check_bid(&self, item_id: i64, amount: i64) -> Result<&Item, AuctionError> {
        self.ensure_active()?;
        let item = self.item.as_ref().ok_or(AuctionError::NoActiveAuction)?;
        if item.id != item_id {
            return Err(AuctionError::NotCurrentItem(item_id));
        }
        if amount <= self.current_price {
            return Err(AuctionError::BidTooLow {
                amount,
                current: self.current_price,
            });
        }
        Ok(item)
    }

    /// 입찰 반영. 가격과 최고 입찰자를 갱신하고 카운트다운을 초기화한다.
    pub fn accept_bid(
        &mut self,
        item_id: i64,
        leader: Leader,
        amount: i64,
        at: DateTime<Utc>,
    ) -> Result<(), AuctionError> {
        self.check_bid(item_id, amount)?;
        self.bids.push(Bid {
            item_id,
            bidder_id: leader.participant_id,
            amount,
            bid_time: at,
        });
        self.current_price = amount;
        self.leader = Some(leader);
        self.time_remaining = self.countdown_secs;
        Ok(())
    }

    /// 1초 경과
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::Active {
            return TickOutcome::Ignored;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            TickOutcome::Expired
        } else {
            TickOutcome::Running(self.time_remaining)
        }
    }

    /// 현재 상태 기준 경매 결과 (상태는 바꾸지 않는다)
    pub fn outcome(&self) -> Result<Outcome, AuctionError> {
        self.ensure_active()?;
        let item = self.item.clone().ok_or(AuctionError::NoActiveAuction)?;
        match &self.leader {
            Some(leader) if self.current_price > 0 => Ok(Outcome::Sale {
                item,
                leader: leader.clone(),
                price: self.current_price,
                bids: self.bids.clone(),
            }),
            _ => Ok(Outcome::NoSale { item }),
        }
    }

    /// 정산 실패 후 경매 재개. 가격, 최고 입찰자, 입찰 이력은 그대로 둔다.
    pub fn resume(&mut self) {
        if self.phase == Phase::Active {
            self.time_remaining = self.countdown_secs;
        }
    }

    /// 결과 확정. 낙찰이면 저장된 아이템으로 교체한다.
    pub fn finish(&mut self, sold_item: Option<Item>) {
        if let Some(item) = sold_item {
            self.item = Some(item);
        }
        self.phase = Phase::Resolving;
    }

    /// 쿨다운 종료 후 대기 상태로 복귀
    /// 라운드가 다르면 이미 지난 쿨다운이므로 무시한다.
    pub fn reset_after_cooldown(&mut self, round: u64) -> bool {
        if self.phase != Phase::Resolving || self.round != round {
            return false;
        }
        self.phase = Phase::Idle;
        self.item = None;
        self.current_price = 0;
        self.leader = None;
        self.bids.clear();
        self.time_remaining = self.countdown_secs;
        true
    }

    pub fn snapshot(&self) -> AuctionSnapshot {
        AuctionSnapshot {
            session_status: self.session,
            phase: self.phase,
            current_item: self.item.clone(),
            current_price: self.current_price,
            leader: self.leader.clone(),
            time_remaining: self.time_remaining,
            is_active: self.phase == Phase::Active,
            started_at: self.started_at,
            started_by: self.started_by.clone(),
        }
    }
}

// endregion: --- Auction State
