/// 경매 코디네이터
///
/// 경매 상태, 참가자 레지스트리, 타이머를 하나의 태스크가 소유한다. 모든 요청과 타이머 틱은
/// 같은 명령 큐를 거쳐 도착 순서대로 하나씩 처리되므로, 저장소 호출을 기다리는 동안에도
/// 다른 변경이 끼어들지 않는다.
// region:    --- Imports
use super::auto_assign::{self, Resolution};
use super::messages::{RosterUpdate, ServerEvent};
use super::state::{AuctionSnapshot, AuctionState, Leader, Outcome, TickOutcome};
use crate::auth::Identity;
use crate::bidding::commands::{validate_bid, PlaceBidCommand};
use crate::bidding::model::{Award, Item, Settlement};
use crate::catalog::CatalogGateway;
use crate::config::CoordinatorConfig;
use crate::error::{AuctionError, CatalogError, ErrorBody};
use crate::participants::{ConnectionHandle, ParticipantRegistry};
use crate::scheduler::{schedule_cooldown, CountdownTimer};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Duration;
use tracing::{debug, info, warn};

// endregion: --- Imports

const COMMAND_QUEUE_SIZE: usize = 256;
const TICK_PERIOD: Duration = Duration::from_secs(1);

type Reply<T> = oneshot::Sender<Result<T, AuctionError>>;

// region:    --- Commands
/// 코디네이터 큐에 들어가는 명령
#[derive(Debug)]
pub enum Command {
    Join {
        identity: Identity,
        display_name: Option<String>,
        connection: ConnectionHandle,
        reply: Reply<()>,
    },
    Leave {
        participant_id: i64,
        connection_id: u64,
    },
    RequestRoster {
        identity: Identity,
        reply: Reply<()>,
    },
    Start {
        identity: Identity,
        reply: Reply<()>,
    },
    Draw {
        identity: Identity,
        item_id: i64,
        reply: Reply<()>,
    },
    Bid {
        identity: Identity,
        cmd: PlaceBidCommand,
        reply: Reply<()>,
    },
    End {
        identity: Identity,
        reply: Reply<()>,
    },
    /// 타이머 1초 경과
    Tick { generation: u64 },
    /// 결과 표시 시간 종료
    CooldownElapsed { round: u64 },
    Snapshot {
        reply: oneshot::Sender<AuctionSnapshot>,
    },
}

// endregion: --- Commands

// region:    --- Coordinator Handle
/// 전송 계층에서 사용하는 코디네이터 핸들
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, AuctionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| AuctionError::Unavailable)?;
        rx.await.map_err(|_| AuctionError::Unavailable)?
    }

    /// 참가. 성공하면 `joined` 가 연결로 먼저 전송된다.
    pub async fn join(
        &self,
        identity: Identity,
        display_name: Option<String>,
        connection: ConnectionHandle,
    ) -> Result<(), AuctionError> {
        self.request(|reply| Command::Join {
            identity,
            display_name,
            connection,
            reply,
        })
        .await
    }

    /// 퇴장 (응답 없음)
    pub async fn leave(&self, participant_id: i64, connection_id: u64) {
        let _ = self
            .commands
            .send(Command::Leave {
                participant_id,
                connection_id,
            })
            .await;
    }

    pub async fn request_roster(&self, identity: Identity) -> Result<(), AuctionError> {
        self.request(|reply| Command::RequestRoster { identity, reply })
            .await
    }

    pub async fn start(&self, identity: Identity) -> Result<(), AuctionError> {
        self.request(|reply| Command::Start { identity, reply }).await
    }

    pub async fn draw(&self, identity: Identity, item_id: i64) -> Result<(), AuctionError> {
        self.request(|reply| Command::Draw {
            identity,
            item_id,
            reply,
        })
        .await
    }

    pub async fn place_bid(
        &self,
        identity: Identity,
        cmd: PlaceBidCommand,
    ) -> Result<(), AuctionError> {
        self.request(|reply| Command::Bid {
            identity,
            cmd,
            reply,
        })
        .await
    }

    pub async fn end(&self, identity: Identity) -> Result<(), AuctionError> {
        self.request(|reply| Command::End { identity, reply }).await
    }

    /// 현재 경매 상태
    pub async fn snapshot(&self) -> Result<AuctionSnapshot, AuctionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| AuctionError::Unavailable)?;
        rx.await.map_err(|_| AuctionError::Unavailable)
    }
}

// endregion: --- Coordinator Handle

// region:    --- Auction Coordinator
pub struct AuctionCoordinator {
    catalog: Arc<dyn CatalogGateway>,
    config: CoordinatorConfig,
    state: AuctionState,
    registry: ParticipantRegistry,
    timer: CountdownTimer,
    /// 타이머와 쿨다운 태스크에 넘겨주는 약한 송신자 (핸들이 모두 사라지면 큐가 닫힌다)
    commands: mpsc::WeakSender<Command>,
}

impl AuctionCoordinator {
    /// 코디네이터 태스크 시작
    pub fn spawn(catalog: Arc<dyn CatalogGateway>, config: CoordinatorConfig) -> CoordinatorHandle {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let coordinator = Self {
            catalog,
            state: AuctionState::new(config.countdown_secs),
            registry: ParticipantRegistry::new(),
            timer: CountdownTimer::new(TICK_PERIOD),
            commands: tx.downgrade(),
            config,
        };
        tokio::spawn(coordinator.run(rx));
        CoordinatorHandle { commands: tx }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        info!(
            "{:<12} --> 코디네이터 시작 (카운트다운 {}초)",
            "Coordinator", self.config.countdown_secs
        );
        while let Some(command) = rx.recv().await {
            self.handle(command).await;
        }
        self.timer.stop();
        info!("{:<12} --> 코디네이터 종료", "Coordinator");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Join {
                identity,
                display_name,
                connection,
                reply,
            } => {
                let result = self.join(identity, display_name, connection).await;
                let _ = reply.send(result);
            }
            Command::Leave {
                participant_id,
                connection_id,
            } => self.leave(participant_id, connection_id).await,
            Command::RequestRoster { identity, reply } => {
                let result = self.request_roster(&identity).await;
                let _ = reply.send(result);
            }
            Command::Start { identity, reply } => {
                let _ = reply.send(self.start(&identity));
            }
            Command::Draw {
                identity,
                item_id,
                reply,
            } => {
                let result = self.draw(&identity, item_id).await;
                let _ = reply.send(result);
            }
            Command::Bid {
                identity,
                cmd,
                reply,
            } => {
                let result = self.place_bid(&identity, cmd).await;
                let _ = reply.send(result);
            }
            Command::End { identity, reply } => {
                let result = self.end_auction(&identity).await;
                let _ = reply.send(result);
            }
            Command::Tick { generation } => self.tick(generation).await,
            Command::CooldownElapsed { round } => {
                if self.state.reset_after_cooldown(round) {
                    info!("{:<12} --> 라운드 {} 종료, 대기 상태", "Coordinator", round);
                }
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.state.snapshot());
            }
        }
    }

    // region:    --- Participants
    async fn join(
        &mut self,
        identity: Identity,
        display_name: Option<String>,
        connection: ConnectionHandle,
    ) -> Result<(), AuctionError> {
        let display_name = display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| identity.name.clone());

        let budget = if identity.is_admin() {
            None
        } else {
            match self.catalog.find_bidder(identity.participant_id).await {
                Ok(bidder) => bidder.map(|b| b.budget),
                Err(e) => {
                    warn!("{:<12} --> 포인트 조회 실패: {}", "Coordinator", e);
                    None
                }
            }
        };

        info!(
            "{:<12} --> 참가: {} ({:?})",
            "Coordinator", identity.username, identity.role
        );
        let reply_to = connection.clone();
        self.registry
            .join(identity, display_name.clone(), connection, Utc::now(), budget);
        reply_to.send(ServerEvent::Joined {
            message: format!("{}님이 경매에 참가했습니다.", display_name),
            auction_state: self.state.snapshot(),
        });

        self.broadcast_roster().await;
        Ok(())
    }

    async fn leave(&mut self, participant_id: i64, connection_id: u64) {
        if self.registry.leave(participant_id, connection_id) {
            info!("{:<12} --> 퇴장: {}", "Coordinator", participant_id);
            self.broadcast_roster().await;
        }
    }

    async fn request_roster(&mut self, identity: &Identity) -> Result<(), AuctionError> {
        self.require_admin(identity, "상태 조회")?;
        self.broadcast_roster().await;
        Ok(())
    }

    /// 로스터 방송. 저장소 조회가 실패해도 접속 정보만으로 방송한다.
    async fn broadcast_roster(&self) {
        let persisted = match self.catalog.list_all_bidders().await {
            Ok(bidders) => Some(bidders),
            Err(e) => {
                warn!("{:<12} --> 코치 목록 조회 실패: {}", "Coordinator", e);
                None
            }
        };
        let update = RosterUpdate::from_statuses(self.registry.roster(persisted));
        self.registry.broadcast(&ServerEvent::CoachesUpdate(update));
    }

    fn require_joined(&self, identity: &Identity) -> Result<(), AuctionError> {
        if self.registry.contains(identity.participant_id) {
            Ok(())
        } else {
            Err(AuctionError::ParticipantNotFound(identity.username.clone()))
        }
    }

    fn require_admin(&self, identity: &Identity, action: &'static str) -> Result<(), AuctionError> {
        self.require_joined(identity)?;
        if !identity.is_admin() {
            return Err(AuctionError::Forbidden(action));
        }
        Ok(())
    }

    // endregion: --- Participants

    // region:    --- Auction Flow
    fn start(&mut self, identity: &Identity) -> Result<(), AuctionError> {
        self.require_admin(identity, "경매 시작")?;
        let at = Utc::now();
        self.state.start_session(&identity.name, at);
        info!("{:<12} --> 경매 세션 시작: {}", "Coordinator", identity.name);

        self.registry.broadcast(&ServerEvent::AuctionStarted {
            message: "경매가 시작되었습니다.".to_string(),
            started_by: identity.name.clone(),
            started_at: at,
            auction_state: self.state.snapshot(),
        });
        if let Some(entry) = self.registry.get(identity.participant_id) {
            entry.connection.send(ServerEvent::AuctionStartConfirmed {
                message: "경매 시작이 확인되었습니다.".to_string(),
                auction_state: self.state.snapshot(),
            });
        }
        Ok(())
    }

    async fn draw(&mut self, identity: &Identity, item_id: i64) -> Result<(), AuctionError> {
        self.require_admin(identity, "선수 추첨")?;
        self.state.ensure_idle()?;

        let item = self
            .catalog
            .find_item(item_id)
            .await?
            .ok_or(AuctionError::ItemNotFound(item_id))?;
        if item.is_assigned() {
            return Err(AuctionError::ItemAlreadyAssigned(item_id));
        }

        let resolution =
            auto_assign::resolve(self.catalog.as_ref(), &item, &self.config.reserved_category)
                .await?;
        match resolution {
            Resolution::Assigned { item, bidder } => {
                self.registry.broadcast(&ServerEvent::PlayerAutoAssigned {
                    message: format!(
                        "{} 포지션 마지막 선수 {} 이(가) {} 코치에게 자동 배정되었습니다.",
                        item.category, item.name, bidder.name
                    ),
                    reason: "last_in_category".to_string(),
                    assigned_to: bidder.name,
                    assigned_to_username: bidder.username,
                    player: item,
                });
            }
            Resolution::Deferred => {
                let round = self.state.begin(item.clone())?;
                self.timer.start(self.commands.clone());
                info!(
                    "{:<12} --> 라운드 {} 시작: {} ({})",
                    "Coordinator", round, item.name, item.category
                );
                self.registry.broadcast(&ServerEvent::PlayerDrawn {
                    player: item,
                    auction_state: self.state.snapshot(),
                });
            }
        }
        Ok(())
    }

    async fn place_bid(
        &mut self,
        identity: &Identity,
        cmd: PlaceBidCommand,
    ) -> Result<(), AuctionError> {
        self.require_joined(identity)?;
        let item = self.state.check_bid(cmd.item_id, cmd.amount)?.clone();
        let participant = validate_bid(
            self.catalog.as_ref(),
            identity,
            &cmd,
            &item,
            &self.config.reserved_category,
        )
        .await?;

        self.state
            .accept_bid(cmd.item_id, Leader::from(identity), cmd.amount, Utc::now())?;
        self.registry
            .update_budget(identity.participant_id, participant.budget);
        info!(
            "{:<12} --> 입찰 수락: {} {}점 (아이템 {})",
            "Coordinator", identity.username, cmd.amount, cmd.item_id
        );

        self.registry.broadcast(&ServerEvent::BidPlaced {
            amount: cmd.amount,
            bidder: identity.username.clone(),
            bidder_name: identity.name.clone(),
            player_id: cmd.item_id,
            time_remaining: self.state.time_remaining(),
            auction_state: self.state.snapshot(),
        });
        Ok(())
    }

    async fn end_auction(&mut self, identity: &Identity) -> Result<(), AuctionError> {
        self.require_admin(identity, "경매 종료")?;
        info!("{:<12} --> 경매 종료 요청: {}", "Coordinator", identity.username);
        self.resolve().await
    }

    async fn tick(&mut self, generation: u64) {
        if !self.timer.is_current(generation) {
            debug!("{:<12} --> 지난 타이머 틱 무시: {}", "Coordinator", generation);
            return;
        }
        match self.state.tick() {
            TickOutcome::Ignored => {}
            TickOutcome::Running(time_remaining) => {
                self.registry
                    .broadcast(&ServerEvent::TimerUpdate { time_remaining });
            }
            TickOutcome::Expired => {
                info!("{:<12} --> 시간 종료", "Coordinator");
                if let Err(e) = self.resolve().await {
                    self.registry
                        .notify_admins(&ServerEvent::Error(ErrorBody::from(&e)));
                }
            }
        }
    }

    /// 경매 결과 확정 (명시적 종료와 시간 종료가 같은 경로를 쓴다)
    /// 일시적인 저장소 오류는 진행 중 상태로 되돌리고 타이머를 다시 시작한다.
    /// 다시 시도해도 성공할 수 없는 오류는 유찰로 처리한 뒤 오류를 돌려준다.
    async fn resolve(&mut self) -> Result<(), AuctionError> {
        let outcome = self.state.outcome()?;
        self.timer.stop();
        let round = self.state.round();

        let (event, failure) = match outcome {
            Outcome::Sale {
                item,
                leader,
                price,
                bids,
            } => {
                let award = Award {
                    item_id: item.id,
                    bidder_id: leader.participant_id,
                    price,
                    bids,
                };
                match self.settle(&award).await {
                    Ok(settlement) => {
                        self.registry
                            .update_budget(leader.participant_id, settlement.remaining_budget);
                        self.state.finish(Some(settlement.item.clone()));
                        info!(
                            "{:<12} --> 낙찰: {} -> {} {}점",
                            "Coordinator", settlement.item.name, leader.username, price
                        );
                        let event = ServerEvent::PlayerSold {
                            player: settlement.item,
                            winner: Some(leader.name),
                            winner_username: Some(leader.username),
                            final_price: price,
                            remaining_budget: Some(settlement.remaining_budget),
                            auction_state: self.state.snapshot(),
                        };
                        (event, None)
                    }
                    Err(e) if e.is_transient() => {
                        warn!(
                            "{:<12} --> 정산 실패, 경매 재개: {} (아이템 {})",
                            "Coordinator", e, item.id
                        );
                        self.state.resume();
                        self.timer.start(self.commands.clone());
                        return Err(e.into());
                    }
                    Err(e) => {
                        warn!(
                            "{:<12} --> 정산 불가, 유찰 처리: {} (아이템 {})",
                            "Coordinator", e, item.id
                        );
                        self.state.finish(None);
                        (self.no_sale(item), Some(AuctionError::from(e)))
                    }
                }
            }
            Outcome::NoSale { item } => {
                self.state.finish(None);
                info!("{:<12} --> 유찰: {}", "Coordinator", item.name);
                (self.no_sale(item), None)
            }
        };

        self.registry.broadcast(&event);
        schedule_cooldown(self.commands.clone(), self.config.cooldown, round);
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// 유찰 이벤트 (낙찰자 없음, 최종 가격 0)
    fn no_sale(&self, item: Item) -> ServerEvent {
        ServerEvent::PlayerSold {
            player: item,
            winner: None,
            winner_username: None,
            final_price: 0,
            remaining_budget: None,
            auction_state: self.state.snapshot(),
        }
    }

    /// 낙찰 정산
    /// 호출이 실패해도 저장소에 이미 반영됐다면 (응답만 늦은 경우) 반영된 결과를 쓴다.
    async fn settle(&self, award: &Award) -> Result<Settlement, CatalogError> {
        let err = match self.catalog.settle_sale(award).await {
            Ok(settlement) => return Ok(settlement),
            Err(e) => e,
        };
        match self.committed_settlement(award).await {
            Ok(Some(settlement)) => {
                warn!(
                    "{:<12} --> 정산 응답 실패, 저장소 반영 확인: {} (아이템 {})",
                    "Coordinator", err, award.item_id
                );
                Ok(settlement)
            }
            Ok(None) => Err(err),
            Err(check) => {
                warn!("{:<12} --> 정산 반영 여부 확인 실패: {}", "Coordinator", check);
                Err(err)
            }
        }
    }

    async fn committed_settlement(
        &self,
        award: &Award,
    ) -> Result<Option<Settlement>, CatalogError> {
        let Some(item) = self.catalog.find_item(award.item_id).await? else {
            return Ok(None);
        };
        if item.buyer_id != Some(award.bidder_id) || item.current_price != award.price {
            return Ok(None);
        }
        let Some(bidder) = self.catalog.find_bidder(award.bidder_id).await? else {
            return Ok(None);
        };
        Ok(Some(Settlement {
            item,
            remaining_budget: bidder.budget,
        }))
    }

    // endregion: --- Auction Flow
}

// endregion: --- Auction Coordinator
