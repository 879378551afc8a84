/// 참가자 레지스트리와 방송
/// 전송 계층의 소켓을 직접 다루지 않고, 연결마다 하나씩 있는 순서 보장 큐로만 내보낸다.
// region:    --- Imports
use crate::auction::messages::{CoachStatus, ServerEvent};
use crate::auth::Identity;
use crate::bidding::model::{Participant, Role};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

// endregion: --- Imports

// region:    --- Connection Handle
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;

/// 연결 하나의 송신 핸들
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub connection_id: u64,
    outbox: Outbox,
}

impl ConnectionHandle {
    pub fn new(connection_id: u64, outbox: Outbox) -> Self {
        Self {
            connection_id,
            outbox,
        }
    }

    /// 이벤트 전송. 연결이 이미 닫혔으면 false
    pub fn send(&self, event: ServerEvent) -> bool {
        self.outbox.send(event).is_ok()
    }
}

// endregion: --- Connection Handle

// region:    --- Participant Registry
/// 접속한 참가자
#[derive(Debug, Clone)]
pub struct ConnectedParticipant {
    pub identity: Identity,
    pub display_name: String,
    pub connection: ConnectionHandle,
    pub joined_at: DateTime<Utc>,
    /// 마지막으로 확인한 포인트
    pub budget: Option<i64>,
}

#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    entries: HashMap<i64, ConnectedParticipant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 참가 (같은 참가자가 다시 들어오면 덮어쓴다)
    pub fn join(
        &mut self,
        identity: Identity,
        display_name: String,
        connection: ConnectionHandle,
        joined_at: DateTime<Utc>,
        budget: Option<i64>,
    ) {
        let participant_id = identity.participant_id;
        self.entries.insert(
            participant_id,
            ConnectedParticipant {
                identity,
                display_name,
                connection,
                joined_at,
                budget,
            },
        );
    }

    /// 퇴장. 등록한 연결이 아니면 (재접속으로 교체된 경우) 무시한다.
    pub fn leave(&mut self, participant_id: i64, connection_id: u64) -> bool {
        match self.entries.get(&participant_id) {
            Some(entry) if entry.connection.connection_id == connection_id => {
                self.entries.remove(&participant_id);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, participant_id: i64) -> Option<&ConnectedParticipant> {
        self.entries.get(&participant_id)
    }

    pub fn contains(&self, participant_id: i64) -> bool {
        self.entries.contains_key(&participant_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 포인트 캐시 갱신
    pub fn update_budget(&mut self, participant_id: i64, budget: i64) {
        if let Some(entry) = self.entries.get_mut(&participant_id) {
            entry.budget = Some(budget);
        }
    }

    /// 전체 방송. 전달된 연결 수를 돌려준다.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        debug!(
            "{:<12} --> {} 방송: {}명",
            "Broadcast",
            event.kind(),
            self.entries.len()
        );
        self.entries
            .values()
            .filter(|entry| deliver(entry, event))
            .count()
    }

    /// 진행자에게만 전송
    pub fn notify_admins(&self, event: &ServerEvent) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.identity.is_admin())
            .filter(|entry| deliver(entry, event))
            .count()
    }

    /// 저장된 코치 목록과 접속 상태를 합친 로스터
    /// 저장소 조회가 실패하면 접속 중인 코치만 캐시된 포인트(없으면 0)로 보여준다.
    pub fn roster(&self, persisted: Option<Vec<Participant>>) -> Vec<CoachStatus> {
        let mut statuses = Vec::new();
        let persisted = persisted.unwrap_or_default();

        for bidder in &persisted {
            let connected = self
                .entries
                .get(&bidder.id)
                .filter(|entry| entry.identity.role == Role::Bidder);
            statuses.push(CoachStatus {
                id: bidder.id,
                name: bidder.name.clone(),
                username: bidder.username.clone(),
                points: bidder.budget,
                is_connected: connected.is_some(),
                connected_at: connected.map(|entry| entry.joined_at),
            });
        }

        let mut extras: Vec<&ConnectedParticipant> = self
            .entries
            .values()
            .filter(|entry| entry.identity.role == Role::Bidder)
            .filter(|entry| !persisted.iter().any(|b| b.id == entry.identity.participant_id))
            .collect();
        extras.sort_by_key(|entry| entry.identity.participant_id);

        statuses.extend(extras.into_iter().map(|entry| CoachStatus {
            id: entry.identity.participant_id,
            name: entry.display_name.clone(),
            username: entry.identity.username.clone(),
            points: entry.budget.unwrap_or(0),
            is_connected: true,
            connected_at: Some(entry.joined_at),
        }));

        statuses
    }
}

fn deliver(entry: &ConnectedParticipant, event: &ServerEvent) -> bool {
    if entry.connection.send(event.clone()) {
        true
    } else {
        warn!(
            "{:<12} --> 연결이 닫혀 {} 전송 생략: {}",
            "Broadcast",
            event.kind(),
            entry.identity.username
        );
        false
    }
}

// endregion: --- Participant Registry

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: i64, role: Role) -> Identity {
        Identity {
            participant_id: id,
            username: format!("user{}", id),
            name: format!("User {}", id),
            role,
        }
    }

    fn connection(id: u64) -> (ConnectionHandle, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(id, tx), rx)
    }

    #[test]
    fn leave_ignores_replaced_connection() {
        let mut registry = ParticipantRegistry::new();
        let (first, _rx1) = connection(1);
        let (second, _rx2) = connection(2);
        registry.join(identity(5, Role::Bidder), "A".into(), first, Utc::now(), None);
        registry.join(identity(5, Role::Bidder), "A".into(), second, Utc::now(), None);

        assert!(!registry.leave(5, 1));
        assert!(registry.contains(5));
        assert!(registry.leave(5, 2));
        assert!(registry.is_empty());
    }

    #[test]
    fn broadcast_skips_closed_connections() {
        let mut registry = ParticipantRegistry::new();
        let (open, mut open_rx) = connection(1);
        let (closed, closed_rx) = connection(2);
        drop(closed_rx);
        registry.join(identity(1, Role::Bidder), "A".into(), open, Utc::now(), None);
        registry.join(identity(2, Role::Bidder), "B".into(), closed, Utc::now(), None);

        let delivered = registry.broadcast(&ServerEvent::TimerUpdate { time_remaining: 3 });
        assert_eq!(delivered, 1);
        assert_eq!(
            open_rx.try_recv().unwrap(),
            ServerEvent::TimerUpdate { time_remaining: 3 }
        );
    }

    #[test]
    fn roster_merges_connection_status_and_hides_admins() {
        let mut registry = ParticipantRegistry::new();
        let (a, _rx_a) = connection(1);
        let (admin, _rx_admin) = connection(2);
        registry.join(identity(1, Role::Bidder), "A".into(), a, Utc::now(), Some(90));
        registry.join(identity(99, Role::Admin), "Admin".into(), admin, Utc::now(), None);

        let persisted = vec![
            Participant {
                id: 1,
                username: "user1".into(),
                name: "User 1".into(),
                budget: 100,
            },
            Participant {
                id: 2,
                username: "user2".into(),
                name: "User 2".into(),
                budget: 50,
            },
        ];
        let roster = registry.roster(Some(persisted));
        assert_eq!(roster.len(), 2);
        assert!(roster[0].is_connected);
        assert_eq!(roster[0].points, 100);
        assert!(!roster[1].is_connected);
        assert!(roster[1].connected_at.is_none());
    }

    #[test]
    fn roster_degrades_to_cached_budget() {
        let mut registry = ParticipantRegistry::new();
        let (a, _rx_a) = connection(1);
        let (b, _rx_b) = connection(2);
        registry.join(identity(1, Role::Bidder), "A".into(), a, Utc::now(), Some(70));
        registry.join(identity(2, Role::Bidder), "B".into(), b, Utc::now(), None);

        let roster = registry.roster(None);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].points, 70);
        assert_eq!(roster[1].points, 0);
        assert!(roster.iter().all(|c| c.is_connected));
    }
}
