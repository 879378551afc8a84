use auction_coordinator::auction::AuctionCoordinator;
use auction_coordinator::auth::{Identity, JwtVerifier};
use auction_coordinator::bidding::model::{Award, Bid, Role};
use auction_coordinator::catalog::{CatalogGateway, MemoryCatalog};
use auction_coordinator::config::CoordinatorConfig;
use auction_coordinator::handlers::{self, AppState};
use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// 메모리 카탈로그로 서버를 띄우고 주소를 돌려준다.
async fn start_server() -> SocketAddr {
    let memory = Arc::new(MemoryCatalog::new());
    memory.insert_bidder(1, "a", "A", 100);
    memory.insert_bidder(2, "b", "B", 50);
    memory.insert_item(10, "Zeus", "TOP", 0);
    memory.insert_item(11, "Kiin", "TOP", 0);
    memory.persist_award(11, 2, 15).await.unwrap();
    memory.insert_item(12, "Canyon", "JGL", 0);
    let opened = Utc::now();
    memory
        .settle_sale(&Award {
            item_id: 12,
            bidder_id: 1,
            price: 25,
            bids: vec![
                Bid {
                    item_id: 12,
                    bidder_id: 2,
                    amount: 20,
                    bid_time: opened,
                },
                Bid {
                    item_id: 12,
                    bidder_id: 1,
                    amount: 25,
                    bid_time: opened + Duration::seconds(2),
                },
            ],
        })
        .await
        .unwrap();

    let config = CoordinatorConfig::default();
    let catalog: Arc<dyn CatalogGateway> = memory;
    let app = handlers::router(AppState {
        coordinator: AuctionCoordinator::spawn(Arc::clone(&catalog), config.clone()),
        catalog,
        verifier: JwtVerifier::from("test-secret"),
        reserved_category: config.reserved_category,
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    addr
}

/// 경매 상태 조회
#[tokio::test]
async fn test_get_auction_state() {
    let addr = start_server().await;
    let response = Client::new()
        .get(format!("http://{}/auction/state", addr))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["sessionStatus"], "waiting");
    assert_eq!(body["phase"], "idle");
    assert_eq!(body["isActive"], false);
    assert!(body["currentItem"].is_null());
}

/// 미낙찰 아이템과 로스터 조회
#[tokio::test]
async fn test_get_items_and_rosters() {
    let addr = start_server().await;
    let client = Client::new();

    let items: Value = client
        .get(format!("http://{}/items", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<i64> = items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![10]);

    let rosters: Value = client
        .get(format!("http://{}/rosters", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rosters = rosters.as_array().unwrap();
    assert_eq!(rosters.len(), 2);
    let b = rosters
        .iter()
        .find(|r| r["username"] == "b")
        .unwrap();
    assert_eq!(b["slots"]["TOP"]["itemId"], 11);
    assert_eq!(b["slots"]["TOP"]["price"], 15);
    assert_eq!(b["slots"]["MID"]["tier"], "Coach");
}

/// 아이템 입찰 이력 조회 (최신순), 없는 아이템은 404
#[tokio::test]
async fn test_get_item_bids() {
    let addr = start_server().await;
    let client = Client::new();

    let bids: Value = client
        .get(format!("http://{}/items/12/bids", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let bids: Vec<(i64, i64)> = bids
        .as_array()
        .unwrap()
        .iter()
        .map(|bid| (bid["bidderId"].as_i64().unwrap(), bid["amount"].as_i64().unwrap()))
        .collect();
    assert_eq!(bids, vec![(1, 25), (2, 20)]);

    let response = client
        .get(format!("http://{}/items/10/bids", addr))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.json::<Value>().await.unwrap(), serde_json::json!([]));

    let response = client
        .get(format!("http://{}/items/77/bids", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "ITEM_NOT_FOUND");
}

/// WebSocket 업그레이드 요청 (토큰은 선택)
async fn request_upgrade(addr: SocketAddr, token: Option<&str>) -> reqwest::Response {
    let url = match token {
        Some(token) => format!("http://{}/auction?token={}", addr, token),
        None => format!("http://{}/auction", addr),
    };
    Client::new()
        .get(url)
        .header("connection", "upgrade")
        .header("upgrade", "websocket")
        .header("sec-websocket-version", "13")
        .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
        .send()
        .await
        .expect("Failed to send request")
}

fn coach_a() -> Identity {
    Identity {
        participant_id: 1,
        username: "a".to_string(),
        name: "A".to_string(),
        role: Role::Bidder,
    }
}

/// 토큰이 없거나 다른 키로 서명되면 401 과 `UNAUTHENTICATED` 로 거부된다.
#[tokio::test]
async fn test_socket_rejects_missing_or_forged_token() {
    let addr = start_server().await;

    let response = request_upgrade(addr, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let forged = JwtVerifier::from("other-secret").issue(&coach_a(), 1).unwrap();
    let response = request_upgrade(addr, Some(&forged)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHENTICATED");
}

/// 올바른 토큰이면 업그레이드가 승인된다.
#[tokio::test]
async fn test_socket_accepts_valid_token() {
    let addr = start_server().await;
    let token = JwtVerifier::from("test-secret").issue(&coach_a(), 1).unwrap();

    let response = request_upgrade(addr, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
}
