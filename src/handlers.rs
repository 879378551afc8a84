// region:    --- Imports
use crate::auction::messages::{ClientMessage, ServerEvent};
use crate::auction::CoordinatorHandle;
use crate::auth::{Identity, JwtVerifier};
use crate::bidding::commands::PlaceBidCommand;
use crate::catalog::CatalogGateway;
use crate::error::{AuctionError, CatalogError, ErrorBody};
use crate::participants::ConnectionHandle;
use crate::query;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

// endregion: --- Imports

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

// region:    --- App State
#[derive(Clone)]
pub struct AppState {
    pub coordinator: CoordinatorHandle,
    pub catalog: Arc<dyn CatalogGateway>,
    pub verifier: JwtVerifier,
    pub reserved_category: String,
}

/// 라우터 설정
pub fn router(state: AppState) -> Router {
    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/auction", get(handle_auction_socket))
        .route("/auction/state", get(handle_get_auction_state))
        .route("/rosters", get(handle_get_rosters))
        .route("/items", get(handle_get_items))
        .route("/items/:id/bids", get(handle_get_item_bids))
        .layer(cors)
        .with_state(state)
}

// endregion: --- App State

// region:    --- WebSocket Handlers
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// 경매 WebSocket 연결. 토큰이 없거나 잘못되면 업그레이드하지 않는다.
pub async fn handle_auction_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
) -> impl IntoResponse {
    let identity = match state.verifier.authenticate(params.token.as_deref()) {
        Ok(identity) => identity,
        Err(e) => {
            return (StatusCode::UNAUTHORIZED, Json(ErrorBody::from(&e))).into_response();
        }
    };
    info!(
        "{:<12} --> WebSocket 연결 요청: {}",
        "Handler", identity.username
    );
    ws.on_upgrade(move |socket| serve_connection(socket, state, identity))
}

/// 연결 하나의 수신/송신 루프
/// 코디네이터가 보낸 이벤트는 연결별 큐를 거쳐 순서대로 소켓에 쓴다.
async fn serve_connection(mut socket: WebSocket, state: AppState, identity: Identity) {
    let connection_id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
    let (outbox, mut inbox) = mpsc::unbounded_channel();
    let connection = ConnectionHandle::new(connection_id, outbox);

    let auction_state = match state.coordinator.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("{:<12} --> 코디네이터 응답 없음: {}", "Handler", e);
            return;
        }
    };
    connection.send(ServerEvent::Connected {
        message: format!("{}님, 경매 서버에 연결되었습니다.", identity.name),
        auction_state,
    });

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if dispatch(&state.coordinator, &identity, &connection, &text)
                        .await
                        .is_break()
                    {
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            Some(event) = inbox.recv() => {
                let text = match event.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        error!("{:<12} --> 이벤트 직렬화 실패: {}", "Handler", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    }

    info!("{:<12} --> 연결 종료: {}", "Handler", identity.username);
    state
        .coordinator
        .leave(identity.participant_id, connection_id)
        .await;
}

/// 클라이언트 메시지를 코디네이터 명령으로 변환
/// 실패하면 요청한 연결에만 `error` 를 보낸다. `leave` 이후에는 연결을 닫는다.
async fn dispatch(
    coordinator: &CoordinatorHandle,
    identity: &Identity,
    connection: &ConnectionHandle,
    text: &str,
) -> ControlFlow<()> {
    let result = match ClientMessage::parse(text) {
        Err(e) => Err(AuctionError::InvalidMessage(e.to_string())),
        Ok(ClientMessage::Join { coach_name }) => {
            coordinator
                .join(identity.clone(), coach_name, connection.clone())
                .await
        }
        Ok(ClientMessage::Leave) => {
            coordinator
                .leave(identity.participant_id, connection.connection_id)
                .await;
            return ControlFlow::Break(());
        }
        Ok(ClientMessage::AdminStatusRequest) => coordinator.request_roster(identity.clone()).await,
        Ok(ClientMessage::Started) => coordinator.start(identity.clone()).await,
        Ok(ClientMessage::DrawPlayer { player_id }) => {
            coordinator.draw(identity.clone(), player_id).await
        }
        Ok(ClientMessage::PlaceBid {
            amount,
            player_id,
            bidder,
        }) => {
            let cmd = PlaceBidCommand {
                item_id: player_id,
                amount,
                bidder,
            };
            coordinator.place_bid(identity.clone(), cmd).await
        }
        Ok(ClientMessage::EndAuction) => coordinator.end(identity.clone()).await,
    };

    if let Err(e) = result {
        warn!(
            "{:<12} --> 요청 거부 ({}): {}",
            "Handler", identity.username, e
        );
        connection.send(ServerEvent::Error(ErrorBody::from(&e)));
    }
    ControlFlow::Continue(())
}

// endregion: --- WebSocket Handlers

// region:    --- Query Handlers

/// 경매 상태 조회
pub async fn handle_get_auction_state(State(state): State<AppState>) -> impl IntoResponse {
    info!("{:<12} --> 경매 상태 조회", "HandlerQuery");
    match state.coordinator.snapshot().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorBody::from(&e))).into_response(),
    }
}

/// 팀 로스터 조회
pub async fn handle_get_rosters(State(state): State<AppState>) -> impl IntoResponse {
    info!("{:<12} --> 팀 로스터 조회", "HandlerQuery");
    match query::handlers::get_rosters(state.catalog.as_ref(), &state.reserved_category).await {
        Ok(rosters) => Json(rosters).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// 미낙찰 아이템 조회
pub async fn handle_get_items(State(state): State<AppState>) -> impl IntoResponse {
    info!("{:<12} --> 미낙찰 아이템 조회", "HandlerQuery");
    match query::handlers::get_unassigned_items(state.catalog.as_ref()).await {
        Ok(items) => Json(items).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// 아이템 입찰 이력 조회 (최신순)
pub async fn handle_get_item_bids(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> impl IntoResponse {
    info!("{:<12} --> 입찰 이력 조회: {}", "HandlerQuery", item_id);
    match query::handlers::get_item_bids(state.catalog.as_ref(), item_id).await {
        Ok(bids) => Json(bids).into_response(),
        Err(e @ CatalogError::ItemNotFound(_)) => {
            let e = AuctionError::from(e);
            (StatusCode::NOT_FOUND, Json(ErrorBody::from(&e))).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

// endregion: --- Query Handlers
