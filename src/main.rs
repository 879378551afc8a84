// region:    --- Imports
use auction_coordinator::auction::AuctionCoordinator;
use auction_coordinator::auth::JwtVerifier;
use auction_coordinator::catalog::{CatalogGateway, PostgresCatalog, TimedCatalog};
use auction_coordinator::config::Config;
use auction_coordinator::database::DatabaseManager;
use auction_coordinator::event_store::AUCTION_EVENTS_TOPIC;
use auction_coordinator::handlers::{self, AppState};
use auction_coordinator::message_broker::KafkaProducer;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    // DatabaseManager 생성 (연결 실패 시 서버를 띄우지 않는다)
    let db_manager = match DatabaseManager::connect(
        &config.database_url,
        config.coordinator.store_timeout,
    )
    .await
    {
        Ok(db_manager) => Arc::new(db_manager),
        Err(e) => {
            error!("{:<12} --> 데이터베이스 연결 실패: {:?}", "Main", e);
            return Err(e.into());
        }
    };

    // 데이터베이스 초기화
    let initialized = if config.reset_database {
        db_manager.recreate_database().await
    } else {
        db_manager.initialize_database().await
    };
    if let Err(e) = initialized {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // Kafka 프로듀서 (설정된 경우만)
    let kafka_producer = match &config.kafka_brokers {
        Some(brokers) => {
            let producer = KafkaProducer::new(brokers)?;
            if let Err(e) = producer.create_topic(AUCTION_EVENTS_TOPIC, 1, 1).await {
                warn!("{:<12} --> 토픽 생성 건너뜀: {}", "Main", e);
            }
            info!("{:<12} --> Kafka 초기화 성공", "Main");
            Some(Arc::new(producer))
        }
        None => None,
    };

    // 카탈로그 (저장소 호출 시간 제한 적용)
    let postgres: Arc<dyn CatalogGateway> =
        Arc::new(PostgresCatalog::new(Arc::clone(&db_manager), kafka_producer));
    let catalog: Arc<dyn CatalogGateway> = Arc::new(TimedCatalog::new(
        postgres,
        config.coordinator.store_timeout,
    ));

    // 경매 코디네이터 시작
    let coordinator = AuctionCoordinator::spawn(Arc::clone(&catalog), config.coordinator.clone());

    // 라우터 설정
    let routes_all = handlers::router(AppState {
        coordinator,
        catalog,
        verifier: JwtVerifier::from(&config.jwt_secret),
        reserved_category: config.coordinator.reserved_category.clone(),
    });

    // 리스너 생성
    let listener = TcpListener::bind(config.bind_address).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
