// region:    --- Imports
use commerce_auctions::app::{create_app, AppState};
use commerce_auctions::auth::SessionIdentity;
use commerce_auctions::config::{AppConfig, ConfigError, StoreBackend};
use commerce_auctions::database::DatabaseManager;
use commerce_auctions::event_store::{
    BrokerSink, EventStore, MemoryEventStore, PostgresEventStore,
};
use commerce_auctions::message_broker::KafkaManager;
use commerce_auctions::render::JsonRenderer;
use commerce_auctions::store::{AuctionStore, MemoryAuctionStore, PostgresAuctionStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;
    info!("{:<12} --> 설정 로드: {:?}", "Main", config.store_backend);

    // Kafka 설정이 있으면 이벤트 발행
    let broker = match &config.kafka_brokers {
        Some(brokers) => {
            let kafka_manager = KafkaManager::new(brokers)?;
            kafka_manager.create_topic(&config.kafka_topic, 5, 1).await?;
            info!("{:<12} --> Kafka 초기화 성공", "Main");
            BrokerSink::new(kafka_manager.get_producer(), &config.kafka_topic)
        }
        None => {
            info!("{:<12} --> Kafka 미설정, 이벤트 발행 생략", "Main");
            BrokerSink::disabled()
        }
    };

    let (store, event_store): (Arc<dyn AuctionStore>, Arc<dyn EventStore>) =
        match config.store_backend {
            StoreBackend::Memory => (
                Arc::new(MemoryAuctionStore::new()),
                Arc::new(MemoryEventStore::new(broker)),
            ),
            StoreBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?;
                let db_manager = Arc::new(
                    DatabaseManager::connect(database_url, config.database_max_connections)
                        .await?,
                );

                // 데이터베이스 초기화
                if let Err(e) = db_manager.initialize_database(config.reset_database).await {
                    error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
                    return Err(e.into());
                }
                info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

                (
                    Arc::new(PostgresAuctionStore::new(Arc::clone(&db_manager))),
                    Arc::new(PostgresEventStore::new(db_manager.get_pool(), broker)),
                )
            }
        };

    let identity = Arc::new(SessionIdentity::new(Arc::clone(&store)));
    let state = AppState::new(store, event_store, identity, Arc::new(JsonRenderer));
    let app = create_app(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, app.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
