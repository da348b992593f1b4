// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::message_broker::KafkaProducer;
use crate::query::queries;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Event Model
/// 이벤트 저장소에 저장되는 이벤트 모델
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Event {
    pub id: i64,
    pub aggregate_id: i64,
    pub event_type: String,
    pub data: serde_json::Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Event {
    /// 도메인 이벤트를 저장용 이벤트로 변환 (id 는 저장 시 부여)
    pub fn from_auction_event(event: &AuctionEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: 0,
            aggregate_id: event.listing_id(),
            event_type: event.event_type().to_string(),
            data: serde_json::to_value(event)?,
            timestamp: event.timestamp(),
        })
    }
}

/// 이벤트 저장소 에러
#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    #[error("event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("event insert failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("event publish failed: {0}")]
    Broker(#[from] rdkafka::error::KafkaError),
}
// endregion: --- Event Model

// region:    --- Event Store Trait
/// 이벤트 저장소 트레이트
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append_and_publish_event(&self, event: AuctionEvent) -> Result<(), EventStoreError>;
}

/// 브로커가 설정된 경우에만 이벤트 발행
#[derive(Clone, Default)]
pub struct BrokerSink {
    producer: Option<Arc<KafkaProducer>>,
    topic: String,
}

impl BrokerSink {
    pub fn new(producer: Arc<KafkaProducer>, topic: &str) -> Self {
        Self {
            producer: Some(producer),
            topic: topic.to_string(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    async fn publish(&self, event: &Event) -> Result<(), EventStoreError> {
        let Some(producer) = &self.producer else {
            return Ok(());
        };
        producer
            .send_message(
                &self.topic,
                &event.aggregate_id.to_string(),
                &serde_json::to_string(event)?,
            )
            .await?;
        Ok(())
    }
}
// endregion: --- Event Store Trait

// region:    --- Postgres Event Store
/// 이벤트 저장소 구현체
pub struct PostgresEventStore {
    pool: Arc<PgPool>,
    broker: BrokerSink,
}

/// 이벤트 저장소 구현체 메서드 구현
#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append_and_publish_event(&self, event: AuctionEvent) -> Result<(), EventStoreError> {
        let mut event = Event::from_auction_event(&event)?;
        event.id = sqlx::query_scalar::<_, i64>(queries::INSERT_EVENT)
            .bind(event.aggregate_id)
            .bind(&event.event_type)
            .bind(&event.data)
            .bind(event.timestamp)
            .fetch_one(&*self.pool)
            .await?;

        info!(
            "{:<12} --> {} 이벤트 저장 (id: {})",
            "EventStore", event.event_type, event.id
        );

        // 이벤트를 카프카에 발행
        self.broker.publish(&event).await
    }
}

/// 이벤트 저장소 생성
impl PostgresEventStore {
    pub fn new(pool: Arc<PgPool>, broker: BrokerSink) -> Self {
        Self { pool, broker }
    }
}
// endregion: --- Postgres Event Store

// region:    --- Memory Event Store
/// 메모리 이벤트 저장소 (테스트 / 메모리 실행용)
#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<Vec<Event>>,
    broker: BrokerSink,
}

impl MemoryEventStore {
    pub fn new(broker: BrokerSink) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            broker,
        }
    }

    /// 저장된 이벤트 목록
    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append_and_publish_event(&self, event: AuctionEvent) -> Result<(), EventStoreError> {
        let event = {
            let mut events = self.events.lock().await;
            let mut event = Event::from_auction_event(&event)?;
            event.id = events.len() as i64 + 1;
            events.push(event.clone());
            event
        };
        self.broker.publish(&event).await
    }
}
// endregion: --- Memory Event Store

/// 이벤트 기록 (실패해도 이미 반영된 상태 변경은 유지)
pub async fn record_event(event_store: &dyn EventStore, event: AuctionEvent) {
    let event_type = event.event_type();
    if let Err(e) = event_store.append_and_publish_event(event).await {
        warn!(
            "{:<12} --> {} 이벤트 기록 실패: {}",
            "EventStore", event_type, e
        );
    }
}
