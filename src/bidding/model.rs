use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// 사용자 모델
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

// 카테고리 모델
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

// 경매 상품 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Listing {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub starting_bid: Decimal,
    pub current_price: Option<Decimal>,
    pub buy_it_now_price: Option<Decimal>,
    pub image_url: String,
    pub category_id: Option<i64>,
    pub created_by: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub winner_id: Option<i64>,
}

impl Listing {
    /// 새 입찰이 넘어야 하는 최저 금액 (현재 가격, 없으면 시작가)
    pub fn floor(&self) -> Decimal {
        self.current_price.unwrap_or(self.starting_bid)
    }
}

/// 상품 등록 시 저장소에 넘기는 값
#[derive(Debug, Clone)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub starting_bid: Decimal,
    pub buy_it_now_price: Option<Decimal>,
    pub image_url: String,
    pub category_id: Option<i64>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

// 입찰 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub listing_id: i64,
    pub user_id: i64,
    pub bid_amount: Decimal,
    pub bid_time: DateTime<Utc>,
}

/// 입찰 시각은 저장소가 입찰을 반영하는 시점에 기록한다
#[derive(Debug, Clone)]
pub struct NewBid {
    pub listing_id: i64,
    pub user_id: i64,
    pub bid_amount: Decimal,
}

// 댓글 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub listing_id: i64,
    pub user_id: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}
