/// 경매 저장소
/// 1. 저장소 트레이트 (Postgres / 메모리 구현체)
/// 2. 입찰 / 낙찰은 저장소 안에서 compare-and-set 으로 처리한다
// region:    --- Imports
use crate::bidding::model::{Bid, Category, Comment, Listing, NewBid, NewListing, User};
use async_trait::async_trait;
use rust_decimal::Decimal;

mod memory;
mod postgres;

pub use memory::MemoryAuctionStore;
pub use postgres::PostgresAuctionStore;
// endregion: --- Imports

// region:    --- Store Error
/// 저장소 에러
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::Conflict(db.message().to_string());
            }
        }
        StoreError::Database(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
// endregion: --- Store Error

// region:    --- Filters
/// 상품 목록 조회 조건
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingFilter {
    pub active_only: bool,
    pub category_id: Option<i64>,
}

impl ListingFilter {
    pub fn active() -> Self {
        Self {
            active_only: true,
            category_id: None,
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn active_in_category(category_id: i64) -> Self {
        Self {
            active_only: true,
            category_id: Some(category_id),
        }
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        (!self.active_only || listing.is_active)
            && self
                .category_id
                .map_or(true, |id| listing.category_id == Some(id))
    }
}

/// 경매 종료 시 현재 가격 조건
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceGuard {
    /// 가격과 무관하게 종료
    Any,
    /// 낙찰자를 계산한 시점의 가격과 같을 때만 종료
    Exactly(Option<Decimal>),
}

impl PriceGuard {
    pub fn allows(&self, current_price: Option<Decimal>) -> bool {
        match self {
            PriceGuard::Any => true,
            PriceGuard::Exactly(expected) => *expected == current_price,
        }
    }
}
// endregion: --- Filters

// region:    --- Auction Store Trait
/// 경매 저장소 트레이트
#[async_trait]
pub trait AuctionStore: Send + Sync {
    // 사용자
    async fn insert_user(&self, username: &str, email: &str, password_hash: &str)
        -> StoreResult<User>;
    async fn get_user(&self, user_id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    // 세션
    async fn insert_session(&self, token: &str, user_id: i64) -> StoreResult<()>;
    async fn find_session_user(&self, token: &str) -> StoreResult<Option<User>>;
    async fn delete_session(&self, token: &str) -> StoreResult<()>;

    // 카테고리
    async fn insert_category(&self, name: &str) -> StoreResult<Category>;
    async fn get_category(&self, category_id: i64) -> StoreResult<Option<Category>>;
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    /// 삭제된 경우 true, 참조하던 상품의 카테고리는 비워진다
    async fn delete_category(&self, category_id: i64) -> StoreResult<bool>;

    // 상품
    async fn insert_listing(&self, listing: NewListing) -> StoreResult<Listing>;
    async fn get_listing(&self, listing_id: i64) -> StoreResult<Option<Listing>>;
    /// 등록 순서(id 오름차순)로 반환
    async fn list_listings(&self, filter: ListingFilter) -> StoreResult<Vec<Listing>>;
    /// 진행 중이고 현재 최저가가 입찰가보다 낮을 때만 입찰 저장 + 현재 가격 갱신
    async fn place_bid_if_above_floor(&self, bid: NewBid) -> StoreResult<Option<Bid>>;
    /// 최신 입찰이 먼저 오도록 반환
    async fn bids_for_listing(&self, listing_id: i64) -> StoreResult<Vec<Bid>>;
    /// 진행 중이고 가격 조건을 만족할 때만 경매 종료
    async fn finish_listing(
        &self,
        listing_id: i64,
        winner_id: Option<i64>,
        guard: PriceGuard,
    ) -> StoreResult<Option<Listing>>;

    // 댓글
    async fn insert_comment(&self, listing_id: i64, user_id: i64, comment: &str)
        -> StoreResult<Comment>;
    /// 오래된 댓글이 먼저 오도록 반환
    async fn comments_for_listing(&self, listing_id: i64) -> StoreResult<Vec<Comment>>;

    // 관심 목록
    async fn watchlist_contains(&self, user_id: i64, listing_id: i64) -> StoreResult<bool>;
    /// 새로 추가된 경우 true
    async fn watchlist_add(&self, user_id: i64, listing_id: i64) -> StoreResult<bool>;
    /// 실제로 삭제된 경우 true
    async fn watchlist_remove(&self, user_id: i64, listing_id: i64) -> StoreResult<bool>;
    async fn watchlist_listings(&self, user_id: i64) -> StoreResult<Vec<Listing>>;
}
// endregion: --- Auction Store Trait
