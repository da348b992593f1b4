/// Postgres 저장소
// region:    --- Imports
use super::{AuctionStore, ListingFilter, PriceGuard, StoreError, StoreResult};
use crate::bidding::model::{Bid, Category, Comment, Listing, NewBid, NewListing, User};
use crate::database::DatabaseManager;
use crate::query::queries;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
// endregion: --- Imports

/// Postgres 저장소 구현체
pub struct PostgresAuctionStore {
    db_manager: Arc<DatabaseManager>,
}

impl PostgresAuctionStore {
    pub fn new(db_manager: Arc<DatabaseManager>) -> Self {
        Self { db_manager }
    }
}

#[async_trait]
impl AuctionStore for PostgresAuctionStore {
    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<User> {
        Ok(sqlx::query_as::<_, User>(queries::INSERT_USER)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .fetch_one(self.db_manager.pool())
            .await?)
    }

    async fn get_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(queries::GET_USER)
            .bind(user_id)
            .fetch_optional(self.db_manager.pool())
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(queries::GET_USER_BY_USERNAME)
            .bind(username)
            .fetch_optional(self.db_manager.pool())
            .await?)
    }

    async fn insert_session(&self, token: &str, user_id: i64) -> StoreResult<()> {
        sqlx::query(queries::INSERT_SESSION)
            .bind(token)
            .bind(user_id)
            .execute(self.db_manager.pool())
            .await?;
        Ok(())
    }

    async fn find_session_user(&self, token: &str) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(queries::GET_SESSION_USER)
            .bind(token)
            .fetch_optional(self.db_manager.pool())
            .await?)
    }

    async fn delete_session(&self, token: &str) -> StoreResult<()> {
        sqlx::query(queries::DELETE_SESSION)
            .bind(token)
            .execute(self.db_manager.pool())
            .await?;
        Ok(())
    }

    async fn insert_category(&self, name: &str) -> StoreResult<Category> {
        Ok(sqlx::query_as::<_, Category>(queries::INSERT_CATEGORY)
            .bind(name)
            .fetch_one(self.db_manager.pool())
            .await?)
    }

    async fn get_category(&self, category_id: i64) -> StoreResult<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>(queries::GET_CATEGORY)
            .bind(category_id)
            .fetch_optional(self.db_manager.pool())
            .await?)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(sqlx::query_as::<_, Category>(queries::GET_ALL_CATEGORIES)
            .fetch_all(self.db_manager.pool())
            .await?)
    }

    async fn delete_category(&self, category_id: i64) -> StoreResult<bool> {
        let result = sqlx::query(queries::DELETE_CATEGORY)
            .bind(category_id)
            .execute(self.db_manager.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_listing(&self, listing: NewListing) -> StoreResult<Listing> {
        Ok(sqlx::query_as::<_, Listing>(queries::INSERT_LISTING)
            .bind(&listing.title)
            .bind(&listing.description)
            .bind(listing.starting_bid)
            .bind(listing.buy_it_now_price)
            .bind(&listing.image_url)
            .bind(listing.category_id)
            .bind(listing.created_by)
            .bind(listing.created_at)
            .fetch_one(self.db_manager.pool())
            .await?)
    }

    async fn get_listing(&self, listing_id: i64) -> StoreResult<Option<Listing>> {
        Ok(sqlx::query_as::<_, Listing>(queries::GET_LISTING)
            .bind(listing_id)
            .fetch_optional(self.db_manager.pool())
            .await?)
    }

    async fn list_listings(&self, filter: ListingFilter) -> StoreResult<Vec<Listing>> {
        Ok(sqlx::query_as::<_, Listing>(queries::GET_LISTINGS)
            .bind(filter.active_only)
            .bind(filter.category_id)
            .fetch_all(self.db_manager.pool())
            .await?)
    }

    async fn place_bid_if_above_floor(&self, bid: NewBid) -> StoreResult<Option<Bid>> {
        debug!(
            "{:<12} --> 입찰 CAS listing: {}, 입찰가: {}",
            "Store", bid.listing_id, bid.bid_amount
        );
        self.db_manager
            .transaction(|tx| {
                Box::pin(async move {
                    // 현재 가격 확인 및 업데이트 (행 잠금)
                    let raised = sqlx::query_scalar::<_, i64>(queries::RAISE_CURRENT_PRICE)
                        .bind(bid.bid_amount)
                        .bind(bid.listing_id)
                        .fetch_optional(&mut **tx)
                        .await?;

                    if raised.is_none() {
                        return Ok::<_, StoreError>(None);
                    }

                    // 입찰 기록 추가
                    let bid = sqlx::query_as::<_, Bid>(queries::INSERT_BID)
                        .bind(bid.listing_id)
                        .bind(bid.user_id)
                        .bind(bid.bid_amount)
                        .fetch_one(&mut **tx)
                        .await?;
                    Ok(Some(bid))
                })
            })
            .await
    }

    async fn bids_for_listing(&self, listing_id: i64) -> StoreResult<Vec<Bid>> {
        Ok(sqlx::query_as::<_, Bid>(queries::GET_LISTING_BIDS)
            .bind(listing_id)
            .fetch_all(self.db_manager.pool())
            .await?)
    }

    async fn finish_listing(
        &self,
        listing_id: i64,
        winner_id: Option<i64>,
        guard: PriceGuard,
    ) -> StoreResult<Option<Listing>> {
        let (any_price, expected_price) = match guard {
            PriceGuard::Any => (true, None),
            PriceGuard::Exactly(price) => (false, price),
        };
        let listing = sqlx::query_as::<_, Listing>(queries::FINISH_LISTING)
            .bind(listing_id)
            .bind(winner_id)
            .bind(any_price)
            .bind(expected_price)
            .fetch_optional(self.db_manager.pool())
            .await?;
        if listing.is_some() {
            info!("{:<12} --> 경매 종료 listing: {}", "Store", listing_id);
        }
        Ok(listing)
    }

    async fn insert_comment(
        &self,
        listing_id: i64,
        user_id: i64,
        comment: &str,
    ) -> StoreResult<Comment> {
        Ok(sqlx::query_as::<_, Comment>(queries::INSERT_COMMENT)
            .bind(listing_id)
            .bind(user_id)
            .bind(comment)
            .fetch_one(self.db_manager.pool())
            .await?)
    }

    async fn comments_for_listing(&self, listing_id: i64) -> StoreResult<Vec<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(queries::GET_LISTING_COMMENTS)
            .bind(listing_id)
            .fetch_all(self.db_manager.pool())
            .await?)
    }

    async fn watchlist_contains(&self, user_id: i64, listing_id: i64) -> StoreResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(queries::WATCHLIST_CONTAINS)
            .bind(user_id)
            .bind(listing_id)
            .fetch_one(self.db_manager.pool())
            .await?)
    }

    async fn watchlist_add(&self, user_id: i64, listing_id: i64) -> StoreResult<bool> {
        let result = sqlx::query(queries::WATCHLIST_ADD)
            .bind(user_id)
            .bind(listing_id)
            .execute(self.db_manager.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn watchlist_remove(&self, user_id: i64, listing_id: i64) -> StoreResult<bool> {
        let result = sqlx::query(queries::WATCHLIST_REMOVE)
            .bind(user_id)
            .bind(listing_id)
            .execute(self.db_manager.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn watchlist_listings(&self, user_id: i64) -> StoreResult<Vec<Listing>> {
        Ok(sqlx::query_as::<_, Listing>(queries::GET_WATCHLIST_LISTINGS)
            .bind(user_id)
            .fetch_all(self.db_manager.pool())
            .await?)
    }
}
