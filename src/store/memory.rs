/// 메모리 저장소
/// 테스트와 `STORE_BACKEND=memory` 실행에 사용한다.
/// 하나의 뮤텍스 안에서 확인과 갱신을 함께 처리하므로 compare-and-set 이 원자적이다.
// region:    --- Imports
use super::{AuctionStore, ListingFilter, PriceGuard, StoreError, StoreResult};
use crate::bidding::model::{Bid, Category, Comment, Listing, NewBid, NewListing, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::Mutex;
use tracing::debug;
// endregion: --- Imports

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    users: BTreeMap<i64, User>,
    sessions: HashMap<String, i64>,
    categories: BTreeMap<i64, Category>,
    listings: BTreeMap<i64, Listing>,
    bids: Vec<Bid>,
    comments: Vec<Comment>,
    watchlist: BTreeSet<(i64, i64)>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// 메모리 저장소 구현체
#[derive(Default)]
pub struct MemoryAuctionStore {
    state: Mutex<MemoryState>,
}

impl MemoryAuctionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuctionStore for MemoryAuctionStore {
    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<User> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.username == username) {
            return Err(StoreError::Conflict(format!(
                "username {} already exists",
                username
            )));
        }
        let user = User {
            id: state.next_id(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_session(&self, token: &str, user_id: i64) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.sessions.insert(token.to_string(), user_id);
        Ok(())
    }

    async fn find_session_user(&self, token: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .get(token)
            .and_then(|user_id| state.users.get(user_id))
            .cloned())
    }

    async fn delete_session(&self, token: &str) -> StoreResult<()> {
        self.state.lock().await.sessions.remove(token);
        Ok(())
    }

    async fn insert_category(&self, name: &str) -> StoreResult<Category> {
        let mut state = self.state.lock().await;
        if state.categories.values().any(|c| c.name == name) {
            return Err(StoreError::Conflict(format!(
                "category {} already exists",
                name
            )));
        }
        let category = Category {
            id: state.next_id(),
            name: name.to_string(),
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, category_id: i64) -> StoreResult<Option<Category>> {
        Ok(self.state.lock().await.categories.get(&category_id).cloned())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let state = self.state.lock().await;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn delete_category(&self, category_id: i64) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        if state.categories.remove(&category_id).is_none() {
            return Ok(false);
        }
        for listing in state.listings.values_mut() {
            if listing.category_id == Some(category_id) {
                listing.category_id = None;
            }
        }
        Ok(true)
    }

    async fn insert_listing(&self, listing: NewListing) -> StoreResult<Listing> {
        let mut state = self.state.lock().await;
        let listing = Listing {
            id: state.next_id(),
            title: listing.title,
            description: listing.description,
            starting_bid: listing.starting_bid,
            current_price: None,
            buy_it_now_price: listing.buy_it_now_price,
            image_url: listing.image_url,
            category_id: listing.category_id,
            created_by: listing.created_by,
            is_active: true,
            created_at: listing.created_at,
            winner_id: None,
        };
        state.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn get_listing(&self, listing_id: i64) -> StoreResult<Option<Listing>> {
        Ok(self.state.lock().await.listings.get(&listing_id).cloned())
    }

    async fn list_listings(&self, filter: ListingFilter) -> StoreResult<Vec<Listing>> {
        let state = self.state.lock().await;
        Ok(state
            .listings
            .values()
            .filter(|listing| filter.matches(listing))
            .cloned()
            .collect())
    }

    async fn place_bid_if_above_floor(&self, bid: NewBid) -> StoreResult<Option<Bid>> {
        let mut state = self.state.lock().await;
        let id = state.next_id();

        let Some(listing) = state.listings.get_mut(&bid.listing_id) else {
            return Ok(None);
        };
        if !listing.is_active || bid.bid_amount <= listing.floor() {
            debug!(
                "{:<12} --> 입찰 CAS 실패 listing: {}, 입찰가: {}",
                "Store", bid.listing_id, bid.bid_amount
            );
            return Ok(None);
        }
        listing.current_price = Some(bid.bid_amount);

        let bid = Bid {
            id,
            listing_id: bid.listing_id,
            user_id: bid.user_id,
            bid_amount: bid.bid_amount,
            bid_time: Utc::now(),
        };
        state.bids.push(bid.clone());
        Ok(Some(bid))
    }

    async fn bids_for_listing(&self, listing_id: i64) -> StoreResult<Vec<Bid>> {
        let state = self.state.lock().await;
        let mut bids: Vec<Bid> = state
            .bids
            .iter()
            .filter(|b| b.listing_id == listing_id)
            .cloned()
            .collect();
        // id 는 뮤텍스 안에서 발급되므로 반영 순서와 같다
        bids.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(bids)
    }

    async fn finish_listing(
        &self,
        listing_id: i64,
        winner_id: Option<i64>,
        guard: PriceGuard,
    ) -> StoreResult<Option<Listing>> {
        let mut state = self.state.lock().await;
        let Some(listing) = state.listings.get_mut(&listing_id) else {
            return Ok(None);
        };
        if !listing.is_active || !guard.allows(listing.current_price) {
            return Ok(None);
        }
        listing.is_active = false;
        listing.winner_id = winner_id;
        Ok(Some(listing.clone()))
    }

    async fn insert_comment(
        &self,
        listing_id: i64,
        user_id: i64,
        comment: &str,
    ) -> StoreResult<Comment> {
        let mut state = self.state.lock().await;
        let comment = Comment {
            id: state.next_id(),
            listing_id,
            user_id,
            comment: comment.to_string(),
            created_at: Utc::now(),
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn comments_for_listing(&self, listing_id: i64) -> StoreResult<Vec<Comment>> {
        let state = self.state.lock().await;
        Ok(state
            .comments
            .iter()
            .filter(|c| c.listing_id == listing_id)
            .cloned()
            .collect())
    }

    async fn watchlist_contains(&self, user_id: i64, listing_id: i64) -> StoreResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .watchlist
            .contains(&(user_id, listing_id)))
    }

    async fn watchlist_add(&self, user_id: i64, listing_id: i64) -> StoreResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .watchlist
            .insert((user_id, listing_id)))
    }

    async fn watchlist_remove(&self, user_id: i64, listing_id: i64) -> StoreResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .watchlist
            .remove(&(user_id, listing_id)))
    }

    async fn watchlist_listings(&self, user_id: i64) -> StoreResult<Vec<Listing>> {
        let state = self.state.lock().await;
        Ok(state
            .watchlist
            .range((user_id, i64::MIN)..=(user_id, i64::MAX))
            .filter_map(|(_, listing_id)| state.listings.get(listing_id))
            .cloned()
            .collect())
    }
}
