// region:    --- Imports
use crate::auth::Identity;
use crate::bidding::error::{AuctionError, AuctionResult};
use crate::bidding::model::{Bid, Category, Comment, Listing, User};
use crate::store::{AuctionStore, ListingFilter};
use serde::Serialize;
use tracing::info;

// endregion: --- Imports

// region:    --- Views
/// 검색 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum SearchOutcome {
    ExactMatch(Listing),
    FilteredList(Vec<Listing>),
}

/// 상품 상세
#[derive(Debug, Clone, Serialize)]
pub struct ListingDetail {
    pub listing: Listing,
    pub bids: Vec<Bid>,
    pub comments: Vec<Comment>,
    pub on_watchlist: bool,
}
// endregion: --- Views

// region:    --- Query Handlers

/// 진행 중인 상품 조회
pub async fn get_active_listings(store: &dyn AuctionStore) -> AuctionResult<Vec<Listing>> {
    info!("{:<12} --> 진행 중인 상품 조회", "Query");
    Ok(store.list_listings(ListingFilter::active()).await?)
}

/// 제목 검색
/// 제목이 정확히 같으면 해당 상품, 아니면 제목에 검색어가 포함된 상품 목록
pub async fn search_or_lookup(store: &dyn AuctionStore, term: &str) -> AuctionResult<SearchOutcome> {
    info!("{:<12} --> 상품 검색: {:?}", "Query", term);
    let listings = store.list_listings(ListingFilter::all()).await?;
    Ok(match_listings(listings, term))
}

/// 검색어 매칭 (대소문자 구분)
pub fn match_listings(listings: Vec<Listing>, term: &str) -> SearchOutcome {
    if let Some(exact) = listings.iter().find(|listing| listing.title == term) {
        return SearchOutcome::ExactMatch(exact.clone());
    }
    SearchOutcome::FilteredList(
        listings
            .into_iter()
            .filter(|listing| listing.title.contains(term))
            .collect(),
    )
}

/// 상품 상세 조회
pub async fn get_listing_detail(
    store: &dyn AuctionStore,
    listing_id: i64,
    viewer: &Identity,
) -> AuctionResult<ListingDetail> {
    info!("{:<12} --> 상품 상세 조회 id: {}", "Query", listing_id);
    let listing = store
        .get_listing(listing_id)
        .await?
        .ok_or_else(|| AuctionError::listing_not_found(listing_id))?;

    let on_watchlist = match viewer {
        Identity::User(user) => store.watchlist_contains(user.id, listing.id).await?,
        Identity::Anonymous => false,
    };

    Ok(ListingDetail {
        bids: store.bids_for_listing(listing.id).await?,
        comments: store.comments_for_listing(listing.id).await?,
        listing,
        on_watchlist,
    })
}

/// 사용자 관심 목록 조회
pub async fn get_user_watchlist(
    store: &dyn AuctionStore,
    user: &User,
) -> AuctionResult<Vec<Listing>> {
    info!("{:<12} --> 관심 목록 조회 user: {}", "Query", user.id);
    Ok(store.watchlist_listings(user.id).await?)
}

/// 모든 카테고리 조회
pub async fn get_categories(store: &dyn AuctionStore) -> AuctionResult<Vec<Category>> {
    info!("{:<12} --> 카테고리 조회", "Query");
    Ok(store.list_categories().await?)
}

/// 카테고리별 진행 중인 상품 조회
pub async fn get_category_items(
    store: &dyn AuctionStore,
    category_id: i64,
) -> AuctionResult<(Category, Vec<Listing>)> {
    info!("{:<12} --> 카테고리 상품 조회 id: {}", "Query", category_id);
    let category = store
        .get_category(category_id)
        .await?
        .ok_or_else(|| AuctionError::NotFound(format!("category {}", category_id)))?;
    let listings = store
        .list_listings(ListingFilter::active_in_category(category.id))
        .await?;
    Ok((category, listings))
}

// endregion: --- Query Handlers
