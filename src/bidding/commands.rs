/// 경매 관련 커맨드 처리
/// 1. 상품 등록
/// 2. 입찰
/// 3. 관심 목록 토글
/// 4. 댓글 작성
/// 5. 즉시 구매
/// 6. 경매 종료
/// 7. 카테고리 등록 / 삭제
// region:    --- Imports
use super::error::{AuctionError, AuctionResult, Rejection};
use super::money::ensure_within_limit;
use super::model::{Bid, Category, Comment, Listing, NewBid, NewListing, User};
use crate::auction::events::AuctionEvent;
use crate::event_store::{record_event, EventStore};
use crate::store::{AuctionStore, PriceGuard, StoreError};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Commands
/// 상품 등록 명령
#[derive(Debug, Clone)]
pub struct CreateListingCommand {
    pub title: String,
    pub description: String,
    pub starting_bid: Decimal,
    pub buy_it_now_price: Option<Decimal>,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
}

/// 입찰 명령
#[derive(Debug, Clone)]
pub struct PlaceBidCommand {
    pub listing_id: i64,
    pub bid_amount: Decimal,
}

/// 댓글 작성 명령
#[derive(Debug, Clone)]
pub struct PostCommentCommand {
    pub listing_id: i64,
    pub comment: String,
}

/// 관심 목록 토글 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchlistToggle {
    Added,
    Removed,
}

// 경매 종료 최대 재시도 횟수
const MAX_RETRIES: i32 = 10;

/// 상품 조회 (없으면 NotFound)
async fn load_listing(store: &dyn AuctionStore, listing_id: i64) -> AuctionResult<Listing> {
    store
        .get_listing(listing_id)
        .await?
        .ok_or_else(|| AuctionError::listing_not_found(listing_id))
}

/// 1. 상품 등록
pub async fn handle_create_listing(
    cmd: CreateListingCommand,
    creator: &User,
    store: &dyn AuctionStore,
    event_store: &dyn EventStore,
) -> AuctionResult<Listing> {
    info!("{:<12} --> 상품 등록 요청 처리 시작: {:?}", "Command", cmd);

    let title = cmd.title.trim();
    if title.is_empty() {
        return Err(AuctionError::Validation("Title cannot be empty.".to_string()));
    }
    if cmd.starting_bid <= Decimal::ZERO {
        return Err(AuctionError::Validation(
            "Starting bid must be positive.".to_string(),
        ));
    }
    if matches!(cmd.buy_it_now_price, Some(price) if price <= Decimal::ZERO) {
        return Err(AuctionError::Validation(
            "Buy it now price must be positive.".to_string(),
        ));
    }
    ensure_within_limit("starting_bid", cmd.starting_bid)?;
    if let Some(price) = cmd.buy_it_now_price {
        ensure_within_limit("buy_it_now_price", price)?;
    }
    if let Some(category_id) = cmd.category_id {
        if store.get_category(category_id).await?.is_none() {
            return Err(AuctionError::NotFound(format!("category {}", category_id)));
        }
    }

    let now = Utc::now();
    let listing = store
        .insert_listing(NewListing {
            title: title.to_string(),
            description: cmd.description,
            starting_bid: cmd.starting_bid,
            buy_it_now_price: cmd.buy_it_now_price,
            image_url: cmd.image_url.unwrap_or_default(),
            category_id: cmd.category_id,
            created_by: creator.id,
            created_at: now,
        })
        .await?;

    record_event(
        event_store,
        AuctionEvent::ListingCreated {
            listing_id: listing.id,
            created_by: creator.id,
            starting_bid: listing.starting_bid,
            timestamp: now,
        },
    )
    .await;

    Ok(listing)
}

/// 2. 입찰
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    bidder: &User,
    store: &dyn AuctionStore,
    event_store: &dyn EventStore,
) -> AuctionResult<Bid> {
    info!(
        "{:<12} --> 입찰 요청 처리 시작: {:?}, bidder: {}",
        "Command", cmd, bidder.id
    );
    let listing = load_listing(store, cmd.listing_id).await?;

    let floor = listing.floor();
    if cmd.bid_amount <= floor {
        return Err(Rejection::TooLow { floor }.into());
    }
    ensure_within_limit("bid_amount", cmd.bid_amount)?;
    if !listing.is_active {
        return Err(Rejection::AlreadyClosed.into());
    }

    let accepted = store
        .place_bid_if_above_floor(NewBid {
            listing_id: listing.id,
            user_id: bidder.id,
            bid_amount: cmd.bid_amount,
        })
        .await?;

    let Some(bid) = accepted else {
        // 확인 이후 다른 요청이 먼저 반영된 경우
        let current = load_listing(store, cmd.listing_id).await?;
        warn!(
            "{:<12} --> 동시 입찰로 인한 거절 listing: {}, 현재 최저가: {}",
            "Command",
            current.id,
            current.floor()
        );
        if cmd.bid_amount <= current.floor() {
            return Err(Rejection::TooLow {
                floor: current.floor(),
            }
            .into());
        }
        return Err(Rejection::AlreadyClosed.into());
    };

    record_event(
        event_store,
        AuctionEvent::BidPlaced {
            listing_id: bid.listing_id,
            bidder_id: bid.user_id,
            bid_amount: bid.bid_amount,
            timestamp: bid.bid_time,
        },
    )
    .await;

    info!(
        "{:<12} --> 입찰 성공: listing {}, 현재 가격 {}",
        "Command", bid.listing_id, bid.bid_amount
    );
    Ok(bid)
}

/// 3. 관심 목록 토글
pub async fn handle_toggle_watchlist(
    listing_id: i64,
    user: &User,
    store: &dyn AuctionStore,
) -> AuctionResult<WatchlistToggle> {
    info!(
        "{:<12} --> 관심 목록 토글 listing: {}, user: {}",
        "Command", listing_id, user.id
    );
    let listing = load_listing(store, listing_id).await?;

    if store.watchlist_remove(user.id, listing.id).await? {
        return Ok(WatchlistToggle::Removed);
    }
    store.watchlist_add(user.id, listing.id).await?;
    Ok(WatchlistToggle::Added)
}

/// 4. 댓글 작성
pub async fn handle_post_comment(
    cmd: PostCommentCommand,
    user: &User,
    store: &dyn AuctionStore,
) -> AuctionResult<Comment> {
    info!(
        "{:<12} --> 댓글 작성 listing: {}, user: {}",
        "Command", cmd.listing_id, user.id
    );
    let text = cmd.comment.trim();
    if text.is_empty() {
        return Err(Rejection::BlankText.into());
    }
    let listing = load_listing(store, cmd.listing_id).await?;

    Ok(store.insert_comment(listing.id, user.id, text).await?)
}

/// 5. 즉시 구매(낙찰)
pub async fn handle_buy_now(
    listing_id: i64,
    buyer: &User,
    store: &dyn AuctionStore,
    event_store: &dyn EventStore,
) -> AuctionResult<Listing> {
    info!(
        "{:<12} --> 즉시 구매 요청 처리 시작 listing: {}, buyer: {}",
        "Command", listing_id, buyer.id
    );
    let listing = load_listing(store, listing_id).await?;

    let Some(price) = listing.buy_it_now_price else {
        return Err(Rejection::NotAvailable.into());
    };
    if !listing.is_active {
        return Err(Rejection::NotAvailable.into());
    }

    let Some(sold) = store
        .finish_listing(listing.id, Some(buyer.id), PriceGuard::Any)
        .await?
    else {
        // 확인 이후 다른 요청이 경매를 종료한 경우
        return Err(Rejection::NotAvailable.into());
    };

    record_event(
        event_store,
        AuctionEvent::BuyNowExecuted {
            listing_id: sold.id,
            buyer_id: buyer.id,
            price,
            timestamp: Utc::now(),
        },
    )
    .await;

    info!(
        "{:<12} --> 즉시 구매 성공 listing: {}, 가격: {}",
        "Command", sold.id, price
    );
    Ok(sold)
}

/// 최고 입찰 선택 (동일 금액이면 먼저 들어온 입찰, 그다음 id 가 작은 입찰)
pub fn select_winning_bid(bids: &[Bid]) -> Option<&Bid> {
    bids.iter().max_by(|a, b| {
        a.bid_amount
            .cmp(&b.bid_amount)
            .then_with(|| b.bid_time.cmp(&a.bid_time))
            .then_with(|| b.id.cmp(&a.id))
    })
}

/// 6. 경매 종료
pub async fn handle_close_auction(
    listing_id: i64,
    requester: &User,
    store: &dyn AuctionStore,
    event_store: &dyn EventStore,
) -> AuctionResult<Listing> {
    info!(
        "{:<12} --> 경매 종료 요청 처리 시작 listing: {}, requester: {}",
        "Command", listing_id, requester.id
    );
    let mut retries = 0;

    while retries < MAX_RETRIES {
        let listing = load_listing(store, listing_id).await?;

        if listing.created_by != requester.id {
            return Err(Rejection::Forbidden.into());
        }
        if !listing.is_active {
            return Err(Rejection::AlreadyClosed.into());
        }

        let bids = store.bids_for_listing(listing.id).await?;
        let winning_bid = select_winning_bid(&bids);
        let winner_id = winning_bid.map(|bid| bid.user_id);
        let final_price = winning_bid.map(|bid| bid.bid_amount);

        // 낙찰자 계산 이후 새 입찰이 들어오면 가격이 달라져 실패한다
        match store
            .finish_listing(
                listing.id,
                winner_id,
                PriceGuard::Exactly(listing.current_price),
            )
            .await?
        {
            Some(closed) => {
                record_event(
                    event_store,
                    AuctionEvent::AuctionClosed {
                        listing_id: closed.id,
                        winner_id,
                        final_price,
                        timestamp: Utc::now(),
                    },
                )
                .await;
                info!(
                    "{:<12} --> 경매 종료 성공 listing: {}, winner: {:?}",
                    "Command", closed.id, winner_id
                );
                return Ok(closed);
            }
            None => {
                warn!(
                    "{:<12} --> 경매 종료 중 상태 변경 감지: 재시도",
                    "Command"
                );
                retries += 1;
            }
        }
    }

    Err(AuctionError::RetriesExhausted)
}

/// 7-1. 카테고리 등록
pub async fn handle_create_category(
    name: &str,
    store: &dyn AuctionStore,
) -> AuctionResult<Category> {
    info!("{:<12} --> 카테고리 등록: {}", "Command", name);
    let name = name.trim();
    if name.is_empty() {
        return Err(AuctionError::Validation(
            "Category name cannot be empty.".to_string(),
        ));
    }
    match store.insert_category(name).await {
        Ok(category) => Ok(category),
        Err(StoreError::Conflict(_)) => Err(AuctionError::Validation(format!(
            "Category {} already exists.",
            name
        ))),
        Err(e) => Err(e.into()),
    }
}

/// 7-2. 카테고리 삭제
pub async fn handle_delete_category(
    category_id: i64,
    store: &dyn AuctionStore,
) -> AuctionResult<()> {
    info!("{:<12} --> 카테고리 삭제 id: {}", "Command", category_id);
    if store.delete_category(category_id).await? {
        Ok(())
    } else {
        Err(AuctionError::NotFound(format!("category {}", category_id)))
    }
}

// endregion: --- Commands

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::{BrokerSink, MemoryEventStore};
    use crate::store::{ListingFilter, MemoryAuctionStore, StoreResult};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    /// 테스트 저장소 설정
    fn setup() -> (MemoryAuctionStore, MemoryEventStore) {
        (
            MemoryAuctionStore::new(),
            MemoryEventStore::new(BrokerSink::disabled()),
        )
    }

    async fn create_user(store: &MemoryAuctionStore, username: &str) -> User {
        store
            .insert_user(username, &format!("{}@example.com", username), "hash")
            .await
            .unwrap()
    }

    /// 테스트용 상품 생성
    async fn create_test_listing(
        store: &MemoryAuctionStore,
        event_store: &MemoryEventStore,
        creator: &User,
        starting_bid: &str,
        buy_it_now_price: Option<&str>,
    ) -> Listing {
        handle_create_listing(
            CreateListingCommand {
                title: "Vintage camera".to_string(),
                description: "Works fine".to_string(),
                starting_bid: dec(starting_bid),
                buy_it_now_price: buy_it_now_price.map(dec),
                image_url: None,
                category_id: None,
            },
            creator,
            store,
            event_store,
        )
        .await
        .unwrap()
    }

    /// 상품 등록 검증 테스트
    #[tokio::test]
    async fn test_create_listing_validation() {
        let (store, events) = setup();
        let seller = create_user(&store, "seller").await;

        let mut cmd = CreateListingCommand {
            title: "   ".to_string(),
            description: String::new(),
            starting_bid: dec("10.00"),
            buy_it_now_price: None,
            image_url: None,
            category_id: None,
        };
        let err = handle_create_listing(cmd.clone(), &seller, &store, &events)
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::Validation(_)));

        cmd.title = "Camera".to_string();
        cmd.starting_bid = dec("0");
        let err = handle_create_listing(cmd.clone(), &seller, &store, &events)
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::Validation(_)));

        // NUMERIC(9, 2) 컬럼에 들어가지 않는 금액
        cmd.starting_bid = dec("10000000.00");
        let err = handle_create_listing(cmd.clone(), &seller, &store, &events)
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::Validation(_)));

        cmd.starting_bid = dec("5.00");
        cmd.buy_it_now_price = Some(dec("10000000.00"));
        let err = handle_create_listing(cmd.clone(), &seller, &store, &events)
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::Validation(_)));

        cmd.buy_it_now_price = None;
        cmd.category_id = Some(404);
        let err = handle_create_listing(cmd.clone(), &seller, &store, &events)
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::NotFound(_)));

        cmd.category_id = None;
        let listing = handle_create_listing(cmd, &seller, &store, &events)
            .await
            .unwrap();
        assert!(listing.is_active);
        assert_eq!(listing.current_price, None);
        assert_eq!(listing.created_by, seller.id);
        assert_eq!(events.events().await.len(), 1);
    }

    /// 입찰 최저가 테스트
    #[tokio::test]
    async fn test_place_bid_against_starting_bid() {
        let (store, events) = setup();
        let seller = create_user(&store, "seller").await;
        let bidder = create_user(&store, "bidder").await;
        let listing = create_test_listing(&store, &events, &seller, "10.00", None).await;

        let err = handle_place_bid(
            PlaceBidCommand {
                listing_id: listing.id,
                bid_amount: dec("9.99"),
            },
            &bidder,
            &store,
            &events,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            AuctionError::Rejected(Rejection::TooLow { floor }) if floor == dec("10.00")
        ));
        assert!(store.bids_for_listing(listing.id).await.unwrap().is_empty());

        let bid = handle_place_bid(
            PlaceBidCommand {
                listing_id: listing.id,
                bid_amount: dec("10.01"),
            },
            &bidder,
            &store,
            &events,
        )
        .await
        .unwrap();
        assert_eq!(bid.bid_amount, dec("10.01"));

        let listing = store.get_listing(listing.id).await.unwrap().unwrap();
        assert_eq!(listing.current_price, Some(dec("10.01")));
    }

    /// 현재 가격 이하 입찰 거절 테스트
    #[tokio::test]
    async fn test_place_bid_equal_to_current_price_is_too_low() {
        let (store, events) = setup();
        let seller = create_user(&store, "seller").await;
        let bidder = create_user(&store, "bidder").await;
        let listing = create_test_listing(&store, &events, &seller, "10.00", None).await;

        handle_place_bid(
            PlaceBidCommand {
                listing_id: listing.id,
                bid_amount: dec("12.00"),
            },
            &bidder,
            &store,
            &events,
        )
        .await
        .unwrap();

        // 현재 가격과 같거나 낮은 입찰은 모두 TooLow
        for amount in ["12.00", "11.50"] {
            let err = handle_place_bid(
                PlaceBidCommand {
                    listing_id: listing.id,
                    bid_amount: dec(amount),
                },
                &bidder,
                &store,
                &events,
            )
            .await
            .unwrap_err();
            assert!(matches!(
                err,
                AuctionError::Rejected(Rejection::TooLow { floor }) if floor == dec("12.00")
            ));
        }

        let listing = store.get_listing(listing.id).await.unwrap().unwrap();
        assert_eq!(listing.current_price, Some(dec("12.00")));
        assert_eq!(store.bids_for_listing(listing.id).await.unwrap().len(), 1);
    }

    /// 종료된 경매 입찰 테스트
    #[tokio::test]
    async fn test_place_bid_on_closed_listing() {
        let (store, events) = setup();
        let seller = create_user(&store, "seller").await;
        let bidder = create_user(&store, "bidder").await;
        let listing = create_test_listing(&store, &events, &seller, "10.00", None).await;
        handle_close_auction(listing.id, &seller, &store, &events)
            .await
            .unwrap();

        let err = handle_place_bid(
            PlaceBidCommand {
                listing_id: listing.id,
                bid_amount: dec("20.00"),
            },
            &bidder,
            &store,
            &events,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            AuctionError::Rejected(Rejection::AlreadyClosed)
        ));
    }

    /// 최대 금액 초과 입찰 테스트
    #[tokio::test]
    async fn test_place_bid_above_limit_is_validation_error() {
        let (store, events) = setup();
        let seller = create_user(&store, "seller").await;
        let bidder = create_user(&store, "bidder").await;
        let listing = create_test_listing(&store, &events, &seller, "10.00", None).await;

        let err = handle_place_bid(
            PlaceBidCommand {
                listing_id: listing.id,
                bid_amount: dec("10000000.00"),
            },
            &bidder,
            &store,
            &events,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuctionError::Validation(_)));

        let listing = store.get_listing(listing.id).await.unwrap().unwrap();
        assert_eq!(listing.current_price, None);
        assert!(store.bids_for_listing(listing.id).await.unwrap().is_empty());
    }

    /// 동시 입찰 테스트
    #[tokio::test]
    async fn test_concurrent_bids_keep_price_monotonic() {
        let store = Arc::new(MemoryAuctionStore::new());
        let events = Arc::new(MemoryEventStore::new(BrokerSink::disabled()));
        let seller = create_user(&store, "seller").await;
        let listing = create_test_listing(&store, &events, &seller, "1.00", None).await;
        let listing_id = listing.id;

        let mut handles = vec![];
        for i in 1..=50 {
            let store = Arc::clone(&store);
            let events = Arc::clone(&events);
            let bidder = create_user(&store, &format!("bidder{}", i)).await;
            handles.push(tokio::spawn(async move {
                handle_place_bid(
                    PlaceBidCommand {
                        listing_id,
                        bid_amount: Decimal::new(100 + i * 100, 2),
                    },
                    &bidder,
                    store.as_ref(),
                    events.as_ref(),
                )
                .await
            }));
        }
        for handle in handles {
            let _ = handle.await.unwrap();
        }

        let final_listing = store.get_listing(listing.id).await.unwrap().unwrap();
        assert_eq!(final_listing.current_price, Some(Decimal::new(5100, 2)));

        // 저장된 입찰은 저장 순서대로 금액이 증가해야 한다
        let mut bids = store.bids_for_listing(listing.id).await.unwrap();
        bids.sort_by_key(|b| b.id);
        assert!(bids.windows(2).all(|w| w[0].bid_amount < w[1].bid_amount));
        assert_eq!(
            bids.last().map(|b| b.bid_amount),
            final_listing.current_price
        );
        assert!(bids.windows(2).all(|w| w[0].bid_time <= w[1].bid_time));

        // 최신 입찰이 현재 가격과 같아야 한다
        let newest = store.bids_for_listing(listing.id).await.unwrap();
        assert_eq!(newest.first().map(|b| b.bid_amount), final_listing.current_price);
    }

    /// 관심 목록 토글 테스트
    #[tokio::test]
    async fn test_toggle_watchlist_twice_restores_state() {
        let (store, events) = setup();
        let seller = create_user(&store, "seller").await;
        let watcher = create_user(&store, "watcher").await;
        let listing = create_test_listing(&store, &events, &seller, "10.00", None).await;

        let first = handle_toggle_watchlist(listing.id, &watcher, &store)
            .await
            .unwrap();
        assert_eq!(first, WatchlistToggle::Added);
        assert!(store.watchlist_contains(watcher.id, listing.id).await.unwrap());

        let second = handle_toggle_watchlist(listing.id, &watcher, &store)
            .await
            .unwrap();
        assert_eq!(second, WatchlistToggle::Removed);
        assert!(!store.watchlist_contains(watcher.id, listing.id).await.unwrap());

        let err = handle_toggle_watchlist(999, &watcher, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::NotFound(_)));
    }

    /// 빈 댓글 테스트
    #[tokio::test]
    async fn test_post_blank_comment_is_rejected() {
        let (store, events) = setup();
        let seller = create_user(&store, "seller").await;
        let listing = create_test_listing(&store, &events, &seller, "10.00", None).await;

        let err = handle_post_comment(
            PostCommentCommand {
                listing_id: listing.id,
                comment: "   ".to_string(),
            },
            &seller,
            &store,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuctionError::Rejected(Rejection::BlankText)));
        assert!(store
            .comments_for_listing(listing.id)
            .await
            .unwrap()
            .is_empty());

        let comment = handle_post_comment(
            PostCommentCommand {
                listing_id: listing.id,
                comment: "  Is it still available?  ".to_string(),
            },
            &seller,
            &store,
        )
        .await
        .unwrap();
        assert_eq!(comment.comment, "Is it still available?");
    }

    /// 즉시 구매 불가 테스트
    #[tokio::test]
    async fn test_buy_now_without_price_is_not_available() {
        let (store, events) = setup();
        let seller = create_user(&store, "seller").await;
        let buyer = create_user(&store, "buyer").await;
        let listing = create_test_listing(&store, &events, &seller, "10.00", None).await;

        let err = handle_buy_now(listing.id, &buyer, &store, &events)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuctionError::Rejected(Rejection::NotAvailable)
        ));
        assert!(store.get_listing(listing.id).await.unwrap().unwrap().is_active);
    }

    /// 즉시 구매 테스트
    #[tokio::test]
    async fn test_buy_now_assigns_winner_once() {
        let (store, events) = setup();
        let seller = create_user(&store, "seller").await;
        let buyer = create_user(&store, "buyer").await;
        let other = create_user(&store, "other").await;
        let listing =
            create_test_listing(&store, &events, &seller, "10.00", Some("50.00")).await;

        let sold = handle_buy_now(listing.id, &buyer, &store, &events)
            .await
            .unwrap();
        assert!(!sold.is_active);
        assert_eq!(sold.winner_id, Some(buyer.id));

        let err = handle_buy_now(listing.id, &other, &store, &events)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuctionError::Rejected(Rejection::NotAvailable)
        ));

        let kinds: Vec<String> = events
            .events()
            .await
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(kinds, vec!["ListingCreated", "BuyNowExecuted"]);
    }

    /// 경매 종료 권한 테스트
    #[tokio::test]
    async fn test_close_auction_by_non_creator_is_forbidden() {
        let (store, events) = setup();
        let seller = create_user(&store, "seller").await;
        let stranger = create_user(&store, "stranger").await;
        let listing = create_test_listing(&store, &events, &seller, "10.00", None).await;

        let err = handle_close_auction(listing.id, &stranger, &store, &events)
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::Rejected(Rejection::Forbidden)));
        assert!(store.get_listing(listing.id).await.unwrap().unwrap().is_active);
    }

    /// 경매 종료 낙찰자 테스트
    #[tokio::test]
    async fn test_close_auction_picks_highest_bid() {
        let (store, events) = setup();
        let seller = create_user(&store, "seller").await;
        let listing = create_test_listing(&store, &events, &seller, "1.00", None).await;

        // 5.00, 12.00 순서로 입찰 (8.00 은 현재 가격보다 낮아 거절)
        let mut bidders = vec![];
        for (name, amount) in [("a", "5.00"), ("b", "12.00"), ("c", "8.00")] {
            let bidder = create_user(&store, name).await;
            let result = handle_place_bid(
                PlaceBidCommand {
                    listing_id: listing.id,
                    bid_amount: dec(amount),
                },
                &bidder,
                &store,
                &events,
            )
            .await;
            if name == "c" {
                assert!(matches!(
                    result,
                    Err(AuctionError::Rejected(Rejection::TooLow { floor })) if floor == dec("12.00")
                ));
            } else {
                assert!(result.is_ok());
            }
            bidders.push(bidder);
        }

        let closed = handle_close_auction(listing.id, &seller, &store, &events)
            .await
            .unwrap();
        assert!(!closed.is_active);
        assert_eq!(closed.winner_id, Some(bidders[1].id));

        let err = handle_close_auction(listing.id, &seller, &store, &events)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuctionError::Rejected(Rejection::AlreadyClosed)
        ));
    }

    // region:    --- Interfering Store
    /// 경매 종료 중 상태를 바꾸는 방식
    enum Interference {
        /// 첫 종료 시도 직전에 더 높은 입찰을 반영
        OutbidOnce { bidder_id: i64, amount: Decimal },
        /// 종료 시도를 항상 거절
        AlwaysRefuse,
    }

    /// finish_listing 호출 사이에 끼어드는 저장소
    struct InterferingStore {
        inner: MemoryAuctionStore,
        interference: Interference,
        finish_calls: AtomicUsize,
    }

    impl InterferingStore {
        fn new(inner: MemoryAuctionStore, interference: Interference) -> Self {
            Self {
                inner,
                interference,
                finish_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AuctionStore for InterferingStore {
        async fn insert_user(
            &self,
            username: &str,
            email: &str,
            password_hash: &str,
        ) -> StoreResult<User> {
            self.inner.insert_user(username, email, password_hash).await
        }
        async fn get_user(&self, user_id: i64) -> StoreResult<Option<User>> {
            self.inner.get_user(user_id).await
        }
        async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
            self.inner.find_user_by_username(username).await
        }
        async fn insert_session(&self, token: &str, user_id: i64) -> StoreResult<()> {
            self.inner.insert_session(token, user_id).await
        }
        async fn find_session_user(&self, token: &str) -> StoreResult<Option<User>> {
            self.inner.find_session_user(token).await
        }
        async fn delete_session(&self, token: &str) -> StoreResult<()> {
            self.inner.delete_session(token).await
        }
        async fn insert_category(&self, name: &str) -> StoreResult<Category> {
            self.inner.insert_category(name).await
        }
        async fn get_category(&self, category_id: i64) -> StoreResult<Option<Category>> {
            self.inner.get_category(category_id).await
        }
        async fn list_categories(&self) -> StoreResult<Vec<Category>> {
            self.inner.list_categories().await
        }
        async fn delete_category(&self, category_id: i64) -> StoreResult<bool> {
            self.inner.delete_category(category_id).await
        }
        async fn insert_listing(&self, listing: NewListing) -> StoreResult<Listing> {
            self.inner.insert_listing(listing).await
        }
        async fn get_listing(&self, listing_id: i64) -> StoreResult<Option<Listing>> {
            self.inner.get_listing(listing_id).await
        }
        async fn list_listings(&self, filter: ListingFilter) -> StoreResult<Vec<Listing>> {
            self.inner.list_listings(filter).await
        }
        async fn place_bid_if_above_floor(&self, bid: NewBid) -> StoreResult<Option<Bid>> {
            self.inner.place_bid_if_above_floor(bid).await
        }
        async fn bids_for_listing(&self, listing_id: i64) -> StoreResult<Vec<Bid>> {
            self.inner.bids_for_listing(listing_id).await
        }
        async fn finish_listing(
            &self,
            listing_id: i64,
            winner_id: Option<i64>,
            guard: PriceGuard,
        ) -> StoreResult<Option<Listing>> {
            let call = self.finish_calls.fetch_add(1, Ordering::SeqCst);
            match &self.interference {
                Interference::AlwaysRefuse => return Ok(None),
                Interference::OutbidOnce { bidder_id, amount } if call == 0 => {
                    self.inner
                        .place_bid_if_above_floor(NewBid {
                            listing_id,
                            user_id: *bidder_id,
                            bid_amount: *amount,
                        })
                        .await?;
                }
                Interference::OutbidOnce { .. } => {}
            }
            self.inner.finish_listing(listing_id, winner_id, guard).await
        }
        async fn insert_comment(
            &self,
            listing_id: i64,
            user_id: i64,
            comment: &str,
        ) -> StoreResult<Comment> {
            self.inner.insert_comment(listing_id, user_id, comment).await
        }
        async fn comments_for_listing(&self, listing_id: i64) -> StoreResult<Vec<Comment>> {
            self.inner.comments_for_listing(listing_id).await
        }
        async fn watchlist_contains(&self, user_id: i64, listing_id: i64) -> StoreResult<bool> {
            self.inner.watchlist_contains(user_id, listing_id).await
        }
        async fn watchlist_add(&self, user_id: i64, listing_id: i64) -> StoreResult<bool> {
            self.inner.watchlist_add(user_id, listing_id).await
        }
        async fn watchlist_remove(&self, user_id: i64, listing_id: i64) -> StoreResult<bool> {
            self.inner.watchlist_remove(user_id, listing_id).await
        }
        async fn watchlist_listings(&self, user_id: i64) -> StoreResult<Vec<Listing>> {
            self.inner.watchlist_listings(user_id).await
        }
    }
    // endregion: --- Interfering Store

    /// 경매 종료 중 새 입찰이 들어오면 다시 낙찰자를 계산
    #[tokio::test]
    async fn test_close_auction_retries_after_late_bid() {
        let events = MemoryEventStore::new(BrokerSink::disabled());
        let seed = MemoryAuctionStore::new();
        let seller = create_user(&seed, "seller").await;
        let early = create_user(&seed, "early").await;
        let late = create_user(&seed, "late").await;

        let store = InterferingStore::new(
            seed,
            Interference::OutbidOnce {
                bidder_id: late.id,
                amount: dec("9.00"),
            },
        );
        let listing = handle_create_listing(
            CreateListingCommand {
                title: "Guitar".to_string(),
                description: String::new(),
                starting_bid: dec("1.00"),
                buy_it_now_price: None,
                image_url: None,
                category_id: None,
            },
            &seller,
            &store,
            &events,
        )
        .await
        .unwrap();
        handle_place_bid(
            PlaceBidCommand {
                listing_id: listing.id,
                bid_amount: dec("5.00"),
            },
            &early,
            &store,
            &events,
        )
        .await
        .unwrap();

        let closed = handle_close_auction(listing.id, &seller, &store, &events)
            .await
            .unwrap();
        assert!(!closed.is_active);
        assert_eq!(closed.winner_id, Some(late.id));
        assert_eq!(closed.current_price, Some(dec("9.00")));
        assert_eq!(store.finish_calls.load(Ordering::SeqCst), 2);

        let recorded = events.events().await;
        let last = recorded.last().unwrap();
        assert_eq!(last.event_type, "AuctionClosed");
        assert_eq!(last.data["AuctionClosed"]["winner_id"], late.id);
    }

    /// 종료 시도가 계속 실패하면 재시도 한도 초과
    #[tokio::test]
    async fn test_close_auction_gives_up_after_max_retries() {
        let events = MemoryEventStore::new(BrokerSink::disabled());
        let store = InterferingStore::new(MemoryAuctionStore::new(), Interference::AlwaysRefuse);
        let seller = create_user(&store.inner, "seller").await;
        let listing = handle_create_listing(
            CreateListingCommand {
                title: "Desk".to_string(),
                description: String::new(),
                starting_bid: dec("1.00"),
                buy_it_now_price: None,
                image_url: None,
                category_id: None,
            },
            &seller,
            &store,
            &events,
        )
        .await
        .unwrap();

        let err = handle_close_auction(listing.id, &seller, &store, &events)
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::RetriesExhausted));
        assert_eq!(err.code(), "MAX_RETRIES_EXCEEDED");
        assert_eq!(
            store.finish_calls.load(Ordering::SeqCst),
            MAX_RETRIES as usize
        );
        assert!(store.get_listing(listing.id).await.unwrap().unwrap().is_active);
    }

    /// 입찰 없는 경매 종료 테스트
    #[tokio::test]
    async fn test_close_auction_without_bids_has_no_winner() {
        let (store, events) = setup();
        let seller = create_user(&store, "seller").await;
        let listing = create_test_listing(&store, &events, &seller, "10.00", None).await;

        let closed = handle_close_auction(listing.id, &seller, &store, &events)
            .await
            .unwrap();
        assert!(!closed.is_active);
        assert_eq!(closed.winner_id, None);
    }

    /// 최고 입찰 선택 테스트
    #[test]
    fn test_select_winning_bid_orders_by_amount_then_recency() {
        let t0 = Utc::now();
        let bid = |id, user_id, amount: &str, offset: i64| Bid {
            id,
            listing_id: 1,
            user_id,
            bid_amount: dec(amount),
            bid_time: t0 + Duration::seconds(offset),
        };

        let bids = vec![bid(1, 10, "5.00", 0), bid(2, 20, "12.00", 1), bid(3, 30, "8.00", 2)];
        assert_eq!(select_winning_bid(&bids).map(|b| b.user_id), Some(20));

        // 동일 금액이면 먼저 들어온 입찰
        let tied = vec![bid(5, 50, "12.00", 5), bid(4, 40, "12.00", 3)];
        assert_eq!(select_winning_bid(&tied).map(|b| b.user_id), Some(40));

        // 시간까지 같으면 id 가 작은 입찰
        let same_time = vec![bid(7, 70, "12.00", 3), bid(6, 60, "12.00", 3)];
        assert_eq!(select_winning_bid(&same_time).map(|b| b.user_id), Some(60));

        assert!(select_winning_bid(&[]).is_none());
    }

    /// 카테고리 등록 / 삭제 테스트
    #[tokio::test]
    async fn test_category_lifecycle() {
        let (store, _) = setup();

        let category = handle_create_category(" Toys ", &store).await.unwrap();
        assert_eq!(category.name, "Toys");

        let err = handle_create_category("Toys", &store).await.unwrap_err();
        assert!(matches!(err, AuctionError::Validation(_)));

        handle_delete_category(category.id, &store).await.unwrap();
        let err = handle_delete_category(category.id, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::NotFound(_)));
    }
}
