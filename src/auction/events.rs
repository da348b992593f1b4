use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum AuctionEvent {
    // 상품 등록 이벤트
    ListingCreated {
        listing_id: i64,
        created_by: i64,
        starting_bid: Decimal,
        timestamp: DateTime<Utc>,
    },
    // 입찰 이벤트
    BidPlaced {
        listing_id: i64,
        bidder_id: i64,
        bid_amount: Decimal,
        timestamp: DateTime<Utc>,
    },
    // 즉시 구매 이벤트
    BuyNowExecuted {
        listing_id: i64,
        buyer_id: i64,
        price: Decimal,
        timestamp: DateTime<Utc>,
    },
    // 경매 종료 이벤트
    AuctionClosed {
        listing_id: i64,
        winner_id: Option<i64>,
        final_price: Option<Decimal>,
        timestamp: DateTime<Utc>,
    },
}

impl AuctionEvent {
    pub fn listing_id(&self) -> i64 {
        match self {
            AuctionEvent::ListingCreated { listing_id, .. }
            | AuctionEvent::BidPlaced { listing_id, .. }
            | AuctionEvent::BuyNowExecuted { listing_id, .. }
            | AuctionEvent::AuctionClosed { listing_id, .. } => *listing_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            AuctionEvent::ListingCreated { .. } => "ListingCreated",
            AuctionEvent::BidPlaced { .. } => "BidPlaced",
            AuctionEvent::BuyNowExecuted { .. } => "BuyNowExecuted",
            AuctionEvent::AuctionClosed { .. } => "AuctionClosed",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            AuctionEvent::ListingCreated { timestamp, .. }
            | AuctionEvent::BidPlaced { timestamp, .. }
            | AuctionEvent::BuyNowExecuted { timestamp, .. }
            | AuctionEvent::AuctionClosed { timestamp, .. } => *timestamp,
        }
    }
}
