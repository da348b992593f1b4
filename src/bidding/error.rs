use crate::store::StoreError;
use rust_decimal::Decimal;

/// 경매 규칙에 의해 거절된 요청
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Your bid must be higher than the current highest bid ({floor}).")]
    TooLow { floor: Decimal },

    #[error("Comment cannot be blank.")]
    BlankText,

    #[error("This listing is not available for immediate purchase.")]
    NotAvailable,

    #[error("Only the creator of the listing can close the auction.")]
    Forbidden,

    #[error("The auction is already closed.")]
    AlreadyClosed,
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::TooLow { .. } => "TOO_LOW",
            Rejection::BlankText => "BLANK_TEXT",
            Rejection::NotAvailable => "NOT_AVAILABLE",
            Rejection::Forbidden => "FORBIDDEN",
            Rejection::AlreadyClosed => "ALREADY_CLOSED",
        }
    }
}

/// 경매 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum AuctionError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("{0} not found")]
    NotFound(String),

    #[error("too many concurrent updates, please retry")]
    RetriesExhausted,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AuctionError {
    pub fn code(&self) -> &'static str {
        match self {
            AuctionError::Validation(_) => "VALIDATION",
            AuctionError::Rejected(rejection) => rejection.code(),
            AuctionError::NotFound(_) => "NOT_FOUND",
            AuctionError::RetriesExhausted => "MAX_RETRIES_EXCEEDED",
            AuctionError::Store(_) => "STORE",
        }
    }

    pub fn listing_not_found(listing_id: i64) -> Self {
        AuctionError::NotFound(format!("listing {}", listing_id))
    }
}

pub type AuctionResult<T> = Result<T, AuctionError>;
