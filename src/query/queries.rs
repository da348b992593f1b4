// region:    --- Users
/// 사용자 등록
pub const INSERT_USER: &str =
    "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING *";

/// 사용자 조회
pub const GET_USER: &str = "SELECT * FROM users WHERE id = $1";

/// 사용자 이름으로 조회
pub const GET_USER_BY_USERNAME: &str = "SELECT * FROM users WHERE username = $1";

/// 세션 등록
pub const INSERT_SESSION: &str = "INSERT INTO sessions (token, user_id) VALUES ($1, $2)";

/// 세션 사용자 조회
pub const GET_SESSION_USER: &str = r#"
    SELECT u.*
    FROM users u
    JOIN sessions s ON s.user_id = u.id
    WHERE s.token = $1
"#;

/// 세션 삭제
pub const DELETE_SESSION: &str = "DELETE FROM sessions WHERE token = $1";
// endregion: --- Users

// region:    --- Categories
/// 카테고리 등록
pub const INSERT_CATEGORY: &str = "INSERT INTO categories (name) VALUES ($1) RETURNING *";

/// 카테고리 조회
pub const GET_CATEGORY: &str = "SELECT * FROM categories WHERE id = $1";

/// 모든 카테고리 조회
pub const GET_ALL_CATEGORIES: &str = "SELECT * FROM categories ORDER BY name";

/// 카테고리 삭제 (상품의 category_id 는 ON DELETE SET NULL)
pub const DELETE_CATEGORY: &str = "DELETE FROM categories WHERE id = $1";
// endregion: --- Categories

// region:    --- Listings
/// 상품 등록
pub const INSERT_LISTING: &str = r#"
    INSERT INTO listings (title, description, starting_bid, buy_it_now_price, image_url, category_id, created_by, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    RETURNING *
"#;

/// 상품 조회
pub const GET_LISTING: &str = "SELECT * FROM listings WHERE id = $1";

/// 조건별 상품 조회
pub const GET_LISTINGS: &str = r#"
    SELECT *
    FROM listings
    WHERE (NOT $1::BOOLEAN OR is_active)
      AND ($2::BIGINT IS NULL OR category_id = $2)
    ORDER BY id
"#;

/// 현재 가격 갱신 (진행 중이고 최저가보다 높을 때만)
pub const RAISE_CURRENT_PRICE: &str = r#"
    UPDATE listings
    SET current_price = $1
    WHERE id = $2
      AND is_active
      AND COALESCE(current_price, starting_bid) < $1
    RETURNING id
"#;

/// 경매 종료 (진행 중이고 가격 조건이 맞을 때만)
pub const FINISH_LISTING: &str = r#"
    UPDATE listings
    SET is_active = FALSE, winner_id = $2
    WHERE id = $1
      AND is_active
      AND ($3::BOOLEAN OR current_price IS NOT DISTINCT FROM $4::NUMERIC)
    RETURNING *
"#;
// endregion: --- Listings

// region:    --- Bids
/// 입찰 기록 추가
pub const INSERT_BID: &str = r#"
    INSERT INTO bids (listing_id, user_id, bid_amount, bid_time)
    VALUES ($1, $2, $3, clock_timestamp())
    RETURNING *
"#;

/// 상품 입찰 이력 조회 (반영 순서의 역순)
pub const GET_LISTING_BIDS: &str = r#"
    SELECT id, listing_id, user_id, bid_amount, bid_time
    FROM bids
    WHERE listing_id = $1
    ORDER BY id DESC
"#;
// endregion: --- Bids

// region:    --- Comments
/// 댓글 추가
pub const INSERT_COMMENT: &str =
    "INSERT INTO comments (listing_id, user_id, comment) VALUES ($1, $2, $3) RETURNING *";

/// 상품 댓글 조회
pub const GET_LISTING_COMMENTS: &str =
    "SELECT * FROM comments WHERE listing_id = $1 ORDER BY created_at, id";
// endregion: --- Comments

// region:    --- Watchlist
/// 관심 목록 포함 여부
pub const WATCHLIST_CONTAINS: &str =
    "SELECT EXISTS (SELECT 1 FROM watchlist WHERE user_id = $1 AND listing_id = $2)";

/// 관심 목록 추가
pub const WATCHLIST_ADD: &str =
    "INSERT INTO watchlist (user_id, listing_id) VALUES ($1, $2) ON CONFLICT DO NOTHING";

/// 관심 목록 삭제
pub const WATCHLIST_REMOVE: &str = "DELETE FROM watchlist WHERE user_id = $1 AND listing_id = $2";

/// 사용자 관심 목록 조회
pub const GET_WATCHLIST_LISTINGS: &str = r#"
    SELECT l.*
    FROM listings l
    JOIN watchlist w ON w.listing_id = l.id
    WHERE w.user_id = $1
    ORDER BY l.id
"#;
// endregion: --- Watchlist

// region:    --- Events
/// 이벤트 저장
pub const INSERT_EVENT: &str = r#"
    INSERT INTO events (aggregate_id, event_type, data, timestamp)
    VALUES ($1, $2, $3, $4)
    RETURNING id
"#;
// endregion: --- Events
