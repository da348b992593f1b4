// region:    --- Imports
use crate::app::AppState;
use crate::auth::{bearer_token, AuthError, Identity, RegisterCommand};
use crate::bidding::commands::{
    self, CreateListingCommand, PlaceBidCommand, PostCommentCommand,
};
use crate::bidding::error::{AuctionError, Rejection};
use crate::bidding::model::User;
use crate::bidding::money::{parse_amount, parse_optional_amount};
use crate::query::handlers::{self as query, SearchOutcome};
use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Error
/// HTTP 에러 응답
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auction(#[from] AuctionError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("You must be logged in.")]
    Unauthenticated,

    #[error("Invalid request body: {message}")]
    InvalidBody { status: StatusCode, message: String },
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Auction(err) => {
                let status = match err {
                    AuctionError::Validation(_) => StatusCode::BAD_REQUEST,
                    AuctionError::Rejected(Rejection::TooLow { .. } | Rejection::BlankText) => {
                        StatusCode::BAD_REQUEST
                    }
                    AuctionError::Rejected(
                        Rejection::NotAvailable | Rejection::AlreadyClosed,
                    ) => StatusCode::CONFLICT,
                    AuctionError::Rejected(Rejection::Forbidden) => StatusCode::FORBIDDEN,
                    AuctionError::NotFound(_) => StatusCode::NOT_FOUND,
                    AuctionError::RetriesExhausted => StatusCode::CONFLICT,
                    AuctionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.code())
            }
            ApiError::Auth(err) => match err {
                AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION"),
                AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
                AuthError::Hashing(_) | AuthError::Store(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "STORE")
                }
            },
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            ApiError::InvalidBody { status, .. } => (*status, "INVALID_BODY"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{:<12} --> 내부 오류: {:?}", "Handler", self);
            "Internal server error.".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;
// endregion: --- Error

// region:    --- Extractors
/// 로그인한 사용자 (없으면 401)
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Identity::User(user) = state.identity.current_user(&parts.headers).await? else {
            return Err(ApiError::Unauthenticated);
        };
        let token = bearer_token(&parts.headers)
            .ok_or(ApiError::Unauthenticated)?
            .to_string();
        Ok(CurrentUser { user, token })
    }
}

/// 요청자 (익명 허용)
pub struct Viewer(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Viewer(state.identity.current_user(&parts.headers).await?))
    }
}

/// JSON 요청 본문 (파싱 실패도 ApiError 형식으로 응답)
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}
// endregion: --- Extractors

// region:    --- Forms
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirmation: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct NewListingForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub starting_bid: String,
    pub buy_it_now_price: Option<String>,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BidForm {
    pub bid_amount: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

fn to_listing(listing_id: i64) -> Response {
    Redirect::to(&format!("/listings/{}", listing_id)).into_response()
}
// endregion: --- Forms

// region:    --- Identity Handlers

/// 회원가입
pub async fn handle_register(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<RegisterForm>,
) -> ApiResult<Response> {
    info!("{:<12} --> 회원가입: {}", "Handler", form.username);
    let session = state
        .identity
        .register(RegisterCommand {
            username: form.username,
            email: form.email,
            password: form.password,
            confirmation: form.confirmation,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "token": session.token, "user": session.user })),
    )
        .into_response())
}

/// 로그인
pub async fn handle_login(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<LoginForm>,
) -> ApiResult<Response> {
    info!("{:<12} --> 로그인: {}", "Handler", form.username);
    let session = state.identity.login(&form.username, &form.password).await?;
    Ok(Json(json!({ "token": session.token, "user": session.user })).into_response())
}

/// 로그아웃
pub async fn handle_logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<StatusCode> {
    info!("{:<12} --> 로그아웃: {}", "Handler", current.user.id);
    state.identity.logout(&current.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

// endregion: --- Identity Handlers

// region:    --- Command Handlers

/// 상품 등록
pub async fn handle_create_listing(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(form): JsonBody<NewListingForm>,
) -> ApiResult<Response> {
    info!("{:<12} --> 상품 등록 요청: {:?}", "Handler", form);
    let cmd = CreateListingCommand {
        starting_bid: parse_amount("starting_bid", &form.starting_bid)?,
        buy_it_now_price: parse_optional_amount(
            "buy_it_now_price",
            form.buy_it_now_price.as_deref(),
        )?,
        title: form.title,
        description: form.description,
        image_url: form.image_url,
        category_id: form.category_id,
    };
    let listing = commands::handle_create_listing(
        cmd,
        &current.user,
        state.store.as_ref(),
        state.event_store.as_ref(),
    )
    .await?;
    Ok(to_listing(listing.id))
}

/// 입찰
pub async fn handle_bid(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
    current: CurrentUser,
    JsonBody(form): JsonBody<BidForm>,
) -> ApiResult<Response> {
    info!(
        "{:<12} --> 입찰 요청 listing: {}, 금액: {}",
        "Handler", listing_id, form.bid_amount
    );
    let cmd = PlaceBidCommand {
        listing_id,
        bid_amount: parse_amount("bid_amount", &form.bid_amount)?,
    };
    commands::handle_place_bid(
        cmd,
        &current.user,
        state.store.as_ref(),
        state.event_store.as_ref(),
    )
    .await?;
    Ok(to_listing(listing_id))
}

/// 관심 목록 토글
pub async fn handle_toggle_watchlist(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
    current: CurrentUser,
) -> ApiResult<Response> {
    let toggled =
        commands::handle_toggle_watchlist(listing_id, &current.user, state.store.as_ref()).await?;
    info!(
        "{:<12} --> 관심 목록 {:?} listing: {}",
        "Handler", toggled, listing_id
    );
    Ok(to_listing(listing_id))
}

/// 댓글 작성
pub async fn handle_comment(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
    current: CurrentUser,
    JsonBody(form): JsonBody<CommentForm>,
) -> ApiResult<Response> {
    let cmd = PostCommentCommand {
        listing_id,
        comment: form.comment,
    };
    commands::handle_post_comment(cmd, &current.user, state.store.as_ref()).await?;
    Ok(to_listing(listing_id))
}

/// 즉시 구매
pub async fn handle_buy_now(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
    current: CurrentUser,
) -> ApiResult<Response> {
    info!("{:<12} --> 즉시 구매 요청 listing: {}", "Handler", listing_id);
    commands::handle_buy_now(
        listing_id,
        &current.user,
        state.store.as_ref(),
        state.event_store.as_ref(),
    )
    .await?;
    Ok(to_listing(listing_id))
}

/// 경매 종료
pub async fn handle_close_auction(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
    current: CurrentUser,
) -> ApiResult<Response> {
    info!("{:<12} --> 경매 종료 요청 listing: {}", "Handler", listing_id);
    commands::handle_close_auction(
        listing_id,
        &current.user,
        state.store.as_ref(),
        state.event_store.as_ref(),
    )
    .await?;
    Ok(to_listing(listing_id))
}

/// 카테고리 등록
pub async fn handle_create_category(
    State(state): State<AppState>,
    _current: CurrentUser,
    JsonBody(form): JsonBody<CategoryForm>,
) -> ApiResult<Response> {
    let category = commands::handle_create_category(&form.name, state.store.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(category)).into_response())
}

/// 카테고리 삭제
pub async fn handle_delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
    _current: CurrentUser,
) -> ApiResult<StatusCode> {
    commands::handle_delete_category(category_id, state.store.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

pub async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// 진행 중인 경매 목록
pub async fn handle_index(State(state): State<AppState>) -> ApiResult<Response> {
    let listings = query::get_active_listings(state.store.as_ref()).await?;
    Ok(state
        .renderer
        .render("active_listings", json!({ "listings": listings }))
        .into_response())
}

/// 검색 (정확히 일치하면 상세 페이지로 이동)
pub async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Response> {
    let term = params.q.unwrap_or_default();
    let term = term.trim();
    match query::search_or_lookup(state.store.as_ref(), term).await? {
        SearchOutcome::ExactMatch(listing) => Ok(to_listing(listing.id)),
        SearchOutcome::FilteredList(listings) => Ok(state
            .renderer
            .render(
                "search_results",
                json!({ "term": term, "listings": listings }),
            )
            .into_response()),
    }
}

/// 상품 상세
pub async fn handle_listing_detail(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
    Viewer(viewer): Viewer,
) -> ApiResult<Response> {
    let detail = query::get_listing_detail(state.store.as_ref(), listing_id, &viewer).await?;
    Ok(state
        .renderer
        .render(
            "listing_detail",
            json!({
                "listing": detail.listing,
                "bids": detail.bids,
                "comments": detail.comments,
                "on_watchlist": detail.on_watchlist,
            }),
        )
        .into_response())
}

/// 내 관심 목록
pub async fn handle_watchlist(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Response> {
    let listings = query::get_user_watchlist(state.store.as_ref(), &current.user).await?;
    Ok(state
        .renderer
        .render("watchlist", json!({ "listings": listings }))
        .into_response())
}

/// 카테고리 목록
pub async fn handle_categories(State(state): State<AppState>) -> ApiResult<Response> {
    let categories = query::get_categories(state.store.as_ref()).await?;
    Ok(state
        .renderer
        .render("view_categories", json!({ "categories": categories }))
        .into_response())
}

/// 카테고리별 상품
pub async fn handle_category_items(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> ApiResult<Response> {
    let (category, listings) = query::get_category_items(state.store.as_ref(), category_id).await?;
    Ok(state
        .renderer
        .render(
            "category_items",
            json!({ "category": category, "listings": listings }),
        )
        .into_response())
}

// endregion: --- Query Handlers
