/// 사용자 인증
/// 1. 회원가입 / 로그인 / 로그아웃
/// 2. 요청 헤더의 세션 토큰으로 현재 사용자 확인
// region:    --- Imports
use crate::bidding::model::User;
use crate::store::{AuctionStore, StoreError};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
// endregion: --- Imports

// region:    --- Types
/// 요청을 보낸 주체
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    User(User),
    Anonymous,
}

/// 회원가입 명령
#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirmation: String,
}

/// 로그인 세션
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// 인증 에러
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid username and/or password.")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
// endregion: --- Types

// region:    --- Identity Provider Trait
/// 인증 제공자 트레이트
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 사용자 이름 / 비밀번호 확인
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>, AuthError>;
    /// 요청 헤더로 현재 사용자 확인
    async fn current_user(&self, headers: &HeaderMap) -> Result<Identity, AuthError>;
    async fn register(&self, cmd: RegisterCommand) -> Result<Session, AuthError>;
    async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError>;
    async fn logout(&self, token: &str) -> Result<(), AuthError>;
}

/// `Authorization: Bearer <token>` 헤더에서 토큰 추출
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

pub fn verify_password(hash: &str, password: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
// endregion: --- Identity Provider Trait

// region:    --- Session Identity
/// 저장소 기반 세션 인증 구현체
pub struct SessionIdentity {
    store: Arc<dyn AuctionStore>,
}

impl SessionIdentity {
    pub fn new(store: Arc<dyn AuctionStore>) -> Self {
        Self { store }
    }

    async fn open_session(&self, user: User) -> Result<Session, AuthError> {
        let token = Uuid::new_v4().to_string();
        self.store.insert_session(&token, user.id).await?;
        info!("{:<12} --> 세션 생성 user: {}", "Auth", user.id);
        Ok(Session { user, token })
    }
}

#[async_trait]
impl IdentityProvider for SessionIdentity {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>, AuthError> {
        let Some(user) = self.store.find_user_by_username(username).await? else {
            return Ok(None);
        };
        if verify_password(&user.password_hash, password)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    async fn current_user(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let Some(token) = bearer_token(headers) else {
            return Ok(Identity::Anonymous);
        };
        Ok(match self.store.find_session_user(token).await? {
            Some(user) => Identity::User(user),
            None => Identity::Anonymous,
        })
    }

    async fn register(&self, cmd: RegisterCommand) -> Result<Session, AuthError> {
        info!("{:<12} --> 회원가입 요청: {}", "Auth", cmd.username);
        let username = cmd.username.trim();
        if username.is_empty() {
            return Err(AuthError::Validation("Username cannot be empty.".to_string()));
        }
        if cmd.password != cmd.confirmation {
            return Err(AuthError::Validation("Passwords must match.".to_string()));
        }

        let hash = hash_password(&cmd.password)?;
        let user = match self.store.insert_user(username, cmd.email.trim(), &hash).await {
            Ok(user) => user,
            Err(StoreError::Conflict(_)) => {
                return Err(AuthError::Validation("Username already taken.".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        self.open_session(user).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        match self.authenticate(username, password).await? {
            Some(user) => self.open_session(user).await,
            None => {
                warn!("{:<12} --> 로그인 실패: {}", "Auth", username);
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.store.delete_session(token).await?;
        Ok(())
    }
}
// endregion: --- Session Identity
