/// Postgres 커넥션 풀 / 트랜잭션 / 스키마 관리
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{info, warn};

const RECREATE_SQL: &str = include_str!("../../sql/00-recreate-db.sql");
const SCHEMA_SQL: &str = include_str!("../../sql/01-create-schema.sql");

/// 트랜잭션 안에서 실행되는 작업
pub type TxFuture<'c, R, E> = Pin<Box<dyn Future<Output = Result<R, E>> + Send + 'c>>;

pub struct DatabaseManager {
    pool: Arc<PgPool>,
}

impl DatabaseManager {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(
            "{:<12} --> 커넥션 풀 생성 (max_connections: {})",
            "Database", max_connections
        );
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// 공유용 풀 핸들
    pub fn get_pool(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 트랜잭션 실행
    /// 작업이 Ok 를 반환하면 커밋, Err 를 반환하면 롤백 후 작업의 에러를 그대로 반환한다
    pub async fn transaction<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: for<'c> FnOnce(&'c mut Transaction<'_, Postgres>) -> TxFuture<'c, R, E>,
        E: From<sqlx::Error>,
    {
        let mut tx = self.pool.begin().await?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("{:<12} --> 롤백 실패: {}", "Database", rollback_err);
                }
                Err(e)
            }
        }
    }

    /// 스키마 생성
    /// reset 이면 기존 테이블을 모두 지우고 다시 만든다
    pub async fn initialize_database(&self, reset: bool) -> Result<(), sqlx::Error> {
        if reset {
            warn!("{:<12} --> 기존 테이블 삭제", "Database");
            self.execute_script(RECREATE_SQL).await?;
        }
        self.execute_script(SCHEMA_SQL).await?;
        info!("{:<12} --> 스키마 준비 완료", "Database");
        Ok(())
    }

    async fn execute_script(&self, sql: &str) -> Result<(), sqlx::Error> {
        for statement in split_statements(sql) {
            sqlx::query(&statement).execute(self.pool()).await?;
        }
        Ok(())
    }
}

/// `;` 단위로 나누고 주석 줄과 빈 문장은 제외
fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_statements_skips_comments() {
        let sql = "-- users\nCREATE TABLE a (id BIGINT);\n\n-- only a comment\n;\nCREATE INDEX i ON a (id);\n";
        assert_eq!(
            split_statements(sql),
            vec!["CREATE TABLE a (id BIGINT)", "CREATE INDEX i ON a (id)"]
        );
    }

    #[test]
    fn test_schema_files_split_cleanly() {
        let statements = split_statements(SCHEMA_SQL);
        assert!(statements
            .iter()
            .all(|s| s.starts_with("CREATE") || s.starts_with("ALTER")));
        assert!(statements.iter().any(|s| s.contains("listings")));
    }
}
