//! 产品数据访问层

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

use super::model::Product;

const LIST_PRODUCTS_SQL: &str = "SELECT id, name, price FROM products";

/// 数据存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("malformed row: {0}")]
    MalformedRow(#[source] sqlx::Error),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_) => StoreError::Connection(err),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::Decode(_) => StoreError::MalformedRow(err),
            _ => StoreError::Query(err),
        }
    }
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// 读取全部产品，顺序即数据库返回顺序
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
}

/// 基于 PostgreSQL 连接池的实现
#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgProductRepository {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    async fn fetch_all(&self) -> Result<Vec<Product>, StoreError> {
        // 连接在 guard 释放时归还连接池
        let mut conn = self.pool.acquire().await.map_err(StoreError::Connection)?;
        let products = sqlx::query_as::<_, Product>(LIST_PRODUCTS_SQL)
            .fetch_all(&mut *conn)
            .await?;
        Ok(products)
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let products = tokio::time::timeout(self.query_timeout, self.fetch_all())
            .await
            .map_err(|_| StoreError::Timeout(self.query_timeout))??;

        debug!(count = products.len(), "Fetched products");
        Ok(products)
    }
}
