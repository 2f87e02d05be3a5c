//! 数据库基础设施

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use super::config::{DatabaseConfig, PoolConfig};

#[derive(Clone)]
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// 创建连接池。连接按需建立，数据库暂不可达时服务仍可启动。
    pub fn new(database: &DatabaseConfig, options: &PoolConfig) -> Self {
        info!(
            database = %database,
            max_connections = options.max_connections,
            "Configuring database pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .min_connections(0)
            .acquire_timeout(options.acquire_timeout)
            .connect_lazy_with(database.connect_options());

        Self { pool }
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
