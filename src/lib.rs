//! # 产品服务
//!
//! 只读的产品列表 HTTP 服务，分层结构：
//! - app: 产品处理器、业务服务、数据访问
//! - core: 错误处理与中间件
//! - infrastructure: 配置、数据库连接池、日志

pub mod app;
pub mod core;
pub mod infrastructure;

use std::{sync::Arc, time::Duration};

use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};

use crate::app::product::{handler, AppState, PgProductRepository, ProductService};
use crate::core::middleware::request_logging_middleware;
use crate::infrastructure::{config::AppConfig, database::DatabaseManager};

/// 组装路由与中间件
pub fn create_app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/products", get(handler::list_products))
        .route("/products/", get(handler::list_products))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(TimeoutLayer::new(request_timeout))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// 由配置构建应用状态
pub fn build_state(config: &AppConfig, database: &DatabaseManager) -> AppState {
    let repository =
        PgProductRepository::new(database.get_pool().clone(), config.pool.query_timeout);

    AppState {
        product_service: ProductService::new(Arc::new(repository), config.server.failure_mode),
    }
}
