use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use product_service::{
    app::product::{AppState, Product, ProductRepository, ProductService, StoreError},
    create_app,
    infrastructure::config::FailureMode,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

struct InMemoryRepository {
    rows: Vec<Product>,
    calls: AtomicUsize,
}

#[async_trait]
impl ProductRepository for InMemoryRepository {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.clone())
    }
}

struct UnreachableRepository;

#[async_trait]
impl ProductRepository for UnreachableRepository {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Err(StoreError::Connection(sqlx::Error::PoolTimedOut))
    }
}

// 模拟存储在查询截止时间到达后才放弃
struct SlowRepository {
    query_timeout: Duration,
}

#[async_trait]
impl ProductRepository for SlowRepository {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        tokio::time::sleep(self.query_timeout).await;
        Err(StoreError::Timeout(self.query_timeout))
    }
}

fn app_with(repository: Arc<dyn ProductRepository>, mode: FailureMode) -> Router {
    let state = AppState {
        product_service: ProductService::new(repository, mode),
    };
    create_app(state, Duration::from_secs(5))
}

fn catalog() -> Vec<Product> {
    vec![
        Product::new(1, "Widget", Decimal::from_str("9.99").unwrap()),
        Product::new(2, "Gadget", Decimal::from_str("19.50").unwrap()),
    ]
}

async fn get_raw(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get_raw(app, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn lists_products_as_json_array() {
    let repository = Arc::new(InMemoryRepository {
        rows: catalog(),
        calls: AtomicUsize::new(0),
    });
    let app = app_with(repository.clone(), FailureMode::Empty);

    let (status, raw) = get_raw(app, "/products").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        raw,
        r#"[{"id":1,"name":"Widget","price":9.99},{"id":2,"name":"Gadget","price":19.50}]"#
    );
    let body: Value = serde_json::from_str(&raw).unwrap();
    for item in body.as_array().unwrap() {
        assert!(item["id"].is_i64());
        assert!(item["name"].is_string());
        assert!(item["price"].is_number());
    }
    assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn trailing_slash_routes_to_same_handler() {
    let repository = Arc::new(InMemoryRepository {
        rows: catalog(),
        calls: AtomicUsize::new(0),
    });
    let app = app_with(repository.clone(), FailureMode::Empty);

    let (plain_status, plain) = get_raw(app.clone(), "/products").await;
    let (slash_status, slash) = get_raw(app, "/products/").await;

    assert_eq!(plain_status, StatusCode::OK);
    assert_eq!(slash_status, StatusCode::OK);
    assert_eq!(plain, slash);
    // 每个请求都重新查询
    assert_eq!(repository.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_table_returns_empty_array() {
    let repository = Arc::new(InMemoryRepository {
        rows: Vec::new(),
        calls: AtomicUsize::new(0),
    });

    let (status, body) = get(app_with(repository, FailureMode::Empty), "/products").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn unreachable_store_returns_empty_array_by_default() {
    let app = app_with(Arc::new(UnreachableRepository), FailureMode::Empty);

    let (status, body) = get(app, "/products/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test(start_paused = true)]
async fn slow_store_within_request_deadline_still_returns_200() {
    let repository = Arc::new(SlowRepository {
        query_timeout: Duration::from_secs(10),
    });
    let state = AppState {
        product_service: ProductService::new(repository, FailureMode::Empty),
    };
    let app = create_app(state, Duration::from_secs(30));

    let (status, body) = get(app, "/products").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn unreachable_store_returns_503_in_unavailable_mode() {
    let app = app_with(Arc::new(UnreachableRepository), FailureMode::Unavailable);

    let (status, body) = get(app, "/products").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "SERVICE_UNAVAILABLE");
    assert_eq!(body["code"], 503);
}

#[tokio::test]
async fn cross_origin_request_is_allowed() {
    let app = app_with(Arc::new(UnreachableRepository), FailureMode::Empty);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/products")
                .header(header::ORIGIN, "https://shop.example.org")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn preflight_request_is_answered() {
    let app = app_with(Arc::new(UnreachableRepository), FailureMode::Empty);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/products")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let app = app_with(Arc::new(UnreachableRepository), FailureMode::Empty);

    let response = app
        .oneshot(Request::builder().uri("/orders").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
