pub mod handler;
pub mod model;
pub mod repository;
pub mod service;

pub use handler::AppState;
pub use model::Product;
pub use repository::{PgProductRepository, ProductRepository, StoreError};
pub use service::ProductService;
