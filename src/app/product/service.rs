//! 产品业务服务

use std::sync::Arc;

use tracing::error;

use super::{model::Product, repository::ProductRepository};
use crate::core::error::CoreError;
use crate::infrastructure::config::FailureMode;

#[derive(Clone)]
pub struct ProductService {
    repository: Arc<dyn ProductRepository>,
    failure_mode: FailureMode,
}

impl ProductService {
    pub fn new(repository: Arc<dyn ProductRepository>, failure_mode: FailureMode) -> Self {
        Self {
            repository,
            failure_mode,
        }
    }

    /// 存储故障按 `FailureMode` 呈现：空列表或 503
    pub async fn list_products(&self) -> Result<Vec<Product>, CoreError> {
        match self.repository.list_products().await {
            Ok(products) => Ok(products),
            Err(err) => {
                error!(error = %err, mode = ?self.failure_mode, "Error fetching products");
                match self.failure_mode {
                    FailureMode::Empty => Ok(Vec::new()),
                    FailureMode::Unavailable => Err(CoreError::ServiceUnavailable(
                        "product store is unavailable".to_string(),
                    )),
                }
            }
        }
    }
}
