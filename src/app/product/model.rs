//! 产品数据模型

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow, Row};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(serialize_with = "rust_decimal::serde::arbitrary_precision::serialize")]
    pub price: Decimal,
}

impl Product {
    pub fn new(id: i64, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            price,
        }
    }
}

// id 兼容 int4/int8，price 兼容 numeric/float8/float4
impl<'r> FromRow<'r, PgRow> for Product {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let id = row
            .try_get::<i64, _>("id")
            .or_else(|_| row.try_get::<i32, _>("id").map(i64::from))?;
        let name: String = row.try_get("name")?;
        let price = match row.try_get::<Decimal, _>("price") {
            Ok(price) => price,
            Err(_) => {
                let float = row
                    .try_get::<f64, _>("price")
                    .or_else(|_| row.try_get::<f32, _>("price").map(f64::from))?;
                Decimal::try_from(float).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "price".to_string(),
                    source: Box::new(e),
                })?
            }
        };

        Ok(Self { id, name, price })
    }
}
