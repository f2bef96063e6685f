//! Market data provider seam
//!
//! Providers return a loosely-typed record per ticker. No field is
//! guaranteed to be present; callers decide how to treat gaps.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod yahoo;
pub use yahoo::YahooFinanceProvider;

/// Loosely-typed financial attributes for one ticker, keyed by the
/// provider's field names (`currentPrice`, `marketCap`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickerInfo {
    fields: Map<String, Value>,
}

impl TickerInfo {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Numeric field, `None` when absent or not a number.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Value> for TickerInfo {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }
}

/// Remote source of per-ticker financial data
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// One network lookup per call. Transport and parse failures are errors.
    async fn ticker_info(&self, ticker: &str) -> Result<TickerInfo>;
}
