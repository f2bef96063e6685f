//! Tool trait, registry and the market data adapters
//!
//! Adapters are stateless pass-throughs: one provider lookup per call,
//! unit normalisation, nothing else. Provider errors are returned as-is.

use crate::error::AgentError;
use crate::llm::ToolDefinition;
use crate::market_data::{MarketDataProvider, TickerInfo};
use crate::models::{StockPrice, ToolInput, ToolResult};
use crate::Result;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Trait for a single tool the reasoning agent may call
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;
    async fn execute(&self, input: &ToolInput) -> Result<ToolResult>;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Definitions advertised to the chat model, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    pub async fn execute(&self, input: &ToolInput) -> Result<ToolResult> {
        let tool = self
            .get(&input.tool_name)
            .ok_or_else(|| AgentError::ToolNotFound(input.tool_name.clone()))?;
        tool.execute(input).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn ticker_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "ticker": {
                "type": "string",
                "description": "Ticker symbol, e.g. AAPL or PETR4.SA"
            }
        },
        "required": ["ticker"]
    })
}

fn require_ticker(input: &ToolInput) -> Result<&str> {
    if !input.parameters.is_object() {
        return Err(AgentError::InvalidToolInput(
            "tool arguments must be a JSON object".to_string(),
        ));
    }

    input
        .parameters
        .get("ticker")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AgentError::InvalidToolInput(format!(
                "Expected string 'ticker' for {}",
                input.tool_name
            ))
        })
}

/// Numeric field with the zero fallback the adapters use for gaps.
fn field_or_zero(info: &TickerInfo, ticker: &str, field: &str) -> f64 {
    match info.number(field) {
        Some(value) => value,
        None => {
            // Absent and genuinely zero look the same downstream.
            debug!(ticker, field, "Provider field absent, defaulting to 0");
            0.0
        }
    }
}

//
// ================= Adapter functions =================
//

pub async fn get_stock_price(provider: &dyn MarketDataProvider, ticker: &str) -> Result<StockPrice> {
    let info = provider.ticker_info(ticker).await?;

    Ok(StockPrice {
        ticker: ticker.to_string(),
        price: field_or_zero(&info, ticker, "currentPrice"),
        change_percent: field_or_zero(&info, ticker, "regularMarketChangePercent"),
    })
}

pub async fn get_dividend_yield(provider: &dyn MarketDataProvider, ticker: &str) -> Result<f64> {
    let info = provider.ticker_info(ticker).await?;
    Ok(field_or_zero(&info, ticker, "dividendYield") * 100.0)
}

pub async fn get_market_cap(provider: &dyn MarketDataProvider, ticker: &str) -> Result<f64> {
    let info = provider.ticker_info(ticker).await?;
    Ok(field_or_zero(&info, ticker, "marketCap") / 1e9)
}

//
// ================= Tool wrappers =================
//

pub struct StockPriceTool {
    provider: Arc<dyn MarketDataProvider>,
}

impl StockPriceTool {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl Tool for StockPriceTool {
    fn name(&self) -> &'static str {
        "get_stock_price"
    }

    fn description(&self) -> &'static str {
        "Get current stock price and percentage change."
    }

    fn parameters(&self) -> Value {
        ticker_schema()
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolResult> {
        let ticker = require_ticker(input)?;
        get_stock_price(self.provider.as_ref(), ticker)
            .await
            .map(ToolResult::Quote)
    }
}

pub struct DividendYieldTool {
    provider: Arc<dyn MarketDataProvider>,
}

impl DividendYieldTool {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl Tool for DividendYieldTool {
    fn name(&self) -> &'static str {
        "get_dividend_yield"
    }

    fn description(&self) -> &'static str {
        "Get dividend yield percentage."
    }

    fn parameters(&self) -> Value {
        ticker_schema()
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolResult> {
        let ticker = require_ticker(input)?;
        get_dividend_yield(self.provider.as_ref(), ticker)
            .await
            .map(ToolResult::Value)
    }
}

pub struct MarketCapTool {
    provider: Arc<dyn MarketDataProvider>,
}

impl MarketCapTool {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl Tool for MarketCapTool {
    fn name(&self) -> &'static str {
        "get_market_cap"
    }

    fn description(&self) -> &'static str {
        "Get market capitalization in billions."
    }

    fn parameters(&self) -> Value {
        ticker_schema()
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolResult> {
        let ticker = require_ticker(input)?;
        get_market_cap(self.provider.as_ref(), ticker)
            .await
            .map(ToolResult::Value)
    }
}

/// Registry with the three market data tools bound to one provider.
pub fn create_market_data_registry(provider: Arc<dyn MarketDataProvider>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(StockPriceTool::new(provider.clone())));
    registry.register(Arc::new(DividendYieldTool::new(provider.clone())));
    registry.register(Arc::new(MarketCapTool::new(provider)));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    /// Provider that serves a fixed record and counts lookups
    struct FixedProvider {
        info: TickerInfo,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn new(info: Value) -> Arc<Self> {
            Arc::new(Self {
                info: TickerInfo::from(info),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MarketDataProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn ticker_info(&self, _ticker: &str) -> Result<TickerInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.info.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl MarketDataProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn ticker_info(&self, ticker: &str) -> Result<TickerInfo> {
            Err(AgentError::MarketDataError(format!("{} unreachable", ticker)))
        }
    }

    fn input(tool: &str, parameters: Value) -> ToolInput {
        ToolInput {
            tool_name: tool.to_string(),
            parameters,
        }
    }

    #[tokio::test]
    async fn test_stock_price_reads_provider_fields() {
        let provider = FixedProvider::new(json!({
            "currentPrice": 189.84,
            "regularMarketChangePercent": -1.2,
        }));

        let quote = get_stock_price(provider.as_ref(), "AAPL").await.unwrap();

        assert_eq!(
            quote,
            StockPrice {
                ticker: "AAPL".into(),
                price: 189.84,
                change_percent: -1.2,
            }
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_fields_default_to_zero() {
        let provider = FixedProvider::new(json!({}));

        let quote = get_stock_price(provider.as_ref(), "VALE3.SA").await.unwrap();
        assert_eq!(quote.price, 0.0);
        assert_eq!(quote.change_percent, 0.0);

        assert_eq!(get_dividend_yield(provider.as_ref(), "VALE3.SA").await.unwrap(), 0.0);
        assert_eq!(get_market_cap(provider.as_ref(), "VALE3.SA").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_unit_normalisation() {
        let cases = [(0.0052, 2_950_000_000_000.0), (0.1587, 497_000_000_000.0), (0.0, 1.0)];

        for (dividend_yield, market_cap) in cases {
            let provider = FixedProvider::new(json!({
                "dividendYield": dividend_yield,
                "marketCap": market_cap,
            }));

            let y = get_dividend_yield(provider.as_ref(), "T").await.unwrap();
            let m = get_market_cap(provider.as_ref(), "T").await.unwrap();

            assert_eq!(y, dividend_yield * 100.0);
            assert_eq!(m, market_cap / 1e9);
        }
    }

    #[tokio::test]
    async fn test_provider_errors_are_not_masked() {
        let provider: Arc<dyn MarketDataProvider> = Arc::new(FailingProvider);
        let registry = create_market_data_registry(provider);

        for tool in ["get_stock_price", "get_dividend_yield", "get_market_cap"] {
            let result = registry.execute(&input(tool, json!({"ticker": "AAPL"}))).await;
            assert!(matches!(result, Err(AgentError::MarketDataError(_))), "{tool}");
        }
    }

    #[tokio::test]
    async fn test_registry_dispatch_and_input_validation() {
        let provider = FixedProvider::new(json!({"marketCap": 3_000_000_000.0}));
        let registry = create_market_data_registry(provider.clone());

        let result = assert_ok!(
            registry
                .execute(&input("get_market_cap", json!({"ticker": "not a ticker!"})))
                .await
        );
        assert_eq!(result, ToolResult::Value(3.0));

        assert_err!(registry.execute(&input("get_market_cap", json!({}))).await);
        assert_err!(registry.execute(&input("get_market_cap", json!("AAPL"))).await);
        assert_err!(registry.execute(&input("get_market_cap", json!({"ticker": 42}))).await);

        let missing = registry.execute(&input("get_pe_ratio", json!({"ticker": "AAPL"}))).await;
        assert!(matches!(missing, Err(AgentError::ToolNotFound(name)) if name == "get_pe_ratio"));

        // Only the one valid call reached the provider
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_definitions() {
        let registry = create_market_data_registry(FixedProvider::new(json!({})));
        let definitions = registry.definitions();

        let names: Vec<_> = definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["get_dividend_yield", "get_market_cap", "get_stock_price"]);

        for definition in definitions {
            assert_eq!(definition.parameters["required"], json!(["ticker"]));
            assert!(!definition.description.is_empty());
        }
    }
}
