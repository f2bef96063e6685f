//! Yahoo Finance quoteSummary client
//!
//! Uses a long-lived reqwest::Client with a cookie jar. Yahoo wants a
//! session cookie plus a crumb on quoteSummary calls; both are fetched
//! on first use and kept until Yahoo rejects the crumb.

use crate::config::MarketDataConfig;
use crate::error::AgentError;
use crate::market_data::{MarketDataProvider, TickerInfo};
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Modules requested from quoteSummary, in merge order.
const MODULES: &[&str] = &["price", "summaryDetail", "financialData", "defaultKeyStatistics"];

/// quoteSummary reports these as fractions; the record carries them in
/// percent, like Yahoo's quote endpoint does.
const PERCENT_FIELDS: &[&str] = &["regularMarketChangePercent"];

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub struct YahooFinanceProvider {
    client: Client,
    base_url: String,
    session_url: Option<String>,
    crumb: RwLock<Option<String>>,
}

impl YahooFinanceProvider {
    pub fn new(config: &MarketDataConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_url: config.session_url.clone(),
            crumb: RwLock::new(None),
        })
    }

    /// quoteSummary URL with the ticker as a single encoded path segment.
    fn quote_summary_url(&self, ticker: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            AgentError::MarketDataError(format!("Invalid Yahoo base URL '{}': {}", self.base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                AgentError::MarketDataError(format!("Yahoo base URL '{}' cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["v10", "finance", "quoteSummary", ticker]);

        Ok(url)
    }

    async fn crumb(&self) -> Result<Option<String>> {
        let Some(session_url) = self.session_url.as_deref() else {
            return Ok(None);
        };

        if let Some(crumb) = self.crumb.read().await.as_ref() {
            return Ok(Some(crumb.clone()));
        }

        let mut slot = self.crumb.write().await;
        // Another request may have finished the handshake while we waited
        if let Some(crumb) = slot.as_ref() {
            return Ok(Some(crumb.clone()));
        }

        let crumb = self.handshake(session_url).await?;
        *slot = Some(crumb.clone());
        Ok(Some(crumb))
    }

    async fn handshake(&self, session_url: &str) -> Result<String> {
        // Only the Set-Cookie matters; this page answers 404 on purpose.
        self.client.get(session_url).send().await.map_err(|e| {
            AgentError::MarketDataError(format!("Yahoo session request failed: {}", e))
        })?;

        let response = self
            .client
            .get(format!("{}/v1/test/getcrumb", self.base_url))
            .send()
            .await
            .map_err(|e| AgentError::MarketDataError(format!("Yahoo crumb request failed: {}", e)))?;

        let status = response.status();
        let crumb = response.text().await?.trim().to_string();

        if !status.is_success() || crumb.is_empty() {
            return Err(AgentError::MarketDataError(format!(
                "Yahoo crumb unavailable ({})",
                status
            )));
        }

        info!("Yahoo session established");
        Ok(crumb)
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    fn name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn ticker_info(&self, ticker: &str) -> Result<TickerInfo> {
        let crumb = self.crumb().await?;
        let url = self.quote_summary_url(ticker)?;

        let mut query = vec![("modules", MODULES.join(","))];
        if let Some(crumb) = crumb.as_ref() {
            query.push(("crumb", crumb.clone()));
        }

        debug!(ticker, "Fetching quoteSummary");

        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                error!(ticker, error = %e, "Yahoo request failed");
                AgentError::MarketDataError(format!("Yahoo request failed for {}: {}", ticker, e))
            })?;

        let status = response.status();

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED && crumb.is_some() {
                // Next lookup redoes the handshake
                self.crumb.write().await.take();
                warn!(ticker, "Yahoo rejected the crumb, session dropped");
            }

            let body = response.text().await.unwrap_or_default();
            let description = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|body| {
                    body.pointer("/quoteSummary/error/description")
                        .or_else(|| body.pointer("/finance/error/description"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "no description".to_string());

            return Err(AgentError::MarketDataError(format!(
                "Yahoo returned {} for {}: {}",
                status, ticker, description
            )));
        }

        let body = response.json::<Value>().await.map_err(|e| {
            AgentError::MarketDataError(format!("Invalid JSON from Yahoo for {}: {}", ticker, e))
        })?;

        let result = body
            .pointer("/quoteSummary/result/0")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                AgentError::MarketDataError(format!("No quoteSummary result for {}", ticker))
            })?;

        Ok(flatten_modules(result))
    }
}

/// Merge the per-module objects into one flat record, keeping the first
/// occurrence of each field and unwrapping Yahoo's `{raw, fmt}` pairs.
fn flatten_modules(result: &Map<String, Value>) -> TickerInfo {
    let mut fields = Map::new();

    for module in MODULES {
        let Some(entries) = result.get(*module).and_then(Value::as_object) else {
            continue;
        };

        for (key, value) in entries {
            if fields.contains_key(key) {
                continue;
            }
            if let Some(value) = unwrap_raw(value) {
                fields.insert(key.clone(), value);
            }
        }
    }

    for field in PERCENT_FIELDS {
        if let Some(fraction) = fields.get(*field).and_then(Value::as_f64) {
            fields.insert(field.to_string(), Value::from(fraction * 100.0));
        }
    }

    TickerInfo::new(fields)
}

fn unwrap_raw(value: &Value) -> Option<Value> {
    match value {
        Value::Object(obj) if obj.is_empty() => None,
        Value::Object(obj) => obj.get("raw").cloned(),
        Value::Null | Value::Array(_) => None,
        other => Some(other.clone()),
    }
}
