//! Core data models for the financial agent

use serde::{Deserialize, Serialize};

//
// ================= Gateway =================
//

/// Incoming question. The field name matches the public `/ask` contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub messages: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentResponse {
    pub answer: String,
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockPrice {
    pub ticker: String,
    pub price: f64,
    pub change_percent: f64,
}

/// What a tool adapter hands back to the reasoning loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolResult {
    Quote(StockPrice),
    Value(f64),
}
