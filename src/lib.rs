//! Financial Analysis Agent
//!
//! An HTTP gateway in front of a tool-calling LLM agent that:
//! - Answers natural-language questions about stocks
//! - Lets the model look up price, dividend yield and market cap
//! - Treats Yahoo Finance as the market data provider
//!
//! FLOW:
//! POST /ask → AGENT → (TOOLS → MARKET DATA)* → ANSWER

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod market_data;
pub mod models;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use agent::{ReasoningAgent, ToolCallingAgent, FINANCIAL_ANALYST_PERSONA};
pub use config::AppConfig;
pub use error::AgentError;
pub use models::*;
