//! Reasoning agent - the tool-calling loop
//!
//! QUESTION → MODEL → (TOOL CALLS → RESULTS → MODEL)* → ANSWER

use crate::error::AgentError;
use crate::llm::{ChatMessage, ChatModel};
use crate::models::ToolInput;
use crate::tools::ToolRegistry;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub mod persona;
pub use persona::FINANCIAL_ANALYST_PERSONA;

/// Anything that can turn a persona, a toolset and a question into an answer
#[async_trait]
pub trait ReasoningAgent: Send + Sync {
    async fn invoke(
        &self,
        persona: &str,
        tools: &ToolRegistry,
        user_message: &str,
    ) -> Result<String>;
}

/// Chat-model-driven agent that executes whatever tools the model asks for
pub struct ToolCallingAgent {
    model: Arc<dyn ChatModel>,
    max_iterations: usize,
}

impl ToolCallingAgent {
    pub fn new(model: Arc<dyn ChatModel>, max_iterations: usize) -> Self {
        Self {
            model,
            max_iterations,
        }
    }
}

#[async_trait]
impl ReasoningAgent for ToolCallingAgent {
    async fn invoke(
        &self,
        persona: &str,
        tools: &ToolRegistry,
        user_message: &str,
    ) -> Result<String> {
        let start_time = Instant::now();
        let definitions = tools.definitions();
        let mut messages = vec![ChatMessage::system(persona), ChatMessage::user(user_message)];
        let mut tool_calls_made = 0usize;

        info!(
            model = self.model.name(),
            tools = ?tools.list(),
            "Agent: starting"
        );

        for iteration in 1..=self.max_iterations {
            let completion = self.model.complete(&messages, &definitions).await?;

            if completion.tool_calls.is_empty() {
                info!(
                    iterations = iteration,
                    tool_calls = tool_calls_made,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Agent: completed"
                );
                return Ok(completion.content.unwrap_or_default());
            }

            let calls = completion.tool_calls.clone();
            messages.push(completion.into_message());

            for call in calls {
                debug!(
                    iteration,
                    tool = %call.name,
                    arguments = %call.arguments,
                    "Executing tool call"
                );

                let input = ToolInput {
                    tool_name: call.name.clone(),
                    parameters: call.arguments,
                };

                let result = tools.execute(&input).await.map_err(|e| {
                    warn!(tool = %call.name, error = %e, "Tool call failed");
                    e
                })?;

                tool_calls_made += 1;
                messages.push(ChatMessage::tool_result(
                    call.id,
                    serde_json::to_string(&result)?,
                ));
            }
        }

        warn!(
            max_iterations = self.max_iterations,
            "Agent: iteration limit reached without a final answer"
        );
        Err(AgentError::MaxIterationsExceeded(self.max_iterations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatCompletion, ToolCall, ToolDefinition};
    use crate::market_data::{MarketDataProvider, TickerInfo};
    use crate::tools::create_market_data_registry;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted completions and records what it was sent
    struct ScriptedModel {
        replies: Mutex<VecDeque<ChatCompletion>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<ChatCompletion>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn complete(
            &self,
            messages: &[ChatMessage],
            tools: &[ToolDefinition],
        ) -> Result<ChatCompletion> {
            assert_eq!(tools.len(), 3);
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AgentError::LlmError("script exhausted".into()))
        }
    }

    struct FixedProvider(serde_json::Value);

    #[async_trait]
    impl MarketDataProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn ticker_info(&self, _ticker: &str) -> Result<TickerInfo> {
            Ok(TickerInfo::from(self.0.clone()))
        }
    }

    struct DownProvider;

    #[async_trait]
    impl MarketDataProvider for DownProvider {
        fn name(&self) -> &'static str {
            "down"
        }

        async fn ticker_info(&self, _ticker: &str) -> Result<TickerInfo> {
            Err(AgentError::MarketDataError("connection refused".into()))
        }
    }

    fn call(id: &str, name: &str, ticker: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: json!({ "ticker": ticker }),
        }
    }

    fn registry() -> ToolRegistry {
        create_market_data_registry(Arc::new(FixedProvider(json!({
            "currentPrice": 38.5,
            "regularMarketChangePercent": 1.1,
            "dividendYield": 0.12,
            "marketCap": 500_000_000_000.0,
        }))))
    }

    #[tokio::test]
    async fn test_direct_answer_without_tools() {
        let model = ScriptedModel::new(vec![ChatCompletion::text("RSI measures momentum.")]);
        let agent = ToolCallingAgent::new(model.clone(), 12);

        let answer = agent
            .invoke(FINANCIAL_ANALYST_PERSONA, &registry(), "What is RSI?")
            .await
            .unwrap();

        assert_eq!(answer, "RSI measures momentum.");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            vec![
                ChatMessage::system(FINANCIAL_ANALYST_PERSONA),
                ChatMessage::user("What is RSI?"),
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_results_are_fed_back() {
        let model = ScriptedModel::new(vec![
            ChatCompletion::with_tool_calls(vec![
                call("c1", "get_stock_price", "PETR4.SA"),
                call("c2", "get_market_cap", "PETR4.SA"),
            ]),
            ChatCompletion::with_tool_calls(vec![call("c3", "get_dividend_yield", "PETR4.SA")]),
            ChatCompletion::text("PETR4 trades at R$38.50."),
        ]);
        let agent = ToolCallingAgent::new(model.clone(), 12);

        let answer = agent
            .invoke(FINANCIAL_ANALYST_PERSONA, &registry(), "Tell me about Petrobras")
            .await
            .unwrap();
        assert_eq!(answer, "PETR4 trades at R$38.50.");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);

        let second_round = &seen[1];
        assert_eq!(second_round.len(), 5);
        assert_eq!(
            second_round[3],
            ChatMessage::tool_result(
                "c1",
                r#"{"ticker":"PETR4.SA","price":38.5,"change_percent":1.1}"#
            )
        );
        assert_eq!(second_round[4], ChatMessage::tool_result("c2", "500.0"));

        let third_round = &seen[2];
        assert_eq!(third_round.len(), 7);
        assert_eq!(third_round[6], ChatMessage::tool_result("c3", "12.0"));
    }

    #[tokio::test]
    async fn test_empty_final_content_yields_empty_answer() {
        let model = ScriptedModel::new(vec![ChatCompletion::default()]);
        let agent = ToolCallingAgent::new(model, 12);

        let answer = agent.invoke("persona", &registry(), "hello").await.unwrap();
        assert_eq!(answer, "");
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let model = ScriptedModel::new(vec![
            ChatCompletion::with_tool_calls(vec![call("c1", "get_stock_price", "AAPL")]),
            ChatCompletion::text("unreachable"),
        ]);
        let agent = ToolCallingAgent::new(model, 12);
        let tools = create_market_data_registry(Arc::new(DownProvider));

        let result = agent.invoke("persona", &tools, "Price of AAPL?").await;
        assert!(matches!(result, Err(AgentError::MarketDataError(_))));
    }

    #[tokio::test]
    async fn test_unknown_tool_propagates() {
        let model = ScriptedModel::new(vec![ChatCompletion::with_tool_calls(vec![call(
            "c1",
            "get_pe_ratio",
            "AAPL",
        )])]);
        let agent = ToolCallingAgent::new(model, 12);

        let result = agent.invoke("persona", &registry(), "P/E of AAPL?").await;
        assert!(matches!(result, Err(AgentError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let looping = (0..3)
            .map(|i| ChatCompletion::with_tool_calls(vec![call(&format!("c{i}"), "get_stock_price", "AAPL")]))
            .collect();
        let model = ScriptedModel::new(looping);
        let agent = ToolCallingAgent::new(model.clone(), 2);

        let result = agent.invoke("persona", &registry(), "loop").await;

        assert!(matches!(result, Err(AgentError::MaxIterationsExceeded(2))));
        assert_eq!(model.seen.lock().unwrap().len(), 2);
    }
}
