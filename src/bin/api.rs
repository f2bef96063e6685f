use financial_analysis_agent::{
    agent::{ToolCallingAgent, FINANCIAL_ANALYST_PERSONA},
    api::{start_server, ApiState},
    config::AppConfig,
    llm::OpenAiChatModel,
    market_data::{MarketDataProvider, YahooFinanceProvider},
    tools::create_market_data_registry,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    info!("Financial Analysis Agent - API Server");
    info!(model = %config.llm.model, api_base = %config.llm.api_base, "LLM configured");
    info!(market_data = %config.market_data.base_url, "Market data configured");

    // Create components
    let provider = Arc::new(YahooFinanceProvider::new(&config.market_data)?);
    info!(provider = provider.name(), "Market data provider ready");
    let registry = create_market_data_registry(provider);
    let model = Arc::new(OpenAiChatModel::new(&config.llm)?);
    let agent = Arc::new(ToolCallingAgent::new(model, config.agent.max_iterations));

    let state = ApiState::new(agent, registry, FINANCIAL_ANALYST_PERSONA);

    info!("Agent initialized, starting API server");

    start_server(state, &config.bind_address()).await?;

    Ok(())
}
