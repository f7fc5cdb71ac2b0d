use expense_ledger_agent::{
    api::start_server,
    config::Config,
    extractor::GeminiExtractor,
    handler::MessageHandler,
    pipeline::ExtractionPipeline,
    session,
    sink::build_default_sink,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = Config::from_env();

    if config.gemini_api_key.is_empty() {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env");
        eprintln!("📌 See .env.example for setup instructions");
    }

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("🚀 Expense Ledger Agent - API Server");
    info!("📍 Port: {}", api_port);

    if let Ok(self_id) = std::env::var("BOT_SELF_ID") {
        session::set_self_id(&self_id);
    }

    let extractor = Box::new(GeminiExtractor::new(
        config.gemini_api_key.clone(),
        config.default_currency.clone(),
    ));
    let pipeline = ExtractionPipeline::new(
        extractor,
        config.timezone.clone(),
        config.default_currency.clone(),
    );
    let sink = build_default_sink(&config);
    let handler = Arc::new(MessageHandler::new(pipeline, sink));

    info!("✅ Handler initialized");
    info!("📡 Starting API server...");

    start_server(handler, api_port).await?;

    Ok(())
}
