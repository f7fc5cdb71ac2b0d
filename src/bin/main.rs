use expense_ledger_agent::{
    config::Config,
    extractor::{ExpenseExtractor, GeminiExtractor, MockExtractor},
    handler::{confirmation_text, MessageHandler},
    models::InboundMessage,
    pipeline::ExtractionPipeline,
    sink::build_default_sink,
};
use tracing::info;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = Config::from_env();

    let extractor: Box<dyn ExpenseExtractor> = if config.gemini_api_key.is_empty() {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env — using mock extractor");
        Box::new(MockExtractor)
    } else {
        Box::new(GeminiExtractor::new(
            config.gemini_api_key.clone(),
            config.default_currency.clone(),
        ))
    };

    let pipeline = ExtractionPipeline::new(
        extractor,
        config.timezone.clone(),
        config.default_currency.clone(),
    );
    let sink = build_default_sink(&config);
    let handler = MessageHandler::new(pipeline, sink);

    let body: String = {
        let args: Vec<String> = std::env::args().skip(1).collect();
        if args.is_empty() {
            "Lunch 12.50 USD".to_string()
        } else {
            args.join(" ")
        }
    };

    let message = InboundMessage {
        message_id: Uuid::new_v4().to_string(),
        chat_id: "cli".to_string(),
        chat_name: "cli".to_string(),
        sender_id: "cli-user".to_string(),
        timestamp_secs: chrono::Utc::now().timestamp(),
        body,
        image: None,
    };

    info!(message_id = %message.message_id, body = %message.body, "Processing message");

    match handler.handle(&message).await {
        Ok(record) => {
            println!("\n=== EXPENSE RECORDED ===");
            println!("{}", serde_json::to_string_pretty(&record)?);
            println!("\n{}", confirmation_text(&record));
            Ok(())
        }
        Err(e) => {
            eprintln!("Extraction failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
