//! Card Price Check - photo in, priced card out
//!
//! HTTP service that identifies a trading card from an uploaded photo and
//! aggregates market prices for it.

use card_price_check::card_api::CardApi;
use card_price_check::config::Settings;
use card_price_check::pipeline::Pipeline;
use card_price_check::pricing::PriceAggregator;
use card_price_check::resolver::CardResolver;
use card_price_check::vision::VisionIdentifier;
use card_price_check::web;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

/// Card price check server - identifies cards from photos and aggregates market prices
#[derive(Parser, Debug)]
#[command(name = "card_price_check")]
#[command(version, about, long_about = None)]
struct Args {
    /// HTTP port (overrides the PORT environment variable)
    #[arg(short, long)]
    port: Option<u16>,

    /// Retry an unparseable vision reply once with a stricter prompt
    #[arg(long, default_value_t = false)]
    retry_parse: bool,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = Settings::from_env();
    let port = args.port.unwrap_or(settings.port);

    log::info!("Starting card_price_check...");

    let client = match reqwest::Client::builder()
        .user_agent(concat!("card_price_check/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            log::error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let vision = VisionIdentifier::new(
        client.clone(),
        settings.openai_api_key,
        settings.vision_base_url,
    );
    let card_api = CardApi::new(client, settings.card_api_key, settings.card_api_base_url);
    let resolver = CardResolver::new(card_api.clone());
    let aggregator = PriceAggregator::with_default_sources();

    let mut pipeline = Pipeline::new(vision, resolver, aggregator);
    if args.retry_parse {
        log::info!("Parse retry enabled");
        pipeline = pipeline.with_parse_retry();
    }

    if let Err(e) = web::serve(Arc::new(pipeline), card_api, port).await {
        log::error!("Web server error: {}", e);
        std::process::exit(1);
    }
}
