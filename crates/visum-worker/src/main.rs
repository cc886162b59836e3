//! visum-worker - queue worker for image deduplication and similarity

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use visum_core::{Config, LogConfig};
use visum_match::Matcher;
use visum_ocr::{HttpRecognizer, TextRecognizer};
use visum_store::Corpus;
use visum_worker::transport::{COMPARE_QUEUE, EXTRACTION_QUEUE, MAINTENANCE_QUEUE};
use visum_worker::{
    CompareHandler, Dispatcher, ExtractionHandler, MaintenanceHandler, Resolver, Transport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // RUST_LOG takes precedence; otherwise LOGGER_LEVEL picks the directive
    let log = LogConfig {
        level: std::env::var("LOGGER_LEVEL").unwrap_or_default(),
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log.tracing_directive().into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(level = %config.log.level, "configuration loaded");

    let corpus = Arc::new(Corpus::connect(&config.store).await?);
    info!(database = %config.store.database, "document store connected");

    let recognizer = Arc::new(HttpRecognizer::from_config(&config.recognizer));
    match recognizer.health_check().await {
        Ok(true) => info!(url = %config.recognizer.url, "recognition service healthy"),
        Ok(false) | Err(_) => warn!(
            url = %config.recognizer.url,
            "recognition service unreachable, extraction tasks will retry"
        ),
    }

    let transport = Arc::new(Transport::connect(config.broker.clone()).await);
    for queue in [EXTRACTION_QUEUE, COMPARE_QUEUE, MAINTENANCE_QUEUE] {
        let pending = transport.message_count(queue).await?;
        info!(queue, pending, "queue ready");
    }

    let mut dispatcher = Dispatcher::new(transport.clone(), config.worker.clone());
    dispatcher.register_handler(ExtractionHandler::new(
        corpus.clone(),
        Resolver::new(
            corpus.clone(),
            recognizer.clone(),
            config.recognizer.min_text_len,
        ),
    ));
    dispatcher.register_handler(CompareHandler::new(
        corpus.clone(),
        Resolver::new(corpus.clone(), recognizer, config.recognizer.min_text_len),
        Matcher::new(config.matcher.clone()),
        transport.clone(),
    ));
    dispatcher.register_handler(MaintenanceHandler::new(
        corpus,
        config.worker.enable_maintenance,
    ));

    let handle = dispatcher.start();
    info!("worker running, press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested, draining in-flight tasks");
    handle.shutdown().await?;

    Ok(())
}
