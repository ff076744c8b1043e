use std::env;
use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::broker::AmqpBroker;
use crate::config::{redact_url, AppConfig};

static DOTENV_INIT: OnceLock<()> = OnceLock::new();
static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Load environment variables from .env file exactly once
pub fn load_dotenv() {
    DOTENV_INIT.get_or_init(|| {
        dotenv::dotenv().ok();
    });
}

/// Initialize tracing exactly once
pub fn init_tracing() {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,actix_web=info,lapin=warn"));

        let is_production =
            env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()) == "production";

        if is_production {
            // JSON formatter for production
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    });
}

/// Open the process-wide broker session. The service cannot serve bids
/// without it, so callers treat an error here as fatal.
pub async fn connect_broker(config: &AppConfig) -> Result<Arc<AmqpBroker>> {
    let url = redact_url(&config.rabbitmq_url);
    info!("Connecting to broker at {}", url);

    let broker = AmqpBroker::connect(&config.rabbitmq_url)
        .await
        .with_context(|| format!("failed to open broker session at {url}"))?;

    info!("Connected to broker successfully!");
    Ok(Arc::new(broker))
}
