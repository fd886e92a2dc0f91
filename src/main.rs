//! Lacore sales bot
//!
//! A Telegram bot for looking up catalog products by code and turning a
//! salesperson's sales into a priced report image.

mod catalog;
mod config;
mod gateway;
mod report;
mod runtime;
mod state_machine;
mod texts;

use catalog::Catalog;
use config::BotConfig;
use gateway::telegram::TelegramGateway;
use report::ReportRenderer;
use runtime::{ProductionManager, SessionManager};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lacore_bot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = BotConfig::from_env()?;
    if config.admin_ids.is_empty() {
        tracing::warn!("LACORE_ADMIN_IDS is empty, nobody will be able to use the bot");
    }

    // Catalog must be in place before any session is served
    tracing::info!(path = %config.db_path.display(), "Opening catalog database");
    let catalog = Catalog::open(&config.db_path)?;
    let synced = catalog.sync_from_file(&config.catalog_path)?;
    if synced == 0 {
        tracing::warn!(path = %config.catalog_path.display(), "Catalog source has no products");
    }
    tracing::info!(products = catalog.count()?, "Catalog ready");

    let renderer = ReportRenderer::new(config.font_dir.as_deref());
    if renderer.uses_builtin_font() {
        tracing::warn!("Report fonts unavailable, using the built-in bitmap font");
    }

    let manager: ProductionManager = SessionManager::new(
        Arc::new(catalog),
        Arc::new(renderer),
        config.admin_ids.clone(),
    );

    let telegram = TelegramGateway::new(config.bot_token.clone(), config.poll_timeout);
    telegram.delete_webhook().await?;

    tracing::info!(admins = config.admin_ids.len(), "Lacore bot started");
    tokio::select! {
        () = runtime::serve(&manager, &telegram, &telegram) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
