use serde_json::json;
use tracing::info;

use crate::cli::utils::{connect_store, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseManager;

/// Schema statements are idempotent, so running this twice is harmless
pub async fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    DatabaseManager::apply_schema(store.pool()).await?;
    DatabaseManager::close(store.pool().clone()).await;

    let target = config
        .database
        .url
        .as_deref()
        .and_then(|url| DatabaseManager::redacted_url(url).ok())
        .unwrap_or_default();
    info!(database = %target, "Schema applied");
    output_success(&output_format, "Schema applied", Some(json!({ "database": target })))
}
