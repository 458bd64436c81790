use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::config::{AppConfig, DatabaseBackend};
use crate::database::{DatabaseManager, PgStore};

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let Some(data_value) = data {
                response["data"] = data_value;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
            if let Some(Value::Object(fields)) = data {
                for (key, value) in fields {
                    match value {
                        Value::String(s) => println!("  {:<12} {}", key, s),
                        other => println!("  {:<12} {}", key, other),
                    }
                }
            }
        }
    }
    Ok(())
}

/// Operator commands always work against Postgres; the memory store would vanish on exit
pub async fn connect_store(config: &AppConfig) -> anyhow::Result<PgStore> {
    if config.database.backend != DatabaseBackend::Postgres {
        anyhow::bail!("This command needs a Postgres database; set DATABASE_URL");
    }
    let pool = DatabaseManager::connect(&config.database).await?;
    Ok(PgStore::new(pool))
}
