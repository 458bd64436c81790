use clap::Subcommand;
use serde_json::json;

use crate::auth::TokenCodec;
use crate::cli::utils::{connect_store, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::account::normalize_email;
use crate::database::AccountStore;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a bearer token for an existing account")]
    Issue {
        #[arg(long, help = "Account email")]
        email: String,
    },
}

/// Signed with the server's own secret, so the token works against a running API
pub async fn issue_for_email(store: &dyn AccountStore, codec: &TokenCodec, email: &str) -> anyhow::Result<(String, i64)> {
    let found = store
        .find_account_by_email(&normalize_email(email))
        .await?
        .ok_or_else(|| anyhow::anyhow!("No account with email {}", email))?;
    Ok(codec.issue(&found.account)?)
}

pub async fn handle(cmd: TokenCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { email } => {
            let store = connect_store(config).await?;
            let codec = TokenCodec::from_config(&config.security);
            let (token, expires_in) = issue_for_email(&store, &codec, &email).await?;

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Token issued",
                    Some(json!({ "token": token, "expires_in": expires_in })),
                ),
                // bare token so it can be captured with $(nurture token issue ...)
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
    }
}
