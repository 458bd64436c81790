use clap::Subcommand;
use serde_json::json;
use tracing::info;

use crate::auth::password::{hash_password, MIN_PASSWORD_LENGTH};
use crate::cli::utils::{connect_store, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::{Account, AdminProfile, Profile};
use crate::database::AccountStore;
use crate::types::Role;

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "Create an administrator account")]
    Create {
        #[arg(long, help = "Login email")]
        email: String,

        #[arg(long, env = "NURTURE_ADMIN_PASSWORD", help = "Password (at least 8 characters)")]
        password: String,

        #[arg(long, default_value = "Nurture")]
        first_name: String,

        #[arg(long, default_value = "Admin")]
        last_name: String,

        #[arg(long)]
        department: Option<String>,
    },
}

pub struct NewAdmin {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
}

/// Administrators cannot self-register; this is the only way they are created
pub async fn create_admin(store: &dyn AccountStore, input: NewAdmin, cost: u32) -> anyhow::Result<Account> {
    if !input.email.contains('@') {
        anyhow::bail!("'{}' is not a valid email address", input.email);
    }
    if input.password.chars().count() < MIN_PASSWORD_LENGTH {
        anyhow::bail!("Password must be at least {} characters long", MIN_PASSWORD_LENGTH);
    }

    let password_hash = hash_password(&input.password, cost)?;
    let account = Account::new(
        &input.email,
        password_hash,
        input.first_name,
        input.last_name,
        None,
        Role::Admin,
    );
    let profile = Profile::Admin(AdminProfile {
        department: input.department,
    });
    store.create_account(&account, &profile).await?;
    Ok(account)
}

pub async fn handle(cmd: AdminCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AdminCommands::Create {
            email,
            password,
            first_name,
            last_name,
            department,
        } => {
            let store = connect_store(config).await?;
            let input = NewAdmin {
                email,
                password,
                first_name,
                last_name,
                department,
            };
            let account = create_admin(&store, input, config.security.password_cost).await?;

            info!(account_id = %account.id, "Administrator created");
            output_success(
                &output_format,
                "Administrator created",
                Some(json!({ "id": account.id, "email": account.email })),
            )
        }
    }
}
