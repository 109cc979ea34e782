use clap::Args;
use serde_json::{json, Value};

use crate::cli::utils::{endpoint, error_message, output_error, output_success};
use crate::cli::OutputFormat;

#[derive(Args)]
pub struct SaveConfigArgs {
    #[arg(long, env = "TENANT_ADMIN_URL", default_value = "http://localhost:7071", help = "Server base URL")]
    pub url: String,

    #[arg(long, help = "Tenant the configuration belongs to")]
    pub tenant_id: String,

    #[arg(long = "site", help = "SharePoint site URL (repeatable)")]
    pub sites: Vec<String>,

    #[arg(long, help = "Identifier recorded as updatedBy")]
    pub user_identifier: Option<String>,

    #[arg(long, help = "Display name recorded as updatedByDisplayName")]
    pub user_display_name: Option<String>,
}

pub async fn handle(args: SaveConfigArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let payload = json!({
        "tenantId": args.tenant_id,
        "sharepointUrls": args.sites,
        "userIdentifier": args.user_identifier,
        "userDisplayName": args.user_display_name,
    });

    let response = reqwest::Client::new()
        .post(endpoint(&args.url, "/api/saveConfiguration"))
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    let body: Value = response.json().await?;

    if !status.is_success() {
        output_error(&output_format, &error_message(&body), Some(status.as_u16()))?;
        anyhow::bail!("saving configuration failed with status {}", status);
    }

    output_success(
        &output_format,
        &format!("Configuration for tenant '{}' saved", args.tenant_id),
        None,
    )
}
