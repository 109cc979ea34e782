use clap::Args;
use serde_json::{json, Value};

use crate::cli::utils::{endpoint, error_message, output_error, output_success};
use crate::cli::OutputFormat;
use crate::principal::CLIENT_PRINCIPAL_HEADER;

#[derive(Args)]
pub struct CheckArgs {
    #[arg(long, env = "TENANT_ADMIN_URL", default_value = "http://localhost:7071", help = "Server base URL")]
    pub url: String,

    #[arg(long, help = "Base64 x-ms-client-principal value to send")]
    pub principal: Option<String>,
}

pub async fn handle(args: CheckArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let mut request = client.get(endpoint(&args.url, "/api/checkAdminStatus"));
    if let Some(principal) = &args.principal {
        request = request.header(CLIENT_PRINCIPAL_HEADER, principal);
    }

    let response = request.send().await?;
    let status = response.status();
    let body: Value = response.json().await?;

    if !status.is_success() {
        output_error(&output_format, &error_message(&body), Some(status.as_u16()))?;
        anyhow::bail!("admin status check failed with status {}", status);
    }

    let is_admin = body
        .get("isAdmin")
        .and_then(Value::as_bool)
        .ok_or_else(|| anyhow::anyhow!("response did not contain isAdmin: {}", body))?;

    let message = if is_admin {
        "User is a tenant administrator"
    } else {
        "User is not a tenant administrator"
    };
    output_success(&output_format, message, Some(json!({ "isAdmin": is_admin })))
}
