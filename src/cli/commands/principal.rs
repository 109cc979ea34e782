use clap::{Subcommand, ValueEnum};
use serde_json::json;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::principal::{encode_assertion, ClaimSpelling, ClientPrincipal};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Spelling {
    /// typ / val
    Short,
    /// type / value
    Long,
}

impl From<Spelling> for ClaimSpelling {
    fn from(spelling: Spelling) -> Self {
        match spelling {
            Spelling::Short => ClaimSpelling::Short,
            Spelling::Long => ClaimSpelling::Long,
        }
    }
}

#[derive(Subcommand)]
pub enum PrincipalCommands {
    #[command(about = "Build a base64 assertion carrying a tenant claim")]
    Encode {
        #[arg(long, help = "Directory object id of the user")]
        user_id: String,
        #[arg(long, help = "Tenant id placed in the tid claim")]
        tenant_id: String,
        #[arg(long, value_enum, default_value = "short", help = "Claim field spelling")]
        claim_spelling: Spelling,
    },

    #[command(about = "Decode an assertion and show the user and tenant it names")]
    Decode {
        #[arg(help = "Base64 x-ms-client-principal value")]
        header: String,
    },
}

pub fn handle(cmd: PrincipalCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PrincipalCommands::Encode {
            user_id,
            tenant_id,
            claim_spelling,
        } => {
            let header = encode_assertion(&user_id, &tenant_id, claim_spelling.into());
            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Assertion encoded",
                    Some(json!({ "header": header })),
                ),
                OutputFormat::Text => {
                    println!("{}", header);
                    Ok(())
                }
            }
        }
        PrincipalCommands::Decode { header } => {
            let principal = match ClientPrincipal::decode(&header) {
                Ok(principal) => principal,
                Err(e) => {
                    output_error(&output_format, &e.to_string(), None)?;
                    anyhow::bail!("assertion could not be decoded");
                }
            };

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Assertion decoded",
                    Some(json!({
                        "userId": principal.user_id,
                        "tenantId": principal.tenant_id(),
                        "identityProvider": principal.identity_provider,
                        "claims": principal.claims,
                    })),
                ),
                OutputFormat::Text => {
                    println!("User ID:   {}", principal.user_id.as_deref().unwrap_or("<missing>"));
                    println!("Tenant ID: {}", principal.tenant_id().unwrap_or("<missing>"));
                    println!("Claims:    {}", principal.claims.len());
                    Ok(())
                }
            }
        }
    }
}
