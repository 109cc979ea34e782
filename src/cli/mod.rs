pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "tenant-admin")]
#[command(about = "Tenant Admin CLI - identity assertions and admin-status checks")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Encode or decode x-ms-client-principal assertions")]
    Principal {
        #[command(subcommand)]
        cmd: commands::principal::PrincipalCommands,
    },

    #[command(about = "Ask a running server whether a principal is a tenant admin")]
    Check(commands::check::CheckArgs),

    #[command(about = "Save a tenant's SharePoint site configuration on a running server")]
    SaveConfig(commands::save_config::SaveConfigArgs),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Principal { cmd } => commands::principal::handle(cmd, output_format),
        Commands::Check(args) => commands::check::handle(args, output_format).await,
        Commands::SaveConfig(args) => commands::save_config::handle(args, output_format).await,
    }
}
