mod http;
mod lookup;
mod mdn;
mod tools;

pub const USER_AGENT: &str = concat!("mdnlookup/", env!("CARGO_PKG_VERSION"));

use std::net::{IpAddr, SocketAddr};

use clap::{Parser, Subcommand};
use rmcp::{ServiceExt, transport::stdio};
use tracing::info;

use mdn::MdnClient;
use tools::MdnLookup;

/// MDN documentation lookup over HTTP, NDJSON streaming, and MCP.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve /lookup, /stream-lookup and /mcp over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: IpAddr,
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
        /// Shared secret required in the X-API-Key header for /mcp
        #[arg(long, env = "PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Run the MCP server on stdio (default)
    Mcp,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mdnlookup=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let index = MdnClient::from_env(mdn::http_client()?);

    match cli.command.unwrap_or(Command::Mcp) {
        Command::Serve {
            host,
            port,
            password,
        } => {
            let password = password.filter(|p| !p.is_empty());
            info!(auth = password.is_some(), "starting mdnlookup HTTP server");
            let state = http::AppState { index, password };
            http::serve(SocketAddr::new(host, port), state).await?;
        }
        Command::Mcp => {
            info!("starting mdnlookup MCP server");
            let service = MdnLookup::new(index)
                .serve(stdio())
                .await
                .inspect_err(|e| tracing::error!("failed to start server: {e}"))?;
            service.waiting().await?;
        }
    }

    info!("server stopped");
    Ok(())
}
