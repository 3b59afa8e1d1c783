//! `casanode`: pair with a Casanode device and inspect it from a terminal.
//!
//! Configuration comes from the `CASANODE_*` environment variables (see
//! [`SdkConfig::from_env`]); `--data-dir` overrides where the credential
//! and device files live.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use casanode_models::{NodeSnapshot, Route};
use casanode_sdk::{Navigation, SdkConfig, Session};
use clap::{Parser, Subcommand};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "casanode", about = "Casanode device client")]
#[command(author, version, long_about = None)]
struct Cli {
    /// Directory holding the credential and device files.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pair using a scanned claim link.
    Pair {
        /// Claim URL (`...?device=..&code=..&ap=..&pw=..&host=..`).
        url: String,
    },
    /// Pair using a development `qrcode.json` fixture.
    PairFixture {
        /// Path of the fixture file.
        file: PathBuf,
    },
    /// Log in again on the last paired device.
    Login {
        /// Pre-shared token; defaults to `CASANODE_API_TOKEN`.
        #[arg(long)]
        token: Option<String>,
    },
    /// Show the node dashboard.
    Status,
    /// Check whether a route may be opened.
    Open {
        /// Route path (`/node/wallet`) or name (`NodeWallet`).
        route: String,
    },
    /// List paired devices.
    Devices,
    /// Forget the session.
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = SdkConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    debug!(data_dir = ?config.data_dir, "configuration loaded");

    let session = Session::open(config).context("failed to initialise the session")?;
    run(&session, cli.command).await
}

async fn run(session: &Session, command: Command) -> Result<()> {
    match command {
        Command::Pair { url } => {
            let device = session.pair_from_url(&url).await?;
            println!("Paired with {} ({}:{})", device.name, device.host, device.port);
        }
        Command::PairFixture { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let fixture: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not JSON", file.display()))?;
            let device = session.pair_from_fixture(&fixture).await?;
            println!("Paired with {} ({}:{})", device.name, device.host, device.port);
        }
        Command::Login { token } => {
            resume_endpoint(session).await;
            session.login(token.as_deref()).await?;
            println!("Logged in");
        }
        Command::Status => {
            require_session(session).await?;
            match session.navigate(Route::NodeDashboard).await {
                Navigation::Allow => print_snapshot(&session.node().snapshot()),
                Navigation::Redirect(route) => bail!("node not ready (go to {})", route.path()),
            }
        }
        Command::Open { route } => {
            resume_endpoint(session).await;
            match session.navigate_to(&route).await? {
                Navigation::Allow => println!("allow"),
                Navigation::Redirect(target) => println!("redirect {}", target.path()),
            }
        }
        Command::Devices => {
            let devices = session.devices().list();
            if devices.is_empty() {
                println!("No paired device");
            }
            for device in devices {
                println!("{}\t{}:{}\t{}", device.name, device.host, device.port, device.uuid);
            }
        }
        Command::Logout => {
            session.logout().await;
            println!("Logged out");
        }
    }
    Ok(())
}

/// Reconnect to the last endpoint; failures are left to the next step.
async fn resume_endpoint(session: &Session) {
    if !session.resume().await {
        debug!("no resumable session");
    }
}

async fn require_session(session: &Session) -> Result<()> {
    if session.resume().await {
        return Ok(());
    }
    match session.credentials().invalid_reason() {
        Some(reason) => bail!(reason),
        None => bail!("not paired, run `casanode pair <URL>` first"),
    }
}

fn print_snapshot(node: &NodeSnapshot) {
    println!("Moniker     {}", node.moniker);
    println!("Status      {}", node.status);
    println!("Node IP     {}", node.node_ip);
    println!("Location    {}", node.node_location);
    println!("VPN         {}", node.vpn_type);
    println!("Peers       {}/{}", node.online_users, node.maximum_peers);
    println!("Bandwidth   up {} / down {}", node.upload_speed, node.download_speed);
    println!("Version     {}", node.version);
    println!("System      {} {} ({})", node.system_os, node.system_kernel, node.system_arch);
    if !node.node_address.is_empty() {
        println!("Address     {}", node.node_address);
        println!("Wallet      {}", node.public_address);
        println!("Balance     {}", node.node_balance);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_pair_with_global_data_dir() {
        let cli = Cli::try_parse_from([
            "casanode",
            "pair",
            "https://casanode.io/claim?device=d1&code=c1",
            "--data-dir",
            "/tmp/casanode",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/casanode")));
        assert!(matches!(cli.command, Command::Pair { ref url } if url.contains("device=d1")));
    }

    #[test]
    fn parses_login_token() {
        let cli = Cli::try_parse_from(["casanode", "login", "--token", "psk"]).unwrap();
        assert!(matches!(cli.command, Command::Login { token: Some(ref t) } if t == "psk"));
    }
}
