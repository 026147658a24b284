//! mcast-relay CLI entry point.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mcast_relay::{DaemonConfig, Forwarder};

/// Multicast relay - bridges mDNS/SSDP between a guest network and the LAN.
#[derive(Parser, Debug)]
#[command(name = mcast_relay::PACKAGE)]
#[command(version)]
#[command(about = "A guest-to-LAN multicast forwarding daemon")]
#[command(
    long_about = "Bridges mDNS/SSDP service discovery between a guest's virtual network interface and the LAN, rewriting guest addresses embedded in DNS answers."
)]
struct Args {
    /// Interface facing the guest network.
    internal_ifname: String,

    /// Interface facing the LAN.
    lan_ifname: String,

    /// Guest IPv4 address to rewrite inside DNS answers.
    #[arg(short = 'g', long = "guest-addr")]
    guest_addr: Option<Ipv4Addr>,

    /// Path to YAML daemon configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Disable stateless forwarding on the well-known ports.
    #[arg(long)]
    no_stateless: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match DaemonConfig::from_file(path) {
            Ok(config) => config,
            Err(err) => {
                error!("failed to load {}: {}", path.display(), err);
                return ExitCode::FAILURE;
            }
        },
        None => DaemonConfig::default(),
    };

    // CLI overrides
    if args.guest_addr.is_some() {
        config.guest_addr = args.guest_addr;
    }
    if args.no_stateless {
        config.allow_stateless = false;
    }

    let mut forwarders = Vec::new();
    for forwarder_config in config.forwarder_configs(&args.internal_ifname, &args.lan_ifname) {
        let group = forwarder_config.group;
        let port = forwarder_config.port;
        match Forwarder::new(forwarder_config) {
            Ok(forwarder) => forwarders.push(forwarder),
            Err(err) => {
                error!("failed to start forwarder for {}:{}: {}", group, port, err);
                return ExitCode::FAILURE;
            }
        }
    }

    match futures::future::try_join_all(forwarders.iter_mut().map(|f| f.run())).await {
        Ok(_) => {
            info!("shutting down");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("forwarder failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
