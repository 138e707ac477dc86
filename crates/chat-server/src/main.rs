//! Chat relay binary.

use std::time::Duration;

use anyhow::{Context, Result};
use chat_server::{shutdown_channel, Config, Server, TransportMode};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "chat-server")]
#[clap(about = "Multi-client TCP/UDP chat relay")]
struct Cli {
    /// Address to bind
    #[clap(short, long)]
    bind: Option<String>,

    /// Port (shared by TCP and UDP in `both` mode)
    #[clap(short, long)]
    port: Option<u16>,

    /// Maximum number of registered participants
    #[clap(short = 'm', long)]
    max_clients: Option<usize>,

    /// tcp, udp or both
    #[clap(short, long)]
    transport: Option<TransportMode>,

    /// How long a new connection may take to send REGISTER
    #[clap(long)]
    register_timeout_ms: Option<u64>,

    /// Upper bound on a single send to one participant
    #[clap(long)]
    send_timeout_ms: Option<u64>,

    /// Drop UDP participants silent for this long (0 disables)
    #[clap(long)]
    idle_timeout_secs: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn apply(self, mut config: Config) -> Config {
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(max) = self.max_clients {
            config.max_clients = max;
        }
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if let Some(ms) = self.register_timeout_ms {
            config.register_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.send_timeout_ms {
            config.send_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = self.idle_timeout_secs {
            config.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.apply(Config::from_env().context("reading CHAT_* environment")?);
    let server = Server::bind(config).await?;

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("ctrl-c received");
                shutdown_tx.send_replace(true);
            }
            Err(e) => {
                error!(error = %e, "cannot listen for ctrl-c");
                // dropping the sender would stop the server
                std::future::pending::<()>().await;
                drop(shutdown_tx);
            }
        }
    });

    server.run(shutdown_rx).await?;
    Ok(())
}
