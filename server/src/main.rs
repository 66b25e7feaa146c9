use clap::Parser;
use log::{error, info};
use server::config::{load_rules, ServerConfig};
use server::network::{NetError, Server, ServerMessage};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Authoritative server for builder vs attacker matches")]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,
    /// Simulation ticks per second
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,
    /// Maximum concurrent clients
    #[arg(short, long, default_value = "2")]
    max_clients: usize,
    /// Seconds of silence before a client is dropped
    #[arg(long, default_value = "10")]
    timeout_secs: u64,
    /// TOML file overriding the default match rules
    #[arg(short, long)]
    rules: Option<PathBuf>,
    /// RNG seed for bots and session tokens, 0 draws from entropy
    #[arg(long, default_value = "0")]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<(), NetError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let rules = load_rules(args.rules.as_deref())?;
    let config = ServerConfig {
        tick_rate: args.tick_rate,
        max_clients: args.max_clients,
        client_timeout: Duration::from_secs(args.timeout_secs),
        rules,
        seed: (args.seed != 0).then_some(args.seed),
    };

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, config).await?;
    let shutdown = server.sender();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            let _ = shutdown.send(ServerMessage::Shutdown);
        }
    });

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        return Err(e);
    }
    Ok(())
}
