use anyhow::{Context, Result};
use blockmint_config::config::Config;
use blockmint_core::{HttpLedger, LedgerClient, MemoryLedger};
use blockmint_miner::{MiningService, run_server};
use clap::Parser;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "blockmint-miner", version, about = "Proof-of-work miner for the Blockmint ledger")]
struct Args {
    /// Configuration file. Defaults to ~/.blockmint/config.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address for the intake server, overrides `listen_addr`
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Keep the chain in process memory instead of talking to the ledger service
    #[arg(long)]
    memory_ledger: bool,
}

fn init_logger(cfg: &Config) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Info)
        .filter_module("blockmint_miner", log::LevelFilter::Debug)
        .filter_module("blockmint_core", log::LevelFilter::Debug)
        .parse_default_env();

    if let Some(path) = cfg.log_file_resolved() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {:?}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init()?;
    Ok(())
}

async fn serve<L: LedgerClient>(ledger: L, cfg: &Config, addr: SocketAddr) {
    let service = Arc::new(MiningService::new(ledger, cfg.max_pow_attempts));
    run_server(service, addr).await;
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_logger(&cfg)?;

    let addr: SocketAddr = match args.listen {
        Some(addr) => addr,
        None => cfg
            .listen_addr
            .parse()
            .with_context(|| format!("Invalid listen_addr: {}", cfg.listen_addr))?,
    };

    if let Some(limit) = cfg.max_pow_attempts {
        log::warn!("Proof-of-work search capped at {} attempts per block", limit);
    }

    if args.memory_ledger {
        log::info!("Using in-memory ledger");
        serve(MemoryLedger::default(), &cfg, addr).await;
    } else {
        log::info!("Using ledger service at {}", cfg.ledger_url);
        serve(HttpLedger::new(&cfg.ledger_url), &cfg, addr).await;
    }

    Ok(())
}
