mod commands;

use clap::Parser;
use commands::*;

use blockmint_config::config::Config;

#[derive(Parser)]
#[command(name = "blockmint-cli")]
#[command(about = "Blockmint transaction generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Send {
            sender,
            receiver,
            amount,
        } => {
            let cfg = Config::load()?;
            send_transaction(&cfg, sender, receiver, amount).await
        }
        Commands::Balance { account } => get_balance(&Config::load()?, account).await,
        Commands::Chain { verify } => show_chain(&Config::load()?, verify).await,
        Commands::Config { subcommand } => match subcommand {
            ConfigCommands::View => {
                println!("{}", Config::load()?.view()?);
                Ok(())
            }
            ConfigCommands::Set { key, value } => {
                let mut cfg = Config::load()?;
                cfg.set_value(&key, &value)?;
                cfg.save()?;
                println!("✅ {} = {} set successfully.", key, value);
                Ok(())
            }
            ConfigCommands::Init => {
                let path = Config::init_default()?;
                println!("Default configuration file has been created: {:?}", path);
                Ok(())
            }
        },
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        println!("❌ {:#}", e);
        std::process::exit(1);
    }
}
