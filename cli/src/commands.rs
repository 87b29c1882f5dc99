use anyhow::{Context, Result, bail};
use blockmint_config::config::Config;
use blockmint_core::consensus::verify_chain;
use blockmint_core::{Amount, Block, HttpLedger, LedgerClient, Transaction, WalletId};
use reqwest::Client;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Submit a transfer to the miner
    Send {
        sender: WalletId,
        receiver: WalletId,
        #[arg(help = "Amount of coins to transfer (e.g., 10.5)", allow_hyphen_values = true)]
        amount: Amount,
    },

    /// Show the balance of an account. Unused accounts have a balance of 0
    Balance { account: WalletId },

    /// Show how many blocks the chain holds and its tip
    Chain {
        /// Re-check every block's proof-of-work and links
        #[arg(long)]
        verify: bool,
    },

    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
pub enum ConfigCommands {
    View,
    Set { key: String, value: String },
    Init,
}

pub fn transaction_url(miner_url: &str, tx: &Transaction) -> String {
    format!(
        "{}/transactions/{}/{}/{}",
        miner_url.trim_end_matches('/'),
        tx.sender,
        tx.receiver,
        tx.amount
    )
}

/// Fetches the chain, asking the ledger to create the genesis block first if
/// it has none.
pub async fn chain_with_genesis<L: LedgerClient>(ledger: &L) -> Result<Vec<Block>> {
    let chain = ledger.get_chain().await.context("Chain query failed")?;
    if !chain.is_empty() {
        return Ok(chain);
    }
    log::info!("Chain is empty, creating reserved account");
    ledger
        .create_reserved_account()
        .await
        .context("Reserved account creation failed")?;
    ledger.get_chain().await.context("Chain query failed")
}

pub async fn send_transaction(
    cfg: &Config,
    sender: WalletId,
    receiver: WalletId,
    amount: Amount,
) -> Result<()> {
    let tx = Transaction::new(sender, receiver, amount);
    tx.check_distinct_accounts()?;

    let url = transaction_url(&cfg.miner_url, &tx);
    let response = Client::new()
        .post(&url)
        .send()
        .await
        .with_context(|| format!("Failed to reach miner at {}", cfg.miner_url))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Miner rejected the transaction ({}): {}", status, body);
    }
    println!(
        "🚀 Transaction submitted: {} -> {} amount {}",
        tx.sender, tx.receiver, tx.amount
    );

    // the miner gives no feedback, so show where the chain stands
    let ledger = HttpLedger::new(&cfg.ledger_url);
    match chain_with_genesis(&ledger).await {
        Ok(chain) => println!("📦 Blocks in chain: {}", chain.len()),
        Err(e) => log::warn!("Could not fetch chain state: {:#}", e),
    }
    Ok(())
}

pub async fn get_balance(cfg: &Config, account: WalletId) -> Result<()> {
    let ledger = HttpLedger::new(&cfg.ledger_url);
    let balance = ledger
        .get_balance(account)
        .await
        .context("Balance query failed")?;
    println!("💰 Account {} balance: {}", account, balance);
    Ok(())
}

pub async fn show_chain(cfg: &Config, verify: bool) -> Result<()> {
    let ledger = HttpLedger::new(&cfg.ledger_url);
    let chain = chain_with_genesis(&ledger).await?;

    println!("📦 Blocks in chain: {}", chain.len());
    if let Some(tip) = chain.last() {
        println!(
            "   Tip: id={} hash={} offset={}",
            tip.block_id, tip.curr_block_hash, tip.block_offset
        );
    }

    if verify {
        verify_chain(&chain)?;
        println!("✅ All {} blocks verified", chain.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockmint_core::MemoryLedger;

    #[test]
    fn transaction_url_matches_intake_route() {
        let tx = Transaction::new(1, 2, 10.5);
        assert_eq!(
            transaction_url("http://127.0.0.1:44334/", &tx),
            "http://127.0.0.1:44334/transactions/1/2/10.5"
        );
    }

    #[tokio::test]
    async fn empty_chain_gets_a_genesis_block() {
        let ledger = MemoryLedger::default();
        let chain = chain_with_genesis(&ledger).await.unwrap();
        assert_eq!(chain.len(), 1);
        assert!(chain[0].is_genesis());

        // an existing chain is returned as is
        let again = chain_with_genesis(&ledger).await.unwrap();
        assert_eq!(again, chain);
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn self_transfer_is_refused_before_sending() {
        let cfg = Config {
            miner_url: "http://127.0.0.1:1".to_string(),
            ..Config::default()
        };
        let err = send_transaction(&cfg, 3, 3, 1.0).await.unwrap_err();
        assert!(err.to_string().contains("same account"));
    }
}
