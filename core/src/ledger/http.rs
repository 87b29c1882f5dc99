use super::{LedgerClient, LedgerError, LedgerResult};
use crate::block::Block;
use crate::transaction::{Amount, WalletId};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

const RESERVED_ACCOUNT_PATH: &str = "api/Blockchain/ReservedBankAcct";
const SUBMIT_BLOCK_PATH: &str = "api/Blockchain/SubmitNewBlock";
const BALANCE_PATH: &str = "api/Blockchain/GetTransactedCurrCoinBalance";
const BLOCK_LIST_PATH: &str = "api/Blockchain/GetBlockList";

/// REST client for the ledger service. Success is decided by the HTTP status.
#[derive(Clone)]
pub struct HttpLedger {
    base_url: String,
    client: Client,
}

impl HttpLedger {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        HttpLedger {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turns a non-success status into `Rejected`, keeping the body for the log.
    async fn check(operation: &'static str, resp: Response) -> LedgerResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(LedgerError::Rejected {
            operation,
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(operation: &'static str, resp: Response) -> LedgerResult<T> {
        let text = Self::check(operation, resp).await?.text().await?;
        serde_json::from_str(&text).map_err(|source| LedgerError::Decode { operation, source })
    }
}

impl LedgerClient for HttpLedger {
    async fn create_reserved_account(&self) -> LedgerResult<()> {
        let resp = self
            .client
            .post(self.url(RESERVED_ACCOUNT_PATH))
            .send()
            .await?;
        Self::check("create_reserved_account", resp).await?;
        log::info!("Reserved account created on ledger {}", self.base_url);
        Ok(())
    }

    async fn submit_block(&self, block: &Block) -> LedgerResult<()> {
        let resp = self
            .client
            .post(self.url(SUBMIT_BLOCK_PATH))
            .json(block)
            .send()
            .await?;
        Self::check("submit_block", resp).await?;
        log::debug!("Ledger accepted block {}", block.block_id);
        Ok(())
    }

    async fn get_balance(&self, account: WalletId) -> LedgerResult<Amount> {
        let url = format!("{}/{}", self.url(BALANCE_PATH), account);
        let resp = self.client.get(&url).send().await?;
        Self::decode("get_balance", resp).await
    }

    async fn get_chain(&self) -> LedgerResult<Vec<Block>> {
        let resp = self.client.get(self.url(BLOCK_LIST_PATH)).send().await?;
        Self::decode("get_chain", resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_strip_trailing_slash() {
        let ledger = HttpLedger::new("http://127.0.0.1:44347/");
        assert_eq!(ledger.base_url(), "http://127.0.0.1:44347");
        assert_eq!(
            ledger.url(BLOCK_LIST_PATH),
            "http://127.0.0.1:44347/api/Blockchain/GetBlockList"
        );
    }

    #[tokio::test]
    async fn unreachable_ledger_is_a_transport_error() {
        // nothing listens on port 1
        let ledger = HttpLedger::new("http://127.0.0.1:1");
        match ledger.get_balance(7).await {
            Err(LedgerError::Transport(_)) => {}
            other => panic!("expected transport error, got {:?}", other),
        }
        assert!(matches!(
            ledger.create_reserved_account().await,
            Err(LedgerError::Transport(_))
        ));
    }
}
