//! The diagnostic probe.
//!
//! One strictly sequential pass over the node: report network identity, gas
//! price and endpoint, then optionally resolve a signer and submit a 1-wei
//! transfer so the sender's nonce is no longer zero. Each step is awaited
//! before the next begins and the first failure aborts the run.

use crate::client::ChainClient;
use crate::config::{ProbeConfig, TRANSFER_GAS_LIMIT};
use crate::error::ProbeError;
use crate::types::{NetworkInfo, SignerAccount};
use ethers::prelude::*;
use std::io::Write;
use std::time::Duration;
use tracing::info;

/// What a completed run observed, for the operation log.
#[derive(Debug, Clone)]
pub struct ProbeSummary {
    pub network: NetworkInfo,
    pub gas_price: U256,
    pub endpoint: String,
    pub account: Option<SignerAccount>,
    pub tx_hash: Option<TxHash>,
}

/// Run the probe against `client`, writing the operator report to `out`.
///
/// The transfer steps run only when `config.nonce_bump` is set, and at most
/// one transfer is submitted per call. The completion marker is written only
/// after every executed step succeeded, which for the nonce-bump variant
/// means a confirmation was observed for the submitted transfer.
pub async fn run<C, W>(
    client: &C,
    config: &ProbeConfig,
    out: &mut W,
) -> Result<ProbeSummary, ProbeError>
where
    C: ChainClient + Sync,
    W: Write,
{
    let network = client.network_info().await?;
    writeln!(out, "Name: {}", network.name)?;
    writeln!(out, "ChainID: {}", network.chain_id)?;

    let gas_price = client.gas_price().await?;
    writeln!(out, "GasPrice: {}", gas_price)?;

    let endpoint = client.endpoint_url().to_string();
    writeln!(out, "URL: {}", endpoint)?;

    let mut summary = ProbeSummary {
        network,
        gas_price,
        endpoint,
        account: None,
        tx_hash: None,
    };

    if !config.nonce_bump {
        writeln!(out, "Done!")?;
        return Ok(summary);
    }

    let signers = client.signer_addresses().await?;
    let address = signers
        .get(config.signer_index)
        .copied()
        .ok_or(ProbeError::SignerUnavailable {
            index: config.signer_index,
        })?;
    writeln!(out, "Address: {:?}", address)?;

    let balance = client.balance(address).await?;
    writeln!(out, "Balance: {}", balance)?;
    summary.account = Some(SignerAccount {
        index: config.signer_index,
        address,
        balance,
    });

    let required = config.transfer_value + gas_price * U256::from(TRANSFER_GAS_LIMIT);
    if balance < required {
        return Err(ProbeError::InsufficientFunds(format!(
            "balance {} wei, need {} wei",
            balance, required
        )));
    }

    writeln!(
        out,
        "Sending {} wei to {:?} so the sender nonce is no longer zero...",
        config.transfer_value, config.recipient
    )?;
    let tx_hash = client
        .submit_transfer(config.signer_index, config.recipient, config.transfer_value)
        .await?;
    summary.tx_hash = Some(tx_hash);
    info!("Transfer submitted: {:?}", tx_hash);

    let confirmation = tokio::time::timeout(
        Duration::from_secs(config.confirmation_timeout_secs),
        client.await_confirmation(tx_hash),
    )
    .await
    .map_err(|_| ProbeError::ConfirmationTimeout {
        timeout_secs: config.confirmation_timeout_secs,
    })??;
    match confirmation.block_number {
        Some(block) => info!("Transfer confirmed in block {}", block),
        None => info!("Transfer confirmed"),
    }

    writeln!(out, "Done!")?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Confirmation;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Stub node with the canned values the QA environment reports.
    struct StubClient {
        name: &'static str,
        chain_id: u64,
        gas_price: U256,
        url: &'static str,
        signers: Vec<Address>,
        balance: U256,
        fail_gas_price: bool,
        confirmation_resolves: bool,
        submit_calls: AtomicUsize,
        confirm_calls: AtomicUsize,
        submitted: Mutex<Vec<(usize, Address, U256)>>,
    }

    impl StubClient {
        fn testnet() -> Self {
            Self {
                name: "testnet",
                chain_id: 1337,
                gas_price: U256::from(1_000_000_000u64),
                url: "http://localhost:8545",
                signers: vec![Address::repeat_byte(0xab)],
                balance: U256::from_dec_str("5000000000000000000").unwrap(),
                fail_gas_price: false,
                confirmation_resolves: true,
                submit_calls: AtomicUsize::new(0),
                confirm_calls: AtomicUsize::new(0),
                submitted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChainClient for StubClient {
        async fn network_info(&self) -> Result<NetworkInfo, ProbeError> {
            Ok(NetworkInfo {
                name: self.name.to_string(),
                chain_id: self.chain_id,
            })
        }

        async fn gas_price(&self) -> Result<U256, ProbeError> {
            if self.fail_gas_price {
                return Err(ProbeError::Query("gas price unavailable".to_string()));
            }
            Ok(self.gas_price)
        }

        fn endpoint_url(&self) -> &str {
            self.url
        }

        async fn signer_addresses(&self) -> Result<Vec<Address>, ProbeError> {
            Ok(self.signers.clone())
        }

        async fn balance(&self, _address: Address) -> Result<U256, ProbeError> {
            Ok(self.balance)
        }

        async fn submit_transfer(
            &self,
            signer_index: usize,
            to: Address,
            value: U256,
        ) -> Result<TxHash, ProbeError> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            self.submitted
                .lock()
                .unwrap()
                .push((signer_index, to, value));
            Ok(TxHash::repeat_byte(0x42))
        }

        async fn await_confirmation(&self, _tx_hash: TxHash) -> Result<Confirmation, ProbeError> {
            if !self.confirmation_resolves {
                std::future::pending::<()>().await;
            }
            // One suspension before the receipt appears
            tokio::task::yield_now().await;
            self.confirm_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Confirmation {
                block_number: Some(7),
                gas_used: 21_000,
            })
        }
    }

    fn test_config(nonce_bump: bool) -> ProbeConfig {
        let mut config = ProbeConfig::new("http://localhost:8545".to_string(), 1337);
        config.nonce_bump = nonce_bump;
        config
    }

    fn run_lines(out: &[u8]) -> Vec<String> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    // ==================== short variant tests ====================

    #[tokio::test]
    async fn test_short_variant_reports_fields_in_order() {
        let client = StubClient::testnet();
        let mut out = Vec::new();

        run(&client, &test_config(false), &mut out).await.unwrap();

        let lines = run_lines(&out);
        assert_eq!(
            lines,
            vec![
                "Name: testnet",
                "ChainID: 1337",
                "GasPrice: 1000000000",
                "URL: http://localhost:8545",
                "Done!",
            ]
        );
    }

    #[tokio::test]
    async fn test_short_variant_never_submits() {
        let client = StubClient::testnet();
        let mut out = Vec::new();

        run(&client, &test_config(false), &mut out).await.unwrap();

        assert_eq!(client.submit_calls.load(Ordering::SeqCst), 0);
        assert_eq!(client.confirm_calls.load(Ordering::SeqCst), 0);
    }

    // ==================== extended variant tests ====================

    #[tokio::test]
    async fn test_extended_variant_submits_exactly_one_wei_transfer() {
        let client = StubClient::testnet();
        let config = test_config(true);
        let mut out = Vec::new();

        let summary = run(&client, &config, &mut out).await.unwrap();

        assert_eq!(client.submit_calls.load(Ordering::SeqCst), 1);
        let submitted = client.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        let (index, to, value) = submitted[0];
        assert_eq!(index, 0);
        assert_eq!(to, config.recipient);
        assert_eq!(value, U256::one());
        assert_eq!(summary.tx_hash, Some(TxHash::repeat_byte(0x42)));
    }

    #[tokio::test]
    async fn test_extended_variant_reports_account_then_completion() {
        let client = StubClient::testnet();
        let mut out = Vec::new();

        run(&client, &test_config(true), &mut out).await.unwrap();

        let lines = run_lines(&out);
        assert_eq!(lines[0], "Name: testnet");
        assert_eq!(lines[1], "ChainID: 1337");
        assert_eq!(lines[2], "GasPrice: 1000000000");
        assert_eq!(lines[3], "URL: http://localhost:8545");
        assert_eq!(
            lines[4],
            "Address: 0xabababababababababababababababababababab"
        );
        assert_eq!(lines[5], "Balance: 5000000000000000000");
        assert_eq!(lines.last().unwrap(), "Done!");
    }

    #[tokio::test]
    async fn test_completion_marker_only_after_confirmation() {
        let client = StubClient::testnet();
        let mut out = Vec::new();

        run(&client, &test_config(true), &mut out).await.unwrap();

        // The confirmation was observed, and the marker is the final line.
        assert_eq!(client.confirm_calls.load(Ordering::SeqCst), 1);
        assert_eq!(run_lines(&out).last().unwrap(), "Done!");
    }

    #[tokio::test]
    async fn test_no_signer_aborts_before_transfer() {
        let mut client = StubClient::testnet();
        client.signers.clear();
        let mut out = Vec::new();

        let result = run(&client, &test_config(true), &mut out).await;

        assert!(matches!(
            result,
            Err(ProbeError::SignerUnavailable { index: 0 })
        ));
        assert_eq!(client.submit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_insufficient_balance_aborts_before_transfer() {
        let mut client = StubClient::testnet();
        // Covers the 1 wei value but not the fee
        client.balance = U256::from(100u64);
        let mut out = Vec::new();

        let result = run(&client, &test_config(true), &mut out).await;

        assert!(matches!(result, Err(ProbeError::InsufficientFunds(_))));
        assert_eq!(client.submit_calls.load(Ordering::SeqCst), 0);
        let lines = run_lines(&out);
        assert!(!lines.iter().any(|l| l == "Done!"));
    }

    #[tokio::test]
    async fn test_query_failure_aborts_remaining_steps() {
        let mut client = StubClient::testnet();
        client.fail_gas_price = true;
        let mut out = Vec::new();

        let result = run(&client, &test_config(true), &mut out).await;

        assert!(matches!(result, Err(ProbeError::Query(_))));
        let lines = run_lines(&out);
        assert_eq!(lines, vec!["Name: testnet", "ChainID: 1337"]);
        assert_eq!(client.submit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfirmed_transfer_times_out() {
        let mut client = StubClient::testnet();
        client.confirmation_resolves = false;
        let config = test_config(true);
        let mut out = Vec::new();

        let result = run(&client, &config, &mut out).await;

        assert!(matches!(
            result,
            Err(ProbeError::ConfirmationTimeout { timeout_secs }) if timeout_secs == config.confirmation_timeout_secs
        ));
        assert_eq!(client.submit_calls.load(Ordering::SeqCst), 1);
        assert!(!run_lines(&out).iter().any(|l| l == "Done!"));
    }
}
