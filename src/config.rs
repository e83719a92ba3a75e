use anyhow::Result;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use std::env;
use std::sync::{Arc, OnceLock};
use url::Url;

/// A predefined EVM-compatible network with label, chain ID, native token, and default RPC.
#[derive(Clone, Debug)]
pub struct EvmNetwork {
    pub label: &'static str,
    pub chain_id: u64,
    pub native_token: &'static str,
    pub default_rpc: &'static str,
}

impl EvmNetwork {
    pub const fn new(
        label: &'static str,
        chain_id: u64,
        native_token: &'static str,
        default_rpc: &'static str,
    ) -> Self {
        Self {
            label,
            chain_id,
            native_token,
            default_rpc,
        }
    }
}

/// Networks the QA fixtures are run against, plus the usual local dev chains.
pub const NETWORKS: &[EvmNetwork] = &[
    EvmNetwork::new("Localhost", 1337, "ETH", "http://localhost:8545"),
    EvmNetwork::new("Hardhat", 31337, "ETH", "http://localhost:8545"),
    EvmNetwork::new("Ethereum", 1, "ETH", "https://ethereum-rpc.publicnode.com"),
    EvmNetwork::new("Sepolia", 11155111, "ETH", "https://ethereum-sepolia-rpc.publicnode.com"),
    EvmNetwork::new("Holesky", 17000, "ETH", "https://ethereum-holesky-rpc.publicnode.com"),
    EvmNetwork::new("Optimism", 10, "ETH", "https://mainnet.optimism.io"),
    EvmNetwork::new("Base", 8453, "ETH", "https://mainnet.base.org"),
    EvmNetwork::new("Polygon", 137, "POL", "https://polygon-rpc.com"),
    EvmNetwork::new("Gnosis Chain", 100, "xDAI", "https://rpc.gnosischain.com"),
    EvmNetwork::new("BNB Chain", 56, "BNB", "https://bsc-dataseed.binance.org"),
    EvmNetwork::new("Avalanche C-Chain", 43114, "AVAX", "https://avalanche-c-chain-rpc.publicnode.com"),
];

/// Find a network by chain ID
pub fn find_network_by_chain_id(chain_id: u64) -> Option<&'static EvmNetwork> {
    NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// Network display name for a chain ID, "unknown" for chains not in the table
/// (same resolution ethers.js applies to unrecognized chain IDs).
pub fn network_name(chain_id: u64) -> &'static str {
    find_network_by_chain_id(chain_id)
        .map(|n| n.label)
        .unwrap_or("unknown")
}

/// Recipient of the nonce-bump transfer. Any throwaway address works; this one
/// is kept stable so QA fixtures can recognize probe traffic on their chains.
pub const NONCE_BUMP_RECIPIENT: &str = "0xB791896a7C0685122AdCB77A350A6C73cefbDfdA";

/// Cached parsed recipient address (parsed once at first access)
static NONCE_BUMP_RECIPIENT_PARSED: OnceLock<Address> = OnceLock::new();

/// Get the parsed default recipient, parsing it once and caching
pub fn nonce_bump_recipient() -> Address {
    *NONCE_BUMP_RECIPIENT_PARSED.get_or_init(|| {
        NONCE_BUMP_RECIPIENT
            .parse()
            .expect("NONCE_BUMP_RECIPIENT constant is invalid - this is a programming error")
    })
}

/// The transfer moves the minimal positive value so probe runs do not perturb
/// balances the QA fixtures depend on.
pub const NONCE_BUMP_VALUE_WEI: u64 = 1;

/// Gas limit of a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Wait this long for the transfer to be mined before giving up.
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 90;

/// Upper bound on the whole run, connection attempts included.
pub const DEFAULT_RUN_DEADLINE_SECS: u64 = 180;

#[derive(Clone, Debug)]
pub struct ProbeConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Which entry of the configured signer set submits the transfer.
    pub signer_index: usize,
    pub recipient: Address,
    pub transfer_value: U256,
    pub confirmation_timeout_secs: u64,
    pub run_deadline_secs: u64,
    /// Run the nonce-bump steps (signer report + transfer) in addition to the
    /// read-only report.
    pub nonce_bump: bool,
}

impl ProbeConfig {
    pub fn new(rpc_url: String, chain_id: u64) -> Self {
        let confirmation_timeout_secs = env::var("CONFIRMATION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CONFIRMATION_TIMEOUT_SECS);

        let run_deadline_secs = env::var("RUN_DEADLINE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RUN_DEADLINE_SECS);

        let recipient = env::var("NONCE_BUMP_RECIPIENT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(nonce_bump_recipient);

        Self {
            rpc_url,
            chain_id,
            signer_index: 0,
            recipient,
            transfer_value: U256::from(NONCE_BUMP_VALUE_WEI),
            confirmation_timeout_secs,
            run_deadline_secs,
            nonce_bump: false,
        }
    }

    pub fn from_network(network: &EvmNetwork) -> Self {
        Self::new(network.default_rpc.to_string(), network.chain_id)
    }

    pub fn native_token(&self) -> &str {
        find_network_by_chain_id(self.chain_id)
            .map(|n| n.native_token)
            .unwrap_or("ETH")
    }

    pub fn network_label(&self) -> &str {
        network_name(self.chain_id)
    }

    pub async fn get_provider(&self) -> Result<Arc<Provider<Http>>> {
        let url = Url::parse(&self.rpc_url)?;
        let provider = Provider::<Http>::try_from(url.as_str())?;
        Ok(Arc::new(provider))
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        // Default to the local dev chain the QA environment runs on
        if let Some(local) = find_network_by_chain_id(1337) {
            Self::from_network(local)
        } else {
            Self::new("http://localhost:8545".to_string(), 1337)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== network table tests ====================

    #[test]
    fn test_find_network_by_chain_id_localhost() {
        let network = find_network_by_chain_id(1337);
        assert!(network.is_some());
        let network = network.unwrap();
        assert_eq!(network.label, "Localhost");
        assert_eq!(network.default_rpc, "http://localhost:8545");
    }

    #[test]
    fn test_find_network_by_chain_id_sepolia() {
        let network = find_network_by_chain_id(11155111);
        assert!(network.is_some());
        assert_eq!(network.unwrap().label, "Sepolia");
    }

    #[test]
    fn test_find_network_by_chain_id_not_found() {
        let network = find_network_by_chain_id(999999);
        assert!(network.is_none());
    }

    #[test]
    fn test_network_name_known() {
        assert_eq!(network_name(31337), "Hardhat");
        assert_eq!(network_name(1), "Ethereum");
    }

    #[test]
    fn test_network_name_unknown_chain() {
        assert_eq!(network_name(999999), "unknown");
    }

    // ==================== constants tests ====================

    #[test]
    fn test_nonce_bump_recipient_parses() {
        let addr = nonce_bump_recipient();
        assert_eq!(format!("{:?}", addr), NONCE_BUMP_RECIPIENT.to_lowercase());
    }

    #[test]
    fn test_nonce_bump_value_is_minimal() {
        assert_eq!(NONCE_BUMP_VALUE_WEI, 1);
    }

    // ==================== ProbeConfig tests ====================

    #[test]
    fn test_config_native_token_builtin() {
        let config = ProbeConfig::new("https://polygon-rpc.com".to_string(), 137);
        assert_eq!(config.native_token(), "POL");
    }

    #[test]
    fn test_config_native_token_unknown_defaults_to_eth() {
        let config = ProbeConfig::new("https://example.com".to_string(), 999999);
        assert_eq!(config.native_token(), "ETH");
    }

    #[test]
    fn test_config_network_label_unknown() {
        let config = ProbeConfig::new("https://example.com".to_string(), 999999);
        assert_eq!(config.network_label(), "unknown");
    }

    #[test]
    fn test_config_default_targets_local_dev_chain() {
        let config = ProbeConfig::default();
        assert_eq!(config.chain_id, 1337);
        assert_eq!(config.signer_index, 0);
        assert!(!config.nonce_bump);
        assert_eq!(config.transfer_value, U256::from(1u64));
    }

    #[test]
    fn test_config_from_network() {
        let network = find_network_by_chain_id(31337).unwrap();
        let config = ProbeConfig::from_network(network);
        assert_eq!(config.chain_id, 31337);
        assert_eq!(config.rpc_url, "http://localhost:8545");
    }
}
