//! Local signer set for the probe transfer.
//!
//! Signers come from the ambient environment, the same way the QA fixtures
//! configure their nodes: `PRIVATE_KEYS` (comma-separated hex keys, in order)
//! or `MNEMONIC` (HD derivation over `m/44'/60'/0'/0/{i}`). An empty set is
//! not an error here; the probe reports it only if the transfer step needs a
//! signer.

use anyhow::{anyhow, Context, Result};
use ethers::signers::coins_bip39::English;
use ethers::signers::{LocalWallet, MnemonicBuilder};
use std::env;

/// BIP-44 coin type for Ethereum (used for all EVM chains for compatibility)
pub const DEFAULT_COIN_TYPE: u32 = 60;

/// Address-index derivation path: account fixed at 0, address index varies.
pub fn derivation_path(index: u32) -> String {
    format!("m/44'/{}'/0'/0/{}", DEFAULT_COIN_TYPE, index)
}

/// Load the ordered signer set from the environment.
///
/// `PRIVATE_KEYS` wins over `MNEMONIC` when both are set. With a mnemonic,
/// wallets are derived for indices `0..=max_index`. Neither being set yields
/// an empty signer set.
pub fn load_signer_set(max_index: usize) -> Result<Vec<LocalWallet>> {
    if let Ok(keys) = env::var("PRIVATE_KEYS") {
        return parse_private_keys(&keys);
    }
    if let Ok(mnemonic) = env::var("MNEMONIC") {
        return derive_from_mnemonic(&mnemonic, max_index);
    }
    Ok(Vec::new())
}

/// Parse a comma-separated list of hex private keys, preserving order.
pub fn parse_private_keys(keys: &str) -> Result<Vec<LocalWallet>> {
    let mut wallets = Vec::new();
    for (i, key) in keys.split(',').map(str::trim).enumerate() {
        if key.is_empty() {
            continue;
        }
        let wallet: LocalWallet = key
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| anyhow!("invalid private key at position {}: {}", i, e))?;
        wallets.push(wallet);
    }
    Ok(wallets)
}

/// Derive wallets for indices `0..=max_index` from a BIP-39 phrase.
pub fn derive_from_mnemonic(mnemonic: &str, max_index: usize) -> Result<Vec<LocalWallet>> {
    let phrase = mnemonic.trim();
    if phrase.is_empty() {
        return Err(anyhow!("MNEMONIC is set but empty"));
    }

    let mut wallets = Vec::new();
    for index in 0..=max_index as u32 {
        let path = derivation_path(index);
        let wallet = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .derivation_path(&path)
            .with_context(|| format!("invalid derivation path {}", path))?
            .build()
            .with_context(|| format!("failed to derive wallet at {}", path))?;
        wallets.push(wallet);
    }
    Ok(wallets)
}
