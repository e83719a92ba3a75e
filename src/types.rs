//! Common types shared across modules.

use ethers::prelude::*;

/// Identity of the connected network, as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub name: String,
    pub chain_id: u64,
}

/// Confirmation that a submitted transfer was mined.
#[derive(Debug, Clone, Default)]
pub struct Confirmation {
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Address and balance info for a resolved signer.
#[derive(Debug, Clone)]
pub struct SignerAccount {
    pub index: usize,
    pub address: Address,
    pub balance: U256,
}
