//! One-shot JSON-RPC diagnostic probe for EVM QA networks.

pub mod client;
pub mod config;
pub mod error;
pub mod operation_log;
pub mod probe;
pub mod settings;
pub mod signers;
pub mod types;
pub mod utils;
