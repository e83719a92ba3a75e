use ethers::prelude::*;

pub fn format_ether(wei: U256) -> String {
    ethers::utils::format_units(wei, "ether").unwrap_or_else(|_| "0.0".to_string())
}

/// Abbreviated `0x1234ab...cdef` form for log lines.
pub fn short_address(address: Address) -> String {
    let addr_str = format!("{:?}", address);
    format!("{}...{}", &addr_str[..8], &addr_str[38..42])
}
