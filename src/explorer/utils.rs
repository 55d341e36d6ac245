use alloy::primitives::{Address, B256};
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Validates and normalizes an eth address
pub fn validate_address(address: &str) -> Result<Address> {
    let address = address.trim();

    if address.is_empty() {
        return Err(anyhow!("Address cannot be empty"));
    }

    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(anyhow!(
            "Invalid address format: '{}'. Eth addresses must start with '0x'",
            address
        ));
    }

    if address.len() != 42 {
        return Err(anyhow!(
            "Invalid address length: '{}'. Eth addresses must be exactly 42 characters (0x + 40 hex characters)",
            address
        ));
    }

    let hex_part = &address[2..];
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!(
            "Invalid address format: '{}'. Contains non-hexadecimal characters",
            address
        ));
    }

    // Mixed case input is accepted without enforcing the checksum
    Address::from_str(&format!("0x{}", hex_part.to_lowercase()))
        .map_err(|e| anyhow!("Invalid eth address: '{}'. Error: {}", address, e))
}

/// Validates a 32-byte script hash and returns its bytes
pub fn validate_script_hash(hash: &str) -> Result<[u8; 32]> {
    let hash = hash.trim();

    let hex_part = hash
        .strip_prefix("0x")
        .or_else(|| hash.strip_prefix("0X"))
        .ok_or_else(|| anyhow!("Invalid script hash: '{}'. Script hashes must start with '0x'", hash))?;

    if hex_part.len() != 64 {
        return Err(anyhow!(
            "Invalid script hash length: '{}'. Script hashes must be 0x + 64 hex characters",
            hash
        ));
    }

    let bytes = hex::decode(hex_part)
        .map_err(|e| anyhow!("Invalid script hash: '{}'. Error: {}", hash, e))?;

    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Validates a 32-byte eth transaction hash
pub fn validate_tx_hash(hash: &str) -> Result<B256> {
    let hash = hash.trim();
    if hash.len() != 66 || !(hash.starts_with("0x") || hash.starts_with("0X")) {
        return Err(anyhow!(
            "Invalid transaction hash: '{}'. Expected 0x + 64 hex characters",
            hash
        ));
    }
    B256::from_str(&hash[2..])
        .map_err(|e| anyhow!("Invalid transaction hash: '{}'. Error: {}", hash, e))
}

/// Creates user-friendly error messages for common backend errors
pub fn interpret_fetch_error(error: &str) -> String {
    if error.contains("connection refused")
        || error.contains("network unreachable")
        || error.contains("error sending request")
    {
        "Network error: Cannot connect to the explorer backend. Check the configured GraphQL/REST URLs and your connection.".to_string()
    } else if error.contains("timed out") || error.contains("timeout") {
        "Network error: Request timed out. The explorer backend may be overloaded or unreachable."
            .to_string()
    } else if error.contains("429") || error.contains("rate limit") {
        "Rate limit error: Too many requests to the explorer backend. Try again in a few moments."
            .to_string()
    } else if error.contains("404") {
        "Not found: The explorer backend does not serve this endpoint. Check the REST URL."
            .to_string()
    } else if error.contains("error decoding response body") || error.contains("expected") {
        format!("Decode error: Unexpected response shape from the explorer backend. {}", error)
    } else {
        format!("Backend error: {}", error)
    }
}
