//! Per-item adapters for list pages. Each raw record is copied field for
//! field into its camelCase counterpart; nothing is dropped.

use serde::{Deserialize, Serialize};

use super::numeric::{de_numeric_string, de_opt_numeric_string, de_opt_u64, de_u64};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Committed,
    Finalized,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    pub hash: String,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub block_number: Option<u64>,
    #[serde(default, deserialize_with = "de_u64")]
    pub timestamp: u64,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default, deserialize_with = "de_numeric_string")]
    pub value: String,
    #[serde(rename = "type", default)]
    pub tx_type: Option<String>,
    #[serde(default = "default_status")]
    pub status: TxStatus,
    #[serde(default)]
    pub is_success: Option<bool>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub nonce: Option<u64>,
}

fn default_status() -> TxStatus {
    TxStatus::Unknown
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    pub block_hash: Option<String>,
    pub block_number: Option<u64>,
    pub timestamp: u64,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    pub status: TxStatus,
    pub is_success: Option<bool>,
    pub method: Option<String>,
    pub nonce: Option<u64>,
}

impl From<RawTransaction> for Transaction {
    fn from(raw: RawTransaction) -> Self {
        Self {
            hash: raw.hash,
            block_hash: raw.block_hash,
            block_number: raw.block_number,
            timestamp: raw.timestamp,
            from: raw.from,
            to: raw.to,
            value: raw.value,
            tx_type: raw.tx_type,
            status: raw.status,
            is_success: raw.is_success,
            method: raw.method,
            nonce: raw.nonce,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeDirection {
    Deposit,
    Withdrawal,
}

/// A deposit or withdrawal row, flat as the REST endpoint returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBridgedRecord {
    #[serde(rename = "type")]
    pub direction: BridgeDirection,
    #[serde(default, deserialize_with = "de_numeric_string")]
    pub value: String,
    #[serde(default, deserialize_with = "de_numeric_string")]
    pub capacity: String,
    #[serde(default, deserialize_with = "de_u64")]
    pub timestamp: u64,
    #[serde(default, alias = "eth_address")]
    pub to: Option<String>,
    #[serde(default)]
    pub is_fast_withdrawal: bool,
    #[serde(default)]
    pub layer1_tx_hash: Option<String>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub layer1_output_index: Option<u64>,
    #[serde(default, alias = "layer2_block_hash")]
    pub block_hash: Option<String>,
    #[serde(default, alias = "layer2_block_number", deserialize_with = "de_opt_u64")]
    pub block_number: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_numeric_string")]
    pub udt_id: Option<String>,
    #[serde(default)]
    pub udt_symbol: Option<String>,
    #[serde(default)]
    pub udt_name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub udt_decimal: Option<u64>,
    #[serde(default)]
    pub udt_icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPoint {
    pub hash: Option<String>,
    pub index: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layer1Link {
    pub output: OutputPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockLink {
    pub hash: Option<String>,
    pub number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenRef {
    pub id: Option<String>,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub decimal: Option<u64>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgedRecord {
    #[serde(rename = "type")]
    pub direction: BridgeDirection,
    pub value: String,
    pub capacity: String,
    pub timestamp: u64,
    pub to: Option<String>,
    pub is_fast_withdrawal: bool,
    pub layer1: Layer1Link,
    pub block: BlockLink,
    pub token: TokenRef,
}

impl BridgedRecord {
    /// Not yet committed on layer 1.
    pub fn is_pending(&self) -> bool {
        self.layer1.output.hash.is_none() || self.timestamp == 0
    }

    /// Link to the layer-1 output on a CKB explorer.
    pub fn layer1_output_url(&self, explorer_url: &str) -> Option<String> {
        let output = &self.layer1.output;
        let hash = output.hash.as_deref()?;
        let mut url = format!("{}/transaction/{}", explorer_url.trim_end_matches('/'), hash);
        if let Some(index) = output.index {
            url.push_str(&format!("#{}", index));
        }
        Some(url)
    }
}

impl From<RawBridgedRecord> for BridgedRecord {
    fn from(raw: RawBridgedRecord) -> Self {
        Self {
            direction: raw.direction,
            value: raw.value,
            capacity: raw.capacity,
            timestamp: raw.timestamp,
            to: raw.to,
            is_fast_withdrawal: raw.is_fast_withdrawal,
            layer1: Layer1Link {
                output: OutputPoint {
                    hash: raw.layer1_tx_hash.filter(|h| !h.is_empty()),
                    index: raw.layer1_output_index,
                },
            },
            block: BlockLink {
                hash: raw.block_hash.filter(|h| !h.is_empty()),
                number: raw.block_number,
            },
            token: TokenRef {
                id: raw.udt_id,
                symbol: raw.udt_symbol,
                name: raw.udt_name,
                decimal: raw.udt_decimal,
                icon: raw.udt_icon,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCollectionAccount {
    #[serde(default)]
    pub eth_address: Option<String>,
    #[serde(default)]
    pub bit_alias: Option<String>,
}

/// An entry of the `erc721_udts` GraphQL list.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNftCollection {
    #[serde(deserialize_with = "de_numeric_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub account: Option<RawCollectionAccount>,
    #[serde(default, deserialize_with = "de_u64")]
    pub holders_count: u64,
    #[serde(default, deserialize_with = "de_u64")]
    pub minted_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionAccount {
    pub eth_address: Option<String>,
    pub bit_alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NftCollection {
    pub id: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub icon: Option<String>,
    pub account: CollectionAccount,
    pub holders_count: u64,
    pub minted_count: u64,
}

impl From<RawNftCollection> for NftCollection {
    fn from(raw: RawNftCollection) -> Self {
        let account = raw.account.unwrap_or_default();
        Self {
            id: raw.id,
            name: raw.name,
            symbol: raw.symbol,
            icon: raw.icon,
            account: CollectionAccount {
                eth_address: account.eth_address,
                bit_alias: account.bit_alias,
            },
            holders_count: raw.holders_count,
            minted_count: raw.minted_count,
        }
    }
}
