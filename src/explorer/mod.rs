pub mod account;
pub mod client;
pub mod list;
pub mod numeric;
pub mod records;
pub mod utils;

use serde::{Deserialize, Serialize};

use numeric::{de_numeric_string, de_opt_u64};

/// Lock script descriptor attached to most accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub args: String,
    #[serde(alias = "code_hash")]
    pub code_hash: String,
    #[serde(alias = "hash_type")]
    pub hash_type: String,
}

/// Token descriptor carried by UDT accounts and token contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UdtInfo {
    #[serde(deserialize_with = "de_numeric_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub decimal: Option<u64>,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Verification metadata of a Polyjuice contract. Every field may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SmartContract {
    #[serde(default, alias = "deployment_tx_hash")]
    pub deployment_tx_hash: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "compiler_version")]
    pub compiler_version: Option<String>,
    #[serde(default, alias = "compiler_file_format")]
    pub compiler_file_format: Option<String>,
    #[serde(default, alias = "contract_source_code")]
    pub contract_source_code: Option<String>,
    #[serde(default)]
    pub abi: Option<serde_json::Value>,
    #[serde(default, alias = "constructor_arguments")]
    pub constructor_arguments: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaContractStatus {
    Running,
    Halting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMerkleState {
    #[serde(alias = "account_count", deserialize_with = "de_numeric_string")]
    pub account_count: String,
    #[serde(alias = "account_merkle_root")]
    pub account_merkle_root: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMerkleState {
    #[serde(alias = "block_count", deserialize_with = "de_numeric_string")]
    pub block_count: String,
    #[serde(alias = "block_merkle_root")]
    pub block_merkle_root: String,
}

/// The meta-contract's script, extended with the global merkle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaContractScript {
    #[serde(flatten)]
    pub script: Script,
    #[serde(alias = "account_merkle_state")]
    pub account_merkle_state: AccountMerkleState,
    #[serde(alias = "block_merkle_state")]
    pub block_merkle_state: BlockMerkleState,
    #[serde(
        alias = "last_finalized_block_number",
        deserialize_with = "de_numeric_string"
    )]
    pub last_finalized_block_number: String,
    #[serde(alias = "reverted_block_root")]
    pub reverted_block_root: String,
    pub status: MetaContractStatus,
}
