use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::numeric::de_u64;
use super::{MetaContractScript, Script, SmartContract, UdtInfo};
use crate::explorer::utils;

/// Account kinds known to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    EthUser,
    EthAddrReg,
    PolyjuiceCreator,
    PolyjuiceContract,
    Udt,
    MetaContract,
    Unknown,
}

impl AccountType {
    /// Parses the backend discriminant. Accepts `ETH_USER` as well as `eth_user`.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ETH_USER" => Some(Self::EthUser),
            "ETH_ADDR_REG" => Some(Self::EthAddrReg),
            "POLYJUICE_CREATOR" => Some(Self::PolyjuiceCreator),
            "POLYJUICE_CONTRACT" => Some(Self::PolyjuiceContract),
            "UDT" => Some(Self::Udt),
            "META_CONTRACT" => Some(Self::MetaContract),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// The key an account was looked up by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountQuery {
    Address(String),
    ScriptHash(String),
}

impl AccountQuery {
    /// Classifies a user supplied key as an eth address or a script hash.
    pub fn parse(key: &str) -> Result<Self> {
        let key = key.trim();
        if utils::validate_address(key).is_ok() {
            return Ok(Self::Address(key.to_lowercase()));
        }
        if utils::validate_script_hash(key).is_ok() {
            return Ok(Self::ScriptHash(key.to_lowercase()));
        }
        Err(anyhow!(
            "Invalid account key: '{}'. Expected an eth address (0x + 40 hex characters) or a script hash (0x + 64 hex characters)",
            key
        ))
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            Self::Address(address) => Some(address),
            Self::ScriptHash(_) => None,
        }
    }

    pub fn script_hash(&self) -> Option<&str> {
        match self {
            Self::Address(_) => None,
            Self::ScriptHash(hash) => Some(hash),
        }
    }

    /// GraphQL variables for the `account(input: ...)` query.
    pub fn variables(&self) -> Value {
        match self {
            Self::Address(address) => serde_json::json!({ "address": address }),
            Self::ScriptHash(hash) => serde_json::json!({ "script_hash": hash }),
        }
    }
}

/// An account record exactly as the backend returns it.
///
/// Sub-objects are kept as raw JSON: which of them are trusted depends on the
/// discriminant, and a malformed object of another variant must not break the
/// whole record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAccount {
    /// Kept untyped so a non-string discriminant still reaches `resolve`.
    #[serde(rename = "type", default)]
    pub account_type: Option<Value>,
    #[serde(default)]
    pub eth_address: Option<String>,
    #[serde(default)]
    pub script_hash: Option<String>,
    #[serde(default, deserialize_with = "de_u64")]
    pub transaction_count: u64,
    #[serde(default, deserialize_with = "de_u64")]
    pub nonce: u64,
    #[serde(default)]
    pub script: Option<Value>,
    #[serde(default)]
    pub udt: Option<Value>,
    #[serde(default)]
    pub smart_contract: Option<Value>,
}

/// Fields shared by every account variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBase {
    pub eth_address: Option<String>,
    pub script_hash: String,
    pub transaction_count: u64,
    pub nonce: u64,
}

/// A resolved account. Only the payload of the active kind is reachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountVariant {
    EthUser {
        #[serde(flatten)]
        base: AccountBase,
        script: Script,
    },
    EthAddrReg {
        #[serde(flatten)]
        base: AccountBase,
        script: Script,
    },
    PolyjuiceCreator {
        #[serde(flatten)]
        base: AccountBase,
        script: Script,
    },
    PolyjuiceContract {
        #[serde(flatten)]
        base: AccountBase,
        script: Script,
        #[serde(rename = "smartContract")]
        smart_contract: Option<SmartContract>,
        udt: Option<UdtInfo>,
    },
    Udt {
        #[serde(flatten)]
        base: AccountBase,
        script: Script,
        udt: Option<UdtInfo>,
    },
    MetaContract {
        #[serde(flatten)]
        base: AccountBase,
        script: MetaContractScript,
    },
    Unknown {
        #[serde(flatten)]
        base: AccountBase,
    },
}

impl AccountVariant {
    /// The placeholder for a key the backend has no record of.
    pub fn unknown_for(query: &AccountQuery) -> Self {
        Self::Unknown {
            base: AccountBase {
                eth_address: query.address().map(str::to_string),
                script_hash: query.script_hash().unwrap_or_default().to_string(),
                transaction_count: 0,
                nonce: 0,
            },
        }
    }

    pub fn account_type(&self) -> AccountType {
        match self {
            Self::EthUser { .. } => AccountType::EthUser,
            Self::EthAddrReg { .. } => AccountType::EthAddrReg,
            Self::PolyjuiceCreator { .. } => AccountType::PolyjuiceCreator,
            Self::PolyjuiceContract { .. } => AccountType::PolyjuiceContract,
            Self::Udt { .. } => AccountType::Udt,
            Self::MetaContract { .. } => AccountType::MetaContract,
            Self::Unknown { .. } => AccountType::Unknown,
        }
    }

    pub fn base(&self) -> &AccountBase {
        match self {
            Self::EthUser { base, .. }
            | Self::EthAddrReg { base, .. }
            | Self::PolyjuiceCreator { base, .. }
            | Self::PolyjuiceContract { base, .. }
            | Self::Udt { base, .. }
            | Self::MetaContract { base, .. }
            | Self::Unknown { base } => base,
        }
    }

    /// Number of transactions to display. The nonce can run ahead of the
    /// indexed transaction count while transactions are pending.
    pub fn activity_count(&self) -> u64 {
        let base = self.base();
        base.nonce.max(base.transaction_count)
    }

    /// A contract counts as verified once its ABI has been published.
    pub fn is_verified(&self) -> bool {
        match self {
            Self::PolyjuiceContract {
                smart_contract: Some(contract),
                ..
            } => matches!(&contract.abi, Some(abi) if !abi.is_null()),
            _ => false,
        }
    }

    /// Hash of the transaction that deployed a Polyjuice contract, if known.
    pub fn deployment_tx_hash(&self) -> Option<&str> {
        match self {
            Self::PolyjuiceContract {
                smart_contract: Some(contract),
                ..
            } => contract
                .deployment_tx_hash
                .as_deref()
                .filter(|hash| !hash.is_empty()),
            _ => None,
        }
    }
}

/// Turns a raw backend record into a typed account variant.
///
/// Never fails: a missing record, an unrecognised discriminant or a malformed
/// variant payload all yield `AccountVariant::Unknown`.
pub fn resolve(raw: Option<RawAccount>, query: &AccountQuery) -> AccountVariant {
    let Some(raw) = raw else {
        return AccountVariant::unknown_for(query);
    };

    let base = AccountBase {
        eth_address: raw
            .eth_address
            .or_else(|| query.address().map(str::to_string)),
        script_hash: raw
            .script_hash
            .unwrap_or_else(|| query.script_hash().unwrap_or_default().to_string()),
        transaction_count: raw.transaction_count,
        nonce: raw.nonce,
    };

    let kind = match raw.account_type.as_ref().filter(|tag| !tag.is_null()) {
        Some(tag) => match tag.as_str().and_then(AccountType::from_wire) {
            Some(kind) => kind,
            None => {
                warn!(
                    "Unrecognised account type {} for {}, treating as unknown",
                    tag, base.script_hash
                );
                return AccountVariant::Unknown { base };
            }
        },
        None => {
            warn!(
                "Account {} has no type, treating as unknown",
                base.script_hash
            );
            return AccountVariant::Unknown { base };
        }
    };

    let fallback = base.clone();
    let resolved = match kind {
        AccountType::EthUser => required(raw.script, "script")
            .map(|script| AccountVariant::EthUser { base, script }),
        AccountType::EthAddrReg => required(raw.script, "script")
            .map(|script| AccountVariant::EthAddrReg { base, script }),
        AccountType::PolyjuiceCreator => required(raw.script, "script")
            .map(|script| AccountVariant::PolyjuiceCreator { base, script }),
        AccountType::PolyjuiceContract => {
            required(raw.script, "script").map(|script| AccountVariant::PolyjuiceContract {
                base,
                script,
                smart_contract: optional(raw.smart_contract, "smart_contract"),
                udt: optional(raw.udt, "udt"),
            })
        }
        AccountType::Udt => required(raw.script, "script").map(|script| AccountVariant::Udt {
            base,
            script,
            udt: optional(raw.udt, "udt"),
        }),
        AccountType::MetaContract => required(raw.script, "script")
            .map(|script| AccountVariant::MetaContract { base, script }),
        AccountType::Unknown => Ok(AccountVariant::Unknown { base }),
    };

    resolved.unwrap_or_else(|e| {
        warn!(
            "Malformed {:?} account {}: {}, treating as unknown",
            kind, fallback.script_hash, e
        );
        AccountVariant::Unknown { base: fallback }
    })
}

fn required<T: DeserializeOwned>(value: Option<Value>, field: &str) -> Result<T> {
    match value {
        Some(value) if !value.is_null() => serde_json::from_value(value)
            .map_err(|e| anyhow!("invalid {}: {}", field, e)),
        _ => Err(anyhow!("missing {}", field)),
    }
}

fn optional<T: DeserializeOwned>(value: Option<Value>, field: &str) -> Option<T> {
    match value {
        Some(value) if !value.is_null() => match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Ignoring malformed {}: {}", field, e);
                None
            }
        },
        _ => None,
    }
}
