use alloy::primitives::U256;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Decimals of the native token on layer 2 (pCKB).
pub const NATIVE_DECIMALS: u8 = 18;
/// Decimals of CKB capacity on layer 1 (shannons).
pub const LAYER1_CAPACITY_DECIMALS: u8 = 8;

/// The backend sends counters either as JSON numbers or as decimal strings.
/// Booleans, arrays and objects land in `Other` so one bad field cannot fail
/// the record around it.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
    Other(Value),
}

impl StringOrNumber {
    fn into_u64(self) -> Option<u64> {
        match self {
            Self::Unsigned(n) => Some(n),
            Self::Signed(n) => u64::try_from(n).ok(),
            // 2^64 itself is already out of range
            Self::Float(f) if f.is_finite() && f >= 0.0 && f < U64_LIMIT && f.fract() == 0.0 => {
                Some(f as u64)
            }
            Self::Float(_) => None,
            Self::Text(s) => parse_count(&s),
            Self::Other(value) => {
                warn!("Expected a counter, got {}", value);
                None
            }
        }
    }

    fn into_numeric_string(self) -> Option<String> {
        match self {
            Self::Unsigned(n) => Some(n.to_string()),
            Self::Signed(n) => Some(n.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.trim().to_string()),
            Self::Other(value) => {
                warn!("Expected a numeric string, got {}", value);
                None
            }
        }
    }
}

const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Parses a decimal counter, tolerating surrounding whitespace.
pub fn parse_count(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<u64>().ok()
}

/// Lenient `u64`: accepts numbers, numeric strings and null. Anything else is 0.
pub fn de_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_opt_u64(deserializer)?.unwrap_or_default())
}

pub fn de_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.and_then(|v| {
        let parsed = v.into_u64();
        if parsed.is_none() {
            warn!("Discarding non-numeric counter value from backend");
        }
        parsed
    }))
}

/// Numbers and strings both end up as a trimmed decimal string.
pub fn de_numeric_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_opt_numeric_string(deserializer)?.unwrap_or_else(|| "0".to_string()))
}

pub fn de_opt_numeric_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.and_then(StringOrNumber::into_numeric_string))
}

/// Which decimal model an amount is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "class", content = "decimal")]
pub enum TokenClass {
    /// pCKB balances on layer 2.
    Native,
    /// CKB capacity carried by layer-1 cells.
    Layer1Capacity,
    /// A user-defined token with its own decimal.
    Udt(u8),
}

impl TokenClass {
    pub fn decimals(&self) -> u8 {
        match self {
            Self::Native => NATIVE_DECIMALS,
            Self::Layer1Capacity => LAYER1_CAPACITY_DECIMALS,
            Self::Udt(decimal) => *decimal,
        }
    }
}

/// Groups the digits of an integer string by thousands: `1234567` -> `1,234,567`.
pub fn format_int(value: &str) -> String {
    let value = value.trim();
    let (sign, digits) = match value.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", value),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return value.to_string();
    }

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}", sign, grouped)
}

/// Scales an amount in base units into a human readable decimal string.
pub fn format_amount(raw: &str, class: TokenClass) -> Result<String> {
    let raw = raw.trim();
    let amount = if raw.is_empty() {
        U256::ZERO
    } else {
        raw.parse::<U256>()
            .map_err(|e| anyhow!("Invalid amount '{}': {}", raw, e))?
    };

    let decimals = class.decimals();
    if decimals == 0 {
        return Ok(format_int(&amount.to_string()));
    }
    if decimals > 77 {
        return Err(anyhow!("Unsupported decimal count: {}", decimals));
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let int = amount / divisor;
    let frac = amount % divisor;

    let int = format_int(&int.to_string());
    if frac.is_zero() {
        return Ok(int);
    }

    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    Ok(format!("{}.{}", int, frac.trim_end_matches('0')))
}
