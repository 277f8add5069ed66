//! Line validation and normalization
//!
//! Turns one raw JSONL line into a [`NormalizedRecord`] or a [`SkipReason`].
//!
//! # Field rules
//!
//! - `wallet`: must be a string; lowercased, then required to start with `0x` and be
//!   exactly 42 characters long. Anything else is filtered silently.
//! - `rank`: absent, `null` or falsy values become `0`. Integers, floats (truncated),
//!   booleans and integer strings are accepted. Other values reject the line.
//! - `lifetime` / `months`: absent becomes `{}`; any other value, `null` included, is
//!   stored as canonical compact JSON (object keys sorted, no whitespace). Numbers keep
//!   their source digits, so integers wider than 64 bits survive unchanged.
//!
//! Unrecognized fields are ignored.

use serde_json::{Map, Value};
use thiserror::Error;

/// Required wallet prefix after lowercasing.
pub const WALLET_PREFIX: &str = "0x";

/// Required wallet length in characters, prefix included.
pub const WALLET_LEN: usize = 42;

/// Payload stored when a sub-document is absent.
pub const EMPTY_PAYLOAD: &str = "{}";

/// A validated wallet document, ready to be upserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    wallet: String,
    rank: i64,
    lifetime_json: String,
    months_json: String,
}

impl NormalizedRecord {
    /// Lowercase `0x`-prefixed wallet address (primary key)
    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    pub fn rank(&self) -> i64 {
        self.rank
    }

    /// Canonical JSON of the `lifetime` sub-document
    pub fn lifetime_json(&self) -> &str {
        &self.lifetime_json
    }

    /// Canonical JSON of the `months` sub-document
    pub fn months_json(&self) -> &str {
        &self.months_json
    }
}

/// Why a line produced no record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Empty or whitespace-only line
    #[error("blank line")]
    Blank,

    /// Not parseable as a JSON object
    #[error("line {line} parse error: {message}")]
    MalformedJson { line: u64, message: String },

    /// Wallet missing, not a string, wrong prefix or wrong length
    #[error("invalid wallet format")]
    InvalidWalletFormat,

    /// `rank` present but not coercible to an integer
    #[error("line {line} invalid rank: {value}")]
    InvalidRank { line: u64, value: String },
}

impl SkipReason {
    /// Whether the line should be surfaced as a data error rather than dropped quietly
    pub fn is_reportable(&self) -> bool {
        matches!(self, Self::MalformedJson { .. } | Self::InvalidRank { .. })
    }

    /// Line number for reportable reasons
    pub fn line(&self) -> Option<u64> {
        match self {
            Self::MalformedJson { line, .. } | Self::InvalidRank { line, .. } => Some(*line),
            Self::Blank | Self::InvalidWalletFormat => None,
        }
    }
}

/// Outcome of decoding the `rank` field
#[derive(Debug, PartialEq, Eq)]
enum RankField {
    Absent,
    Valid(i64),
    Invalid,
}

/// Validate one raw input line; `line` is the 1-based line number used in reports
pub fn validate(raw_line: &str, line: u64) -> Result<NormalizedRecord, SkipReason> {
    let trimmed = raw_line.trim();
    if trimmed.is_empty() {
        return Err(SkipReason::Blank);
    }

    let document: Value = serde_json::from_str(trimmed).map_err(|e| SkipReason::MalformedJson {
        line,
        message: e.to_string(),
    })?;

    let fields = match document {
        Value::Object(fields) => fields,
        other => {
            return Err(SkipReason::MalformedJson {
                line,
                message: format!("expected a JSON object, found {}", kind_of(&other)),
            })
        },
    };

    let wallet = decode_wallet(fields.get("wallet")).ok_or(SkipReason::InvalidWalletFormat)?;

    let rank = match decode_rank(fields.get("rank")) {
        RankField::Absent => 0,
        RankField::Valid(rank) => rank,
        RankField::Invalid => {
            return Err(SkipReason::InvalidRank {
                line,
                value: fields.get("rank").map(ToString::to_string).unwrap_or_default(),
            })
        },
    };

    Ok(NormalizedRecord {
        wallet,
        rank,
        lifetime_json: canonical_payload(fields.get("lifetime")),
        months_json: canonical_payload(fields.get("months")),
    })
}

/// Lowercase and check the wallet address; `None` means filter the line
fn decode_wallet(value: Option<&Value>) -> Option<String> {
    let Some(Value::String(raw)) = value else {
        return None;
    };

    let wallet = raw.to_lowercase();
    if wallet.starts_with(WALLET_PREFIX) && wallet.chars().count() == WALLET_LEN {
        Some(wallet)
    } else {
        None
    }
}

fn decode_rank(value: Option<&Value>) -> RankField {
    match value {
        None | Some(Value::Null) => RankField::Absent,
        Some(Value::Bool(flag)) => RankField::Valid(i64::from(*flag)),
        Some(Value::Number(number)) => {
            if let Some(rank) = number.as_i64() {
                RankField::Valid(rank)
            } else if number.is_u64() {
                RankField::Invalid
            } else {
                number
                    .as_f64()
                    .and_then(truncate_float)
                    .map_or(RankField::Invalid, RankField::Valid)
            }
        },
        Some(Value::String(text)) if text.is_empty() => RankField::Absent,
        Some(Value::String(text)) => text
            .trim()
            .parse::<i64>()
            .map_or(RankField::Invalid, RankField::Valid),
        Some(Value::Array(items)) if items.is_empty() => RankField::Absent,
        Some(Value::Object(fields)) if fields.is_empty() => RankField::Absent,
        Some(Value::Array(_)) | Some(Value::Object(_)) => RankField::Invalid,
    }
}

fn truncate_float(value: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let truncated = value.trunc();
    if truncated.is_finite() && truncated >= -LIMIT && truncated < LIMIT {
        Some(truncated as i64)
    } else {
        None
    }
}

/// Compact JSON with object keys sorted at every depth
fn canonical_payload(value: Option<&Value>) -> String {
    match value {
        None => EMPTY_PAYLOAD.to_string(),
        Some(value) => canonicalize(value).to_string(),
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(fields) => {
            let mut entries: Vec<(&String, &Value)> = fields.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            let mut sorted = Map::new();
            for (key, nested) in entries {
                sorted.insert(key.clone(), canonicalize(nested));
            }
            Value::Object(sorted)
        },
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
