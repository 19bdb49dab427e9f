//! Core types: addresses, locks and per-call context.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Zero-based month index relative to the engine epoch.
pub type MonthIndex = u64;

/// A 32-byte account or token identifier.
///
/// Displayed and serialized as lowercase hex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, bincode::Encode, bincode::Decode)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create an address from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a deterministic address from a human-readable label.
    ///
    /// BLAKE3 of the label. Handy for scripted scenarios and tests.
    pub fn from_label(label: &str) -> Self {
        Self(*blake3::hash(label.as_bytes()).as_bytes())
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Error parsing a hex address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("address must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressParseError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One account's locked position.
///
/// `amount == 0` is the empty lock; the ledger never stores empty locks.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default, bincode::Encode, bincode::Decode)]
pub struct Lock {
    /// Locked principal in base units.
    pub amount: u64,
    /// First month in which the lock is matured and withdrawable.
    pub end_month: MonthIndex,
}

impl Lock {
    /// The canonical "no lock" value.
    pub const EMPTY: Self = Self { amount: 0, end_month: 0 };

    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }

    /// Whether the lock still has months remaining at `month`.
    pub fn is_active(&self, month: MonthIndex) -> bool {
        self.amount > 0 && self.end_month > month
    }

    /// Months remaining at `month`, zero once matured.
    pub fn months_remaining(&self, month: MonthIndex) -> u64 {
        if self.amount == 0 {
            return 0;
        }
        self.end_month.saturating_sub(month)
    }
}

/// How much principal an early withdrawal takes out.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Withdrawal {
    /// Withdraw exactly this many base units.
    Partial(u64),
    /// Withdraw the whole principal and delete the lock.
    Full,
}

/// Per-call environment: who is calling, when, and with what native value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    /// Unix timestamp in seconds.
    pub now: u64,
    /// Native currency attached to the call. Must be zero.
    pub value: u64,
}

impl CallContext {
    pub fn new(caller: Address, now: u64) -> Self {
        Self { caller, now, value: 0 }
    }
}
