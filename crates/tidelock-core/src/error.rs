//! Error types for the Tidelock engine.
use thiserror::Error;

use crate::types::{Address, MonthIndex};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoostError {
    #[error("boost table must have {expected} entries, got {got}")] InvalidLength { expected: usize, got: usize },
    #[error("boost table decreases at index {index}")] NotMonotonic { index: usize },
    #[error("boost factor {factor} at index {index} exceeds maximum {max}")] FactorTooLarge { index: usize, factor: u64, max: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecayError {
    #[error("months remaining {0} outside 1..=24")] SlotOutOfRange(u64),
    #[error("slot underflow: slot holds {have}, removing {need}")] SlotUnderflow { have: u64, need: u64 },
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("lock amount and duration are both zero")] InvalidParams,
    #[error("lock would run {requested} months, maximum is {max}")] DurationOutOfRange { requested: u64, max: u64 },
    #[error("no active lock for {0}")] NoActiveLock(Address),
    #[error("insufficient locked principal: have {have}, need {need}")] InsufficientPrincipal { have: u64, need: u64 },
    #[error("lock ends at month {end_month}, current month is {current_month}")] DeadlineNotReached { end_month: MonthIndex, current_month: MonthIndex },
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewardError {
    #[error("reward period must be at least one month")] ZeroPeriod,
    #[error("reward amount must be positive")] ZeroAmount,
    #[error("no reward program for token {0}")] UnknownProgram(Address),
    #[error("month range ends at {to_month}, which has not elapsed (current month {current_month})")] RangeNotElapsed { to_month: MonthIndex, current_month: MonthIndex },
    #[error("invalid month range {from_month}..={to_month}")] InvalidRange { from_month: MonthIndex, to_month: MonthIndex },
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient balance of {token} for {holder}: have {have}, need {need}")] InsufficientBalance { token: Address, holder: Address, have: u64, need: u64 },
    #[error("balance overflow")] BalanceOverflow,
}

#[derive(Error, Debug)]
pub enum TideError {
    #[error(transparent)] Boost(#[from] BoostError),
    #[error(transparent)] Decay(#[from] DecayError),
    #[error(transparent)] Lock(#[from] LockError),
    #[error(transparent)] Reward(#[from] RewardError),
    #[error(transparent)] Token(#[from] TokenError),
    #[error("caller {0} is not the owner")] Unauthorized(Address),
    #[error("native value transfers are not accepted (got {0})")] NativeTransferRejected(u64),
    #[error("storage: {0}")] Storage(String),
}

impl TideError {
    /// Stable short identifier for the error, independent of its message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Boost(_) => "boost-table",
            Self::Decay(DecayError::ArithmeticOverflow)
            | Self::Lock(LockError::ArithmeticOverflow)
            | Self::Reward(RewardError::ArithmeticOverflow) => "overflow",
            Self::Decay(_) => "decay",
            Self::Lock(LockError::InvalidParams) => "params",
            Self::Lock(LockError::DurationOutOfRange { .. }) => "duration",
            Self::Lock(LockError::NoActiveLock(_)) => "no-lock",
            Self::Lock(LockError::InsufficientPrincipal { .. }) => "insufficient",
            Self::Lock(LockError::DeadlineNotReached { .. }) => "deadline",
            Self::Reward(RewardError::ZeroPeriod) | Self::Reward(RewardError::ZeroAmount) => "reward-params",
            Self::Reward(RewardError::UnknownProgram(_)) => "unknown-reward",
            Self::Reward(RewardError::RangeNotElapsed { .. }) | Self::Reward(RewardError::InvalidRange { .. }) => "range",
            Self::Token(_) => "token",
            Self::Unauthorized(_) => "unauthorized",
            Self::NativeTransferRejected(_) => "native-value",
            Self::Storage(_) => "storage",
        }
    }
}
