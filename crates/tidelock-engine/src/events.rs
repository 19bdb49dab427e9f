//! Events emitted by state-changing entry points.

use serde::{Deserialize, Serialize};

use tidelock_core::types::{Address, MonthIndex};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LockEvent {
    Locked { account: Address, amount: u64, end_month: MonthIndex },
    Withdraw { account: Address, amount: u64 },
    /// `amount` left the lock; `penalty` of it went to the fee receivers.
    WithdrawWithPenalty { account: Address, amount: u64, penalty: u64 },
    RewardAdded { token: Address, start_month: MonthIndex, period_months: u64, amount: u64 },
    RewardClaimed { account: Address, token: Address, amount: u64 },
    RewardRecovered { token: Address, from_month: MonthIndex, to_month: MonthIndex, amount: u64 },
    BoostFactorsUpdated { month: MonthIndex, factors: Vec<u64> },
}

impl LockEvent {
    /// Short name, matching the serialized `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Locked { .. } => "locked",
            Self::Withdraw { .. } => "withdraw",
            Self::WithdrawWithPenalty { .. } => "withdraw_with_penalty",
            Self::RewardAdded { .. } => "reward_added",
            Self::RewardClaimed { .. } => "reward_claimed",
            Self::RewardRecovered { .. } => "reward_recovered",
            Self::BoostFactorsUpdated { .. } => "boost_factors_updated",
        }
    }
}
