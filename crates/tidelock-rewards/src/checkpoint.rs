//! Per-account reward checkpoints.
//!
//! An account's lock only changes after every one of its checkpoints has
//! been settled up to the current month, so between `settled_through` and
//! now the stored lock is exactly the lock that was counted in each month's
//! global boosted units.

use serde::{Deserialize, Serialize};

use tidelock_core::boost::BoostSchedule;
use tidelock_core::constants::{MAX_LOCK_MONTHS, REWARD_PRECISION};
use tidelock_core::error::RewardError;
use tidelock_core::types::{Lock, MonthIndex};

use crate::program::{mul_div, RewardProgram};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct UserCheckpoint {
    /// Months before this one are included in `unclaimed`.
    pub settled_through: MonthIndex,
    /// Settled but not yet paid out.
    pub unclaimed: u64,
    /// Paid out over the account's lifetime.
    pub claimed: u64,
}

/// Rewards earned by `lock` from `program` over months `from..to`.
///
/// Only accrued months inside both the program window and the lock's
/// active period count. Each month is rounded down on its own.
pub fn owed_between(
    lock: &Lock,
    program: &RewardProgram,
    schedule: &BoostSchedule,
    from: MonthIndex,
    to: MonthIndex,
) -> Result<u64, RewardError> {
    if lock.is_empty() {
        return Ok(0);
    }
    let lo = from
        .max(program.start_month())
        .max(lock.end_month.saturating_sub(MAX_LOCK_MONTHS));
    let hi = to.min(lock.end_month).min(program.end_month()).min(program.accrued_through());

    let mut owed: u128 = 0;
    for month in lo..hi {
        let rate = program.rate_at(month);
        if rate == 0 {
            continue;
        }
        let boost = schedule.table_for(month).boost_for(lock.months_remaining(month));
        let units = lock.amount as u128 * boost as u128;
        owed += mul_div(units, rate, REWARD_PRECISION)?;
    }
    u64::try_from(owed).map_err(|_| RewardError::ArithmeticOverflow)
}

impl UserCheckpoint {
    pub fn new(month: MonthIndex) -> Self {
        Self { settled_through: month, unclaimed: 0, claimed: 0 }
    }

    /// This checkpoint with everything `lock` earned up to `through` settled.
    ///
    /// # Errors
    ///
    /// [`RewardError::ArithmeticOverflow`] if the unclaimed balance would
    /// exceed `u64`.
    pub fn settled(
        &self,
        lock: &Lock,
        program: &RewardProgram,
        schedule: &BoostSchedule,
        through: MonthIndex,
    ) -> Result<Self, RewardError> {
        if through <= self.settled_through {
            return Ok(*self);
        }
        let owed = owed_between(lock, program, schedule, self.settled_through, through)?;
        Ok(Self {
            settled_through: through,
            unclaimed: self.unclaimed.checked_add(owed).ok_or(RewardError::ArithmeticOverflow)?,
            claimed: self.claimed,
        })
    }

    /// Pay out everything unclaimed. Returns the new checkpoint and the payout.
    pub fn claimed(&self) -> Result<(Self, u64), RewardError> {
        let amount = self.unclaimed;
        let claimed = self.claimed.checked_add(amount).ok_or(RewardError::ArithmeticOverflow)?;
        Ok((Self { settled_through: self.settled_through, unclaimed: 0, claimed }, amount))
    }
}
