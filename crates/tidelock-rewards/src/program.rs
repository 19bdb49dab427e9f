//! Reward programs: a per-month emission schedule for one reward token and
//! the reward rate each elapsed month settled at.
//!
//! A month is *accrued* once it has fully elapsed. Accrual fixes the month's
//! global boosted units `W` and its rate `emission * 10^18 / W`. Accounts
//! later claim `units * rate / 10^18` for every month their lock was counted
//! in `W`, so the claimable total of a month never exceeds its emission.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tidelock_core::constants::{MAX_PROGRAM_MONTHS, REWARD_PRECISION};
use tidelock_core::error::RewardError;
use tidelock_core::types::{Address, MonthIndex};

/// `a * b / d` with a checked product.
pub(crate) fn mul_div(a: u128, b: u128, d: u128) -> Result<u128, RewardError> {
    Ok(a.checked_mul(b).ok_or(RewardError::ArithmeticOverflow)? / d)
}

/// Accounting for one calendar month of a program.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct MonthSlot {
    /// Reward tokens released in this month.
    pub emission: u64,
    /// Global boosted units the month was accrued with.
    pub boosted_units: u128,
    /// Reward per boosted unit, scaled by [`REWARD_PRECISION`].
    pub reward_per_unit: u128,
    /// Set once the undistributed remainder has been recovered.
    pub recovered: bool,
}

impl MonthSlot {
    /// Nobody held boosted power while this month's emission was released.
    pub fn is_orphaned(&self) -> bool {
        self.emission > 0 && self.boosted_units == 0
    }

    /// Upper bound on what accounts can claim from this month.
    ///
    /// Per-account settlement rounds down, so the rounded-up global figure
    /// is never exceeded.
    pub fn distributed(&self) -> u64 {
        // boosted_units * reward_per_unit <= emission * REWARD_PRECISION
        let scaled = self.boosted_units.saturating_mul(self.reward_per_unit);
        scaled.div_ceil(REWARD_PRECISION).min(self.emission as u128) as u64
    }

    /// Emission nobody can claim, or zero once recovered.
    pub fn recoverable(&self) -> u64 {
        if self.recovered {
            return 0;
        }
        self.emission - self.distributed()
    }
}

/// Result of planning a recovery; applied with [`RewardProgram::apply_recovery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovery {
    pub token: Address,
    pub from_month: MonthIndex,
    pub to_month: MonthIndex,
    pub amount: u64,
    /// Months that will be flagged as recovered.
    pub months: Vec<MonthIndex>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct RewardProgram {
    token: Address,
    /// Calendar month of `months[0]`.
    first_month: MonthIndex,
    months: Vec<MonthSlot>,
    /// Months before this one have been accrued.
    accrued_through: MonthIndex,
    /// Running sum of monthly rates. Reporting only; settlement reads the
    /// per-month rates.
    acc_reward_per_unit: u128,
    total_amount: u64,
    recovered_amount: u64,
}

impl RewardProgram {
    /// An empty program created at `month`.
    pub fn new(token: Address, month: MonthIndex) -> Self {
        Self {
            token,
            first_month: month,
            months: Vec::new(),
            accrued_through: month,
            acc_reward_per_unit: 0,
            total_amount: 0,
            recovered_amount: 0,
        }
    }

    pub fn token(&self) -> &Address {
        &self.token
    }

    /// First month with a slot.
    pub fn start_month(&self) -> MonthIndex {
        self.first_month
    }

    /// One past the last month with a slot.
    pub fn end_month(&self) -> MonthIndex {
        self.first_month + self.months.len() as u64
    }

    pub fn accrued_through(&self) -> MonthIndex {
        self.accrued_through
    }

    pub fn acc_reward_per_unit(&self) -> u128 {
        self.acc_reward_per_unit
    }

    /// Everything ever funded into the program.
    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn recovered_amount(&self) -> u64 {
        self.recovered_amount
    }

    pub fn slot(&self, month: MonthIndex) -> Option<&MonthSlot> {
        let idx = month.checked_sub(self.first_month)?;
        self.months.get(idx as usize)
    }

    pub fn emission_at(&self, month: MonthIndex) -> u64 {
        self.slot(month).map_or(0, |s| s.emission)
    }

    /// The accrued rate of `month`; zero for months not yet accrued.
    pub fn rate_at(&self, month: MonthIndex) -> u128 {
        if month >= self.accrued_through {
            return 0;
        }
        self.slot(month).map_or(0, |s| s.reward_per_unit)
    }

    /// `(month, slot)` pairs in calendar order.
    pub fn slots(&self) -> impl Iterator<Item = (MonthIndex, &MonthSlot)> {
        self.months.iter().enumerate().map(move |(i, s)| (self.first_month + i as u64, s))
    }

    /// Spread `amount` over `period` months starting at `start`, on top of
    /// any emission already scheduled.
    ///
    /// Month `k` of the tranche receives
    /// `floor(amount*(k+1)/period) - floor(amount*k/period)`, so the tranche
    /// sums to `amount` exactly. The program is unchanged on error.
    ///
    /// # Errors
    ///
    /// - [`RewardError::ZeroPeriod`] / [`RewardError::ZeroAmount`]
    /// - [`RewardError::InvalidRange`] if `start` is an already accrued month,
    ///   or the program would span more than [`MAX_PROGRAM_MONTHS`] months
    /// - [`RewardError::ArithmeticOverflow`] if a month's emission or the
    ///   program total would exceed `u64`
    pub fn add_tranche(&mut self, start: MonthIndex, period: u64, amount: u64) -> Result<(), RewardError> {
        if period == 0 {
            return Err(RewardError::ZeroPeriod);
        }
        if amount == 0 {
            return Err(RewardError::ZeroAmount);
        }
        let end = start.checked_add(period).ok_or(RewardError::ArithmeticOverflow)?;
        if start < self.accrued_through {
            return Err(RewardError::InvalidRange { from_month: start, to_month: end - 1 });
        }
        let total_amount = self.total_amount.checked_add(amount).ok_or(RewardError::ArithmeticOverflow)?;

        let (span_start, span_end) =
            if self.months.is_empty() { (start, end) } else { (start.min(self.first_month), end.max(self.end_month())) };
        if span_end - span_start > MAX_PROGRAM_MONTHS {
            return Err(RewardError::InvalidRange { from_month: span_start, to_month: span_end - 1 });
        }

        let mut first_month = self.first_month;
        let mut months = self.months.clone();
        if months.is_empty() {
            first_month = start;
        } else if start < first_month {
            let gap = (first_month - start) as usize;
            months.splice(0..0, std::iter::repeat_n(MonthSlot::default(), gap));
            first_month = start;
        }
        let needed = (end - first_month) as usize;
        if months.len() < needed {
            months.resize(needed, MonthSlot::default());
        }

        let total = amount as u128;
        let period_wide = period as u128;
        for k in 0..period {
            let k = k as u128;
            let share = (total * (k + 1) / period_wide - total * k / period_wide) as u64;
            let slot = &mut months[(start - first_month) as usize + k as usize];
            slot.emission = slot.emission.checked_add(share).ok_or(RewardError::ArithmeticOverflow)?;
        }

        self.first_month = first_month;
        self.months = months;
        self.total_amount = total_amount;
        Ok(())
    }

    /// Fix the rate of every month before `through` not accrued yet.
    ///
    /// `units_for(m)` must return the global boosted units of month `m`.
    /// Returns the number of program months rated.
    pub fn accrue(&mut self, through: MonthIndex, units_for: impl Fn(MonthIndex) -> u128) -> u64 {
        if through <= self.accrued_through {
            return 0;
        }
        let from = self.accrued_through.max(self.first_month);
        let to = through.min(self.end_month());
        let mut rated = 0;
        for month in from..to {
            let idx = (month - self.first_month) as usize;
            let units = units_for(month);
            let slot = &mut self.months[idx];
            slot.boosted_units = units;
            slot.reward_per_unit = if units == 0 {
                if slot.emission > 0 {
                    warn!(token = %self.token, month, emission = slot.emission, "no boosted power, emission orphaned");
                }
                0
            } else {
                slot.emission as u128 * REWARD_PRECISION / units
            };
            self.acc_reward_per_unit = self.acc_reward_per_unit.saturating_add(slot.reward_per_unit);
            rated += 1;
        }
        debug!(token = %self.token, from = self.accrued_through, to = through, rated, "accrued reward program");
        self.accrued_through = through;
        rated
    }

    /// Plan recovery of undistributed emission for months
    /// `from_month..=to_month`.
    ///
    /// Months outside the program window, not yet accrued, or already
    /// recovered contribute nothing.
    ///
    /// # Errors
    ///
    /// - [`RewardError::InvalidRange`] if `from_month > to_month`
    /// - [`RewardError::RangeNotElapsed`] unless `to_month < current_month`
    pub fn plan_recovery(
        &self,
        from_month: MonthIndex,
        to_month: MonthIndex,
        current_month: MonthIndex,
    ) -> Result<Recovery, RewardError> {
        if from_month > to_month {
            return Err(RewardError::InvalidRange { from_month, to_month });
        }
        if to_month >= current_month {
            return Err(RewardError::RangeNotElapsed { to_month, current_month });
        }

        let mut recovery = Recovery { token: self.token, from_month, to_month, amount: 0, months: Vec::new() };
        let lo = from_month.max(self.first_month);
        let hi = to_month.saturating_add(1).min(self.end_month()).min(self.accrued_through);
        for month in lo..hi {
            let Some(slot) = self.slot(month) else { continue };
            let amount = slot.recoverable();
            if amount == 0 {
                continue;
            }
            recovery.amount = recovery.amount.checked_add(amount).ok_or(RewardError::ArithmeticOverflow)?;
            recovery.months.push(month);
        }
        Ok(recovery)
    }

    pub fn apply_recovery(&mut self, recovery: &Recovery) {
        for &month in &recovery.months {
            if let Some(idx) = month.checked_sub(self.first_month) {
                if let Some(slot) = self.months.get_mut(idx as usize) {
                    slot.recovered = true;
                }
            }
        }
        self.recovered_amount = self.recovered_amount.saturating_add(recovery.amount);
    }
}
