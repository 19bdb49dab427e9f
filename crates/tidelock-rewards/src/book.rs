//! The reward book: every reward program plus every account checkpoint.
//!
//! Like the lock ledger, the book separates planning from committing. The
//! `plan_*` methods return the new values without touching the book; the
//! engine commits them once token transfers have gone through.

use std::collections::BTreeMap;

use tidelock_core::boost::BoostSchedule;
use tidelock_core::error::RewardError;
use tidelock_core::types::{Address, Lock, MonthIndex};
use tidelock_decay::DecayBuckets;

use crate::checkpoint::UserCheckpoint;
use crate::program::{Recovery, RewardProgram};

/// Global boosted units of `month`, projected from `buckets`.
///
/// `buckets` must not have been rolled past `month`. The table is the one
/// that governs `month` in `schedule`.
pub fn units_at(buckets: &DecayBuckets, schedule: &BoostSchedule, month: MonthIndex) -> u128 {
    let offset = month.saturating_sub(buckets.last_month());
    buckets.boosted_units_at_offset(offset, schedule.table_for(month))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct RewardBook {
    programs: BTreeMap<Address, RewardProgram>,
    /// Keyed by `(account, reward token)`.
    checkpoints: BTreeMap<(Address, Address), UserCheckpoint>,
}

impl RewardBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(&self, token: &Address) -> Option<&RewardProgram> {
        self.programs.get(token)
    }

    /// Reward tokens in address order.
    pub fn tokens(&self) -> impl Iterator<Item = &Address> {
        self.programs.keys()
    }

    pub fn programs(&self) -> impl Iterator<Item = &RewardProgram> {
        self.programs.values()
    }

    /// The stored checkpoint, or an empty one settled through month 0.
    pub fn checkpoint(&self, account: &Address, token: &Address) -> UserCheckpoint {
        self.checkpoints.get(&(*account, *token)).copied().unwrap_or_default()
    }

    /// Accrue every program up to (not including) `through`.
    ///
    /// Must run before `buckets` is rolled to `through`.
    pub fn accrue(&mut self, through: MonthIndex, buckets: &DecayBuckets, schedule: &BoostSchedule) {
        for program in self.programs.values_mut() {
            program.accrue(through, |m| units_at(buckets, schedule, m));
        }
    }

    /// A copy of `token`'s program accrued up to `through`.
    pub fn projected_program(
        &self,
        token: &Address,
        through: MonthIndex,
        buckets: &DecayBuckets,
        schedule: &BoostSchedule,
    ) -> Option<RewardProgram> {
        let mut program = self.programs.get(token)?.clone();
        program.accrue(through, |m| units_at(buckets, schedule, m));
        Some(program)
    }

    /// Claimable rewards of `account` in `token` as of `through`, without
    /// touching the book. Zero for unknown tokens.
    pub fn pending(
        &self,
        account: &Address,
        token: &Address,
        lock: &Lock,
        through: MonthIndex,
        buckets: &DecayBuckets,
        schedule: &BoostSchedule,
    ) -> Result<u64, RewardError> {
        let Some(program) = self.projected_program(token, through, buckets, schedule) else {
            return Ok(0);
        };
        Ok(self.checkpoint(account, token).settled(lock, &program, schedule, through)?.unclaimed)
    }

    /// Program with a new tranche added, created at `month` if needed.
    ///
    /// # Errors
    ///
    /// Any error of [`RewardProgram::add_tranche`].
    pub fn plan_tranche(
        &self,
        token: &Address,
        month: MonthIndex,
        start_offset: u64,
        period_months: u64,
        amount: u64,
    ) -> Result<RewardProgram, RewardError> {
        let mut program = self.programs.get(token).cloned().unwrap_or_else(|| RewardProgram::new(*token, month));
        let start = month.checked_add(start_offset).ok_or(RewardError::ArithmeticOverflow)?;
        program.add_tranche(start, period_months, amount)?;
        Ok(program)
    }

    pub fn insert_program(&mut self, program: RewardProgram) {
        self.programs.insert(*program.token(), program);
    }

    /// Checkpoints of `account` in every program, settled through `through`.
    ///
    /// `lock` must be the account's lock as it stood since its last settlement.
    pub fn plan_settlement(
        &self,
        account: &Address,
        lock: &Lock,
        through: MonthIndex,
        schedule: &BoostSchedule,
    ) -> Result<Vec<(Address, UserCheckpoint)>, RewardError> {
        self.programs
            .iter()
            .map(|(token, program)| {
                let ckpt = self.checkpoint(account, token).settled(lock, program, schedule, through)?;
                Ok((*token, ckpt))
            })
            .collect()
    }

    pub fn apply_settlement(&mut self, account: &Address, settlement: Vec<(Address, UserCheckpoint)>) {
        for (token, ckpt) in settlement {
            self.checkpoints.insert((*account, token), ckpt);
        }
    }

    /// Settle `account` in `token` and pay out everything unclaimed.
    ///
    /// # Errors
    ///
    /// [`RewardError::UnknownProgram`] if `token` has no program.
    pub fn plan_claim(
        &self,
        account: &Address,
        token: &Address,
        lock: &Lock,
        through: MonthIndex,
        schedule: &BoostSchedule,
    ) -> Result<(UserCheckpoint, u64), RewardError> {
        let program = self.programs.get(token).ok_or(RewardError::UnknownProgram(*token))?;
        self.checkpoint(account, token).settled(lock, program, schedule, through)?.claimed()
    }

    pub fn set_checkpoint(&mut self, account: &Address, token: &Address, ckpt: UserCheckpoint) {
        self.checkpoints.insert((*account, *token), ckpt);
    }

    /// # Errors
    ///
    /// [`RewardError::UnknownProgram`] or any error of
    /// [`RewardProgram::plan_recovery`].
    pub fn plan_recovery(
        &self,
        token: &Address,
        from_month: MonthIndex,
        to_month: MonthIndex,
        current_month: MonthIndex,
    ) -> Result<Recovery, RewardError> {
        let program = self.programs.get(token).ok_or(RewardError::UnknownProgram(*token))?;
        program.plan_recovery(from_month, to_month, current_month)
    }

    pub fn apply_recovery(&mut self, recovery: &Recovery) {
        if let Some(program) = self.programs.get_mut(&recovery.token) {
            program.apply_recovery(recovery);
        }
    }
}
