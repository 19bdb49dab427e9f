//! Lock ledger: the per-account source of truth for locked positions.
//!
//! Mutations are two-phase. `plan_*` validates against the current month and
//! returns a [`LockChange`] without touching state; the caller applies the
//! change to a copy of the [`DecayBuckets`] and, once every fallible step
//! (including token transfers) has succeeded, commits it with
//! [`LockLedger::apply`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tidelock_core::boost::BoostTable;
use tidelock_core::constants::MAX_LOCK_MONTHS;
use tidelock_core::error::{DecayError, LockError};
use tidelock_core::types::{Address, Lock, MonthIndex, Withdrawal};

use crate::buckets::DecayBuckets;

/// A validated transition of one account's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockChange {
    pub account: Address,
    pub before: Lock,
    pub after: Lock,
    /// Month the change was planned in.
    pub month: MonthIndex,
}

impl LockChange {
    /// Principal leaving the ledger (withdrawals).
    pub fn released(&self) -> u64 {
        self.before.amount.saturating_sub(self.after.amount)
    }

    /// Principal entering the ledger (locks and top-ups).
    pub fn deposited(&self) -> u64 {
        self.after.amount.saturating_sub(self.before.amount)
    }

    /// Move this lock's bucket contribution from its old slot to its new one.
    ///
    /// `buckets` must already be rolled to `self.month`. Matured locks have
    /// no bucket contribution.
    pub fn apply_to(&self, buckets: &mut DecayBuckets) -> Result<(), DecayError> {
        if self.before.is_active(self.month) {
            buckets.remove(self.before.months_remaining(self.month), self.before.amount)?;
        }
        if self.after.is_active(self.month) {
            buckets.add(self.after.months_remaining(self.month), self.after.amount)?;
        }
        Ok(())
    }
}

/// Boosted units of a single lock at `month`: `amount * boost[remaining - 1]`.
pub fn lock_boosted_units(lock: &Lock, month: MonthIndex, table: &BoostTable) -> u128 {
    lock.amount as u128 * table.boost_for(lock.months_remaining(month)) as u128
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct LockLedger {
    locks: BTreeMap<Address, Lock>,
    /// All principal held, matured or not.
    total_principal: u64,
}

impl LockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The account's lock, or [`Lock::EMPTY`].
    pub fn get(&self, account: &Address) -> Lock {
        self.locks.get(account).copied().unwrap_or(Lock::EMPTY)
    }

    pub fn total_principal(&self) -> u64 {
        self.total_principal
    }

    /// Number of accounts holding principal.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Lock)> {
        self.locks.iter()
    }

    /// Plan a new lock or a top-up/extension of the existing one.
    ///
    /// An unmatured lock is extended from its current expiry; an empty or
    /// matured lock runs `duration_months` from `month`, and any matured
    /// principal is locked again along with `amount`. A zero duration on an
    /// empty or matured lock leaves the principal matured at `month`, and a
    /// zero amount with no principal at all changes nothing (`before ==
    /// after`).
    ///
    /// # Errors
    ///
    /// - [`LockError::InvalidParams`] if `amount` and `duration_months` are both zero
    /// - [`LockError::DurationOutOfRange`] if the lock would have more than 24 months left
    /// - [`LockError::ArithmeticOverflow`] if principal or expiry would exceed `u64`
    pub fn plan_lock(
        &self,
        account: &Address,
        amount: u64,
        duration_months: u64,
        month: MonthIndex,
    ) -> Result<LockChange, LockError> {
        if amount == 0 && duration_months == 0 {
            return Err(LockError::InvalidParams);
        }
        if duration_months > MAX_LOCK_MONTHS {
            return Err(LockError::DurationOutOfRange { requested: duration_months, max: MAX_LOCK_MONTHS });
        }

        let before = self.get(account);
        if before.is_empty() && amount == 0 {
            return Ok(LockChange { account: *account, before, after: before, month });
        }
        let base = if before.is_active(month) { before.end_month } else { month };
        let end_month = base.checked_add(duration_months).ok_or(LockError::ArithmeticOverflow)?;

        let remaining = end_month - month;
        if remaining > MAX_LOCK_MONTHS {
            return Err(LockError::DurationOutOfRange { requested: remaining, max: MAX_LOCK_MONTHS });
        }

        let new_amount = before.amount.checked_add(amount).ok_or(LockError::ArithmeticOverflow)?;
        self.total_principal.checked_add(amount).ok_or(LockError::ArithmeticOverflow)?;

        Ok(LockChange {
            account: *account,
            before,
            after: Lock { amount: new_amount, end_month },
            month,
        })
    }

    /// Plan an early withdrawal of part or all of the principal.
    ///
    /// # Errors
    ///
    /// - [`LockError::NoActiveLock`] if the account holds no principal
    /// - [`LockError::InvalidParams`] for a zero partial withdrawal
    /// - [`LockError::InsufficientPrincipal`] if the partial amount exceeds the principal
    pub fn plan_early_withdraw(
        &self,
        account: &Address,
        withdrawal: Withdrawal,
        month: MonthIndex,
    ) -> Result<LockChange, LockError> {
        let before = self.get(account);
        if before.is_empty() {
            return Err(LockError::NoActiveLock(*account));
        }
        let amount = match withdrawal {
            Withdrawal::Full => before.amount,
            Withdrawal::Partial(0) => return Err(LockError::InvalidParams),
            Withdrawal::Partial(x) => x,
        };
        if amount > before.amount {
            return Err(LockError::InsufficientPrincipal { have: before.amount, need: amount });
        }

        let after = if amount == before.amount {
            Lock::EMPTY
        } else {
            Lock { amount: before.amount - amount, end_month: before.end_month }
        };
        Ok(LockChange { account: *account, before, after, month })
    }

    /// Plan a matured withdrawal. `Ok(None)` when there is nothing to withdraw.
    ///
    /// # Errors
    ///
    /// [`LockError::DeadlineNotReached`] if the lock has not matured.
    pub fn plan_withdraw(&self, account: &Address, month: MonthIndex) -> Result<Option<LockChange>, LockError> {
        let before = self.get(account);
        if before.is_empty() {
            return Ok(None);
        }
        if month < before.end_month {
            return Err(LockError::DeadlineNotReached { end_month: before.end_month, current_month: month });
        }
        Ok(Some(LockChange { account: *account, before, after: Lock::EMPTY, month }))
    }

    /// Commit a planned change.
    pub fn apply(&mut self, change: &LockChange) {
        self.total_principal = self.total_principal - change.released() + change.deposited();
        if change.after.is_empty() {
            self.locks.remove(&change.account);
        } else {
            self.locks.insert(change.account, change.after);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn commit(ledger: &mut LockLedger, buckets: &mut DecayBuckets, change: LockChange) {
        buckets.roll_to(change.month);
        change.apply_to(buckets).unwrap();
        ledger.apply(&change);
    }

    // --- plan_lock ---

    #[test]
    fn both_zero_is_params_error() {
        let ledger = LockLedger::new();
        assert_eq!(ledger.plan_lock(&alice(), 0, 0, 0), Err(LockError::InvalidParams));
    }

    #[test]
    fn duration_over_24_is_rejected() {
        let ledger = LockLedger::new();
        assert_eq!(
            ledger.plan_lock(&alice(), 10, 25, 0),
            Err(LockError::DurationOutOfRange { requested: 25, max: 24 })
        );
    }

    #[test]
    fn zero_duration_lock_is_already_matured() {
        let mut ledger = LockLedger::new();
        let mut buckets = DecayBuckets::new(0);
        let change = ledger.plan_lock(&alice(), 10, 0, 4).unwrap();
        assert_eq!(change.after, Lock { amount: 10, end_month: 4 });
        commit(&mut ledger, &mut buckets, change);

        assert_eq!(buckets.total_locked(), 0);
        assert_eq!(ledger.total_principal(), 10);
        let out = ledger.plan_withdraw(&alice(), 4).unwrap().unwrap();
        assert_eq!(out.released(), 10);
    }

    #[test]
    fn zero_amount_without_principal_is_a_noop() {
        let ledger = LockLedger::new();
        let change = ledger.plan_lock(&alice(), 0, 3, 0).unwrap();
        assert_eq!(change.before, Lock::EMPTY);
        assert_eq!(change.after, Lock::EMPTY);
        assert_eq!(change.deposited(), 0);
    }

    #[test]
    fn expiry_overflow_is_an_error() {
        let ledger = LockLedger::new();
        assert_eq!(ledger.plan_lock(&alice(), 10, 3, u64::MAX - 1), Err(LockError::ArithmeticOverflow));
    }

    #[test]
    fn fresh_lock_ends_duration_from_now() {
        let ledger = LockLedger::new();
        let change = ledger.plan_lock(&alice(), 100, 3, 4).unwrap();
        assert_eq!(change.before, Lock::EMPTY);
        assert_eq!(change.after, Lock { amount: 100, end_month: 7 });
        assert_eq!(change.deposited(), 100);
    }

    #[test]
    fn top_up_extends_from_existing_expiry() {
        let mut ledger = LockLedger::new();
        let mut buckets = DecayBuckets::new(0);
        let change = ledger.plan_lock(&alice(), 100, 6, 0).unwrap();
        commit(&mut ledger, &mut buckets, change);

        let change = ledger.plan_lock(&alice(), 50, 2, 1).unwrap();
        assert_eq!(change.after, Lock { amount: 150, end_month: 8 });
        commit(&mut ledger, &mut buckets, change);

        // 8 - 1 = 7 months remaining, everything in one slot.
        let by = buckets.locked_by_duration();
        assert_eq!(by[6], 150);
        assert_eq!(buckets.total_locked(), 150);
        assert_eq!(ledger.total_principal(), 150);
    }

    #[test]
    fn zero_amount_extension_moves_slot() {
        let mut ledger = LockLedger::new();
        let mut buckets = DecayBuckets::new(0);
        let change = ledger.plan_lock(&alice(), 100, 3, 0).unwrap();
        commit(&mut ledger, &mut buckets, change);
        let change = ledger.plan_lock(&alice(), 0, 4, 0).unwrap();
        commit(&mut ledger, &mut buckets, change);
        assert_eq!(ledger.get(&alice()), Lock { amount: 100, end_month: 7 });
        assert_eq!(buckets.locked_by_duration()[2], 0);
        assert_eq!(buckets.locked_by_duration()[6], 100);
    }

    #[test]
    fn zero_duration_top_up_keeps_expiry() {
        let mut ledger = LockLedger::new();
        let mut buckets = DecayBuckets::new(0);
        let change = ledger.plan_lock(&alice(), 100, 3, 0).unwrap();
        commit(&mut ledger, &mut buckets, change);
        let change = ledger.plan_lock(&alice(), 20, 0, 1).unwrap();
        assert_eq!(change.after, Lock { amount: 120, end_month: 3 });
    }

    #[test]
    fn extension_past_24_remaining_is_rejected() {
        let mut ledger = LockLedger::new();
        let mut buckets = DecayBuckets::new(0);
        let change = ledger.plan_lock(&alice(), 100, 20, 0).unwrap();
        commit(&mut ledger, &mut buckets, change);
        assert_eq!(
            ledger.plan_lock(&alice(), 0, 5, 0),
            Err(LockError::DurationOutOfRange { requested: 25, max: 24 })
        );
        assert!(ledger.plan_lock(&alice(), 0, 5, 1).is_ok());
    }

    #[test]
    fn matured_lock_relocks_from_now() {
        let mut ledger = LockLedger::new();
        let mut buckets = DecayBuckets::new(0);
        let change = ledger.plan_lock(&alice(), 100, 2, 0).unwrap();
        commit(&mut ledger, &mut buckets, change);
        buckets.roll_to(5);
        assert_eq!(buckets.total_locked(), 0);

        let change = ledger.plan_lock(&alice(), 10, 3, 5).unwrap();
        assert_eq!(change.after, Lock { amount: 110, end_month: 8 });
        commit(&mut ledger, &mut buckets, change);
        assert_eq!(buckets.total_locked(), 110);
        assert_eq!(ledger.total_principal(), 110);
    }

    // --- plan_early_withdraw ---

    #[test]
    fn early_withdraw_partial_and_full() {
        let mut ledger = LockLedger::new();
        let mut buckets = DecayBuckets::new(0);
        let change = ledger.plan_lock(&alice(), 100, 3, 0).unwrap();
        commit(&mut ledger, &mut buckets, change);

        let partial = ledger.plan_early_withdraw(&alice(), Withdrawal::Partial(30), 1).unwrap();
        assert_eq!(partial.after, Lock { amount: 70, end_month: 3 });
        assert_eq!(partial.released(), 30);
        commit(&mut ledger, &mut buckets, partial);
        assert_eq!(buckets.total_locked(), 70);

        let full = ledger.plan_early_withdraw(&alice(), Withdrawal::Full, 1).unwrap();
        assert_eq!(full.after, Lock::EMPTY);
        commit(&mut ledger, &mut buckets, full);
        assert!(ledger.is_empty());
        assert_eq!(buckets.total_locked(), 0);
        assert_eq!(ledger.total_principal(), 0);
    }

    #[test]
    fn early_withdraw_whole_amount_deletes_lock() {
        let mut ledger = LockLedger::new();
        let mut buckets = DecayBuckets::new(0);
        let change = ledger.plan_lock(&alice(), 100, 3, 0).unwrap();
        commit(&mut ledger, &mut buckets, change);
        let change = ledger.plan_early_withdraw(&alice(), Withdrawal::Partial(100), 0).unwrap();
        assert_eq!(change.after, Lock::EMPTY);
    }

    #[test]
    fn early_withdraw_errors() {
        let mut ledger = LockLedger::new();
        let mut buckets = DecayBuckets::new(0);
        assert_eq!(
            ledger.plan_early_withdraw(&alice(), Withdrawal::Full, 0),
            Err(LockError::NoActiveLock(alice()))
        );
        let change = ledger.plan_lock(&alice(), 100, 3, 0).unwrap();
        commit(&mut ledger, &mut buckets, change);
        assert_eq!(
            ledger.plan_early_withdraw(&alice(), Withdrawal::Partial(101), 0),
            Err(LockError::InsufficientPrincipal { have: 100, need: 101 })
        );
        assert_eq!(
            ledger.plan_early_withdraw(&alice(), Withdrawal::Partial(0), 0),
            Err(LockError::InvalidParams)
        );
    }

    // --- plan_withdraw ---

    #[test]
    fn withdraw_before_deadline_fails() {
        let mut ledger = LockLedger::new();
        let mut buckets = DecayBuckets::new(0);
        let change = ledger.plan_lock(&alice(), 100, 3, 0).unwrap();
        commit(&mut ledger, &mut buckets, change);
        assert_eq!(
            ledger.plan_withdraw(&alice(), 2),
            Err(LockError::DeadlineNotReached { end_month: 3, current_month: 2 })
        );
    }

    #[test]
    fn withdraw_after_deadline_then_noop() {
        let mut ledger = LockLedger::new();
        let mut buckets = DecayBuckets::new(0);
        let change = ledger.plan_lock(&alice(), 100, 3, 0).unwrap();
        commit(&mut ledger, &mut buckets, change);
        let change = ledger.plan_withdraw(&alice(), 3).unwrap().unwrap();
        assert_eq!(change.released(), 100);
        commit(&mut ledger, &mut buckets, change);
        assert_eq!(ledger.plan_withdraw(&alice(), 3), Ok(None));
        assert_eq!(ledger.total_principal(), 0);
    }

    // --- boosted units ---

    #[test]
    fn single_lock_units_match_buckets() {
        let table = BoostTable::default();
        let mut ledger = LockLedger::new();
        let mut buckets = DecayBuckets::new(0);
        let change = ledger.plan_lock(&alice(), 1_000, 6, 0).unwrap();
        commit(&mut ledger, &mut buckets, change);
        for month in 0..8 {
            buckets.roll_to(month);
            assert_eq!(
                lock_boosted_units(&ledger.get(&alice()), month, &table),
                buckets.boosted_units(&table),
                "month {month}"
            );
        }
    }
}
