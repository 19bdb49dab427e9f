//! Boost schedule: months remaining → fixed-point multiplier.
//!
//! The schedule keeps every table it has used together with the first month
//! that table governed. Reward settlement for a past month must price an
//! account's lock with the same table that priced the global total of that
//! month, even after the owner has replaced the table.

use serde::{Deserialize, Serialize};

use crate::constants::{BOOST_SLOTS, DEFAULT_BOOST_FACTORS, MAX_BOOST_FACTOR};
use crate::error::BoostError;
use crate::types::MonthIndex;

/// A validated 24-entry boost table.
///
/// Entry `i` is the multiplier (scale [`PRECISION`](crate::constants::PRECISION))
/// for a lock with `i + 1` months remaining.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct BoostTable([u64; BOOST_SLOTS]);

impl BoostTable {
    /// Validate and build a table from a slice.
    ///
    /// # Errors
    ///
    /// - [`BoostError::InvalidLength`] unless exactly 24 entries
    /// - [`BoostError::FactorTooLarge`] if an entry exceeds [`MAX_BOOST_FACTOR`]
    /// - [`BoostError::NotMonotonic`] if an entry is smaller than its predecessor
    pub fn new(factors: &[u64]) -> Result<Self, BoostError> {
        let arr: [u64; BOOST_SLOTS] = factors.try_into().map_err(|_| BoostError::InvalidLength {
            expected: BOOST_SLOTS,
            got: factors.len(),
        })?;
        for (index, &factor) in arr.iter().enumerate() {
            if factor > MAX_BOOST_FACTOR {
                return Err(BoostError::FactorTooLarge { index, factor, max: MAX_BOOST_FACTOR });
            }
            if index > 0 && factor < arr[index - 1] {
                return Err(BoostError::NotMonotonic { index });
            }
        }
        Ok(Self(arr))
    }

    /// Multiplier for a lock with `months_remaining` months left.
    ///
    /// Zero for a matured lock; lookups past 24 months are capped at the last entry.
    pub fn boost_for(&self, months_remaining: u64) -> u64 {
        match months_remaining {
            0 => 0,
            m if m >= BOOST_SLOTS as u64 => self.0[BOOST_SLOTS - 1],
            m => self.0[(m - 1) as usize],
        }
    }

    /// Raw entry at `index` (0..24).
    pub fn factor(&self, index: usize) -> Option<u64> {
        self.0.get(index).copied()
    }

    pub fn factors(&self) -> &[u64; BOOST_SLOTS] {
        &self.0
    }
}

impl Default for BoostTable {
    fn default() -> Self {
        Self(DEFAULT_BOOST_FACTORS)
    }
}

/// A table together with the first month it governs.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct BoostEpoch {
    pub effective_month: MonthIndex,
    pub table: BoostTable,
}

/// Current boost table plus the tables it superseded.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct BoostSchedule {
    current: BoostEpoch,
    /// Superseded epochs, oldest first.
    previous: Vec<BoostEpoch>,
}

impl BoostSchedule {
    /// Schedule whose initial table governs every month from 0.
    pub fn new(table: BoostTable) -> Self {
        Self { current: BoostEpoch { effective_month: 0, table }, previous: Vec::new() }
    }

    /// The table in force now.
    pub fn current(&self) -> &BoostTable {
        &self.current.table
    }

    /// Month from which the current table applies.
    pub fn current_since(&self) -> MonthIndex {
        self.current.effective_month
    }

    /// Replace the table from `month` onward.
    ///
    /// A second update in the same month overwrites the first: a month is
    /// always priced with the last table set during it.
    pub fn update(&mut self, table: BoostTable, month: MonthIndex) {
        if month > self.current.effective_month {
            self.previous.push(self.current);
        }
        self.current = BoostEpoch { effective_month: month.max(self.current.effective_month), table };
    }

    /// The table that governed `month`.
    pub fn table_for(&self, month: MonthIndex) -> &BoostTable {
        if month >= self.current.effective_month {
            return &self.current.table;
        }
        self.previous
            .iter()
            .rev()
            .find(|e| e.effective_month <= month)
            .map(|e| &e.table)
            .unwrap_or(&self.current.table)
    }

    /// Number of table changes recorded.
    pub fn history_len(&self) -> usize {
        self.previous.len()
    }
}

impl Default for BoostSchedule {
    fn default() -> Self {
        Self::new(BoostTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PRECISION;
    use proptest::prelude::*;

    fn flat_table(base: u64) -> BoostTable {
        let factors: Vec<u64> = (0..BOOST_SLOTS as u64).map(|i| base + i).collect();
        BoostTable::new(&factors).unwrap()
    }

    // --- BoostTable ---

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            BoostTable::new(&[PRECISION; 23]),
            Err(BoostError::InvalidLength { expected: 24, got: 23 })
        );
        assert!(BoostTable::new(&[PRECISION; 25]).is_err());
    }

    #[test]
    fn rejects_decreasing_table() {
        let mut factors = DEFAULT_BOOST_FACTORS;
        factors[10] = factors[9] - 1;
        assert_eq!(BoostTable::new(&factors), Err(BoostError::NotMonotonic { index: 10 }));
    }

    #[test]
    fn rejects_oversized_factor() {
        let mut factors = [PRECISION; BOOST_SLOTS];
        factors[23] = MAX_BOOST_FACTOR + 1;
        assert!(matches!(
            BoostTable::new(&factors),
            Err(BoostError::FactorTooLarge { index: 23, .. })
        ));
    }

    #[test]
    fn boost_for_edges() {
        let t = BoostTable::default();
        assert_eq!(t.boost_for(0), 0);
        assert_eq!(t.boost_for(1), 10_000);
        assert_eq!(t.boost_for(3), 37_400);
        assert_eq!(t.boost_for(24), 453_200);
        assert_eq!(t.boost_for(25), 453_200);
        assert_eq!(t.boost_for(u64::MAX), 453_200);
    }

    #[test]
    fn factor_lookup() {
        let t = BoostTable::default();
        assert_eq!(t.factor(0), Some(10_000));
        assert_eq!(t.factor(23), Some(453_200));
        assert_eq!(t.factor(24), None);
    }

    // --- BoostSchedule ---

    #[test]
    fn update_takes_effect_from_month() {
        let mut s = BoostSchedule::default();
        let flat = flat_table(5_000);
        s.update(flat, 4);
        assert_eq!(s.current(), &flat);
        assert_eq!(s.current_since(), 4);
        assert_eq!(s.table_for(3), &BoostTable::default());
        assert_eq!(s.table_for(4), &flat);
        assert_eq!(s.table_for(100), &flat);
        assert_eq!(s.history_len(), 1);
    }

    #[test]
    fn same_month_update_overwrites() {
        let mut s = BoostSchedule::default();
        s.update(flat_table(5_000), 2);
        s.update(flat_table(6_000), 2);
        assert_eq!(s.history_len(), 1);
        assert_eq!(s.table_for(2), &flat_table(6_000));
        assert_eq!(s.table_for(1), &BoostTable::default());
    }

    #[test]
    fn month_zero_update_replaces_initial() {
        let mut s = BoostSchedule::default();
        s.update(flat_table(5_000), 0);
        assert_eq!(s.history_len(), 0);
        assert_eq!(s.table_for(0), &flat_table(5_000));
    }

    #[test]
    fn several_epochs_resolve_correctly() {
        let mut s = BoostSchedule::default();
        s.update(flat_table(1_000), 3);
        s.update(flat_table(2_000), 7);
        s.update(flat_table(3_000), 12);
        assert_eq!(s.table_for(0), &BoostTable::default());
        assert_eq!(s.table_for(2), &BoostTable::default());
        assert_eq!(s.table_for(3), &flat_table(1_000));
        assert_eq!(s.table_for(6), &flat_table(1_000));
        assert_eq!(s.table_for(7), &flat_table(2_000));
        assert_eq!(s.table_for(11), &flat_table(2_000));
        assert_eq!(s.table_for(12), &flat_table(3_000));
    }

    proptest! {
        #[test]
        fn boost_for_is_monotonic(a in 0u64..40, b in 0u64..40) {
            let t = BoostTable::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(t.boost_for(lo) <= t.boost_for(hi));
        }
    }
}
