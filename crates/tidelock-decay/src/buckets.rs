//! Decay aggregator: a 24-slot ring buffer of principal keyed by months
//! remaining.
//!
//! Principal with `d` months remaining (1..=24) sits in
//! `slots[(cursor + d - 1) % 24]`. Advancing one month zeroes the slot under
//! the cursor (its principal has matured) and moves the cursor forward, so
//! every other slot's "months remaining" drops by one without touching it.
//! `total_locked` and the boosted total are maintained without ever visiting
//! individual locks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tidelock_core::boost::BoostTable;
use tidelock_core::constants::{BOOST_SLOTS, PRECISION};
use tidelock_core::error::DecayError;
use tidelock_core::types::MonthIndex;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct DecayBuckets {
    slots: [u64; BOOST_SLOTS],
    /// Slot holding principal with one month remaining.
    cursor: u32,
    /// Month the buffer is aligned to.
    last_month: MonthIndex,
    /// Invariant: `slots.iter().sum() == total_locked`.
    total_locked: u64,
}

impl DecayBuckets {
    /// Empty buffer aligned to `month`.
    pub fn new(month: MonthIndex) -> Self {
        Self { slots: [0; BOOST_SLOTS], cursor: 0, last_month: month, total_locked: 0 }
    }

    pub fn last_month(&self) -> MonthIndex {
        self.last_month
    }

    /// Principal that has not yet matured.
    pub fn total_locked(&self) -> u64 {
        self.total_locked
    }

    pub fn cursor(&self) -> usize {
        self.cursor as usize
    }

    fn slot_index(&self, months_remaining: u64) -> Result<usize, DecayError> {
        if months_remaining == 0 || months_remaining > BOOST_SLOTS as u64 {
            return Err(DecayError::SlotOutOfRange(months_remaining));
        }
        Ok((self.cursor() + months_remaining as usize - 1) % BOOST_SLOTS)
    }

    /// Advance the buffer to `month`, maturing every slot passed over.
    ///
    /// Returns the principal that matured. A month at or before
    /// `last_month` is a no-op. Advancing 24 months or more clears the whole
    /// buffer at once.
    pub fn roll_to(&mut self, month: MonthIndex) -> u64 {
        if month <= self.last_month {
            return 0;
        }
        let elapsed = month - self.last_month;
        let matured = if elapsed >= BOOST_SLOTS as u64 {
            let matured = self.total_locked;
            self.slots = [0; BOOST_SLOTS];
            self.total_locked = 0;
            matured
        } else {
            let mut matured: u64 = 0;
            for _ in 0..elapsed {
                let c = self.cursor();
                matured += self.slots[c];
                self.slots[c] = 0;
                self.cursor = ((c + 1) % BOOST_SLOTS) as u32;
            }
            self.total_locked -= matured;
            matured
        };
        if elapsed >= BOOST_SLOTS as u64 {
            self.cursor = ((self.cursor() + (elapsed % BOOST_SLOTS as u64) as usize) % BOOST_SLOTS) as u32;
        }
        debug!(from = self.last_month, to = month, matured, "rolled decay buckets");
        self.last_month = month;
        matured
    }

    /// Copy of the buffer advanced to `month`.
    pub fn rolled_to(&self, month: MonthIndex) -> Self {
        let mut copy = *self;
        copy.roll_to(month);
        copy
    }

    /// Add principal with `months_remaining` left.
    ///
    /// # Errors
    ///
    /// - [`DecayError::SlotOutOfRange`] unless `1 <= months_remaining <= 24`
    /// - [`DecayError::ArithmeticOverflow`] if the total would exceed `u64`
    pub fn add(&mut self, months_remaining: u64, amount: u64) -> Result<(), DecayError> {
        let idx = self.slot_index(months_remaining)?;
        let total = self.total_locked.checked_add(amount).ok_or(DecayError::ArithmeticOverflow)?;
        self.slots[idx] += amount;
        self.total_locked = total;
        Ok(())
    }

    /// Remove principal previously added with `months_remaining` left
    /// (as seen from the current alignment).
    ///
    /// # Errors
    ///
    /// - [`DecayError::SlotOutOfRange`] unless `1 <= months_remaining <= 24`
    /// - [`DecayError::SlotUnderflow`] if the slot holds less than `amount`
    pub fn remove(&mut self, months_remaining: u64, amount: u64) -> Result<(), DecayError> {
        let idx = self.slot_index(months_remaining)?;
        let have = self.slots[idx];
        if have < amount {
            return Err(DecayError::SlotUnderflow { have, need: amount });
        }
        self.slots[idx] = have - amount;
        self.total_locked -= amount;
        Ok(())
    }

    /// Principal per months remaining: entry `i` has `i + 1` months left.
    pub fn locked_by_duration(&self) -> [u64; BOOST_SLOTS] {
        let mut out = [0u64; BOOST_SLOTS];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.slots[(self.cursor() + i) % BOOST_SLOTS];
        }
        out
    }

    /// `Σ principal(d) * boost[d-1]`, not yet divided by [`PRECISION`].
    pub fn boosted_units(&self, table: &BoostTable) -> u128 {
        self.boosted_units_at_offset(0, table)
    }

    /// Boosted units `offset` months after `last_month`, assuming no change
    /// to the buffer in between.
    ///
    /// This is the global total for a past month that was never observed:
    /// slots with fewer than `offset + 1` months remaining have matured and
    /// the rest have slid down the table by `offset`.
    pub fn boosted_units_at_offset(&self, offset: u64, table: &BoostTable) -> u128 {
        if offset >= BOOST_SLOTS as u64 {
            return 0;
        }
        let offset = offset as usize;
        let factors = table.factors();
        (offset..BOOST_SLOTS)
            .map(|i| {
                let principal = self.slots[(self.cursor() + i) % BOOST_SLOTS] as u128;
                principal * factors[i - offset] as u128
            })
            .sum()
    }

    /// Boosted power in principal units.
    pub fn total_boosted(&self, table: &BoostTable) -> u128 {
        self.boosted_units(table) / PRECISION as u128
    }
}

impl Default for DecayBuckets {
    fn default() -> Self {
        Self::new(0)
    }
}
