//! Month clock: maps wall-clock seconds onto the discrete month index.
//!
//! The clock holds no mutable state. "Time passing" is the caller supplying
//! a later `now`; every aggregate catches up from that on its next call.

use serde::{Deserialize, Serialize};

use crate::constants::MONTH_SECONDS;
use crate::types::MonthIndex;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct MonthClock {
    /// Unix timestamp of month 0.
    pub epoch: u64,
    /// Length of one month in seconds. Never zero.
    pub month_seconds: u64,
}

impl MonthClock {
    /// Clock with the default 30-day month.
    pub fn new(epoch: u64) -> Self {
        Self { epoch, month_seconds: MONTH_SECONDS }
    }

    /// Month index containing `now`. Times before the epoch map to month 0.
    pub fn month_at(&self, now: u64) -> MonthIndex {
        now.saturating_sub(self.epoch) / self.month_seconds.max(1)
    }

    /// Unix timestamp at which `month` begins.
    pub fn month_start(&self, month: MonthIndex) -> u64 {
        self.epoch.saturating_add(month.saturating_mul(self.month_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SECONDS_PER_DAY;

    const EPOCH: u64 = 1_700_000_000;

    #[test]
    fn epoch_is_month_zero() {
        let clock = MonthClock::new(EPOCH);
        assert_eq!(clock.month_at(EPOCH), 0);
        assert_eq!(clock.month_at(EPOCH + MONTH_SECONDS - 1), 0);
    }

    #[test]
    fn boundary_is_inclusive() {
        let clock = MonthClock::new(EPOCH);
        assert_eq!(clock.month_at(EPOCH + MONTH_SECONDS), 1);
        assert_eq!(clock.month_at(EPOCH + 45 * SECONDS_PER_DAY), 1);
        assert_eq!(clock.month_at(EPOCH + 90 * SECONDS_PER_DAY), 3);
    }

    #[test]
    fn before_epoch_saturates() {
        let clock = MonthClock::new(EPOCH);
        assert_eq!(clock.month_at(0), 0);
        assert_eq!(clock.month_at(EPOCH - 1), 0);
    }

    #[test]
    fn month_start_inverts_month_at() {
        let clock = MonthClock::new(EPOCH);
        for m in [0, 1, 7, 24, 1000] {
            assert_eq!(clock.month_at(clock.month_start(m)), m);
        }
    }

    #[test]
    fn custom_month_length() {
        let clock = MonthClock { epoch: 0, month_seconds: 100 };
        assert_eq!(clock.month_at(99), 0);
        assert_eq!(clock.month_at(100), 1);
        assert_eq!(clock.month_at(250), 2);
    }
}
