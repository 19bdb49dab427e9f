//! Everything the engine persists between calls.

use tidelock_core::boost::{BoostSchedule, BoostTable};
use tidelock_decay::{DecayBuckets, LockLedger};
use tidelock_rewards::RewardBook;

/// Locks, decay buckets, boost history and reward book.
///
/// Configuration (clock, tokens, fees) is not part of the state; a snapshot
/// is reopened with whatever configuration the caller supplies.
#[derive(Debug, Clone, PartialEq, Eq, Default, bincode::Encode, bincode::Decode)]
pub struct LockingState {
    pub buckets: DecayBuckets,
    pub locks: LockLedger,
    pub boosts: BoostSchedule,
    pub rewards: RewardBook,
}

impl LockingState {
    /// Fresh state whose boost schedule starts with `table`.
    pub fn new(table: BoostTable) -> Self {
        Self {
            buckets: DecayBuckets::new(0),
            locks: LockLedger::new(),
            boosts: BoostSchedule::new(table),
            rewards: RewardBook::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidelock_core::types::Address;

    #[test]
    fn bytes_roundtrip_with_locks() {
        let mut state = LockingState::default();
        let account = Address::from_label("alice");
        let change = state.locks.plan_lock(&account, 500, 6, 0).unwrap();
        change.apply_to(&mut state.buckets).unwrap();
        state.locks.apply(&change);
        let program = state.rewards.plan_tranche(&Address::from_label("reward"), 0, 1, 3, 900).unwrap();
        state.rewards.insert_program(program);

        let bytes = bincode::encode_to_vec(&state, bincode::config::standard()).unwrap();
        let (decoded, _): (LockingState, usize) =
            bincode::decode_from_slice(&bytes, bincode::config::standard()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn new_state_uses_given_table() {
        let factors: Vec<u64> = (1..=24).map(|i| i * 10_000).collect();
        let table = BoostTable::new(&factors).unwrap();
        let state = LockingState::new(table);
        assert_eq!(state.boosts.current(), &table);
        assert_eq!(state.buckets.last_month(), 0);
        assert!(state.locks.is_empty());
    }
}
