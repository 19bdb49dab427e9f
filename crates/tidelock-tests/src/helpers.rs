//! Shared test helpers for the scenario suites.

use tidelock_core::constants::{COIN, MONTH_SECONDS, SECONDS_PER_DAY};
use tidelock_core::error::TideError;
use tidelock_core::ledger::{MemoryLedger, SingleOwner};
use tidelock_core::traits::TokenLedger;
use tidelock_core::types::{Address, CallContext, Lock, Withdrawal};
use tidelock_engine::{EngineConfig, LockEvent, Locking, LockingState, PenaltyReceipt};

pub const DAY: u64 = SECONDS_PER_DAY;
pub const MONTH: u64 = MONTH_SECONDS;

/// Base units of `whole` tokens plus `frac` ten-thousandths.
///
/// `coins(1234, 5678)` is 1234.5678 tokens.
pub fn coins(whole: u64, frac: u64) -> u64 {
    whole * COIN + frac * (COIN / 10_000)
}

/// Deterministic account address.
pub fn account(name: &str) -> Address {
    Address::from_label(name)
}

/// `amount * factor / 10_000`, the boosted power of one lock.
pub fn boosted(amount: u64, factor: u64) -> u128 {
    amount as u128 * factor as u128 / 10_000
}

pub type Engine = Locking<MemoryLedger, SingleOwner>;

/// An engine plus its config, with helpers for timed calls.
pub struct Harness {
    pub config: EngineConfig,
    pub engine: Engine,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Harness {
    pub fn new(config: EngineConfig) -> Self {
        let ledger = MemoryLedger::new(account("custody"));
        let engine = Locking::new(&config, ledger, SingleOwner(config.owner)).unwrap();
        Self { config, engine }
    }

    /// Rebuild from saved engine state and the ledger it ran against.
    pub fn resume(config: EngineConfig, state: LockingState, ledger: MemoryLedger) -> Self {
        let engine = Locking::with_state(&config, state, ledger, SingleOwner(config.owner)).unwrap();
        Self { config, engine }
    }

    pub fn owner(&self) -> Address {
        self.config.owner
    }

    pub fn principal(&self) -> Address {
        self.config.principal_token
    }

    /// Mint principal to `who`.
    pub fn fund(&mut self, who: &Address, amount: u64) {
        let token = self.principal();
        self.engine.ledger_mut().mint(&token, who, amount).unwrap();
    }

    /// Mint `amount` of `token` to the owner, ready for `add_reward`.
    pub fn fund_owner(&mut self, token: &Address, amount: u64) {
        let owner = self.owner();
        self.engine.ledger_mut().mint(token, &owner, amount).unwrap();
    }

    pub fn balance(&self, token: &Address, who: &Address) -> u64 {
        self.engine.ledger().balance_of(token, who)
    }

    pub fn principal_balance(&self, who: &Address) -> u64 {
        self.balance(&self.principal(), who)
    }

    pub fn custody_balance(&self, token: &Address) -> u64 {
        let custody = self.engine.ledger().custody();
        self.balance(token, &custody)
    }

    /// Fund `who` with `amount` and lock it all for `months`.
    pub fn fund_and_lock(&mut self, who: &Address, amount: u64, months: u64, now: u64) -> Lock {
        self.fund(who, amount);
        self.lock(who, amount, months, now).unwrap()
    }

    pub fn lock(&mut self, who: &Address, amount: u64, months: u64, now: u64) -> Result<Lock, TideError> {
        self.engine.lock(CallContext::new(*who, now), amount, months)
    }

    pub fn withdraw(&mut self, who: &Address, now: u64) -> Result<u64, TideError> {
        self.engine.withdraw(CallContext::new(*who, now))
    }

    pub fn early_withdraw(
        &mut self,
        who: &Address,
        withdrawal: Withdrawal,
        now: u64,
    ) -> Result<PenaltyReceipt, TideError> {
        self.engine.early_withdraw_with_penalty(CallContext::new(*who, now), withdrawal)
    }

    /// Fund and start a reward program as the owner.
    pub fn add_reward(&mut self, token: &Address, offset: u64, months: u64, amount: u64, now: u64) {
        self.fund_owner(token, amount);
        let ctx = CallContext::new(self.owner(), now);
        self.engine.add_reward(ctx, *token, offset, months, amount).unwrap();
    }

    pub fn claim(&mut self, who: &Address, token: &Address, now: u64) -> Result<u64, TideError> {
        self.engine.claim(CallContext::new(*who, now), *token)
    }

    pub fn recover(&mut self, token: &Address, from: u64, to: u64, now: u64) -> Result<u64, TideError> {
        let ctx = CallContext::new(self.owner(), now);
        self.engine.recover(ctx, *token, from, to)
    }

    pub fn pending(&self, who: &Address, token: &Address, now: u64) -> u64 {
        self.engine.pending_rewards(who, token, now).unwrap()
    }

    pub fn events(&mut self) -> Vec<LockEvent> {
        self.engine.take_events()
    }
}
