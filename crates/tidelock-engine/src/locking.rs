//! The locking engine: every state-changing entry point and every view.
//!
//! Each entry point runs in the same order:
//! 1. owner and native-value checks;
//! 2. catch-up: accrue every reward program for the months that elapsed since
//!    the last call, then roll the decay buckets forward;
//! 3. validation and fallible arithmetic on copies;
//! 4. token transfers through the [`TokenLedger`];
//! 5. an infallible commit, plus one [`LockEvent`].
//!
//! Catch-up depends only on time, and every view performs the same projection
//! on copies, so a call that fails after step 2 is indistinguishable from one
//! that never happened.

use tracing::{debug, info};

use tidelock_core::boost::{BoostSchedule, BoostTable};
use tidelock_core::clock::MonthClock;
use tidelock_core::constants::{BOOST_SLOTS, BPS_PRECISION, PRECISION};
use tidelock_core::error::{RewardError, TideError, TokenError};
use tidelock_core::traits::{AccessControl, TokenLedger};
use tidelock_core::types::{Address, CallContext, Lock, MonthIndex, Withdrawal};
use tidelock_decay::{lock_boosted_units, DecayBuckets, LockChange};
use tidelock_rewards::{RewardProgram, UserCheckpoint};

use crate::config::{ConfigError, EngineConfig};
use crate::events::LockEvent;
use crate::state::LockingState;

/// Outcome of [`Locking::early_withdraw_with_penalty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyReceipt {
    /// Principal taken out of the lock.
    pub amount: u64,
    /// Total penalty withheld.
    pub penalty: u64,
    /// Paid to the caller: `amount - penalty`.
    pub payout: u64,
    /// Penalty shares paid to the first and second fee receiver.
    pub fees: [u64; 2],
}

pub struct Locking<L, A> {
    clock: MonthClock,
    principal_token: Address,
    fee_receivers: [Address; 2],
    penalty_bps: u64,
    fee_split_bps: u64,
    state: LockingState,
    ledger: L,
    access: A,
    events: Vec<LockEvent>,
}

impl<L: TokenLedger, A: AccessControl> Locking<L, A> {
    /// Fresh engine using the config's boost table.
    ///
    /// # Errors
    ///
    /// Any [`EngineConfig::validate`] error.
    pub fn new(config: &EngineConfig, ledger: L, access: A) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = LockingState::new(config.boost_table()?);
        Ok(Self::assemble(config, state, ledger, access))
    }

    /// Reopen an engine from persisted state. The config's boost table is
    /// ignored; the state carries its own boost history.
    ///
    /// # Errors
    ///
    /// Any [`EngineConfig::validate`] error.
    pub fn with_state(config: &EngineConfig, state: LockingState, ledger: L, access: A) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(config, state, ledger, access))
    }

    fn assemble(config: &EngineConfig, state: LockingState, ledger: L, access: A) -> Self {
        Self {
            clock: config.clock(),
            principal_token: config.principal_token,
            fee_receivers: config.fee_receivers,
            penalty_bps: config.penalty_bps,
            fee_split_bps: config.fee_split_bps,
            state,
            ledger,
            access,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &LockingState {
        &self.state
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn clock(&self) -> &MonthClock {
        &self.clock
    }

    pub fn principal_token(&self) -> &Address {
        &self.principal_token
    }

    /// Drain the events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<LockEvent> {
        std::mem::take(&mut self.events)
    }

    // --- catch-up ---

    /// Month observed at `now`. Never earlier than the last month the
    /// buckets were rolled to.
    pub fn current_month(&self, now: u64) -> MonthIndex {
        self.clock.month_at(now).max(self.state.buckets.last_month())
    }

    fn sync(&mut self, month: MonthIndex) {
        let last = self.state.buckets.last_month();
        if month <= last {
            return;
        }
        self.state.rewards.accrue(month, &self.state.buckets, &self.state.boosts);
        self.state.buckets.roll_to(month);
        debug!(from = last, to = month, "caught up");
    }

    fn enter(&mut self, ctx: &CallContext) -> Result<MonthIndex, TideError> {
        if ctx.value != 0 {
            return Err(TideError::NativeTransferRejected(ctx.value));
        }
        let month = self.current_month(ctx.now);
        self.sync(month);
        Ok(month)
    }

    fn enter_owner(&mut self, ctx: &CallContext) -> Result<MonthIndex, TideError> {
        if !self.access.is_owner(&ctx.caller) {
            return Err(TideError::Unauthorized(ctx.caller));
        }
        self.enter(ctx)
    }

    /// Fail before any transfer if custody cannot cover `amount` of `token`.
    fn ensure_custody(&self, token: &Address, amount: u64) -> Result<(), TokenError> {
        let custody = self.ledger.custody();
        let have = self.ledger.balance_of(token, &custody);
        if have < amount {
            return Err(TokenError::InsufficientBalance { token: *token, holder: custody, have, need: amount });
        }
        Ok(())
    }

    /// Settle `account` in every program, move its bucket contribution, and
    /// return the results to commit.
    fn plan_lock_change(
        &self,
        change: &LockChange,
    ) -> Result<(Vec<(Address, UserCheckpoint)>, DecayBuckets), TideError> {
        let settlement =
            self.state.rewards.plan_settlement(&change.account, &change.before, change.month, &self.state.boosts)?;
        let mut buckets = self.state.buckets;
        change.apply_to(&mut buckets)?;
        Ok((settlement, buckets))
    }

    fn commit_lock_change(
        &mut self,
        change: &LockChange,
        settlement: Vec<(Address, UserCheckpoint)>,
        buckets: DecayBuckets,
    ) {
        self.state.rewards.apply_settlement(&change.account, settlement);
        self.state.locks.apply(change);
        self.state.buckets = buckets;
    }

    // --- lock lifecycle ---

    /// Lock `amount` more principal and/or extend the lock by
    /// `duration_months`.
    ///
    /// Returns the resulting lock. A zero duration with no running lock
    /// leaves the principal matured and withdrawable; a zero amount with no
    /// principal returns [`Lock::EMPTY`] and emits nothing.
    ///
    /// # Errors
    ///
    /// - `params`: both arguments zero
    /// - `duration`: more than 24 months remaining
    /// - `overflow`: principal or expiry past `u64`
    /// - `token`: the caller cannot pay `amount`
    pub fn lock(&mut self, ctx: CallContext, amount: u64, duration_months: u64) -> Result<Lock, TideError> {
        let month = self.enter(&ctx)?;
        let change = self.state.locks.plan_lock(&ctx.caller, amount, duration_months, month)?;
        if change.after == change.before {
            debug!(account = %ctx.caller, month, "nothing to lock");
            return Ok(change.after);
        }
        let (settlement, buckets) = self.plan_lock_change(&change)?;

        if amount > 0 {
            self.ledger.transfer_from(&self.principal_token, &ctx.caller, amount)?;
        }

        self.commit_lock_change(&change, settlement, buckets);
        info!(account = %ctx.caller, amount, end_month = change.after.end_month, month, "locked");
        self.events.push(LockEvent::Locked {
            account: ctx.caller,
            amount,
            end_month: change.after.end_month,
        });
        Ok(change.after)
    }

    /// Withdraw principal before the lock matures, paying the penalty.
    ///
    /// No penalty is charged on a matured lock.
    ///
    /// # Errors
    ///
    /// - `no-lock`: the caller holds no principal
    /// - `insufficient`: a partial amount above the principal
    /// - `params`: a zero partial amount
    pub fn early_withdraw_with_penalty(
        &mut self,
        ctx: CallContext,
        withdrawal: Withdrawal,
    ) -> Result<PenaltyReceipt, TideError> {
        let month = self.enter(&ctx)?;
        let change = self.state.locks.plan_early_withdraw(&ctx.caller, withdrawal, month)?;
        let amount = change.released();
        let penalty = if change.before.is_active(month) {
            (amount as u128 * self.penalty_bps as u128 / BPS_PRECISION as u128) as u64
        } else {
            0
        };
        let first = (penalty as u128 * self.fee_split_bps as u128 / BPS_PRECISION as u128) as u64;
        let receipt = PenaltyReceipt { amount, penalty, payout: amount - penalty, fees: [first, penalty - first] };
        let (settlement, buckets) = self.plan_lock_change(&change)?;

        self.ensure_custody(&self.principal_token, amount)?;
        self.ledger.transfer(&self.principal_token, &ctx.caller, receipt.payout)?;
        for (receiver, fee) in self.fee_receivers.iter().zip(receipt.fees) {
            if fee > 0 {
                self.ledger.transfer(&self.principal_token, receiver, fee)?;
            }
        }

        self.commit_lock_change(&change, settlement, buckets);
        info!(account = %ctx.caller, amount, penalty, month, "early withdrawal");
        self.events.push(LockEvent::WithdrawWithPenalty { account: ctx.caller, amount, penalty });
        Ok(receipt)
    }

    /// Withdraw the whole principal of a matured lock.
    ///
    /// Returns the amount paid; zero, with no event, when there is nothing
    /// to withdraw.
    ///
    /// # Errors
    ///
    /// `deadline`: the lock has not matured.
    pub fn withdraw(&mut self, ctx: CallContext) -> Result<u64, TideError> {
        let month = self.enter(&ctx)?;
        let Some(change) = self.state.locks.plan_withdraw(&ctx.caller, month)? else {
            return Ok(0);
        };
        let amount = change.released();
        let (settlement, buckets) = self.plan_lock_change(&change)?;

        self.ledger.transfer(&self.principal_token, &ctx.caller, amount)?;

        self.commit_lock_change(&change, settlement, buckets);
        info!(account = %ctx.caller, amount, month, "withdrew");
        self.events.push(LockEvent::Withdraw { account: ctx.caller, amount });
        Ok(amount)
    }

    // --- owner operations ---

    /// Replace the boost table from the current month onward.
    ///
    /// # Errors
    ///
    /// `unauthorized`, or `boost-table` for an invalid table.
    pub fn update_boost_factors(&mut self, ctx: CallContext, factors: &[u64]) -> Result<(), TideError> {
        let month = self.enter_owner(&ctx)?;
        let table = BoostTable::new(factors)?;
        self.state.boosts.update(table, month);
        info!(month, "boost factors updated");
        self.events.push(LockEvent::BoostFactorsUpdated { month, factors: factors.to_vec() });
        Ok(())
    }

    /// Fund `total_amount` of `token` over `period_months`, starting
    /// `start_offset` months from now.
    ///
    /// # Errors
    ///
    /// `unauthorized`, `reward-params` for a zero period or amount, `range`
    /// if the program would span more than `MAX_PROGRAM_MONTHS` months,
    /// `token` if the owner cannot pay.
    pub fn add_reward(
        &mut self,
        ctx: CallContext,
        token: Address,
        start_offset: u64,
        period_months: u64,
        total_amount: u64,
    ) -> Result<(), TideError> {
        let month = self.enter_owner(&ctx)?;
        let start_month = month.checked_add(start_offset).ok_or(RewardError::ArithmeticOverflow)?;
        let program = self.state.rewards.plan_tranche(&token, month, start_offset, period_months, total_amount)?;

        self.ledger.transfer_from(&token, &ctx.caller, total_amount)?;

        self.state.rewards.insert_program(program);
        info!(%token, start_month, period_months, total_amount, "reward added");
        self.events.push(LockEvent::RewardAdded { token, start_month, period_months, amount: total_amount });
        Ok(())
    }

    /// Pay the caller everything pending in `token`. Zero pending pays zero.
    ///
    /// # Errors
    ///
    /// `unknown-reward` if `token` has no program.
    pub fn claim(&mut self, ctx: CallContext, token: Address) -> Result<u64, TideError> {
        let month = self.enter(&ctx)?;
        let lock = self.state.locks.get(&ctx.caller);
        let (ckpt, amount) = self.state.rewards.plan_claim(&ctx.caller, &token, &lock, month, &self.state.boosts)?;

        if amount > 0 {
            self.ensure_custody(&token, amount)?;
            self.ledger.transfer(&token, &ctx.caller, amount)?;
        }

        self.state.rewards.set_checkpoint(&ctx.caller, &token, ckpt);
        if amount > 0 {
            info!(account = %ctx.caller, %token, amount, "reward claimed");
            self.events.push(LockEvent::RewardClaimed { account: ctx.caller, token, amount });
        }
        Ok(amount)
    }

    /// Send the owner the undistributed emission of the elapsed months
    /// `from_month..=to_month`. Each month is recovered at most once.
    ///
    /// # Errors
    ///
    /// `unauthorized`, `unknown-reward`, or `range` if the range is inverted
    /// or not fully elapsed.
    pub fn recover(
        &mut self,
        ctx: CallContext,
        token: Address,
        from_month: MonthIndex,
        to_month: MonthIndex,
    ) -> Result<u64, TideError> {
        let month = self.enter_owner(&ctx)?;
        let recovery = self.state.rewards.plan_recovery(&token, from_month, to_month, month)?;

        if recovery.amount > 0 {
            self.ensure_custody(&token, recovery.amount)?;
            self.ledger.transfer(&token, &ctx.caller, recovery.amount)?;
        }

        self.state.rewards.apply_recovery(&recovery);
        info!(%token, from_month, to_month, amount = recovery.amount, months = recovery.months.len(), "reward recovered");
        self.events.push(LockEvent::RewardRecovered { token, from_month, to_month, amount: recovery.amount });
        Ok(recovery.amount)
    }

    // --- views ---

    fn projected_buckets(&self, now: u64) -> DecayBuckets {
        self.state.buckets.rolled_to(self.current_month(now))
    }

    pub fn total_locked(&self, now: u64) -> u64 {
        self.projected_buckets(now).total_locked()
    }

    /// Boosted power in principal units, under the current table.
    pub fn total_boosted(&self, now: u64) -> u128 {
        self.projected_buckets(now).total_boosted(self.state.boosts.current())
    }

    /// Unmatured principal by months remaining; entry `i` has `i + 1` left.
    pub fn locked_by_duration(&self, now: u64) -> [u64; BOOST_SLOTS] {
        self.projected_buckets(now).locked_by_duration()
    }

    pub fn lock_of(&self, account: &Address) -> Lock {
        self.state.locks.get(account)
    }

    pub fn boosted_balance(&self, account: &Address, now: u64) -> u128 {
        let month = self.current_month(now);
        lock_boosted_units(&self.state.locks.get(account), month, self.state.boosts.current()) / PRECISION as u128
    }

    /// All principal held, including matured principal not yet withdrawn.
    pub fn total_principal(&self) -> u64 {
        self.state.locks.total_principal()
    }

    /// Raw boost factor for `index + 1` months remaining.
    pub fn month_to_boost(&self, index: usize) -> Option<u64> {
        self.state.boosts.current().factor(index)
    }

    pub fn boost_schedule(&self) -> &BoostSchedule {
        &self.state.boosts
    }

    /// # Errors
    ///
    /// `overflow` if the pending amount does not fit in `u64`.
    pub fn pending_rewards(&self, account: &Address, token: &Address, now: u64) -> Result<u64, TideError> {
        let month = self.current_month(now);
        let lock = self.state.locks.get(account);
        Ok(self.state.rewards.pending(account, token, &lock, month, &self.state.buckets, &self.state.boosts)?)
    }

    /// The program for `token`, with every elapsed month accrued.
    pub fn reward_program(&self, token: &Address, now: u64) -> Option<RewardProgram> {
        let month = self.current_month(now);
        self.state.rewards.projected_program(token, month, &self.state.buckets, &self.state.boosts)
    }

    pub fn reward_tokens(&self) -> Vec<Address> {
        self.state.rewards.tokens().copied().collect()
    }

    pub fn user_checkpoint(&self, account: &Address, token: &Address) -> UserCheckpoint {
        self.state.rewards.checkpoint(account, token)
    }

    /// Consume the engine, returning its state and token ledger.
    pub fn into_parts(self) -> (LockingState, L) {
        (self.state, self.ledger)
    }
}
