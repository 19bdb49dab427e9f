//! Executes scenario steps against an in-memory engine.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::warn;

use tidelock_core::constants::SECONDS_PER_DAY;
use tidelock_core::error::TideError;
use tidelock_core::ledger::{MemoryLedger, SingleOwner};
use tidelock_core::traits::TokenLedger;
use tidelock_core::types::{Address, CallContext, Withdrawal};
use tidelock_engine::{EngineConfig, Locking, LockingState};

use crate::script::{Action, Step};

/// Engine state plus the token balances it runs against.
#[derive(Debug, Clone, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct SimSnapshot {
    pub state: LockingState,
    pub ledger: MemoryLedger,
}

pub struct Runner {
    config: EngineConfig,
    engine: Locking<MemoryLedger, SingleOwner>,
}

impl Runner {
    /// Start fresh, or from `snapshot` when given.
    pub fn new(config: EngineConfig, snapshot: Option<SimSnapshot>) -> Result<Self> {
        let access = SingleOwner(config.owner);
        let engine = match snapshot {
            Some(SimSnapshot { state, ledger }) => Locking::with_state(&config, state, ledger, access)?,
            None => Locking::new(&config, MemoryLedger::new(Address::from_label("tidelock/custody")), access)?,
        };
        Ok(Self { config, engine })
    }

    pub fn engine(&self) -> &Locking<MemoryLedger, SingleOwner> {
        &self.engine
    }

    pub fn into_snapshot(self) -> SimSnapshot {
        let (state, ledger) = self.engine.into_parts();
        SimSnapshot { state, ledger }
    }

    fn resolve(&self, name: &str) -> Address {
        match name {
            "principal" => self.config.principal_token,
            "owner" => self.config.owner,
            _ if name.len() == 64 => name.parse().unwrap_or_else(|_| Address::from_label(name)),
            _ => Address::from_label(name),
        }
    }

    /// Run one step and describe the outcome as a JSON object.
    pub fn run_step(&mut self, index: usize, step: &Step) -> Value {
        let now = self.config.epoch + step.day * SECONDS_PER_DAY + step.seconds;
        let mut line = json!({
            "step": index,
            "day": step.day,
            "month": self.engine.current_month(now),
            "action": step.action.name(),
        });
        match self.execute(now, &step.action) {
            Ok(result) => {
                line["ok"] = json!(true);
                line["result"] = result;
            }
            Err(err) => {
                line["ok"] = json!(false);
                if let Some(tide) = err.downcast_ref::<TideError>() {
                    line["code"] = json!(tide.code());
                }
                line["error"] = json!(err.to_string());
                warn!(step = index, action = step.action.name(), error = %err, "step failed");
            }
        }
        let events: Vec<Value> = self
            .engine
            .take_events()
            .iter()
            .map(|e| serde_json::to_value(e).unwrap_or(Value::Null))
            .collect();
        line["events"] = Value::Array(events);
        line
    }

    fn execute(&mut self, now: u64, action: &Action) -> Result<Value> {
        let owner = self.config.owner;
        Ok(match action {
            Action::Mint { token, to, amount } => {
                let (token, to) = (self.resolve(token), self.resolve(to));
                self.engine.ledger_mut().mint(&token, &to, *amount).context("mint failed")?;
                json!({ "balance": self.engine.ledger().balance_of(&token, &to) })
            }
            Action::Lock { account, amount, months } => {
                let ctx = CallContext::new(self.resolve(account), now);
                let lock = self.engine.lock(ctx, *amount, *months)?;
                json!({ "amount": lock.amount, "end_month": lock.end_month })
            }
            Action::Withdraw { account } => {
                let amount = self.engine.withdraw(CallContext::new(self.resolve(account), now))?;
                json!({ "amount": amount })
            }
            Action::EarlyWithdraw { account, amount } => {
                let withdrawal = amount.map_or(Withdrawal::Full, Withdrawal::Partial);
                let receipt =
                    self.engine.early_withdraw_with_penalty(CallContext::new(self.resolve(account), now), withdrawal)?;
                json!({
                    "amount": receipt.amount,
                    "penalty": receipt.penalty,
                    "payout": receipt.payout,
                    "fees": receipt.fees,
                })
            }
            Action::AddReward { token, offset, months, amount } => {
                let token = self.resolve(token);
                self.engine.add_reward(CallContext::new(owner, now), token, *offset, *months, *amount)?;
                json!({ "token": token })
            }
            Action::Claim { account, token } => {
                let token = self.resolve(token);
                let amount = self.engine.claim(CallContext::new(self.resolve(account), now), token)?;
                json!({ "amount": amount })
            }
            Action::Recover { token, from_month, to_month } => {
                let token = self.resolve(token);
                let amount = self.engine.recover(CallContext::new(owner, now), token, *from_month, *to_month)?;
                json!({ "amount": amount })
            }
            Action::UpdateBoost { factors } => {
                self.engine.update_boost_factors(CallContext::new(owner, now), factors)?;
                json!({})
            }
            Action::Report { accounts, tokens } => self.report(now, accounts, tokens)?,
        })
    }

    fn report(&self, now: u64, accounts: &[String], tokens: &[String]) -> Result<Value> {
        let tokens: Vec<Address> = if tokens.is_empty() {
            self.engine.reward_tokens()
        } else {
            tokens.iter().map(|t| self.resolve(t)).collect()
        };

        let mut rows = Vec::with_capacity(accounts.len());
        for name in accounts {
            let account = self.resolve(name);
            let lock = self.engine.lock_of(&account);
            let mut pending = serde_json::Map::new();
            for token in &tokens {
                pending.insert(token.to_string(), json!(self.engine.pending_rewards(&account, token, now)?));
            }
            rows.push(json!({
                "name": name,
                "lock": { "amount": lock.amount, "end_month": lock.end_month },
                "boosted_balance": self.engine.boosted_balance(&account, now).to_string(),
                "balance": self.engine.ledger().balance_of(self.engine.principal_token(), &account),
                "pending": pending,
            }));
        }

        Ok(json!({
            "total_locked": self.engine.total_locked(now),
            "total_boosted": self.engine.total_boosted(now).to_string(),
            "total_principal": self.engine.total_principal(),
            "locked_by_duration": self.engine.locked_by_duration(now).to_vec(),
            "accounts": rows,
        }))
    }
}
