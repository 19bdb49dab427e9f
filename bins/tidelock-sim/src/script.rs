//! Scenario scripts: a JSON list of timed calls.
//!
//! ```json
//! { "steps": [
//!   { "day": 0,  "action": "mint", "token": "principal", "to": "alice", "amount": 1000 },
//!   { "day": 0,  "action": "lock", "account": "alice", "amount": 1000, "months": 3 },
//!   { "day": 45, "action": "report", "accounts": ["alice"] }
//! ] }
//! ```
//!
//! Names are resolved by the runner: `principal` and `owner` map to the
//! configured addresses, 64-digit hex strings are taken as-is, anything else
//! is hashed into an address.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Days since the epoch.
    #[serde(default)]
    pub day: u64,
    /// Extra seconds on top of `day`.
    #[serde(default)]
    pub seconds: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Mint { token: String, to: String, amount: u64 },
    Lock { account: String, #[serde(default)] amount: u64, #[serde(default)] months: u64 },
    Withdraw { account: String },
    /// Full withdrawal when `amount` is absent.
    EarlyWithdraw { account: String, amount: Option<u64> },
    AddReward { token: String, #[serde(default)] offset: u64, months: u64, amount: u64 },
    Claim { account: String, token: String },
    Recover { token: String, from_month: u64, to_month: u64 },
    UpdateBoost { factors: Vec<u64> },
    Report {
        #[serde(default)]
        accounts: Vec<String>,
        #[serde(default)]
        tokens: Vec<String>,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mint { .. } => "mint",
            Self::Lock { .. } => "lock",
            Self::Withdraw { .. } => "withdraw",
            Self::EarlyWithdraw { .. } => "early_withdraw",
            Self::AddReward { .. } => "add_reward",
            Self::Claim { .. } => "claim",
            Self::Recover { .. } => "recover",
            Self::UpdateBoost { .. } => "update_boost",
            Self::Report { .. } => "report",
        }
    }
}

impl Script {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid scenario script")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_action() {
        let script = Script::from_json(
            r#"{ "steps": [
                { "action": "mint", "token": "principal", "to": "alice", "amount": 5 },
                { "day": 1, "action": "lock", "account": "alice", "amount": 5, "months": 3 },
                { "day": 2, "seconds": 10, "action": "early_withdraw", "account": "alice", "amount": 1 },
                { "action": "early_withdraw", "account": "alice" },
                { "action": "withdraw", "account": "alice" },
                { "action": "add_reward", "token": "usdc", "months": 5, "amount": 50000 },
                { "action": "claim", "account": "alice", "token": "usdc" },
                { "action": "recover", "token": "usdc", "from_month": 0, "to_month": 1 },
                { "action": "update_boost", "factors": [1, 2] },
                { "action": "report" }
            ] }"#,
        )
        .unwrap();
        let names: Vec<&str> = script.steps.iter().map(|s| s.action.name()).collect();
        assert_eq!(
            names,
            vec![
                "mint", "lock", "early_withdraw", "early_withdraw", "withdraw", "add_reward", "claim", "recover",
                "update_boost", "report"
            ]
        );
        assert_eq!(script.steps[2].seconds, 10);
        assert!(matches!(script.steps[3].action, Action::EarlyWithdraw { amount: None, .. }));
        assert!(matches!(script.steps[5].action, Action::AddReward { offset: 0, .. }));
    }

    #[test]
    fn unknown_action_fails() {
        assert!(Script::from_json(r#"{ "steps": [ { "action": "explode" } ] }"#).is_err());
    }
}
