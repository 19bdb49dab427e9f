//! In-memory collaborator implementations.
//!
//! [`MemoryLedger`] keeps balances in a map and [`SingleOwner`] grants
//! ownership to one address. Used by the scenario runner and by tests; a
//! deployment plugs its own token and access-control backends into the same
//! traits.

use std::collections::BTreeMap;

use tracing::trace;

use crate::error::TokenError;
use crate::traits::{AccessControl, TokenLedger};
use crate::types::Address;

/// Balance map keyed by `(token, holder)`.
#[derive(Debug, Clone, PartialEq, Eq, Default, bincode::Encode, bincode::Decode)]
pub struct MemoryLedger {
    custody: Address,
    balances: BTreeMap<(Address, Address), u64>,
}

impl MemoryLedger {
    /// Create an empty ledger whose custody account is `custody`.
    pub fn new(custody: Address) -> Self {
        Self { custody, balances: BTreeMap::new() }
    }

    /// Credit `amount` of `token` to `holder` out of thin air.
    ///
    /// # Errors
    ///
    /// [`TokenError::BalanceOverflow`] if the balance would exceed `u64::MAX`.
    pub fn mint(&mut self, token: &Address, holder: &Address, amount: u64) -> Result<(), TokenError> {
        let entry = self.balances.entry((*token, *holder)).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(TokenError::BalanceOverflow)?;
        Ok(())
    }

    /// Sum of all balances of `token`.
    pub fn supply(&self, token: &Address) -> u128 {
        self.balances
            .iter()
            .filter(|((t, _), _)| t == token)
            .map(|(_, &b)| b as u128)
            .sum()
    }

    fn move_balance(&mut self, token: &Address, from: &Address, to: &Address, amount: u64) -> Result<(), TokenError> {
        let have = self.balance_of(token, from);
        if have < amount {
            return Err(TokenError::InsufficientBalance { token: *token, holder: *from, have, need: amount });
        }
        let to_balance = self.balance_of(token, to);
        if from != to {
            to_balance.checked_add(amount).ok_or(TokenError::BalanceOverflow)?;
        }
        if amount == 0 || from == to {
            return Ok(());
        }

        self.balances.insert((*token, *from), have - amount);
        self.balances.insert((*token, *to), to_balance + amount);
        trace!(%token, %from, %to, amount, "ledger transfer");
        Ok(())
    }
}

impl TokenLedger for MemoryLedger {
    fn custody(&self) -> Address {
        self.custody
    }

    fn transfer_from(&mut self, token: &Address, payer: &Address, amount: u64) -> Result<(), TokenError> {
        let custody = self.custody;
        self.move_balance(token, payer, &custody, amount)
    }

    fn transfer(&mut self, token: &Address, recipient: &Address, amount: u64) -> Result<(), TokenError> {
        let custody = self.custody;
        self.move_balance(token, &custody, recipient, amount)
    }

    fn balance_of(&self, token: &Address, holder: &Address) -> u64 {
        self.balances.get(&(*token, *holder)).copied().unwrap_or(0)
    }
}

/// Access control with exactly one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleOwner(pub Address);

impl AccessControl for SingleOwner {
    fn is_owner(&self, caller: &Address) -> bool {
        *caller == self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    #[test]
    fn transfer_from_moves_into_custody() {
        let token = addr("token");
        let mut ledger = MemoryLedger::new(addr("vault"));
        ledger.mint(&token, &addr("alice"), 100).unwrap();

        ledger.transfer_from(&token, &addr("alice"), 40).unwrap();
        assert_eq!(ledger.balance_of(&token, &addr("alice")), 60);
        assert_eq!(ledger.balance_of(&token, &addr("vault")), 40);
    }

    #[test]
    fn transfer_pays_out_of_custody() {
        let token = addr("token");
        let mut ledger = MemoryLedger::new(addr("vault"));
        ledger.mint(&token, &addr("vault"), 50).unwrap();

        ledger.transfer(&token, &addr("bob"), 20).unwrap();
        assert_eq!(ledger.balance_of(&token, &addr("vault")), 30);
        assert_eq!(ledger.balance_of(&token, &addr("bob")), 20);
    }

    #[test]
    fn insufficient_balance_fails_without_change() {
        let token = addr("token");
        let mut ledger = MemoryLedger::new(addr("vault"));
        ledger.mint(&token, &addr("alice"), 10).unwrap();

        let err = ledger.transfer_from(&token, &addr("alice"), 11).unwrap_err();
        assert_eq!(
            err,
            TokenError::InsufficientBalance { token, holder: addr("alice"), have: 10, need: 11 }
        );
        assert_eq!(ledger.balance_of(&token, &addr("alice")), 10);
        assert_eq!(ledger.balance_of(&token, &addr("vault")), 0);
    }

    #[test]
    fn transfers_conserve_supply() {
        let token = addr("token");
        let mut ledger = MemoryLedger::new(addr("vault"));
        ledger.mint(&token, &addr("alice"), 1_000).unwrap();
        ledger.transfer_from(&token, &addr("alice"), 700).unwrap();
        ledger.transfer(&token, &addr("bob"), 300).unwrap();
        ledger.transfer(&token, &addr("carol"), 0).unwrap();
        assert_eq!(ledger.supply(&token), 1_000);
    }

    #[test]
    fn tokens_are_independent() {
        let mut ledger = MemoryLedger::new(addr("vault"));
        ledger.mint(&addr("a"), &addr("alice"), 5).unwrap();
        assert_eq!(ledger.balance_of(&addr("b"), &addr("alice")), 0);
        assert!(ledger.transfer_from(&addr("b"), &addr("alice"), 1).is_err());
    }

    #[test]
    fn mint_overflow_is_rejected() {
        let token = addr("token");
        let mut ledger = MemoryLedger::new(addr("vault"));
        ledger.mint(&token, &addr("alice"), u64::MAX).unwrap();
        assert_eq!(ledger.mint(&token, &addr("alice"), 1), Err(TokenError::BalanceOverflow));
    }

    #[test]
    fn single_owner_gates() {
        let acl = SingleOwner(addr("owner"));
        assert!(acl.is_owner(&addr("owner")));
        assert!(!acl.is_owner(&addr("mallory")));
    }
}
