//! Collaborator interfaces.
//!
//! The engine never moves tokens or decides ownership itself:
//! - [`TokenLedger`]: fungible-token custody, pulled from payers and paid out of custody
//! - [`AccessControl`]: owner gating for privileged operations

use crate::error::TokenError;
use crate::types::Address;

/// Token transfers into and out of the engine's custody account.
///
/// Implementations enforce conservation: they fail rather than create or
/// destroy balance.
pub trait TokenLedger {
    /// The account holding all locked principal and reward funds.
    fn custody(&self) -> Address;

    /// Move `amount` of `token` from `payer` into custody.
    ///
    /// # Errors
    ///
    /// [`TokenError::InsufficientBalance`] if `payer` holds less than `amount`.
    fn transfer_from(&mut self, token: &Address, payer: &Address, amount: u64) -> Result<(), TokenError>;

    /// Move `amount` of `token` out of custody to `recipient`.
    ///
    /// # Errors
    ///
    /// [`TokenError::InsufficientBalance`] if custody holds less than `amount`.
    fn transfer(&mut self, token: &Address, recipient: &Address, amount: u64) -> Result<(), TokenError>;

    /// Balance of `token` held by `holder`.
    fn balance_of(&self, token: &Address, holder: &Address) -> u64;
}

/// Owner gating for `update_boost_factors`, `add_reward` and `recover`.
pub trait AccessControl {
    fn is_owner(&self, caller: &Address) -> bool;
}
