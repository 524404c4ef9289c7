//! Core traits - Boundaries to the engine's external collaborators

use crate::core::{AccountId, Amount, CardId, Result, Timestamp};

/// Fungible token ledger used for payment
pub trait TokenLedger: Send + Sync {
    /// Pull `amount` from `owner` to `to`, consuming `spender`'s allowance
    fn transfer_from(
        &self,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<()>;

    /// Move `amount` held by `from` to `to`
    fn transfer(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<()>;

    /// Current balance of an account
    fn balance_of(&self, account: &AccountId) -> Amount;

    /// Remaining allowance `owner` granted to `spender`
    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount;
}

/// Card ownership registry
pub trait AssetRegistry: Send + Sync {
    /// Current holder of the card
    fn current_holder(&self, card: CardId) -> Result<AccountId>;

    /// Maximum capability of the card, sizes the care deposit
    fn max_capability(&self, card: CardId) -> Result<Amount>;

    /// Forbid transfers of the card while it is rented
    fn lock_transfer(&self, card: CardId) -> Result<()>;

    /// Allow transfers again
    fn unlock_transfer(&self, card: CardId) -> Result<()>;
}

/// Restock pricing oracle
pub trait RestockOracle: Send + Sync {
    /// Price of restocking one capability unit
    fn current_unit_price(&self) -> Result<Amount>;
}

/// Game-session outcome reporter
pub trait SessionReporter: Send + Sync {
    /// Whether `tenant` left the card restocked for the term that began at
    /// `term_started_at`. A card that was never played counts as restocked.
    fn did_restock_during_term(
        &self,
        card: CardId,
        tenant: &AccountId,
        term_started_at: Timestamp,
    ) -> Result<bool>;
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
