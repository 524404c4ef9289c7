//! In-memory token ledger - balances and allowances behind one lock

use parking_lot::Mutex;
use std::collections::HashMap;

use crate::core::{AccountId, Amount, Error, Result, TokenLedger};

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<AccountId, Amount>,
    allowances: HashMap<(AccountId, AccountId), Amount>, // (owner, spender) → remaining
}

impl LedgerState {
    fn balance(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Debit then credit; fails without touching state if `from` is short.
    fn move_funds(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<()> {
        let available = self.balance(from);
        if available < amount {
            return Err(Error::Funds(format!(
                "{} has {}, needs {}",
                from, available, amount
            )));
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or_else(|| Error::InvalidArgument(format!("balance of {} overflows", to)))?;

        self.balances.insert(from.clone(), available - amount);
        self.balances.insert(to.clone(), credited);
        Ok(())
    }
}

/// Token ledger held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` new tokens for `account`.
    pub fn mint(&self, account: &AccountId, amount: Amount) {
        let mut state = self.state.lock();
        let entry = state.balances.entry(account.clone()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Set the allowance `owner` grants to `spender`, replacing any previous one.
    pub fn approve(&self, owner: &AccountId, spender: &AccountId, amount: Amount) {
        self.state
            .lock()
            .allowances
            .insert((owner.clone(), spender.clone()), amount);
    }

    /// Sum of all balances; constant across transfers.
    pub fn total_supply(&self) -> Amount {
        self.state.lock().balances.values().sum()
    }
}

impl TokenLedger for InMemoryLedger {
    fn transfer_from(
        &self,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let key = (owner.clone(), spender.clone());
        let allowed = state.allowances.get(&key).copied().unwrap_or(0);
        if allowed < amount {
            return Err(Error::Funds(format!(
                "allowance of {} for {} is {}, needs {}",
                owner, spender, allowed, amount
            )));
        }

        state.move_funds(owner, to, amount)?;
        state.allowances.insert(key, allowed - amount);
        Ok(())
    }

    fn transfer(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<()> {
        self.state.lock().move_funds(from, to, amount)
    }

    fn balance_of(&self, account: &AccountId) -> Amount {
        self.state.lock().balance(account)
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.state
            .lock()
            .allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let ledger = InMemoryLedger::new();
        let alice = AccountId::new("alice");
        let engine = AccountId::new("engine");
        let vault = AccountId::new("vault");
        ledger.mint(&alice, 100);
        ledger.approve(&alice, &engine, 60);

        ledger.transfer_from(&engine, &alice, &vault, 40).unwrap();
        assert_eq!(ledger.balance_of(&alice), 60);
        assert_eq!(ledger.balance_of(&vault), 40);
        assert_eq!(ledger.allowance(&alice, &engine), 20);

        let err = ledger.transfer_from(&engine, &alice, &vault, 21).unwrap_err();
        assert!(matches!(err, Error::Funds(_)));
        assert_eq!(ledger.balance_of(&alice), 60);
    }

    #[test]
    fn test_short_balance_leaves_allowance_untouched() {
        let ledger = InMemoryLedger::new();
        let (alice, engine) = (AccountId::new("alice"), AccountId::new("engine"));
        ledger.mint(&alice, 10);
        ledger.approve(&alice, &engine, 50);

        assert!(matches!(ledger.transfer_from(&engine, &alice, &engine, 20), Err(Error::Funds(_))));
        assert_eq!(ledger.allowance(&alice, &engine), 50);
        assert_eq!(ledger.total_supply(), 10);
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let ledger = InMemoryLedger::new();
        let alice = AccountId::new("alice");
        ledger.mint(&alice, 10);
        ledger.transfer(&alice, &alice, 4).unwrap();
        assert_eq!(ledger.balance_of(&alice), 10);
    }
}
