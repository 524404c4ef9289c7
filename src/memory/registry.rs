//! In-memory card registry - holders, capabilities and transfer locks

use parking_lot::Mutex;
use std::collections::HashMap;

use crate::core::{AccountId, Amount, AssetRegistry, CardId, Error, Result};

#[derive(Debug, Clone)]
struct CardRecord {
    holder: AccountId,
    max_capability: Amount,
    locked: bool,
}

/// Card registry held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    cards: Mutex<HashMap<CardId, CardRecord>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new card. Re-minting an existing id is rejected.
    pub fn mint(&self, card: CardId, holder: &AccountId, max_capability: Amount) -> Result<()> {
        let mut cards = self.cards.lock();
        if cards.contains_key(&card) {
            return Err(Error::InvalidState(format!("{} already minted", card)));
        }
        cards.insert(
            card,
            CardRecord {
                holder: holder.clone(),
                max_capability,
                locked: false,
            },
        );
        Ok(())
    }

    /// Holder-initiated transfer; refused while the card is rented out.
    pub fn transfer(&self, card: CardId, from: &AccountId, to: &AccountId) -> Result<()> {
        let mut cards = self.cards.lock();
        let record = cards
            .get_mut(&card)
            .ok_or_else(|| Error::NotFound(format!("{} not registered", card)))?;
        if &record.holder != from {
            return Err(Error::Authorization(format!("{} does not hold {}", from, card)));
        }
        if record.locked {
            return Err(Error::InvalidState(format!("{} is rented and cannot move", card)));
        }
        record.holder = to.clone();
        Ok(())
    }

    pub fn is_locked(&self, card: CardId) -> bool {
        self.cards.lock().get(&card).map(|c| c.locked).unwrap_or(false)
    }

    fn set_lock(&self, card: CardId, locked: bool) -> Result<()> {
        let mut cards = self.cards.lock();
        let record = cards
            .get_mut(&card)
            .ok_or_else(|| Error::NotFound(format!("{} not registered", card)))?;
        if record.locked == locked {
            return Err(Error::InvalidState(format!(
                "{} already {}",
                card,
                if locked { "locked" } else { "unlocked" }
            )));
        }
        record.locked = locked;
        Ok(())
    }
}

impl AssetRegistry for InMemoryRegistry {
    fn current_holder(&self, card: CardId) -> Result<AccountId> {
        self.cards
            .lock()
            .get(&card)
            .map(|c| c.holder.clone())
            .ok_or_else(|| Error::NotFound(format!("{} not registered", card)))
    }

    fn max_capability(&self, card: CardId) -> Result<Amount> {
        self.cards
            .lock()
            .get(&card)
            .map(|c| c.max_capability)
            .ok_or_else(|| Error::NotFound(format!("{} not registered", card)))
    }

    fn lock_transfer(&self, card: CardId) -> Result<()> {
        self.set_lock(card, true)
    }

    fn unlock_transfer(&self, card: CardId) -> Result<()> {
        self.set_lock(card, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_card_cannot_move() {
        let registry = InMemoryRegistry::new();
        let (alice, bob) = (AccountId::new("alice"), AccountId::new("bob"));
        registry.mint(CardId(1), &alice, 12).unwrap();

        registry.lock_transfer(CardId(1)).unwrap();
        assert!(matches!(registry.transfer(CardId(1), &alice, &bob), Err(Error::InvalidState(_))));

        registry.unlock_transfer(CardId(1)).unwrap();
        registry.transfer(CardId(1), &alice, &bob).unwrap();
        assert_eq!(registry.current_holder(CardId(1)).unwrap(), bob);
    }

    #[test]
    fn test_unknown_card() {
        let registry = InMemoryRegistry::new();
        assert!(matches!(registry.max_capability(CardId(9)), Err(Error::NotFound(_))));
        assert!(matches!(registry.lock_transfer(CardId(9)), Err(Error::NotFound(_))));
    }
}
