//! Restock oracle quoting a settable unit price

use parking_lot::RwLock;

use crate::core::{Amount, RestockOracle, Result};

/// Oracle quoting a settable restock unit price.
#[derive(Debug, Default)]
pub struct FixedPriceOracle {
    price: RwLock<Amount>,
}

impl FixedPriceOracle {
    pub fn new(price: Amount) -> Self {
        Self { price: RwLock::new(price) }
    }

    pub fn set_price(&self, price: Amount) {
        *self.price.write() = price;
    }
}

impl RestockOracle for FixedPriceOracle {
    fn current_unit_price(&self) -> Result<Amount> {
        Ok(*self.price.read())
    }
}
