//! Order book - arena of rent orders addressed by id.
//!
//! The arena is the only source of truth; every "on market" view is a filter
//! over it, so there is no secondary list to fall out of sync.

use crate::core::{
    AccountId, Amount, CardId, Error, OrderId, OrderState, RentOrder, Result, Timestamp,
};

#[derive(Debug, Default)]
pub struct OrderBook {
    orders: Vec<RentOrder>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self { orders: Vec::new() }
    }

    /// Append a new `Listed` order, returning its id.
    pub fn insert(
        &mut self,
        card_id: CardId,
        lister: AccountId,
        price_per_day: Amount,
        term_days: u32,
        created_at: Timestamp,
    ) -> OrderId {
        let id = OrderId(self.orders.len() as u64);
        self.orders
            .push(RentOrder::new(id, card_id, lister, price_per_day, term_days, created_at));
        id
    }

    pub fn get(&self, id: OrderId) -> Result<&RentOrder> {
        self.orders
            .get(id.index())
            .ok_or_else(|| Error::NotFound(format!("{} does not exist", id)))
    }

    pub fn get_mut(&mut self, id: OrderId) -> Result<&mut RentOrder> {
        self.orders
            .get_mut(id.index())
            .ok_or_else(|| Error::NotFound(format!("{} does not exist", id)))
    }

    /// The Listed or Rented order holding this card, if any
    pub fn active_for_card(&self, card_id: CardId) -> Option<&RentOrder> {
        self.orders.iter().find(|o| o.card_id == card_id && o.is_active())
    }

    fn filtered<'a>(
        &'a self,
        pred: impl Fn(&RentOrder) -> bool + 'a,
    ) -> impl Iterator<Item = &'a RentOrder> + 'a {
        self.orders.iter().filter(move |&o| pred(o))
    }

    /// Every order currently open for renting
    pub fn listed(&self) -> Vec<RentOrder> {
        self.filtered(|o| o.state == OrderState::Listed).cloned().collect()
    }

    /// Open orders of one lister
    pub fn listed_by(&self, lister: &AccountId) -> Vec<RentOrder> {
        self.filtered(|o| o.state == OrderState::Listed && &o.lister == lister)
            .cloned()
            .collect()
    }

    /// Running rentals of one tenant
    pub fn rented_by(&self, tenant: &AccountId) -> Vec<RentOrder> {
        self.filtered(|o| o.state == OrderState::Rented && o.is_tenant(tenant))
            .cloned()
            .collect()
    }

    /// Sum of `rent + care_deposit` over running rentals
    pub fn escrowed_total(&self) -> Result<Amount> {
        self.filtered(|o| o.state == OrderState::Rented)
            .try_fold(0 as Amount, |acc, o| {
                acc.checked_add(o.escrow_total()?)
                    .ok_or_else(|| Error::InvalidArgument("escrow total overflows".into()))
            })
    }
}
