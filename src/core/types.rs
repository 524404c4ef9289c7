//! Core types - Strong typing for orders, accounts and amounts

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Amount in the ledger's smallest unit
pub type Amount = u128;

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// Render a smallest-unit amount as whole tokens, e.g. `7000000000000000000`
/// with 18 decimals as `7`. Amounts beyond `Decimal` range print raw.
pub fn format_units(amount: Amount, decimals: u32) -> String {
    i128::try_from(amount)
        .ok()
        .and_then(|raw| Decimal::try_from_i128_with_scale(raw, decimals).ok())
        .map(|d| d.normalize().to_string())
        .unwrap_or_else(|| amount.to_string())
}

/// Ledger account identifier (e.g., "0xabc..." or "alice")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Card identifier at the asset registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(pub u64);

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "card#{}", self.0)
    }
}

/// Order sequence number, doubles as the arena index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl OrderId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order#{}", self.0)
    }
}

/// Order lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    Listed,
    Rented,
    Settled,
    Closed,
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderState::Listed => write!(f, "LISTED"),
            OrderState::Rented => write!(f, "RENTED"),
            OrderState::Settled => write!(f, "SETTLED"),
            OrderState::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Which party ran settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementPath {
    Lister,
    Tenant,
}

/// Audit record of a completed settlement.
///
/// `lister_payout + tenant_refund + platform_fee` always equals the escrowed
/// `rent + care_deposit` of the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub path: SettlementPath,
    pub restocked: bool,
    pub lister_payout: Amount,
    pub tenant_refund: Amount,
    pub platform_fee: Amount,
    pub penalty: Amount,
    pub settled_at: Timestamp,
}

impl Settlement {
    pub fn total_paid(&self) -> Amount {
        self.lister_payout + self.tenant_refund + self.platform_fee
    }
}

/// Rent order - the central record of the order book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentOrder {
    pub id: OrderId,
    pub card_id: CardId,
    pub lister: AccountId,
    pub price_per_day: Amount,
    pub term_days: u32,
    pub tenant: Option<AccountId>,
    pub started_at: Option<Timestamp>,
    pub care_deposit: Amount,
    pub state: OrderState,
    pub created_at: Timestamp,
    pub settlement: Option<Settlement>,
}

impl RentOrder {
    pub fn new(
        id: OrderId,
        card_id: CardId,
        lister: AccountId,
        price_per_day: Amount,
        term_days: u32,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            card_id,
            lister,
            price_per_day,
            term_days,
            tenant: None,
            started_at: None,
            care_deposit: 0,
            state: OrderState::Listed,
            created_at,
            settlement: None,
        }
    }

    /// Total rent for the term (`price_per_day × term_days`)
    pub fn rent(&self) -> Result<Amount> {
        self.price_per_day
            .checked_mul(Amount::from(self.term_days))
            .ok_or_else(|| Error::InvalidArgument(format!("{}: rent overflows", self.id)))
    }

    /// Rent plus care deposit, the amount held in escrow while rented
    pub fn escrow_total(&self) -> Result<Amount> {
        self.rent()?
            .checked_add(self.care_deposit)
            .ok_or_else(|| Error::InvalidArgument(format!("{}: escrow overflows", self.id)))
    }

    /// Timestamp at which the term elapses, if rented
    pub fn ends_at(&self, seconds_per_day: u64) -> Option<Timestamp> {
        let start = self.started_at?;
        let term = u64::from(self.term_days).checked_mul(seconds_per_day)?;
        Some(start.saturating_add(term))
    }

    /// Listed or Rented - holds the card on the market
    pub fn is_active(&self) -> bool {
        matches!(self.state, OrderState::Listed | OrderState::Rented)
    }

    pub fn is_tenant(&self, account: &AccountId) -> bool {
        self.tenant.as_ref() == Some(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(price: Amount, days: u32) -> RentOrder {
        RentOrder::new(OrderId(0), CardId(1), AccountId::new("lister"), price, days, 0)
    }

    #[test]
    fn test_rent_overflow_is_rejected() {
        let o = order(Amount::MAX, 2);
        assert!(matches!(o.rent(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(7_000_000_000_000_000_000, 18), "7");
        assert_eq!(format_units(6_979_000_000_000_000_000, 18), "6.979");
        assert_eq!(format_units(21_000_000_000_000_000, 18), "0.021");
        assert_eq!(format_units(Amount::MAX, 18), Amount::MAX.to_string());
    }

    #[test]
    fn test_ends_at_requires_start() {
        let mut o = order(10, 7);
        assert_eq!(o.ends_at(86_400), None);
        o.started_at = Some(1_000);
        assert_eq!(o.ends_at(86_400), Some(1_000 + 7 * 86_400));
    }
}
