//! Rental Engine
//! Owns the order book and escrow, drives every order transition.
//!
//! Each state-mutating call holds the vault lock for its full duration,
//! collaborator calls included, so calls are serialized and either commit
//! their transition and fund movement together or fail with no effect.

pub mod accounting;
pub mod book;
pub mod events;


use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clock::SystemClock;
use crate::core::{
    format_units, AccountId, Amount, AssetRegistry, CardId, Clock, EngineConfig, Error, OrderId,
    OrderState, RentOrder, RestockOracle, Result, SessionReporter, Settlement, SettlementPath,
    TokenLedger,
};
use accounting::SettlementInput;
use book::OrderBook;
pub use events::{EventBus, RentEvent};

/// Collaborators bound to the engine. Any of them may be missing until the
/// owner binds it; order operations fail with a config error meanwhile.
#[derive(Default, Clone)]
struct Collaborators {
    ledger: Option<Arc<dyn TokenLedger>>,
    registry: Option<Arc<dyn AssetRegistry>>,
    oracle: Option<Arc<dyn RestockOracle>>,
    reporter: Option<Arc<dyn SessionReporter>>,
}

/// Fully wired collaborator set, resolved once per call.
struct Wired {
    ledger: Arc<dyn TokenLedger>,
    registry: Arc<dyn AssetRegistry>,
    oracle: Arc<dyn RestockOracle>,
    reporter: Arc<dyn SessionReporter>,
}

impl Collaborators {
    fn wired(&self) -> Result<Wired> {
        Ok(Wired {
            ledger: self.ledger.clone().ok_or_else(|| missing("ledger"))?,
            registry: self.registry.clone().ok_or_else(|| missing("asset registry"))?,
            oracle: self.oracle.clone().ok_or_else(|| missing("restock oracle"))?,
            reporter: self.reporter.clone().ok_or_else(|| missing("session reporter"))?,
        })
    }
}

fn missing(what: &str) -> Error {
    Error::Config(format!("{} not configured", what))
}

/// Book, fee pool and undelivered refunds, guarded together.
#[derive(Debug, Default)]
struct Vault {
    book: OrderBook,
    platform_fees: Amount,
    pending_refunds: HashMap<AccountId, Amount>,
}

/// Compare-and-set on the order state.
fn transition(order: &mut RentOrder, from: OrderState, to: OrderState) -> Result<()> {
    if order.state != from {
        return Err(Error::InvalidState(format!(
            "{} is {}, expected {}",
            order.id, order.state, from
        )));
    }
    order.state = to;
    Ok(())
}

/// Builder for [`RentalEngine`]
pub struct RentalEngineBuilder {
    owner: AccountId,
    account: AccountId,
    config: EngineConfig,
    clock: Option<Arc<dyn Clock>>,
    collaborators: Collaborators,
}

impl RentalEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn ledger(mut self, ledger: Arc<dyn TokenLedger>) -> Self {
        self.collaborators.ledger = Some(ledger);
        self
    }

    pub fn registry(mut self, registry: Arc<dyn AssetRegistry>) -> Self {
        self.collaborators.registry = Some(registry);
        self
    }

    pub fn oracle(mut self, oracle: Arc<dyn RestockOracle>) -> Self {
        self.collaborators.oracle = Some(oracle);
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn SessionReporter>) -> Self {
        self.collaborators.reporter = Some(reporter);
        self
    }

    /// Validate the config and build. The clock defaults to [`SystemClock`].
    pub fn build(self) -> Result<RentalEngine> {
        self.config.validate()?;
        Ok(RentalEngine {
            owner: self.owner,
            account: self.account,
            config: self.config,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            collaborators: RwLock::new(self.collaborators),
            vault: Mutex::new(Vault::default()),
            events: EventBus::new(),
        })
    }
}

/// Rental escrow and settlement engine
pub struct RentalEngine {
    /// Administrator: binds collaborators, withdraws platform fees
    owner: AccountId,
    /// Custody account at the ledger holding escrow and fees
    account: AccountId,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    collaborators: RwLock<Collaborators>,
    vault: Mutex<Vault>,
    events: EventBus,
}

impl RentalEngine {
    pub fn builder(owner: AccountId, account: AccountId) -> RentalEngineBuilder {
        RentalEngineBuilder {
            owner,
            account,
            config: EngineConfig::default(),
            clock: None,
            collaborators: Collaborators::default(),
        }
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    /// Ledger account that holds escrow; tenants approve this account.
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn subscribe(&self) -> flume::Receiver<RentEvent> {
        self.events.subscribe()
    }

    fn wired(&self) -> Result<Wired> {
        self.collaborators.read().wired()
    }

    fn units(&self, amount: Amount) -> String {
        format_units(amount, self.config.token_decimals)
    }

    // ---------------- ADMIN ----------------

    fn require_owner(&self, caller: &AccountId) -> Result<()> {
        if caller != &self.owner {
            warn!("Rejected admin call from {}", caller);
            return Err(Error::Authorization(format!("{} is not the engine owner", caller)));
        }
        Ok(())
    }

    pub fn bind_ledger(&self, caller: &AccountId, ledger: Arc<dyn TokenLedger>) -> Result<()> {
        self.require_owner(caller)?;
        self.collaborators.write().ledger = Some(ledger);
        info!("Ledger bound");
        Ok(())
    }

    pub fn bind_registry(
        &self,
        caller: &AccountId,
        registry: Arc<dyn AssetRegistry>,
    ) -> Result<()> {
        self.require_owner(caller)?;
        self.collaborators.write().registry = Some(registry);
        info!("Asset registry bound");
        Ok(())
    }

    pub fn bind_oracle(&self, caller: &AccountId, oracle: Arc<dyn RestockOracle>) -> Result<()> {
        self.require_owner(caller)?;
        self.collaborators.write().oracle = Some(oracle);
        info!("Restock oracle bound");
        Ok(())
    }

    pub fn bind_reporter(
        &self,
        caller: &AccountId,
        reporter: Arc<dyn SessionReporter>,
    ) -> Result<()> {
        self.require_owner(caller)?;
        self.collaborators.write().reporter = Some(reporter);
        info!("Session reporter bound");
        Ok(())
    }

    /// Pay out part of the platform fee pool. Owner only.
    pub fn withdraw_platform_fees(
        &self,
        caller: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        self.require_owner(caller)?;
        let wired = self.wired()?;
        let mut vault = self.vault.lock();

        if amount > vault.platform_fees {
            return Err(Error::Funds(format!(
                "fee pool holds {}, requested {}",
                vault.platform_fees, amount
            )));
        }
        wired.ledger.transfer(&self.account, to, amount)?;
        vault.platform_fees -= amount;

        info!("Withdrew {} platform fees to {}", self.units(amount), to);
        self.events.publish(RentEvent::FeesWithdrawn { to: to.clone(), amount });
        Ok(())
    }

    // ---------------- ORDER LIFECYCLE ----------------

    /// List a card for rent. The caller must hold the card and the card must
    /// not already be Listed or Rented.
    pub fn create_order(
        &self,
        lister: &AccountId,
        card_id: CardId,
        price_per_day: Amount,
        term_days: u32,
    ) -> Result<OrderId> {
        if price_per_day == 0 {
            return Err(Error::InvalidArgument("price per day must be positive".into()));
        }
        if term_days == 0 {
            return Err(Error::InvalidArgument("term must be at least one day".into()));
        }
        price_per_day
            .checked_mul(Amount::from(term_days))
            .ok_or_else(|| Error::InvalidArgument("rent overflows".into()))?;

        let wired = self.wired()?;
        let mut vault = self.vault.lock();

        let holder = wired.registry.current_holder(card_id)?;
        if &holder != lister {
            warn!("{} tried to list {} held by {}", lister, card_id, holder);
            return Err(Error::Authorization(format!("{} does not hold {}", lister, card_id)));
        }
        if let Some(existing) = vault.book.active_for_card(card_id) {
            return Err(Error::InvalidState(format!(
                "{} already on market as {} ({})",
                card_id, existing.id, existing.state
            )));
        }

        let id = vault
            .book
            .insert(card_id, lister.clone(), price_per_day, term_days, self.clock.now());

        info!(
            "Listed {} as {}: {}/day for {} days by {}",
            card_id, id, self.units(price_per_day), term_days, lister
        );
        self.events.publish(RentEvent::OrderCreated {
            order_id: id,
            card_id,
            lister: lister.clone(),
            price_per_day,
            term_days,
        });
        Ok(id)
    }

    /// Rent a listed order: fixes the care deposit at the current restock
    /// price, locks the card and pulls rent plus deposit into escrow.
    pub fn rent_order(&self, tenant: &AccountId, id: OrderId) -> Result<()> {
        let wired = self.wired()?;
        let mut vault = self.vault.lock();

        let order = vault.book.get(id)?;
        if order.state != OrderState::Listed {
            return Err(Error::InvalidState(format!(
                "{} is {}, not open for rent",
                id, order.state
            )));
        }
        if &order.lister == tenant {
            return Err(Error::Authorization(format!("{} cannot rent own {}", tenant, id)));
        }
        let card_id = order.card_id;
        if wired.registry.current_holder(card_id)? != order.lister {
            return Err(Error::InvalidState(format!(
                "{} no longer held by {}",
                card_id, order.lister
            )));
        }

        let capability = wired.registry.max_capability(card_id)?;
        let unit_price = wired.oracle.current_unit_price()?;
        let care_deposit = accounting::care_deposit(capability, unit_price)?;
        let rent = order.rent()?;
        let escrowed = rent
            .checked_add(care_deposit)
            .ok_or_else(|| Error::InvalidArgument(format!("{}: escrow overflows", id)))?;
        debug!(
            "{}: capability {} × price {} = deposit {}, escrow {}",
            id, capability, unit_price, care_deposit, escrowed
        );

        wired.registry.lock_transfer(card_id)?;
        if let Err(e) = wired.ledger.transfer_from(&self.account, tenant, &self.account, escrowed) {
            warn!("{}: escrow pull from {} failed: {}", id, tenant, e);
            if let Err(unlock_err) = wired.registry.unlock_transfer(card_id) {
                error!("{}: failed to unlock {} after aborted rent: {}", id, card_id, unlock_err);
            }
            return Err(e);
        }

        let now = self.clock.now();
        let order = vault.book.get_mut(id)?;
        transition(order, OrderState::Listed, OrderState::Rented)?;
        order.tenant = Some(tenant.clone());
        order.started_at = Some(now);
        order.care_deposit = care_deposit;

        info!(
            "{} rented by {}: escrowed {} (deposit {})",
            id, tenant, self.units(escrowed), self.units(care_deposit)
        );
        self.events.publish(RentEvent::OrderRented {
            order_id: id,
            tenant: tenant.clone(),
            care_deposit,
            escrowed,
            started_at: now,
        });
        Ok(())
    }

    /// Lister-initiated settlement, once the term has elapsed.
    pub fn end_rent_and_withdraw_owner(
        &self,
        caller: &AccountId,
        id: OrderId,
    ) -> Result<Settlement> {
        self.settle(caller, id, SettlementPath::Lister)
    }

    /// Tenant-initiated settlement, once the term has elapsed.
    pub fn end_rent_and_withdraw_care_deposit_renter(
        &self,
        caller: &AccountId,
        id: OrderId,
    ) -> Result<Settlement> {
        self.settle(caller, id, SettlementPath::Tenant)
    }

    fn settle(&self, caller: &AccountId, id: OrderId, path: SettlementPath) -> Result<Settlement> {
        let wired = self.wired()?;
        let mut vault = self.vault.lock();
        let now = self.clock.now();

        let order = vault.book.get(id)?;
        if order.state != OrderState::Rented {
            warn!("{:?} settlement of {} rejected: state {}", path, id, order.state);
            return Err(Error::InvalidState(format!(
                "{} is {}, nothing to settle",
                id, order.state
            )));
        }
        let (tenant, started_at) = match (&order.tenant, order.started_at) {
            (Some(t), Some(s)) => (t.clone(), s),
            _ => return Err(Error::InvalidState(format!("{} rented without tenant", id))),
        };
        let authorized = match path {
            SettlementPath::Lister => caller == &order.lister,
            SettlementPath::Tenant => caller == &tenant,
        };
        if !authorized {
            warn!("{:?} settlement of {} rejected: caller {}", path, id, caller);
            return Err(Error::Authorization(format!(
                "{} may not settle {} as {:?}",
                caller, id, path
            )));
        }
        let ends_at = order
            .ends_at(self.config.seconds_per_day)
            .ok_or_else(|| Error::InvalidArgument(format!("{}: term overflows", id)))?;
        if now < ends_at {
            return Err(Error::InvalidState(format!(
                "{} term runs until {}, now {}",
                id, ends_at, now
            )));
        }

        let restocked = wired
            .reporter
            .did_restock_during_term(order.card_id, &tenant, started_at)?;
        // Penalty is priced at settlement time, not at the locked-in rent price.
        let unit_price_now = if restocked { 0 } else { wired.oracle.current_unit_price()? };
        let input = SettlementInput {
            rent: order.rent()?,
            care_deposit: order.care_deposit,
            restocked,
            unit_price_now,
        };
        let settlement = accounting::settle(input, &self.config.fees, path, now)?;
        let lister = order.lister.clone();
        let card_id = order.card_id;

        let outgoing = settlement.lister_payout + settlement.tenant_refund;
        let held = wired.ledger.balance_of(&self.account);
        if held < outgoing {
            error!("{}: custody holds {}, settlement needs {}", id, held, outgoing);
            return Err(Error::Funds(format!(
                "custody short: holds {}, needs {}",
                held, outgoing
            )));
        }

        wired.registry.unlock_transfer(card_id)?;
        if settlement.lister_payout > 0 {
            let paid = wired
                .ledger
                .transfer(&self.account, &lister, settlement.lister_payout);
            if let Err(e) = paid {
                warn!("{}: payout to {} failed: {}", id, lister, e);
                if let Err(lock_err) = wired.registry.lock_transfer(card_id) {
                    error!("{}: failed to relock {}: {}", id, card_id, lock_err);
                }
                return Err(e);
            }
        }
        // From here the order settles no matter what; an undeliverable refund
        // stays in custody as a pending claim of the tenant.
        let mut deferred = 0;
        if settlement.tenant_refund > 0 {
            let refunded = wired
                .ledger
                .transfer(&self.account, &tenant, settlement.tenant_refund);
            if let Err(e) = refunded {
                warn!("{}: refund to {} deferred: {}", id, tenant, e);
                deferred = settlement.tenant_refund;
            }
        }

        let order = vault.book.get_mut(id)?;
        transition(order, OrderState::Rented, OrderState::Settled)?;
        order.settlement = Some(settlement.clone());
        vault.platform_fees += settlement.platform_fee;
        if deferred > 0 {
            *vault.pending_refunds.entry(tenant.clone()).or_insert(0) += deferred;
        }

        info!(
            "{} settled by {:?}: lister {} +{}, tenant {} +{}, fee {}, penalty {}",
            id,
            path,
            lister,
            self.units(settlement.lister_payout),
            tenant,
            self.units(settlement.tenant_refund),
            self.units(settlement.platform_fee),
            self.units(settlement.penalty),
        );
        self.events.publish(RentEvent::OrderSettled {
            order_id: id,
            settlement: settlement.clone(),
        });
        if deferred > 0 {
            self.events.publish(RentEvent::RefundDeferred {
                order_id: id,
                tenant,
                amount: deferred,
            });
        }
        Ok(settlement)
    }

    /// Collect refunds that could not be delivered at settlement.
    pub fn claim_refund(&self, caller: &AccountId) -> Result<Amount> {
        let wired = self.wired()?;
        let mut vault = self.vault.lock();

        let amount = vault.pending_refunds.get(caller).copied().unwrap_or(0);
        if amount == 0 {
            return Err(Error::NotFound(format!("no pending refund for {}", caller)));
        }
        wired.ledger.transfer(&self.account, caller, amount)?;
        vault.pending_refunds.remove(caller);

        info!("{} claimed {} in pending refunds", caller, self.units(amount));
        self.events.publish(RentEvent::RefundClaimed {
            tenant: caller.clone(),
            amount,
        });
        Ok(amount)
    }

    /// Withdraw a Listed or Settled order from the book. Lister only.
    pub fn close_order(&self, caller: &AccountId, id: OrderId) -> Result<()> {
        self.wired()?;
        let mut vault = self.vault.lock();
        let order = vault.book.get_mut(id)?;

        if caller != &order.lister {
            warn!("Close of {} rejected: caller {}", id, caller);
            return Err(Error::Authorization(format!("{} is not the lister of {}", caller, id)));
        }
        let state = order.state;
        match state {
            OrderState::Listed | OrderState::Settled => {
                transition(order, state, OrderState::Closed)?
            }
            _ => {
                return Err(Error::InvalidState(format!(
                    "{} is {} and cannot be closed",
                    id, state
                )));
            }
        }

        info!("{} closed by {}", id, caller);
        self.events.publish(RentEvent::OrderClosed { order_id: id });
        Ok(())
    }

    /// Rewrite a rented order's start time. Test and simulation hook only.
    #[cfg(any(test, feature = "testutils"))]
    pub fn mock_start_time(&self, id: OrderId, started_at: crate::core::Timestamp) -> Result<()> {
        let mut vault = self.vault.lock();
        let order = vault.book.get_mut(id)?;
        if order.state != OrderState::Rented {
            return Err(Error::InvalidState(format!("{} is {}, not rented", id, order.state)));
        }
        debug!("{}: start time mocked to {}", id, started_at);
        order.started_at = Some(started_at);
        Ok(())
    }

    // ---------------- QUERIES ----------------

    pub fn order(&self, id: OrderId) -> Result<RentOrder> {
        self.vault.lock().book.get(id).cloned()
    }

    /// Whether the term of a rented order has elapsed. False for orders
    /// never rented.
    pub fn is_rent_ended(&self, id: OrderId) -> Result<bool> {
        let vault = self.vault.lock();
        let order = vault.book.get(id)?;
        Ok(order
            .ends_at(self.config.seconds_per_day)
            .map(|end| self.clock.now() >= end)
            .unwrap_or(false))
    }

    /// Every order open for renting
    pub fn fetch_card_on_market(&self) -> Vec<RentOrder> {
        self.vault.lock().book.listed()
    }

    /// Open orders of one lister
    pub fn fetch_user_card_on_market(&self, lister: &AccountId) -> Vec<RentOrder> {
        self.vault.lock().book.listed_by(lister)
    }

    /// Running, unsettled rentals of one tenant
    pub fn fetch_renter_card_on_market(&self, tenant: &AccountId) -> Vec<RentOrder> {
        self.vault.lock().book.rented_by(tenant)
    }

    /// Rent share currently escrowed for the order's lister; 0 unless Rented.
    pub fn get_user_deposit(&self, id: OrderId) -> Result<Amount> {
        let vault = self.vault.lock();
        let order = vault.book.get(id)?;
        if order.state != OrderState::Rented {
            return Ok(0);
        }
        Ok(accounting::split_rent(order.rent()?, &self.config.fees)?.lister_share)
    }

    /// Total held by the engine's custody account: escrow, fee pool and
    /// pending refunds.
    pub fn get_this_balance(&self) -> Result<Amount> {
        let ledger = self
            .collaborators
            .read()
            .ledger
            .clone()
            .ok_or_else(|| missing("ledger"))?;
        Ok(ledger.balance_of(&self.account))
    }

    /// Accumulated platform fees not yet withdrawn
    pub fn platform_fees(&self) -> Amount {
        self.vault.lock().platform_fees
    }

    /// Refund owed to `tenant` that settlement could not deliver
    pub fn pending_refund(&self, tenant: &AccountId) -> Amount {
        self.vault.lock().pending_refunds.get(tenant).copied().unwrap_or(0)
    }

    /// Sum of all undelivered refunds held in custody
    pub fn pending_refunds_total(&self) -> Amount {
        self.vault.lock().pending_refunds.values().sum()
    }

    /// Sum of rent plus deposit over running rentals
    pub fn escrowed_total(&self) -> Result<Amount> {
        self.vault.lock().book.escrowed_total()
    }
}
