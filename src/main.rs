use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use card_rent::clock::ManualClock;
use card_rent::core::{format_units, Amount, Clock, TokenLedger};
use card_rent::memory::{
    FixedPriceOracle, InMemoryLedger, InMemoryRegistry, InMemorySessionReporter,
};
use card_rent::{AccountId, CardId, EngineConfig, RentalEngine};

const START: u64 = 1_700_000_000;

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // 1. Logger
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,card_rent=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    // 2. Config
    let config = match std::env::var("CARD_RENT_CONFIG") {
        Ok(path) => EngineConfig::load(&PathBuf::from(path))?,
        Err(_) => EngineConfig::load_default(),
    };
    let one: Amount = 10u128
        .checked_pow(config.token_decimals)
        .ok_or_else(|| anyhow::anyhow!("token_decimals {} too large", config.token_decimals))?;
    let day = config.seconds_per_day;

    tracing::info!(
        "card-rent demo starting (lister share {}/{}, {}s per day)",
        config.fees.lister_share, config.fees.denominator, day
    );

    // 3. Wire in-memory collaborators
    let ledger = Arc::new(InMemoryLedger::new());
    let registry = Arc::new(InMemoryRegistry::new());
    let oracle = Arc::new(FixedPriceOracle::new(one / 500));
    let reporter = Arc::new(InMemorySessionReporter::new());
    let clock = Arc::new(ManualClock::new(START));

    let engine = RentalEngine::builder(AccountId::new("owner"), AccountId::new("rent-engine"))
        .config(config)
        .clock(clock.clone())
        .ledger(ledger.clone())
        .registry(registry.clone())
        .oracle(oracle.clone())
        .reporter(reporter.clone())
        .build()?;
    let events = engine.subscribe();
    let decimals = engine.config().token_decimals;

    let (lister, tenant) = (AccountId::new("lister"), AccountId::new("tenant"));
    registry.mint(CardId(1), &lister, 12)?;
    registry.mint(CardId(2), &lister, 40)?;
    ledger.mint(&tenant, 20 * one);

    // 4. Lister-initiated settlement: card never played, deposit refunded
    let first = engine.create_order(&lister, CardId(1), one, 7)?;
    ledger.approve(&tenant, engine.account(), 10 * one);
    engine.rent_order(&tenant, first)?;
    clock.advance_days(7, day);
    let settled = engine.end_rent_and_withdraw_owner(&lister, first)?;
    tracing::info!(
        "{}: lister paid {}, tenant refunded {}",
        first,
        format_units(settled.lister_payout, decimals),
        format_units(settled.tenant_refund, decimals)
    );
    engine.close_order(&lister, first)?;

    // 5. Tenant-initiated settlement: card drained, restock price rose meanwhile
    let second = engine.create_order(&lister, CardId(2), one / 2, 3)?;
    ledger.approve(&tenant, engine.account(), 5 * one);
    engine.rent_order(&tenant, second)?;
    reporter.record_session(CardId(2), &tenant, false, clock.now() + 3_600);
    oracle.set_price(one / 200);
    clock.advance_days(3, day);
    let settled = engine.end_rent_and_withdraw_care_deposit_renter(&tenant, second)?;
    tracing::info!(
        "{}: penalty {}, tenant refunded {}",
        second,
        format_units(settled.penalty, decimals),
        format_units(settled.tenant_refund, decimals)
    );

    // 6. Sweep fees
    let fees = engine.platform_fees();
    engine.withdraw_platform_fees(engine.owner(), &AccountId::new("treasury"), fees)?;

    for event in events.try_iter() {
        println!("{}", serde_json::to_string(&event)?);
    }

    tracing::info!(
        "Done: lister {}, tenant {}, custody {}",
        format_units(ledger.balance_of(&lister), decimals),
        format_units(ledger.balance_of(&tenant), decimals),
        format_units(engine.get_this_balance()?, decimals)
    );
    Ok(())
}
