//! In-memory collaborators
//!
//! Reference implementations of the engine's boundary traits, used by the
//! test suite and the demo binary. They keep state behind `parking_lot`
//! locks and are safe to share across threads.

pub mod ledger;
pub mod oracle;
pub mod registry;
pub mod reporter;

pub use ledger::InMemoryLedger;
pub use oracle::FixedPriceOracle;
pub use registry::InMemoryRegistry;
pub use reporter::InMemorySessionReporter;
