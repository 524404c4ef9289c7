//! card-rent - Core Library
//! Rental escrow and settlement engine for ownership-tracked game cards

// Public modules
pub mod core;
pub mod clock;
pub mod engine;
pub mod memory;

// Re-exports
pub use crate::core::{AccountId, Amount, CardId, EngineConfig, Error, ErrorKind, OrderId, Result};
pub use crate::engine::{RentEvent, RentalEngine};
