//! Internal error types.
//!
//! Public operations that the domain defines as boolean-returning
//! (`register`, `submit`) keep that exact contract; the enums here exist
//! so the rejection reason can still be logged before being collapsed to
//! `false` at the boundary.

use thiserror::Error;

/// Reasons an order failed validation before it could reach the book.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("price {price} is not positive")]
    NonPositivePrice { price: i64 },

    #[error("price {price} ticks is off the instrument's tick grid (price_decimal={price_decimal})")]
    OffTickGrid { price: i64, price_decimal: u32 },

    #[error("quantity {quantity} is not positive")]
    NonPositiveQuantity { quantity: u64 },

    #[error("quantity {quantity} is not a multiple of lot size {lot_size}")]
    NotALotMultiple { quantity: u64, lot_size: u64 },

    #[error("GTD order has no expiration timestamp, or it is not in the future")]
    InvalidGtdExpiration,
}

/// Reasons a submission was rejected before validation even ran.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("no instrument registered for ({instrument_id}, {market_code}, {currency})")]
    UnknownInstrument {
        instrument_id: u64,
        market_code: String,
        currency: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Conditions caught inside the worker loop. Logged at `error` and
/// swallowed; the loop always continues (see the engine's worker_tick).
#[derive(Debug, Error)]
pub enum InternalSweepError {
    #[error("matching sweep panicked or returned an inconsistent state: {0}")]
    Inconsistent(String),
}
