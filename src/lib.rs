//! A continuous-trading matching engine for a single venue: an
//! instrument registry, a price-time-priority order book, a lock-free
//! statistics accumulator, and a background-worker-driven engine that
//! ties them together.
//!
//! Out of scope: multi-venue routing, cross-instrument matching,
//! self-trade prevention, iceberg orders, auction phases, settlement,
//! and any network protocol or UI — those are external collaborators
//! reachable only through [`engine::MatchingEngine::submit`] and the
//! [`observability`] sink.

pub mod config;
pub mod engine;
pub mod error;
pub mod instrument;
pub mod observability;
pub mod order;
pub mod orderbook;
pub mod stats;

pub use config::EngineConfig;
pub use engine::MatchingEngine;
pub use instrument::{Instrument, InstrumentKey, InstrumentRegistry, InstrumentState};
pub use observability::{RecordingSink, StatusSink, TracingSink};
pub use order::{LimitType, Order, Side, TimeInForce, Trade};
pub use orderbook::{BookSnapshot, OrderBook};
pub use stats::{StatsAccumulator, StatsSnapshot};
