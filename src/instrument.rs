//! Instrument registry.
//!
//! Stores the venue's tradable instruments, keyed by the composite
//! triple `(instrument_id, market_code, currency)`. Registration is done
//! before trading begins, so the registry is effectively read-only
//! afterwards; it is guarded by a rarely-contended [`parking_lot::RwLock`]
//! rather than the book's exclusive lock.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Lifecycle state of an instrument. State transitions themselves are
/// out of scope for this crate; the field exists for completeness of
/// the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum InstrumentState {
    Active,
    Inactive,
    Suspended,
    Delisted,
}

/// Composite identity of an instrument: `(instrument_id, market_code, currency)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct InstrumentKey {
    pub instrument_id: u64,
    pub market_code: String,
    pub currency: String,
}

/// A tradable instrument. Created once via [`InstrumentRegistry::register`]
/// and immutable thereafter.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Instrument {
    pub key: InstrumentKey,
    /// Bounded display string, at most 50 code points.
    pub display_name: String,
    pub issue_number: u64,
    pub state: InstrumentState,
    /// Reference price, expressed in ticks like all other prices.
    pub reference_price: i64,
    pub trading_group_id: u64,
    /// Minimum tradable quantity unit; orders must be integer multiples.
    pub lot_size: u64,
    /// Tick = 10^-price_decimal.
    pub price_decimal: u32,
    pub auxiliary_ids: Vec<u64>,
}

impl Instrument {
    /// Convenience constructor clamping `display_name` to the 50-code-point bound.
    pub fn new(
        instrument_id: u64,
        market_code: impl Into<String>,
        currency: impl Into<String>,
        display_name: impl Into<String>,
        lot_size: u64,
        price_decimal: u32,
    ) -> Self {
        let mut display_name = display_name.into();
        if display_name.chars().count() > 50 {
            display_name = display_name.chars().take(50).collect();
        }
        Self {
            key: InstrumentKey {
                instrument_id,
                market_code: market_code.into(),
                currency: currency.into(),
            },
            display_name,
            issue_number: 0,
            state: InstrumentState::Active,
            reference_price: 0,
            trading_group_id: 0,
            lot_size,
            price_decimal,
            auxiliary_ids: Vec::new(),
        }
    }

    /// Tick size for this instrument, as a fraction of the underlying
    /// currency unit (only meaningful for display / validating
    /// externally supplied decimal strings).
    pub fn tick_size(&self) -> f64 {
        10f64.powi(-(self.price_decimal as i32))
    }
}

/// Stores registered instruments in insertion order with an index keyed
/// by [`InstrumentKey`] for O(1) lookup.
#[derive(Default)]
pub struct InstrumentRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    ordered: Vec<Instrument>,
    index: HashMap<InstrumentKey, usize>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `instrument`. Returns `false` (no-op) if the triple is
    /// already present; the first registration always wins.
    pub fn register(&self, instrument: Instrument) -> bool {
        let mut inner = self.inner.write();
        if inner.index.contains_key(&instrument.key) {
            tracing::warn!(
                instrument_id = instrument.key.instrument_id,
                market_code = %instrument.key.market_code,
                currency = %instrument.key.currency,
                "duplicate instrument registration rejected"
            );
            return false;
        }
        let idx = inner.ordered.len();
        inner.index.insert(instrument.key.clone(), idx);
        inner.ordered.push(instrument);
        true
    }

    /// Enumerates registered instruments in insertion order.
    pub fn list(&self) -> Vec<Instrument> {
        self.inner.read().ordered.clone()
    }

    /// Exact-match lookup by composite key.
    pub fn find(&self, instrument_id: u64, market_code: &str, currency: &str) -> Option<Instrument> {
        let inner = self.inner.read();
        let key = InstrumentKey {
            instrument_id,
            market_code: market_code.to_string(),
            currency: currency.to_string(),
        };
        inner.index.get(&key).map(|&idx| inner.ordered[idx].clone())
    }
}
