//! Order and Trade entities, plus the validators the engine runs before
//! an order is allowed into the book.

use crate::error::ValidationError;
use crate::instrument::Instrument;
use chrono::{DateTime, Utc};

/// Buy-side or sell-side resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

/// Whether a price is a genuine limit or absent (market-style) pricing.
/// The core only ever matches priced orders; `None` is carried for
/// record completeness per the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LimitType {
    Limit,
    None,
}

/// How long an order remains eligible to rest in the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TimeInForce {
    /// Valid until end of the current trading day; expired only at the
    /// daily reset, never by the hourly GTD sweep.
    Day,
    /// Valid until a caller-supplied expiration timestamp.
    Gtd,
}

/// A buy or sell order. `price` is a fixed-point count of ticks
/// (`price_decimal` ticks per unit of currency on the owning
/// instrument), not a floating-point or decimal value — this sidesteps
/// the tick-grid tolerance entirely for orders created in-process.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub firm_id: u64,

    pub instrument_id: u64,
    pub market_code: String,
    pub currency: String,

    pub side: Side,

    pub price: i64,
    pub limit_type: LimitType,

    pub original_qty: u64,
    pub remaining_qty: u64,

    pub priority_ts: DateTime<Utc>,
    pub time_in_force: TimeInForce,
    pub expiration_ts: Option<DateTime<Utc>>,
}

impl Order {
    pub fn is_filled(&self) -> bool {
        self.remaining_qty == 0
    }

    pub fn routing_triple(&self) -> (u64, &str, &str) {
        (self.instrument_id, self.market_code.as_str(), self.currency.as_str())
    }

    /// `true` when two orders may legally cross: identical routing triple.
    pub fn compatible_with(&self, other: &Order) -> bool {
        self.instrument_id == other.instrument_id
            && self.market_code == other.market_code
            && self.currency == other.currency
    }
}

/// Immutable record of one execution. Never modified after creation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Trade {
    pub trade_id: u64,
    pub buy_order_id: u64,
    pub sell_order_id: u64,
    pub market_code: String,
    pub currency: String,
    pub price: i64,
    pub quantity: u64,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    /// Notional value of this trade, in (ticks × quantity) units.
    pub fn notional(&self) -> i128 {
        self.price as i128 * self.quantity as i128
    }
}

/// Price validity: positive. A fixed-point `i64` tick count is
/// trivially on the instrument's tick grid (§9 of the spec this crate
/// implements) — there is no way to construct an off-grid `i64`, unlike
/// a decimal price. Off-grid inputs only arise when a caller is
/// converting from a decimal string; see [`decimal_price_to_ticks`] for
/// the check that applies there.
pub fn validate_price(order_price: i64, _instrument: &Instrument, _price_epsilon: f64) -> Result<(), ValidationError> {
    if order_price <= 0 {
        return Err(ValidationError::NonPositivePrice { price: order_price });
    }
    Ok(())
}

/// Converts an externally supplied decimal price (e.g. `150.005`) to a
/// tick count for `instrument`, rejecting prices that do not land on
/// the instrument's tick grid within `price_epsilon`. This is the
/// boundary conversion the spec's tick-grid validator describes; an
/// order already holding an `i64` tick price has no need for it.
pub fn decimal_price_to_ticks(decimal_price: f64, instrument: &Instrument, price_epsilon: f64) -> Result<i64, ValidationError> {
    if decimal_price <= 0.0 {
        return Err(ValidationError::NonPositivePrice {
            price: decimal_price as i64,
        });
    }
    let scaled = decimal_price * 10f64.powi(instrument.price_decimal as i32);
    let rounded = scaled.round();
    if (rounded - scaled).abs() > price_epsilon {
        return Err(ValidationError::OffTickGrid {
            price: rounded as i64,
            price_decimal: instrument.price_decimal,
        });
    }
    Ok(rounded as i64)
}

/// Quantity validity: positive and a multiple of the instrument's lot size.
pub fn validate_quantity(quantity: u64, instrument: &Instrument) -> Result<(), ValidationError> {
    if quantity == 0 {
        return Err(ValidationError::NonPositiveQuantity { quantity });
    }
    if instrument.lot_size == 0 || quantity % instrument.lot_size != 0 {
        return Err(ValidationError::NotALotMultiple {
            quantity,
            lot_size: instrument.lot_size,
        });
    }
    Ok(())
}

/// GTD validity: expiration must be set and strictly in the future.
pub fn validate_time_in_force(order: &Order, now: DateTime<Utc>) -> Result<(), ValidationError> {
    if order.time_in_force == TimeInForce::Gtd {
        match order.expiration_ts {
            Some(ts) if ts > now => Ok(()),
            _ => Err(ValidationError::InvalidGtdExpiration),
        }
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument() -> Instrument {
        Instrument::new(1, "XPAR", "EUR", "Sample SA", 100, 2)
    }

    fn base_order(price: i64, qty: u64, side: Side) -> Order {
        Order {
            order_id: 1,
            firm_id: 1,
            instrument_id: 1,
            market_code: "XPAR".to_string(),
            currency: "EUR".to_string(),
            side,
            price,
            limit_type: LimitType::Limit,
            original_qty: qty,
            remaining_qty: qty,
            priority_ts: Utc::now(),
            time_in_force: TimeInForce::Day,
            expiration_ts: None,
        }
    }

    #[test]
    fn rejects_non_positive_price() {
        let inst = instrument();
        assert!(validate_price(0, &inst, 1e-8).is_err());
        assert!(validate_price(-100, &inst, 1e-8).is_err());
        assert!(validate_price(15500, &inst, 1e-8).is_ok());
    }

    #[test]
    fn decimal_price_off_tick_grid_is_rejected_scenario_4() {
        let inst = instrument(); // price_decimal = 2, tick = 0.01
        assert!(decimal_price_to_ticks(150.005, &inst, 1e-8).is_err());
        assert_eq!(decimal_price_to_ticks(150.00, &inst, 1e-8).unwrap(), 15000);
    }

    #[test]
    fn rejects_quantity_not_a_lot_multiple() {
        let inst = instrument();
        assert!(validate_quantity(150, &inst).is_err());
        assert!(validate_quantity(300, &inst).is_ok());
        assert!(validate_quantity(0, &inst).is_err());
    }

    #[test]
    fn gtd_requires_future_expiration() {
        let mut order = base_order(15500, 100, Side::Bid);
        order.time_in_force = TimeInForce::Gtd;
        order.expiration_ts = None;
        assert!(validate_time_in_force(&order, Utc::now()).is_err());

        order.expiration_ts = Some(Utc::now() + chrono::Duration::hours(1));
        assert!(validate_time_in_force(&order, Utc::now()).is_ok());

        order.expiration_ts = Some(Utc::now() - chrono::Duration::hours(1));
        assert!(validate_time_in_force(&order, Utc::now()).is_err());
    }

    #[test]
    fn compatibility_requires_full_routing_triple_match() {
        let a = base_order(100, 100, Side::Bid);
        let mut b = base_order(100, 100, Side::Ask);
        assert!(a.compatible_with(&b));
        b.currency = "USD".to_string();
        assert!(!a.compatible_with(&b));
    }
}
