//! The shared order book: two priced sides, a matching sweep, and a
//! trade log.
//!
//! Unlike a per-instrument book, this book is intentionally shared
//! across every instrument on the venue — the sweep itself is what
//! enforces that only same-routing-triple orders may cross, by
//! skipping incompatible pairs at the top of book rather than refusing
//! to hold them. This mirrors the spec's choice to let the book carry
//! multiple instruments at the same price level.

use crate::order::{Order, Side, Trade};
use std::collections::{BTreeMap, VecDeque};

/// One price level: a FIFO queue of orders resting at that price.
#[derive(Debug, Default, Clone)]
struct PriceLevel {
    orders: VecDeque<Order>,
}

impl PriceLevel {
    fn total_remaining(&self) -> u64 {
        self.orders.iter().map(|o| o.remaining_qty).sum()
    }
}

/// `(price, cumulative_quantity)` pairs for one side, suitable for a
/// depth-chart curve.
pub type DepthCurve = Vec<(i64, u64)>;

/// Read-only view of the book suitable for display and depth-chart
/// construction.
#[derive(Debug, Clone, Default)]
pub struct BookSnapshot {
    pub bid_depth: DepthCurve,
    pub ask_depth: DepthCurve,
    pub bid_orders: Vec<Order>,
    pub ask_orders: Vec<Order>,
}

/// The shared, multi-instrument order book.
#[derive(Default)]
pub struct OrderBook {
    bids: BTreeMap<i64, PriceLevel>,
    asks: BTreeMap<i64, PriceLevel>,
    trade_log: Vec<Trade>,
    next_trade_id: u64,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a validated order at the tail of its side's queue. No
    /// matching occurs here.
    pub fn insert(&mut self, order: Order) {
        let side = match order.side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };
        side.entry(order.price).or_default().orders.push_back(order);
    }

    fn best_bid_price(&self) -> Option<i64> {
        self.bids.keys().next_back().copied()
    }

    fn best_ask_price(&self) -> Option<i64> {
        self.asks.keys().next().copied()
    }

    pub fn best_bid(&self) -> Option<i64> {
        self.best_bid_price()
    }

    pub fn best_ask(&self) -> Option<i64> {
        self.best_ask_price()
    }

    /// Finds the first compatible `(bid_index, ask_index)` pair at the
    /// current top-of-book price levels, scanning the bid queue
    /// front-to-back and, for each bid, the ask queue front-to-back.
    fn find_compatible_pair(bid_level: &PriceLevel, ask_level: &PriceLevel) -> Option<(usize, usize)> {
        for (bi, bid) in bid_level.orders.iter().enumerate() {
            for (ai, ask) in ask_level.orders.iter().enumerate() {
                if bid.compatible_with(ask) {
                    return Some((bi, ai));
                }
            }
        }
        None
    }

    fn cleanup(&mut self) {
        self.bids.retain(|_, level| {
            level.orders.retain(|o| o.remaining_qty > 0);
            !level.orders.is_empty()
        });
        self.asks.retain(|_, level| {
            level.orders.retain(|o| o.remaining_qty > 0);
            !level.orders.is_empty()
        });
    }

    /// Runs a matching sweep to completion; returns the trades produced,
    /// in the order produced. Appends each trade to the book's trade
    /// log as it is produced.
    pub fn matching_sweep(&mut self) -> Vec<Trade> {
        let mut produced = Vec::new();
        loop {
            let (bid_price, ask_price) = match (self.best_bid_price(), self.best_ask_price()) {
                (Some(b), Some(a)) => (b, a),
                _ => break,
            };
            if bid_price < ask_price {
                break;
            }

            let pair = {
                let bid_level = self.bids.get(&bid_price).expect("best bid price must exist");
                let ask_level = self.asks.get(&ask_price).expect("best ask price must exist");
                Self::find_compatible_pair(bid_level, ask_level)
            };

            let (bi, ai) = match pair {
                Some(p) => p,
                // Crossed on price but no compatible pair: bounded
                // progress guarantee — stop rather than spin.
                None => break,
            };

            let trade = {
                let ask_qty = self.asks.get(&ask_price).unwrap().orders[ai].remaining_qty;

                let bid_level = self.bids.get_mut(&bid_price).unwrap();
                let bid = &mut bid_level.orders[bi];
                let trade_qty = bid.remaining_qty.min(ask_qty);
                bid.remaining_qty -= trade_qty;
                let buy_order_id = bid.order_id;
                let market_code = bid.market_code.clone();
                let currency = bid.currency.clone();

                let ask_level = self.asks.get_mut(&ask_price).unwrap();
                let ask = &mut ask_level.orders[ai];
                ask.remaining_qty -= trade_qty;
                let sell_order_id = ask.order_id;
                let trade_price = ask.price;

                self.next_trade_id += 1;
                Trade {
                    trade_id: self.next_trade_id,
                    buy_order_id,
                    sell_order_id,
                    market_code,
                    currency,
                    price: trade_price,
                    quantity: trade_qty,
                    timestamp: chrono::Utc::now(),
                }
            };

            self.trade_log.push(trade.clone());
            produced.push(trade);

            self.cleanup();
        }
        produced
    }

    /// Most recent trade, if any.
    pub fn last_trade(&self) -> Option<&Trade> {
        self.trade_log.last()
    }

    /// Full trade log, oldest first.
    pub fn trade_log(&self) -> &[Trade] {
        &self.trade_log
    }

    /// Removes GTD orders whose `expiration_ts <= now` from both sides.
    /// DAY orders are untouched; they expire only via [`Self::expire_day_orders`].
    pub fn expire_gtd(&mut self, now: chrono::DateTime<chrono::Utc>) -> Vec<Order> {
        self.expire_where(|o| {
            o.time_in_force == crate::order::TimeInForce::Gtd
                && o.expiration_ts.map(|ts| ts <= now).unwrap_or(false)
        })
    }

    /// Removes every resting DAY order, regardless of expiration. Called
    /// at the daily reset.
    pub fn expire_day_orders(&mut self) -> Vec<Order> {
        self.expire_where(|o| o.time_in_force == crate::order::TimeInForce::Day)
    }

    fn expire_where(&mut self, mut should_expire: impl FnMut(&Order) -> bool) -> Vec<Order> {
        let mut expired = Vec::new();
        for side in [&mut self.bids, &mut self.asks] {
            for level in side.values_mut() {
                let mut remaining = VecDeque::with_capacity(level.orders.len());
                while let Some(order) = level.orders.pop_front() {
                    if should_expire(&order) {
                        expired.push(order);
                    } else {
                        remaining.push_back(order);
                    }
                }
                level.orders = remaining;
            }
            side.retain(|_, level| !level.orders.is_empty());
        }
        expired
    }

    /// Read-only snapshot suitable for depth-chart and table rendering.
    pub fn snapshot(&self) -> BookSnapshot {
        let bid_depth = self
            .bids
            .iter()
            .rev()
            .map(|(price, level)| (*price, level.total_remaining()))
            .collect();
        let ask_depth = self
            .asks
            .iter()
            .map(|(price, level)| (*price, level.total_remaining()))
            .collect();
        let bid_orders = self.bids.values().flat_map(|l| l.orders.iter().cloned()).collect();
        let ask_orders = self.asks.values().flat_map(|l| l.orders.iter().cloned()).collect();
        BookSnapshot {
            bid_depth,
            ask_depth,
            bid_orders,
            ask_orders,
        }
    }

    /// Orders whose `time_in_force == GTD`, across both sides, in book order.
    pub fn gtd_orders(&self) -> Vec<Order> {
        let mut out = Vec::new();
        for level in self.bids.values().chain(self.asks.values()) {
            out.extend(
                level
                    .orders
                    .iter()
                    .filter(|o| o.time_in_force == crate::order::TimeInForce::Gtd)
                    .cloned(),
            );
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
