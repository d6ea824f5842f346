//! The matching engine: owns the book, the instrument registry, and the
//! statistics accumulator, and runs the background worker that drives
//! matching, expiry, and daily resets.

use crate::config::EngineConfig;
use crate::error::{InternalSweepError, SubmissionError};
use crate::instrument::InstrumentRegistry;
use crate::observability::{emit_timestamped, StatusSink, TracingSink};
use crate::order::{validate_price, validate_quantity, validate_time_in_force, Order, Trade};
use crate::orderbook::{BookSnapshot, OrderBook};
use crate::stats::{StatsAccumulator, StatsSnapshot};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

/// Owns the book, registry, and stats; runs a background worker thread
/// that periodically sweeps the book, expires GTD (hourly) and DAY
/// (daily-reset) orders, and emits status snapshots.
pub struct MatchingEngine {
    registry: Arc<InstrumentRegistry>,
    book: Arc<Mutex<OrderBook>>,
    stats: Arc<StatsAccumulator>,
    sink: Arc<dyn StatusSink>,
    config: EngineConfig,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MatchingEngine {
    pub fn new(registry: Arc<InstrumentRegistry>, config: EngineConfig) -> Self {
        Self::with_sink(registry, config, Arc::new(TracingSink))
    }

    pub fn with_sink(registry: Arc<InstrumentRegistry>, config: EngineConfig, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            registry,
            book: Arc::new(Mutex::new(OrderBook::new())),
            stats: Arc::new(StatsAccumulator::new()),
            sink,
            config,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Starts the background worker if not already running. Resets
    /// statistics and marks the engine running before spawning the
    /// thread, so `running()` is true as soon as `start()` returns.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::info!("start() called while already running; no-op");
            return;
        }

        self.stats.reset();
        emit_timestamped(&*self.sink, "matching engine started");
        tracing::info!("matching engine worker starting");

        let book = Arc::clone(&self.book);
        let stats = Arc::clone(&self.stats);
        let sink = Arc::clone(&self.sink);
        let running = Arc::clone(&self.running);
        let config = self.config;

        let handle = std::thread::Builder::new()
            .name("matching-engine-worker".to_string())
            .spawn(move || worker_loop(book, stats, sink, running, config))
            .expect("failed to spawn matching engine worker thread");

        *self.worker.lock() = Some(handle);
    }

    /// Stops the worker if running, clearing the running flag and
    /// joining the thread. A no-op if already stopped (P6).
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            tracing::info!("stop() called while already stopped; no-op");
            return;
        }
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        emit_timestamped(&*self.sink, "matching engine stopped");
        tracing::info!("matching engine worker stopped");
    }

    /// Looks up the instrument, validates the order, inserts it into
    /// the book, and runs an immediate matching sweep under the same
    /// lock acquisition — so a crossing order is matched before this
    /// call returns.
    pub fn submit(&self, order: Order) -> bool {
        if let Err(e) = self.reject_reason(&order) {
            tracing::warn!(order_id = order.order_id, error = %e, "submit rejected");
            return false;
        }

        let mut book = self.book.lock();
        book.insert(order);
        let trades = book.matching_sweep();
        drop(book);

        if !trades.is_empty() {
            for trade in &trades {
                self.stats.record_trade(trade);
            }
            emit_timestamped(&*self.sink, &format!("sweep produced {} trade(s)", trades.len()));
        }
        true
    }

    /// Looks up the instrument and runs the validators, returning the
    /// first [`SubmissionError`] encountered, if any. This is the single
    /// site that constructs §7's `UnknownInstrument`/`InvalidPrice`/
    /// `InvalidQuantity` error kinds; `submit` collapses the result to a
    /// boolean per the spec's "reported locally by return value" policy.
    fn reject_reason(&self, order: &Order) -> Result<(), SubmissionError> {
        let instrument = self
            .registry
            .find(order.instrument_id, &order.market_code, &order.currency)
            .ok_or_else(|| SubmissionError::UnknownInstrument {
                instrument_id: order.instrument_id,
                market_code: order.market_code.clone(),
                currency: order.currency.clone(),
            })?;

        validate_price(order.price, &instrument, self.config.price_epsilon)?;
        validate_quantity(order.original_qty, &instrument)?;
        validate_time_in_force(order, Utc::now())?;
        Ok(())
    }

    /// Runs the book's GTD expiry sweep against a caller-supplied `now`,
    /// rather than the wall clock the worker loop uses. Exists so tests
    /// (and any other driver) can exercise hourly GTD expiry without
    /// waiting on real time.
    pub fn expire_gtd_at(&self, now: DateTime<Utc>) -> Vec<Order> {
        self.book.lock().expire_gtd(now)
    }

    pub fn status(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn detailed_stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn list_gtd(&self) -> Vec<Order> {
        self.book.lock().gtd_orders()
    }

    pub fn snapshot(&self) -> BookSnapshot {
        self.book.lock().snapshot()
    }

    pub fn last_trade(&self) -> Option<Trade> {
        self.book.lock().last_trade().cloned()
    }

    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }
}

impl Drop for MatchingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs one matching sweep, catching any panic inside it so the worker
/// loop can log and continue per §7's `InternalSweepError` policy
/// rather than taking the whole worker thread down.
fn run_sweep(book: &Mutex<OrderBook>) -> Result<Vec<Trade>, InternalSweepError> {
    std::panic::catch_unwind(AssertUnwindSafe(|| book.lock().matching_sweep())).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic in matching sweep".to_string());
        InternalSweepError::Inconsistent(message)
    })
}

fn worker_loop(
    book: Arc<Mutex<OrderBook>>,
    stats: Arc<StatsAccumulator>,
    sink: Arc<dyn StatusSink>,
    running: Arc<AtomicBool>,
    config: EngineConfig,
) {
    let mut last_expiry_check = Instant::now();
    let mut last_status = Instant::now();

    while running.load(Ordering::Relaxed) {
        if stats.daily_reset_due(config.daily_reset_interval) {
            let mut guard = book.lock();
            let expired_day_orders = guard.expire_day_orders();
            drop(guard);
            stats.reset_daily();
            emit_timestamped(
                &*sink,
                &format!("daily reset: {} DAY order(s) expired", expired_day_orders.len()),
            );
            tracing::info!(count = expired_day_orders.len(), "daily reset performed");
        }

        stats.record_matching_attempt();
        match run_sweep(&book) {
            Ok(trades) if !trades.is_empty() => {
                for trade in &trades {
                    stats.record_trade(trade);
                }
                emit_timestamped(&*sink, &format!("background sweep produced {} trade(s)", trades.len()));
            }
            Ok(_) => {}
            Err(sweep_err) => {
                tracing::error!(error = %sweep_err, "matching sweep failed; continuing worker loop");
            }
        }

        if last_expiry_check.elapsed() >= config.gtd_check_interval {
            let expired = {
                let mut guard = book.lock();
                guard.expire_gtd(Utc::now())
            };
            emit_timestamped(&*sink, &format!("GTD expiry check: {} order(s) expired", expired.len()));
            tracing::info!(count = expired.len(), "hourly GTD expiry check performed");
            last_expiry_check = Instant::now();
        }

        if last_status.elapsed() >= config.status_interval {
            let snap = stats.snapshot();
            emit_timestamped(
                &*sink,
                &format!(
                    "status: total_trades={} total_notional={} matching_attempts={} successful_matches={}",
                    snap.total_trade_count, snap.total_notional, snap.matching_attempts, snap.successful_matches
                ),
            );
            last_status = Instant::now();
        }

        std::thread::sleep(config.worker_tick_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Instrument;
    use crate::observability::RecordingSink;
    use crate::order::{LimitType, Side, TimeInForce};
    use std::time::Duration;

    fn registry_with_instrument(id: u64) -> Arc<InstrumentRegistry> {
        let registry = Arc::new(InstrumentRegistry::new());
        registry.register(Instrument::new(id, "XPAR", "EUR", "Sample SA", 100, 2));
        registry
    }

    fn order(id: u64, side: Side, price: i64, qty: u64, instrument_id: u64) -> Order {
        Order {
            order_id: id,
            firm_id: 1,
            instrument_id,
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
    fn submit_rejects_unknown_instrument_p2() {
        let engine = MatchingEngine::new(Arc::new(InstrumentRegistry::new()), EngineConfig::default());
        assert!(!engine.submit(order(1, Side::Bid, 100, 100, 1)));
    }

    #[test]
    fn submit_rejects_bad_price_and_quantity_scenario_4() {
        let registry = registry_with_instrument(1);
        let engine = MatchingEngine::new(registry, EngineConfig::default());
        // Decimal price 150.005 is off the instrument's tick grid (tick=0.01); a
        // caller converting it would reject before `price` ever becomes ticks.
        let instrument = engine.registry().find(1, "XPAR", "EUR").unwrap();
        assert!(crate::order::decimal_price_to_ticks(150.005, &instrument, 1e-8).is_err());
        assert!(!engine.submit(order(1, Side::Bid, -1, 100, 1)));
        assert!(!engine.submit(order(2, Side::Bid, 15000, 150, 1)));
        assert!(engine.snapshot().bid_orders.is_empty());
    }

    #[test]
    fn submit_inserts_and_sweeps_immediately_scenario_1() {
        let registry = registry_with_instrument(1);
        let engine = MatchingEngine::new(registry, EngineConfig::default());
        assert!(engine.submit(order(1001, Side::Bid, 15500, 300, 1)));
        assert!(engine.submit(order(2001, Side::Ask, 14800, 200, 1)));

        let stats = engine.status();
        assert_eq!(stats.total_trade_count, 1);
        assert_eq!(stats.total_notional, 14800 * 200);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.bid_orders.len(), 1);
        assert_eq!(snapshot.bid_orders[0].remaining_qty, 100);
    }

    #[test]
    fn start_stop_is_idempotent_p6() {
        let registry = registry_with_instrument(1);
        let mut config = EngineConfig::default();
        config.worker_tick_interval = Duration::from_millis(10);
        let sink = Arc::new(RecordingSink::new());
        let engine = MatchingEngine::with_sink(registry, config, sink.clone());

        engine.stop();
        assert!(!engine.running());

        engine.start();
        assert!(engine.running());
        engine.start();
        assert!(engine.running());

        engine.stop();
        assert!(!engine.running());
        engine.stop();
        assert!(!engine.running());

        assert!(sink.lines().iter().any(|l| l.contains("started")));
        assert!(sink.lines().iter().any(|l| l.contains("stopped")));
    }

    #[test]
    fn start_resets_lifetime_stats_from_a_previous_run() {
        let registry = registry_with_instrument(1);
        let mut config = EngineConfig::default();
        config.worker_tick_interval = Duration::from_millis(500);
        let engine = MatchingEngine::new(registry, config);

        assert!(engine.submit(order(1001, Side::Bid, 15500, 300, 1)));
        assert!(engine.submit(order(2001, Side::Ask, 14800, 200, 1)));
        assert_eq!(engine.status().total_trade_count, 1);

        engine.start();
        engine.stop();

        assert_eq!(engine.status().total_trade_count, 0);
        assert_eq!(engine.status().total_notional, 0);
    }

    #[test]
    fn expire_gtd_at_removes_only_expired_gtd_orders() {
        let registry = registry_with_instrument(1);
        let engine = MatchingEngine::new(registry, EngineConfig::default());

        let mut gtd_order = order(3001, Side::Ask, 15200, 100, 1);
        gtd_order.time_in_force = TimeInForce::Gtd;
        gtd_order.expiration_ts = Some(Utc::now() + chrono::Duration::hours(1));
        assert!(engine.submit(gtd_order));

        let expired = engine.expire_gtd_at(Utc::now() + chrono::Duration::hours(2));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].order_id, 3001);
        assert!(engine.list_gtd().is_empty());
    }

    #[test]
    fn list_gtd_returns_only_gtd_orders() {
        let registry = registry_with_instrument(1);
        let engine = MatchingEngine::new(registry, EngineConfig::default());
        let mut gtd_order = order(1, Side::Ask, 15200, 100, 1);
        gtd_order.time_in_force = TimeInForce::Gtd;
        gtd_order.expiration_ts = Some(Utc::now() + chrono::Duration::hours(1));
        assert!(engine.submit(gtd_order));
        assert!(engine.submit(order(2, Side::Ask, 15300, 100, 1)));
        assert_eq!(engine.list_gtd().len(), 1);
    }
}
