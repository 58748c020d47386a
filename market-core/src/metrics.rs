//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the marketplace.
//!
//! # Metrics
//!
//! - `market_listings_total` - Total items listed or re-listed
//! - `market_purchases_total` - Total successful purchases
//! - `market_withdrawals_total` - Total successful withdrawals
//! - `market_rejected_ops_total` - Operations rejected by a precondition
//! - `market_purchase_duration_seconds` - Histogram of purchase latencies
//! - `market_retained_balance` - Balance currently held by the ledger
//!
//! Metrics register into an owned `Registry` (not the process-global one),
//! so multiple ledger instances can coexist in one process.

use prometheus::{Gauge, Histogram, HistogramOpts, IntCounter, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total items listed
    pub listings_total: IntCounter,

    /// Total successful purchases
    pub purchases_total: IntCounter,

    /// Total successful withdrawals
    pub withdrawals_total: IntCounter,

    /// Operations rejected by a precondition check
    pub rejected_total: IntCounter,

    /// Purchase duration histogram
    pub purchase_duration: Histogram,

    /// Retained balance gauge
    pub retained_balance: Gauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let listings_total = IntCounter::with_opts(Opts::new(
            "market_listings_total",
            "Total items listed or re-listed",
        ))?;
        registry.register(Box::new(listings_total.clone()))?;

        let purchases_total = IntCounter::with_opts(Opts::new(
            "market_purchases_total",
            "Total successful purchases",
        ))?;
        registry.register(Box::new(purchases_total.clone()))?;

        let withdrawals_total = IntCounter::with_opts(Opts::new(
            "market_withdrawals_total",
            "Total successful withdrawals",
        ))?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let rejected_total = IntCounter::with_opts(Opts::new(
            "market_rejected_ops_total",
            "Operations rejected by a precondition",
        ))?;
        registry.register(Box::new(rejected_total.clone()))?;

        let purchase_duration = Histogram::with_opts(
            HistogramOpts::new(
                "market_purchase_duration_seconds",
                "Histogram of purchase latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(purchase_duration.clone()))?;

        let retained_balance = Gauge::with_opts(Opts::new(
            "market_retained_balance",
            "Balance currently held by the ledger",
        ))?;
        registry.register(Box::new(retained_balance.clone()))?;

        Ok(Self {
            listings_total,
            purchases_total,
            withdrawals_total,
            rejected_total,
            purchase_duration,
            retained_balance,
            registry,
        })
    }

    /// Record a successful listing
    pub fn record_listing(&self) {
        self.listings_total.inc();
    }

    /// Record a successful purchase
    pub fn record_purchase(&self, duration_seconds: f64) {
        self.purchases_total.inc();
        self.purchase_duration.observe(duration_seconds);
    }

    /// Record a successful withdrawal
    pub fn record_withdrawal(&self) {
        self.withdrawals_total.inc();
    }

    /// Record a rejected operation
    pub fn record_rejected(&self) {
        self.rejected_total.inc();
    }

    /// Update the retained balance gauge
    pub fn set_retained_balance(&self, balance: f64) {
        self.retained_balance.set(balance);
    }
}
