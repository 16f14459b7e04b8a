//! Observed per-provider performance metrics.
//!
//! The tracker holds a fixed-rate exponential moving average per provider
//! plus a bounded event log used for recency queries. It is constructed
//! once at the composition root and handed to the router by reference, so
//! every call site shares one view of history.

use chrono::{DateTime, Duration, Utc};
use quorum_models::ProviderId;
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use tracing::debug;

/// EMA smoothing factor.
const ALPHA: f64 = 0.1;

/// Maximum retained events across all providers.
const MAX_EVENTS: usize = 1000;

/// One observed provider call.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    /// Whether the call succeeded.
    pub success: bool,
    /// Wall-clock latency in milliseconds.
    pub latency_ms: u64,
    /// Cost of the call in USD.
    pub cost: f64,
    /// Satisfaction sample in [0, 1].
    pub satisfaction: f64,
}

impl Observation {
    /// Observation recorded for a failed call.
    #[must_use]
    pub fn failed() -> Self {
        Self { success: false, latency_ms: 0, cost: 0.0, satisfaction: 0.0 }
    }
}

/// Smoothed metrics for one provider.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceMetrics {
    /// EMA of success (1.0) / failure (0.0) samples.
    pub success_rate: f64,
    /// EMA of failure samples, complement of `success_rate` samples.
    pub error_rate: f64,
    /// EMA of observed latency in milliseconds.
    pub average_latency_ms: f64,
    /// EMA of satisfaction samples.
    pub satisfaction: f64,
    /// EMA of `1/cost` samples (0 when a call reported zero cost).
    pub cost_efficiency: f64,
}

#[derive(Debug, Clone, Copy)]
struct PerformanceEvent {
    provider: ProviderId,
    success: bool,
    at: DateTime<Utc>,
}

/// Shared performance tracker.
///
/// Lock poisoning is reported as a `String` error rather than panicking,
/// matching how the rest of the routing layer treats tracker failures as
/// soft (scores fall back to declared strengths).
#[derive(Debug, Default)]
pub struct PerformanceTracker {
    metrics: RwLock<HashMap<ProviderId, PerformanceMetrics>>,
    events: RwLock<VecDeque<PerformanceEvent>>,
}

impl PerformanceTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observation for a provider.
    ///
    /// The first observation for a provider seeds its entry with
    /// optimistic priors (success 1.0, error 0.0, cost efficiency 1.0)
    /// and then applies the same EMA step as every later sample.
    ///
    /// # Errors
    /// Returns an error if an internal lock is poisoned.
    pub fn update(&self, provider: ProviderId, obs: Observation) -> Result<(), String> {
        let mut metrics = self
            .metrics
            .write()
            .map_err(|e| format!("Failed to acquire metrics write lock: {e}"))?;

        let entry = metrics.entry(provider).or_insert(PerformanceMetrics {
            success_rate: 1.0,
            error_rate: 0.0,
            average_latency_ms: obs.latency_ms as f64,
            satisfaction: obs.satisfaction,
            cost_efficiency: 1.0,
        });

        let success_sample = if obs.success { 1.0 } else { 0.0 };
        let cost_sample = if obs.cost > 0.0 { 1.0 / obs.cost } else { 0.0 };

        entry.success_rate = ema(entry.success_rate, success_sample);
        entry.error_rate = ema(entry.error_rate, 1.0 - success_sample);
        entry.average_latency_ms = ema(entry.average_latency_ms, obs.latency_ms as f64);
        entry.satisfaction = ema(entry.satisfaction, obs.satisfaction);
        entry.cost_efficiency = ema(entry.cost_efficiency, cost_sample);

        debug!(
            provider = %provider,
            success = obs.success,
            latency_ms = obs.latency_ms,
            success_rate = entry.success_rate,
            "Recorded provider observation"
        );

        let mut events = self
            .events
            .write()
            .map_err(|e| format!("Failed to acquire events write lock: {e}"))?;
        if events.len() == MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(PerformanceEvent { provider, success: obs.success, at: Utc::now() });

        Ok(())
    }

    /// Smoothed metrics for a provider, absent until first observed.
    ///
    /// # Errors
    /// Returns an error if the metrics lock is poisoned.
    pub fn metrics(&self, provider: ProviderId) -> Result<Option<PerformanceMetrics>, String> {
        let metrics = self
            .metrics
            .read()
            .map_err(|e| format!("Failed to acquire metrics read lock: {e}"))?;
        Ok(metrics.get(&provider).copied())
    }

    /// Success fraction over the trailing window, defaulting to 1.0 when
    /// no events fall inside it.
    ///
    /// # Errors
    /// Returns an error if the events lock is poisoned.
    pub fn recent_performance(
        &self,
        provider: ProviderId,
        window_minutes: i64,
    ) -> Result<f64, String> {
        let events = self
            .events
            .read()
            .map_err(|e| format!("Failed to acquire events read lock: {e}"))?;

        let cutoff = Utc::now() - Duration::minutes(window_minutes);
        let mut total = 0u32;
        let mut successes = 0u32;
        for event in events.iter().filter(|e| e.provider == provider && e.at >= cutoff) {
            total += 1;
            if event.success {
                successes += 1;
            }
        }

        if total == 0 {
            Ok(1.0)
        } else {
            Ok(f64::from(successes) / f64::from(total))
        }
    }
}

fn ema(current: f64, sample: f64) -> f64 {
    current * (1.0 - ALPHA) + sample * ALPHA
}
