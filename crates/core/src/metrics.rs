//! Metrics collection and reporting for simulation runs.
//!
//! This module aggregates per-policy results over many independent trials:
//! - Packet counts (offered, delivered, superseded, replaced)
//! - Preemptions and server utilization
//! - Time-averaged AoI, mean peak AoI and mean delay per source
//! - Wall-clock timing of the whole comparison
//!
//! # Design
//!
//! One `Metrics` value per policy. Each finished [`Outcome`] is folded in with
//! [`Metrics::record`]; per-source AoI is averaged over the trials in which the
//! source had enough deliveries to define it.
//!
//! # Thread Safety
//!
//! The `Metrics` struct is NOT thread-safe. For parallel trials keep one
//! instance per worker and combine them with [`Metrics::merge`].

use crate::aoi;
use crate::packet::SourceId;
use crate::policy::Outcome;
use std::time::{Duration, Instant};

/// Aggregated results of one policy over many trials.
#[derive(Debug, Clone)]
pub struct Metrics {
    /// Policy these numbers belong to
    pub policy: &'static str,

    // === Timing ===
    /// When collection started
    pub start_time: Instant,

    /// When collection ended (set on completion)
    pub end_time: Option<Instant>,

    // === Packets ===
    /// Trials folded in so far
    pub trials: u64,

    /// Packets handed to the engine
    pub packets_offered: u64,

    /// Packets delivered to the receiver
    pub packets_delivered: u64,

    /// Packets dropped as superseded
    pub packets_superseded: u64,

    /// Waiting packets overwritten by a same-source arrival
    pub packets_replaced: u64,

    /// Arrivals that interrupted service
    pub preemptions: u64,

    // === Server ===
    /// Total simulated time the server was busy
    pub busy_time: f64,

    /// Total simulated time until the last delivery, summed over trials
    pub makespan: f64,

    // === Age ===
    /// Sum of per-trial time-averaged AoI, per source
    pub aoi_sum: Vec<f64>,

    /// Trials contributing to `aoi_sum`, per source
    pub aoi_samples: Vec<u64>,

    /// Sum of per-trial mean delay, per source
    pub delay_sum: Vec<f64>,

    /// Sum of per-trial mean peak AoI, per source
    pub peak_sum: Vec<f64>,

    /// Trials in which a source had too few deliveries to define AoI
    pub aoi_gaps: u64,
}

impl Metrics {
    /// Create new metrics for `policy` over `sources` sources, start time set to now.
    pub fn new(policy: &'static str, sources: usize) -> Self {
        Self {
            policy,
            start_time: Instant::now(),
            end_time: None,
            trials: 0,
            packets_offered: 0,
            packets_delivered: 0,
            packets_superseded: 0,
            packets_replaced: 0,
            preemptions: 0,
            busy_time: 0.0,
            makespan: 0.0,
            aoi_sum: vec![0.0; sources],
            aoi_samples: vec![0; sources],
            delay_sum: vec![0.0; sources],
            peak_sum: vec![0.0; sources],
            aoi_gaps: 0,
        }
    }

    /// Number of sources tracked.
    pub fn sources(&self) -> usize {
        self.aoi_sum.len()
    }

    /// Fold one trial's outcome into the totals.
    pub fn record(&mut self, outcome: &Outcome) {
        let stats = &outcome.stats;
        self.trials += 1;
        self.packets_offered += stats.offered;
        self.packets_delivered += stats.delivered;
        self.packets_superseded += stats.superseded;
        self.packets_replaced += stats.replaced;
        self.preemptions += stats.preemptions;
        self.busy_time += stats.busy_time;
        self.makespan += stats.makespan;

        for index in 0..self.sources() {
            let source = index as SourceId;
            match (
                aoi::average_age(&outcome.completions, source),
                aoi::mean_delay(&outcome.completions, source),
            ) {
                (Ok(age), Ok(delay)) => {
                    let peaks = aoi::peak_ages(&outcome.completions, source);
                    self.aoi_sum[index] += age;
                    self.delay_sum[index] += delay;
                    self.peak_sum[index] += peaks.iter().sum::<f64>() / peaks.len().max(1) as f64;
                    self.aoi_samples[index] += 1;
                }
                _ => {
                    tracing::debug!(policy = self.policy, source, "no age sample for trial");
                    self.aoi_gaps += 1;
                }
            }
        }
    }

    /// Combine totals collected by another instance for the same policy.
    ///
    /// The earlier of the two start times is kept.
    pub fn merge(&mut self, other: &Metrics) {
        self.start_time = self.start_time.min(other.start_time);
        self.trials += other.trials;
        self.packets_offered += other.packets_offered;
        self.packets_delivered += other.packets_delivered;
        self.packets_superseded += other.packets_superseded;
        self.packets_replaced += other.packets_replaced;
        self.preemptions += other.preemptions;
        self.busy_time += other.busy_time;
        self.makespan += other.makespan;
        self.aoi_gaps += other.aoi_gaps;

        for (index, sum) in other.aoi_sum.iter().enumerate().take(self.sources()) {
            self.aoi_sum[index] += sum;
            self.aoi_samples[index] += other.aoi_samples[index];
            self.delay_sum[index] += other.delay_sum[index];
            self.peak_sum[index] += other.peak_sum[index];
        }
    }

    /// Mark collection as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Fraction of offered packets that were delivered.
    pub fn delivery_ratio(&self) -> f64 {
        if self.packets_offered == 0 {
            0.0
        } else {
            self.packets_delivered as f64 / self.packets_offered as f64
        }
    }

    /// Fraction of simulated time the server was busy.
    pub fn utilization(&self) -> f64 {
        if self.makespan == 0.0 {
            0.0
        } else {
            self.busy_time / self.makespan
        }
    }

    /// Mean time-averaged AoI of `source` across trials.
    pub fn average_age(&self, source: usize) -> Option<f64> {
        match self.aoi_samples.get(source) {
            Some(&samples) if samples > 0 => Some(self.aoi_sum[source] / samples as f64),
            _ => None,
        }
    }

    /// Mean per-delivery delay of `source` across trials.
    pub fn mean_delay(&self, source: usize) -> Option<f64> {
        match self.aoi_samples.get(source) {
            Some(&samples) if samples > 0 => Some(self.delay_sum[source] / samples as f64),
            _ => None,
        }
    }

    /// Mean peak AoI of `source` across trials.
    pub fn mean_peak_age(&self, source: usize) -> Option<f64> {
        match self.aoi_samples.get(source) {
            Some(&samples) if samples > 0 => Some(self.peak_sum[source] / samples as f64),
            _ => None,
        }
    }

    /// Mean of the per-source averages. `None` if any source has no sample.
    pub fn system_average_age(&self) -> Option<f64> {
        if self.sources() == 0 {
            return None;
        }
        let mut total = 0.0;
        for source in 0..self.sources() {
            total += self.average_age(source)?;
        }
        Some(total / self.sources() as f64)
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== {} ===", self.policy);
        println!("Duration: {} ms", self.duration().as_millis());
        println!("Trials: {}", self.trials);
        println!("Packets offered: {}", self.packets_offered);
        println!(
            "Packets delivered: {} ({:.2}%)",
            self.packets_delivered,
            self.delivery_ratio() * 100.0
        );
        println!("Packets superseded: {}", self.packets_superseded);
        println!("Packets replaced: {}", self.packets_replaced);
        println!("Preemptions: {}", self.preemptions);
        println!("Utilization: {:.2}%", self.utilization() * 100.0);
        println!();

        for source in 0..self.sources() {
            match (
                self.average_age(source),
                self.mean_peak_age(source),
                self.mean_delay(source),
            ) {
                (Some(age), Some(peak), Some(delay)) => println!(
                    "Source {}: AoI {:.4}, peak AoI {:.4}, mean delay {:.4}",
                    source, age, peak, delay
                ),
                _ => println!("Source {}: insufficient data", source),
            }
        }
        match self.system_average_age() {
            Some(age) => println!("System AoI: {:.4}", age),
            None => println!("System AoI: insufficient data"),
        }
        if self.aoi_gaps > 0 {
            println!("Source-trials without an age sample: {}", self.aoi_gaps);
        }
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        let mut text = format!(
            "policy={}\n\
             duration_ms={}\n\
             trials={}\n\
             packets_offered={}\n\
             packets_delivered={}\n\
             packets_superseded={}\n\
             packets_replaced={}\n\
             preemptions={}\n\
             delivery_ratio={:.4}\n\
             utilization={:.4}\n",
            self.policy,
            self.duration().as_millis(),
            self.trials,
            self.packets_offered,
            self.packets_delivered,
            self.packets_superseded,
            self.packets_replaced,
            self.preemptions,
            self.delivery_ratio(),
            self.utilization(),
        );

        for source in 0..self.sources() {
            if let Some(age) = self.average_age(source) {
                text.push_str(&format!("aoi_source_{}={:.4}\n", source, age));
            }
            if let Some(peak) = self.mean_peak_age(source) {
                text.push_str(&format!("peak_aoi_source_{}={:.4}\n", source, peak));
            }
        }
        if let Some(age) = self.system_average_age() {
            text.push_str(&format!("aoi_system={:.4}\n", age));
        }

        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::CompletionRecord;
    use crate::policy::RunStats;

    fn outcome() -> Outcome {
        Outcome {
            completions: vec![
                CompletionRecord::new(0, 2.0, 4.0),
                CompletionRecord::new(0, 6.0, 7.0),
                CompletionRecord::new(0, 7.0, 8.0),
                CompletionRecord::new(1, 0.0, 2.0),
            ],
            slices: Vec::new(),
            stats: RunStats {
                offered: 5,
                delivered: 4,
                superseded: 1,
                replaced: 0,
                preemptions: 2,
                busy_time: 6.0,
                makespan: 8.0,
            },
        }
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new("lcfs-w", 2);
        assert!(metrics.end_time.is_none());
        assert!(metrics.duration().as_millis() < 100);
        assert_eq!(metrics.sources(), 2);
        assert_eq!(metrics.delivery_ratio(), 0.0);
        assert_eq!(metrics.utilization(), 0.0);
        assert!(metrics.system_average_age().is_none());
    }

    #[test]
    fn test_record() {
        let mut metrics = Metrics::new("lcfs-s", 2);
        metrics.record(&outcome());

        assert_eq!(metrics.trials, 1);
        assert_eq!(metrics.delivery_ratio(), 0.8);
        assert_eq!(metrics.utilization(), 0.75);
        assert_eq!(metrics.average_age(0), Some(2.5));
        assert_eq!(metrics.average_age(1), Some(1.0));
        assert_eq!(metrics.system_average_age(), Some(1.75));
        assert_eq!(metrics.aoi_gaps, 0);
    }

    #[test]
    fn test_record_peak_age() {
        let mut metrics = Metrics::new("lcfs-s", 2);
        metrics.record(&outcome());

        // Source 0 peaks at 4, 5 and 2 just before its deliveries.
        let peak = metrics.mean_peak_age(0).unwrap();
        assert!((peak - 11.0 / 3.0).abs() < 1e-12);
        assert_eq!(metrics.mean_peak_age(1), Some(2.0));
        assert!(Metrics::new("lcfs-s", 2).mean_peak_age(0).is_none());
    }

    #[test]
    fn test_record_counts_gaps() {
        let mut metrics = Metrics::new("proposed", 3);
        metrics.record(&outcome());

        assert_eq!(metrics.aoi_gaps, 1);
        assert!(metrics.average_age(2).is_none());
        assert!(metrics.system_average_age().is_none());
    }

    #[test]
    fn test_merge() {
        let mut a = Metrics::new("lcfs-w", 2);
        let mut b = Metrics::new("lcfs-w", 2);
        a.record(&outcome());
        b.record(&outcome());
        a.merge(&b);

        assert_eq!(a.trials, 2);
        assert_eq!(a.packets_offered, 10);
        assert_eq!(a.average_age(0), Some(2.5));
        assert_eq!(a.mean_peak_age(1), Some(2.0));
        assert!(a.start_time <= b.start_time);
    }

    #[test]
    fn test_duration_frozen_on_complete() {
        let mut metrics = Metrics::new("lcfs-w", 2);
        metrics.complete();
        let end = metrics.end_time.unwrap();

        assert_eq!(metrics.duration(), end.duration_since(metrics.start_time));
        assert_eq!(metrics.duration(), metrics.duration());
    }

    #[test]
    fn test_export_text() {
        let mut metrics = Metrics::new("proposed", 2);
        metrics.record(&outcome());
        metrics.complete();

        let text = metrics.export_text();
        assert!(text.contains("policy=proposed"));
        assert!(text.contains("duration_ms="));
        assert!(text.contains("peak_aoi_source_1=2.0000"));
        assert!(text.contains("packets_delivered=4"));
        assert!(text.contains("aoi_source_0=2.5000"));
        assert!(text.contains("aoi_system=1.7500"));
    }
}
