//! Packet stream generation for simulation trials.
//!
//! Each source emits updates as a Poisson process: exponential inter-arrival
//! times with rate `arrival_rate`, starting from time zero. Service times are
//! exponential with rate `service_rate`, so the mean service time is
//! `1 / service_rate`.
//!
//! # Design
//!
//! - One `ChaCha8Rng` per trial, seeded from `seed + trial`, so trials are
//!   independent and any single trial can be replayed on its own.
//! - Sources are generated one after another from the trial's stream, then
//!   merged into a single arrival-ordered sequence.

use crate::config::Config;
use aoi_sim_core::error::{Error, Result};
use aoi_sim_core::packet::{Packet, SourceId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};

/// Arrival and service distributions shared by every source.
#[derive(Debug, Clone)]
pub struct Workload {
    inter_arrival: Exp<f64>,
    service: Exp<f64>,
}

impl Workload {
    /// Build the distributions.
    ///
    /// # Errors
    /// `Error::Config` unless both rates are positive and finite.
    pub fn new(arrival_rate: f64, service_rate: f64) -> Result<Self> {
        Ok(Self {
            inter_arrival: exponential("arrival", arrival_rate)?,
            service: exponential("service", service_rate)?,
        })
    }

    /// Generate `n` packets for `source`, ordered by arrival time.
    pub fn create_packets<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        n: usize,
        source: SourceId,
    ) -> Vec<Packet> {
        let mut packets = Vec::with_capacity(n);
        let mut clock = 0.0;

        for _ in 0..n {
            clock += self.inter_arrival.sample(rng);
            // Exp can return exactly zero; engines require positive work.
            let service = self.service.sample(rng).max(f64::MIN_POSITIVE);
            packets.push(Packet::new(clock, service, source));
        }

        packets
    }
}

fn exponential(name: &str, rate: f64) -> Result<Exp<f64>> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(Error::Config(format!(
            "{} rate must be positive and finite, got {}",
            name, rate
        )));
    }
    Exp::new(rate).map_err(|err| Error::Config(format!("{} rate: {}", name, err)))
}

/// Merge per-source streams into one sequence ordered by arrival time.
///
/// Ties go to the lower stream index, then to the order within the stream.
pub fn merge_streams(streams: Vec<Vec<Packet>>) -> Vec<Packet> {
    let mut merged: Vec<Packet> = streams.into_iter().flatten().collect();
    merged.sort_by(|a, b| a.arrival_time.total_cmp(&b.arrival_time));
    merged
}

/// Generate the merged arrival sequence for one trial.
pub fn generate_trial(config: &Config, trial: u64) -> Result<Vec<Packet>> {
    let workload = Workload::new(config.arrival_rate, config.service_rate)?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(trial));

    let mut streams = Vec::with_capacity(config.sources);
    for source in 0..config.sources {
        streams.push(workload.create_packets(&mut rng, config.packets_per_source, source as SourceId));
    }

    Ok(merge_streams(streams))
}
