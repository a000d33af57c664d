//! Scheduling policies for a single shared server.
//!
//! Every policy consumes a finite sequence of arrivals and produces the log of
//! deliveries the receiver observes. The three engines share no state; each
//! run builds its own waiting structure and clock, so an engine value can be
//! reused and always returns the same log for the same input.
//!
//! # Policies
//!
//! - [`LcfsW`]: last come first served, non-preemptive. The newest waiting
//!   packet goes next, but a packet in service always finishes.
//! - [`LcfsS`]: last come first served with preemption. A new arrival takes
//!   the server immediately; the interrupted packet resumes later with its
//!   remaining work intact.
//! - [`ProposedPolicy`]: one packet in service plus at most one waiting packet
//!   per source; a newer update replaces the waiting one from its source.
//!
//! LCFS-W and LCFS-S drop a packet when it reaches the server if its source has
//! already delivered something generated later (it is superseded).

mod lcfs_s;
mod lcfs_w;
mod proposed;

pub use lcfs_s::LcfsS;
pub use lcfs_w::LcfsW;
pub use proposed::ProposedPolicy;

use crate::error::{Error, Result};
use crate::packet::{CompletionRecord, Job, Packet, ServiceSlice};
use std::fmt;
use std::str::FromStr;

/// Number of sources assumed by the `Default` engines.
pub const DEFAULT_SOURCES: usize = 2;

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunStats {
    /// Packets handed to the engine
    pub offered: u64,

    /// Packets that produced a completion record
    pub delivered: u64,

    /// Packets dropped because a fresher update from their source was already delivered
    pub superseded: u64,

    /// Waiting packets overwritten by a newer arrival from the same source
    pub replaced: u64,

    /// Arrivals that interrupted a packet in service
    pub preemptions: u64,

    /// Total time the server spent working
    pub busy_time: f64,

    /// Time of the last delivery (0 when nothing was delivered)
    pub makespan: f64,
}

/// Everything a single engine run produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Deliveries in the order they completed
    pub completions: Vec<CompletionRecord>,

    /// Server time grants in chronological order
    pub slices: Vec<ServiceSlice>,

    pub stats: RunStats,
}

/// A scheduling/admission policy for the shared server.
pub trait Policy {
    /// Short name used in reports and on the command line.
    fn name(&self) -> &'static str;

    /// Run the policy over `packets` and return the full outcome.
    ///
    /// # Errors
    /// Returns a `PacketError` if any packet is malformed. Validation happens
    /// before the first simulation step.
    fn run(&self, packets: &[Packet]) -> Result<Outcome>;

    /// Run the policy and return only the completion log.
    fn simulate(&self, packets: &[Packet]) -> Result<Vec<CompletionRecord>> {
        Ok(self.run(packets)?.completions)
    }
}

/// Selector for the available policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    LcfsW,
    LcfsS,
    Proposed,
}

impl PolicyKind {
    /// All policies, in report order.
    pub const ALL: [PolicyKind; 3] = [PolicyKind::LcfsW, PolicyKind::LcfsS, PolicyKind::Proposed];

    pub fn name(self) -> &'static str {
        match self {
            PolicyKind::LcfsW => "lcfs-w",
            PolicyKind::LcfsS => "lcfs-s",
            PolicyKind::Proposed => "proposed",
        }
    }

    /// Build an engine of this kind for `sources` sources.
    pub fn engine(self, sources: usize) -> Result<Box<dyn Policy + Send + Sync>> {
        Ok(match self {
            PolicyKind::LcfsW => Box::new(LcfsW::new(sources)?),
            PolicyKind::LcfsS => Box::new(LcfsS::new(sources)?),
            PolicyKind::Proposed => Box::new(ProposedPolicy::new(sources)?),
        })
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "lcfs-w" | "w" => Ok(PolicyKind::LcfsW),
            "lcfs-s" | "s" => Ok(PolicyKind::LcfsS),
            "proposed" | "p" => Ok(PolicyKind::Proposed),
            other => Err(Error::Config(format!("unknown policy: {}", other))),
        }
    }
}

/// Reject engine construction without any sources.
pub(crate) fn check_sources(sources: usize) -> Result<usize> {
    if sources == 0 {
        return Err(Error::Config("at least one source is required".to_string()));
    }
    Ok(sources)
}

/// Arrival time of the most recently delivered update, per source.
#[derive(Debug)]
pub(crate) struct Freshness {
    last_update: Vec<f64>,
}

impl Freshness {
    pub fn new(sources: usize) -> Self {
        Self {
            last_update: vec![f64::NEG_INFINITY; sources],
        }
    }

    /// True if `job` is older than what its source already delivered.
    pub fn is_superseded(&self, job: &Job) -> bool {
        job.arrival_time() < self.last_update[job.source_index()]
    }

    pub fn deliver(&mut self, job: &Job) {
        self.last_update[job.source_index()] = job.arrival_time();
    }
}

/// Collects completions, slices and counters while an engine runs.
#[derive(Debug)]
pub(crate) struct Recorder {
    policy: &'static str,
    completions: Vec<CompletionRecord>,
    slices: Vec<ServiceSlice>,
    stats: RunStats,
}

impl Recorder {
    pub fn new(policy: &'static str, offered: usize) -> Self {
        Self {
            policy,
            completions: Vec::with_capacity(offered),
            slices: Vec::with_capacity(offered),
            stats: RunStats {
                offered: offered as u64,
                ..RunStats::default()
            },
        }
    }

    /// Record `[start, end)` of server time granted to `job`.
    ///
    /// A grant that continues the previous slice of the same job extends it.
    pub fn serve(&mut self, job: &Job, start: f64, end: f64) {
        if end <= start {
            return;
        }
        self.stats.busy_time += end - start;

        if let Some(last) = self.slices.last_mut() {
            if last.seq == job.seq && last.end == start {
                last.end = end;
                return;
            }
        }

        self.slices.push(ServiceSlice {
            seq: job.seq,
            source: job.source(),
            start,
            end,
        });
    }

    pub fn complete(&mut self, job: &Job, end: f64) {
        tracing::trace!(
            policy = self.policy,
            seq = job.seq,
            source = job.source(),
            arrival = job.arrival_time(),
            end,
            "delivered"
        );
        self.stats.delivered += 1;
        self.stats.makespan = end;
        self.completions
            .push(CompletionRecord::new(job.source(), job.arrival_time(), end));
    }

    pub fn supersede(&mut self, job: &Job) {
        tracing::trace!(
            policy = self.policy,
            seq = job.seq,
            source = job.source(),
            arrival = job.arrival_time(),
            "superseded"
        );
        self.stats.superseded += 1;
    }

    pub fn replace(&mut self, old: &Job, new: &Job) {
        tracing::trace!(
            policy = self.policy,
            source = new.source(),
            dropped = old.seq,
            kept = new.seq,
            "replaced waiting update"
        );
        self.stats.replaced += 1;
    }

    pub fn preempt(&mut self, interrupted: &Job, by: &Job) {
        tracing::trace!(
            policy = self.policy,
            interrupted = interrupted.seq,
            remaining = interrupted.remaining,
            by = by.seq,
            "preempted"
        );
        self.stats.preemptions += 1;
    }

    pub fn finish(self) -> Outcome {
        tracing::debug!(
            policy = self.policy,
            offered = self.stats.offered,
            delivered = self.stats.delivered,
            superseded = self.stats.superseded,
            replaced = self.stats.replaced,
            preemptions = self.stats.preemptions,
            makespan = self.stats.makespan,
            "run finished"
        );
        Outcome {
            completions: self.completions,
            slices: self.slices,
            stats: self.stats,
        }
    }
}
