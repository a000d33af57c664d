//! LCFS-W: last come first served, non-preemptive.
//!
//! Arrivals are sorted by time first (stable, so ties keep input order). The
//! stack top is the packet in service; everything below it waits with the
//! newest on top. A new arrival never interrupts service: it slides in right
//! below the top and goes next once the server frees up.

use super::{check_sources, Freshness, Outcome, Policy, Recorder, DEFAULT_SOURCES};
use crate::error::Result;
use crate::packet::{admit_sorted, Job, Packet};
use crate::waiting::Stack;

const NAME: &str = "lcfs-w";

/// Non-preemptive last-come-first-served engine.
#[derive(Debug, Clone, Copy)]
pub struct LcfsW {
    sources: usize,
}

impl LcfsW {
    /// Create an engine accepting sources `0..sources`.
    pub fn new(sources: usize) -> Result<Self> {
        Ok(Self {
            sources: check_sources(sources)?,
        })
    }
}

impl Default for LcfsW {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES,
        }
    }
}

impl Policy for LcfsW {
    fn name(&self) -> &'static str {
        NAME
    }

    fn run(&self, packets: &[Packet]) -> Result<Outcome> {
        let jobs = admit_sorted(packets, self.sources)?;
        let mut server = Server::new(self.sources, jobs.len());

        for job in jobs {
            server.drain(job.arrival_time());
            server.arrive(job);
        }
        server.drain(f64::INFINITY);

        Ok(server.recorder.finish())
    }
}

struct Server {
    stack: Stack<Job>,
    /// Time the server last became free
    clock: f64,
    freshness: Freshness,
    recorder: Recorder,
}

impl Server {
    fn new(sources: usize, offered: usize) -> Self {
        Self {
            stack: Stack::new(),
            clock: 0.0,
            freshness: Freshness::new(sources),
            recorder: Recorder::new(NAME, offered),
        }
    }

    /// Complete every packet whose service fits entirely before `until`.
    ///
    /// On return the top of the stack, if any, is the packet in service at `until`.
    fn drain(&mut self, until: f64) {
        while let Some(job) = self.stack.pop() {
            if self.freshness.is_superseded(&job) {
                self.recorder.supersede(&job);
                continue;
            }

            let start = self.clock.max(job.arrival_time());
            let end = start + job.packet.service_time;
            if end > until {
                self.stack.push(job);
                break;
            }

            self.recorder.serve(&job, start, end);
            self.clock = end;
            self.freshness.deliver(&job);
            self.recorder.complete(&job, end);
        }
    }

    fn arrive(&mut self, job: Job) {
        match self.stack.pop() {
            Some(in_service) => {
                self.stack.push(job);
                self.stack.push(in_service);
            }
            None => self.stack.push(job),
        }
        tracing::trace!(policy = NAME, depth = self.stack.len(), "update stacked");
    }
}
