//! LCFS-S: last come first served with preemption.
//!
//! Service is sliced. Between two arrivals the server works on the stack top;
//! a packet that runs out of time goes back on top with its remaining work.
//! Every arrival is pushed on top unconditionally, so it takes the server away
//! from whatever was running.

use super::{check_sources, Freshness, Outcome, Policy, Recorder, DEFAULT_SOURCES};
use crate::error::Result;
use crate::packet::{admit_ordered, Job, Packet};
use crate::waiting::Stack;

const NAME: &str = "lcfs-s";

/// Preemptive last-come-first-served engine.
#[derive(Debug, Clone, Copy)]
pub struct LcfsS {
    sources: usize,
}

impl LcfsS {
    /// Create an engine accepting sources `0..sources`.
    pub fn new(sources: usize) -> Result<Self> {
        Ok(Self {
            sources: check_sources(sources)?,
        })
    }
}

impl Default for LcfsS {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES,
        }
    }
}

impl Policy for LcfsS {
    fn name(&self) -> &'static str {
        NAME
    }

    fn run(&self, packets: &[Packet]) -> Result<Outcome> {
        let jobs = admit_ordered(packets, self.sources)?;
        let mut server = Server::new(self.sources, jobs.len());

        for job in jobs {
            server.process(job.arrival_time());
            server.arrive(job);
        }
        server.process(f64::INFINITY);

        Ok(server.recorder.finish())
    }
}

struct Server {
    stack: Stack<Job>,
    /// Time up to which work has been handed out
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

    /// Hand out server time up to `until`, newest packet first.
    fn process(&mut self, until: f64) {
        while self.clock < until {
            let Some(mut job) = self.stack.pop() else {
                break;
            };

            if self.freshness.is_superseded(&job) {
                self.recorder.supersede(&job);
                continue;
            }

            let available = until - self.clock;
            if job.remaining <= available {
                let end = self.clock + job.remaining;
                self.recorder.serve(&job, self.clock, end);
                job.remaining = 0.0;
                self.clock = end;
                self.freshness.deliver(&job);
                self.recorder.complete(&job, end);
            } else {
                self.recorder.serve(&job, self.clock, until);
                job.remaining -= available;
                self.clock = until;
                self.stack.push(job);
            }
        }
    }

    fn arrive(&mut self, job: Job) {
        self.clock = self.clock.max(job.arrival_time());

        if let Some(running) = self.stack.peek() {
            if running.remaining < running.packet.service_time {
                self.recorder.preempt(running, &job);
            }
        }
        self.stack.push(job);
        tracing::trace!(policy = NAME, depth = self.stack.len(), "update stacked");
    }
}
