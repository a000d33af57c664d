//! Proposed policy: one waiting slot per source.
//!
//! The queue head is in service and runs to completion. Behind it each source
//! owns at most one waiting slot. A new arrival overwrites the waiting update
//! from its own source, or takes a fresh slot at the back if its source has
//! none, so no source ever has more than one stale update queued.

use super::{check_sources, Outcome, Policy, Recorder, DEFAULT_SOURCES};
use crate::error::{Error, Result};
use crate::packet::{admit_ordered, Job, Packet};
use crate::waiting::BoundedQueue;

const NAME: &str = "proposed";

/// Single-slot-per-source replacement engine.
#[derive(Debug, Clone, Copy)]
pub struct ProposedPolicy {
    sources: usize,
}

impl ProposedPolicy {
    /// Create an engine accepting sources `0..sources`.
    pub fn new(sources: usize) -> Result<Self> {
        Ok(Self {
            sources: check_sources(sources)?,
        })
    }
}

impl Default for ProposedPolicy {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES,
        }
    }
}

impl Policy for ProposedPolicy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn run(&self, packets: &[Packet]) -> Result<Outcome> {
        let jobs = admit_ordered(packets, self.sources)?;
        let mut server = Server::new(self.sources, jobs.len());

        for job in jobs {
            server.process(job.arrival_time())?;
            server.arrive(job)?;
        }
        server.process(f64::INFINITY)?;

        Ok(server.recorder.finish())
    }
}

struct Server {
    /// Head in service, then one waiting slot per source
    queue: BoundedQueue<Job>,
    clock: f64,
    recorder: Recorder,
}

impl Server {
    fn new(sources: usize, offered: usize) -> Self {
        Self {
            queue: BoundedQueue::new(sources + 1),
            clock: 0.0,
            recorder: Recorder::new(NAME, offered),
        }
    }

    /// Hand out server time up to `until`, head first.
    fn process(&mut self, until: f64) -> Result<()> {
        while self.clock < until {
            let Some(mut job) = self.queue.pop_front() else {
                break;
            };

            let available = until - self.clock;
            if job.remaining <= available {
                let end = self.clock + job.remaining;
                self.recorder.serve(&job, self.clock, end);
                job.remaining = 0.0;
                self.clock = end;
                self.recorder.complete(&job, end);
            } else {
                self.recorder.serve(&job, self.clock, until);
                job.remaining -= available;
                self.clock = until;
                self.queue
                    .insert_front(job)
                    .map_err(|_| self.full())?;
            }
        }
        Ok(())
    }

    fn arrive(&mut self, job: Job) -> Result<()> {
        self.clock = self.clock.max(job.arrival_time());

        let source = job.source();
        let job = match self.queue.position_waiting(|waiting| waiting.source() == source) {
            Some(index) => match self.queue.replace_waiting(index, job) {
                Ok(old) => {
                    self.recorder.replace(&old, &job);
                    return Ok(());
                }
                Err(job) => job,
            },
            None => job,
        };

        self.queue.push_back(job).map_err(|_| self.full())?;
        tracing::trace!(policy = NAME, waiting = self.queue.waiting_len(), "update queued");
        Ok(())
    }

    fn full(&self) -> Error {
        Error::QueueFull {
            capacity: self.queue.capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::CompletionRecord;

    #[test]
    fn test_waiting_update_replaced_by_same_source() {
        let packets = [
            Packet::new(1.0, 5.0, 0),
            Packet::new(2.0, 2.0, 1),
            Packet::new(3.0, 2.0, 0),
            Packet::new(4.0, 2.0, 1),
        ];

        let outcome = ProposedPolicy::default().run(&packets).unwrap();

        assert_eq!(
            outcome.completions,
            vec![
                CompletionRecord::new(0, 1.0, 6.0),
                CompletionRecord::new(1, 4.0, 8.0),
                CompletionRecord::new(0, 3.0, 10.0),
            ]
        );
        assert_eq!(outcome.stats.replaced, 1);
        assert_eq!(outcome.stats.superseded, 0);
    }

    #[test]
    fn test_head_is_never_replaced() {
        // The second packet shares the head's source but must wait, not overwrite it.
        let packets = [Packet::new(0.0, 3.0, 0), Packet::new(1.0, 1.0, 0)];
        let log = ProposedPolicy::default().simulate(&packets).unwrap();

        assert_eq!(
            log,
            vec![
                CompletionRecord::new(0, 0.0, 3.0),
                CompletionRecord::new(0, 1.0, 4.0),
            ]
        );
    }

    #[test]
    fn test_repeated_replacement_keeps_freshest() {
        let packets = [
            Packet::new(0.0, 10.0, 0),
            Packet::new(1.0, 1.0, 1),
            Packet::new(2.0, 1.0, 1),
            Packet::new(3.0, 1.0, 1),
        ];

        let outcome = ProposedPolicy::default().run(&packets).unwrap();

        assert_eq!(outcome.stats.replaced, 2);
        assert_eq!(
            outcome.completions,
            vec![
                CompletionRecord::new(0, 0.0, 10.0),
                CompletionRecord::new(1, 3.0, 11.0),
            ]
        );
    }

    #[test]
    fn test_head_runs_to_completion() {
        let packets = [Packet::new(0.0, 4.0, 0), Packet::new(1.0, 1.0, 1)];
        let outcome = ProposedPolicy::default().run(&packets).unwrap();

        assert_eq!(outcome.completions[0], CompletionRecord::new(0, 0.0, 4.0));
        assert_eq!(outcome.stats.preemptions, 0);
        // Contiguous grants to the head collapse into one slice.
        assert_eq!(outcome.slices.len(), 2);
    }

    #[test]
    fn test_three_sources() {
        let packets = [
            Packet::new(0.0, 2.0, 2),
            Packet::new(0.5, 1.0, 0),
            Packet::new(0.6, 1.0, 1),
            Packet::new(0.7, 1.0, 2),
        ];

        let log = ProposedPolicy::new(3).unwrap().simulate(&packets).unwrap();
        let sources: Vec<u32> = log.iter().map(|record| record.source).collect();

        assert_eq!(sources, vec![2, 0, 1, 2]);
    }

    #[test]
    fn test_exact_fit_and_simultaneous_arrivals() {
        // The head ends exactly at the next arrival; the two arrivals at t=2
        // share no waiting slot and are served in input order.
        let packets = [
            Packet::new(0.0, 2.0, 0),
            Packet::new(2.0, 1.0, 1),
            Packet::new(2.0, 1.0, 0),
        ];

        let outcome = ProposedPolicy::default().run(&packets).unwrap();

        assert_eq!(
            outcome.completions,
            vec![
                CompletionRecord::new(0, 0.0, 2.0),
                CompletionRecord::new(1, 2.0, 3.0),
                CompletionRecord::new(0, 2.0, 4.0),
            ]
        );
        assert_eq!(outcome.slices.len(), 3);
        assert_eq!(outcome.stats.replaced, 0);
    }

    #[test]
    fn test_empty_input() {
        assert!(ProposedPolicy::default().simulate(&[]).unwrap().is_empty());
    }
}
