//! Packet model: pending status updates and completed deliveries.
//!
//! A [`Packet`] is what a source hands to the server: when it was generated,
//! how much work the server needs to deliver it, and which source produced it.
//! A [`CompletionRecord`] is what the receiver observes once the server has
//! finished a packet.
//!
//! # Copy-in
//!
//! Engines never touch caller-owned packets. Ingestion validates the whole
//! sequence first, then wraps each packet in a private [`Job`] that carries
//! the mutable remaining-work counter used by sliced service.

use crate::error::{PacketError, Result};

/// Identifier of an information source. Valid ids are `0..sources`.
pub type SourceId = u32;

/// A status update waiting to be delivered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packet {
    /// Simulation time at which the update was generated
    pub arrival_time: f64,

    /// Total processing work required to deliver the update
    pub service_time: f64,

    /// Source that produced the update
    pub source: SourceId,
}

impl Packet {
    /// Create a new packet.
    pub fn new(arrival_time: f64, service_time: f64, source: SourceId) -> Self {
        Self {
            arrival_time,
            service_time,
            source,
        }
    }
}

/// A delivered update as seen by the receiver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionRecord {
    /// Source that produced the update
    pub source: SourceId,

    /// Arrival time copied from the originating packet
    pub arrival_time: f64,

    /// Simulation time at which service finished
    pub service_end_time: f64,
}

impl CompletionRecord {
    /// Create a new completion record.
    pub fn new(source: SourceId, arrival_time: f64, service_end_time: f64) -> Self {
        Self {
            source,
            arrival_time,
            service_end_time,
        }
    }

    /// Age of the delivered update at the instant it reached the receiver.
    pub fn system_time(&self) -> f64 {
        self.service_end_time - self.arrival_time
    }
}

/// One contiguous grant of server time to a single packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceSlice {
    /// Index of the packet in the caller's input slice
    pub seq: usize,

    /// Source of the served packet
    pub source: SourceId,

    /// Slice start time
    pub start: f64,

    /// Slice end time
    pub end: f64,
}

impl ServiceSlice {
    /// Amount of work granted in this slice.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Engine-private copy of a packet with its outstanding work.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Job {
    /// Position in the caller's input slice
    pub seq: usize,

    pub packet: Packet,

    /// Work still owed to this packet
    pub remaining: f64,
}

impl Job {
    fn new(seq: usize, packet: &Packet) -> Self {
        Self {
            seq,
            packet: *packet,
            remaining: packet.service_time,
        }
    }

    pub fn source(&self) -> SourceId {
        self.packet.source
    }

    pub fn arrival_time(&self) -> f64 {
        self.packet.arrival_time
    }

    /// Index into per-source state tables. Valid after ingestion.
    pub fn source_index(&self) -> usize {
        self.packet.source as usize
    }
}

/// Validate a single packet against the configured source set.
pub fn validate(index: usize, packet: &Packet, sources: usize) -> Result<()> {
    if !packet.arrival_time.is_finite() || packet.arrival_time < 0.0 {
        return Err(PacketError::InvalidArrival {
            index,
            arrival_time: packet.arrival_time,
        }
        .into());
    }

    if !packet.service_time.is_finite() || packet.service_time <= 0.0 {
        return Err(PacketError::InvalidService {
            index,
            service_time: packet.service_time,
        }
        .into());
    }

    if packet.source as usize >= sources {
        return Err(PacketError::UnknownSource {
            index,
            source_id: packet.source,
            sources,
        }
        .into());
    }

    Ok(())
}

/// Validate and copy an arrival-ordered sequence.
///
/// # Errors
/// Any [`PacketError`] from [`validate`], or `PacketError::OutOfOrder` if an
/// arrival precedes the one before it.
pub(crate) fn admit_ordered(packets: &[Packet], sources: usize) -> Result<Vec<Job>> {
    let mut previous = f64::NEG_INFINITY;

    for (index, packet) in packets.iter().enumerate() {
        validate(index, packet, sources)?;

        if packet.arrival_time < previous {
            return Err(PacketError::OutOfOrder {
                index,
                arrival_time: packet.arrival_time,
                previous,
            }
            .into());
        }
        previous = packet.arrival_time;
    }

    Ok(packets
        .iter()
        .enumerate()
        .map(|(seq, packet)| Job::new(seq, packet))
        .collect())
}

/// Validate and copy a sequence, then sort it by arrival time.
///
/// The sort is stable, so simultaneous arrivals keep their input order.
pub(crate) fn admit_sorted(packets: &[Packet], sources: usize) -> Result<Vec<Job>> {
    for (index, packet) in packets.iter().enumerate() {
        validate(index, packet, sources)?;
    }

    let mut jobs: Vec<Job> = packets
        .iter()
        .enumerate()
        .map(|(seq, packet)| Job::new(seq, packet))
        .collect();
    jobs.sort_by(|a, b| a.arrival_time().total_cmp(&b.arrival_time()));

    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(validate(0, &Packet::new(0.0, 1.0, 1), 2).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_service() {
        let result = validate(4, &Packet::new(1.0, 0.0, 0), 2);
        assert!(matches!(
            result,
            Err(Error::Packet(PacketError::InvalidService { index: 4, .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_negative_arrival() {
        let result = validate(0, &Packet::new(-0.5, 1.0, 0), 2);
        assert!(matches!(
            result,
            Err(Error::Packet(PacketError::InvalidArrival { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_nan() {
        assert!(validate(0, &Packet::new(f64::NAN, 1.0, 0), 2).is_err());
        assert!(validate(0, &Packet::new(1.0, f64::NAN, 0), 2).is_err());
        assert!(validate(0, &Packet::new(1.0, f64::INFINITY, 0), 2).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_source() {
        let result = validate(2, &Packet::new(1.0, 1.0, 2), 2);
        assert!(matches!(
            result,
            Err(Error::Packet(PacketError::UnknownSource {
                index: 2,
                source_id: 2,
                sources: 2
            }))
        ));
    }

    #[test]
    fn test_admit_ordered_rejects_backwards_arrival() {
        let packets = [
            Packet::new(1.0, 1.0, 0),
            Packet::new(3.0, 1.0, 1),
            Packet::new(2.0, 1.0, 0),
        ];

        let result = admit_ordered(&packets, 2);
        assert!(matches!(
            result,
            Err(Error::Packet(PacketError::OutOfOrder { index: 2, .. }))
        ));
    }

    #[test]
    fn test_admit_ordered_allows_ties() {
        let packets = [Packet::new(1.0, 1.0, 0), Packet::new(1.0, 2.0, 1)];
        let jobs = admit_ordered(&packets, 2).unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].seq, 1);
        assert_eq!(jobs[1].remaining, 2.0);
    }

    #[test]
    fn test_admit_sorted_is_stable() {
        let packets = [
            Packet::new(3.0, 1.0, 0),
            Packet::new(1.0, 1.0, 1),
            Packet::new(3.0, 2.0, 1),
            Packet::new(2.0, 1.0, 0),
        ];

        let jobs = admit_sorted(&packets, 2).unwrap();
        let order: Vec<usize> = jobs.iter().map(|job| job.seq).collect();

        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_admit_does_not_touch_input() {
        let packets = vec![Packet::new(0.0, 4.0, 0)];
        let mut jobs = admit_ordered(&packets, 1).unwrap();
        jobs[0].remaining = 0.0;

        assert_eq!(packets[0].service_time, 4.0);
    }

    #[test]
    fn test_system_time() {
        let record = CompletionRecord::new(0, 2.0, 4.5);
        assert_eq!(record.system_time(), 2.5);
    }
}
