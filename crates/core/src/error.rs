//! Error types for the aoi-sim system.
//!
//! All operations return structured errors rather than panicking.
//! Malformed input is rejected at ingestion, before any simulation step runs.

use thiserror::Error;

use crate::packet::SourceId;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Packet: validation of the arrival sequence handed to an engine
/// - AoI: age computations that lack enough data to be meaningful
/// - Queue: waiting-structure overflow
/// - Config: invalid engine construction parameters
/// - Worker: a trial worker thread died before reporting
#[derive(Debug, Error)]
pub enum Error {
    /// Packet validation failed at ingestion
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    /// Age-of-information computation failed
    #[error("aoi error: {0}")]
    Aoi(#[from] AoiError),

    /// A bounded waiting queue rejected an insert
    #[error("waiting queue full: capacity {capacity}")]
    QueueFull { capacity: usize },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A trial worker panicked
    #[error("trial worker {worker} panicked")]
    Worker { worker: usize },
}

/// Packet validation errors.
///
/// `index` is the position of the offending packet in the caller's slice.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PacketError {
    /// Arrival time is negative, NaN or infinite
    #[error("packet {index}: invalid arrival time {arrival_time}")]
    InvalidArrival { index: usize, arrival_time: f64 },

    /// Service time is zero, negative, NaN or infinite
    #[error("packet {index}: service time must be positive and finite, got {service_time}")]
    InvalidService { index: usize, service_time: f64 },

    /// Source id outside the configured set `0..sources`
    #[error("packet {index}: unknown source {source_id}, expected 0..{sources}")]
    UnknownSource {
        index: usize,
        source_id: SourceId,
        sources: usize,
    },

    /// Arrival earlier than its predecessor in an engine that requires ordered input
    #[error("packet {index}: arrival {arrival_time} precedes previous arrival {previous}")]
    OutOfOrder {
        index: usize,
        arrival_time: f64,
        previous: f64,
    },
}

/// Age-of-information errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AoiError {
    /// Not enough deliveries to span a positive time interval
    #[error("insufficient data to compute age of information for source {source_id}")]
    InsufficientData { source_id: SourceId },

    /// No sources given to a cross-source average
    #[error("no sources to average over")]
    NoSources,
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
