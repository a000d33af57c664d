//! aoi-sim-core: Age-of-Information simulation of a single shared server
//!
//! This library provides the core components for a research simulator that:
//! - Feeds status-update packets from several sources into one server
//! - Schedules them under LCFS-W, LCFS-S or the proposed single-slot policy
//! - Logs every delivery with its generation and completion time
//! - Turns the delivery log into a time-averaged Age of Information
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `packet`: Packet and completion record types, ingestion checks
//! - `waiting`: Stack and bounded queue used as waiting rooms
//! - `policy`: The three scheduling engines behind one `Policy` trait
//! - `aoi`: Age sawtooth construction and averaging
//! - `metrics`: Aggregation of many runs per policy
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and recoverable
//! - **Fail fast**: Malformed packets are rejected before simulation starts
//! - **Deterministic**: A run depends only on its input sequence
//! - **Logical time**: No wall clock, no threads, no blocking

pub mod aoi;
pub mod error;
pub mod metrics;
pub mod packet;
pub mod policy;
pub mod waiting;

// Re-export commonly used types
pub use aoi::{age_updates, average_age, mean_delay, AoiUpdate};
pub use error::{Error, Result};
pub use packet::{CompletionRecord, Packet, ServiceSlice, SourceId};
pub use policy::{LcfsS, LcfsW, Outcome, Policy, PolicyKind, ProposedPolicy, RunStats};
