//! Age of Information computed from a completion log.
//!
//! For one source, the age at the receiver is the time elapsed since the
//! generation of the freshest update delivered so far. It grows with slope 1
//! between deliveries and drops at each delivery to the system time of the
//! packet just delivered, giving a sawtooth:
//!
//! ```text
//! age
//!  |        /|
//!  |   /|  / |    /|
//!  |  / | /  |   / |
//!  | /  |/   |  /  |
//!  |/        | /
//!  +-----------------------> time
//! ```
//!
//! # Metrics
//!
//! - [`average_age`]: area under the sawtooth divided by the time it spans.
//!   This is the canonical metric used in reports.
//! - [`mean_delay`]: plain mean of `service_end_time - arrival_time` over
//!   deliveries. It ignores how long each age value persists, so it rewards a
//!   policy that delivers rarely but quickly.
//! - [`system_average_age`]: mean of [`average_age`] across sources.

use crate::error::{AoiError, Result};
use crate::packet::{CompletionRecord, SourceId};

/// A corner of the age sawtooth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AoiUpdate {
    pub time: f64,
    pub age: f64,
}

impl AoiUpdate {
    pub fn new(time: f64, age: f64) -> Self {
        Self { time, age }
    }
}

/// Deliveries for `source`, ordered by service end time.
fn deliveries(outputs: &[CompletionRecord], source: SourceId) -> Vec<CompletionRecord> {
    let mut records: Vec<CompletionRecord> = outputs
        .iter()
        .filter(|record| record.source == source)
        .copied()
        .collect();
    records.sort_by(|a, b| a.service_end_time.total_cmp(&b.service_end_time));
    records
}

/// Build the sawtooth for `source` as a time-ordered list of corners.
///
/// Starts with a zero age at time zero. Every delivery adds two corners at its
/// end time: the peak reached just before it, then the age right after it.
pub fn age_updates(outputs: &[CompletionRecord], source: SourceId) -> Vec<AoiUpdate> {
    let records = deliveries(outputs, source);
    let mut updates = Vec::with_capacity(1 + 2 * records.len());

    let mut previous = AoiUpdate::new(0.0, 0.0);
    updates.push(previous);

    for record in &records {
        let time = record.service_end_time;
        let peak = previous.age + (time - previous.time);
        updates.push(AoiUpdate::new(time, peak));

        previous = AoiUpdate::new(time, record.system_time());
        updates.push(previous);
    }

    updates
}

/// Area under a piecewise-linear age curve.
///
/// Consecutive corners are joined by straight lines; vertical drops have no width.
pub fn area(updates: &[AoiUpdate]) -> f64 {
    updates
        .windows(2)
        .map(|pair| (pair[0].age + pair[1].age) / 2.0 * (pair[1].time - pair[0].time))
        .sum()
}

/// Time-averaged age of information for `source`.
///
/// # Errors
/// `AoiError::InsufficientData` if the source has no delivery after time zero,
/// since the average would divide by a zero time span.
pub fn average_age(outputs: &[CompletionRecord], source: SourceId) -> Result<f64> {
    let updates = age_updates(outputs, source);
    let span = match (updates.first(), updates.last()) {
        (Some(first), Some(last)) if updates.len() > 1 => last.time - first.time,
        _ => 0.0,
    };

    if span <= 0.0 {
        return Err(AoiError::InsufficientData { source_id: source }.into());
    }

    Ok(area(&updates) / span)
}

/// Arithmetic mean of per-delivery system time for `source`.
///
/// # Errors
/// `AoiError::InsufficientData` if the source has no deliveries.
pub fn mean_delay(outputs: &[CompletionRecord], source: SourceId) -> Result<f64> {
    let (sum, count) = outputs
        .iter()
        .filter(|record| record.source == source)
        .fold((0.0, 0usize), |(sum, count), record| {
            (sum + record.system_time(), count + 1)
        });

    if count == 0 {
        return Err(AoiError::InsufficientData { source_id: source }.into());
    }

    Ok(sum / count as f64)
}

/// Peak ages: the value of the sawtooth just before each delivery.
pub fn peak_ages(outputs: &[CompletionRecord], source: SourceId) -> Vec<f64> {
    age_updates(outputs, source)
        .iter()
        .skip(1)
        .step_by(2)
        .map(|update| update.age)
        .collect()
}

/// Unweighted mean of [`average_age`] over `sources`.
///
/// # Errors
/// `AoiError::NoSources` for an empty source list, or the first
/// `InsufficientData` error among the sources.
pub fn system_average_age(outputs: &[CompletionRecord], sources: &[SourceId]) -> Result<f64> {
    if sources.is_empty() {
        return Err(AoiError::NoSources.into());
    }

    let mut total = 0.0;
    for &source in sources {
        total += average_age(outputs, source)?;
    }

    Ok(total / sources.len() as f64)
}
