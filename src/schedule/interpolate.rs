use std::collections::HashMap;

use crate::schedule::{StopTimeRecord, TripScheduleRecord};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    #[error("trip has {known} stop time(s) with a known time, at least 2 are needed")]
    InsufficientDataError { known: usize },
    #[error("stop_sequence {0} appears more than once")]
    DuplicateSequenceError(u32),
    #[error("known times decrease at stop_sequence {0}")]
    DecreasingTimeError(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedTrip {
    pub feed: String,
    pub trip_id: String,
    pub reason: InterpolationError,
}

#[derive(Debug, Default)]
pub struct InterpolationReport {
    pub trips_selected: usize,
    pub trips_without_stop_times: usize,
    /// Trips where at least one time was filled in.
    pub trips_interpolated: usize,
    pub records_filled: usize,
    /// Leading or trailing records with no known time on one side.
    pub records_dropped: usize,
    pub excluded: Vec<ExcludedTrip>,
}

struct TripInterpolation {
    records: Vec<StopTimeRecord>,
    filled: usize,
    dropped: usize,
}

/// Fills missing stop times of the selected trips by linear interpolation over
/// `stop_sequence`. Output rows are grouped by trip and ordered by sequence;
/// trips that cannot be interpolated are left out and reported.
pub fn interpolate_stop_times(
    stop_times: &[StopTimeRecord],
    selected: &[TripScheduleRecord],
) -> (Vec<StopTimeRecord>, InterpolationReport) {
    let mut by_trip: HashMap<(&str, &str), Vec<&StopTimeRecord>> = selected
        .iter()
        .map(|t| ((t.feed.as_str(), t.trip_id.as_str()), Vec::new()))
        .collect();
    for st in stop_times {
        if let Some(group) = by_trip.get_mut(&(st.feed.as_str(), st.trip_id.as_str())) {
            group.push(st);
        }
    }

    let mut report = InterpolationReport {
        trips_selected: selected.len(),
        ..Default::default()
    };
    let mut output = Vec::with_capacity(stop_times.len());

    for trip in selected {
        let records = match by_trip.remove(&(trip.feed.as_str(), trip.trip_id.as_str())) {
            Some(records) if !records.is_empty() => records,
            Some(_) => {
                report.trips_without_stop_times += 1;
                continue;
            }
            // duplicated trip in the selection, already handled
            None => continue,
        };

        match interpolate_trip(records.into_iter().cloned().collect()) {
            Ok(done) => {
                if done.filled > 0 {
                    report.trips_interpolated += 1;
                }
                report.records_filled += done.filled;
                report.records_dropped += done.dropped;
                output.extend(done.records);
            }
            Err(reason) => {
                tracing::warn!("excluding trip {} ({}): {reason}", trip.trip_id, trip.feed);
                report.excluded.push(ExcludedTrip {
                    feed: trip.feed.clone(),
                    trip_id: trip.trip_id.clone(),
                    reason,
                });
            }
        }
    }

    tracing::info!(
        "interpolated {} stop times on {} of {} trips ({} excluded, {} without stop times, {} unbounded stop times dropped)",
        report.records_filled,
        report.trips_interpolated,
        report.trips_selected,
        report.excluded.len(),
        report.trips_without_stop_times,
        report.records_dropped
    );

    (output, report)
}

fn interpolate_trip(
    mut records: Vec<StopTimeRecord>,
) -> Result<TripInterpolation, InterpolationError> {
    records.sort_unstable_by_key(|r| r.stop_sequence);
    if let Some(pair) = records
        .windows(2)
        .find(|p| p[0].stop_sequence == p[1].stop_sequence)
    {
        return Err(InterpolationError::DuplicateSequenceError(
            pair[0].stop_sequence,
        ));
    }

    // a stop with only one of its two times stops at that time
    for r in records.iter_mut() {
        match (r.arrival_time, r.departure_time) {
            (Some(a), None) => r.departure_time = Some(a),
            (None, Some(d)) => r.arrival_time = Some(d),
            _ => {}
        }
    }

    let known: Vec<usize> = (0..records.len())
        .filter(|&i| records[i].is_complete())
        .collect();
    if known.len() < 2 {
        return Err(InterpolationError::InsufficientDataError { known: known.len() });
    }

    let mut last_departure = 0;
    for &i in &known {
        let r = &records[i];
        let (arrival, departure) = (r.arrival_time.unwrap_or(0), r.departure_time.unwrap_or(0));
        if arrival < last_departure || departure < arrival {
            return Err(InterpolationError::DecreasingTimeError(r.stop_sequence));
        }
        last_departure = departure;
    }

    let mut filled = 0;
    for pair in known.windows(2) {
        let (k0, k1) = (pair[0], pair[1]);
        let t0 = records[k0].departure_time.unwrap_or(0);
        let t1 = records[k1].arrival_time.unwrap_or(0);
        let s0 = records[k0].stop_sequence;
        let s1 = records[k1].stop_sequence;
        for r in &mut records[k0 + 1..k1] {
            let fraction = (r.stop_sequence - s0) as f64 / (s1 - s0) as f64;
            let t = t0 + ((t1 - t0) as f64 * fraction).round() as u32;
            r.arrival_time = Some(t);
            r.departure_time = Some(t);
            r.is_interpolated = true;
            filled += 1;
        }
    }

    let first = known[0];
    let last = known[known.len() - 1];
    let dropped = first + (records.len() - 1 - last);
    records.truncate(last + 1);
    let records = records.split_off(first);

    Ok(TripInterpolation {
        records,
        filled,
        dropped,
    })
}

/// Sets `time_from_previous` on rows grouped by trip and ordered by sequence,
/// as produced by [`interpolate_stop_times`].
pub fn time_difference(stop_times: Vec<StopTimeRecord>) -> Vec<StopTimeRecord> {
    let mut output: Vec<StopTimeRecord> = Vec::with_capacity(stop_times.len());
    for mut st in stop_times {
        st.time_from_previous = match output.last() {
            Some(prev) if prev.feed == st.feed && prev.trip_id == st.trip_id => {
                match (prev.departure_time, st.arrival_time) {
                    (Some(departure), Some(arrival)) => Some(arrival.saturating_sub(departure)),
                    _ => None,
                }
            }
            _ => None,
        };
        output.push(st);
    }
    output
}
