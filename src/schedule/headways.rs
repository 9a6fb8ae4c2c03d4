use std::collections::{BTreeMap, HashMap};

use crate::schedule::{HeadwayRecord, ScheduleError, StopTimeRecord, TimeWindow, TripScheduleRecord};

type GroupKey<'a> = (&'a str, &'a str, &'a str, Option<u8>, &'a str);

/// Headway statistics per (feed, route, direction, stop) from arrivals inside
/// `window`. Groups with fewer than two arrivals get no record.
///
/// Every stop time must be complete; run interpolation first.
pub fn compute_headways(
    stop_times_int: &[StopTimeRecord],
    trips: &[TripScheduleRecord],
    window: TimeWindow,
) -> Result<Vec<HeadwayRecord>, ScheduleError> {
    let incomplete = stop_times_int.iter().filter(|st| !st.is_complete()).count();
    if incomplete > 0 {
        return Err(ScheduleError::IncompleteStopTimesError(incomplete));
    }

    let trip_lookup: HashMap<(&str, &str), &TripScheduleRecord> = trips
        .iter()
        .map(|t| ((t.feed.as_str(), t.trip_id.as_str()), t))
        .collect();

    let mut groups: BTreeMap<GroupKey, Vec<u32>> = BTreeMap::new();
    let mut without_trip = 0;
    for st in stop_times_int {
        let Some(arrival) = st.arrival_time.filter(|t| window.contains(*t)) else {
            continue;
        };
        let Some(trip) = trip_lookup.get(&(st.feed.as_str(), st.trip_id.as_str())) else {
            without_trip += 1;
            continue;
        };
        groups
            .entry((
                st.feed.as_str(),
                trip.unique_agency_id.as_str(),
                trip.route_id.as_str(),
                trip.direction_id,
                st.stop_id.as_str(),
            ))
            .or_default()
            .push(arrival);
    }
    if without_trip > 0 {
        tracing::warn!("{without_trip} stop times in the window belong to no selected trip");
    }

    let mut headways = Vec::new();
    let mut single_arrival = 0;
    for ((feed, agency, route_id, direction_id, stop_id), mut arrivals) in groups {
        if arrivals.len() < 2 {
            single_arrival += 1;
            continue;
        }
        arrivals.sort_unstable();
        let gaps: Vec<u32> = arrivals.windows(2).map(|w| w[1] - w[0]).collect();
        let n = gaps.len();
        let mean = (arrivals[arrivals.len() - 1] - arrivals[0]) as f64 / n as f64;
        let std = (n > 1).then(|| {
            let ss: f64 = gaps.iter().map(|&g| (g as f64 - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        });

        headways.push(HeadwayRecord {
            feed: feed.to_string(),
            unique_agency_id: agency.to_string(),
            route_id: route_id.to_string(),
            direction_id,
            stop_id: stop_id.to_string(),
            window,
            headway_count: n,
            mean_headway_seconds: mean,
            std_headway_seconds: std,
            min_headway_seconds: gaps.iter().copied().min().unwrap_or(0),
            max_headway_seconds: gaps.iter().copied().max().unwrap_or(0),
        });
    }

    tracing::info!(
        "computed {} headways in {window} ({} route/stop groups with a single arrival)",
        headways.len(),
        single_arrival
    );

    Ok(headways)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schedule::parse_time;

    fn trip(id: &str, route: &str, direction: u8) -> TripScheduleRecord {
        TripScheduleRecord {
            feed: "madison".to_string(),
            trip_id: id.to_string(),
            route_id: route.to_string(),
            direction_id: Some(direction),
            service_id: "weekday".to_string(),
            unique_agency_id: "metro_madison".to_string(),
        }
    }

    fn arrival(trip: &str, stop: &str, time: &str) -> StopTimeRecord {
        let t = Some(parse_time(time).unwrap());
        StopTimeRecord {
            feed: "madison".to_string(),
            trip_id: trip.to_string(),
            stop_id: stop.to_string(),
            stop_sequence: 0,
            arrival_time: t,
            departure_time: t,
            is_interpolated: false,
            time_from_previous: None,
        }
    }

    fn window() -> TimeWindow {
        TimeWindow::parse("07:00:00", "10:00:00").unwrap()
    }

    #[test]
    fn test_regular_headway() {
        let trips = vec![trip("a", "2", 0), trip("b", "2", 0), trip("c", "2", 0)];
        let stop_times = vec![
            arrival("c", "s1", "08:20:00"),
            arrival("a", "s1", "08:00:00"),
            arrival("b", "s1", "08:10:00"),
        ];
        let h = compute_headways(&stop_times, &trips, window()).unwrap();
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].mean_headway_seconds, 600.0);
        assert_eq!(h[0].headway_count, 2);
        assert_eq!(h[0].std_headway_seconds, Some(0.0));
        assert_eq!(h[0].route_id, "2");
        assert_eq!(h[0].stop_id, "s1");
    }

    #[test]
    fn test_mean_is_span_over_gaps() {
        let trips = vec![
            trip("a", "2", 0),
            trip("b", "2", 0),
            trip("c", "2", 0),
            trip("d", "2", 0),
        ];
        let stop_times = vec![
            arrival("a", "s1", "07:00:00"),
            arrival("b", "s1", "07:05:00"),
            arrival("c", "s1", "07:25:00"),
            arrival("d", "s1", "07:31:00"),
        ];
        let h = compute_headways(&stop_times, &trips, window()).unwrap();
        assert_eq!(h[0].mean_headway_seconds, (31.0 * 60.0) / 3.0);
        assert_eq!(h[0].min_headway_seconds, 300);
        assert_eq!(h[0].max_headway_seconds, 1200);
    }

    #[test]
    fn test_groups_by_direction_and_skips_single_arrivals() {
        let trips = vec![trip("a", "2", 0), trip("b", "2", 1), trip("c", "2", 1)];
        let stop_times = vec![
            arrival("a", "s1", "08:00:00"),
            arrival("b", "s1", "08:10:00"),
            arrival("c", "s1", "08:40:00"),
        ];
        let h = compute_headways(&stop_times, &trips, window()).unwrap();
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].direction_id, Some(1));
        assert_eq!(h[0].mean_headway_seconds, 1800.0);
        assert_eq!(h[0].std_headway_seconds, None);
    }

    #[test]
    fn test_arrivals_outside_window_are_ignored() {
        let trips = vec![trip("a", "2", 0), trip("b", "2", 0), trip("c", "2", 0)];
        let stop_times = vec![
            arrival("a", "s1", "06:50:00"),
            arrival("b", "s1", "08:00:00"),
            arrival("c", "s1", "10:00:00"),
        ];
        let h = compute_headways(&stop_times, &trips, window()).unwrap();
        assert!(h.is_empty());
    }

    #[test]
    fn test_incomplete_stop_times_are_rejected() {
        let trips = vec![trip("a", "2", 0)];
        let mut st = arrival("a", "s1", "08:00:00");
        st.arrival_time = None;
        assert_eq!(
            compute_headways(&[st], &trips, window()),
            Err(ScheduleError::IncompleteStopTimesError(1))
        );
    }
}
