use std::collections::HashMap;

use crate::schedule::{CalendarRecord, ServiceDay, TripScheduleRecord};

/// Trips scheduled on the service day, plus what could not be decided.
#[derive(Debug, Default)]
pub struct TripSelection {
    pub trips: Vec<TripScheduleRecord>,
    /// Trips whose service_id is absent from the calendar table.
    pub without_calendar: usize,
}

/// Keeps the trips whose calendar service runs on `day`.
pub fn select_trips(
    trips: &[TripScheduleRecord],
    calendar: &[CalendarRecord],
    day: ServiceDay,
) -> TripSelection {
    let services: HashMap<(&str, &str), &CalendarRecord> = calendar
        .iter()
        .map(|c| ((c.feed.as_str(), c.service_id.as_str()), c))
        .collect();

    let mut selection = TripSelection::default();
    for trip in trips {
        match services.get(&(trip.feed.as_str(), trip.service_id.as_str())) {
            Some(service) if service.runs_on(day) => selection.trips.push(trip.clone()),
            Some(_) => {}
            None => selection.without_calendar += 1,
        }
    }

    tracing::info!(
        "{} of {} trips run on {day}",
        selection.trips.len(),
        trips.len()
    );
    if selection.without_calendar > 0 {
        tracing::warn!(
            "{} trips reference a service_id missing from the calendar",
            selection.without_calendar
        );
    }

    selection
}

#[cfg(test)]
mod test {
    use super::*;

    fn trip(id: &str, service: &str) -> TripScheduleRecord {
        TripScheduleRecord {
            feed: "madison".to_string(),
            trip_id: id.to_string(),
            route_id: "2".to_string(),
            direction_id: Some(0),
            service_id: service.to_string(),
            unique_agency_id: "metro_madison".to_string(),
        }
    }

    fn service(id: &str, days: u8) -> CalendarRecord {
        CalendarRecord {
            feed: "madison".to_string(),
            service_id: id.to_string(),
            days,
            start_date: 0,
            end_date: u32::MAX,
        }
    }

    #[test]
    fn test_selects_trips_running_on_day() {
        let trips = vec![trip("a", "weekday"), trip("b", "weekend"), trip("c", "ghost")];
        let calendar = vec![service("weekday", 0b0011111), service("weekend", 0b1100000)];

        let wednesday = select_trips(&trips, &calendar, ServiceDay::Wednesday);
        assert_eq!(wednesday.trips.len(), 1);
        assert_eq!(wednesday.trips[0].trip_id, "a");
        assert_eq!(wednesday.without_calendar, 1);

        let sunday = select_trips(&trips, &calendar, ServiceDay::Sunday);
        assert_eq!(sunday.trips.len(), 1);
        assert_eq!(sunday.trips[0].trip_id, "b");
    }

    #[test]
    fn test_service_ids_are_scoped_by_feed() {
        let mut other = trip("a", "weekday");
        other.feed = "other".to_string();
        let calendar = vec![service("weekday", 0b0011111)];
        let selection = select_trips(&[other], &calendar, ServiceDay::Monday);
        assert!(selection.trips.is_empty());
        assert_eq!(selection.without_calendar, 1);
    }
}
