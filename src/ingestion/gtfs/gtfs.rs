use std::collections::{HashMap, HashSet};

use gtfs_structures::{DirectionType, Exception, Gtfs};

use crate::{
    ingestion::IngestionError,
    schedule::{
        CalendarDateRecord, CalendarRecord, RouteRecord, ScheduleTables, StopRecord,
        StopTimeRecord, TripScheduleRecord,
    },
    structures::{BoundingBox, LatLng},
};

#[derive(Debug, Default)]
pub struct GtfsLoadReport {
    pub stops: usize,
    pub stops_without_location: usize,
    pub stops_outside_bbox: usize,
    pub stop_times: usize,
    pub stop_times_dropped: usize,
    pub routes_without_agency: usize,
}

/// Reads one GTFS feed (zip archive or directory) into normalized tables.
///
/// When `bbox` is given, stops outside of it are removed along with the stop
/// times that reference them.
pub fn load_gtfs(
    gtfs_path: &str,
    feed: &str,
    bbox: Option<&BoundingBox>,
) -> Result<(ScheduleTables, GtfsLoadReport), IngestionError> {
    let gtfs = Gtfs::new(gtfs_path)?;
    let mut report = GtfsLoadReport {
        stops: gtfs.stops.len(),
        ..Default::default()
    };

    let mut stops = Vec::with_capacity(gtfs.stops.len());
    for (stop_id, raw) in &gtfs.stops {
        let lat_lng = match (raw.latitude, raw.longitude) {
            (Some(latitude), Some(longitude)) => LatLng {
                latitude,
                longitude,
            },
            _ => {
                report.stops_without_location += 1;
                continue;
            }
        };
        if bbox.is_some_and(|b| !b.contains(lat_lng)) {
            report.stops_outside_bbox += 1;
            continue;
        }
        stops.push(StopRecord {
            feed: feed.to_string(),
            stop_id: stop_id.clone(),
            name: raw.name.clone(),
            lat_lng,
        });
    }
    stops.sort_by(|a, b| a.stop_id.cmp(&b.stop_id));
    let kept_stops: HashSet<&str> = stops.iter().map(|s| s.stop_id.as_str()).collect();

    let agencies: HashMap<String, String> = gtfs
        .agencies
        .iter()
        .map(|a| {
            (
                a.id.clone().unwrap_or_else(|| "default".to_string()),
                unique_agency_id(&a.name, feed),
            )
        })
        .collect();
    let single_agency = match gtfs.agencies.as_slice() {
        [only] => Some(unique_agency_id(&only.name, feed)),
        _ => None,
    };

    let mut routes = Vec::with_capacity(gtfs.routes.len());
    for (route_id, route) in &gtfs.routes {
        let agency = route
            .agency_id
            .as_ref()
            .and_then(|id| agencies.get(id).cloned())
            .or_else(|| single_agency.clone());
        let agency_id = match agency {
            Some(a) => a,
            None => {
                report.routes_without_agency += 1;
                unique_agency_id("unknown", feed)
            }
        };
        routes.push(RouteRecord {
            feed: feed.to_string(),
            route_id: route_id.clone(),
            short_name: route.short_name.clone(),
            long_name: route.long_name.clone(),
            unique_agency_id: agency_id,
        });
    }
    routes.sort_by(|a, b| a.route_id.cmp(&b.route_id));
    let route_agency: HashMap<&str, &str> = routes
        .iter()
        .map(|r| (r.route_id.as_str(), r.unique_agency_id.as_str()))
        .collect();

    let mut trips = Vec::with_capacity(gtfs.trips.len());
    let mut stop_times = Vec::new();
    for (trip_id, trip) in &gtfs.trips {
        trips.push(TripScheduleRecord {
            feed: feed.to_string(),
            trip_id: trip_id.clone(),
            route_id: trip.route_id.clone(),
            direction_id: trip.direction_id.as_ref().map(|d| match d {
                DirectionType::Outbound => 0,
                DirectionType::Inbound => 1,
            }),
            service_id: trip.service_id.clone(),
            unique_agency_id: route_agency
                .get(trip.route_id.as_str())
                .map(|a| a.to_string())
                .unwrap_or_else(|| unique_agency_id("unknown", feed)),
        });

        for st in &trip.stop_times {
            report.stop_times += 1;
            if !kept_stops.contains(st.stop.id.as_str()) {
                report.stop_times_dropped += 1;
                continue;
            }
            stop_times.push(StopTimeRecord {
                feed: feed.to_string(),
                trip_id: trip_id.clone(),
                stop_id: st.stop.id.clone(),
                stop_sequence: st.stop_sequence,
                arrival_time: st.arrival_time,
                departure_time: st.departure_time,
                is_interpolated: false,
                time_from_previous: None,
            });
        }
    }
    trips.sort_by(|a, b| a.trip_id.cmp(&b.trip_id));
    stop_times.sort_by(|a, b| {
        a.trip_id
            .cmp(&b.trip_id)
            .then(a.stop_sequence.cmp(&b.stop_sequence))
    });

    let mut calendar: Vec<CalendarRecord> = gtfs
        .calendar
        .iter()
        .map(|(service_id, cal)| CalendarRecord {
            feed: feed.to_string(),
            service_id: service_id.clone(),
            days: (cal.monday as u8)
                | ((cal.tuesday as u8) << 1)
                | ((cal.wednesday as u8) << 2)
                | ((cal.thursday as u8) << 3)
                | ((cal.friday as u8) << 4)
                | ((cal.saturday as u8) << 5)
                | ((cal.sunday as u8) << 6),
            start_date: date_to_days(cal.start_date),
            end_date: date_to_days(cal.end_date),
        })
        .collect();
    calendar.sort_by(|a, b| a.service_id.cmp(&b.service_id));

    let mut calendar_dates: Vec<CalendarDateRecord> = gtfs
        .calendar_dates
        .iter()
        .flat_map(|(service_id, dates)| {
            dates.iter().map(move |d| CalendarDateRecord {
                feed: feed.to_string(),
                service_id: service_id.clone(),
                date: date_to_days(d.date),
                added: d.exception_type == Exception::Added,
            })
        })
        .collect();
    calendar_dates.sort_by(|a, b| {
        a.service_id
            .cmp(&b.service_id)
            .then(a.date.cmp(&b.date))
    });

    tracing::info!("{} stops parsed from feed '{feed}'", report.stops);
    tracing::info!(" - {} stops without geo data", report.stops_without_location);
    tracing::info!(" - {} stops outside the bounding box", report.stops_outside_bbox);
    tracing::info!(
        " - {} of {} stop times dropped with their stops",
        report.stop_times_dropped,
        report.stop_times
    );
    if report.routes_without_agency > 0 {
        tracing::warn!(
            "{} routes have no resolvable agency",
            report.routes_without_agency
        );
    }

    let tables = ScheduleTables {
        stops,
        routes,
        trips,
        stop_times,
        calendar,
        calendar_dates,
        ..Default::default()
    };
    Ok((tables, report))
}

/// `<agency name>_<feed>`, lowercase with non alphanumerics replaced by `_`.
pub fn unique_agency_id(agency_name: &str, feed: &str) -> String {
    format!("{agency_name}_{feed}")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

pub fn date_to_days(date: chrono::NaiveDate) -> u32 {
    let epoch = chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default();
    (date - epoch).num_days().max(0) as u32
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_unique_agency_id() {
        assert_eq!(
            unique_agency_id("Metro Transit", "madison"),
            "metro_transit_madison"
        );
        assert_eq!(unique_agency_id("A&B", "x-1"), "a_b_x_1");
    }

    #[test]
    fn test_date_to_days() {
        let d = NaiveDate::from_ymd_opt(2000, 1, 31).unwrap();
        assert_eq!(date_to_days(d), 30);
        let before = NaiveDate::from_ymd_opt(1999, 1, 1).unwrap();
        assert_eq!(date_to_days(before), 0);
    }
}
