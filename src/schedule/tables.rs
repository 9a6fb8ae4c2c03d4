use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::structures::{BoundingBox, LatLng};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ScheduleError {
    #[error("invalid time of day '{0}', expected HH:MM:SS")]
    InvalidTimeError(String),
    #[error("invalid time window: start {0} is not before end {1}")]
    InvalidWindowError(String, String),
    #[error("unknown day of week '{0}'")]
    InvalidDayError(String),
    #[error("{0} stop time(s) still have no arrival or departure time")]
    IncompleteStopTimesError(usize),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ServiceDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl ServiceDay {
    /// Bit of this day in a calendar `days` mask, Monday being bit 0.
    pub fn bit(&self) -> u8 {
        1 << (*self as u8)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServiceDay::Monday => "monday",
            ServiceDay::Tuesday => "tuesday",
            ServiceDay::Wednesday => "wednesday",
            ServiceDay::Thursday => "thursday",
            ServiceDay::Friday => "friday",
            ServiceDay::Saturday => "saturday",
            ServiceDay::Sunday => "sunday",
        }
    }
}

impl FromStr for ServiceDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monday" => Ok(ServiceDay::Monday),
            "tuesday" => Ok(ServiceDay::Tuesday),
            "wednesday" => Ok(ServiceDay::Wednesday),
            "thursday" => Ok(ServiceDay::Thursday),
            "friday" => Ok(ServiceDay::Friday),
            "saturday" => Ok(ServiceDay::Saturday),
            "sunday" => Ok(ServiceDay::Sunday),
            _ => Err(ScheduleError::InvalidDayError(s.to_string())),
        }
    }
}

impl TryFrom<String> for ServiceDay {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServiceDay> for String {
    fn from(day: ServiceDay) -> Self {
        day.name().to_string()
    }
}

impl Display for ServiceDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Seconds since midnight of the service day. GTFS allows hours past 24.
pub fn parse_time(s: &str) -> Result<u32, ScheduleError> {
    let err = || ScheduleError::InvalidTimeError(s.to_string());
    let mut parts = s.trim().split(':');
    let mut next = || -> Result<u32, ScheduleError> {
        parts.next().ok_or_else(err)?.parse::<u32>().map_err(|_| err())
    };
    let (h, m, sec) = (next()?, next()?, next()?);
    if parts.next().is_some() || m >= 60 || sec >= 60 {
        return Err(err());
    }
    Ok(h * 3600 + m * 60 + sec)
}

pub fn format_time(t: u32) -> String {
    format!("{:02}:{:02}:{:02}", t / 3600, (t % 3600) / 60, t % 60)
}

/// Half-open `[start, end)` window in seconds since midnight.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[String; 2]", into = "[String; 2]")]
pub struct TimeWindow {
    pub start: u32,
    pub end: u32,
}

impl TimeWindow {
    pub fn new(start: u32, end: u32) -> Result<Self, ScheduleError> {
        if start >= end {
            return Err(ScheduleError::InvalidWindowError(
                format_time(start),
                format_time(end),
            ));
        }
        Ok(TimeWindow { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, ScheduleError> {
        Self::new(parse_time(start)?, parse_time(end)?)
    }

    pub fn contains(&self, t: u32) -> bool {
        t >= self.start && t < self.end
    }

    pub fn length(&self) -> u32 {
        self.end - self.start
    }
}

impl TryFrom<[String; 2]> for TimeWindow {
    type Error = ScheduleError;

    fn try_from(value: [String; 2]) -> Result<Self, Self::Error> {
        Self::parse(&value[0], &value[1])
    }
}

impl From<TimeWindow> for [String; 2] {
    fn from(w: TimeWindow) -> Self {
        [format_time(w.start), format_time(w.end)]
    }
}

impl Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", format_time(self.start), format_time(self.end))
    }
}

/// Service day, window and stop filter the derived tables were computed for.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleScope {
    pub day: ServiceDay,
    pub window: TimeWindow,
    /// `None` when stops outside the bounding box were kept.
    pub bbox: Option<BoundingBox>,
}

impl Display for ScheduleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.day, self.window)?;
        if let Some(b) = self.bbox {
            write!(f, " in [{}, {}, {}, {}]", b.min_lon, b.min_lat, b.max_lon, b.max_lat)?;
        }
        Ok(())
    }
}

// Records. Every record carries the feed it was loaded from; GTFS ids are only
// unique within a feed.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    pub feed: String,
    pub stop_id: String,
    pub name: Option<String>,
    pub lat_lng: LatLng,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub feed: String,
    pub route_id: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub unique_agency_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TripScheduleRecord {
    pub feed: String,
    pub trip_id: String,
    pub route_id: String,
    pub direction_id: Option<u8>,
    pub service_id: String,
    pub unique_agency_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopTimeRecord {
    pub feed: String,
    pub trip_id: String,
    pub stop_id: String,
    pub stop_sequence: u32,
    pub arrival_time: Option<u32>,
    pub departure_time: Option<u32>,
    pub is_interpolated: bool,
    /// Seconds from the previous stop's departure to this stop's arrival.
    pub time_from_previous: Option<u32>,
}

impl StopTimeRecord {
    pub fn is_complete(&self) -> bool {
        self.arrival_time.is_some() && self.departure_time.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRecord {
    pub feed: String,
    pub service_id: String,
    /// Monday is bit 0.
    pub days: u8,
    /// Days since 2000-01-01.
    pub start_date: u32,
    pub end_date: u32,
}

impl CalendarRecord {
    pub fn runs_on(&self, day: ServiceDay) -> bool {
        self.days & day.bit() != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDateRecord {
    pub feed: String,
    pub service_id: String,
    pub date: u32,
    pub added: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadwayRecord {
    pub feed: String,
    pub unique_agency_id: String,
    pub route_id: String,
    pub direction_id: Option<u8>,
    pub stop_id: String,
    pub window: TimeWindow,
    /// Number of gaps between consecutive arrivals.
    pub headway_count: usize,
    pub mean_headway_seconds: f64,
    pub std_headway_seconds: Option<f64>,
    pub min_headway_seconds: u32,
    pub max_headway_seconds: u32,
}

/// Normalized schedule tables handed from stage to stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTables {
    pub stops: Vec<StopRecord>,
    pub routes: Vec<RouteRecord>,
    pub trips: Vec<TripScheduleRecord>,
    pub stop_times: Vec<StopTimeRecord>,
    pub calendar: Vec<CalendarRecord>,
    pub calendar_dates: Vec<CalendarDateRecord>,
    /// Interpolated stop times of the trips selected for the service day.
    pub stop_times_int: Vec<StopTimeRecord>,
    pub headways: Vec<HeadwayRecord>,
    /// Set once `stop_times_int` and `headways` are derived.
    pub scope: Option<ScheduleScope>,
}

impl ScheduleTables {
    pub fn append(mut self, other: ScheduleTables) -> ScheduleTables {
        self.stops.extend(other.stops);
        self.routes.extend(other.routes);
        self.trips.extend(other.trips);
        self.stop_times.extend(other.stop_times);
        self.calendar.extend(other.calendar);
        self.calendar_dates.extend(other.calendar_dates);
        self.stop_times_int.extend(other.stop_times_int);
        self.headways.extend(other.headways);
        self
    }

    pub fn with_stop_times_int(self, stop_times_int: Vec<StopTimeRecord>) -> ScheduleTables {
        ScheduleTables {
            stop_times_int,
            ..self
        }
    }

    pub fn with_headways(self, headways: Vec<HeadwayRecord>) -> ScheduleTables {
        ScheduleTables { headways, ..self }
    }

    pub fn with_scope(self, scope: ScheduleScope) -> ScheduleTables {
        ScheduleTables {
            scope: Some(scope),
            ..self
        }
    }

    /// Whether the derived tables were computed for exactly `scope`.
    pub fn matches(&self, scope: &ScheduleScope) -> bool {
        self.scope.as_ref() == Some(scope)
    }
}
