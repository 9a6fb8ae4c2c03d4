use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use crate::{
    ingestion::{
        IngestionError,
        cache::{resolve_feed, resolve_path},
        gtfs::{GtfsLoadReport, load_gtfs},
        osm::load_pbf_file,
        points::load_points,
    },
    network::{MergedNetwork, TransitReport, create_transit_network, integrate},
    routing::{
        Accessibility, AccessibilityError, MonotonicityViolation, NodeAttribute,
        monotonicity_violations, sweep,
    },
    schedule::{
        InterpolationReport, ScheduleError, ScheduleTables, compute_headways,
        interpolate_stop_times, select_trips, time_difference,
    },
    services::{
        StageGate,
        persistence::{PersistenceError, load_tables, save_tables},
    },
    structures::{Config, GraphError},
};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    ConfigError(String),
    #[error(transparent)]
    IngestionError(#[from] IngestionError),
    #[error(transparent)]
    ScheduleError(#[from] ScheduleError),
    #[error(transparent)]
    GraphError(#[from] GraphError),
    #[error(transparent)]
    AccessibilityError(#[from] AccessibilityError),
    #[error(transparent)]
    PersistenceError(#[from] PersistenceError),
    #[error("stopped before stage '{0}'")]
    StoppedError(String),
}

#[derive(Debug, Default)]
pub struct ScheduleReport {
    pub feeds: Vec<(String, GtfsLoadReport)>,
    pub trips_without_calendar: usize,
    pub interpolation: InterpolationReport,
    pub headways: usize,
}

#[derive(Debug, Default)]
pub struct PipelineReport {
    pub schedule: Option<ScheduleReport>,
    pub transit: TransitReport,
    pub isolated_stops: usize,
    pub points_skipped: usize,
    pub results: Vec<Accessibility>,
    pub violations: Vec<MonotonicityViolation>,
}

fn log_elapsed(stage: &str, before: SystemTime) {
    if let Ok(elapsed) = before.elapsed() {
        tracing::info!("{stage} done in {}ms", elapsed.as_millis());
    }
}

fn gate_stage(gate: &mut dyn StageGate, stage: &str) -> Result<(), PipelineError> {
    if gate.proceed(stage) {
        tracing::info!("starting {stage}");
        Ok(())
    } else {
        Err(PipelineError::StoppedError(stage.to_string()))
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Local path of every configured feed, downloading remote ones into the data
/// directory.
pub fn acquire_feeds(config: &Config) -> Result<Vec<(String, PathBuf)>, PipelineError> {
    let data_dir = Path::new(&config.acquisition.data_dir);
    let mut paths = Vec::with_capacity(config.acquisition.feeds.len());
    for name in &config.acquisition.feeds {
        let before = SystemTime::now();
        let location = resolve_feed(&config.feeds, name)?;
        let dest = data_dir.join(format!("{name}.zip"));
        let path = resolve_path(location, &dest, &config.acquisition.retry)?;
        log_elapsed(&format!("acquiring feed '{name}'"), before);
        paths.push((name.clone(), path));
    }
    Ok(paths)
}

/// Loads every feed, selects the service day's trips, interpolates their stop
/// times and computes headways, then saves the archive.
pub fn process_schedule(
    config: &Config,
    gate: &mut dyn StageGate,
) -> Result<(ScheduleTables, ScheduleReport), PipelineError> {
    let schedule = &config.schedule;
    let mut report = ScheduleReport::default();

    gate_stage(gate, "feed acquisition")?;
    let feeds = acquire_feeds(config)?;

    gate_stage(gate, "GTFS loading")?;
    let before = SystemTime::now();
    let bbox = schedule
        .remove_stops_outside_bbox
        .then_some(&schedule.bbox);
    let mut tables = ScheduleTables::default();
    for (name, path) in feeds {
        let (feed_tables, feed_report) = load_gtfs(&path_str(&path), &name, bbox)?;
        tables = tables.append(feed_tables);
        report.feeds.push((name, feed_report));
    }
    log_elapsed("GTFS loading", before);

    gate_stage(gate, "interpolation")?;
    let before = SystemTime::now();
    let selection = select_trips(&tables.trips, &tables.calendar, schedule.day);
    report.trips_without_calendar = selection.without_calendar;
    let (stop_times_int, interpolation) =
        interpolate_stop_times(&tables.stop_times, &selection.trips);
    report.interpolation = interpolation;
    let tables = tables.with_stop_times_int(time_difference(stop_times_int));
    log_elapsed("interpolation", before);

    gate_stage(gate, "headways")?;
    let before = SystemTime::now();
    let headways = compute_headways(&tables.stop_times_int, &selection.trips, schedule.timerange)?;
    report.headways = headways.len();
    let tables = tables.with_headways(headways).with_scope(schedule.scope());
    log_elapsed("headways", before);

    gate_stage(gate, "archive")?;
    save_tables(
        &tables,
        Path::new(&config.acquisition.data_dir),
        &schedule.archive,
    )?;

    Ok((tables, report))
}

/// Restores the archive when it exists and was built for the configured day,
/// window and stop filter. Processes the feeds otherwise, replacing a stale
/// archive.
pub fn load_or_process_schedule(
    config: &Config,
    gate: &mut dyn StageGate,
) -> Result<(ScheduleTables, Option<ScheduleReport>), PipelineError> {
    let data_dir = Path::new(&config.acquisition.data_dir);
    let archive = &config.schedule.archive;
    if data_dir.join(archive).exists() {
        let tables = load_tables(data_dir, archive)?;
        let scope = config.schedule.scope();
        if tables.matches(&scope) {
            return Ok((tables, None));
        }
        match tables.scope {
            Some(found) => tracing::warn!(
                "archive {archive} was built for {found}, not {scope}; reprocessing"
            ),
            None => tracing::warn!("archive {archive} has no recorded scope; reprocessing"),
        }
    }
    let (tables, report) = process_schedule(config, gate)?;
    Ok((tables, Some(report)))
}

/// Builds the transit and pedestrian networks and merges them.
pub fn build_network(
    config: &Config,
    tables: &ScheduleTables,
    gate: &mut dyn StageGate,
) -> Result<(MergedNetwork, TransitReport), PipelineError> {
    gate_stage(gate, "transit network")?;
    let before = SystemTime::now();
    let (transit, transit_report) = create_transit_network(tables, config.schedule.timerange)?;
    log_elapsed("transit network", before);

    gate_stage(gate, "pedestrian network")?;
    let before = SystemTime::now();
    let location = config.network.location().map_err(PipelineError::ConfigError)?;
    let dest = Path::new(&config.acquisition.data_dir).join("network.osm.pbf");
    let pbf = resolve_path(location, &dest, &config.acquisition.retry)?;
    let pedestrian = load_pbf_file(
        &path_str(&pbf),
        &config.schedule.bbox,
        config.network.walk_speed_mph,
    )?;
    log_elapsed("pedestrian network", before);

    gate_stage(gate, "integration")?;
    let before = SystemTime::now();
    let merged = integrate(transit, pedestrian, config.network.snap_distance_m)?;
    log_elapsed("integration", before);

    Ok((merged, transit_report))
}

/// Full pipeline: schedule, networks, then the accessibility sweep.
pub fn run(config: &Config, gate: &mut dyn StageGate) -> Result<PipelineReport, PipelineError> {
    let (tables, schedule) = load_or_process_schedule(config, gate)?;
    let (network, transit) = build_network(config, &tables, gate)?;

    gate_stage(gate, "accessibility")?;
    let access = &config.accessibility;
    let before = SystemTime::now();
    let points = load_points(&access.points, &access.geometry_column, &access.attribute)?;
    let attribute = NodeAttribute::from_points(&access.attribute, &network, &points.points)?;
    let results = sweep(&network, &attribute, &access.radii, access.decay)?;
    log_elapsed("accessibility", before);

    let violations = monotonicity_violations(&results);
    if !violations.is_empty() {
        tracing::warn!(
            "{} nodes lose accessibility as the radius grows",
            violations.len()
        );
    }

    Ok(PipelineReport {
        schedule,
        transit,
        isolated_stops: network.isolated().len(),
        points_skipped: points.skipped_geometry + points.skipped_value,
        results,
        violations,
    })
}
