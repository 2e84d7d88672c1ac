//! In-memory hiking session: waypoints, trails, selection and recording.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::HikeError;
use crate::export::{self, ExportFile};
use crate::geodesy::track_distance;
use crate::parser::parse_trail_at;
use crate::track_types::*;

type Result<T> = std::result::Result<T, HikeError>;

/// Source of wall-clock time. Replaceable so tests are deterministic.
pub type Clock = fn() -> DateTime<Utc>;

/// Result of stopping a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum StopOutcome {
    NotRecording,
    /// Fewer than two points; the buffer was discarded.
    TooShort { points: usize },
    Saved { id: TrailId },
}

#[derive(Debug, Clone, Default)]
enum RecordingState {
    #[default]
    Idle,
    Recording(Vec<TrailPoint>),
}

/// Issues millisecond-timestamp ids that never repeat within a session.
#[derive(Debug, Clone, Default)]
struct IdAllocator {
    last: u64,
}

impl IdAllocator {
    fn next(&mut self, now: DateTime<Utc>) -> u64 {
        let candidate = now.timestamp_millis().max(0) as u64;
        self.last = candidate.max(self.last + 1);
        self.last
    }
}

#[derive(Debug)]
pub struct Session {
    waypoints: Vec<Waypoint>,
    recorded: Vec<Trail>,
    imported: Vec<Trail>,
    current_position: Option<Position>,
    recording: RecordingState,
    selected_waypoint: Option<WaypointId>,
    selected_trail: Option<(TrailProvenance, TrailId)>,
    ids: IdAllocator,
    clock: Clock,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            waypoints: Vec::new(),
            recorded: Vec::new(),
            imported: Vec::new(),
            current_position: None,
            recording: RecordingState::Idle,
            selected_waypoint: None,
            selected_trail: None,
            ids: IdAllocator::default(),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    // ---- position ----

    pub fn current_position(&self) -> Option<&Position> {
        self.current_position.as_ref()
    }

    pub fn set_current_position(&mut self, position: Position) {
        self.current_position = Some(position);
    }

    // ---- waypoints ----

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn waypoint(&self, id: WaypointId) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| w.id == id)
    }

    /// Drop a waypoint at the current position, named by sequence number.
    pub fn add_waypoint(&mut self) -> Result<&Waypoint> {
        let pos = self.current_position.ok_or(HikeError::LocationUnavailable)?;
        let now = self.now();
        let waypoint = Waypoint {
            id: WaypointId(self.ids.next(now)),
            name: format!("Waypoint {}", self.waypoints.len() + 1),
            lat: pos.lat,
            lon: pos.lon,
            created_at: now,
        };
        log::info!("added {} at {:.5},{:.5}", waypoint.name, pos.lat, pos.lon);
        self.waypoints.push(waypoint);
        Ok(&self.waypoints[self.waypoints.len() - 1])
    }

    pub fn delete_waypoint(&mut self, id: WaypointId) -> Option<Waypoint> {
        let index = self.waypoints.iter().position(|w| w.id == id)?;
        if self.selected_waypoint == Some(id) {
            self.selected_waypoint = None;
        }
        Some(self.waypoints.remove(index))
    }

    pub fn selected_waypoint(&self) -> Option<&Waypoint> {
        self.selected_waypoint.and_then(|id| self.waypoint(id))
    }

    /// Select a waypoint. Unknown ids leave the current selection alone.
    pub fn select_waypoint(&mut self, id: WaypointId) -> bool {
        if self.waypoint(id).is_none() {
            return false;
        }
        self.selected_waypoint = Some(id);
        true
    }

    // ---- trails ----

    fn collection(&self, provenance: TrailProvenance) -> &Vec<Trail> {
        match provenance {
            TrailProvenance::Recorded => &self.recorded,
            TrailProvenance::Imported => &self.imported,
        }
    }

    fn collection_mut(&mut self, provenance: TrailProvenance) -> &mut Vec<Trail> {
        match provenance {
            TrailProvenance::Recorded => &mut self.recorded,
            TrailProvenance::Imported => &mut self.imported,
        }
    }

    pub fn trails(&self, provenance: TrailProvenance) -> &[Trail] {
        self.collection(provenance)
    }

    /// Recorded trails followed by imported ones.
    pub fn all_trails(&self) -> impl Iterator<Item = &Trail> {
        self.recorded.iter().chain(self.imported.iter())
    }

    pub fn trail(&self, provenance: TrailProvenance, id: TrailId) -> Option<&Trail> {
        self.collection(provenance).iter().find(|t| t.id == id)
    }

    pub fn selected_trail(&self) -> Option<&Trail> {
        self.selected_trail
            .and_then(|(provenance, id)| self.trail(provenance, id))
    }

    /// Select a trail. Unknown ids leave the current selection alone.
    pub fn select_trail(&mut self, provenance: TrailProvenance, id: TrailId) -> bool {
        if self.trail(provenance, id).is_none() {
            return false;
        }
        self.selected_trail = Some((provenance, id));
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected_waypoint = None;
        self.selected_trail = None;
    }

    pub fn delete_trail(&mut self, provenance: TrailProvenance, id: TrailId) -> Option<Trail> {
        let trails = self.collection_mut(provenance);
        let index = trails.iter().position(|t| t.id == id)?;
        let removed = trails.remove(index);
        if self.selected_trail == Some((provenance, id)) {
            self.selected_trail = None;
        }
        Some(removed)
    }

    /// Parse a track file and add it to the imported trails.
    pub fn import_trail(
        &mut self,
        content: &str,
        file_name: &str,
        format: TrackFormat,
    ) -> Result<&Trail> {
        let now = self.now();
        let mut trail = parse_trail_at(content, file_name, format, now).inspect_err(|e| {
            log::warn!("failed to import '{file_name}': {e}");
        })?;
        trail.id = TrailId(self.ids.next(now));
        log::info!(
            "imported '{}' with {} points",
            trail.name,
            trail.points.len()
        );
        self.imported.push(trail);
        Ok(&self.imported[self.imported.len() - 1])
    }

    /// Import a file, choosing the format from its extension.
    pub fn import_file(&mut self, content: &str, file_name: &str) -> Result<&Trail> {
        let format =
            TrackFormat::from_file_name(file_name).ok_or_else(|| HikeError::UnsupportedFileType {
                file_name: file_name.to_string(),
            })?;
        self.import_trail(content, file_name, format)
    }

    // ---- recording ----

    pub fn is_recording(&self) -> bool {
        matches!(self.recording, RecordingState::Recording(_))
    }

    /// Points of the in-progress recording, empty when idle.
    pub fn recording_points(&self) -> &[TrailPoint] {
        match &self.recording {
            RecordingState::Recording(points) => points,
            RecordingState::Idle => &[],
        }
    }

    pub fn start_recording(&mut self) -> Result<()> {
        if self.is_recording() {
            return Err(HikeError::AlreadyRecording);
        }
        let pos = self.current_position.ok_or(HikeError::LocationUnavailable)?;
        self.recording = RecordingState::Recording(vec![TrailPoint::from(&pos)]);
        log::info!("recording started");
        Ok(())
    }

    pub fn record_point(&mut self, position: &Position) {
        if let RecordingState::Recording(points) = &mut self.recording {
            points.push(TrailPoint::from(position));
        }
    }

    pub fn stop_recording(&mut self) -> StopOutcome {
        let points = match std::mem::take(&mut self.recording) {
            RecordingState::Idle => return StopOutcome::NotRecording,
            RecordingState::Recording(points) => points,
        };
        if points.len() < 2 {
            log::info!("recording discarded with {} point(s)", points.len());
            return StopOutcome::TooShort {
                points: points.len(),
            };
        }

        let now = self.now();
        let id = TrailId(self.ids.next(now));
        let trail = Trail {
            id,
            name: format!("Trail {}", self.recorded.len() + 1),
            provenance: TrailProvenance::Recorded,
            start_time: points[0].timestamp,
            end_time: Some(now),
            distance: Some(track_distance(&points)),
            points,
        };
        log::info!(
            "saved {} with {} points ({:.0} m)",
            trail.name,
            trail.points.len(),
            trail.distance.unwrap_or_default()
        );
        self.recorded.push(trail);
        StopOutcome::Saved { id }
    }

    // ---- export ----

    pub fn export_waypoints(&self) -> Result<ExportFile> {
        if self.waypoints.is_empty() {
            return Err(HikeError::NothingToExport);
        }
        Ok(export::export_waypoints(&self.waypoints, self.now()))
    }

    pub fn export_trail(&self, provenance: TrailProvenance, id: TrailId) -> Result<ExportFile> {
        let trail = self
            .trail(provenance, id)
            .ok_or(HikeError::NothingToExport)?;
        Ok(export::export_trail(trail))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn session() -> Session {
        Session::with_clock(fixed_now)
    }

    fn fix(lat: f64, lon: f64, sec: u32) -> Position {
        Position::new(lat, lon, Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, sec).unwrap())
    }

    const GPX: &str = r#"<gpx><trk><trkseg>
  <trkpt lat="46.5" lon="7.9"/>
  <trkpt lat="46.6" lon="8.0"/>
</trkseg></trk></gpx>"#;

    #[test]
    fn test_add_waypoint_requires_position() {
        let mut s = session();
        assert!(matches!(
            s.add_waypoint(),
            Err(HikeError::LocationUnavailable)
        ));
        assert!(s.waypoints().is_empty());
    }

    #[test]
    fn test_waypoints_named_in_sequence() {
        let mut s = session();
        s.set_current_position(fix(46.5, 7.9, 0));
        for _ in 0..3 {
            s.add_waypoint().unwrap();
        }
        let names: Vec<&str> = s.waypoints().iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Waypoint 1", "Waypoint 2", "Waypoint 3"]);

        let ids: Vec<u64> = s.waypoints().iter().map(|w| w.id.0).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(s.waypoints().iter().all(|w| w.created_at == fixed_now()));
    }

    #[test]
    fn test_delete_selected_waypoint_clears_selection() {
        let mut s = session();
        s.set_current_position(fix(46.5, 7.9, 0));
        let a = s.add_waypoint().unwrap().id;
        let b = s.add_waypoint().unwrap().id;

        assert!(s.select_waypoint(a));
        s.delete_waypoint(b).unwrap();
        assert_eq!(s.selected_waypoint().map(|w| w.id), Some(a));

        s.delete_waypoint(a).unwrap();
        assert!(s.selected_waypoint().is_none());
        assert!(s.delete_waypoint(a).is_none());
    }

    #[test]
    fn test_select_unknown_keeps_selection() {
        let mut s = session();
        s.set_current_position(fix(46.5, 7.9, 0));
        let a = s.add_waypoint().unwrap().id;
        s.select_waypoint(a);
        assert!(!s.select_waypoint(WaypointId(999)));
        assert_eq!(s.selected_waypoint().map(|w| w.id), Some(a));

        let trail_id = s.import_trail(GPX, "x.gpx", TrackFormat::Gpx).unwrap().id;
        assert!(s.select_trail(TrailProvenance::Imported, trail_id));
        assert!(!s.select_trail(TrailProvenance::Recorded, trail_id));
        assert_eq!(s.selected_trail().map(|t| t.id), Some(trail_id));
    }

    #[test]
    fn test_start_recording_requires_position() {
        let mut s = session();
        assert!(matches!(
            s.start_recording(),
            Err(HikeError::LocationUnavailable)
        ));
        assert!(!s.is_recording());
        assert!(s.recording_points().is_empty());
    }

    #[test]
    fn test_record_point_ignored_when_idle() {
        let mut s = session();
        s.record_point(&fix(46.5, 7.9, 0));
        assert!(s.recording_points().is_empty());
    }

    #[test]
    fn test_stop_with_one_point_is_too_short() {
        let mut s = session();
        s.set_current_position(fix(46.5, 7.9, 0));
        s.start_recording().unwrap();
        assert_eq!(s.stop_recording(), StopOutcome::TooShort { points: 1 });
        assert!(s.trails(TrailProvenance::Recorded).is_empty());
        assert!(!s.is_recording());
        assert_eq!(s.stop_recording(), StopOutcome::NotRecording);
    }

    #[test]
    fn test_recording_lifecycle() {
        let mut s = session();
        s.set_current_position(fix(46.50, 7.90, 0));
        s.start_recording().unwrap();
        assert!(matches!(
            s.start_recording(),
            Err(HikeError::AlreadyRecording)
        ));
        s.record_point(&fix(46.51, 7.91, 10));
        s.record_point(&fix(46.52, 7.92, 20));

        let StopOutcome::Saved { id } = s.stop_recording() else {
            panic!("expected a saved trail");
        };
        let trail = s.trail(TrailProvenance::Recorded, id).unwrap();
        assert_eq!(trail.name, "Trail 1");
        assert_eq!(trail.points.len(), 3);
        assert_eq!(trail.start_time, fix(0.0, 0.0, 0).timestamp);
        assert_eq!(trail.end_time, Some(fixed_now()));
        assert!((trail.distance.unwrap() - track_distance(&trail.points)).abs() < 1e-9);
        assert!(s.recording_points().is_empty());
    }

    #[test]
    fn test_import_and_delete_trail() {
        let mut s = session();
        let id = s.import_trail(GPX, "Lake.gpx", TrackFormat::Gpx).unwrap().id;
        assert_eq!(s.trails(TrailProvenance::Imported).len(), 1);
        s.select_trail(TrailProvenance::Imported, id);

        assert!(s.delete_trail(TrailProvenance::Recorded, id).is_none());
        assert!(s.selected_trail().is_some());

        let removed = s.delete_trail(TrailProvenance::Imported, id).unwrap();
        assert_eq!(removed.name, "Lake");
        assert!(s.selected_trail().is_none());
    }

    #[test]
    fn test_failed_import_inserts_nothing() {
        let mut s = session();
        let err = s
            .import_trail("<gpx><trk>", "bad.gpx", TrackFormat::Gpx)
            .unwrap_err();
        assert!(matches!(err, HikeError::Parse(_)));
        assert!(s.trails(TrailProvenance::Imported).is_empty());
    }

    #[test]
    fn test_import_file_checks_extension() {
        let mut s = session();
        assert!(matches!(
            s.import_file(GPX, "track.txt"),
            Err(HikeError::UnsupportedFileType { .. })
        ));
        assert!(s.import_file(GPX, "TRACK.GPX").is_ok());
    }

    #[test]
    fn test_export_requires_content() {
        let mut s = session();
        assert!(matches!(
            s.export_waypoints(),
            Err(HikeError::NothingToExport)
        ));
        assert!(matches!(
            s.export_trail(TrailProvenance::Recorded, TrailId(1)),
            Err(HikeError::NothingToExport)
        ));

        s.set_current_position(fix(46.5, 7.9, 0));
        s.add_waypoint().unwrap();
        let file = s.export_waypoints().unwrap();
        assert_eq!(file.file_name, "waypoints-2024-05-01.gpx");
        assert!(file.contents.contains("<name>Waypoint 1</name>"));
    }
}
