//! Live position loop: feeds fixes into the session and mirrors session
//! changes onto the map.

use crate::error::HikeError;
use crate::export::ExportFile;
use crate::geodesy::bounds;
use crate::options::TrackerOptions;
use crate::position::{PositionEvent, PositionSink, PositionSource, Subscription};
use crate::render::{MapView, PathKey, RenderRegistry};
use crate::session::{Session, StopOutcome};
use crate::track_types::*;

type Result<T> = std::result::Result<T, HikeError>;

pub struct Tracker<V: MapView> {
    session: Session,
    view: V,
    registry: RenderRegistry,
    options: TrackerOptions,
    subscription: Option<Subscription>,
}

impl<V: MapView> Tracker<V> {
    pub fn new(session: Session, view: V, options: TrackerOptions) -> Self {
        Self {
            session,
            view,
            registry: RenderRegistry::new(),
            options,
            subscription: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn registry(&self) -> &RenderRegistry {
        &self.registry
    }

    // ---- position stream ----

    pub fn is_tracking(&self) -> bool {
        self.subscription.is_some()
    }

    /// Subscribe to `source`. Events must be fed back through
    /// [`Tracker::handle_event`] by `sink`. No-op while already tracking.
    pub fn start_tracking<S: PositionSource + ?Sized>(&mut self, source: &S, sink: PositionSink) -> Result<()> {
        if self.is_tracking() {
            return Ok(());
        }
        let subscription = source.watch(&self.options.geolocation, sink)?;
        self.subscription = Some(subscription);
        log::info!("tracking started");
        Ok(())
    }

    pub fn stop_tracking(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
            log::info!("tracking stopped");
        }
    }

    /// Apply one event from the position source.
    ///
    /// An error ends tracking and is returned for the caller to surface. A
    /// recording in progress stays open until stopped explicitly.
    pub fn handle_event(&mut self, event: PositionEvent) -> Result<()> {
        match event {
            PositionEvent::Fix(position) => {
                self.handle_position(position);
                Ok(())
            }
            PositionEvent::Error(message) => {
                log::warn!("position source failed: {message}");
                self.stop_tracking();
                Err(HikeError::PositionSource(message))
            }
        }
    }

    pub fn handle_position(&mut self, position: Position) {
        if let Some(last) = self.session.current_position() {
            if position.timestamp < last.timestamp {
                log::debug!("ignoring out-of-order fix at {}", position.timestamp);
                return;
            }
        }

        self.session.set_current_position(position);
        self.session.record_point(&position);

        self.registry
            .place_position_marker(&mut self.view, position.lat, position.lon);
        self.view
            .set_camera(position.lat, position.lon, self.options.follow_zoom);
        if self.options.track_up {
            if let Some(heading) = position.heading {
                self.view.set_bearing(heading);
            }
        }
        if self.session.is_recording() {
            self.registry.draw_path(
                &mut self.view,
                PathKey::Recording,
                self.session.recording_points(),
            );
        }
    }

    pub fn set_track_up(&mut self, enabled: bool) {
        self.options.track_up = enabled;
        if !enabled {
            self.view.set_bearing(0.0);
        }
    }

    // ---- waypoints ----

    pub fn add_waypoint(&mut self) -> Result<Waypoint> {
        let waypoint = self.session.add_waypoint()?.clone();
        self.registry
            .add_waypoint_marker(&mut self.view, waypoint.id, waypoint.lat, waypoint.lon);
        Ok(waypoint)
    }

    pub fn delete_waypoint(&mut self, id: WaypointId) -> Option<Waypoint> {
        let removed = self.session.delete_waypoint(id)?;
        self.registry.remove_waypoint_marker(&mut self.view, id);
        Some(removed)
    }

    pub fn select_waypoint(&mut self, id: WaypointId) -> bool {
        if !self.session.select_waypoint(id) {
            return false;
        }
        if let Some(wpt) = self.session.selected_waypoint() {
            self.view
                .set_camera(wpt.lat, wpt.lon, self.options.follow_zoom);
        }
        true
    }

    // ---- recording ----

    pub fn start_recording(&mut self) -> Result<()> {
        self.session.start_recording()?;
        self.registry.draw_path(
            &mut self.view,
            PathKey::Recording,
            self.session.recording_points(),
        );
        Ok(())
    }

    pub fn stop_recording(&mut self) -> StopOutcome {
        let outcome = self.session.stop_recording();
        self.registry.erase_path(&mut self.view, PathKey::Recording);
        if let StopOutcome::Saved { id } = outcome {
            if let Some(trail) = self.session.trail(TrailProvenance::Recorded, id) {
                self.registry
                    .draw_path(&mut self.view, PathKey::Trail(id), &trail.points);
            }
        }
        outcome
    }

    // ---- trails ----

    pub fn import_trail(&mut self, content: &str, file_name: &str, format: TrackFormat) -> Result<Trail> {
        let trail = self
            .session
            .import_trail(content, file_name, format)?
            .clone();
        self.show_trail(&trail);
        Ok(trail)
    }

    /// Import a file after checking its extension.
    pub fn import_file(&mut self, content: &str, file_name: &str) -> Result<Trail> {
        let trail = self.session.import_file(content, file_name)?.clone();
        self.show_trail(&trail);
        Ok(trail)
    }

    fn show_trail(&mut self, trail: &Trail) {
        self.registry
            .draw_path(&mut self.view, PathKey::Trail(trail.id), &trail.points);
        if let Some(b) = bounds(&trail.points) {
            self.view.fit_bounds(b);
        }
    }

    pub fn select_trail(&mut self, provenance: TrailProvenance, id: TrailId) -> bool {
        if !self.session.select_trail(provenance, id) {
            return false;
        }
        if let Some(trail) = self.session.trail(provenance, id) {
            self.registry
                .draw_path(&mut self.view, PathKey::Trail(id), &trail.points);
            if let Some(b) = bounds(&trail.points) {
                self.view.fit_bounds(b);
            }
        }
        true
    }

    pub fn delete_trail(&mut self, provenance: TrailProvenance, id: TrailId) -> Option<Trail> {
        let removed = self.session.delete_trail(provenance, id)?;
        self.registry.erase_path(&mut self.view, PathKey::Trail(id));
        Some(removed)
    }

    pub fn clear_selection(&mut self) {
        self.session.clear_selection();
    }

    // ---- export ----

    pub fn export_waypoints(&self) -> Result<ExportFile> {
        self.session.export_waypoints()
    }

    pub fn export_trail(&self, provenance: TrailProvenance, id: TrailId) -> Result<ExportFile> {
        self.session.export_trail(provenance, id)
    }

    /// Cancel the position watch and remove everything drawn on the map.
    pub fn teardown(&mut self) {
        self.stop_tracking();
        self.registry.clear(&mut self.view);
    }
}
