//! Seam to the map SDK.
//!
//! The core never draws. It issues commands through [`MapView`] and keeps a
//! [`RenderRegistry`] tying each drawn marker and path to the entity it shows.

use std::collections::{BTreeSet, HashMap};

use geojson::Geometry;
use serde::Serialize;

use crate::converter::path_geometry;
use crate::geodesy::Bounds;
use crate::track_types::{TrailId, TrailPoint, WaypointId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MarkerHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerKind {
    CurrentPosition,
    Waypoint,
}

/// Identity of a drawn path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum PathKey {
    Recording,
    Trail(TrailId),
}

pub trait MapView {
    fn add_marker(&mut self, kind: MarkerKind, lat: f64, lon: f64) -> MarkerHandle;
    fn move_marker(&mut self, handle: MarkerHandle, lat: f64, lon: f64);
    fn remove_marker(&mut self, handle: MarkerHandle);
    fn set_path(&mut self, key: PathKey, points: &[TrailPoint]);
    fn remove_path(&mut self, key: PathKey);
    fn set_camera(&mut self, lat: f64, lon: f64, zoom: f64);
    fn set_bearing(&mut self, degrees: f64);
    fn fit_bounds(&mut self, bounds: Bounds);
}

/// Render handles owned on behalf of domain entities.
#[derive(Debug, Default)]
pub struct RenderRegistry {
    position_marker: Option<MarkerHandle>,
    waypoint_markers: HashMap<WaypointId, MarkerHandle>,
    paths: BTreeSet<PathKey>,
}

impl RenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the current-position marker, or move it if it exists.
    pub fn place_position_marker<V: MapView + ?Sized>(&mut self, view: &mut V, lat: f64, lon: f64) {
        match self.position_marker {
            Some(handle) => view.move_marker(handle, lat, lon),
            None => {
                self.position_marker = Some(view.add_marker(MarkerKind::CurrentPosition, lat, lon))
            }
        }
    }

    pub fn add_waypoint_marker<V: MapView + ?Sized>(
        &mut self,
        view: &mut V,
        id: WaypointId,
        lat: f64,
        lon: f64,
    ) {
        let handle = view.add_marker(MarkerKind::Waypoint, lat, lon);
        if let Some(stale) = self.waypoint_markers.insert(id, handle) {
            view.remove_marker(stale);
        }
    }

    pub fn remove_waypoint_marker<V: MapView + ?Sized>(&mut self, view: &mut V, id: WaypointId) {
        if let Some(handle) = self.waypoint_markers.remove(&id) {
            view.remove_marker(handle);
        }
    }

    pub fn draw_path<V: MapView + ?Sized>(&mut self, view: &mut V, key: PathKey, points: &[TrailPoint]) {
        view.set_path(key, points);
        self.paths.insert(key);
    }

    pub fn erase_path<V: MapView + ?Sized>(&mut self, view: &mut V, key: PathKey) {
        if self.paths.remove(&key) {
            view.remove_path(key);
        }
    }

    pub fn waypoint_marker(&self, id: WaypointId) -> Option<MarkerHandle> {
        self.waypoint_markers.get(&id).copied()
    }

    pub fn has_path(&self, key: PathKey) -> bool {
        self.paths.contains(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.position_marker.is_none() && self.waypoint_markers.is_empty() && self.paths.is_empty()
    }

    /// Remove everything this registry drew.
    pub fn clear<V: MapView + ?Sized>(&mut self, view: &mut V) {
        if let Some(handle) = self.position_marker.take() {
            view.remove_marker(handle);
        }
        for (_, handle) in self.waypoint_markers.drain() {
            view.remove_marker(handle);
        }
        for key in std::mem::take(&mut self.paths) {
            view.remove_path(key);
        }
    }
}

/// A drawing command for the JS side to forward to the map SDK.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderCommand {
    AddMarker {
        handle: MarkerHandle,
        kind: MarkerKind,
        lat: f64,
        lon: f64,
    },
    MoveMarker {
        handle: MarkerHandle,
        lat: f64,
        lon: f64,
    },
    RemoveMarker {
        handle: MarkerHandle,
    },
    SetPath {
        key: PathKey,
        geometry: Option<Geometry>,
    },
    RemovePath {
        key: PathKey,
    },
    SetCamera {
        lat: f64,
        lon: f64,
        zoom: f64,
    },
    SetBearing {
        degrees: f64,
    },
    FitBounds {
        bounds: Bounds,
    },
}

/// [`MapView`] that queues commands until drained.
#[derive(Debug, Default)]
pub struct CommandQueue {
    next_handle: u32,
    commands: Vec<RenderCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn drain(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl MapView for CommandQueue {
    fn add_marker(&mut self, kind: MarkerKind, lat: f64, lon: f64) -> MarkerHandle {
        self.next_handle += 1;
        let handle = MarkerHandle(self.next_handle);
        self.commands.push(RenderCommand::AddMarker {
            handle,
            kind,
            lat,
            lon,
        });
        handle
    }

    fn move_marker(&mut self, handle: MarkerHandle, lat: f64, lon: f64) {
        self.commands
            .push(RenderCommand::MoveMarker { handle, lat, lon });
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        self.commands.push(RenderCommand::RemoveMarker { handle });
    }

    fn set_path(&mut self, key: PathKey, points: &[TrailPoint]) {
        self.commands.push(RenderCommand::SetPath {
            key,
            geometry: path_geometry(points),
        });
    }

    fn remove_path(&mut self, key: PathKey) {
        self.commands.push(RenderCommand::RemovePath { key });
    }

    fn set_camera(&mut self, lat: f64, lon: f64, zoom: f64) {
        self.commands
            .push(RenderCommand::SetCamera { lat, lon, zoom });
    }

    fn set_bearing(&mut self, degrees: f64) {
        self.commands.push(RenderCommand::SetBearing { degrees });
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.commands.push(RenderCommand::FitBounds { bounds });
    }
}
