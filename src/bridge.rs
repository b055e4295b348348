//! Message protocol between the host and the embedded map surface
//!
//! The map surface is sandboxed and cannot be called synchronously: it
//! may not be initialized when the host first wants to talk to it, and
//! everything it says arrives as an opaque JSON string. This module
//! defines both halves of the wire vocabulary and the [`MapBridge`]
//! that gates sending on `MAP_READY`.
//!
//! Field names are part of the wire contract and are not uniform
//! across messages: host commands and `CENTER_RESPONSE` use `lat`/
//! `lng`, while `MAP_TAP` and `LOCATION_SET` use `latitude`/
//! `longitude`.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::Coordinate;

/// Zoom applied when a `SET_LOCATION` command omits one
pub const DEFAULT_ZOOM: u8 = 15;

fn default_zoom() -> u8 {
    DEFAULT_ZOOM
}

/// Commands sent host → map
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostCommand {
    /// Recenter the map and place the sole marker at (lat, lng)
    SetLocation {
        lat: f64,
        lng: f64,
        #[serde(default = "default_zoom")]
        zoom: u8,
    },
    /// Place the sole marker with a custom popup label.
    /// When `popup` is omitted the surface substitutes its own text.
    AddMarker {
        lat: f64,
        lng: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        popup: Option<String>,
    },
    /// Remove the marker if present
    ClearMarkers,
    /// Request the current view center and zoom
    GetCenter,
}

impl HostCommand {
    pub fn set_location(coordinate: Coordinate, zoom: u8) -> Self {
        Self::SetLocation {
            lat: coordinate.latitude,
            lng: coordinate.longitude,
            zoom,
        }
    }

    pub fn add_marker(coordinate: Coordinate, popup: Option<String>) -> Self {
        Self::AddMarker {
            lat: coordinate.latitude,
            lng: coordinate.longitude,
            popup,
        }
    }
}

/// Events sent map → host
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapEvent {
    /// The map finished initializing; sent exactly once per session
    MapReady,
    /// The user tapped the map; the surface has already placed a marker
    MapTap { latitude: f64, longitude: f64 },
    /// Acknowledges that a `SET_LOCATION` was applied
    LocationSet { latitude: f64, longitude: f64 },
    /// Reply to `GET_CENTER`
    CenterResponse { lat: f64, lng: f64, zoom: u8 },
}

/// Send/receive gate for the embedded map surface.
///
/// Outbound commands are serialized onto an unbounded FIFO queue, so
/// the relative order of `SET_LOCATION` commands is preserved in send
/// order. Commands issued before the surface reports `MAP_READY` are
/// dropped, never buffered and never blocked on.
pub struct MapBridge {
    outbound: mpsc::UnboundedSender<String>,
    ready: bool,
}

impl MapBridge {
    /// Create a bridge and the queue the host shell drains toward the
    /// map surface.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (
            Self {
                outbound,
                ready: false,
            },
            rx,
        )
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Queue a command for the surface. Returns `false` when the
    /// command was dropped because the surface is not ready (or its
    /// queue is gone).
    pub fn send(&self, command: &HostCommand) -> bool {
        if !self.ready {
            log::debug!("map surface not ready, dropping {command:?}");
            return false;
        }
        let json = match serde_json::to_string(command) {
            Ok(json) => json,
            Err(err) => {
                log::warn!("failed to serialize map command: {err}");
                return false;
            }
        };
        self.outbound.send(json).is_ok()
    }

    /// Parse a raw payload from the surface. Malformed JSON and
    /// unknown message types are protocol noise: logged and ignored.
    pub fn receive(&mut self, raw: &str) -> Option<MapEvent> {
        let event = match serde_json::from_str::<MapEvent>(raw) {
            Ok(event) => event,
            Err(err) => {
                log::warn!("ignoring malformed map message {raw:?}: {err}");
                return None;
            }
        };
        if event == MapEvent::MapReady {
            log::info!("map surface is ready");
            self.ready = true;
        }
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal model of the map surface's marker slot, mirroring how
    /// the surface applies placement commands.
    #[derive(Default)]
    struct SurfaceModel {
        marker: Option<(f64, f64)>,
    }

    impl SurfaceModel {
        fn apply(&mut self, command: &HostCommand) {
            match command {
                HostCommand::SetLocation { lat, lng, .. }
                | HostCommand::AddMarker { lat, lng, .. } => {
                    // Placement always replaces any existing marker
                    self.marker = Some((*lat, *lng));
                }
                HostCommand::ClearMarkers => self.marker = None,
                HostCommand::GetCenter => {}
            }
        }

        fn marker_count(&self) -> usize {
            usize::from(self.marker.is_some())
        }
    }

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn set_location_wire_format() {
        let cmd = HostCommand::set_location(coord(37.7749, -122.4194), 16);
        assert_eq!(
            serde_json::to_string(&cmd).unwrap(),
            r#"{"type":"SET_LOCATION","lat":37.7749,"lng":-122.4194,"zoom":16}"#
        );
    }

    #[test]
    fn set_location_zoom_defaults_to_15() {
        let cmd: HostCommand =
            serde_json::from_str(r#"{"type":"SET_LOCATION","lat":1.0,"lng":2.0}"#).unwrap();
        assert_eq!(
            cmd,
            HostCommand::SetLocation {
                lat: 1.0,
                lng: 2.0,
                zoom: DEFAULT_ZOOM
            }
        );
    }

    #[test]
    fn add_marker_omits_absent_popup() {
        let cmd = HostCommand::add_marker(coord(1.0, 2.0), None);
        assert_eq!(
            serde_json::to_string(&cmd).unwrap(),
            r#"{"type":"ADD_MARKER","lat":1.0,"lng":2.0}"#
        );
        let cmd = HostCommand::add_marker(coord(1.0, 2.0), Some("Here".into()));
        assert_eq!(
            serde_json::to_string(&cmd).unwrap(),
            r#"{"type":"ADD_MARKER","lat":1.0,"lng":2.0,"popup":"Here"}"#
        );
    }

    #[test]
    fn bare_commands_serialize_to_type_only() {
        assert_eq!(
            serde_json::to_string(&HostCommand::ClearMarkers).unwrap(),
            r#"{"type":"CLEAR_MARKERS"}"#
        );
        assert_eq!(
            serde_json::to_string(&HostCommand::GetCenter).unwrap(),
            r#"{"type":"GET_CENTER"}"#
        );
    }

    #[test]
    fn map_events_parse_with_their_own_field_names() {
        let mut bridge = MapBridge::new().0;
        assert_eq!(
            bridge.receive(r#"{"type":"MAP_READY"}"#),
            Some(MapEvent::MapReady)
        );
        assert_eq!(
            bridge.receive(r#"{"type":"MAP_TAP","latitude":48.85,"longitude":2.35}"#),
            Some(MapEvent::MapTap {
                latitude: 48.85,
                longitude: 2.35
            })
        );
        assert_eq!(
            bridge.receive(r#"{"type":"LOCATION_SET","latitude":1.0,"longitude":2.0}"#),
            Some(MapEvent::LocationSet {
                latitude: 1.0,
                longitude: 2.0
            })
        );
        assert_eq!(
            bridge.receive(r#"{"type":"CENTER_RESPONSE","lat":10.0,"lng":20.0,"zoom":13}"#),
            Some(MapEvent::CenterResponse {
                lat: 10.0,
                lng: 20.0,
                zoom: 13
            })
        );
    }

    #[test]
    fn malformed_and_unknown_messages_are_ignored() {
        let mut bridge = MapBridge::new().0;
        assert_eq!(bridge.receive("not json"), None);
        assert_eq!(bridge.receive(r#"{"type":"TELEPORT","lat":0}"#), None);
        assert_eq!(bridge.receive(r#"{"latitude":1.0}"#), None);
        assert!(!bridge.is_ready());
    }

    #[test]
    fn commands_before_map_ready_are_dropped() {
        let (mut bridge, mut rx) = MapBridge::new();
        assert!(!bridge.send(&HostCommand::GetCenter));
        assert!(rx.try_recv().is_err());

        bridge.receive(r#"{"type":"MAP_READY"}"#);
        assert!(bridge.is_ready());
        assert!(bridge.send(&HostCommand::GetCenter));
        assert_eq!(rx.try_recv().unwrap(), r#"{"type":"GET_CENTER"}"#);
    }

    #[test]
    fn set_location_order_is_preserved() {
        let (mut bridge, mut rx) = MapBridge::new();
        bridge.receive(r#"{"type":"MAP_READY"}"#);
        bridge.send(&HostCommand::set_location(coord(1.0, 1.0), DEFAULT_ZOOM));
        bridge.send(&HostCommand::set_location(coord(2.0, 2.0), DEFAULT_ZOOM));

        let first: HostCommand = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        let second: HostCommand = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert!(matches!(first, HostCommand::SetLocation { lat, .. } if lat == 1.0));
        assert!(matches!(second, HostCommand::SetLocation { lat, .. } if lat == 2.0));
    }

    #[test]
    fn placement_commands_leave_at_most_one_marker() {
        let mut surface = SurfaceModel::default();
        surface.apply(&HostCommand::set_location(coord(1.0, 1.0), 15));
        assert_eq!(surface.marker_count(), 1);
        surface.apply(&HostCommand::add_marker(coord(2.0, 2.0), None));
        assert_eq!(surface.marker_count(), 1);
        surface.apply(&HostCommand::set_location(coord(3.0, 3.0), 15));
        assert_eq!(surface.marker_count(), 1);
        assert_eq!(surface.marker, Some((3.0, 3.0)));
        surface.apply(&HostCommand::ClearMarkers);
        assert_eq!(surface.marker_count(), 0);
        surface.apply(&HostCommand::ClearMarkers);
        assert_eq!(surface.marker_count(), 0);
    }
}
