//! Geotagging session
//!
//! Wires the external collaborators together: map events and sensor
//! fixes feed the resolver, a save action resolves exactly one
//! coordinate and hands it to the pipeline, and the pipeline's
//! terminal outcome comes back as a [`SaveReport`] for the shell.
//! One session, one candidate state; tests instantiate as many
//! independent sessions as they like.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::bridge::{HostCommand, MapBridge, MapEvent};
use crate::domain::{Choice, Coordinate, ImageReference};
use crate::location::{LocationError, LocationProvider};
use crate::pipeline::{GeotagPipeline, PipelineError, SaveReport};
use crate::resolver::{ResolutionOutcome, ResolutionState};

/// Zoom used when recentering the map on a fresh sensor fix
pub const SENSOR_ZOOM: u8 = 16;

/// What the shell should do next after a save request
#[derive(Debug)]
pub enum SaveFlow {
    /// No image picked yet; prompt the user to pick one
    NoImage,
    /// No candidate coordinates; prompt the user to act first
    NeedsLocation,
    /// Both candidates live; present both and call
    /// [`Session::save_with`] with the user's pick (or nothing, to
    /// cancel — candidates stay intact)
    NeedsChoice { sensor: Coordinate, map: Coordinate },
    /// The pipeline ran; render the report
    Done(SaveReport),
}

pub struct Session {
    resolver: ResolutionState,
    bridge: MapBridge,
    provider: Arc<dyn LocationProvider>,
    pipeline: Arc<GeotagPipeline>,
    image: Option<ImageReference>,
    last_center: Option<(Coordinate, u8)>,
}

impl Session {
    /// Create a session plus the queue of serialized commands the
    /// shell delivers to the map surface.
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        pipeline: GeotagPipeline,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (bridge, commands) = MapBridge::new();
        (
            Self {
                resolver: ResolutionState::new(),
                bridge,
                provider,
                pipeline: Arc::new(pipeline),
                image: None,
                last_center: None,
            },
            commands,
        )
    }

    pub fn pick_image(&mut self, image: ImageReference) {
        log::info!("picked image {image}");
        self.image = Some(image);
    }

    pub fn image(&self) -> Option<&ImageReference> {
        self.image.as_ref()
    }

    pub fn resolution(&self) -> &ResolutionState {
        &self.resolver
    }

    pub fn last_center(&self) -> Option<(Coordinate, u8)> {
        self.last_center
    }

    /// Ask the sensor for a fix. On success the fix becomes the sensor
    /// candidate and the map recenters on it; on failure candidate
    /// state is untouched and the error is the caller's to render.
    pub async fn acquire_location(&mut self) -> Result<Coordinate, LocationError> {
        let provider = self.provider.clone();
        let coordinate = tokio::task::spawn_blocking(move || provider.request_current())
            .await
            .map_err(|err| LocationError::Unavailable(err.to_string()))??;

        self.resolver.record_sensor_reading(coordinate);
        self.bridge
            .send(&HostCommand::set_location(coordinate, SENSOR_ZOOM));
        Ok(coordinate)
    }

    /// Feed one raw payload from the map surface. Taps become the map
    /// candidate; protocol noise has already been dropped by the
    /// bridge when this returns `None`.
    pub fn handle_map_message(&mut self, raw: &str) -> Option<MapEvent> {
        let event = self.bridge.receive(raw)?;
        match &event {
            MapEvent::MapReady => {}
            MapEvent::MapTap {
                latitude,
                longitude,
            } => match Coordinate::new(*latitude, *longitude) {
                Ok(coordinate) => self.resolver.record_map_selection(coordinate),
                Err(err) => log::warn!("ignoring out-of-range map tap: {err}"),
            },
            MapEvent::LocationSet {
                latitude,
                longitude,
            } => {
                log::info!("map confirmed location ({latitude}, {longitude})");
            }
            MapEvent::CenterResponse { lat, lng, zoom } => {
                if let Ok(coordinate) = Coordinate::new(*lat, *lng) {
                    self.last_center = Some((coordinate, *zoom));
                }
            }
        }
        Some(event)
    }

    /// Ask the surface for its current view center.
    pub fn request_center(&self) -> bool {
        self.bridge.send(&HostCommand::GetCenter)
    }

    /// Try to save. With two live candidates this escalates to the
    /// user instead of picking; candidates persist across saves.
    pub async fn save(&mut self) -> SaveFlow {
        let Some(image) = self.image.clone() else {
            return SaveFlow::NoImage;
        };
        match self.resolver.resolve() {
            ResolutionOutcome::NeedsInput => SaveFlow::NeedsLocation,
            ResolutionOutcome::Resolved(coordinate) => {
                SaveFlow::Done(self.run_pipeline(image, coordinate).await)
            }
            ResolutionOutcome::NeedsDisambiguation { sensor, map } => {
                SaveFlow::NeedsChoice { sensor, map }
            }
        }
    }

    /// Complete a save after the user disambiguated.
    pub async fn save_with(&mut self, choice: Choice) -> SaveFlow {
        let Some(image) = self.image.clone() else {
            return SaveFlow::NoImage;
        };
        match self.resolver.choose(choice) {
            Some(coordinate) => SaveFlow::Done(self.run_pipeline(image, coordinate).await),
            None => SaveFlow::NeedsLocation,
        }
    }

    async fn run_pipeline(&self, image: ImageReference, coordinate: Coordinate) -> SaveReport {
        let pipeline = self.pipeline.clone();
        let result = tokio::task::spawn_blocking(move || pipeline.save(&image, coordinate))
            .await
            .unwrap_or_else(|err| {
                Err(PipelineError::Persistence(format!(
                    "save task failed: {err}"
                )))
            });
        SaveReport::from(&result)
    }
}
