//! Location Provider seam
//!
//! The platform's location sensor is an external collaborator: asked
//! for a single best-effort fix, it either answers with a coordinate
//! or reports why it can't. Implementations are expected to block (the
//! session wraps calls in `spawn_blocking`); a provider-side timeout
//! surfaces as [`LocationError::Unavailable`].

use thiserror::Error;

use crate::domain::Coordinate;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    /// The user denied the location permission
    #[error("location permission denied")]
    PermissionDenied,
    /// No fix could be obtained (sensor off, timeout, no signal)
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Supplies a single best-effort coordinate on request.
pub trait LocationProvider: Send + Sync {
    fn request_current(&self) -> Result<Coordinate, LocationError>;
}

/// Provider that always answers with a fixed coordinate. Stands in for
/// a real sensor backend in the CLI and in tests.
pub struct FixedLocationProvider {
    coordinate: Coordinate,
}

impl FixedLocationProvider {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

impl LocationProvider for FixedLocationProvider {
    fn request_current(&self) -> Result<Coordinate, LocationError> {
        Ok(self.coordinate)
    }
}

/// Provider that always fails, mirroring a denied permission prompt or
/// a sensor that cannot get a fix.
pub struct FailingLocationProvider {
    error: LocationError,
}

impl FailingLocationProvider {
    pub fn new(error: LocationError) -> Self {
        Self { error }
    }
}

impl LocationProvider for FailingLocationProvider {
    fn request_current(&self) -> Result<Coordinate, LocationError> {
        Err(self.error.clone())
    }
}
