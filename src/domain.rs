//! Pure domain types with minimal dependencies
//!
//! Core types used throughout the crate. Types here should have no
//! framework dependencies so the resolver and pipeline can be tested
//! in isolation.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A decimal latitude/longitude pair.
///
/// Always constructed together through [`Coordinate::new`], which
/// enforces the valid ranges; the fields are never set individually.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Coordinate outside the valid decimal-degree ranges
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("latitude out of range: {0} (must be -90 to 90)")]
    LatitudeOutOfRange(f64),
    #[error("longitude out of range: {0} (must be -180 to 180)")]
    LongitudeOutOfRange(f64),
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// One proposed coordinate pair, tagged by where it came from.
///
/// At most one candidate per tag is live at a time; recording a second
/// candidate with the same tag replaces the first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CandidateSource {
    /// Fix from the device's location sensor
    Sensor {
        coordinate: Coordinate,
        taken_at: DateTime<Utc>,
    },
    /// Point the user tapped on the embedded map
    MapSelection { coordinate: Coordinate },
}

impl CandidateSource {
    pub fn coordinate(&self) -> Coordinate {
        match *self {
            CandidateSource::Sensor { coordinate, .. } => coordinate,
            CandidateSource::MapSelection { coordinate } => coordinate,
        }
    }
}

/// Opaque locator for a source image
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageReference {
    /// Direct file path, openable as-is
    File(PathBuf),
    /// Content-resolver style locator; must be materialized to a local
    /// file before the metadata writer can touch it
    Content(String),
}

impl ImageReference {
    /// Parse a string locator the way the picker hands them out:
    /// `file://` URIs become direct paths, `content://` URIs stay
    /// indirect, anything else is treated as a bare path.
    pub fn parse(locator: &str) -> Self {
        if let Some(path) = locator.strip_prefix("file://") {
            ImageReference::File(PathBuf::from(path))
        } else if locator.starts_with("content://") {
            ImageReference::Content(locator.to_string())
        } else {
            ImageReference::File(PathBuf::from(locator))
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageReference::File(path) => write!(f, "{}", path.display()),
            ImageReference::Content(uri) => write!(f, "{uri}"),
        }
    }
}

/// Explicit user pick between two live candidates.
///
/// Cancelling the dialog is expressed by not issuing a pick at all;
/// candidate state is left intact either way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    /// Use the sensor fix
    SensorFix,
    /// Use the map-selected point
    MapSelection,
}
