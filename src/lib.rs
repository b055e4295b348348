//! Attach geographic coordinates to photos and persist the result.
//!
//! Coordinates come from the device's location sensor or from a point
//! tapped on an embedded map; when both exist the user disambiguates.
//! The interesting state lives in three places: the [`bridge`] wire
//! protocol to the map surface, the [`resolver`] candidate state, and
//! the [`pipeline`] that mutates metadata and persists the image.

pub mod bridge;
pub mod domain;
pub mod exif;
pub mod location;
pub mod pipeline;
pub mod resolver;
pub mod session;
pub mod store;
