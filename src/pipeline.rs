//! Geotag Persistence Pipeline
//!
//! Turns `(ImageReference, Coordinate)` into a persisted geotagged
//! image or a typed failure. Three fallible steps run in order and
//! fail fast: input resolution, metadata mutation, output persistence.
//! A failure after the store entry was created rolls the entry back
//! best-effort; any scratch file from input resolution is removed on
//! every exit path.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::domain::{Coordinate, ImageReference};
use crate::exif::{self, ExifError};
use crate::store::{MediaStore, StoreError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source image not found: {0}")]
    InputNotFound(String),
    #[error("failed to update image metadata: {0}")]
    MetadataWrite(#[from] ExifError),
    #[error("failed to persist image: {0}")]
    Persistence(String),
    #[error("a save is already in progress")]
    Busy,
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        PipelineError::Persistence(err.to_string())
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InputNotFound(_) => ErrorKind::InputNotFound,
            PipelineError::MetadataWrite(_) => ErrorKind::MetadataWriteError,
            PipelineError::Persistence(_) => ErrorKind::PersistenceError,
            PipelineError::Busy => ErrorKind::SaveInProgress,
        }
    }
}

/// Failure kind exposed to the UI shell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InputNotFound,
    MetadataWriteError,
    PersistenceError,
    SaveInProgress,
}

/// Terminal pipeline outcome in the shape the UI shell renders.
#[derive(Debug, Serialize)]
pub struct SaveReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&Result<ImageReference, PipelineError>> for SaveReport {
    fn from(result: &Result<ImageReference, PipelineError>) -> Self {
        match result {
            Ok(reference) => SaveReport {
                ok: true,
                reference: Some(reference.to_string()),
                kind: None,
                detail: None,
            },
            Err(err) => SaveReport {
                ok: false,
                reference: None,
                kind: Some(err.kind()),
                detail: Some(err.to_string()),
            },
        }
    }
}

/// Resolves indirect (content-style) locators to readable byte
/// sources. The picker's direct file paths never go through this.
pub trait ContentSource: Send + Sync {
    fn open(&self, locator: &str) -> std::io::Result<Box<dyn Read + Send>>;
}

/// Content source for hosts that only ever hand out direct file paths.
pub struct NoContentSource;

impl ContentSource for NoContentSource {
    fn open(&self, locator: &str) -> std::io::Result<Box<dyn Read + Send>> {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no content resolver for {locator}"),
        ))
    }
}

/// Input resolved to a directly-readable file. Holding the `Temp`
/// variant keeps the scratch file alive; dropping it removes the file.
enum ResolvedInput {
    Direct(PathBuf),
    Temp(NamedTempFile),
}

impl ResolvedInput {
    fn path(&self) -> &Path {
        match self {
            ResolvedInput::Direct(path) => path,
            ResolvedInput::Temp(file) => file.path(),
        }
    }
}

pub struct GeotagPipeline {
    store: Box<dyn MediaStore>,
    content: Box<dyn ContentSource>,
    in_flight: AtomicBool,
}

impl GeotagPipeline {
    pub fn new(store: Box<dyn MediaStore>, content: Box<dyn ContentSource>) -> Self {
        Self {
            store,
            content,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run the full pipeline. At most one save runs at a time; a
    /// second request while one is pending is rejected with
    /// [`PipelineError::Busy`].
    pub fn save(
        &self,
        image: &ImageReference,
        coordinate: Coordinate,
    ) -> Result<ImageReference, PipelineError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::Busy);
        }
        let result = self.save_inner(image, coordinate);
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    fn save_inner(
        &self,
        image: &ImageReference,
        coordinate: Coordinate,
    ) -> Result<ImageReference, PipelineError> {
        log::info!("geotagging {image} with {coordinate}");

        let resolved = self.resolve_input(image)?;
        exif::write_gps(resolved.path(), coordinate)?;
        let reference = self.persist(resolved.path())?;

        log::info!("saved geotagged image at {reference}");
        Ok(reference)
    }

    /// Step 1: turn the reference into a file the metadata writer can
    /// open directly. Indirect locators are copied in full to a unique
    /// per-operation scratch file.
    fn resolve_input(&self, image: &ImageReference) -> Result<ResolvedInput, PipelineError> {
        match image {
            ImageReference::File(path) => {
                if path.is_file() {
                    Ok(ResolvedInput::Direct(path.clone()))
                } else {
                    Err(PipelineError::InputNotFound(path.display().to_string()))
                }
            }
            ImageReference::Content(uri) => {
                let mut reader = self
                    .content
                    .open(uri)
                    .map_err(|err| PipelineError::InputNotFound(format!("{uri}: {err}")))?;
                let mut file = tempfile::Builder::new()
                    .prefix("geopin-")
                    .suffix(".jpg")
                    .tempfile()
                    .map_err(|err| PipelineError::InputNotFound(format!("{uri}: {err}")))?;
                std::io::copy(&mut reader, &mut file)
                    .map_err(|err| PipelineError::InputNotFound(format!("{uri}: {err}")))?;
                log::debug!("materialized {uri} at {}", file.path().display());
                Ok(ResolvedInput::Temp(file))
            }
        }
    }

    /// Step 3: copy the mutated bytes into the store under a fresh
    /// display name, staged so viewers never see a partial entry.
    fn persist(&self, path: &Path) -> Result<ImageReference, PipelineError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg")
            .to_lowercase();
        let display_name = format!("IMG_{}.{ext}", chrono::Utc::now().timestamp_millis());
        let bytes = fs::read(path)
            .map_err(|err| PipelineError::Persistence(format!("failed to read image: {err}")))?;

        let entry = self.store.create_pending(&display_name, mime_for(&ext))?;
        if let Err(err) = self
            .store
            .write(&entry, &bytes)
            .and_then(|()| self.store.finalize(&entry))
        {
            // Roll back the orphaned entry; cleanup failure is logged
            // inside the store and the original error is what surfaces
            self.store.delete(&entry);
            return Err(err.into());
        }
        Ok(ImageReference::File(entry.visible_path().to_path_buf()))
    }
}

fn mime_for(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}
