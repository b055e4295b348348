//! GPS metadata mutation
//!
//! Sets the EXIF GPS tag pair on an image file, always both
//! coordinates together with their hemisphere references, while
//! preserving every unrelated EXIF field and the image bytes
//! themselves (the container is re-segmented, never re-encoded).
//!
//! Supported containers: JPEG (.jpg, .jpeg) and PNG (.png).

use std::io::Cursor;
use std::path::Path;

use exif::{Field, In, Rational, Tag, Value};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::{Bytes, ImageEXIF};
use thiserror::Error;

use crate::domain::Coordinate;

#[derive(Debug, Error)]
pub enum ExifError {
    #[error("unsupported format '.{0}': only JPEG and PNG support GPS tags here")]
    UnsupportedFormat(String),
    #[error("file has no extension, cannot determine format")]
    NoExtension,
    #[error("failed to read image: {0}")]
    Read(std::io::Error),
    #[error("failed to write image: {0}")]
    Write(std::io::Error),
    #[error("invalid image container: {0}")]
    Container(String),
    #[error("failed to encode EXIF data: {0}")]
    Encode(String),
}

enum Container {
    Jpeg,
    Png,
}

fn detect_container(path: &Path) -> Result<Container, ExifError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or(ExifError::NoExtension)?;
    match extension.as_str() {
        "jpg" | "jpeg" => Ok(Container::Jpeg),
        "png" => Ok(Container::Png),
        other => Err(ExifError::UnsupportedFormat(other.to_string())),
    }
}

/// Set the GPS tag pair on `path` and commit the mutation in place.
///
/// Existing EXIF fields other than the four GPS tags are carried over
/// unchanged; files without any EXIF data get a fresh block.
pub fn write_gps(path: &Path, coordinate: Coordinate) -> Result<(), ExifError> {
    let container = detect_container(path)?;

    let file = std::fs::File::open(path).map_err(ExifError::Read)?;
    let mut bufreader = std::io::BufReader::new(&file);
    let existing = exif::Reader::new().read_from_container(&mut bufreader);

    // Carry over everything except the tags we are replacing
    let mut fields: Vec<Field> = Vec::new();
    if let Ok(exif) = existing {
        for field in exif.fields() {
            let replaced = matches!(
                field.tag,
                Tag::GPSLatitudeRef | Tag::GPSLatitude | Tag::GPSLongitudeRef | Tag::GPSLongitude
            );
            if !replaced {
                fields.push(Field {
                    tag: field.tag,
                    ifd_num: field.ifd_num,
                    value: field.value.clone(),
                });
            }
        }
    }
    fields.extend(gps_fields(coordinate));

    let mut exif_buffer = Cursor::new(Vec::new());
    let mut writer = exif::experimental::Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    writer
        .write(&mut exif_buffer, false)
        .map_err(|e| ExifError::Encode(e.to_string()))?;
    let exif_bytes = Bytes::from(exif_buffer.into_inner());

    let image_bytes = std::fs::read(path).map_err(ExifError::Read)?;
    let output = match container {
        Container::Jpeg => {
            let mut jpeg = Jpeg::from_bytes(image_bytes.into())
                .map_err(|e| ExifError::Container(e.to_string()))?;
            jpeg.set_exif(Some(exif_bytes));
            jpeg.encoder().bytes()
        }
        Container::Png => {
            let mut png = Png::from_bytes(image_bytes.into())
                .map_err(|e| ExifError::Container(e.to_string()))?;
            png.set_exif(Some(exif_bytes));
            png.encoder().bytes()
        }
    };
    std::fs::write(path, output).map_err(ExifError::Write)?;

    log::debug!("wrote GPS tag {coordinate} to {}", path.display());
    Ok(())
}

/// Read back the GPS tag pair, if the file carries a complete one.
pub fn read_gps(path: &Path) -> Result<Option<Coordinate>, ExifError> {
    let file = std::fs::File::open(path).map_err(ExifError::Read)?;
    let mut bufreader = std::io::BufReader::new(&file);
    let exif = match exif::Reader::new().read_from_container(&mut bufreader) {
        Ok(exif) => exif,
        // No EXIF block at all reads as "no GPS tag"
        Err(_) => return Ok(None),
    };

    let latitude = dms_value(&exif, Tag::GPSLatitude)
        .zip(hemisphere_sign(&exif, Tag::GPSLatitudeRef, b'S'))
        .map(|(dms, sign)| sign * dms);
    let longitude = dms_value(&exif, Tag::GPSLongitude)
        .zip(hemisphere_sign(&exif, Tag::GPSLongitudeRef, b'W'))
        .map(|(dms, sign)| sign * dms);

    match (latitude, longitude) {
        (Some(lat), Some(lng)) => Ok(Some(Coordinate { latitude: lat, longitude: lng })),
        _ => Ok(None),
    }
}

fn gps_fields(coordinate: Coordinate) -> Vec<Field> {
    let lat_ref = if coordinate.latitude >= 0.0 { b"N" } else { b"S" };
    let lng_ref = if coordinate.longitude >= 0.0 { b"E" } else { b"W" };
    vec![
        Field {
            tag: Tag::GPSLatitudeRef,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![lat_ref.to_vec()]),
        },
        Field {
            tag: Tag::GPSLatitude,
            ifd_num: In::PRIMARY,
            value: Value::Rational(to_dms(coordinate.latitude.abs())),
        },
        Field {
            tag: Tag::GPSLongitudeRef,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![lng_ref.to_vec()]),
        },
        Field {
            tag: Tag::GPSLongitude,
            ifd_num: In::PRIMARY,
            value: Value::Rational(to_dms(coordinate.longitude.abs())),
        },
    ]
}

/// Decimal degrees to EXIF degrees/minutes/seconds rationals, seconds
/// carried at millisecond-of-arc precision.
fn to_dms(decimal: f64) -> Vec<Rational> {
    let degrees = decimal.floor();
    let minutes_decimal = (decimal - degrees) * 60.0;
    let minutes = minutes_decimal.floor();
    let seconds = (minutes_decimal - minutes) * 60.0;
    vec![
        Rational {
            num: degrees as u32,
            denom: 1,
        },
        Rational {
            num: minutes as u32,
            denom: 1,
        },
        Rational {
            num: (seconds * 1000.0).round() as u32,
            denom: 1000,
        },
    ]
}

fn dms_value(exif: &exif::Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Rational(parts) if parts.len() >= 3 => Some(
            parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0,
        ),
        _ => None,
    }
}

/// +1.0 or -1.0 depending on the hemisphere reference letter.
fn hemisphere_sign(exif: &exif::Exif, tag: Tag, negative: u8) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(parts) => {
            let letter = parts.first()?.first()?;
            Some(if letter.eq_ignore_ascii_case(&negative) {
                -1.0
            } else {
                1.0
            })
        }
        _ => None,
    }
}
