//! Conversion between typed-in coordinate text and decimal degrees.
//!
//! Two input forms are accepted:
//! * a degrees-minutes-seconds pair, `36°54'26.4"N 10°10'49.0"E`
//! * a plain decimal pair, `36.907333, 10.180278`

use std::str::FromStr;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

use crate::models::GeoCoordinate;

pub const FORMAT_HINT: &str =
    "expected DMS like 36°54'26.4\"N 10°10'49.0\"E or decimal like 36.907333, 10.180278";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinateError {
    /// Neither the DMS pair nor the decimal pair pattern matched.
    #[error("Invalid coordinate format {input:?}: {hint}", hint = FORMAT_HINT)]
    InvalidFormat { input: String },
}

fn dms_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"^(\d+)°(\d+)'(\d+(?:\.\d+)?)"([NSEW])\s+(\d+)°(\d+)'(\d+(?:\.\d+)?)"([NSEW])$"#,
        )
        .expect("DMS pattern is valid")
    })
}

fn decimal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([-+]?(?:\d+\.?\d*|\.\d+))\s*,\s*([-+]?(?:\d+\.?\d*|\.\d+))$").expect("decimal pattern is valid")
    })
}

/// Parses a coordinate pair. The first group is always read as latitude,
/// whatever hemisphere letter it carries.
pub fn parse(input: &str) -> Result<GeoCoordinate, CoordinateError> {
    let trimmed = input.trim();
    let invalid = || CoordinateError::InvalidFormat {
        input: input.to_string(),
    };

    if let Some(caps) = dms_pattern().captures(trimmed) {
        let latitude = dms_axis(&caps, 1).ok_or_else(invalid)?;
        let longitude = dms_axis(&caps, 5).ok_or_else(invalid)?;
        return Ok(GeoCoordinate {
            latitude,
            longitude,
        });
    }

    if let Some(caps) = decimal_pattern().captures(trimmed) {
        let latitude = caps[1].parse::<f64>().map_err(|_| invalid())?;
        let longitude = caps[2].parse::<f64>().map_err(|_| invalid())?;
        return Ok(GeoCoordinate {
            latitude,
            longitude,
        });
    }

    Err(invalid())
}

// Reads degrees, minutes, seconds and hemisphere from four consecutive groups.
fn dms_axis(caps: &Captures<'_>, first: usize) -> Option<f64> {
    let degrees = caps.get(first)?.as_str().parse::<f64>().ok()?;
    let minutes = caps.get(first + 1)?.as_str().parse::<f64>().ok()?;
    let seconds = caps.get(first + 2)?.as_str().parse::<f64>().ok()?;
    let hemisphere = caps.get(first + 3)?.as_str();

    let value = degrees + minutes / 60.0 + seconds / 3600.0;
    Some(match hemisphere {
        "S" | "W" => -value,
        _ => value,
    })
}

/// Renders a decimal pair as `D°M'S.s"H D°M'S.s"H`, latitude first.
pub fn format(latitude: f64, longitude: f64) -> String {
    let lat_hemisphere = if latitude >= 0.0 { 'N' } else { 'S' };
    let lon_hemisphere = if longitude >= 0.0 { 'E' } else { 'W' };
    format!(
        "{} {}",
        format_axis(latitude, lat_hemisphere),
        format_axis(longitude, lon_hemisphere)
    )
}

fn format_axis(value: f64, hemisphere: char) -> String {
    let absolute = value.abs();
    let degrees = absolute.floor();
    let minutes_decimal = (absolute - degrees) * 60.0;
    let minutes = minutes_decimal.floor();
    let seconds = (minutes_decimal - minutes) * 60.0;
    format!(
        "{}°{}'{:.1}\"{}",
        degrees as i64, minutes as i64, seconds, hemisphere
    )
}

impl GeoCoordinate {
    pub fn to_dms(&self) -> String {
        format(self.latitude, self.longitude)
    }
}

impl FromStr for GeoCoordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}
