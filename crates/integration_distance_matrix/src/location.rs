//! Origin/destination location specifiers
//!
//! The service accepts coordinates, place IDs, encoded polylines and free-form
//! addresses in the `origins`/`destinations` parameters. Callers may supply
//! coordinates in several shapes; all of them normalize to one wire string
//! through [`Location::to_wire`].

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::DistanceMatrixError;

const PLACE_ID_PREFIX: &str = "place_id:";
const POLYLINE_PREFIX: &str = "enc:";

/// A single origin or destination
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawLocation")]
pub enum Location {
    /// `[latitude, longitude]`
    CoordinatePair([f64; 2]),
    /// `"latitude,longitude"`, validated on encoding
    CoordinateString(String),
    /// `{ lat, lng }`
    LatLng {
        /// Latitude in degrees
        lat: f64,
        /// Longitude in degrees
        lng: f64,
    },
    /// `{ latitude, longitude }`
    VerboseLatLng {
        /// Latitude in degrees
        latitude: f64,
        /// Longitude in degrees
        longitude: f64,
    },
    /// Place identifier, without the `place_id:` prefix
    PlaceId(String),
    /// Encoded polyline, without the `enc:` prefix and trailing colon
    EncodedPolyline(String),
    /// Free-form address, geocoded by the service
    Address(String),
}

impl Location {
    /// Location from a latitude/longitude pair
    #[must_use]
    pub const fn coords(lat: f64, lng: f64) -> Self {
        Self::LatLng { lat, lng }
    }

    /// Location from a place identifier
    #[must_use]
    pub fn place_id(id: impl Into<String>) -> Self {
        Self::PlaceId(id.into())
    }

    /// Location from an encoded polyline
    #[must_use]
    pub fn polyline(encoded: impl Into<String>) -> Self {
        Self::EncodedPolyline(encoded.into())
    }

    /// Location from a free-form address
    #[must_use]
    pub fn address(address: impl Into<String>) -> Self {
        Self::Address(address.into())
    }

    /// Classify a string specifier
    ///
    /// `place_id:` and `enc:` prefixes select those variants; a string made of
    /// two numeric components becomes a coordinate string; anything else is
    /// treated as an address.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if let Some(id) = trimmed.strip_prefix(PLACE_ID_PREFIX) {
            return Self::PlaceId(id.to_string());
        }
        if let Some(encoded) = trimmed.strip_prefix(POLYLINE_PREFIX) {
            let encoded = encoded.strip_suffix(':').unwrap_or(encoded);
            return Self::EncodedPolyline(encoded.to_string());
        }
        if looks_like_coordinates(trimmed) {
            return Self::CoordinateString(trimmed.to_string());
        }
        Self::Address(trimmed.to_string())
    }

    /// Encode this location as a wire specifier
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` for out-of-range or non-finite coordinates,
    /// unparsable coordinate strings, empty identifiers, polylines outside the
    /// polyline alphabet, or `|` inside a specifier.
    pub fn to_wire(&self) -> Result<String, DistanceMatrixError> {
        match self {
            Self::CoordinatePair([lat, lng])
            | Self::LatLng { lat, lng }
            | Self::VerboseLatLng {
                latitude: lat,
                longitude: lng,
            } => format_coordinates(*lat, *lng),
            Self::CoordinateString(text) => {
                let (lat, lng) = parse_coordinates(text)?;
                format_coordinates(lat, lng)
            },
            Self::PlaceId(id) => {
                if id.is_empty() || id.contains(|c: char| c == '|' || c.is_whitespace()) {
                    return Err(invalid(format!("malformed place id '{id}'")));
                }
                Ok(format!("{PLACE_ID_PREFIX}{id}"))
            },
            Self::EncodedPolyline(encoded) => {
                // Polyline characters are offset by 63 into printable ASCII
                if encoded.is_empty() || !encoded.bytes().all(|b| (63..=126).contains(&b)) {
                    return Err(invalid(format!("malformed encoded polyline '{encoded}'")));
                }
                Ok(format!("{POLYLINE_PREFIX}{encoded}:"))
            },
            Self::Address(address) => {
                let address = address.trim();
                if address.is_empty() {
                    return Err(invalid("address must not be empty".to_string()));
                }
                if address.contains('|') {
                    return Err(invalid(format!("address '{address}' contains '|'")));
                }
                Ok(address.to_string())
            },
        }
    }
}

/// Encode a list of locations as a pipe-delimited parameter value
///
/// # Errors
///
/// Returns `InvalidQuery` if the list is empty or any location is malformed.
pub fn encode_locations(field: &str, locations: &[Location]) -> Result<String, DistanceMatrixError> {
    if locations.is_empty() {
        return Err(invalid(format!("{field} must not be empty")));
    }
    let encoded = locations
        .iter()
        .map(Location::to_wire)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| match e {
            DistanceMatrixError::InvalidQuery(msg) => invalid(format!("{field}: {msg}")),
            other => other,
        })?;
    Ok(encoded.join("|"))
}

fn invalid(message: String) -> DistanceMatrixError {
    DistanceMatrixError::InvalidQuery(message)
}

fn format_coordinates(lat: f64, lng: f64) -> Result<String, DistanceMatrixError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(invalid(format!(
            "coordinates ({lat}, {lng}) out of range: latitude must be -90 to 90, longitude must be -180 to 180"
        )));
    }
    Ok(format!("{lat},{lng}"))
}

fn parse_coordinates(text: &str) -> Result<(f64, f64), DistanceMatrixError> {
    let malformed = || invalid(format!("malformed coordinate string '{text}'"));
    let (lat, lng) = text.split_once(',').ok_or_else(malformed)?;
    let lat: f64 = lat.trim().parse().map_err(|_| malformed())?;
    let lng: f64 = lng.trim().parse().map_err(|_| malformed())?;
    Ok((lat, lng))
}

fn looks_like_coordinates(text: &str) -> bool {
    let numeric = |part: &str| {
        let part = part.trim();
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
    };
    text.split_once(',')
        .is_some_and(|(lat, lng)| numeric(lat) && numeric(lng))
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoordinatePair([lat, lng])
            | Self::LatLng { lat, lng }
            | Self::VerboseLatLng {
                latitude: lat,
                longitude: lng,
            } => write!(f, "{lat},{lng}"),
            Self::CoordinateString(text) | Self::Address(text) => f.write_str(text),
            Self::PlaceId(id) => write!(f, "{PLACE_ID_PREFIX}{id}"),
            Self::EncodedPolyline(encoded) => write!(f, "{POLYLINE_PREFIX}{encoded}:"),
        }
    }
}

impl FromStr for Location {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_text(s))
    }
}

impl From<&str> for Location {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl From<String> for Location {
    fn from(text: String) -> Self {
        Self::from_text(&text)
    }
}

impl From<[f64; 2]> for Location {
    fn from(pair: [f64; 2]) -> Self {
        Self::CoordinatePair(pair)
    }
}

impl From<(f64, f64)> for Location {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::CoordinatePair([lat, lng])
    }
}

/// Accepted JSON shapes for a location
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLocation {
    Pair([f64; 2]),
    LatLng { lat: f64, lng: f64 },
    Verbose { latitude: f64, longitude: f64 },
    Text(String),
}

impl From<RawLocation> for Location {
    fn from(raw: RawLocation) -> Self {
        match raw {
            RawLocation::Pair(pair) => Self::CoordinatePair(pair),
            RawLocation::LatLng { lat, lng } => Self::LatLng { lat, lng },
            RawLocation::Verbose {
                latitude,
                longitude,
            } => Self::VerboseLatLng {
                latitude,
                longitude,
            },
            RawLocation::Text(text) => Self::from_text(&text),
        }
    }
}
