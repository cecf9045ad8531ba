//! Distance Matrix response models
//!
//! Typed representations of the JSON payload returned by the
//! `distancematrix/json` endpoint, plus the envelope carrying the transport
//! status and headers alongside the decoded payload.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Response envelope: HTTP status and headers with the decoded JSON payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientResponse<T> {
    /// The HTTP status
    pub status: u16,
    /// The HTTP headers (lower-cased names)
    pub headers: HashMap<String, String>,
    /// Deserialized JSON payload
    pub json: T,
}

impl<T> ClientResponse<T> {
    /// Look up a header by case-insensitive name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Top-level status of a Distance Matrix response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopLevelStatus {
    /// The response contains a valid result
    #[default]
    Ok,
    /// The provided request was invalid
    InvalidRequest,
    /// The product of origins and destinations exceeds the per-query limit
    MaxElementsExceeded,
    /// Missing/invalid key, billing disabled, or a self-imposed cap was hit
    OverDailyLimit,
    /// Too many requests within the allowed time period
    OverQueryLimit,
    /// The service denied use by this application
    RequestDenied,
    /// Server error; the request may succeed if tried again
    UnknownError,
}

impl TopLevelStatus {
    /// Wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::MaxElementsExceeded => "MAX_ELEMENTS_EXCEEDED",
            Self::OverDailyLimit => "OVER_DAILY_LIMIT",
            Self::OverQueryLimit => "OVER_QUERY_LIMIT",
            Self::RequestDenied => "REQUEST_DENIED",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Whether this is the success value
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for TopLevelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single origin-destination pairing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementStatus {
    /// The element contains a valid result
    #[default]
    Ok,
    /// The origin and/or destination could not be geocoded
    NotFound,
    /// No route could be found between origin and destination
    ZeroResults,
    /// The requested route is too long to be processed
    MaxRouteLengthExceeded,
}

impl ElementStatus {
    /// Wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NotFound => "NOT_FOUND",
            Self::ZeroResults => "ZERO_RESULTS",
            Self::MaxRouteLengthExceeded => "MAX_ROUTE_LENGTH_EXCEEDED",
        }
    }
}

impl fmt::Display for ElementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded payload of a Distance Matrix response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrixResponse {
    /// Request-level status
    pub status: TopLevelStatus,
    /// Detail for non-`OK` statuses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Origins as formatted by the service
    #[serde(default)]
    pub origin_addresses: Vec<String>,
    /// Destinations as formatted by the service
    #[serde(default)]
    pub destination_addresses: Vec<String>,
    /// One row per origin, in request order
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl DistanceMatrixResponse {
    /// Element for the given origin and destination indices
    #[must_use]
    pub fn element(&self, origin: usize, destination: usize) -> Option<&Element> {
        self.rows.get(origin)?.elements.get(destination)
    }

    /// Iterate over all pairings as `(origin_index, destination_index, element)`
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize, &Element)> {
        self.rows.iter().enumerate().flat_map(|(o, row)| {
            row.elements
                .iter()
                .enumerate()
                .map(move |(d, element)| (o, d, element))
        })
    }

    /// Total number of elements across all rows
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.rows.iter().map(|row| row.elements.len()).sum()
    }
}

/// A row of elements for one origin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// One element per destination, in request order
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// Result for a single origin-destination pairing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Pairing status
    pub status: ElementStatus,
    /// Travel time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<TextValue>,
    /// Travel time in current and historical traffic (driving with departure time)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_in_traffic: Option<TextValue>,
    /// Route length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<TextValue>,
    /// Total transit fare, where available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fare: Option<TransitFare>,
}

impl Element {
    /// Whether this pairing produced a route
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, ElementStatus::Ok)
    }

    /// Distance in meters
    #[must_use]
    pub fn distance_meters(&self) -> Option<u64> {
        self.distance.as_ref().map(|d| d.value)
    }

    /// Duration in seconds, preferring the traffic-aware estimate
    #[must_use]
    pub fn best_duration_secs(&self) -> Option<u64> {
        self.duration_in_traffic
            .as_ref()
            .or(self.duration.as_ref())
            .map(|d| d.value)
    }
}

/// A numeric value with its localized text (meters or seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextValue {
    /// Meters for distances, seconds for durations
    pub value: u64,
    /// Human-readable representation
    pub text: String,
}

/// Transit fare
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitFare {
    /// ISO 4217 currency code
    pub currency: String,
    /// Total fare amount in `currency`
    pub value: f64,
    /// Fare formatted in the requested language
    pub text: String,
}
