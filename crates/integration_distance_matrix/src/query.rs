//! Distance Matrix query
//!
//! A query is validated and serialized into wire parameters when it is
//! submitted; after that the client never looks at it again.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::DistanceMatrixError;
use crate::location::{Location, encode_locations};

/// Language codes accepted by the service
const SUPPORTED_LANGUAGES: &[&str] = &[
    "ar", "be", "bg", "bn", "ca", "cs", "da", "de", "el", "en", "en-AU", "en-GB", "es", "eu",
    "fa", "fi", "fil", "fr", "gl", "gu", "hi", "hr", "hu", "id", "it", "iw", "ja", "kk", "kn",
    "ko", "ky", "lt", "lv", "mk", "ml", "mr", "my", "nl", "no", "pa", "pl", "pt", "pt-BR",
    "pt-PT", "ro", "ru", "sk", "sl", "sq", "sr", "sv", "ta", "te", "th", "tl", "tr", "uk", "uz",
    "vi", "zh-CN", "zh-TW",
];

/// A supported result language
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Language(&'static str);

impl Language {
    /// Look up a language code (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if the code is not supported.
    pub fn new(code: &str) -> Result<Self, DistanceMatrixError> {
        SUPPORTED_LANGUAGES
            .iter()
            .copied()
            .find(|supported| supported.eq_ignore_ascii_case(code.trim()))
            .map(Self)
            .ok_or_else(|| DistanceMatrixError::InvalidQuery(format!("unsupported language '{code}'")))
    }

    /// The canonical language code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.0
    }
}

impl TryFrom<String> for Language {
    type Error = DistanceMatrixError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::new(&code)
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = String::deserialize(deserializer)?;
        Self::new(&code).map_err(de::Error::custom)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.0.to_string()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Mode of transport used for the calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    /// Road network (service default)
    Driving,
    /// Pedestrian paths and sidewalks
    Walking,
    /// Bicycle paths and preferred streets
    Bicycling,
    /// Public transit routes
    Transit,
}

impl TravelMode {
    /// Wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
            Self::Bicycling => "bicycling",
            Self::Transit => "transit",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Route feature to avoid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelRestriction {
    /// Toll roads and bridges
    Tolls,
    /// Highways
    Highways,
    /// Ferries
    Ferries,
    /// Indoor steps for walking and transit
    Indoor,
}

impl TravelRestriction {
    /// Wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tolls => "tolls",
            Self::Highways => "highways",
            Self::Ferries => "ferries",
            Self::Indoor => "indoor",
        }
    }
}

impl fmt::Display for TravelRestriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit system for textual distances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    /// Kilometers and meters
    Metric,
    /// Miles and feet
    Imperial,
}

impl UnitSystem {
    /// Wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assumptions used for `duration_in_traffic`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficModel {
    /// Best estimate from historical and live traffic
    BestGuess,
    /// Longer than actual on most days
    Pessimistic,
    /// Shorter than actual on most days
    Optimistic,
}

impl TrafficModel {
    /// Wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BestGuess => "best_guess",
            Self::Pessimistic => "pessimistic",
            Self::Optimistic => "optimistic",
        }
    }
}

impl fmt::Display for TrafficModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preferred transit vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitMode {
    /// Bus
    Bus,
    /// Subway
    Subway,
    /// Train
    Train,
    /// Tram and light rail
    Tram,
    /// Train, tram, light rail and subway
    Rail,
}

impl TransitMode {
    /// Wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bus => "bus",
            Self::Subway => "subway",
            Self::Train => "train",
            Self::Tram => "tram",
            Self::Rail => "rail",
        }
    }
}

impl fmt::Display for TransitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bias for transit routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitRoutingPreference {
    /// Limited amounts of walking
    LessWalking,
    /// Limited number of transfers
    FewerTransfers,
}

impl TransitRoutingPreference {
    /// Wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LessWalking => "less_walking",
            Self::FewerTransfers => "fewer_transfers",
        }
    }
}

impl fmt::Display for TransitRoutingPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point in time as whole seconds since the Unix epoch
///
/// `DateTime<Utc>` values are truncated to whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Seconds since the Unix epoch
    #[must_use]
    pub const fn epoch_seconds(&self) -> i64 {
        self.0
    }
}

impl From<i64> for Timestamp {
    fn from(secs: i64) -> Self {
        Self(secs)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(time: DateTime<Utc>) -> Self {
        Self(time.timestamp())
    }
}

/// Desired departure time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepartureTime {
    /// The current time, resolved by the service
    Now,
    /// A specific time
    At(Timestamp),
}

impl DepartureTime {
    fn to_wire(self) -> String {
        match self {
            Self::Now => "now".to_string(),
            Self::At(ts) => ts.epoch_seconds().to_string(),
        }
    }
}

impl From<Timestamp> for DepartureTime {
    fn from(ts: Timestamp) -> Self {
        Self::At(ts)
    }
}

impl From<i64> for DepartureTime {
    fn from(secs: i64) -> Self {
        Self::At(Timestamp(secs))
    }
}

impl From<DateTime<Utc>> for DepartureTime {
    fn from(time: DateTime<Utc>) -> Self {
        Self::At(time.into())
    }
}

/// A travel distance/time query over a matrix of origins and destinations
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrixQuery {
    /// Starting points, one response row each
    pub origins: Vec<Location>,
    /// End points, one element per row each
    pub destinations: Vec<Location>,
    /// Mode of transport
    pub mode: Option<TravelMode>,
    /// Result language, overriding the client default
    pub language: Option<Language>,
    /// Region bias as a two-letter ccTLD
    pub region: Option<String>,
    /// Route features to avoid
    pub avoid: Vec<TravelRestriction>,
    /// Unit system for textual distances
    pub units: Option<UnitSystem>,
    /// Desired arrival time (exclusive with `departure_time`)
    pub arrival_time: Option<Timestamp>,
    /// Desired departure time (exclusive with `arrival_time`)
    pub departure_time: Option<DepartureTime>,
    /// Traffic assumptions for `duration_in_traffic`
    pub traffic_model: Option<TrafficModel>,
    /// Preferred transit vehicles
    pub transit_mode: Vec<TransitMode>,
    /// Transit routing bias
    pub transit_routing_preference: Option<TransitRoutingPreference>,
}

impl DistanceMatrixQuery {
    /// Create a query with no optional parameters set
    #[must_use]
    pub fn new<O, D>(origins: O, destinations: D) -> Self
    where
        O: IntoIterator,
        O::Item: Into<Location>,
        D: IntoIterator,
        D::Item: Into<Location>,
    {
        Self {
            origins: origins.into_iter().map(Into::into).collect(),
            destinations: destinations.into_iter().map(Into::into).collect(),
            mode: None,
            language: None,
            region: None,
            avoid: Vec::new(),
            units: None,
            arrival_time: None,
            departure_time: None,
            traffic_model: None,
            transit_mode: Vec::new(),
            transit_routing_preference: None,
        }
    }

    /// Set the travel mode
    #[must_use]
    pub const fn with_mode(mut self, mode: TravelMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the result language
    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Set the region bias
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Add a route restriction
    #[must_use]
    pub fn avoiding(mut self, restriction: TravelRestriction) -> Self {
        if !self.avoid.contains(&restriction) {
            self.avoid.push(restriction);
        }
        self
    }

    /// Set the unit system
    #[must_use]
    pub const fn with_units(mut self, units: UnitSystem) -> Self {
        self.units = Some(units);
        self
    }

    /// Set the desired arrival time
    #[must_use]
    pub fn with_arrival_time(mut self, at: impl Into<Timestamp>) -> Self {
        self.arrival_time = Some(at.into());
        self
    }

    /// Set the desired departure time
    #[must_use]
    pub fn with_departure_time(mut self, at: impl Into<DepartureTime>) -> Self {
        self.departure_time = Some(at.into());
        self
    }

    /// Set the traffic model
    #[must_use]
    pub const fn with_traffic_model(mut self, model: TrafficModel) -> Self {
        self.traffic_model = Some(model);
        self
    }

    /// Add a preferred transit vehicle
    #[must_use]
    pub fn with_transit_mode(mut self, mode: TransitMode) -> Self {
        if !self.transit_mode.contains(&mode) {
            self.transit_mode.push(mode);
        }
        self
    }

    /// Set the transit routing preference
    #[must_use]
    pub const fn with_transit_routing_preference(
        mut self,
        preference: TransitRoutingPreference,
    ) -> Self {
        self.transit_routing_preference = Some(preference);
        self
    }

    /// Number of origin-destination pairings this query asks for
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.origins.len() * self.destinations.len()
    }

    /// Check the query invariants without encoding
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if the query would be rejected on submission.
    pub fn validate(&self) -> Result<(), DistanceMatrixError> {
        self.to_params(None).map(|_| ())
    }

    /// Encode the query as wire parameters
    ///
    /// `default_language` applies when the query sets no language.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if both arrival and departure time are set, if
    /// origins or destinations are empty or malformed, or if the region is
    /// not a two-letter code.
    pub fn to_params(
        &self,
        default_language: Option<&Language>,
    ) -> Result<Vec<(&'static str, String)>, DistanceMatrixError> {
        if self.arrival_time.is_some() && self.departure_time.is_some() {
            return Err(DistanceMatrixError::InvalidQuery(
                "arrival_time and departure_time are mutually exclusive".to_string(),
            ));
        }

        let mut params = vec![
            ("origins", encode_locations("origins", &self.origins)?),
            (
                "destinations",
                encode_locations("destinations", &self.destinations)?,
            ),
        ];

        if let Some(mode) = self.mode {
            params.push(("mode", mode.to_string()));
        }
        if let Some(language) = self.language.as_ref().or(default_language) {
            params.push(("language", language.to_string()));
        }
        if let Some(region) = &self.region {
            if region.len() != 2 || !region.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(DistanceMatrixError::InvalidQuery(format!(
                    "region '{region}' must be a two-letter country code"
                )));
            }
            params.push(("region", region.to_ascii_lowercase()));
        }
        if !self.avoid.is_empty() {
            params.push(("avoid", join_wire(&self.avoid, TravelRestriction::as_str)));
        }
        if let Some(units) = self.units {
            params.push(("units", units.to_string()));
        }
        if let Some(arrival) = self.arrival_time {
            params.push(("arrival_time", arrival.epoch_seconds().to_string()));
        }
        if let Some(departure) = self.departure_time {
            params.push(("departure_time", departure.to_wire()));
        }
        if let Some(model) = self.traffic_model {
            params.push(("traffic_model", model.to_string()));
        }
        if !self.transit_mode.is_empty() {
            params.push(("transit_mode", join_wire(&self.transit_mode, TransitMode::as_str)));
        }
        if let Some(preference) = self.transit_routing_preference {
            params.push(("transit_routing_preference", preference.to_string()));
        }

        Ok(params)
    }
}

fn join_wire<T>(values: &[T], as_str: fn(&T) -> &'static str) -> String {
    values.iter().map(as_str).collect::<Vec<_>>().join("|")
}
