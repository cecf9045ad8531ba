//! Distance Matrix web service client
//!
//! Computes travel distance and time between sets of origins and destinations
//! via a Distance Matrix web service (the Google Maps compatible
//! `maps/api/distancematrix/json` endpoint).
//!
//! # Architecture
//!
//! The crate follows a client-trait pattern consistent with other integration crates.
//! [`DistanceMatrixService`] defines the interface, implemented by
//! [`DistanceMatrixClient`]. Submitting a [`DistanceMatrixQuery`] returns a
//! [`PendingRequest`] which can be awaited, observed through a completion
//! callback, or cancelled. All submissions of a client share one
//! [`RateLimiter`]; transient failures are retried once; the timeout is
//! measured from submission. HTTP goes through the [`Transport`] trait so
//! tests can substitute a scripted implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use integration_distance_matrix::{
//!     DistanceMatrixClient, DistanceMatrixConfig, DistanceMatrixQuery, TravelMode,
//! };
//!
//! let config = DistanceMatrixConfig::with_key("my-api-key");
//! let client = DistanceMatrixClient::new(&config)?;
//!
//! let query = DistanceMatrixQuery::new(["Berlin, Germany"], ["Leipzig, Germany"])
//!     .with_mode(TravelMode::Driving);
//!
//! let pending = client.submit(&query)?;
//! pending.finally(|| tracing::debug!("done"));
//! let response = pending.response().await?;
//! for (origin, destination, element) in response.json.pairs() {
//!     println!("{origin} -> {destination}: {:?}", element.distance_meters());
//! }
//! ```

mod client;
mod config;
mod error;
mod location;
mod models;
mod pending;
mod query;
pub mod rate_limit;
pub mod retry;
mod transport;

pub use client::{DISTANCE_MATRIX_PATH, DistanceMatrixClient, DistanceMatrixService};
pub use config::{Credentials, DistanceMatrixConfig};
pub use error::{DistanceMatrixError, OutcomeKind};
pub use location::Location;
pub use models::{
    ClientResponse, DistanceMatrixResponse, Element, ElementStatus, Row, TextValue,
    TopLevelStatus, TransitFare,
};
pub use pending::{PendingRequest, RequestResult, RequestState};
pub use query::{
    DepartureTime, DistanceMatrixQuery, Language, Timestamp, TrafficModel, TransitMode,
    TransitRoutingPreference, TravelMode, TravelRestriction, UnitSystem,
};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use retry::RetryConfig;
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
