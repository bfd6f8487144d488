//! Recurring device location updates.
//!
//! Platform feeds implement [`LocationFeed`]; the
//! [`LocationSubscriptionManager`] keeps at most one subscription alive and
//! hands the newest coordinate to a [`CoordinateSink`].

#![warn(missing_docs)]

mod subscription;

/// Platform-specific implementations.
pub mod sys;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use marinamap_permission::AuthorizationState;
pub use subscription::{
    LocationSubscriptionManager, SubscriptionHandle, SubscriptionId, SubscriptionUpdate,
};

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and inside their valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A single fix reported by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Position of the fix.
    pub coordinate: Coordinate,
    /// Altitude in meters above sea level, if available.
    pub altitude: Option<f64>,
    /// Horizontal accuracy in meters, if available.
    pub horizontal_accuracy: Option<f64>,
    /// Timestamp as Unix epoch milliseconds.
    pub timestamp: u64,
}

impl Location {
    /// A fix with only a position.
    #[must_use]
    pub const fn at(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            altitude: None,
            horizontal_accuracy: None,
            timestamp: 0,
        }
    }
}

/// One delivery from a location feed.
///
/// Platforms may batch several fixes, or deliver none at all.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocationResult {
    locations: Vec<Location>,
}

impl LocationResult {
    /// Wrap a batch of fixes, oldest first.
    #[must_use]
    pub const fn new(locations: Vec<Location>) -> Self {
        Self { locations }
    }

    /// A delivery carrying no fix.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            locations: Vec::new(),
        }
    }

    /// All fixes in the delivery, oldest first.
    #[must_use]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// The newest fix, if any.
    #[must_use]
    pub fn last_location(&self) -> Option<&Location> {
        self.locations.last()
    }
}

impl From<Location> for LocationResult {
    fn from(location: Location) -> Self {
        Self::new(vec![location])
    }
}

/// Errors that can occur when accessing location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// Location permission is not held.
    #[error("location permission denied")]
    PermissionDenied,
    /// Location services are disabled on the device.
    #[error("location services disabled")]
    ServiceDisabled,
    /// Location is not available on this platform.
    #[error("location not available")]
    NotAvailable,
    /// The platform reported an error.
    #[error("platform error: {0}")]
    Platform(String),
}

/// How hard the platform should try for an accurate fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Most accurate fix available, typically GPS.
    #[default]
    HighAccuracy,
    /// Block-level accuracy.
    Balanced,
    /// City-level accuracy.
    LowPower,
    /// Only fixes requested by other applications.
    Passive,
}

impl Priority {
    /// The constant used by Android's `Priority` class.
    #[must_use]
    pub const fn android_code(self) -> i32 {
        match self {
            Self::HighAccuracy => 100,
            Self::Balanced => 102,
            Self::LowPower => 104,
            Self::Passive => 105,
        }
    }
}

/// Parameters of a recurring location request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    interval: Duration,
    min_update_interval: Duration,
    priority: Priority,
}

impl LocationRequest {
    /// Target interval used when nothing else is configured.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
    /// Minimum interval used when nothing else is configured.
    pub const DEFAULT_MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(5);

    /// Start building a request with the given target interval.
    #[must_use]
    pub const fn builder(interval: Duration) -> LocationRequestBuilder {
        LocationRequestBuilder {
            interval,
            min_update_interval: None,
            priority: Priority::HighAccuracy,
        }
    }

    /// Desired time between updates.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Updates never arrive faster than this.
    #[must_use]
    pub const fn min_update_interval(&self) -> Duration {
        self.min_update_interval
    }

    /// Accuracy priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self::builder(Self::DEFAULT_INTERVAL)
            .min_update_interval(Self::DEFAULT_MIN_UPDATE_INTERVAL)
            .build()
    }
}

/// Builder for [`LocationRequest`].
#[derive(Debug, Clone, Copy)]
pub struct LocationRequestBuilder {
    interval: Duration,
    min_update_interval: Option<Duration>,
    priority: Priority,
}

impl LocationRequestBuilder {
    /// Set the minimum interval. Clamped to the target interval.
    #[must_use]
    pub const fn min_update_interval(mut self, min_update_interval: Duration) -> Self {
        self.min_update_interval = Some(min_update_interval);
        self
    }

    /// Set the accuracy priority.
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Finish the request.
    #[must_use]
    pub fn build(self) -> LocationRequest {
        let min_update_interval = self
            .min_update_interval
            .map_or(self.interval, |min| min.min(self.interval));
        LocationRequest {
            interval: self.interval,
            min_update_interval,
            priority: self.priority,
        }
    }
}

/// Receives deliveries from a running feed.
pub trait LocationDelegate: Send + Sync + fmt::Debug {
    /// Called for every delivery, in order.
    fn on_result(&self, result: LocationResult);

    /// Called at most once when the feed dies on its own. Nothing follows it.
    fn on_failure(&self, error: LocationError);
}

/// Identifies a registration with a [`LocationFeed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedToken(pub u64);

/// A platform source of recurring location updates.
pub trait LocationFeed: fmt::Debug {
    /// Begin delivering results to `delegate` until removed.
    ///
    /// # Errors
    /// Returns [`LocationError::PermissionDenied`] if the platform refuses the
    /// request for lack of authorization, or another [`LocationError`] if the
    /// feed cannot start.
    fn request_updates(
        &self,
        request: &LocationRequest,
        delegate: Arc<dyn LocationDelegate>,
    ) -> Result<FeedToken, LocationError>;

    /// Stop deliveries for `token`. Unknown tokens are ignored.
    fn remove_updates(&self, token: FeedToken);
}

impl<F: LocationFeed + ?Sized> LocationFeed for Arc<F> {
    fn request_updates(
        &self,
        request: &LocationRequest,
        delegate: Arc<dyn LocationDelegate>,
    ) -> Result<FeedToken, LocationError> {
        (**self).request_updates(request, delegate)
    }

    fn remove_updates(&self, token: FeedToken) {
        (**self).remove_updates(token);
    }
}

/// The display side that consumes coordinates.
pub trait CoordinateSink {
    /// Show `coordinate`, replacing whatever was shown before.
    fn publish(&mut self, coordinate: Coordinate);
}
