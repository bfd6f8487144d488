//! Linux location feed using the GeoClue2 D-Bus service.
//!
//! Each subscription owns a GeoClue client on a dedicated thread that reads
//! the client's current fix once per target interval. GeoClue itself is
//! told the requested accuracy and the minimum interval so it can throttle
//! its sources.

use std::collections::HashMap;
use std::fmt::Display;
use std::pin::pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use futures::StreamExt;
use futures::stream::{self, AbortHandle, AbortRegistration, Abortable};
use futures_timer::Delay;
use log::{debug, error, warn};
use zbus::Connection;
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::{
    Coordinate, FeedToken, Location, LocationDelegate, LocationError, LocationFeed,
    LocationRequest, LocationResult, Priority,
};

const GEOCLUE_BUS: &str = "org.freedesktop.GeoClue2";
const MANAGER_PATH: &str = "/org/freedesktop/GeoClue2/Manager";
const MANAGER_IFACE: &str = "org.freedesktop.GeoClue2.Manager";
const CLIENT_IFACE: &str = "org.freedesktop.GeoClue2.Client";
const LOCATION_IFACE: &str = "org.freedesktop.GeoClue2.Location";
const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";
const ACCESS_DENIED: &str = "org.freedesktop.DBus.Error.AccessDenied";

// GClueAccuracyLevel
const ACCURACY_CITY: u32 = 4;
const ACCURACY_STREET: u32 = 6;
const ACCURACY_EXACT: u32 = 8;

/// GeoClue reports an unknown altitude as `-DBL_MAX`.
const UNKNOWN_ALTITUDE: f64 = f64::MIN;

const fn accuracy_level(priority: Priority) -> u32 {
    match priority {
        Priority::HighAccuracy => ACCURACY_EXACT,
        Priority::Balanced => ACCURACY_STREET,
        Priority::LowPower | Priority::Passive => ACCURACY_CITY,
    }
}

fn platform(context: &str, err: impl Display) -> LocationError {
    LocationError::Platform(format!("{context}: {err}"))
}

struct GeoClueSession {
    connection: Connection,
    client: OwnedObjectPath,
}

impl GeoClueSession {
    async fn open(desktop_id: &str, request: &LocationRequest) -> Result<Self, LocationError> {
        let connection = Connection::system()
            .await
            .map_err(|e| platform("D-Bus connection failed", e))?;

        let reply: (OwnedObjectPath,) = connection
            .call_method(
                Some(GEOCLUE_BUS),
                MANAGER_PATH,
                Some(MANAGER_IFACE),
                "GetClient",
                &(),
            )
            .await
            .map_err(|e| platform("GeoClue2 not available", e))?
            .body()
            .deserialize()
            .map_err(|e| platform("failed to parse GetClient reply", e))?;

        let session = Self {
            connection,
            client: reply.0,
        };

        let threshold =
            u32::try_from(request.min_update_interval().as_secs()).unwrap_or(u32::MAX);
        session
            .set_client_property("DesktopId", Value::from(desktop_id))
            .await?;
        session
            .set_client_property(
                "RequestedAccuracyLevel",
                Value::from(accuracy_level(request.priority())),
            )
            .await?;
        session
            .set_client_property("TimeThreshold", Value::from(threshold))
            .await?;

        session
            .connection
            .call_method(
                Some(GEOCLUE_BUS),
                session.client.as_str(),
                Some(CLIENT_IFACE),
                "Start",
                &(),
            )
            .await
            .map_err(|err| match &err {
                zbus::Error::MethodError(name, _, _) if name.as_str() == ACCESS_DENIED => {
                    LocationError::PermissionDenied
                }
                _ => platform("failed to start GeoClue client", &err),
            })?;

        Ok(session)
    }

    async fn set_client_property(&self, name: &str, value: Value<'_>) -> Result<(), LocationError> {
        self.connection
            .call_method(
                Some(GEOCLUE_BUS),
                self.client.as_str(),
                Some(PROPERTIES_IFACE),
                "Set",
                &(CLIENT_IFACE, name, value),
            )
            .await
            .map_err(|e| platform(&format!("failed to set {name}"), e))?;
        Ok(())
    }

    async fn property(&self, path: &str, interface: &str, name: &str) -> zbus::Result<OwnedValue> {
        let reply = self
            .connection
            .call_method(
                Some(GEOCLUE_BUS),
                path,
                Some(PROPERTIES_IFACE),
                "Get",
                &(interface, name),
            )
            .await?;
        reply.body().deserialize()
    }

    async fn number(&self, path: &str, name: &str) -> Result<f64, LocationError> {
        let value = self
            .property(path, LOCATION_IFACE, name)
            .await
            .map_err(|e| platform(&format!("failed to get {name}"), e))?;
        f64::try_from(value).map_err(|e| platform(&format!("unexpected {name} value"), e))
    }

    /// The client's current fix, or `None` before the first one.
    async fn read(&self) -> Result<Option<Location>, LocationError> {
        let value = self
            .property(self.client.as_str(), CLIENT_IFACE, "Location")
            .await
            .map_err(|e| platform("failed to get location", e))?;
        let path = OwnedObjectPath::try_from(value)
            .map_err(|e| platform("failed to parse location path", e))?;
        if path.as_str() == "/" {
            return Ok(None);
        }

        let latitude = self.number(path.as_str(), "Latitude").await?;
        let longitude = self.number(path.as_str(), "Longitude").await?;
        let altitude = self
            .number(path.as_str(), "Altitude")
            .await
            .ok()
            .filter(|alt| *alt > UNKNOWN_ALTITUDE);
        let horizontal_accuracy = self.number(path.as_str(), "Accuracy").await.ok();

        Ok(Some(Location {
            coordinate: Coordinate::new(latitude, longitude),
            altitude,
            horizontal_accuracy,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or(0),
        }))
    }

    async fn close(self) {
        let _ = self
            .connection
            .call_method(
                Some(GEOCLUE_BUS),
                self.client.as_str(),
                Some(CLIENT_IFACE),
                "Stop",
                &(),
            )
            .await;
    }
}

async fn run_feed(
    desktop_id: String,
    request: LocationRequest,
    delegate: Arc<dyn LocationDelegate>,
    registration: AbortRegistration,
) {
    let session = match GeoClueSession::open(&desktop_id, &request).await {
        Ok(session) => session,
        Err(err) => {
            error!("GeoClue feed failed to start: {err}");
            delegate.on_failure(err);
            return;
        }
    };

    let interval = request.interval();
    let ticks = stream::unfold(true, move |first| async move {
        if !first {
            Delay::new(interval).await;
        }
        Some(((), false))
    });
    let mut ticks = pin!(Abortable::new(ticks, registration));

    while ticks.next().await.is_some() {
        match session.read().await {
            Ok(Some(location)) => delegate.on_result(location.into()),
            Ok(None) => delegate.on_result(LocationResult::empty()),
            Err(err) => warn!("GeoClue read failed: {err}"),
        }
    }

    session.close().await;
    debug!("GeoClue feed stopped");
}

/// Location feed backed by GeoClue2.
#[derive(Debug)]
pub struct GeoClueFeed {
    desktop_id: String,
    next: AtomicU64,
    running: Mutex<HashMap<FeedToken, AbortHandle>>,
}

impl GeoClueFeed {
    /// Create a feed that identifies itself to GeoClue as `desktop_id`.
    ///
    /// The id must match an installed `.desktop` file for the GeoClue agent
    /// to authorize it.
    pub fn new(desktop_id: impl Into<String>) -> Self {
        Self {
            desktop_id: desktop_id.into(),
            next: AtomicU64::new(1),
            running: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for GeoClueFeed {
    fn default() -> Self {
        Self::new("marinamap")
    }
}

impl LocationFeed for GeoClueFeed {
    fn request_updates(
        &self,
        request: &LocationRequest,
        delegate: Arc<dyn LocationDelegate>,
    ) -> Result<FeedToken, LocationError> {
        let token = FeedToken(self.next.fetch_add(1, Ordering::Relaxed));
        let (abort, registration) = AbortHandle::new_pair();
        self.running
            .lock()
            .expect("feed registry mutex poisoned")
            .insert(token, abort);

        let desktop_id = self.desktop_id.clone();
        let request = *request;
        let spawned = thread::Builder::new()
            .name(format!("geoclue-feed-{}", token.0))
            .spawn(move || {
                futures::executor::block_on(run_feed(desktop_id, request, delegate, registration));
            });

        if let Err(err) = spawned {
            self.running
                .lock()
                .expect("feed registry mutex poisoned")
                .remove(&token);
            return Err(platform("failed to spawn feed thread", err));
        }

        Ok(token)
    }

    fn remove_updates(&self, token: FeedToken) {
        let abort = self
            .running
            .lock()
            .expect("feed registry mutex poisoned")
            .remove(&token);
        if let Some(abort) = abort {
            abort.abort();
        }
    }
}

impl Drop for GeoClueFeed {
    fn drop(&mut self) {
        if let Ok(running) = self.running.get_mut() {
            for (_, abort) in running.drain() {
                abort.abort();
            }
        }
    }
}
