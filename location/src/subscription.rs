use std::fmt;
use std::sync::Arc;

use async_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};

use crate::{
    AuthorizationState, Coordinate, CoordinateSink, FeedToken, LocationDelegate, LocationError,
    LocationFeed, LocationRequest, LocationResult,
};

/// Identifies one start/stop cycle of a [`LocationSubscriptionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A feed delivery tagged with the subscription that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionUpdate {
    /// Subscription the delivery belongs to.
    pub subscription: SubscriptionId,
    /// The delivery, or the error that ended the feed.
    pub result: Result<LocationResult, LocationError>,
}

/// Live registration with the platform feed.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    token: FeedToken,
}

impl SubscriptionHandle {
    /// Subscription this handle represents.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Token issued by the feed.
    #[must_use]
    pub const fn token(&self) -> FeedToken {
        self.token
    }
}

struct ChannelDelegate {
    subscription: SubscriptionId,
    sender: Sender<SubscriptionUpdate>,
}

impl fmt::Debug for ChannelDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelDelegate")
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

impl ChannelDelegate {
    fn send(&self, result: Result<LocationResult, LocationError>) {
        let update = SubscriptionUpdate {
            subscription: self.subscription,
            result,
        };
        if let Err(err) = self.sender.try_send(update) {
            warn!("dropping location result: {err}");
        }
    }
}

impl LocationDelegate for ChannelDelegate {
    fn on_result(&self, result: LocationResult) {
        self.send(Ok(result));
    }

    fn on_failure(&self, error: LocationError) {
        self.send(Err(error));
    }
}

/// Owns the single recurring location subscription.
///
/// Deliveries are queued on the receiver returned by
/// [`LocationSubscriptionManager::new`] and must be handed back through
/// [`LocationSubscriptionManager::accept`] on the thread that owns the manager.
#[derive(Debug)]
pub struct LocationSubscriptionManager<F: LocationFeed> {
    feed: F,
    request: LocationRequest,
    sender: Sender<SubscriptionUpdate>,
    active: Option<SubscriptionHandle>,
    next_id: u64,
    latest: Option<Coordinate>,
}

impl<F: LocationFeed> LocationSubscriptionManager<F> {
    /// Create a stopped manager and the queue its deliveries arrive on.
    pub fn new(feed: F, request: LocationRequest) -> (Self, Receiver<SubscriptionUpdate>) {
        let (sender, receiver) = unbounded();
        let manager = Self {
            feed,
            request,
            sender,
            active: None,
            next_id: 1,
            latest: None,
        };
        (manager, receiver)
    }

    /// Start the recurring subscription.
    ///
    /// Does nothing if a subscription is already active.
    ///
    /// # Errors
    /// Returns [`LocationError::PermissionDenied`] when `authorization` is not
    /// granted, or whatever the feed reports when it refuses to start.
    pub fn start(&mut self, authorization: AuthorizationState) -> Result<(), LocationError> {
        if !authorization.is_granted() {
            return Err(LocationError::PermissionDenied);
        }
        if self.active.is_some() {
            return Ok(());
        }

        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        let delegate = Arc::new(ChannelDelegate {
            subscription: id,
            sender: self.sender.clone(),
        });
        let token = self.feed.request_updates(&self.request, delegate)?;
        debug!("location subscription {} started ({:?})", id.0, self.request);

        self.active = Some(SubscriptionHandle { id, token });
        Ok(())
    }

    /// Cancel the active subscription, if any.
    pub fn stop(&mut self) {
        if let Some(handle) = self.active.take() {
            self.feed.remove_updates(handle.token);
            debug!("location subscription {} stopped", handle.id.0);
        }
    }

    /// Apply a queued delivery.
    ///
    /// Publishes the newest fix to `sink` and returns `true`. Deliveries from
    /// a stopped subscription and empty deliveries are dropped. A feed failure
    /// releases the active handle so the next [`start`](Self::start) begins
    /// a fresh subscription.
    pub fn accept<S>(&mut self, update: SubscriptionUpdate, sink: &mut S) -> bool
    where
        S: CoordinateSink + ?Sized,
    {
        if self.active.as_ref().map(SubscriptionHandle::id) != Some(update.subscription) {
            debug!("dropping result from inactive subscription {}", update.subscription.0);
            return false;
        }

        let result = match update.result {
            Ok(result) => result,
            Err(err) => {
                warn!("location subscription {} failed: {err}", update.subscription.0);
                self.stop();
                return false;
            }
        };
        let Some(location) = result.last_location() else {
            return false;
        };

        let coordinate = location.coordinate;
        self.latest = Some(coordinate);
        sink.publish(coordinate);
        true
    }

    /// Whether a subscription is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The active subscription, if any.
    #[must_use]
    pub const fn handle(&self) -> Option<&SubscriptionHandle> {
        self.active.as_ref()
    }

    /// The last coordinate published.
    #[must_use]
    pub const fn latest(&self) -> Option<Coordinate> {
        self.latest
    }

    /// The request used when starting.
    #[must_use]
    pub const fn request(&self) -> &LocationRequest {
        &self.request
    }

    /// The underlying feed.
    #[must_use]
    pub const fn feed(&self) -> &F {
        &self.feed
    }
}

impl<F: LocationFeed> Drop for LocationSubscriptionManager<F> {
    fn drop(&mut self) {
        self.stop();
    }
}
