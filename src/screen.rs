//! The single map screen and its lifecycle.

use std::pin::pin;

use async_channel::{Receiver, Sender, unbounded};
use futures::StreamExt;
use futures::stream;
use log::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::location::{
    AuthorizationState, Coordinate, LocationFeed, LocationSubscriptionManager, SubscriptionUpdate,
};
use crate::map::MapState;
use crate::permission::{GateSignal, Permission, PermissionBackend, PermissionGate};

/// Something that happened to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenEvent {
    /// The screen was created. Runs the permission gate.
    Created,
    /// The screen became visible.
    Resumed,
    /// The screen is no longer visible.
    Paused,
    /// The screen is gone. Ends [`MarinaScreen::run`].
    Destroyed,
    /// The user answered the permission prompt.
    PermissionResult {
        /// Whether access was granted.
        granted: bool,
    },
    /// The user flipped the zoom switch.
    ZoomToggled {
        /// New switch position.
        checked: bool,
    },
}

enum Incoming {
    Screen(ScreenEvent),
    Location(SubscriptionUpdate),
}

/// Binds the permission gate and the location subscription to the screen
/// lifecycle, and feeds coordinates into the map state.
///
/// All state is touched from whichever thread drives [`MarinaScreen::pump`]
/// or [`MarinaScreen::run`]; platform callbacks only enqueue messages.
#[derive(Debug)]
pub struct MarinaScreen<P: PermissionBackend, F: LocationFeed> {
    permissions: P,
    gate: PermissionGate,
    locations: LocationSubscriptionManager<F>,
    map: MapState,
    visible: bool,
    destroyed: bool,
    sender: Sender<ScreenEvent>,
    events: Receiver<ScreenEvent>,
    updates: Receiver<SubscriptionUpdate>,
}

impl<P: PermissionBackend, F: LocationFeed> MarinaScreen<P, F> {
    /// Create a screen that has not been shown yet.
    pub fn new(config: &AppConfig, permissions: P, feed: F) -> Self {
        let (locations, updates) =
            LocationSubscriptionManager::new(feed, config.location.request());
        let (sender, events) = unbounded();
        Self {
            permissions,
            gate: PermissionGate::new(Permission::FineLocation),
            locations,
            map: MapState::new(config),
            visible: false,
            destroyed: false,
            sender,
            events,
            updates,
        }
    }

    /// Queue for lifecycle and input events.
    #[must_use]
    pub fn events(&self) -> Sender<ScreenEvent> {
        self.sender.clone()
    }

    /// Current map state.
    #[must_use]
    pub const fn map(&self) -> &MapState {
        &self.map
    }

    /// Current authorization.
    #[must_use]
    pub const fn authorization(&self) -> AuthorizationState {
        self.gate.state()
    }

    /// Whether a location subscription is active.
    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        self.locations.is_active()
    }

    /// Whether the screen is visible.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether [`ScreenEvent::Destroyed`] has been handled.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The last coordinate shown.
    #[must_use]
    pub const fn latest_coordinate(&self) -> Option<Coordinate> {
        self.locations.latest()
    }

    /// The subscription manager.
    #[must_use]
    pub const fn locations(&self) -> &LocationSubscriptionManager<F> {
        &self.locations
    }

    /// Handle one event.
    pub fn dispatch(&mut self, event: ScreenEvent) {
        if self.destroyed {
            warn!("ignoring {event:?} after destroy");
            return;
        }
        debug!("screen event {event:?}");

        match event {
            ScreenEvent::Created => {
                let sender = self.sender.clone();
                let signal = self.gate.activate(&self.permissions, move |_, granted| {
                    if let Err(err) = sender.try_send(ScreenEvent::PermissionResult { granted }) {
                        warn!("dropping permission result: {err}");
                    }
                });
                self.on_gate(signal);
            }
            ScreenEvent::Resumed => {
                self.visible = true;
                if self.gate.requery(&self.permissions).is_granted() {
                    self.start_updates();
                } else {
                    self.locations.stop();
                }
            }
            ScreenEvent::Paused => {
                self.visible = false;
                self.locations.stop();
            }
            ScreenEvent::Destroyed => {
                self.visible = false;
                self.locations.stop();
                self.destroyed = true;
            }
            ScreenEvent::PermissionResult { granted } => {
                let signal = self.gate.on_result(granted);
                self.on_gate(signal);
            }
            ScreenEvent::ZoomToggled { checked } => {
                self.map.set_zoom_toggle(checked);
            }
        }
    }

    /// Handle one location delivery.
    pub fn apply_update(&mut self, update: SubscriptionUpdate) {
        if !self.locations.accept(update, &mut self.map) {
            return;
        }
        if let Some(coordinate) = self.locations.latest() {
            info!(
                "recentered on {:.6}, {:.6}",
                coordinate.latitude, coordinate.longitude
            );
        }
    }

    /// Handle everything already queued, without waiting.
    ///
    /// Returns the number of messages handled. Meant for hosts that own the
    /// UI loop and call in after posting events.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let mut progressed = false;
            while let Ok(event) = self.events.try_recv() {
                self.dispatch(event);
                handled += 1;
                progressed = true;
            }
            while let Ok(update) = self.updates.try_recv() {
                self.apply_update(update);
                handled += 1;
                progressed = true;
            }
            if !progressed {
                return handled;
            }
        }
    }

    /// Handle messages as they arrive until the screen is destroyed.
    pub async fn run(&mut self) {
        let events = self.events.clone().map(Incoming::Screen);
        let updates = self.updates.clone().map(Incoming::Location);
        let mut incoming = pin!(stream::select(events, updates));

        while !self.destroyed {
            let Some(message) = incoming.next().await else {
                break;
            };
            match message {
                Incoming::Screen(event) => self.dispatch(event),
                Incoming::Location(update) => self.apply_update(update),
            }
        }
        info!("screen loop finished");
    }

    fn on_gate(&mut self, signal: GateSignal) {
        match signal {
            GateSignal::Proceed if self.visible => self.start_updates(),
            GateSignal::Proceed | GateSignal::Pending => {}
            GateSignal::Blocked => {
                info!("location permission denied; staying on the marina");
                self.locations.stop();
            }
        }
    }

    fn start_updates(&mut self) {
        if let Err(err) = self.locations.start(self.gate.state()) {
            error!("cannot start location updates: {err}");
        }
    }
}
