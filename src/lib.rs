//! # Marinamap
//!
//! A single-screen satellite map of Bald Head Island Marina that recenters
//! on the device's live location while the screen is visible.
//!
//! The crate is split the same way the screen works:
//!
//! - [`permission`]: the runtime location permission gate.
//! - [`location`]: the recurring location subscription.
//! - [`map`]: the camera, marker and zoom switch the map widget draws.
//! - [`screen`]: the lifecycle that ties them together.
//! - [`config`]: JSON configuration with defaults for everything.
//!
//! ## Example
//!
//! ```rust,ignore
//! use marinamap::{AppConfig, MarinaScreen, ScreenEvent};
//! use marinamap::location::sys::GeoClueFeed;
//! use marinamap::permission::sys::SystemPermissions;
//!
//! async fn show() {
//!     let config = AppConfig::default();
//!     let mut screen = MarinaScreen::new(&config, SystemPermissions, GeoClueFeed::default());
//!     let events = screen.events();
//!     events.try_send(ScreenEvent::Created).ok();
//!     events.try_send(ScreenEvent::Resumed).ok();
//!     screen.run().await;
//! }
//! ```

pub mod config;
pub mod map;
pub mod screen;

pub use marinamap_location as location;
pub use marinamap_permission as permission;

pub use config::{AppConfig, ConfigError};
pub use map::{CameraPosition, MapState, Marker};
pub use screen::{MarinaScreen, ScreenEvent};
