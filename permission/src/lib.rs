//! Runtime location permission handling.
//!
//! This crate wraps the platform permission prompt behind
//! [`PermissionBackend`] and layers a [`PermissionGate`] on top of it that
//! asks the user at most once per cold start.

#![warn(missing_docs)]

mod gate;

/// Platform-specific implementations.
pub mod sys;

use std::fmt;

pub use gate::{GateSignal, PermissionGate};

/// Types of permissions that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Permission {
    /// Precise (GPS-level) device location.
    FineLocation,
    /// Approximate, network-based device location.
    CoarseLocation,
}

impl Permission {
    /// The Android manifest name of this permission.
    #[must_use]
    pub const fn android_name(self) -> &'static str {
        match self {
            Self::FineLocation => "android.permission.ACCESS_FINE_LOCATION",
            Self::CoarseLocation => "android.permission.ACCESS_COARSE_LOCATION",
        }
    }
}

/// The current status of a permission as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionStatus {
    /// Permission has been granted by the user.
    Granted,
    /// Permission has been denied by the user.
    Denied,
    /// The capability is unavailable (policy, parental controls, no hardware).
    Restricted,
    /// Permission has not been requested yet.
    NotDetermined,
}

/// Authorization as tracked by the application.
///
/// A request cycle moves `Unknown` to either `Granted` or `Denied`, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthorizationState {
    /// No decision known yet.
    #[default]
    Unknown,
    /// The user declined, or the capability is unavailable.
    Denied,
    /// The capability may be used.
    Granted,
}

impl AuthorizationState {
    /// Map a raw OS status onto the application's view of it.
    #[must_use]
    pub const fn from_status(status: PermissionStatus) -> Self {
        match status {
            PermissionStatus::Granted => Self::Granted,
            PermissionStatus::Denied | PermissionStatus::Restricted => Self::Denied,
            PermissionStatus::NotDetermined => Self::Unknown,
        }
    }

    /// The state reached when a request completes.
    #[must_use]
    pub const fn resolve(granted: bool) -> Self {
        if granted { Self::Granted } else { Self::Denied }
    }

    /// Whether the capability may be used.
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Errors that can occur when requesting permissions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    /// The permission type is not supported on this platform.
    #[error("permission not supported on this platform")]
    NotSupported,
    /// The platform failed to issue the request.
    #[error("platform error: {0}")]
    Platform(String),
}

/// Single-shot completion for a permission request.
///
/// The backend calls [`PermissionResponder::respond`] once the user has
/// answered. Dropping the responder without answering leaves the request
/// outstanding forever, which mirrors an OS dialog that never returns.
pub struct PermissionResponder {
    permission: Permission,
    callback: Box<dyn FnOnce(Permission, bool) + Send>,
}

impl PermissionResponder {
    /// Wrap a completion callback.
    pub fn new(
        permission: Permission,
        callback: impl FnOnce(Permission, bool) + Send + 'static,
    ) -> Self {
        Self {
            permission,
            callback: Box::new(callback),
        }
    }

    /// The permission this responder answers for.
    #[must_use]
    pub const fn permission(&self) -> Permission {
        self.permission
    }

    /// Deliver the user's answer.
    pub fn respond(self, granted: bool) {
        (self.callback)(self.permission, granted);
    }
}

impl fmt::Debug for PermissionResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionResponder")
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

/// A platform permission API.
pub trait PermissionBackend: fmt::Debug {
    /// Check the current status of a permission without prompting.
    fn check(&self, permission: Permission) -> PermissionStatus;

    /// Show the user-facing prompt for a permission.
    ///
    /// Returns as soon as the prompt is issued; the answer is delivered
    /// later through `responder`.
    ///
    /// # Errors
    /// Returns a [`PermissionError`] if the prompt cannot be shown.
    fn request(
        &self,
        permission: Permission,
        responder: PermissionResponder,
    ) -> Result<(), PermissionError>;
}

impl<B: PermissionBackend + ?Sized> PermissionBackend for std::sync::Arc<B> {
    fn check(&self, permission: Permission) -> PermissionStatus {
        (**self).check(permission)
    }

    fn request(
        &self,
        permission: Permission,
        responder: PermissionResponder,
    ) -> Result<(), PermissionError> {
        (**self).request(permission, responder)
    }
}
