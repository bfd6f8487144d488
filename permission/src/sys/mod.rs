//! Platform-specific permission implementations.

/// Android platform implementation.
#[cfg(target_os = "android")]
pub mod android;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::SystemPermissions;

/// Fallback for platforms without a permission backend.
#[cfg(not(any(target_os = "android", target_os = "linux")))]
mod fallback {
    use crate::{Permission, PermissionBackend, PermissionError, PermissionResponder, PermissionStatus};

    /// Reports every permission as unavailable.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SystemPermissions;

    impl PermissionBackend for SystemPermissions {
        fn check(&self, _permission: Permission) -> PermissionStatus {
            PermissionStatus::Restricted
        }

        fn request(
            &self,
            _permission: Permission,
            _responder: PermissionResponder,
        ) -> Result<(), PermissionError> {
            Err(PermissionError::NotSupported)
        }
    }
}

#[cfg(not(any(target_os = "android", target_os = "linux")))]
pub use fallback::SystemPermissions;
