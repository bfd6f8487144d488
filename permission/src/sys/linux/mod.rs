//! Linux permission implementation.
//!
//! Desktop Linux has no runtime prompt for location. Access is decided by
//! the GeoClue2 agent when the location client starts, so the permission
//! itself always reads as granted.

use crate::{Permission, PermissionBackend, PermissionError, PermissionResponder, PermissionStatus};

/// Permission backend for desktop Linux.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPermissions;

impl PermissionBackend for SystemPermissions {
    fn check(&self, _permission: Permission) -> PermissionStatus {
        PermissionStatus::Granted
    }

    fn request(
        &self,
        _permission: Permission,
        responder: PermissionResponder,
    ) -> Result<(), PermissionError> {
        // No prompt to show; answer straight away.
        responder.respond(true);
        Ok(())
    }
}
