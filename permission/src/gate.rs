use log::{debug, warn};

use crate::{
    AuthorizationState, Permission, PermissionBackend, PermissionResponder, PermissionStatus,
};

/// What the gate tells its owner after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    /// Authorization is held; location work may begin.
    Proceed,
    /// A prompt is on screen; wait for [`PermissionGate::on_result`].
    Pending,
    /// Authorization was refused and will not be asked for again.
    Blocked,
}

/// Asks for one permission at most once per cold start.
#[derive(Debug)]
pub struct PermissionGate {
    permission: Permission,
    state: AuthorizationState,
    requested: bool,
    awaiting: bool,
}

impl PermissionGate {
    /// Create a gate for `permission` in the `Unknown` state.
    #[must_use]
    pub const fn new(permission: Permission) -> Self {
        Self {
            permission,
            state: AuthorizationState::Unknown,
            requested: false,
            awaiting: false,
        }
    }

    /// The permission guarded by this gate.
    #[must_use]
    pub const fn permission(&self) -> Permission {
        self.permission
    }

    /// Current authorization.
    #[must_use]
    pub const fn state(&self) -> AuthorizationState {
        self.state
    }

    /// Whether a prompt is outstanding.
    #[must_use]
    pub const fn is_awaiting(&self) -> bool {
        self.awaiting
    }

    /// Check authorization and prompt the user if needed.
    ///
    /// The prompt is issued at most once over the lifetime of the gate.
    /// Its answer comes back through `on_answer`, which the caller should
    /// route into [`PermissionGate::on_result`].
    pub fn activate<B, F>(&mut self, backend: &B, on_answer: F) -> GateSignal
    where
        B: PermissionBackend + ?Sized,
        F: FnOnce(Permission, bool) + Send + 'static,
    {
        if self.awaiting {
            return GateSignal::Pending;
        }

        match backend.check(self.permission) {
            PermissionStatus::Granted => {
                self.state = AuthorizationState::Granted;
                return GateSignal::Proceed;
            }
            PermissionStatus::Restricted => {
                debug!("{:?} is restricted on this device", self.permission);
                self.state = AuthorizationState::Denied;
                return GateSignal::Blocked;
            }
            PermissionStatus::Denied | PermissionStatus::NotDetermined => {}
        }

        if self.requested {
            self.state = AuthorizationState::Denied;
            return GateSignal::Blocked;
        }

        self.requested = true;
        let responder = PermissionResponder::new(self.permission, on_answer);
        match backend.request(self.permission, responder) {
            Ok(()) => {
                self.awaiting = true;
                GateSignal::Pending
            }
            Err(err) => {
                warn!("cannot request {:?}: {err}", self.permission);
                self.state = AuthorizationState::Denied;
                GateSignal::Blocked
            }
        }
    }

    /// Apply the user's answer to the outstanding prompt.
    ///
    /// Answers that arrive while nothing is outstanding are ignored.
    pub fn on_result(&mut self, granted: bool) -> GateSignal {
        if !self.awaiting {
            warn!("ignoring unsolicited {:?} result", self.permission);
            return self.signal();
        }

        self.awaiting = false;
        self.state = AuthorizationState::resolve(granted);
        debug!("{:?} resolved to {:?}", self.permission, self.state);
        self.signal()
    }

    /// Re-read the OS status, as done when the screen resumes.
    pub fn requery<B>(&mut self, backend: &B) -> AuthorizationState
    where
        B: PermissionBackend + ?Sized,
    {
        self.state = match backend.check(self.permission) {
            PermissionStatus::Granted => AuthorizationState::Granted,
            PermissionStatus::Restricted => AuthorizationState::Denied,
            _ if self.requested && !self.awaiting => AuthorizationState::Denied,
            _ => AuthorizationState::Unknown,
        };
        self.state
    }

    const fn signal(&self) -> GateSignal {
        match self.state {
            AuthorizationState::Granted => GateSignal::Proceed,
            AuthorizationState::Denied => GateSignal::Blocked,
            AuthorizationState::Unknown => GateSignal::Pending,
        }
    }
}
