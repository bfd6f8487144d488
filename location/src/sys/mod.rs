//! Platform-specific location feeds.

/// Android platform implementation.
#[cfg(target_os = "android")]
pub mod android;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::GeoClueFeed;

/// Fallback for platforms without a location feed.
#[cfg(not(any(target_os = "android", target_os = "linux")))]
mod fallback {
    use std::sync::Arc;

    use crate::{FeedToken, LocationDelegate, LocationError, LocationFeed, LocationRequest};

    /// A feed that never starts.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct UnsupportedFeed;

    impl LocationFeed for UnsupportedFeed {
        fn request_updates(
            &self,
            _request: &LocationRequest,
            _delegate: Arc<dyn LocationDelegate>,
        ) -> Result<FeedToken, LocationError> {
            Err(LocationError::NotAvailable)
        }

        fn remove_updates(&self, _token: FeedToken) {}
    }
}

#[cfg(not(any(target_os = "android", target_os = "linux")))]
pub use fallback::UnsupportedFeed;
