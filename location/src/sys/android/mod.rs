//! Android location feed using JNI.
//!
//! Rust drives a host-side bridge object, normally a thin wrapper around
//! `FusedLocationProviderClient`, that must expose:
//!
//! - `void requestLocationUpdates(long handle, long intervalMs, long minIntervalMs, int priority)`
//! - `void removeLocationUpdates(long handle)`
//!
//! The bridge reports every `LocationCallback.onLocationResult` back through
//! `com.marinamap.bridge.LocationBridge.onLocationResult`, or through
//! `LocationBridge.onEmptyResult` when `lastLocation` is null. A
//! `SecurityException` thrown by `requestLocationUpdates` surfaces as
//! [`LocationError::PermissionDenied`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use jni::objects::{GlobalRef, JClass, JObject, JValue};
use jni::sys::{jdouble, jlong};
use jni::{JNIEnv, JavaVM};
use log::{error, warn};

use crate::{
    Coordinate, FeedToken, Location, LocationDelegate, LocationError, LocationFeed,
    LocationRequest, LocationResult,
};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);
static DELEGATES: OnceLock<Mutex<HashMap<u64, Arc<dyn LocationDelegate>>>> = OnceLock::new();

fn delegates() -> &'static Mutex<HashMap<u64, Arc<dyn LocationDelegate>>> {
    DELEGATES.get_or_init(|| Mutex::new(HashMap::new()))
}

fn millis(duration: std::time::Duration) -> jlong {
    jlong::try_from(duration.as_millis()).unwrap_or(jlong::MAX)
}

/// Location feed backed by the host's location bridge object.
pub struct AndroidLocationFeed {
    vm: JavaVM,
    bridge: GlobalRef,
}

impl fmt::Debug for AndroidLocationFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidLocationFeed").finish_non_exhaustive()
    }
}

impl AndroidLocationFeed {
    /// Bind to the host's location bridge object.
    ///
    /// # Errors
    /// Returns a `LocationError` if the JVM or a global reference cannot be obtained.
    pub fn new(env: &JNIEnv<'_>, bridge: &JObject<'_>) -> Result<Self, LocationError> {
        let vm = env.get_java_vm().map_err(map_jni_error)?;
        let bridge = env.new_global_ref(bridge).map_err(map_jni_error)?;
        Ok(Self { vm, bridge })
    }

    fn with_bridge<F>(&self, action: F) -> Result<(), LocationError>
    where
        F: FnOnce(&mut JNIEnv<'_>, &JObject<'_>) -> jni::errors::Result<()>,
    {
        let mut env = self.vm.attach_current_thread().map_err(map_jni_error)?;
        match action(&mut env, self.bridge.as_obj()) {
            Ok(()) => Ok(()),
            Err(jni::errors::Error::JavaException) => Err(take_exception(&mut env)),
            Err(err) => Err(map_jni_error(err)),
        }
    }
}

impl LocationFeed for AndroidLocationFeed {
    fn request_updates(
        &self,
        request: &LocationRequest,
        delegate: Arc<dyn LocationDelegate>,
    ) -> Result<FeedToken, LocationError> {
        let token = FeedToken(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed));
        delegates()
            .lock()
            .expect("delegate map mutex poisoned")
            .insert(token.0, delegate);

        #[allow(clippy::cast_possible_wrap)]
        let handle = token.0 as jlong;
        let started = self.with_bridge(|env, bridge| {
            env.call_method(
                bridge,
                "requestLocationUpdates",
                "(JJJI)V",
                &[
                    JValue::Long(handle),
                    JValue::Long(millis(request.interval())),
                    JValue::Long(millis(request.min_update_interval())),
                    JValue::Int(request.priority().android_code()),
                ],
            )?;
            Ok(())
        });

        if let Err(err) = started {
            delegates()
                .lock()
                .expect("delegate map mutex poisoned")
                .remove(&token.0);
            return Err(err);
        }

        Ok(token)
    }

    fn remove_updates(&self, token: FeedToken) {
        let known = delegates()
            .lock()
            .expect("delegate map mutex poisoned")
            .remove(&token.0)
            .is_some();
        if !known {
            return;
        }

        #[allow(clippy::cast_possible_wrap)]
        let handle = token.0 as jlong;
        if let Err(err) = self.with_bridge(|env, bridge| {
            env.call_method(bridge, "removeLocationUpdates", "(J)V", &[JValue::Long(handle)])?;
            Ok(())
        }) {
            error!("failed to remove Android location updates: {err}");
        }
    }
}

fn take_exception(env: &mut JNIEnv<'_>) -> LocationError {
    let throwable = env.exception_occurred();
    let _ = env.exception_clear();

    match throwable {
        Ok(throwable)
            if env
                .is_instance_of(&throwable, "java/lang/SecurityException")
                .unwrap_or(false) =>
        {
            LocationError::PermissionDenied
        }
        _ => LocationError::Platform("location bridge threw an exception".into()),
    }
}

/// A fix delivered by the host's `LocationCallback`.
///
/// A negative `accuracy` means the fix carries no accuracy estimate.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_marinamap_bridge_LocationBridge_onLocationResult(
    _env: JNIEnv<'_>,
    _class: JClass<'_>,
    handle: jlong,
    latitude: jdouble,
    longitude: jdouble,
    accuracy: jdouble,
    time_ms: jlong,
) {
    let location = Location {
        coordinate: Coordinate::new(latitude, longitude),
        altitude: None,
        horizontal_accuracy: (accuracy >= 0.0).then_some(accuracy),
        timestamp: u64::try_from(time_ms).unwrap_or(0),
    };
    emit(handle, location.into());
}

/// A callback whose `lastLocation` was null.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_marinamap_bridge_LocationBridge_onEmptyResult(
    _env: JNIEnv<'_>,
    _class: JClass<'_>,
    handle: jlong,
) {
    emit(handle, LocationResult::empty());
}

fn emit(handle: jlong, result: LocationResult) {
    #[allow(clippy::cast_sign_loss)]
    let handle = handle as u64;
    let delegate = {
        let map = delegates().lock().expect("delegate map mutex poisoned");
        map.get(&handle).cloned()
    };

    match delegate {
        Some(delegate) => delegate.on_result(result),
        // Removal races with callbacks already queued on the main looper.
        None => warn!("location result for inactive handle {handle}"),
    }
}

#[allow(clippy::needless_pass_by_value)]
fn map_jni_error(err: jni::errors::Error) -> LocationError {
    LocationError::Platform(err.to_string())
}
