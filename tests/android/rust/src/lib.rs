//! Android JNI harness for the marina screen.
//!
//! This crate is only compiled for Android targets.
//! To build: `cargo ndk -t arm64-v8a build -p marinamap-android`
//!
//! The host `com.marinamap.MapsActivity` forwards its lifecycle here and
//! calls `nativePump` on the UI thread whenever a bridge callback fires.
//! After a pump it reads `nativeCameraState` and redraws if the returned
//! revision changed.

#![cfg(target_os = "android")]
#![allow(non_snake_case)]

use std::cell::RefCell;

use jni::JNIEnv;
use jni::objects::{JObject, JString};
use jni::sys::{JNI_TRUE, jboolean, jdoubleArray, jlong, jsize};
use log::{error, info, warn};
use marinamap::location::sys::android::AndroidLocationFeed;
use marinamap::permission::sys::android::AndroidPermissions;
use marinamap::{AppConfig, MarinaScreen, ScreenEvent};

type Screen = MarinaScreen<AndroidPermissions, AndroidLocationFeed>;

/// Number of values returned by `nativeCameraState`.
const CAMERA_STATE_LEN: usize = 9;

thread_local! {
    static SCREEN: RefCell<Option<Screen>> = const { RefCell::new(None) };
}

fn init_logging() {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag("marinamap"),
    );
}

fn read_config(env: &mut JNIEnv<'_>, json: &JString<'_>) -> AppConfig {
    if json.is_null() {
        return AppConfig::default();
    }
    let text: String = match env.get_string(json) {
        Ok(text) => text.into(),
        Err(err) => {
            warn!("unreadable config string: {err}");
            return AppConfig::default();
        }
    };
    AppConfig::from_json_str(&text).unwrap_or_else(|err| {
        warn!("falling back to default config: {err}");
        AppConfig::default()
    })
}

/// Queue an event for the screen owned by this thread.
fn post(event: ScreenEvent) {
    SCREEN.with_borrow(|screen| match screen {
        Some(screen) => {
            if let Err(err) = screen.events().try_send(event) {
                warn!("dropping {event:?}: {err}");
            }
        }
        None => warn!("{event:?} before nativeOnCreate"),
    });
}

/// Build the screen and run the permission gate.
///
/// `config` may be null for the built-in marina defaults.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_marinamap_MapsActivity_nativeOnCreate<'local>(
    mut env: JNIEnv<'local>,
    activity: JObject<'local>,
    bridge: JObject<'local>,
    config: JString<'local>,
) {
    init_logging();
    let config = read_config(&mut env, &config);

    let permissions = match AndroidPermissions::new(&env, &activity) {
        Ok(permissions) => permissions,
        Err(err) => {
            error!("cannot bind permission backend: {err}");
            return;
        }
    };
    let feed = match AndroidLocationFeed::new(&env, &bridge) {
        Ok(feed) => feed,
        Err(err) => {
            error!("cannot bind location bridge: {err}");
            return;
        }
    };

    let mut screen = MarinaScreen::new(&config, permissions, feed);
    if let Err(err) = screen.events().try_send(ScreenEvent::Created) {
        error!("cannot queue create: {err}");
        return;
    }
    screen.pump();
    SCREEN.set(Some(screen));
    info!("marina screen created");
}

/// The activity became visible.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_marinamap_MapsActivity_nativeOnResume(
    _env: JNIEnv<'_>,
    _activity: JObject<'_>,
) {
    post(ScreenEvent::Resumed);
}

/// The activity is no longer visible.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_marinamap_MapsActivity_nativeOnPause(
    _env: JNIEnv<'_>,
    _activity: JObject<'_>,
) {
    post(ScreenEvent::Paused);
}

/// The user flipped the zoom switch.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_marinamap_MapsActivity_nativeOnZoomToggled(
    _env: JNIEnv<'_>,
    _activity: JObject<'_>,
    checked: jboolean,
) {
    post(ScreenEvent::ZoomToggled {
        checked: checked == JNI_TRUE,
    });
}

/// Tear the screen down. Late bridge callbacks are dropped afterwards.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_marinamap_MapsActivity_nativeOnDestroy(
    _env: JNIEnv<'_>,
    _activity: JObject<'_>,
) {
    if let Some(mut screen) = SCREEN.take() {
        if screen.events().try_send(ScreenEvent::Destroyed).is_ok() {
            screen.pump();
        }
        info!("marina screen destroyed");
    }
}

/// Handle everything queued. Returns the map revision, or -1 without a screen.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_marinamap_MapsActivity_nativePump(
    _env: JNIEnv<'_>,
    _activity: JObject<'_>,
) -> jlong {
    SCREEN.with_borrow_mut(|screen| {
        screen.as_mut().map_or(-1, |screen| {
            screen.pump();
            jlong::try_from(screen.map().revision()).unwrap_or(jlong::MAX)
        })
    })
}

/// Camera and marker for the map widget.
///
/// Returns `[lat, lng, zoom, bearing, tilt, markerLat, markerLng, zoomChecked, mapType]`
/// or null without a screen. `mapType` follows `GoogleMap.MAP_TYPE_*`.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_marinamap_MapsActivity_nativeCameraState(
    mut env: JNIEnv<'_>,
    _activity: JObject<'_>,
) -> jdoubleArray {
    use marinamap::map::MapType;

    let state: Option<[f64; CAMERA_STATE_LEN]> = SCREEN.with_borrow(|screen| {
        screen.as_ref().map(|screen| {
            let map = screen.map();
            let camera = map.camera();
            let map_type = match map.map_type() {
                MapType::Normal => 1.0,
                MapType::Satellite => 2.0,
                MapType::Terrain => 3.0,
                MapType::Hybrid => 4.0,
            };
            [
                camera.target.latitude,
                camera.target.longitude,
                f64::from(camera.zoom),
                f64::from(camera.bearing),
                f64::from(camera.tilt),
                map.marker().position.latitude,
                map.marker().position.longitude,
                if map.zoom_checked() { 1.0 } else { 0.0 },
                map_type,
            ]
        })
    });
    let Some(state) = state else {
        return std::ptr::null_mut();
    };

    let Ok(len) = jsize::try_from(state.len()) else {
        return std::ptr::null_mut();
    };
    let array = match env.new_double_array(len) {
        Ok(array) => array,
        Err(err) => {
            error!("cannot allocate camera state: {err}");
            return std::ptr::null_mut();
        }
    };
    if let Err(err) = env.set_double_array_region(&array, 0, &state) {
        error!("cannot fill camera state: {err}");
        return std::ptr::null_mut();
    }
    array.into_raw()
}
