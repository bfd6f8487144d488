//! Desktop test binary for the marina screen.
//!
//! Run with: `cargo run -p marinamap-desktop-test -- [config.json] [seconds]`
//!
//! Shows the screen for a while, printing every recenter, then backgrounds
//! and destroys it. Set `RUST_LOG=debug` for the full event trace.

use std::time::Duration;

use log::{error, info};
use marinamap::location::LocationFeed;
use marinamap::permission::PermissionBackend;
use marinamap::{AppConfig, MarinaScreen, ScreenEvent};

const DEFAULT_SECONDS: u64 = 60;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match AppConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                error!("{path}: {err}");
                std::process::exit(1);
            }
        },
        None => AppConfig::default(),
    };
    let seconds = args
        .next()
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_SECONDS);

    println!("=== Marina Screen Test ===\n");
    show(&config, Duration::from_secs(seconds)).await;
}

#[cfg(target_os = "linux")]
async fn show(config: &AppConfig, visible_for: Duration) {
    use marinamap::location::sys::GeoClueFeed;
    use marinamap::permission::sys::SystemPermissions;

    drive(MarinaScreen::new(config, SystemPermissions, GeoClueFeed::default()), visible_for).await;
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
async fn show(config: &AppConfig, visible_for: Duration) {
    use marinamap::location::sys::UnsupportedFeed;
    use marinamap::permission::sys::SystemPermissions;

    println!("No location backend on this platform; the map stays on the marina.\n");
    drive(MarinaScreen::new(config, SystemPermissions, UnsupportedFeed), visible_for).await;
}

#[cfg(target_os = "android")]
async fn show(_config: &AppConfig, _visible_for: Duration) {
    println!("Android runs the screen from the host activity; see marinamap-android.");
}

#[cfg_attr(target_os = "android", allow(dead_code))]
async fn drive<P, F>(mut screen: MarinaScreen<P, F>, visible_for: Duration)
where
    P: PermissionBackend,
    F: LocationFeed,
{
    let map = screen.map();
    println!(
        "Camera: {:.6}, {:.6} at zoom {}",
        map.camera().target.latitude,
        map.camera().target.longitude,
        map.camera().zoom
    );
    println!("Marker: {} ({})\n", map.marker().title, map.marker().snippet);

    let events = screen.events();
    for event in [ScreenEvent::Created, ScreenEvent::Resumed] {
        if let Err(err) = events.try_send(event) {
            error!("cannot queue {event:?}: {err}");
            return;
        }
    }

    let closer = tokio::spawn(async move {
        tokio::time::sleep(visible_for).await;
        info!("backgrounding after {visible_for:?}");
        for event in [ScreenEvent::Paused, ScreenEvent::Destroyed] {
            if events.send(event).await.is_err() {
                break;
            }
        }
    });

    screen.run().await;
    closer.abort();

    println!("\nAuthorization: {:?}", screen.authorization());
    match screen.latest_coordinate() {
        Some(coordinate) => println!(
            "✓ Last fix: {:.6}, {:.6}",
            coordinate.latitude, coordinate.longitude
        ),
        None => println!("✗ No fix received; still showing the marina"),
    }
}
