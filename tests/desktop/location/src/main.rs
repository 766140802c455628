//! Desktop smoke test for geokit-location, driven by the simulator.
//!
//! Run with: cargo run -p geokit-location-demo

use futures::StreamExt;
use geokit_location::bridge::{GeolocationPlugin, PermissionStatus};
use geokit_location::sim::{SimFix, SimSettings, SimulatedLocationService, SimulatedPermissions};
use geokit_location::{RawLocation, ResolutionOutcome};
use serde_json::json;

fn reading(time: i64) -> RawLocation {
    RawLocation {
        latitude: 37.331_7,
        longitude: -122.030_2,
        altitude: 56.0,
        accuracy: 4.5,
        vertical_accuracy: Some(3.0),
        bearing: 270.0,
        speed: 1.4,
        time,
    }
}

#[tokio::main]
async fn main() {
    println!("=== Geokit Location Test (desktop simulator) ===\n");

    let service = SimulatedLocationService::new();
    service.set_fix(SimFix::Respond(reading(1_700_000_000_000)));
    service.set_settings(SimSettings::NeedsResolution);
    let permissions = SimulatedPermissions::new(PermissionStatus::Prompt, PermissionStatus::Granted);
    let plugin = GeolocationPlugin::new(service, permissions);

    // Stand in for the user tapping "OK" on the enable-location prompt.
    let prompts = plugin.controller().service().prompts();
    let controller = plugin.controller().clone();
    tokio::spawn(async move {
        while let Ok(prompt) = prompts.recv().await {
            println!("Prompt {prompt:?} shown, accepting");
            controller.on_resolution_result(ResolutionOutcome::Accepted);
        }
    });

    println!("Checking location permission...");
    match plugin.check_permissions() {
        Ok(state) => println!("Permission status: {state:?}\n"),
        Err(e) => {
            println!("Permission check failed: {e}\n");
            return;
        }
    }

    println!("Getting current location...");
    match plugin.get_current_position(&json!({"timeout": 5000})).await {
        Ok(position) => {
            println!("✓ Location retrieved successfully!");
            println!("  Latitude:  {:.6}°", position.coords.latitude);
            println!("  Longitude: {:.6}°", position.coords.longitude);
            println!("  Altitude:  {:.1}m", position.coords.altitude);
            println!("  Accuracy:  {:.1}m", position.coords.accuracy);
            println!("  Timestamp: {}\n", position.timestamp);
        }
        Err(e) => println!("✗ Failed to get location: {e}\n"),
    }

    println!("Watching location...");
    plugin
        .controller()
        .service()
        .set_settings(SimSettings::Satisfied);
    let mut positions = match plugin.watch_position(&json!({}), "demo").await {
        Ok(positions) => positions,
        Err(e) => {
            println!("✗ Failed to start watch: {e}");
            return;
        }
    };

    // Polling the stream starts the watch, so the simulator has a subscription to feed.
    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(position) = positions.next().await {
            match position {
                Ok(position) => seen.push(position.timestamp),
                Err(e) => println!("✗ Watch error: {e}"),
            }
        }
        seen
    });

    while plugin.controller().active_watch_count() == 0 {
        tokio::task::yield_now().await;
    }
    plugin
        .controller()
        .service()
        .emit(&[vec![reading(1), reading(2)], vec![reading(3)]]);
    tokio::task::yield_now().await;

    match plugin.clear_watch(&json!({"id": "demo"})) {
        Ok(()) => println!("Watch cleared"),
        Err(e) => println!("✗ Failed to clear watch: {e}"),
    }

    match watcher.await {
        Ok(seen) => println!("✓ Watch delivered timestamps {seen:?}"),
        Err(e) => println!("✗ Watch task failed: {e}"),
    }
}
