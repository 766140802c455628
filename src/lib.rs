//! # Geokit
//!
//! Location requests and watches for hybrid mobile apps.
//!
//! Geokit sits between a JavaScript-facing bridge and a platform location
//! provider. It validates requests, walks the user through enabling location
//! when the platform allows it, and keeps track of running watches so that a
//! clear never leaks a subscription.
//!
//! ## Features
//!
//! - `location`: the controller, watch registry, host bridge and simulator.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! geokit = { version = "0.1", features = ["location"] }
//! ```
//!
//! ```rust,ignore
//! use geokit::location::{GeolocationController, LocationOptions};
//! use geokit::location::sim::SimulatedLocationService;
//!
//! async fn get_coords() {
//!     let controller = GeolocationController::new(SimulatedLocationService::new());
//!     if let Ok(pos) = controller.get_current_position(&LocationOptions::default()).await {
//!         println!("Latitude: {}, Longitude: {}", pos.latitude, pos.longitude);
//!     }
//! }
//! ```

#[cfg(feature = "location")]
pub use geokit_location as location;
