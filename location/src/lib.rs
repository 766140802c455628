//! Location requests and watches for hybrid mobile apps.
//!
//! This crate coordinates a platform location provider behind one
//! cross-platform contract: get the current position, or watch it
//! continuously under a caller-chosen id. It runs the precondition checks
//! (timeout, service availability, settings), bridges the platform's
//! enable-location prompt back into the waiting request, and keeps a registry
//! of running watches that tolerates a clear arriving before its watch has
//! started.
//!
//! The platform itself is reached through the [`LocationService`] trait.
//! [`sim::SimulatedLocationService`] is an in-memory implementation for
//! desktop development and tests; [`bridge`] exposes the controller to a
//! JSON-speaking host bridge.
//!
//! # Usage
//!
//! ```ignore
//! use futures::StreamExt;
//! use geokit_location::{GeolocationController, LocationOptions};
//!
//! let controller = GeolocationController::new(service);
//! let options = LocationOptions::new(5000).with_high_accuracy(true);
//!
//! let position = controller.get_current_position(&options).await?;
//! println!("{}, {}", position.latitude, position.longitude);
//!
//! let mut watch = controller.add_watch(options, "trip");
//! while let Some(batch) = watch.next().await {
//!     println!("{batch:?}");
//! }
//! ```

#![warn(missing_docs)]

pub mod bridge;
mod config;
mod controller;
mod error;
mod options;
mod position;
mod registry;
mod resolution;
mod service;
pub mod sim;
mod watch;

pub use config::GeolocationConfig;
pub use controller::GeolocationController;
pub use error::GeolocationError;
pub use options::{LocationOptions, SINGLE_SHOT_INTERVAL};
pub use position::{LocationResult, RawLocation};
pub use registry::{Registration, WatchId, WatchOwner, WatchRegistry};
pub use resolution::{ResolutionOutcome, SettingsResolutionCoordinator};
pub use service::{LocationService, ServiceAvailability, SettingsCheck, UpdateSink};
pub use watch::{WatchItem, WatchStream};
