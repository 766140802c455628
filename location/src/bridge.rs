//! JSON-facing glue between a hybrid-app bridge and a [`GeolocationController`].
//!
//! Arguments arrive as [`serde_json::Value`]s and results leave as
//! serializable payloads. Every failure is reported as a [`PluginError`]
//! carrying a stable `OS-PLUG-GEO-NNNN` code.

use std::future::Future;
use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    GeolocationConfig, GeolocationController, GeolocationError, LocationOptions, LocationResult,
    LocationService, ResolutionOutcome,
};

/// Permission aliases the bridge asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Precise location.
    Location,
    /// Approximate location.
    CoarseLocation,
}

/// The current status of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    /// Permission has been granted by the user.
    Granted,
    /// Permission has been denied by the user.
    Denied,
    /// Permission has not been requested yet.
    Prompt,
}

/// Host permission system.
pub trait PermissionProvider: Send + Sync + 'static {
    /// Check the current status of a permission without requesting it.
    fn check(&self, permission: Permission) -> PermissionStatus;

    /// Request a permission from the user.
    ///
    /// If the permission has already been granted or denied, this resolves
    /// to the current status without showing a prompt.
    fn request(&self, permission: Permission) -> impl Future<Output = PermissionStatus> + Send;
}

/// Status of both location permission aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionState {
    /// Precise location.
    pub location: PermissionStatus,
    /// Approximate location.
    pub coarse_location: PermissionStatus,
}

/// Failure categories reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Location services are unavailable but the user can fix it.
    ServicesResolvable,
    /// Location services are unavailable.
    ServicesError,
    /// The call arguments are malformed.
    InvalidInput,
    /// No fix arrived in time.
    LocationTimeout,
    /// Any other failure while obtaining a location.
    General,
    /// The user refused location permission.
    PermissionDenied,
    /// The user declined to enable location.
    EnableRequestDenied,
    /// The location settings check failed.
    SettingsError,
    /// The timeout is not positive.
    InvalidTimeout,
    /// No watch is registered under the given id.
    WatchIdNotFound,
    /// The watch id is missing or blank.
    WatchIdNotProvided,
    /// Location is switched off at the OS level.
    LocationDisabled,
}

impl ErrorKind {
    /// Numeric part of the error code.
    #[must_use]
    pub const fn number(self) -> u16 {
        match self {
            Self::ServicesResolvable => 1,
            Self::ServicesError => 2,
            Self::InvalidInput => 3,
            Self::LocationTimeout => 4,
            Self::General => 5,
            Self::PermissionDenied => 6,
            Self::EnableRequestDenied => 7,
            Self::SettingsError => 8,
            Self::InvalidTimeout => 9,
            Self::WatchIdNotFound => 10,
            Self::WatchIdNotProvided => 11,
            Self::LocationDisabled => 12,
        }
    }

    /// The code reported to the host, e.g. `OS-PLUG-GEO-0004`.
    #[must_use]
    pub fn code(self) -> String {
        format!("OS-PLUG-GEO-{:04}", self.number())
    }

    /// Human-readable message reported to the host.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ServicesResolvable => "Location services error, user resolvable.",
            Self::ServicesError => "Location services error.",
            Self::InvalidInput => "The input parameters aren't valid.",
            Self::LocationTimeout => "Could not obtain location in time. Try with a higher timeout.",
            Self::General => "There was an error trying to obtain the location.",
            Self::PermissionDenied => "Location permission request was denied.",
            Self::EnableRequestDenied => "Request to enable location denied.",
            Self::SettingsError => "Location settings error.",
            Self::InvalidTimeout => "Timeout needs to be a positive value.",
            Self::WatchIdNotFound => "WatchId not found.",
            Self::WatchIdNotProvided => "WatchId needs to be provided.",
            Self::LocationDisabled => "Location services are not enabled.",
        }
    }
}

/// A failure as the host sees it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{code}: {message}")]
pub struct PluginError {
    /// Stable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    #[serde(skip)]
    kind: ErrorKind,
}

impl PluginError {
    /// The category of this failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<ErrorKind> for PluginError {
    fn from(kind: ErrorKind) -> Self {
        Self {
            code: kind.code(),
            message: kind.message().to_owned(),
            kind,
        }
    }
}

impl From<GeolocationError> for PluginError {
    fn from(err: GeolocationError) -> Self {
        let kind = match err {
            GeolocationError::InvalidTimeout => ErrorKind::InvalidTimeout,
            GeolocationError::ServiceUnavailable { resolvable: true } => {
                ErrorKind::ServicesResolvable
            }
            GeolocationError::ServiceUnavailable { resolvable: false } => ErrorKind::ServicesError,
            GeolocationError::SettingsCheckFailed { .. } => ErrorKind::SettingsError,
            GeolocationError::RequestDenied => ErrorKind::EnableRequestDenied,
            GeolocationError::LocationTimeout => ErrorKind::LocationTimeout,
            GeolocationError::Platform(_) => ErrorKind::General,
        };
        kind.into()
    }
}

/// Coordinates of a position payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: f32,
    /// Altitude in meters.
    pub altitude: f64,
    /// Vertical accuracy in meters, when the platform reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude_accuracy: Option<f32>,
    /// Speed in meters per second.
    pub speed: f32,
    /// Heading in degrees.
    pub heading: f32,
}

/// A position as delivered to the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    /// Fix time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Where the device was.
    pub coords: Coordinates,
}

impl From<LocationResult> for Position {
    fn from(location: LocationResult) -> Self {
        Self {
            timestamp: location.timestamp,
            coords: Coordinates {
                latitude: location.latitude,
                longitude: location.longitude,
                accuracy: location.accuracy,
                altitude: location.altitude,
                altitude_accuracy: location.altitude_accuracy,
                speed: location.speed,
                heading: location.heading,
            },
        }
    }
}

/// Positions of a watch, one per item, or failures.
pub type PositionStream = Pin<Box<dyn Stream<Item = Result<Position, PluginError>> + Send>>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionArgs {
    timeout: Option<i64>,
    maximum_age: Option<i64>,
    enable_high_accuracy: Option<bool>,
    minimum_update_interval: Option<i64>,
}

fn non_negative(value: Option<i64>, default: u64) -> Result<u64, PluginError> {
    value.map_or(Ok(default), |value| {
        u64::try_from(value).map_err(|_| ErrorKind::InvalidInput.into())
    })
}

/// Location plugin exposed to a hybrid-app bridge.
#[derive(Debug)]
pub struct GeolocationPlugin<S: LocationService, P: PermissionProvider> {
    controller: GeolocationController<S>,
    permissions: P,
}

impl<S: LocationService, P: PermissionProvider> GeolocationPlugin<S, P> {
    /// Create a plugin with default configuration.
    pub fn new(service: S, permissions: P) -> Self {
        Self::with_config(service, permissions, GeolocationConfig::default())
    }

    /// Create a plugin whose argument defaults come from `config`.
    pub fn with_config(service: S, permissions: P, config: GeolocationConfig) -> Self {
        Self {
            controller: GeolocationController::with_config(service, config),
            permissions,
        }
    }

    /// The controller behind this plugin.
    #[must_use]
    pub const fn controller(&self) -> &GeolocationController<S> {
        &self.controller
    }

    /// The host permission system.
    #[must_use]
    pub const fn permissions(&self) -> &P {
        &self.permissions
    }

    /// Parse call arguments into options, filling gaps from the configuration.
    ///
    /// # Errors
    /// Returns [`ErrorKind::InvalidInput`] if `args` is neither an object nor
    /// null, a field has the wrong type, or an interval is negative.
    pub fn parse_options(&self, args: &Value) -> Result<LocationOptions, PluginError> {
        let parsed = match args {
            Value::Null => PositionArgs::default(),
            Value::Object(_) => PositionArgs::deserialize(args).map_err(|err| {
                debug!("rejecting location arguments: {err}");
                PluginError::from(ErrorKind::InvalidInput)
            })?,
            _ => return Err(ErrorKind::InvalidInput.into()),
        };

        let config = self.controller.config();
        Ok(
            LocationOptions::new(parsed.timeout.unwrap_or(config.default_timeout_millis))
                .with_maximum_age(non_negative(
                    parsed.maximum_age,
                    config.default_maximum_age_millis,
                )?)
                .with_high_accuracy(
                    parsed
                        .enable_high_accuracy
                        .unwrap_or(config.default_high_accuracy),
                )
                .with_min_update_interval(Some(non_negative(
                    parsed.minimum_update_interval,
                    config.default_min_update_interval_millis,
                )?)),
        )
    }

    fn ensure_enabled(&self) -> Result<(), PluginError> {
        if self.controller.are_location_services_enabled() {
            Ok(())
        } else {
            Err(ErrorKind::LocationDisabled.into())
        }
    }

    fn permission_state(&self) -> PermissionState {
        PermissionState {
            location: self.permissions.check(Permission::Location),
            coarse_location: self.permissions.check(Permission::CoarseLocation),
        }
    }

    /// Report the status of both permission aliases.
    ///
    /// # Errors
    /// Returns [`ErrorKind::LocationDisabled`] if location is switched off.
    pub fn check_permissions(&self) -> Result<PermissionState, PluginError> {
        self.ensure_enabled()?;
        Ok(self.permission_state())
    }

    /// Request both permission aliases, then report their status.
    ///
    /// # Errors
    /// Returns [`ErrorKind::LocationDisabled`] if location is switched off.
    pub async fn request_permissions(&self) -> Result<PermissionState, PluginError> {
        self.ensure_enabled()?;
        for permission in [Permission::Location, Permission::CoarseLocation] {
            if self.permissions.check(permission) != PermissionStatus::Granted {
                self.permissions.request(permission).await;
            }
        }
        Ok(self.permission_state())
    }

    /// Make sure the alias matching the accuracy mode is granted, asking once if not.
    async fn ensure_permission(&self, options: &LocationOptions) -> Result<(), PluginError> {
        let alias = if options.enable_high_accuracy() {
            Permission::Location
        } else {
            Permission::CoarseLocation
        };
        if self.permissions.check(alias) == PermissionStatus::Granted {
            return Ok(());
        }

        debug!("requesting {alias:?} permission");
        self.permissions.request(alias).await;
        // Coarse access is enough to serve the request.
        if self.permissions.check(Permission::CoarseLocation) == PermissionStatus::Granted {
            Ok(())
        } else {
            Err(ErrorKind::PermissionDenied.into())
        }
    }

    /// Get the device's current position.
    ///
    /// # Errors
    /// Returns a [`PluginError`] for malformed arguments, refused permission,
    /// or any controller failure.
    pub async fn get_current_position(&self, args: &Value) -> Result<Position, PluginError> {
        let options = self.parse_options(args)?;
        self.ensure_permission(&options).await?;
        let location = self.controller.get_current_position(&options).await?;
        Ok(location.into())
    }

    /// Start watching the device's position under the bridge's callback id.
    ///
    /// Each platform batch is flattened so that every item of the returned
    /// stream is a single position, in delivery order. Dropping the stream
    /// stops the watch.
    ///
    /// # Errors
    /// Returns a [`PluginError`] for malformed arguments or refused
    /// permission. Later failures are reported through the stream.
    pub async fn watch_position(
        &self,
        args: &Value,
        callback_id: &str,
    ) -> Result<PositionStream, PluginError> {
        let options = self.parse_options(args)?;
        self.ensure_permission(&options).await?;

        let positions = self
            .controller
            .add_watch(options, callback_id)
            .flat_map(|item| {
                let payloads: Vec<Result<Position, PluginError>> = match item {
                    Ok(batch) => batch.into_iter().map(|location| Ok(location.into())).collect(),
                    Err(err) => vec![Err(err.into())],
                };
                stream::iter(payloads)
            });
        Ok(Box::pin(positions))
    }

    /// Stop the watch named by the `id` argument.
    ///
    /// # Errors
    /// - [`ErrorKind::WatchIdNotProvided`] if `id` is missing or blank.
    /// - [`ErrorKind::WatchIdNotFound`] if no watch was running under `id`.
    ///   The id is still remembered, so a watch that starts later under it
    ///   is stopped on its first update.
    pub fn clear_watch(&self, args: &Value) -> Result<(), PluginError> {
        let id = args
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .ok_or(ErrorKind::WatchIdNotProvided)?;

        if self.controller.clear_watch(id) {
            Ok(())
        } else {
            Err(ErrorKind::WatchIdNotFound.into())
        }
    }

    /// Forward the user's answer to the enable-location prompt.
    ///
    /// Returns `true` if a waiting request was resumed.
    pub fn on_resolution_result(&self, accepted: bool) -> bool {
        self.controller
            .on_resolution_result(ResolutionOutcome::from_accepted(accepted))
    }

    /// Stop every watch; for host shutdown.
    pub fn shutdown(&self) -> usize {
        self.controller.clear_all_watches()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedLocationService, SimulatedPermissions};
    use serde_json::json;

    fn plugin() -> GeolocationPlugin<SimulatedLocationService, SimulatedPermissions> {
        GeolocationPlugin::new(SimulatedLocationService::new(), SimulatedPermissions::granted())
    }

    #[test]
    fn codes_are_zero_padded() {
        assert_eq!(ErrorKind::ServicesResolvable.code(), "OS-PLUG-GEO-0001");
        assert_eq!(ErrorKind::LocationDisabled.code(), "OS-PLUG-GEO-0012");
    }

    #[test]
    fn controller_errors_map_to_codes() {
        let cases = [
            (GeolocationError::InvalidTimeout, "OS-PLUG-GEO-0009"),
            (
                GeolocationError::ServiceUnavailable { resolvable: true },
                "OS-PLUG-GEO-0001",
            ),
            (
                GeolocationError::ServiceUnavailable { resolvable: false },
                "OS-PLUG-GEO-0002",
            ),
            (GeolocationError::settings("offline"), "OS-PLUG-GEO-0008"),
            (GeolocationError::RequestDenied, "OS-PLUG-GEO-0007"),
            (GeolocationError::LocationTimeout, "OS-PLUG-GEO-0004"),
            (GeolocationError::platform("boom"), "OS-PLUG-GEO-0005"),
        ];
        for (err, code) in cases {
            assert_eq!(PluginError::from(err).code, code);
        }
    }

    #[test]
    fn error_serializes_code_and_message() {
        let value = serde_json::to_value(PluginError::from(ErrorKind::WatchIdNotFound))
            .expect("serializable");
        assert_eq!(
            value,
            json!({"code": "OS-PLUG-GEO-0010", "message": "WatchId not found."})
        );
    }

    #[test]
    fn missing_arguments_take_config_defaults() {
        let options = plugin().parse_options(&json!({})).expect("valid arguments");
        assert_eq!(options.timeout_millis(), 10_000);
        assert_eq!(options.maximum_age_millis(), 0);
        assert!(!options.enable_high_accuracy());
        assert_eq!(options.min_update_interval_millis(), Some(5000));
    }

    #[test]
    fn arguments_override_defaults() {
        let options = plugin()
            .parse_options(&json!({
                "timeout": 2000,
                "maximumAge": 100,
                "enableHighAccuracy": true,
                "minimumUpdateInterval": 750,
            }))
            .expect("valid arguments");
        assert_eq!(options.timeout_millis(), 2000);
        assert_eq!(options.maximum_age_millis(), 100);
        assert!(options.enable_high_accuracy());
        assert_eq!(options.min_update_interval_millis(), Some(750));
    }

    #[test]
    fn malformed_arguments_are_invalid_input() {
        let plugin = plugin();
        for args in [
            json!([1, 2]),
            json!({"timeout": "soon"}),
            json!({"maximumAge": -1}),
            json!({"minimumUpdateInterval": -5}),
        ] {
            assert_eq!(
                plugin.parse_options(&args).map_err(|err| err.kind()),
                Err(ErrorKind::InvalidInput)
            );
        }
    }

    #[test]
    fn negative_timeout_is_left_to_the_controller() {
        let options = plugin()
            .parse_options(&json!({"timeout": -1}))
            .expect("parsed");
        assert_eq!(options.timeout_millis(), -1);
    }

    #[test]
    fn blank_watch_id_is_not_provided() {
        let plugin = plugin();
        for args in [json!({}), json!({"id": "  "}), json!({"id": 7})] {
            assert_eq!(
                plugin.clear_watch(&args).map_err(|err| err.kind()),
                Err(ErrorKind::WatchIdNotProvided)
            );
        }
    }

    #[test]
    fn position_omits_missing_altitude_accuracy() {
        let position = Position::from(LocationResult {
            latitude: 1.0,
            longitude: 2.0,
            altitude: 3.0,
            accuracy: 4.0,
            altitude_accuracy: None,
            heading: 5.0,
            speed: 6.0,
            timestamp: 7,
        });
        let value = serde_json::to_value(position).expect("serializable");
        assert_eq!(
            value,
            json!({
                "timestamp": 7,
                "coords": {
                    "latitude": 1.0,
                    "longitude": 2.0,
                    "accuracy": 4.0,
                    "altitude": 3.0,
                    "speed": 6.0,
                    "heading": 5.0,
                }
            })
        );
    }
}
