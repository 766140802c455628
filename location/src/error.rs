use thiserror::Error;

/// Errors reported by location requests and watches.
///
/// Every variant is terminal for the call that produced it. Nothing is
/// retried internally; callers re-invoke with adjusted options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    /// The caller supplied a timeout that is zero or negative.
    #[error("timeout needs to be a positive value")]
    InvalidTimeout,

    /// The platform location services layer is missing or outdated.
    #[error("location services unavailable (resolvable: {resolvable})")]
    ServiceUnavailable {
        /// Whether the host can offer the user a fix-it flow.
        resolvable: bool,
    },

    /// The location settings check failed for a reason other than a user decision.
    #[error("location settings error: {cause}")]
    SettingsCheckFailed {
        /// Description of the underlying failure.
        cause: String,
    },

    /// The user declined the prompt to enable location.
    #[error("request to enable location denied")]
    RequestDenied,

    /// No location fix was obtained within the caller's timeout.
    #[error("could not obtain location in time")]
    LocationTimeout,

    /// An unexpected failure in the platform location provider.
    #[error("location provider error: {0}")]
    Platform(String),
}

impl GeolocationError {
    /// Build a [`GeolocationError::SettingsCheckFailed`] from any displayable cause.
    pub fn settings(cause: impl std::fmt::Display) -> Self {
        Self::SettingsCheckFailed {
            cause: cause.to_string(),
        }
    }

    /// Build a [`GeolocationError::Platform`] from any displayable cause.
    pub fn platform(cause: impl std::fmt::Display) -> Self {
        Self::Platform(cause.to_string())
    }
}
