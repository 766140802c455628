use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::LocationOptions;

/// Tunables for a controller and its host bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeolocationConfig {
    /// Timeout used when the host omits one.
    pub default_timeout_millis: i64,
    /// Maximum cached-position age used when the host omits one.
    pub default_maximum_age_millis: u64,
    /// Accuracy mode used when the host omits one.
    pub default_high_accuracy: bool,
    /// Minimum watch update interval used when the host omits one.
    pub default_min_update_interval_millis: u64,
    /// Slack added to a request's timeout before the controller gives up on
    /// a platform call that never answers.
    pub timeout_grace_millis: u64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            default_timeout_millis: 10_000,
            default_maximum_age_millis: 0,
            default_high_accuracy: false,
            default_min_update_interval_millis: 5_000,
            timeout_grace_millis: 1_000,
        }
    }
}

impl GeolocationConfig {
    /// Parse a configuration from JSON. Missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or a field has the wrong type.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Set the default timeout.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout_millis: i64) -> Self {
        self.default_timeout_millis = timeout_millis;
        self
    }

    /// Set the default maximum cached-position age.
    #[must_use]
    pub const fn with_default_maximum_age(mut self, maximum_age_millis: u64) -> Self {
        self.default_maximum_age_millis = maximum_age_millis;
        self
    }

    /// Set the default accuracy mode.
    #[must_use]
    pub const fn with_default_high_accuracy(mut self, enable: bool) -> Self {
        self.default_high_accuracy = enable;
        self
    }

    /// Set the default minimum watch update interval.
    #[must_use]
    pub const fn with_default_min_update_interval(mut self, interval_millis: u64) -> Self {
        self.default_min_update_interval_millis = interval_millis;
        self
    }

    /// Set the timeout grace.
    #[must_use]
    pub const fn with_timeout_grace(mut self, grace_millis: u64) -> Self {
        self.timeout_grace_millis = grace_millis;
        self
    }

    /// Options built entirely from the defaults.
    #[must_use]
    pub const fn default_options(&self) -> LocationOptions {
        LocationOptions::new(self.default_timeout_millis)
            .with_maximum_age(self.default_maximum_age_millis)
            .with_high_accuracy(self.default_high_accuracy)
            .with_min_update_interval(Some(self.default_min_update_interval_millis))
    }

    /// The timeout grace as a [`Duration`].
    #[must_use]
    pub const fn timeout_grace(&self) -> Duration {
        Duration::from_millis(self.timeout_grace_millis)
    }
}
