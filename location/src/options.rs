use std::time::Duration;

use crate::GeolocationError;

/// Settings interval that tells the platform a request is single-shot.
pub const SINGLE_SHOT_INTERVAL: u64 = 0;

/// Options for a single location request or a watch.
///
/// Values are fixed at construction; the `with_*` methods return a modified copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationOptions {
    timeout_millis: i64,
    maximum_age_millis: u64,
    enable_high_accuracy: bool,
    min_update_interval_millis: Option<u64>,
}

impl LocationOptions {
    /// Create options with the given timeout, no cached positions and balanced accuracy.
    ///
    /// The timeout is not validated here; requests made with a non-positive
    /// timeout fail with [`GeolocationError::InvalidTimeout`].
    #[must_use]
    pub const fn new(timeout_millis: i64) -> Self {
        Self {
            timeout_millis,
            maximum_age_millis: 0,
            enable_high_accuracy: false,
            min_update_interval_millis: None,
        }
    }

    /// Accept cached positions up to this age.
    #[must_use]
    pub const fn with_maximum_age(mut self, maximum_age_millis: u64) -> Self {
        self.maximum_age_millis = maximum_age_millis;
        self
    }

    /// Request high accuracy (such as GPS) instead of balanced power.
    #[must_use]
    pub const fn with_high_accuracy(mut self, enable: bool) -> Self {
        self.enable_high_accuracy = enable;
        self
    }

    /// Throttle watch updates to at most one per interval.
    ///
    /// Only watches honour this; single-shot requests ignore it.
    #[must_use]
    pub const fn with_min_update_interval(mut self, interval_millis: Option<u64>) -> Self {
        self.min_update_interval_millis = interval_millis;
        self
    }

    /// The caller's timeout in milliseconds, as supplied.
    #[must_use]
    pub const fn timeout_millis(&self) -> i64 {
        self.timeout_millis
    }

    /// Maximum acceptable age of a cached position, in milliseconds.
    #[must_use]
    pub const fn maximum_age_millis(&self) -> u64 {
        self.maximum_age_millis
    }

    /// Whether high accuracy was requested.
    #[must_use]
    pub const fn enable_high_accuracy(&self) -> bool {
        self.enable_high_accuracy
    }

    /// Minimum interval between watch updates, if any.
    #[must_use]
    pub const fn min_update_interval_millis(&self) -> Option<u64> {
        self.min_update_interval_millis
    }

    /// The validated timeout in milliseconds.
    ///
    /// # Errors
    /// Returns [`GeolocationError::InvalidTimeout`] if the timeout is not positive.
    pub fn validated_timeout(&self) -> Result<u64, GeolocationError> {
        u64::try_from(self.timeout_millis)
            .ok()
            .filter(|timeout| *timeout > 0)
            .ok_or(GeolocationError::InvalidTimeout)
    }

    /// The validated timeout as a [`Duration`].
    ///
    /// # Errors
    /// Returns [`GeolocationError::InvalidTimeout`] if the timeout is not positive.
    pub fn timeout(&self) -> Result<Duration, GeolocationError> {
        self.validated_timeout().map(Duration::from_millis)
    }
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self::new(5000).with_maximum_age(3000).with_high_accuracy(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_timeouts_are_rejected() {
        for timeout in [0, -1, i64::MIN] {
            assert_eq!(
                LocationOptions::new(timeout).validated_timeout(),
                Err(GeolocationError::InvalidTimeout)
            );
        }
        assert_eq!(LocationOptions::new(1).validated_timeout(), Ok(1));
    }

    #[test]
    fn builders_return_modified_copies() {
        let base = LocationOptions::new(5000);
        let watch = base
            .with_maximum_age(3000)
            .with_high_accuracy(true)
            .with_min_update_interval(Some(2000));

        assert_eq!(base.maximum_age_millis(), 0);
        assert!(!base.enable_high_accuracy());
        assert_eq!(watch.maximum_age_millis(), 3000);
        assert!(watch.enable_high_accuracy());
        assert_eq!(watch.min_update_interval_millis(), Some(2000));
        assert_eq!(watch.timeout().ok(), Some(Duration::from_secs(5)));
    }
}
