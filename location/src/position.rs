/// A reading as reported by the platform location provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawLocation {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude: f64,
    /// Horizontal accuracy radius in meters.
    pub accuracy: f32,
    /// Vertical accuracy in meters. Only meaningful where the platform
    /// API reports it; see [`LocationService::reports_vertical_accuracy`].
    ///
    /// [`LocationService::reports_vertical_accuracy`]: crate::LocationService::reports_vertical_accuracy
    pub vertical_accuracy: Option<f32>,
    /// Bearing in degrees.
    pub bearing: f32,
    /// Speed in meters per second.
    pub speed: f32,
    /// Platform clock time as Unix epoch milliseconds.
    pub time: i64,
}

/// A geographic position delivered to callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationResult {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: f32,
    /// Vertical accuracy in meters, if the platform supports it.
    pub altitude_accuracy: Option<f32>,
    /// Heading in degrees.
    pub heading: f32,
    /// Speed in meters per second.
    pub speed: f32,
    /// Timestamp as Unix epoch milliseconds.
    pub timestamp: i64,
}

impl LocationResult {
    /// Map a platform reading, keeping vertical accuracy only when the
    /// platform API is able to report it.
    #[must_use]
    pub fn from_raw(raw: RawLocation, reports_vertical_accuracy: bool) -> Self {
        Self {
            latitude: raw.latitude,
            longitude: raw.longitude,
            altitude: raw.altitude,
            accuracy: raw.accuracy,
            altitude_accuracy: raw.vertical_accuracy.filter(|_| reports_vertical_accuracy),
            heading: raw.bearing,
            speed: raw.speed,
            timestamp: raw.time,
        }
    }
}
