use std::time::SystemTime;

use thiserror::Error;

/// Errors that can occur reading the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimeError {
    /// System time is before the UNIX epoch.
    #[error("system time is before the unix epoch")]
    BeforeUnixEpoch,
}

/// Millisecond-resolution wall-clock timestamps, used by the tick control
/// sub-protocol to measure one-way latency.
pub struct Timestamp;

impl Timestamp {
    /// Returns the current timestamp in milliseconds since the UNIX epoch.
    ///
    /// # Errors
    /// Returns `TimeError::BeforeUnixEpoch` if system time is before the
    /// UNIX epoch.
    pub fn try_now_millis() -> Result<i64, TimeError> {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .map_err(|_| TimeError::BeforeUnixEpoch)
    }

    /// The current timestamp, or zero if the wall clock is unreadable.
    /// Control messages tolerate a zero timestamp; latency measurement
    /// clamps at zero on the receiving side.
    pub fn now_millis_or_zero() -> i64 {
        Self::try_now_millis().unwrap_or_default()
    }
}
