//! # Link parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use std::time::Duration;

use crate::motor::MagnitudeClamp;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The only baud rate the rover firmware talks at.
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Serial device used when none is configured.
pub const DEFAULT_ADDRESS: &str = "/dev/ttyUSB0";

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How the telemetry request byte goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryRequest {
    /// A lone `r` byte.
    Raw,

    /// `r` wrapped in a frame (`0x7E 0x01 r`), for firmware that parses every input as a frame.
    Framed,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the rover link.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkParams {
    /// Path of the serial device.
    pub address: String,

    /// Baud rate of the serial device.
    pub baud_rate: u32,

    /// Maximum time to wait for the greeting. Waits forever if not set.
    ///
    /// Units: milliseconds
    pub handshake_timeout_ms: Option<u64>,

    /// Maximum time to wait for each telemetry line. Waits forever if not set.
    ///
    /// Units: milliseconds
    pub read_timeout_ms: Option<u64>,

    /// Read the message length and bias values which follow the greeting.
    ///
    /// Only enable this for firmware which sends them, otherwise the handshake will stall or
    /// fail on the first telemetry-less line.
    pub extended_handshake: bool,

    /// Handling of motor magnitudes above 100.
    pub magnitude_clamp: MagnitudeClamp,

    /// Wire form of the telemetry request.
    pub telemetry_request: TelemetryRequest,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for TelemetryRequest {
    fn default() -> Self {
        TelemetryRequest::Raw
    }
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            handshake_timeout_ms: None,
            read_timeout_ms: None,
            extended_handshake: false,
            magnitude_clamp: MagnitudeClamp::default(),
            telemetry_request: TelemetryRequest::default(),
        }
    }
}

impl LinkParams {
    pub fn handshake_timeout(&self) -> Option<Duration> {
        self.handshake_timeout_ms.map(Duration::from_millis)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let p: LinkParams = util::params::load_str("").unwrap();

        assert_eq!(p.address, "/dev/ttyUSB0");
        assert_eq!(p.baud_rate, 38400);
        assert_eq!(p.handshake_timeout(), None);
        assert_eq!(p.read_timeout(), None);
        assert!(!p.extended_handshake);
        assert_eq!(p.magnitude_clamp, MagnitudeClamp::Legacy);
        assert_eq!(p.telemetry_request, TelemetryRequest::Raw);
    }

    #[test]
    fn test_load() {
        let p: LinkParams = util::params::load_str(
            r#"
            address = "/dev/ttyACM1"
            handshake_timeout_ms = 5000
            read_timeout_ms = 250
            extended_handshake = true
            magnitude_clamp = "saturate"
            telemetry_request = "framed"
            "#,
        )
        .unwrap();

        assert_eq!(p.address, "/dev/ttyACM1");
        assert_eq!(p.baud_rate, 38400);
        assert_eq!(p.handshake_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(p.read_timeout(), Some(Duration::from_millis(250)));
        assert!(p.extended_handshake);
        assert_eq!(p.magnitude_clamp, MagnitudeClamp::Saturate);
        assert_eq!(p.telemetry_request, TelemetryRequest::Framed);
    }
}
