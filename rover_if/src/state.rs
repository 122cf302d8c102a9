//! # Rover state
//!
//! Last known sensor and pose values reported by the rover. This is the only data product the
//! interface exposes; display and plotting code borrows it read only.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of values in one telemetry reply.
pub const NUM_TELEMETRY_VALUES: usize = 11;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A three axis sensor reading along with the bias the rover measured at startup.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisReadings {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub bias_x: f64,
    pub bias_y: f64,
    pub bias_z: f64,
}

/// Infra-red range finder readings.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrReadings {
    pub front: f64,
    pub rear: f64,
}

/// Rover pose. Not reported by the current firmware so it stays at zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Snapshot of everything known about the rover.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoverState {
    pub(crate) accel: AxisReadings,
    pub(crate) gyro: AxisReadings,
    pub(crate) compass: AxisReadings,
    pub(crate) ir: IrReadings,
    pub(crate) pose: Pose,

    pub(crate) connected: bool,

    /// Message length reported by the extended handshake.
    pub(crate) message_length: i64,

    /// Number of telemetry replies received.
    pub(crate) message_number: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AxisReadings {
    fn set_xyz(&mut self, xyz: &[f64]) {
        self.x = xyz[0];
        self.y = xyz[1];
        self.z = xyz[2];
    }

    pub(crate) fn set_bias(&mut self, bias: &[f64]) {
        self.bias_x = bias[0];
        self.bias_y = bias[1];
        self.bias_z = bias[2];
    }
}

impl RoverState {
    pub fn accel(&self) -> AxisReadings {
        self.accel
    }

    pub fn gyro(&self) -> AxisReadings {
        self.gyro
    }

    pub fn compass(&self) -> AxisReadings {
        self.compass
    }

    pub fn ir(&self) -> IrReadings {
        self.ir
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn message_length(&self) -> i64 {
        self.message_length
    }

    pub fn message_number(&self) -> u64 {
        self.message_number
    }

    /// Copy of the whole state, for dumps and logs.
    pub fn snapshot(&self) -> RoverState {
        self.clone()
    }

    /// Replace every telemetry field at once.
    ///
    /// `values` are in reply order: accel XYZ, gyro XYZ, compass XYZ, IR front, IR rear.
    pub(crate) fn apply_telemetry(&mut self, values: &[f64; NUM_TELEMETRY_VALUES]) {
        self.accel.set_xyz(&values[0..3]);
        self.gyro.set_xyz(&values[3..6]);
        self.compass.set_xyz(&values[6..9]);
        self.ir.front = values[9];
        self.ir.rear = values[10];
        self.message_number = self.message_number.wrapping_add(1);
    }
}

impl fmt::Display for RoverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups = [
            ("Accelerometer", &self.accel),
            ("Gyro", &self.gyro),
            ("Compass", &self.compass),
        ];

        for (name, readings) in groups.iter() {
            writeln!(f, "{}", name)?;
            for v in [readings.x, readings.y, readings.z].iter() {
                writeln!(f, "{}", format_reading(*v))?;
            }
        }

        writeln!(f, "IR")?;
        writeln!(f, "{}", format_reading(self.ir.front))?;
        write!(f, "{}", format_reading(self.ir.rear))
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Format a reading as a signed, zero padded, two decimal number, e.g. `+01.50`.
pub fn format_reading(value: f64) -> String {
    format!("{:+06.2}", value)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults_are_zero() {
        let state = RoverState::default();
        assert_eq!(state.accel(), AxisReadings::default());
        assert_eq!(state.ir().front, 0.0);
        assert_eq!(state.pose(), Pose { x: 0.0, y: 0.0, z: 0.0 });
        assert!(!state.connected());
        assert_eq!(state.message_number(), 0);
    }

    #[test]
    fn test_apply_telemetry() {
        let mut state = RoverState::default();
        state.accel.set_bias(&[7.0, 8.0, 9.0]);

        let values = [1.0, 2.0, 3.0, 0.1, 0.2, 0.3, 10.0, 20.0, 30.0, 5.5, 6.6];
        state.apply_telemetry(&values);

        assert_eq!((state.accel.x, state.accel.y, state.accel.z), (1.0, 2.0, 3.0));
        assert_eq!(state.accel.bias_z, 9.0);
        assert_eq!((state.gyro.x, state.gyro.y, state.gyro.z), (0.1, 0.2, 0.3));
        assert_eq!(state.compass.z, 30.0);
        assert_eq!(state.ir, IrReadings { front: 5.5, rear: 6.6 });
        assert_eq!(state.message_number(), 1);
    }

    #[test]
    fn test_format_reading() {
        assert_eq!(format_reading(1.5), "+01.50");
        assert_eq!(format_reading(-12.254), "-12.25");
        assert_eq!(format_reading(0.0), "+00.00");
        assert_eq!(format_reading(123.456), "+123.46");
    }

    #[test]
    fn test_display() {
        let mut state = RoverState::default();
        state.apply_telemetry(&[1.0, 2.0, 3.0, 0.1, 0.2, 0.3, 10.0, 20.0, 30.0, 5.5, 6.6]);

        let dump = state.to_string();
        let lines: Vec<&str> = dump.lines().collect();

        assert_eq!(lines.len(), 15);
        assert_eq!(lines[0], "Accelerometer");
        assert_eq!(lines[1], "+01.00");
        assert_eq!(lines[4], "Gyro");
        assert_eq!(lines[8], "Compass");
        assert_eq!(lines[12], "IR");
        assert_eq!(lines[14], "+06.60");
    }
}
