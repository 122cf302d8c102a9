//! # Motor command encoding
//!
//! Turns a pair of signed motor powers into the payload understood by the rover's motor
//! controller. Each motor gets a magnitude byte (0-100) and a direction byte.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{error::ProtocolError, frame::Frame};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Data ID of the motor command (`m`).
pub const MOTOR_CMD_ID: u8 = b'm';

/// Largest magnitude the motor controller accepts.
pub const MAX_MAGNITUDE: u8 = 100;

/// Magnitude substituted for out of range demands by the stock firmware protocol.
pub const LEGACY_CLAMP_MAGNITUDE: u8 = 20;

/// Length of the encoded motor message, data ID included.
pub const MOTOR_MSG_LEN: usize = 5;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Direction of rotation of a single motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Reverse,
}

/// What to do with a magnitude above [`MAX_MAGNITUDE`].
///
/// The stock firmware protocol drops out of range demands to 20 rather than saturating at 100.
/// That is kept as the default so existing rovers behave as before. `Saturate` is only correct for
/// a rover running firmware which expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnitudeClamp {
    /// Replace any magnitude above 100 with 20.
    Legacy,

    /// Limit magnitudes to 100.
    Saturate,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demand for a single motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorDemand {
    pub magnitude: u8,
    pub direction: Direction,
}

/// Demands for both motors, ready to be serialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorCommand {
    pub m1: MotorDemand,
    pub m2: MotorDemand,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for MagnitudeClamp {
    fn default() -> Self {
        MagnitudeClamp::Legacy
    }
}

impl MagnitudeClamp {
    fn apply(self, magnitude: u32) -> u8 {
        if magnitude <= MAX_MAGNITUDE as u32 {
            return magnitude as u8;
        }

        match self {
            MagnitudeClamp::Legacy => LEGACY_CLAMP_MAGNITUDE,
            MagnitudeClamp::Saturate => MAX_MAGNITUDE,
        }
    }
}

impl Direction {
    /// Wire value of the direction.
    pub fn as_byte(self) -> u8 {
        match self {
            Direction::Forward => 0x00,
            Direction::Reverse => 0x01,
        }
    }
}

impl MotorDemand {
    /// Split a signed power into magnitude and direction.
    pub fn from_power(power: i32, clamp: MagnitudeClamp) -> Self {
        let direction = if power < 0 {
            Direction::Reverse
        } else {
            Direction::Forward
        };

        Self {
            magnitude: clamp.apply(power.unsigned_abs()),
            direction,
        }
    }
}

impl MotorCommand {
    /// Build the command for two signed motor powers.
    pub fn from_powers(m1: i32, m2: i32, clamp: MagnitudeClamp) -> Self {
        Self {
            m1: MotorDemand::from_power(m1, clamp),
            m2: MotorDemand::from_power(m2, clamp),
        }
    }

    /// The encoded message: `['m', mag1, dir1, mag2, dir2]`.
    pub fn to_message(&self) -> [u8; MOTOR_MSG_LEN] {
        [
            MOTOR_CMD_ID,
            self.m1.magnitude,
            self.m1.direction.as_byte(),
            self.m2.magnitude,
            self.m2.direction.as_byte(),
        ]
    }

    /// Wrap the message in a frame.
    ///
    /// The first byte of the message becomes the frame's data ID, so the length byte is 5.
    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        let msg = self.to_message();
        Frame::encode(msg[0], &msg[1..])
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Encode two signed motor powers with the stock firmware's clamping.
pub fn encode(m1: i32, m2: i32) -> [u8; MOTOR_MSG_LEN] {
    MotorCommand::from_powers(m1, m2, MagnitudeClamp::Legacy).to_message()
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode(50, -30), [b'm', 50, 0x00, 30, 0x01]);
        assert_eq!(encode(0, -1), [b'm', 0, 0x00, 1, 0x01]);
        assert_eq!(encode(100, -100), [b'm', 100, 0x00, 100, 0x01]);
        assert_eq!(encode(101, -250), [b'm', 20, 0x00, 20, 0x01]);
        assert_eq!(encode(i32::MIN, i32::MAX), [b'm', 20, 0x01, 20, 0x00]);
    }

    #[test]
    fn test_saturating_clamp() {
        let cmd = MotorCommand::from_powers(101, -5000, MagnitudeClamp::Saturate);
        assert_eq!(cmd.to_message(), [b'm', 100, 0x00, 100, 0x01]);
    }

    #[test]
    fn test_to_frame() {
        let frame = MotorCommand::from_powers(75, -10, MagnitudeClamp::Legacy)
            .to_frame()
            .unwrap();
        assert_eq!(frame.as_bytes(), &[0x7E, 5, b'm', 75, 0x00, 10, 0x01]);
    }

    proptest! {
        #[test]
        fn prop_magnitudes_in_range(m1 in -1000i32..=1000, m2 in -1000i32..=1000) {
            let msg = encode(m1, m2);

            prop_assert_eq!(msg.len(), MOTOR_MSG_LEN);
            prop_assert_eq!(msg[0], b'm');

            for (input, mag, dir) in [(m1, msg[1], msg[2]), (m2, msg[3], msg[4])].iter() {
                prop_assert!(*mag <= 100);
                if input.abs() > 100 {
                    prop_assert_eq!(*mag, 20);
                } else {
                    prop_assert_eq!(*mag as i32, input.abs());
                }
                prop_assert_eq!(*dir, if *input < 0 { 0x01 } else { 0x00 });
            }
        }
    }
}
