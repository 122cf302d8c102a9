//! # Rover interface crate.
//!
//! Host side driver for the remote rover connected over a serial link. The rover speaks a small
//! hybrid protocol: motor demands go out as length-prefixed binary frames, telemetry is requested
//! with a single raw byte and comes back as newline separated ASCII floats.
//!
//! A typical cycle is:
//!
//! ```no_run
//! use rover_if::{ConnectionManager, LinkParams, RoverState, SerialLink};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let params = LinkParams::default();
//! let mut state = RoverState::default();
//!
//! let link = SerialLink::open(&params.address, params.baud_rate)?;
//! let mut session = ConnectionManager::new(&params).connect(link, &mut state)?;
//!
//! session.write_motors(40, -40)?;
//! session.read_telemetry(&mut state)?;
//! println!("{}", state);
//! # Ok(())
//! # }
//! ```

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Error types shared by the protocol modules
pub mod error;

/// Byte stream abstraction over the serial port
pub mod link;

/// Length-prefixed frame encoding for the motor channel
pub mod frame;

/// Motor power to payload encoding
pub mod motor;

/// Link and protocol parameters
pub mod params;

/// Startup handshake
pub mod connection;

/// An established link to the rover
pub mod session;

/// Telemetry request and parsing
pub mod telemetry;

/// Last known rover sensor and pose values
pub mod state;

/// Mutex guarded session for concurrent callers
pub mod shared;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use connection::ConnectionManager;
pub use error::{ConnectError, LinkError, ProtocolError};
pub use frame::Frame;
pub use link::{ByteLink, SerialLink, SimLink};
pub use motor::{Direction, MagnitudeClamp, MotorCommand};
pub use params::{LinkParams, TelemetryRequest};
pub use session::Session;
pub use shared::SharedRover;
pub use state::RoverState;
pub use telemetry::TelemetryReader;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_connect_then_read() {
        let link = SimLink::new(vec![
            "noise",
            "Hello, World! v1.2",
            "1.00", "2.00", "3.00",
            "0.10", "0.20", "0.30",
            "10.0", "20.0", "30.0",
            "5.5", "6.6",
        ]);
        let mut state = RoverState::default();

        let mut session = ConnectionManager::new(&LinkParams::default())
            .connect(link, &mut state)
            .unwrap();
        assert!(state.connected());

        session.write_motors(30, -30).unwrap();
        session.read_telemetry(&mut state).unwrap();

        let accel = state.accel();
        assert_eq!((accel.x, accel.y, accel.z), (1.0, 2.0, 3.0));
        let gyro = state.gyro();
        assert_eq!((gyro.x, gyro.y, gyro.z), (0.1, 0.2, 0.3));
        let compass = state.compass();
        assert_eq!((compass.x, compass.y, compass.z), (10.0, 20.0, 30.0));
        let ir = state.ir();
        assert_eq!((ir.front, ir.rear), (5.5, 6.6));
        assert_eq!(state.pose(), state::Pose::default());

        // Framed motor command then the bare telemetry request
        assert_eq!(
            session.link().written(),
            &[0x7E, 5, b'm', 30, 0x00, 30, 0x01, b'r']
        );
        assert_eq!(session.link().lines_remaining(), 0);
    }
}
