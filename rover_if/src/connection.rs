//! # Connection manager
//!
//! On power up the rover prints a greeting line containing `Hello, World!`, possibly after some
//! boot noise. The connection manager waits for that line and hands back a [`Session`].
//!
//! Firmware built with calibration reporting follows the greeting with seven more lines: the
//! message length (integer) then the accelerometer and gyroscope bias triples. Reading these is
//! off unless [`LinkParams::extended_handshake`] is set, since waiting for lines the rover never
//! sends would hang the handshake.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use std::{
    io,
    time::{Duration, Instant},
};

use crate::{
    error::{ConnectError, ProtocolError},
    link::{ByteLink, SerialLink},
    params::LinkParams,
    session::Session,
    state::RoverState,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Substring which marks the rover's greeting line.
pub const GREETING: &str = "Hello, World!";

/// Number of lines in the extended handshake.
pub const NUM_CALIBRATION_LINES: usize = 7;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Establishes sessions with the rover.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    params: LinkParams,
}

/// Values read from the extended handshake.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Calibration {
    message_length: i64,
    accel_bias: [f64; 3],
    gyro_bias: [f64; 3],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ConnectionManager {
    pub fn new(params: &LinkParams) -> Self {
        Self {
            params: params.clone(),
        }
    }

    /// Open the configured serial port and perform the handshake on it.
    pub fn open(&self, state: &mut RoverState) -> Result<Session<SerialLink>, ConnectError> {
        let link = SerialLink::open(&self.params.address, self.params.baud_rate)?;
        self.connect(link, state)
    }

    /// Perform the handshake over `link`.
    ///
    /// Lines are read and discarded until one contains [`GREETING`]. With no handshake timeout
    /// configured this waits forever for a rover which never greets.
    ///
    /// `state.connected` is set once the handshake has completed, and if the extended handshake
    /// is enabled the calibration values are written to `state` at the same time.
    pub fn connect<L: ByteLink>(
        &self,
        mut link: L,
        state: &mut RoverState,
    ) -> Result<Session<L>, ConnectError> {
        let timeout = self.params.handshake_timeout();
        let deadline = timeout.map(|t| Instant::now() + t);

        info!("Waiting for rover greeting...");

        let mut num_discarded = 0usize;
        loop {
            let line = read_handshake_line(&mut link, deadline, timeout)?;
            if line.contains(GREETING) {
                info!("Rover greeted: {:?}", line.trim());
                break;
            }
            num_discarded += 1;
            debug!("Discarding pre-greeting line {:?}", line);
        }

        if num_discarded > 0 {
            debug!("Discarded {} lines before the greeting", num_discarded);
        }

        if self.params.extended_handshake {
            let cal = read_calibration(&mut link, deadline, timeout)?;
            info!("Rover calibration: {:?}", cal);

            state.message_length = cal.message_length;
            state.accel.set_bias(&cal.accel_bias);
            state.gyro.set_bias(&cal.gyro_bias);
        }

        state.connected = true;
        info!("Rover connected");

        Ok(Session::new(link, &self.params))
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn read_handshake_line<L: ByteLink>(
    link: &mut L,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
) -> Result<String, ConnectError> {
    match link.read_line(deadline) {
        Ok(Some(line)) => Ok(line),
        Ok(None) => {
            warn!("Link closed during the handshake");
            Err(ProtocolError::LinkClosed.into())
        }
        Err(e) if e.kind() == io::ErrorKind::TimedOut => {
            let timeout = timeout.unwrap_or_default();
            warn!("No greeting from the rover within {:?}", timeout);
            Err(ConnectError::HandshakeTimeout(timeout))
        }
        Err(e) => Err(ProtocolError::from(e).into()),
    }
}

/// Read the extended handshake lines, failing without partial results on a bad line.
fn read_calibration<L: ByteLink>(
    link: &mut L,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
) -> Result<Calibration, ConnectError> {
    let mut cal = Calibration {
        message_length: 0,
        accel_bias: [0.0; 3],
        gyro_bias: [0.0; 3],
    };

    let line = read_handshake_line(link, deadline, timeout)?;
    cal.message_length = line
        .trim()
        .parse()
        .map_err(|_| ConnectError::MalformedCalibration { index: 0, line: line.clone() })?;

    let biases = cal.accel_bias.iter_mut().chain(cal.gyro_bias.iter_mut());
    for (i, bias) in biases.enumerate() {
        let index = i + 1;
        let line = read_handshake_line(link, deadline, timeout)?;
        *bias = line
            .trim()
            .parse()
            .map_err(|_| ConnectError::MalformedCalibration { index, line: line.clone() })?;
    }

    Ok(cal)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::link::SimLink;

    #[test]
    fn test_connect_after_noise() {
        let mut state = RoverState::default();
        let link = SimLink::new(vec!["boot", "MPU init ok", "Hello, World!", "1.0"]);

        let session = ConnectionManager::new(&LinkParams::default())
            .connect(link, &mut state)
            .unwrap();

        assert!(state.connected());
        assert!(session.is_connected());
        assert_eq!(session.link().lines_read(), 3);
        assert_eq!(session.link().lines_remaining(), 1);
        assert!(session.link().written().is_empty());
    }

    #[test]
    fn test_greeting_substring() {
        let mut state = RoverState::default();
        let link = SimLink::new(vec!["\u{0}\u{ff}garbage", ">> Hello, World! v1.2\r\n"]);

        let session = ConnectionManager::new(&LinkParams::default())
            .connect(link, &mut state)
            .unwrap();
        assert_eq!(session.link().lines_read(), 2);
    }

    #[test]
    fn test_no_greeting_before_close() {
        let mut state = RoverState::default();
        let link = SimLink::new(vec!["noise", "Hello, World"]);

        let result = ConnectionManager::new(&LinkParams::default()).connect(link, &mut state);

        assert!(matches!(result, Err(ConnectError::Protocol(ProtocolError::LinkClosed))));
        assert!(!state.connected());
    }

    #[test]
    fn test_handshake_timeout() {
        let params = LinkParams {
            handshake_timeout_ms: Some(20),
            ..Default::default()
        };
        let mut state = RoverState::default();
        let link = SimLink::stalling(vec!["noise"]);

        match ConnectionManager::new(&params).connect(link, &mut state) {
            Err(ConnectError::HandshakeTimeout(t)) => assert_eq!(t, Duration::from_millis(20)),
            Err(e) => panic!("Expected HandshakeTimeout, got {:?}", e),
            Ok(_) => panic!("Expected HandshakeTimeout, got a session"),
        }
        assert!(!state.connected());
    }

    #[test]
    fn test_extended_handshake_off_by_default() {
        let mut state = RoverState::default();
        let link = SimLink::new(vec!["Hello, World!", "11", "1", "2", "3", "4", "5", "6"]);

        let session = ConnectionManager::new(&LinkParams::default())
            .connect(link, &mut state)
            .unwrap();

        assert_eq!(session.link().lines_read(), 1);
        assert_eq!(state.message_length(), 0);
        assert_eq!(state.accel().bias_x, 0.0);
    }

    #[test]
    fn test_extended_handshake() {
        let params = LinkParams {
            extended_handshake: true,
            ..Default::default()
        };
        let mut state = RoverState::default();
        let link = SimLink::new(vec![
            "Hello, World!", "11", "-12.5", "3.0", "16384.0", "0.5", "-0.5", "1.25",
        ]);

        let session = ConnectionManager::new(&params).connect(link, &mut state).unwrap();

        assert_eq!(session.link().lines_read(), 8);
        assert_eq!(state.message_length(), 11);

        let accel = state.accel();
        assert_eq!((accel.bias_x, accel.bias_y, accel.bias_z), (-12.5, 3.0, 16384.0));
        let gyro = state.gyro();
        assert_eq!((gyro.bias_x, gyro.bias_y, gyro.bias_z), (0.5, -0.5, 1.25));
        assert!(state.connected());
    }

    #[test]
    fn test_extended_handshake_bad_line() {
        let params = LinkParams {
            extended_handshake: true,
            ..Default::default()
        };
        let mut state = RoverState::default();
        let link = SimLink::new(vec![
            "Hello, World!", "11", "1.0", "2.0", "3.0", "Gyro Bias:", "5.0", "6.0",
        ]);

        match ConnectionManager::new(&params).connect(link, &mut state) {
            Err(ConnectError::MalformedCalibration { index, line }) => {
                assert_eq!(index, 4);
                assert_eq!(line, "Gyro Bias:");
            }
            Err(e) => panic!("Expected MalformedCalibration, got {:?}", e),
            Ok(_) => panic!("Expected MalformedCalibration, got a session"),
        }

        assert_eq!(state, RoverState::default());
    }
}
