//! # Rover session
//!
//! A [`Session`] is an established link to one rover. It is created by
//! [`crate::ConnectionManager::connect`] and owns the link until it is closed or the link fails.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};

use crate::{
    error::ProtocolError,
    frame::Frame,
    link::ByteLink,
    motor::{MagnitudeClamp, MotorCommand},
    params::LinkParams,
    state::RoverState,
    telemetry::TelemetryReader,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An established link to the rover.
///
/// Commands are strictly half duplex: every operation completes its write (and any reply it
/// waits for) before returning, and nothing is pipelined.
pub struct Session<L: ByteLink> {
    link: L,

    /// Cleared once the link has failed, after which no further I/O is attempted.
    connected: bool,

    clamp: MagnitudeClamp,

    reader: TelemetryReader,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<L: ByteLink> Session<L> {
    pub(crate) fn new(link: L, params: &LinkParams) -> Self {
        Self {
            link,
            connected: true,
            clamp: params.magnitude_clamp,
            reader: TelemetryReader::new(params),
        }
    }

    /// True until the link fails or closes.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Send two signed motor powers to the rover.
    pub fn write_motors(&mut self, m1: i32, m2: i32) -> Result<(), ProtocolError> {
        let cmd = MotorCommand::from_powers(m1, m2, self.clamp);
        debug!("Motor demands ({}, {}) -> {:?}", m1, m2, cmd);

        let frame = cmd.to_frame()?;
        self.write_frame(&frame)
    }

    /// Write an encoded frame to the rover.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<(), ProtocolError> {
        self.ensure_open()?;
        let result = frame.write(&mut self.link);
        self.check(result)
    }

    /// Write a single unframed byte to the rover.
    pub fn send_raw(&mut self, byte: u8) -> Result<(), ProtocolError> {
        self.ensure_open()?;
        let result = self.link.write_bytes(&[byte]).map_err(ProtocolError::from);
        self.check(result)
    }

    /// Request telemetry and update `state` with the reply.
    ///
    /// See [`TelemetryReader::read`].
    pub fn read_telemetry(&mut self, state: &mut RoverState) -> Result<(), ProtocolError> {
        let reader = self.reader;
        reader.read(self, state)
    }

    /// Close the session, handing back the link.
    pub fn close(self, state: &mut RoverState) -> L {
        info!("Closing rover session");
        state.connected = false;
        self.link
    }

    /// Fail with `LinkClosed` if the link has already failed.
    pub(crate) fn ensure_open(&self) -> Result<(), ProtocolError> {
        if self.connected {
            Ok(())
        } else {
            Err(ProtocolError::LinkClosed)
        }
    }

    /// Mark the session as dead if `result` is an error the link can't recover from.
    pub(crate) fn check<T>(&mut self, result: Result<T, ProtocolError>) -> Result<T, ProtocolError> {
        if let Err(e) = &result {
            if e.is_fatal() && self.connected {
                warn!("Rover link lost: {}", e);
                self.connected = false;
            }
        }
        result
    }
}
