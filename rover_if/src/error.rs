//! # Rover interface errors

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised by the underlying byte link.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Could not open the serial link: {0}")]
    LinkOpenError(#[from] serialport::Error),

    #[error("Serial link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while exchanging messages with the rover over an open session.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Frame payload of {0} bytes overflows the single byte length field")]
    PayloadTooLarge(usize),

    #[error("Telemetry line {index} is not a number: {line:?}")]
    MalformedTelemetry {
        index: usize,
        line: String,
    },

    #[error("The link closed before the exchange completed")]
    LinkClosed,

    #[error("Timed out waiting for a telemetry line")]
    ReadTimeout,

    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Errors raised while establishing a session.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Could not open the serial link: {0}")]
    LinkOpenError(serialport::Error),

    #[error("No greeting from the rover within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("Calibration line {index} of the extended handshake is invalid: {line:?}")]
    MalformedCalibration {
        index: usize,
        line: String,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl From<LinkError> for ConnectError {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::LinkOpenError(e) => ConnectError::LinkOpenError(e),
            e => ConnectError::Protocol(ProtocolError::Link(e)),
        }
    }
}

impl ProtocolError {
    /// True if this error means the session can no longer be used.
    ///
    /// A timeout part way through a telemetry sequence leaves unread lines on the link, so the
    /// stream can't be trusted afterwards.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::LinkClosed | ProtocolError::ReadTimeout | ProtocolError::Link(_)
        )
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(e: std::io::Error) -> Self {
        ProtocolError::Link(LinkError::Io(e))
    }
}
