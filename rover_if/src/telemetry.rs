//! # Telemetry reader
//!
//! Telemetry is polled: the host sends a lone `r` and the rover replies with eleven lines, each a
//! single decimal number, in this order:
//!
//! | Index | Value     |
//! |-------|-----------|
//! | 0-2   | Accel XYZ |
//! | 3-5   | Gyro XYZ  |
//! | 6-8   | Compass XYZ |
//! | 9     | IR front  |
//! | 10    | IR rear   |
//!
//! The request is deliberately not framed, unlike motor commands. The rover firmware expects it
//! that way.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace, warn};
use std::{
    io,
    time::{Duration, Instant},
};

use crate::{
    error::ProtocolError,
    frame::Frame,
    link::ByteLink,
    params::{LinkParams, TelemetryRequest},
    session::Session,
    state::{RoverState, NUM_TELEMETRY_VALUES},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Telemetry request byte (`r`).
pub const TELEMETRY_REQUEST: u8 = b'r';

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Requests and parses telemetry replies.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryReader {
    /// Limit on the wait for each line, `None` to wait forever.
    read_timeout: Option<Duration>,

    request: TelemetryRequest,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for TelemetryReader {
    fn default() -> Self {
        Self {
            read_timeout: None,
            request: TelemetryRequest::Raw,
        }
    }
}

impl TelemetryReader {
    pub fn new(params: &LinkParams) -> Self {
        Self {
            read_timeout: params.read_timeout(),
            request: params.telemetry_request,
        }
    }

    /// Request telemetry and parse the reply into `state`.
    ///
    /// Either all eleven values are replaced or, on error, none are. A line which isn't a number
    /// fails with [`ProtocolError::MalformedTelemetry`] for the first bad line. The rest of the
    /// reply is still consumed so the session stays in step for the next request. End of stream
    /// fails with
    /// [`ProtocolError::LinkClosed`] and kills the session.
    pub fn read<L: ByteLink>(
        &self,
        session: &mut Session<L>,
        state: &mut RoverState,
    ) -> Result<(), ProtocolError> {
        let result = match session.ensure_open() {
            Ok(()) => self.exchange(session),
            Err(e) => Err(e),
        };
        let result = session.check(result);

        if !session.is_connected() {
            state.connected = false;
        }

        let values = result?;
        state.apply_telemetry(&values);

        debug!(
            "Telemetry #{}: accel {:?}, gyro {:?}, compass {:?}, ir {:?}",
            state.message_number,
            &values[0..3],
            &values[3..6],
            &values[6..9],
            &values[9..11]
        );

        Ok(())
    }

    /// Send the request and collect the reply without touching any state.
    fn exchange<L: ByteLink>(
        &self,
        session: &mut Session<L>,
    ) -> Result<[f64; NUM_TELEMETRY_VALUES], ProtocolError> {
        let link = session.link_mut();

        match self.request {
            TelemetryRequest::Raw => link.write_bytes(&[TELEMETRY_REQUEST])?,
            TelemetryRequest::Framed => Frame::encode(TELEMETRY_REQUEST, &[])?.write(&mut *link)?,
        }

        let mut values = [0f64; NUM_TELEMETRY_VALUES];
        let mut malformed = None;

        for (index, value) in values.iter_mut().enumerate() {
            let deadline = self.read_timeout.map(|t| Instant::now() + t);

            let line = match link.read_line(deadline) {
                Ok(Some(l)) => l,
                Ok(None) => {
                    warn!("Link closed after {} of {} telemetry lines", index, NUM_TELEMETRY_VALUES);
                    return Err(ProtocolError::LinkClosed);
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    warn!("Timed out waiting for telemetry line {}", index);
                    return Err(ProtocolError::ReadTimeout);
                }
                Err(e) => return Err(e.into()),
            };

            trace!("telemetry[{}] = {:?}", index, line);

            // Keep reading after a bad line, link errors above take priority over it
            match parse_value(index, line) {
                Ok(v) => *value = v,
                Err(e) => {
                    malformed.get_or_insert(e);
                }
            }
        }

        match malformed {
            Some(e) => Err(e),
            None => Ok(values),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn parse_value(index: usize, line: String) -> Result<f64, ProtocolError> {
    match line.trim().parse::<f64>() {
        Ok(v) => Ok(v),
        Err(_) => {
            warn!("Malformed telemetry line {}: {:?}", index, line);
            Err(ProtocolError::MalformedTelemetry { index, line })
        }
    }
}
