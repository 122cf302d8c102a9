//! # Frame codec
//!
//! Motor demands are sent to the rover inside a small length-prefixed frame:
//!
//! ```text
//! +--------+----------------+---------+------>
//! | Header | Message Length | Data ID | Data
//! +--------+----------------+---------+------>
//! ```
//!
//! The length counts the data ID byte plus the data, so it is never zero. Telemetry requests are
//! not framed, see [`crate::telemetry`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use std::convert::TryFrom;

use crate::{error::ProtocolError, link::ByteLink};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Header byte which starts every frame (`~`).
pub const FRAME_HEADER: u8 = 0x7E;

/// Largest data payload which fits alongside the data ID in the length byte.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize - 1;

/// Header and length bytes.
const FRAME_OVERHEAD: usize = 2;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An encoded frame, ready to be written to the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Frame {
    /// Encode a frame carrying `data_id` followed by `payload`.
    ///
    /// Fails with [`ProtocolError::PayloadTooLarge`] if the data ID and payload together would
    /// not fit the single length byte.
    pub fn encode(data_id: u8, payload: &[u8]) -> Result<Self, ProtocolError> {
        let length = u8::try_from(payload.len() + 1)
            .map_err(|_| ProtocolError::PayloadTooLarge(payload.len()))?;

        let mut bytes = Vec::with_capacity(FRAME_OVERHEAD + 1 + payload.len());
        bytes.push(FRAME_HEADER);
        bytes.push(length);
        bytes.push(data_id);
        bytes.extend_from_slice(payload);

        Ok(Self { bytes })
    }

    /// Parse a single complete frame.
    ///
    /// Returns `None` if `bytes` doesn't start with the header, is truncated, or carries trailing
    /// bytes beyond the declared length.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [FRAME_HEADER, length, _, ..]
                if *length as usize + FRAME_OVERHEAD == bytes.len() =>
            {
                Some(Self {
                    bytes: bytes.to_vec(),
                })
            }
            _ => None,
        }
    }

    /// The value of the length byte.
    pub fn length(&self) -> u8 {
        self.bytes[1]
    }

    /// The data ID (command) byte.
    pub fn data_id(&self) -> u8 {
        self.bytes[FRAME_OVERHEAD]
    }

    /// The data following the data ID.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[FRAME_OVERHEAD + 1..]
    }

    /// The full frame as it goes on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write the whole frame to the link.
    ///
    /// No response is awaited.
    pub fn write<L: ByteLink + ?Sized>(&self, link: &mut L) -> Result<(), ProtocolError> {
        trace!("Writing frame {:02X?}", self.bytes);
        link.write_bytes(&self.bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::link::SimLink;
    use proptest::prelude::*;

    #[test]
    fn test_encode_layout() {
        let frame = Frame::encode(b'm', &[10, 0, 20, 1]).unwrap();
        assert_eq!(frame.as_bytes(), &[0x7E, 5, b'm', 10, 0, 20, 1]);
        assert_eq!(frame.length(), 5);
        assert_eq!(frame.data_id(), b'm');
        assert_eq!(frame.payload(), &[10, 0, 20, 1]);

        let frame = Frame::encode(b'r', &[]).unwrap();
        assert_eq!(frame.as_bytes(), &[0x7E, 1, b'r']);
        assert!(frame.payload().is_empty());
    }

    #[test]
    fn test_payload_limits() {
        assert!(Frame::encode(0, &[0; MAX_PAYLOAD_LEN]).is_ok());

        match Frame::encode(0, &[0; MAX_PAYLOAD_LEN + 1]) {
            Err(ProtocolError::PayloadTooLarge(n)) => assert_eq!(n, 255),
            r => panic!("Expected PayloadTooLarge, got {:?}", r),
        }
    }

    #[test]
    fn test_decode_rejects_bad_frames() {
        assert_eq!(Frame::decode(&[]), None);
        assert_eq!(Frame::decode(&[0x7F, 1, b'r']), None);
        assert_eq!(Frame::decode(&[0x7E, 2, b'r']), None);
        assert_eq!(Frame::decode(&[0x7E, 1, b'r', 0]), None);
        assert_eq!(Frame::decode(&[0x7E, 0]), None);
    }

    #[test]
    fn test_write() {
        let mut link = SimLink::new(Vec::<String>::new());
        let frame = Frame::encode(b'm', &[1, 2]).unwrap();
        frame.write(&mut link).unwrap();
        frame.write(&mut link).unwrap();
        assert_eq!(link.written(), &[0x7E, 3, b'm', 1, 2, 0x7E, 3, b'm', 1, 2]);
    }

    proptest! {
        #[test]
        fn prop_frame_round_trip(
            id in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_LEN)
        ) {
            let frame = Frame::encode(id, &payload).unwrap();
            let decoded = Frame::decode(frame.as_bytes()).unwrap();

            prop_assert_eq!(decoded.length() as usize, payload.len() + 1);
            prop_assert_eq!(decoded.data_id(), id);
            prop_assert_eq!(decoded.payload(), payload.as_slice());
        }

        #[test]
        fn prop_oversized_payload_rejected(
            id in any::<u8>(),
            len in (MAX_PAYLOAD_LEN + 1)..600usize
        ) {
            let payload = vec![0u8; len];
            prop_assert!(matches!(
                Frame::encode(id, &payload),
                Err(ProtocolError::PayloadTooLarge(n)) if n == len
            ));
        }
    }
}
