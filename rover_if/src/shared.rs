//! # Shared rover session
//!
//! Lets several threads drive one rover, for example a telemetry poll thread alongside a thread
//! issuing motor demands. The session and the state sit behind one mutex, so a motor write can
//! never land in the middle of a telemetry reply and readers never see a half applied update.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{error::ProtocolError, link::ByteLink, session::Session, state::RoverState};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A session and its state, shareable between threads.
pub struct SharedRover<L: ByteLink> {
    inner: Arc<Mutex<Inner<L>>>,
}

struct Inner<L: ByteLink> {
    session: Session<L>,
    state: RoverState,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<L: ByteLink> Clone for SharedRover<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: ByteLink> SharedRover<L> {
    pub fn new(session: Session<L>, state: RoverState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { session, state })),
        }
    }

    /// Send motor demands, waiting for any exchange already in progress.
    pub fn write_motors(&self, m1: i32, m2: i32) -> Result<(), ProtocolError> {
        self.lock().session.write_motors(m1, m2)
    }

    /// Poll telemetry into the shared state.
    pub fn read_telemetry(&self) -> Result<(), ProtocolError> {
        let mut inner = self.lock();
        let Inner { session, state } = &mut *inner;
        session.read_telemetry(state)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> RoverState {
        self.lock().state.snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.lock().session.is_connected()
    }

    /// Run `f` with exclusive access to the session.
    pub fn with_session<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut Session<L>) -> R,
    {
        f(&mut self.lock().session)
    }

    // The state is only ever replaced whole, so a panic elsewhere while the lock was held can't
    // have left it half written.
    fn lock(&self) -> MutexGuard<'_, Inner<L>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{connection::ConnectionManager, link::SimLink, params::LinkParams};
    use std::thread;

    const REPLY: [&str; 11] = [
        "1.00", "2.00", "3.00", "0.10", "0.20", "0.30", "10.0", "20.0", "30.0", "5.5", "6.6",
    ];

    #[test]
    fn test_concurrent_writes_and_reads() {
        const NUM_POLLS: usize = 20;
        const NUM_WRITES: usize = 20;

        let mut lines = vec!["Hello, World!"];
        for _ in 0..NUM_POLLS {
            lines.extend_from_slice(&REPLY);
        }

        let mut state = RoverState::default();
        let session = ConnectionManager::new(&LinkParams::default())
            .connect(SimLink::new(lines), &mut state)
            .unwrap();
        let rover = SharedRover::new(session, state);

        let writer = {
            let rover = rover.clone();
            thread::spawn(move || {
                for i in 0..NUM_WRITES {
                    rover.write_motors(i as i32, -(i as i32)).unwrap();
                }
            })
        };

        for _ in 0..NUM_POLLS {
            rover.read_telemetry().unwrap();
        }
        writer.join().unwrap();

        let snapshot = rover.snapshot();
        assert_eq!(snapshot.message_number(), NUM_POLLS as u64);
        assert_eq!(snapshot.ir().rear, 6.6);
        assert!(rover.is_connected());

        // Every write is either a whole frame or a lone request byte
        let written = rover.with_session(|s| s.link().written().to_vec());
        let mut i = 0;
        let (mut frames, mut requests) = (0, 0);
        while i < written.len() {
            match written[i] {
                b'r' => {
                    requests += 1;
                    i += 1;
                }
                0x7E => {
                    assert_eq!(written[i + 1], 5);
                    assert_eq!(written[i + 2], b'm');
                    frames += 1;
                    i += 7;
                }
                b => panic!("Unexpected byte {:#04x} at {}", b, i),
            }
        }
        assert_eq!(frames, NUM_WRITES);
        assert_eq!(requests, NUM_POLLS);
    }
}
