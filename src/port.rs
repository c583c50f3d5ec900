//! Serial port adapter: opens the link device in raw, non-canonical mode
//! and exposes a one-octet-at-a-time read contract.

use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

use serial2::SerialPort;

use crate::Error;

/// Short poll interval used for the non-blocking read contract: a `readByte`
/// returns promptly with either 0 or 1 octet rather than blocking, matching
/// VMIN=0/VTIME=0 semantics.
const READ_POLL_TIMEOUT: Duration = Duration::from_millis(20);

/// Transport abstraction the link layer drives. Implemented for the real
/// serial port and, in tests, for an in-memory duplex double.
pub trait LinkPort: Read + Write {
    /// Reads at most one octet without blocking indefinitely. Returns
    /// `Ok(None)` if no octet was available within the adapter's poll
    /// interval, matching the spec's "returns 0 or 1 octets" contract.
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Writes every octet of `buf`, retrying on short writes.
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_all(buf)?;
        Ok(buf.len())
    }
}

/// Opens `device` at `baud_rate` in 8N1, raw mode with a short read
/// timeout, matching `VMIN=0, VTIME=0` semantics on the octet granularity
/// the data link layer depends on.
pub fn open(device: &str, baud_rate: u32) -> Result<SerialPort, Error> {
    let mut port = SerialPort::open(device, baud_rate)
        .map_err(|e| Error::TransportOpen(format!("{device}: {e}")))?;
    port.set_read_timeout(READ_POLL_TIMEOUT)
        .map_err(|e| Error::TransportOpen(format!("{device}: {e}")))?;
    Ok(port)
}

impl LinkPort for SerialPort {}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::VecDeque;

    /// An in-memory duplex "serial port" for exercising the link state
    /// machines without real hardware. `inbound` is what the peer under
    /// test will read; `outbound` captures what it writes.
    #[derive(Debug, Default)]
    pub struct LoopbackPort {
        pub inbound: VecDeque<u8>,
        pub outbound: Vec<u8>,
    }

    impl LoopbackPort {
        pub fn with_inbound(bytes: &[u8]) -> Self {
            Self {
                inbound: bytes.iter().copied().collect(),
                outbound: Vec::new(),
            }
        }

        pub fn push_inbound(&mut self, bytes: &[u8]) {
            self.inbound.extend(bytes.iter().copied());
        }
    }

    impl Read for LoopbackPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if buf.is_empty() || self.inbound.is_empty() {
                return Ok(0);
            }
            let mut n = 0;
            while n < buf.len() {
                match self.inbound.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    impl Write for LoopbackPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.outbound.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LinkPort for LoopbackPort {
        fn read_byte(&mut self) -> io::Result<Option<u8>> {
            Ok(self.inbound.pop_front())
        }
    }

    use std::collections::HashMap;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::thread::sleep;
    use std::time::Duration as StdDuration;

    #[derive(Default)]
    struct ChannelState {
        queue: VecDeque<u8>,
        frames_written: usize,
    }

    #[derive(Clone)]
    struct Channel {
        state: Arc<Mutex<ChannelState>>,
        drop_on_write: Arc<Mutex<HashSet<usize>>>,
        corrupt_on_write: Arc<Mutex<HashMap<usize, usize>>>,
    }

    impl Channel {
        fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(ChannelState::default())),
                drop_on_write: Arc::new(Mutex::new(HashSet::new())),
                corrupt_on_write: Arc::new(Mutex::new(HashMap::new())),
            }
        }
    }

    /// One end of a pair of [`DuplexPort`]s sharing an in-memory medium.
    /// Each whole `write()` call is treated as one frame: `ChannelControl`
    /// can drop or bit-flip a frame by its 0-based send index on the
    /// channel it controls, to reproduce spec scenarios S4/S5.
    pub struct DuplexPort {
        outbound: Channel,
        inbound: Channel,
    }

    impl Read for DuplexPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut state = self.inbound.state.lock().unwrap();
            if buf.is_empty() || state.queue.is_empty() {
                return Ok(0);
            }
            let mut n = 0;
            while n < buf.len() {
                match state.queue.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    impl Write for DuplexPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let index = {
                let mut state = self.outbound.state.lock().unwrap();
                let index = state.frames_written;
                state.frames_written += 1;
                index
            };
            if self.outbound.drop_on_write.lock().unwrap().contains(&index) {
                return Ok(buf.len());
            }
            let mut frame = buf.to_vec();
            if let Some(&offset) = self.outbound.corrupt_on_write.lock().unwrap().get(&index) {
                if let Some(b) = frame.get_mut(offset) {
                    *b ^= 0x01;
                }
            }
            self.outbound.state.lock().unwrap().queue.extend(frame);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LinkPort for DuplexPort {
        fn read_byte(&mut self) -> io::Result<Option<u8>> {
            let next = self.inbound.state.lock().unwrap().queue.pop_front();
            if next.is_none() {
                sleep(StdDuration::from_micros(200));
            }
            Ok(next)
        }
    }

    /// A handle letting a test drop or corrupt a specific frame sent on
    /// one direction of a [`duplex_pair`], by 0-based send order.
    #[derive(Clone)]
    pub struct ChannelControl(Channel);

    impl ChannelControl {
        pub fn drop_frame(&self, send_index: usize) {
            self.0.drop_on_write.lock().unwrap().insert(send_index);
        }

        pub fn corrupt_frame(&self, send_index: usize, byte_offset: usize) {
            self.0
                .corrupt_on_write
                .lock()
                .unwrap()
                .insert(send_index, byte_offset);
        }

        pub fn frames_written(&self) -> usize {
            self.0.state.lock().unwrap().frames_written
        }
    }

    /// Builds a connected pair of in-memory serial ports and the controls
    /// to drop or corrupt specific frames on each direction: `a_to_b`
    /// governs frames written by `a` (as observed by `b`), and vice versa.
    pub fn duplex_pair() -> (DuplexPort, DuplexPort, ChannelControl, ChannelControl) {
        let a_to_b = Channel::new();
        let b_to_a = Channel::new();
        let a = DuplexPort {
            outbound: a_to_b.clone(),
            inbound: b_to_a.clone(),
        };
        let b = DuplexPort {
            outbound: b_to_a.clone(),
            inbound: a_to_b.clone(),
        };
        (
            a,
            b,
            ChannelControl(a_to_b),
            ChannelControl(b_to_a),
        )
    }
}
