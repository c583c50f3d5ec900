//! The link session: owns the serial port, the alternating-bit sequence
//! state, and the retransmission counters, and exposes the four
//! operations (`open`, `write`, `read`, `close`) the application layer
//! drives.

mod close;
mod open;
mod read;
mod write;

use std::time::Duration;

use serial2::SerialPort;

use crate::config::{LinkParams, Role};
use crate::frame::Frame;
use crate::port::{self, LinkPort};
use crate::timer::Timer;
use crate::Error;

/// Counters reported by [`LinkLayer::close`] when `show_stats` is set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub frames_sent: u32,
    pub retransmissions: u32,
    pub timeouts: u32,
}

/// One outcome of polling the port for the next octet while a
/// retransmittable operation is in flight.
pub(crate) enum PollOutcome {
    Byte(u8),
    TimedOut,
    Idle,
}

/// An open data link session. Not `Clone`: a session owns the one
/// outstanding exchange the stop-and-wait discipline allows.
pub struct LinkLayer<P: LinkPort = SerialPort> {
    port: P,
    role: Role,
    timeout: Duration,
    max_retransmissions: u8,
    sequence: bool,
    expected_sequence: bool,
    timer: Timer,
    stats: Stats,
}

impl LinkLayer<SerialPort> {
    /// Opens the named serial device and runs the role-appropriate
    /// connection handshake.
    pub fn open(params: LinkParams) -> Result<Self, Error> {
        let port = port::open(&params.serial_port, params.baud_rate)?;
        Self::open_with_port(port, params)
    }
}

impl<P: LinkPort> LinkLayer<P> {
    pub(crate) fn open_with_port(port: P, params: LinkParams) -> Result<Self, Error> {
        let mut link = Self {
            port,
            role: params.role,
            timeout: params.timeout,
            max_retransmissions: params.n_retransmissions,
            sequence: false,
            expected_sequence: false,
            timer: Timer::new(),
            stats: Stats::default(),
        };
        match link.role {
            Role::Tx => open::run_tx(&mut link)?,
            Role::Rx => open::run_rx(&mut link)?,
        }
        Ok(link)
    }

    /// Sends one I-frame and blocks until it is acknowledged or the
    /// retransmission budget is exhausted.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        write::run(self, buf)
    }

    /// Blocks until the next I-frame is accepted, writing its payload into
    /// `packet`. Returns `0` when the peer has closed the connection.
    pub fn read(&mut self, packet: &mut Vec<u8>) -> Result<usize, Error> {
        read::run(self, packet)
    }

    /// Runs the four-way teardown handshake and, if `show_stats` is set,
    /// logs the session counters.
    pub fn close(&mut self, show_stats: bool) -> Result<Stats, Error> {
        close::run(self)?;
        if show_stats {
            log::info!(
                "link closed: frames_sent={} retransmissions={} timeouts={}",
                self.stats.frames_sent,
                self.stats.retransmissions,
                self.stats.timeouts
            );
        }
        Ok(self.stats)
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Polls for the next octet, surfacing a timer expiry as its own
    /// outcome so callers can drive resend logic without a blocking wait.
    pub(crate) fn poll(&mut self) -> Result<PollOutcome, Error> {
        if self.timer.poll_expired() {
            return Ok(PollOutcome::TimedOut);
        }
        match self.port.read_byte().map_err(Error::Io)? {
            Some(byte) => Ok(PollOutcome::Byte(byte)),
            None => Ok(PollOutcome::Idle),
        }
    }

    pub(crate) fn send_frame(&mut self, frame: &Frame, from_rx_initiated: bool) -> Result<(), Error> {
        let bytes = frame.encode(from_rx_initiated);
        self.port.write_bytes(&bytes).map_err(Error::Io)?;
        self.stats.frames_sent += 1;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    pub use crate::port::test_support::{duplex_pair, ChannelControl, DuplexPort, LoopbackPort};
}
