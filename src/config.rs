// Parameters and wire-level constants shared across the crate.
use std::time::Duration;

use derive_more::Display;

/// Distinguished frame delimiter. Never appears unescaped inside a frame.
pub const FLAG: u8 = 0x7E;
/// Escape octet used by byte stuffing.
pub const ESC: u8 = 0x7D;
/// XOR mask applied to an escaped octet.
pub const STUFF_MASK: u8 = 0x20;

/// Address byte used by Tx-originated commands and the Rx responses to them.
pub const ADDR_TX_CMD: u8 = 0x03;
/// Address byte used by Rx-originated commands (DISC) and the Tx's closing UA.
pub const ADDR_RX_CMD: u8 = 0x01;

pub const C_SET: u8 = 0x03;
pub const C_UA: u8 = 0x07;
pub const C_DISC: u8 = 0x0B;
pub const C_I0: u8 = 0x00;
pub const C_I1: u8 = 0x40;
pub const C_RR0: u8 = 0xAA;
pub const C_RR1: u8 = 0xAB;
pub const C_REJ0: u8 = 0x54;
pub const C_REJ1: u8 = 0x55;

/// Largest I-frame payload this crate will build or accept.
pub const MAX_PAYLOAD_SIZE: usize = 1000;

/// Default baud rate used when the caller does not pin one down.
pub const DEFAULT_BAUD: u32 = 9600;
/// Default per-attempt timeout for a retryable send.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
/// Default retransmission budget (total attempts = 1 + this).
pub const DEFAULT_RETRANSMISSIONS: u8 = 3;

/// Role a session plays on the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Role {
    #[display("Tx")]
    Tx,
    #[display("Rx")]
    Rx,
}

/// Construction parameters for a [`crate::LinkLayer`], mirroring the
/// original `LinkLayer` struct passed to `llopen`.
#[derive(Debug, Clone)]
pub struct LinkParams {
    pub serial_port: String,
    pub role: Role,
    pub baud_rate: u32,
    pub n_retransmissions: u8,
    pub timeout: Duration,
}

impl LinkParams {
    pub fn new(serial_port: impl Into<String>, role: Role) -> Self {
        Self {
            serial_port: serial_port.into(),
            role,
            baud_rate: DEFAULT_BAUD,
            n_retransmissions: DEFAULT_RETRANSMISSIONS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn baud(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn retransmissions(mut self, n: u8) -> Self {
        self.n_retransmissions = n;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
