//! A point-to-point file-transfer system over an unreliable serial link.
//!
//! The crate is split into a data link layer (framing, byte stuffing,
//! stop-and-wait ARQ, connection setup/teardown — [`link`]) and a thin
//! application layer fragmenting a file into START/DATA/END packets on top
//! of it ([`app`]).
//!
//! # Example
//! ```no_run
//! use rcom_link::{LinkLayer, LinkParams, Role};
//!
//! let params = LinkParams::new("/dev/ttyS0", Role::Tx).baud(115_200);
//! let mut link = LinkLayer::open(params)?;
//! link.write(b"hello")?;
//! link.close(true)?;
//! # Ok::<(), rcom_link::Error>(())
//! ```

use thiserror::Error as ThisError;

pub mod app;
pub mod config;
pub(crate) mod dfa;
pub(crate) mod frame;
pub mod link;
pub(crate) mod port;
pub(crate) mod timer;

pub use config::{LinkParams, Role};
pub use link::{LinkLayer, Stats};

/// Errors surfaced by the link and application layers.
///
/// Integrity and ordering faults (bad BCC, duplicate frames) are recovered
/// locally and never appear here — only exhaustion of a retry budget, a
/// transport that could not be opened, or file I/O failure reach the
/// caller.
#[derive(ThisError, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("could not open transport: {0}")]
    TransportOpen(String),
    #[error("handshake exceeded retransmission budget")]
    HandshakeTimeout,
    #[error("data frame acknowledgement exceeded retransmission budget")]
    DataTimeout,
    #[error("{0}")]
    InvalidParams(String),
    #[error("file size mismatch: START announced {expected}, END announced {got}")]
    SizeMismatch { expected: u64, got: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
