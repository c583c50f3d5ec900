//! The parameterized supervisory DFA shared by open, write-response, and
//! close. A single state machine, parameterized only by the address byte
//! it expects, drives SET/UA/DISC/RR/REJ recognition for every role that
//! never needs to decode a payload.

use crate::config::FLAG;
use crate::config::{C_DISC, C_REJ0, C_REJ1, C_RR0, C_RR1, C_SET, C_UA};
use crate::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    FlagRcv,
    ARcv,
    CRcv { c: u8 },
    BccOk { c: u8 },
}

/// Drives the shared supervisory DFA one octet at a time.
///
/// `expected_a` pins the address byte this machine will accept; any other
/// non-`FLAG` octet while waiting on the address byte restarts framing
/// from scratch.
#[derive(Debug, Clone)]
pub struct SupervisoryReader {
    state: State,
    expected_a: u8,
}

impl SupervisoryReader {
    pub fn new(expected_a: u8) -> Self {
        Self {
            state: State::Start,
            expected_a,
        }
    }

    pub fn reset(&mut self) {
        self.state = State::Start;
    }

    /// Feeds one received octet. Returns `Some(frame)` once a complete,
    /// BCC-valid supervisory frame has been recognized; the reader resets
    /// itself to `START` afterwards either way.
    pub fn feed(&mut self, byte: u8) -> Option<Frame> {
        self.state = match self.state {
            State::Start => {
                if byte == FLAG {
                    State::FlagRcv
                } else {
                    State::Start
                }
            }
            State::FlagRcv => {
                if byte == self.expected_a {
                    State::ARcv
                } else if byte == FLAG {
                    State::FlagRcv
                } else {
                    State::Start
                }
            }
            State::ARcv => {
                if byte == FLAG {
                    State::FlagRcv
                } else {
                    State::CRcv { c: byte }
                }
            }
            State::CRcv { c } => {
                if byte == self.expected_a ^ c {
                    State::BccOk { c }
                } else if byte == FLAG {
                    State::FlagRcv
                } else {
                    State::Start
                }
            }
            State::BccOk { c } => {
                if byte == FLAG {
                    let frame = control_byte_to_frame(c);
                    self.state = State::Start;
                    return frame;
                }
                State::Start
            }
        };
        None
    }
}

/// Maps a recognized control byte back to its [`Frame`] variant. `I0`/`I1`
/// never reach here (information frames carry a payload and are decoded by
/// [`crate::link::read`]'s payload-aware reader instead); an unrecognized
/// control byte is simply not a frame this crate understands and is
/// treated as a restart rather than a hard error.
fn control_byte_to_frame(c: u8) -> Option<Frame> {
    match c {
        C_SET => Some(Frame::Set),
        C_UA => Some(Frame::Ua),
        C_DISC => Some(Frame::Disc),
        C_RR0 => Some(Frame::Rr(false)),
        C_RR1 => Some(Frame::Rr(true)),
        C_REJ0 => Some(Frame::Rej(false)),
        C_REJ1 => Some(Frame::Rej(true)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ADDR_TX_CMD;

    fn feed_all(reader: &mut SupervisoryReader, bytes: &[u8]) -> Option<Frame> {
        let mut result = None;
        for &b in bytes {
            if let Some(f) = reader.feed(b) {
                result = Some(f);
            }
        }
        result
    }

    #[test]
    fn recognizes_set() {
        let mut reader = SupervisoryReader::new(ADDR_TX_CMD);
        let got = feed_all(&mut reader, &[0x7E, 0x03, 0x03, 0x00, 0x7E]);
        assert_eq!(got, Some(Frame::Set));
    }

    #[test]
    fn restarts_on_bad_bcc() {
        let mut reader = SupervisoryReader::new(ADDR_TX_CMD);
        // Bad BCC1 followed by a clean UA: the first attempt must not leak
        // state into the second.
        let got = feed_all(
            &mut reader,
            &[0x7E, 0x03, 0x07, 0xFF, 0x7E, 0x03, 0x07, 0x04, 0x7E],
        );
        assert_eq!(got, Some(Frame::Ua));
    }

    #[test]
    fn leading_garbage_is_ignored() {
        let mut reader = SupervisoryReader::new(ADDR_TX_CMD);
        let got = feed_all(&mut reader, &[0x11, 0x22, 0x7E, 0x03, 0x03, 0x00, 0x7E]);
        assert_eq!(got, Some(Frame::Set));
    }
}
