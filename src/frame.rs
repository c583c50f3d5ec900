//! Wire framing: byte stuffing and supervisory/information frame construction.
//!
//! Stuffing applies only to the octets between the two `FLAG` delimiters
//! (never to the flags themselves): `FLAG` encodes as `ESC 0x5E`, `ESC`
//! encodes as `ESC 0x5D`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::config::{ADDR_RX_CMD, ADDR_TX_CMD, ESC, FLAG, STUFF_MASK};
use crate::config::{C_DISC, C_I0, C_I1, C_REJ0, C_REJ1, C_RR0, C_RR1, C_SET, C_UA};

/// A decoded frame kind, independent of its wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Set,
    Ua,
    Disc,
    Rr(bool),
    Rej(bool),
    Information(bool, Bytes),
}

impl Frame {
    fn control_byte(&self) -> u8 {
        match self {
            Frame::Set => C_SET,
            Frame::Ua => C_UA,
            Frame::Disc => C_DISC,
            Frame::Rr(false) => C_RR0,
            Frame::Rr(true) => C_RR1,
            Frame::Rej(false) => C_REJ0,
            Frame::Rej(true) => C_REJ1,
            Frame::Information(false, _) => C_I0,
            Frame::Information(true, _) => C_I1,
        }
    }

    /// Address byte this frame is sent under: Tx-originated commands and
    /// Rx's responses to them use `0x03`; Rx-originated commands (DISC)
    /// use `0x01`.
    fn address_byte(&self, from_rx_initiated: bool) -> u8 {
        if from_rx_initiated {
            ADDR_RX_CMD
        } else {
            ADDR_TX_CMD
        }
    }

    /// Serializes this frame to the wire, stuffed and flag-delimited.
    ///
    /// `from_rx_initiated` selects the `0x01` address convention for a
    /// Rx-originated DISC (or the Tx's UA answering it); every other frame
    /// kind uses `0x03` regardless of the flag.
    pub fn encode(&self, from_rx_initiated: bool) -> Bytes {
        match self {
            Frame::Information(seq, payload) => {
                build_information(*seq, payload, from_rx_initiated)
            }
            _ => build_supervisory(self.address_byte(from_rx_initiated), self.control_byte()),
        }
    }
}

/// Builds a 5-octet supervisory frame: `FLAG A C BCC1 FLAG`.
pub fn build_supervisory(a: u8, c: u8) -> Bytes {
    let mut buf = BytesMut::with_capacity(5);
    buf.put_u8(FLAG);
    buf.put_u8(a);
    buf.put_u8(c);
    buf.put_u8(a ^ c);
    buf.put_u8(FLAG);
    buf.freeze()
}

/// Builds an information frame for the given sequence bit and payload,
/// stuffing payload and BCC2 as needed.
pub fn build_information(sequence: bool, payload: &[u8], from_rx_initiated: bool) -> Bytes {
    let a = if from_rx_initiated {
        ADDR_RX_CMD
    } else {
        ADDR_TX_CMD
    };
    let c = if sequence { C_I1 } else { C_I0 };
    let bcc2 = payload.iter().fold(0u8, |acc, b| acc ^ b);

    let mut buf = BytesMut::with_capacity(payload.len() * 2 + 8);
    buf.put_u8(FLAG);
    buf.put_u8(a);
    buf.put_u8(c);
    buf.put_u8(a ^ c);
    stuff_into(payload, &mut buf);
    stuff_byte_into(bcc2, &mut buf);
    buf.put_u8(FLAG);
    buf.freeze()
}

fn stuff_byte_into(b: u8, out: &mut BytesMut) {
    if b == FLAG || b == ESC {
        out.put_u8(ESC);
        out.put_u8(b ^ STUFF_MASK);
    } else {
        out.put_u8(b);
    }
}

fn stuff_into(data: &[u8], out: &mut BytesMut) {
    for &b in data {
        stuff_byte_into(b, out);
    }
}

/// Un-stuffs a byte sequence captured between the two frame flags.
/// Returns `None` if a trailing escape octet is left dangling.
pub fn unstuff(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut iter = data.iter().copied();
    while let Some(b) = iter.next() {
        if b == ESC {
            let next = iter.next()?;
            out.push(next ^ STUFF_MASK);
        } else {
            out.push(b);
        }
    }
    Some(out)
}

/// A frame the Rx-side read DFA can observe: either a data-bearing
/// information frame or the DISC that signals graceful end-of-stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Information {
        sequence: bool,
        payload: Vec<u8>,
        bcc2_ok: bool,
    },
    Disc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RState {
    Start,
    FlagRcv,
    ARcv,
    CRcv { c: u8 },
    Reading { sequence: bool },
    Escaped { sequence: bool },
}

/// Payload-aware DFA driving the read-side state machine: recognizes
/// `I0`/`I1` (un-stuffing the payload on the fly and checking BCC2) and
/// `DISC`, restarting at `START` on any other mismatch.
#[derive(Debug, Clone)]
pub struct IncomingReader {
    state: RState,
    expected_a: u8,
    payload: Vec<u8>,
}

impl IncomingReader {
    pub fn new(expected_a: u8) -> Self {
        Self {
            state: RState::Start,
            expected_a,
            payload: Vec::new(),
        }
    }

    pub fn feed(&mut self, byte: u8) -> Option<Incoming> {
        match self.state {
            RState::Start => {
                if byte == FLAG {
                    self.state = RState::FlagRcv;
                }
                None
            }
            RState::FlagRcv => {
                if byte == self.expected_a {
                    self.state = RState::ARcv;
                } else if byte != FLAG {
                    self.state = RState::Start;
                }
                None
            }
            RState::ARcv => {
                if byte == FLAG {
                    self.state = RState::FlagRcv;
                } else {
                    self.state = RState::CRcv { c: byte };
                }
                None
            }
            RState::CRcv { c } => {
                if byte == self.expected_a ^ c {
                    if c == C_I0 || c == C_I1 {
                        self.payload.clear();
                        self.state = RState::Reading { sequence: c == C_I1 };
                    } else if c == C_DISC {
                        self.state = RState::Start;
                        return Some(Incoming::Disc);
                    } else {
                        self.state = RState::Start;
                    }
                } else if byte == FLAG {
                    self.state = RState::FlagRcv;
                } else {
                    self.state = RState::Start;
                }
                None
            }
            RState::Reading { sequence } => {
                if byte == ESC {
                    self.state = RState::Escaped { sequence };
                    None
                } else if byte == FLAG {
                    self.state = RState::Start;
                    let mut payload = std::mem::take(&mut self.payload);
                    match payload.pop() {
                        Some(bcc2) => {
                            let computed = payload.iter().fold(0u8, |acc, b| acc ^ b);
                            Some(Incoming::Information {
                                sequence,
                                payload,
                                bcc2_ok: computed == bcc2,
                            })
                        }
                        None => Some(Incoming::Information {
                            sequence,
                            payload: Vec::new(),
                            bcc2_ok: false,
                        }),
                    }
                } else {
                    self.payload.push(byte);
                    None
                }
            }
            RState::Escaped { sequence } => {
                self.payload.push(byte ^ STUFF_MASK);
                self.state = RState::Reading { sequence };
                None
            }
        }
    }
}
