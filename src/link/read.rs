//! Read (Rx side of one I-frame exchange). No timer: the Rx trusts the
//! Tx's retransmission discipline and blocks indefinitely.

use super::LinkLayer;
use crate::config::ADDR_TX_CMD;
use crate::frame::{Frame, Incoming, IncomingReader};
use crate::port::LinkPort;
use crate::Error;

pub(crate) fn run<P: LinkPort>(link: &mut LinkLayer<P>, packet: &mut Vec<u8>) -> Result<usize, Error> {
    packet.clear();
    let mut reader = IncomingReader::new(ADDR_TX_CMD);

    loop {
        let Some(byte) = link.port.read_byte().map_err(Error::Io)? else {
            continue;
        };
        let Some(incoming) = reader.feed(byte) else {
            continue;
        };

        match incoming {
            Incoming::Disc => {
                log::debug!("read: DISC observed mid-read, treating as end-of-stream");
                return Ok(0);
            }
            Incoming::Information {
                sequence,
                payload,
                bcc2_ok,
            } => {
                let is_new = sequence == link.expected_sequence;
                match (bcc2_ok, is_new) {
                    (true, true) => {
                        let ack = !link.expected_sequence;
                        link.send_frame(&Frame::Rr(ack), false)?;
                        link.expected_sequence = ack;
                        log::debug!("read: I{} accepted", sequence as u8);
                        *packet = payload;
                        return Ok(packet.len());
                    }
                    (true, false) => {
                        // Already accepted and acked; re-send that same ack
                        // rather than recomputing one from the (since
                        // toggled) current expected sequence.
                        link.send_frame(&Frame::Rr(!sequence), false)?;
                        log::debug!("read: duplicate I{} re-acked, not re-delivered", sequence as u8);
                    }
                    (false, true) => {
                        link.send_frame(&Frame::Rej(link.expected_sequence), false)?;
                        log::debug!("read: I{} failed BCC2, REJ sent", sequence as u8);
                    }
                    (false, false) => {
                        link.send_frame(&Frame::Rr(!sequence), false)?;
                        log::debug!("read: corrupted duplicate I{} re-acked", sequence as u8);
                    }
                }
            }
        }
    }
}
