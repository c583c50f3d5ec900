//! Write (Tx side of one I-frame exchange).

use super::{LinkLayer, PollOutcome};
use crate::config::{ADDR_TX_CMD, MAX_PAYLOAD_SIZE};
use crate::dfa::SupervisoryReader;
use crate::frame::{build_information, Frame};
use crate::port::LinkPort;
use crate::Error;

pub(crate) fn run<P: LinkPort>(link: &mut LinkLayer<P>, payload: &[u8]) -> Result<usize, Error> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::InvalidParams(format!(
            "payload of {} octets exceeds MAX_PAYLOAD_SIZE ({MAX_PAYLOAD_SIZE})",
            payload.len()
        )));
    }

    let sequence = link.sequence;
    let frame_bytes = build_information(sequence, payload, false);

    let send = |link: &mut LinkLayer<P>| -> Result<(), Error> {
        link.port.write_bytes(&frame_bytes).map_err(Error::Io)?;
        link.stats.frames_sent += 1;
        Ok(())
    };
    send(link)?;
    link.timer.arm(link.timeout);

    let mut reader = SupervisoryReader::new(ADDR_TX_CMD);
    let mut retries_used = 0u8;
    loop {
        match link.poll()? {
            PollOutcome::Byte(byte) => match reader.feed(byte) {
                Some(Frame::Rr(bit)) if bit == !sequence => {
                    link.timer.cancel();
                    link.sequence = !sequence;
                    log::debug!("write: RR{} received, frame acknowledged", bit as u8);
                    return Ok(payload.len());
                }
                Some(Frame::Rr(bit)) if bit == sequence => {
                    log::debug!("write: duplicate RR{} ignored", bit as u8);
                }
                Some(Frame::Rej(bit)) if bit == sequence => {
                    log::debug!("write: REJ{bit} received, retransmitting immediately", bit = bit as u8);
                    link.stats.retransmissions += 1;
                    send(link)?;
                    link.timer.arm(link.timeout);
                }
                _ => {}
            },
            PollOutcome::TimedOut => {
                retries_used += 1;
                if retries_used > link.max_retransmissions {
                    link.stats.timeouts += 1;
                    log::warn!("write: data timeout after {retries_used} attempts");
                    return Err(Error::DataTimeout);
                }
                link.stats.retransmissions += 1;
                log::debug!("write: timeout, retransmission #{retries_used}");
                reader.reset();
                send(link)?;
                link.timer.arm(link.timeout);
            }
            PollOutcome::Idle => {}
        }
    }
}
