//! Open handshake: SET/UA on the Tx side, SET/UA on the Rx side.

use super::{LinkLayer, PollOutcome};
use crate::config::ADDR_TX_CMD;
use crate::dfa::SupervisoryReader;
use crate::frame::Frame;
use crate::port::LinkPort;
use crate::Error;

pub(crate) fn run_tx<P: LinkPort>(link: &mut LinkLayer<P>) -> Result<(), Error> {
    link.send_frame(&Frame::Set, false)?;
    link.timer.arm(link.timeout);

    let mut reader = SupervisoryReader::new(ADDR_TX_CMD);
    let mut retries_used = 0u8;
    loop {
        match link.poll()? {
            PollOutcome::Byte(byte) => {
                if let Some(Frame::Ua) = reader.feed(byte) {
                    link.timer.cancel();
                    log::debug!("open(tx): UA received, link established");
                    return Ok(());
                }
            }
            PollOutcome::TimedOut => {
                retries_used += 1;
                if retries_used > link.max_retransmissions {
                    link.stats.timeouts += 1;
                    log::warn!("open(tx): handshake timed out after {retries_used} attempts");
                    return Err(Error::HandshakeTimeout);
                }
                link.stats.retransmissions += 1;
                log::debug!("open(tx): SET retransmission #{retries_used}");
                reader.reset();
                link.send_frame(&Frame::Set, false)?;
                link.timer.arm(link.timeout);
            }
            PollOutcome::Idle => {}
        }
    }
}

pub(crate) fn run_rx<P: LinkPort>(link: &mut LinkLayer<P>) -> Result<(), Error> {
    let mut reader = SupervisoryReader::new(ADDR_TX_CMD);
    loop {
        if let Some(byte) = link.port.read_byte().map_err(Error::Io)? {
            if let Some(Frame::Set) = reader.feed(byte) {
                link.send_frame(&Frame::Ua, false)?;
                log::debug!("open(rx): SET received, UA sent");
                return Ok(());
            }
        }
    }
}
