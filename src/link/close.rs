//! Four-way close handshake.

use super::{LinkLayer, PollOutcome};
use crate::config::{Role, ADDR_RX_CMD, ADDR_TX_CMD};
use crate::dfa::SupervisoryReader;
use crate::frame::Frame;
use crate::port::LinkPort;
use crate::Error;

pub(crate) fn run<P: LinkPort>(link: &mut LinkLayer<P>) -> Result<(), Error> {
    match link.role {
        Role::Tx => run_tx(link),
        Role::Rx => run_rx(link),
    }
}

fn run_tx<P: LinkPort>(link: &mut LinkLayer<P>) -> Result<(), Error> {
    link.send_frame(&Frame::Disc, false)?; // A=0x03, Tx-initiated
    link.timer.arm(link.timeout);

    let mut reader = SupervisoryReader::new(ADDR_RX_CMD); // awaiting Rx's DISC
    let mut retries_used = 0u8;
    loop {
        match link.poll()? {
            PollOutcome::Byte(byte) => {
                if let Some(Frame::Disc) = reader.feed(byte) {
                    link.timer.cancel();
                    link.send_frame(&Frame::Ua, true)?; // A=0x01
                    log::debug!("close(tx): DISC from Rx observed, UA sent");
                    return Ok(());
                }
            }
            PollOutcome::TimedOut => {
                retries_used += 1;
                if retries_used > link.max_retransmissions {
                    link.stats.timeouts += 1;
                    log::warn!("close(tx): teardown timed out after {retries_used} attempts");
                    return Err(Error::HandshakeTimeout);
                }
                link.stats.retransmissions += 1;
                reader.reset();
                link.send_frame(&Frame::Disc, false)?;
                link.timer.arm(link.timeout);
            }
            PollOutcome::Idle => {}
        }
    }
}

fn run_rx<P: LinkPort>(link: &mut LinkLayer<P>) -> Result<(), Error> {
    // No timer while awaiting the initiating DISC; the Tx side owns retry.
    let mut incoming = SupervisoryReader::new(ADDR_TX_CMD);
    loop {
        if let Some(byte) = link.port.read_byte().map_err(Error::Io)? {
            if let Some(Frame::Disc) = incoming.feed(byte) {
                break;
            }
        }
    }

    link.send_frame(&Frame::Disc, true)?; // A=0x01, Rx-initiated
    link.timer.arm(link.timeout);

    let mut reader = SupervisoryReader::new(ADDR_RX_CMD); // awaiting Tx's UA
    let mut retries_used = 0u8;
    loop {
        match link.poll()? {
            PollOutcome::Byte(byte) => {
                if let Some(Frame::Ua) = reader.feed(byte) {
                    link.timer.cancel();
                    log::debug!("close(rx): UA received, link torn down");
                    return Ok(());
                }
            }
            PollOutcome::TimedOut => {
                retries_used += 1;
                if retries_used > link.max_retransmissions {
                    link.stats.timeouts += 1;
                    log::warn!("close(rx): teardown timed out after {retries_used} attempts");
                    return Err(Error::HandshakeTimeout);
                }
                link.stats.retransmissions += 1;
                reader.reset();
                link.send_frame(&Frame::Disc, true)?;
                link.timer.arm(link.timeout);
            }
            PollOutcome::Idle => {}
        }
    }
}
