//! Application framing: fragments a file into START/DATA/END packets and
//! reconstructs it at the receiver.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::config::MAX_PAYLOAD_SIZE;
use crate::link::LinkLayer;
use crate::port::LinkPort;
use crate::{Error, Result};

pub const C_DATA: u8 = 1;
pub const C_START: u8 = 2;
pub const C_END: u8 = 3;

const SIZE_FIELD_LEN: u8 = 8;
/// `C_kind | T=0 | L=8 | fileSize(8, BE)`.
const CONTROL_PACKET_LEN: usize = 11;
/// Largest chunk of raw file data a DATA packet can carry once its 3-octet
/// header is subtracted from the I-frame payload budget.
const MAX_CHUNK_LEN: usize = MAX_PAYLOAD_SIZE - 3;

fn build_control_packet(kind: u8, file_size: u64) -> Vec<u8> {
    let mut packet = Vec::with_capacity(CONTROL_PACKET_LEN);
    packet.push(kind);
    packet.push(0); // T: file-size parameter
    packet.push(SIZE_FIELD_LEN);
    packet.extend_from_slice(&file_size.to_be_bytes());
    packet
}

fn parse_control_packet(kind: u8, buf: &[u8]) -> Result<u64> {
    if buf.len() != CONTROL_PACKET_LEN || buf[0] != kind || buf[2] != SIZE_FIELD_LEN {
        return Err(Error::InvalidParams(format!(
            "malformed control packet (expected kind {kind}, {CONTROL_PACKET_LEN} octets)"
        )));
    }
    let mut size_bytes = [0u8; 8];
    size_bytes.copy_from_slice(&buf[3..11]);
    Ok(u64::from_be_bytes(size_bytes))
}

fn build_data_packet(chunk: &[u8]) -> Vec<u8> {
    let len = chunk.len() as u16;
    let mut packet = Vec::with_capacity(3 + chunk.len());
    packet.push(C_DATA);
    packet.push((len >> 8) as u8);
    packet.push((len & 0xFF) as u8);
    packet.extend_from_slice(chunk);
    packet
}

fn parse_data_packet(buf: &[u8]) -> Result<&[u8]> {
    if buf.len() < 3 || buf[0] != C_DATA {
        return Err(Error::InvalidParams("malformed DATA packet".into()));
    }
    let len = ((buf[1] as usize) << 8) | buf[2] as usize;
    if buf.len() != 3 + len {
        return Err(Error::InvalidParams(format!(
            "DATA packet declares {len} octets, carries {}",
            buf.len() - 3
        )));
    }
    Ok(&buf[3..])
}

/// Sends `path` over an already-open Tx link, bracketed by START and END.
pub fn send_file<P: LinkPort>(link: &mut LinkLayer<P>, path: &Path) -> Result<()> {
    let mut file = File::open(path)?;
    let file_size = file.metadata()?.len();

    link.write(&build_control_packet(C_START, file_size))?;
    log::info!("app: sent START, file_size={file_size}");

    let mut chunk = vec![0u8; MAX_CHUNK_LEN];
    let mut sent = 0u64;
    loop {
        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        link.write(&build_data_packet(&chunk[..n]))?;
        sent += n as u64;
    }
    log::info!("app: sent {sent} octets of file data");

    link.write(&build_control_packet(C_END, file_size))?;
    log::info!("app: sent END");
    Ok(())
}

/// Receives a file over an already-open Rx link into `path`, verifying
/// that START and END agree on the file size.
pub fn receive_file<P: LinkPort>(link: &mut LinkLayer<P>, path: &Path) -> Result<()> {
    let mut packet = Vec::new();

    let n = link.read(&mut packet)?;
    if n == 0 || packet.first() != Some(&C_START) {
        return Err(Error::InvalidParams(
            "expected START packet at start of transfer".into(),
        ));
    }
    let expected_size = parse_control_packet(C_START, &packet)?;
    log::info!("app: received START, file_size={expected_size}");

    let mut out = File::create(path)?;
    let mut received = 0u64;
    loop {
        let n = link.read(&mut packet)?;
        if n == 0 {
            return Err(Error::InvalidParams(
                "link closed before END packet was received".into(),
            ));
        }
        match packet[0] {
            C_DATA => {
                let data = parse_data_packet(&packet)?;
                out.write_all(data)?;
                received += data.len() as u64;
            }
            C_END => {
                let got_size = parse_control_packet(C_END, &packet)?;
                if got_size != expected_size {
                    return Err(Error::SizeMismatch {
                        expected: expected_size,
                        got: got_size,
                    });
                }
                log::info!("app: received END, {received} octets written to {path:?}");
                return Ok(());
            }
            other => {
                return Err(Error::InvalidParams(format!(
                    "unexpected packet kind {other} mid-transfer"
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LinkParams, Role};
    use crate::link::test_support::duplex_pair;
    use std::thread;
    use std::time::Duration;

    /// S6: a full file round-trip over a simulated link reconstructs the
    /// file byte-for-byte and agrees on its size in START and END.
    #[test]
    fn s6_file_round_trips_byte_identical() {
        let dir = std::env::temp_dir().join(format!(
            "rcom-link-test-{:?}",
            std::thread::current().id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let src_path = dir.join("src.bin");
        let dst_path = dir.join("dst.bin");

        let mut contents = Vec::with_capacity(2500);
        for i in 0..2500u32 {
            contents.push((i % 256) as u8);
        }
        std::fs::write(&src_path, &contents).unwrap();

        let (a, b, _a_to_b, _b_to_a) = duplex_pair();
        let tx_path = src_path.clone();
        let tx = thread::spawn(move || -> Result<()> {
            let mut link = LinkLayer::open_with_port(
                a,
                LinkParams::new("a", Role::Tx).timeout(Duration::from_millis(30)),
            )?;
            send_file(&mut link, &tx_path)?;
            link.close(false)?;
            Ok(())
        });
        let dst_path_rx = dst_path.clone();
        let rx = thread::spawn(move || -> Result<()> {
            let mut link = LinkLayer::open_with_port(
                b,
                LinkParams::new("b", Role::Rx).timeout(Duration::from_millis(30)),
            )?;
            receive_file(&mut link, &dst_path_rx)?;
            link.close(false)?;
            Ok(())
        });

        tx.join().unwrap().unwrap();
        rx.join().unwrap().unwrap();

        let received = std::fs::read(&dst_path).unwrap();
        assert_eq!(received, contents);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn control_packet_round_trips() {
        let packet = build_control_packet(C_START, 2500);
        assert_eq!(packet.len(), CONTROL_PACKET_LEN);
        assert_eq!(parse_control_packet(C_START, &packet).unwrap(), 2500);
    }

    #[test]
    fn data_packet_round_trips() {
        let chunk = vec![0xABu8; 509];
        let packet = build_data_packet(&chunk);
        assert_eq!(packet.len(), 3 + 509);
        assert_eq!(parse_data_packet(&packet).unwrap(), chunk.as_slice());
    }

    #[test]
    fn data_packet_rejects_length_mismatch() {
        let mut packet = build_data_packet(&[1, 2, 3]);
        packet.truncate(packet.len() - 1);
        assert!(parse_data_packet(&packet).is_err());
    }

    /// S6: a 2500-octet file chunked at a 509-octet usable payload (i.e. a
    /// 512-octet MAX_PAYLOAD_SIZE minus the 3-octet DATA header) splits
    /// into exactly five packets of 509, 509, 509, 509, 464 octets.
    #[test]
    fn chunking_matches_scenario_s6() {
        let total = 2500usize;
        let max_chunk = 509usize;
        let mut remaining = total;
        let mut lengths = Vec::new();
        while remaining > 0 {
            let n = remaining.min(max_chunk);
            lengths.push(n);
            remaining -= n;
        }
        assert_eq!(lengths, vec![509, 509, 509, 509, 464]);
    }
}
