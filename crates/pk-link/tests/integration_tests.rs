// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for pk-link
//!
//! Frames travel between two in-memory links so every test exercises the
//! real encoder, decoder and CRC path end-to-end.

use pk_common::config::LinkConfig;
use pk_common::constants::FRAME_BUFFER_SIZE;
use pk_common::Error;
use pk_hal::mem::{MemSerial, StepTimer};
use pk_link::PacketLink;

type MemLink = PacketLink<MemSerial, StepTimer>;

fn mem_link() -> MemLink {
    PacketLink::new(MemSerial::new(), StepTimer::new(1), LinkConfig::DEFAULT)
}

/// Encode `payload` into the text that would appear on the wire
fn wire_frame(payload: &[u8]) -> Vec<u8> {
    let mut tx = mem_link();
    tx.send(payload).unwrap();
    let mut out = Vec::new();
    while let Some(ch) = tx.serial_mut().pop_tx() {
        out.push(ch);
    }
    out
}

mod crc_tests {
    use pk_link::{crc16_ccitt, Crc16};

    #[test]
    fn test_check_value() {
        assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty_input_is_init() {
        assert_eq!(crc16_ccitt(&[]), 0xFFFF);
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let data = [0x5Au8; 300];
        let mut crc = Crc16::new();
        crc.update(&data[..7]);
        crc.update(&data[7..]);
        assert_eq!(crc.value(), crc16_ccitt(&data));
    }
}

mod framing_tests {
    use super::*;

    #[test]
    fn test_wire_format_is_printable_text() {
        let frame = wire_frame(&[0x00, 0xFF, 0x10, 0x80]);
        let (terminator, text) = frame.split_last().unwrap();
        assert_eq!(*terminator, b'\n');
        assert_eq!(text.len() % 4, 0);
        assert!(text.iter().all(|&ch| ch.is_ascii_graphic()));
    }

    #[test]
    fn test_alternate_length_accepted() {
        let mut rx = mem_link();
        rx.serial_mut().inject(&wire_frame(&[0x66])).unwrap();

        let mut buf = [0u8; FRAME_BUFFER_SIZE];
        assert_eq!(rx.receive(&mut buf, 256, Some(1)), Ok(Some(1)));
        assert_eq!(buf[0], 0x66);
    }

    #[test]
    fn test_wrong_length_dropped() {
        let mut rx = mem_link();
        rx.serial_mut().inject(&wire_frame(&[1, 2, 3])).unwrap();

        let mut buf = [0u8; FRAME_BUFFER_SIZE];
        assert_eq!(rx.receive(&mut buf, 4, None), Err(Error::FrameLengthMismatch));
        assert_eq!(rx.stats().dropped, 1);
    }

    #[test]
    fn test_overflow_dropped_and_next_frame_received() {
        let mut rx = mem_link();
        rx.serial_mut().inject(&wire_frame(&[7; 40])).unwrap();
        rx.serial_mut().inject(&wire_frame(&[9; 4])).unwrap();

        let mut buf = [0u8; FRAME_BUFFER_SIZE];
        assert_eq!(rx.receive(&mut buf, 4, None), Err(Error::FrameOverflow));
        assert_eq!(rx.receive(&mut buf, 4, None), Ok(Some(4)));
        assert_eq!(&buf[..4], &[9; 4]);
    }

    #[test]
    fn test_empty_frames_are_ignored() {
        let mut rx = mem_link();
        rx.serial_mut().inject(b"\r\n\n").unwrap();

        let mut buf = [0u8; FRAME_BUFFER_SIZE];
        for _ in 0..3 {
            assert_eq!(rx.receive(&mut buf, 1, None), Ok(None));
        }
        assert_eq!(rx.stats().dropped, 0);
    }

    #[test]
    fn test_bad_crc_dropped() {
        let mut rx = mem_link();
        // "AQIDBA" is [1, 2, 3, 4]; the CRC bytes are zero
        rx.serial_mut().inject(b"AQIDBAAA\n").unwrap();

        let mut buf = [0u8; FRAME_BUFFER_SIZE];
        assert_eq!(rx.receive(&mut buf, 4, None), Err(Error::CrcMismatch));
    }
}

mod timeout_tests {
    use super::*;

    #[test]
    fn test_stalled_frame_times_out() {
        let mut rx = mem_link();
        let frame = wire_frame(&[0xA5; 16]);
        rx.serial_mut().inject(&frame[..8]).unwrap();

        let mut buf = [0u8; FRAME_BUFFER_SIZE];
        assert_eq!(rx.receive(&mut buf, 16, None), Err(Error::FrameTimeout));
        // One tick per read: the deadline fires after the configured window
        let elapsed = rx.timer().peek();
        assert!(elapsed >= u64::from(LinkConfig::DEFAULT.inactivity_timeout_ms));
        assert!(elapsed < 2 * u64::from(LinkConfig::DEFAULT.inactivity_timeout_ms));
    }

    #[test]
    fn test_fresh_frame_after_timeout() {
        let mut rx = mem_link();
        let stale = wire_frame(&[0x11; 16]);
        rx.serial_mut().inject(&stale[..6]).unwrap();

        let mut buf = [0u8; FRAME_BUFFER_SIZE];
        assert_eq!(rx.receive(&mut buf, 16, None), Err(Error::FrameTimeout));

        rx.serial_mut().inject(&wire_frame(&[0x22; 16])).unwrap();
        assert_eq!(rx.receive(&mut buf, 16, None), Ok(Some(16)));
        assert_eq!(&buf[..16], &[0x22; 16]);
    }

    #[test]
    fn test_partial_group_stall_times_out() {
        let mut rx = mem_link();
        // Two characters: not enough to decode a single byte
        rx.serial_mut().inject(b"AQ").unwrap();

        let mut buf = [0u8; FRAME_BUFFER_SIZE];
        assert_eq!(rx.receive(&mut buf, 4, None), Err(Error::FrameTimeout));
        assert_eq!(rx.stats().dropped, 1);

        rx.timer().advance(20_000);
        for _ in 0..100 {
            assert_eq!(rx.receive(&mut buf, 4, None), Ok(None));
        }

        rx.serial_mut().inject(&wire_frame(&[9, 9, 9, 9])).unwrap();
        assert_eq!(rx.receive(&mut buf, 4, None), Ok(Some(4)));
        assert_eq!(&buf[..4], &[9, 9, 9, 9]);
    }

    #[test]
    fn test_operand_waits_then_times_out() {
        let mut rx = mem_link();
        let mut buf = [0u8; FRAME_BUFFER_SIZE];
        assert_eq!(rx.receive_operand(&mut buf, 8), Err(Error::FrameTimeout));
        assert!(rx.timer().peek() >= u64::from(LinkConfig::DEFAULT.operand_timeout_ms));
    }

    #[test]
    fn test_operand_skips_leading_empty_frame() {
        let mut rx = mem_link();
        rx.serial_mut().inject(b"\r\n").unwrap();
        rx.serial_mut().inject(&wire_frame(&[3; 8])).unwrap();

        let mut buf = [0u8; FRAME_BUFFER_SIZE];
        assert_eq!(rx.receive_operand(&mut buf, 8), Ok(8));
    }
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_loopback_delivers_payload(
            payload in proptest::collection::vec(any::<u8>(), 1..=1026)
        ) {
            let mut tx = mem_link();
            let mut rx = mem_link();
            tx.send(&payload).unwrap();
            tx.serial_mut().transfer_to(rx.serial_mut()).unwrap();

            let mut buf = [0u8; FRAME_BUFFER_SIZE];
            let len = rx.receive(&mut buf, payload.len(), None).unwrap();
            prop_assert_eq!(len, Some(payload.len()));
            prop_assert_eq!(&buf[..payload.len()], payload.as_slice());
        }

        #[test]
        fn prop_single_character_corruption_detected(
            payload in proptest::collection::vec(any::<u8>(), 1..=64),
            index in any::<prop::sample::Index>(),
            replacement in 0x20u8..0x7F,
        ) {
            let mut frame = wire_frame(&payload);
            let text_len = frame.len() - 1;
            let pos = index.index(text_len);
            prop_assume!(frame[pos] != replacement);
            frame[pos] = replacement;

            let mut rx = mem_link();
            rx.serial_mut().inject(&frame).unwrap();
            rx.serial_mut().inject(&wire_frame(&payload)).unwrap();

            let mut buf = [0u8; FRAME_BUFFER_SIZE];
            prop_assert!(rx.receive(&mut buf, payload.len(), None).is_err());
            // The link recovers on the next clean frame
            prop_assert_eq!(rx.receive(&mut buf, payload.len(), None), Ok(Some(payload.len())));
            prop_assert_eq!(&buf[..payload.len()], payload.as_slice());
        }
    }
}
