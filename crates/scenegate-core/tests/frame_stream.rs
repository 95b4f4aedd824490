//! Frame codec and stream-accumulator tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use bytes::{BufMut, BytesMut};

use scenegate_core::protocol::frame::{read_entity_id, read_msg_id};
use scenegate_core::protocol::{
    Frame, FrameCodec, FrameStream, ENCRYPTED_FLAG, FRAME_HEADER_AFTER_LEN, FRAME_HEADER_LEN,
};
use scenegate_core::SceneGateError;

fn codec() -> FrameCodec {
    FrameCodec::default()
}

#[test]
fn encode_decode_round_trip() {
    let payloads: [&[u8]; 4] = [b"", b"a", b"hello scene", &[0xAB; 1299]];
    for payload in payloads {
        let wire = codec().encode(100_001, 7, payload, false).unwrap();
        assert_eq!(wire.len(), FRAME_HEADER_LEN + payload.len());

        let mut buf = BytesMut::from(&wire[..]);
        let frame = codec().decode(&mut buf).unwrap().expect("complete frame");
        assert_eq!(frame.msg_id, 100_001);
        assert_eq!(frame.sequence, 7);
        assert!(!frame.encrypted);
        assert_eq!(&frame.payload[..], payload);
        assert!(buf.is_empty());
    }
}

#[test]
fn round_trip_at_max_payload_boundary() {
    let max = codec().max_payload();
    let payload = vec![0x5C; max];
    let wire = codec().encode(100_002, 1, &payload, false).unwrap();

    let mut buf = BytesMut::from(&wire[..]);
    let frame = codec().decode(&mut buf).unwrap().expect("complete frame");
    assert_eq!(frame.payload.len(), max);

    let err = codec().encode(100_002, 1, &vec![0u8; max + 1], false).expect_err("over ceiling");
    assert!(matches!(err, SceneGateError::PayloadTooLarge { .. }));
}

#[test]
fn encrypted_flag_masked_out_of_length() {
    let payload = b"ciphertext";
    let wire = codec().encode(100_003, 9, payload, true).unwrap();

    // Bit 30 rides in the length word.
    let raw = i32::from_le_bytes(wire[0..4].try_into().unwrap());
    assert_ne!(raw as u32 & ENCRYPTED_FLAG, 0);
    assert_eq!(
        (raw & !(ENCRYPTED_FLAG as i32)) as usize,
        FRAME_HEADER_AFTER_LEN + payload.len()
    );

    let mut buf = BytesMut::from(&wire[..]);
    let frame = codec().decode(&mut buf).unwrap().expect("complete frame");
    assert!(frame.encrypted);
    assert_eq!(&frame.payload[..], payload);
}

#[test]
fn short_header_needs_more_data_without_consuming() {
    let mut buf = BytesMut::from(&[0x01u8, 0x02][..]);
    assert!(codec().decode(&mut buf).unwrap().is_none());
    assert_eq!(buf.len(), 2);
}

#[test]
fn partial_body_rewinds() {
    let wire = codec().encode(100_004, 3, b"partial", false).unwrap();
    let mut buf = BytesMut::from(&wire[..wire.len() - 3]);
    let before = buf.len();
    assert!(codec().decode(&mut buf).unwrap().is_none());
    assert_eq!(buf.len(), before);

    buf.extend_from_slice(&wire[wire.len() - 3..]);
    let frame = codec().decode(&mut buf).unwrap().expect("complete frame");
    assert_eq!(&frame.payload[..], b"partial");
}

#[test]
fn zero_and_negative_lengths_are_fatal() {
    for bad in [0i32, -1, -500, 5] {
        let mut buf = BytesMut::new();
        buf.put_i32_le(bad);
        buf.put_slice(&[0u8; 16]);
        let err = codec().decode(&mut buf).expect_err("must be fatal");
        assert!(matches!(err, SceneGateError::ProtocolViolation(_)), "length {bad}");
        assert!(err.is_fatal());
    }
}

#[test]
fn oversize_frame_is_fatal_before_body_arrives() {
    let mut buf = BytesMut::new();
    buf.put_i32_le((FRAME_HEADER_AFTER_LEN + 40_000) as i32);
    let err = codec().decode(&mut buf).expect_err("over ceiling");
    assert!(matches!(err, SceneGateError::PayloadTooLarge { .. }));
    assert!(err.is_fatal());
}

/// For all split points, incremental feeding yields the same frames as
/// feeding the whole stream at once.
#[test]
fn arbitrary_split_resumability() {
    let mut wire = Vec::new();
    for (id, payload) in [
        (100_010, &b"alpha"[..]),
        (100_011, &b""[..]),
        (100_012, &b"gamma-payload"[..]),
    ] {
        wire.extend_from_slice(&codec().encode(id, id % 100, payload, false).unwrap());
    }

    let whole: Vec<Frame> = FrameStream::new(codec()).feed(&wire).unwrap();
    assert_eq!(whole.len(), 3);

    for split in 0..=wire.len() {
        let mut stream = FrameStream::new(codec());
        let mut frames = stream.feed(&wire[..split]).unwrap();
        frames.extend(stream.feed(&wire[split..]).unwrap());

        assert_eq!(frames.len(), whole.len(), "split at {split}");
        for (a, b) in frames.iter().zip(whole.iter()) {
            assert_eq!(a.msg_id, b.msg_id, "split at {split}");
            assert_eq!(a.sequence, b.sequence, "split at {split}");
            assert_eq!(a.payload, b.payload, "split at {split}");
        }
        assert_eq!(stream.pending(), 0, "split at {split}");
    }
}

#[test]
fn poisoned_stream_stays_poisoned() {
    let mut stream = FrameStream::new(codec());
    let mut bad = Vec::new();
    bad.extend_from_slice(&(-4i32).to_le_bytes());
    assert!(stream.feed(&bad).is_err());
    assert!(stream.feed(b"more").is_err());
}

#[test]
fn raw_header_peeks() {
    let wire = codec().encode(100_020, 5, &77i64.to_le_bytes(), false).unwrap();
    assert_eq!(read_msg_id(&wire, 4), Some(100_020));
    // Entity id rides at the front of this payload.
    assert_eq!(read_entity_id(&wire, FRAME_HEADER_LEN), Some(77));
    assert_eq!(read_msg_id(&wire, wire.len()), None);
}
