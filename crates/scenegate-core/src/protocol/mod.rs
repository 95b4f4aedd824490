//! Wire-level protocol: frame layout, codec, and stream accumulator.

pub mod frame;

pub use frame::{
    Frame, FrameCodec, FrameStream, DEFAULT_MAX_PAYLOAD, DEFAULT_SPLIT_THRESHOLD, ENCRYPTED_FLAG,
    FRAME_HEADER_AFTER_LEN, FRAME_HEADER_LEN,
};
