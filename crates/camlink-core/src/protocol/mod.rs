//! Protocol module containing the frame header codec.

pub mod codec;

pub use codec::{
    decode_frame, decode_header, encode_frame, encode_header, FrameHeader, ProtocolError,
    HEADER_SIZE, MAX_PAYLOAD_LEN,
};
