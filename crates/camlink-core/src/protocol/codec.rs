//! Binary codec for the camera frame stream.
//!
//! Wire format, repeated for every frame on a persistent TCP connection:
//! ```text
//! [payload_len:4][reserved:4][payload:N]
//! ```
//! Total header size: 8 bytes.  `payload_len` is a big-endian `u32`.  The
//! reserved word has no defined meaning; it is read and carried through but
//! never interpreted.  The payload is a compressed still image.
//!
//! The codec works on byte slices only.  Reading the exact number of bytes
//! off a socket is the receiver's job (see `camlink-host`); it reads
//! [`HEADER_SIZE`] bytes, calls [`decode_header`], then reads
//! `payload_len` more bytes.

use thiserror::Error;

/// Size of the fixed frame header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Largest payload the codec accepts (32 MiB).
///
/// A 1080p JPEG is well under 1 MiB.  A declared length above this bound
/// means the stream lost framing, and the connection must be torn down.
pub const MAX_PAYLOAD_LEN: u32 = 32 * 1024 * 1024;

/// Errors that can occur during header encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The declared payload length exceeds [`MAX_PAYLOAD_LEN`].
    #[error("payload too large: {declared} bytes exceeds limit of {limit}")]
    PayloadTooLarge { declared: usize, limit: u32 },

    /// The payload length field does not match the data available.
    #[error("payload length mismatch: header says {declared}, available is {available}")]
    PayloadLengthMismatch { declared: usize, available: usize },
}

/// The decoded 8-byte header preceding every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Byte length of the payload that follows the header.
    pub payload_len: u32,
    /// Reserved word, carried verbatim.
    pub reserved: [u8; 4],
}

impl FrameHeader {
    /// Creates a header for a payload of `payload_len` bytes with a zeroed
    /// reserved word.
    pub fn new(payload_len: u32) -> Self {
        Self {
            payload_len,
            reserved: [0; 4],
        }
    }

    /// Returns the payload length as a `usize` for buffer allocation.
    pub fn payload_len(&self) -> usize {
        self.payload_len as usize
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes a [`FrameHeader`] from the first [`HEADER_SIZE`] bytes of `bytes`.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] when fewer than 8 bytes are
/// supplied and [`ProtocolError::PayloadTooLarge`] when the declared length
/// exceeds [`MAX_PAYLOAD_LEN`].
///
/// # Examples
///
/// ```rust
/// use camlink_core::protocol::decode_header;
///
/// let header = decode_header(&[0, 0, 1, 0, 9, 9, 9, 9]).unwrap();
/// assert_eq!(header.payload_len, 256);
/// assert_eq!(header.reserved, [9, 9, 9, 9]);
/// ```
pub fn decode_header(bytes: &[u8]) -> Result<FrameHeader, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let payload_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge {
            declared: payload_len as usize,
            limit: MAX_PAYLOAD_LEN,
        });
    }

    // bytes[4..8] are reserved – carried, never interpreted
    let reserved = [bytes[4], bytes[5], bytes[6], bytes[7]];

    Ok(FrameHeader {
        payload_len,
        reserved,
    })
}

/// Encodes `header` into its 8-byte wire form.
pub fn encode_header(header: &FrameHeader) -> [u8; HEADER_SIZE] {
    let mut buf = [0u8; HEADER_SIZE];
    buf[..4].copy_from_slice(&header.payload_len.to_be_bytes());
    buf[4..].copy_from_slice(&header.reserved);
    buf
}

/// Encodes a complete wire frame: header followed by `payload`.
///
/// This is what a phone sends for every image.  The host never sends frames;
/// the encoder exists for tests, benches, and loopback tooling.
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] if `payload` is longer than
/// [`MAX_PAYLOAD_LEN`].
pub fn encode_frame(payload: &[u8], reserved: [u8; 4]) -> Result<Vec<u8>, ProtocolError> {
    let payload_len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_PAYLOAD_LEN)
        .ok_or(ProtocolError::PayloadTooLarge {
            declared: payload.len(),
            limit: MAX_PAYLOAD_LEN,
        })?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&encode_header(&FrameHeader {
        payload_len,
        reserved,
    }));
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Decodes one complete frame from the beginning of `bytes`.
///
/// Returns the header, the payload slice, and the total number of bytes
/// consumed so the caller can advance their read cursor.
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadLengthMismatch`] if fewer than
/// `payload_len` bytes follow the header, plus any error from
/// [`decode_header`].
pub fn decode_frame(bytes: &[u8]) -> Result<(FrameHeader, &[u8], usize), ProtocolError> {
    let header = decode_header(bytes)?;
    let total_needed = HEADER_SIZE + header.payload_len();
    if bytes.len() < total_needed {
        return Err(ProtocolError::PayloadLengthMismatch {
            declared: header.payload_len(),
            available: bytes.len() - HEADER_SIZE,
        });
    }
    Ok((header, &bytes[HEADER_SIZE..total_needed], total_needed))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
