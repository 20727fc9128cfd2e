//! # camlink-core
//!
//! Shared library for camlink containing the frame wire codec, domain
//! entities, the image decoder, and the compositor.
//!
//! This crate has zero dependencies on sockets, async runtimes, or video
//! devices.  Everything that touches the network or the virtual camera lives
//! in `camlink-host`.
//!
//! # Architecture overview (for beginners)
//!
//! camlink turns several phones streaming their cameras over the LAN into a
//! single virtual webcam.  Each phone sends a stream of compressed still
//! images; the host decodes them and paints the newest image of each phone
//! into one fixed-size canvas, 30 times per second.
//!
//! This crate defines:
//!
//! - **`protocol`** – How a frame travels over TCP: an 8-byte header
//!   (length + reserved word) followed by the compressed image bytes.
//!
//! - **`domain`** – Pure value types: endpoint identity and connection state,
//!   the four cardinal rotations, layout modes and canvas regions, and the
//!   decoded [`Frame`].
//!
//! - **`decoder`** – Turns a compressed payload (JPEG, PNG) into a [`Frame`].
//!
//! - **`compose`** – The compositor: rotate, letterbox, split and mirror the
//!   active frames into the output canvas.

pub mod compose;
pub mod decoder;
pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `camlink_core::Frame` instead of `camlink_core::domain::frame::Frame`.
pub use compose::{fit_within, Compositor, SourceView};
pub use decoder::{DecodeError, FrameDecoder, ImageFrameDecoder};
pub use domain::endpoint::{ConnectionState, EndpointId};
pub use domain::frame::Frame;
pub use domain::layout::{LayoutMode, Region};
pub use domain::rotation::Rotation;
pub use protocol::codec::{decode_header, encode_frame, FrameHeader, ProtocolError};
