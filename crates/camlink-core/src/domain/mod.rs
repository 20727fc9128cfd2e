//! Domain entities for camlink.
//!
//! This module contains pure value types with no infrastructure dependencies.
//!
//! # What lives here? (for beginners)
//!
//! The domain is the vocabulary the rest of the system speaks:
//!
//! - An **endpoint** is a phone we found on the LAN, identified by its host
//!   address, together with the state of our connection to it.
//! - A **frame** is one decoded camera image.
//! - A **rotation** is one of the four cardinal angles a phone image can be
//!   turned by before it is painted.
//! - A **layout mode** decides which phones occupy which part of the output
//!   canvas.
//!
//! None of these types know about sockets, threads, or the virtual camera,
//! so they can be unit-tested on any machine without setup.

/// Endpoint identity and connection lifecycle.
pub mod endpoint;

/// Decoded camera frames.
pub mod frame;

/// Layout modes and canvas regions.
///
/// See [`layout::LayoutMode::regions`] for how the canvas is divided.
pub mod layout;

/// Cardinal rotations.
pub mod rotation;
