//! LAN side of camlink: discovery and per-endpoint stream receivers.
//!
//! # How discovery works (for beginners)
//!
//! Phones running the camera app listen on TCP port 6000.  There is no
//! announcement protocol, so the host simply tries to connect to every
//! address on a handful of common home subnets (`192.168.1.x`, `10.0.0.x`,
//! ...).  An address that accepts the connection is treated as a camera.
//!
//! - [`probe`] – the connect-and-drop check, behind a trait for tests.
//! - [`scanner`] – the periodic sweep with a bounded probe pool.
//! - [`supervisor`] – at most one receiver task per endpoint.
//! - [`receiver`] – reads length-prefixed frames and publishes them to the
//!   registry, reconnecting forever.

pub mod probe;
pub mod receiver;
pub mod scanner;
pub mod supervisor;
