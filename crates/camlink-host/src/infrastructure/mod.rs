//! Infrastructure layer: everything that touches sockets, devices, files
//! and the terminal.
//!
//! The application layer never imports from here; `main.rs` wires the two
//! together.

pub mod console;
pub mod network;
pub mod output;
pub mod storage;
