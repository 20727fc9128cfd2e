//! Application layer use cases for the camlink host.
//!
//! # What is the "application" layer? (for beginners)
//!
//! The application layer sits between the pure types in `camlink_core` and
//! the infrastructure (sockets, the virtual camera device, the config file,
//! the terminal).  Code here:
//!
//! - **Owns the shared state**: the endpoint registry and the view session.
//! - **Orchestrates core types** to fulfil a user goal (e.g. "compose the
//!   current tick" or "rotate the selected camera").
//! - **Performs no I/O**, so every use case can be tested with plain values.
//!
//! # Sub-modules
//!
//! - **`registry`** – Thread-safe store of known endpoints, their rotation,
//!   their latest frame, and the activation-ordered active list.
//!
//! - **`session`** – Layout mode, mirror flag, selected camera, and panel
//!   visibility.
//!
//! - **`compose_output`** – Snapshots registry + session and runs the
//!   compositor once per output tick.
//!
//! - **`control`** – Maps control-surface commands onto the session and the
//!   registry and builds the status panel.

pub mod compose_output;
pub mod control;
pub mod registry;
pub mod session;
