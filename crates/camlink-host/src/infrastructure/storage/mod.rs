//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML file from the platform config
//! directory (or an explicit `--config` path), fills in defaults for
//! anything missing, validates the result, and converts it into the plain
//! runtime structs the network and output layers take.

pub mod config;
