//! Relay CLI support library
//!
//! Configuration, logging, the NDJSON wire protocol, the TCP server and a
//! small client. The `relay` binary wires these together.

pub mod client;
pub mod config;
pub mod logging;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use config::Config;
pub use server::Server;
