//! CLI command implementations for remote-pcap.
//!
//! - [`capture`] - Remote capture into a local viewer

pub mod capture;
