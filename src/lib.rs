//! Remote packet capture piped into a local viewer.
//!
//! A capture producer (sshdump) writes a remote tcpdump stream into a named
//! pipe that a local viewer (Wireshark or sngrep) reads. This crate
//! supervises both processes and turns their diagnostic output into
//! structured log records.
//!
//! - [`session`] - Pipe ownership, start order and coordinated shutdown
//! - [`supervisor`] - Process spawning, output readers, signal escalation
//! - [`diagnostics`] - Line parsing and the log sink
//! - [`pipe`] - Self-removing named pipe
//! - [`tools`] - sshdump, Wireshark and sngrep invocations
//! - [`config`] - TOML configuration

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod paths;
pub mod pipe;
pub mod session;
pub mod supervisor;
pub mod tools;

pub use error::{DiagnosticError, Error, Result, StopError};
