//! Supervision of external processes.
//!
//! Each [`SupervisedProcess`] owns its child and two [`LineReader`] workers,
//! one per output stream. Shutdown escalates through a [`ShutdownPolicy`].
//!
//! ## Module Structure
//!
//! - [`reader`]: Readiness-polling line reader
//! - [`process`]: Spawn, poll and stop a single tool
//! - [`shutdown`]: Signal escalation

pub mod process;
pub mod reader;
pub mod shutdown;

pub use process::{ProcessSettings, SupervisedProcess, Tool};
pub use reader::{LineHandler, LineReader};
pub use shutdown::{EscalationStep, ShutdownPolicy, StopOutcome};
