//! Packaging core: catalogs, selection snapshot, command builder, process
//! runner, preflight check and session gate.
//!
//! Nothing in here prints; the `cmd` layer owns presentation.
//!
//!   OptionSelection --CommandBuilder--> CommandLine --render--> String
//!   String --Session/ProcessRunner--> ProcessRun --> RunEvent stream

pub mod catalog;
pub mod command;
pub mod error;
pub mod preflight;
pub mod runner;
pub mod selection;
pub mod session;

pub use command::CommandLine;
pub use error::PackError;
pub use runner::{Interpreter, ProcessRunner, RunEvent};
pub use session::Session;
