//! # Intcode: one machine for every puzzle
//! An implementation of the Intcode virtual machine: a von Neumann machine working on
//! a single mutable memory of signed integers, with three addressing modes, a relative
//! base register, and I/O that can suspend execution until input shows up.
//!
//! The crate is layered:
//! - [`machine`] executes instructions against [`memory`], talking to the outside world
//!   through an [`IntcodeBus`] only. It never blocks: a missing input suspends it.
//! - [`computer`] bundles a machine with an input [`Channel`] and an [`OutputSink`],
//!   which is enough to chain machines, replay scripted inputs or serve interactive ones.
//! - [`network`] schedules several computers cooperatively, e.g. amplifier feedback loops.

pub mod bus;
pub mod channel;
pub mod computer;
pub mod instruction;
pub mod machine;
pub mod memory;
pub mod network;
pub mod program;

pub use bus::{Input, IntcodeBus};
pub use channel::{Channel, OutputSink};
pub use computer::{AsciiOutput, IntcodeComputer, Snapshot};
pub use machine::{IntcodeFault, IntcodeMachine, Status, Step};
pub use memory::{IntcodeMemory, Memory};
pub use network::{Network, NetworkError, NodeId};
pub use program::{parse_program, ProgramParseError};

#[cfg(test)]
mod test;
