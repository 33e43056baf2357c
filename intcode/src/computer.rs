//! # Intcode computer
//! An [`IntcodeMachine`] bundled with the I/O it talks to: an input [`Channel`] it owns,
//! and an [`OutputSink`] chosen by the host.
//!
//! This is the usual way of running Intcode programs. Inputs are queued ahead of time
//! or while the computer is suspended, outputs are collected, forwarded to another
//! computer or handed to a callback.
//! ```rust
//! # use intcode::{IntcodeComputer, Status};
//! // Outputs its input multiplied by 3.
//! let mut computer = IntcodeComputer::new(&[3, 9, 1002, 9, 3, 9, 4, 9, 99, 0]);
//! assert_eq!(computer.run(), Ok(Status::Suspended));
//!
//! computer.provide_input(14);
//! assert_eq!(computer.run(), Ok(Status::Halted));
//! assert_eq!(computer.read_all_outputs(), vec![42]);
//! ```

use crate::{
    bus::{Input, IntcodeBus},
    channel::{Channel, OutputSink},
    machine::{IntcodeFault, IntcodeMachine, Status, Step},
};

/// The computer's side of its channels.
#[derive(Debug, Default)]
struct ComputerBus {
    input: Channel,
    output: OutputSink,
    last_output: Option<i64>,
}
impl IntcodeBus for ComputerBus {
    fn read(&mut self) -> Input {
        self.input.pop()
    }
    fn write(&mut self, value: i64) {
        self.last_output = Some(value);
        self.output.send(value)
    }
}

/// A saved execution state, restored with [`IntcodeComputer::restore`].
///
/// Output that already left through a chained or interactive sink is gone for good,
/// only buffered output is part of the snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    machine: IntcodeMachine,
    pending_input: Vec<i64>,
    input_closed: bool,
    buffered_output: Option<Vec<i64>>,
    last_output: Option<i64>,
}
impl Snapshot {
    pub fn machine(&self) -> &IntcodeMachine {
        &self.machine
    }
}

/// Output of a program speaking ASCII, split between text and anything that does not
/// fit in ASCII (usually a final numeric answer).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AsciiOutput {
    pub text: String,
    pub values: Vec<i64>,
}
impl AsciiOutput {
    pub fn from_values(values: &[i64]) -> Self {
        let mut output = Self::default();
        for &value in values {
            match u8::try_from(value) {
                Ok(byte) if byte.is_ascii() => output.text.push(byte as char),
                _ => output.values.push(value),
            }
        }
        output
    }
}

#[derive(Debug)]
pub struct IntcodeComputer {
    program: Vec<i64>,
    machine: IntcodeMachine,
    bus: ComputerBus,
}
impl IntcodeComputer {
    /// Creates a computer with `program` loaded at address 0, an empty input channel
    /// and a buffered output sink.
    pub fn new(program: &[i64]) -> Self {
        Self {
            program: program.to_vec(),
            machine: IntcodeMachine::new(program),
            bus: ComputerBus::default(),
        }
    }

    pub fn machine(&self) -> &IntcodeMachine {
        &self.machine
    }
    pub fn is_halted(&self) -> bool {
        self.machine.is_halted()
    }
    pub fn cycles(&self) -> u64 {
        self.machine.cycles()
    }

    pub fn step(&mut self) -> Result<Step, IntcodeFault> {
        self.machine.step(&mut self.bus)
    }
    /// Runs until the program halts or waits for input that is not queued yet.
    pub fn run(&mut self) -> Result<Status, IntcodeFault> {
        self.machine.run(&mut self.bus)
    }
    /// Runs at most `budget` instructions.
    pub fn run_for(&mut self, budget: usize) -> Result<Status, IntcodeFault> {
        self.machine.run_for(&mut self.bus, budget)
    }
    /// Runs until the program halts, blocking the current thread whenever it waits
    /// for input.
    ///
    /// Meant for computers running on their own thread and fed from other threads.
    /// Closing the input channel turns an endless wait into
    /// [`IntcodeFault::MissingInput`].
    pub fn run_blocking(&mut self) -> Result<(), IntcodeFault> {
        loop {
            match self.run()? {
                Status::Halted => return Ok(()),
                Status::Suspended | Status::Yielded => self.bus.input.wait(),
            }
        }
    }

    /// Queues a value on the input channel.
    pub fn provide_input(&mut self, value: i64) {
        self.bus.input.push(value)
    }
    pub fn provide_inputs(&mut self, values: impl IntoIterator<Item = i64>) {
        self.bus.input.extend(values)
    }
    /// Queues every byte of `text` on the input channel.
    pub fn provide_ascii(&mut self, text: &str) {
        self.provide_inputs(text.bytes().map(i64::from))
    }
    /// Tells the computer that no more input will come.
    pub fn close_input(&mut self) {
        self.bus.input.close()
    }
    /// A handle to the input channel, for peers or other threads to write to.
    pub fn input_channel(&self) -> Channel {
        self.bus.input.clone()
    }

    /// Drains the outputs accumulated in a buffered sink, in emission order.
    ///
    /// Returns nothing for chained or interactive sinks since they keep nothing.
    pub fn read_all_outputs(&mut self) -> Vec<i64> {
        self.bus.output.take()
    }
    /// Drains the buffered outputs and splits them into ASCII text and other values.
    pub fn read_ascii(&mut self) -> AsciiOutput {
        AsciiOutput::from_values(&self.read_all_outputs())
    }
    /// The most recent output, whatever sink it went to.
    pub fn last_output(&self) -> Option<i64> {
        self.bus.last_output
    }

    pub fn output_sink(&self) -> &OutputSink {
        &self.bus.output
    }
    /// Replaces the output sink, returning the previous one along with anything it buffered.
    pub fn set_output_sink(&mut self, sink: OutputSink) -> OutputSink {
        core::mem::replace(&mut self.bus.output, sink)
    }
    /// Forwards every future output of this computer to the input of `peer`.
    pub fn chain_to(&mut self, peer: &IntcodeComputer) {
        self.set_output_sink(OutputSink::Chained(peer.input_channel()));
    }

    pub fn peek_memory(&self, address: usize) -> i64 {
        self.machine.peek_memory(address)
    }
    pub fn peek_relative_base(&self) -> i64 {
        self.machine.peek_relative_base()
    }
    pub fn peek_instruction_pointer(&self) -> usize {
        self.machine.peek_instruction_pointer()
    }
    pub fn poke_memory(&mut self, address: usize, value: i64) {
        self.machine.poke_memory(address, value)
    }
    pub fn memory_image(&self) -> Vec<i64> {
        self.machine.memory_image()
    }

    /// Saves the execution state, pending input and buffered output.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            machine: self.machine.clone(),
            pending_input: self.bus.input.queued(),
            input_closed: self.bus.input.is_closed(),
            buffered_output: match &self.bus.output {
                OutputSink::Buffered(values) => Some(values.clone()),
                _ => None,
            },
            last_output: self.bus.last_output,
        }
    }

    /// Brings the computer back to a saved state. The output sink is kept, its
    /// buffered values are replaced if the snapshot has some.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.machine = snapshot.machine.clone();

        self.bus.input.drain();
        self.bus.input.extend(snapshot.pending_input.iter().copied());
        if snapshot.input_closed {
            self.bus.input.close()
        } else {
            self.bus.input.reopen()
        }

        if let (OutputSink::Buffered(values), Some(saved)) =
            (&mut self.bus.output, &snapshot.buffered_output)
        {
            values.clone_from(saved)
        }
        self.bus.last_output = snapshot.last_output;
    }

    /// Reloads the initial program and empties the input queue and buffered output.
    ///
    /// The input channel stays the same, so peers keep writing to this computer.
    pub fn reset(&mut self) {
        self.machine = IntcodeMachine::new(&self.program);
        self.bus.input.drain();
        self.bus.input.reopen();
        self.bus.output.take();
        self.bus.last_output = None;
    }
}
