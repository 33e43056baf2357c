//! # Intcode machine
//! Represents a fully functional Intcode computer: a single mutable memory holding
//! both code and data, an instruction pointer and a relative base register.
//!
//! The machine never owns its I/O. Each call to [`IntcodeMachine::step`] is given
//! something implementing [`IntcodeBus`], which decides where input comes from and
//! where output goes. When an `IN` instruction finds no input available, the step
//! returns [`Step::Suspended`] without touching any state, and the very same
//! instruction is attempted again on the next step. The host is free to do anything
//! in between, such as running other machines.
//!
//! Execution can also be driven with the [`Steps`] iterator, which eases up logging
//! or inspecting each executed instruction:
//! ```rust
//! # use intcode::machine::*;
//! let mut machine = IntcodeMachine::new(&[1101, 2, 3, 5, 99, 0]);
//! for executed_instruction in machine.steps(&mut ()) {
//!     println!("{}", executed_instruction.unwrap());
//! }
//! assert!(machine.is_halted());
//! assert_eq!(machine.peek_memory(5), 5);
//! ```

use log::{debug, log_enabled, trace, Level};
use thiserror::Error;

use crate::{
    bus::{Input, IntcodeBus},
    instruction::{DecodeError, Instruction, Opcode, ParameterMode},
    memory::{IntcodeMemory, Memory},
};

/// Fatal conditions. A faulted machine is dead: every later step returns the same fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum IntcodeFault {
    #[error("invalid opcode {opcode} at address {address}")]
    InvalidOpcode { address: usize, opcode: i64 },
    #[error("invalid parameter mode {mode} at address {address}")]
    InvalidMode { address: usize, mode: i64 },
    #[error("immediate mode used for a written parameter at address {address}")]
    ImmediateWrite { address: usize },
    #[error("input requested at address {address} but no more input will ever come")]
    MissingInput { address: usize },
    #[error("address {0} is out of bounds")]
    OutOfBounds(i64),
    #[error("arithmetic overflow at address {address}")]
    Overflow { address: usize },
}

/// Outcome of a single [`IntcodeMachine::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// The instruction was executed, the machine can keep going.
    Continue(Instruction),
    /// The instruction needs input that is not there yet. Nothing was executed.
    Suspended,
    /// The machine reached `HLT`.
    Halted,
}

/// Why a run stopped, when it did not fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Halted,
    Suspended,
    /// The instruction budget given to [`IntcodeMachine::run_for`] ran out.
    Yielded,
}

/// The Intcode machine, able to execute Intcode programs against memory of type `M`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntcodeMachine<M = Memory> {
    memory: M,
    instruction_pointer: usize,
    relative_base: i64,
    halted: bool,
    cycles: u64,
    fault: Option<IntcodeFault>,
}
impl IntcodeMachine<Memory> {
    /// Creates a machine with `program` loaded verbatim at address 0.
    pub fn new(program: &[i64]) -> Self {
        Self::from_memory(Memory::from_program(program))
    }
}
impl<M: IntcodeMemory> IntcodeMachine<M> {
    /// Creates a machine over already loaded memory.
    pub fn from_memory(memory: M) -> Self {
        Self {
            memory,
            instruction_pointer: 0,
            relative_base: 0,
            halted: false,
            cycles: 0,
            fault: None,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }
    /// The fault that killed this machine, if any.
    pub fn fault(&self) -> Option<IntcodeFault> {
        self.fault
    }
    /// Number of instructions executed so far, `HLT` excluded.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn peek_memory(&self, address: usize) -> i64 {
        self.memory.get(address)
    }
    pub fn peek_relative_base(&self) -> i64 {
        self.relative_base
    }
    pub fn peek_instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }
    pub fn memory(&self) -> &M {
        &self.memory
    }
    /// Dense copy of memory, from address 0 to the highest populated one.
    ///
    /// This allocates [`IntcodeMemory::extent`] cells: after a write at a huge address,
    /// use [`peek_memory`](Self::peek_memory) instead.
    pub fn memory_image(&self) -> Vec<i64> {
        self.memory.image()
    }

    /// Patches memory, e.g. to set a noun and verb before running.
    pub fn poke_memory(&mut self, address: usize, value: i64) {
        self.memory.set(address, value)
    }
    pub fn set_relative_base(&mut self, relative_base: i64) {
        self.relative_base = relative_base
    }

    /// Returns a [`Steps`] iterator executing instructions until the machine halts,
    /// suspends or faults.
    pub fn steps<'a, B: IntcodeBus>(&'a mut self, bus: &'a mut B) -> Steps<'a, M, B> {
        Steps {
            machine: self,
            bus,
            faulted: false,
        }
    }

    /// Runs until the machine halts or suspends.
    pub fn run<B: IntcodeBus>(&mut self, bus: &mut B) -> Result<Status, IntcodeFault> {
        loop {
            match self.step(bus)? {
                Step::Continue(_) => {}
                Step::Suspended => return Ok(Status::Suspended),
                Step::Halted => return Ok(Status::Halted),
            }
        }
    }

    /// Runs at most `budget` instructions.
    pub fn run_for<B: IntcodeBus>(
        &mut self,
        bus: &mut B,
        budget: usize,
    ) -> Result<Status, IntcodeFault> {
        for _ in 0..budget {
            match self.step(bus)? {
                Step::Continue(_) => {}
                Step::Suspended => return Ok(Status::Suspended),
                Step::Halted => return Ok(Status::Halted),
            }
        }
        Ok(Status::Yielded)
    }

    /// Executes exactly one instruction.
    pub fn step<B: IntcodeBus>(&mut self, bus: &mut B) -> Result<Step, IntcodeFault> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }
        if self.halted {
            return Ok(Step::Halted);
        }

        match self.execute(bus) {
            Ok(step) => Ok(step),
            Err(fault) => {
                debug!("machine faulted after {} cycles: {fault}", self.cycles);
                self.fault = Some(fault);
                Err(fault)
            }
        }
    }

    fn execute<B: IntcodeBus>(&mut self, bus: &mut B) -> Result<Step, IntcodeFault> {
        let address = self.instruction_pointer;
        if address >= self.memory.extent() {
            return Err(IntcodeFault::OutOfBounds(address as i64));
        }

        let instruction = Instruction::decode(self.memory.get(address)).map_err(|e| match e {
            DecodeError::InvalidOpcode(opcode) => IntcodeFault::InvalidOpcode { address, opcode },
            DecodeError::InvalidMode(mode) => IntcodeFault::InvalidMode { address, mode },
        })?;
        if log_enabled!(Level::Trace) {
            let parameters: [i64; 3] = core::array::from_fn(|index| self.parameter(index));
            trace!("{address:>6}: {}", instruction.with_parameters(&parameters));
        }

        let mut next = address + instruction.opcode.length();
        match instruction.opcode {
            Opcode::Add => {
                let a = self.read(&instruction, 0)?;
                let b = self.read(&instruction, 1)?;
                let sum = a.checked_add(b).ok_or(IntcodeFault::Overflow { address })?;
                self.write(&instruction, 2, sum)?
            }
            Opcode::Multiply => {
                let a = self.read(&instruction, 0)?;
                let b = self.read(&instruction, 1)?;
                let product = a.checked_mul(b).ok_or(IntcodeFault::Overflow { address })?;
                self.write(&instruction, 2, product)?
            }
            Opcode::Input => {
                // The destination is resolved first so that a bad address faults
                // without consuming input.
                let destination = self.write_address(&instruction, 0)?;
                match bus.read() {
                    Input::Value(value) => self.memory.set(destination, value),
                    Input::Pending => {
                        debug!("suspended at address {address}, waiting for input");
                        return Ok(Step::Suspended);
                    }
                    Input::Closed => return Err(IntcodeFault::MissingInput { address }),
                }
            }
            Opcode::Output => {
                let value = self.read(&instruction, 0)?;
                bus.write(value)
            }
            Opcode::JumpIfTrue => {
                if self.read(&instruction, 0)? != 0 {
                    next = Self::address(self.read(&instruction, 1)?)?;
                }
            }
            Opcode::JumpIfFalse => {
                if self.read(&instruction, 0)? == 0 {
                    next = Self::address(self.read(&instruction, 1)?)?;
                }
            }
            Opcode::LessThan => {
                let a = self.read(&instruction, 0)?;
                let b = self.read(&instruction, 1)?;
                self.write(&instruction, 2, (a < b) as i64)?
            }
            Opcode::Equals => {
                let a = self.read(&instruction, 0)?;
                let b = self.read(&instruction, 1)?;
                self.write(&instruction, 2, (a == b) as i64)?
            }
            Opcode::AdjustRelativeBase => {
                let offset = self.read(&instruction, 0)?;
                self.relative_base = self
                    .relative_base
                    .checked_add(offset)
                    .ok_or(IntcodeFault::Overflow { address })?;
            }
            Opcode::Halt => {
                debug!("halted at address {address} after {} cycles", self.cycles);
                self.halted = true;
                return Ok(Step::Halted);
            }
        }

        self.instruction_pointer = next;
        self.cycles += 1;
        Ok(Step::Continue(instruction))
    }

    /// Raw value of the parameter at the given index of the current instruction.
    fn parameter(&self, index: usize) -> i64 {
        self.memory.get(self.instruction_pointer + 1 + index)
    }

    /// Reads a parameter according to its mode.
    fn read(&self, instruction: &Instruction, index: usize) -> Result<i64, IntcodeFault> {
        let parameter = self.parameter(index);
        Ok(match instruction.mode(index) {
            ParameterMode::Position => self.memory.get(Self::address(parameter)?),
            ParameterMode::Immediate => parameter,
            ParameterMode::Relative => self.memory.get(self.relative_address(parameter)?),
        })
    }

    /// Resolves the address a written parameter designates.
    fn write_address(
        &self,
        instruction: &Instruction,
        index: usize,
    ) -> Result<usize, IntcodeFault> {
        let parameter = self.parameter(index);
        match instruction.mode(index) {
            ParameterMode::Position => Self::address(parameter),
            ParameterMode::Relative => self.relative_address(parameter),
            ParameterMode::Immediate => Err(IntcodeFault::ImmediateWrite {
                address: self.instruction_pointer,
            }),
        }
    }

    fn write(
        &mut self,
        instruction: &Instruction,
        index: usize,
        value: i64,
    ) -> Result<(), IntcodeFault> {
        let address = self.write_address(instruction, index)?;
        self.memory.set(address, value);
        Ok(())
    }

    fn relative_address(&self, offset: i64) -> Result<usize, IntcodeFault> {
        let address = self
            .relative_base
            .checked_add(offset)
            .ok_or(IntcodeFault::Overflow {
                address: self.instruction_pointer,
            })?;
        Self::address(address)
    }

    fn address(value: i64) -> Result<usize, IntcodeFault> {
        usize::try_from(value).map_err(|_| IntcodeFault::OutOfBounds(value))
    }
}

/// Executes instructions in sequence until the machine halts, suspends or faults,
/// yielding each executed instruction.
///
/// # [`FusedIterator`](core::iter::FusedIterator)
/// Note that this cannot implement [`FusedIterator`](core::iter::FusedIterator).
/// A suspended machine returns `None`, then executes again once its bus has input.
/// A fault is yielded once, after which the iterator is exhausted.
pub struct Steps<'a, M, B> {
    machine: &'a mut IntcodeMachine<M>,
    bus: &'a mut B,
    faulted: bool,
}
impl<M, B> Iterator for Steps<'_, M, B>
where
    M: IntcodeMemory,
    B: IntcodeBus,
{
    type Item = Result<Instruction, IntcodeFault>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.faulted {
            return None;
        }
        match self.machine.step(&mut *self.bus) {
            Ok(Step::Continue(instruction)) => Some(Ok(instruction)),
            Ok(Step::Suspended | Step::Halted) => None,
            Err(fault) => {
                self.faulted = true;
                Some(Err(fault))
            }
        }
    }
}
