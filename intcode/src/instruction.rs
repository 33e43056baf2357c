//! # Intcode instructions
//! An instruction word packs an [opcode](Opcode) in its two lowest decimal digits,
//! and one [parameter mode](ParameterMode) per parameter in the digits above,
//! read right to left. Missing digits mean [`ParameterMode::Position`].
//!
//! | **Word** | `1002` |
//! | -------- | ------ |
//! | opcode   | `02` (multiply) |
//! | mode 1   | `0` (position) |
//! | mode 2   | `1` (immediate) |
//! | mode 3   | `0` (position, implicit) |
//!
//! Instructions are never stored: since self modifying code is legal, they are
//! decoded again from memory every time the machine steps.

use core::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    Add,
    Multiply,
    Input,
    Output,
    JumpIfTrue,
    JumpIfFalse,
    LessThan,
    Equals,
    AdjustRelativeBase,
    Halt,
}
impl Opcode {
    /// Decodes an opcode from the two lowest decimal digits of an instruction word.
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            1 => Self::Add,
            2 => Self::Multiply,
            3 => Self::Input,
            4 => Self::Output,
            5 => Self::JumpIfTrue,
            6 => Self::JumpIfFalse,
            7 => Self::LessThan,
            8 => Self::Equals,
            9 => Self::AdjustRelativeBase,
            99 => Self::Halt,
            _ => return None,
        })
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Add => 1,
            Self::Multiply => 2,
            Self::Input => 3,
            Self::Output => 4,
            Self::JumpIfTrue => 5,
            Self::JumpIfFalse => 6,
            Self::LessThan => 7,
            Self::Equals => 8,
            Self::AdjustRelativeBase => 9,
            Self::Halt => 99,
        }
    }

    /// Number of parameters following the instruction word.
    pub fn arity(self) -> usize {
        match self {
            Self::Add | Self::Multiply | Self::LessThan | Self::Equals => 3,
            Self::JumpIfTrue | Self::JumpIfFalse => 2,
            Self::Input | Self::Output | Self::AdjustRelativeBase => 1,
            Self::Halt => 0,
        }
    }

    /// Number of memory cells taken by the instruction, i.e. how far the
    /// instruction pointer moves when the instruction does not jump.
    pub fn length(self) -> usize {
        self.arity() + 1
    }

    /// Index of the parameter written to, if any.
    pub fn write_parameter(self) -> Option<usize> {
        match self {
            Self::Add | Self::Multiply | Self::LessThan | Self::Equals => Some(2),
            Self::Input => Some(0),
            _ => None,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Multiply => "MUL",
            Self::Input => "IN",
            Self::Output => "OUT",
            Self::JumpIfTrue => "JNZ",
            Self::JumpIfFalse => "JZ",
            Self::LessThan => "LT",
            Self::Equals => "EQ",
            Self::AdjustRelativeBase => "ARB",
            Self::Halt => "HLT",
        }
    }
}
impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Addressing mode of a single parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ParameterMode {
    /// The parameter is an address.
    #[default]
    Position,
    /// The parameter is the value itself. Never valid for written parameters.
    Immediate,
    /// The parameter is an offset from the relative base.
    Relative,
}
impl ParameterMode {
    pub fn from_digit(digit: i64) -> Option<Self> {
        match digit {
            0 => Some(Self::Position),
            1 => Some(Self::Immediate),
            2 => Some(Self::Relative),
            _ => None,
        }
    }
}

/// Reasons an instruction word cannot be decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    InvalidOpcode(i64),
    InvalidMode(i64),
}

/// A decoded instruction word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Modes of the parameters, only the first [`Opcode::arity`] are meaningful.
    pub modes: [ParameterMode; 3],
}
impl Instruction {
    pub fn new(opcode: Opcode, modes: [ParameterMode; 3]) -> Self {
        Self { opcode, modes }
    }

    /// Decodes an instruction word.
    ///
    /// Mode digits are only checked for parameters the opcode actually has.
    /// ```rust
    /// # use intcode::instruction::*;
    /// let instruction = Instruction::decode(1002).unwrap();
    /// assert_eq!(instruction.opcode, Opcode::Multiply);
    /// assert_eq!(
    ///     instruction.modes,
    ///     [ParameterMode::Position, ParameterMode::Immediate, ParameterMode::Position]
    /// );
    /// assert_eq!(Instruction::decode(42), Err(DecodeError::InvalidOpcode(42)));
    /// ```
    pub fn decode(word: i64) -> Result<Self, DecodeError> {
        if word < 0 {
            return Err(DecodeError::InvalidOpcode(word));
        }
        let opcode = Opcode::from_code(word % 100)
            .ok_or(DecodeError::InvalidOpcode(word % 100))?;

        let mut modes = [ParameterMode::Position; 3];
        let mut digits = word / 100;
        for mode in modes.iter_mut().take(opcode.arity()) {
            let digit = digits % 10;
            *mode = ParameterMode::from_digit(digit)
                .ok_or(DecodeError::InvalidMode(digit))?;
            digits /= 10;
        }

        Ok(Self { opcode, modes })
    }

    /// Encodes the instruction back into a word.
    pub fn encode(&self) -> i64 {
        self.modes
            .iter()
            .take(self.opcode.arity())
            .rev()
            .fold(0, |word, mode| word * 10 + *mode as i64)
            * 100
            + self.opcode.code()
    }

    /// Mode of the parameter at the given (zero based) index.
    pub fn mode(&self, parameter: usize) -> ParameterMode {
        self.modes[parameter]
    }

    /// Wraps the instruction with its raw parameters so that it can be displayed
    /// as assembly.
    /// ```rust
    /// # use intcode::instruction::*;
    /// let instruction = Instruction::decode(1002).unwrap();
    /// assert_eq!(instruction.with_parameters(&[4, 3, 4]).to_string(), "MUL [4] 3 -> [4]");
    /// ```
    pub fn with_parameters<'a>(&'a self, parameters: &'a [i64]) -> Disassembly<'a> {
        Disassembly {
            instruction: self,
            parameters,
        }
    }
}
impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.opcode)?;
        for mode in self.modes.iter().take(self.opcode.arity()) {
            match mode {
                ParameterMode::Position => write!(f, " [_]")?,
                ParameterMode::Immediate => write!(f, " _")?,
                ParameterMode::Relative => write!(f, " [rb+_]")?,
            }
        }
        Ok(())
    }
}

/// An [`Instruction`] along with its raw parameters, displayed as assembly.
///
/// Position parameters are shown as `[address]`, relative ones as `[rb+offset]`
/// and immediate ones as bare values. The written parameter comes after an arrow.
pub struct Disassembly<'a> {
    instruction: &'a Instruction,
    parameters: &'a [i64],
}
impl Display for Disassembly<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let opcode = self.instruction.opcode;
        write!(f, "{opcode}")?;
        for (index, parameter) in self.parameters.iter().take(opcode.arity()).enumerate() {
            if opcode.write_parameter() == Some(index) && index != 0 {
                write!(f, " ->")?;
            }
            match self.instruction.mode(index) {
                ParameterMode::Position => write!(f, " [{parameter}]")?,
                ParameterMode::Immediate => write!(f, " {parameter}")?,
                ParameterMode::Relative if *parameter < 0 => write!(f, " [rb{parameter}]")?,
                ParameterMode::Relative => write!(f, " [rb+{parameter}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_modes() {
        let instruction = Instruction::decode(21101).unwrap();
        assert_eq!(instruction.opcode, Opcode::Add);
        assert_eq!(
            instruction.modes,
            [
                ParameterMode::Immediate,
                ParameterMode::Immediate,
                ParameterMode::Relative
            ]
        );
        assert_eq!(
            Instruction::decode(204).unwrap().mode(0),
            ParameterMode::Relative
        );
        assert_eq!(Instruction::decode(99).unwrap().opcode, Opcode::Halt);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(Instruction::decode(0), Err(DecodeError::InvalidOpcode(0)));
        assert_eq!(Instruction::decode(-1), Err(DecodeError::InvalidOpcode(-1)));
        assert_eq!(Instruction::decode(301), Err(DecodeError::InvalidMode(3)));
        // Digits past the arity are not looked at.
        assert_eq!(Instruction::decode(3104).unwrap().opcode, Opcode::Output);
    }

    #[test]
    fn test_disassembly() {
        let quine_start = Instruction::decode(204).unwrap();
        assert_eq!(
            quine_start.with_parameters(&[-1]).to_string(),
            "OUT [rb-1]"
        );
        let compare = Instruction::decode(1008).unwrap();
        assert_eq!(
            compare.with_parameters(&[100, 16, 101]).to_string(),
            "EQ [100] 16 -> [101]"
        );
        assert_eq!(
            Instruction::decode(3).unwrap().with_parameters(&[9]).to_string(),
            "IN [9]"
        );
        assert_eq!(compare.to_string(), "EQ [_] _ [_]");
    }

    fn any_instruction() -> impl Strategy<Value = Instruction> {
        let opcode = prop_oneof![
            Just(Opcode::Add),
            Just(Opcode::Multiply),
            Just(Opcode::Input),
            Just(Opcode::Output),
            Just(Opcode::JumpIfTrue),
            Just(Opcode::JumpIfFalse),
            Just(Opcode::LessThan),
            Just(Opcode::Equals),
            Just(Opcode::AdjustRelativeBase),
            Just(Opcode::Halt),
        ];
        let mode = prop_oneof![
            Just(ParameterMode::Position),
            Just(ParameterMode::Immediate),
            Just(ParameterMode::Relative),
        ];
        (opcode, proptest::array::uniform3(mode)).prop_map(|(opcode, mut modes)| {
            for mode in modes.iter_mut().skip(opcode.arity()) {
                *mode = ParameterMode::Position
            }
            Instruction::new(opcode, modes)
        })
    }

    proptest! {
        #[test]
        fn encoded_instructions_decode_to_themselves(instruction in any_instruction()) {
            prop_assert_eq!(Instruction::decode(instruction.encode()), Ok(instruction));
        }

        #[test]
        fn decoding_never_panics(word in any::<i64>()) {
            let _ = Instruction::decode(word);
        }
    }
}
