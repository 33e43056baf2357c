//! # Intcode I/O bus
//! Intcode interacts with the outside world through two instructions: `IN` consumes
//! a value, `OUT` emits one. What sits on the other end is implementation defined
//! in the form of a trait that satisfies:
//! - handing out the next input value, or telling the machine none is available yet
//!   (the machine then suspends) or ever (the machine faults)
//! - accepting output values, without ever blocking

/// What a bus has to offer when the machine asks for input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    /// The next value, consumed.
    Value(i64),
    /// Nothing yet. The machine suspends and retries the same instruction later.
    Pending,
    /// Nothing ever again.
    Closed,
}
impl From<Option<i64>> for Input {
    /// `None` is treated as temporary emptiness.
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Pending, Self::Value)
    }
}

pub trait IntcodeBus {
    fn read(&mut self) -> Input;
    fn write(&mut self, value: i64);
}

impl<B: IntcodeBus + ?Sized> IntcodeBus for &mut B {
    fn read(&mut self) -> Input {
        (**self).read()
    }
    fn write(&mut self, value: i64) {
        (**self).write(value)
    }
}

/// A bus with no input at all whose output is discarded.
///
/// Handy for programs that only compute in memory, such as the early `ADD`/`MUL` only ones.
impl IntcodeBus for () {
    fn read(&mut self) -> Input {
        Input::Closed
    }
    fn write(&mut self, _value: i64) {}
}
