//! # Intcode memory trait
//! Needs to be implemented by any object that can be treated as Intcode memory i.e.
//! take non-negative integers as addresses and hold signed 64bit integers.
//!
//! Intcode memory is conceptually unbounded: reading an address that was never
//! written yields `0`, and writing any address succeeds, extending storage as needed.
//!
//! It is implemented for [`Vec<i64>`] (dense, zero-filled on growth), for
//! [`BTreeMap<usize, i64>`] (fully sparse), and for [`Memory`], the default used by
//! [`IntcodeMachine`](crate::machine::IntcodeMachine), which stays dense around the
//! program and falls back to a sparse map for far away addresses.

use std::collections::BTreeMap;

pub trait IntcodeMemory {
    /// Loads a program verbatim into low memory.
    fn from_program(program: &[i64]) -> Self
    where
        Self: Sized;

    /// Reads the content of memory at the given address, `0` if it was never written.
    fn get(&self, address: usize) -> i64;
    /// Sets the content of memory at the given address.
    fn set(&mut self, address: usize, value: i64);
    /// One past the highest populated address.
    fn extent(&self) -> usize;

    /// Returns the dense image of memory from address `0` up to [`extent`](Self::extent).
    ///
    /// The image allocates one cell per address below the extent, populated or not. A
    /// single far write (scratch space at `10^12` is legal) makes it unaffordable, such
    /// memories should be inspected cell by cell with [`get`](Self::get) instead.
    fn image(&self) -> Vec<i64> {
        (0..self.extent()).map(|address| self.get(address)).collect()
    }
}

impl IntcodeMemory for Vec<i64> {
    fn from_program(program: &[i64]) -> Self {
        program.to_vec()
    }

    fn get(&self, address: usize) -> i64 {
        self.as_slice().get(address).copied().unwrap_or(0)
    }
    fn set(&mut self, address: usize, value: i64) {
        if address >= self.len() {
            self.resize(address + 1, 0);
        }
        self[address] = value
    }
    fn extent(&self) -> usize {
        self.len()
    }
}

impl IntcodeMemory for BTreeMap<usize, i64> {
    fn from_program(program: &[i64]) -> Self {
        program.iter().copied().enumerate().collect()
    }

    fn get(&self, address: usize) -> i64 {
        BTreeMap::get(self, &address).copied().unwrap_or(0)
    }
    fn set(&mut self, address: usize, value: i64) {
        self.insert(address, value);
    }
    fn extent(&self) -> usize {
        self.last_key_value().map_or(0, |(&address, _)| address + 1)
    }
}

/// How far past its current end the dense region of a [`Memory`] may grow in one write.
pub const DENSE_GROWTH: usize = 0x10000;

/// Default Intcode memory.
///
/// Programs mostly touch addresses close to their own code, with the odd write
/// way out of bounds (scratch space at huge addresses is legal Intcode). Writes
/// that land within [`DENSE_GROWTH`] cells of the dense region extend it, anything
/// further goes to a sparse map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Memory {
    dense: Vec<i64>,
    sparse: BTreeMap<usize, i64>,
}
impl Memory {
    pub fn new() -> Self {
        Self::default()
    }
}
impl IntcodeMemory for Memory {
    fn from_program(program: &[i64]) -> Self {
        Self {
            dense: program.to_vec(),
            sparse: BTreeMap::new(),
        }
    }

    fn get(&self, address: usize) -> i64 {
        match self.dense.as_slice().get(address) {
            Some(&value) => value,
            None => self.sparse.get(&address).copied().unwrap_or(0),
        }
    }
    fn set(&mut self, address: usize, value: i64) {
        if address < self.dense.len() {
            self.dense[address] = value;
        } else if address - self.dense.len() < DENSE_GROWTH {
            let start = self.dense.len();
            self.dense.resize(address + 1, 0);
            // Sparse cells swallowed by the dense region move over.
            let moved: Vec<usize> = self
                .sparse
                .range(start..=address)
                .map(|(&a, _)| a)
                .collect();
            for moved_address in moved {
                if let Some(moved_value) = self.sparse.remove(&moved_address) {
                    self.dense[moved_address] = moved_value;
                }
            }
            self.dense[address] = value;
        } else {
            self.sparse.insert(address, value);
        }
    }
    fn extent(&self) -> usize {
        self.sparse
            .last_key_value()
            .map_or(self.dense.len(), |(&address, _)| address + 1)
            .max(self.dense.len())
    }
}

impl From<&[i64]> for Memory {
    fn from(program: &[i64]) -> Self {
        Self::from_program(program)
    }
}
