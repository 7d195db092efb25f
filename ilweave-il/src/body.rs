//! The mutable instruction sequence for one method body.

use crate::error::{Error, Result};
use crate::instruction::Instruction;

/// An ordered, index-contiguous instruction sequence plus the method arity.
///
/// A `Body` is owned exclusively by whichever edit is currently running
/// against it; the patch engine hands out working copies, never shared
/// references.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    insns: Vec<Instruction>,
    num_args: u16,
}

impl Body {
    /// An empty body for a method taking `num_args` arguments.
    pub fn new(num_args: u16) -> Self {
        Self {
            insns: Vec::new(),
            num_args,
        }
    }

    pub fn from_instructions(num_args: u16, insns: Vec<Instruction>) -> Self {
        Self { insns, num_args }
    }

    /// Number of arguments the method takes (`this` counts as slot 0 for
    /// instance methods).
    pub fn num_args(&self) -> u16 {
        self.num_args
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    /// The instruction at `i`, or an error if `i` is out of `[0, len)`.
    pub fn at(&self, i: usize) -> Result<&Instruction> {
        self.insns.get(i).ok_or(Error::IndexOutOfBounds {
            index: i,
            len: self.insns.len(),
        })
    }

    pub fn get(&self, i: usize) -> Option<&Instruction> {
        self.insns.get(i)
    }

    /// Insert at `i`, shifting everything at `i` and beyond forward by one.
    /// `i == len()` appends.
    pub fn insert(&mut self, i: usize, insn: Instruction) -> Result<()> {
        if i > self.insns.len() {
            return Err(Error::IndexOutOfBounds {
                index: i,
                len: self.insns.len(),
            });
        }
        self.insns.insert(i, insn);
        Ok(())
    }

    /// Overwrite the instruction at `i` in place.
    pub fn replace(&mut self, i: usize, insn: Instruction) -> Result<()> {
        if i >= self.insns.len() {
            return Err(Error::IndexOutOfBounds {
                index: i,
                len: self.insns.len(),
            });
        }
        self.insns[i] = insn;
        Ok(())
    }

    /// Remove the instruction at `i`, shifting the tail back by one.
    pub fn remove(&mut self, i: usize) -> Result<Instruction> {
        if i >= self.insns.len() {
            return Err(Error::IndexOutOfBounds {
                index: i,
                len: self.insns.len(),
            });
        }
        Ok(self.insns.remove(i))
    }

    pub fn push(&mut self, insn: Instruction) {
        self.insns.push(insn);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.insns.iter()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.insns
    }
}
