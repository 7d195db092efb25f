//! Cursor-based editing over a method body.

use ilweave_il::{Body, Instruction, Shape};

use crate::error::{Error, Result};
use crate::pattern::{Pattern, find_next};

/// Describes one value an injected call loads before invoking its override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandLoader {
    /// The receiver, argument slot 0 (`ldarg 0`).
    This,
    /// An argument slot (`ldarg n`).
    Arg(u16),
    /// A local slot (`ldloc n`).
    Local(u16),
}

impl OperandLoader {
    fn instruction(self) -> Instruction {
        match self {
            OperandLoader::This => Instruction::ldarg(0),
            OperandLoader::Arg(n) => Instruction::ldarg(n),
            OperandLoader::Local(n) => Instruction::ldloc(n),
        }
    }
}

/// A mutable position within a [`Body`], used by edit functions to search
/// and splice.
///
/// Positions sit *between* instructions, in `[0, body.len()]`. The cursor
/// lives only for the duration of one edit function and never outlives the
/// body it edits.
pub struct Cursor<'b> {
    body: &'b mut Body,
    index: usize,
}

impl<'b> Cursor<'b> {
    /// A cursor at position 0.
    pub fn new(body: &'b mut Body) -> Self {
        Self { body, index: 0 }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn body(&self) -> &Body {
        self.body
    }

    /// Advance to just past the next match of `pattern` at or after the
    /// current position. On failure the cursor does not move.
    pub fn try_goto_next(&mut self, pattern: &Pattern) -> bool {
        match find_next(self.body, self.index, pattern) {
            Some(end) => {
                self.index = end;
                true
            }
            None => false,
        }
    }

    /// Like [`try_goto_next`](Self::try_goto_next), but a miss is an error
    /// carrying the pattern's description. For edits that are meaningless
    /// without their match.
    pub fn goto_next(&mut self, pattern: &Pattern) -> Result<()> {
        if self.try_goto_next(pattern) {
            Ok(())
        } else {
            Err(Error::PatternNotFound(pattern.to_string()))
        }
    }

    /// Adjust the position by a signed offset. Stepping outside
    /// `[0, body.len()]` is an error and leaves the cursor unmoved.
    pub fn move_by(&mut self, delta: isize) -> Result<()> {
        let target = self.index as isize + delta;
        if target < 0 || target as usize > self.body.len() {
            return Err(Error::CursorOutOfRange {
                index: self.index,
                delta,
                len: self.body.len(),
            });
        }
        self.index = target as usize;
        Ok(())
    }

    /// Insert one instruction at the cursor and advance past it.
    pub fn emit(&mut self, insn: Instruction) -> Result<()> {
        self.body.insert(self.index, insn)?;
        self.index += 1;
        Ok(())
    }

    /// Splice a call to the named override slot at the current position:
    /// one loader instruction per entry in `loaders`, then a `callx`
    /// carrying the slot name, `shape`, and the loader count.
    ///
    /// With [`Shape::Transform`] the call replaces the value currently on
    /// top of the evaluation stack; with [`Shape::Observe`] it has no stack
    /// effect beyond consuming the loaded context. The cursor ends past all
    /// emitted instructions, so continued searching never re-matches
    /// injected code.
    pub fn insert_call(
        &mut self,
        name: &str,
        shape: Shape,
        loaders: &[OperandLoader],
    ) -> Result<()> {
        let num_args = self.body.num_args();
        for &loader in loaders {
            let slot = match loader {
                OperandLoader::This => 0,
                OperandLoader::Arg(n) => n,
                OperandLoader::Local(_) => continue,
            };
            if slot >= num_args {
                return Err(Error::OperandUnavailable { loader, num_args });
            }
        }

        for &loader in loaders {
            self.emit(loader.instruction())?;
        }
        self.emit(Instruction::call_override(name, shape, loaders.len() as u8))
    }
}
