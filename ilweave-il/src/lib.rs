//! Instruction model for the ilweave method-body patching engine.
//!
//! Provides the immutable [`Instruction`] value, the mutable [`Body`]
//! sequence that patch edits operate on, and a textual listing format for
//! tests and tooling.

pub mod body;
pub mod error;
pub mod instruction;
pub mod listing;
pub mod opcode;

pub use body::Body;
pub use error::{Error, Result};
pub use instruction::{Instruction, MemberRef, Operand, OverrideRef, Shape};
pub use listing::{parse_instruction, parse_listing};
pub use opcode::{Opcode, OpcodeFlags};
