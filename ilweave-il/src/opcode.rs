//! Opcode definitions for the straight-line instruction subset.

use bitflags::bitflags;

bitflags! {
    /// Classification flags for an opcode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpcodeFlags: u8 {
        /// Pushes a value onto the evaluation stack.
        const LOAD = 1 << 0;
        /// Pops a value into an argument, local, or field.
        const STORE = 1 << 1;
        /// Transfers control to another method.
        const CALL = 1 << 2;
        /// Ends execution of the method body.
        const RETURN = 1 << 3;
        /// Emitted by the patch engine, never present in an original body.
        const INJECTED = 1 << 4;
    }
}

/// One opcode of the instruction set.
///
/// The set is deliberately branchless: spliced code is always straight-line,
/// so bodies never need jump-target fixup after an insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop,
    /// Load argument by slot index.
    Ldarg,
    /// Load local by slot index.
    Ldloc,
    /// Store top of stack into a local slot.
    Stloc,
    /// Load a 32-bit integer constant.
    LdcI4,
    /// Load a 64-bit float constant.
    LdcR8,
    /// Load an instance field of the object on top of the stack.
    Ldfld,
    /// Load the address of an instance field.
    Ldflda,
    /// Load a static field.
    Ldsfld,
    /// Store top of stack into an instance field.
    Stfld,
    Dup,
    Pop,
    Add,
    Sub,
    Mul,
    Neg,
    /// Static-dispatch call to a named method.
    Call,
    /// Virtual-dispatch call to a named method.
    Callvirt,
    /// Injected call into a named override slot, resolved at execution time.
    CallOverride,
    Ret,
}

impl Opcode {
    /// The textual mnemonic used in listings.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Ldarg => "ldarg",
            Opcode::Ldloc => "ldloc",
            Opcode::Stloc => "stloc",
            Opcode::LdcI4 => "ldc.i4",
            Opcode::LdcR8 => "ldc.r8",
            Opcode::Ldfld => "ldfld",
            Opcode::Ldflda => "ldflda",
            Opcode::Ldsfld => "ldsfld",
            Opcode::Stfld => "stfld",
            Opcode::Dup => "dup",
            Opcode::Pop => "pop",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Neg => "neg",
            Opcode::Call => "call",
            Opcode::Callvirt => "callvirt",
            Opcode::CallOverride => "callx",
            Opcode::Ret => "ret",
        }
    }

    /// Look up an opcode by its listing mnemonic.
    pub fn from_mnemonic(s: &str) -> Option<Opcode> {
        Some(match s {
            "nop" => Opcode::Nop,
            "ldarg" => Opcode::Ldarg,
            "ldloc" => Opcode::Ldloc,
            "stloc" => Opcode::Stloc,
            "ldc.i4" => Opcode::LdcI4,
            "ldc.r8" => Opcode::LdcR8,
            "ldfld" => Opcode::Ldfld,
            "ldflda" => Opcode::Ldflda,
            "ldsfld" => Opcode::Ldsfld,
            "stfld" => Opcode::Stfld,
            "dup" => Opcode::Dup,
            "pop" => Opcode::Pop,
            "add" => Opcode::Add,
            "sub" => Opcode::Sub,
            "mul" => Opcode::Mul,
            "neg" => Opcode::Neg,
            "call" => Opcode::Call,
            "callvirt" => Opcode::Callvirt,
            "callx" => Opcode::CallOverride,
            "ret" => Opcode::Ret,
            _ => return None,
        })
    }

    pub fn flags(self) -> OpcodeFlags {
        match self {
            Opcode::Nop | Opcode::Pop => OpcodeFlags::empty(),
            Opcode::Ldarg
            | Opcode::Ldloc
            | Opcode::LdcI4
            | Opcode::LdcR8
            | Opcode::Ldfld
            | Opcode::Ldflda
            | Opcode::Ldsfld
            | Opcode::Dup => OpcodeFlags::LOAD,
            Opcode::Stloc | Opcode::Stfld => OpcodeFlags::STORE,
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Neg => OpcodeFlags::LOAD,
            Opcode::Call | Opcode::Callvirt => OpcodeFlags::CALL,
            Opcode::CallOverride => OpcodeFlags::CALL | OpcodeFlags::INJECTED,
            Opcode::Ret => OpcodeFlags::RETURN,
        }
    }

    pub fn is_call(self) -> bool {
        self.flags().contains(OpcodeFlags::CALL)
    }

    pub fn is_return(self) -> bool {
        self.flags().contains(OpcodeFlags::RETURN)
    }

    /// True for opcodes only the patch engine emits.
    pub fn is_injected(self) -> bool {
        self.flags().contains(OpcodeFlags::INJECTED)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}
