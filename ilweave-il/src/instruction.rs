use crate::opcode::Opcode;

/// A named reference to a field or method, e.g. `Player::get_CanUnDuck`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    /// Owning type name.
    pub owner: String,
    /// Member name within the owner.
    pub name: String,
}

impl MemberRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for MemberRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.owner, self.name)
    }
}

/// Stack shape of an override slot, fixed at the splice site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Pops the top of stack, pushes a replacement value.
    Transform,
    /// No stack effect; diagnostics only.
    Observe,
}

impl Shape {
    pub fn name(self) -> &'static str {
        match self {
            Shape::Transform => "transform",
            Shape::Observe => "observe",
        }
    }

    pub fn from_name(s: &str) -> Option<Shape> {
        match s {
            "transform" => Some(Shape::Transform),
            "observe" => Some(Shape::Observe),
            _ => None,
        }
    }
}

/// Names an override-registry slot and the stack shape the splice expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRef {
    /// Registry slot name, resolved at execution time.
    pub name: String,
    pub shape: Shape,
    /// Number of context values the splice loaded onto the stack for the
    /// callback, popped again when the call executes.
    pub arity: u8,
}

impl std::fmt::Display for OverrideRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.shape.name())?;
        if self.arity != 0 {
            write!(f, ":{}", self.arity)?;
        }
        Ok(())
    }
}

/// One operand of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Integer immediate.
    Int(i64),
    /// Float immediate.
    Float(f64),
    /// Argument or local slot index.
    Slot(u16),
    /// Field reference.
    Field(MemberRef),
    /// Method reference.
    Method(MemberRef),
    /// Override slot reference (only on `callx`).
    Override(OverrideRef),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Int(v) => write!(f, "{v}"),
            Operand::Float(v) => write!(f, "{v:?}"),
            Operand::Slot(v) => write!(f, "{v}"),
            Operand::Field(m) | Operand::Method(m) => write!(f, "{m}"),
            Operand::Override(o) => write!(f, "{o}"),
        }
    }
}

/// One instruction: an opcode plus its operands.
///
/// Immutable once created. Bodies change by replacing or inserting whole
/// `Instruction` values, never by mutating one in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    opcode: Opcode,
    operands: Vec<Operand>,
}

impl Instruction {
    pub fn new(opcode: Opcode, operands: Vec<Operand>) -> Self {
        Self { opcode, operands }
    }

    pub fn nop() -> Self {
        Self::new(Opcode::Nop, vec![])
    }

    pub fn ldarg(slot: u16) -> Self {
        Self::new(Opcode::Ldarg, vec![Operand::Slot(slot)])
    }

    pub fn ldloc(slot: u16) -> Self {
        Self::new(Opcode::Ldloc, vec![Operand::Slot(slot)])
    }

    pub fn stloc(slot: u16) -> Self {
        Self::new(Opcode::Stloc, vec![Operand::Slot(slot)])
    }

    pub fn dup() -> Self {
        Self::new(Opcode::Dup, vec![])
    }

    pub fn pop() -> Self {
        Self::new(Opcode::Pop, vec![])
    }

    pub fn ldc_i4(value: i64) -> Self {
        Self::new(Opcode::LdcI4, vec![Operand::Int(value)])
    }

    pub fn ldc_r8(value: f64) -> Self {
        Self::new(Opcode::LdcR8, vec![Operand::Float(value)])
    }

    pub fn ldfld(owner: &str, name: &str) -> Self {
        Self::new(Opcode::Ldfld, vec![Operand::Field(MemberRef::new(owner, name))])
    }

    pub fn ldflda(owner: &str, name: &str) -> Self {
        Self::new(Opcode::Ldflda, vec![Operand::Field(MemberRef::new(owner, name))])
    }

    pub fn ldsfld(owner: &str, name: &str) -> Self {
        Self::new(Opcode::Ldsfld, vec![Operand::Field(MemberRef::new(owner, name))])
    }

    pub fn stfld(owner: &str, name: &str) -> Self {
        Self::new(Opcode::Stfld, vec![Operand::Field(MemberRef::new(owner, name))])
    }

    pub fn call(owner: &str, name: &str) -> Self {
        Self::new(Opcode::Call, vec![Operand::Method(MemberRef::new(owner, name))])
    }

    pub fn callvirt(owner: &str, name: &str) -> Self {
        Self::new(Opcode::Callvirt, vec![Operand::Method(MemberRef::new(owner, name))])
    }

    pub fn call_override(name: impl Into<String>, shape: Shape, arity: u8) -> Self {
        Self::new(
            Opcode::CallOverride,
            vec![Operand::Override(OverrideRef {
                name: name.into(),
                shape,
                arity,
            })],
        )
    }

    pub fn ret() -> Self {
        Self::new(Opcode::Ret, vec![])
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn operand(&self, i: usize) -> Option<&Operand> {
        self.operands.get(i)
    }

    /// The member reference operand, if this instruction has one.
    pub fn member(&self) -> Option<&MemberRef> {
        self.operands.iter().find_map(|op| match op {
            Operand::Field(m) | Operand::Method(m) => Some(m),
            _ => None,
        })
    }

    /// The override reference, if this is a `callx`.
    pub fn override_ref(&self) -> Option<&OverrideRef> {
        self.operands.iter().find_map(|op| match op {
            Operand::Override(o) => Some(o),
            _ => None,
        })
    }

    /// True if this is a `call` or `callvirt` to `owner::name`.
    pub fn is_call_to(&self, owner: &str, name: &str) -> bool {
        matches!(self.opcode, Opcode::Call | Opcode::Callvirt)
            && self
                .member()
                .is_some_and(|m| m.owner == owner && m.name == name)
    }

    /// True if this loads or stores the field `owner::name`.
    pub fn touches_field(&self, owner: &str, name: &str) -> bool {
        matches!(
            self.opcode,
            Opcode::Ldfld | Opcode::Ldflda | Opcode::Ldsfld | Opcode::Stfld
        ) && self
            .member()
            .is_some_and(|m| m.owner == owner && m.name == name)
    }

    /// True if this is `ldc.i4` pushing exactly `value`.
    pub fn loads_const_i4(&self, value: i64) -> bool {
        self.opcode == Opcode::LdcI4 && self.operand(0) == Some(&Operand::Int(value))
    }

    /// True if this is `ldarg` of the given slot.
    pub fn loads_arg(&self, slot: u16) -> bool {
        self.opcode == Opcode::Ldarg && self.operand(0) == Some(&Operand::Slot(slot))
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.opcode.mnemonic())?;
        for op in &self.operands {
            write!(f, " {op}")?;
        }
        Ok(())
    }
}
