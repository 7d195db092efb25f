//! Textual listing format: one instruction per line.
//!
//! ```text
//! .args 1
//! ldarg 0
//! call Player::get_CanUnDuck
//! ret
//! ```
//!
//! `;` starts a comment. The optional `.args N` directive sets the method
//! arity. This is a human-readable form for tests and the dry-run CLI, not
//! a binary encoding.

use crate::body::Body;
use crate::error::{Error, Result};
use crate::instruction::{Instruction, MemberRef, Operand, OverrideRef, Shape};
use crate::opcode::Opcode;

/// Parse a listing into a [`Body`].
pub fn parse_listing(src: &str) -> Result<Body> {
    let mut num_args = 0u16;
    let mut insns = Vec::new();

    for (idx, raw) in src.lines().enumerate() {
        let line_no = idx + 1;
        let line = match raw.split(';').next() {
            Some(l) => l.trim(),
            None => "",
        };
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix(".args") {
            num_args = rest.trim().parse().map_err(|_| Error::BadOperand {
                line: line_no,
                message: format!("invalid .args directive `{line}`"),
            })?;
            continue;
        }

        insns.push(parse_instruction(line, line_no)?);
    }

    Ok(Body::from_instructions(num_args, insns))
}

/// Parse a single instruction line, e.g. `callvirt Player::set_Ducking`.
pub fn parse_instruction(line: &str, line_no: usize) -> Result<Instruction> {
    let mut parts = line.split_whitespace();
    let mnemonic = parts.next().unwrap_or("");
    let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| Error::UnknownMnemonic {
        line: line_no,
        mnemonic: mnemonic.to_string(),
    })?;
    let arg = parts.next();
    if parts.next().is_some() {
        return Err(Error::BadOperand {
            line: line_no,
            message: format!("too many operands for `{mnemonic}`"),
        });
    }

    let operands = match (opcode, arg) {
        (
            Opcode::Nop
            | Opcode::Dup
            | Opcode::Pop
            | Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Neg
            | Opcode::Ret,
            None,
        ) => vec![],
        (Opcode::Ldarg | Opcode::Ldloc | Opcode::Stloc, Some(a)) => {
            vec![Operand::Slot(parse_num(a, line_no)?)]
        }
        (Opcode::LdcI4, Some(a)) => vec![Operand::Int(parse_num(a, line_no)?)],
        (Opcode::LdcR8, Some(a)) => vec![Operand::Float(parse_num(a, line_no)?)],
        (Opcode::Ldfld | Opcode::Ldflda | Opcode::Ldsfld | Opcode::Stfld, Some(a)) => {
            vec![Operand::Field(parse_member(a, line_no)?)]
        }
        (Opcode::Call | Opcode::Callvirt, Some(a)) => {
            vec![Operand::Method(parse_member(a, line_no)?)]
        }
        (Opcode::CallOverride, Some(a)) => vec![Operand::Override(parse_override(a, line_no)?)],
        _ => {
            return Err(Error::BadOperand {
                line: line_no,
                message: format!("wrong operand count for `{mnemonic}`"),
            });
        }
    };

    Ok(Instruction::new(opcode, operands))
}

fn parse_num<T: std::str::FromStr>(s: &str, line: usize) -> Result<T> {
    s.parse().map_err(|_| Error::BadOperand {
        line,
        message: format!("invalid numeric operand `{s}`"),
    })
}

fn parse_member(s: &str, line: usize) -> Result<MemberRef> {
    match s.split_once("::") {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
            Ok(MemberRef::new(owner, name))
        }
        _ => Err(Error::BadOperand {
            line,
            message: format!("expected `Owner::name`, got `{s}`"),
        }),
    }
}

fn parse_override(s: &str, line: usize) -> Result<OverrideRef> {
    let mut parts = s.split(':');
    let name = parts.next().unwrap_or("");
    let shape = parts.next().ok_or_else(|| Error::BadOperand {
        line,
        message: format!("expected `name:shape[:arity]`, got `{s}`"),
    })?;
    let shape = Shape::from_name(shape).ok_or_else(|| Error::BadOperand {
        line,
        message: format!("unknown override shape `{shape}`"),
    })?;
    let arity = match parts.next() {
        Some(a) => parse_num(a, line)?,
        None => 0,
    };
    if parts.next().is_some() || name.is_empty() {
        return Err(Error::BadOperand {
            line,
            message: format!("malformed override operand `{s}`"),
        });
    }
    Ok(OverrideRef {
        name: name.to_string(),
        shape,
        arity,
    })
}

impl std::fmt::Display for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, ".args {}", self.num_args())?;
        for insn in self.iter() {
            writeln!(f, "{insn}")?;
        }
        Ok(())
    }
}
