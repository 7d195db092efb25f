//! A small stack machine that executes method bodies, giving spliced
//! `callx` sites something to run against. Patched bodies may execute on
//! any host thread, so everything invoked from here is `Send + Sync`.

use ilweave_il::{Body, MemberRef, Opcode, Operand, Shape};

use crate::error::{Error, Result};
use crate::registry::{Override, OverrideRegistry};

/// A runtime value on the evaluation stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// Resolves ordinary calls and field accesses for the evaluator.
///
/// `call` receives the whole evaluation stack and must pop its own
/// arguments and push its result, mirroring how the spliced call sites
/// manage the stack themselves. The field hooks default to unresolved for
/// hosts that only dispatch calls.
pub trait CallHost: Send + Sync {
    fn call(&self, method: &MemberRef, stack: &mut Vec<Value>) -> Result<()>;

    fn load_field(&self, field: &MemberRef, _this: Option<Value>) -> Result<Value> {
        Err(Error::UnresolvedField(field.to_string()))
    }

    fn store_field(&self, field: &MemberRef, _this: Option<Value>, _value: Value) -> Result<()> {
        Err(Error::UnresolvedField(field.to_string()))
    }
}

/// Execute `body` with the given arguments.
///
/// `callx` instructions resolve their override slot in `registry` at the
/// moment they execute; a slot registered or replaced after patching takes
/// effect on the next run without re-patching. Falling off the end of the
/// body yields [`Value::Null`].
pub fn run(
    body: &Body,
    args: &[Value],
    host: &dyn CallHost,
    registry: &OverrideRegistry,
) -> Result<Value> {
    if args.len() != body.num_args() as usize {
        return Err(Error::ArityMismatch {
            expected: body.num_args(),
            got: args.len(),
        });
    }

    let mut locals: Vec<Value> = Vec::new();
    let mut stack: Vec<Value> = Vec::new();

    for (pc, insn) in body.iter().enumerate() {
        match insn.opcode() {
            Opcode::Nop => {}
            Opcode::Ldarg => {
                let slot = slot_operand(insn.operand(0), pc)?;
                let value = args.get(slot).copied().ok_or(Error::BadOperand(pc))?;
                stack.push(value);
            }
            Opcode::Ldloc => {
                let slot = slot_operand(insn.operand(0), pc)?;
                stack.push(locals.get(slot).copied().unwrap_or(Value::Null));
            }
            Opcode::Stloc => {
                let slot = slot_operand(insn.operand(0), pc)?;
                let value = pop(&mut stack, pc)?;
                if locals.len() <= slot {
                    locals.resize(slot + 1, Value::Null);
                }
                locals[slot] = value;
            }
            Opcode::LdcI4 => match insn.operand(0) {
                Some(Operand::Int(v)) => stack.push(Value::Int(*v)),
                _ => return Err(Error::BadOperand(pc)),
            },
            Opcode::LdcR8 => match insn.operand(0) {
                Some(Operand::Float(v)) => stack.push(Value::Float(*v)),
                _ => return Err(Error::BadOperand(pc)),
            },
            Opcode::Ldfld | Opcode::Ldflda => {
                let field = member_operand(insn, pc)?;
                let this = pop(&mut stack, pc)?;
                stack.push(host.load_field(field, Some(this))?);
            }
            Opcode::Ldsfld => {
                let field = member_operand(insn, pc)?;
                stack.push(host.load_field(field, None)?);
            }
            Opcode::Stfld => {
                let field = member_operand(insn, pc)?;
                let value = pop(&mut stack, pc)?;
                let this = pop(&mut stack, pc)?;
                host.store_field(field, Some(this), value)?;
            }
            Opcode::Dup => {
                let top = *stack.last().ok_or(Error::StackUnderflow(pc))?;
                stack.push(top);
            }
            Opcode::Pop => {
                pop(&mut stack, pc)?;
            }
            Opcode::Add => binary(&mut stack, pc, |a, b| a + b, |a, b| a + b)?,
            Opcode::Sub => binary(&mut stack, pc, |a, b| a - b, |a, b| a - b)?,
            Opcode::Mul => binary(&mut stack, pc, |a, b| a * b, |a, b| a * b)?,
            Opcode::Neg => {
                let v = match pop(&mut stack, pc)? {
                    Value::Int(v) => Value::Int(-v),
                    Value::Float(v) => Value::Float(-v),
                    _ => return Err(Error::TypeMismatch(pc)),
                };
                stack.push(v);
            }
            Opcode::Call | Opcode::Callvirt => {
                let method = member_operand(insn, pc)?;
                host.call(method, &mut stack)?;
            }
            Opcode::CallOverride => {
                let ovr = insn.override_ref().ok_or(Error::BadOperand(pc))?;

                let mut ctx = Vec::with_capacity(ovr.arity as usize);
                for _ in 0..ovr.arity {
                    ctx.push(pop(&mut stack, pc)?);
                }
                ctx.reverse(); // ctx[0] is the first-loaded operand

                match registry.resolve(&ovr.name) {
                    Some(Override::Transform(f)) if ovr.shape == Shape::Transform => {
                        let existing = pop(&mut stack, pc)?;
                        stack.push(f(existing, &ctx));
                    }
                    Some(Override::Observe(f)) if ovr.shape == Shape::Observe => {
                        f(&ctx);
                    }
                    Some(_) => {
                        log::warn!(
                            "override `{}` registered with the wrong shape (splice expects {}); leaving value unchanged",
                            ovr.name,
                            ovr.shape.name()
                        );
                    }
                    None => {
                        log::warn!("override `{}` not registered; leaving value unchanged", ovr.name);
                    }
                }
            }
            Opcode::Ret => return Ok(stack.pop().unwrap_or(Value::Null)),
        }
    }

    Ok(Value::Null)
}

fn pop(stack: &mut Vec<Value>, pc: usize) -> Result<Value> {
    stack.pop().ok_or(Error::StackUnderflow(pc))
}

fn slot_operand(op: Option<&Operand>, pc: usize) -> Result<usize> {
    match op {
        Some(Operand::Slot(s)) => Ok(*s as usize),
        _ => Err(Error::BadOperand(pc)),
    }
}

fn member_operand(insn: &ilweave_il::Instruction, pc: usize) -> Result<&MemberRef> {
    insn.member().ok_or(Error::BadOperand(pc))
}

fn binary(
    stack: &mut Vec<Value>,
    pc: usize,
    int_op: impl Fn(i64, i64) -> i64,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<()> {
    let b = pop(stack, pc)?;
    let a = pop(stack, pc)?;
    let v = match (a, b) {
        (Value::Int(a), Value::Int(b)) => Value::Int(int_op(a, b)),
        (Value::Float(a), Value::Float(b)) => Value::Float(float_op(a, b)),
        (Value::Int(a), Value::Float(b)) => Value::Float(float_op(a as f64, b)),
        (Value::Float(a), Value::Int(b)) => Value::Float(float_op(a, b as f64)),
        _ => return Err(Error::TypeMismatch(pc)),
    };
    stack.push(v);
    Ok(())
}
