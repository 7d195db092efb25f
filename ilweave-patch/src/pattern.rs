//! Predicate-sequence matching over instruction bodies.

use ilweave_il::{Body, Instruction, Opcode};

type PredFn = Box<dyn Fn(&Instruction) -> bool + Send + Sync>;

struct Pred {
    label: String,
    test: PredFn,
}

/// An ordered list of per-instruction predicates.
///
/// A pattern matches a contiguous window of a body iff every predicate, in
/// order, accepts the instruction at the corresponding offset. Each builder
/// method appends one predicate; labels feed diagnostics when a match is
/// expected but missing.
#[derive(Default)]
pub struct Pattern {
    preds: Vec<Pred>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an arbitrary predicate with a diagnostic label.
    pub fn matching(
        mut self,
        label: impl Into<String>,
        test: impl Fn(&Instruction) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.preds.push(Pred {
            label: label.into(),
            test: Box::new(test),
        });
        self
    }

    /// Match any instruction with the given opcode.
    pub fn opcode(self, op: Opcode) -> Self {
        self.matching(op.mnemonic().to_string(), move |i| i.opcode() == op)
    }

    /// Match `ldarg` of a specific slot.
    pub fn ldarg(self, slot: u16) -> Self {
        self.matching(format!("ldarg {slot}"), move |i| i.loads_arg(slot))
    }

    /// Match `ldc.i4` of a specific value.
    pub fn ldc_i4(self, value: i64) -> Self {
        self.matching(format!("ldc.i4 {value}"), move |i| i.loads_const_i4(value))
    }

    /// Match a `call` or `callvirt` to `owner::name`.
    pub fn call_to(self, owner: &str, name: &str) -> Self {
        let (owner, name) = (owner.to_string(), name.to_string());
        self.matching(format!("call {owner}::{name}"), move |i| {
            i.is_call_to(&owner, &name)
        })
    }

    /// Match any field access (`ldfld`/`ldflda`/`ldsfld`/`stfld`) of
    /// `owner::name`.
    pub fn field(self, owner: &str, name: &str) -> Self {
        let (owner, name) = (owner.to_string(), name.to_string());
        self.matching(format!("field {owner}::{name}"), move |i| {
            i.touches_field(&owner, &name)
        })
    }

    pub fn len(&self) -> usize {
        self.preds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preds.is_empty()
    }

    /// Test the window starting at `i` against every predicate in order.
    pub fn matches_at(&self, body: &Body, i: usize) -> bool {
        if self.preds.is_empty() {
            return false;
        }
        self.preds.iter().enumerate().all(|(k, pred)| {
            body.get(i + k).is_some_and(|insn| (pred.test)(insn))
        })
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, pred) in self.preds.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&pred.label)?;
        }
        Ok(())
    }
}

/// Scan `body` forward from `start` for the first window matching `pattern`.
///
/// Returns the index just *after* the match, the position callers splice at
/// when they patch behind a recognized sub-expression. Repeated calls with
/// `start` set to the previous result enumerate all non-overlapping matches.
/// The empty pattern never matches.
pub fn find_next(body: &Body, start: usize, pattern: &Pattern) -> Option<usize> {
    let n = pattern.len();
    if n == 0 || body.len() < n {
        return None;
    }
    for i in start..=body.len() - n {
        if pattern.matches_at(body, i) {
            return Some(i + n);
        }
    }
    None
}
