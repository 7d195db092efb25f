//! YAML patch plans: a declarative front end over patterns and cursors.
//!
//! ```yaml
//! hooks:
//!   - target: Player::SuperWallJump
//!     edits:
//!       - match: ["ldarg 0", "ldc.i4 0", "callvirt Player::set_Ducking"]
//!         back: 1
//!         load: [this]
//!         invoke: mod_ducking
//!         shape: transform
//! ```
//!
//! Each `match` entry uses listing syntax; `?` in place of an operand
//! matches on opcode alone.

use serde::Deserialize;

use ilweave_il::{Opcode, Shape, parse_instruction};
use ilweave_patch::{Cursor, Error, OperandLoader, Pattern, Result};

#[derive(Debug, Deserialize)]
pub struct Plan {
    pub hooks: Vec<HookPlan>,
}

#[derive(Debug, Deserialize)]
pub struct HookPlan {
    /// Method target name.
    pub target: String,
    pub edits: Vec<EditPlan>,
}

#[derive(Debug, Deserialize)]
pub struct EditPlan {
    /// Instruction matchers, in listing syntax.
    #[serde(rename = "match")]
    pub pattern: Vec<String>,
    /// Patch every occurrence instead of only the first.
    #[serde(default)]
    pub all: bool,
    /// Step back this many instructions before splicing.
    #[serde(default)]
    pub back: usize,
    /// Operand loaders: `this`, `arg N`, `local N`.
    #[serde(default)]
    pub load: Vec<String>,
    /// Override slot name to invoke.
    pub invoke: String,
    #[serde(default = "ShapePlan::transform")]
    pub shape: ShapePlan,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapePlan {
    Transform,
    Observe,
}

impl ShapePlan {
    fn transform() -> Self {
        ShapePlan::Transform
    }
}

impl From<ShapePlan> for Shape {
    fn from(s: ShapePlan) -> Shape {
        match s {
            ShapePlan::Transform => Shape::Transform,
            ShapePlan::Observe => Shape::Observe,
        }
    }
}

impl Plan {
    pub fn from_yaml(src: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(src)
    }
}

/// Compile one `match` entry into a pattern predicate.
fn compile_matcher(pattern: Pattern, entry: &str) -> Result<Pattern> {
    let mut parts = entry.split_whitespace();
    let mnemonic = parts.next().unwrap_or("");
    let operand = parts.next();

    // Bare mnemonic or `?` operand: match on opcode alone.
    if operand.is_none() || operand == Some("?") {
        let op = Opcode::from_mnemonic(mnemonic).ok_or_else(|| {
            Error::Il(ilweave_il::Error::UnknownMnemonic {
                line: 0,
                mnemonic: mnemonic.to_string(),
            })
        })?;
        return Ok(pattern.opcode(op));
    }

    // A full instruction: match by equality.
    let expected = parse_instruction(entry, 0)?;
    let label = entry.to_string();
    Ok(pattern.matching(label, move |insn| insn == &expected))
}

fn compile_loader(entry: &str) -> Result<OperandLoader> {
    let mut parts = entry.split_whitespace();
    let kind = parts.next().unwrap_or("");
    let index = parts.next();
    let parse_index = |s: Option<&str>| -> Result<u16> {
        s.and_then(|v| v.parse().ok()).ok_or_else(|| {
            Error::Il(ilweave_il::Error::BadOperand {
                line: 0,
                message: format!("invalid loader `{entry}`"),
            })
        })
    };
    match kind {
        "this" => Ok(OperandLoader::This),
        "arg" => Ok(OperandLoader::Arg(parse_index(index)?)),
        "local" => Ok(OperandLoader::Local(parse_index(index)?)),
        _ => Err(Error::Il(ilweave_il::Error::BadOperand {
            line: 0,
            message: format!("unknown loader `{entry}`"),
        })),
    }
}

impl EditPlan {
    /// Compile into an edit function suitable for `Patcher::hook`.
    pub fn compile(&self) -> Result<impl Fn(&mut Cursor<'_>) -> Result<()> + Send + Sync + use<>> {
        let mut pattern = Pattern::new();
        for entry in &self.pattern {
            pattern = compile_matcher(pattern, entry)?;
        }
        let loaders = self
            .load
            .iter()
            .map(|l| compile_loader(l))
            .collect::<Result<Vec<_>>>()?;
        let invoke = self.invoke.clone();
        let shape: Shape = self.shape.into();
        let (all, back) = (self.all, self.back);

        Ok(move |cursor: &mut Cursor<'_>| -> Result<()> {
            let mut matched = false;
            while cursor.try_goto_next(&pattern) {
                matched = true;
                if back > 0 {
                    cursor.move_by(-(back as isize))?;
                }
                cursor.insert_call(&invoke, shape, &loaders)?;
                if !all {
                    break;
                }
            }
            if matched {
                Ok(())
            } else {
                Err(Error::PatternNotFound(pattern.to_string()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ilweave_il::parse_listing;

    const PLAN: &str = "\
hooks:
  - target: Player::SuperWallJump
    edits:
      - match: [\"ldarg 0\", \"ldc.i4 0\", \"callvirt Player::set_Ducking\"]
        back: 1
        load: [this]
        invoke: mod_ducking
        shape: transform
  - target: Player::ClimbUpdate
    edits:
      - match: [\"callvirt Player::get_CanUnDuck\"]
        all: true
        invoke: duckable
";

    #[test]
    fn parses_plan_yaml() {
        let plan = Plan::from_yaml(PLAN).unwrap();
        assert_eq!(plan.hooks.len(), 2);
        assert_eq!(plan.hooks[0].edits[0].back, 1);
        assert!(plan.hooks[1].edits[0].all);
        assert!(matches!(plan.hooks[1].edits[0].shape, ShapePlan::Transform));
    }

    #[test]
    fn compiled_edit_splices_with_back_and_loader() {
        let plan = Plan::from_yaml(PLAN).unwrap();
        let edit = plan.hooks[0].edits[0].compile().unwrap();

        let mut body = parse_listing(
            ".args 1\n\
             ldarg 0\n\
             ldc.i4 0\n\
             callvirt Player::set_Ducking\n\
             ret\n",
        )
        .unwrap();
        let mut cursor = Cursor::new(&mut body);
        edit(&mut cursor).unwrap();

        assert_eq!(
            body.to_string(),
            ".args 1\n\
             ldarg 0\n\
             ldc.i4 0\n\
             ldarg 0\n\
             callx mod_ducking:transform:1\n\
             callvirt Player::set_Ducking\n\
             ret\n"
        );
    }

    #[test]
    fn compiled_edit_reports_pattern_miss() {
        let plan = Plan::from_yaml(PLAN).unwrap();
        let edit = plan.hooks[0].edits[0].compile().unwrap();

        let mut body = parse_listing(".args 1\nldarg 0\nret\n").unwrap();
        let mut cursor = Cursor::new(&mut body);
        assert!(matches!(
            edit(&mut cursor),
            Err(Error::PatternNotFound(_))
        ));
    }

    #[test]
    fn wildcard_operand_matches_opcode_only() {
        let p = compile_matcher(Pattern::new(), "ldarg ?").unwrap();
        let body = parse_listing(".args 2\nldarg 1\nret\n").unwrap();
        assert_eq!(ilweave_patch::find_next(&body, 0, &p), Some(1));
    }

    #[test]
    fn unknown_loader_rejected() {
        assert!(compile_loader("stack").is_err());
        assert!(compile_loader("arg").is_err());
        assert_eq!(compile_loader("arg 2").unwrap(), OperandLoader::Arg(2));
        assert_eq!(compile_loader("this").unwrap(), OperandLoader::This);
    }
}
