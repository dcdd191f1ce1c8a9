//! The linear instruction stream the parser emits while it reduces.
use core::fmt;

use crate::expression::{ExprArena, Operand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Assign,
    Func,
    Apply,
    Eval,
    Print,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Assign => "assign",
            Self::Func => "func",
            Self::Apply => "apply",
            Self::Eval => "eval",
            Self::Print => "print",
        })
    }
}

/// One `{op, arg1, arg2}` record.
///
/// | op       | arg1      | arg2        |
/// |----------|-----------|-------------|
/// | `assign` | value     | target identifier |
/// | `func`   | bound variable | body   |
/// | `apply`  | applied   | applicand   |
/// | `eval`   | value     | -           |
/// | `print`  | value     | -           |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    pub arg1: Operand,
    pub arg2: Option<Operand>,
}

impl Instruction {
    pub fn assign(value: Operand, target: Operand) -> Self {
        Self {
            op: Op::Assign,
            arg1: value,
            arg2: Some(target),
        }
    }

    pub fn func(bound: Operand, body: Operand) -> Self {
        Self {
            op: Op::Func,
            arg1: bound,
            arg2: Some(body),
        }
    }

    pub fn apply(applied: Operand, applicand: Operand) -> Self {
        Self {
            op: Op::Apply,
            arg1: applied,
            arg2: Some(applicand),
        }
    }

    pub fn eval(value: Operand) -> Self {
        Self {
            op: Op::Eval,
            arg1: value,
            arg2: None,
        }
    }

    pub fn print(value: Operand) -> Self {
        Self {
            op: Op::Print,
            arg1: value,
            arg2: None,
        }
    }

    pub fn display<'a>(&'a self, arena: &'a ExprArena) -> impl fmt::Display + 'a {
        DisplayInstruction {
            instruction: self,
            arena,
        }
    }
}

struct DisplayInstruction<'a> {
    instruction: &'a Instruction,
    arena: &'a ExprArena,
}

impl fmt::Display for DisplayInstruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Instruction { op, arg1, arg2 } = self.instruction;
        write!(f, "{op} {}", self.arena.display(*arg1))?;
        if let Some(arg2) = arg2 {
            write!(f, ", {}", self.arena.display(*arg2))?;
        }
        Ok(())
    }
}

/// One `index: op arg1[, arg2]` line per instruction.
pub fn dump(arena: &ExprArena, instructions: &[Instruction]) -> String {
    instructions
        .iter()
        .enumerate()
        .map(|(idx, instruction)| format!("{idx}: {}\n", instruction.display(arena)))
        .collect()
}
