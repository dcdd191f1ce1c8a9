//! Parsed expressions live in an [`ExprArena`] and refer to each other by index, so a function
//! body or either side of an application is an [`Operand`] rather than an owned subtree.
use core::fmt;
use std::{collections::HashMap, ops::Index};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExprId(usize);

impl ExprId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Denotes the value produced by the instruction at this position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstrRef(usize);

impl InstrRef {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Anything an instruction (or a binding) can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Expr(ExprId),
    Result(InstrRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// lambda-bound lowercase name
    Variable { name: Box<str> },
    /// uppercase global name
    Identifier { name: Box<str> },
    /// single-parameter abstraction; `bound` always points at a [`Expression::Variable`]
    Function { bound: ExprId, body: Operand },
    Application { applied: Operand, applicand: Operand },
}

impl Expression {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Variable { name } | Self::Identifier { name } => Some(&**name),
            Self::Function { .. } | Self::Application { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExprArena {
    nodes: Vec<Expression>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, expression: Expression) -> ExprId {
        let id = ExprId(self.nodes.len());
        self.nodes.push(expression);
        id
    }

    pub fn variable(&mut self, name: impl AsRef<str>) -> ExprId {
        self.alloc(Expression::Variable {
            name: Box::from(name.as_ref()),
        })
    }

    pub fn identifier(&mut self, name: impl AsRef<str>) -> ExprId {
        self.alloc(Expression::Identifier {
            name: Box::from(name.as_ref()),
        })
    }

    pub fn get(&self, id: ExprId) -> Option<&Expression> {
        self.nodes.get(id.index())
    }

    /// The expression behind an operand, if it is not an instruction result.
    pub fn resolve(&self, operand: Operand) -> Option<&Expression> {
        match operand {
            Operand::Expr(id) => self.get(id),
            Operand::Result(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn display(&self, operand: Operand) -> DisplayOperand<'_> {
        DisplayOperand {
            arena: self,
            operand,
        }
    }
}

impl Index<ExprId> for ExprArena {
    type Output = Expression;

    fn index(&self, id: ExprId) -> &Expression {
        &self.nodes[id.index()]
    }
}

/// Renders functions as `(\x.body)`, applications as `(applied applicand)` and instruction
/// results as `#index`.
///
/// Nesting depth is unbounded (`a a a ...` nests to the left once per name), so rendering walks
/// an explicit work list instead of recursing.
pub struct DisplayOperand<'a> {
    arena: &'a ExprArena,
    operand: Operand,
}

enum Piece {
    Operand(Operand),
    Text(&'static str),
}

impl fmt::Display for DisplayOperand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pending = vec![Piece::Operand(self.operand)];
        while let Some(piece) = pending.pop() {
            let id = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Operand(Operand::Result(instr)) => {
                    write!(f, "#{}", instr.index())?;
                    continue;
                }
                Piece::Operand(Operand::Expr(id)) => id,
            };
            // pushed in reverse, the work list is a stack
            match self.arena.get(id) {
                None => write!(f, "<dangling {}>", id.index())?,
                Some(Expression::Variable { name } | Expression::Identifier { name }) => {
                    f.write_str(name)?
                }
                Some(Expression::Function { bound, body }) => pending.extend([
                    Piece::Text(")"),
                    Piece::Operand(*body),
                    Piece::Text("."),
                    Piece::Operand(Operand::Expr(*bound)),
                    Piece::Text(r"(\"),
                ]),
                Some(Expression::Application { applied, applicand }) => pending.extend([
                    Piece::Text(")"),
                    Piece::Operand(*applicand),
                    Piece::Text(" "),
                    Piece::Operand(*applied),
                    Piece::Text("("),
                ]),
            }
        }
        Ok(())
    }
}

/// Global bindings from identifier name to value.
///
/// Keys are unique and a redeclaration overwrites the old value; nothing is ever removed.
/// Iteration follows the order in which names were first declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    values: HashMap<Box<str>, Operand>,
    order: Vec<Box<str>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, returning what it was bound to before.
    pub fn insert(&mut self, name: impl AsRef<str>, value: Operand) -> Option<Operand> {
        let name = name.as_ref();
        let previous = self.values.insert(Box::from(name), value);
        if previous.is_none() {
            self.order.push(Box::from(name));
        }
        previous
    }

    pub fn get(&self, name: impl AsRef<str>) -> Option<Operand> {
        self.values.get(name.as_ref()).copied()
    }

    pub fn contains(&self, name: impl AsRef<str>) -> bool {
        self.values.contains_key(name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Operand)> + '_ {
        self.order.iter().map(|name| (&**name, self.values[name]))
    }
}
