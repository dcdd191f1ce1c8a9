pub mod compiler;
pub mod expression;
pub mod instruction;
pub mod lexer;
pub mod parser;

pub use compiler::{compile_program, CompileError, Compiler};
pub use expression::{ExprArena, ExprId, Expression, InstrRef, Operand, SymbolTable};
pub use instruction::{Instruction, Op};
pub use lexer::{Scanner, Token, TokenKind, TokenSource};
pub use parser::{ParseError, Parser, Program, SyntaxError};
