//! Lower a parsed [`Program`]'s instructions into stack machine bytecode.
//!
//! Names never appear in the bytecode. Identifiers and variables are interned into two
//! separate tables, and operands are the interned codes. Inside a function body, the function's
//! own parameter is pushed as the reserved variable `SUBSTITUTE` (always code 0) so a later
//! evaluator can substitute it without caring what it was called.
//!
//! For example:
//!
//! let N = \x.x
//! let F = N N
//!
//! parses into
//!
//! 0: func x, x
//! 1: assign (\x.x), N
//! 2: apply (\x.x), (\x.x)
//! 3: assign ((\x.x) (\x.x)), F
//!
//! and compiles to
//!
//! PUSH 1 ; x
//! PUSH 0 ; SUBSTITUTE
//! FUNC
//! STORE 0 ; N
//! STORE 1 ; F
//!
//! (`apply` does not lower to anything yet)
use lasso::{Key, Rodeo, Spur};
use tracing::trace;

use crate::{
    expression::{ExprArena, Expression, Operand, SymbolTable},
    instruction::{Instruction, Op},
    parser::Program,
};

pub mod bytecode;

use bytecode::{Command, DecodeError, Decoder};

/// Name interned ahead of everything else, so it owns variable code 0.
pub const SUBSTITUTE: &str = "SUBSTITUTE";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("instruction {index}: identifier `{name}` is not defined")]
    Undefined { index: usize, name: Box<str> },
    #[error("instruction {index}: `{op}` is missing its second operand")]
    MissingOperand { index: usize, op: Op },
    #[error("instruction {index}: expected {expected}, found `{found}`")]
    Shape {
        index: usize,
        expected: &'static str,
        found: Box<str>,
    },
    #[error("too many distinct {0} names for one-byte operands")]
    TooManyNames(&'static str),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

fn code(key: Spur, table: &'static str) -> Result<u8, CompileError> {
    u8::try_from(key.into_usize()).map_err(|_| CompileError::TooManyNames(table))
}

#[derive(Debug)]
pub struct Compiler {
    bytecode: Vec<u8>,
    symbols: SymbolTable,
    identifiers: Rodeo,
    variables: Rodeo,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(SymbolTable::new())
    }
}

impl Compiler {
    pub fn new(symbols: SymbolTable) -> Self {
        let mut variables = Rodeo::new();
        variables.get_or_intern_static(SUBSTITUTE);
        Self {
            bytecode: Vec::new(),
            symbols,
            identifiers: Rodeo::new(),
            variables,
        }
    }

    /// Code of identifier `name`, interning it on first sight.
    pub fn identifier_code(&mut self, name: &str) -> Result<u8, CompileError> {
        code(self.identifiers.get_or_intern(name), "identifier")
    }

    /// Code of variable `name`, interning it on first sight.
    pub fn variable_code(&mut self, name: &str) -> Result<u8, CompileError> {
        code(self.variables.get_or_intern(name), "variable")
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Interned identifiers in code order.
    pub fn identifiers(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.identifiers.iter().map(|(key, name)| (key.into_usize(), name))
    }

    /// Interned variables in code order, starting with [`SUBSTITUTE`].
    pub fn variables(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.variables.iter().map(|(key, name)| (key.into_usize(), name))
    }

    fn emit(&mut self, command: Command, operand: Option<u8>) {
        self.bytecode.push(command.into());
        self.bytecode.extend(operand);
    }

    /// Appends the lowering of every instruction, in order.
    pub fn compile(
        &mut self,
        arena: &ExprArena,
        instructions: &[Instruction],
    ) -> Result<(), CompileError> {
        for (index, instruction) in instructions.iter().enumerate() {
            let start = self.bytecode.len();
            self.lower(arena, index, instruction)?;
            trace!(
                index,
                instruction = %instruction.display(arena),
                bytes = ?&self.bytecode[start..],
                "lowered"
            );
        }
        Ok(())
    }

    fn lower(
        &mut self,
        arena: &ExprArena,
        index: usize,
        instruction: &Instruction,
    ) -> Result<(), CompileError> {
        let &Instruction { op, arg1, arg2 } = instruction;
        let shape = |expected: &'static str, operand: Operand| CompileError::Shape {
            index,
            expected,
            found: arena.display(operand).to_string().into(),
        };
        let second = || arg2.ok_or(CompileError::MissingOperand { index, op });

        match op {
            Op::Assign => {
                let target_operand = second()?;
                let Some(Expression::Identifier { name: target }) = arena.resolve(target_operand)
                else {
                    return Err(shape("an identifier", target_operand));
                };
                match arena.resolve(arg1) {
                    Some(Expression::Identifier { name }) => {
                        let value = self.symbols.get(name).ok_or_else(|| CompileError::Undefined {
                            index,
                            name: name.clone(),
                        })?;
                        self.symbols.insert(target, value);
                        let code = self.identifier_code(name)?;
                        self.emit(Command::Load, Some(code));
                    }
                    Some(Expression::Variable { name }) => {
                        self.symbols.insert(target, arg1);
                        let code = self.variable_code(name)?;
                        self.emit(Command::Push, Some(code));
                    }
                    // already bound by the parser, and its value came from earlier instructions
                    _ => {}
                }
                let code = self.identifier_code(target)?;
                self.emit(Command::Store, Some(code));
            }
            Op::Func => {
                let body = second()?;
                let Some(Expression::Variable { name: bound }) = arena.resolve(arg1) else {
                    return Err(shape("a variable", arg1));
                };
                let code = self.variable_code(bound)?;
                self.emit(Command::Push, Some(code));
                match arena.resolve(body) {
                    Some(Expression::Identifier { name }) => {
                        if !self.symbols.contains(name) {
                            return Err(CompileError::Undefined {
                                index,
                                name: name.clone(),
                            });
                        }
                        let code = self.identifier_code(name)?;
                        self.emit(Command::Load, Some(code));
                    }
                    Some(Expression::Variable { name }) => {
                        let code = if name == bound {
                            self.variable_code(SUBSTITUTE)?
                        } else {
                            self.variable_code(name)?
                        };
                        self.emit(Command::Push, Some(code));
                    }
                    // the body is the value of an earlier instruction
                    _ => {}
                }
                self.emit(Command::Func, None);
            }
            Op::Apply => {}
            Op::Eval => self.emit(Command::Eval, None),
            Op::Print => self.emit(Command::Print, None),
        }
        Ok(())
    }

    /// The bytecode, one command per line, with operand names as comments.
    pub fn disassemble(&self) -> Result<String, CompileError> {
        let mut out = String::new();
        for decoded in Decoder::new(&self.bytecode) {
            let decoded = decoded?;
            let table = match decoded.command {
                Command::Push => &self.variables,
                _ => &self.identifiers,
            };
            let name = decoded
                .operand
                .and_then(|operand| Spur::try_from_usize(usize::from(operand)))
                .and_then(|key| table.try_resolve(&key));
            match name {
                Some(name) => out.push_str(&format!("{decoded} ; {name}\n")),
                None => out.push_str(&format!("{decoded}\n")),
            }
        }
        Ok(out)
    }
}

/// Compiles `program` against its own symbol table.
pub fn compile_program(program: &Program) -> Result<Compiler, CompileError> {
    let mut compiler = Compiler::new(program.symbols.clone());
    compiler.compile(&program.expressions, &program.instructions)?;
    Ok(compiler)
}

#[cfg(test)]
mod tests {
    use super::{bytecode::Command, compile_program, CompileError, Compiler, SUBSTITUTE};
    use crate::{
        expression::{ExprArena, Expression, InstrRef, Operand, SymbolTable},
        instruction::{Instruction, Op},
        lexer::Scanner,
        parser::{Parser, Program},
    };
    use assert2::{check, let_assert};

    fn program(source: &str) -> Program {
        let mut parser = Parser::new(Scanner::new(source));
        let_assert!(Ok(true) = parser.parse());
        parser.finish()
    }

    const PUSH: u8 = Command::Push as u8;
    const STORE: u8 = Command::Store as u8;
    const LOAD: u8 = Command::Load as u8;
    const FUNC: u8 = Command::Func as u8;

    #[test]
    fn identity_and_self_application() {
        let_assert!(Ok(compiler) = compile_program(&program(r"let N = \x.x let F = N N")));
        check!(compiler.variables().collect::<Vec<_>>() == [(0, SUBSTITUTE), (1, "x")]);
        check!(compiler.identifiers().collect::<Vec<_>>() == [(0, "N"), (1, "F")]);
        check!(compiler.bytecode() == [PUSH, 1, PUSH, 0, FUNC, STORE, 0, STORE, 1]);
        let_assert!(Ok(listing) = compiler.disassemble());
        check!(listing == "PUSH 1 ; x\nPUSH 0 ; SUBSTITUTE\nFUNC\nSTORE 0 ; N\nSTORE 1 ; F\n");
    }

    #[test]
    fn free_variables_keep_their_own_code() {
        let_assert!(Ok(compiler) = compile_program(&program(r"let K = \x.y")));
        check!(compiler.bytecode() == [PUSH, 1, PUSH, 2, FUNC, STORE, 0]);
    }

    #[test]
    fn variables_are_bound_and_pushed() {
        let_assert!(Ok(compiler) = compile_program(&program("let V = v")));
        check!(compiler.bytecode() == [PUSH, 1, STORE, 0]);
        check!(compiler.symbols().contains("V"));
    }

    #[test]
    fn eval_and_print_are_bare_commands() {
        let_assert!(Ok(compiler) = compile_program(&program(r"let I = \x.x eval I")));
        check!(compiler.bytecode() == [PUSH, 1, PUSH, 0, FUNC, STORE, 0, Command::Eval as u8]);

        let_assert!(Ok(compiler) = compile_program(&program(r"\y.y")));
        check!(compiler.bytecode() == [PUSH, 1, PUSH, 0, FUNC, Command::Print as u8]);
    }

    #[test]
    fn application_lowers_to_nothing() {
        let mut arena = ExprArena::new();
        let a = Operand::Expr(arena.variable("a"));
        let b = Operand::Expr(arena.variable("b"));
        let mut compiler = Compiler::default();
        check!(compiler.compile(&arena, &[Instruction::apply(a, b)]).is_ok());
        check!(compiler.bytecode().is_empty());
    }

    #[test]
    fn assigning_an_identifier_loads_it() {
        let mut arena = ExprArena::new();
        let x = Operand::Expr(arena.variable("x"));
        let n = Operand::Expr(arena.identifier("N"));
        let m = Operand::Expr(arena.identifier("M"));
        let mut symbols = SymbolTable::new();
        symbols.insert("N", x);

        let mut compiler = Compiler::new(symbols);
        check!(compiler.compile(&arena, &[Instruction::assign(n, m)]).is_ok());
        check!(compiler.bytecode() == [LOAD, 0, STORE, 1]);
        check!(compiler.symbols().get("M") == Some(x));
    }

    #[test]
    fn identifier_bodies_must_be_defined() {
        let mut arena = ExprArena::new();
        let x = Operand::Expr(arena.variable("x"));
        let n = Operand::Expr(arena.identifier("N"));
        let mut compiler = Compiler::default();
        let_assert!(Err(err) = compiler.compile(&arena, &[Instruction::func(x, n)]));
        check!(
            err == CompileError::Undefined {
                index: 0,
                name: Box::from("N")
            }
        );
    }

    #[test]
    fn malformed_instructions_are_rejected() {
        let mut arena = ExprArena::new();
        let x = Operand::Expr(arena.variable("x"));
        let n = Operand::Expr(arena.identifier("N"));
        let result = Operand::Result(InstrRef::new(0));
        let mut compiler = Compiler::default();

        let_assert!(Err(err) = compiler.compile(&arena, &[Instruction::func(n, x)]));
        check!(err.to_string() == "instruction 0: expected a variable, found `N`");
        let_assert!(
            Err(CompileError::Shape { .. }) =
                compiler.compile(&arena, &[Instruction::assign(x, result)])
        );

        let headless = Instruction {
            op: Op::Func,
            arg1: x,
            arg2: None,
        };
        check!(
            compiler.compile(&arena, &[headless])
                == Err(CompileError::MissingOperand {
                    index: 0,
                    op: Op::Func
                })
        );
    }

    #[test]
    fn operands_are_single_bytes() {
        let mut compiler = Compiler::default();
        for idx in 0..256 {
            check!(compiler.identifier_code(&format!("I{idx}")).is_ok());
        }
        check!(compiler.identifier_code("I300") == Err(CompileError::TooManyNames("identifier")));
        // SUBSTITUTE already holds one variable code
        for idx in 0..255 {
            check!(compiler.variable_code(&format!("v{idx}")).is_ok());
        }
        check!(compiler.variable_code("w").is_err());
    }

    #[test]
    fn function_bodies_from_earlier_instructions_emit_only_the_parameter() {
        let mut arena = ExprArena::new();
        let x = arena.variable("x");
        let y = Operand::Expr(arena.variable("y"));
        let app = arena.alloc(Expression::Application {
            applied: y,
            applicand: y,
        });
        let mut compiler = Compiler::default();
        let instructions = [Instruction::func(Operand::Expr(x), Operand::Expr(app))];
        check!(compiler.compile(&arena, &instructions).is_ok());
        check!(compiler.bytecode() == [PUSH, 1, FUNC]);
    }

    #[test]
    fn interning_is_stable_and_dense() {
        arbtest::arbtest(|u| {
            let names: Vec<u8> = u.arbitrary()?;
            let mut compiler = Compiler::default();
            let mut seen: Vec<u8> = Vec::new();
            for letter in names.iter().map(|byte| byte % 26) {
                let name = char::from(b'a' + letter).to_string();
                let_assert!(Ok(code) = compiler.variable_code(&name));
                match seen.iter().position(|&prior| prior == letter) {
                    Some(pos) => {
                        check!(usize::from(code) == pos + 1);
                    }
                    None => {
                        seen.push(letter);
                        check!(usize::from(code) == seen.len());
                    }
                }
            }
            check!(compiler.variable_code(SUBSTITUTE) == Ok(0));
            Ok(())
        });
    }
}
