//! What each production of the lambda grammar does when it is reduced.
use super::{engine::Actions, stack::Frame, ParseError, Program, SyntaxError};
use crate::{
    expression::{Expression, InstrRef, Operand},
    instruction::Instruction,
    lexer::Token,
};

/// Production numbers, as laid out in [`super::tables`].
mod rule {
    pub const DECLARATION: usize = 6;
    pub const EVALUATED_DECLARATION: usize = 7;
    pub const EVALUATION: usize = 8;
    pub const PRINT: usize = 9;
    pub const IDENTIFIER: usize = 10;
    pub const NAME: usize = 11;
    pub const GROUP: usize = 14;
    pub const FUNCTION: usize = 15;
    pub const APPLICATION: usize = 16;
}

/// Values carried on the automaton's value stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StackValue {
    /// keywords, punctuation and statements
    #[default]
    Empty,
    /// text of a shifted identifier or name
    Lexeme(Box<str>),
    Operand(Operand),
}

fn lexeme<'v>(value: Option<&'v StackValue>, missing: &'static str) -> Result<&'v str, ParseError> {
    match value {
        Some(StackValue::Lexeme(text)) => Ok(&**text),
        _ => Err(ParseError::Missing(missing)),
    }
}

/// Builds up a [`Program`] as the automaton reduces.
#[derive(Debug, Default)]
pub(crate) struct ProgramBuilder {
    pub program: Program,
    pub errors: Vec<SyntaxError>,
}

impl ProgramBuilder {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            errors: Vec::new(),
        }
    }

    /// An operand that may be stored or embedded: present, and not a bare identifier.
    fn resolved(
        &self,
        value: Option<&StackValue>,
        missing: &'static str,
    ) -> Result<Operand, ParseError> {
        let Some(StackValue::Operand(operand)) = value else {
            return Err(ParseError::Missing(missing));
        };
        match self.program.expressions.resolve(*operand) {
            Some(Expression::Identifier { name }) => Err(ParseError::Unexpanded(name.clone())),
            _ => Ok(*operand),
        }
    }

    fn emit(&mut self, instruction: Instruction) -> InstrRef {
        let instructions = &mut self.program.instructions;
        instructions.push(instruction);
        InstrRef::new(instructions.len() - 1)
    }
}

impl Actions for ProgramBuilder {
    type Value = StackValue;
    type Error = ParseError;

    fn token_value(&mut self, token: &Token) -> StackValue {
        match &token.lexeme {
            Some(text) => StackValue::Lexeme(text.clone()),
            None => StackValue::Empty,
        }
    }

    fn reduce(
        &mut self,
        rule: usize,
        frame: Frame<'_, StackValue>,
    ) -> Result<StackValue, ParseError> {
        let value = match rule {
            rule::DECLARATION | rule::EVALUATED_DECLARATION => {
                let name = lexeme(frame.get(2), "null identifier in declaration")?;
                let value = self.resolved(frame.get(0), "null expression in declaration")?;
                self.program.symbols.insert(name, value);
                let target = self.program.expressions.identifier(name);
                self.emit(Instruction::assign(value, Operand::Expr(target)));
                StackValue::Empty
            }
            rule::EVALUATION => {
                let value = self.resolved(frame.get(0), "null expression in evaluation")?;
                let result = self.emit(Instruction::eval(value));
                StackValue::Operand(Operand::Result(result))
            }
            rule::PRINT => {
                let value = self.resolved(frame.get(0), "null expression in print")?;
                self.emit(Instruction::print(value));
                StackValue::Empty
            }
            rule::IDENTIFIER => {
                let name = lexeme(frame.get(0), "null identifier")?;
                match self.program.symbols.get(name) {
                    Some(value) => StackValue::Operand(value),
                    None => return Err(ParseError::Undefined(Box::from(name))),
                }
            }
            rule::NAME => {
                let name = lexeme(frame.get(0), "null variable name")?;
                StackValue::Operand(Operand::Expr(self.program.expressions.variable(name)))
            }
            rule::GROUP => frame.get(1).cloned().unwrap_or_default(),
            rule::FUNCTION => {
                let name = lexeme(frame.get(2), "null variable name")?;
                let body = self.resolved(frame.get(0), "null expression in function body")?;
                let expressions = &mut self.program.expressions;
                let bound = expressions.variable(name);
                let function = expressions.alloc(Expression::Function { bound, body });
                self.emit(Instruction::func(Operand::Expr(bound), body));
                StackValue::Operand(Operand::Expr(function))
            }
            rule::APPLICATION => {
                let applied = self.resolved(frame.get(1), "null expression in application")?;
                let applicand = self.resolved(frame.get(0), "null expression in application")?;
                let application = self
                    .program
                    .expressions
                    .alloc(Expression::Application { applied, applicand });
                self.emit(Instruction::apply(applied, applicand));
                StackValue::Operand(Operand::Expr(application))
            }
            // $$ = $1
            _ => frame
                .len()
                .checked_sub(1)
                .and_then(|depth| frame.get(depth))
                .cloned()
                .unwrap_or_default(),
        };
        Ok(value)
    }

    fn syntax_error(&mut self, found: Option<&Token>) {
        let error = match found {
            Some(token) => SyntaxError::at(token),
            None => SyntaxError::at(&Token::start()),
        };
        self.errors.push(error);
    }
}
