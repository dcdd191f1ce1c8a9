//! Parsing turns a token stream into a [`Program`]: the expressions it mentions, the
//! instructions their reductions emitted, and the global bindings its declarations made.
//!
//! The work is split in layers. [`tables`] holds the automaton, [`engine`] drives any set of
//! such tables, and [`actions`] gives the lambda grammar's productions their meaning.
use core::fmt;

use crate::{
    expression::{ExprArena, SymbolTable},
    instruction::{self, Instruction},
    lexer::{Span, Token, TokenKind, TokenSource},
};

pub mod actions;
pub mod engine;
pub mod stack;
pub mod tables;

use actions::ProgramBuilder;
use tables::LAMBDA_TABLES;

/// Aborts the parse outright. Unlike a [`SyntaxError`] these are never recovered from.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("identifier `{0}` is not defined")]
    Undefined(Box<str>),
    #[error("identifier `{0}` was not replaced by its value")]
    Unexpanded(Box<str>),
    #[error("{0}")]
    Missing(&'static str),
}

/// Where the automaton got stuck, and on what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: u32,
    pub column: u32,
    pub span: Span,
    pub found: TokenKind,
    pub lexeme: Option<Box<str>>,
}

impl SyntaxError {
    pub fn at(token: &Token) -> Self {
        Self {
            line: token.line,
            column: token.column,
            span: token.span.clone(),
            found: token.kind,
            lexeme: token.lexeme.clone(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "syntax error at {}:{}: unexpected {}",
            self.line, self.column, self.found
        )?;
        if let Some(lexeme) = &self.lexeme {
            write!(f, " `{lexeme}`")?;
        }
        Ok(())
    }
}

impl std::error::Error for SyntaxError {}

/// Everything a parse produces.
///
/// After a rejected or aborted parse the contents are whatever had been built up to that
/// point, and should be thrown away.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub expressions: ExprArena,
    pub instructions: Vec<Instruction>,
    pub symbols: SymbolTable,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// The instruction listing, one `index: op arg1[, arg2]` line each.
    pub fn dump(&self) -> String {
        instruction::dump(&self.expressions, &self.instructions)
    }
}

pub struct Parser<S> {
    source: S,
    builder: ProgramBuilder,
}

impl<S: TokenSource> Parser<S> {
    pub fn new(source: S) -> Self {
        Self::resume(source, Program::new())
    }

    /// Continues `program`, so its declarations are in scope for `source`.
    pub fn resume(source: S, program: Program) -> Self {
        Self {
            source,
            builder: ProgramBuilder::new(program),
        }
    }

    /// `Ok(true)` if the input was accepted, `Ok(false)` if it was rejected with syntax errors
    /// (see [`Self::errors`]).
    pub fn parse(&mut self) -> Result<bool, ParseError> {
        engine::drive(&LAMBDA_TABLES, &mut self.source, &mut self.builder)
    }

    pub fn program(&self) -> &Program {
        &self.builder.program
    }

    pub fn errors(&self) -> &[SyntaxError] {
        &self.builder.errors
    }

    pub fn finish(self) -> Program {
        self.builder.program
    }
}

#[cfg(test)]
mod tests {
    use super::{ParseError, Parser, Program};
    use crate::{
        expression::{Expression, Operand},
        lexer::{Scanner, Token, TokenKind},
    };
    use assert2::{check, let_assert};

    fn parse(source: &str) -> (Result<bool, ParseError>, Parser<Scanner<'_>>) {
        let mut parser = Parser::new(Scanner::new(source));
        (parser.parse(), parser)
    }

    #[test]
    fn declaration_binds_a_function() {
        let (result, parser) = parse(r"let N = \x.x");
        check!(result == Ok(true));
        let program = parser.finish();
        check!(program.dump() == "0: func x, x\n1: assign (\\x.x), N\n");

        let_assert!(Some(Operand::Expr(id)) = program.symbols.get("N"));
        let_assert!(Expression::Function { bound, body } = &program.expressions[id]);
        check!(program.expressions[*bound].name() == Some("x"));
        let_assert!(Some(Expression::Variable { name }) = program.expressions.resolve(*body));
        check!(name.as_ref() == "x");
    }

    #[test]
    fn identifiers_are_replaced_by_their_value() {
        let (result, parser) = parse(r"let N = \x.x let F = N N");
        check!(result == Ok(true));
        let program = parser.program();
        check!(
            program.dump()
                == "0: func x, x\n\
                    1: assign (\\x.x), N\n\
                    2: apply (\\x.x), (\\x.x)\n\
                    3: assign ((\\x.x) (\\x.x)), F\n"
        );
        check!(program.symbols.len() == 2);
    }

    #[test]
    fn evaluating_an_undeclared_identifier_aborts() {
        let (result, parser) = parse("eval N");
        check!(result == Err(ParseError::Undefined(Box::from("N"))));
        check!(parser.program().instructions.is_empty());
    }

    #[test]
    fn unterminated_group_is_rejected() {
        let (result, parser) = parse("(");
        check!(result == Ok(false));
        let_assert!([error] = parser.errors());
        check!(error.found == TokenKind::EndOfInput);
        check!((error.line, error.column) == (1, 2));
        check!(error.to_string() == "syntax error at 1:2: unexpected end of input");
    }

    #[test]
    fn trailing_garbage_is_rejected_after_earlier_statements() {
        let (result, parser) = parse("x )");
        check!(result == Ok(false));
        check!(parser.program().dump() == "0: print x\n");
        let_assert!([error] = parser.errors());
        check!(error.found == TokenKind::BracketClose);
    }

    #[test]
    fn scanner_errors_surface_as_syntax_errors() {
        let (result, parser) = parse("x ! y");
        check!(result == Ok(false));
        let_assert!([error] = parser.errors());
        check!(error.found == TokenKind::Error);
        check!(error.to_string() == "syntax error at 1:3: unexpected invalid token `!`");
    }

    #[test]
    fn application_is_left_associative() {
        let (result, parser) = parse("a b c");
        check!(result == Ok(true));
        check!(
            parser.program().dump()
                == "0: apply a, b\n1: apply (a b), c\n2: print ((a b) c)\n"
        );
    }

    #[test]
    fn long_application_chains_render() {
        let source = "a ".repeat(100_000);
        let (result, parser) = parse(&source);
        check!(result == Ok(true));
        let program = parser.program();
        check!(program.instructions.len() == 100_000);
        let_assert!(Some(last) = program.instructions.last());
        let text = program.expressions.display(last.arg1).to_string();
        check!(text.len() == 100_000 * 4 - 3);
    }

    #[test]
    fn function_bodies_extend_to_the_right() {
        let (result, parser) = parse(r"\x.x y z");
        check!(result == Ok(true));
        check!(
            parser.program().dump()
                == "0: apply x, y\n\
                    1: apply (x y), z\n\
                    2: func x, ((x y) z)\n\
                    3: print (\\x.((x y) z))\n"
        );
    }

    #[test]
    fn evaluation_results_can_be_bound() {
        let (result, parser) = parse(r"let X = eval \x.x");
        check!(result == Ok(true));
        check!(parser.program().dump() == "0: func x, x\n1: eval (\\x.x)\n2: assign #1, X\n");
    }

    #[test]
    fn redeclaration_replaces_the_binding() {
        let (result, parser) = parse(r"let N = \x.y let N = \y.y N");
        check!(result == Ok(true));
        let program = parser.program();
        check!(program.symbols.len() == 1);
        let_assert!(Some(value) = program.symbols.get("N"));
        check!(program.expressions.display(value).to_string() == r"(\y.(y (\x.y)))");
    }

    #[test]
    fn resumed_parsers_see_earlier_declarations() {
        let mut first = Parser::new(Scanner::new(r"let I = \x.x"));
        check!(first.parse() == Ok(true));

        let mut second = Parser::resume(Scanner::new("eval I"), first.finish());
        check!(second.parse() == Ok(true));
        check!(second.program().dump().ends_with("2: eval (\\x.x)\n"));
    }

    #[test]
    fn empty_program_is_accepted() {
        let (result, parser) = parse("// nothing here\n");
        check!(result == Ok(true));
        check!(parser.finish() == Program::new());
    }

    #[test]
    fn random_token_streams_terminate() {
        arbtest::arbtest(|u| {
            let kinds: Vec<TokenKind> = u.arbitrary()?;
            let tokens = kinds
                .into_iter()
                .filter(|kind| *kind != TokenKind::EndOfInput)
                .map(|kind| {
                    let lexeme = match kind {
                        TokenKind::Identifier => Some("A"),
                        TokenKind::Name | TokenKind::Error => Some("a"),
                        _ => None,
                    };
                    Token::new(kind, lexeme)
                })
                .collect::<Vec<_>>();
            let mut program = Program::new();
            let a = program.expressions.variable("a");
            program.symbols.insert("A", Operand::Expr(a));

            let mut parser = Parser::resume(tokens.into_iter(), program);
            // any outcome will do, as long as there is one
            let _ = parser.parse();
            check!(parser.errors().len() <= 1);
            Ok(())
        });
    }
}
