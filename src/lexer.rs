//! The scanner turns source text into [`Token`]s, one at a time, as the parser asks for them.
//!
//! Lexing itself is done by [`logos`]; this module only layers positions (1-based line and
//! column) and the fixed [`TokenKind`] contract on top of it.
use core::fmt;

pub use logos::Span;
use logos::{Lexer, Logos};

#[derive(thiserror::Error, Debug, PartialEq, Clone, Default)]
pub enum LexerError {
    #[default]
    #[error("invalid token encountered")]
    Invalid,
}

/// Raw lexemes as recognised by [`logos`].
///
/// Reserved words are plain tokens, so they win over the `Name` regex on equal length
/// (`let` is a keyword, `letter` is a name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Logos)]
#[logos(error = LexerError)]
#[logos(skip r"[ \t\r\n\f]+|//[^\n]*")]
pub enum Lexeme {
    #[token("=")]
    Equals,
    #[token("\\")]
    Lambda,
    #[token(".")]
    Dot,
    #[token("(")]
    BracketOpen,
    #[token(")")]
    BracketClose,
    #[token("let")]
    Let,
    #[token("eval")]
    Eval,
    #[regex("[A-Z0-9][A-Za-z0-9]*")]
    Identifier,
    #[regex("[a-z][a-z0-9]*")]
    Name,
}

impl Lexeme {
    pub fn lexer(source: &str) -> Lexer<'_, Self> {
        <Self as Logos>::lexer(source)
    }

    fn kind(self) -> TokenKind {
        match self {
            Self::Equals => TokenKind::Equals,
            Self::Lambda => TokenKind::Lambda,
            Self::Dot => TokenKind::Dot,
            Self::BracketOpen => TokenKind::BracketOpen,
            Self::BracketClose => TokenKind::BracketClose,
            Self::Let => TokenKind::Let,
            Self::Eval => TokenKind::Eval,
            Self::Identifier => TokenKind::Identifier,
            Self::Name => TokenKind::Name,
        }
    }
}

/// The kinds of token exchanged between the scanner and the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, arbitrary::Arbitrary)]
#[repr(u8)]
pub enum TokenKind {
    Equals,
    Lambda,
    Dot,
    BracketOpen,
    BracketClose,
    /// uppercase (or digit) leading global name
    Identifier,
    /// lowercase lambda-bound name
    Name,
    Let,
    Eval,
    /// placeholder for the value under the parser's initial state; never scanned
    Start,
    EndOfInput,
    /// input the scanner could not make sense of
    Error,
}

impl TokenKind {
    pub const COUNT: usize = 12;

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equals => "`=`",
            Self::Lambda => r"`\`",
            Self::Dot => "`.`",
            Self::BracketOpen => "`(`",
            Self::BracketClose => "`)`",
            Self::Identifier => "identifier",
            Self::Name => "name",
            Self::Let => "`let`",
            Self::Eval => "`eval`",
            Self::Start => "start of input",
            Self::EndOfInput => "end of input",
            Self::Error => "invalid token",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based, 0 for tokens that were not scanned from a source
    pub line: u32,
    /// 1-based, counted in characters
    pub column: u32,
    /// Only identifiers, names and errors carry their text.
    pub lexeme: Option<Box<str>>,
    pub span: Span,
}

impl Token {
    /// A token without a source position.
    pub fn new(kind: TokenKind, lexeme: Option<&str>) -> Self {
        Self {
            kind,
            line: 0,
            column: 0,
            lexeme: lexeme.map(Box::from),
            span: 0..0,
        }
    }

    pub fn start() -> Self {
        Self::new(TokenKind::Start, None)
    }

    pub fn end_of_input() -> Self {
        Self::new(TokenKind::EndOfInput, None)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}] {}", self.line, self.column, self.kind)?;
        if let Some(lexeme) = &self.lexeme {
            write!(f, ": {lexeme}")?;
        }
        Ok(())
    }
}

/// Anything the parser can pull tokens from.
///
/// Once a source runs dry it must keep answering with [`TokenKind::EndOfInput`].
pub trait TokenSource {
    fn next_token(&mut self) -> Token;
}

impl<S: TokenSource + ?Sized> TokenSource for &mut S {
    fn next_token(&mut self) -> Token {
        (**self).next_token()
    }
}

/// Pre-lexed token streams, mostly useful for feeding the parser directly.
impl TokenSource for std::vec::IntoIter<Token> {
    fn next_token(&mut self) -> Token {
        self.next().unwrap_or_else(Token::end_of_input)
    }
}

pub struct Scanner<'src> {
    source: &'src str,
    lexer: Lexer<'src, Lexeme>,
    /// byte offset of the first character of every line
    line_starts: Vec<usize>,
    /// set once the iterator handed out end-of-input
    exhausted: bool,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self {
            source,
            lexer: Lexeme::lexer(source),
            line_starts,
            exhausted: false,
        }
    }

    fn position(&self, offset: usize) -> (u32, u32) {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line - 1];
        let column = self.source[line_start..offset].chars().count() + 1;
        (
            u32::try_from(line).unwrap_or(u32::MAX),
            u32::try_from(column).unwrap_or(u32::MAX),
        )
    }

    fn token(&self, kind: TokenKind, span: Span, lexeme: Option<&str>) -> Token {
        let (line, column) = self.position(span.start);
        Token {
            kind,
            line,
            column,
            lexeme: lexeme.map(Box::from),
            span,
        }
    }
}

impl TokenSource for Scanner<'_> {
    fn next_token(&mut self) -> Token {
        let Some(result) = self.lexer.next() else {
            let end = self.source.len();
            return self.token(TokenKind::EndOfInput, end..end, None);
        };

        let span = self.lexer.span();
        let slice = self.lexer.slice();
        match result {
            Ok(lexeme) => {
                let kind = lexeme.kind();
                let text = matches!(kind, TokenKind::Identifier | TokenKind::Name).then_some(slice);
                self.token(kind, span, text)
            }
            Err(err) => {
                tracing::trace!(?span, %err, "unrecognised input");
                self.token(TokenKind::Error, span, Some(slice))
            }
        }
    }
}

/// Yields every token up to and including the first end-of-input.
impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.exhausted {
            return None;
        }
        let token = self.next_token();
        self.exhausted = token.kind == TokenKind::EndOfInput;
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::{Lexeme, Scanner, Token, TokenKind, TokenSource};
    use assert2::{assert, check, let_assert};

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source).map(|token| token.kind).collect()
    }

    #[test]
    fn reserved_words_beat_names() {
        check!(
            kinds("let letter eval evaluate")
                == [
                    TokenKind::Let,
                    TokenKind::Name,
                    TokenKind::Eval,
                    TokenKind::Name,
                    TokenKind::EndOfInput
                ]
        );
    }

    #[test]
    fn punctuation() {
        check!(
            kinds(r"\x.(x) = ")
                == [
                    TokenKind::Lambda,
                    TokenKind::Name,
                    TokenKind::Dot,
                    TokenKind::BracketOpen,
                    TokenKind::Name,
                    TokenKind::BracketClose,
                    TokenKind::Equals,
                    TokenKind::EndOfInput
                ]
        );
    }

    #[test]
    fn identifiers_and_names_carry_their_text() {
        let tokens = Scanner::new("N F2 0x ab1").collect::<Vec<_>>();
        let lexemes = tokens
            .iter()
            .map(|token| (token.kind, token.lexeme.as_deref()))
            .collect::<Vec<_>>();
        check!(
            lexemes
                == [
                    (TokenKind::Identifier, Some("N")),
                    (TokenKind::Identifier, Some("F2")),
                    (TokenKind::Identifier, Some("0x")),
                    (TokenKind::Name, Some("ab1")),
                    (TokenKind::EndOfInput, None),
                ]
        );
    }

    #[test]
    fn keywords_have_no_lexeme() {
        let mut scanner = Scanner::new("let");
        let token = scanner.next_token();
        check!(token.kind == TokenKind::Let);
        check!(token.lexeme.is_none());
    }

    #[test]
    fn comments_and_blanks_are_skipped() {
        check!(
            kinds("// a comment\n\tx // trailing\r\n")
                == [TokenKind::Name, TokenKind::EndOfInput]
        );
    }

    #[test]
    fn positions_are_one_based() {
        let tokens = Scanner::new("let N = \\x.x\n  F").collect::<Vec<_>>();
        let_assert!([first, .., f, end] = tokens.as_slice());
        check!((first.line, first.column) == (1, 1));
        check!(f.lexeme.as_deref() == Some("F"));
        check!((f.line, f.column) == (2, 3));
        check!(f.span == (15..16));
        check!((end.line, end.column) == (2, 4));
    }

    #[test]
    fn columns_restart_on_every_line() {
        let tokens = Scanner::new("// λλ\n($)").collect::<Vec<_>>();
        let_assert!([_, _, close, _] = tokens.as_slice());
        check!(close.kind == TokenKind::BracketClose);
        check!((close.line, close.column) == (2, 3));
    }

    #[test]
    fn invalid_input_becomes_an_error_token() {
        let tokens = Scanner::new("x ! y").collect::<Vec<_>>();
        let_assert!([_, bang, _, _] = tokens.as_slice());
        check!(bang.kind == TokenKind::Error);
        check!(bang.lexeme.as_deref() == Some("!"));
        check!(Lexeme::lexer("!").next().is_some_and(|res| res.is_err()));
    }

    #[test]
    fn end_of_input_repeats() {
        let mut scanner = Scanner::new("x");
        check!(scanner.next_token().kind == TokenKind::Name);
        for _ in 0..3 {
            let token = scanner.next_token();
            assert!(token.kind == TokenKind::EndOfInput);
            check!(token.span == (1..1));
        }
    }

    #[test]
    fn iterator_stops_after_end_of_input() {
        let mut scanner = Scanner::new("");
        check!(scanner.next().map(|token| token.kind) == Some(TokenKind::EndOfInput));
        check!(scanner.next().is_none());
    }

    #[test]
    fn token_streams_run_dry_into_end_of_input() {
        let mut stream = vec![Token::new(TokenKind::Name, Some("x"))].into_iter();
        check!(stream.next_token().kind == TokenKind::Name);
        check!(stream.next_token() == Token::end_of_input());
    }

    #[test]
    fn display() {
        let token = Scanner::new("  Foo").next_token();
        check!(token.to_string() == "[1:3] identifier: Foo");
    }
}
