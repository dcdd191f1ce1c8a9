//! Automaton tables in the compressed layout bison emits (`pact`, `defact`, `pgoto`, `defgoto`,
//! `table`, `check`, `r1`, `r2`) plus the translation from [`TokenKind`] to internal symbols.
//!
//! The built-in tables encode this grammar (rule numbers on the right):
//!
//! ```text
//! $accept     : program $end                              1
//! program     : program declaration                       2
//!             | program evaluation                        3
//!             | program print                             4
//!             | %empty                                    5
//! declaration : LET IDENTIFIER EQUALS expression          6
//!             | LET IDENTIFIER EQUALS evaluation          7
//! evaluation  : EVAL expression                           8
//! print       : expression                                9
//! expression  : IDENTIFIER                               10
//!             | NAME                                     11
//!             | function                                 12
//!             | application                              13
//!             | LBRACKET expression RBRACKET             14
//! function    : LAMBDA NAME DOT expression               15
//! application : expression expression                    16
//! ```
//!
//! Terminals are `$end` 0, `error` 1, `$undefined` 2, `NAME` 3, `IDENTIFIER` 4, `LAMBDA` 5,
//! `DOT` 6, `EQUALS` 7, `LBRACKET` 8, `RBRACKET` 9, `LET` 10 and `EVAL` 11; nonterminals follow
//! from 12 in the order above. Shift/reduce conflicts are resolved by shifting, except after
//! `expression expression` where reducing makes application left associative.
use std::sync::LazyLock;

use crate::lexer::TokenKind;

/// Internal symbol number of end-of-input.
pub const EOF_SYMBOL: usize = 0;
/// Internal symbol number of the distinguished error token.
pub const ERROR_SYMBOL: usize = 1;

#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
pub enum TableError {
    #[error("`{name}` has {found} entries, expected {expected}")]
    Length {
        name: &'static str,
        found: usize,
        expected: usize,
    },
    #[error("`{name}[{index}]` holds {value}, which is out of range")]
    OutOfRange {
        name: &'static str,
        index: usize,
        value: i32,
    },
}

/// Tables as generated, before validation.
#[derive(Debug, Clone, Copy)]
pub struct RawTables {
    pub pact: &'static [i16],
    pub defact: &'static [u8],
    pub pgoto: &'static [i16],
    pub defgoto: &'static [i16],
    pub table: &'static [i16],
    pub check: &'static [i16],
    pub r1: &'static [u8],
    pub r2: &'static [u8],
    /// internal symbol for every [`TokenKind`], indexed by [`TokenKind::index`]
    pub translate: [u8; TokenKind::COUNT],
    pub final_state: usize,
    pub ntokens: usize,
    pub pact_ninf: i16,
    pub table_ninf: i16,
}

pub const LAMBDA_GRAMMAR: RawTables = RawTables {
    pact: &[
        -42, 0, -42, -42, -42, -2, 28, 2, 35, -42, -42, -42, 42, -42, -42, -4, 9, 8, 48, -42, 54,
        -42, 16, 60, -42, 66,
    ],
    defact: &[
        5, 0, 0, 11, 10, 0, 0, 0, 0, 2, 3, 4, 9, 12, 13, 0, 0, 0, 8, 16, 0, 14, 0, 15, 7, 6,
    ],
    pgoto: &[-42, -42, -42, -15, -42, 22, -42, -42],
    defgoto: &[-1, 1, 9, 10, 11, 19, 13, 14],
    table: &[
        2, 15, 20, 3, 4, 5, 17, 24, 6, 0, 7, 8, 3, 4, 5, 22, 0, 6, 21, 3, 4, 5, 0, 12, 6, 0, 0, 8,
        16, 0, 18, 3, 4, 5, 0, 0, 6, 0, 3, 4, 5, 0, 23, 6, 25, 3, 4, 5, 0, 0, 6, 3, 4, 5, 0, 0, 6,
        3, 4, 5, 0, 0, 6, 3, 4, 5, 0, 0, 6, 3, 4, 5, 0, 0, 6,
    ],
    check: &[
        0, 3, 6, 3, 4, 5, 4, 22, 8, -1, 10, 11, 3, 4, 5, 7, -1, 8, 9, 3, 4, 5, -1, 1, 8, -1, -1, 11,
        6, -1, 8, 3, 4, 5, -1, -1, 8, -1, 3, 4, 5, -1, 20, 8, 22, 3, 4, 5, -1, -1, 8, 3, 4, 5, -1,
        -1, 8, 3, 4, 5, -1, -1, 8, 3, 4, 5, -1, -1, 8, 3, 4, 5, -1, -1, 8,
    ],
    r1: &[
        0, 12, 13, 13, 13, 13, 14, 14, 15, 16, 17, 17, 17, 17, 17, 18, 19,
    ],
    r2: &[0, 2, 2, 2, 2, 0, 4, 4, 2, 1, 1, 1, 1, 1, 3, 4, 2],
    // Equals, Lambda, Dot, BracketOpen, BracketClose, Identifier, Name, Let, Eval, Start,
    // EndOfInput, Error
    translate: [7, 5, 6, 8, 9, 4, 3, 10, 11, 2, 0, 2],
    final_state: 2,
    ntokens: 12,
    pact_ninf: -42,
    table_ninf: -1,
};

/// The built-in tables, validated on first use.
pub static LAMBDA_TABLES: LazyLock<ParseTables> = LazyLock::new(|| {
    ParseTables::new(LAMBDA_GRAMMAR)
        .unwrap_or_else(|err| panic!("built-in parse tables are malformed: {err}"))
});

/// What `table` says to do for a state and lookahead symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Shift(usize),
    Reduce(usize),
    /// nothing specific to this lookahead, fall back to `defact`
    Default,
    Fail,
}

/// Validated, read-only automaton tables.
#[derive(Debug, Clone)]
pub struct ParseTables {
    raw: RawTables,
}

fn expect_len(name: &'static str, found: usize, expected: usize) -> Result<(), TableError> {
    if found == expected {
        Ok(())
    } else {
        Err(TableError::Length {
            name,
            found,
            expected,
        })
    }
}

fn expect_all<T: Copy + Into<i32>>(
    name: &'static str,
    values: &[T],
    valid: impl Fn(usize, i32) -> bool,
) -> Result<(), TableError> {
    match values
        .iter()
        .map(|&value| value.into())
        .enumerate()
        .find(|&(index, value)| !valid(index, value))
    {
        Some((index, value)) => Err(TableError::OutOfRange { name, index, value }),
        None => Ok(()),
    }
}

impl ParseTables {
    pub fn new(raw: RawTables) -> Result<Self, TableError> {
        let states = raw.pact.len();
        let rules = raw.r1.len();
        let nonterminals = raw.pgoto.len();
        let symbols = raw.ntokens + nonterminals;

        expect_len("defact", raw.defact.len(), states)?;
        expect_len("defgoto", raw.defgoto.len(), nonterminals)?;
        expect_len("check", raw.check.len(), raw.table.len())?;
        expect_len("r2", raw.r2.len(), rules)?;

        let state = |value: i32| usize::try_from(value).is_ok_and(|value| value < states);
        // rule 0 is unused and rule 1 (`$accept`) is never reduced, acceptance happens on
        // entering the final state
        let reducible =
            |rule: i32| usize::try_from(rule).is_ok_and(|rule| (2..rules).contains(&rule));

        expect_all("defact", raw.defact, |_, rule| rule == 0 || reducible(rule))?;
        expect_all("defgoto", raw.defgoto, |index, target| {
            state(target) || (index == 0 && target == -1)
        })?;
        expect_all("table", raw.table, |_, entry| {
            entry == 0 || entry == i32::from(raw.table_ninf) || state(entry) || reducible(-entry)
        })?;
        expect_all("r1", raw.r1, |rule, lhs| {
            rule == 0 || usize::try_from(lhs).is_ok_and(|lhs| (raw.ntokens..symbols).contains(&lhs))
        })?;
        expect_all("translate", raw.translate.as_slice(), |_, symbol| {
            usize::try_from(symbol).is_ok_and(|symbol| symbol < raw.ntokens)
        })?;
        if raw.final_state >= states {
            return Err(TableError::OutOfRange {
                name: "final_state",
                index: 0,
                value: i32::try_from(raw.final_state).unwrap_or(i32::MAX),
            });
        }

        Ok(Self { raw })
    }

    pub fn final_state(&self) -> usize {
        self.raw.final_state
    }

    pub fn translate(&self, kind: TokenKind) -> usize {
        usize::from(self.raw.translate[kind.index()])
    }

    /// `false` when the state decides on its default action alone.
    pub fn needs_lookahead(&self, state: usize) -> bool {
        self.raw.pact[state] != self.raw.pact_ninf
    }

    /// `table[index]`, provided `check[index]` agrees it belongs to `owner`.
    fn entry(&self, base: i16, offset: usize, owner: usize) -> Option<i16> {
        let index = usize::try_from(isize::from(base) + isize::try_from(offset).ok()?).ok()?;
        let check = usize::try_from(*self.raw.check.get(index)?).ok()?;
        (check == owner).then(|| self.raw.table[index])
    }

    pub fn action(&self, state: usize, symbol: usize) -> Action {
        let base = self.raw.pact[state];
        if base == self.raw.pact_ninf {
            return Action::Default;
        }
        match self.entry(base, symbol, symbol) {
            None => Action::Default,
            Some(entry) if entry == 0 || entry == self.raw.table_ninf => Action::Fail,
            Some(entry) if entry < 0 => Action::Reduce(usize::from(entry.unsigned_abs())),
            Some(entry) => Action::Shift(usize::from(entry.unsigned_abs())),
        }
    }

    /// The rule to reduce by when no lookahead-specific action applies.
    pub fn default_reduction(&self, state: usize) -> Option<usize> {
        match self.raw.defact[state] {
            0 => None,
            rule => Some(usize::from(rule)),
        }
    }

    pub fn rule_len(&self, rule: usize) -> usize {
        usize::from(self.raw.r2[rule])
    }

    pub fn rule_lhs(&self, rule: usize) -> usize {
        usize::from(self.raw.r1[rule])
    }

    /// The state to enter after reducing to `lhs` on top of `state`.
    pub fn goto(&self, state: usize, lhs: usize) -> usize {
        let nonterminal = lhs - self.raw.ntokens;
        let target = self
            .entry(self.raw.pgoto[nonterminal], state, state)
            .unwrap_or(self.raw.defgoto[nonterminal]);
        usize::from(target.unsigned_abs())
    }

    /// The state reached by shifting the error token in `state`, if there is one.
    pub fn recovery_state(&self, state: usize) -> Option<usize> {
        let base = self.raw.pact[state];
        if base == self.raw.pact_ninf {
            return None;
        }
        self.entry(base, ERROR_SYMBOL, ERROR_SYMBOL)
            .filter(|&target| target > 0)
            .map(|target| usize::from(target.unsigned_abs()))
    }
}
