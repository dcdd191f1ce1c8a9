//! The table-driven LALR(1) driver.
//!
//! Nothing in here knows the grammar: shifts, reductions and gotos all come out of
//! [`ParseTables`], and what a reduction means is up to the [`Actions`] it is given.
use tracing::{debug, trace};

use super::{
    stack::{Frame, ParseStack},
    tables::{Action, ParseTables, EOF_SYMBOL},
};
use crate::lexer::{Token, TokenSource};

/// Error status right after a syntax error. Each successful shift lowers it by one and no new
/// syntax error is reported until it is back at 0.
const RECOVERING: u8 = 3;

/// Semantic side of the automaton.
pub trait Actions {
    type Value: Default;
    type Error;

    /// The value pushed alongside a shifted token.
    fn token_value(&mut self, token: &Token) -> Self::Value;

    /// Runs the action for `rule` over its right-hand side and returns the value of the
    /// left-hand side. An error aborts the parse.
    fn reduce(
        &mut self,
        rule: usize,
        frame: Frame<'_, Self::Value>,
    ) -> Result<Self::Value, Self::Error>;

    /// Called on a syntax error unless the automaton is still recovering from the last one.
    /// `found` is `None` when the automaton failed without looking ahead.
    fn syntax_error(&mut self, found: Option<&Token>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    NewState,
    Default,
    Reduce(usize),
    Fail,
    ErrorRecover,
    Accept,
    Abort,
}

struct Lookahead {
    symbol: usize,
    token: Token,
}

impl Lookahead {
    fn read<S: TokenSource + ?Sized>(source: &mut S, tables: &ParseTables) -> Self {
        let token = source.next_token();
        trace!(%token, "lookahead");
        Self {
            symbol: tables.translate(token.kind),
            token,
        }
    }
}

/// Runs the automaton until it accepts (`Ok(true)`), rejects (`Ok(false)`) or an action fails.
///
/// A token is read only when the current state needs a lookahead, and it stays pending until
/// it is shifted or discarded.
pub fn drive<S, A>(tables: &ParseTables, source: &mut S, actions: &mut A) -> Result<bool, A::Error>
where
    S: TokenSource + ?Sized,
    A: Actions,
{
    let start = actions.token_value(&Token::start());
    let mut stack = ParseStack::new(0, start);
    let mut lookahead: Option<Lookahead> = None;
    let mut error_status: u8 = 0;
    let mut label = Label::NewState;

    loop {
        label = match label {
            Label::NewState => {
                let state = stack.state();
                if state == tables.final_state() {
                    Label::Accept
                } else if !tables.needs_lookahead(state) {
                    Label::Default
                } else {
                    let next = match lookahead.take() {
                        Some(next) => next,
                        None => Lookahead::read(source, tables),
                    };
                    match tables.action(state, next.symbol) {
                        Action::Shift(target) => {
                            trace!(token = %next.token, state, target, "shift");
                            error_status = error_status.saturating_sub(1);
                            stack.push(target, actions.token_value(&next.token));
                            Label::NewState
                        }
                        action => {
                            lookahead = Some(next);
                            match action {
                                Action::Reduce(rule) => Label::Reduce(rule),
                                Action::Fail => Label::Fail,
                                Action::Default | Action::Shift(_) => Label::Default,
                            }
                        }
                    }
                }
            }
            Label::Default => match tables.default_reduction(stack.state()) {
                Some(rule) => Label::Reduce(rule),
                None => Label::Fail,
            },
            Label::Reduce(rule) => {
                let len = tables.rule_len(rule);
                let value = actions
                    .reduce(rule, stack.frame(len))
                    .inspect_err(|_| debug!(rule, "semantic action aborted the parse"))?;
                stack.pop(len);
                let target = tables.goto(stack.state(), tables.rule_lhs(rule));
                trace!(rule, len, target, "reduce");
                stack.push(target, value);
                Label::NewState
            }
            Label::Fail => {
                let found = lookahead.as_ref().map(|next| &next.token);
                if error_status == 0 {
                    debug!(found = ?found.map(|token| token.kind), "syntax error");
                    actions.syntax_error(found);
                }
                if error_status == RECOVERING {
                    match lookahead.as_ref().map(|next| next.symbol == EOF_SYMBOL) {
                        Some(true) => Label::Abort,
                        Some(false) => {
                            trace!("discarding lookahead");
                            lookahead = None;
                            Label::ErrorRecover
                        }
                        None => Label::ErrorRecover,
                    }
                } else {
                    Label::ErrorRecover
                }
            }
            Label::ErrorRecover => {
                error_status = RECOVERING;
                let recovered = loop {
                    if let Some(target) = tables.recovery_state(stack.state()) {
                        break Some(target);
                    }
                    if stack.height() == 1 {
                        break None;
                    }
                    stack.pop(1);
                };
                match recovered {
                    Some(target) => {
                        debug!(target, "recovered from syntax error");
                        stack.push(target, A::Value::default());
                        Label::NewState
                    }
                    None => Label::Abort,
                }
            }
            Label::Accept => {
                debug!("input accepted");
                return Ok(true);
            }
            Label::Abort => {
                debug!("input rejected");
                return Ok(false);
            }
        };
    }
}
