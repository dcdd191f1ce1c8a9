//! The automaton's state and value stacks, kept in lock step.

/// Parallel state/value stacks. Every push and pop touches both, so their heights never differ.
///
/// The bottom entry (the initial state and its start value) is never popped.
#[derive(Debug, Clone)]
pub struct ParseStack<V> {
    states: Vec<usize>,
    values: Vec<V>,
}

impl<V> ParseStack<V> {
    pub fn new(state: usize, value: V) -> Self {
        Self {
            states: vec![state],
            values: vec![value],
        }
    }

    pub fn push(&mut self, state: usize, value: V) {
        self.states.push(state);
        self.values.push(value);
    }

    /// Pops `count` entries. Reaching below the bottom entry means the tables and the stack
    /// disagree.
    pub fn pop(&mut self, count: usize) {
        debug_assert!(
            count < self.states.len(),
            "popping {count} of {} stack entries",
            self.states.len()
        );
        let keep = self.states.len().saturating_sub(count).max(1);
        self.states.truncate(keep);
        self.values.truncate(keep);
    }

    pub fn state(&self) -> usize {
        self.states.last().copied().unwrap_or_default()
    }

    pub fn height(&self) -> usize {
        self.states.len()
    }

    /// The topmost `len` values, as a reduction sees them.
    pub fn frame(&self, len: usize) -> Frame<'_, V> {
        let start = self.values.len().saturating_sub(len);
        Frame {
            values: &self.values[start..],
        }
    }
}

/// Read access to the right-hand side of the rule being reduced.
#[derive(Debug)]
pub struct Frame<'a, V> {
    values: &'a [V],
}

impl<'a, V> Frame<'a, V> {
    /// `depth` 0 is the topmost value, i.e. the last symbol of the rule.
    pub fn get(&self, depth: usize) -> Option<&'a V> {
        let idx = self.values.len().checked_sub(depth + 1)?;
        self.values.get(idx)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
