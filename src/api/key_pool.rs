//! Credential rotation state

use std::collections::HashSet;

/// Ordered credentials with an exhausted set and a rotation pointer.
///
/// The pointer is moved off a credential as soon as it is marked exhausted,
/// unless no other credential is left.
#[derive(Debug, Clone, Default)]
pub struct KeyPool {
    keys: Vec<String>,
    exhausted: HashSet<usize>,
    current: usize,
}

impl KeyPool {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            exhausted: HashSet::new(),
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn available(&self) -> usize {
        self.keys.len() - self.exhausted.len()
    }

    /// True when no credential can serve another request
    pub fn is_exhausted(&self) -> bool {
        self.available() == 0
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Credential to use for the next request, with its slot index.
    ///
    /// Advances past an exhausted pointer first; `None` when every
    /// credential is exhausted.
    pub fn select(&mut self) -> Option<(usize, String)> {
        if self.is_exhausted() {
            return None;
        }
        if self.exhausted.contains(&self.current) {
            self.advance();
        }
        Some((self.current, self.keys[self.current].clone()))
    }

    /// Record a quota rejection for slot `index`.
    ///
    /// Only moves the pointer if it still points at `index`, so two callers
    /// reporting the same credential advance it once.
    pub fn mark_exhausted(&mut self, index: usize) {
        if index >= self.keys.len() {
            return;
        }
        self.exhausted.insert(index);
        if self.current == index {
            self.advance();
        }
    }

    /// Move the pointer round-robin to the next non-exhausted slot
    fn advance(&mut self) -> bool {
        let len = self.keys.len();
        for step in 1..=len {
            let candidate = (self.current + step) % len;
            if !self.exhausted.contains(&candidate) {
                self.current = candidate;
                return true;
            }
        }
        false
    }
}
