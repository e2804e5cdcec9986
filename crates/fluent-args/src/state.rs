//! The mutable context threaded through one walk of the chain.

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;

use crate::error::ArgError;

/// Converted values keyed by argument slot, in the order they were bound.
#[derive(Default)]
pub struct BoundValues {
    values: IndexMap<usize, Box<dyn Any + Send>>,
}

impl BoundValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to `slot`. A slot keeps its first value; returns `false`
    /// when the slot was already bound.
    pub fn insert<T: Send + 'static>(&mut self, slot: usize, value: T) -> bool {
        if self.values.contains_key(&slot) {
            return false;
        }
        self.values.insert(slot, Box::new(value));
        true
    }

    /// Move the value out of `slot`, if it is bound with type `T`.
    pub fn take<T: 'static>(&mut self, slot: usize) -> Option<T> {
        let boxed = self.values.shift_remove(&slot)?;
        match boxed.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(boxed) => {
                // Wrong type requested; keep the value where it was.
                self.values.insert(slot, boxed);
                None
            }
        }
    }

    pub fn get<T: 'static>(&self, slot: usize) -> Option<&T> {
        self.values.get(&slot)?.downcast_ref::<T>()
    }

    pub fn contains(&self, slot: usize) -> bool {
        self.values.contains_key(&slot)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for BoundValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundValues")
            .field("slots", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Result of looking for a value-taking alias in the remaining tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasedValue {
    Absent,
    /// The alias was found (and consumed) but no value followed it.
    MissingValue,
    Present(String),
}

#[derive(Debug, Default)]
pub struct ParseState {
    remaining: Vec<String>,
    bound: BoundValues,
    errors: Vec<ArgError>,
    help_requested: bool,
}

impl ParseState {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            remaining: tokens.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn remaining(&self) -> &[String] {
        &self.remaining
    }

    pub fn bound(&self) -> &BoundValues {
        &self.bound
    }

    pub fn errors(&self) -> &[ArgError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn help_requested(&self) -> bool {
        self.help_requested
    }

    pub fn request_help(&mut self) {
        self.help_requested = true;
    }

    pub fn push_error(&mut self, error: ArgError) {
        self.errors.push(error);
    }

    pub fn bind<T: Send + 'static>(&mut self, slot: usize, value: T) {
        if !self.bound.insert(slot, value) {
            tracing::trace!(slot, "slot already bound; keeping the first value");
        }
    }

    /// Remove the first token equal to one of `aliases`.
    pub fn take_flag(&mut self, aliases: &[String]) -> bool {
        match self.remaining.iter().position(|t| aliases.contains(t)) {
            Some(idx) => {
                self.remaining.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Remove the first `alias value` pair (or `alias=value` token) and
    /// return the value.
    pub fn take_aliased_value(&mut self, aliases: &[String]) -> AliasedValue {
        let Some(idx) = self
            .remaining
            .iter()
            .position(|t| aliases.contains(t) || inline_value(t, aliases).is_some())
        else {
            return AliasedValue::Absent;
        };

        let token = self.remaining.remove(idx);
        if let Some(value) = inline_value(&token, aliases) {
            return AliasedValue::Present(value.to_string());
        }
        if idx < self.remaining.len() {
            AliasedValue::Present(self.remaining.remove(idx))
        } else {
            AliasedValue::MissingValue
        }
    }

    /// Remove an `alias expected` pair (or `alias=expected` token) if present.
    /// Pairs with another value are left untouched.
    pub fn take_alias_with_value(&mut self, aliases: &[String], expected: &str) -> bool {
        let mut idx = 0;
        while idx < self.remaining.len() {
            let token = &self.remaining[idx];
            if inline_value(token, aliases) == Some(expected) {
                self.remaining.remove(idx);
                return true;
            }
            if aliases.contains(token)
                && self.remaining.get(idx + 1).is_some_and(|v| v == expected)
            {
                self.remaining.drain(idx..idx + 2);
                return true;
            }
            idx += 1;
        }
        false
    }

    /// Remove the first remaining token.
    pub fn take_next(&mut self) -> Option<String> {
        if self.remaining.is_empty() {
            None
        } else {
            Some(self.remaining.remove(0))
        }
    }

    /// Remove every remaining token, order preserved.
    pub fn drain_remaining(&mut self) -> Vec<String> {
        std::mem::take(&mut self.remaining)
    }

    pub(crate) fn take_bound(&mut self) -> BoundValues {
        std::mem::take(&mut self.bound)
    }

    pub(crate) fn take_errors(&mut self) -> Vec<ArgError> {
        std::mem::take(&mut self.errors)
    }
}

fn inline_value<'t>(token: &'t str, aliases: &[String]) -> Option<&'t str> {
    aliases
        .iter()
        .find_map(|a| token.strip_prefix(a.as_str())?.strip_prefix('='))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn aliased_value_consumes_alias_and_value() {
        let mut state = ParseState::new(["a", "--name", "beni", "b"]);
        assert_eq!(
            state.take_aliased_value(&aliases(&["-n", "--name"])),
            AliasedValue::Present("beni".to_string())
        );
        assert_eq!(state.remaining(), ["a", "b"]);
        assert_eq!(
            state.take_aliased_value(&aliases(&["--name"])),
            AliasedValue::Absent
        );
    }

    #[test]
    fn aliased_value_supports_inline_form() {
        let mut state = ParseState::new(["--age=28", "x"]);
        assert_eq!(
            state.take_aliased_value(&aliases(&["--age"])),
            AliasedValue::Present("28".to_string())
        );
        assert_eq!(state.remaining(), ["x"]);
    }

    #[test]
    fn trailing_alias_is_consumed_without_value() {
        let mut state = ParseState::new(["x", "--age"]);
        assert_eq!(
            state.take_aliased_value(&aliases(&["--age"])),
            AliasedValue::MissingValue
        );
        assert_eq!(state.remaining(), ["x"]);
    }

    #[test]
    fn flags_remove_only_the_first_occurrence() {
        let mut state = ParseState::new(["-v", "file", "-v"]);
        assert!(state.take_flag(&aliases(&["-v", "--verbose"])));
        assert_eq!(state.remaining(), ["file", "-v"]);
        assert!(!state.take_flag(&aliases(&["--quiet"])));
    }

    #[test]
    fn alias_with_value_only_matches_expected_value() {
        let mut state = ParseState::new(["--mode", "slow", "--mode", "fast"]);
        assert!(state.take_alias_with_value(&aliases(&["--mode"]), "fast"));
        assert_eq!(state.remaining(), ["--mode", "slow"]);
        assert!(!state.take_alias_with_value(&aliases(&["--mode"]), "fast"));

        let mut state = ParseState::new(["--mode=fast"]);
        assert!(state.take_alias_with_value(&aliases(&["--mode"]), "fast"));
        assert!(state.remaining().is_empty());
    }

    #[test]
    fn positional_helpers_keep_order() {
        let mut state = ParseState::new(["a", "b", "c"]);
        assert_eq!(state.take_next().as_deref(), Some("a"));
        assert_eq!(state.drain_remaining(), ["b", "c"]);
        assert_eq!(state.take_next(), None);
    }

    #[test]
    fn slots_are_bound_once() {
        let mut state = ParseState::new(Vec::<String>::new());
        state.bind(0, 28i32);
        state.bind(0, 99i32);
        assert_eq!(state.bound().get::<i32>(0), Some(&28));

        let mut bound = state.take_bound();
        assert_eq!(bound.take::<String>(0), None);
        assert!(bound.contains(0));
        assert_eq!(bound.take::<i32>(0), Some(28));
        assert!(bound.is_empty());
    }
}
