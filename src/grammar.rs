//! Production rule storage and compilation.

use crate::brackets::slot_ranges;
use crate::error::{CompileError, ExprError};
use crate::expr::{Constants, Expr, Scope, format_number};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::debug;

/// A single production `key -> body`, optionally guarded.
///
/// `key` is the symbol plus its formal parameter names, e.g. `D(x,y,z)`. The body
/// is a replacement template whose bracketed slots are arithmetic over those names.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rule {
    pub key: String,
    pub body: String,
    #[serde(default)]
    pub guard: String,

    /// One expression per slot of `body`, in the order of `slots`.
    #[serde(skip)]
    compiled: Vec<Expr>,
    #[serde(skip)]
    slots: Vec<Range<usize>>,
}

impl Rule {
    /// Compiles every argument slot of `body`.
    pub fn compile(
        key: impl Into<String>,
        body: impl Into<String>,
        guard: impl Into<String>,
    ) -> Result<Self, CompileError> {
        let key = key.into();
        let body = body.into();
        let slots = slot_ranges(&body)?;
        let compiled = slots
            .iter()
            .enumerate()
            .map(|(slot, range)| {
                Expr::compile(&body[range.clone()]).map_err(|source| CompileError::Expression {
                    key: key.clone(),
                    slot,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            key,
            body,
            guard: guard.into(),
            compiled,
            slots,
        })
    }

    /// Rebuilds the compiled form from the stored raw text.
    pub fn recompile(&self) -> Result<Self, CompileError> {
        Self::compile(self.key.clone(), self.body.clone(), self.guard.clone())
    }

    /// The leading character of the key.
    pub fn symbol(&self) -> Option<char> {
        self.key.chars().next()
    }

    /// Formal parameter names: the text between the key's brackets, split on `,`.
    pub fn formal_names(&self) -> Vec<&str> {
        formal_names(&self.key)
    }

    /// Compiled slot expressions. Empty until compiled, e.g. after deserializing.
    pub fn expressions(&self) -> &[Expr] {
        &self.compiled
    }

    /// Byte ranges of the slots in `body`, parallel to [`Rule::expressions`].
    pub fn slots(&self) -> &[Range<usize>] {
        &self.slots
    }

    pub fn is_guarded(&self) -> bool {
        !self.guard.is_empty()
    }

    /// Evaluates every slot with `bindings` and splices the numbers into the body.
    ///
    /// The output is assembled from literal spans of the body and evaluated
    /// slot values; the stored body is never modified.
    pub fn instantiate(
        &self,
        bindings: &[(&str, f64)],
        constants: &Constants,
        rng: &mut dyn RngCore,
    ) -> Result<String, ExprError> {
        let scope = Scope::new(bindings, constants);
        let mut out = String::with_capacity(self.body.len());
        let mut cursor = 0;
        for (expr, range) in self.compiled.iter().zip(&self.slots) {
            out.push_str(&self.body[cursor..range.start]);
            out.push_str(&format_number(expr.evaluate(&scope, rng)?));
            cursor = range.end;
        }
        out.push_str(&self.body[cursor..]);
        Ok(out)
    }
}

pub(crate) fn formal_names(key: &str) -> Vec<&str> {
    match (key.find('('), key.rfind(')')) {
        (Some(open), Some(close)) if close > open + 1 => key[open + 1..close].split(',').collect(),
        _ => Vec::new(),
    }
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// All production rules, grouped by key signature.
///
/// Rules under one key are kept in insertion order; that order decides which
/// guarded overload wins.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GrammarStore {
    rules: BTreeMap<String, Vec<Rule>>,
}

impl GrammarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strips whitespace from all three inputs, compiles every argument slot of
    /// `body`, and appends the rule to the list stored under `key`.
    ///
    /// # Errors
    ///
    /// [`CompileError::MissingKey`] for an empty key, a bracket error when `body`
    /// is unbalanced, and [`CompileError::Expression`] when a slot does not
    /// compile. The store is unchanged on error.
    pub fn add_rule(&mut self, key: &str, body: &str, guard: &str) -> Result<(), CompileError> {
        let key = strip_whitespace(key);
        if key.is_empty() {
            return Err(CompileError::MissingKey);
        }
        let rule = Rule::compile(key.clone(), strip_whitespace(body), strip_whitespace(guard))?;
        debug!(key = %key, slots = rule.slots.len(), "rule added");
        self.rules.entry(key).or_default().push(rule);
        Ok(())
    }

    /// Replaces the rule at `index` under `key` with a newly compiled one.
    ///
    /// # Errors
    ///
    /// [`CompileError::UnknownKey`], [`CompileError::IndexOutOfRange`], or any
    /// error [`GrammarStore::add_rule`] can return. The old rule stays in place
    /// on error.
    pub fn edit_rule(
        &mut self,
        key: &str,
        index: usize,
        body: &str,
        guard: &str,
    ) -> Result<(), CompileError> {
        let key = strip_whitespace(key);
        let Some(list) = self.rules.get_mut(&key) else {
            return Err(CompileError::UnknownKey(key));
        };
        if index >= list.len() {
            return Err(CompileError::IndexOutOfRange { key, index });
        }
        list[index] = Rule::compile(key, strip_whitespace(body), strip_whitespace(guard))?;
        Ok(())
    }

    /// Removes one rule. The last rule of a key takes the whole key with it,
    /// whatever `index` is.
    ///
    /// # Errors
    ///
    /// [`CompileError::UnknownKey`] or [`CompileError::IndexOutOfRange`].
    pub fn delete_rule(&mut self, key: &str, index: usize) -> Result<Rule, CompileError> {
        let key = strip_whitespace(key);
        let count = self.rules.get(&key).map_or(0, Vec::len);
        if count == 0 {
            return Err(CompileError::UnknownKey(key));
        }
        if count == 1 {
            return self
                .rules
                .remove(&key)
                .and_then(|mut list| list.pop())
                .ok_or(CompileError::UnknownKey(key));
        }
        if index >= count {
            return Err(CompileError::IndexOutOfRange { key, index });
        }
        match self.rules.get_mut(&key) {
            Some(list) => Ok(list.remove(index)),
            None => Err(CompileError::UnknownKey(key)),
        }
    }

    /// Re-derives every compiled body from its raw text.
    ///
    /// Either every rule compiles and the store is replaced, or the store is left untouched.
    ///
    /// # Errors
    ///
    /// The first [`CompileError`] met, in key order.
    pub fn recompile_all(&mut self) -> Result<(), CompileError> {
        let rules = self
            .rules
            .iter()
            .map(|(key, list)| -> Result<_, CompileError> {
                let list = list
                    .iter()
                    .map(Rule::recompile)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((key.clone(), list))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        self.rules = rules;
        Ok(())
    }

    /// Parses an authoring string `key = body` and adds the unguarded rule.
    ///
    /// # Errors
    ///
    /// [`CompileError::Definition`] unless the text splits on `=` into exactly
    /// two parts, then anything [`GrammarStore::add_rule`] returns.
    pub fn add_definition(&mut self, text: &str) -> Result<(), CompileError> {
        let parts: Vec<&str> = text.split('=').collect();
        let [key, body] = parts.as_slice() else {
            return Err(CompileError::Definition(text.to_string()));
        };
        self.add_rule(key, body, "")
    }

    /// The rules stored under `key`, in insertion order.
    pub fn rules(&self, key: &str) -> Option<&[Rule]> {
        self.rules.get(key).map(Vec::as_slice)
    }

    /// Every key whose signature starts with `symbol`.
    pub fn candidates(&self, symbol: char) -> impl Iterator<Item = (&str, &[Rule])> {
        self.rules
            .iter()
            .filter(move |(key, _)| key.starts_with(symbol))
            .map(|(key, list)| (key.as_str(), list.as_slice()))
    }

    /// Every key with its rules, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Rule])> {
        self.rules
            .iter()
            .map(|(key, list)| (key.as_str(), list.as_slice()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
