//! The rewriting engine.
//!
//! One pass walks the input sequence with a cursor and appends to a fresh output
//! buffer. Text produced by a rule is never rescanned within the same pass; it is
//! only seen again by the next iteration.

use crate::brackets::{find_matching_close, split_top_level_args};
use crate::condition::evaluate_condition;
use crate::error::{CompileError, GenerationError};
use crate::expr::{Constants, Expr, Scope, format_number};
use crate::grammar::{GrammarStore, Rule, formal_names};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, info};

/// A parametric L-System: grammar, constants, and the run configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LSystem {
    /// Starting sequence for [`LSystem::generate_configured`].
    pub axiom: String,
    /// Number of rewriting passes for [`LSystem::generate_configured`].
    pub iterations: usize,
    pub grammar: GrammarStore,
    /// Named values visible to every slot, argument, and guard.
    pub constants: Constants,
    /// Seed for `rnd(a,b)`. `None` draws a fresh seed from entropy on every run.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl LSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the seed used by `rnd(a,b)`, making every run reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Rewrites the stored axiom for the stored number of iterations.
    pub fn generate_configured(&mut self) -> Result<String, GenerationError> {
        let axiom = self.axiom.clone();
        self.generate(&axiom, self.iterations)
    }

    /// Rewrites `axiom` `iterations` times.
    ///
    /// The grammar is recompiled once up front so that it reflects the current
    /// constants; nothing edited during the loop can take effect.
    pub fn generate(&mut self, axiom: &str, iterations: usize) -> Result<String, GenerationError> {
        self.grammar.recompile_all()?;

        let mut rng: StdRng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut sequence = axiom.to_string();
        for iteration in 0..iterations {
            sequence = self.rewrite_pass(&sequence, &mut rng)?;
            debug!(iteration, len = sequence.len(), "rewrite pass complete");
        }

        info!(
            iterations,
            rules = self.grammar.len(),
            len = sequence.len(),
            "sequence generated"
        );
        Ok(sequence)
    }

    /// Applies one rewriting pass to `sequence`.
    pub fn rewrite_pass(
        &self,
        sequence: &str,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        let mut rewriter = Rewriter::new(&self.grammar, &self.constants, sequence);
        while rewriter.step(rng)?.is_some() {}
        Ok(rewriter.finish())
    }
}

/// The spans covered by one rewriting action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    /// Range of the input that was consumed.
    pub consumed: Range<usize>,
    /// Range of the output that was appended.
    pub emitted: Range<usize>,
}

/// Cursor over one input sequence writing into an append-only output buffer.
pub struct Rewriter<'a> {
    grammar: &'a GrammarStore,
    constants: &'a Constants,
    input: &'a str,
    cursor: usize,
    output: String,
}

impl<'a> Rewriter<'a> {
    /// Starts a pass over `input`. The grammar must already be compiled.
    pub fn new(grammar: &'a GrammarStore, constants: &'a Constants, input: &'a str) -> Self {
        Self {
            grammar,
            constants,
            input,
            cursor: 0,
            output: String::with_capacity(input.len()),
        }
    }

    /// Byte offset of the next symbol to rewrite.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Consumes the rewriter and returns the output written so far.
    pub fn finish(self) -> String {
        self.output
    }

    /// Rewrites the symbol under the cursor and advances past it.
    ///
    /// Returns `None` once the whole input has been consumed.
    pub fn step(&mut self, rng: &mut dyn RngCore) -> Result<Option<Step>, GenerationError> {
        let start = self.cursor;
        let Some(symbol) = self.input[start..].chars().next() else {
            return Ok(None);
        };
        let emitted_from = self.output.len();
        let after_symbol = start + symbol.len_utf8();
        let candidates: Vec<(&str, &[Rule])> = self.grammar.candidates(symbol).collect();

        if self.input[after_symbol..].starts_with('(') {
            let close = after_symbol
                + find_matching_close(&self.input[after_symbol..])
                    .map_err(|e| brackets_error(e, after_symbol))?;
            let actuals = self.evaluate_arguments(after_symbol + 1..close, rng)?;

            match candidates.as_slice() {
                [(key, rules)] => {
                    let text = self.apply(key, rules, &actuals, rng)?;
                    self.output.push_str(&text);
                }
                // Several keys share this leading character, or none do: the
                // arguments are only flattened to numbers and kept in place.
                _ => {
                    self.output.push(symbol);
                    self.output.push('(');
                    let values: Vec<String> = actuals.iter().map(|v| format_number(*v)).collect();
                    self.output.push_str(&values.join(","));
                    self.output.push(')');
                }
            }
            self.cursor = close + 1;
        } else {
            match candidates.as_slice() {
                [] => self.output.push(symbol),
                [(_, [rule])] => self.output.push_str(&rule.body),
                [(key, [])] => {
                    return Err(GenerationError::EmptyRuleList {
                        key: key.to_string(),
                    });
                }
                _ => {
                    return Err(GenerationError::AmbiguousSymbol {
                        symbol,
                        position: start,
                    });
                }
            }
            self.cursor = after_symbol;
        }

        Ok(Some(Step {
            consumed: start..self.cursor,
            emitted: emitted_from..self.output.len(),
        }))
    }

    /// Evaluates each top-level argument in `range` of the input to a number.
    fn evaluate_arguments(
        &self,
        range: Range<usize>,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<f64>, GenerationError> {
        let text = &self.input[range.clone()];
        let scope = Scope::constants(self.constants);
        split_top_level_args(text)
            .map_err(|e| brackets_error(e, range.start))?
            .into_iter()
            .map(|arg| {
                let position = range.start + arg.start;
                Expr::compile(&text[arg])
                    .and_then(|expr| expr.evaluate(&scope, rng))
                    .map_err(|source| GenerationError::Argument { position, source })
            })
            .collect()
    }

    /// Selects the rule for `key` and instantiates its body with `actuals`.
    fn apply(
        &self,
        key: &str,
        rules: &[Rule],
        actuals: &[f64],
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        let Some(first) = rules.first() else {
            return Err(GenerationError::EmptyRuleList {
                key: key.to_string(),
            });
        };
        let names = formal_names(&first.key);
        if names.len() != actuals.len() {
            return Err(GenerationError::ArityMismatch {
                key: key.to_string(),
                expected: names.len(),
                found: actuals.len(),
            });
        }
        let bindings: Vec<(&str, f64)> = names.iter().copied().zip(actuals.iter().copied()).collect();

        let rule = if rules.len() == 1 {
            first
        } else {
            let scope = Scope::new(&bindings, self.constants);
            let mut selected = None;
            for rule in rules {
                if !rule.is_guarded() {
                    return Err(GenerationError::UnguardedOverload {
                        key: key.to_string(),
                    });
                }
                if evaluate_condition(&rule.guard, &scope, rng) {
                    selected = Some(rule);
                    break;
                }
            }
            selected.ok_or_else(|| GenerationError::NoGuardMatched {
                key: key.to_string(),
            })?
        };

        rule.instantiate(&bindings, self.constants, rng)
            .map_err(|source| GenerationError::Body {
                key: key.to_string(),
                source,
            })
    }
}

fn brackets_error(err: CompileError, offset: usize) -> GenerationError {
    match err {
        CompileError::UnbalancedClose { position } => GenerationError::Brackets {
            position: position + offset,
        },
        _ => GenerationError::Brackets { position: offset },
    }
}
