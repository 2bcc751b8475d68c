//! The arithmetic Expression Environment.
//!
//! Text is parsed by [`symbios::parser::parse_expr`], the same expression grammar
//! the `symbios` derivation engine uses for module parameters. The resulting tree
//! is checked once at compile time (arithmetic only, known functions, bounded
//! depth) and then evaluated against a [`Scope`]: the per-call parameter bindings
//! layered over the global [`Constants`]. Nothing is mutated during evaluation
//! apart from the random source used by `rnd`.

use crate::error::{CompileError, ExprError};
use nom::error::ErrorKind;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::{E, PI};
use symbios::parser::ast::Expr as Ast;
use symbios::parser::parse_expr;

/// Deepest tree [`Expr::compile`] accepts. Evaluation recurses once per level.
pub const MAX_DEPTH: usize = 256;

/// Named numeric constants shared by every rule evaluation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Constants {
    values: BTreeMap<String, f64>,
}

impl Constants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or overwrites a constant.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Removes a constant, returning its last value.
    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.values.remove(name)
    }

    /// The value of `name`, if it is defined.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parses an authoring string of the form `name = value` and stores it.
    ///
    /// # Errors
    ///
    /// [`CompileError::Constant`] unless there are exactly two non-empty sides
    /// and the right one is a number.
    pub fn parse_definition(&mut self, text: &str) -> Result<(), CompileError> {
        let parts: Vec<&str> = text.split('=').collect();
        let [name, value] = parts.as_slice() else {
            return Err(CompileError::Constant(text.to_string()));
        };
        let name = name.trim();
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| CompileError::Constant(text.to_string()))?;
        if name.is_empty() {
            return Err(CompileError::Constant(text.to_string()));
        }
        self.set(name, value);
        Ok(())
    }
}

/// Name resolution for one evaluation: bindings first, then constants, then built-ins.
#[derive(Clone, Copy, Debug)]
pub struct Scope<'a> {
    pub bindings: &'a [(&'a str, f64)],
    pub constants: &'a Constants,
}

impl<'a> Scope<'a> {
    pub fn new(bindings: &'a [(&'a str, f64)], constants: &'a Constants) -> Self {
        Self {
            bindings,
            constants,
        }
    }

    /// A scope with no parameter bindings.
    pub fn constants(constants: &'a Constants) -> Self {
        Self::new(&[], constants)
    }

    /// Resolves `name` against the bindings, then the constants, then `PI` and `E`.
    pub fn lookup(&self, name: &str) -> Option<f64> {
        self.bindings
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
            .or_else(|| self.constants.get(name))
            .or(match name {
                "PI" => Some(PI),
                "E" => Some(E),
                _ => None,
            })
    }
}

/// Built-in functions. Names are case-sensitive.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Func {
    Rnd,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Round,
    Exp,
    Ln,
    Min,
    Max,
    Pow,
    Mod,
    Atan2,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "rnd" => Self::Rnd,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "sqrt" => Self::Sqrt,
            "abs" => Self::Abs,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            "exp" => Self::Exp,
            "ln" => Self::Ln,
            "min" => Self::Min,
            "max" => Self::Max,
            "pow" => Self::Pow,
            "mod" => Self::Mod,
            "atan2" => Self::Atan2,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Self::Rnd | Self::Min | Self::Max | Self::Pow | Self::Mod | Self::Atan2 => 2,
            _ => 1,
        }
    }

    /// `args` always holds exactly [`Func::arity`] values.
    fn apply(self, args: &[f64], rng: &mut dyn RngCore) -> f64 {
        let (a, b) = match *args {
            [a] => (a, 0.0),
            [a, b, ..] => (a, b),
            [] => return f64::NAN,
        };
        match self {
            Self::Rnd => {
                if b > a {
                    rng.gen_range(a..b)
                } else {
                    a
                }
            }
            Self::Sin => a.sin(),
            Self::Cos => a.cos(),
            Self::Tan => a.tan(),
            Self::Asin => a.asin(),
            Self::Acos => a.acos(),
            Self::Atan => a.atan(),
            Self::Sqrt => a.sqrt(),
            Self::Abs => a.abs(),
            Self::Floor => a.floor(),
            Self::Ceil => a.ceil(),
            Self::Round => a.round(),
            Self::Exp => a.exp(),
            Self::Ln => a.ln(),
            Self::Min => a.min(b),
            Self::Max => a.max(b),
            Self::Pow => a.powf(b),
            Self::Mod => a % b,
            Self::Atan2 => a.atan2(b),
        }
    }
}

/// A compiled arithmetic expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    source: String,
    root: Ast,
}

impl Expr {
    /// Parses `text` and checks that it is a plain arithmetic expression.
    ///
    /// # Errors
    ///
    /// Syntax errors, leftover input, comparison or logical operators, unknown
    /// functions, wrong function arity, and trees deeper than [`MAX_DEPTH`].
    /// Unknown names are only detected at evaluation, since constants may be
    /// added later.
    pub fn compile(text: &str) -> Result<Self, ExprError> {
        if text.trim().is_empty() {
            return Err(ExprError::Empty);
        }
        let position = |rest: &str| text.len() - rest.len();
        let root = match parse_expr(text) {
            Ok(("", root)) => root,
            Ok((rest, _)) => {
                return Err(ExprError::UnexpectedToken {
                    pos: position(rest),
                });
            }
            Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
                return Err(match e.code {
                    ErrorKind::TooLarge => ExprError::TooLarge {
                        pos: position(e.input),
                    },
                    _ if e.input.trim().is_empty() => ExprError::UnexpectedEnd,
                    _ => ExprError::UnexpectedToken {
                        pos: position(e.input),
                    },
                });
            }
            Err(nom::Err::Incomplete(_)) => return Err(ExprError::UnexpectedEnd),
        };
        check(&root)?;
        Ok(Self {
            source: text.to_string(),
            root,
        })
    }

    /// The text the expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression against `scope`, drawing `rnd` values from `rng`.
    ///
    /// # Errors
    ///
    /// [`ExprError::UnknownName`] for a name bound nowhere in `scope`, and
    /// [`ExprError::NonFinite`] when the result is infinite or NaN.
    pub fn evaluate(&self, scope: &Scope<'_>, rng: &mut dyn RngCore) -> Result<f64, ExprError> {
        let value = eval(&self.root, scope, rng)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ExprError::NonFinite(self.source.clone()))
        }
    }

    /// Every free identifier the expression refers to.
    pub fn parameter_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            match node {
                Ast::Variable(name) => {
                    names.insert(name.clone());
                }
                other => stack.extend(children(other)),
            }
        }
        names
    }
}

/// Compiles and evaluates `text` in one step.
pub fn evaluate_str(text: &str, scope: &Scope<'_>, rng: &mut dyn RngCore) -> Result<f64, ExprError> {
    Expr::compile(text)?.evaluate(scope, rng)
}

/// Serializes a value so it can be spliced back into a symbol sequence.
///
/// `f64`'s `Display` never uses exponent notation, so the text re-parses as a plain number.
pub fn format_number(value: f64) -> String {
    value.to_string()
}

/// Walks the tree without recursing and rejects anything [`eval`] cannot handle.
fn check(root: &Ast) -> Result<(), ExprError> {
    let mut stack = vec![(root, 1usize)];
    while let Some((node, depth)) = stack.pop() {
        if depth > MAX_DEPTH {
            return Err(ExprError::TooDeep { limit: MAX_DEPTH });
        }
        match node {
            Ast::Number(_) | Ast::Variable(_) => {}
            Ast::Neg(_)
            | Ast::Add(..)
            | Ast::Sub(..)
            | Ast::Mul(..)
            | Ast::Div(..)
            | Ast::Pow(..) => {}
            Ast::Call(name, args) => {
                let func = Func::from_name(name)
                    .ok_or_else(|| ExprError::UnknownFunction(name.clone()))?;
                if args.len() != func.arity() {
                    return Err(ExprError::Arity {
                        function: name.clone(),
                        expected: func.arity(),
                        found: args.len(),
                    });
                }
            }
            _ => return Err(ExprError::NotArithmetic),
        }
        stack.extend(children(node).into_iter().map(|child| (child, depth + 1)));
    }
    Ok(())
}

fn children(node: &Ast) -> Vec<&Ast> {
    match node {
        Ast::Neg(inner) | Ast::Not(inner) => vec![inner.as_ref()],
        Ast::Pow(l, r)
        | Ast::Add(l, r)
        | Ast::Sub(l, r)
        | Ast::Mul(l, r)
        | Ast::Div(l, r)
        | Ast::Gt(l, r)
        | Ast::Lt(l, r)
        | Ast::Ge(l, r)
        | Ast::Le(l, r)
        | Ast::Eq(l, r)
        | Ast::Ne(l, r)
        | Ast::And(l, r)
        | Ast::Or(l, r) => vec![l.as_ref(), r.as_ref()],
        Ast::Call(_, args) => args.iter().collect(),
        _ => Vec::new(),
    }
}

/// Recursion is bounded by [`MAX_DEPTH`], enforced in [`check`].
fn eval(node: &Ast, scope: &Scope<'_>, rng: &mut dyn RngCore) -> Result<f64, ExprError> {
    Ok(match node {
        Ast::Number(v) => *v,
        Ast::Variable(name) => scope
            .lookup(name)
            .ok_or_else(|| ExprError::UnknownName(name.clone()))?,
        Ast::Neg(inner) => -eval(inner, scope, rng)?,
        Ast::Add(l, r) => {
            let (l, r) = operands(l, r, scope, rng)?;
            l + r
        }
        Ast::Sub(l, r) => {
            let (l, r) = operands(l, r, scope, rng)?;
            l - r
        }
        Ast::Mul(l, r) => {
            let (l, r) = operands(l, r, scope, rng)?;
            l * r
        }
        Ast::Div(l, r) => {
            let (l, r) = operands(l, r, scope, rng)?;
            l / r
        }
        Ast::Pow(l, r) => {
            let (l, r) = operands(l, r, scope, rng)?;
            l.powf(r)
        }
        Ast::Call(name, args) => {
            let func =
                Func::from_name(name).ok_or_else(|| ExprError::UnknownFunction(name.clone()))?;
            let values = args
                .iter()
                .map(|a| eval(a, scope, rng))
                .collect::<Result<Vec<_>, _>>()?;
            func.apply(&values, rng)
        }
        _ => return Err(ExprError::NotArithmetic),
    })
}

/// Evaluates both sides, left first, so `rnd` draws happen in reading order.
fn operands(
    l: &Ast,
    r: &Ast,
    scope: &Scope<'_>,
    rng: &mut dyn RngCore,
) -> Result<(f64, f64), ExprError> {
    Ok((eval(l, scope, rng)?, eval(r, scope, rng)?))
}
