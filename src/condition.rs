//! Guard conditions: conjunctions of comparisons joined by `&`.
//!
//! Only `=`, `<`, `>`, `<=` and `>=` are understood. There is no disjunction, no
//! negation, and no grouping of comparisons.

use crate::error::{ConditionError, ExprError};
use crate::expr::{Expr, Scope};
use rand::RngCore;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Relation {
    /// Picks the operator of a conjunct by substring scan.
    ///
    /// `=` together with `<` or `>` wins over the bare forms.
    fn detect(conjunct: &str) -> Option<Self> {
        let has_lt = conjunct.contains('<');
        let has_gt = conjunct.contains('>');
        if conjunct.contains('=') {
            Some(if has_lt {
                Self::Le
            } else if has_gt {
                Self::Ge
            } else {
                Self::Eq
            })
        } else if has_lt {
            Some(Self::Lt)
        } else if has_gt {
            Some(Self::Gt)
        } else {
            None
        }
    }

    fn token(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
        }
    }

    fn compare(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Lt => lhs < rhs,
            Self::Gt => lhs > rhs,
            Self::Le => lhs <= rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

/// One `lhs op rhs` conjunct.
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    pub lhs: Expr,
    pub relation: Relation,
    pub rhs: Expr,
}

/// A parsed guard. Holds only when every comparison holds.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub comparisons: Vec<Comparison>,
}

impl Condition {
    /// Splits `guard` on `&` and parses each conjunct as `lhs op rhs`.
    ///
    /// # Errors
    ///
    /// [`ConditionError::Malformed`] when a conjunct has no operator or more than
    /// one, and [`ConditionError::Operand`] when either side is not an expression.
    pub fn parse(guard: &str) -> Result<Self, ConditionError> {
        let comparisons = guard
            .split('&')
            .map(|conjunct| -> Result<Comparison, ConditionError> {
                let relation = Relation::detect(conjunct)
                    .ok_or_else(|| ConditionError::Malformed(conjunct.to_string()))?;
                let operands: Vec<&str> = conjunct.split(relation.token()).collect();
                let [lhs, rhs] = operands.as_slice() else {
                    return Err(ConditionError::Malformed(conjunct.to_string()));
                };
                Ok(Comparison {
                    lhs: Expr::compile(lhs)?,
                    relation,
                    rhs: Expr::compile(rhs)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { comparisons })
    }

    /// Evaluates every comparison in order and stops at the first that fails.
    ///
    /// # Errors
    ///
    /// The first [`ExprError`] raised by an operand.
    pub fn holds(&self, scope: &Scope<'_>, rng: &mut dyn RngCore) -> Result<bool, ExprError> {
        for c in &self.comparisons {
            let lhs = c.lhs.evaluate(scope, rng)?;
            let rhs = c.rhs.evaluate(scope, rng)?;
            if !c.relation.compare(lhs, rhs) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Evaluates `guard` with the actual parameter values bound by name.
///
/// A guard that fails to parse or evaluate is reported and counts as false.
pub fn evaluate_condition(guard: &str, scope: &Scope<'_>, rng: &mut dyn RngCore) -> bool {
    let condition = match Condition::parse(guard) {
        Ok(c) => c,
        Err(err) => {
            warn!(guard = %guard, error = %err, "malformed guard condition");
            return false;
        }
    };
    match condition.holds(scope, rng) {
        Ok(result) => result,
        Err(err) => {
            warn!(guard = %guard, error = %err, "guard condition failed to evaluate");
            false
        }
    }
}
