//! Error types for rule compilation, rewriting, and turtle interpretation.

use thiserror::Error;

/// Failure to parse or evaluate an arithmetic expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// The text was empty or only whitespace.
    #[error("empty expression")]
    Empty,

    /// The text stopped in the middle of an expression, e.g. `1+`.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// Input at byte `pos` could not be parsed, or was left over after a
    /// complete expression.
    #[error("unexpected token at {pos}")]
    UnexpectedToken { pos: usize },

    /// The parser hit its bracket nesting or argument count limit at byte `pos`.
    #[error("expression too large to parse at {pos}")]
    TooLarge { pos: usize },

    /// The parsed tree is deeper than `limit` levels.
    #[error("expression nests deeper than {limit} levels")]
    TooDeep { limit: usize },

    /// The text used a comparison or logical operator where a number is expected.
    #[error("comparison and logical operators are not allowed in arithmetic")]
    NotArithmetic,

    /// A name is neither a bound parameter, a constant, nor `PI`/`E`.
    #[error("unknown name: {0}")]
    UnknownName(String),

    /// A call names a function that does not exist.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// A known function was called with the wrong number of arguments.
    #[error("function {function} takes {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },

    /// Evaluation produced an infinity or NaN. Holds the expression text.
    #[error("expression '{0}' did not produce a finite number")]
    NonFinite(String),
}

/// A guard condition could not be parsed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    /// A conjunct contains no comparison operator, or more than one.
    #[error("malformed guard conjunct '{0}'")]
    Malformed(String),

    /// One side of a comparison is not a valid expression.
    #[error("guard operand failed to compile: {0}")]
    Operand(#[from] ExprError),
}

/// A rule, definition, or constant was rejected at authoring time.
///
/// The grammar is left in its last-good state whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// A `)` at byte `position` has no matching `(`.
    #[error("closing bracket without opening bracket at {position}")]
    UnbalancedClose { position: usize },

    /// A `(` is still open at the end of the text.
    #[error("opening bracket is never closed")]
    UnbalancedOpen,

    /// Argument slot number `slot` of the body of `key` is not a valid expression.
    #[error("rule '{key}': slot {slot} failed to compile: {source}")]
    Expression {
        key: String,
        slot: usize,
        #[source]
        source: ExprError,
    },

    /// The rule key was empty after whitespace stripping.
    #[error("rule key is empty")]
    MissingKey,

    /// No rule list is stored under this key.
    #[error("no rules stored under key '{0}'")]
    UnknownKey(String),

    /// The key exists but has no rule at `index`.
    #[error("rule index {index} out of range for key '{key}'")]
    IndexOutOfRange { key: String, index: usize },

    /// An authoring string was not of the form `key = body`.
    #[error("malformed rule definition: '{0}'")]
    Definition(String),

    /// An authoring string was not of the form `name = number`.
    #[error("malformed constant definition: '{0}'")]
    Constant(String),
}

/// A generation run was aborted. Partial rewriting is discarded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// A stored rule no longer compiles.
    #[error("grammar failed to compile: {0}")]
    Grammar(#[from] CompileError),

    /// The sequence has an unbalanced parameter list near byte `position`.
    #[error("unbalanced brackets at position {position}")]
    Brackets { position: usize },

    /// The argument starting at byte `position` of the sequence failed to evaluate.
    #[error("argument at position {position} failed to evaluate: {source}")]
    Argument {
        position: usize,
        #[source]
        source: ExprError,
    },

    /// A symbol without parameters has more than one rule to choose from.
    #[error("symbol '{symbol}' at position {position} matches several rules without parameters")]
    AmbiguousSymbol { symbol: char, position: usize },

    /// A key is present with no rules under it.
    #[error("key '{key}' has an empty rule list")]
    EmptyRuleList { key: String },

    /// A key with several rules has one without a guard.
    #[error("overloaded rule '{key}' has no guard")]
    UnguardedOverload { key: String },

    /// None of the guards of an overloaded key held for the actual arguments.
    #[error("no guard of any rule '{key}' matched")]
    NoGuardMatched { key: String },

    /// The symbol carries a different number of arguments than the rule key names.
    #[error("rule '{key}' expects {expected} parameter(s), got {found}")]
    ArityMismatch {
        key: String,
        expected: usize,
        found: usize,
    },

    /// A slot of the selected rule's body failed to evaluate.
    #[error("rule '{key}' body failed to evaluate: {source}")]
    Body {
        key: String,
        #[source]
        source: ExprError,
    },
}

/// Interpretation of a rewritten sequence failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpretError {
    /// A parameter list opened at byte `position` is unbalanced.
    #[error("unbalanced brackets at position {position}")]
    Brackets { position: usize },

    /// A rotation symbol at byte `position` has no parameter list.
    #[error("symbol '{symbol}' at position {position} requires a parameter list")]
    MissingParameters { symbol: char, position: usize },

    /// A parameter starting at byte `position` is not a plain number.
    #[error("symbol '{symbol}' at position {position} has a non-numeric parameter '{text}'")]
    InvalidParameter {
        symbol: char,
        position: usize,
        text: String,
    },

    /// The symbol carries fewer parameters than its operation needs.
    #[error("symbol '{symbol}' needs {expected} parameter(s), got {found}")]
    TooFewParameters {
        symbol: char,
        expected: usize,
        found: usize,
    },

    /// No drawing symbol created a node.
    #[error("no geometry produced")]
    EmptyResult,
}
