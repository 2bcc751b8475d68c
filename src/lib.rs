//! # symbios-flora
//!
//! Procedural plant geometry from a parametric, conditional L-System.
//!
//! Generation happens in two steps. An [`LSystem`] rewrites its axiom with guarded,
//! parametric production rules whose arguments are arithmetic over named constants.
//! A [`TurtleInterpreter`] then walks the rewritten symbol string, maintaining a
//! transform/branch stack, and grows a [`MeshTree`] of mesh parts that flattens
//! into engine-agnostic [`MeshBuffers`] (vertices, uvs, and named triangle groups).
//!
//! ```ignore
//! let mut system = symbios_flora::presets::tree_preset()?;
//! let sequence = system.generate_configured()?;
//! let interpreter = symbios_flora::presets::tree_interpreter(Default::default());
//! let buffers = interpreter.interpret(&sequence)?;
//! ```

pub mod brackets;
pub mod condition;
pub mod error;
pub mod expr;
pub mod grammar;
pub mod interpreter;
pub mod mesh;
pub mod parts;
pub mod presets;
pub mod rewrite;
pub mod turtle;

pub use error::*;
pub use expr::{Constants, Expr, Scope};
pub use grammar::{GrammarStore, Rule};
pub use interpreter::*;
pub use mesh::*;
pub use rewrite::*;
pub use turtle::*;
