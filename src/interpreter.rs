//! Interpreter that converts a rewritten symbol sequence into mesh buffers.
//!
//! The entry point is [`TurtleInterpreter`]. Configure it with a [`TurtleConfig`],
//! register symbol-to-operation mappings via [`TurtleInterpreter::set_op`],
//! [`TurtleInterpreter::register_part`] or
//! [`TurtleInterpreter::populate_standard_symbols`], then call
//! [`TurtleInterpreter::interpret`] with the output of
//! [`LSystem::generate`](crate::LSystem::generate).

use crate::brackets::{find_matching_close, split_top_level_args};
use crate::error::InterpretError;
use crate::mesh::{MaterialId, MeshBuffers, MeshTree, PartBuilder};
use crate::turtle::{Turtle, TurtleOp};
use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use symbios::SymbolTable;
use tracing::{info, warn};

/// Configuration for turtle interpretation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurtleConfig {
    /// Seed for parts with random placement (leaves). `None` uses entropy, so
    /// every run produces different foliage.
    pub seed: Option<u64>,
    /// Local axis that advancing parts (trunks) grow along. Default: Y (up).
    pub growth_axis: Vec3,
}

impl Default for TurtleConfig {
    fn default() -> Self {
        Self {
            seed: None,
            growth_axis: Vec3::Y,
        }
    }
}

/// Interprets a symbol sequence to build a mesh-part tree.
pub struct TurtleInterpreter {
    interner: SymbolTable,
    op_map: Vec<TurtleOp>,
    parts: Vec<Box<dyn PartBuilder>>,
    materials: Vec<MaterialId>,
    config: TurtleConfig,
}

impl TurtleInterpreter {
    /// Creates a new interpreter with the given configuration and an empty symbol map.
    pub fn new(config: TurtleConfig) -> Self {
        Self {
            interner: SymbolTable::new(),
            op_map: Vec::new(),
            parts: Vec::new(),
            materials: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &TurtleConfig {
        &self.config
    }

    /// Assigns a single [`TurtleOp`] to a symbol.
    ///
    /// The map is grown automatically; gaps are filled with [`TurtleOp::Ignore`].
    pub fn set_op(&mut self, symbol: char, op: TurtleOp) {
        let mut buf = [0u8; 4];
        let name: &str = symbol.encode_utf8(&mut buf);
        let id = match self.interner.intern(name) {
            Ok(id) => id,
            Err(err) => {
                warn!(symbol = %symbol, error = %err, "symbol could not be interned");
                return;
            }
        };
        let idx = id as usize;
        if idx >= self.op_map.len() {
            self.op_map.resize(idx + 1, TurtleOp::Ignore);
        }
        self.op_map[idx] = op;
    }

    /// Registers a drawing symbol backed by `builder`.
    pub fn register_part(&mut self, symbol: char, builder: impl PartBuilder + 'static) {
        self.parts.push(Box::new(builder));
        self.set_op(symbol, TurtleOp::Draw(self.parts.len() - 1));
    }

    /// Registers the rotation and branching symbols `X`, `Y`, `Z`, `[` and `]`.
    pub fn populate_standard_symbols(&mut self) {
        let mappings = [
            ('X', TurtleOp::RotateX),
            ('Y', TurtleOp::RotateY),
            ('Z', TurtleOp::RotateZ),
            ('[', TurtleOp::Push),
            (']', TurtleOp::Pop),
        ];
        for (symbol, op) in mappings {
            self.set_op(symbol, op);
        }
    }

    /// Appends an external material handle. Handles persist across runs.
    pub fn add_material(&mut self, material: MaterialId) {
        self.materials.push(material);
    }

    pub fn materials(&self) -> &[MaterialId] {
        &self.materials
    }

    /// Looks up the operation registered for `symbol`.
    pub fn op_for(&self, symbol: char) -> TurtleOp {
        let mut buf = [0u8; 4];
        self.interner
            .resolve_id(symbol.encode_utf8(&mut buf))
            .and_then(|id| self.op_map.get(id as usize).copied())
            .unwrap_or(TurtleOp::Ignore)
    }

    /// Walks `sequence` once and returns the mesh-part tree it describes.
    ///
    /// The turtle starts at the origin with an identity transform and no current
    /// node. Popping an empty stack is logged and otherwise ignored.
    pub fn build_tree(&self, sequence: &str) -> Result<MeshTree, InterpretError> {
        let mut turtle = Turtle::new(self.config.growth_axis);
        let mut i = 0;

        while let Some(symbol) = sequence[i..].chars().next() {
            let after_symbol = i + symbol.len_utf8();
            let op = self.op_for(symbol);

            i = match op {
                TurtleOp::RotateX | TurtleOp::RotateY | TurtleOp::RotateZ => {
                    let (params, next) = parse_parameters(sequence, symbol, after_symbol)?;
                    let Some(params) = params else {
                        return Err(InterpretError::MissingParameters {
                            symbol,
                            position: i,
                        });
                    };
                    let Some(&angle) = params.first() else {
                        return Err(InterpretError::TooFewParameters {
                            symbol,
                            expected: 1,
                            found: 0,
                        });
                    };
                    match op {
                        TurtleOp::RotateX => turtle.state.rotate_local_x(angle),
                        TurtleOp::RotateY => turtle.state.rotate_local_y(angle),
                        _ => turtle.state.rotate_local_z(angle),
                    }
                    next
                }
                TurtleOp::Draw(index) => {
                    let (params, next) = parse_parameters(sequence, symbol, after_symbol)?;
                    if let Some(builder) = self.parts.get(index) {
                        let params = params.unwrap_or_default();
                        if params.len() < builder.arity() {
                            return Err(InterpretError::TooFewParameters {
                                symbol,
                                expected: builder.arity(),
                                found: params.len(),
                            });
                        }
                        turtle.spawn(builder.as_ref(), params);
                    }
                    next
                }
                TurtleOp::Push => {
                    turtle.push();
                    after_symbol
                }
                TurtleOp::Pop => {
                    turtle.pop();
                    after_symbol
                }
                // Unregistered symbols may still carry a parameter list; skip it whole.
                TurtleOp::Ignore => skip_parameters(sequence, after_symbol)?,
            };
        }

        Ok(turtle.into_tree())
    }

    /// Interprets `sequence` and flattens the resulting tree into buffers.
    ///
    /// Returns [`InterpretError::EmptyResult`] when no drawing symbol created a node.
    pub fn interpret(&self, sequence: &str) -> Result<MeshBuffers, InterpretError> {
        let tree = self.build_tree(sequence)?;
        if tree.root().is_none() {
            warn!(len = sequence.len(), "no mesh was built");
            return Err(InterpretError::EmptyResult);
        }

        let mut rng: StdRng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut buffers = tree.emit(&mut rng);
        buffers.materials = self.materials.clone();

        info!(
            nodes = tree.len(),
            vertices = buffers.vertices.len(),
            triangles = buffers.triangle_count(),
            groups = buffers.groups.len(),
            "mesh interpreted"
        );
        Ok(buffers)
    }
}

fn skip_parameters(sequence: &str, at: usize) -> Result<usize, InterpretError> {
    if !sequence[at..].starts_with('(') {
        return Ok(at);
    }
    find_matching_close(&sequence[at..])
        .map(|close| at + close + 1)
        .map_err(|_| InterpretError::Brackets { position: at })
}

/// Reads the bracketed parameter list starting at `at`, if there is one.
///
/// Returns the parsed values and the index just past the list (or `at` when the
/// symbol carries no list).
fn parse_parameters(
    sequence: &str,
    symbol: char,
    at: usize,
) -> Result<(Option<Vec<f32>>, usize), InterpretError> {
    if !sequence[at..].starts_with('(') {
        return Ok((None, at));
    }
    let close = at
        + find_matching_close(&sequence[at..])
            .map_err(|_| InterpretError::Brackets { position: at })?;
    let inner = &sequence[at + 1..close];
    let ranges =
        split_top_level_args(inner).map_err(|_| InterpretError::Brackets { position: at })?;
    let params = ranges
        .into_iter()
        .map(|r| {
            let text = inner[r.clone()].trim();
            text.parse::<f32>()
                .map_err(|_| InterpretError::InvalidParameter {
                    symbol,
                    position: at + 1 + r.start,
                    text: text.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((Some(params), close + 1))
}
