//! Turtle state, operations, and the branch stack.

use crate::mesh::{MeshTree, NodeId, PartBuilder};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The state of the plant-building turtle.
///
/// Tracks the local frame and the topological context (which node new geometry
/// hangs from). Both halves are saved and restored together by `[` and `]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurtleState {
    /// Current position and orientation, composed by post-multiplication.
    pub transform: Mat4,

    /// The node the turtle is currently "standing on".
    /// If this is Some(id), the NEXT spawned node becomes a child of it.
    pub current_node: Option<NodeId>,
}

impl Default for TurtleState {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            current_node: None,
        }
    }
}

impl TurtleState {
    /// Current world-space position of the cursor.
    pub fn position(&self) -> Vec3 {
        self.transform.transform_point3(Vec3::ZERO)
    }

    /// Returns the turtle's local up direction (Y-axis) in world space.
    pub fn up(&self) -> Vec3 {
        self.transform.transform_vector3(Vec3::Y)
    }

    /// Rotates the turtle around its local X axis by `angle` radians.
    pub fn rotate_local_x(&mut self, angle: f32) {
        self.transform *= Mat4::from_rotation_x(angle);
    }

    /// Rotates the turtle around its local Y axis by `angle` radians.
    pub fn rotate_local_y(&mut self, angle: f32) {
        self.transform *= Mat4::from_rotation_y(angle);
    }

    /// Rotates the turtle around its local Z axis by `angle` radians.
    pub fn rotate_local_z(&mut self, angle: f32) {
        self.transform *= Mat4::from_rotation_z(angle);
    }

    /// Moves along `axis`, expressed in the turtle's local frame.
    pub fn translate_local(&mut self, axis: Vec3, distance: f32) {
        self.transform *= Mat4::from_translation(axis * distance);
    }
}

/// Operations that can be performed by the turtle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurtleOp {
    /// Rotate around local X (`X`). Params: `(radians)`.
    RotateX,
    /// Rotate around local Y (`Y`). Params: `(radians)`.
    RotateY,
    /// Rotate around local Z (`Z`). Params: `(radians)`.
    RotateZ,
    /// Spawn a mesh part using the registered builder with this index.
    Draw(usize),
    /// Save the turtle state onto the stack (`[`).
    Push,
    /// Restore the most recently pushed turtle state (`]`).
    Pop,
    /// No-op. The symbol has no registered meaning.
    Ignore,
}

/// A turtle in the middle of an interpretation pass.
///
/// Owns the branch stack and the tree under construction.
#[derive(Debug)]
pub struct Turtle {
    pub state: TurtleState,
    stack: Vec<TurtleState>,
    tree: MeshTree,
    growth_axis: Vec3,
}

impl Turtle {
    pub fn new(growth_axis: Vec3) -> Self {
        Self {
            state: TurtleState::default(),
            stack: Vec::new(),
            tree: MeshTree::new(),
            growth_axis,
        }
    }

    pub fn tree(&self) -> &MeshTree {
        &self.tree
    }

    pub fn into_tree(self) -> MeshTree {
        self.tree
    }

    /// Number of saved frames.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Saves the transform and the current node together (`[`).
    pub fn push(&mut self) {
        self.stack.push(self.state.clone());
    }

    /// Restores the last pushed frame. An empty stack leaves the state unchanged
    /// and returns `false`.
    pub fn pop(&mut self) -> bool {
        match self.stack.pop() {
            Some(frame) => {
                self.state = frame;
                true
            }
            None => {
                warn!(
                    transform = ?self.state.transform,
                    node = ?self.state.current_node,
                    "pop on empty transform/node stack"
                );
                false
            }
        }
    }

    /// Creates a node at the current transform, hangs it under the current node,
    /// and makes it the new attachment point.
    pub fn spawn(&mut self, builder: &dyn PartBuilder, parameters: Vec<f32>) -> NodeId {
        let part = builder.build(&parameters);
        let advance = builder.advance(&parameters);
        let id = self.tree.add(
            self.state.current_node,
            self.state.transform,
            parameters,
            part,
        );
        self.state.current_node = Some(id);
        if let Some(distance) = advance {
            self.state.translate_local(self.growth_axis, distance);
        }
        id
    }
}
