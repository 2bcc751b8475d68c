//! The mesh-part tree and the buffers it flattens into.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Every node except
//! the root is listed under exactly one parent, so the structure is always a tree.

use glam::{Mat4, Vec2, Vec3};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::Range;

/// A generic material identifier referencing an external palette.
pub type MaterialId = u8;

/// Index of a node inside its [`MeshTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// A geometry-producing unit of the scene.
pub trait MeshPart: Debug {
    /// Appends this part's vertices, uvs and triangles. `transform` is the turtle
    /// transform captured when the node was created.
    fn emit(&self, transform: &Mat4, sink: &mut MeshSink<'_>);
}

/// Creates mesh parts for one drawing symbol.
pub trait PartBuilder: Debug {
    /// Number of parameters the symbol consumes.
    fn arity(&self) -> usize;

    fn build(&self, parameters: &[f32]) -> Box<dyn MeshPart>;

    /// Distance the turtle moves along its growth axis after the node is created.
    fn advance(&self, _parameters: &[f32]) -> Option<f32> {
        None
    }
}

/// One mesh part placed in the tree.
#[derive(Debug)]
pub struct MeshNode {
    /// Turtle transform at the moment the node was created.
    pub transform: Mat4,
    /// Parameters read from the drawing symbol.
    pub parameters: Vec<f32>,
    /// Geometry producer built from `parameters`.
    pub part: Box<dyn MeshPart>,
    /// `None` only for the root.
    pub parent: Option<NodeId>,
    /// Children in creation order.
    pub children: Vec<NodeId>,
}

/// Arena-backed tree of mesh parts with a single root.
#[derive(Debug, Default)]
pub struct MeshTree {
    nodes: Vec<MeshNode>,
    root: Option<NodeId>,
}

impl MeshTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node below `parent`.
    ///
    /// The first node ever added becomes the root. A later node without a parent
    /// is attached to the root, so the tree never grows a second root.
    pub fn add(
        &mut self,
        parent: Option<NodeId>,
        transform: Mat4,
        parameters: Vec<f32>,
        part: Box<dyn MeshPart>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let existing_root = self.root;
        let parent = match existing_root {
            None => {
                self.root = Some(id);
                None
            }
            Some(root) => Some(parent.filter(|p| p.0 < self.nodes.len()).unwrap_or(root)),
        };
        self.nodes.push(MeshNode {
            transform,
            parameters,
            part,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    /// The first node ever added.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&MeshNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node IDs in depth-first pre-order starting at the root.
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        order
    }

    /// Flattens the tree: every node emits its own geometry before its children.
    pub fn emit(&self, rng: &mut dyn RngCore) -> MeshBuffers {
        let mut buffers = MeshBuffers::default();
        let mut sink = MeshSink::new(&mut buffers, rng);
        for id in self.depth_first() {
            let node = &self.nodes[id.0];
            node.part.emit(&node.transform, &mut sink);
        }
        buffers
    }
}

/// Triangle indices sharing one material / geometry category.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleGroup {
    pub name: String,
    pub indices: Vec<u32>,
}

/// Flattened output of an interpretation pass, ready for an external renderer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffers {
    pub vertices: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    /// Groups in the order they were first written to.
    pub groups: Vec<TriangleGroup>,
    /// Material handles, matched to `groups` by position.
    pub materials: Vec<MaterialId>,
}

impl MeshBuffers {
    pub fn group(&self, name: &str) -> Option<&TriangleGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn triangle_count(&self) -> usize {
        self.groups.iter().map(|g| g.indices.len() / 3).sum()
    }

    /// Concatenates every group's indices into one buffer, returning the buffer
    /// and the contiguous sub-range owned by each group.
    pub fn flattened_indices(&self) -> (Vec<u32>, Vec<Range<usize>>) {
        let mut indices = Vec::with_capacity(self.groups.iter().map(|g| g.indices.len()).sum());
        let mut ranges = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let start = indices.len();
            indices.extend_from_slice(&group.indices);
            ranges.push(start..indices.len());
        }
        (indices, ranges)
    }

    /// Each group paired with the material at the same position, if any.
    pub fn submeshes(&self) -> impl Iterator<Item = (&TriangleGroup, Option<MaterialId>)> {
        self.groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g, self.materials.get(i).copied()))
    }

    fn group_mut(&mut self, name: &str) -> &mut TriangleGroup {
        let index = match self.groups.iter().position(|g| g.name == name) {
            Some(index) => index,
            None => {
                self.groups.push(TriangleGroup {
                    name: name.to_string(),
                    indices: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }
}

/// Write access to the shared buffers while a tree is being flattened.
pub struct MeshSink<'a> {
    buffers: &'a mut MeshBuffers,
    rng: &'a mut dyn RngCore,
}

impl<'a> MeshSink<'a> {
    pub fn new(buffers: &'a mut MeshBuffers, rng: &'a mut dyn RngCore) -> Self {
        Self { buffers, rng }
    }

    /// Index the next pushed vertex will receive.
    pub fn next_index(&self) -> u32 {
        self.buffers.vertices.len() as u32
    }

    /// Appends a vertex and its uv, returning the vertex index.
    pub fn vertex(&mut self, position: Vec3, uv: Vec2) -> u32 {
        let index = self.next_index();
        self.buffers.vertices.push(position);
        self.buffers.uvs.push(uv);
        index
    }

    /// Appends one triangle to `group`, creating the group on first use.
    pub fn triangle(&mut self, group: &str, a: u32, b: u32, c: u32) {
        self.buffers.group_mut(group).indices.extend([a, b, c]);
    }

    /// Random source for parts whose shape is not fully determined by their parameters.
    pub fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }
}
