// tests/turtle.rs
use glam::{Mat4, Vec2, Vec3};
use symbios_flora::{
    InterpretError, MeshPart, MeshSink, NodeId, PartBuilder, Turtle, TurtleConfig,
    TurtleInterpreter, TurtleOp,
};

/// A part with no geometry.
#[derive(Debug)]
struct Dot;

impl MeshPart for Dot {
    fn emit(&self, _transform: &Mat4, _sink: &mut MeshSink<'_>) {}
}

#[derive(Debug)]
struct DotBuilder;

impl PartBuilder for DotBuilder {
    fn arity(&self) -> usize {
        0
    }

    fn build(&self, _parameters: &[f32]) -> Box<dyn MeshPart> {
        Box::new(Dot)
    }
}

/// One triangle in a named group; advances the turtle by its first parameter.
#[derive(Debug)]
struct Tagged(&'static str);

impl MeshPart for Tagged {
    fn emit(&self, transform: &Mat4, sink: &mut MeshSink<'_>) {
        let a = sink.vertex(transform.transform_point3(Vec3::ZERO), Vec2::ZERO);
        let b = sink.vertex(transform.transform_point3(Vec3::X), Vec2::X);
        let c = sink.vertex(transform.transform_point3(Vec3::Y), Vec2::Y);
        sink.triangle(self.0, a, b, c);
    }
}

#[derive(Debug)]
struct TaggedBuilder(&'static str);

impl PartBuilder for TaggedBuilder {
    fn arity(&self) -> usize {
        1
    }

    fn build(&self, _parameters: &[f32]) -> Box<dyn MeshPart> {
        Box::new(Tagged(self.0))
    }

    fn advance(&self, parameters: &[f32]) -> Option<f32> {
        parameters.first().copied()
    }
}

fn interpreter() -> TurtleInterpreter {
    let mut interp = TurtleInterpreter::new(TurtleConfig {
        seed: Some(3),
        ..Default::default()
    });
    interp.populate_standard_symbols();
    interp.register_part('D', DotBuilder);
    interp.register_part('T', TaggedBuilder("trunk"));
    interp.register_part('L', TaggedBuilder("leaf"));
    interp
}

fn position(interp: &TurtleInterpreter, sequence: &str, node: usize) -> Vec3 {
    let tree = interp.build_tree(sequence).unwrap();
    tree.node(NodeId(node))
        .unwrap()
        .transform
        .transform_point3(Vec3::ZERO)
}

#[test]
fn test_push_pop_restores_state() {
    let mut turtle = Turtle::new(Vec3::Y);
    turtle.state.rotate_local_x(0.3);
    let root = turtle.spawn(&DotBuilder, Vec::new());
    let saved = turtle.state.clone();
    assert_eq!(saved.current_node, Some(root));

    turtle.push();
    turtle.state.rotate_local_z(1.0);
    turtle.state.translate_local(Vec3::Y, 2.0);
    let branch = turtle.spawn(&TaggedBuilder("leaf"), vec![1.0]);
    assert_eq!(turtle.state.current_node, Some(branch));
    assert_eq!(turtle.depth(), 1);

    assert!(turtle.pop());
    assert_eq!(turtle.state, saved);
    assert_eq!(turtle.state.current_node, Some(root));

    // The next node hangs off the restored attachment point.
    let sibling = turtle.spawn(&DotBuilder, Vec::new());
    assert_eq!(
        turtle.tree().node(root).unwrap().children,
        vec![branch, sibling]
    );

    // Popping an empty stack is a no-op.
    let before = turtle.state.clone();
    assert!(!turtle.pop());
    assert_eq!(turtle.state, before);
    assert_eq!(turtle.depth(), 0);
}

#[test]
fn test_standard_symbols() {
    let interp = interpreter();
    assert_eq!(interp.op_for('X'), TurtleOp::RotateX);
    assert_eq!(interp.op_for('Y'), TurtleOp::RotateY);
    assert_eq!(interp.op_for('Z'), TurtleOp::RotateZ);
    assert_eq!(interp.op_for('['), TurtleOp::Push);
    assert_eq!(interp.op_for(']'), TurtleOp::Pop);
    assert_eq!(interp.op_for('D'), TurtleOp::Draw(0));
    assert_eq!(interp.op_for('Q'), TurtleOp::Ignore);
}

#[test]
fn test_branch_topology() {
    let interp = interpreter();

    // Siblings: both D's after the root hang off the root.
    let tree = interp.build_tree("D[D]D").unwrap();
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.root(), Some(NodeId(0)));
    let root = tree.node(NodeId(0)).unwrap();
    assert_eq!(root.children, vec![NodeId(1), NodeId(2)]);
    assert_eq!(tree.node(NodeId(2)).unwrap().parent, Some(NodeId(0)));

    // Chain.
    let tree = interp.build_tree("DD").unwrap();
    assert_eq!(tree.node(NodeId(1)).unwrap().parent, Some(NodeId(0)));
    assert!(tree.node(NodeId(1)).unwrap().children.is_empty());

    // Nested branches.
    let tree = interp.build_tree("D[D[D]D]D").unwrap();
    assert_eq!(tree.node(NodeId(1)).unwrap().children, vec![NodeId(2), NodeId(3)]);
    assert_eq!(tree.node(NodeId(4)).unwrap().parent, Some(NodeId(0)));
    assert_eq!(
        tree.depth_first(),
        vec![NodeId(0), NodeId(1), NodeId(2), NodeId(3), NodeId(4)]
    );
}

#[test]
fn test_advancing_part_moves_the_turtle() {
    let interp = interpreter();
    assert!(position(&interp, "T(2)T(1)", 1).distance(Vec3::new(0.0, 2.0, 0.0)) < 1e-5);

    // A quarter turn around Z points the growth axis along -X.
    let p = position(&interp, "Z(1.5707964)T(1)T(1)", 1);
    assert!(p.distance(Vec3::new(-1.0, 0.0, 0.0)) < 1e-5, "{p}");

    // A branch starts where the parent stopped and does not move it.
    let p = position(&interp, "T(1)[X(0.5)T(3)]T(1)", 2);
    assert!(p.distance(Vec3::new(0.0, 1.0, 0.0)) < 1e-5, "{p}");
}

#[test]
fn test_unknown_symbols_are_skipped_with_their_parameters() {
    let interp = interpreter();
    let tree = interp.build_tree("A(foo,bar(1))DQ(1,2)D").unwrap();
    assert_eq!(tree.len(), 2);
    assert_eq!(tree.node(NodeId(1)).unwrap().parent, Some(NodeId(0)));

    // Parameter lists on zero-arity parts are kept on the node.
    let tree = interp.build_tree("D(1,2)").unwrap();
    assert_eq!(tree.node(NodeId(0)).unwrap().parameters, vec![1.0, 2.0]);
}

#[test]
fn test_pop_on_empty_stack_is_tolerated() {
    let interp = interpreter();
    let tree = interp.build_tree("]D]]D").unwrap();
    assert_eq!(tree.len(), 2);
}

#[test]
fn test_interpretation_errors() {
    let interp = interpreter();
    assert_eq!(interp.interpret("AB[]"), Err(InterpretError::EmptyResult));
    assert_eq!(
        interp.interpret("DX"),
        Err(InterpretError::MissingParameters {
            symbol: 'X',
            position: 1
        })
    );
    assert_eq!(
        interp.interpret("X()D"),
        Err(InterpretError::TooFewParameters {
            symbol: 'X',
            expected: 1,
            found: 0
        })
    );
    assert_eq!(
        interp.interpret("T"),
        Err(InterpretError::TooFewParameters {
            symbol: 'T',
            expected: 1,
            found: 0
        })
    );
    assert_eq!(
        interp.interpret("T(abc)"),
        Err(InterpretError::InvalidParameter {
            symbol: 'T',
            position: 2,
            text: "abc".to_string()
        })
    );
    assert_eq!(
        interp.interpret("T(1"),
        Err(InterpretError::Brackets { position: 1 })
    );
}

#[test]
fn test_groups_and_materials() {
    let mut interp = interpreter();
    interp.add_material(4);
    interp.add_material(9);

    let buffers = interp.interpret("T(1)[L(0)]T(1)").unwrap();
    let names: Vec<&str> = buffers.groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["trunk", "leaf"]);
    assert_eq!(buffers.vertices.len(), 9);
    assert_eq!(buffers.uvs.len(), 9);
    assert_eq!(buffers.triangle_count(), 3);

    // Depth-first: trunk (0..3), leaf (3..6), trunk (6..9).
    assert_eq!(buffers.group("trunk").unwrap().indices, vec![0, 1, 2, 6, 7, 8]);
    assert_eq!(buffers.group("leaf").unwrap().indices, vec![3, 4, 5]);

    let (indices, ranges) = buffers.flattened_indices();
    assert_eq!(indices, vec![0, 1, 2, 6, 7, 8, 3, 4, 5]);
    assert_eq!(ranges, vec![0..6, 6..9]);

    let materials: Vec<Option<u8>> = buffers.submeshes().map(|(_, m)| m).collect();
    assert_eq!(materials, vec![Some(4), Some(9)]);

    // Materials belong to the interpreter and survive across runs.
    let again = interp.interpret("L(0)").unwrap();
    assert_eq!(again.materials, vec![4, 9]);
    assert_eq!(interp.materials(), &[4, 9]);
}
