//! Stock grammars paired with matching interpreters.

use crate::error::CompileError;
use crate::interpreter::{TurtleConfig, TurtleInterpreter};
use crate::parts::{JointBuilder, LeafBuilder, TrunkBuilder};
use crate::rewrite::LSystem;
use std::f64::consts::PI;

/// Material handle for bark in the palette used by [`tree_interpreter`].
pub const WOOD_MATERIAL: u8 = 0;
/// Material handle for foliage in the palette used by [`tree_interpreter`].
pub const LEAF_MATERIAL: u8 = 1;

const LEAF: &str = "L(LeafMinCount,LeafMaxCount,LeafMinLength,LeafMaxLength,LeafMinWidth,LeafMaxWidth,LeafMinXRot,LeafMaxXRot,LeafMinZRot,LeafMaxZRot)";

/// A binary-branching tree: a thickening main trunk (`D`) topped by a split
/// point (`S`) that spawns two rotated sub-trunks with leaves, five times over.
pub fn tree_preset() -> Result<LSystem, CompileError> {
    let mut system = LSystem::new();
    system.iterations = 5;
    system.axiom = "D(TrunkWidth,0,MainTrunkLength,XSegments,YSegments,PerlinZoom,PerlinStrength)\
                    S(TrunkWidth,0,TrunkLength,XSegments,YSegments,PerlinZoom,PerlinStrength)"
        .to_string();

    let constants = [
        ("TrunkGrowthRate", 0.5),
        ("TrunkSplitMinXRot", 0.0),
        ("TrunkSplitMaxXRot", 0.0),
        ("TrunkSplitMinYRot", 0.0),
        ("TrunkSplitMaxYRot", 0.0),
        ("TrunkWidth", 0.03),
        ("MainTrunkLength", 3.0),
        ("TrunkLength", 1.0),
        ("XSegments", 5.0),
        ("YSegments", 5.0),
        ("PerlinZoom", 0.5),
        ("PerlinStrength", 0.05),
        ("LeafMinCount", 2.0),
        ("LeafMaxCount", 5.0),
        ("LeafMinLength", 0.2),
        ("LeafMaxLength", 0.5),
        ("LeafMinWidth", 0.1),
        ("LeafMaxWidth", 0.3),
        ("LeafMinXRot", -PI / 8.0),
        ("LeafMaxXRot", PI / 8.0),
        ("LeafMinZRot", -PI / 8.0),
        ("LeafMaxZRot", PI / 8.0),
    ];
    for (name, value) in constants {
        system.constants.set(name, value);
    }

    let branch = |x_rot: &str, y_rot: &str| {
        format!(
            "[X({x_rot})Y({y_rot})D(x*TrunkGrowthRate,y*TrunkGrowthRate,z,w,t,f,s)S(x,y,z,w,t,f,s){LEAF}]"
        )
    };
    let split = format!(
        "J(x*TrunkGrowthRate,w,t){}{}",
        branch(
            "-PI/8+TrunkSplitMaxXRot+rnd(TrunkSplitMinXRot,TrunkSplitMaxXRot)",
            "-PI/8+TrunkSplitMaxYRot+rnd(TrunkSplitMinYRot,TrunkSplitMaxYRot)",
        ),
        branch(
            "PI/8+TrunkSplitMinXRot+rnd(TrunkSplitMinXRot,TrunkSplitMaxXRot)",
            "-PI/8+rnd(TrunkSplitMinYRot,TrunkSplitMaxYRot)",
        ),
    );

    system
        .grammar
        .add_rule("D(x,y,z,w,t,f,s)", "D(x+TrunkWidth,y+TrunkWidth,z,w,t,f,s)", "")?;
    system.grammar.add_rule("S(x,y,z,w,t,f,s)", &split, "")?;
    system.grammar.add_rule("J(x,y,z)", "J(x+TrunkWidth*1.25,y,z)", "")?;

    Ok(system)
}

/// An interpreter understanding `X`, `Y`, `Z`, `[`, `]` plus the tree parts
/// `D`, `J` and `L`, with wood and leaf materials registered in that order.
pub fn tree_interpreter(config: TurtleConfig) -> TurtleInterpreter {
    let mut interpreter = TurtleInterpreter::new(config);
    interpreter.populate_standard_symbols();
    interpreter.register_part('D', TrunkBuilder);
    interpreter.register_part('J', JointBuilder);
    interpreter.register_part('L', LeafBuilder);
    interpreter.add_material(WOOD_MATERIAL);
    interpreter.add_material(LEAF_MATERIAL);
    interpreter
}
