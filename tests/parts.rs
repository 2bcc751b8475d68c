// tests/parts.rs
use glam::{Mat4, Vec3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use symbios_flora::parts::{
    Joint, JointBuilder, LEAF_GROUP, LeafBuilder, LeafCluster, TRUNK_GROUP, Trunk, TrunkBuilder,
    gradient_noise,
};
use symbios_flora::{MeshBuffers, MeshPart, MeshSink, PartBuilder};

fn emit(part: &dyn MeshPart, transform: Mat4, seed: u64) -> MeshBuffers {
    let mut buffers = MeshBuffers::default();
    let mut rng = StdRng::seed_from_u64(seed);
    part.emit(&transform, &mut MeshSink::new(&mut buffers, &mut rng));
    buffers
}

#[test]
fn test_trunk_grid() {
    let trunk = Trunk::from_parameters(&[0.5, 0.25, 2.0, 4.0, 2.0, 0.5, 0.0]);
    let buffers = emit(&trunk, Mat4::IDENTITY, 0);

    assert_eq!(buffers.vertices.len(), 15);
    assert_eq!(buffers.uvs.len(), 15);
    assert_eq!(buffers.triangle_count(), 16);
    assert_eq!(buffers.groups.len(), 1);
    assert_eq!(buffers.groups[0].name, TRUNK_GROUP);
    assert!(buffers.groups[0].indices.iter().all(|&i| i < 15));

    // Without noise the rings taper linearly from bottom to top.
    let bottom = buffers.vertices[0];
    let top = buffers.vertices[14];
    assert!((Vec3::new(bottom.x, 0.0, bottom.z).length() - 0.5).abs() < 1e-5);
    assert!((Vec3::new(top.x, 0.0, top.z).length() - 0.25).abs() < 1e-5);
    assert!((top.y - 2.0).abs() < 1e-5);
}

#[test]
fn test_trunk_builder_advances_by_length() {
    let params = [0.1, 0.1, 3.5, 5.0, 5.0, 0.5, 0.05];
    assert_eq!(TrunkBuilder.arity(), 7);
    assert_eq!(TrunkBuilder.advance(&params), Some(3.5));
    assert_eq!(JointBuilder.advance(&[0.1, 5.0, 5.0]), None);
    assert_eq!(LeafBuilder.arity(), 10);
}

#[test]
fn test_trunk_follows_transform() {
    let trunk = Trunk::from_parameters(&[0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0]);
    let buffers = emit(&trunk, Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)), 0);
    // Zero radius skips the noise, so every vertex lies on the axis.
    assert!(buffers.vertices.iter().all(|v| (v.x - 5.0).abs() < 1e-6 && v.z.abs() < 1e-6));
}

#[test]
fn test_joint_sphere() {
    let joint = Joint::from_parameters(&[1.0, 3.0, 3.0]);
    let buffers = emit(&joint, Mat4::IDENTITY, 0);

    assert_eq!(buffers.vertices.len(), 16);
    assert_eq!(buffers.triangle_count(), 8);
    assert_eq!(buffers.groups[0].name, TRUNK_GROUP);
    assert!(buffers.vertices.iter().all(|v| (v.length() - 1.0).abs() < 1e-5));
    assert!(
        buffers
            .uvs
            .iter()
            .all(|uv| (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y))
    );

    // Covers both poles.
    let min_y = buffers.vertices.iter().map(|v| v.y).fold(f32::MAX, f32::min);
    let max_y = buffers.vertices.iter().map(|v| v.y).fold(f32::MIN, f32::max);
    assert!((min_y + 1.0).abs() < 1e-5);
    assert!((max_y - 1.0).abs() < 1e-5);
}

#[test]
fn test_joint_too_few_segments_is_empty() {
    let joint = Joint::from_parameters(&[1.0, 1.0, 5.0]);
    let buffers = emit(&joint, Mat4::IDENTITY, 0);
    assert!(buffers.vertices.is_empty());
    assert!(buffers.groups.is_empty());
}

#[test]
fn test_leaf_cluster() {
    let fixed = [3.0, 3.0, 0.2, 0.5, 0.1, 0.3, -0.4, 0.4, -0.4, 0.4];
    let leaves = LeafCluster::from_parameters(&fixed);
    let buffers = emit(&leaves, Mat4::IDENTITY, 11);
    assert_eq!(buffers.vertices.len(), 12);
    assert_eq!(buffers.triangle_count(), 6);
    assert_eq!(buffers.groups[0].name, LEAF_GROUP);

    let ranged = [2.0, 5.0, 0.2, 0.5, 0.1, 0.3, -0.4, 0.4, -0.4, 0.4];
    let leaves = LeafCluster::from_parameters(&ranged);
    let first = emit(&leaves, Mat4::IDENTITY, 5);
    let second = emit(&leaves, Mat4::IDENTITY, 5);
    assert_eq!(first, second);
    let count = first.vertices.len() / 4;
    assert!((2..5).contains(&count), "{count} leaves");
}

#[test]
fn test_noise_range() {
    for (x, y) in [(0.0, 0.0), (2.0, 3.0), (-4.0, 7.0)] {
        assert!((gradient_noise(x, y) - 0.5).abs() < 1e-6);
    }
    for i in 0..40 {
        for j in 0..40 {
            let n = gradient_noise(i as f32 * 0.37 - 5.0, j as f32 * 0.23 - 3.0);
            assert!((0.0..=1.0).contains(&n), "{n}");
        }
    }
}
