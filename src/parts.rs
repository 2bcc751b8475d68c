//! The tree drawing vocabulary: trunk segments, joints, and leaf clusters.
//!
//! | Symbol | Builder | Parameters |
//! |---|---|---|
//! | `D` | [`TrunkBuilder`] | bottom thickness, top thickness, length, x segments, y segments, noise zoom, noise strength |
//! | `J` | [`JointBuilder`] | thickness, x segments, y segments |
//! | `L` | [`LeafBuilder`] | min/max count, min/max length, min/max width, min/max x rotation, min/max z rotation |

use crate::mesh::{MeshPart, MeshSink, PartBuilder};
use glam::{Mat4, Vec2, Vec3};
use rand::{Rng, RngCore};
use std::f32::consts::{FRAC_PI_2, PI, SQRT_2, TAU};

/// Triangle group for bark: trunks and joints.
pub const TRUNK_GROUP: &str = "treeTrunk";
/// Triangle group for foliage.
pub const LEAF_GROUP: &str = "treeLeaf";

/// A tapered, noise-jittered cylinder. Advances the turtle by its length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trunk {
    pub bottom_thickness: f32,
    pub top_thickness: f32,
    pub length: f32,
    pub x_segments: u32,
    pub y_segments: u32,
    pub noise_zoom: f32,
    pub noise_strength: f32,
}

impl Trunk {
    /// Position of `length` in the parameter list.
    pub const LENGTH_INDEX: usize = 2;

    /// Reads the seven `D` parameters in order.
    pub fn from_parameters(p: &[f32]) -> Self {
        Self {
            bottom_thickness: param(p, 0),
            top_thickness: param(p, 1),
            length: param(p, Self::LENGTH_INDEX),
            x_segments: segments(param(p, 3)),
            y_segments: segments(param(p, 4)),
            noise_zoom: param(p, 5),
            noise_strength: param(p, 6),
        }
    }
}

impl MeshPart for Trunk {
    fn emit(&self, transform: &Mat4, sink: &mut MeshSink<'_>) {
        let (xs, ys) = (self.x_segments, self.y_segments);
        if xs == 0 || ys == 0 {
            return;
        }
        let base = sink.next_index();
        let x_step = TAU / xs as f32;
        let y_step = self.length / ys as f32;

        for y in 0..=ys {
            let factor = y as f32 / ys as f32;
            let radius =
                self.bottom_thickness + (self.top_thickness - self.bottom_thickness) * factor;
            for x in 0..=xs {
                let mut r = radius;
                if r != 0.0 {
                    r += gradient_noise(x as f32 * self.noise_zoom, y as f32 * self.noise_zoom)
                        * self.noise_strength;
                }
                let angle = x_step * x as f32;
                let local = Vec3::new(angle.sin() * r, y as f32 * y_step, angle.cos() * r);
                sink.vertex(
                    transform.transform_point3(local),
                    Vec2::new(x as f32 * x_step, y as f32 * y_step),
                );
            }
        }

        let stride = xs + 1;
        for y in 0..ys {
            for x in 0..xs {
                let a = base + y * stride + x;
                let b = a + 1;
                let c = a + stride;
                let d = c + 1;
                sink.triangle(TRUNK_GROUP, d, c, a);
                sink.triangle(TRUNK_GROUP, a, b, d);
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TrunkBuilder;

impl PartBuilder for TrunkBuilder {
    fn arity(&self) -> usize {
        7
    }

    fn build(&self, parameters: &[f32]) -> Box<dyn MeshPart> {
        Box::new(Trunk::from_parameters(parameters))
    }

    fn advance(&self, parameters: &[f32]) -> Option<f32> {
        parameters.get(Trunk::LENGTH_INDEX).copied()
    }
}

/// A sphere that rounds off the junction between two trunk segments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Joint {
    pub thickness: f32,
    pub x_segments: u32,
    pub y_segments: u32,
}

impl Joint {
    pub fn from_parameters(p: &[f32]) -> Self {
        Self {
            thickness: param(p, 0),
            x_segments: segments(param(p, 1)),
            y_segments: segments(param(p, 2)),
        }
    }
}

impl MeshPart for Joint {
    fn emit(&self, transform: &Mat4, sink: &mut MeshSink<'_>) {
        if self.x_segments < 2 || self.y_segments < 2 {
            return;
        }
        let columns = self.x_segments - 1;
        let rows = self.y_segments - 1;
        let lon_step = TAU / columns as f32;
        let lat_step = PI / rows as f32;

        for x in 0..columns {
            for y in 0..rows {
                let (left, right) = (x as f32 * lon_step, (x + 1) as f32 * lon_step);
                let (front, back) = (y as f32 * lat_step, (y + 1) as f32 * lat_step);
                let (u0, u1) = (x as f32 / columns as f32, (x + 1) as f32 / columns as f32);
                let (v0, v1) = (y as f32 / rows as f32, (y + 1) as f32 / rows as f32);

                let corners = [
                    (point_on_sphere(left, front, self.thickness), Vec2::new(u0, v0)),
                    (point_on_sphere(left, back, self.thickness), Vec2::new(u0, v1)),
                    (point_on_sphere(right, back, self.thickness), Vec2::new(u1, v1)),
                    (point_on_sphere(right, front, self.thickness), Vec2::new(u1, v0)),
                ];
                let base = sink.next_index();
                for (p, uv) in corners {
                    sink.vertex(transform.transform_point3(p), uv);
                }
                sink.triangle(TRUNK_GROUP, base + 2, base + 1, base);
                sink.triangle(TRUNK_GROUP, base, base + 3, base + 2);
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct JointBuilder;

impl PartBuilder for JointBuilder {
    fn arity(&self) -> usize {
        3
    }

    fn build(&self, parameters: &[f32]) -> Box<dyn MeshPart> {
        Box::new(Joint::from_parameters(parameters))
    }
}

/// A random number of flat leaf quads fanned out around the attachment point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeafCluster {
    pub count: (f32, f32),
    pub length: (f32, f32),
    pub width: (f32, f32),
    pub x_rotation: (f32, f32),
    pub z_rotation: (f32, f32),
}

impl LeafCluster {
    pub fn from_parameters(p: &[f32]) -> Self {
        Self {
            count: (param(p, 0), param(p, 1)),
            length: (param(p, 2), param(p, 3)),
            width: (param(p, 4), param(p, 5)),
            x_rotation: (param(p, 6), param(p, 7)),
            z_rotation: (param(p, 8), param(p, 9)),
        }
    }
}

impl MeshPart for LeafCluster {
    fn emit(&self, transform: &Mat4, sink: &mut MeshSink<'_>) {
        let (min_count, max_count) = (self.count.0.max(0.0) as u32, self.count.1.max(0.0) as u32);
        let count = if max_count > min_count {
            sink.rng().gen_range(min_count..max_count)
        } else {
            min_count
        };

        for _ in 0..count {
            let rng = sink.rng();
            let length = sample(rng, self.length);
            let width = sample(rng, self.width);
            let x_rot = sample(rng, self.x_rotation);
            let z_rot = sample(rng, self.z_rotation);

            let leaf = *transform * Mat4::from_rotation_x(x_rot) * Mat4::from_rotation_z(z_rot);
            let corners = [
                (Vec3::ZERO, Vec2::new(0.0, 0.0)),
                (Vec3::new(0.0, 0.0, length), Vec2::new(0.0, 1.0)),
                (Vec3::new(width, 0.0, length), Vec2::new(1.0, 1.0)),
                (Vec3::new(width, 0.0, 0.0), Vec2::new(1.0, 0.0)),
            ];
            let base = sink.next_index();
            for (p, uv) in corners {
                sink.vertex(leaf.transform_point3(p), uv);
            }
            sink.triangle(LEAF_GROUP, base + 2, base + 1, base);
            sink.triangle(LEAF_GROUP, base, base + 3, base + 2);
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LeafBuilder;

impl PartBuilder for LeafBuilder {
    fn arity(&self) -> usize {
        10
    }

    fn build(&self, parameters: &[f32]) -> Box<dyn MeshPart> {
        Box::new(LeafCluster::from_parameters(parameters))
    }
}

/// Missing trailing parameters read as zero.
fn param(p: &[f32], index: usize) -> f32 {
    p.get(index).copied().unwrap_or(0.0)
}

fn segments(value: f32) -> u32 {
    if value.is_finite() && value >= 1.0 {
        value as u32
    } else {
        0
    }
}

fn sample(rng: &mut dyn RngCore, (min, max): (f32, f32)) -> f32 {
    if max > min { rng.gen_range(min..max) } else { min }
}

/// Point on a sphere of `radius` from longitude/latitude in radians, latitude 0
/// at the bottom pole.
pub fn point_on_sphere(lon: f32, lat: f32, radius: f32) -> Vec3 {
    let lon = lon + FRAC_PI_2;
    Vec3::new(
        radius * lon.cos() * lat.sin(),
        -radius * lat.cos(),
        radius * lon.sin() * lat.sin(),
    )
}

/// 2D gradient noise in `[0, 1]`, equal to 0.5 at integer lattice points.
pub fn gradient_noise(x: f32, y: f32) -> f32 {
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (ix, iy) = (x0 as i32, y0 as i32);

    let corner = |gx: i32, gy: i32| {
        let g = lattice_gradient(ix.wrapping_add(gx), iy.wrapping_add(gy));
        g.dot(Vec2::new(fx - gx as f32, fy - gy as f32))
    };
    let (u, v) = (fade(fx), fade(fy));
    let bottom = lerp(corner(0, 0), corner(1, 0), u);
    let top = lerp(corner(0, 1), corner(1, 1), u);
    (0.5 + 0.5 * SQRT_2 * lerp(bottom, top, v)).clamp(0.0, 1.0)
}

fn lattice_gradient(ix: i32, iy: i32) -> Vec2 {
    let mut h = (ix as u32).wrapping_mul(0x8da6_b343) ^ (iy as u32).wrapping_mul(0xd816_3841);
    h ^= h >> 13;
    h = h.wrapping_mul(0x5bd1_e995);
    h ^= h >> 15;
    let angle = (h & 7) as f32 * (PI / 4.0);
    Vec2::new(angle.cos(), angle.sin())
}

fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
