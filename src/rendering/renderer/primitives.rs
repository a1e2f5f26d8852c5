/// Built-in shapes: the unit cube and unit spheres.
///
/// Both are drawn in model space, so the model matrix places and scales
/// them. They are closed surfaces: culling is forced to counter-clockwise
/// while drawing unless it is disabled.
use super::draw::{BatchInputs, PrimitiveBatch, ViewVertex};
use super::Renderer3D;
use crate::count_call;
use crate::rendering::color::Color;
use crate::rendering::framebuffer::{DepthValue, Image, RenderTarget};
use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

pub const CUBE_FACE_COUNT: usize = 6;
pub const MIN_SPHERE_SECTORS: i32 = 3;
pub const MAX_SPHERE_SECTORS: i32 = 256;
const MIN_SPHERE_STACKS: i32 = 3;
/// Adaptive spheres use `2 * stacks - 2` sectors, which stays within
/// [`MAX_SPHERE_SECTORS`] up to this many stacks.
pub const MAX_SPHERE_STACKS: i32 = MAX_SPHERE_SECTORS / 2 + 1;

/// Faces of `[-1, 1]^3` in the order front (+Z), back (-Z), top (+Y),
/// bottom (-Y), left (-X), right (+X). Each face is counter-clockwise seen
/// from outside, starting at the bottom left corner.
const CUBE_FACES: [[Vec3; 4]; CUBE_FACE_COUNT] = [
    [
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
    ],
    [
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
    ],
    [
        Vec3::new(-1.0, 1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
    ],
    [
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(-1.0, -1.0, 1.0),
    ],
    [
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, -1.0),
    ],
    [
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(1.0, 1.0, 1.0),
    ],
];

const CUBE_NORMALS: [Vec3; CUBE_FACE_COUNT] = [Vec3::Z, Vec3::NEG_Z, Vec3::Y, Vec3::NEG_Y, Vec3::NEG_X, Vec3::X];

/// Image row 0 is the top of a face.
const FACE_TEXCOORDS: [Vec2; 4] = [
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(0.0, 0.0),
];

impl<C: Color, Z: DepthValue, const ENABLED: u32> Renderer3D<C, Z, ENABLED> {
    fn with_outward_culling(&mut self, draw: impl FnOnce(&Self)) {
        let saved = self.culling;
        if saved != 0 {
            self.culling = 1;
        }
        draw(self);
        self.culling = saved;
    }

    /// The cube `[-1, 1]^3`, optionally with one texture per face (see
    /// [`CUBE_FACE_COUNT`] for the face order).
    pub fn draw_cube(&mut self, target: &mut RenderTarget<'_, C, Z>, textures: Option<[&Image<C>; CUBE_FACE_COUNT]>) {
        self.with_outward_culling(|r| {
            for (face, corners) in CUBE_FACES.iter().enumerate() {
                let normals = [CUBE_NORMALS[face]; 4];
                let mut batch = PrimitiveBatch::quads(corners)
                    .with_normals(&normals)
                    .with_texcoords(&FACE_TEXCOORDS);
                if let Some(t) = textures {
                    batch = batch.with_texture(t[face]);
                }
                r.draw_primitives(target, &batch);
            }
        });
    }

    /// Unit sphere with `sectors` slices around the Y axis (clamped to
    /// `[3, 256]`) and `stacks` bands from pole to pole (clamped to
    /// `[3, 129]`).
    ///
    /// A texture is mapped equirectangularly: `u` follows the longitude and
    /// the top image row is the north pole.
    pub fn draw_sphere(
        &mut self,
        target: &mut RenderTarget<'_, C, Z>,
        sectors: i32,
        stacks: i32,
        texture: Option<&Image<C>>,
    ) {
        let sectors = sectors.clamp(MIN_SPHERE_SECTORS, MAX_SPHERE_SECTORS);
        let stacks = stacks.clamp(MIN_SPHERE_STACKS, MAX_SPHERE_STACKS);
        self.with_outward_culling(|r| r.sphere(target, sectors, stacks, texture));
    }

    /// Sphere tessellated according to its size on screen: more pixels,
    /// more triangles. `quality` scales the triangle count (1 is a good
    /// default).
    pub fn draw_adaptive_sphere(&mut self, target: &mut RenderTarget<'_, C, Z>, quality: f32, texture: Option<&Image<C>>) {
        let (sectors, stacks) = self.adaptive_sphere_tessellation(quality);
        self.draw_sphere(target, sectors, stacks, texture);
    }

    /// `(sectors, stacks)` used by [`draw_adaptive_sphere`](Self::draw_adaptive_sphere).
    /// Huge or non-finite sizes saturate at [`MAX_SPHERE_STACKS`].
    pub fn adaptive_sphere_tessellation(&self, quality: f32) -> (i32, i32) {
        let l = self.unit_sphere_screen_diameter();
        let extra = (l * quality.max(0.0))
            .sqrt()
            .clamp(0.0, (MAX_SPHERE_STACKS - 2) as f32);
        // NaN casts to 0.
        let stacks = 2 + extra as i32;
        (stacks * 2 - 2, stacks)
    }

    /// Diameter in pixels of the unit sphere at the model origin.
    pub fn unit_sphere_screen_diameter(&self) -> f32 {
        let p0 = self.to_view(Vec3::ZERO);
        let r = (self.to_view(Vec3::X) - p0).length();
        let d = r * std::f32::consts::FRAC_1_SQRT_2;
        let p2 = Vec3::new(p0.x - d, p0.y - d, p0.z);
        let project = |p: Vec3| {
            let q = self.to_clip(p);
            if self.ortho {
                q
            } else {
                q / q.w
            }
        };
        let (q0, q2) = (project(p0), project(p2));
        let dx = (q2.x - q0.x) * self.lx as f32;
        let dy = (q2.y - q0.y) * self.ly as f32;
        (dx * dx + dy * dy).sqrt()
    }

    fn sphere(&self, target: &mut RenderTarget<'_, C, Z>, sectors: i32, stacks: i32, texture: Option<&Image<C>>) {
        count_call!(draw_calls);
        let inputs = BatchInputs {
            has_normals: true,
            has_texcoords: true,
            vertex_colors: false,
            texture,
        };
        let Some(b) = self.batch(target, inputs) else {
            return;
        };

        let vertex = |stack: i32, sector: i32| -> ViewVertex {
            let phi = PI * stack as f32 / stacks as f32;
            let theta = TAU * sector as f32 / sectors as f32;
            let (sp, cp) = phi.sin_cos();
            let (st, ct) = theta.sin_cos();
            let p = Vec3::new(sp * st, cp, sp * ct);
            let mut v = self.view_vertex(p);
            v.normal = self.model_view.transform_vector3(p);
            v.tex = Vec2::new(sector as f32 / sectors as f32, stack as f32 / stacks as f32);
            v
        };

        for i in 0..stacks {
            let mut a = vertex(i, 0);
            let mut bl = vertex(i + 1, 0);
            for j in 0..sectors {
                let br = vertex(i + 1, j + 1);
                let d = vertex(i, j + 1);
                // Bands touching a pole have one degenerate triangle per quad.
                if i + 1 < stacks {
                    self.render_triangle(&b, target, [&a, &bl, &br]);
                }
                if i > 0 {
                    self.render_triangle(&b, target, [&a, &br, &d]);
                }
                a = d;
                bl = br;
            }
        }
    }
}
