/// Draw paths: direct triangles and quads, and face-chain meshes.
///
/// Every path ends in `render_triangle`, which culls, lights, projects and
/// either rasterizes the triangle directly or sends it through the clipper.
use super::{Renderer3D, SUBPIXEL_BITS};
use crate::meshing::{FaceEvent, FaceVertex, Mesh3D};
use crate::rendering::clipping::{
    clip_test_needed, clip_triangle, discard_box, discard_triangle, frustum_planes, needs_clipping, project_vertex,
    ClipPlane, ScreenBounds,
};
use crate::rendering::color::{Color, RgbF};
use crate::rendering::framebuffer::{DepthValue, Image, RenderTarget};
use crate::rendering::rasterizer::{rasterize_triangle, RasterViewport, RasterizerVertex, Uniforms};
use crate::rendering::shader_flags::ShaderFlags;
use crate::rendering::shaders::select_shader;
use crate::{count_call, perf_scope};
use glam::{Vec2, Vec3, Vec4};

/// How the vertices of a [`PrimitiveBatch`] form faces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Topology {
    /// Three consecutive vertices per triangle.
    Triangles,
    /// Four consecutive vertices per quad, split along the `0-2` diagonal.
    Quads,
}

impl Topology {
    pub const fn corners(self) -> usize {
        match self {
            Topology::Triangles => 3,
            Topology::Quads => 4,
        }
    }
}

/// Triangles or quads given as plain arrays.
///
/// Attribute arrays are parallel to `vertices`. When `indices` is set,
/// corner `k` of face `f` uses element `indices[f * corners + k]` of every
/// array; otherwise element `f * corners + k`.
///
/// Per-vertex `colors` replace the material color and always use Gouraud
/// shading without texture. Without normals they are lit with the face
/// normal.
#[derive(Copy, Clone, Debug)]
pub struct PrimitiveBatch<'d, C: Color> {
    pub topology: Topology,
    pub vertices: &'d [Vec3],
    pub indices: Option<&'d [u16]>,
    pub normals: Option<&'d [Vec3]>,
    pub texcoords: Option<&'d [Vec2]>,
    pub colors: Option<&'d [RgbF]>,
    pub texture: Option<&'d Image<C>>,
}

impl<'d, C: Color> PrimitiveBatch<'d, C> {
    pub fn triangles(vertices: &'d [Vec3]) -> Self {
        Self::with_topology(Topology::Triangles, vertices)
    }

    pub fn quads(vertices: &'d [Vec3]) -> Self {
        Self::with_topology(Topology::Quads, vertices)
    }

    fn with_topology(topology: Topology, vertices: &'d [Vec3]) -> Self {
        PrimitiveBatch {
            topology,
            vertices,
            indices: None,
            normals: None,
            texcoords: None,
            colors: None,
            texture: None,
        }
    }

    pub fn with_indices(mut self, indices: &'d [u16]) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn with_normals(mut self, normals: &'d [Vec3]) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_texcoords(mut self, texcoords: &'d [Vec2]) -> Self {
        self.texcoords = Some(texcoords);
        self
    }

    pub fn with_colors(mut self, colors: &'d [RgbF]) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_texture(mut self, texture: &'d Image<C>) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Number of complete faces.
    pub fn face_count(&self) -> usize {
        self.indices.map_or(self.vertices.len(), |i| i.len()) / self.topology.corners()
    }
}

/// A vertex after the model-view and projection transforms.
#[derive(Copy, Clone, Debug, Default)]
pub(super) struct ViewVertex {
    pub view: Vec3,
    pub clip: Vec4,
    /// Model-view transformed, not renormalized.
    pub normal: Vec3,
    pub tex: Vec2,
    pub color: RgbF,
}

/// What a draw call has to offer to the shaders.
pub(super) struct BatchInputs<'t, C: Color> {
    pub has_normals: bool,
    pub has_texcoords: bool,
    pub vertex_colors: bool,
    pub texture: Option<&'t Image<C>>,
}

/// Per-call constants shared by every triangle of a draw call.
pub(super) struct Batch<'t, C: Color> {
    flags: ShaderFlags,
    texture: Option<&'t Image<C>>,
    /// Untextured surface color when there are no vertex colors.
    color: RgbF,
    vertex_colors: bool,
    clip_test: bool,
    planes: [ClipPlane; 6],
    bounds: ScreenBounds,
    vp: RasterViewport,
}

impl<C: Color, Z: DepthValue, const ENABLED: u32> Renderer3D<C, Z, ENABLED> {
    pub(super) fn screen_bounds(&self, image_width: i32, image_height: i32) -> ScreenBounds {
        ScreenBounds::new(self.lx, self.ly, self.ox, self.oy, image_width, image_height)
    }

    /// Settle the shader flags for one draw call. Gouraud needs normals or
    /// vertex colors, texturing needs texture coordinates and a texture;
    /// what is missing is switched off. `None` when nothing can be drawn.
    pub(super) fn batch<'t>(&self, target: &RenderTarget<'_, C, Z>, inputs: BatchInputs<'t, C>) -> Option<Batch<'t, C>> {
        if self.lx <= 0 || self.ly <= 0 {
            log::trace!("empty viewport, draw skipped");
            return None;
        }
        let mut flags = self.shaders;
        if inputs.vertex_colors {
            flags = flags.rectified_with(ShaderFlags::GOURAUD);
        } else if flags.is_gouraud() && !inputs.has_normals {
            log::trace!("no normals: Gouraud shading replaced by flat");
            flags.remove(ShaderFlags::GOURAUD);
            flags.insert(ShaderFlags::FLAT);
        }

        let mut texture = None;
        if flags.is_textured() {
            match inputs.texture {
                Some(t) if inputs.has_texcoords && !inputs.vertex_colors => {
                    if !flags.is_clamp() && !t.is_pow2() {
                        log::debug!("texture is not a power of two: clamp addressing instead of wrap");
                        flags.remove(ShaderFlags::TEXTURE_WRAP_POW2);
                        flags.insert(ShaderFlags::TEXTURE_CLAMP);
                    }
                    texture = Some(t);
                }
                _ => {
                    log::trace!("texture or texture coordinates missing: drawing untextured");
                    flags.remove(ShaderFlags::TEXTURE);
                    flags.insert(ShaderFlags::NOTEXTURE);
                }
            }
        }

        flags.remove(ShaderFlags::PROJECTION | ShaderFlags::DEPTH);
        flags.insert(if self.ortho {
            ShaderFlags::ORTHO
        } else {
            ShaderFlags::PERSPECTIVE
        });
        flags.insert(if target.has_zbuffer() {
            ShaderFlags::ZBUFFER
        } else {
            ShaderFlags::NOZBUFFER
        });
        let Some(variant) = flags.resolve(ShaderFlags::from_bits_truncate(ENABLED)) else {
            log::warn!("no compiled-in shader can draw {flags:?}, draw skipped");
            return None;
        };
        let resolved = ShaderFlags::from(variant);
        if !variant.textured {
            texture = None;
        }

        let (w, h) = (target.width() as i32, target.height() as i32);
        Some(Batch {
            flags: resolved,
            texture,
            color: self.material.color,
            vertex_colors: inputs.vertex_colors,
            clip_test: true,
            planes: frustum_planes(self.ortho, self.bound_xy),
            bounds: self.screen_bounds(w, h),
            vp: RasterViewport {
                lx: self.lx,
                ly: self.ly,
                offset_x: self.ox,
                offset_y: self.oy,
                image_width: w,
                image_height: h,
            },
        })
    }

    #[inline]
    pub(super) fn view_vertex(&self, p: Vec3) -> ViewVertex {
        let view = self.to_view(p);
        ViewVertex {
            view,
            clip: self.to_clip(view),
            ..ViewVertex::default()
        }
    }

    #[inline]
    fn transform_normal(&self, n: Vec3) -> Vec3 {
        self.model_view.transform_vector3(n)
    }

    /// Cull, light, project and rasterize one triangle.
    pub(super) fn render_triangle(&self, b: &Batch<'_, C>, target: &mut RenderTarget<'_, C, Z>, tri: [&ViewVertex; 3]) {
        count_call!(triangles_submitted);
        let [v0, v1, v2] = tri;
        let face = (v1.view - v0.view).cross(v2.view - v0.view);
        let cu = if self.ortho { -face.z } else { face.dot(v0.view) };
        if cu * self.culling as f32 > 0.0 {
            count_call!(triangles_culled);
            return;
        }

        let textured = b.flags.is_textured();
        let mut out = tri.map(|v| RasterizerVertex {
            pos: v.clip,
            color: RgbF::BLACK,
            tex: v.tex,
            alpha: 1.0,
        });
        let mut face_color = RgbF::BLACK;
        if b.flags.is_gouraud() {
            // Without culling, back faces are lit from behind.
            let icu = if self.culling != 0 || cu <= 0.0 { 1.0 } else { -1.0 };
            for (o, v) in out.iter_mut().zip(tri) {
                let vd = icu * v.normal.dot(self.light_inorm);
                let vs = icu * v.normal.dot(self.h_inorm);
                o.color = if textured {
                    self.phong.intensity(vd, vs)
                } else {
                    let base = if b.vertex_colors { v.color } else { b.color };
                    self.phong.shade(vd, vs, base)
                };
            }
        } else {
            let icu = if cu > 0.0 { -1.0 } else { 1.0 };
            let n = face.normalize_or_zero() * icu;
            let (vd, vs) = (n.dot(self.r_light), n.dot(self.h));
            face_color = if textured {
                self.phong.intensity(vd, vs)
            } else {
                self.phong.shade(vd, vs, b.color)
            };
        }

        let uniforms = Uniforms {
            face_color,
            texture: b.texture,
            flags: b.flags,
            wa: self.wa,
            wb: self.wb,
        };
        let mut projected = out;
        for v in projected.iter_mut() {
            project_vertex(v, self.ortho);
        }
        if b.clip_test && needs_clipping(self.bound_xy, &projected.map(|v| v.pos)) {
            if discard_triangle(&b.bounds, projected[0].pos, projected[1].pos, projected[2].pos) {
                count_call!(triangles_discarded);
                return;
            }
            count_call!(triangles_clipped);
            let mut emit = |p: &RasterizerVertex, q: &RasterizerVertex, r: &RasterizerVertex| {
                self.rasterize(b, &uniforms, target, [p, q, r]);
            };
            clip_triangle(&b.planes, self.ortho, &out[0], &out[1], &out[2], &mut emit);
            return;
        }
        self.rasterize(b, &uniforms, target, [&projected[0], &projected[1], &projected[2]]);
    }

    #[inline]
    fn rasterize(
        &self,
        b: &Batch<'_, C>,
        uniforms: &Uniforms<'_, C>,
        target: &mut RenderTarget<'_, C, Z>,
        [p0, p1, p2]: [&RasterizerVertex; 3],
    ) {
        count_call!(triangles_rasterized);
        rasterize_triangle::<SUBPIXEL_BITS>(&b.vp, p0, p1, p2, |setup| {
            select_shader::<ENABLED, C, Z>(setup, uniforms, target)
        });
    }

    // ------------------------------------------------------------------
    // Triangles and quads
    // ------------------------------------------------------------------

    /// One triangle with the current material.
    pub fn draw_triangle(&self, target: &mut RenderTarget<'_, C, Z>, vertices: &[Vec3; 3]) {
        self.draw_primitives(target, &PrimitiveBatch::triangles(vertices));
    }

    /// One quad `(0, 1, 2, 3)`, drawn as `(0, 1, 2)` and `(0, 2, 3)`.
    pub fn draw_quad(&self, target: &mut RenderTarget<'_, C, Z>, vertices: &[Vec3; 4]) {
        self.draw_primitives(target, &PrimitiveBatch::quads(vertices));
    }

    /// Draw every face of `batch`. Faces referencing an element past the
    /// end of an array are skipped.
    pub fn draw_primitives(&self, target: &mut RenderTarget<'_, C, Z>, batch: &PrimitiveBatch<'_, C>) {
        count_call!(draw_calls);
        let inputs = BatchInputs {
            has_normals: batch.normals.is_some(),
            has_texcoords: batch.texcoords.is_some(),
            vertex_colors: batch.colors.is_some(),
            texture: batch.texture,
        };
        let Some(b) = self.batch(target, inputs) else {
            return;
        };
        let corners = batch.topology.corners();
        let face_normals = batch.colors.is_some() && batch.normals.is_none();

        for face in 0..batch.face_count() {
            let mut quad = [ViewVertex::default(); 4];
            let mut model = [Vec3::ZERO; 4];
            let mut complete = true;
            for k in 0..corners {
                let slot = face * corners + k;
                let index = match batch.indices {
                    Some(ind) => ind[slot] as usize,
                    None => slot,
                };
                match self.primitive_vertex(batch, index) {
                    Some((p, v)) => {
                        model[k] = p;
                        quad[k] = v;
                    }
                    None => complete = false,
                }
            }
            if !complete {
                count_call!(triangles_discarded);
                continue;
            }
            if face_normals {
                let n = self.transform_normal((model[1] - model[0]).cross(model[2] - model[0]).normalize_or_zero());
                for v in quad.iter_mut() {
                    v.normal = n;
                }
            }
            self.render_triangle(&b, target, [&quad[0], &quad[1], &quad[2]]);
            if batch.topology == Topology::Quads {
                self.render_triangle(&b, target, [&quad[0], &quad[2], &quad[3]]);
            }
        }
    }

    fn primitive_vertex(&self, batch: &PrimitiveBatch<'_, C>, index: usize) -> Option<(Vec3, ViewVertex)> {
        let p = *batch.vertices.get(index)?;
        let mut v = self.view_vertex(p);
        if let Some(n) = batch.normals {
            v.normal = self.transform_normal(*n.get(index)?);
        }
        if let Some(t) = batch.texcoords {
            v.tex = *t.get(index)?;
        }
        if let Some(c) = batch.colors {
            v.color = *c.get(index)?;
        }
        Some((p, v))
    }

    // ------------------------------------------------------------------
    // Meshes
    // ------------------------------------------------------------------

    /// Draw `mesh`, and every mesh linked after it when `draw_chained`.
    ///
    /// With `use_mesh_material` each mesh is lit with its own material;
    /// the renderer's material is restored afterwards.
    pub fn draw_mesh(
        &mut self,
        target: &mut RenderTarget<'_, C, Z>,
        mesh: &Mesh3D<'_, C>,
        use_mesh_material: bool,
        draw_chained: bool,
    ) {
        count_call!(draw_calls);
        perf_scope!("draw_mesh");
        let saved = self.material;
        let limit = if draw_chained { usize::MAX } else { 1 };
        for m in mesh.chain().take(limit) {
            if use_mesh_material {
                self.set_material(m.material);
            }
            self.draw_single_mesh(target, m);
        }
        if use_mesh_material {
            self.set_material(saved);
        }
    }

    fn draw_single_mesh(&self, target: &mut RenderTarget<'_, C, Z>, mesh: &Mesh3D<'_, C>) {
        let inputs = BatchInputs {
            has_normals: mesh.normals.is_some(),
            has_texcoords: mesh.texcoords.is_some(),
            vertex_colors: false,
            texture: mesh.texture.as_deref(),
        };
        let Some(mut b) = self.batch(target, inputs) else {
            return;
        };
        let mvp = self.proj * self.model_view;
        if discard_box(&b.bounds, &mesh.bounding_box, &mvp, self.ortho) {
            count_call!(meshes_skipped);
            log::trace!("mesh {:?} outside the view, skipped", mesh.name);
            return;
        }
        count_call!(meshes_drawn);
        b.clip_test = clip_test_needed(self.bound_xy, &mesh.bounding_box, &mvp, self.ortho);

        let vertices: &[Vec3] = &mesh.vertices;
        let normals = mesh.normals.as_deref();
        let texcoords = mesh.texcoords.as_deref();
        let fetch = |e: FaceVertex| -> Option<ViewVertex> {
            let mut v = self.view_vertex(*vertices.get(e.vertex as usize)?);
            if let Some(n) = normals {
                v.normal = self.transform_normal(*n.get(e.normal as usize)?);
            }
            if let Some(t) = texcoords {
                v.tex = *t.get(e.texcoord as usize)?;
            }
            Some(v)
        };

        // Only the new vertex of each triangle is transformed.
        let mut slots: [Option<ViewVertex>; 3] = [None; 3];
        for event in mesh.face_reader() {
            match event {
                FaceEvent::Start(elements) => slots = elements.map(&fetch),
                FaceEvent::Next { element, hinge } => hinge.advance(&mut slots, fetch(element)),
            }
            match &slots {
                [Some(a), Some(b2), Some(c)] => self.render_triangle(&b, target, [a, b2, c]),
                _ => {
                    count_call!(triangles_discarded);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::color::Rgb24;
    use crate::rendering::framebuffer::PixelBuffer;

    type R = Renderer3D<Rgb24>;

    fn lit(im: &Image<Rgb24>) -> usize {
        im.pixels().iter().filter(|&&p| p != Rgb24::default()).count()
    }

    // Counter-clockwise seen from the default camera.
    const CCW: [Vec3; 3] = [
        Vec3::new(-1.0, -1.0, -5.0),
        Vec3::new(1.0, -1.0, -5.0),
        Vec3::new(0.0, 1.0, -5.0),
    ];

    #[test]
    fn primitive_batch_face_count() {
        let v = [Vec3::ZERO; 8];
        assert_eq!(PrimitiveBatch::<Rgb24>::triangles(&v).face_count(), 2);
        assert_eq!(PrimitiveBatch::<Rgb24>::quads(&v).face_count(), 2);
        let idx = [0u16, 1, 2, 0, 2, 3];
        assert_eq!(PrimitiveBatch::<Rgb24>::triangles(&v).with_indices(&idx).face_count(), 2);
    }

    #[test]
    fn back_faces_are_culled() {
        let r = R::new();
        let mut im = Image::<Rgb24>::new(320, 240).unwrap();
        let cw = [CCW[0], CCW[2], CCW[1]];
        r.draw_triangle(&mut RenderTarget::new(&mut im), &cw);
        assert_eq!(lit(&im), 0);
        r.draw_triangle(&mut RenderTarget::new(&mut im), &CCW);
        assert!(lit(&im) > 100);
    }

    #[test]
    fn missing_texture_falls_back_to_untextured() {
        let mut r = R::new();
        r.set_shaders(ShaderFlags::TEXTURE | ShaderFlags::TEXTURE_BILINEAR);
        assert!(r.shaders().is_textured());
        let mut im = Image::<Rgb24>::new(320, 240).unwrap();
        let tc = [Vec2::ZERO, Vec2::X, Vec2::Y];
        let batch = PrimitiveBatch::triangles(&CCW).with_texcoords(&tc);
        r.draw_primitives(&mut RenderTarget::new(&mut im), &batch);
        assert!(lit(&im) > 100);
    }

    #[test]
    fn out_of_range_indices_skip_the_face() {
        let r = R::new();
        let mut im = Image::<Rgb24>::new(320, 240).unwrap();
        let idx = [0u16, 1, 7];
        let batch = PrimitiveBatch::triangles(&CCW).with_indices(&idx);
        r.draw_primitives(&mut RenderTarget::new(&mut im), &batch);
        assert_eq!(lit(&im), 0);
    }

    #[test]
    fn vertex_colors_tint_the_corners() {
        let mut r = R::new();
        r.set_light(Vec3::NEG_Z, RgbF::WHITE, RgbF::BLACK, RgbF::BLACK);
        r.set_material_ambient_strength(1.0);
        let colors = [RgbF::RED, RgbF::GREEN, RgbF::BLUE];
        let mut im = Image::<Rgb24>::new(320, 240).unwrap();
        let batch = PrimitiveBatch::triangles(&CCW).with_colors(&colors);
        r.draw_primitives(&mut RenderTarget::new(&mut im), &batch);
        let bottom_left = r.world_to_image(Vec3::new(-0.9, -0.95, -5.0));
        let c = im.pixel(bottom_left.x as usize, bottom_left.y as usize).unwrap();
        assert!(c.r > 200 && c.g < 60 && c.b < 60, "{c:?}");
    }
}
