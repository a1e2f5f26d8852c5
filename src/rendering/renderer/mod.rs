/// The 3D renderer: camera, light and material state plus the draw calls.
///
/// A `Renderer3D` is a configuration object. It owns no pixel memory and has
/// no notion of a frame: every draw call borrows a [`RenderTarget`] for its
/// duration, and clearing the z-buffer between frames is up to the caller.
/// Setters eagerly refresh the derived state (model-view matrix, light and
/// half vectors in view space, scaled light colors, depth mapping) so the
/// draw path never sees stale values.
///
/// The const parameter `ENABLED` is the set of shader variants compiled in
/// (a [`ShaderFlags`] bit set). Variants outside it fall back at draw time.
mod draw;
mod points;
mod primitives;

pub use draw::{PrimitiveBatch, Topology};
pub use points::PointBatch;
pub use primitives::{CUBE_FACE_COUNT, MAX_SPHERE_SECTORS, MIN_SPHERE_SECTORS};

use crate::camera::{self, Box3};
use crate::error::RenderError;
use crate::meshing::Material;
use crate::rendering::clipping::clip_bound_xy;
use crate::rendering::color::{Color, RgbF};
use crate::rendering::framebuffer::DepthValue;
use crate::rendering::lighting::{PhongModel, SpecularTable};
use crate::rendering::rasterizer::{max_viewport_dimension, DEFAULT_SUBPIXEL_BITS};
use crate::rendering::shader_flags::{ShaderFlags, SHADERS_ALL};
use glam::{IVec2, Mat4, Vec3, Vec4};
use std::marker::PhantomData;

/// Sub-pixel precision used by the renderer's rasterizer calls.
pub const SUBPIXEL_BITS: u32 = DEFAULT_SUBPIXEL_BITS;

/// Largest viewport side (and offset) the renderer accepts.
pub const MAX_VIEWPORT_DIMENSION: i32 = max_viewport_dimension(SUBPIXEL_BITS);

/// Initial state of a [`Renderer3D`].
#[derive(Clone, Debug, PartialEq)]
pub struct RendererConfig {
    pub width: i32,
    pub height: i32,
    pub offset_x: i32,
    pub offset_y: i32,
    /// Start in orthographic mode with the default ortho box instead of
    /// the default perspective.
    pub orthographic: bool,
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
    pub light_direction: Vec3,
    pub light_ambient: RgbF,
    pub light_diffuse: RgbF,
    pub light_specular: RgbF,
    pub material: Material,
    /// +1 draws counter-clockwise faces, -1 clockwise ones, 0 both.
    pub culling: i32,
    /// Shading and texturing bits; projection and depth bits are ignored.
    pub shaders: ShaderFlags,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            width: 320,
            height: 240,
            offset_x: 0,
            offset_y: 0,
            orthographic: false,
            eye: Vec3::ZERO,
            center: Vec3::NEG_Z,
            up: Vec3::Y,
            light_direction: Vec3::new(-1.0, -1.0, -1.0),
            light_ambient: RgbF::WHITE,
            light_diffuse: RgbF::WHITE,
            light_specular: RgbF::WHITE,
            material: Material::default(),
            culling: 1,
            shaders: ShaderFlags::FLAT
                | ShaderFlags::NOTEXTURE
                | ShaderFlags::TEXTURE_NEAREST
                | ShaderFlags::TEXTURE_CLAMP,
        }
    }
}

/// Renders meshes and primitives into images of pixel type `C` with a
/// z-buffer of type `Z`.
#[derive(Clone, Debug)]
pub struct Renderer3D<C: Color, Z: DepthValue = f32, const ENABLED: u32 = SHADERS_ALL> {
    lx: i32,
    ly: i32,
    ox: i32,
    oy: i32,
    bound_xy: f32,

    ortho: bool,
    /// Projection with the Y axis flipped so image rows grow downwards.
    proj: Mat4,
    view: Mat4,
    model: Mat4,
    model_view: Mat4,
    wa: f32,
    wb: f32,

    light: Vec3,
    /// Direction towards the light, view space.
    r_light: Vec3,
    /// Half vector between the light and the viewer, view space.
    h: Vec3,
    /// `r_light` and `h` divided by the model-view scale, for normals that
    /// are transformed but not renormalized.
    light_inorm: Vec3,
    h_inorm: Vec3,
    light_ambient: RgbF,
    light_diffuse: RgbF,
    light_specular: RgbF,
    material: Material,
    phong: PhongModel,

    culling: i32,
    shaders: ShaderFlags,
    _pixels: PhantomData<fn() -> (C, Z)>,
}

impl<C: Color, Z: DepthValue, const ENABLED: u32> Default for Renderer3D<C, Z, ENABLED> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Color, Z: DepthValue, const ENABLED: u32> Renderer3D<C, Z, ENABLED> {
    /// Renderer with [`RendererConfig::default`].
    pub fn new() -> Self {
        let mut r = Self::blank();
        r.apply(&RendererConfig::default());
        r
    }

    /// Renderer with an explicit configuration. Fails when the viewport is
    /// out of range or the requested shading is not compiled in.
    pub fn with_config(config: &RendererConfig) -> Result<Self, RenderError> {
        let max = MAX_VIEWPORT_DIMENSION;
        if !(1..=max).contains(&config.width) || !(1..=max).contains(&config.height) {
            return Err(RenderError::InvalidViewport {
                width: config.width,
                height: config.height,
                max,
            });
        }
        let projection = if config.orthographic {
            ShaderFlags::ORTHO
        } else {
            ShaderFlags::PERSPECTIVE
        };
        if !Self::enabled().contains(projection) {
            return Err(RenderError::ShaderNotEnabled(if config.orthographic {
                "ORTHO"
            } else {
                "PERSPECTIVE"
            }));
        }
        let mut r = Self::blank();
        r.apply(config);
        r.check_shaders()?;
        Ok(r)
    }

    fn blank() -> Self {
        Renderer3D {
            lx: 0,
            ly: 0,
            ox: 0,
            oy: 0,
            bound_xy: 1.0,
            ortho: false,
            proj: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            model: Mat4::IDENTITY,
            model_view: Mat4::IDENTITY,
            wa: 1.0,
            wb: 0.0,
            light: Vec3::NEG_ONE,
            r_light: Vec3::Z,
            h: Vec3::Z,
            light_inorm: Vec3::Z,
            h_inorm: Vec3::Z,
            light_ambient: RgbF::WHITE,
            light_diffuse: RgbF::WHITE,
            light_specular: RgbF::WHITE,
            material: Material::default(),
            phong: PhongModel {
                ambient: RgbF::BLACK,
                diffuse: RgbF::BLACK,
                specular: RgbF::BLACK,
                table: SpecularTable::default(),
            },
            culling: 1,
            shaders: ShaderFlags::FLAT | ShaderFlags::NOTEXTURE,
            _pixels: PhantomData,
        }
    }

    fn apply(&mut self, c: &RendererConfig) {
        self.set_viewport_size(c.width, c.height);
        self.set_offset(c.offset_x, c.offset_y);
        if c.orthographic {
            let ar = self.aspect_ratio();
            self.load_ortho(-10.0 * ar, 10.0 * ar, -10.0, 10.0, 1.0, 100.0);
        } else {
            let ar = self.aspect_ratio();
            self.load_perspective(camera::perspective(45.0, ar, 1.0, 100.0));
        }
        self.set_look_at(c.eye, c.center, c.up);
        self.light_ambient = c.light_ambient;
        self.light_diffuse = c.light_diffuse;
        self.light_specular = c.light_specular;
        self.material = clamp_material(c.material);
        self.set_light_direction(c.light_direction);
        self.refresh_phong();
        self.set_culling(c.culling);
        self.shaders = normalized_shaders(c.shaders);
    }

    #[inline]
    fn enabled() -> ShaderFlags {
        ShaderFlags::from_bits_truncate(ENABLED)
    }

    /// `lx / ly`, or 1.5 when the viewport is empty.
    pub fn aspect_ratio(&self) -> f32 {
        if self.lx > 0 && self.ly > 0 {
            self.lx as f32 / self.ly as f32
        } else {
            1.5
        }
    }

    // ------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------

    /// Size of the logical viewport, clamped to `[0, MAX_VIEWPORT_DIMENSION]`.
    /// Images rendered into may be smaller (see [`set_offset`](Self::set_offset)).
    pub fn set_viewport_size(&mut self, lx: i32, ly: i32) {
        let (cx, cy) = (
            lx.clamp(0, MAX_VIEWPORT_DIMENSION),
            ly.clamp(0, MAX_VIEWPORT_DIMENSION),
        );
        if (cx, cy) != (lx, ly) {
            log::warn!("viewport {lx}x{ly} clamped to {cx}x{cy}");
        }
        self.lx = cx;
        self.ly = cy;
        self.bound_xy = clip_bound_xy(cx, cy, MAX_VIEWPORT_DIMENSION);
    }

    pub fn viewport_size(&self) -> (i32, i32) {
        (self.lx, self.ly)
    }

    /// Position of the destination image inside the viewport, for tiled
    /// rendering. Clamped to `[0, MAX_VIEWPORT_DIMENSION]`.
    pub fn set_offset(&mut self, ox: i32, oy: i32) {
        self.ox = ox.clamp(0, MAX_VIEWPORT_DIMENSION);
        self.oy = oy.clamp(0, MAX_VIEWPORT_DIMENSION);
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.ox, self.oy)
    }

    // ------------------------------------------------------------------
    // Projection
    // ------------------------------------------------------------------

    pub fn is_ortho(&self) -> bool {
        self.ortho
    }

    fn require(&self, flag: ShaderFlags, name: &'static str) -> Result<(), RenderError> {
        if Self::enabled().contains(flag) {
            Ok(())
        } else {
            log::warn!("projection switch rejected: {name} shaders are not compiled in");
            Err(RenderError::ShaderNotEnabled(name))
        }
    }

    /// Replace the projection matrix, keeping the current mode.
    pub fn set_projection_matrix(&mut self, m: Mat4) {
        self.proj = camera::invert_y_axis(m);
        self.refresh_depth_mapping();
    }

    /// The projection as set by the caller (without the Y flip).
    pub fn projection_matrix(&self) -> Mat4 {
        camera::invert_y_axis(self.proj)
    }

    /// Perspective projection from a `glFrustum` box.
    pub fn set_frustum(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) -> Result<(), RenderError> {
        self.require(ShaderFlags::PERSPECTIVE, "PERSPECTIVE")?;
        self.load_perspective(camera::frustum(left, right, bottom, top, near, far));
        Ok(())
    }

    /// Perspective projection, `fovy` in degrees.
    pub fn set_perspective(&mut self, fovy: f32, aspect: f32, near: f32, far: f32) -> Result<(), RenderError> {
        self.require(ShaderFlags::PERSPECTIVE, "PERSPECTIVE")?;
        self.load_perspective(camera::perspective(fovy, aspect, near, far));
        Ok(())
    }

    /// Orthographic projection from a `glOrtho` box.
    pub fn set_ortho(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) -> Result<(), RenderError> {
        self.require(ShaderFlags::ORTHO, "ORTHO")?;
        self.load_ortho(left, right, bottom, top, near, far);
        Ok(())
    }

    /// Switch to the default perspective (45°, viewport aspect, near 1,
    /// far 100).
    pub fn use_perspective(&mut self) -> Result<(), RenderError> {
        let ar = self.aspect_ratio();
        self.set_perspective(45.0, ar, 1.0, 100.0)
    }

    /// Switch to the default orthographic box
    /// `(-10*aspect, 10*aspect, -10, 10, 1, 100)`.
    pub fn use_orthographic(&mut self) -> Result<(), RenderError> {
        let ar = self.aspect_ratio();
        self.set_ortho(-10.0 * ar, 10.0 * ar, -10.0, 10.0, 1.0, 100.0)
    }

    fn load_perspective(&mut self, m: Mat4) {
        self.ortho = false;
        self.set_projection_matrix(m);
    }

    fn load_ortho(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) {
        self.ortho = true;
        self.set_projection_matrix(camera::ortho(left, right, bottom, top, near, far));
    }

    fn refresh_depth_mapping(&mut self) {
        (self.wa, self.wb) = if !Z::QUANTIZED {
            (1.0, 0.0)
        } else if self.ortho {
            (32767.4, 0.0)
        } else {
            let p = self.proj.to_cols_array();
            (-32768.0 * p[14], 32768.0 * (p[10] + 1.0))
        };
    }

    /// Slope of the depth mapping `stored = wa * w + wb`.
    pub fn wa(&self) -> f32 {
        self.wa
    }

    /// Offset of the depth mapping `stored = wa * w + wb`.
    pub fn wb(&self) -> f32 {
        self.wb
    }

    // ------------------------------------------------------------------
    // View and model
    // ------------------------------------------------------------------

    pub fn set_view_matrix(&mut self, m: Mat4) {
        self.view = m;
        self.refresh_model_view();
        self.refresh_light();
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// `gluLookAt`.
    pub fn set_look_at(&mut self, eye: Vec3, center: Vec3, up: Vec3) {
        self.set_view_matrix(camera::look_at(eye, center, up));
    }

    pub fn set_model_matrix(&mut self, m: Mat4) {
        self.model = m;
        self.refresh_model_view();
        self.refresh_light();
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.model
    }

    /// Model matrix that scales, then rotates `angle` degrees about
    /// `axis`, then translates to `position`.
    pub fn set_model_pos_scale_rot(&mut self, position: Vec3, scale: Vec3, angle: f32, axis: Vec3) {
        let m = Mat4::from_translation(position) * camera::rotation(angle, axis) * Mat4::from_scale(scale);
        self.set_model_matrix(m);
    }

    fn refresh_model_view(&mut self) {
        self.model_view = self.view * self.model;
    }

    // ------------------------------------------------------------------
    // Light
    // ------------------------------------------------------------------

    /// Direction the light travels in, world space.
    pub fn set_light_direction(&mut self, direction: Vec3) {
        self.light = direction;
        self.refresh_light();
    }

    pub fn light_direction(&self) -> Vec3 {
        self.light
    }

    pub fn set_light_ambient(&mut self, color: RgbF) {
        self.light_ambient = color;
        self.refresh_phong();
    }

    pub fn set_light_diffuse(&mut self, color: RgbF) {
        self.light_diffuse = color;
        self.refresh_phong();
    }

    pub fn set_light_specular(&mut self, color: RgbF) {
        self.light_specular = color;
        self.refresh_phong();
    }

    /// Direction and the three light colors at once.
    pub fn set_light(&mut self, direction: Vec3, ambient: RgbF, diffuse: RgbF, specular: RgbF) {
        self.light_ambient = ambient;
        self.light_diffuse = diffuse;
        self.light_specular = specular;
        self.refresh_phong();
        self.set_light_direction(direction);
    }

    fn refresh_light(&mut self) {
        self.r_light = -self.view.transform_vector3(self.light).normalize_or_zero();
        self.h = (Vec3::Z + self.r_light).normalize_or_zero();
        let scale = self.model_view.transform_vector3(Vec3::Z).length();
        let inorm = if scale > 0.0 { 1.0 / scale } else { 1.0 };
        self.light_inorm = self.r_light * inorm;
        self.h_inorm = self.h * inorm;
    }

    // ------------------------------------------------------------------
    // Material
    // ------------------------------------------------------------------

    /// Strengths are clamped to `[0, 10]`, the exponent to `[0, 100]`.
    pub fn set_material(&mut self, material: Material) {
        self.material = clamp_material(material);
        self.refresh_phong();
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn set_material_color(&mut self, color: RgbF) {
        self.material.color = color;
    }

    pub fn set_material_ambient_strength(&mut self, strength: f32) {
        self.set_material(Material {
            ambient: strength,
            ..self.material
        });
    }

    pub fn set_material_diffuse_strength(&mut self, strength: f32) {
        self.set_material(Material {
            diffuse: strength,
            ..self.material
        });
    }

    pub fn set_material_specular_strength(&mut self, strength: f32) {
        self.set_material(Material {
            specular: strength,
            ..self.material
        });
    }

    pub fn set_material_specular_exponent(&mut self, exponent: i32) {
        self.set_material(Material {
            exponent,
            ..self.material
        });
    }

    fn refresh_phong(&mut self) {
        let m = &self.material;
        self.phong.ambient = self.light_ambient * m.ambient;
        self.phong.diffuse = self.light_diffuse * m.diffuse;
        self.phong.specular = self.light_specular * m.specular;
        if self.phong.table.update(m.exponent) {
            crate::count_call!(specular_table_rebuilds);
        }
    }

    // ------------------------------------------------------------------
    // Culling and shaders
    // ------------------------------------------------------------------

    /// Only the sign of `direction` matters; 0 disables culling.
    pub fn set_culling(&mut self, direction: i32) {
        self.culling = direction.signum();
    }

    pub fn culling(&self) -> i32 {
        self.culling
    }

    /// Request flat or Gouraud shading and texturing options. Exclusive
    /// bits replace the current ones; without any texture bit texturing is
    /// switched off. Projection and depth bits are ignored: they follow
    /// the projection mode and the render target.
    pub fn set_shaders(&mut self, request: ShaderFlags) {
        self.shaders = self.shaders.rectified_with(request);
        if let Err(e) = self.check_shaders() {
            log::warn!("{e}: draws will fall back or be skipped");
        }
    }

    pub fn shaders(&self) -> ShaderFlags {
        self.shaders
    }

    /// `TEXTURE_WRAP_POW2` or `TEXTURE_CLAMP`; other bits are ignored.
    /// Does not turn texturing on.
    pub fn set_texture_wrapping_mode(&mut self, mode: ShaderFlags) {
        self.set_texture_option(mode, ShaderFlags::TEXTURE_MODE);
    }

    /// `TEXTURE_NEAREST` or `TEXTURE_BILINEAR`; other bits are ignored.
    /// Does not turn texturing on.
    pub fn set_texture_quality(&mut self, quality: ShaderFlags) {
        self.set_texture_option(quality, ShaderFlags::TEXTURE_QUALITY);
    }

    fn set_texture_option(&mut self, request: ShaderFlags, axis: ShaderFlags) {
        let request = request & axis;
        if request.is_empty() {
            return;
        }
        let enabled = Self::enabled() & axis;
        let pick = if enabled.contains(request) {
            request
        } else if !enabled.is_empty() {
            let fallback = enabled.iter().next().unwrap_or(request);
            log::debug!("{request:?} not compiled in, using {fallback:?}");
            fallback
        } else {
            request
        };
        let mut out = self.shaders;
        out.remove(axis);
        out.insert(pick);
        self.shaders = out;
    }

    /// Check that some compiled-in variant can serve the current shading
    /// request in both depth modes.
    pub fn check_shaders(&self) -> Result<(), RenderError> {
        let projection = if self.ortho {
            ShaderFlags::ORTHO
        } else {
            ShaderFlags::PERSPECTIVE
        };
        for depth in [ShaderFlags::ZBUFFER, ShaderFlags::NOZBUFFER] {
            let request = self.shaders | projection | depth;
            let Some(v) = request.resolve(Self::enabled()) else {
                return Err(RenderError::ShaderNotEnabled(missing_axis(request, Self::enabled())));
            };
            if v.gouraud != self.shaders.is_gouraud() || v.textured != self.shaders.is_textured() {
                log::debug!("shading {:?} resolves to {:?}", self.shaders, v);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Coordinate helpers
    // ------------------------------------------------------------------

    fn project(&self, m: Mat4, p: Vec3) -> Vec3 {
        let q = m * p.extend(1.0);
        if self.ortho || q.w == 0.0 {
            q.truncate()
        } else {
            q.truncate() / q.w
        }
    }

    /// World position to normalized device coordinates (Y pointing down
    /// the image).
    pub fn world_to_ndc(&self, p: Vec3) -> Vec3 {
        self.project(self.proj * self.view, p)
    }

    /// Model position to normalized device coordinates.
    pub fn model_to_ndc(&self, p: Vec3) -> Vec3 {
        self.project(self.proj * self.model_view, p)
    }

    fn ndc_to_image(&self, ndc: Vec3) -> IVec2 {
        IVec2::new(
            (((ndc.x + 1.0) * self.lx as f32) / 2.0 - self.ox as f32).round() as i32,
            (((ndc.y + 1.0) * self.ly as f32) / 2.0 - self.oy as f32).round() as i32,
        )
    }

    /// Pixel of the destination image a world position lands on.
    pub fn world_to_image(&self, p: Vec3) -> IVec2 {
        self.ndc_to_image(self.world_to_ndc(p))
    }

    /// Pixel of the destination image a model position lands on.
    pub fn model_to_image(&self, p: Vec3) -> IVec2 {
        self.ndc_to_image(self.model_to_ndc(p))
    }

    /// Does `bbox` (model space) possibly cover part of an
    /// `image_width x image_height` destination?
    pub fn box_visible(&self, bbox: &Box3, image_width: i32, image_height: i32) -> bool {
        let bounds = self.screen_bounds(image_width, image_height);
        !crate::rendering::clipping::discard_box(&bounds, bbox, &(self.proj * self.model_view), self.ortho)
    }

    /// Model position to view space.
    fn to_view(&self, p: Vec3) -> Vec3 {
        self.model_view.transform_point3(p)
    }

    fn to_clip(&self, view: Vec3) -> Vec4 {
        self.proj * view.extend(1.0)
    }
}

/// One bit per shading and texturing axis, defaulting to flat, untextured,
/// nearest and clamp.
fn normalized_shaders(f: ShaderFlags) -> ShaderFlags {
    let pick = |yes: ShaderFlags, no: ShaderFlags| if f.contains(yes) { yes } else { no };
    pick(ShaderFlags::GOURAUD, ShaderFlags::FLAT)
        | pick(ShaderFlags::TEXTURE, ShaderFlags::NOTEXTURE)
        | pick(ShaderFlags::TEXTURE_BILINEAR, ShaderFlags::TEXTURE_NEAREST)
        | pick(ShaderFlags::TEXTURE_WRAP_POW2, ShaderFlags::TEXTURE_CLAMP)
}

fn clamp_material(m: Material) -> Material {
    Material {
        color: m.color,
        ambient: m.ambient.clamp(0.0, 10.0),
        diffuse: m.diffuse.clamp(0.0, 10.0),
        specular: m.specular.clamp(0.0, 10.0),
        exponent: m.exponent.clamp(0, 100),
    }
}

/// Name of the first axis of `request` with neither the requested variant
/// nor its fallback compiled in.
fn missing_axis(request: ShaderFlags, enabled: ShaderFlags) -> &'static str {
    let axes: [(ShaderFlags, &'static str); 6] = [
        (ShaderFlags::DEPTH, "DEPTH"),
        (ShaderFlags::PROJECTION, "PROJECTION"),
        (ShaderFlags::TEXTURING, "TEXTURING"),
        (ShaderFlags::SHADING, "SHADING"),
        (ShaderFlags::TEXTURE_QUALITY, "TEXTURE_QUALITY"),
        (ShaderFlags::TEXTURE_MODE, "TEXTURE_MODE"),
    ];
    for (axis, name) in axes {
        let wanted = request & axis;
        if !wanted.is_empty() && !enabled.intersects(axis) {
            return name;
        }
    }
    "UNKNOWN"
}
