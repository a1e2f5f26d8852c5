/// Interactive viewer
/// Renders a noise terrain mesh, a textured cube and a lit sphere into a
/// window through the CPU pipeline
use anyhow::Context as _;
use glam::{Mat4, Vec2, Vec3};
use microraster::meshing::{FaceChainBuilder, FaceLayout, FaceVertex, Material, Mesh3D};
use microraster::perf::{FrameStats, PIPELINE_COUNTERS};
use microraster::rendering::{
    Image, PixelBuffer, RenderTarget, Renderer3D, Rgb32, RgbF, ShaderFlags, CUBE_FACE_COUNT, MAX_VIEWPORT_DIMENSION,
};
use microraster::OrbitCamera;
use mimalloc::MiMalloc;
use noise::{NoiseFn, Perlin};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const TERRAIN_SIZE: usize = 48;
const TERRAIN_EXTENT: f32 = 8.0;
const TEXTURE_SIZE: usize = 64;
const SKY: Rgb32 = Rgb32::opaque(0x87, 0xCE, 0xEB);
const STATS_EVERY: u64 = 240;

/// Heightfield built as one triangle strip per row.
fn terrain_mesh(perlin: &Perlin) -> anyhow::Result<Mesh3D<'static, Rgb32>> {
    let n = TERRAIN_SIZE;
    let step = TERRAIN_EXTENT / (n - 1) as f32;
    let height = |i: usize, j: usize| perlin.get([i as f64 * 0.08, j as f64 * 0.08]) as f32 * 1.2;

    let mut vertices = Vec::with_capacity(n * n);
    let mut normals = Vec::with_capacity(n * n);
    for row in 0..n {
        for col in 0..n {
            let x = col as f32 * step - TERRAIN_EXTENT / 2.0;
            let z = row as f32 * step - TERRAIN_EXTENT / 2.0;
            vertices.push(Vec3::new(x, height(col, row), z));

            let dx = height((col + 1).min(n - 1), row) - height(col.saturating_sub(1), row);
            let dz = height(col, (row + 1).min(n - 1)) - height(col, row.saturating_sub(1));
            normals.push(Vec3::new(-dx, 2.0 * step, -dz).normalize());
        }
    }

    let layout = FaceLayout {
        texcoords: false,
        normals: true,
    };
    let mut builder = FaceChainBuilder::new(layout);
    let element = |row: usize, col: usize| {
        let i = (row * n + col) as u16;
        FaceVertex::new(i, 0, i)
    };
    for row in 0..n - 1 {
        let strip: Vec<FaceVertex> = (0..n)
            .flat_map(|col| [element(row, col), element(row + 1, col)])
            .collect();
        builder.strip(&strip)?;
    }

    let mesh = Mesh3D::new(vertices, builder.finish())
        .with_normals(normals)
        .with_material(Material {
            color: RgbF::new(0.35, 0.6, 0.3),
            specular: 0.1,
            ..Material::default()
        })
        .with_name("terrain")
        .with_computed_bounds();
    mesh.validate().context("terrain mesh")?;
    Ok(mesh)
}

fn noise_texture(perlin: &Perlin) -> anyhow::Result<Image<Rgb32>> {
    let image = Image::from_fn(TEXTURE_SIZE, TEXTURE_SIZE, |x, y| {
        let v = perlin.get([x as f64 * 0.15, y as f64 * 0.15, 0.5]) * 0.5 + 0.5;
        let v = (v.clamp(0.0, 1.0) * 255.0) as u8;
        Rgb32::opaque(v, v / 2 + 64, 255 - v)
    })?;
    Ok(image)
}

struct Scene {
    renderer: Renderer3D<Rgb32>,
    image: Image<Rgb32>,
    zbuffer: Vec<f32>,
    terrain: Mesh3D<'static, Rgb32>,
    texture: Image<Rgb32>,
    camera: OrbitCamera,
    angle: f32,
}

impl Scene {
    fn new(width: u32, height: u32) -> anyhow::Result<Self> {
        let perlin = Perlin::new(7);
        let mut scene = Scene {
            renderer: Renderer3D::new(),
            image: Image::new(1, 1)?,
            zbuffer: Vec::new(),
            terrain: terrain_mesh(&perlin)?,
            texture: noise_texture(&perlin)?,
            camera: OrbitCamera::new(Vec3::ZERO, 9.0),
            angle: 0.0,
        };
        scene.camera.pitch = 0.45;
        scene.renderer.set_light_direction(Vec3::new(-1.0, -2.0, -1.0));
        scene.renderer.set_shaders(ShaderFlags::GOURAUD | ShaderFlags::TEXTURE_BILINEAR);
        scene.resize(width, height)?;
        Ok(scene)
    }

    /// Image size follows the window, capped at what the rasterizer handles.
    fn resize(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        let w = (width as usize).clamp(1, MAX_VIEWPORT_DIMENSION as usize);
        let h = (height as usize).clamp(1, MAX_VIEWPORT_DIMENSION as usize);
        self.image = Image::new(w, h)?;
        self.zbuffer = vec![0.0; w * h];
        self.renderer.set_viewport_size(w as i32, h as i32);
        if self.renderer.is_ortho() {
            self.renderer.use_orthographic()?;
        } else {
            self.renderer.use_perspective()?;
        }
        Ok(())
    }

    fn toggle_projection(&mut self) -> anyhow::Result<()> {
        if self.renderer.is_ortho() {
            self.renderer.use_perspective()?;
        } else {
            let ar = self.renderer.aspect_ratio();
            self.renderer.set_ortho(-6.0 * ar, 6.0 * ar, -6.0, 6.0, 1.0, 100.0)?;
        }
        Ok(())
    }

    fn toggle_shading(&mut self) {
        let flags = self.renderer.shaders();
        let shading = if flags.is_gouraud() {
            ShaderFlags::FLAT
        } else {
            ShaderFlags::GOURAUD
        };
        // Keep texturing as it is.
        let texture_bits = flags & (ShaderFlags::TEXTURE | ShaderFlags::TEXTURE_QUALITY | ShaderFlags::TEXTURE_MODE);
        self.renderer.set_shaders(shading | texture_bits);
        log::info!("shading: {:?}", self.renderer.shaders() & ShaderFlags::SHADING);
    }

    fn toggle_filtering(&mut self) {
        let quality = if self.renderer.shaders().is_bilinear() {
            ShaderFlags::TEXTURE_NEAREST
        } else {
            ShaderFlags::TEXTURE_BILINEAR
        };
        self.renderer.set_texture_quality(quality);
        log::info!("texture filtering: {quality:?}");
    }

    fn cycle_culling(&mut self) {
        let next = match self.renderer.culling() {
            1 => 0,
            0 => -1,
            _ => 1,
        };
        self.renderer.set_culling(next);
        log::info!("culling: {next}");
    }

    fn draw(&mut self, dt: f32) -> anyhow::Result<()> {
        self.angle = (self.angle + dt * 40.0) % 360.0;
        self.renderer.set_view_matrix(self.camera.view_matrix());

        let mut target = RenderTarget::with_zbuffer(&mut self.image, &mut self.zbuffer)?;
        target.clear(SKY);
        target.clear_zbuffer();

        self.renderer.set_model_matrix(Mat4::from_translation(Vec3::new(0.0, -1.5, 0.0)));
        self.renderer.draw_mesh(&mut target, &self.terrain, true, false);

        self.renderer.set_material_color(RgbF::WHITE);
        self.renderer
            .set_model_pos_scale_rot(Vec3::new(-1.8, 0.5, 0.0), Vec3::splat(0.7), self.angle, Vec3::new(0.3, 1.0, 0.2));
        self.renderer.draw_cube(&mut target, Some([&self.texture; CUBE_FACE_COUNT]));

        self.renderer.set_material_color(RgbF::new(0.9, 0.3, 0.2));
        self.renderer
            .set_model_pos_scale_rot(Vec3::new(1.8, 0.6, 0.0), Vec3::splat(0.9), self.angle, Vec3::Y);
        self.renderer.draw_adaptive_sphere(&mut target, 1.0, None);
        Ok(())
    }

    fn present(&self, out: &mut [u32], width: usize) {
        let w = self.image.width().min(width);
        for (dst, src) in out.chunks_mut(width).zip(self.image.pixels().chunks(self.image.stride())) {
            for (d, s) in dst[..w].iter_mut().zip(&src[..w]) {
                *d = s.to_xrgb();
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== microraster viewer ===");
    println!("Controls:");
    println!("  Mouse drag - Orbit");
    println!("  Wheel      - Zoom");
    println!("  G          - Flat / Gouraud shading");
    println!("  B          - Nearest / bilinear texture filtering");
    println!("  P          - Perspective / orthographic");
    println!("  C          - Cycle culling");
    println!("  ESC        - Exit");
    println!();

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("microraster")
            .with_inner_size(winit::dpi::LogicalSize::new(960, 720))
            .build(&event_loop)?,
    );

    let context = softbuffer::Context::new(window.clone()).map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut surface = softbuffer::Surface::new(&context, window.clone()).map_err(|e| anyhow::anyhow!("{e}"))?;

    let size = window.inner_size();
    let mut scene = Scene::new(size.width, size.height)?;

    let mut stats = FrameStats::new();
    let mut last_frame = Instant::now();
    let mut dragging = false;
    let mut last_mouse_pos: Option<(f64, f64)> = None;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(new_size) => {
                    if let Err(e) = scene.resize(new_size.width, new_size.height) {
                        log::error!("resize failed: {e:#}");
                        elwt.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state != ElementState::Pressed {
                        return;
                    }
                    if let PhysicalKey::Code(keycode) = event.physical_key {
                        match keycode {
                            KeyCode::KeyG => scene.toggle_shading(),
                            KeyCode::KeyB => scene.toggle_filtering(),
                            KeyCode::KeyC => scene.cycle_culling(),
                            KeyCode::KeyP => {
                                if let Err(e) = scene.toggle_projection() {
                                    log::warn!("projection unchanged: {e}");
                                }
                            }
                            KeyCode::Escape => elwt.exit(),
                            _ => {}
                        }
                    }
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    if button == MouseButton::Left {
                        dragging = state == ElementState::Pressed;
                        last_mouse_pos = None;
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    if dragging {
                        if let Some((x, y)) = last_mouse_pos {
                            scene.camera.rotate((position.x - x) as f32, (position.y - y) as f32);
                        }
                        last_mouse_pos = Some((position.x, position.y));
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let steps = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
                    };
                    scene.camera.zoom(steps);
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let dt = (now - last_frame).as_secs_f32();
                    last_frame = now;

                    let size = window.inner_size();
                    let (Some(w), Some(h)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) else {
                        return;
                    };

                    let draw_start = Instant::now();
                    if let Err(e) = scene.draw(dt) {
                        log::error!("draw failed: {e:#}");
                        elwt.exit();
                        return;
                    }
                    let draw_time = draw_start.elapsed();

                    let present_start = Instant::now();
                    if let Err(e) = surface.resize(w, h) {
                        log::error!("surface resize failed: {e}");
                        return;
                    }
                    let mut buffer = match surface.buffer_mut() {
                        Ok(b) => b,
                        Err(e) => {
                            log::error!("surface buffer unavailable: {e}");
                            return;
                        }
                    };
                    buffer.fill(0);
                    scene.present(&mut buffer, size.width as usize);
                    if let Err(e) = buffer.present() {
                        log::error!("present failed: {e}");
                    }
                    stats.record(Default::default(), draw_time, present_start.elapsed());

                    if stats.frames % STATS_EVERY == 0 {
                        stats.log_summary();
                        PIPELINE_COUNTERS.snapshot().log_report();
                        PIPELINE_COUNTERS.reset();
                        stats = FrameStats::new();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => window.request_redraw(),
            _ => {}
        }
    })?;
    Ok(())
}
