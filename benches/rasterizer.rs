/// Benchmarks for the fixed-point triangle rasterizer and the per-pixel
/// shaders behind it.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Vec2, Vec3, Vec4};
use microraster::rendering::rasterizer::{rasterize_triangle, RasterViewport, RasterizerVertex};
use microraster::rendering::{Image, PrimitiveBatch, RenderTarget, Renderer3D, Rgb32, ShaderFlags, SUBPIXEL_BITS};

const WIDTH: usize = 1280;
const HEIGHT: usize = 720;

fn vertex(x: f32, y: f32) -> RasterizerVertex {
    RasterizerVertex {
        pos: Vec4::new(x, y, 0.5, 1.0),
        ..Default::default()
    }
}

/// Coverage only: how fast edge functions are set up and walked.
fn bench_triangle_coverage(c: &mut Criterion) {
    let vp = RasterViewport {
        lx: WIDTH as i32,
        ly: HEIGHT as i32,
        offset_x: 0,
        offset_y: 0,
        image_width: WIDTH as i32,
        image_height: HEIGHT as i32,
    };

    let mut group = c.benchmark_group("triangle_coverage");
    for size in [0.01f32, 0.1, 0.5, 1.5] {
        let (a, b, v) = (vertex(-size, -size), vertex(size, -size * 0.7), vertex(0.1 * size, size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            bench.iter(|| {
                let mut count = 0u32;
                rasterize_triangle::<SUBPIXEL_BITS>(&vp, black_box(&a), black_box(&b), black_box(&v), |setup| {
                    setup.for_each_pixel(|_, _| count += 1);
                });
                black_box(count)
            });
        });
    }
    group.finish();
}

fn checker(size: usize) -> Image<Rgb32> {
    Image::from_fn(size, size, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgb32::opaque(230, 230, 230)
        } else {
            Rgb32::opaque(40, 90, 160)
        }
    })
    .expect("valid texture size")
}

/// One large triangle through the full pipeline with each shading mode.
fn bench_shaded_triangle(c: &mut Criterion) {
    let texture = checker(128);
    let vertices = [Vec3::new(-3.0, -2.0, -5.0), Vec3::new(3.0, -2.0, -6.0), Vec3::new(0.0, 2.5, -5.5)];
    let normals = [Vec3::new(-0.3, 0.0, 1.0), Vec3::new(0.3, 0.0, 1.0), Vec3::new(0.0, 0.4, 1.0)];
    let texcoords = [Vec2::new(0.0, 1.0), Vec2::new(2.0, 1.0), Vec2::new(1.0, -0.5)];

    let mut image = Image::<Rgb32>::new(WIDTH, HEIGHT).expect("valid image size");
    let mut zbuffer = vec![0.0f32; WIDTH * HEIGHT];

    let modes = [
        ("flat", ShaderFlags::FLAT),
        ("gouraud", ShaderFlags::GOURAUD),
        ("flat_texture_nearest", ShaderFlags::FLAT | ShaderFlags::TEXTURE | ShaderFlags::TEXTURE_NEAREST),
        ("gouraud_texture_bilinear", ShaderFlags::GOURAUD | ShaderFlags::TEXTURE | ShaderFlags::TEXTURE_BILINEAR),
    ];

    let mut group = c.benchmark_group("shaded_triangle");
    for (name, shaders) in modes {
        let mut renderer = Renderer3D::<Rgb32>::new();
        renderer.set_viewport_size(WIDTH as i32, HEIGHT as i32);
        renderer.set_shaders(shaders | ShaderFlags::TEXTURE_WRAP_POW2);
        renderer.set_culling(0);
        let batch = PrimitiveBatch::triangles(&vertices)
            .with_normals(&normals)
            .with_texcoords(&texcoords)
            .with_texture(&texture);

        group.bench_function(name, |b| {
            b.iter(|| {
                zbuffer.fill(0.0);
                let mut target = RenderTarget::with_zbuffer(&mut image, &mut zbuffer).expect("matching zbuffer");
                renderer.draw_primitives(&mut target, black_box(&batch));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_triangle_coverage, bench_shaded_triangle);
criterion_main!(benches);
