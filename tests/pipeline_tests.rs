// End-to-end checks of the draw path: depth ordering, culling, clipping,
// perspective-correct texturing and shading, texture sampling modes, shader
// fallbacks, depth-tested points and tiled rendering.

use glam::{Vec2, Vec3};
use microraster::camera;
use microraster::rendering::clipping::{clip_against_plane, clip_triangle, frustum_planes, PlaneClip};
use microraster::rendering::rasterizer::RasterizerVertex;
use microraster::rendering::{
    Color, DepthValue, Image, PixelBuffer, PointBatch, PrimitiveBatch, RenderTarget, Renderer3D, Rgb24, RgbF,
    ShaderFlags,
};

const W: usize = 320;
const H: usize = 240;

/// Renderer where an untextured flat face shows exactly its material color.
fn unlit<Z: DepthValue, const ENABLED: u32>(r: &mut Renderer3D<Rgb24, Z, ENABLED>) {
    r.set_light(Vec3::NEG_Z, RgbF::WHITE, RgbF::BLACK, RgbF::BLACK);
    r.set_material_ambient_strength(1.0);
}

fn triangle_at(z: f32, shift: f32) -> [Vec3; 3] {
    [
        Vec3::new(-1.5 + shift, -1.0, z),
        Vec3::new(1.5 + shift, -1.0, z),
        Vec3::new(shift, 1.5, z),
    ]
}

fn covered_pixels(im: &Image<Rgb24>) -> usize {
    im.pixels().iter().filter(|&&p| p != Rgb24::default()).count()
}

#[test]
fn test_depth_order_does_not_matter() {
    let mut r = Renderer3D::<Rgb24>::new();
    unlit(&mut r);
    let near = triangle_at(-4.0, -0.4);
    let far = triangle_at(-6.0, 0.4);

    let mut render = |order: [(&[Vec3; 3], RgbF); 2]| {
        let mut im = Image::<Rgb24>::new(W, H).unwrap();
        let mut z = vec![0.0f32; W * H];
        let mut target = RenderTarget::with_zbuffer(&mut im, &mut z).unwrap();
        for (tri, color) in order {
            r.set_material_color(color);
            r.draw_triangle(&mut target, tri);
        }
        drop(target);
        im
    };

    let a = render([(&near, RgbF::RED), (&far, RgbF::BLUE)]);
    let b = render([(&far, RgbF::BLUE), (&near, RgbF::RED)]);
    assert_eq!(a, b);

    let center = r.world_to_image(Vec3::new(-0.4, 0.0, -4.0));
    assert_eq!(a.pixel(center.x as usize, center.y as usize), Some(Rgb24::from_rgbf(RgbF::RED)));
}

#[test]
fn test_equal_depth_keeps_first_drawn() {
    let mut r = Renderer3D::<Rgb24>::new();
    unlit(&mut r);
    let tri = triangle_at(-5.0, 0.0);
    let mut im = Image::<Rgb24>::new(W, H).unwrap();
    let mut z = vec![0.0f32; W * H];
    let mut target = RenderTarget::with_zbuffer(&mut im, &mut z).unwrap();
    r.set_material_color(RgbF::GREEN);
    r.draw_triangle(&mut target, &tri);
    r.set_material_color(RgbF::RED);
    r.draw_triangle(&mut target, &tri);
    drop(target);

    let green = Rgb24::from_rgbf(RgbF::GREEN);
    assert!(covered_pixels(&im) > 1000);
    assert!(im.pixels().iter().all(|&p| p == Rgb24::default() || p == green));
}

#[test]
fn test_u16_depth_order_does_not_matter() {
    let mut r = Renderer3D::<Rgb24, u16>::new();
    unlit(&mut r);
    let near = triangle_at(-3.0, -0.5);
    let far = triangle_at(-20.0, 2.0);

    let mut render = |first: bool| {
        let mut im = Image::<Rgb24>::new(W, H).unwrap();
        let mut z = vec![0u16; W * H];
        let mut target = RenderTarget::with_zbuffer(&mut im, &mut z).unwrap();
        let order = if first {
            [(&near, RgbF::RED), (&far, RgbF::BLUE)]
        } else {
            [(&far, RgbF::BLUE), (&near, RgbF::RED)]
        };
        for (tri, color) in order {
            r.set_material_color(color);
            r.draw_triangle(&mut target, tri);
        }
        drop(target);
        im
    };
    assert_eq!(render(true), render(false));
}

#[test]
fn test_culling_direction() {
    let ccw = triangle_at(-5.0, 0.0);
    let cw = [ccw[0], ccw[2], ccw[1]];
    let mut r = Renderer3D::<Rgb24>::new();
    unlit(&mut r);

    let drawn = |r: &Renderer3D<Rgb24>, tri: &[Vec3; 3]| {
        let mut im = Image::<Rgb24>::new(W, H).unwrap();
        r.draw_triangle(&mut RenderTarget::new(&mut im), tri);
        covered_pixels(&im)
    };

    r.set_culling(1);
    assert!(drawn(&r, &ccw) > 0);
    assert_eq!(drawn(&r, &cw), 0);

    r.set_culling(-1);
    assert_eq!(drawn(&r, &ccw), 0);
    assert!(drawn(&r, &cw) > 0);

    r.set_culling(0);
    let (a, b) = (drawn(&r, &ccw), drawn(&r, &cw));
    assert!(a > 0);
    assert_eq!(a, b, "both windings cover the same pixels");
}

fn clip_vertex(p: Vec3, tex: Vec2) -> RasterizerVertex {
    let proj = camera::perspective(60.0, 1.0, 1.0, 50.0);
    RasterizerVertex {
        pos: proj * p.extend(1.0),
        tex,
        alpha: 1.0,
        ..Default::default()
    }
}

#[test]
fn test_near_plane_clip_lands_on_the_plane() {
    let near = frustum_planes(false, 1.0)[4];

    // Two vertices behind the near plane: one triangle, two new vertices.
    let a = clip_vertex(Vec3::new(0.0, 0.0, -3.0), Vec2::new(0.0, 0.0));
    let b = clip_vertex(Vec3::new(-1.0, 0.0, -0.5), Vec2::new(1.0, 0.0));
    let c = clip_vertex(Vec3::new(1.0, 0.5, -0.25), Vec2::new(0.0, 1.0));
    let PlaneClip::One([p, q, s]) = clip_against_plane(&near, &a, &b, &c) else {
        panic!("expected a single triangle");
    };
    assert_eq!(p, a);
    for (new, behind) in [(q, b), (s, c)] {
        assert!(near.distance(new.pos).abs() < 1e-5, "{:?}", new.pos);
        let t = (new.pos - a.pos).length() / (behind.pos - a.pos).length();
        let expected = a.tex + (behind.tex - a.tex) * t;
        assert!(new.tex.abs_diff_eq(expected, 1e-4), "{:?} vs {expected:?}", new.tex);
    }

    // One vertex behind: a quad, split in two, every new vertex on the plane.
    let b = clip_vertex(Vec3::new(-1.0, 0.0, -4.0), Vec2::new(1.0, 0.0));
    let PlaneClip::Two(first, second) = clip_against_plane(&near, &a, &b, &c) else {
        panic!("expected two triangles");
    };
    let on_plane = first
        .iter()
        .chain(&second)
        .filter(|v| near.distance(v.pos).abs() < 1e-5)
        .count();
    assert_eq!(on_plane, 3, "q23 is shared by both halves");
}

#[test]
fn test_clipped_pieces_are_all_inside_the_frustum() {
    let planes = frustum_planes(false, 1.0);
    let a = clip_vertex(Vec3::new(-30.0, -2.0, -3.0), Vec2::ZERO);
    let b = clip_vertex(Vec3::new(30.0, -2.0, -3.0), Vec2::X);
    let c = clip_vertex(Vec3::new(0.0, 8.0, 2.0), Vec2::Y);
    let mut pieces = 0;
    let mut emit = |p: &RasterizerVertex, q: &RasterizerVertex, r: &RasterizerVertex| {
        for v in [p, q, r] {
            assert!(v.pos.x.abs() <= 1.0 + 1e-4 && v.pos.y.abs() <= 1.0 + 1e-4, "{:?}", v.pos);
            assert!(v.pos.w > 0.0);
        }
        pieces += 1;
    };
    let n = clip_triangle(&planes, false, &a, &b, &c, &mut emit);
    assert_eq!(n, pieces);
    assert!(n >= 2);
}

#[test]
fn test_triangle_through_the_camera_plane_still_draws() {
    let mut r = Renderer3D::<Rgb24>::new();
    unlit(&mut r);
    // Floor running from behind the camera into the distance.
    let floor = [
        Vec3::new(-4.0, -1.0, 3.0),
        Vec3::new(4.0, -1.0, 3.0),
        Vec3::new(4.0, -1.0, -30.0),
        Vec3::new(-4.0, -1.0, -30.0),
    ];
    let mut im = Image::<Rgb24>::new(W, H).unwrap();
    r.draw_quad(&mut RenderTarget::new(&mut im), &floor);
    let bottom_center = im.pixel(W / 2, H - 1);
    assert_eq!(bottom_center, Some(Rgb24::from_rgbf(r.material().color)));
    assert_eq!(im.pixel(W / 2, 0), Some(Rgb24::default()), "sky stays empty");
}

#[test]
fn test_texture_is_perspective_correct() {
    let mut r = Renderer3D::<Rgb24>::new();
    r.set_perspective(45.0, W as f32 / H as f32, 1.0, 100.0).unwrap();
    r.set_shaders(ShaderFlags::TEXTURE | ShaderFlags::TEXTURE_NEAREST | ShaderFlags::TEXTURE_CLAMP);
    unlit(&mut r);

    // Texel (x, y) stores (x, y, 0).
    let texture = Image::from_fn(256, 256, |x, y| Rgb24::new(x as u8, y as u8, 0)).unwrap();
    // Parallelogram A + s*(B - A) + t*(D - A) receding from the viewer.
    let quad = [
        Vec3::new(-1.0, -1.0, -2.0),
        Vec3::new(1.0, -1.0, -2.0),
        Vec3::new(1.0, 1.0, -6.0),
        Vec3::new(-1.0, 1.0, -6.0),
    ];
    let uv = [Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 0.0)];
    let batch = PrimitiveBatch::quads(&quad).with_texcoords(&uv).with_texture(&texture);
    let mut im = Image::<Rgb24>::new(W, H).unwrap();
    r.draw_primitives(&mut RenderTarget::new(&mut im), &batch);

    let tan = (22.5f64).to_radians().tan();
    let aspect = W as f64 / H as f64;
    let mut checked = 0;
    for py in 0..H {
        for px in 0..W {
            // Ray through the pixel center, camera at the origin looking down -Z.
            let dx = ((px as f64 + 0.5) * 2.0 / W as f64 - 1.0) * tan * aspect;
            let dy = (1.0 - (py as f64 + 0.5) * 2.0 / H as f64) * tan;
            let t = (1.0 + 2.0 * dy) / (2.0 - 4.0 * dy);
            let distance = 2.0 + 4.0 * t;
            let s = (1.0 + distance * dx) / 2.0;
            let margin = 0.02;
            if !(margin..1.0 - margin).contains(&s) || !(margin..1.0 - margin).contains(&t) {
                continue;
            }
            let (u, v) = (s, 1.0 - t);
            let expected = ((u * 256.0).floor(), (v * 256.0).floor());
            let Some(got) = im.pixel(px, py) else {
                continue;
            };
            assert!(
                (got.r as f64 - expected.0).abs() <= 2.0 && (got.g as f64 - expected.1).abs() <= 2.0,
                "pixel ({px}, {py}): texel ({}, {}) expected {expected:?}",
                got.r,
                got.g
            );
            checked += 1;
        }
    }
    assert!(checked > 1000, "only {checked} pixels checked");
}

#[test]
fn test_disabled_gouraud_falls_back_to_flat() {
    const NO_GOURAUD: u32 = microraster::rendering::SHADERS_ALL & !ShaderFlags::GOURAUD.bits();
    let mut r = Renderer3D::<Rgb24, f32, NO_GOURAUD>::new();
    unlit(&mut r);
    r.set_shaders(ShaderFlags::GOURAUD);
    let tri = triangle_at(-5.0, 0.0);
    let normals = [Vec3::Z; 3];
    let mut im = Image::<Rgb24>::new(W, H).unwrap();
    r.draw_primitives(&mut RenderTarget::new(&mut im), &PrimitiveBatch::triangles(&tri).with_normals(&normals));

    let color = Rgb24::from_rgbf(r.material().color);
    assert!(covered_pixels(&im) > 1000);
    assert!(im.pixels().iter().all(|&p| p == Rgb24::default() || p == color));
}

#[test]
fn test_missing_depth_variant_draws_nothing() {
    const ZBUFFER_ONLY: u32 = microraster::rendering::SHADERS_ALL & !ShaderFlags::NOZBUFFER.bits();
    let r = Renderer3D::<Rgb24, f32, ZBUFFER_ONLY>::new();
    let tri = triangle_at(-5.0, 0.0);

    let mut im = Image::<Rgb24>::new(W, H).unwrap();
    r.draw_triangle(&mut RenderTarget::new(&mut im), &tri);
    assert_eq!(covered_pixels(&im), 0);

    let mut z = vec![0.0f32; W * H];
    r.draw_triangle(&mut RenderTarget::with_zbuffer(&mut im, &mut z).unwrap(), &tri);
    assert!(covered_pixels(&im) > 1000);
}

#[test]
fn test_orthographic_projection_keeps_size_with_depth() {
    let mut r = Renderer3D::<Rgb24>::new();
    r.use_orthographic().unwrap();
    unlit(&mut r);
    let mut sizes = Vec::new();
    for z in [-3.0, -30.0] {
        let mut im = Image::<Rgb24>::new(W, H).unwrap();
        r.draw_triangle(&mut RenderTarget::new(&mut im), &triangle_at(z, 0.0).map(|p| p * Vec3::new(4.0, 4.0, 1.0)));
        sizes.push(covered_pixels(&im));
    }
    assert!(sizes[0] > 1000);
    assert_eq!(sizes[0], sizes[1]);
}

#[test]
fn test_tiled_rendering_matches_full_frame() {
    let mut r = Renderer3D::<Rgb24>::new();
    r.set_shaders(ShaderFlags::GOURAUD);
    r.set_look_at(Vec3::new(0.0, 1.0, 5.0), Vec3::ZERO, Vec3::Y);

    let mut full = Image::<Rgb24>::new(W, H).unwrap();
    let mut z = vec![0.0f32; W * H];
    r.draw_sphere(&mut RenderTarget::with_zbuffer(&mut full, &mut z).unwrap(), 24, 12, None);

    let (tw, th) = (W / 4, H / 3);
    for ty in 0..3 {
        for tx in 0..4 {
            let mut tile = Image::<Rgb24>::new(tw, th).unwrap();
            let mut tz = vec![0.0f32; tw * th];
            r.set_offset((tx * tw) as i32, (ty * th) as i32);
            r.draw_sphere(&mut RenderTarget::with_zbuffer(&mut tile, &mut tz).unwrap(), 24, 12, None);
            for y in 0..th {
                for x in 0..tw {
                    assert_eq!(tile.pixel(x, y), full.pixel(tx * tw + x, ty * th + y), "tile ({tx}, {ty}) at ({x}, {y})");
                }
            }
        }
    }
}

#[test]
fn test_specular_highlight_faces_the_light() {
    let mut r = Renderer3D::<Rgb24>::new();
    r.set_shaders(ShaderFlags::GOURAUD);
    r.set_light(Vec3::NEG_Z, RgbF::BLACK, RgbF::BLACK, RgbF::WHITE);
    r.set_material_specular_exponent(16);
    r.set_material_specular_strength(1.0);
    r.set_look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);

    let mut im = Image::<Rgb24>::new(W, H).unwrap();
    let mut z = vec![0.0f32; W * H];
    r.draw_sphere(&mut RenderTarget::with_zbuffer(&mut im, &mut z).unwrap(), 48, 24, None);

    let brightness = |p: Option<Rgb24>| p.map_or(0, |c| c.r as u32 + c.g as u32 + c.b as u32);
    let center = brightness(im.pixel(W / 2, H / 2));
    let rim = r.world_to_image(Vec3::new(0.8, 0.0, 0.6));
    let rim = brightness(im.pixel(rim.x as usize, rim.y as usize));
    assert!(center > 600, "highlight at the center: {center}");
    assert!(rim < center / 2, "rim {rim} vs center {center}");
}

const RED: Rgb24 = Rgb24 { r: 255, g: 0, b: 0 };
const BLUE: Rgb24 = Rgb24 { r: 0, g: 0, b: 255 };

/// Left column red, right column blue.
fn two_tone() -> Image<Rgb24> {
    Image::from_fn(2, 2, |x, _| if x == 0 { RED } else { BLUE }).unwrap()
}

/// Quad facing the camera at `z = -5`, spanning `x` in `[-8, 8]` with `u`
/// running from 0 to `u_max` left to right.
fn draw_textured_quad<Z: DepthValue>(r: &Renderer3D<Rgb24, Z>, u_max: f32, texture: &Image<Rgb24>) -> Image<Rgb24> {
    let quad = [
        Vec3::new(-8.0, -6.0, -5.0),
        Vec3::new(8.0, -6.0, -5.0),
        Vec3::new(8.0, 6.0, -5.0),
        Vec3::new(-8.0, 6.0, -5.0),
    ];
    let uv = [Vec2::new(0.0, 1.0), Vec2::new(u_max, 1.0), Vec2::new(u_max, 0.0), Vec2::new(0.0, 0.0)];
    let normals = [Vec3::Z; 4];
    let batch = PrimitiveBatch::quads(&quad)
        .with_texcoords(&uv)
        .with_normals(&normals)
        .with_texture(texture);
    let mut im = Image::<Rgb24>::new(W, H).unwrap();
    let mut z = vec![Z::default(); W * H];
    r.draw_primitives(&mut RenderTarget::with_zbuffer(&mut im, &mut z).unwrap(), &batch);
    im
}

/// Image pixel showing the quad point at parameter `u` of `[0, u_max]`.
fn quad_pixel<Z: DepthValue>(r: &Renderer3D<Rgb24, Z>, im: &Image<Rgb24>, u: f32, u_max: f32) -> Rgb24 {
    let p = r.world_to_image(Vec3::new(-8.0 + 16.0 * u / u_max, 0.0, -5.0));
    im.pixel(p.x as usize, p.y as usize).unwrap()
}

fn near(a: Rgb24, b: Rgb24, tolerance: i32) -> bool {
    (a.r as i32 - b.r as i32).abs() <= tolerance
        && (a.g as i32 - b.g as i32).abs() <= tolerance
        && (a.b as i32 - b.b as i32).abs() <= tolerance
}

#[test]
fn test_orthographic_texture_flat_and_gouraud() {
    let texture = two_tone();
    for shading in [ShaderFlags::FLAT, ShaderFlags::GOURAUD] {
        let mut r = Renderer3D::<Rgb24>::new();
        r.use_orthographic().unwrap();
        r.set_shaders(shading | ShaderFlags::TEXTURE | ShaderFlags::TEXTURE_NEAREST | ShaderFlags::TEXTURE_CLAMP);
        unlit(&mut r);
        let im = draw_textured_quad(&r, 1.0, &texture);
        assert_eq!(quad_pixel(&r, &im, 0.25, 1.0), RED, "{shading:?}");
        assert_eq!(quad_pixel(&r, &im, 0.75, 1.0), BLUE, "{shading:?}");
    }
}

#[test]
fn test_perspective_texture_flat_and_gouraud_agree_under_uniform_light() {
    let texture = Image::from_fn(64, 64, |x, y| Rgb24::new((x * 4) as u8, (y * 4) as u8, 90)).unwrap();
    let render = |shading: ShaderFlags| {
        let mut r = Renderer3D::<Rgb24>::new();
        r.set_shaders(shading | ShaderFlags::TEXTURE | ShaderFlags::TEXTURE_NEAREST | ShaderFlags::TEXTURE_CLAMP);
        unlit(&mut r);
        draw_textured_quad(&r, 1.0, &texture)
    };
    let flat = render(ShaderFlags::FLAT);
    assert!(covered_pixels(&flat) > 10_000);
    assert_eq!(flat, render(ShaderFlags::GOURAUD));
}

#[test]
fn test_bilinear_blends_between_texel_centers() {
    let texture = two_tone();
    let mut r = Renderer3D::<Rgb24>::new();
    r.use_orthographic().unwrap();
    r.set_shaders(ShaderFlags::TEXTURE | ShaderFlags::TEXTURE_BILINEAR | ShaderFlags::TEXTURE_CLAMP);
    unlit(&mut r);
    let im = draw_textured_quad(&r, 1.0, &texture);

    // Texel corners sit at integer coordinates: u = 0.25 is halfway between
    // the two texels, past u = 0.5 the clamped neighbour is blue again.
    let mid = quad_pixel(&r, &im, 0.25, 1.0);
    assert!(near(mid, Rgb24::new(127, 0, 127), 24), "{mid:?}");
    let left = quad_pixel(&r, &im, 0.02, 1.0);
    assert!(left.r > 230 && left.b < 25, "{left:?}");
    assert_eq!(quad_pixel(&r, &im, 0.75, 1.0), BLUE);

    r.set_shaders(ShaderFlags::TEXTURE_NEAREST);
    let nearest = draw_textured_quad(&r, 1.0, &texture);
    assert_eq!(quad_pixel(&r, &nearest, 0.25, 1.0), RED);
}

#[test]
fn test_wrap_repeats_and_blends_across_the_seam() {
    let texture = two_tone();
    let mut r = Renderer3D::<Rgb24>::new();
    r.use_orthographic().unwrap();
    r.set_shaders(ShaderFlags::TEXTURE | ShaderFlags::TEXTURE_NEAREST | ShaderFlags::TEXTURE_WRAP_POW2);
    unlit(&mut r);

    let repeated = draw_textured_quad(&r, 2.0, &texture);
    for (u, color) in [(0.25, RED), (0.75, BLUE), (1.25, RED), (1.75, BLUE)] {
        assert_eq!(quad_pixel(&r, &repeated, u, 2.0), color, "u = {u}");
    }
    r.set_texture_wrapping_mode(ShaderFlags::TEXTURE_CLAMP);
    let clamped = draw_textured_quad(&r, 2.0, &texture);
    assert_eq!(quad_pixel(&r, &clamped, 1.25, 2.0), BLUE);

    // Between the last texel and the first one again.
    r.set_shaders(ShaderFlags::TEXTURE_BILINEAR | ShaderFlags::TEXTURE_WRAP_POW2);
    let seam = draw_textured_quad(&r, 1.0, &texture);
    let blended = quad_pixel(&r, &seam, 0.75, 1.0);
    assert!(near(blended, Rgb24::new(127, 0, 127), 24), "{blended:?}");
    r.set_texture_wrapping_mode(ShaderFlags::TEXTURE_CLAMP);
    let clamped = draw_textured_quad(&r, 1.0, &texture);
    assert_eq!(quad_pixel(&r, &clamped, 0.75, 1.0), BLUE);
}

#[test]
fn test_u16_depth_with_textured_faces() {
    let (red, blue) = (
        Image::from_fn(4, 4, |_, _| RED).unwrap(),
        Image::from_fn(4, 4, |_, _| BLUE).unwrap(),
    );
    let mut r = Renderer3D::<Rgb24, u16>::new();
    r.set_shaders(ShaderFlags::TEXTURE | ShaderFlags::TEXTURE_NEAREST | ShaderFlags::TEXTURE_CLAMP);
    unlit(&mut r);
    let uv = [Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y];
    let square = |z: f32, shift: f32| {
        [
            Vec3::new(-1.0 + shift, -1.0, z),
            Vec3::new(1.0 + shift, -1.0, z),
            Vec3::new(1.0 + shift, 1.0, z),
            Vec3::new(-1.0 + shift, 1.0, z),
        ]
    };
    let (front, back) = (square(-4.0, -0.5), square(-9.0, 0.5));

    let render = |order: [(&[Vec3; 4], &Image<Rgb24>); 2]| {
        let mut im = Image::<Rgb24>::new(W, H).unwrap();
        let mut z = vec![0u16; W * H];
        let mut target = RenderTarget::with_zbuffer(&mut im, &mut z).unwrap();
        for (quad, texture) in order {
            let batch = PrimitiveBatch::quads(quad).with_texcoords(&uv).with_texture(texture);
            r.draw_primitives(&mut target, &batch);
        }
        drop(target);
        im
    };
    let a = render([(&front, &red), (&back, &blue)]);
    let b = render([(&back, &blue), (&front, &red)]);
    assert_eq!(a, b);

    let overlap = r.world_to_image(Vec3::new(0.0, 0.0, -4.0));
    assert_eq!(a.pixel(overlap.x as usize, overlap.y as usize), Some(RED));
    let only_back = r.world_to_image(Vec3::new(1.3, 0.0, -9.0));
    assert_eq!(a.pixel(only_back.x as usize, only_back.y as usize), Some(BLUE));
}

#[test]
fn test_gouraud_colors_are_perspective_correct() {
    let mut r = Renderer3D::<Rgb24>::new();
    unlit(&mut r);
    // Floor triangle receding from the viewer: red edge near, blue tip far.
    let tri = [
        Vec3::new(-1.0, -1.0, -2.0),
        Vec3::new(1.0, -1.0, -2.0),
        Vec3::new(0.0, -1.0, -40.0),
    ];
    let colors = [RgbF::RED, RgbF::RED, RgbF::BLUE];
    let mut im = Image::<Rgb24>::new(W, H).unwrap();
    let mut z = vec![0.0f32; W * H];
    let batch = PrimitiveBatch::triangles(&tri).with_colors(&colors);
    r.draw_primitives(&mut RenderTarget::with_zbuffer(&mut im, &mut z).unwrap(), &batch);

    // Halfway in 3D is halfway in color, although it sits far up the
    // triangle on screen.
    let mid = r.world_to_image(Vec3::new(0.0, -1.0, -21.0));
    let got = im.pixel(mid.x as usize, mid.y as usize).unwrap();
    assert!(near(got, Rgb24::new(127, 0, 127), 24), "{got:?}");

    let nearby = r.world_to_image(Vec3::new(0.0, -1.0, -3.0));
    let got = im.pixel(nearby.x as usize, nearby.y as usize).unwrap();
    assert!(got.r > 230 && got.b < 25, "{got:?}");
}

#[test]
fn test_textured_gouraud_light_is_perspective_correct() {
    let white = Image::from_fn(4, 4, |_, _| Rgb24::new(255, 255, 255)).unwrap();
    let mut r = Renderer3D::<Rgb24>::new();
    r.set_shaders(ShaderFlags::GOURAUD | ShaderFlags::TEXTURE | ShaderFlags::TEXTURE_NEAREST | ShaderFlags::TEXTURE_CLAMP);
    r.set_light(Vec3::NEG_Z, RgbF::BLACK, RgbF::WHITE, RgbF::BLACK);
    r.set_material_diffuse_strength(1.0);
    // Lit near edge, unlit far tip.
    let tri = [
        Vec3::new(-1.0, -1.0, -2.0),
        Vec3::new(1.0, -1.0, -2.0),
        Vec3::new(0.0, -1.0, -40.0),
    ];
    let normals = [Vec3::Z, Vec3::Z, Vec3::NEG_Z];
    let uv = [Vec2::ZERO, Vec2::X, Vec2::Y];
    let batch = PrimitiveBatch::triangles(&tri)
        .with_normals(&normals)
        .with_texcoords(&uv)
        .with_texture(&white);
    let mut im = Image::<Rgb24>::new(W, H).unwrap();
    let mut z = vec![0.0f32; W * H];
    r.draw_primitives(&mut RenderTarget::with_zbuffer(&mut im, &mut z).unwrap(), &batch);

    let mid = r.world_to_image(Vec3::new(0.0, -1.0, -21.0));
    let got = im.pixel(mid.x as usize, mid.y as usize).unwrap();
    assert!(near(got, Rgb24::new(127, 127, 127), 24), "{got:?}");
}

#[test]
fn test_dots_are_depth_tested_against_triangles() {
    let mut r = Renderer3D::<Rgb24, u16>::new();
    unlit(&mut r);
    r.set_material_color(RgbF::GREEN);
    let tri = triangle_at(-5.0, 0.0);
    let mut im = Image::<Rgb24>::new(W, H).unwrap();
    let mut z = vec![0u16; W * H];
    let mut target = RenderTarget::with_zbuffer(&mut im, &mut z).unwrap();
    r.draw_triangle(&mut target, &tri);

    let positions = [Vec3::new(-0.5, 0.0, -8.0), Vec3::new(0.5, 0.0, -3.0)];
    let colors = [RED, BLUE];
    r.draw_dots(&mut target, &PointBatch::new(&positions).with_colors(&colors).with_radius(2));
    // Equal depth: the first dot keeps the pixel.
    let beside = Vec3::new(2.5, 1.5, -5.0);
    r.draw_dot(&mut target, beside, 1);
    r.set_material_color(RgbF::WHITE);
    r.draw_pixel(&mut target, beside);
    drop(target);

    let at = |p: Vec3| {
        let q = r.model_to_image(p);
        im.pixel(q.x as usize, q.y as usize)
    };
    let green = Some(Rgb24::from_rgbf(RgbF::GREEN));
    assert_eq!(at(positions[0]), green, "hidden behind the triangle");
    assert_eq!(at(positions[1]), Some(BLUE), "in front of the triangle");
    assert_eq!(at(beside), green);
}
