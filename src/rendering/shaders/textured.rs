/// Textured scanline loops.
///
/// Perspective mode interpolates `T*w` and `w` linearly in screen space and
/// divides per pixel; orthographic mode interpolates `T` directly. Gouraud
/// light follows the same rule. Texture coordinates are scaled to texel
/// units once per triangle.
use crate::rendering::color::{Color, RgbF};
use crate::rendering::framebuffer::{DepthValue, RenderTarget};
use crate::rendering::rasterizer::{TriangleSetup, Uniforms};
use crate::rendering::texture::TextureSampler;
use glam::Vec2;

pub fn shade_textured<
    C: Color,
    Z: DepthValue,
    const ZBUF: bool,
    const ORTHO: bool,
    const GOURAUD: bool,
    const BILINEAR: bool,
    const WRAP: bool,
>(
    setup: &TriangleSetup<'_>,
    uniforms: &Uniforms<'_, C>,
    target: &mut RenderTarget<'_, C, Z>,
) {
    let Some(texture) = uniforms.texture else {
        return;
    };
    let sampler = TextureSampler::new(texture);

    let stride = target.stride as i32;
    let zstride = target.width as i32;
    let color: &mut [C] = &mut *target.color;
    let zbuf: &mut [Z] = if ZBUF {
        match target.zbuf.as_deref_mut() {
            Some(z) => z,
            None => return,
        }
    } else {
        &mut []
    };

    let [e1, e2, e3] = setup.edges;
    let [p1, p2, p3] = setup.vertices;
    let pa = setup.doubled_area();
    let e = (pa == 0) as i32;
    let aera = pa + e;
    let invaera = 1.0 / aera as f32;

    let f1a = p1.pos.w * invaera;
    let f2a = p2.pos.w * invaera;
    let f3a = p3.pos.w * invaera;
    let dw = e1.dx as f32 * f1a + e2.dx as f32 * f2a + e3.dx as f32 * f3a;
    let (wa, wb) = (uniforms.wa, uniforms.wb);

    let texsize = Vec2::new(sampler.width() as f32, sampler.height() as f32);
    let (t1, t2, t3) = if ORTHO {
        (
            p1.tex * invaera * texsize,
            p2.tex * invaera * texsize,
            p3.tex * invaera * texsize,
        )
    } else {
        (
            p1.tex * f1a * texsize,
            p2.tex * f2a * texsize,
            p3.tex * f3a * texsize,
        )
    };
    let dtx = t1.x * e1.dx as f32 + t2.x * e2.dx as f32 + t3.x * e3.dx as f32;
    let dty = t1.y * e1.dx as f32 + t2.y * e2.dx as f32 + t3.y * e3.dx as f32;

    // Light intensity in 1/256 units: the face value for flat shading, or
    // vertex 1 plus the deltas towards vertices 2 and 3 for Gouraud.
    let fixed = |v: f32| (256.0 * v) as i64;
    let (l1, l2, l3) = if GOURAUD {
        (p1.color, p2.color - p1.color, p3.color - p1.color)
    } else {
        (uniforms.face_color, RgbF::BLACK, RgbF::BLACK)
    };
    let (r1, g1, b1) = (fixed(l1.r), fixed(l1.g), fixed(l1.b));
    let (r21, g21, b21) = (fixed(l2.r), fixed(l2.g), fixed(l2.b));
    let (r31, g31, b31) = (fixed(l3.r), fixed(l3.g), fixed(l3.b));
    let aera64 = aera as i64;

    let base = setup.ox + setup.oy * stride;
    let zbase = setup.ox + setup.oy * zstride;
    let lx = setup.lx;

    setup.for_each_span(|row, bx, [c1, mut c2, mut c3]| {
        let line = (base + row * stride) as usize;
        let zline = (zbase + row * zstride) as usize;
        let c1 = c1 + e;
        let mut cw = c1 as f32 * f1a + c2 as f32 * f2a + c3 as f32 * f3a;
        let mut tx = t1.x * c1 as f32 + t2.x * c2 as f32 + t3.x * c3 as f32;
        let mut ty = t1.y * c1 as f32 + t2.y * c2 as f32 + t3.y * c3 as f32;
        let mut x = bx;
        while x < lx && (c2 | c3) >= 0 {
            let i = x as usize;
            let visible = if ZBUF {
                let depth = if Z::QUANTIZED {
                    Z::from_depth(cw * wa + wb)
                } else {
                    Z::from_depth(cw)
                };
                let stored = &mut zbuf[zline + i];
                if *stored < depth {
                    *stored = depth;
                    true
                } else {
                    false
                }
            } else {
                true
            };
            if visible {
                let icw = if ORTHO { 1.0 } else { 1.0 / cw };
                let mut col = if ORTHO {
                    sampler.sample::<BILINEAR, WRAP>(tx, ty)
                } else {
                    sampler.sample::<BILINEAR, WRAP>(tx * icw, ty * icw)
                };
                if GOURAUD && ORTHO {
                    let (c2l, c3l) = (c2 as i64, c3 as i64);
                    col.mult256(
                        (r1 + (c2l * r21 + c3l * r31) / aera64) as i32,
                        (g1 + (c2l * g21 + c3l * g31) / aera64) as i32,
                        (b1 + (c2l * b21 + c3l * b31) / aera64) as i32,
                    );
                } else if GOURAUD {
                    // Perspective-correct weights of vertices 2 and 3.
                    let (b2, b3) = (c2 as f32 * f2a * icw, c3 as f32 * f3a * icw);
                    let light = |v1: i64, v21: i64, v31: i64| v1 as i32 + (b2 * v21 as f32 + b3 * v31 as f32) as i32;
                    col.mult256(light(r1, r21, r31), light(g1, g21, g31), light(b1, b21, b31));
                } else {
                    col.mult256(r1 as i32, g1 as i32, b1 as i32);
                }
                color[line + i] = col;
            }
            c2 += e2.dx;
            c3 += e3.dx;
            cw += dw;
            tx += dtx;
            ty += dty;
            x += 1;
        }
    });
}
