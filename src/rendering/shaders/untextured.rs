/// Flat and Gouraud scanline loops without texturing.
///
/// The depth weight is affine in screen space in both projection modes.
/// Gouraud colors are too under orthographic projection; under perspective
/// the barycentric weights are corrected by each vertex's `w` per pixel.
use crate::rendering::color::Color;
use crate::rendering::framebuffer::{DepthValue, RenderTarget};
use crate::rendering::rasterizer::{TriangleSetup, Uniforms};

const PERSPECTIVE_ONE: i32 = 1 << 12;

pub fn shade_untextured<C: Color, Z: DepthValue, const ZBUF: bool, const ORTHO: bool, const GOURAUD: bool>(
    setup: &TriangleSetup<'_>,
    uniforms: &Uniforms<'_, C>,
    target: &mut RenderTarget<'_, C, Z>,
) {
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

    let flat = C::from_rgbf(uniforms.face_color);
    let col1 = C::from_rgbf(p1.color);
    let col2 = C::from_rgbf(p2.color);
    let col3 = C::from_rgbf(p3.color);

    // Depth weight pre-scaled into z-buffer units.
    let invaera_wa = uniforms.wa / aera as f32;
    let f1a = p1.pos.w * invaera_wa;
    let f2a = p2.pos.w * invaera_wa;
    let f3a = p3.pos.w * invaera_wa;
    let dw = e1.dx as f32 * f1a + e2.dx as f32 * f2a + e3.dx as f32 * f3a;
    let wb = uniforms.wb;

    // Perspective-correct color weights, in 1/PERSPECTIVE_ONE units.
    let [g1, g2, g3] = [p1.pos.w, p2.pos.w, p3.pos.w];
    let weights = |c1: i32, c2: i32, c3: i32| -> (i32, i32) {
        let (u1, u2, u3) = ((c1 + e) as f32 * g1, c2 as f32 * g2, c3 as f32 * g3);
        let sum = u1 + u2 + u3;
        if sum > 0.0 {
            let k = PERSPECTIVE_ONE as f32 / sum;
            ((u2 * k) as i32, (u3 * k) as i32)
        } else {
            (0, 0)
        }
    };
    let shade = |c1: i32, c2: i32, c3: i32| -> C {
        if !GOURAUD {
            flat
        } else if ORTHO {
            C::interpolate_triangle(col2, c2, col3, c3, col1, aera)
        } else {
            let (w2, w3) = weights(c1, c2, c3);
            C::interpolate_triangle(col2, w2, col3, w3, col1, PERSPECTIVE_ONE)
        }
    };

    let base = setup.ox + setup.oy * stride;
    let zbase = setup.ox + setup.oy * zstride;
    let lx = setup.lx;

    setup.for_each_span(|row, bx, [mut c1, mut c2, mut c3]| {
        let line = (base + row * stride) as usize;
        let zline = (zbase + row * zstride) as usize;
        let mut cw = if ZBUF {
            (c1 + e) as f32 * f1a + c2 as f32 * f2a + c3 as f32 * f3a + wb
        } else {
            0.0
        };
        let mut x = bx;
        while x < lx && (c2 | c3) >= 0 {
            let i = x as usize;
            if ZBUF {
                let depth = Z::from_depth(cw);
                let stored = &mut zbuf[zline + i];
                if *stored < depth {
                    *stored = depth;
                    color[line + i] = shade(c1, c2, c3);
                }
                cw += dw;
            } else {
                color[line + i] = shade(c1, c2, c3);
            }
            c1 += e1.dx;
            c2 += e2.dx;
            c3 += e3.dx;
            x += 1;
        }
    });
}
