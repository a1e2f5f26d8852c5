/// Fixed-point triangle rasterizer.
///
/// Vertices come in normalized viewport coordinates (post divide) and are
/// snapped to a sub-pixel grid of `BITS` fractional bits. Coverage uses
/// three incrementally updated edge functions and a top-left fill rule, so
/// triangles sharing an edge never draw the same pixel twice.
///
/// The rasterizer does no shading itself: once the triangle is set up it
/// hands a [`TriangleSetup`] to a callback, which walks the spans.
use crate::rendering::color::{Color, RgbF};
use crate::rendering::framebuffer::Image;
use crate::rendering::shader_flags::ShaderFlags;
use glam::{Vec2, Vec4};

pub const DEFAULT_SUBPIXEL_BITS: u32 = 8;

/// Largest viewport side the fixed-point arithmetic supports for a given
/// sub-pixel precision.
pub const fn max_viewport_dimension(bits: u32) -> i32 {
    let extra = 8 - bits as i32;
    let shift = if extra > 0 { extra >> 1 } else { 0 };
    2048 * (1 << shift)
}

/// Varying attributes of one vertex.
///
/// `pos.w` carries the perspective weight (`1/w` of the clip-space vertex,
/// or `1 - z` in orthographic mode); the shaders interpolate it linearly in
/// screen space.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RasterizerVertex {
    pub pos: Vec4,
    /// Lit color for Gouraud shading, light intensity when also textured.
    pub color: RgbF,
    pub tex: Vec2,
    pub alpha: f32,
}

/// Per-draw-call constants shared by every triangle of the call.
#[derive(Copy, Clone, Debug)]
pub struct Uniforms<'t, C: Color> {
    /// Face color for flat shading (light intensity when textured).
    pub face_color: RgbF,
    pub texture: Option<&'t Image<C>>,
    pub flags: ShaderFlags,
    /// `depth = wa * w + wb` maps the interpolated weight into z-buffer units.
    pub wa: f32,
    pub wb: f32,
}

/// Destination rectangle of a rasterization call.
///
/// The logical viewport is `lx x ly`; the destination image covers the
/// sub-rectangle starting at `(offset_x, offset_y)`, which makes tiled
/// rendering into small buffers possible.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RasterViewport {
    pub lx: i32,
    pub ly: i32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub image_width: i32,
    pub image_height: i32,
}

/// One edge function: value `o` at the box origin and its increments.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub dx: i32,
    pub dy: i32,
    pub o: i32,
}

/// Rasterized triangle ready for span walking.
///
/// `edges[i]` is opposite to `vertices[i]`: its value is proportional to
/// the barycentric weight of that vertex. The first edge always has
/// `dx > 0`.
#[derive(Copy, Clone, Debug)]
pub struct TriangleSetup<'v> {
    /// First pixel of the scanned box, relative to the destination image.
    pub ox: i32,
    pub oy: i32,
    /// Size of the scanned box.
    pub lx: i32,
    pub ly: i32,
    pub edges: [Edge; 3],
    pub vertices: [&'v RasterizerVertex; 3],
}

impl TriangleSetup<'_> {
    /// Sum of the three edge functions. Constant over the whole plane.
    #[inline]
    pub fn doubled_area(&self) -> i32 {
        self.edges[0].o + self.edges[1].o + self.edges[2].o
    }

    /// Visit every scanline that has coverage.
    ///
    /// `f(row, bx, [c1, c2, c3])` receives the row relative to the box, the
    /// first covered column and the three edge values at that column. The
    /// span continues while `c2 | c3 >= 0` and `bx < lx`; `c1` only grows
    /// along a row.
    #[inline(always)]
    pub fn for_each_span(&self, mut f: impl FnMut(i32, i32, [i32; 3])) {
        let [e1, e2, e3] = self.edges;
        let (mut o1, mut o2, mut o3) = (e1.o, e2.o, e3.o);
        let mut row = 0;
        while row < self.ly {
            let mut bx = 0;
            if o1 < 0 {
                bx = (-o1 + e1.dx - 1) / e1.dx;
            }
            if o2 < 0 {
                if e2.dx <= 0 {
                    if e2.dy <= 0 {
                        return;
                    }
                    let by = (-o2 + e2.dy - 1) / e2.dy;
                    o1 += by * e1.dy;
                    o2 += by * e2.dy;
                    o3 += by * e3.dy;
                    row += by;
                    continue;
                }
                bx = bx.max((-o2 + e2.dx - 1) / e2.dx);
            }
            if o3 < 0 {
                if e3.dx <= 0 {
                    if e3.dy <= 0 {
                        return;
                    }
                    let by = (-o3 + e3.dy - 1) / e3.dy;
                    o1 += by * e1.dy;
                    o2 += by * e2.dy;
                    o3 += by * e3.dy;
                    row += by;
                    continue;
                }
                bx = bx.max((-o3 + e3.dx - 1) / e3.dx);
            }
            f(row, bx, [o1 + e1.dx * bx, o2 + e2.dx * bx, o3 + e3.dx * bx]);
            o1 += e1.dy;
            o2 += e2.dy;
            o3 += e3.dy;
            row += 1;
        }
    }

    /// Visit every covered pixel in image coordinates.
    pub fn for_each_pixel(&self, mut f: impl FnMut(i32, i32)) {
        let (dx2, dx3) = (self.edges[1].dx, self.edges[2].dx);
        self.for_each_span(|row, bx, [_, mut c2, mut c3]| {
            let mut x = bx;
            while x < self.lx && (c2 | c3) >= 0 {
                f(self.ox + x, self.oy + row);
                c2 += dx2;
                c3 += dx3;
                x += 1;
            }
        });
    }
}

#[inline(always)]
fn top_left_bias(dx: i32, dy: i32) -> bool {
    dx < 0 || (dx == 0 && dy < 0)
}

/// Rasterize one triangle and call `shader` with its setup.
///
/// Nothing happens for zero-area triangles or when the triangle's bounding
/// box misses the destination image. Winding only decides the vertex order
/// handed to the shader; both windings are drawn.
pub fn rasterize_triangle<'v, const BITS: u32>(
    vp: &RasterViewport,
    v0: &'v RasterizerVertex,
    v1: &'v RasterizerVertex,
    v2: &'v RasterizerVertex,
    mut shader: impl FnMut(&TriangleSetup<'v>),
) {
    let sub256: i32 = 1 << BITS;
    let sub128: i32 = 1 << (BITS - 1);
    let half_x = vp.lx << (BITS - 1);
    let half_y = vp.ly << (BITS - 1);

    let mx = half_x as f32;
    let my = half_y as f32;
    let snap = |v: &RasterizerVertex| ((v.pos.x * mx).floor() as i32, (v.pos.y * my).floor() as i32);
    let p0 = snap(v0);
    let sp1 = snap(v1);
    let sp2 = snap(v2);

    let umx = p0.0.min(sp1.0).min(sp2.0);
    let umax_x = p0.0.max(sp1.0).max(sp2.0);
    let umy = p0.1.min(sp1.1).min(sp2.1);
    let umax_y = p0.1.max(sp1.1).max(sp2.1);

    let c32 = umax_x - umx < 32768 && umax_y - umy < 32768;
    let area_sign = if c32 {
        let a = (sp2.0 - p0.0) * (sp1.1 - p0.1) - (sp2.1 - p0.1) * (sp1.0 - p0.0);
        a.signum()
    } else {
        let a = (sp2.0 - p0.0) as i64 * (sp1.1 - p0.1) as i64
            - (sp2.1 - p0.1) as i64 * (sp1.0 - p0.0) as i64;
        a.signum() as i32
    };
    if area_sign == 0 {
        return;
    }

    // Integer division, not a shift: the values may be negative.
    let xmin = (umx + half_x) / sub256;
    let xmax = (umax_x + half_x) / sub256;
    let ymin = (umy + half_y) / sub256;
    let ymax = (umax_y + half_y) / sub256;

    let mut sx = vp.image_width;
    let mut sy = vp.image_height;
    let mut ox = vp.offset_x;
    let mut oy = vp.offset_y;
    if ox < xmin {
        sx -= xmin - ox;
        ox = xmin;
    }
    if ox + sx > xmax {
        sx = xmax - ox + 1;
    }
    if sx <= 0 {
        return;
    }
    if oy < ymin {
        sy -= ymin - oy;
        oy = ymin;
    }
    if oy + sy > ymax {
        sy = ymax - oy + 1;
    }
    if sy <= 0 {
        return;
    }

    let (f1, f2, p1, p2) = if area_sign > 0 {
        (v1, v2, sp1, sp2)
    } else {
        (v2, v1, sp2, sp1)
    };

    // Sub-pixel position of the first pixel center.
    let us = (ox << BITS) - half_x + sub128;
    let vs = (oy << BITS) - half_y + sub128;

    ox -= vp.offset_x;
    oy -= vp.offset_y;

    let mut dx1 = p1.1 - p0.1;
    let mut dy1 = p0.0 - p1.0;
    let mut dx2 = p2.1 - p1.1;
    let mut dy2 = p1.0 - p2.0;
    let mut dx3 = p0.1 - p2.1;
    let mut dy3 = p2.0 - p0.0;

    let (mut o1, mut o2, mut o3);
    if c32 {
        o1 = (us - p0.0) * dx1 + (vs - p0.1) * dy1;
        if top_left_bias(dx1, dy1) {
            o1 -= 1;
        }
        o2 = (us - p1.0) * dx2 + (vs - p1.1) * dy2;
        if top_left_bias(dx2, dy2) {
            o2 -= 1;
        }
        o3 = (us - p2.0) * dx3 + (vs - p2.1) * dy3;
        if top_left_bias(dx3, dy3) {
            o3 -= 1;
        }
        dx1 *= sub256;
        dy1 *= sub256;
        dx2 *= sub256;
        dy2 *= sub256;
        dx3 *= sub256;
        dy3 *= sub256;
    } else {
        // Wide triangles: evaluate in 64 bits and drop the sub-pixel scale
        // so the per-pixel increments stay 32-bit.
        let edge = |px: i32, py: i32, dx: i32, dy: i32| -> i32 {
            let mut d = (us - px) as i64 * dx as i64 + (vs - py) as i64 * dy as i64;
            if top_left_bias(dx, dy) {
                d -= 1;
            }
            if d >= 0 {
                (d >> BITS) as i32
            } else {
                -((-d + (sub256 as i64 - 1)) >> BITS) as i32
            }
        };
        o1 = edge(p0.0, p0.1, dx1, dy1);
        o2 = edge(p1.0, p1.1, dx2, dy2);
        o3 = edge(p2.0, p2.1, dx3, dy3);
    }

    // The sum of the edge values may be zero here; shaders handle it.

    // One pixel wide or tall boxes: skip ahead to the first covered pixel
    // so the span walker sees a non-negative start.
    if sx == 1 {
        while (o1 | o2 | o3) < 0 && sy > 0 {
            sy -= 1;
            oy += 1;
            o1 += dy1;
            o2 += dy2;
            o3 += dy3;
        }
        if sy == 0 {
            return;
        }
    } else if sy == 1 {
        while (o1 | o2 | o3) < 0 && sx > 0 {
            sx -= 1;
            ox += 1;
            o1 += dx1;
            o2 += dx2;
            o3 += dx3;
        }
        if sx == 0 {
            return;
        }
    }

    let e1 = Edge { dx: dx1, dy: dy1, o: o1 };
    let e2 = Edge { dx: dx2, dy: dy2, o: o2 };
    let e3 = Edge { dx: dx3, dy: dy3, o: o3 };

    // Rotate so the first edge has dx > 0. Edge 1 (p0->p1) weighs f2,
    // edge 2 (p1->p2) weighs v0 and edge 3 (p2->p0) weighs f1.
    let (edges, vertices) = if dx1 > 0 {
        ([e1, e2, e3], [f2, v0, f1])
    } else if dx2 > 0 {
        ([e2, e3, e1], [v0, f1, f2])
    } else {
        ([e3, e1, e2], [f1, f2, v0])
    };

    shader(&TriangleSetup {
        ox,
        oy,
        lx: sx,
        ly: sy,
        edges,
        vertices,
    });
}
