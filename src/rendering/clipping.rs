/// Frustum clipping in homogeneous coordinates.
///
/// Triangles are clipped one plane at a time. A plane either keeps the
/// triangle, drops it, or cuts it into one or two triangles; the pieces go
/// through the remaining planes recursively, so no scratch buffer is needed.
/// Survivors are projected (perspective divide, or `w = 1 - z` in ortho)
/// and handed to the caller ready for the rasterizer.
use crate::camera::Box3;
use crate::rendering::rasterizer::RasterizerVertex;
use glam::{Mat4, Vec3, Vec4};

/// Half-space `dot(normal, P) + offset >= 0`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClipPlane {
    pub normal: Vec4,
    pub offset: f32,
}

impl ClipPlane {
    pub const fn new(normal: Vec4, offset: f32) -> Self {
        ClipPlane { normal, offset }
    }

    /// Signed distance: positive inside, zero on the plane.
    #[inline]
    pub fn distance(&self, p: Vec4) -> f32 {
        self.normal.dot(p) + self.offset
    }
}

/// The six planes bounding the view volume.
///
/// In perspective the side planes are `|x|, |y| <= bound * w` and depth is
/// `|z| <= w`; in ortho they are plain `[-1, 1]` slabs. `bound` is slightly
/// larger than one so triangles overlapping the border are not cut for
/// nothing: the rasterizer clips them to the image anyway.
pub fn frustum_planes(ortho: bool, bound: f32) -> [ClipPlane; 6] {
    if ortho {
        [
            ClipPlane::new(Vec4::new(1.0, 0.0, 0.0, 0.0), 1.0),
            ClipPlane::new(Vec4::new(-1.0, 0.0, 0.0, 0.0), 1.0),
            ClipPlane::new(Vec4::new(0.0, 1.0, 0.0, 0.0), 1.0),
            ClipPlane::new(Vec4::new(0.0, -1.0, 0.0, 0.0), 1.0),
            ClipPlane::new(Vec4::new(0.0, 0.0, 1.0, 0.0), 1.0),
            ClipPlane::new(Vec4::new(0.0, 0.0, -1.0, 0.0), 1.0),
        ]
    } else {
        [
            ClipPlane::new(Vec4::new(1.0, 0.0, 0.0, bound), 0.0),
            ClipPlane::new(Vec4::new(-1.0, 0.0, 0.0, bound), 0.0),
            ClipPlane::new(Vec4::new(0.0, 1.0, 0.0, bound), 0.0),
            ClipPlane::new(Vec4::new(0.0, -1.0, 0.0, bound), 0.0),
            ClipPlane::new(Vec4::new(0.0, 0.0, 1.0, 1.0), 0.0),
            ClipPlane::new(Vec4::new(0.0, 0.0, -1.0, 1.0), 0.0),
        ]
    }
}

/// Side-plane bound in NDC units for a `lx x ly` viewport.
///
/// Chosen so that, once snapped to the sub-pixel grid, every clipped vertex
/// stays inside the range the rasterizer's fixed-point arithmetic supports.
pub fn clip_bound_xy(lx: i32, ly: i32, max_dimension: i32) -> f32 {
    let l = lx.max(ly).max(1);
    (256 + 3 * ((max_dimension * 256) / l)) as f32 / 1024.0
}

/// Result of cutting a triangle with one plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PlaneClip {
    /// Entirely inside: use the input unchanged.
    Inside,
    /// Entirely outside.
    Outside,
    One([RasterizerVertex; 3]),
    Two([RasterizerVertex; 3], [RasterizerVertex; 3]),
}

impl PlaneClip {
    /// Number of triangles kept, with `Inside` counting as one.
    pub fn count(&self) -> usize {
        match self {
            PlaneClip::Outside => 0,
            PlaneClip::Inside | PlaneClip::One(_) => 1,
            PlaneClip::Two(..) => 2,
        }
    }
}

/// Linear interpolation of every varying at `t` along `a -> b`.
#[inline]
pub fn lerp_vertex(a: &RasterizerVertex, b: &RasterizerVertex, t: f32) -> RasterizerVertex {
    RasterizerVertex {
        pos: a.pos + (b.pos - a.pos) * t,
        color: a.color + (b.color - a.color) * t,
        tex: a.tex + (b.tex - a.tex) * t,
        alpha: a.alpha + (b.alpha - a.alpha) * t,
    }
}

#[inline]
fn factor(da: f32, db: f32) -> f32 {
    da / (da - db)
}

/// `p1` inside, `p2` and `p3` outside.
fn keep_one(
    (d1, d2, d3): (f32, f32, f32),
    p1: &RasterizerVertex,
    p2: &RasterizerVertex,
    p3: &RasterizerVertex,
) -> PlaneClip {
    PlaneClip::One([*p1, lerp_vertex(p1, p2, factor(d1, d2)), lerp_vertex(p1, p3, factor(d1, d3))])
}

/// `p1` and `p2` inside, `p3` outside. The quad `p1 p2 q23 q13` is split
/// along `p1 q23`; both halves keep the input winding.
fn keep_two(
    (d1, d2, d3): (f32, f32, f32),
    p1: &RasterizerVertex,
    p2: &RasterizerVertex,
    p3: &RasterizerVertex,
) -> PlaneClip {
    let q23 = lerp_vertex(p2, p3, factor(d2, d3));
    let q13 = lerp_vertex(p1, p3, factor(d1, d3));
    PlaneClip::Two([*p1, *p2, q23], [*p1, q23, q13])
}

/// Cut triangle `(p1, p2, p3)` (clip-space positions) by one plane.
pub fn clip_against_plane(
    plane: &ClipPlane,
    p1: &RasterizerVertex,
    p2: &RasterizerVertex,
    p3: &RasterizerVertex,
) -> PlaneClip {
    let d1 = plane.distance(p1.pos);
    let d2 = plane.distance(p2.pos);
    let d3 = plane.distance(p3.pos);
    match (d1 >= 0.0, d2 >= 0.0, d3 >= 0.0) {
        (true, true, true) => PlaneClip::Inside,
        (false, false, false) => PlaneClip::Outside,
        (true, true, false) => keep_two((d1, d2, d3), p1, p2, p3),
        (false, true, true) => keep_two((d2, d3, d1), p2, p3, p1),
        (true, false, true) => keep_two((d3, d1, d2), p3, p1, p2),
        (true, false, false) => keep_one((d1, d2, d3), p1, p2, p3),
        (false, true, false) => keep_one((d2, d3, d1), p2, p3, p1),
        (false, false, true) => keep_one((d3, d1, d2), p3, p1, p2),
    }
}

/// Map a clip-space vertex to what the rasterizer expects: NDC `x, y, z`
/// and the interpolation weight in `w`.
#[inline]
pub fn project_vertex(v: &mut RasterizerVertex, ortho: bool) {
    if ortho {
        v.pos.w = 1.0 - v.pos.z;
    } else {
        let iw = 1.0 / v.pos.w;
        v.pos = Vec4::new(v.pos.x * iw, v.pos.y * iw, v.pos.z * iw, iw);
    }
}

/// Clip a clip-space triangle against `planes` and call `emit` with every
/// projected piece. Returns the number of triangles emitted.
pub fn clip_triangle(
    planes: &[ClipPlane],
    ortho: bool,
    p1: &RasterizerVertex,
    p2: &RasterizerVertex,
    p3: &RasterizerVertex,
    emit: &mut impl FnMut(&RasterizerVertex, &RasterizerVertex, &RasterizerVertex),
) -> usize {
    let Some((plane, rest)) = planes.split_first() else {
        let (mut a, mut b, mut c) = (*p1, *p2, *p3);
        project_vertex(&mut a, ortho);
        project_vertex(&mut b, ortho);
        project_vertex(&mut c, ortho);
        emit(&a, &b, &c);
        return 1;
    };
    match clip_against_plane(plane, p1, p2, p3) {
        PlaneClip::Inside => clip_triangle(rest, ortho, p1, p2, p3, emit),
        PlaneClip::Outside => 0,
        PlaneClip::One([a, b, c]) => clip_triangle(rest, ortho, &a, &b, &c, emit),
        PlaneClip::Two([a, b, c], [d, e, f]) => {
            clip_triangle(rest, ortho, &a, &b, &c, emit) + clip_triangle(rest, ortho, &d, &e, &f, emit)
        }
    }
}

/// The image rectangle in NDC, padded by one pixel on each side.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScreenBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl ScreenBounds {
    /// Bounds of an `image_width x image_height` image placed at
    /// `(offset_x, offset_y)` inside an `lx x ly` viewport.
    pub fn new(lx: i32, ly: i32, offset_x: i32, offset_y: i32, image_width: i32, image_height: i32) -> Self {
        let ilx = 2.0 / lx.max(1) as f32;
        let ily = 2.0 / ly.max(1) as f32;
        ScreenBounds {
            min_x: (offset_x - 1) as f32 * ilx - 1.0,
            max_x: (offset_x + image_width + 1) as f32 * ilx - 1.0,
            min_y: (offset_y - 1) as f32 * ily - 1.0,
            max_y: (offset_y + image_height + 1) as f32 * ily - 1.0,
        }
    }

    /// Clear the bits of `outside` for every plane `p` is on the inner side
    /// of. `p` is projected (after divide).
    #[inline]
    fn classify(&self, outside: &mut u8, p: Vec4) {
        if p.x >= self.min_x {
            *outside &= !1;
        }
        if p.x <= self.max_x {
            *outside &= !2;
        }
        if p.y >= self.min_y {
            *outside &= !4;
        }
        if p.y <= self.max_y {
            *outside &= !8;
        }
        if p.z >= -1.0 && p.w > 0.0 {
            *outside &= !16;
        }
        if p.z <= 1.0 {
            *outside &= !32;
        }
    }

    /// True when all points lie outside the same plane, so nothing spanned
    /// by them can reach the image.
    pub fn all_outside(&self, points: impl IntoIterator<Item = Vec4>) -> bool {
        let mut outside = 63u8;
        for p in points {
            self.classify(&mut outside, p);
            if outside == 0 {
                return false;
            }
        }
        true
    }
}

/// Projected triangle entirely off the image?
pub fn discard_triangle(bounds: &ScreenBounds, p1: Vec4, p2: Vec4, p3: Vec4) -> bool {
    bounds.all_outside([p1, p2, p3])
}

#[inline]
fn project_point(m: &Mat4, p: Vec3, ortho: bool) -> Vec4 {
    let s = *m * p.extend(1.0);
    if ortho {
        s
    } else {
        let iw = 1.0 / s.w;
        Vec4::new(s.x * iw, s.y * iw, s.z * iw, iw)
    }
}

/// Can the whole box be skipped? An all-zero box means "unknown" and is
/// never discarded.
///
/// Corners behind the eye are divided by a negative `w` and land mirrored
/// through the image center. They never count as inside the near plane, so a
/// box wholly behind the eye is discarded while one reaching in front of it
/// is kept, possibly conservatively.
pub fn discard_box(bounds: &ScreenBounds, bbox: &Box3, mvp: &Mat4, ortho: bool) -> bool {
    if bbox.is_unset() {
        return false;
    }
    bounds.all_outside(bbox.corners().into_iter().map(|c| project_point(mvp, c, ortho)))
}

/// Does any triangle inside `bbox` possibly need clipping? When this is
/// false every vertex is known to be well inside the view volume.
pub fn clip_test_needed(bound_xy: f32, bbox: &Box3, mvp: &Mat4, ortho: bool) -> bool {
    if bbox.is_unset() {
        return true;
    }
    bbox.corners().into_iter().any(|c| {
        let mut s = project_point(mvp, c, ortho);
        if !ortho && s.w <= 0.0 {
            s.z = -2.0;
        }
        s.x <= -bound_xy || s.x >= bound_xy || s.y <= -bound_xy || s.y >= bound_xy || s.z <= -1.0 || s.z >= 1.0
    })
}

/// Quick test on projected vertices: true when one of them is outside the
/// clip volume and the slow clipping path must be taken.
#[inline]
pub fn needs_clipping(bound_xy: f32, points: &[Vec4]) -> bool {
    points.iter().any(|p| {
        p.x < -bound_xy || p.x > bound_xy || p.y < -bound_xy || p.y > bound_xy || p.z < -1.0 || p.z > 1.0 || p.w <= 0.0
    })
}
