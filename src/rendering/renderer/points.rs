/// Depth-tested pixels and dots at 3D positions.
///
/// Points ignore the light: they use the material color or per-point
/// colors as given. A point outside the near/far range is dropped; the rest
/// are written with the same strict depth test as triangles, all pixels of
/// a dot sharing the depth of its center.
use super::Renderer3D;
use crate::count_call;
use crate::rendering::color::Color;
use crate::rendering::framebuffer::{DepthValue, RenderTarget};
use glam::{IVec2, Mat4, Vec3};

/// Positions (model space) plus optional per-point colors and radii.
///
/// A point without its own color uses the material color; a dot without its
/// own radius uses `radius`.
#[derive(Copy, Clone, Debug)]
pub struct PointBatch<'d, C: Color> {
    pub positions: &'d [Vec3],
    pub colors: Option<&'d [C]>,
    pub radii: Option<&'d [i32]>,
    pub radius: i32,
}

impl<'d, C: Color> PointBatch<'d, C> {
    pub fn new(positions: &'d [Vec3]) -> Self {
        PointBatch {
            positions,
            colors: None,
            radii: None,
            radius: 0,
        }
    }

    pub fn with_colors(mut self, colors: &'d [C]) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_radius(mut self, radius: i32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_radii(mut self, radii: &'d [i32]) -> Self {
        self.radii = Some(radii);
        self
    }
}

/// A projected point: destination pixel and depth weight.
#[derive(Copy, Clone, Debug, PartialEq)]
struct ScreenPoint {
    pixel: IVec2,
    w: f32,
}

impl<C: Color, Z: DepthValue, const ENABLED: u32> Renderer3D<C, Z, ENABLED> {
    /// One pixel at `pos` in the material color.
    pub fn draw_pixel(&self, target: &mut RenderTarget<'_, C, Z>, pos: Vec3) {
        self.draw_pixels(target, &PointBatch::new(std::slice::from_ref(&pos)));
    }

    /// One pixel per position; radii are ignored.
    pub fn draw_pixels(&self, target: &mut RenderTarget<'_, C, Z>, batch: &PointBatch<'_, C>) {
        count_call!(draw_calls);
        self.points(target, batch, |_| 0);
    }

    /// Filled disc of `radius` pixels at `pos` in the material color.
    pub fn draw_dot(&self, target: &mut RenderTarget<'_, C, Z>, pos: Vec3, radius: i32) {
        self.draw_dots(target, &PointBatch::new(std::slice::from_ref(&pos)).with_radius(radius));
    }

    /// One filled disc per position. Radius 0 is a single pixel, radius 1 a
    /// plus sign.
    pub fn draw_dots(&self, target: &mut RenderTarget<'_, C, Z>, batch: &PointBatch<'_, C>) {
        count_call!(draw_calls);
        let radii = batch.radii;
        self.points(target, batch, |k| {
            radii
                .and_then(|r| r.get(k).copied())
                .unwrap_or(batch.radius)
        });
    }

    fn points(
        &self,
        target: &mut RenderTarget<'_, C, Z>,
        batch: &PointBatch<'_, C>,
        radius: impl Fn(usize) -> i32,
    ) {
        if self.lx <= 0 || self.ly <= 0 {
            return;
        }
        let mvp = self.proj * self.model_view;
        let material = C::from_rgbf(self.material.color);
        for (k, &p) in batch.positions.iter().enumerate() {
            let Some(q) = self.project_point(&mvp, p) else {
                continue;
            };
            let color = batch
                .colors
                .and_then(|c| c.get(k).copied())
                .unwrap_or(material);
            let depth = Z::from_depth(q.w * self.wa + self.wb);
            fill_disc(target, q.pixel, radius(k).max(0), color, depth);
        }
    }

    fn project_point(&self, mvp: &Mat4, p: Vec3) -> Option<ScreenPoint> {
        let q = *mvp * p.extend(1.0);
        let (ndc, w) = if self.ortho {
            if !(-1.0..=1.0).contains(&q.z) {
                return None;
            }
            (q.truncate(), 1.0 - q.z)
        } else {
            if q.w <= 0.0 || !(-q.w..=q.w).contains(&q.z) {
                return None;
            }
            let iw = 1.0 / q.w;
            (q.truncate() * iw, iw)
        };
        Some(ScreenPoint {
            pixel: self.ndc_to_image(ndc),
            w,
        })
    }
}

/// Depth-tested filled disc. Pixels off the image are skipped.
fn fill_disc<C: Color, Z: DepthValue>(target: &mut RenderTarget<'_, C, Z>, center: IVec2, r: i32, color: C, depth: Z) {
    let (w, h) = (target.width as i32, target.height as i32);
    if center.x + r < 0 || center.x - r >= w || center.y + r < 0 || center.y - r >= h {
        return;
    }
    // Squared distances below r*r + r give a round outline and keep
    // radius 1 a plus sign.
    let limit = r * r + r;
    for dy in -r..=r {
        let y = center.y + dy;
        if y < 0 || y >= h {
            continue;
        }
        for dx in -r..=r {
            let x = center.x + dx;
            if x < 0 || x >= w || (r > 0 && dx * dx + dy * dy >= limit) {
                continue;
            }
            write_pixel(target, x as usize, y as usize, color, depth);
        }
    }
}

#[inline]
fn write_pixel<C: Color, Z: DepthValue>(target: &mut RenderTarget<'_, C, Z>, x: usize, y: usize, color: C, depth: Z) {
    let (width, stride) = (target.width, target.stride);
    if let Some(zbuf) = target.zbuf.as_deref_mut() {
        let stored = &mut zbuf[x + y * width];
        if *stored >= depth {
            return;
        }
        *stored = depth;
    }
    target.color[x + y * stride] = color;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::color::{Rgb24, RgbF};
    use crate::rendering::framebuffer::{Image, PixelBuffer};

    type R = Renderer3D<Rgb24>;

    const W: usize = 64;

    fn renderer() -> R {
        let mut r = R::new();
        r.set_viewport_size(W as i32, W as i32);
        r.use_perspective().unwrap();
        r.set_material_color(RgbF::WHITE);
        r
    }

    fn lit(im: &Image<Rgb24>) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for y in 0..W {
            for x in 0..W {
                if im.pixel(x, y) != Some(Rgb24::default()) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn pixel_lands_where_the_point_projects() {
        let r = renderer();
        let p = Vec3::new(0.7, -0.4, -5.0);
        let mut im = Image::<Rgb24>::new(W, W).unwrap();
        r.draw_pixel(&mut RenderTarget::new(&mut im), p);
        let at = r.model_to_image(p);
        assert_eq!(lit(&im), vec![(at.x as usize, at.y as usize)]);
        assert_eq!(im.pixel(at.x as usize, at.y as usize), Some(Rgb24::new(255, 255, 255)));
    }

    #[test]
    fn points_outside_depth_range_are_dropped() {
        let r = renderer();
        let mut im = Image::<Rgb24>::new(W, W).unwrap();
        let behind_and_beyond = [Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -0.5), Vec3::new(0.0, 0.0, -200.0)];
        r.draw_dots(&mut RenderTarget::new(&mut im), &PointBatch::new(&behind_and_beyond).with_radius(3));
        assert!(lit(&im).is_empty());
    }

    #[test]
    fn dot_shapes() {
        let r = renderer();
        let count = |radius: i32| {
            let mut im = Image::<Rgb24>::new(W, W).unwrap();
            r.draw_dot(&mut RenderTarget::new(&mut im), Vec3::new(0.0, 0.0, -5.0), radius);
            lit(&im).len()
        };
        assert_eq!(count(0), 1);
        assert_eq!(count(1), 5);
        let big = count(6) as f32;
        let disc = std::f32::consts::PI * 6.5 * 6.5;
        assert!((big - disc).abs() < 0.1 * disc, "{big} vs {disc}");
    }

    #[test]
    fn dot_clipped_by_the_image_border() {
        let r = renderer();
        let mut im = Image::<Rgb24>::new(W, W).unwrap();
        let p = Vec3::new(-2.0, -2.0, -5.0);
        let c = r.model_to_image(p);
        assert!(c.x < 4 && (c.y < 4 || c.y >= W as i32 - 4), "{c}");
        r.draw_dot(&mut RenderTarget::new(&mut im), p, 8);
        let pixels = lit(&im);
        assert!(!pixels.is_empty() && pixels.len() < 150);
        assert!(pixels
            .iter()
            .all(|&(x, y)| (x as i32 - c.x).abs() <= 8 && (y as i32 - c.y).abs() <= 8));
    }

    #[test]
    fn per_point_colors_and_radii() {
        let r = renderer();
        let positions = [Vec3::new(-1.0, 0.0, -5.0), Vec3::new(1.0, 0.0, -5.0)];
        let colors = [Rgb24::new(255, 0, 0), Rgb24::new(0, 0, 255)];
        let mut im = Image::<Rgb24>::new(W, W).unwrap();
        let batch = PointBatch::new(&positions).with_colors(&colors).with_radii(&[0, 2]);
        r.draw_dots(&mut RenderTarget::new(&mut im), &batch);
        let pixels = lit(&im);
        let red = pixels.iter().filter(|&&(x, y)| im.pixel(x, y) == Some(colors[0])).count();
        let blue = pixels.iter().filter(|&&(x, y)| im.pixel(x, y) == Some(colors[1])).count();
        assert_eq!((red, blue), (1, 21));
    }
}
