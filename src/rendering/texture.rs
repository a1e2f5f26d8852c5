/// Texel fetch for the textured shaders.
/// Coordinates arrive already scaled to texel units.
use crate::rendering::color::Color;
use crate::rendering::framebuffer::{Image, PixelBuffer};

/// Borrowed texture with precomputed addressing constants.
#[derive(Copy, Clone, Debug)]
pub struct TextureSampler<'t, C: Color> {
    texels: &'t [C],
    width: i32,
    height: i32,
    stride: i32,
    max_x: i32,
    max_y: i32,
}

impl<'t, C: Color> TextureSampler<'t, C> {
    pub fn new(texture: &'t Image<C>) -> Self {
        let width = texture.width() as i32;
        let height = texture.height() as i32;
        Self {
            texels: texture.pixels(),
            width,
            height,
            stride: texture.stride() as i32,
            max_x: width - 1,
            max_y: height - 1,
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Power-of-two wrap (`& (size-1)`) or clamp to the border.
    #[inline(always)]
    fn address<const WRAP: bool>(v: i32, max: i32) -> i32 {
        if WRAP {
            v & max
        } else {
            v.clamp(0, max)
        }
    }

    #[inline(always)]
    fn texel(&self, x: i32, y: i32) -> C {
        self.texels[(x + y * self.stride) as usize]
    }

    /// Nearest texel. `x` and `y` truncate toward zero like an integer cast.
    #[inline(always)]
    pub fn nearest<const WRAP: bool>(&self, x: f32, y: f32) -> C {
        let tx = Self::address::<WRAP>(x as i32, self.max_x);
        let ty = Self::address::<WRAP>(y as i32, self.max_y);
        self.texel(tx, ty)
    }

    /// Four-tap bilinear blend around `(x, y)`.
    #[inline(always)]
    pub fn bilinear<const WRAP: bool>(&self, x: f32, y: f32) -> C {
        let fx = x.floor();
        let fy = y.floor();
        let ax = x - fx;
        let ay = y - fy;
        let ttx = fx as i32;
        let tty = fy as i32;
        let minx = Self::address::<WRAP>(ttx, self.max_x);
        let maxx = Self::address::<WRAP>(ttx.wrapping_add(1), self.max_x);
        let miny = Self::address::<WRAP>(tty, self.max_y);
        let maxy = Self::address::<WRAP>(tty.wrapping_add(1), self.max_y);
        C::interpolate_bilinear(
            self.texel(minx, miny),
            self.texel(maxx, miny),
            self.texel(minx, maxy),
            self.texel(maxx, maxy),
            ax,
            ay,
        )
    }

    #[inline(always)]
    pub fn sample<const BILINEAR: bool, const WRAP: bool>(&self, x: f32, y: f32) -> C {
        if BILINEAR {
            self.bilinear::<WRAP>(x, y)
        } else {
            self.nearest::<WRAP>(x, y)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::color::{Rgb24, RgbF};

    fn checker() -> Image<Rgb24> {
        Image::from_fn(4, 4, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb24::new(255, 255, 255)
            } else {
                Rgb24::new(0, 0, 0)
            }
        })
        .unwrap()
    }

    #[test]
    fn wrap_and_clamp_addressing() {
        let tex = Image::from_fn(4, 2, |x, y| Rgb24::new(x as u8, y as u8, 0)).unwrap();
        let s = TextureSampler::new(&tex);
        assert_eq!(s.nearest::<true>(5.5, 3.0), Rgb24::new(1, 1, 0));
        assert_eq!(s.nearest::<false>(5.5, 3.0), Rgb24::new(3, 1, 0));
        assert_eq!(s.nearest::<false>(-2.0, -7.0), Rgb24::new(0, 0, 0));
        assert_eq!(s.nearest::<true>(-1.0, 0.0), Rgb24::new(3, 0, 0));
    }

    #[test]
    fn bilinear_blends_neighbours() {
        let tex = checker();
        let s = TextureSampler::new(&tex);
        let c = s.bilinear::<true>(0.5, 0.0);
        assert!((c.r as i32 - 127).abs() <= 1, "got {:?}", c);
        // Exactly on a texel corner the blend returns the texel itself.
        assert_eq!(s.bilinear::<true>(2.0, 2.0), Rgb24::new(255, 255, 255));
    }

    #[test]
    fn float_texture_bilinear() {
        let tex = Image::from_fn(2, 2, |x, _| if x == 0 { RgbF::BLACK } else { RgbF::WHITE }).unwrap();
        let s = TextureSampler::new(&tex);
        let c = s.sample::<true, false>(0.25, 0.0);
        assert!((c.g - 0.25).abs() < 1e-6);
    }
}
