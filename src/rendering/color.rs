/// Pixel color types and the per-pixel operations the shaders need.
///
/// All integer formats with an alpha channel store premultiplied alpha.
/// Shaders only ever touch colors through the [`Color`] trait, so every
/// scanline loop is generic over the destination pixel format.
use std::ops::{Add, Mul, Sub};

/// Operations a pixel type must provide to be rendered into.
pub trait Color: Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    fn from_rgbf(c: RgbF) -> Self;

    fn to_rgbf(self) -> RgbF;

    /// Multiply the color channels by `m/256` with `m` in `[0, 256]`.
    /// Alpha is left untouched.
    fn mult256(&mut self, mr: i32, mg: i32, mb: i32);

    /// Returns `(w1*c1 + w2*c2 + (total-w1-w2)*c3) / total`.
    fn interpolate_triangle(c1: Self, w1: i32, c2: Self, w2: i32, c3: Self, total: i32) -> Self;

    /// Bilinear blend of four neighbouring texels. `ax`, `ay` in `[0,1]` are
    /// the distances to `c00` along x and y.
    fn interpolate_bilinear(c00: Self, c10: Self, c01: Self, c11: Self, ax: f32, ay: f32) -> Self;
}

#[inline(always)]
fn scale_channel(c: i32, m: i32, max: i32) -> i32 {
    ((c * m) >> 8).clamp(0, max)
}

#[inline(always)]
fn tri_channel(c1: i32, w1: i64, c2: i32, w2: i64, c3: i32, total: i64) -> i64 {
    c3 as i64 + (w1 * (c1 - c3) as i64 + w2 * (c2 - c3) as i64) / total
}

#[inline(always)]
fn bilinear_fixed(c00: i32, c10: i32, c01: i32, c11: i32, iax: i32, iay: i32) -> i32 {
    let rax = 256 - iax;
    let ray = 256 - iay;
    (rax * (ray * c00 + iay * c01) + iax * (ray * c10 + iay * c11)) >> 16
}

#[inline(always)]
fn bilinear_float(c00: f32, c10: f32, c01: f32, c11: f32, ax: f32, ay: f32) -> f32 {
    let rax = 1.0 - ax;
    let ray = 1.0 - ay;
    rax * (ray * c00 + ay * c01) + ax * (ray * c10 + ay * c11)
}

// ---------------------------------------------------------------------------
// RgbF
// ---------------------------------------------------------------------------

/// Floating point RGB triplet. Used for lighting and as the exchange format
/// between pixel types.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RgbF {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbF {
    pub const BLACK: RgbF = RgbF::new(0.0, 0.0, 0.0);
    pub const WHITE: RgbF = RgbF::new(1.0, 1.0, 1.0);
    pub const RED: RgbF = RgbF::new(1.0, 0.0, 0.0);
    pub const GREEN: RgbF = RgbF::new(0.0, 1.0, 0.0);
    pub const BLUE: RgbF = RgbF::new(0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Clamp every channel to `[0, 1]`.
    #[inline]
    pub fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }
}

impl Add for RgbF {
    type Output = RgbF;
    #[inline]
    fn add(self, o: RgbF) -> RgbF {
        RgbF::new(self.r + o.r, self.g + o.g, self.b + o.b)
    }
}

impl Sub for RgbF {
    type Output = RgbF;
    #[inline]
    fn sub(self, o: RgbF) -> RgbF {
        RgbF::new(self.r - o.r, self.g - o.g, self.b - o.b)
    }
}

impl Mul<f32> for RgbF {
    type Output = RgbF;
    #[inline]
    fn mul(self, s: f32) -> RgbF {
        RgbF::new(self.r * s, self.g * s, self.b * s)
    }
}

/// Channel-wise product.
impl Mul for RgbF {
    type Output = RgbF;
    #[inline]
    fn mul(self, o: RgbF) -> RgbF {
        RgbF::new(self.r * o.r, self.g * o.g, self.b * o.b)
    }
}

impl Color for RgbF {
    #[inline]
    fn from_rgbf(c: RgbF) -> Self {
        c
    }

    #[inline]
    fn to_rgbf(self) -> RgbF {
        self
    }

    #[inline]
    fn mult256(&mut self, mr: i32, mg: i32, mb: i32) {
        self.r = self.r * mr as f32 / 256.0;
        self.g = self.g * mg as f32 / 256.0;
        self.b = self.b * mb as f32 / 256.0;
    }

    #[inline]
    fn interpolate_triangle(c1: Self, w1: i32, c2: Self, w2: i32, c3: Self, total: i32) -> Self {
        let (w1, w2, t) = (w1 as f32, w2 as f32, total as f32);
        RgbF::new(
            c3.r + (w1 * (c1.r - c3.r) + w2 * (c2.r - c3.r)) / t,
            c3.g + (w1 * (c1.g - c3.g) + w2 * (c2.g - c3.g)) / t,
            c3.b + (w1 * (c1.b - c3.b) + w2 * (c2.b - c3.b)) / t,
        )
    }

    #[inline]
    fn interpolate_bilinear(c00: Self, c10: Self, c01: Self, c11: Self, ax: f32, ay: f32) -> Self {
        RgbF::new(
            bilinear_float(c00.r, c10.r, c01.r, c11.r, ax, ay),
            bilinear_float(c00.g, c10.g, c01.g, c11.g, ax, ay),
            bilinear_float(c00.b, c10.b, c01.b, c11.b, ax, ay),
        )
    }
}

// ---------------------------------------------------------------------------
// Rgb565
// ---------------------------------------------------------------------------

/// 16-bit packed color: 5 bits red, 6 bits green, 5 bits blue.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Rgb565(pub u16);

const RGB565_SPREAD_MASK: u32 = 0b0000_0111_1110_0000_1111_1000_0001_1111;

impl Rgb565 {
    /// Build from raw channel values (r, b in `[0,31]`, g in `[0,63]`).
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self((((r & 31) as u16) << 11) | (((g & 63) as u16) << 5) | ((b & 31) as u16))
    }

    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 11) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        ((self.0 >> 5) & 63) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 & 31) as u8
    }

    // Green moves to the upper half word so all three channels can be
    // scaled by a 5-bit weight with a single multiply.
    #[inline(always)]
    fn spread(self) -> u32 {
        (self.0 as u32 | ((self.0 as u32) << 16)) & RGB565_SPREAD_MASK
    }

    #[inline(always)]
    fn contract(v: u32) -> Self {
        let v = v & RGB565_SPREAD_MASK;
        Self(((v >> 16) | v) as u16)
    }
}

impl Color for Rgb565 {
    #[inline]
    fn from_rgbf(c: RgbF) -> Self {
        let c = c.clamped();
        Rgb565::new((c.r * 31.0) as u8, (c.g * 63.0) as u8, (c.b * 31.0) as u8)
    }

    #[inline]
    fn to_rgbf(self) -> RgbF {
        RgbF::new(
            self.r() as f32 / 31.0,
            self.g() as f32 / 63.0,
            self.b() as f32 / 31.0,
        )
    }

    #[inline]
    fn mult256(&mut self, mr: i32, mg: i32, mb: i32) {
        *self = Rgb565::new(
            scale_channel(self.r() as i32, mr, 31) as u8,
            scale_channel(self.g() as i32, mg, 63) as u8,
            scale_channel(self.b() as i32, mb, 31) as u8,
        );
    }

    #[inline]
    fn interpolate_triangle(c1: Self, w1: i32, c2: Self, w2: i32, c3: Self, total: i32) -> Self {
        let total = total as i64;
        let w1 = ((w1 as i64) << 5) / total;
        let w2 = ((w2 as i64) << 5) / total;
        let w3 = (32 - w1 - w2).max(0);
        let sum = c1.spread() as u64 * w1 as u64
            + c2.spread() as u64 * w2 as u64
            + c3.spread() as u64 * w3 as u64;
        Rgb565::contract((sum >> 5) as u32)
    }

    #[inline]
    fn interpolate_bilinear(c00: Self, c10: Self, c01: Self, c11: Self, ax: f32, ay: f32) -> Self {
        let iax = (ax * 256.0) as i32;
        let iay = (ay * 256.0) as i32;
        let ch = |f: fn(Rgb565) -> u8| {
            bilinear_fixed(
                f(c00) as i32,
                f(c10) as i32,
                f(c01) as i32,
                f(c11) as i32,
                iax,
                iay,
            ) as u8
        };
        Rgb565::new(ch(Rgb565::r), ch(Rgb565::g), ch(Rgb565::b))
    }
}

// ---------------------------------------------------------------------------
// Rgb24
// ---------------------------------------------------------------------------

/// 8 bits per channel, no alpha.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Rgb24 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb24 {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Color for Rgb24 {
    #[inline]
    fn from_rgbf(c: RgbF) -> Self {
        let c = c.clamped();
        Rgb24::new((c.r * 255.0) as u8, (c.g * 255.0) as u8, (c.b * 255.0) as u8)
    }

    #[inline]
    fn to_rgbf(self) -> RgbF {
        RgbF::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }

    #[inline]
    fn mult256(&mut self, mr: i32, mg: i32, mb: i32) {
        self.r = scale_channel(self.r as i32, mr, 255) as u8;
        self.g = scale_channel(self.g as i32, mg, 255) as u8;
        self.b = scale_channel(self.b as i32, mb, 255) as u8;
    }

    #[inline]
    fn interpolate_triangle(c1: Self, w1: i32, c2: Self, w2: i32, c3: Self, total: i32) -> Self {
        let (w1, w2, t) = (w1 as i64, w2 as i64, total as i64);
        let ch = |a: u8, b: u8, c: u8| tri_channel(a as i32, w1, b as i32, w2, c as i32, t).clamp(0, 255) as u8;
        Rgb24::new(ch(c1.r, c2.r, c3.r), ch(c1.g, c2.g, c3.g), ch(c1.b, c2.b, c3.b))
    }

    #[inline]
    fn interpolate_bilinear(c00: Self, c10: Self, c01: Self, c11: Self, ax: f32, ay: f32) -> Self {
        let iax = (ax * 256.0) as i32;
        let iay = (ay * 256.0) as i32;
        let ch = |a: u8, b: u8, c: u8, d: u8| {
            bilinear_fixed(a as i32, b as i32, c as i32, d as i32, iax, iay) as u8
        };
        Rgb24::new(
            ch(c00.r, c10.r, c01.r, c11.r),
            ch(c00.g, c10.g, c01.g, c11.g),
            ch(c00.b, c10.b, c01.b, c11.b),
        )
    }
}

// ---------------------------------------------------------------------------
// Rgb32
// ---------------------------------------------------------------------------

/// 8 bits per channel with premultiplied alpha.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Rgb32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgb32 {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Pack as `0x00RRGGBB`, the layout window surfaces expect.
    #[inline]
    pub const fn to_xrgb(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | (self.b as u32)
    }
}

impl Color for Rgb32 {
    #[inline]
    fn from_rgbf(c: RgbF) -> Self {
        let c = c.clamped();
        Rgb32::opaque((c.r * 255.0) as u8, (c.g * 255.0) as u8, (c.b * 255.0) as u8)
    }

    #[inline]
    fn to_rgbf(self) -> RgbF {
        RgbF::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }

    #[inline]
    fn mult256(&mut self, mr: i32, mg: i32, mb: i32) {
        self.r = scale_channel(self.r as i32, mr, 255) as u8;
        self.g = scale_channel(self.g as i32, mg, 255) as u8;
        self.b = scale_channel(self.b as i32, mb, 255) as u8;
    }

    #[inline]
    fn interpolate_triangle(c1: Self, w1: i32, c2: Self, w2: i32, c3: Self, total: i32) -> Self {
        let (w1, w2, t) = (w1 as i64, w2 as i64, total as i64);
        let ch = |a: u8, b: u8, c: u8| tri_channel(a as i32, w1, b as i32, w2, c as i32, t).clamp(0, 255) as u8;
        Rgb32::new(
            ch(c1.r, c2.r, c3.r),
            ch(c1.g, c2.g, c3.g),
            ch(c1.b, c2.b, c3.b),
            ch(c1.a, c2.a, c3.a),
        )
    }

    #[inline]
    fn interpolate_bilinear(c00: Self, c10: Self, c01: Self, c11: Self, ax: f32, ay: f32) -> Self {
        let iax = (ax * 256.0) as i32;
        let iay = (ay * 256.0) as i32;
        let ch = |a: u8, b: u8, c: u8, d: u8| {
            bilinear_fixed(a as i32, b as i32, c as i32, d as i32, iax, iay) as u8
        };
        Rgb32::new(
            ch(c00.r, c10.r, c01.r, c11.r),
            ch(c00.g, c10.g, c01.g, c11.g),
            ch(c00.b, c10.b, c01.b, c11.b),
            ch(c00.a, c10.a, c01.a, c11.a),
        )
    }
}

// ---------------------------------------------------------------------------
// Rgb64
// ---------------------------------------------------------------------------

/// 16 bits per channel with premultiplied alpha.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Rgb64 {
    pub r: u16,
    pub g: u16,
    pub b: u16,
    pub a: u16,
}

impl Rgb64 {
    #[inline]
    pub const fn new(r: u16, g: u16, b: u16, a: u16) -> Self {
        Self { r, g, b, a }
    }
}

impl Color for Rgb64 {
    #[inline]
    fn from_rgbf(c: RgbF) -> Self {
        let c = c.clamped();
        Rgb64::new(
            (c.r * 65535.0) as u16,
            (c.g * 65535.0) as u16,
            (c.b * 65535.0) as u16,
            u16::MAX,
        )
    }

    #[inline]
    fn to_rgbf(self) -> RgbF {
        RgbF::new(
            self.r as f32 / 65535.0,
            self.g as f32 / 65535.0,
            self.b as f32 / 65535.0,
        )
    }

    #[inline]
    fn mult256(&mut self, mr: i32, mg: i32, mb: i32) {
        self.r = scale_channel(self.r as i32, mr, 65535) as u16;
        self.g = scale_channel(self.g as i32, mg, 65535) as u16;
        self.b = scale_channel(self.b as i32, mb, 65535) as u16;
    }

    #[inline]
    fn interpolate_triangle(c1: Self, w1: i32, c2: Self, w2: i32, c3: Self, total: i32) -> Self {
        let (w1, w2, t) = (w1 as i64, w2 as i64, total as i64);
        let ch = |a: u16, b: u16, c: u16| {
            tri_channel(a as i32, w1, b as i32, w2, c as i32, t).clamp(0, 65535) as u16
        };
        Rgb64::new(
            ch(c1.r, c2.r, c3.r),
            ch(c1.g, c2.g, c3.g),
            ch(c1.b, c2.b, c3.b),
            ch(c1.a, c2.a, c3.a),
        )
    }

    #[inline]
    fn interpolate_bilinear(c00: Self, c10: Self, c01: Self, c11: Self, ax: f32, ay: f32) -> Self {
        let ch = |a: u16, b: u16, c: u16, d: u16| {
            bilinear_float(a as f32, b as f32, c as f32, d as f32, ax, ay)
                .round()
                .clamp(0.0, 65535.0) as u16
        };
        Rgb64::new(
            ch(c00.r, c10.r, c01.r, c11.r),
            ch(c00.g, c10.g, c01.g, c11.g),
            ch(c00.b, c10.b, c01.b, c11.b),
            ch(c00.a, c10.a, c01.a, c11.a),
        )
    }
}
