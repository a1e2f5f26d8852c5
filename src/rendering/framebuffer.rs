/// Pixel buffers and depth buffers the pipeline renders into.
///
/// Memory layout is row-major: pixel `(x, y)` lives at `x + y * stride`.
/// The z-buffer is always tightly packed with a row pitch of `width`.
use crate::error::{ImageError, RenderError};
use crate::rendering::color::Color;

/// Read/write access to a row-major 2D pixel array.
pub trait PixelBuffer<C: Color> {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Distance in pixels between the start of two consecutive rows.
    fn stride(&self) -> usize;
    fn pixels(&self) -> &[C];
    fn pixels_mut(&mut self) -> &mut [C];

    #[inline]
    fn pixel(&self, x: usize, y: usize) -> Option<C> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        self.pixels().get(x + y * self.stride()).copied()
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: C) {
        if x >= self.width() || y >= self.height() {
            return;
        }
        let stride = self.stride();
        if let Some(p) = self.pixels_mut().get_mut(x + y * stride) {
            *p = color;
        }
    }

    /// Fill the visible area (padding between `width` and `stride` is untouched).
    fn fill(&mut self, color: C) {
        let (w, h, stride) = (self.width(), self.height(), self.stride());
        for row in self.pixels_mut().chunks_mut(stride).take(h) {
            row[..w].fill(color);
        }
    }
}

fn check_layout(width: usize, height: usize, stride: usize, len: usize) -> Result<(), ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::ZeroSize { width, height });
    }
    if stride < width {
        return Err(ImageError::StrideTooSmall { width, stride });
    }
    let needed = stride * (height - 1) + width;
    if len < needed {
        return Err(ImageError::BufferTooShort { len, needed });
    }
    Ok(())
}

/// Owned image. Also used as the texture type.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<C: Color> {
    data: Vec<C>,
    width: usize,
    height: usize,
    stride: usize,
}

impl<C: Color> Image<C> {
    /// Allocate a `width x height` image filled with `C::default()`.
    pub fn new(width: usize, height: usize) -> Result<Self, ImageError> {
        check_layout(width, height, width, width * height)?;
        Ok(Self {
            data: vec![C::default(); width * height],
            width,
            height,
            stride: width,
        })
    }

    /// Wrap an existing pixel vector.
    pub fn from_vec(data: Vec<C>, width: usize, height: usize, stride: usize) -> Result<Self, ImageError> {
        check_layout(width, height, stride, data.len())?;
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Build an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> C,
    ) -> Result<Self, ImageError> {
        let mut im = Self::new(width, height)?;
        for y in 0..height {
            for x in 0..width {
                im.data[x + y * width] = f(x, y);
            }
        }
        Ok(im)
    }

    /// True when both dimensions are powers of two, the requirement for
    /// wrap-around texture addressing.
    #[inline]
    pub fn is_pow2(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }

    /// Size of the pixel storage in bytes.
    #[inline]
    pub fn byte_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<C>()
    }
}

impl<C: Color> PixelBuffer<C> for Image<C> {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }
    #[inline]
    fn height(&self) -> usize {
        self.height
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn pixels(&self) -> &[C] {
        &self.data
    }
    #[inline]
    fn pixels_mut(&mut self) -> &mut [C] {
        &mut self.data
    }
}

/// Mutable view over caller-owned pixel memory (a display buffer, a
/// sub-rectangle of a larger frame...).
#[derive(Debug)]
pub struct ImageViewMut<'a, C: Color> {
    data: &'a mut [C],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, C: Color> ImageViewMut<'a, C> {
    pub fn new(data: &'a mut [C], width: usize, height: usize, stride: usize) -> Result<Self, ImageError> {
        check_layout(width, height, stride, data.len())?;
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// View a `width x height` window of `image` starting at `(x, y)`.
    /// Returns `None` when the window does not fit.
    pub fn sub_image(image: &'a mut Image<C>, x: usize, y: usize, width: usize, height: usize) -> Option<Self> {
        if width == 0 || height == 0 || x + width > image.width || y + height > image.height {
            return None;
        }
        let stride = image.stride;
        let start = x + y * stride;
        let end = start + stride * (height - 1) + width;
        Some(Self {
            data: &mut image.data[start..end],
            width,
            height,
            stride,
        })
    }
}

impl<C: Color> PixelBuffer<C> for ImageViewMut<'_, C> {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }
    #[inline]
    fn height(&self) -> usize {
        self.height
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn pixels(&self) -> &[C] {
        self.data
    }
    #[inline]
    fn pixels_mut(&mut self) -> &mut [C] {
        self.data
    }
}

/// Storage type of a z-buffer entry. Larger values are closer to the camera
/// and a cleared buffer holds `Self::default()` (zero).
pub trait DepthValue: Copy + Default + PartialOrd + std::fmt::Debug + Send + Sync + 'static {
    /// Whether the renderer must map depth into an integer range through
    /// the `wa`/`wb` affine constants.
    const QUANTIZED: bool;

    /// Convert an already mapped depth value to storage.
    fn from_depth(v: f32) -> Self;
}

impl DepthValue for f32 {
    const QUANTIZED: bool = false;

    #[inline(always)]
    fn from_depth(v: f32) -> Self {
        v
    }
}

impl DepthValue for u16 {
    const QUANTIZED: bool = true;

    // `as` saturates out-of-range floats to [0, 65535].
    #[inline(always)]
    fn from_depth(v: f32) -> Self {
        v as u16
    }
}

/// Destination of a draw call: a pixel buffer plus an optional z-buffer.
///
/// Borrowed for exactly one call, which gives the renderer exclusive access
/// without any locking.
pub struct RenderTarget<'a, C: Color, Z: DepthValue = f32> {
    pub(crate) color: &'a mut [C],
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) stride: usize,
    pub(crate) zbuf: Option<&'a mut [Z]>,
}

impl<'a, C: Color, Z: DepthValue> RenderTarget<'a, C, Z> {
    /// Target without depth buffer.
    pub fn new<B: PixelBuffer<C> + ?Sized>(image: &'a mut B) -> Self {
        let (width, height, stride) = (image.width(), image.height(), image.stride());
        Self {
            color: image.pixels_mut(),
            width,
            height,
            stride,
            zbuf: None,
        }
    }

    /// Target with a z-buffer of at least `width * height` entries.
    pub fn with_zbuffer<B: PixelBuffer<C> + ?Sized>(
        image: &'a mut B,
        zbuf: &'a mut [Z],
    ) -> Result<Self, RenderError> {
        let needed = image.width() * image.height();
        if zbuf.len() < needed {
            return Err(RenderError::ZBufferTooSmall {
                len: zbuf.len(),
                needed,
            });
        }
        let mut target = Self::new(image);
        target.zbuf = Some(zbuf);
        Ok(target)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn has_zbuffer(&self) -> bool {
        self.zbuf.is_some()
    }

    /// Reset every depth entry to "infinitely far".
    pub fn clear_zbuffer(&mut self) {
        if let Some(z) = self.zbuf.as_deref_mut() {
            z.fill(Z::default());
        }
    }

    /// Fill the color buffer.
    pub fn clear(&mut self, color: C) {
        let (w, h) = (self.width, self.height);
        for row in self.color.chunks_mut(self.stride).take(h) {
            row[..w].fill(color);
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<C> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.color.get(x + y * self.stride).copied()
    }

    #[inline]
    pub fn depth(&self, x: usize, y: usize) -> Option<Z> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.zbuf.as_deref()?.get(x + y * self.width).copied()
    }
}
