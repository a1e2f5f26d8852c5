/// Per-pixel shading library.
///
/// Every combination of {z-buffer, none} x {perspective, ortho} x {flat,
/// Gouraud} x {untextured, nearest, bilinear} x {wrap, clamp} is a separate
/// monomorphized loop; the runtime flags are inspected once per triangle by
/// [`select_shader`] and never inside a loop.
pub mod textured;
pub mod untextured;

pub use textured::shade_textured;
pub use untextured::shade_untextured;

use crate::rendering::color::Color;
use crate::rendering::framebuffer::{DepthValue, RenderTarget};
use crate::rendering::rasterizer::{TriangleSetup, Uniforms};
use crate::rendering::shader_flags::{ShaderFlags, ShaderVariant};

/// Shade one rasterized triangle with the loop matching `uniforms.flags`.
///
/// `ENABLED` is the compile-time set of available variants. Requests for a
/// variant outside it fall back along each axis (see
/// [`ShaderFlags::resolve`]); if no fallback exists the triangle is dropped.
/// Branches for disabled variants are constant-false and optimized out.
#[inline]
pub fn select_shader<const ENABLED: u32, C: Color, Z: DepthValue>(
    setup: &TriangleSetup<'_>,
    uniforms: &Uniforms<'_, C>,
    target: &mut RenderTarget<'_, C, Z>,
) {
    let Some(v) = uniforms.flags.resolve(ShaderFlags::from_bits_truncate(ENABLED)) else {
        return;
    };
    if enabled::<ENABLED>(ShaderFlags::ZBUFFER) && v.zbuffer {
        by_texturing::<ENABLED, C, Z, true>(v, setup, uniforms, target);
    } else if enabled::<ENABLED>(ShaderFlags::NOZBUFFER) {
        by_texturing::<ENABLED, C, Z, false>(v, setup, uniforms, target);
    }
}

#[inline(always)]
fn enabled<const ENABLED: u32>(f: ShaderFlags) -> bool {
    ShaderFlags::from_bits_truncate(ENABLED).contains(f)
}

#[inline(always)]
fn by_texturing<const ENABLED: u32, C: Color, Z: DepthValue, const ZBUF: bool>(
    v: ShaderVariant,
    setup: &TriangleSetup<'_>,
    uniforms: &Uniforms<'_, C>,
    target: &mut RenderTarget<'_, C, Z>,
) {
    if enabled::<ENABLED>(ShaderFlags::TEXTURE) && v.textured {
        if enabled::<ENABLED>(ShaderFlags::ORTHO) && v.ortho {
            by_shading::<ENABLED, C, Z, ZBUF, true>(v, setup, uniforms, target);
        } else {
            by_shading::<ENABLED, C, Z, ZBUF, false>(v, setup, uniforms, target);
        }
    } else if enabled::<ENABLED>(ShaderFlags::GOURAUD) && v.gouraud {
        if enabled::<ENABLED>(ShaderFlags::ORTHO) && v.ortho {
            shade_untextured::<C, Z, ZBUF, true, true>(setup, uniforms, target);
        } else {
            shade_untextured::<C, Z, ZBUF, false, true>(setup, uniforms, target);
        }
    } else {
        shade_untextured::<C, Z, ZBUF, false, false>(setup, uniforms, target);
    }
}

#[inline(always)]
fn by_shading<const ENABLED: u32, C: Color, Z: DepthValue, const ZBUF: bool, const ORTHO: bool>(
    v: ShaderVariant,
    setup: &TriangleSetup<'_>,
    uniforms: &Uniforms<'_, C>,
    target: &mut RenderTarget<'_, C, Z>,
) {
    if enabled::<ENABLED>(ShaderFlags::GOURAUD) && v.gouraud {
        by_quality::<ENABLED, C, Z, ZBUF, ORTHO, true>(v, setup, uniforms, target);
    } else {
        by_quality::<ENABLED, C, Z, ZBUF, ORTHO, false>(v, setup, uniforms, target);
    }
}

#[inline(always)]
fn by_quality<
    const ENABLED: u32,
    C: Color,
    Z: DepthValue,
    const ZBUF: bool,
    const ORTHO: bool,
    const GOURAUD: bool,
>(
    v: ShaderVariant,
    setup: &TriangleSetup<'_>,
    uniforms: &Uniforms<'_, C>,
    target: &mut RenderTarget<'_, C, Z>,
) {
    let bilinear = enabled::<ENABLED>(ShaderFlags::TEXTURE_BILINEAR) && v.bilinear;
    let wrap = !(enabled::<ENABLED>(ShaderFlags::TEXTURE_CLAMP) && !v.wrap);
    match (bilinear, wrap) {
        (true, true) => shade_textured::<C, Z, ZBUF, ORTHO, GOURAUD, true, true>(setup, uniforms, target),
        (true, false) => shade_textured::<C, Z, ZBUF, ORTHO, GOURAUD, true, false>(setup, uniforms, target),
        (false, true) => shade_textured::<C, Z, ZBUF, ORTHO, GOURAUD, false, true>(setup, uniforms, target),
        (false, false) => shade_textured::<C, Z, ZBUF, ORTHO, GOURAUD, false, false>(setup, uniforms, target),
    }
}
