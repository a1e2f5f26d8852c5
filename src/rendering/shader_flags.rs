/// Shader selection flags.
///
/// The same bit set serves two purposes: the *runtime* request carried by
/// each draw call, and the *compile-time* set of variants a renderer is
/// instantiated with (passed as the raw `u32` const generic `ENABLED`).
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderFlags: u32 {
        const PERSPECTIVE       = 1 << 0;
        const ORTHO             = 1 << 1;
        const NOZBUFFER         = 1 << 2;
        const ZBUFFER           = 1 << 3;
        const FLAT              = 1 << 4;
        const GOURAUD           = 1 << 5;
        const NOTEXTURE         = 1 << 7;
        const TEXTURE           = 1 << 8;
        const TEXTURE_NEAREST   = 1 << 11;
        const TEXTURE_BILINEAR  = 1 << 12;
        const TEXTURE_WRAP_POW2 = 1 << 13;
        const TEXTURE_CLAMP     = 1 << 14;

        const PROJECTION      = Self::PERSPECTIVE.bits() | Self::ORTHO.bits();
        const DEPTH           = Self::NOZBUFFER.bits() | Self::ZBUFFER.bits();
        const SHADING         = Self::FLAT.bits() | Self::GOURAUD.bits();
        const TEXTURING       = Self::NOTEXTURE.bits() | Self::TEXTURE.bits();
        const TEXTURE_QUALITY = Self::TEXTURE_NEAREST.bits() | Self::TEXTURE_BILINEAR.bits();
        const TEXTURE_MODE    = Self::TEXTURE_WRAP_POW2.bits() | Self::TEXTURE_CLAMP.bits();
        const ALL             = Self::PROJECTION.bits()
                              | Self::DEPTH.bits()
                              | Self::SHADING.bits()
                              | Self::TEXTURING.bits()
                              | Self::TEXTURE_QUALITY.bits()
                              | Self::TEXTURE_MODE.bits();
    }
}

/// Every variant compiled in. Default for `Renderer3D`'s `ENABLED` parameter.
pub const SHADERS_ALL: u32 = ShaderFlags::ALL.bits();

impl ShaderFlags {
    #[inline]
    pub const fn has_zbuffer(self) -> bool {
        self.contains(Self::ZBUFFER)
    }

    #[inline]
    pub const fn is_ortho(self) -> bool {
        self.contains(Self::ORTHO)
    }

    #[inline]
    pub const fn is_gouraud(self) -> bool {
        self.contains(Self::GOURAUD)
    }

    #[inline]
    pub const fn is_textured(self) -> bool {
        self.contains(Self::TEXTURE)
    }

    #[inline]
    pub const fn is_bilinear(self) -> bool {
        self.contains(Self::TEXTURE_BILINEAR)
    }

    #[inline]
    pub const fn is_clamp(self) -> bool {
        self.contains(Self::TEXTURE_CLAMP)
    }

    /// Merge a shading request into the current flags. Mutually exclusive
    /// bits replace each other; any texture-related bit turns texturing on,
    /// otherwise texturing is switched off.
    pub fn rectified_with(self, request: ShaderFlags) -> ShaderFlags {
        let mut out = self;
        if request.contains(Self::GOURAUD) {
            out.remove(Self::FLAT);
            out.insert(Self::GOURAUD);
        } else if request.contains(Self::FLAT) {
            out.remove(Self::GOURAUD);
            out.insert(Self::FLAT);
        }
        let texture_bits = Self::TEXTURE | Self::TEXTURE_QUALITY | Self::TEXTURE_MODE;
        if request.intersects(texture_bits) {
            out.remove(Self::NOTEXTURE);
            out.insert(Self::TEXTURE);
            if request.intersects(Self::TEXTURE_MODE) {
                out.remove(Self::TEXTURE_MODE);
                out.insert(if request.contains(Self::TEXTURE_CLAMP) {
                    Self::TEXTURE_CLAMP
                } else {
                    Self::TEXTURE_WRAP_POW2
                });
            }
            if request.intersects(Self::TEXTURE_QUALITY) {
                out.remove(Self::TEXTURE_QUALITY);
                out.insert(if request.contains(Self::TEXTURE_BILINEAR) {
                    Self::TEXTURE_BILINEAR
                } else {
                    Self::TEXTURE_NEAREST
                });
            }
        } else {
            out.remove(Self::TEXTURE);
            out.insert(Self::NOTEXTURE);
        }
        out
    }

    /// Resolve a runtime request against the compiled-in set `enabled`.
    ///
    /// Each axis falls back when the requested variant is unavailable:
    /// z-buffer to none, ortho to perspective, textured to untextured,
    /// Gouraud to flat, bilinear to nearest, clamp to wrap. Returns `None`
    /// when the fallback itself is not compiled in (nothing gets drawn).
    pub fn resolve(self, enabled: ShaderFlags) -> Option<ShaderVariant> {
        let pick = |flag: ShaderFlags, fallback: ShaderFlags| -> Option<bool> {
            if enabled.contains(flag) && self.contains(flag) {
                Some(true)
            } else if enabled.contains(fallback) {
                Some(false)
            } else {
                None
            }
        };
        let zbuffer = pick(Self::ZBUFFER, Self::NOZBUFFER)?;
        let ortho = pick(Self::ORTHO, Self::PERSPECTIVE)?;
        let textured = pick(Self::TEXTURE, Self::NOTEXTURE)?;
        let gouraud = pick(Self::GOURAUD, Self::FLAT)?;
        let (bilinear, clamp) = if textured {
            (
                pick(Self::TEXTURE_BILINEAR, Self::TEXTURE_NEAREST)?,
                pick(Self::TEXTURE_CLAMP, Self::TEXTURE_WRAP_POW2)?,
            )
        } else {
            (false, false)
        };
        Some(ShaderVariant {
            zbuffer,
            ortho,
            textured,
            gouraud,
            bilinear,
            wrap: !clamp,
        })
    }
}

/// A fully resolved shader choice: one concrete scanline routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderVariant {
    pub zbuffer: bool,
    pub ortho: bool,
    pub textured: bool,
    pub gouraud: bool,
    pub bilinear: bool,
    /// Power-of-two wrap when true, clamp otherwise. Meaningless untextured.
    pub wrap: bool,
}

impl From<ShaderVariant> for ShaderFlags {
    fn from(v: ShaderVariant) -> Self {
        let pick = |on: bool, yes: ShaderFlags, no: ShaderFlags| if on { yes } else { no };
        let mut f = pick(v.zbuffer, Self::ZBUFFER, Self::NOZBUFFER)
            | pick(v.ortho, Self::ORTHO, Self::PERSPECTIVE)
            | pick(v.gouraud, Self::GOURAUD, Self::FLAT)
            | pick(v.textured, Self::TEXTURE, Self::NOTEXTURE);
        if v.textured {
            f |= pick(v.bilinear, Self::TEXTURE_BILINEAR, Self::TEXTURE_NEAREST)
                | pick(v.wrap, Self::TEXTURE_WRAP_POW2, Self::TEXTURE_CLAMP);
        }
        f
    }
}
