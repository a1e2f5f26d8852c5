/// Phong lighting with a tabulated specular term.
///
/// `pow(x, e)` is far too slow to run once per vertex on small cores, so the
/// specular factor is read from a 32-entry table covering the range where
/// `x^e` is still visible and linearly interpolated between entries.
use crate::rendering::color::RgbF;

/// Number of entries in the specular table.
pub const SPECULAR_TABLE_SIZE: usize = 32;

/// Lookup table approximating `x^exponent` on `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SpecularTable {
    exponent: i32,
    powmax: f32,
    table: [f32; SPECULAR_TABLE_SIZE],
}

impl SpecularTable {
    pub fn new(exponent: i32) -> Self {
        let mut t = SpecularTable {
            exponent: i32::MIN,
            powmax: 1.0,
            table: [0.0; SPECULAR_TABLE_SIZE],
        };
        t.rebuild(exponent);
        t
    }

    #[inline]
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Recompute the table if `exponent` differs from the cached one.
    /// Returns whether a recomputation happened.
    pub fn update(&mut self, exponent: i32) -> bool {
        if exponent == self.exponent {
            return false;
        }
        self.rebuild(exponent);
        true
    }

    fn rebuild(&mut self, exponent: i32) {
        self.exponent = exponent;
        if exponent <= 0 {
            self.powmax = 1.0;
            self.table = [0.0; SPECULAR_TABLE_SIZE];
            return;
        }
        // Entries are spaced evenly on [0, powmax], where powmax^e = 10.
        let e = exponent as f32;
        self.powmax = 10f32.powf(1.0 / e);
        let n = SPECULAR_TABLE_SIZE as f32;
        for (k, v) in self.table.iter_mut().enumerate() {
            *v = (self.powmax * (1.0 - k as f32 / n)).powf(e);
        }
        log::trace!("specular table rebuilt for exponent {exponent}");
    }

    /// Approximate `x^exponent`. Zero for `x` too small to matter.
    #[inline]
    pub fn eval(&self, x: f32) -> f32 {
        let n = SPECULAR_TABLE_SIZE as f32;
        let indf = (1.0 - x / self.powmax) * n;
        let indi = (indf as i32).max(0) as usize;
        if indi >= SPECULAR_TABLE_SIZE - 1 {
            return 0.0;
        }
        let a = self.table[indi];
        a + (indf - indi as f32) * (self.table[indi + 1] - a)
    }
}

impl Default for SpecularTable {
    fn default() -> Self {
        SpecularTable::new(0)
    }
}

/// Light colors already multiplied by the material strengths, plus the
/// specular table for the material exponent.
#[derive(Clone, Debug)]
pub struct PhongModel {
    pub ambient: RgbF,
    pub diffuse: RgbF,
    pub specular: RgbF,
    pub table: SpecularTable,
}

impl PhongModel {
    /// Intensity without the object color: `ambient + diffuse*max(vd,0) +
    /// specular*pow(vs)`, clamped. Used to modulate textures.
    #[inline]
    pub fn intensity(&self, v_diffuse: f32, v_specular: f32) -> RgbF {
        self.raw(v_diffuse, v_specular).clamped()
    }

    /// Full Phong color for an untextured surface of color `color`.
    #[inline]
    pub fn shade(&self, v_diffuse: f32, v_specular: f32, color: RgbF) -> RgbF {
        (self.raw(v_diffuse, v_specular) * color).clamped()
    }

    #[inline(always)]
    fn raw(&self, v_diffuse: f32, v_specular: f32) -> RgbF {
        self.ambient + self.diffuse * v_diffuse.max(0.0) + self.specular * self.table.eval(v_specular)
    }
}
