/// Mesh descriptor consumed by the renderer.
///
/// Arrays are either borrowed from caller-owned (often `static`) data or
/// shared through an `Arc` when the mesh was deep-cloned by
/// [`cache_mesh`](super::cache_mesh). Meshes form singly linked chains
/// through `next`.
use crate::camera::Box3;
use crate::error::MeshError;
use crate::meshing::face_chain::{FaceChainReader, FaceEvent, FaceLayout};
use crate::rendering::color::{Color, RgbF};
use crate::rendering::framebuffer::Image;
use glam::{Vec2, Vec3};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Vertex indices are 15 bits wide (the top bit is the chain direction).
pub const MAX_VERTICES: usize = 32767;
pub const MAX_TEXCOORDS: usize = 65535;
pub const MAX_NORMALS: usize = 65535;

/// Read-only data that is either borrowed or reference counted.
pub enum Shared<'a, T: ?Sized> {
    Borrowed(&'a T),
    Owned(Arc<T>),
}

impl<T: ?Sized> Shared<'_, T> {
    /// Address of the underlying data. Two `Shared` with the same address
    /// view the same memory.
    #[inline]
    pub fn address(&self) -> usize {
        let r: &T = self;
        (r as *const T).cast::<()>() as usize
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Shared::Owned(_))
    }
}

impl<T: ?Sized> Deref for Shared<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        match self {
            Shared::Borrowed(r) => r,
            Shared::Owned(a) => a,
        }
    }
}

impl<T: ?Sized> Clone for Shared<'_, T> {
    fn clone(&self) -> Self {
        match self {
            Shared::Borrowed(r) => Shared::Borrowed(r),
            Shared::Owned(a) => Shared::Owned(Arc::clone(a)),
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

impl<'a, T: ?Sized> From<&'a T> for Shared<'a, T> {
    fn from(r: &'a T) -> Self {
        Shared::Borrowed(r)
    }
}

impl<T: ?Sized> From<Arc<T>> for Shared<'_, T> {
    fn from(a: Arc<T>) -> Self {
        Shared::Owned(a)
    }
}

impl<T> From<Vec<T>> for Shared<'_, [T]> {
    fn from(v: Vec<T>) -> Self {
        Shared::Owned(v.into())
    }
}

/// Where a mesh's data lives. Slow tiers have high random-access latency;
/// the renderer only reports the tier, it never changes behavior.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MemoryTier {
    #[default]
    Internal,
    External,
    Flash,
}

/// Surface reflection parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Material {
    pub color: RgbF,
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    /// 0 disables the specular highlight.
    pub exponent: i32,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            color: RgbF::new(0.75, 0.75, 0.75),
            ambient: 0.15,
            diffuse: 0.7,
            specular: 0.5,
            exponent: 8,
        }
    }
}

/// A triangle mesh in face-chain form.
pub struct Mesh3D<'a, C: Color> {
    pub vertices: Shared<'a, [Vec3]>,
    pub texcoords: Option<Shared<'a, [Vec2]>>,
    /// Unit length.
    pub normals: Option<Shared<'a, [Vec3]>>,
    /// Face chains, see [`face_chain`](super::face_chain).
    pub faces: Shared<'a, [u16]>,
    pub texture: Option<Shared<'a, Image<C>>>,
    pub material: Material,
    /// All-zero means unknown.
    pub bounding_box: Box3,
    pub next: Option<Shared<'a, Mesh3D<'a, C>>>,
    pub name: Option<&'a str>,
    pub tier: MemoryTier,
}

impl<C: Color> Clone for Mesh3D<'_, C> {
    fn clone(&self) -> Self {
        Mesh3D {
            vertices: self.vertices.clone(),
            texcoords: self.texcoords.clone(),
            normals: self.normals.clone(),
            faces: self.faces.clone(),
            texture: self.texture.clone(),
            material: self.material,
            bounding_box: self.bounding_box,
            next: self.next.clone(),
            name: self.name,
            tier: self.tier,
        }
    }
}

impl<C: Color> fmt::Debug for Mesh3D<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh3D")
            .field("name", &self.name)
            .field("vertices", &self.vertices.len())
            .field("texcoords", &self.texcoords.as_ref().map(|t| t.len()))
            .field("normals", &self.normals.as_ref().map(|n| n.len()))
            .field("face_words", &self.faces.len())
            .field("textured", &self.texture.is_some())
            .field("tier", &self.tier)
            .field("chained", &self.next.is_some())
            .finish()
    }
}

impl<'a, C: Color> Mesh3D<'a, C> {
    /// Mesh with only positions and faces; everything else unset.
    pub fn new(vertices: impl Into<Shared<'a, [Vec3]>>, faces: impl Into<Shared<'a, [u16]>>) -> Self {
        Mesh3D {
            vertices: vertices.into(),
            texcoords: None,
            normals: None,
            faces: faces.into(),
            texture: None,
            material: Material::default(),
            bounding_box: Box3::default(),
            next: None,
            name: None,
            tier: MemoryTier::default(),
        }
    }

    pub fn with_normals(mut self, normals: impl Into<Shared<'a, [Vec3]>>) -> Self {
        self.normals = Some(normals.into());
        self
    }

    pub fn with_texcoords(mut self, texcoords: impl Into<Shared<'a, [Vec2]>>) -> Self {
        self.texcoords = Some(texcoords.into());
        self
    }

    pub fn with_texture(mut self, texture: impl Into<Shared<'a, Image<C>>>) -> Self {
        self.texture = Some(texture.into());
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_next(mut self, next: impl Into<Shared<'a, Mesh3D<'a, C>>>) -> Self {
        self.next = Some(next.into());
        self
    }

    /// Recompute the bounding box from the vertex array.
    pub fn with_computed_bounds(mut self) -> Self {
        self.bounding_box = Box3::from_points(self.vertices.iter());
        self
    }

    /// Which optional words each face element carries.
    pub fn face_layout(&self) -> FaceLayout {
        FaceLayout {
            texcoords: self.texcoords.is_some(),
            normals: self.normals.is_some(),
        }
    }

    pub fn face_reader(&self) -> FaceChainReader<'_> {
        FaceChainReader::new(&self.faces, self.face_layout())
    }

    /// Number of triangles described by the face array.
    pub fn triangle_count(&self) -> usize {
        self.face_reader().count()
    }

    /// This mesh followed by every mesh reachable through `next`.
    pub fn chain(&self) -> MeshChain<'_, 'a, C> {
        MeshChain { current: Some(self) }
    }

    /// Check the preconditions the renderer relies on: array sizes, index
    /// ranges and a well-formed face array. Not called when drawing.
    pub fn validate(&self) -> Result<(), MeshError> {
        let limit = |what: &'static str, count: usize, limit: usize| {
            if count > limit {
                Err(MeshError::TooManyElements { what, count, limit })
            } else {
                Ok(())
            }
        };
        limit("vertex", self.vertices.len(), MAX_VERTICES)?;
        if let Some(t) = &self.texcoords {
            limit("texcoord", t.len(), MAX_TEXCOORDS)?;
        }
        if let Some(n) = &self.normals {
            limit("normal", n.len(), MAX_NORMALS)?;
        }

        let check = |what: &'static str, index: u16, len: usize, at: usize| {
            if index as usize >= len {
                Err(MeshError::IndexOutOfRange {
                    what,
                    index: index as usize,
                    len,
                    at,
                })
            } else {
                Ok(())
            }
        };
        let n_tex = self.texcoords.as_ref().map_or(0, |t| t.len());
        let n_nrm = self.normals.as_ref().map_or(0, |n| n.len());
        let layout = self.face_layout();
        let mut reader = self.face_reader();
        while let Some(event) = reader.next() {
            let at = reader.position();
            let elements = match &event {
                FaceEvent::Start(e) => &e[..],
                FaceEvent::Next { element, .. } => std::slice::from_ref(element),
            };
            for e in elements {
                check("vertex", e.vertex, self.vertices.len(), at)?;
                if layout.texcoords {
                    check("texcoord", e.texcoord, n_tex, at)?;
                }
                if layout.normals {
                    check("normal", e.normal, n_nrm, at)?;
                }
            }
        }
        if let Some(at) = reader.direction_bit_on_opening() {
            return Err(MeshError::DirectionBitOnOpening { at });
        }
        if let Some(at) = reader.truncated_at() {
            return Err(MeshError::TruncatedFaces { at });
        }
        Ok(())
    }
}

/// Iterator over a mesh chain.
pub struct MeshChain<'m, 'a, C: Color> {
    current: Option<&'m Mesh3D<'a, C>>,
}

impl<'m, 'a, C: Color> Iterator for MeshChain<'m, 'a, C> {
    type Item = &'m Mesh3D<'a, C>;

    fn next(&mut self) -> Option<Self::Item> {
        let m = self.current?;
        self.current = m.next.as_deref();
        Some(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::color::Rgb565;

    static VERTS: [Vec3; 4] = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ];
    // One chain of two triangles: (0,1,2) then (0,2,3).
    static FACES: [u16; 6] = [2, 0, 1, 2, 3, 0];

    #[test]
    fn shared_deref_and_address() {
        let a: Shared<'_, [Vec3]> = Shared::from(&VERTS[..]);
        let b = a.clone();
        assert_eq!(a.address(), b.address());
        assert_eq!(a.len(), 4);
        let owned: Shared<'_, [Vec3]> = VERTS.to_vec().into();
        assert!(owned.is_owned());
        assert_ne!(owned.address(), a.address());
    }

    #[test]
    fn chain_iteration() {
        let tail: Mesh3D<'_, Rgb565> = Mesh3D::new(&VERTS[..], &FACES[..]).with_name("tail");
        let head = Mesh3D::new(&VERTS[..], &FACES[..]).with_name("head").with_next(&tail);
        let names: Vec<_> = head.chain().filter_map(|m| m.name).collect();
        assert_eq!(names, ["head", "tail"]);
        assert_eq!(head.triangle_count(), 2);
    }

    #[test]
    fn computed_bounds() {
        let m: Mesh3D<'_, Rgb565> = Mesh3D::new(&VERTS[..], &FACES[..]).with_computed_bounds();
        assert_eq!(m.bounding_box.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn validate_reports_bad_indices() {
        let ok: Mesh3D<'_, Rgb565> = Mesh3D::new(&VERTS[..], &FACES[..]);
        assert_eq!(ok.validate(), Ok(()));

        static BAD: [u16; 5] = [1, 0, 1, 9, 0];
        let bad: Mesh3D<'_, Rgb565> = Mesh3D::new(&VERTS[..], &BAD[..]);
        assert!(matches!(
            bad.validate(),
            Err(MeshError::IndexOutOfRange { what: "vertex", index: 9, .. })
        ));

        static CUT: [u16; 4] = [2, 0, 1, 2];
        let cut: Mesh3D<'_, Rgb565> = Mesh3D::new(&VERTS[..], &CUT[..]);
        assert!(matches!(cut.validate(), Err(MeshError::TruncatedFaces { .. })));

        static DIR: [u16; 5] = [1, 0, 0x8001, 2, 0];
        let dir: Mesh3D<'_, Rgb565> = Mesh3D::new(&VERTS[..], &DIR[..]);
        assert!(matches!(dir.validate(), Err(MeshError::DirectionBitOnOpening { .. })));
    }

    #[test]
    fn validate_checks_normal_indices() {
        static NORMALS: [Vec3; 1] = [Vec3::Z];
        // Elements are (vertex, normal) pairs.
        static FACES_N: [u16; 8] = [1, 0, 0, 1, 0, 2, 3, 0];
        let m: Mesh3D<'_, Rgb565> = Mesh3D::new(&VERTS[..], &FACES_N[..]).with_normals(&NORMALS[..]);
        assert!(matches!(
            m.validate(),
            Err(MeshError::IndexOutOfRange { what: "normal", index: 3, .. })
        ));
    }
}
