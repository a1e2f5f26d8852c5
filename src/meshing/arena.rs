/// Deep cloning of mesh chains into budgeted memory tiers.
///
/// Small targets keep meshes in slow memory (flash, external RAM) and copy
/// the hottest arrays into whatever fast memory is left. `cache_mesh`
/// clones every descriptor of a chain, then copies arrays in a caller
/// chosen order into a primary budget, spilling to a secondary one, and
/// leaves in place whatever fits in neither. Arrays shared between meshes
/// are copied once: the first copy is reused for every later reference.
use crate::meshing::mesh::{MemoryTier, Mesh3D, Shared};
use crate::rendering::color::Color;
use crate::rendering::framebuffer::Image;
use glam::{Vec2, Vec3};
use std::collections::HashMap;
use std::sync::Arc;

/// Copy vertices, then normals, texcoords, textures and finally faces.
pub const DEFAULT_COPY_ORDER: &str = "VNTIF";

/// Bytes available in one memory tier.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TierBudget {
    pub tier: MemoryTier,
    pub bytes: usize,
}

impl TierBudget {
    pub const fn new(tier: MemoryTier, bytes: usize) -> Self {
        TierBudget { tier, bytes }
    }
}

/// Kind of array copied by one step of the copy order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CopyStep {
    Vertices,
    Normals,
    Texcoords,
    Image,
    Faces,
}

impl CopyStep {
    /// Parse a copy order such as `"VNTIF"` (case-insensitive). Unknown
    /// letters are skipped.
    pub fn parse_order(order: &str) -> Vec<CopyStep> {
        order
            .chars()
            .filter_map(|c| match c.to_ascii_uppercase() {
                'V' => Some(CopyStep::Vertices),
                'N' => Some(CopyStep::Normals),
                'T' => Some(CopyStep::Texcoords),
                'I' => Some(CopyStep::Image),
                'F' => Some(CopyStep::Faces),
                other => {
                    log::warn!("cache_mesh: ignoring unknown copy step {other:?}");
                    None
                }
            })
            .collect()
    }
}

/// Result of [`cache_mesh`].
#[derive(Debug)]
pub struct CachedMesh<'a, C: Color> {
    /// Head of the cloned chain (the source head when nothing was cloned).
    pub mesh: Mesh3D<'a, C>,
    pub primary_used: usize,
    pub secondary_used: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum Element {
    Vec3,
    Vec2,
    Word,
    Image,
}

enum Copied<C: Color> {
    Vec3(Arc<[Vec3]>),
    Vec2(Arc<[Vec2]>),
    Words(Arc<[u16]>),
    Image(Arc<Image<C>>),
}

struct MeshCache<C: Color> {
    budgets: [TierBudget; 2],
    used: [usize; 2],
    copies: HashMap<(Element, usize), Copied<C>>,
}

impl<C: Color> MeshCache<C> {
    fn new(primary: TierBudget, secondary: TierBudget) -> Self {
        MeshCache {
            budgets: [primary, secondary],
            used: [0, 0],
            copies: HashMap::new(),
        }
    }

    /// Reserve `size` bytes, primary tier first.
    fn alloc(&mut self, size: usize) -> Option<MemoryTier> {
        for (budget, used) in self.budgets.iter().zip(self.used.iter_mut()) {
            if *used + size <= budget.bytes {
                *used += size;
                return Some(budget.tier);
            }
        }
        None
    }

    fn slice<'a, T: Copy>(
        &mut self,
        src: &Shared<'a, [T]>,
        kind: Element,
        wrap: fn(Arc<[T]>) -> Copied<C>,
        unwrap: fn(&Copied<C>) -> Option<Arc<[T]>>,
    ) -> Shared<'a, [T]> {
        if src.is_empty() {
            return src.clone();
        }
        let key = (kind, src.address());
        if let Some(hit) = self.copies.get(&key).and_then(unwrap) {
            return Shared::Owned(hit);
        }
        if self.alloc(std::mem::size_of_val::<[T]>(src)).is_none() {
            return src.clone();
        }
        let copy: Arc<[T]> = Arc::from(&**src);
        self.copies.insert(key, wrap(Arc::clone(&copy)));
        Shared::Owned(copy)
    }

    fn image<'a>(&mut self, src: &Shared<'a, Image<C>>) -> Shared<'a, Image<C>> {
        let key = (Element::Image, src.address());
        if let Some(Copied::Image(hit)) = self.copies.get(&key) {
            return Shared::Owned(Arc::clone(hit));
        }
        let size = std::mem::size_of::<Image<C>>() + src.byte_size();
        if self.alloc(size).is_none() {
            return src.clone();
        }
        let copy = Arc::new((**src).clone());
        self.copies.insert(key, Copied::Image(Arc::clone(&copy)));
        Shared::Owned(copy)
    }
}

/// Deep-clone the chain starting at `mesh`.
///
/// Descriptors are always cloned first; if even they do not fit, the
/// source chain is returned untouched with zero bytes used. Arrays are
/// then copied following `order` (see [`DEFAULT_COPY_ORDER`]). Cloned
/// meshes get the tier their descriptor was placed in.
pub fn cache_mesh<'a, C: Color>(
    mesh: &Mesh3D<'a, C>,
    primary: TierBudget,
    secondary: TierBudget,
    order: &str,
) -> CachedMesh<'a, C> {
    let mut cache = MeshCache::<C>::new(primary, secondary);
    let descriptor = std::mem::size_of::<Mesh3D<'a, C>>();

    let mut chain: Vec<Mesh3D<'a, C>> = Vec::new();
    for m in mesh.chain() {
        let Some(tier) = cache.alloc(descriptor) else {
            log::warn!(
                "cache_mesh: no room for {} mesh descriptors, mesh left in place",
                mesh.chain().count()
            );
            return CachedMesh {
                mesh: mesh.clone(),
                primary_used: 0,
                secondary_used: 0,
            };
        };
        let mut copy = m.clone();
        copy.tier = tier;
        chain.push(copy);
    }

    for step in CopyStep::parse_order(order) {
        for m in &mut chain {
            match step {
                CopyStep::Vertices => {
                    m.vertices = cache.slice(&m.vertices, Element::Vec3, Copied::Vec3, |c| match c {
                        Copied::Vec3(a) => Some(Arc::clone(a)),
                        _ => None,
                    });
                }
                CopyStep::Normals => {
                    if let Some(n) = &m.normals {
                        m.normals = Some(cache.slice(n, Element::Vec3, Copied::Vec3, |c| match c {
                            Copied::Vec3(a) => Some(Arc::clone(a)),
                            _ => None,
                        }));
                    }
                }
                CopyStep::Texcoords => {
                    if let Some(t) = &m.texcoords {
                        m.texcoords = Some(cache.slice(t, Element::Vec2, Copied::Vec2, |c| match c {
                            Copied::Vec2(a) => Some(Arc::clone(a)),
                            _ => None,
                        }));
                    }
                }
                CopyStep::Image => {
                    if let Some(t) = &m.texture {
                        m.texture = Some(cache.image(t));
                    }
                }
                CopyStep::Faces => {
                    m.faces = cache.slice(&m.faces, Element::Word, Copied::Words, |c| match c {
                        Copied::Words(a) => Some(Arc::clone(a)),
                        _ => None,
                    });
                }
            }
        }
    }

    // Relink back to front so every `next` points at the clone.
    let mut next: Option<Shared<'a, Mesh3D<'a, C>>> = None;
    let mut head = None;
    while let Some(mut m) = chain.pop() {
        m.next = next.take();
        if chain.is_empty() {
            head = Some(m);
        } else {
            next = Some(Shared::Owned(Arc::new(m)));
        }
    }

    let [primary_used, secondary_used] = cache.used;
    log::debug!("cache_mesh: {primary_used} bytes in {:?}, {secondary_used} bytes in {:?}", primary.tier, secondary.tier);
    CachedMesh {
        mesh: head.unwrap_or_else(|| mesh.clone()),
        primary_used,
        secondary_used,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::color::Rgb565;

    static VERTS: [Vec3; 3] = [Vec3::ZERO, Vec3::X, Vec3::Y];
    static FACES: [u16; 5] = [1, 0, 1, 2, 0];

    fn budget(tier: MemoryTier, bytes: usize) -> TierBudget {
        TierBudget::new(tier, bytes)
    }

    fn descriptor() -> usize {
        std::mem::size_of::<Mesh3D<'static, Rgb565>>()
    }

    #[test]
    fn parse_order_is_case_insensitive() {
        assert_eq!(
            CopyStep::parse_order("vNx f"),
            vec![CopyStep::Vertices, CopyStep::Normals, CopyStep::Faces]
        );
    }

    #[test]
    fn shared_arrays_are_copied_once() {
        let tail: Mesh3D<'_, Rgb565> = Mesh3D::new(&VERTS[..], &FACES[..]).with_name("tail");
        let head = Mesh3D::new(&VERTS[..], &FACES[..]).with_next(&tail).with_name("head");

        let cached = cache_mesh(
            &head,
            budget(MemoryTier::Internal, 1 << 20),
            budget(MemoryTier::External, 0),
            DEFAULT_COPY_ORDER,
        );
        let meshes: Vec<_> = cached.mesh.chain().collect();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[1].name, Some("tail"));
        assert!(meshes.iter().all(|m| m.vertices.is_owned() && m.faces.is_owned()));
        assert_eq!(meshes[0].vertices.address(), meshes[1].vertices.address());
        assert_eq!(
            cached.primary_used,
            2 * descriptor() + std::mem::size_of_val(&VERTS) + std::mem::size_of_val(&FACES)
        );
        assert_eq!(cached.secondary_used, 0);
        assert_eq!(&*meshes[0].vertices, &VERTS[..]);
    }

    #[test]
    fn order_decides_who_gets_the_fast_tier() {
        let m: Mesh3D<'_, Rgb565> = Mesh3D::new(&VERTS[..], &FACES[..]);
        let room = descriptor() + std::mem::size_of_val(&FACES);

        let faces_first = cache_mesh(&m, budget(MemoryTier::Internal, room), budget(MemoryTier::External, 0), "FV");
        assert!(faces_first.mesh.faces.is_owned());
        assert!(!faces_first.mesh.vertices.is_owned());

        let verts_first = cache_mesh(&m, budget(MemoryTier::Internal, room), budget(MemoryTier::External, 0), "VF");
        // Vertices (36 bytes) do not fit, faces still do.
        assert!(!verts_first.mesh.vertices.is_owned());
        assert!(verts_first.mesh.faces.is_owned());
    }

    #[test]
    fn spills_to_secondary_tier() {
        let m: Mesh3D<'_, Rgb565> = Mesh3D::new(&VERTS[..], &FACES[..]);
        let cached = cache_mesh(
            &m,
            budget(MemoryTier::Internal, descriptor()),
            budget(MemoryTier::External, 1024),
            "V",
        );
        assert_eq!(cached.mesh.tier, MemoryTier::Internal);
        assert!(cached.mesh.vertices.is_owned());
        assert_eq!(cached.primary_used, descriptor());
        assert_eq!(cached.secondary_used, std::mem::size_of_val(&VERTS));
    }

    #[test]
    fn no_room_for_descriptors_returns_source() {
        let m: Mesh3D<'_, Rgb565> = Mesh3D::new(&VERTS[..], &FACES[..]);
        let cached = cache_mesh(&m, budget(MemoryTier::Internal, 8), budget(MemoryTier::External, 8), "VNTIF");
        assert_eq!(cached.primary_used + cached.secondary_used, 0);
        assert!(!cached.mesh.vertices.is_owned());
        assert_eq!(cached.mesh.vertices.address(), m.vertices.address());
    }

    #[test]
    fn textures_are_cloned_with_their_pixels() {
        let tex = Image::from_fn(4, 4, |x, y| Rgb565::new((x * 8) as u8, (y * 16) as u8, 0)).unwrap();
        let m: Mesh3D<'_, Rgb565> = Mesh3D::new(&VERTS[..], &FACES[..]).with_texture(&tex);
        let cached = cache_mesh(&m, budget(MemoryTier::Internal, 4096), budget(MemoryTier::External, 0), "I");
        let t = cached.mesh.texture.as_ref().unwrap();
        assert!(t.is_owned());
        assert_eq!(**t, tex);
    }
}
