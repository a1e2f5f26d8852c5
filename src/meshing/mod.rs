/// Mesh storage: face-chain encoded triangle meshes and the tools to
/// build, read and cache them.
pub mod arena;
pub mod face_chain;
pub mod mesh;

pub use arena::{cache_mesh, CachedMesh, CopyStep, TierBudget, DEFAULT_COPY_ORDER};
pub use face_chain::{FaceChainBuilder, FaceChainReader, FaceEvent, FaceLayout, FaceTriangles, FaceVertex, Hinge};
pub use mesh::{Material, MemoryTier, Mesh3D, MeshChain, Shared, MAX_NORMALS, MAX_TEXCOORDS, MAX_VERTICES};
