/// microraster - CPU-only 3D rendering pipeline
/// Frustum clipping, fixed-point rasterization and specialized shaders, for
/// targets with no GPU and very little memory
pub mod camera;
pub mod error;
pub mod meshing;
pub mod perf;
pub mod rendering;

pub use camera::{Box3, OrbitCamera};
pub use error::{Error, ImageError, MeshError, RenderError, Result};
pub use meshing::{cache_mesh, FaceChainBuilder, FaceLayout, FaceVertex, Hinge, Material, MemoryTier, Mesh3D};
pub use perf::{CounterSnapshot, PipelineCounters, PIPELINE_COUNTERS};
pub use rendering::{
    Color, Image, PixelBuffer, PointBatch, PrimitiveBatch, RenderTarget, Renderer3D, RendererConfig, Rgb24, Rgb32, Rgb565, Rgb64,
    RgbF, ShaderFlags,
};
