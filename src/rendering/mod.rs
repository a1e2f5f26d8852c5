/// Software rasterization pipeline
/// Fixed-point triangle setup, frustum clipping and specialized scanline shaders
pub mod clipping;
pub mod color;
pub mod framebuffer;
pub mod lighting;
pub mod rasterizer;
pub mod renderer;
pub mod shader_flags;
pub mod shaders;
pub mod texture;

pub use color::{Color, Rgb24, Rgb32, Rgb565, Rgb64, RgbF};
pub use framebuffer::{DepthValue, Image, ImageViewMut, PixelBuffer, RenderTarget};
pub use lighting::{PhongModel, SpecularTable};
pub use rasterizer::{rasterize_triangle, RasterViewport, RasterizerVertex, TriangleSetup, Uniforms};
pub use renderer::{
    PointBatch, PrimitiveBatch, Renderer3D, RendererConfig, Topology, CUBE_FACE_COUNT, MAX_SPHERE_SECTORS, MAX_VIEWPORT_DIMENSION,
    MIN_SPHERE_SECTORS, SUBPIXEL_BITS,
};
pub use shader_flags::{ShaderFlags, ShaderVariant, SHADERS_ALL};
pub use texture::TextureSampler;
