/// Error types for the configuration and construction surface.
/// Draw calls never fail: they skip work and log instead.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("image dimensions must be non-zero (got {width}x{height})")]
    ZeroSize { width: usize, height: usize },
    #[error("stride {stride} is smaller than width {width}")]
    StrideTooSmall { width: usize, stride: usize },
    #[error("pixel buffer holds {len} values but {needed} are required")]
    BufferTooShort { len: usize, needed: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("{what} count {count} exceeds the limit of {limit}")]
    TooManyElements {
        what: &'static str,
        count: usize,
        limit: usize,
    },
    #[error("face array truncated at word {at}")]
    TruncatedFaces { at: usize },
    #[error("{what} index {index} out of range (len {len}) at face word {at}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
        at: usize,
    },
    #[error("direction bit set on the opening triangle of a chain at face word {at}")]
    DirectionBitOnOpening { at: usize },
    #[error("face chain needs at least 3 elements, got {len}")]
    ChainTooShort { len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("viewport {width}x{height} outside [1, {max}]")]
    InvalidViewport { width: i32, height: i32, max: i32 },
    #[error("shader variant {0} is not compiled into this renderer")]
    ShaderNotEnabled(&'static str),
    #[error("z-buffer holds {len} values but the image needs {needed}")]
    ZBufferTooSmall { len: usize, needed: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
