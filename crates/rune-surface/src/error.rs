use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("cannot allocate a {width}x{height} pixel buffer")]
    Allocation { width: u32, height: u32 },
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("image encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, SurfaceError>;
