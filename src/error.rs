// src/error.rs
use thiserror::Error;

/// Crate-wide error type. Compile and render calls abort on the first error;
/// a failed rebuild never replaces a previously good compiled scene.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// GPU buffer or texture creation/sizing failure.
    #[error("resource allocation failed: {0}")]
    ResourceAllocation(String),

    /// A resource was looked up in a collector it was never registered with.
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// The output target cannot be bound for rendering.
    #[error("framebuffer incomplete: {0}")]
    FramebufferIncomplete(String),

    /// File open / truncated read / write failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A material or shape variant the current path cannot handle.
    #[error("unsupported variant: {0}")]
    UnsupportedVariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;
