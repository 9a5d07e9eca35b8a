// renderer/mod.rs
pub mod context;
pub mod frame;
pub mod pipeline;
pub mod target;
pub mod uniforms;
pub mod vertex;

pub use context::GpuContext;
pub use frame::FrameRenderer;
pub use target::{RenderTarget, TARGET_FORMAT};
pub use vertex::Vertex;
