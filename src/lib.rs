pub mod compiler;
pub mod error;
pub mod io;
pub mod renderer;
pub mod scene;

pub use error::{Error, Result};
pub use renderer::{FrameRenderer, GpuContext, RenderTarget};
pub use scene::Scene;

pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
