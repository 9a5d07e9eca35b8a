// compiler/mod.rs
//
// Scene compilation: translates the CPU scene graph into GPU-resident
// batches, material records and textures, cached and rebuilt per subsystem.
pub mod batch;
pub mod collector;
pub mod compiled;
pub mod material;
pub mod split;
pub mod texture;

pub use batch::{BatchData, BatchStaging};
pub use collector::{Bundle, Collector};
pub use compiled::{CompiledScene, SceneCompiler};
pub use material::MaterialRecord;
pub use split::{split_shapes, ShapeSplit};
pub use texture::GpuTexture;
