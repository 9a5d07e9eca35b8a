pub mod camera;
pub mod light;
pub mod material;
pub mod mesh;
pub mod texture;

#[allow(clippy::module_inception)]
mod scene;

pub use camera::Camera;
pub use light::{Light, LightId};
pub use material::{Bxdf, Material, MaterialId, MaterialInput, MicrofacetKind};
pub use mesh::{Instance, InstanceId, Mesh, MeshId};
pub use scene::{Scene, ShapeId};
pub use texture::{PixelFormat, TextureData, TextureId};
