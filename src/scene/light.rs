// scene/light.rs
use glam::Vec3;

use super::texture::TextureId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(pub(crate) u32);

impl LightId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Directional {
        direction: Vec3,
        radiance: Vec3,
    },
    Point {
        position: Vec3,
        radiance: Vec3,
    },
    /// Environment light whose radiance comes from a lat-long texture.
    ImageBased {
        texture: TextureId,
        multiplier: f32,
    },
}
