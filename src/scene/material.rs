// scene/material.rs
use glam::Vec4;

use super::texture::TextureId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub(crate) u32);

impl MaterialId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named material input: either a constant vector or a texture reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialInput {
    Constant(Vec4),
    Texture(TextureId),
}

impl MaterialInput {
    pub fn texture(self) -> Option<TextureId> {
        match self {
            Self::Texture(id) => Some(id),
            Self::Constant(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicrofacetKind {
    Ggx,
    Beckmann,
}

/// Closed set of supported BxDFs. `FresnelBlend` composes two other arena
/// materials; deeper nesting than one blend level is not shadeable by the
/// raster path and flattens to an unset channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Bxdf {
    Lambert {
        albedo: MaterialInput,
    },
    Microfacet {
        kind: MicrofacetKind,
        albedo: MaterialInput,
        roughness: MaterialInput,
    },
    FresnelBlend {
        top: MaterialId,
        base: MaterialId,
        ior: MaterialInput,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub bxdf: Bxdf,
}

impl Material {
    pub fn new(name: impl Into<String>, bxdf: Bxdf) -> Self {
        Self {
            name: name.into(),
            bxdf,
        }
    }

    /// Gray Lambert, the stand-in used when only a material name is known.
    pub fn default_lambert(name: impl Into<String>) -> Self {
        Self::new(
            name,
            Bxdf::Lambert {
                albedo: MaterialInput::Constant(Vec4::new(0.7, 0.7, 0.7, 1.0)),
            },
        )
    }
}
