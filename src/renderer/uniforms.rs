// renderer/uniforms.rs
use bytemuck::{Pod, Zeroable};

use crate::compiler::MaterialRecord;
use crate::scene::Camera;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 3],
    pub _padding: f32,
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: (camera.proj() * camera.view()).to_cols_array_2d(),
            position: camera.position().to_array(),
            _padding: 0.0,
        }
    }
}

/// Camera basis plus image-based-light parameters for the background pass.
/// The fragment shader reconstructs the primary ray per pixel from these,
/// then samples the lat-long environment map.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct IblUniform {
    pub forward: [f32; 3],
    pub focal_length: f32,
    pub up: [f32; 3],
    pub multiplier: f32,
    pub right: [f32; 3],
    pub _padding: f32,
    pub sensor_size: [f32; 2],
    pub _padding2: [f32; 2],
}

impl IblUniform {
    pub fn new(camera: &Camera, multiplier: f32) -> Self {
        Self {
            forward: camera.forward().to_array(),
            focal_length: camera.focal_length,
            up: camera.up().to_array(),
            multiplier,
            right: camera.right().to_array(),
            _padding: 0.0,
            sensor_size: camera.sensor_size.to_array(),
            _padding2: [0.0; 2],
        }
    }
}

/// GPU layout of a flattened material record. One of these per material,
/// packed at [`MATERIAL_UNIFORM_STRIDE`] intervals in a single uniform buffer
/// and selected per batch with a dynamic offset.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniform {
    pub diffuse_color: [f32; 4],
    pub gloss_color: [f32; 4],
    pub diffuse_texture_idx: i32,
    pub gloss_texture_idx: i32,
    pub diffuse_roughness: f32,
    pub gloss_roughness: f32,
    pub ior: f32,
    pub _padding: [f32; 3],
}

/// Offset step between consecutive material records in the uniform buffer.
/// Matches the largest min_uniform_buffer_offset_alignment in common use.
pub const MATERIAL_UNIFORM_STRIDE: u64 = 256;

impl From<&MaterialRecord> for MaterialUniform {
    fn from(record: &MaterialRecord) -> Self {
        Self {
            diffuse_color: record.diffuse_color,
            gloss_color: record.gloss_color,
            diffuse_texture_idx: record.diffuse_texture_idx,
            gloss_texture_idx: record.gloss_texture_idx,
            diffuse_roughness: record.diffuse_roughness,
            gloss_roughness: record.gloss_roughness,
            ior: record.ior,
            _padding: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_uniform_is_80_bytes() {
        // mat4x4<f32> = 64 bytes, vec3<f32> = 12 bytes, padding = 4 bytes
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
    }

    #[test]
    fn ibl_uniform_is_64_bytes() {
        assert_eq!(std::mem::size_of::<IblUniform>(), 64);
    }

    #[test]
    fn material_uniform_fits_its_stride() {
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 64);
        assert!((std::mem::size_of::<MaterialUniform>() as u64) <= MATERIAL_UNIFORM_STRIDE);
    }

    #[test]
    fn sentinel_record_maps_to_unset_indices() {
        let uniform = MaterialUniform::from(&MaterialRecord::default());
        assert_eq!(uniform.diffuse_texture_idx, -1);
        assert_eq!(uniform.gloss_texture_idx, -1);
    }
}
