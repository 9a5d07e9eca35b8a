// scene/texture.rs
use half::f16;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) u32);

impl TextureId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Source pixel formats accepted by the texture uploader. All are RGBA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    Rgba16F,
    Rgba32F,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgba16F => 8,
            Self::Rgba32F => 16,
        }
    }
}

/// CPU-side texture payload. The payload is raw texel bytes in `format`,
/// tightly packed, `width * height * bytes_per_pixel` long.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub payload: Vec<u8>,
}

impl TextureData {
    pub fn from_rgba8(width: u32, height: u32, payload: Vec<u8>) -> Self {
        Self {
            format: PixelFormat::Rgba8,
            width,
            height,
            payload,
        }
    }

    pub fn from_rgba32f(width: u32, height: u32, texels: &[f32]) -> Self {
        Self {
            format: PixelFormat::Rgba32F,
            width,
            height,
            payload: bytemuck::cast_slice(texels).to_vec(),
        }
    }

    pub fn from_rgba16f(width: u32, height: u32, texels: &[f32]) -> Self {
        let mut payload = Vec::with_capacity(texels.len() * 2);
        for &value in texels {
            payload.extend_from_slice(&f16::from_f32(value).to_bits().to_le_bytes());
        }
        Self {
            format: PixelFormat::Rgba16F,
            width,
            height,
            payload,
        }
    }

    /// Decode an encoded image (PNG, JPEG, HDR, EXR ...). HDR content keeps
    /// its range as `Rgba32F`; everything else becomes `Rgba8`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| Error::UnsupportedVariant(format!("image decode failed: {e}")))?;

        Ok(match img {
            image::DynamicImage::ImageRgba32F(_) | image::DynamicImage::ImageRgb32F(_) => {
                let rgba = img.to_rgba32f();
                let (w, h) = rgba.dimensions();
                Self::from_rgba32f(w, h, rgba.as_raw())
            }
            _ => {
                let rgba = img.to_rgba8();
                let (w, h) = rgba.dimensions();
                Self::from_rgba8(w, h, rgba.into_raw())
            }
        })
    }

    pub fn expected_payload_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_per_pixel_table() {
        assert_eq!(PixelFormat::Rgba8.bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::Rgba16F.bytes_per_pixel(), 8);
        assert_eq!(PixelFormat::Rgba32F.bytes_per_pixel(), 16);
    }

    #[test]
    fn rgba16f_payload_is_half_sized() {
        let texels = [0.0f32, 0.5, 1.0, 1.0];
        let tex = TextureData::from_rgba16f(1, 1, &texels);
        assert_eq!(tex.payload.len(), 8);
        assert_eq!(tex.expected_payload_len(), 8);
        let one = f16::from_le_bytes([tex.payload[4], tex.payload[5]]);
        assert_eq!(one.to_f32(), 1.0);
    }

    #[test]
    fn decode_ldr_yields_rgba8() {
        let mut encoded = std::io::Cursor::new(Vec::new());
        image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]))
            .write_to(&mut encoded, image::ImageFormat::Png)
            .unwrap();

        let tex = TextureData::decode(encoded.get_ref()).unwrap();
        assert_eq!(tex.format, PixelFormat::Rgba8);
        assert_eq!((tex.width, tex.height), (2, 3));
        assert_eq!(&tex.payload[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(TextureData::decode(&[0u8; 16]).is_err());
    }
}
