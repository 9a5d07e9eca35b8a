// compiler/texture.rs
//
// Uploads CPU texture payloads into GPU textures with full mip chains. The
// destination format comes from a fixed table keyed by the source pixel
// format; mips are generated on the GPU by blit downsampling.
use std::borrow::Cow;

use half::f16;

use crate::compiler::collector::Collector;
use crate::error::{Error, Result};
use crate::scene::{PixelFormat, Scene, TextureId};

#[derive(Debug)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub format: wgpu::TextureFormat,
}

/// Fixed 3-entry destination format table.
pub fn gpu_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::Rgba16F => wgpu::TextureFormat::Rgba16Float,
        PixelFormat::Rgba32F => wgpu::TextureFormat::Rgba32Float,
    }
}

pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let max_dimension = width.max(height).max(1);
    u32::BITS - max_dimension.leading_zeros()
}

/// Upload every collected texture, in collector order, so array position i
/// equals collector index i.
pub fn upload_textures(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    scene: &Scene,
    textures: &Collector<TextureId>,
    float32_filterable: bool,
) -> Result<Vec<GpuTexture>> {
    let mut uploaded = Vec::with_capacity(textures.len());

    for id in textures.iter() {
        let data = scene.texture(id);
        if data.payload.len() != data.expected_payload_len() {
            return Err(Error::ResourceAllocation(format!(
                "texture {:?}: payload is {} bytes, expected {} for {}x{} {:?}",
                id,
                data.payload.len(),
                data.expected_payload_len(),
                data.width,
                data.height,
                data.format,
            )));
        }

        // Without float32-filterable we can neither sample Rgba32Float through
        // a filtering binding nor blit-downsample it, so narrow to 16-bit
        // float on upload instead.
        let (format, payload) = match (gpu_format(data.format), float32_filterable) {
            (wgpu::TextureFormat::Rgba32Float, false) => {
                log::warn!(
                    "adapter cannot filter float32 textures, narrowing {:?} to rgba16float",
                    id
                );
                (
                    wgpu::TextureFormat::Rgba16Float,
                    Cow::Owned(narrow_f32_payload(&data.payload)),
                )
            }
            (format, _) => (format, Cow::Borrowed(data.payload.as_slice())),
        };
        let bytes_per_row = (payload.len() / data.height as usize) as u32;
        let mips = mip_level_count(data.width, data.height);

        let size = wgpu::Extent3d {
            width: data.width,
            height: data.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("SceneTexture"),
            size,
            mip_level_count: mips,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &payload,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(data.height),
            },
            size,
        );

        if mips > 1 {
            generate_mipmaps(device, queue, &texture, mips, format);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("SceneTextureSampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        uploaded.push(GpuTexture {
            texture,
            view,
            sampler,
            format,
        });
    }

    log::info!("uploaded {} textures", uploaded.len());
    Ok(uploaded)
}

fn narrow_f32_payload(payload: &[u8]) -> Vec<u8> {
    payload
        .chunks_exact(4)
        .flat_map(|b| {
            f16::from_f32(f32::from_le_bytes([b[0], b[1], b[2], b[3]])).to_le_bytes()
        })
        .collect()
}

/// Blit each mip level from the previous one with a fullscreen triangle.
fn generate_mipmaps(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    mip_level_count: u32,
    format: wgpu::TextureFormat,
) {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("MipBlitShader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("../shader/blit.wgsl").into()),
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("MipBlitBindGroupLayout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("MipBlitPipelineLayout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("MipBlitPipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("MipBlitSampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("MipBlitEncoder"),
    });

    for target_mip in 1..mip_level_count {
        let mip_view = |base_mip_level, usage| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some("MipBlitView"),
                format: Some(format),
                dimension: Some(wgpu::TextureViewDimension::D2),
                aspect: wgpu::TextureAspect::All,
                base_mip_level,
                mip_level_count: Some(1),
                base_array_layer: 0,
                array_layer_count: Some(1),
                usage: Some(usage),
            })
        };
        let src_view = mip_view(target_mip - 1, wgpu::TextureUsages::TEXTURE_BINDING);
        let dst_view = mip_view(target_mip, wgpu::TextureUsages::RENDER_ATTACHMENT);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("MipBlitBindGroup"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&src_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("MipBlitPass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &dst_view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        rpass.set_pipeline(&pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }

    queue.submit(Some(encoder.finish()));
}
