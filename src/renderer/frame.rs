// renderer/frame.rs
//
// Drives a full frame: recompile the scene, draw the environment background
// and the geometry batches into an intermediate HDR target, then resolve
// into the caller's render target.
use wgpu::util::DeviceExt;

use crate::compiler::{CompiledScene, MaterialRecord, SceneCompiler};
use crate::error::{Error, Result};
use crate::renderer::context::GpuContext;
use crate::renderer::pipeline::{Pipelines, DEPTH_FORMAT, QUAD_INDEX_COUNT};
use crate::renderer::target::{RenderTarget, TARGET_FORMAT};
use crate::renderer::uniforms::{
    CameraUniform, IblUniform, MaterialUniform, MATERIAL_UNIFORM_STRIDE,
};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.1,
    a: 1.0,
};

struct Intermediate {
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

fn make_intermediate(device: &wgpu::Device, width: u32, height: u32) -> Intermediate {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let color = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("IntermediateColor"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let depth = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("IntermediateDepth"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Intermediate {
        color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
        depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
        width,
        height,
    }
}

/// Pack material records at the dynamic-offset stride, with one trailing
/// default record for batches that carry no material assignment.
fn pack_material_uniforms(materials: &[MaterialRecord]) -> Vec<u8> {
    let stride = MATERIAL_UNIFORM_STRIDE as usize;
    let mut bytes = vec![0u8; (materials.len() + 1) * stride];
    let default_record = MaterialRecord::default();
    for (i, record) in materials.iter().chain(std::iter::once(&default_record)).enumerate() {
        let uniform = MaterialUniform::from(record);
        let start = i * stride;
        bytes[start..start + std::mem::size_of::<MaterialUniform>()]
            .copy_from_slice(bytemuck::bytes_of(&uniform));
    }
    bytes
}

/// Dynamic offset for a batch's material record; -1 selects the trailing
/// default record.
fn material_offset(material_idx: i32, material_count: usize) -> u32 {
    let slot = usize::try_from(material_idx).unwrap_or(material_count);
    (slot as u64 * MATERIAL_UNIFORM_STRIDE) as u32
}

pub struct FrameRenderer {
    compiler: SceneCompiler,
    pipelines: Pipelines,
    camera_buffer: wgpu::Buffer,
    ibl_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    material_buffer: wgpu::Buffer,
    material_capacity: usize,
    intermediate: Option<Intermediate>,
}

impl FrameRenderer {
    pub fn new(ctx: &GpuContext) -> Self {
        let pipelines = Pipelines::new(&ctx.device, &ctx.queue);

        let camera_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("CameraBuffer"),
            contents: bytemuck::bytes_of(&CameraUniform::from_camera(&Default::default())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let ibl_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("IblBuffer"),
            size: std::mem::size_of::<IblUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("CameraBindGroup"),
            layout: &pipelines.camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let material_capacity = 1;
        let material_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("MaterialBuffer"),
            size: (material_capacity + 1) as u64 * MATERIAL_UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            compiler: SceneCompiler::new(),
            pipelines,
            camera_buffer,
            ibl_buffer,
            camera_bind_group,
            material_buffer,
            material_capacity,
            intermediate: None,
        }
    }

    pub fn compiled(&self) -> Option<&CompiledScene> {
        self.compiler.cache()
    }

    /// Compile outstanding scene changes and render one frame into `target`.
    pub fn render(
        &mut self,
        ctx: &GpuContext,
        scene: &crate::scene::Scene,
        target: &RenderTarget,
    ) -> Result<()> {
        if target.width() == 0 || target.height() == 0 {
            return Err(Error::FramebufferIncomplete(
                "render target has no pixels".into(),
            ));
        }

        let compiled = self
            .compiler
            .compile(&ctx.device, &ctx.queue, scene, ctx.float32_filterable)?;

        // Size-tracked intermediate attachments.
        let recreate = match &self.intermediate {
            Some(i) => i.width != target.width() || i.height != target.height(),
            None => true,
        };
        if recreate {
            self.intermediate = Some(make_intermediate(
                &ctx.device,
                target.width(),
                target.height(),
            ));
        }
        let intermediate = match &self.intermediate {
            Some(i) => i,
            None => {
                return Err(Error::FramebufferIncomplete(
                    "intermediate target missing".into(),
                ))
            }
        };

        ctx.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniform::from_camera(&compiled.camera)),
        );
        ctx.queue.write_buffer(
            &self.ibl_buffer,
            0,
            bytemuck::bytes_of(&IblUniform::new(&compiled.camera, compiled.ibl_multiplier)),
        );

        if compiled.materials.len() > self.material_capacity {
            self.material_capacity = compiled.materials.len();
            self.material_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("MaterialBuffer"),
                size: (self.material_capacity + 1) as u64 * MATERIAL_UNIFORM_STRIDE,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        }
        ctx.queue.write_buffer(
            &self.material_buffer,
            0,
            &pack_material_uniforms(&compiled.materials),
        );

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("FrameEncoder"),
            });

        // Pass 1: clear, then the environment background when present.
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("BackgroundPass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &intermediate.color_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &intermediate.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if compiled.ibl_texture_idx >= 0 {
                let env = &compiled.textures[compiled.ibl_texture_idx as usize];
                let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("BackgroundBindGroup"),
                    layout: &self.pipelines.background_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: self.ibl_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&env.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&env.sampler),
                        },
                    ],
                });
                rpass.set_pipeline(&self.pipelines.background);
                rpass.set_bind_group(0, &bind_group, &[]);
                rpass.set_vertex_buffer(0, self.pipelines.quad_vertices.slice(..));
                rpass.set_index_buffer(
                    self.pipelines.quad_indices.slice(..),
                    wgpu::IndexFormat::Uint16,
                );
                rpass.draw_indexed(0..QUAD_INDEX_COUNT, 0, 0..1);
            }
        }

        // Pass 2: geometry batches, one draw per material group.
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("GeometryPass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &intermediate.color_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &intermediate.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rpass.set_pipeline(&self.pipelines.geometry);
            rpass.set_bind_group(0, &self.camera_bind_group, &[]);

            let mut bind_groups = Vec::with_capacity(compiled.batches.len());
            for batch in &compiled.batches {
                let record = compiled.material_record(batch.material_idx);
                let channel_view = |idx: i32| {
                    usize::try_from(idx)
                        .ok()
                        .and_then(|i| compiled.textures.get(i))
                        .map(|t| &t.view)
                        .unwrap_or(&self.pipelines.fallback.view)
                };
                let diffuse_view = channel_view(record.diffuse_texture_idx);
                let gloss_view = channel_view(record.gloss_texture_idx);
                let sampler = usize::try_from(record.diffuse_texture_idx)
                    .ok()
                    .and_then(|i| compiled.textures.get(i))
                    .map(|t| &t.sampler)
                    .unwrap_or(&self.pipelines.fallback.sampler);

                bind_groups.push(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("MaterialBindGroup"),
                    layout: &self.pipelines.material_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                                buffer: &self.material_buffer,
                                offset: 0,
                                size: wgpu::BufferSize::new(
                                    std::mem::size_of::<MaterialUniform>() as u64
                                ),
                            }),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(diffuse_view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(gloss_view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: wgpu::BindingResource::Sampler(sampler),
                        },
                    ],
                }));
            }

            for (batch, bind_group) in compiled.batches.iter().zip(&bind_groups) {
                let offset = material_offset(batch.material_idx, compiled.materials.len());
                rpass.set_bind_group(1, bind_group, &[offset]);
                rpass.set_vertex_buffer(0, batch.vertex_buffer.slice(..));
                rpass.set_index_buffer(batch.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..batch.indices_written, 0, 0..1);
            }
        }

        // Pass 3: resolve the intermediate into the caller's target.
        {
            let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("ResolveBindGroup"),
                layout: &self.pipelines.resolve_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&intermediate.color_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.pipelines.resolve_sampler),
                    },
                ],
            });

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ResolvePass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view(),
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rpass.set_pipeline(&self.pipelines.resolve);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.set_vertex_buffer(0, self.pipelines.quad_vertices.slice(..));
            rpass.set_index_buffer(
                self.pipelines.quad_indices.slice(..),
                wgpu::IndexFormat::Uint16,
            );
            rpass.draw_indexed(0..QUAD_INDEX_COUNT, 0, 0..1);
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}
