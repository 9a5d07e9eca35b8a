// renderer/context.rs
use crate::error::{Error, Result};

/// Headless device handle. Rendering targets an offscreen texture, so no
/// surface is created and no window is required.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Whether Rgba32Float can be sampled with linear filtering on this
    /// adapter. Without it, 32-bit float textures fall back to nearest
    /// filtering and a single mip.
    pub float32_filterable: bool,
}

impl GpuContext {
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| Error::ResourceAllocation(format!("no suitable adapter: {e}")))?;

        log::info!("adapter: {:?}", adapter.get_info().name);

        let float32_filterable = adapter
            .features()
            .contains(wgpu::Features::FLOAT32_FILTERABLE);
        let required_features = if float32_filterable {
            wgpu::Features::FLOAT32_FILTERABLE
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| Error::ResourceAllocation(format!("device request failed: {e}")))?;

        Ok(Self {
            device,
            queue,
            float32_filterable,
        })
    }

    /// Convenience for non-async callers.
    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }
}
