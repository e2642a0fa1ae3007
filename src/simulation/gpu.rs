//! wgpu compute backend
//!
//! Implements [`LatticeBackend`] on a wgpu device. The device and queue are
//! handed in by the caller (or requested once through
//! [`WgpuBackend::request`]); nothing here is process-global, so several
//! engines can share one device or use their own.

use std::sync::Arc;

use wgpu::{BindGroupLayout, Buffer, CommandEncoder, ComputePipeline, Device, Queue};

use super::{
    dispatch::DispatchPlan,
    mesh::Mesh,
    shaders,
    traits::{KernelArgs, LatticeBackend},
};
use crate::{
    error::{EngineError, Result},
    wgpu_utils::{
        compute_layout, storage_buffer_read_only, storage_buffer_read_write, uniform,
        whole_buffer_bind_group, StagingBuffer, UniformBuffer,
    },
};

/// Uniform block shared by all kernels. Mirrors `Uniforms` in the WGSL prelude.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KernelUniforms {
    pub nx: u32,
    pub ny: u32,
    pub tau: f32,
    pub ma: f32,
    pub aoa_deg: f32,
    pub chord_ratio: f32,
    pub speed_max: f32,
    pub inlet_speed: f32,
}

impl From<&KernelArgs> for KernelUniforms {
    fn from(args: &KernelArgs) -> Self {
        Self {
            nx: args.mesh.nx,
            ny: args.mesh.ny,
            tau: args.params.tau,
            ma: args.params.ma,
            aoa_deg: args.params.aoa_deg,
            chord_ratio: args.params.chord_ratio,
            speed_max: args.params.speed_max,
            inlet_speed: args.params.inlet_speed(),
        }
    }
}

/// Command encoder plus the uniform snapshot its passes bind.
pub struct WgpuStream {
    encoder: CommandEncoder,
    uniforms: Option<UniformBuffer<KernelUniforms>>,
}

impl WgpuStream {
    /// Encoder to record further work (for example a render pass) after the
    /// simulation passes.
    pub fn encoder(&mut self) -> &mut CommandEncoder {
        &mut self.encoder
    }

    fn uniforms(&mut self, device: &Device, args: &KernelArgs) -> &UniformBuffer<KernelUniforms> {
        let content = KernelUniforms::from(args);
        if !matches!(&self.uniforms, Some(current) if current.holds(&content)) {
            self.uniforms = Some(UniformBuffer::new_with_data(device, &content));
        }
        self.uniforms
            .get_or_insert_with(|| UniformBuffer::new_with_data(device, &content))
    }
}

struct KernelPipelines {
    initialize: ComputePipeline,
    solid_mask: ComputePipeline,
    collide_stream: ComputePipeline,
    boundary: ComputePipeline,
}

/// Lattice kernels on a wgpu device.
pub struct WgpuBackend {
    device: Arc<Device>,
    queue: Arc<Queue>,
    limits: wgpu::Limits,
    single_target_layout: BindGroupLayout,
    collide_layout: BindGroupLayout,
    pipelines: KernelPipelines,
}

impl WgpuBackend {
    /// Build the kernel pipelines on an existing device.
    pub fn new(device: Arc<Device>, queue: Arc<Queue>) -> Self {
        let single_target_layout = compute_layout(
            &device,
            "LBM Single Target Layout",
            &[uniform(), storage_buffer_read_write()],
        );
        let collide_layout = compute_layout(
            &device,
            "LBM Collide Stream Layout",
            &[
                uniform(),
                storage_buffer_read_only(),
                storage_buffer_read_only(),
                storage_buffer_read_write(),
                storage_buffer_read_write(),
            ],
        );

        let pipelines = KernelPipelines {
            initialize: create_kernel_pipeline(
                &device,
                "initialize",
                shaders::INITIALIZE,
                &single_target_layout,
            ),
            solid_mask: create_kernel_pipeline(
                &device,
                "solid_mask",
                shaders::SOLID_MASK,
                &single_target_layout,
            ),
            collide_stream: create_kernel_pipeline(
                &device,
                "collide_stream",
                shaders::COLLIDE_STREAM,
                &collide_layout,
            ),
            boundary: create_kernel_pipeline(
                &device,
                "boundary",
                shaders::BOUNDARY,
                &single_target_layout,
            ),
        };

        let limits = device.limits();
        Self {
            device,
            queue,
            limits,
            single_target_layout,
            collide_layout,
            pipelines,
        }
    }

    /// Request a headless high-performance adapter and device.
    pub async fn request() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .map_err(|e| EngineError::AdapterUnavailable(e.to_string()))?;

        log::info!("Using adapter: {:?}", adapter.get_info());

        let downlevel_caps = adapter.get_downlevel_capabilities();
        if !downlevel_caps
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return Err(EngineError::Unsupported(
                "adapter does not support compute shaders".to_string(),
            ));
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("LBM Device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                ..Default::default()
            })
            .await
            .map_err(|e| EngineError::DeviceRequest(e.to_string()))?;

        Ok(Self::new(Arc::new(device), Arc::new(queue)))
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    fn dispatch(
        &self,
        stream: &mut WgpuStream,
        args: &KernelArgs,
        label: &str,
        pipeline: &ComputePipeline,
        layout: &BindGroupLayout,
        buffers: &[&Buffer],
    ) {
        let bind_group = {
            let uniforms = stream.uniforms(&self.device, args).buffer();
            let mut entries = Vec::with_capacity(buffers.len() + 1);
            entries.push(uniforms);
            entries.extend_from_slice(buffers);
            whole_buffer_bind_group(&self.device, label, layout, &entries)
        };

        let mut pass = stream
            .encoder
            .begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(args.plan.group_count, 1, 1);
    }
}

fn create_kernel_pipeline(
    device: &Device,
    entry_point: &str,
    body: &str,
    layout: &BindGroupLayout,
) -> ComputePipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("LBM {} Shader", entry_point)),
        source: wgpu::ShaderSource::Wgsl(shaders::module_source(body).into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("LBM {} Pipeline Layout", entry_point)),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("LBM {} Pipeline", entry_point)),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: Some(entry_point),
        compilation_options: Default::default(),
        cache: None,
    })
}

impl LatticeBackend for WgpuBackend {
    type Buffer = Arc<Buffer>;
    type Stream = WgpuStream;

    fn name(&self) -> &str {
        "wgpu"
    }

    fn check_capacity(&self, mesh: Mesh, plan: DispatchPlan) -> Result<()> {
        if plan.group_count > self.limits.max_compute_workgroups_per_dimension {
            return Err(EngineError::CapacityOverflow {
                nx: mesh.nx,
                ny: mesh.ny,
            });
        }
        Ok(())
    }

    fn allocate(&self, label: &'static str, bytes: u64) -> Result<Arc<Buffer>> {
        let binding_limit = self.limits.max_storage_buffer_binding_size as u64;
        if bytes > self.limits.max_buffer_size || bytes > binding_limit {
            return Err(EngineError::Allocation { label, bytes });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: bytes,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        if let Some(err) = validation.or(out_of_memory) {
            log::error!("allocation of {} ({} bytes) failed: {}", label, bytes, err);
            return Err(EngineError::Allocation { label, bytes });
        }
        Ok(Arc::new(buffer))
    }

    fn buffer_size(&self, buffer: &Arc<Buffer>) -> u64 {
        buffer.size()
    }

    fn begin(&self, label: &str) -> WgpuStream {
        WgpuStream {
            encoder: self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some(label),
                }),
            uniforms: None,
        }
    }

    fn submit(&self, stream: WgpuStream) {
        self.queue.submit(std::iter::once(stream.encoder.finish()));
    }

    fn submit_and_wait(&self, stream: WgpuStream) {
        self.submit(stream);
        if let Err(err) = self.device.poll(wgpu::MaintainBase::Wait) {
            log::error!("waiting for device failed: {}", err);
        }
    }

    fn initialize(&self, stream: &mut WgpuStream, args: &KernelArgs, dist_out: &Arc<Buffer>) {
        self.dispatch(
            stream,
            args,
            "LBM Initialize Pass",
            &self.pipelines.initialize,
            &self.single_target_layout,
            &[dist_out.as_ref()],
        );
    }

    fn solid_mask(&self, stream: &mut WgpuStream, args: &KernelArgs, mask_out: &Arc<Buffer>) {
        self.dispatch(
            stream,
            args,
            "LBM Solid Mask Pass",
            &self.pipelines.solid_mask,
            &self.single_target_layout,
            &[mask_out.as_ref()],
        );
    }

    fn collide_stream(
        &self,
        stream: &mut WgpuStream,
        args: &KernelArgs,
        dist_in: &Arc<Buffer>,
        mask_in: &Arc<Buffer>,
        dist_out: &Arc<Buffer>,
        speed_out: &Arc<Buffer>,
    ) {
        self.dispatch(
            stream,
            args,
            "LBM Collide Stream Pass",
            &self.pipelines.collide_stream,
            &self.collide_layout,
            &[
                dist_in.as_ref(),
                mask_in.as_ref(),
                dist_out.as_ref(),
                speed_out.as_ref(),
            ],
        );
    }

    fn boundary(&self, stream: &mut WgpuStream, args: &KernelArgs, dist: &Arc<Buffer>) {
        self.dispatch(
            stream,
            args,
            "LBM Boundary Pass",
            &self.pipelines.boundary,
            &self.single_target_layout,
            &[dist.as_ref()],
        );
    }

    fn read_words(&self, buffer: &Arc<Buffer>) -> Result<Vec<u32>> {
        StagingBuffer::new(&self.device, buffer.size()).read_words(
            &self.device,
            &self.queue,
            buffer,
        )
    }
}
