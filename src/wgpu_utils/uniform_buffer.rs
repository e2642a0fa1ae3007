// src/wgpu_utils/uniform_buffer.rs
use std::marker::PhantomData;

use crate::error::{EngineError, Result};

fn short_type_name<Content>() -> &'static str {
    let type_name = std::any::type_name::<Content>();
    let pos = type_name.rfind(':').unwrap_or(0);
    if pos > 0 {
        &type_name[(pos + 1)..]
    } else {
        type_name
    }
}

/// Uniform buffer written once at creation and never changed afterwards.
///
/// Every batch of kernel work gets its own instance, so a snapshot the GPU
/// may still be reading is never overwritten.
pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    content_type: PhantomData<Content>,
    content: Vec<u8>,
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    /// Create buffer with initial data
    pub fn new_with_data(device: &wgpu::Device, initial_content: &Content) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("UniformBuffer: {}", short_type_name::<Content>())),
            size: std::mem::size_of::<Content>() as u64,
            usage: wgpu::BufferUsages::UNIFORM,
            mapped_at_creation: true,
        });

        let mapped_memory = buffer.slice(..);
        mapped_memory
            .get_mapped_range_mut()
            .clone_from_slice(bytemuck::bytes_of(initial_content));
        buffer.unmap();

        UniformBuffer {
            buffer,
            content_type: PhantomData,
            content: bytemuck::bytes_of(initial_content).to_vec(),
        }
    }

    /// Whether this buffer was created from exactly `content`.
    pub fn holds(&self, content: &Content) -> bool {
        self.content == bytemuck::bytes_of(content)
    }

    /// Get the underlying buffer (useful for copying operations)
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Get buffer size
    pub fn size(&self) -> u64 {
        self.buffer.size()
    }
}

/// Host-mappable buffer used to read storage buffers back.
pub struct StagingBuffer {
    buffer: wgpu::Buffer,
}

impl StagingBuffer {
    pub fn new(device: &wgpu::Device, size: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("StagingBuffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { buffer }
    }

    /// Copy `source` into the staging buffer and block until it can be read
    /// as 32-bit words.
    pub fn read_words(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &wgpu::Buffer,
    ) -> Result<Vec<u32>> {
        let size = self.buffer.size().min(source.size());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("staging_copy_encoder"),
        });
        encoder.copy_buffer_to_buffer(source, 0, &self.buffer, 0, size);
        queue.submit(std::iter::once(encoder.finish()));

        let slice = self.buffer.slice(..size);
        let (tx, rx) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        let _ = device.poll(wgpu::MaintainBase::Wait);

        match futures::executor::block_on(rx) {
            Ok(Ok(())) => {
                let mapped = slice.get_mapped_range();
                let words: Vec<u32> = bytemuck::cast_slice(&mapped).to_vec();
                drop(mapped);
                self.buffer.unmap();
                Ok(words)
            }
            Ok(Err(err)) => Err(EngineError::Readback(err.to_string())),
            Err(_) => Err(EngineError::Readback(
                "map callback dropped before completion".to_string(),
            )),
        }
    }
}
