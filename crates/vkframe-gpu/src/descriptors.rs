//! Descriptors for per-frame uniform buffers.
//!
//! Each frame slot reads its own uniform buffer through its own descriptor
//! set, so a set is never rewritten while the GPU may still read it.

use crate::error::{GpuError, Result};
use ash::vk;

/// A single uniform buffer visible to `stages`.
pub fn uniform_binding(
    binding: u32,
    stages: vk::ShaderStageFlags,
) -> vk::DescriptorSetLayoutBinding<'static> {
    vk::DescriptorSetLayoutBinding::default()
        .binding(binding)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .descriptor_count(1)
        .stage_flags(stages)
}

/// Create a set layout holding one uniform buffer at `binding`.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_uniform_set_layout(
    device: &ash::Device,
    binding: u32,
    stages: vk::ShaderStageFlags,
) -> Result<vk::DescriptorSetLayout> {
    let bindings = [uniform_binding(binding, stages)];
    let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
    Ok(device.create_descriptor_set_layout(&info, None)?)
}

/// Pool that hands out uniform-buffer descriptor sets.
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    capacity: u32,
}

impl DescriptorPool {
    /// Pool with room for `count` sets of one uniform buffer each.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn for_uniform_sets(device: &ash::Device, count: u32) -> Result<Self> {
        let sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: count,
        }];
        let info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(count)
            .pool_sizes(&sizes);

        let pool = device.create_descriptor_pool(&info, None)?;
        Ok(Self {
            pool,
            capacity: count,
        })
    }

    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }

    /// Number of sets the pool was sized for.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Allocate `count` sets sharing `layout`.
    ///
    /// # Safety
    /// The device and layout must be valid.
    pub unsafe fn allocate(
        &self,
        device: &ash::Device,
        layout: vk::DescriptorSetLayout,
        count: usize,
    ) -> Result<Vec<vk::DescriptorSet>> {
        if count > self.capacity as usize {
            return Err(GpuError::InvalidState(format!(
                "requested {count} descriptor sets from a pool of {}",
                self.capacity
            )));
        }

        let layouts = vec![layout; count];
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);
        Ok(device.allocate_descriptor_sets(&info)?)
    }

    /// Destroy the pool and every set allocated from it.
    ///
    /// # Safety
    /// No set from this pool may be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_descriptor_pool(self.pool, None);
    }
}

/// Point `binding` of `set` at the first `range` bytes of `buffer`.
///
/// # Safety
/// The device, set and buffer must be valid and the set must not be in use.
pub unsafe fn write_uniform_buffer(
    device: &ash::Device,
    set: vk::DescriptorSet,
    binding: u32,
    buffer: vk::Buffer,
    range: vk::DeviceSize,
) {
    let buffer_info = [vk::DescriptorBufferInfo {
        buffer,
        offset: 0,
        range,
    }];
    let write = vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(binding)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .buffer_info(&buffer_info);

    device.update_descriptor_sets(&[write], &[]);
}
