//! Buffer allocation on top of `gpu-allocator`.

use crate::command::CommandPool;
use crate::error::{GpuError, Result};
use ash::vk;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::{AllocatorDebugSettings, MemoryLocation};
use std::sync::Arc;

/// Owns the device memory allocator.
///
/// Lives behind the context's mutex; every buffer it hands out must be
/// returned through [`GpuAllocator::free_buffer`] before the device goes.
pub struct GpuAllocator {
    device: Arc<ash::Device>,
    // Taken on release so the allocator drops before the device.
    allocator: Option<Allocator>,
}

impl GpuAllocator {
    /// # Safety
    /// The instance, device and physical device must be valid.
    pub unsafe fn new(
        instance: &ash::Instance,
        device: Arc<ash::Device>,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Self> {
        let debug_settings = AllocatorDebugSettings {
            log_memory_information: cfg!(debug_assertions),
            log_leaks_on_shutdown: true,
            ..AllocatorDebugSettings::default()
        };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: (*device).clone(),
            physical_device,
            debug_settings,
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| GpuError::AllocationFailed(e.to_string()))?;

        Ok(Self {
            device,
            allocator: Some(allocator),
        })
    }

    fn allocator(&mut self) -> Result<&mut Allocator> {
        self.allocator
            .as_mut()
            .ok_or_else(|| GpuError::InvalidState("allocator already released".into()))
    }

    /// Create a buffer of `size` bytes backed by memory in `location`.
    ///
    /// `CpuToGpu` buffers come back persistently mapped and accept
    /// [`GpuBuffer::write`].
    pub fn create_buffer(
        &mut self,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        name: &str,
    ) -> Result<GpuBuffer> {
        let info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let handle = unsafe { self.device.create_buffer(&info, None)? };
        let requirements = unsafe { self.device.get_buffer_memory_requirements(handle) };

        let desc = AllocationCreateDesc {
            name,
            requirements,
            location,
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        };
        let allocation = match self.allocator()?.allocate(&desc) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_buffer(handle, None) };
                return Err(GpuError::AllocationFailed(e.to_string()));
            }
        };

        let mut buffer = GpuBuffer {
            handle,
            allocation: Some(allocation),
            size,
        };
        let bound = match &buffer.allocation {
            Some(a) => unsafe {
                self.device
                    .bind_buffer_memory(handle, a.memory(), a.offset())
            },
            None => Ok(()),
        };
        if let Err(e) = bound {
            self.free_buffer(&mut buffer)?;
            return Err(e.into());
        }

        tracing::debug!(name, size, ?location, "Allocated buffer");
        Ok(buffer)
    }

    /// Device-local buffer holding a copy of `data`.
    ///
    /// The bytes travel through a host-visible staging buffer and a copy
    /// submitted on `queue`; the copy has finished when this returns.
    /// `usage` gains `TRANSFER_DST`.
    ///
    /// # Safety
    /// `pool` must belong to `queue`'s family.
    pub unsafe fn upload_buffer(
        &mut self,
        pool: &CommandPool,
        queue: vk::Queue,
        data: &[u8],
        usage: vk::BufferUsageFlags,
        name: &str,
    ) -> Result<GpuBuffer> {
        if data.is_empty() {
            return Err(GpuError::InvalidState(format!(
                "nothing to upload into '{name}'"
            )));
        }
        let size = data.len() as u64;

        let mut staging = self.create_buffer(
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            &format!("{name}_staging"),
        )?;
        let mut target = match staging.write_bytes(0, data).and_then(|()| {
            self.create_buffer(
                size,
                usage | vk::BufferUsageFlags::TRANSFER_DST,
                MemoryLocation::GpuOnly,
                name,
            )
        }) {
            Ok(target) => target,
            Err(e) => {
                self.free_buffer(&mut staging)?;
                return Err(e);
            }
        };

        let device = Arc::clone(&self.device);
        let copied = pool.submit_and_wait(&device, queue, |cmd| {
            let region = vk::BufferCopy::default().size(size);
            device.cmd_copy_buffer(cmd, staging.handle, target.handle, &[region]);
        });

        self.free_buffer(&mut staging)?;
        if let Err(e) = copied {
            self.free_buffer(&mut target)?;
            return Err(e);
        }
        Ok(target)
    }

    /// Release `buffer` and its memory. Freeing twice is a no-op.
    pub fn free_buffer(&mut self, buffer: &mut GpuBuffer) -> Result<()> {
        if let Some(allocation) = buffer.allocation.take() {
            self.allocator()?
                .free(allocation)
                .map_err(|e| GpuError::AllocationFailed(e.to_string()))?;
        }
        if buffer.handle != vk::Buffer::null() {
            unsafe { self.device.destroy_buffer(buffer.handle, None) };
            buffer.handle = vk::Buffer::null();
        }
        Ok(())
    }

    /// Drop the allocator. Anything still allocated is reported as a leak.
    /// Must run before the device is destroyed.
    pub fn release(&mut self) {
        self.allocator = None;
    }
}

impl Drop for GpuAllocator {
    fn drop(&mut self) {
        self.release();
    }
}

/// A buffer together with the memory bound to it.
pub struct GpuBuffer {
    handle: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
}

impl GpuBuffer {
    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Copy `data` to the start of a host-visible buffer.
    pub fn write<T: bytemuck::Pod>(&self, data: &[T]) -> Result<()> {
        self.write_bytes(0, bytemuck::cast_slice(data))
    }

    /// Copy `data` into a host-visible buffer at `offset`.
    pub fn write_bytes(&self, offset: u64, data: &[u8]) -> Result<()> {
        let start = checked_range(self.size, offset, data.len())?;
        let mapped = self
            .allocation
            .as_ref()
            .and_then(Allocation::mapped_ptr)
            .ok_or_else(|| GpuError::InvalidState("buffer is not host-visible".into()))?;

        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                mapped.as_ptr().cast::<u8>().add(start),
                data.len(),
            );
        }
        Ok(())
    }
}

/// Start of a `len`-byte write at `offset` into a `size`-byte buffer, if it
/// fits.
fn checked_range(size: u64, offset: u64, len: usize) -> Result<usize> {
    let fits = offset
        .checked_add(len as u64)
        .is_some_and(|end| end <= size);
    if !fits {
        return Err(GpuError::InvalidState(format!(
            "write of {len} bytes at offset {offset} overruns {size}-byte buffer"
        )));
    }
    usize::try_from(offset).map_err(|_| GpuError::InvalidState("offset exceeds address space".into()))
}
