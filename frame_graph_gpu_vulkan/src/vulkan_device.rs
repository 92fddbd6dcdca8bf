/// VulkanDevice - Vulkan implementation of the GpuDevice trait
///
/// Headless: no surface or swapchain is created. Presentation stays with the
/// renderer that owns the window; this device only creates and destroys the
/// images, buffers and descriptor pools the frame graph asks for.

use ash::vk;
use ash::vk::Handle;
use frame_graph_gpu::framegraph::{Error, Result};
use frame_graph_gpu::framegraph::device::{
    GpuDevice, ImageDesc, ImageAllocation, BufferDesc, BufferAllocation,
    DescriptorPoolSize, DescriptorAllocError, DeviceCapabilities, ImageUsage,
    ImageHandle, ImageViewHandle, SamplerHandle, MemoryHandle, BufferHandle,
    FramebufferHandle, DescriptorPoolHandle, DescriptorSetHandle,
    DescriptorSetLayoutHandle,
};
use frame_graph_gpu::{engine_debug, engine_error, engine_info, engine_trace, engine_warn, engine_err};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use gpu_allocator::{AllocationError, MemoryLocation};
use rustc_hash::FxHashMap;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::vulkan_context::GpuContext;
use crate::vulkan_fence::VulkanFrameFences;
use crate::vulkan_format::{
    texture_format_to_vk, aspect_mask, view_aspect_mask, image_usage_to_vk,
    buffer_usage_to_vk, memory_location, descriptor_kind_to_vk,
};

const SOURCE: &str = "framegraph::vulkan";

/// Device creation options
#[derive(Debug, Clone)]
pub struct VulkanDeviceConfig {
    /// Application name reported to the driver
    pub application_name: String,
    /// Request VK_LAYER_KHRONOS_validation (needs the `vulkan-validation` feature)
    pub enable_validation: bool,
    /// Index into the enumerated physical devices
    pub physical_device_index: usize,
}

impl Default for VulkanDeviceConfig {
    fn default() -> Self {
        Self {
            application_name: "Frame Graph Application".to_string(),
            enable_validation: cfg!(feature = "vulkan-validation"),
            physical_device_index: 0,
        }
    }
}

/// Live gpu-allocator allocations, keyed by the raw value of their MemoryHandle
#[derive(Default)]
struct MemoryRegistry {
    next_id: u64,
    allocations: FxHashMap<u64, Allocation>,
}

impl MemoryRegistry {
    fn insert(&mut self, allocation: Allocation) -> MemoryHandle {
        self.next_id += 1;
        self.allocations.insert(self.next_id, allocation);
        MemoryHandle::from_raw(self.next_id)
    }

    fn remove(&mut self, memory: MemoryHandle) -> Option<Allocation> {
        self.allocations.remove(&memory.as_raw())
    }
}

/// Vulkan device implementation
pub struct VulkanDevice {
    /// Vulkan entry (must outlive the instance)
    _entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    capabilities: DeviceCapabilities,
    memory: Mutex<MemoryRegistry>,
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    /// Shared GPU context (device, allocator, queue, transfer pool)
    gpu_context: Arc<GpuContext>,
}

impl VulkanDevice {
    /// Create a headless Vulkan device
    ///
    /// Enables `drawIndirectCount` when the physical device supports it and
    /// reports the result through `capabilities()`.
    pub fn new(config: VulkanDeviceConfig) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            let app_name = std::ffi::CString::new(config.application_name.clone())
                .map_err(|e| Error::InitializationFailed(format!("Invalid application name: {}", e)))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"FrameGraphGpu")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_2);

            let validation = config.enable_validation && cfg!(feature = "vulkan-validation");
            if config.enable_validation && !validation {
                engine_warn!(SOURCE, "Validation requested but the vulkan-validation feature is disabled");
            }

            let mut extension_names = Vec::new();
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names = if validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to create Vulkan instance: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;

            #[cfg(feature = "vulkan-validation")]
            let (debug_utils_loader, debug_messenger) = if validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                let debug_info = crate::vulkan_debug::messenger_create_info();
                match debug_utils.create_debug_utils_messenger(&debug_info, None) {
                    Ok(messenger) => (Some(debug_utils), Some(messenger)),
                    Err(e) => {
                        engine_warn!(SOURCE, "Failed to create debug messenger: {:?}", e);
                        (None, None)
                    }
                }
            } else {
                (None, None)
            };
            #[cfg(not(feature = "vulkan-validation"))]
            let (debug_utils_loader, debug_messenger): (
                Option<ash::ext::debug_utils::Instance>,
                Option<vk::DebugUtilsMessengerEXT>,
            ) = (None, None);

            // From here on, failures must tear the instance down
            let destroy_instance = |instance: &ash::Instance| {
                if let (Some(loader), Some(messenger)) = (&debug_utils_loader, debug_messenger) {
                    loader.destroy_debug_utils_messenger(messenger, None);
                }
                instance.destroy_instance(None);
            };

            let physical_devices = match instance.enumerate_physical_devices() {
                Ok(devices) => devices,
                Err(e) => {
                    destroy_instance(&instance);
                    engine_error!(SOURCE, "Failed to enumerate physical devices: {:?}", e);
                    return Err(Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e)));
                }
            };
            let Some(&physical_device) = physical_devices.get(config.physical_device_index) else {
                destroy_instance(&instance);
                engine_error!(SOURCE, "No Vulkan-capable GPU at index {}", config.physical_device_index);
                return Err(Error::InitializationFailed("No Vulkan-capable GPU found".to_string()));
            };

            let properties = instance.get_physical_device_properties(physical_device);
            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);

            let Some(graphics_family_index) = queue_families
                .iter()
                .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|i| i as u32)
            else {
                destroy_instance(&instance);
                engine_error!(SOURCE, "No graphics queue family found");
                return Err(Error::InitializationFailed("No graphics queue family found".to_string()));
            };

            let compute_queue = queue_families.iter().any(|qf| {
                qf.queue_flags.contains(vk::QueueFlags::COMPUTE)
                    && !qf.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            });

            // Indirect-count draws are core in Vulkan 1.2 behind a feature bit
            let api_1_2 = vk::api_version_major(properties.api_version) > 1
                || vk::api_version_minor(properties.api_version) >= 2;
            let mut supported12 = vk::PhysicalDeviceVulkan12Features::default();
            if api_1_2 {
                let mut features2 = vk::PhysicalDeviceFeatures2::default().push_next(&mut supported12);
                instance.get_physical_device_features2(physical_device, &mut features2);
            }
            let draw_indirect_count = api_1_2 && supported12.draw_indirect_count == vk::TRUE;

            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .queue_priorities(&queue_priorities)];

            let mut enabled12 = vk::PhysicalDeviceVulkan12Features::default()
                .draw_indirect_count(draw_indirect_count);
            let mut device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos);
            if api_1_2 {
                device_create_info = device_create_info.push_next(&mut enabled12);
            }

            let device = match instance.create_device(physical_device, &device_create_info, None) {
                Ok(device) => device,
                Err(e) => {
                    destroy_instance(&instance);
                    engine_error!(SOURCE, "Failed to create logical device: {:?}", e);
                    return Err(Error::InitializationFailed(format!("Failed to create device: {:?}", e)));
                }
            };

            let graphics_queue = device.get_device_queue(graphics_family_index, 0);

            let allocator = match Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            }) {
                Ok(allocator) => allocator,
                Err(e) => {
                    device.destroy_device(None);
                    destroy_instance(&instance);
                    engine_error!(SOURCE, "Failed to create GPU allocator: {:?}", e);
                    return Err(Error::InitializationFailed(format!("Failed to create allocator: {:?}", e)));
                }
            };

            let pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let transfer_command_pool = match device.create_command_pool(&pool_create_info, None) {
                Ok(pool) => pool,
                Err(e) => {
                    drop(allocator);
                    device.destroy_device(None);
                    destroy_instance(&instance);
                    engine_error!(SOURCE, "Failed to create transfer command pool: {:?}", e);
                    return Err(Error::InitializationFailed(format!("Failed to create command pool: {:?}", e)));
                }
            };

            let capabilities = DeviceCapabilities { draw_indirect_count, compute_queue };
            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string());
            engine_info!(SOURCE, "Vulkan device '{}' ready (indirect count: {}, compute queue: {}, validation: {})",
                device_name, draw_indirect_count, compute_queue, debug_messenger.is_some());

            let gpu_context = Arc::new(GpuContext::new(
                device,
                Arc::new(Mutex::new(allocator)),
                graphics_queue,
                graphics_family_index,
                transfer_command_pool,
            ));

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                capabilities,
                memory: Mutex::new(MemoryRegistry::default()),
                debug_utils_loader,
                debug_messenger,
                gpu_context,
            })
        }
    }

    /// Shared context for fences, command recording and readbacks
    pub fn context(&self) -> &Arc<GpuContext> {
        &self.gpu_context
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Create one signaled fence per frame slot
    pub fn create_frame_fences(&self, frames_in_flight: usize) -> Result<VulkanFrameFences> {
        VulkanFrameFences::new(Arc::clone(&self.gpu_context), frames_in_flight)
    }

    fn memory(&self) -> MutexGuard<'_, MemoryRegistry> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<MemoryHandle> {
        let allocation = self
            .gpu_context
            .allocator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| match e {
                AllocationError::OutOfMemory => {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!(SOURCE, "Out of GPU memory for '{}' (required: {:.2} MB)", name, size_mb);
                    Error::OutOfMemory
                }
                other => engine_err!(SOURCE, "Failed to allocate memory for '{}': {:?}", name, other),
            })?;
        Ok(self.memory().insert(allocation))
    }

    fn free(&self, memory: MemoryHandle) {
        if memory.is_null() {
            return;
        }
        let Some(allocation) = self.memory().remove(memory) else {
            engine_warn!(SOURCE, "Free of unknown memory handle {:?} ignored", memory);
            return;
        };
        let mut allocator = self.gpu_context.allocator.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = allocator.free(allocation) {
            engine_warn!(SOURCE, "Failed to free GPU memory: {:?}", e);
        }
    }

    fn bound_memory(&self, memory: MemoryHandle) -> Option<(vk::DeviceMemory, u64)> {
        self.memory()
            .allocations
            .get(&memory.as_raw())
            .map(|allocation| unsafe { (allocation.memory(), allocation.offset()) })
    }

    /// Fill in memory, views and sampler of a freshly created image
    ///
    /// On error, whatever was created so far is left in `out` for the caller
    /// to destroy.
    fn populate_image(&self, desc: &ImageDesc, out: &mut ImageAllocation) -> Result<()> {
        let device = &self.gpu_context.device;
        let image = vk::Image::from_raw(out.image.as_raw());
        let format = texture_format_to_vk(desc.format);
        let layers = desc.array_layers.max(1);

        unsafe {
            let requirements = device.get_image_memory_requirements(image);
            out.memory = self.allocate(&desc.name, requirements, MemoryLocation::GpuOnly, false)?;
            let (memory, offset) = self
                .bound_memory(out.memory)
                .ok_or_else(|| engine_err!(SOURCE, "Memory for '{}' vanished before binding", desc.name))?;
            device.bind_image_memory(image, memory, offset)
                .map_err(|e| engine_err!(SOURCE, "Failed to bind image memory for '{}': {:?}", desc.name, e))?;

            let view_info = |view_type: vk::ImageViewType, aspect: vk::ImageAspectFlags, base_layer: u32, layer_count: u32| {
                vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(view_type)
                    .format(format)
                    .components(vk::ComponentMapping::default())
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: aspect,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: base_layer,
                        layer_count,
                    })
            };

            if desc.usage.intersects(ImageUsage::SAMPLED | ImageUsage::STORAGE) {
                let view_type = if layers > 1 {
                    vk::ImageViewType::TYPE_2D_ARRAY
                } else {
                    vk::ImageViewType::TYPE_2D
                };
                let view = device
                    .create_image_view(&view_info(view_type, view_aspect_mask(desc.format), 0, layers), None)
                    .map_err(|e| engine_err!(SOURCE, "Failed to create view for '{}': {:?}", desc.name, e))?;
                out.view = ImageViewHandle::from_raw(view.as_raw());
            }

            if desc.usage.intersects(ImageUsage::COLOR_ATTACHMENT | ImageUsage::DEPTH_STENCIL_ATTACHMENT) {
                for layer in 0..layers {
                    let view = device
                        .create_image_view(&view_info(vk::ImageViewType::TYPE_2D, aspect_mask(desc.format), layer, 1), None)
                        .map_err(|e| engine_err!(SOURCE, "Failed to create attachment view {} for '{}': {:?}", layer, desc.name, e))?;
                    out.attachment_views.push(ImageViewHandle::from_raw(view.as_raw()));
                }
            }

            if desc.usage.contains(ImageUsage::SAMPLED) {
                let sampler_info = vk::SamplerCreateInfo::default()
                    .mag_filter(vk::Filter::LINEAR)
                    .min_filter(vk::Filter::LINEAR)
                    .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
                    .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                    .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                    .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                    .max_lod(vk::LOD_CLAMP_NONE);
                let sampler = device
                    .create_sampler(&sampler_info, None)
                    .map_err(|e| engine_err!(SOURCE, "Failed to create sampler for '{}': {:?}", desc.name, e))?;
                out.sampler = Some(SamplerHandle::from_raw(sampler.as_raw()));
            }
        }
        Ok(())
    }
}

impl GpuDevice for VulkanDevice {
    fn create_image(&self, desc: &ImageDesc) -> Result<ImageAllocation> {
        let image_create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(texture_format_to_vk(desc.format))
            .extent(vk::Extent3D {
                width: desc.extent.x.max(1),
                height: desc.extent.y.max(1),
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(desc.array_layers.max(1))
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(image_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe {
            self.gpu_context.device.create_image(&image_create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create image '{}' ({}x{}, {:?}): {:?}",
                    desc.name, desc.extent.x, desc.extent.y, desc.format, e))?
        };

        let mut allocation = ImageAllocation {
            image: ImageHandle::from_raw(image.as_raw()),
            memory: MemoryHandle::NULL,
            view: ImageViewHandle::NULL,
            attachment_views: Vec::new(),
            sampler: None,
        };
        if let Err(e) = self.populate_image(desc, &mut allocation) {
            self.destroy_image(&allocation);
            return Err(e);
        }

        engine_trace!(SOURCE, "Created image '{}' {}x{} x{} {:?}",
            desc.name, desc.extent.x, desc.extent.y, desc.array_layers, desc.usage);
        Ok(allocation)
    }

    fn destroy_image(&self, allocation: &ImageAllocation) {
        let device = &self.gpu_context.device;
        unsafe {
            if let Some(sampler) = allocation.sampler.filter(|s| !s.is_null()) {
                device.destroy_sampler(vk::Sampler::from_raw(sampler.as_raw()), None);
            }
            for view in allocation.attachment_views.iter().filter(|v| !v.is_null()) {
                device.destroy_image_view(vk::ImageView::from_raw(view.as_raw()), None);
            }
            if !allocation.view.is_null() {
                device.destroy_image_view(vk::ImageView::from_raw(allocation.view.as_raw()), None);
            }
            if !allocation.image.is_null() {
                device.destroy_image(vk::Image::from_raw(allocation.image.as_raw()), None);
            }
        }
        self.free(allocation.memory);
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferAllocation> {
        let device = &self.gpu_context.device;
        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(buffer_usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = device.create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create buffer '{}' of size {} bytes: {:?}", desc.name, desc.size, e))?;

            let requirements = device.get_buffer_memory_requirements(buffer);
            let memory = match self.allocate(&desc.name, requirements, memory_location(desc.memory_properties), true) {
                Ok(memory) => memory,
                Err(e) => {
                    device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            let bind_result = match self.bound_memory(memory) {
                Some((device_memory, offset)) => device
                    .bind_buffer_memory(buffer, device_memory, offset)
                    .map_err(|e| engine_err!(SOURCE, "Failed to bind buffer memory for '{}': {:?}", desc.name, e)),
                None => Err(engine_err!(SOURCE, "Memory for '{}' vanished before binding", desc.name)),
            };
            if let Err(e) = bind_result {
                device.destroy_buffer(buffer, None);
                self.free(memory);
                return Err(e);
            }

            engine_trace!(SOURCE, "Created buffer '{}' ({} bytes, {:?})", desc.name, desc.size, desc.usage);
            Ok(BufferAllocation {
                buffer: BufferHandle::from_raw(buffer.as_raw()),
                memory,
                size: desc.size,
            })
        }
    }

    fn destroy_buffer(&self, allocation: &BufferAllocation) {
        if !allocation.buffer.is_null() {
            unsafe {
                self.gpu_context.device.destroy_buffer(vk::Buffer::from_raw(allocation.buffer.as_raw()), None);
            }
        }
        self.free(allocation.memory);
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) {
        if framebuffer.is_null() {
            return;
        }
        unsafe {
            self.gpu_context.device.destroy_framebuffer(vk::Framebuffer::from_raw(framebuffer.as_raw()), None);
        }
    }

    fn write_memory(&self, memory: MemoryHandle, offset: u64, data: &[u8]) -> Result<()> {
        let mut registry = self.memory();
        let allocation = registry
            .allocations
            .get_mut(&memory.as_raw())
            .ok_or_else(|| Error::InvalidResource(format!("Unknown memory handle {:?}", memory)))?;
        let mapped = allocation
            .mapped_slice_mut()
            .ok_or_else(|| engine_err!(SOURCE, "Memory {:?} is not host-visible", memory))?;

        let start = offset as usize;
        let end = start
            .checked_add(data.len())
            .filter(|&end| end <= mapped.len())
            .ok_or_else(|| Error::InvalidResource(format!(
                "Write of {} bytes at offset {} exceeds mapped size {}", data.len(), offset, mapped.len()
            )))?;
        mapped[start..end].copy_from_slice(data);
        Ok(())
    }

    fn create_descriptor_pool(
        &self,
        max_sets: u32,
        pool_sizes: &[DescriptorPoolSize],
    ) -> Result<DescriptorPoolHandle> {
        let sizes: Vec<vk::DescriptorPoolSize> = pool_sizes
            .iter()
            .filter(|size| size.count > 0)
            .map(|size| vk::DescriptorPoolSize {
                ty: descriptor_kind_to_vk(size.kind),
                descriptor_count: size.count,
            })
            .collect();
        let info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&sizes)
            .max_sets(max_sets.max(1));

        let pool = unsafe {
            self.gpu_context.device.create_descriptor_pool(&info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create descriptor pool ({} sets): {:?}", max_sets, e))?
        };
        engine_debug!(SOURCE, "Created descriptor pool for {} sets", max_sets);
        Ok(DescriptorPoolHandle::from_raw(pool.as_raw()))
    }

    fn allocate_descriptor_sets(
        &self,
        pool: DescriptorPoolHandle,
        layouts: &[DescriptorSetLayoutHandle],
    ) -> std::result::Result<Vec<DescriptorSetHandle>, DescriptorAllocError> {
        let vk_layouts: Vec<vk::DescriptorSetLayout> = layouts
            .iter()
            .map(|layout| vk::DescriptorSetLayout::from_raw(layout.as_raw()))
            .collect();
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(vk::DescriptorPool::from_raw(pool.as_raw()))
            .set_layouts(&vk_layouts);

        let sets = unsafe { self.gpu_context.device.allocate_descriptor_sets(&info) }
            .map_err(|e| match e {
                vk::Result::ERROR_OUT_OF_POOL_MEMORY => DescriptorAllocError::OutOfPoolMemory,
                vk::Result::ERROR_FRAGMENTED_POOL => DescriptorAllocError::FragmentedPool,
                other => DescriptorAllocError::Other(format!("{:?}", other)),
            })?;
        Ok(sets.into_iter().map(|set| DescriptorSetHandle::from_raw(set.as_raw())).collect())
    }

    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle) {
        if pool.is_null() {
            return;
        }
        unsafe {
            self.gpu_context.device.destroy_descriptor_pool(vk::DescriptorPool::from_raw(pool.as_raw()), None);
        }
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn wait_idle(&self) -> Result<()> {
        {
            let _queue = self.gpu_context.queue_lock.lock().unwrap_or_else(PoisonError::into_inner);
            unsafe {
                self.gpu_context.device
                    .device_wait_idle()
                    .map_err(|e| engine_err!(SOURCE, "Failed to wait idle: {:?}", e))?;
            }
        }
        self.gpu_context.collect_deferred_readbacks();
        Ok(())
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            self.gpu_context.device.device_wait_idle().ok();

            // 0. Readbacks released while their copy was in flight
            let deferred = self.gpu_context.destroy_deferred_readbacks();
            if deferred > 0 {
                engine_debug!(SOURCE, "Destroyed {} deferred readbacks at device drop", deferred);
            }

            // 1. Free memory the frame graph never destroyed
            let leaked: Vec<Allocation> = self.memory
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner)
                .allocations
                .drain()
                .map(|(_, allocation)| allocation)
                .collect();
            if !leaked.is_empty() {
                engine_warn!(SOURCE, "{} GPU allocations still alive at device drop", leaked.len());
                let mut allocator = self.gpu_context.allocator.lock().unwrap_or_else(PoisonError::into_inner);
                for allocation in leaked {
                    allocator.free(allocation).ok();
                }
            }

            // 2. Destroy the transfer command pool
            {
                let mut pool = self.gpu_context.transfer_command_pool.lock().unwrap_or_else(PoisonError::into_inner);
                if *pool != vk::CommandPool::null() {
                    self.gpu_context.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            // 3. Drop allocator BEFORE destroying the device.
            //    Fences or readbacks still holding the context keep the device alive.
            let Some(ctx) = Arc::get_mut(&mut self.gpu_context) else {
                engine_error!(SOURCE, "GpuContext still shared at device drop, leaking the Vulkan device");
                return;
            };
            ManuallyDrop::drop(&mut ctx.allocator);

            // 4. Debug messenger, then device and instance
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils_loader, self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            ctx.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
