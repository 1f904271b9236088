/// VulkanGraphicsDevice - ash implementation of the engine device traits
///
/// Owns the instance, the window surface, the logical device with its
/// graphics and present queues, and the gpu-allocator used for the shared
/// depth image. Engine handles carry the raw Vulkan handle values, so most
/// calls convert with `Handle::from_raw` and need no lookup table.

use std::ffi::{CStr, CString};
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ash::vk;
use gpu_allocator::vulkan::{Allocation, Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::{FxHashMap, FxHashSet};
use stratum_engine::stratum::device::DescriptorSetHandle;
use stratum_engine::stratum::{Error, RendererConfig, Result};
use stratum_engine::{engine_debug, engine_error, engine_info, engine_warn};

use crate::vulkan_descriptor_allocator::DescriptorAllocator;
use crate::vulkan_format::vk_error;

pub(crate) const LOG_SOURCE: &str = "stratum::vulkan";

/// Depth image with its memory and view, destroyed as one unit
pub(crate) struct DepthImage {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub allocation: Allocation,
}

/// Queue families chosen for a physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

/// Vulkan device implementing `SyncDevice`, `PresentDevice` and `CommandDevice`
///
/// The trait impls live in `vulkan_sync`, `vulkan_swapchain` and
/// `vulkan_command_list`.
pub struct VulkanGraphicsDevice {
    _entry: ash::Entry,
    instance: ash::Instance,
    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<crate::debug::DebugMessenger>,

    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) surface: vk::SurfaceKHR,
    pub(crate) physical_device: vk::PhysicalDevice,
    device_name: String,

    pub(crate) device: ash::Device,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) present_queue: vk::Queue,
    pub(crate) queue_families: QueueFamilies,

    /// Dropped before the device is destroyed
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,
    /// Live depth images, keyed by raw image handle
    pub(crate) depth_images: Mutex<FxHashMap<u64, DepthImage>>,
    descriptor_allocator: Mutex<DescriptorAllocator>,
}

impl VulkanGraphicsDevice {
    /// Create the instance, surface and logical device for `window`
    ///
    /// Picks the first discrete GPU that can render and present to the
    /// surface and supports every required extension, falling back to any
    /// suitable device.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: &RendererConfig,
    ) -> Result<Self> {
        config.validate()?;

        let display_handle = window.display_handle().map_err(|e| {
            engine_error!(LOG_SOURCE, "Failed to get display handle: {}", e);
            Error::InitializationFailed(format!("Failed to get display handle: {}", e))
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            engine_error!(LOG_SOURCE, "Failed to get window handle: {}", e);
            Error::InitializationFailed(format!("Failed to get window handle: {}", e))
        })?;

        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_error!(LOG_SOURCE, "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let app_name = CString::new(config.app_name.as_str()).map_err(|_| {
                Error::ConfigurationError(format!("app_name {:?} contains a NUL byte", config.app_name))
            })?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Stratum")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to get required surface extensions: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {:?}", e))
                })?
                .to_vec();

            let validation = validation_enabled(config);
            let mut layer_names = Vec::new();
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                engine_error!(LOG_SOURCE, "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            // From here on every failure must release what was already created
            let mut partial = PartialInit::new(instance.clone());

            #[cfg(feature = "vulkan-validation")]
            if validation {
                match crate::debug::DebugMessenger::new(&entry, &instance) {
                    Ok(messenger) => partial.messenger = Some(messenger),
                    Err(e) => return Err(partial.fail(e)),
                }
            }

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            let surface = match ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            ) {
                Ok(surface) => surface,
                Err(e) => {
                    engine_error!(LOG_SOURCE, "Failed to create surface: {:?}", e);
                    return Err(partial.fail(Error::InitializationFailed(format!(
                        "Failed to create surface: {:?}",
                        e
                    ))));
                }
            };
            partial.surface = Some((surface_loader.clone(), surface));

            let required = match extension_list(&config.required_device_extensions) {
                Ok(list) => list,
                Err(e) => return Err(partial.fail(e)),
            };

            let (physical_device, queue_families) =
                match pick_physical_device(&instance, &surface_loader, surface, &required) {
                    Ok(picked) => picked,
                    Err(e) => return Err(partial.fail(e)),
                };

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "<unnamed>".to_string());

            let available = available_extensions(&instance, physical_device);
            let mut device_extensions = required;
            for name in &config.optional_device_extensions {
                match CString::new(name.as_str()) {
                    Ok(name) if available.contains(name.as_c_str()) => device_extensions.push(name),
                    Ok(name) => engine_debug!(
                        LOG_SOURCE,
                        "Optional device extension {:?} not available",
                        name
                    ),
                    Err(_) => engine_warn!(LOG_SOURCE, "Ignoring optional extension name {:?}", name),
                }
            }
            let mut extension_ptrs = vec![ash::khr::swapchain::NAME.as_ptr()];
            extension_ptrs.extend(
                device_extensions
                    .iter()
                    .filter(|name| name.as_c_str() != ash::khr::swapchain::NAME)
                    .map(|name| name.as_ptr()),
            );

            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_families.graphics)
                .queue_priorities(&queue_priorities)];
            if queue_families.present != queue_families.graphics {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(queue_families.present)
                        .queue_priorities(&queue_priorities),
                );
            }

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&extension_ptrs);

            let device = match instance.create_device(physical_device, &device_create_info, None) {
                Ok(device) => device,
                Err(e) => {
                    engine_error!(LOG_SOURCE, "Failed to create logical device: {:?}", e);
                    return Err(partial.fail(Error::InitializationFailed(format!(
                        "Failed to create device: {:?}",
                        e
                    ))));
                }
            };

            let graphics_queue = device.get_device_queue(queue_families.graphics, 0);
            let present_queue = device.get_device_queue(queue_families.present, 0);
            let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

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
                    engine_error!(LOG_SOURCE, "Failed to create GPU allocator: {:?}", e);
                    device.destroy_device(None);
                    return Err(partial.fail(Error::InitializationFailed(format!(
                        "Failed to create allocator: {:?}",
                        e
                    ))));
                }
            };

            #[cfg(feature = "vulkan-validation")]
            let debug_messenger = partial.messenger.take();
            partial.disarm();

            engine_info!(
                LOG_SOURCE,
                "Using {} (graphics family {}, present family {}, validation {})",
                device_name,
                queue_families.graphics,
                queue_families.present,
                if validation { "on" } else { "off" }
            );

            Ok(Self {
                _entry: entry,
                instance,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
                surface_loader,
                surface,
                physical_device,
                device_name,
                device: device.clone(),
                swapchain_loader,
                graphics_queue,
                present_queue,
                queue_families,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                depth_images: Mutex::new(FxHashMap::default()),
                descriptor_allocator: Mutex::new(DescriptorAllocator::new(device)),
            })
        }
    }

    /// Name of the selected physical device
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// The ash logical device, for creating pipelines and buffers
    pub fn raw_device(&self) -> &ash::Device {
        &self.device
    }

    pub fn raw_instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn raw_physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Allocate a descriptor set, growing the pool list when the current pool is full
    pub fn allocate_descriptor_set(&self, layout: vk::DescriptorSetLayout) -> Result<DescriptorSetHandle> {
        lock(&self.descriptor_allocator).allocate(layout)
    }

    /// Descriptor pools created so far
    pub fn descriptor_pool_count(&self) -> usize {
        lock(&self.descriptor_allocator).pool_count()
    }

    /// Return every descriptor set to its pool
    ///
    /// Sets handed out earlier become invalid; callers must not use them in
    /// work submitted afterwards.
    pub fn reset_descriptor_sets(&self) -> Result<()> {
        lock(&self.descriptor_allocator).reset()
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                engine_warn!(LOG_SOURCE, "vkDeviceWaitIdle failed during shutdown: {:?}", e);
            }

            lock(&self.descriptor_allocator).destroy();

            let leaked: Vec<DepthImage> = lock(&self.depth_images).drain().map(|(_, d)| d).collect();
            if !leaked.is_empty() {
                engine_warn!(LOG_SOURCE, "Destroying {} depth buffer(s) still alive at shutdown", leaked.len());
            }
            for depth in leaked {
                self.device.destroy_image_view(depth.view, None);
                self.device.destroy_image(depth.image, None);
                if let Err(e) = lock(&*self.allocator).free(depth.allocation) {
                    engine_warn!(LOG_SOURCE, "Failed to free depth allocation: {:?}", e);
                }
            }

            // Allocator memory must go before the device
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);

            #[cfg(feature = "vulkan-validation")]
            drop(self.debug_messenger.take());

            self.instance.destroy_instance(None);
        }
    }
}

/// Lock a mutex, recovering the data if a panicking thread poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Log a failed native call and convert it to an engine error
pub(crate) fn check(operation: &str, result: vk::Result) -> Error {
    engine_error!(LOG_SOURCE, "{} failed: {:?}", operation, result);
    vk_error(operation, result)
}

fn validation_enabled(config: &RendererConfig) -> bool {
    if config.enable_validation && !cfg!(feature = "vulkan-validation") {
        engine_warn!(
            LOG_SOURCE,
            "Validation requested but the vulkan-validation feature is disabled"
        );
    }
    config.enable_validation && cfg!(feature = "vulkan-validation")
}

/// Instance, messenger and surface created so far, destroyed unless disarmed
struct PartialInit {
    instance: Option<ash::Instance>,
    #[cfg(feature = "vulkan-validation")]
    messenger: Option<crate::debug::DebugMessenger>,
    surface: Option<(ash::khr::surface::Instance, vk::SurfaceKHR)>,
}

impl PartialInit {
    fn new(instance: ash::Instance) -> Self {
        Self {
            instance: Some(instance),
            #[cfg(feature = "vulkan-validation")]
            messenger: None,
            surface: None,
        }
    }

    fn disarm(&mut self) {
        self.instance = None;
        self.surface = None;
    }

    fn fail(mut self, error: Error) -> Error {
        self.release();
        error
    }

    fn release(&mut self) {
        #[cfg(feature = "vulkan-validation")]
        drop(self.messenger.take());
        unsafe {
            if let Some((loader, surface)) = self.surface.take() {
                loader.destroy_surface(surface, None);
            }
            if let Some(instance) = self.instance.take() {
                instance.destroy_instance(None);
            }
        }
    }
}

impl Drop for PartialInit {
    fn drop(&mut self) {
        self.release();
    }
}

fn extension_list(names: &[String]) -> Result<Vec<CString>> {
    names
        .iter()
        .map(|name| {
            CString::new(name.as_str()).map_err(|_| {
                Error::ConfigurationError(format!("device extension {:?} contains a NUL byte", name))
            })
        })
        .collect()
}

unsafe fn available_extensions(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> FxHashSet<CString> {
    instance
        .enumerate_device_extension_properties(physical_device)
        .unwrap_or_default()
        .iter()
        .filter_map(|props| props.extension_name_as_c_str().ok().map(CStr::to_owned))
        .collect()
}

/// Graphics family, then a present family (preferring the graphics one)
unsafe fn find_queue_families(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> Option<QueueFamilies> {
    let families = instance.get_physical_device_queue_family_properties(physical_device);
    let graphics = families
        .iter()
        .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))? as u32;

    let supports_present = |index: u32| {
        surface_loader
            .get_physical_device_surface_support(physical_device, index, surface)
            .unwrap_or(false)
    };
    let present = if supports_present(graphics) {
        graphics
    } else {
        (0..families.len() as u32).find(|&index| supports_present(index))?
    };

    Some(QueueFamilies { graphics, present })
}

unsafe fn pick_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    required: &[CString],
) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
    let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
        engine_error!(LOG_SOURCE, "Failed to enumerate physical devices: {:?}", e);
        Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
    })?;

    let mut best: Option<(u32, vk::PhysicalDevice, QueueFamilies)> = None;
    for physical_device in physical_devices {
        let Some(families) = find_queue_families(instance, surface_loader, surface, physical_device) else {
            continue;
        };
        let available = available_extensions(instance, physical_device);
        if !available.contains(ash::khr::swapchain::NAME) {
            continue;
        }
        if let Some(missing) = required.iter().find(|name| !available.contains(name.as_c_str())) {
            engine_debug!(LOG_SOURCE, "Skipping device without extension {:?}", missing);
            continue;
        }

        let device_type = instance.get_physical_device_properties(physical_device).device_type;
        let score = match device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => 2,
            vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
            _ => 0,
        };
        if best.map_or(true, |(best_score, _, _)| score > best_score) {
            best = Some((score, physical_device, families));
        }
    }

    best.map(|(_, physical_device, families)| (physical_device, families)).ok_or_else(|| {
        engine_error!(LOG_SOURCE, "No GPU can render and present to this surface");
        Error::InitializationFailed("No suitable Vulkan device found".to_string())
    })
}
