use std::ffi::{c_void, CStr, CString};

use anyhow::{anyhow, Context, Result};
use atlas_core::ShellError;
use atlas_render::BACKGROUND_COLOR;
use tracing::{debug, error, info, warn};

use ash::ext::debug_utils;
use ash::khr::{surface, swapchain};
use ash::{vk, Device, Entry, Instance};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::plan::{
    depth_aspect, device_type_weight, find_memory_type, pick_depth_format, require_surface_format,
    sharing_plan, swapchain_extent, swapchain_image_count,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct QueueFamilies {
    graphics: u32,
    present: u32,
}

#[derive(Clone, Copy)]
struct DepthTarget {
    format: vk::Format,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
}

/// A fully bootstrapped presentation context for one window: swapchain,
/// depth target, render pass, framebuffers, pre-recorded clear commands
/// and the sync objects to submit them.
///
/// One framebuffer, command buffer and fence exist per swapchain image.
pub struct VulkanContext {
    _entry: Entry,
    instance: Instance,
    debug: Option<(debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface_loader: surface::Instance,
    surface: vk::SurfaceKHR,
    device: Device,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    swapchain_loader: swapchain::Device,
    swapchain: vk::SwapchainKHR,
    image_views: Vec<vk::ImageView>,
    depth: DepthTarget,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
    cmd_pool: vk::CommandPool,
    cmd_bufs: Vec<vk::CommandBuffer>,
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    fences: Vec<vk::Fence>,
}

impl VulkanContext {
    /// Runs the bootstrap stages in order, instance through fences. If
    /// any stage fails, everything acquired before it is released in
    /// reverse order and the error names the stage that halted.
    pub fn bootstrap(
        display_handle: RawDisplayHandle,
        window_handle: RawWindowHandle,
        app_name: &str,
        drawable: (u32, u32),
    ) -> Result<Self, ShellError> {
        unsafe { build(display_handle, window_handle, app_name, drawable) }
    }

    /// Submits the pre-recorded commands for the next image and presents
    /// it. An out-of-date surface logs and skips the frame; swapchain
    /// recreation is not handled here.
    pub fn present_frame(&mut self) -> Result<()> {
        unsafe {
            let (index, suboptimal) = match self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                self.image_available,
                vk::Fence::null(),
            ) {
                Ok(pair) => pair,
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    warn!("swapchain out of date; frame skipped");
                    return Ok(());
                }
                Err(e) => return Err(anyhow!("acquire_next_image: {e}")),
            };
            if suboptimal {
                debug!("swapchain suboptimal");
            }

            let fence = self.fences[index as usize];
            self.device
                .wait_for_fences(&[fence], true, u64::MAX)
                .context("wait_for_fences")?;
            self.device.reset_fences(&[fence]).context("reset_fences")?;

            let cmd = self.cmd_bufs[index as usize];
            let wait_stage = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
            let submit = vk::SubmitInfo {
                s_type: vk::StructureType::SUBMIT_INFO,
                wait_semaphore_count: 1,
                p_wait_semaphores: &self.image_available,
                p_wait_dst_stage_mask: &wait_stage,
                command_buffer_count: 1,
                p_command_buffers: &cmd,
                signal_semaphore_count: 1,
                p_signal_semaphores: &self.render_finished,
                ..Default::default()
            };
            self.device
                .queue_submit(self.graphics_queue, std::slice::from_ref(&submit), fence)
                .context("queue_submit")?;

            let present = vk::PresentInfoKHR {
                s_type: vk::StructureType::PRESENT_INFO_KHR,
                wait_semaphore_count: 1,
                p_wait_semaphores: &self.render_finished,
                swapchain_count: 1,
                p_swapchains: &self.swapchain,
                p_image_indices: &index,
                ..Default::default()
            };
            match self
                .swapchain_loader
                .queue_present(self.present_queue, &present)
            {
                Ok(_) | Err(vk::Result::SUBOPTIMAL_KHR) => Ok(()),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    warn!("swapchain out of date at present");
                    Ok(())
                }
                Err(e) => Err(anyhow!("queue_present: {e}")),
            }
        }
    }
}

// STRICT TEARDOWN ORDER:
// - wait all fences, then device_wait_idle
// - sync objects and command pool before device
// - framebuffers -> render pass -> depth -> image views -> swapchain
// - device before surface; debug messenger and instance last
impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            let d = &self.device;
            if !self.fences.is_empty() {
                let _ = d.wait_for_fences(&self.fences, true, u64::MAX);
            }
            d.device_wait_idle().ok();

            for &fence in &self.fences {
                d.destroy_fence(fence, None);
            }
            d.destroy_semaphore(self.render_finished, None);
            d.destroy_semaphore(self.image_available, None);

            if !self.cmd_bufs.is_empty() {
                d.free_command_buffers(self.cmd_pool, &self.cmd_bufs);
            }
            d.destroy_command_pool(self.cmd_pool, None);

            for &fb in &self.framebuffers {
                d.destroy_framebuffer(fb, None);
            }
            d.destroy_render_pass(self.render_pass, None);

            d.destroy_image_view(self.depth.view, None);
            d.destroy_image(self.depth.image, None);
            d.free_memory(self.depth.memory, None);

            for &view in &self.image_views {
                d.destroy_image_view(view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);

            d.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            if let Some((loader, messenger)) = self.debug.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Slots for everything the bootstrap stages acquire, filled in stage
/// order. Dropping the guard while armed releases the filled prefix in
/// reverse, so a stage failure never leaks the stages before it.
#[derive(Default)]
struct Bootstrap {
    disarmed: bool,
    instance: Option<Instance>,
    debug: Option<(debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface: Option<(surface::Instance, vk::SurfaceKHR)>,
    device: Option<Device>,
    swapchain: Option<(swapchain::Device, vk::SwapchainKHR)>,
    image_views: Vec<vk::ImageView>,
    depth: Option<DepthTarget>,
    render_pass: Option<vk::RenderPass>,
    framebuffers: Vec<vk::Framebuffer>,
    cmd_pool: Option<vk::CommandPool>,
    cmd_bufs: Vec<vk::CommandBuffer>,
    semaphores: Vec<vk::Semaphore>,
    fences: Vec<vk::Fence>,
}

impl Bootstrap {
    /// Called once every stage has completed and ownership has moved to
    /// the final context.
    fn disarm(&mut self) {
        self.disarmed = true;
    }
}

impl Drop for Bootstrap {
    fn drop(&mut self) {
        if self.disarmed {
            return;
        }
        unsafe { release_partial(self) }
    }
}

unsafe fn release_partial(b: &mut Bootstrap) {
    if let Some(device) = b.device.take() {
        let _ = device.device_wait_idle();
        for &fence in &b.fences {
            device.destroy_fence(fence, None);
        }
        for &sem in &b.semaphores {
            device.destroy_semaphore(sem, None);
        }
        if let Some(pool) = b.cmd_pool.take() {
            if !b.cmd_bufs.is_empty() {
                device.free_command_buffers(pool, &b.cmd_bufs);
            }
            device.destroy_command_pool(pool, None);
        }
        for &fb in &b.framebuffers {
            device.destroy_framebuffer(fb, None);
        }
        if let Some(rp) = b.render_pass.take() {
            device.destroy_render_pass(rp, None);
        }
        if let Some(depth) = b.depth.take() {
            device.destroy_image_view(depth.view, None);
            device.destroy_image(depth.image, None);
            device.free_memory(depth.memory, None);
        }
        for &view in &b.image_views {
            device.destroy_image_view(view, None);
        }
        if let Some((loader, sc)) = b.swapchain.take() {
            loader.destroy_swapchain(sc, None);
        }
        device.destroy_device(None);
    }
    if let Some((loader, surf)) = b.surface.take() {
        loader.destroy_surface(surf, None);
    }
    if let Some((loader, messenger)) = b.debug.take() {
        loader.destroy_debug_utils_messenger(messenger, None);
    }
    if let Some(instance) = b.instance.take() {
        instance.destroy_instance(None);
    }
}

fn halt(stage: &'static str) -> impl FnOnce(anyhow::Error) -> ShellError {
    move |e| ShellError::BootstrapHalt {
        stage,
        reason: format!("{e:#}"),
    }
}

unsafe fn build(
    display_handle: RawDisplayHandle,
    window_handle: RawWindowHandle,
    app_name: &str,
    drawable: (u32, u32),
) -> Result<VulkanContext, ShellError> {
    let mut guard = Bootstrap::default();

    // 1. instance
    let entry = Entry::linked();
    let instance = create_instance(&entry, display_handle, app_name).map_err(halt("instance"))?;
    guard.instance = Some(instance.clone());

    // 2. debug messenger; refusal downgrades to a warning
    let debug = match create_debug_messenger(&entry, &instance) {
        Ok(pair) => Some(pair),
        Err(e) => {
            warn!("debug messenger unavailable: {e:#}");
            None
        }
    };
    guard.debug = debug.clone();

    // 3. surface
    let surface =
        ash_window::create_surface(&entry, &instance, display_handle, window_handle, None)
            .context("create_surface")
            .map_err(halt("surface"))?;
    let surface_loader = surface::Instance::new(&entry, &instance);
    guard.surface = Some((surface_loader.clone(), surface));

    // 4. + 5. physical device and its queue families
    let (phys, families) = pick_physical_device(&instance, &surface_loader, surface)
        .map_err(halt("physical device"))?;

    // 6. logical device and queues
    let (device, graphics_queue, present_queue) =
        create_device(&instance, phys, families).map_err(halt("logical device"))?;
    guard.device = Some(device.clone());

    // 7. swapchain
    let caps = surface_loader
        .get_physical_device_surface_capabilities(phys, surface)
        .context("surface capabilities")
        .map_err(halt("swapchain"))?;
    let formats = surface_loader
        .get_physical_device_surface_formats(phys, surface)
        .context("surface formats")
        .map_err(halt("swapchain"))?;
    let format = require_surface_format(&formats)?;
    let extent = swapchain_extent(&caps, drawable);
    let image_count = swapchain_image_count(&caps);
    let (sharing_mode, queue_indices) = sharing_plan(families.graphics, families.present);

    let swapchain_loader = swapchain::Device::new(&instance, &device);
    let swap_info = vk::SwapchainCreateInfoKHR {
        s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
        surface,
        min_image_count: image_count,
        image_format: format.format,
        image_color_space: format.color_space,
        image_extent: extent,
        image_array_layers: 1,
        image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        image_sharing_mode: sharing_mode,
        queue_family_index_count: queue_indices.len() as u32,
        p_queue_family_indices: queue_indices.as_ptr(),
        pre_transform: caps.current_transform,
        composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
        present_mode: vk::PresentModeKHR::FIFO,
        clipped: vk::TRUE,
        ..Default::default()
    };
    let swapchain = swapchain_loader
        .create_swapchain(&swap_info, None)
        .context("create_swapchain")
        .map_err(halt("swapchain"))?;
    guard.swapchain = Some((swapchain_loader.clone(), swapchain));
    let images = swapchain_loader
        .get_swapchain_images(swapchain)
        .context("get_swapchain_images")
        .map_err(halt("swapchain"))?;

    // 8. image views
    for &image in &images {
        let view = create_color_view(&device, image, format.format).map_err(halt("image views"))?;
        guard.image_views.push(view);
    }

    // 9. depth resources, picked format first
    let depth_format = pick_depth_format(|f| unsafe {
        instance
            .get_physical_device_format_properties(phys, f)
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    })
    .ok_or(ShellError::BootstrapHalt {
        stage: "depth resources",
        reason: "no supported depth format".into(),
    })?;
    let depth = create_depth_target(&instance, &device, phys, extent, depth_format)
        .map_err(halt("depth resources"))?;
    guard.depth = Some(depth);

    // 10. render pass
    let render_pass =
        create_render_pass(&device, format.format, depth.format).map_err(halt("render pass"))?;
    guard.render_pass = Some(render_pass);

    // 11. framebuffers, each color view plus the shared depth view
    for &view in &guard.image_views {
        let attachments = [view, depth.view];
        let fb_info = vk::FramebufferCreateInfo {
            s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
            render_pass,
            attachment_count: attachments.len() as u32,
            p_attachments: attachments.as_ptr(),
            width: extent.width,
            height: extent.height,
            layers: 1,
            ..Default::default()
        };
        let fb = device
            .create_framebuffer(&fb_info, None)
            .context("create_framebuffer")
            .map_err(halt("framebuffers"))?;
        guard.framebuffers.push(fb);
    }

    // 12. command pool and pre-recorded clear commands
    let pool_info = vk::CommandPoolCreateInfo {
        s_type: vk::StructureType::COMMAND_POOL_CREATE_INFO,
        flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER
            | vk::CommandPoolCreateFlags::TRANSIENT,
        queue_family_index: families.graphics,
        ..Default::default()
    };
    let cmd_pool = device
        .create_command_pool(&pool_info, None)
        .context("create_command_pool")
        .map_err(halt("command buffers"))?;
    guard.cmd_pool = Some(cmd_pool);
    let alloc_info = vk::CommandBufferAllocateInfo {
        s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
        command_pool: cmd_pool,
        level: vk::CommandBufferLevel::PRIMARY,
        command_buffer_count: guard.framebuffers.len() as u32,
        ..Default::default()
    };
    guard.cmd_bufs = device
        .allocate_command_buffers(&alloc_info)
        .context("allocate_command_buffers")
        .map_err(halt("command buffers"))?;
    record_clear_commands(&device, &guard.cmd_bufs, render_pass, &guard.framebuffers, extent)
        .map_err(halt("command buffers"))?;

    // 13. the two frame semaphores
    let sem_info = vk::SemaphoreCreateInfo::default();
    for _ in 0..2 {
        let sem = device
            .create_semaphore(&sem_info, None)
            .context("create_semaphore")
            .map_err(halt("semaphores"))?;
        guard.semaphores.push(sem);
    }

    // 14. per-image fences, created signaled
    let fence_info = vk::FenceCreateInfo {
        s_type: vk::StructureType::FENCE_CREATE_INFO,
        flags: vk::FenceCreateFlags::SIGNALED,
        ..Default::default()
    };
    for _ in 0..guard.image_views.len() {
        let fence = device
            .create_fence(&fence_info, None)
            .context("create_fence")
            .map_err(halt("fences"))?;
        guard.fences.push(fence);
    }

    info!(
        "Vulkan ready ({}x{}, {} images, depth {:?})",
        extent.width,
        extent.height,
        images.len(),
        depth.format
    );

    let image_views = std::mem::take(&mut guard.image_views);
    let framebuffers = std::mem::take(&mut guard.framebuffers);
    let cmd_bufs = std::mem::take(&mut guard.cmd_bufs);
    let image_available = guard.semaphores[0];
    let render_finished = guard.semaphores[1];
    let fences = std::mem::take(&mut guard.fences);
    guard.disarm();

    Ok(VulkanContext {
        _entry: entry,
        instance,
        debug,
        surface_loader,
        surface,
        device,
        graphics_queue,
        present_queue,
        swapchain_loader,
        swapchain,
        image_views,
        depth,
        render_pass,
        framebuffers,
        cmd_pool,
        cmd_bufs,
        image_available,
        render_finished,
        fences,
    })
}

unsafe fn create_instance(
    entry: &Entry,
    display_handle: RawDisplayHandle,
    app_name: &str,
) -> Result<Instance> {
    let app = CString::new(app_name).unwrap_or_default();
    let engine = CString::new("atlas").unwrap();

    let app_info = vk::ApplicationInfo {
        s_type: vk::StructureType::APPLICATION_INFO,
        p_application_name: app.as_ptr(),
        application_version: vk::make_api_version(0, 1, 0, 0),
        p_engine_name: engine.as_ptr(),
        engine_version: vk::make_api_version(0, 1, 0, 0),
        api_version: vk::API_VERSION_1_0,
        ..Default::default()
    };

    let mut extensions = ash_window::enumerate_required_extensions(display_handle)
        .context("enumerate_required_extensions")?
        .to_vec();
    extensions.push(debug_utils::NAME.as_ptr());
    for &ext in &extensions {
        debug!("instance extension: {}", CStr::from_ptr(ext).to_string_lossy());
    }

    let info = vk::InstanceCreateInfo {
        s_type: vk::StructureType::INSTANCE_CREATE_INFO,
        p_application_info: &app_info,
        enabled_extension_count: extensions.len() as u32,
        pp_enabled_extension_names: extensions.as_ptr(),
        ..Default::default()
    };
    Ok(entry.create_instance(&info, None).context("create_instance")?)
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _kind: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut c_void,
) -> vk::Bool32 {
    if data.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*data).p_message).to_string_lossy();
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!("vulkan: {message}");
    } else {
        warn!("vulkan: {message}");
    }
    vk::FALSE
}

unsafe fn create_debug_messenger(
    entry: &Entry,
    instance: &Instance,
) -> Result<(debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    let loader = debug_utils::Instance::new(entry, instance);
    let info = vk::DebugUtilsMessengerCreateInfoEXT {
        s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        pfn_user_callback: Some(debug_callback),
        ..Default::default()
    };
    let messenger = loader
        .create_debug_utils_messenger(&info, None)
        .context("create_debug_utils_messenger")?;
    Ok((loader, messenger))
}

unsafe fn find_queue_families(
    instance: &Instance,
    surface_loader: &surface::Instance,
    surface: vk::SurfaceKHR,
    phys: vk::PhysicalDevice,
) -> Option<QueueFamilies> {
    let props = instance.get_physical_device_queue_family_properties(phys);
    let mut graphics = None;
    let mut present = None;
    for (index, family) in props.iter().enumerate() {
        let index = index as u32;
        if graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            graphics = Some(index);
        }
        if present.is_none()
            && surface_loader
                .get_physical_device_surface_support(phys, index, surface)
                .unwrap_or(false)
        {
            present = Some(index);
        }
        if let (Some(graphics), Some(present)) = (graphics, present) {
            return Some(QueueFamilies { graphics, present });
        }
    }
    None
}

unsafe fn device_suitability(
    instance: &Instance,
    surface_loader: &surface::Instance,
    surface: vk::SurfaceKHR,
    phys: vk::PhysicalDevice,
) -> Result<QueueFamilies, &'static str> {
    let families = find_queue_families(instance, surface_loader, surface, phys)
        .ok_or("missing graphics/present queue family")?;

    let extensions = instance
        .enumerate_device_extension_properties(phys)
        .map_err(|_| "extension query failed")?;
    let has_swapchain = extensions
        .iter()
        .any(|e| CStr::from_ptr(e.extension_name.as_ptr()) == swapchain::NAME);
    if !has_swapchain {
        return Err("no swapchain extension");
    }

    let formats = surface_loader
        .get_physical_device_surface_formats(phys, surface)
        .map_err(|_| "surface format query failed")?;
    if formats.is_empty() {
        return Err("no surface formats");
    }
    let modes = surface_loader
        .get_physical_device_surface_present_modes(phys, surface)
        .map_err(|_| "present mode query failed")?;
    if modes.is_empty() {
        return Err("no present modes");
    }

    let features = instance.get_physical_device_features(phys);
    if features.sampler_anisotropy != vk::TRUE {
        return Err("no sampler anisotropy");
    }

    Ok(families)
}

/// Ranks every suitable device and takes the best; unsuitable devices and
/// their reasons are logged rather than silently skipped.
unsafe fn pick_physical_device(
    instance: &Instance,
    surface_loader: &surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
    let mut best: Option<(u32, vk::PhysicalDevice, QueueFamilies)> = None;
    for phys in instance
        .enumerate_physical_devices()
        .context("enumerate_physical_devices")?
    {
        let props = instance.get_physical_device_properties(phys);
        let name = CStr::from_ptr(props.device_name.as_ptr()).to_string_lossy().into_owned();
        match device_suitability(instance, surface_loader, surface, phys) {
            Ok(families) => {
                let score = device_type_weight(props.device_type);
                debug!("device {name}: {:?}, score {score}", props.device_type);
                if best.as_ref().map_or(true, |&(s, ..)| score > s) {
                    best = Some((score, phys, families));
                }
            }
            Err(why) => debug!("device {name}: skipped ({why})"),
        }
    }
    let (_, phys, families) = best.ok_or_else(|| anyhow!("no suitable physical device"))?;
    Ok((phys, families))
}

unsafe fn create_device(
    instance: &Instance,
    phys: vk::PhysicalDevice,
    families: QueueFamilies,
) -> Result<(Device, vk::Queue, vk::Queue)> {
    let priority = [1.0_f32];
    let mut unique = vec![families.graphics];
    if families.present != families.graphics {
        unique.push(families.present);
    }
    let queue_infos: Vec<vk::DeviceQueueCreateInfo> = unique
        .iter()
        .map(|&family| vk::DeviceQueueCreateInfo {
            s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
            queue_family_index: family,
            queue_count: 1,
            p_queue_priorities: priority.as_ptr(),
            ..Default::default()
        })
        .collect();

    let features = vk::PhysicalDeviceFeatures {
        sampler_anisotropy: vk::TRUE,
        ..Default::default()
    };
    let extensions = [swapchain::NAME.as_ptr()];
    let info = vk::DeviceCreateInfo {
        s_type: vk::StructureType::DEVICE_CREATE_INFO,
        queue_create_info_count: queue_infos.len() as u32,
        p_queue_create_infos: queue_infos.as_ptr(),
        enabled_extension_count: extensions.len() as u32,
        pp_enabled_extension_names: extensions.as_ptr(),
        p_enabled_features: &features,
        ..Default::default()
    };
    let device = instance
        .create_device(phys, &info, None)
        .context("create_device")?;
    let graphics = device.get_device_queue(families.graphics, 0);
    let present = device.get_device_queue(families.present, 0);
    Ok((device, graphics, present))
}

unsafe fn create_color_view(
    device: &Device,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView> {
    let info = vk::ImageViewCreateInfo {
        s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
        image,
        view_type: vk::ImageViewType::TYPE_2D,
        format,
        subresource_range: vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        },
        ..Default::default()
    };
    Ok(device.create_image_view(&info, None).context("create_image_view")?)
}

/// Depth image, device-local memory and view. Partial creations clean up
/// after themselves before reporting, so the caller only ever records a
/// complete target.
unsafe fn create_depth_target(
    instance: &Instance,
    device: &Device,
    phys: vk::PhysicalDevice,
    extent: vk::Extent2D,
    format: vk::Format,
) -> Result<DepthTarget> {
    let image_info = vk::ImageCreateInfo {
        s_type: vk::StructureType::IMAGE_CREATE_INFO,
        image_type: vk::ImageType::TYPE_2D,
        format,
        extent: vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        },
        mip_levels: 1,
        array_layers: 1,
        samples: vk::SampleCountFlags::TYPE_1,
        tiling: vk::ImageTiling::OPTIMAL,
        usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        sharing_mode: vk::SharingMode::EXCLUSIVE,
        ..Default::default()
    };
    let image = device.create_image(&image_info, None).context("create_image")?;

    let requirements = device.get_image_memory_requirements(image);
    let mem_props = instance.get_physical_device_memory_properties(phys);
    let Some(memory_type) = find_memory_type(
        &mem_props,
        requirements.memory_type_bits,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    ) else {
        device.destroy_image(image, None);
        return Err(anyhow!("no device-local memory type for depth image"));
    };

    let alloc_info = vk::MemoryAllocateInfo {
        s_type: vk::StructureType::MEMORY_ALLOCATE_INFO,
        allocation_size: requirements.size,
        memory_type_index: memory_type,
        ..Default::default()
    };
    let memory = match device.allocate_memory(&alloc_info, None) {
        Ok(memory) => memory,
        Err(e) => {
            device.destroy_image(image, None);
            return Err(anyhow!("allocate_memory: {e}"));
        }
    };
    if let Err(e) = device.bind_image_memory(image, memory, 0) {
        device.free_memory(memory, None);
        device.destroy_image(image, None);
        return Err(anyhow!("bind_image_memory: {e}"));
    }

    let view_info = vk::ImageViewCreateInfo {
        s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
        image,
        view_type: vk::ImageViewType::TYPE_2D,
        format,
        subresource_range: vk::ImageSubresourceRange {
            aspect_mask: depth_aspect(format),
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        },
        ..Default::default()
    };
    let view = match device.create_image_view(&view_info, None) {
        Ok(view) => view,
        Err(e) => {
            device.free_memory(memory, None);
            device.destroy_image(image, None);
            return Err(anyhow!("create_image_view: {e}"));
        }
    };

    Ok(DepthTarget {
        format,
        image,
        memory,
        view,
    })
}

unsafe fn create_render_pass(
    device: &Device,
    color_format: vk::Format,
    depth_format: vk::Format,
) -> Result<vk::RenderPass> {
    let attachments = [
        vk::AttachmentDescription {
            format: color_format,
            samples: vk::SampleCountFlags::TYPE_1,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
            ..Default::default()
        },
        vk::AttachmentDescription {
            format: depth_format,
            samples: vk::SampleCountFlags::TYPE_1,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::CLEAR,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            ..Default::default()
        },
    ];
    let color_ref = vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };
    let depth_ref = vk::AttachmentReference {
        attachment: 1,
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };
    let subpass = vk::SubpassDescription {
        pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
        color_attachment_count: 1,
        p_color_attachments: &color_ref,
        p_depth_stencil_attachment: &depth_ref,
        ..Default::default()
    };
    let dependency = vk::SubpassDependency {
        src_subpass: vk::SUBPASS_EXTERNAL,
        dst_subpass: 0,
        src_stage_mask: vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        src_access_mask: vk::AccessFlags::MEMORY_READ,
        dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_READ
            | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        dependency_flags: vk::DependencyFlags::BY_REGION,
    };
    let info = vk::RenderPassCreateInfo {
        s_type: vk::StructureType::RENDER_PASS_CREATE_INFO,
        attachment_count: attachments.len() as u32,
        p_attachments: attachments.as_ptr(),
        subpass_count: 1,
        p_subpasses: &subpass,
        dependency_count: 1,
        p_dependencies: &dependency,
        ..Default::default()
    };
    Ok(device.create_render_pass(&info, None).context("create_render_pass")?)
}

unsafe fn record_clear_commands(
    device: &Device,
    cmd_bufs: &[vk::CommandBuffer],
    render_pass: vk::RenderPass,
    framebuffers: &[vk::Framebuffer],
    extent: vk::Extent2D,
) -> Result<()> {
    let clears = [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: BACKGROUND_COLOR,
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        },
    ];
    for (&cmd, &fb) in cmd_bufs.iter().zip(framebuffers.iter()) {
        let begin = vk::CommandBufferBeginInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
            ..Default::default()
        };
        device.begin_command_buffer(cmd, &begin).context("begin_command_buffer")?;

        let rp_begin = vk::RenderPassBeginInfo {
            s_type: vk::StructureType::RENDER_PASS_BEGIN_INFO,
            render_pass,
            framebuffer: fb,
            render_area: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            },
            clear_value_count: clears.len() as u32,
            p_clear_values: clears.as_ptr(),
            ..Default::default()
        };
        device.cmd_begin_render_pass(cmd, &rp_begin, vk::SubpassContents::INLINE);
        device.cmd_end_render_pass(cmd);

        device.end_command_buffer(cmd).context("end_command_buffer")?;
    }
    Ok(())
}
