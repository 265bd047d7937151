//! Pure planning rules for the bootstrap stages. Everything here is a
//! function of queried data, so the plans can be tested without a device.

use ash::vk;
use atlas_core::ShellError;

/// The swapchain format contract: the surface must offer B8G8R8A8_UNORM
/// (any color space). Nothing downstream accepts a substitute, so absence
/// halts bootstrap outright.
pub fn require_surface_format(
    formats: &[vk::SurfaceFormatKHR],
) -> Result<vk::SurfaceFormatKHR, ShellError> {
    formats
        .iter()
        .copied()
        .find(|f| f.format == vk::Format::B8G8R8A8_UNORM)
        .ok_or(ShellError::BootstrapHalt {
            stage: "swapchain",
            reason: "surface does not offer B8G8R8A8_UNORM".into(),
        })
}

/// Drawable size clamped to the surface's extent limits. When the surface
/// pins a fixed extent the limits collapse onto it, so the clamp lands
/// there without a special case.
pub fn swapchain_extent(
    caps: &vk::SurfaceCapabilitiesKHR,
    (width, height): (u32, u32),
) -> vk::Extent2D {
    vk::Extent2D {
        width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// One image above the minimum, capped by the maximum when the surface
/// has one (0 means unbounded).
pub fn swapchain_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let want = caps.min_image_count + 1;
    if caps.max_image_count == 0 {
        want
    } else {
        want.min(caps.max_image_count)
    }
}

/// Exclusive ownership when graphics and present are the same family,
/// concurrent across both otherwise.
pub fn sharing_plan(graphics: u32, present: u32) -> (vk::SharingMode, Vec<u32>) {
    if graphics == present {
        (vk::SharingMode::EXCLUSIVE, Vec::new())
    } else {
        (vk::SharingMode::CONCURRENT, vec![graphics, present])
    }
}

/// Depth formats in preference order, strongest first.
pub const DEPTH_FORMAT_PREFERENCE: [vk::Format; 5] = [
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D32_SFLOAT,
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D16_UNORM_S8_UINT,
    vk::Format::D16_UNORM,
];

/// First preferred depth format the device supports for optimal-tiling
/// depth-stencil attachments. `supported` answers the device query.
pub fn pick_depth_format(mut supported: impl FnMut(vk::Format) -> bool) -> Option<vk::Format> {
    DEPTH_FORMAT_PREFERENCE.into_iter().find(|&f| supported(f))
}

/// Image aspect covered by a depth format's views.
pub fn depth_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D32_SFLOAT | vk::Format::D16_UNORM => vk::ImageAspectFlags::DEPTH,
        _ => vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
    }
}

/// First memory type index passing both the resource's type filter and
/// the required property flags.
pub fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..props.memory_type_count).find(|&i| {
        (type_bits & (1 << i)) != 0
            && props.memory_types[i as usize]
                .property_flags
                .contains(required)
    })
}

/// Ranking weight for device selection; suitability is checked separately
/// and anything unsuitable never reaches the ranking.
pub fn device_type_weight(kind: vk::PhysicalDeviceType) -> u32 {
    match kind {
        vk::PhysicalDeviceType::DISCRETE_GPU => 400,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 300,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 200,
        vk::PhysicalDeviceType::CPU => 100,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(min_count: u32, max_count: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min_count,
            max_image_count: max_count,
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            ..Default::default()
        }
    }

    fn format(f: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format: f,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    #[test]
    fn bgra8_is_required() {
        let offered = [
            format(vk::Format::R8G8B8A8_SRGB),
            format(vk::Format::B8G8R8A8_UNORM),
        ];
        let picked = require_surface_format(&offered).unwrap();
        assert_eq!(picked.format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn missing_bgra8_halts() {
        let offered = [
            format(vk::Format::R8G8B8A8_SRGB),
            format(vk::Format::R8G8B8A8_UNORM),
        ];
        match require_surface_format(&offered) {
            Err(ShellError::BootstrapHalt { stage, .. }) => assert_eq!(stage, "swapchain"),
            other => panic!("expected halt, got {other:?}"),
        }
    }

    #[test]
    fn image_count_is_min_plus_one_capped() {
        assert_eq!(swapchain_image_count(&caps(2, 0)), 3);
        assert_eq!(swapchain_image_count(&caps(2, 8)), 3);
        assert_eq!(swapchain_image_count(&caps(2, 2)), 2);
    }

    #[test]
    fn extent_clamps_to_surface_limits() {
        let c = caps(2, 0);
        assert_eq!(
            swapchain_extent(&c, (512, 512)),
            vk::Extent2D {
                width: 512,
                height: 512
            }
        );
        assert_eq!(
            swapchain_extent(&c, (0, 10_000)),
            vk::Extent2D {
                width: 1,
                height: 4096
            }
        );
    }

    #[test]
    fn fixed_extent_surfaces_pin_the_clamp() {
        let mut c = caps(2, 0);
        c.min_image_extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        c.max_image_extent = c.min_image_extent;
        assert_eq!(
            swapchain_extent(&c, (512, 512)),
            vk::Extent2D {
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn sharing_is_exclusive_when_families_alias() {
        assert_eq!(sharing_plan(0, 0), (vk::SharingMode::EXCLUSIVE, vec![]));
        assert_eq!(
            sharing_plan(0, 2),
            (vk::SharingMode::CONCURRENT, vec![0, 2])
        );
    }

    #[test]
    fn depth_preference_order_holds() {
        let picked =
            pick_depth_format(|f| f == vk::Format::D24_UNORM_S8_UINT || f == vk::Format::D16_UNORM);
        assert_eq!(picked, Some(vk::Format::D24_UNORM_S8_UINT));

        let strongest = pick_depth_format(|_| true);
        assert_eq!(strongest, Some(vk::Format::D32_SFLOAT_S8_UINT));

        assert_eq!(pick_depth_format(|_| false), None);
    }

    #[test]
    fn depth_aspect_tracks_stencil() {
        assert_eq!(depth_aspect(vk::Format::D32_SFLOAT), vk::ImageAspectFlags::DEPTH);
        assert_eq!(
            depth_aspect(vk::Format::D24_UNORM_S8_UINT),
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );
    }

    #[test]
    fn memory_type_scan_respects_filter_and_flags() {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: 3,
            ..Default::default()
        };
        props.memory_types[0].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        props.memory_types[1].property_flags = vk::MemoryPropertyFlags::HOST_VISIBLE;
        props.memory_types[2].property_flags =
            vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE;

        // Type 0 is masked out by the filter, so the scan lands on 2.
        let found = find_memory_type(&props, 0b110, vk::MemoryPropertyFlags::DEVICE_LOCAL);
        assert_eq!(found, Some(2));

        let none = find_memory_type(&props, 0b010, vk::MemoryPropertyFlags::DEVICE_LOCAL);
        assert_eq!(none, None);
    }

    #[test]
    fn discrete_outranks_integrated() {
        assert!(
            device_type_weight(vk::PhysicalDeviceType::DISCRETE_GPU)
                > device_type_weight(vk::PhysicalDeviceType::INTEGRATED_GPU)
        );
        assert!(
            device_type_weight(vk::PhysicalDeviceType::INTEGRATED_GPU)
                > device_type_weight(vk::PhysicalDeviceType::OTHER)
        );
    }
}
