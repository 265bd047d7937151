pub mod plan;

mod context;

pub use context::VulkanContext;
