//! Render-graph lowering system
//!
//! This module turns the declarative program sequence of a shader pack into an
//! ordered list of fully resolved pass descriptors. It tracks which physical
//! side of each double-buffered render target is active, which sides hold
//! valid mip levels, and resolves every sampler and attachment binding.

mod flip;
mod lowering;
mod mipmap;
mod pack_specs;
mod pass;
mod sampler;
mod targets;
mod texture_inputs;

pub use flip::*;
pub use lowering::{lower_composite_passes, resolve_color_attachments};
pub use mipmap::ColorTargetMipmapping;
pub use pack_specs::*;
pub use pass::*;
pub use sampler::*;
pub use targets::*;
pub use texture_inputs::*;
