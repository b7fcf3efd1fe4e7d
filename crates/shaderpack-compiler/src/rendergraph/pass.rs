//! Pass descriptors emitted by lowering
//!
//! The executor consumes these in order. Auxiliary passes (mip generation and
//! filter changes) always precede the screen pass that needs them.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::{FlipState, ImageBinding, SamplerBinding, TextureHandle, TextureInputs, TextureSize};

/// One unit of work in the lowered render graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PassInfo {
    /// A full-screen program invocation
    Screen(ScreenRenderPassInfo),
    /// Regenerate mip levels of the listed textures
    GenerateMipmap(GenerateMipmapPassInfo),
    /// Change the minification filter of the listed textures
    SetTextureMinFiltering(SetTextureMinFilteringPassInfo),
}

impl PassInfo {
    /// Returns the screen pass, or `None` for auxiliary passes
    pub fn as_screen(&self) -> Option<&ScreenRenderPassInfo> {
        match self {
            PassInfo::Screen(pass) => Some(pass),
            _ => None,
        }
    }
}

/// Textures written by a screen pass under one parity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorAttachments {
    /// Attachment handles in draw buffer order
    pub textures: Vec<TextureHandle>,
    /// Shared size of every attachment; `None` when nothing is drawn
    pub size: Option<TextureSize>,
}

/// A fully resolved screen pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenRenderPassInfo {
    /// Name of the program this pass runs
    pub program: String,
    /// Viewport scale (x, y) relative to the attachment size
    pub viewport_scale: [f32; 2],
    /// Attachments per parity; index 1 applies when the parity swap is in effect
    pub attachments_by_parity: [ColorAttachments; 2],
    pub samplers: BTreeMap<String, SamplerBinding>,
    pub images: Vec<ImageBinding>,
    pub default_sampler_name: String,
    /// Custom uniforms the program reads
    pub uniforms: BTreeSet<String>,
    /// Flip state the pass was built against; the executor allocates alt
    /// sides only for targets flipped at least once
    pub flip_state: FlipState,
}

impl ScreenRenderPassInfo {
    pub fn builder(program: impl Into<String>) -> ScreenRenderPassInfoBuilder {
        ScreenRenderPassInfoBuilder::new(program)
    }
}

/// Builder for [`ScreenRenderPassInfo`]
#[derive(Debug, Clone)]
pub struct ScreenRenderPassInfoBuilder {
    program: String,
    viewport_scale: [f32; 2],
    attachments_by_parity: [ColorAttachments; 2],
    inputs: Option<TextureInputs>,
    uniforms: BTreeSet<String>,
    flip_state: FlipState,
}

impl ScreenRenderPassInfoBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        let empty = ColorAttachments { textures: Vec::new(), size: None };
        Self {
            program: program.into(),
            viewport_scale: [1.0, 1.0],
            attachments_by_parity: [empty.clone(), empty],
            inputs: None,
            uniforms: BTreeSet::new(),
            flip_state: FlipState::unflipped(),
        }
    }

    /// Sets a uniform viewport scale for both axes
    pub fn viewport_scale(mut self, scale: f32) -> Self {
        self.viewport_scale = [scale, scale];
        self
    }

    pub fn attachments_by_parity(mut self, attachments: [ColorAttachments; 2]) -> Self {
        self.attachments_by_parity = attachments;
        self
    }

    pub fn inputs(mut self, inputs: TextureInputs) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub fn uniforms(mut self, uniforms: BTreeSet<String>) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn flip_state(mut self, flip_state: FlipState) -> Self {
        self.flip_state = flip_state;
        self
    }

    pub fn build(self) -> ScreenRenderPassInfo {
        let TextureInputs {
            samplers,
            images,
            default_sampler_name,
        } = self.inputs.unwrap_or_else(|| TextureInputs {
            samplers: BTreeMap::new(),
            images: Vec::new(),
            default_sampler_name: crate::predefined::DEFAULT_SAMPLER_NAME.to_string(),
        });

        ScreenRenderPassInfo {
            program: self.program,
            viewport_scale: self.viewport_scale,
            attachments_by_parity: self.attachments_by_parity,
            samplers,
            images,
            default_sampler_name,
            uniforms: self.uniforms,
            flip_state: self.flip_state,
        }
    }
}

/// Regenerates mip levels of the given textures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateMipmapPassInfo {
    /// Handles per parity
    pub textures: [TextureHandle; 2],
}

/// Minification filters selectable by a filtering pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFilteringMode {
    Linear,
    LinearMipmapLinear,
}

/// Switches the minification filter of the given textures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetTextureMinFilteringPassInfo {
    /// Handles per parity
    pub textures: [TextureHandle; 2],
    pub filtering: TextureFilteringMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let pass = ScreenRenderPassInfo::builder("composite").build();

        assert_eq!(pass.program, "composite");
        assert_eq!(pass.viewport_scale, [1.0, 1.0]);
        assert_eq!(pass.default_sampler_name, "colortex0");
        assert!(pass.attachments_by_parity[0].textures.is_empty());
        assert!(pass.attachments_by_parity[1].size.is_none());
        assert_eq!(pass.flip_state, FlipState::unflipped());
    }

    #[test]
    fn test_pass_info_serialization_is_tagged() {
        let pass = PassInfo::SetTextureMinFiltering(SetTextureMinFilteringPassInfo {
            textures: [TextureHandle::new("main_color_0"), TextureHandle::new("main_color_0_alt")],
            filtering: TextureFilteringMode::LinearMipmapLinear,
        });
        let json = serde_json::to_value(&pass).unwrap();

        assert_eq!(json["type"], "set_texture_min_filtering");
        assert_eq!(json["filtering"], "linear_mipmap_linear");
        assert_eq!(json["textures"][1], "main_color_0_alt");
        assert!(pass.as_screen().is_none());

        let screen = PassInfo::Screen(ScreenRenderPassInfo::builder("final").viewport_scale(0.5).build());
        let json = serde_json::to_value(&screen).unwrap();
        assert_eq!(json["type"], "screen");
        assert_eq!(json["viewport_scale"], serde_json::json!([0.5, 0.5]));
    }
}
