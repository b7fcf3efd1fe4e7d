//! Sampler and image binding descriptors

use serde::{Deserialize, Serialize};

use super::TextureHandle;

/// Texture coordinate wrapping behavior of a sampler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeBehavior {
    #[default]
    Clamp,
    Repeat,
}

/// Minification filter of a sampler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerFiltering {
    Nearest,
    #[default]
    Linear,
    NearestMipmapNearest,
    LinearMipmapLinear,
}

impl SamplerFiltering {
    /// Picks nearest or linear filtering, with or without mip levels
    pub fn select(nearest: bool, mipmap: bool) -> Self {
        match (nearest, mipmap) {
            (true, false) => SamplerFiltering::Nearest,
            (false, false) => SamplerFiltering::Linear,
            (true, true) => SamplerFiltering::NearestMipmapNearest,
            (false, true) => SamplerFiltering::LinearMipmapLinear,
        }
    }
}

/// A sampler name bound to one handle per parity
///
/// Index 0 of each array applies when the executor runs the pass at even
/// parity, index 1 when the parity-swap set is in effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplerBinding {
    pub textures: [TextureHandle; 2],
    pub edge_behavior: EdgeBehavior,
    pub filtering: [SamplerFiltering; 2],
    /// Depth comparison in the sampler (shadow hardware filtering)
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hardware_compare: bool,
}

impl SamplerBinding {
    /// Binds the same handle and filter regardless of parity
    pub fn fixed(texture: TextureHandle, edge_behavior: EdgeBehavior, filtering: SamplerFiltering) -> Self {
        Self {
            textures: [texture.clone(), texture],
            edge_behavior,
            filtering: [filtering, filtering],
            hardware_compare: false,
        }
    }
}

/// A storage image name bound to one handle per parity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageBinding {
    pub name: String,
    pub textures: [TextureHandle; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtering_selection() {
        assert_eq!(SamplerFiltering::select(true, false), SamplerFiltering::Nearest);
        assert_eq!(SamplerFiltering::select(false, true), SamplerFiltering::LinearMipmapLinear);
        assert_eq!(SamplerFiltering::select(true, true), SamplerFiltering::NearestMipmapNearest);
        assert_eq!(SamplerFiltering::select(false, false), SamplerFiltering::Linear);
    }

    #[test]
    fn test_sampler_binding_serialization() {
        let binding = SamplerBinding::fixed(TextureHandle::new("noise_tex"), EdgeBehavior::Repeat, SamplerFiltering::Linear);
        let json = serde_json::to_value(&binding).unwrap();

        assert_eq!(json["textures"], serde_json::json!(["noise_tex", "noise_tex"]));
        assert_eq!(json["edge_behavior"], "repeat");
        assert_eq!(json["filtering"][1], "linear");
        assert!(json.get("hardware_compare").is_none());
    }
}
