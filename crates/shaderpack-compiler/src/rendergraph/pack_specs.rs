//! Shader pack manifest parser
//!
//! This module describes the declarative input of the lowering pass: pack-wide
//! render target and shadow directives, and the ordered list of programs with
//! their per-program directives. Manifests are loaded from YAML; sizes and
//! scale factors are written as strings like "1/2" or "2048x2048".

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::{EdgeBehavior, SamplerFiltering, TextureSize};
use crate::predefined::COMPOSITE_PRE_FLIPS;

/// Represents a rational scale factor as a fraction
///
/// Relative render target sizes are expressed against the screen size,
/// supporting both simple integers (e.g., "2") and fractions (e.g., "1/2").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScaleFactor {
    /// The numerator of the fraction
    pub numerator: u32,
    /// The denominator of the fraction
    pub denominator: u32,
}

impl ScaleFactor {
    /// The identity scale, 1/1
    pub const ONE: ScaleFactor = ScaleFactor { numerator: 1, denominator: 1 };

    /// Creates a new scale factor from numerator and denominator
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self { numerator, denominator }
    }
}

impl FromStr for ScaleFactor {
    type Err = ScaleFactorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('/') {
            Some((numerator, denominator)) => {
                if denominator.contains('/') {
                    return Err(ScaleFactorParseError::InvalidFormat);
                }

                let numerator = numerator.trim().parse::<u32>().map_err(|_| ScaleFactorParseError::InvalidNumerator)?;
                let denominator = denominator.trim().parse::<u32>().map_err(|_| ScaleFactorParseError::InvalidDenominator)?;

                if denominator == 0 {
                    return Err(ScaleFactorParseError::ZeroDenominator);
                }

                Ok(ScaleFactor::new(numerator, denominator))
            }
            None => {
                let numerator = s.parse::<u32>().map_err(|_| ScaleFactorParseError::InvalidNumerator)?;
                Ok(ScaleFactor::new(numerator, 1))
            }
        }
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl<'de> Deserialize<'de> for ScaleFactor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error types for scale factor parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScaleFactorParseError {
    /// The format is not recognized (should be "n" or "n/d")
    #[error("Invalid scale factor format")]
    InvalidFormat,
    /// The numerator is not a valid integer
    #[error("Invalid numerator")]
    InvalidNumerator,
    /// The denominator is not a valid integer
    #[error("Invalid denominator")]
    InvalidDenominator,
    /// The denominator is zero (division by zero)
    #[error("Denominator cannot be zero")]
    ZeroDenominator,
}

fn default_true() -> bool {
    true
}

/// Per-target settings for one main color target
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderTargetSettings {
    /// Whether the target is cleared at the start of every frame
    #[serde(default = "default_true")]
    pub clear: bool,
    /// Declared size; screen-sized when absent
    #[serde(default)]
    pub size: Option<TextureSize>,
}

impl Default for RenderTargetSettings {
    fn default() -> Self {
        Self { clear: true, size: None }
    }
}

/// Render target directives for the main color targets
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PackRenderTargetDirectives {
    /// Settings keyed by color target index; unlisted targets use the defaults
    pub targets: BTreeMap<u32, RenderTargetSettings>,
}

impl PackRenderTargetDirectives {
    /// Returns the settings of one color target, falling back to the defaults
    pub fn settings(&self, index: u32) -> RenderTargetSettings {
        self.targets.get(&index).cloned().unwrap_or_default()
    }

    /// Returns every color target index below `count` that is cleared each frame
    pub fn buffers_to_be_cleared(&self, count: u32) -> BTreeSet<u32> {
        (0..count).filter(|index| self.settings(*index).clear).collect()
    }
}

/// Sampling settings for one shadow color target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SamplingSettings {
    #[serde(default)]
    pub mipmap: bool,
    #[serde(default)]
    pub nearest: bool,
}

/// Sampling settings for one shadow depth target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DepthSamplingSettings {
    #[serde(default)]
    pub mipmap: bool,
    #[serde(default)]
    pub nearest: bool,
    /// Depth comparison performed by the sampler hardware
    #[serde(default)]
    pub hardware_filtering: bool,
}

fn default_shadow_resolution() -> u32 {
    1024
}

/// Shadow pass directives
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PackShadowDirectives {
    /// Width and height of every shadow target
    #[serde(default = "default_shadow_resolution")]
    pub resolution: u32,
    /// Whether `watershadow` is in use, which moves `shadow` to the second depth target
    #[serde(default)]
    pub water_shadow: bool,
    #[serde(default)]
    pub color_sampling: Vec<SamplingSettings>,
    #[serde(default)]
    pub depth_sampling: Vec<DepthSamplingSettings>,
}

impl Default for PackShadowDirectives {
    fn default() -> Self {
        Self {
            resolution: default_shadow_resolution(),
            water_shadow: false,
            color_sampling: Vec::new(),
            depth_sampling: Vec::new(),
        }
    }
}

impl PackShadowDirectives {
    /// Sampling settings of a shadow color target, defaulting when not declared
    pub fn color_sampling_settings(&self, index: u32) -> SamplingSettings {
        self.color_sampling.get(index as usize).copied().unwrap_or_default()
    }

    /// Sampling settings of a shadow depth target, defaulting when not declared
    pub fn depth_sampling_settings(&self, index: u32) -> DepthSamplingSettings {
        self.depth_sampling.get(index as usize).copied().unwrap_or_default()
    }
}

/// A texture supplied by the pack under a sampler name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomTextureSpec {
    /// Handle of the texture resource
    pub texture: String,
    #[serde(default)]
    pub edge_behavior: EdgeBehavior,
    #[serde(default)]
    pub filtering: SamplerFiltering,
}

/// Pack-wide directives
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PackDirectives {
    #[serde(default)]
    pub render_targets: PackRenderTargetDirectives,
    #[serde(default)]
    pub shadow: PackShadowDirectives,
    /// Explicit flips applied before a program group, keyed by stage (e.g. `composite_pre`)
    #[serde(default)]
    pub explicit_flips: BTreeMap<String, BTreeMap<u32, bool>>,
    /// Custom textures keyed by the sampler name they are bound to
    #[serde(default)]
    pub custom_textures: BTreeMap<String, CustomTextureSpec>,
}

impl PackDirectives {
    /// Returns the explicit flips declared for a stage, in index order
    pub fn explicit_flips(&self, stage: &str) -> impl Iterator<Item = (u32, bool)> + '_ {
        self.explicit_flips.get(stage).into_iter().flat_map(|flips| flips.iter().map(|(index, flip)| (*index, *flip)))
    }

    /// Returns the explicit flips applied before the composite sequence
    pub fn composite_pre_flips(&self) -> impl Iterator<Item = (u32, bool)> + '_ {
        self.explicit_flips(COMPOSITE_PRE_FLIPS)
    }
}

fn default_draw_buffers() -> Vec<u32> {
    vec![0]
}

fn default_viewport_scale() -> f32 {
    1.0
}

/// Directives of a single program
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgramDirectives {
    /// Color targets written by the program, in fragment output order
    #[serde(default = "default_draw_buffers")]
    pub draw_buffers: Vec<u32>,
    /// Per-target overrides of whether the program flips the target
    #[serde(default)]
    pub explicit_flips: BTreeMap<u32, bool>,
    /// Color targets sampled with mipmaps by this program
    #[serde(default)]
    pub mipmapped_buffers: BTreeSet<u32>,
    #[serde(default = "default_viewport_scale")]
    pub viewport_scale: f32,
    /// Sampler names that must be bound for the program to run
    #[serde(default)]
    pub required_samplers: BTreeSet<String>,
    /// Image names that must be bound for the program to run
    #[serde(default)]
    pub required_images: BTreeSet<String>,
    /// Custom uniforms the program reads
    #[serde(default)]
    pub uniforms: BTreeSet<String>,
}

impl Default for ProgramDirectives {
    fn default() -> Self {
        Self {
            draw_buffers: default_draw_buffers(),
            explicit_flips: BTreeMap::new(),
            mipmapped_buffers: BTreeSet::new(),
            viewport_scale: default_viewport_scale(),
            required_samplers: BTreeSet::new(),
            required_images: BTreeSet::new(),
            uniforms: BTreeSet::new(),
        }
    }
}

impl ProgramDirectives {
    /// Returns the set of color targets this program flips
    ///
    /// Every draw buffer is flipped, then explicit flip directives add or
    /// remove targets.
    pub fn write_set(&self) -> BTreeSet<u32> {
        let mut flipped: BTreeSet<u32> = self.draw_buffers.iter().copied().collect();
        for (buffer, flip) in &self.explicit_flips {
            if *flip {
                flipped.insert(*buffer);
            } else {
                flipped.remove(buffer);
            }
        }
        flipped
    }
}

/// A program of the pack: its name, directives and stage sources
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgramSource {
    /// Program name, used in diagnostics
    pub name: String,
    #[serde(default)]
    pub directives: ProgramDirectives,
    /// Vertex stage source, or its file name in a manifest
    #[serde(default)]
    pub vertex: Option<String>,
    /// Geometry stage source, or its file name in a manifest
    #[serde(default)]
    pub geometry: Option<String>,
    /// Fragment stage source, or its file name in a manifest
    #[serde(default)]
    pub fragment: Option<String>,
    /// Invalid programs are skipped by lowering
    #[serde(default = "default_true")]
    pub valid: bool,
}

impl ProgramSource {
    /// Creates a valid program with the given directives and no sources
    pub fn new(name: impl Into<String>, directives: ProgramDirectives) -> Self {
        Self {
            name: name.into(),
            directives,
            vertex: None,
            geometry: None,
            fragment: None,
            valid: true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Programs of the pack, grouped by the sequence they run in
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProgramSet {
    /// Composite programs in declared order; `None` marks a missing program slot
    #[serde(default)]
    pub composite: Vec<Option<ProgramSource>>,
}

/// A complete shader pack manifest as parsed from YAML
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PackManifest {
    /// Human-readable pack name
    pub name: String,
    #[serde(default)]
    pub directives: PackDirectives,
    #[serde(default)]
    pub programs: ProgramSet,
}

impl PackManifest {
    /// Parses a pack manifest from YAML content
    ///
    /// # Arguments
    /// * `yaml_content` - YAML string containing the manifest
    pub fn from_yaml(yaml_content: &str) -> Result<Self, serde_norway::Error> {
        serde_norway::from_str(yaml_content)
    }

    /// Parses a pack manifest from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML manifest file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, crate::PackError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?)
    }
}
