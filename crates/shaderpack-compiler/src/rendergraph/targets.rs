//! Logical render target registries
//!
//! Every logical target slot is backed by two physical textures, "main" and
//! "alt", which passes alternate between (ping-pong buffering). This module
//! names those physical textures and records the fixed size of each slot; it
//! never owns GPU state.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use super::{PackDirectives, ScaleFactor, ScaleFactorParseError};
use crate::predefined::{
    MAIN_COLOR_PREFIX, MAIN_COLOR_TARGETS, MAIN_DEPTH_PREFIX, MAIN_DEPTH_TARGETS, SHADOW_COLOR_PREFIX, SHADOW_COLOR_TARGETS, SHADOW_DEPTH_PREFIX, SHADOW_DEPTH_TARGETS,
};

static ABSOLUTE_SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*x\s*(\d+)\s*$").expect("valid absolute size pattern"));

/// Opaque name of one physical texture resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TextureHandle(String);

impl TextureHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared size of a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSize {
    /// Scaled from the screen size, per axis
    Relative(ScaleFactor, ScaleFactor),
    /// Fixed size in texels
    Absolute { width: u32, height: u32 },
}

impl TextureSize {
    /// Screen-sized target
    pub const SCREEN: TextureSize = TextureSize::Relative(ScaleFactor::ONE, ScaleFactor::ONE);

    /// Square target of a fixed resolution, as used for shadow maps
    pub const fn square(resolution: u32) -> Self {
        TextureSize::Absolute {
            width: resolution,
            height: resolution,
        }
    }
}

impl Default for TextureSize {
    fn default() -> Self {
        Self::SCREEN
    }
}

/// Error types for texture size parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextureSizeParseError {
    #[error("invalid relative size: {0}")]
    Scale(#[from] ScaleFactorParseError),
    #[error("invalid absolute size '{0}'")]
    Absolute(String),
}

impl FromStr for TextureSize {
    type Err = TextureSizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('x') {
            let captures = ABSOLUTE_SIZE_PATTERN.captures(s).ok_or_else(|| TextureSizeParseError::Absolute(s.to_string()))?;
            let width = captures[1].parse::<u32>().map_err(|_| TextureSizeParseError::Absolute(s.to_string()))?;
            let height = captures[2].parse::<u32>().map_err(|_| TextureSizeParseError::Absolute(s.to_string()))?;
            return Ok(TextureSize::Absolute { width, height });
        }

        match s.split_once(',') {
            Some((x, y)) => Ok(TextureSize::Relative(x.parse()?, y.parse()?)),
            None => {
                let scale: ScaleFactor = s.parse()?;
                Ok(TextureSize::Relative(scale, scale))
            }
        }
    }
}

impl fmt::Display for TextureSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureSize::Relative(x, y) if x == y => write!(f, "{x}"),
            TextureSize::Relative(x, y) => write!(f, "{x},{y}"),
            TextureSize::Absolute { width, height } => write!(f, "{width}x{height}"),
        }
    }
}

impl<'de> Deserialize<'de> for TextureSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for TextureSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// One logical target slot: two physical sides sharing one size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSlot {
    pub main: TextureHandle,
    pub alt: TextureHandle,
    pub size: TextureSize,
}

impl TargetSlot {
    /// Returns the physical side selected by `alt`
    pub fn handle(&self, alt: bool) -> &TextureHandle {
        if alt { &self.alt } else { &self.main }
    }
}

/// Ordered set of logical target slots sharing a handle prefix
///
/// Registries are immutable once built; slot sizes never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRegistry {
    prefix: &'static str,
    slots: Vec<TargetSlot>,
}

impl TargetRegistry {
    /// Creates a registry of `sizes.len()` slots named `{prefix}{index}` and `{prefix}{index}_alt`
    pub fn new(prefix: &'static str, sizes: impl IntoIterator<Item = TextureSize>) -> Self {
        let slots = sizes
            .into_iter()
            .enumerate()
            .map(|(index, size)| TargetSlot {
                main: TextureHandle::new(format!("{prefix}{index}")),
                alt: TextureHandle::new(format!("{prefix}{index}_alt")),
                size,
            })
            .collect();

        Self { prefix, slots }
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    pub fn len(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: u32) -> Option<&TargetSlot> {
        self.slots.get(index as usize)
    }

    /// Returns the main or alt handle of one slot, or `None` when out of range
    pub fn get(&self, index: u32, alt: bool) -> Option<&TextureHandle> {
        self.slot(index).map(|slot| slot.handle(alt))
    }

    pub fn size(&self, index: u32) -> Option<TextureSize> {
        self.slot(index).map(|slot| slot.size)
    }
}

/// The four target registries of a pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargets {
    pub main_color: TargetRegistry,
    pub main_depth: TargetRegistry,
    pub shadow_color: TargetRegistry,
    pub shadow_depth: TargetRegistry,
}

impl RenderTargets {
    /// Builds every registry from the pack directives
    ///
    /// Main color sizes come from the per-target directives, main depth
    /// targets are screen-sized, and shadow targets are square at the shadow
    /// resolution.
    pub fn from_directives(directives: &PackDirectives) -> Self {
        let render_targets = &directives.render_targets;
        let shadow_size = TextureSize::square(directives.shadow.resolution);

        Self {
            main_color: TargetRegistry::new(
                MAIN_COLOR_PREFIX,
                (0..MAIN_COLOR_TARGETS).map(|index| render_targets.settings(index).size.unwrap_or_default()),
            ),
            main_depth: TargetRegistry::new(MAIN_DEPTH_PREFIX, (0..MAIN_DEPTH_TARGETS).map(|_| TextureSize::SCREEN)),
            shadow_color: TargetRegistry::new(SHADOW_COLOR_PREFIX, (0..SHADOW_COLOR_TARGETS).map(|_| shadow_size)),
            shadow_depth: TargetRegistry::new(SHADOW_DEPTH_PREFIX, (0..SHADOW_DEPTH_TARGETS).map(|_| shadow_size)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendergraph::RenderTargetSettings;

    #[test]
    fn test_texture_size_parsing() {
        let half = ScaleFactor::new(1, 2);
        assert_eq!("1".parse::<TextureSize>().unwrap(), TextureSize::SCREEN);
        assert_eq!("1/2".parse::<TextureSize>().unwrap(), TextureSize::Relative(half, half));
        assert_eq!("1/2,1".parse::<TextureSize>().unwrap(), TextureSize::Relative(half, ScaleFactor::ONE));
        assert_eq!("2048x1024".parse::<TextureSize>().unwrap(), TextureSize::Absolute { width: 2048, height: 1024 });

        assert!("1/0".parse::<TextureSize>().is_err());
        assert!("12x".parse::<TextureSize>().is_err());
    }

    #[test]
    fn test_texture_size_display() {
        let half = ScaleFactor::new(1, 2);
        assert_eq!(TextureSize::SCREEN.to_string(), "1");
        assert_eq!(TextureSize::Relative(half, ScaleFactor::ONE).to_string(), "1/2,1");
        assert_eq!(TextureSize::square(512).to_string(), "512x512");
    }

    #[test]
    fn test_registry_handles() {
        let registry = TargetRegistry::new(MAIN_COLOR_PREFIX, [TextureSize::SCREEN, TextureSize::square(64)]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0, false).unwrap().name(), "main_color_0");
        assert_eq!(registry.get(1, true).unwrap().name(), "main_color_1_alt");
        assert_eq!(registry.size(1), Some(TextureSize::square(64)));
        assert!(registry.get(2, false).is_none());
        assert!(registry.size(2).is_none());
    }

    #[test]
    fn test_render_targets_from_directives() {
        let mut directives = PackDirectives::default();
        directives.shadow.resolution = 2048;
        directives.render_targets.targets.insert(
            5,
            RenderTargetSettings {
                clear: true,
                size: Some(TextureSize::square(256)),
            },
        );

        let targets = RenderTargets::from_directives(&directives);
        assert_eq!(targets.main_color.len(), MAIN_COLOR_TARGETS);
        assert_eq!(targets.main_depth.len(), MAIN_DEPTH_TARGETS);
        assert_eq!(targets.shadow_color.len(), SHADOW_COLOR_TARGETS);
        assert_eq!(targets.shadow_depth.len(), SHADOW_DEPTH_TARGETS);

        assert_eq!(targets.main_color.size(0), Some(TextureSize::SCREEN));
        assert_eq!(targets.main_color.size(5), Some(TextureSize::square(256)));
        assert_eq!(targets.shadow_depth.size(1), Some(TextureSize::square(2048)));
        assert_eq!(targets.shadow_color.get(0, false).unwrap().name(), "shadow_color_0");
    }
}
