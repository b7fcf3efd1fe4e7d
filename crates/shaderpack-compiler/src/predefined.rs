//! Predefined shader pack constants.
//!
//! This module contains the fixed tables shared by the lowering and transform
//! passes: render target counts, the sampler and image names that shader packs
//! use to refer to those targets, and the parser configuration for source
//! patching.

/// Number of main color targets (`colortex0` .. `colortex15`).
pub const MAIN_COLOR_TARGETS: u32 = 16;
/// Number of main depth targets (`depthtex0` .. `depthtex2`).
pub const MAIN_DEPTH_TARGETS: u32 = 3;
/// Number of shadow color targets (`shadowcolor0`, `shadowcolor1`).
pub const SHADOW_COLOR_TARGETS: u32 = 2;
/// Number of shadow depth targets (`shadowtex0`, `shadowtex1`).
pub const SHADOW_DEPTH_TARGETS: u32 = 2;

/// Handle name prefixes for each target registry.
pub const MAIN_COLOR_PREFIX: &str = "main_color_";
pub const MAIN_DEPTH_PREFIX: &str = "main_depth_";
pub const SHADOW_COLOR_PREFIX: &str = "shadow_color_";
pub const SHADOW_DEPTH_PREFIX: &str = "shadow_depth_";

/// Handle of the built-in noise texture.
pub const NOISE_TEXTURE_HANDLE: &str = "noise_tex";
/// Sampler name of the built-in noise texture.
pub const NOISE_TEXTURE_SAMPLER: &str = "noisetex";

/// Sampler that unqualified references to the main color target resolve to.
pub const DEFAULT_SAMPLER_NAME: &str = "colortex0";

/// Stage key of the explicit flips applied before the composite sequence.
pub const COMPOSITE_PRE_FLIPS: &str = "composite_pre";

/// Legacy sampler names for the first eight main color targets.
///
/// Older packs refer to the main color targets by these names; they alias the
/// numbered `colortexN` samplers.
pub const MAIN_COLOR_ALIASES: &[(&str, u32)] = &[
    ("gcolor", 0),
    ("gdepth", 1),
    ("gnormal", 2),
    ("composite", 3),
    ("gaux1", 4),
    ("gaux2", 5),
    ("gaux3", 6),
    ("gaux4", 7),
];

/// Legacy sampler names for the main depth targets.
pub const MAIN_DEPTH_ALIASES: &[(&str, u32)] = &[("gdepthtex", 0)];

/// Legacy sampler names for the shadow color targets.
pub const SHADOW_COLOR_ALIASES: &[(&str, u32)] = &[("shadowcolor", 0)];

/// Identifier prefixes reserved for internal shader plumbing.
///
/// Pack-authored sources may not use these; the transform patcher injects
/// declarations with these prefixes and relies on them not colliding.
pub const RESERVED_IDENTIFIER_PREFIXES: &[&str] = &["iris_", "irisMain"];

/// Preprocessor directives that survive into patched sources.
///
/// `#version` is not listed: it is parsed into the translation unit's version
/// statement rather than kept as a directive.
pub const PARSED_DIRECTIVES: &[&str] = &["extension", "pragma"];
