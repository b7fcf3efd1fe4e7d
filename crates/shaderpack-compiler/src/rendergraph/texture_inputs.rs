//! Texture-input resolution
//!
//! Produces the sampler and image bindings a pass sees, from the target
//! registries and the flip and mip state the pass is built against. Reads
//! always go to the side that was most recently written.

use serde::Serialize;
use std::collections::BTreeMap;

use super::{
    ColorTargetMipmapping, EdgeBehavior, FlipState, ImageBinding, PackDirectives, ProgramDirectives, RenderTargets, SamplerBinding, SamplerFiltering, TargetRegistry,
    TextureHandle,
};
use crate::error::LoweringError;
use crate::predefined::{DEFAULT_SAMPLER_NAME, MAIN_COLOR_ALIASES, MAIN_DEPTH_ALIASES, NOISE_TEXTURE_HANDLE, NOISE_TEXTURE_SAMPLER, SHADOW_COLOR_ALIASES};

/// Resolved inputs of one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureInputs {
    /// Sampler name to binding
    pub samplers: BTreeMap<String, SamplerBinding>,
    /// Image bindings in declaration order
    pub images: Vec<ImageBinding>,
    /// Sampler that unqualified target references resolve to
    pub default_sampler_name: String,
}

impl TextureInputs {
    pub fn sampler(&self, name: &str) -> Option<&SamplerBinding> {
        self.samplers.get(name)
    }

    pub fn image(&self, name: &str) -> Option<&ImageBinding> {
        self.images.iter().find(|image| image.name == name)
    }

    /// Checks that every binding the program requires is present
    ///
    /// # Arguments
    /// * `program` - Program name used in the error
    /// * `directives` - Program directives listing required samplers and images
    pub fn require(&self, program: &str, directives: &ProgramDirectives) -> Result<(), LoweringError> {
        let missing_sampler = directives.required_samplers.iter().find(|name| !self.samplers.contains_key(name.as_str()));
        let missing_image = directives.required_images.iter().find(|name| self.image(name).is_none());

        match missing_sampler.or(missing_image) {
            Some(name) => Err(LoweringError::UnresolvedBinding {
                program: program.to_string(),
                name: name.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Returns the handles a pass reads for one target, per parity
///
/// The read side is the alt side when the target was flipped before the
/// pass; the second parity additionally swaps sides for parity-swapped
/// targets.
pub fn get_input_handles(registry: &TargetRegistry, index: u32, flip_state: &FlipState) -> Option<[TextureHandle; 2]> {
    let (alt0, alt1) = input_sides(index, flip_state);
    Some([registry.get(index, alt0)?.clone(), registry.get(index, alt1)?.clone()])
}

fn input_sides(index: u32, flip_state: &FlipState) -> (bool, bool) {
    let alt0 = flip_state.is_flipped_before_pass(index);
    (alt0, alt0 ^ flip_state.is_parity_swapped(index))
}

/// Resolves sampler and image bindings against the pack's render targets
#[derive(Debug, Clone, Copy)]
pub struct TextureInputResolver<'a> {
    targets: &'a RenderTargets,
    directives: &'a PackDirectives,
}

impl<'a> TextureInputResolver<'a> {
    pub fn new(targets: &'a RenderTargets, directives: &'a PackDirectives) -> Self {
        Self { targets, directives }
    }

    /// Resolves every binding visible to a pass
    ///
    /// # Arguments
    /// * `flip_state` - Flip state of the main color targets for this pass
    /// * `mipmapping` - Current mip validity of the main color targets
    pub fn resolve(&self, flip_state: &FlipState, mipmapping: &ColorTargetMipmapping) -> TextureInputs {
        let mut inputs = TextureInputs {
            samplers: BTreeMap::new(),
            images: Vec::new(),
            default_sampler_name: DEFAULT_SAMPLER_NAME.to_string(),
        };

        self.resolve_main_color(&mut inputs, flip_state, mipmapping);
        self.resolve_main_depth(&mut inputs);
        self.resolve_shadow_color(&mut inputs);
        self.resolve_shadow_depth(&mut inputs);
        resolve_noise_tex(&mut inputs);
        self.resolve_custom(&mut inputs);

        inputs
    }

    fn resolve_main_color(&self, inputs: &mut TextureInputs, flip_state: &FlipState, mipmapping: &ColorTargetMipmapping) {
        let registry = &self.targets.main_color;

        for index in 0..registry.len() {
            let Some(textures) = get_input_handles(registry, index, flip_state) else {
                continue;
            };
            let (alt0, alt1) = input_sides(index, flip_state);
            let filtering = [alt0, alt1].map(|alt| {
                if mipmapping.is_enabled(index, alt) {
                    SamplerFiltering::LinearMipmapLinear
                } else {
                    SamplerFiltering::Linear
                }
            });

            let binding = SamplerBinding {
                textures: textures.clone(),
                edge_behavior: EdgeBehavior::Clamp,
                filtering,
                hardware_compare: false,
            };
            bind_with_aliases(inputs, format!("colortex{index}"), index, MAIN_COLOR_ALIASES, binding);

            inputs.images.push(ImageBinding {
                name: format!("colorimg{index}"),
                textures,
            });
        }
    }

    fn resolve_main_depth(&self, inputs: &mut TextureInputs) {
        let registry = &self.targets.main_depth;
        let unflipped = FlipState::unflipped();

        for index in 0..registry.len() {
            let Some(textures) = get_input_handles(registry, index, &unflipped) else {
                continue;
            };
            let binding = SamplerBinding {
                textures,
                edge_behavior: EdgeBehavior::Clamp,
                filtering: [SamplerFiltering::Nearest; 2],
                hardware_compare: false,
            };
            bind_with_aliases(inputs, format!("depthtex{index}"), index, MAIN_DEPTH_ALIASES, binding);
        }
    }

    fn resolve_shadow_color(&self, inputs: &mut TextureInputs) {
        let registry = &self.targets.shadow_color;
        let unflipped = FlipState::unflipped();

        for index in 0..registry.len() {
            let Some(textures) = get_input_handles(registry, index, &unflipped) else {
                continue;
            };
            let settings = self.directives.shadow.color_sampling_settings(index);
            let binding = SamplerBinding {
                textures: textures.clone(),
                edge_behavior: EdgeBehavior::Clamp,
                filtering: [SamplerFiltering::select(settings.nearest, settings.mipmap); 2],
                hardware_compare: false,
            };
            bind_with_aliases(inputs, format!("shadowcolor{index}"), index, SHADOW_COLOR_ALIASES, binding);

            inputs.images.push(ImageBinding {
                name: format!("shadowcolorimg{index}"),
                textures,
            });
        }
    }

    fn resolve_shadow_depth(&self, inputs: &mut TextureInputs) {
        let registry = &self.targets.shadow_depth;
        let unflipped = FlipState::unflipped();
        // `watershadow` takes the first depth target and pushes `shadow` to the second
        let aliases: &[(&str, u32)] = if self.directives.shadow.water_shadow {
            &[("watershadow", 0), ("shadow", 1)]
        } else {
            &[("shadow", 0)]
        };

        for index in 0..registry.len() {
            let Some(textures) = get_input_handles(registry, index, &unflipped) else {
                continue;
            };
            let settings = self.directives.shadow.depth_sampling_settings(index);
            let binding = SamplerBinding {
                textures,
                edge_behavior: EdgeBehavior::Clamp,
                filtering: [SamplerFiltering::select(settings.nearest, settings.mipmap); 2],
                hardware_compare: settings.hardware_filtering,
            };
            bind_with_aliases(inputs, format!("shadowtex{index}"), index, aliases, binding);
        }
    }

    fn resolve_custom(&self, inputs: &mut TextureInputs) {
        for (name, spec) in &self.directives.custom_textures {
            let binding = SamplerBinding::fixed(TextureHandle::new(spec.texture.clone()), spec.edge_behavior, spec.filtering);
            inputs.samplers.insert(name.clone(), binding);
        }
    }
}

fn resolve_noise_tex(inputs: &mut TextureInputs) {
    let binding = SamplerBinding::fixed(TextureHandle::new(NOISE_TEXTURE_HANDLE), EdgeBehavior::Repeat, SamplerFiltering::Linear);
    inputs.samplers.insert(NOISE_TEXTURE_SAMPLER.to_string(), binding);
}

fn bind_with_aliases(inputs: &mut TextureInputs, name: String, index: u32, aliases: &[(&str, u32)], binding: SamplerBinding) {
    for (alias, _) in aliases.iter().filter(|(_, aliased)| *aliased == index) {
        inputs.samplers.insert(alias.to_string(), binding.clone());
    }
    inputs.samplers.insert(name, binding);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendergraph::{CustomTextureSpec, DepthSamplingSettings, FlipSet, SamplingSettings};
    use std::collections::BTreeSet;

    fn flip_state(before: &[u32], parity: &[u32]) -> FlipState {
        FlipState::new(before.iter().copied().collect(), FlipSet::new(), parity.iter().copied().collect())
    }

    fn handles(binding: &SamplerBinding) -> [&str; 2] {
        [binding.textures[0].name(), binding.textures[1].name()]
    }

    #[test]
    fn test_input_handles_follow_flip_and_parity() {
        let directives = PackDirectives::default();
        let targets = RenderTargets::from_directives(&directives);
        let registry = &targets.main_color;

        let state = flip_state(&[1, 2], &[2, 3]);
        let names = |index| get_input_handles(registry, index, &state).map(|[a, b]| [a.name().to_string(), b.name().to_string()]);

        assert_eq!(names(0).unwrap(), ["main_color_0", "main_color_0"]);
        assert_eq!(names(1).unwrap(), ["main_color_1_alt", "main_color_1_alt"]);
        assert_eq!(names(2).unwrap(), ["main_color_2_alt", "main_color_2"]);
        assert_eq!(names(3).unwrap(), ["main_color_3", "main_color_3_alt"]);
        assert!(names(16).is_none());
    }

    #[test]
    fn test_main_color_bindings_and_aliases() {
        let directives = PackDirectives::default();
        let targets = RenderTargets::from_directives(&directives);
        let resolver = TextureInputResolver::new(&targets, &directives);

        let mut mipmapping = ColorTargetMipmapping::new();
        mipmapping.enable_alt(4);
        let inputs = resolver.resolve(&flip_state(&[4], &[]), &mipmapping);

        assert_eq!(inputs.default_sampler_name, "colortex0");
        assert_eq!(handles(inputs.sampler("colortex4").unwrap()), ["main_color_4_alt", "main_color_4_alt"]);
        assert_eq!(inputs.sampler("gaux1"), inputs.sampler("colortex4"));
        assert_eq!(inputs.sampler("gcolor"), inputs.sampler("colortex0"));
        assert_eq!(inputs.sampler("composite"), inputs.sampler("colortex3"));
        assert_eq!(inputs.sampler("colortex4").unwrap().filtering, [SamplerFiltering::LinearMipmapLinear; 2]);
        assert_eq!(inputs.sampler("colortex5").unwrap().filtering, [SamplerFiltering::Linear; 2]);

        let image = inputs.image("colorimg4").unwrap();
        assert_eq!(image.textures[0].name(), "main_color_4_alt");
        assert_eq!(inputs.images[0].name, "colorimg0");
    }

    #[test]
    fn test_depth_shadow_and_noise_bindings() {
        let mut directives = PackDirectives::default();
        directives.shadow.water_shadow = true;
        directives.shadow.color_sampling = vec![SamplingSettings { mipmap: true, nearest: true }];
        directives.shadow.depth_sampling = vec![
            DepthSamplingSettings::default(),
            DepthSamplingSettings {
                mipmap: false,
                nearest: true,
                hardware_filtering: true,
            },
        ];
        let targets = RenderTargets::from_directives(&directives);
        let inputs = TextureInputResolver::new(&targets, &directives).resolve(&flip_state(&[0], &[0]), &ColorTargetMipmapping::new());

        let depth = inputs.sampler("gdepthtex").unwrap();
        assert_eq!(handles(depth), ["main_depth_0", "main_depth_0"]);
        assert_eq!(depth.filtering, [SamplerFiltering::Nearest; 2]);
        assert!(inputs.sampler("depthtex2").is_some());

        let shadow_color = inputs.sampler("shadowcolor").unwrap();
        assert_eq!(shadow_color.filtering, [SamplerFiltering::NearestMipmapNearest; 2]);
        assert_eq!(inputs.sampler("shadowcolor1").unwrap().filtering, [SamplerFiltering::Linear; 2]);
        assert!(inputs.image("shadowcolorimg1").is_some());

        assert_eq!(handles(inputs.sampler("watershadow").unwrap()), ["shadow_depth_0", "shadow_depth_0"]);
        let shadow = inputs.sampler("shadow").unwrap();
        assert_eq!(handles(shadow), ["shadow_depth_1", "shadow_depth_1"]);
        assert!(shadow.hardware_compare);
        assert_eq!(shadow.filtering, [SamplerFiltering::Nearest; 2]);

        let noise = inputs.sampler("noisetex").unwrap();
        assert_eq!(handles(noise), ["noise_tex", "noise_tex"]);
        assert_eq!(noise.edge_behavior, EdgeBehavior::Repeat);
    }

    #[test]
    fn test_custom_textures_override_builtins() {
        let mut directives = PackDirectives::default();
        for (name, texture) in [("noisetex", "custom_noise"), ("lut", "custom_lut")] {
            directives.custom_textures.insert(
                name.to_string(),
                CustomTextureSpec {
                    texture: texture.to_string(),
                    edge_behavior: EdgeBehavior::Clamp,
                    filtering: SamplerFiltering::Nearest,
                },
            );
        }
        let targets = RenderTargets::from_directives(&directives);
        let inputs = TextureInputResolver::new(&targets, &directives).resolve(&FlipState::unflipped(), &ColorTargetMipmapping::new());

        assert_eq!(handles(inputs.sampler("noisetex").unwrap()), ["custom_noise", "custom_noise"]);
        assert_eq!(inputs.sampler("lut").unwrap().filtering, [SamplerFiltering::Nearest; 2]);
    }

    #[test]
    fn test_require_reports_unresolved_binding() {
        let directives = PackDirectives::default();
        let targets = RenderTargets::from_directives(&directives);
        let inputs = TextureInputResolver::new(&targets, &directives).resolve(&FlipState::unflipped(), &ColorTargetMipmapping::new());

        let mut program = ProgramDirectives {
            required_samplers: BTreeSet::from(["colortex2".to_string(), "gaux4".to_string()]),
            required_images: BTreeSet::from(["colorimg1".to_string()]),
            ..Default::default()
        };
        assert!(inputs.require("composite", &program).is_ok());

        program.required_images.insert("voxelimg".to_string());
        assert_eq!(
            inputs.require("composite", &program),
            Err(LoweringError::UnresolvedBinding {
                program: "composite".to_string(),
                name: "voxelimg".to_string(),
            })
        );
    }
}
