//! Render-graph lowering
//!
//! Converts the declarative composite program sequence into an ordered list of
//! executable pass descriptors. A program only names the logical targets it
//! writes; which physical side each pass writes is derived from the write
//! history of every earlier pass, so lowering runs in two passes:
//!
//! 1. a forward simulation that drives the [`FlipTracker`] in program order
//!    and snapshots its state before every program, then
//! 2. a build pass over those snapshots, once the end-of-sequence parity swap
//!    set is known.
//!
//! Binding construction for an early pass depends on the parity swap set,
//! which only exists after the whole sequence has been simulated.

use std::collections::BTreeSet;
use tracing::{debug, info};

use super::{
    ColorAttachments, ColorTargetMipmapping, FlipSet, FlipState, FlipTracker, GenerateMipmapPassInfo, PackDirectives, PassInfo, ProgramSet, ProgramSource, RenderTargets,
    ScreenRenderPassInfo, SetTextureMinFilteringPassInfo, TargetRegistry, TextureFilteringMode, TextureInputResolver, TextureSize, get_input_handles,
};
use crate::error::LoweringError;
use crate::predefined::COMPOSITE_PRE_FLIPS;

/// Lowers the composite program sequence into pass descriptors
///
/// Pre-stage explicit flips are applied to `flip_tracker` before simulation;
/// the tracker is left in its end-of-sequence state. Missing and invalid
/// programs are skipped. A pack with no programs yields no passes.
///
/// # Arguments
/// * `programs` - The pack's programs; only the composite group is lowered
/// * `directives` - Pack-wide render target, shadow and flip directives
/// * `flip_tracker` - Flip state of the main color targets before the sequence
///
/// # Returns
/// The ordered pass list, or the first configuration error encountered
pub fn lower_composite_passes(programs: &ProgramSet, directives: &PackDirectives, flip_tracker: &mut FlipTracker) -> Result<Vec<PassInfo>, LoweringError> {
    let sequence: Vec<&ProgramSource> = programs.composite.iter().flatten().filter(|program| program.is_valid()).collect();
    PackLowering::new(directives).lower(&sequence, flip_tracker)
}

/// Resolves the attachments a pass writes, per parity
///
/// A pass writes the side of each target that was not active before it. The
/// second parity additionally swaps sides for parity-swapped targets. Every
/// drawn target must share one size.
///
/// # Arguments
/// * `program` - Program name used in errors
/// * `registry` - Main color target registry
/// * `draw_buffers` - Draw buffer indices in output order
/// * `flip_state` - Flip state the pass is built against
pub fn resolve_color_attachments(program: &str, registry: &TargetRegistry, draw_buffers: &[u32], flip_state: &FlipState) -> Result<[ColorAttachments; 2], LoweringError> {
    let mut even = Vec::with_capacity(draw_buffers.len());
    let mut odd = Vec::with_capacity(draw_buffers.len());
    let mut picked_size: Option<TextureSize> = None;

    for &index in draw_buffers {
        let slot = registry.slot(index).ok_or_else(|| LoweringError::DrawBufferOutOfRange {
            program: program.to_string(),
            index,
            available: registry.len(),
        })?;

        match picked_size {
            None => picked_size = Some(slot.size),
            Some(picked) if picked != slot.size => {
                return Err(LoweringError::SizeMismatch {
                    program: program.to_string(),
                    draw_buffers: draw_buffers.to_vec(),
                    index,
                    size: slot.size,
                    picked,
                });
            }
            Some(_) => {}
        }

        let alt0 = !flip_state.is_flipped_before_pass(index);
        let alt1 = alt0 ^ flip_state.is_parity_swapped(index);
        even.push(slot.handle(alt0).clone());
        odd.push(slot.handle(alt1).clone());
    }

    Ok([
        ColorAttachments {
            textures: even,
            size: picked_size,
        },
        ColorAttachments {
            textures: odd,
            size: picked_size,
        },
    ])
}

/// A program paired with the flip state captured when it was simulated
struct ProtoPass<'a> {
    flipped_before: FlipSet,
    flipped_at_least_once: FlipSet,
    program: &'a ProgramSource,
}

/// Internal driver for one lowering run
///
/// Owns the registries and the mip validity state; both are discarded once
/// the pass list is built.
struct PackLowering<'a> {
    directives: &'a PackDirectives,
    targets: RenderTargets,
    mipmapping: ColorTargetMipmapping,
}

impl<'a> PackLowering<'a> {
    fn new(directives: &'a PackDirectives) -> Self {
        Self {
            directives,
            targets: RenderTargets::from_directives(directives),
            mipmapping: ColorTargetMipmapping::new(),
        }
    }

    fn lower(mut self, sequence: &[&'a ProgramSource], flip_tracker: &mut FlipTracker) -> Result<Vec<PassInfo>, LoweringError> {
        let mut flipped_at_least_once = self.apply_pre_flips(flip_tracker)?;
        let proto_passes = self.simulate(sequence, flip_tracker, &mut flipped_at_least_once)?;

        let cleared = self.directives.render_targets.buffers_to_be_cleared(self.targets.main_color.len());
        let parity_swap = flip_tracker.snapshot().difference(&cleared);
        debug!(parity_swap = ?parity_swap, "computed parity swap set");

        let mut passes = Vec::with_capacity(proto_passes.len());
        for proto in proto_passes {
            let flip_state = FlipState::new(proto.flipped_before, proto.flipped_at_least_once, parity_swap.clone());
            self.build_pass(proto.program, &flip_state, &mut passes)?;
        }

        info!(programs = sequence.len(), passes = passes.len(), "lowered composite passes");
        Ok(passes)
    }

    /// Applies the explicit flips declared before the composite sequence
    fn apply_pre_flips(&self, flip_tracker: &mut FlipTracker) -> Result<FlipSet, LoweringError> {
        let mut flipped = FlipSet::new();

        for (index, flip) in self.directives.composite_pre_flips() {
            self.check_flip_index(COMPOSITE_PRE_FLIPS, index)?;
            if flip {
                flip_tracker.flip(index);
                flipped.insert(index);
            }
        }

        Ok(flipped)
    }

    /// Forward simulation: snapshot, then flip exactly the write set
    fn simulate(&self, sequence: &[&'a ProgramSource], flip_tracker: &mut FlipTracker, flipped_at_least_once: &mut FlipSet) -> Result<Vec<ProtoPass<'a>>, LoweringError> {
        let mut proto_passes = Vec::with_capacity(sequence.len());

        for &program in sequence {
            for index in program.directives.explicit_flips.keys() {
                self.check_flip_index(&program.name, *index)?;
            }

            proto_passes.push(ProtoPass {
                flipped_before: flip_tracker.snapshot(),
                flipped_at_least_once: flipped_at_least_once.clone(),
                program,
            });

            let write_set = program.directives.write_set();
            debug!(program = %program.name, write_set = ?write_set, "simulated program");
            for index in &write_set {
                flip_tracker.flip(*index);
            }
            flipped_at_least_once.extend(write_set);
        }

        Ok(proto_passes)
    }

    fn check_flip_index(&self, context: &str, index: u32) -> Result<(), LoweringError> {
        let available = self.targets.main_color.len();
        if index >= available {
            return Err(LoweringError::FlipOutOfRange {
                context: context.to_string(),
                index,
                available,
            });
        }
        Ok(())
    }

    /// Emits the auxiliary passes and the screen pass of one program
    fn build_pass(&mut self, program: &ProgramSource, flip_state: &FlipState, passes: &mut Vec<PassInfo>) -> Result<(), LoweringError> {
        let directives = &program.directives;

        self.schedule_mipmaps(program, &directives.mipmapped_buffers, flip_state, passes)?;

        let inputs = TextureInputResolver::new(&self.targets, self.directives).resolve(flip_state, &self.mipmapping);
        inputs.require(&program.name, directives)?;

        let attachments = resolve_color_attachments(&program.name, &self.targets.main_color, &directives.draw_buffers, flip_state)?;

        debug!(
            program = %program.name,
            flipped = ?flip_state.flipped_before_pass(),
            flipped_at_least_once = ?flip_state.flipped_at_least_once(),
            draw_buffers = ?directives.draw_buffers,
            "built screen pass"
        );

        let pass = ScreenRenderPassInfo::builder(program.name.clone())
            .viewport_scale(directives.viewport_scale)
            .attachments_by_parity(attachments)
            .inputs(inputs)
            .uniforms(directives.uniforms.clone())
            .flip_state(flip_state.clone())
            .build();
        passes.push(PassInfo::Screen(pass));

        Ok(())
    }

    /// Marks the read side of each mipmapped target valid and emits its mip passes
    fn schedule_mipmaps(&mut self, program: &ProgramSource, mipmapped_buffers: &BTreeSet<u32>, flip_state: &FlipState, passes: &mut Vec<PassInfo>) -> Result<(), LoweringError> {
        let registry = &self.targets.main_color;

        for &index in mipmapped_buffers {
            let textures = get_input_handles(registry, index, flip_state).ok_or_else(|| LoweringError::MipmapTargetOutOfRange {
                program: program.name.clone(),
                index,
                available: registry.len(),
            })?;

            self.mipmapping.enable(index, flip_state.is_flipped_before_pass(index));

            passes.push(PassInfo::GenerateMipmap(GenerateMipmapPassInfo { textures: textures.clone() }));
            passes.push(PassInfo::SetTextureMinFiltering(SetTextureMinFilteringPassInfo {
                textures,
                filtering: TextureFilteringMode::LinearMipmapLinear,
            }));
        }

        Ok(())
    }
}
