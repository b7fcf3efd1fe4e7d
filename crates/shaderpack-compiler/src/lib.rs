//! Shader pack compilation pipeline
//!
//! This crate turns a declarative shader pack into the data a renderer needs
//! to execute it. It is split into two independent halves:
//!
//! - [`rendergraph`] lowers the composite program sequence into concrete
//!   passes, tracking ping-pong target flips, mipmap validity and the texture
//!   bindings every pass samples from.
//! - [`transform`] parses GLSL stage sources, rejects unsupported constructs
//!   and applies one of the compatibility rewrites before printing compact
//!   source again.
//!
//! [`compile_pack`] drives both halves over a complete [`rendergraph::PackManifest`].

mod error;

pub mod predefined;
pub mod rendergraph;
pub mod transform;

pub use error::{LoweringError, PackError, ProgramPatchError, TransformError};

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use rendergraph::{FlipTracker, PackManifest, PassInfo, ProgramSource};
use transform::{Patch, PatchedSources, ShaderStage, TransformPatcher};

/// Result of compiling a pack manifest
#[derive(Debug, Clone, Serialize)]
pub struct CompiledPack {
    pub name: String,
    /// Lowered composite passes in execution order
    pub passes: Vec<PassInfo>,
    /// Patched stage sources of every program that compiled, keyed by program name
    pub programs: BTreeMap<String, PatchedSources>,
    /// Programs that failed to patch; they are excluded from lowering
    #[serde(skip)]
    pub failures: Vec<ProgramPatchError>,
}

/// Compiles a pack manifest into lowered passes and patched sources
///
/// Stage entries of every program name source files, which are read through
/// `load_shader_file`. Each loaded stage gets the composite depth patch. A
/// program whose source fails to patch is logged, marked invalid and skipped
/// by lowering; the remaining programs still compile.
///
/// # Arguments
/// * `manifest` - Parsed pack manifest
/// * `load_shader_file` - Function to load a shader source by its file name
///
/// # Returns
/// The lowered passes, the patched sources and the list of failed programs
///
/// # Errors
/// Returns an error if a shader file cannot be loaded or lowering fails
pub fn compile_pack(manifest: &PackManifest, load_shader_file: impl Fn(&str) -> std::io::Result<String>) -> Result<CompiledPack, PackError> {
    let patcher = TransformPatcher::new();
    let mut programs = manifest.programs.clone();
    let mut patched_programs = BTreeMap::new();
    let mut failures = Vec::new();

    for program in programs.composite.iter_mut().flatten().filter(|program| program.is_valid()) {
        let loaded = load_program(program, &load_shader_file)?;

        match patcher.patch_program(&loaded, |_| Patch::CompositeDepth) {
            Ok(patched) => {
                patched_programs.insert(program.name.clone(), patched);
            }
            Err(err) => {
                warn!(program = %program.name, stage = %err.stage, "{err}");
                program.valid = false;
                failures.push(err);
            }
        }
    }

    let passes = rendergraph::lower_composite_passes(&programs, &manifest.directives, &mut FlipTracker::new())?;
    info!(pack = %manifest.name, passes = passes.len(), failed = failures.len(), "compiled shader pack");

    Ok(CompiledPack {
        name: manifest.name.clone(),
        passes,
        programs: patched_programs,
        failures,
    })
}

/// Replaces the stage file names of a program with the loaded sources
fn load_program(program: &ProgramSource, load_shader_file: impl Fn(&str) -> std::io::Result<String>) -> std::io::Result<ProgramSource> {
    let mut loaded = program.clone();

    for stage in ShaderStage::ALL {
        let slot = match stage {
            ShaderStage::Vertex => &mut loaded.vertex,
            ShaderStage::Geometry => &mut loaded.geometry,
            ShaderStage::Fragment => &mut loaded.fragment,
        };
        if let Some(file) = slot.as_deref() {
            *slot = Some(load_shader_file(file)?);
        }
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MANIFEST: &str = r#"
name: Test Pack
programs:
  composite:
    - name: composite
      directives:
        draw_buffers: [0]
      vertex: composite.vsh
      fragment: composite.fsh
    - ~
    - name: composite2
      directives:
        draw_buffers: [1]
      fragment: broken.fsh
    - name: composite3
      directives:
        draw_buffers: [0]
      fragment: composite.fsh
"#;

    fn files() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("composite.vsh", "void main(){ gl_Position = ftransform(); }"),
            ("composite.fsh", "uniform float centerDepthSmooth;\nuniform sampler2D colortex0;\nvoid main(){ gl_FragData[0] = vec4(centerDepthSmooth); }"),
            ("broken.fsh", "uniform float iris_depth;\nvoid main(){}"),
        ])
    }

    fn loader(files: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> std::io::Result<String> {
        move |name: &str| {
            files
                .get(name)
                .map(|source| source.to_string())
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, format!("File not found: {name}")))
        }
    }

    #[test]
    fn test_compile_pack() {
        let manifest = PackManifest::from_yaml(MANIFEST).unwrap();
        let compiled = compile_pack(&manifest, loader(files())).unwrap();

        assert_eq!(compiled.name, "Test Pack");
        assert_eq!(compiled.passes.len(), 2);
        let programs: Vec<_> = compiled.passes.iter().filter_map(PassInfo::as_screen).map(|pass| pass.program.as_str()).collect();
        assert_eq!(programs, vec!["composite", "composite3"]);

        assert_eq!(compiled.programs.keys().collect::<Vec<_>>(), vec!["composite", "composite3"]);
        let fragment = compiled.programs["composite"].get(ShaderStage::Fragment).unwrap();
        assert!(fragment.starts_with("uniform sampler2D iris_centerDepthSmooth;\n"));
        assert!(compiled.programs["composite"].get(ShaderStage::Geometry).is_none());

        assert_eq!(compiled.failures.len(), 1);
        assert_eq!(compiled.failures[0].program, "composite2");
        assert_eq!(compiled.failures[0].stage, ShaderStage::Fragment);
        assert!(matches!(compiled.failures[0].source, TransformError::ReservedIdentifier { .. }));
    }

    #[test]
    fn test_missing_shader_file() {
        let manifest = PackManifest::from_yaml(MANIFEST).unwrap();
        let mut files = files();
        files.remove("broken.fsh");

        let result = compile_pack(&manifest, loader(files));
        assert!(matches!(result, Err(PackError::Io(_))));
    }

    #[test]
    fn test_lowering_error_aborts_compilation() {
        let manifest = PackManifest::from_yaml(
            r#"
name: Out Of Range
programs:
  composite:
    - name: composite
      directives:
        draw_buffers: [16]
"#,
        )
        .unwrap();

        let result = compile_pack(&manifest, loader(files()));
        assert!(matches!(result, Err(PackError::Lowering(LoweringError::DrawBufferOutOfRange { index: 16, .. }))));
    }
}
