//! Source transform patcher
//!
//! Parses shader stage sources, validates them, applies exactly one rewrite
//! routine selected by [`Patch`], and prints the result back to compact GLSL.
//!
//! Every patch first rejects sources that use the reserved `iris_` or
//! `irisMain` identifier prefixes. The rewrites inject declarations with those
//! prefixes and rely on author code never colliding with them.

mod ast;
mod attributes;
mod composite_depth;
mod edit;
mod index;
mod lexer;
mod parser;
mod printer;
mod terrain;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::trace;

pub use ast::*;
pub use edit::InjectionPoint;
pub use index::IdentifierIndex;
pub use lexer::{Token, TokenKind};
pub use parser::{parse, parse_declarations};
pub use printer::print;

use crate::error::{ProgramPatchError, TransformError};
use crate::predefined::RESERVED_IDENTIFIER_PREFIXES;
use crate::rendergraph::ProgramSource;

/// Programmable pipeline stage of a shader source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Fragment,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 3] = [ShaderStage::Vertex, ShaderStage::Geometry, ShaderStage::Fragment];
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
        })
    }
}

impl FromStr for ShaderStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vertex" | "vsh" => Ok(ShaderStage::Vertex),
            "geometry" | "gsh" => Ok(ShaderStage::Geometry),
            "fragment" | "fsh" => Ok(ShaderStage::Fragment),
            other => Err(format!("unknown shader stage '{other}'")),
        }
    }
}

/// Vertex inputs the renderer supplies downstream of a program
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputAvailability {
    pub texture: bool,
    pub lightmap: bool,
    pub overlay: bool,
}

/// Parameters of the attribute adaptation patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeParameters {
    pub stage: ShaderStage,
    /// Whether the program has a geometry stage between vertex and fragment
    pub has_geometry: bool,
    pub inputs: InputAvailability,
}

/// The rewrite applied by one patcher invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch {
    /// Adapt `gl_MultiTexCoordN` and overlay color plumbing
    Attributes(AttributeParameters),
    /// Adapt fixed-function built-ins to the chunk renderer
    Terrain { stage: ShaderStage },
    /// Replace the legacy `centerDepthSmooth` uniform
    CompositeDepth,
}

impl Patch {
    /// Applies the rewrite routine of this patch to a validated tree
    pub fn apply(&self, unit: TranslationUnit) -> TranslationUnit {
        match self {
            Patch::Attributes(parameters) => attributes::transform(unit, parameters),
            Patch::Terrain { stage } => terrain::transform(unit, *stage),
            Patch::CompositeDepth => composite_depth::transform(unit),
        }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Patch::Attributes(parameters) => write!(f, "attributes (stage: {}, has geometry: {})", parameters.stage, parameters.has_geometry),
            Patch::Terrain { stage } => write!(f, "terrain (stage: {stage})"),
            Patch::CompositeDepth => f.write_str("composite depth"),
        }
    }
}

/// Patched stage sources of one program; absent stages stay absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchedSources {
    pub vertex: Option<String>,
    pub geometry: Option<String>,
    pub fragment: Option<String>,
}

impl PatchedSources {
    pub fn get(&self, stage: ShaderStage) -> Option<&str> {
        match stage {
            ShaderStage::Vertex => self.vertex.as_deref(),
            ShaderStage::Geometry => self.geometry.as_deref(),
            ShaderStage::Fragment => self.fragment.as_deref(),
        }
    }

    fn slot(&mut self, stage: ShaderStage) -> &mut Option<String> {
        match stage {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::Geometry => &mut self.geometry,
            ShaderStage::Fragment => &mut self.fragment,
        }
    }
}

/// Parses, validates, rewrites and prints shader sources
///
/// The patcher only holds read-only configuration, so one instance can serve
/// any number of independent invocations, including from multiple threads.
#[derive(Debug, Clone, Copy)]
pub struct TransformPatcher {
    reserved_prefixes: &'static [&'static str],
}

impl Default for TransformPatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformPatcher {
    pub const fn new() -> Self {
        Self {
            reserved_prefixes: RESERVED_IDENTIFIER_PREFIXES,
        }
    }

    /// Rejects a tree that uses any reserved identifier prefix
    pub fn check_reserved_identifiers(&self, index: &IdentifierIndex) -> Result<(), TransformError> {
        for prefix in self.reserved_prefixes {
            if let Some(name) = index.prefix_query(prefix).next() {
                return Err(TransformError::ReservedIdentifier { name: name.to_string() });
            }
        }
        Ok(())
    }

    /// Parses and validates a source, then applies one patch and prints the result
    ///
    /// Input, output and elapsed time are logged at trace level.
    ///
    /// # Errors
    /// Returns a syntax error, a disallowed-directive error, or a reserved
    /// identifier error. Validation happens before any rewrite.
    pub fn transform(&self, source: &str, patch: &Patch) -> Result<String, TransformError> {
        trace!(%patch, input = source, "patching shader source");
        let started = Instant::now();

        let patched = self.run(source, patch);

        trace!(%patch, elapsed_us = started.elapsed().as_micros() as u64, "patching finished");
        if let Ok(output) = &patched {
            trace!(%patch, output = output.as_str(), "patched shader source");
        }
        patched
    }

    fn run(&self, source: &str, patch: &Patch) -> Result<String, TransformError> {
        let unit = parse(source)?;
        self.check_reserved_identifiers(&IdentifierIndex::build(&unit))?;
        Ok(print(&patch.apply(unit)))
    }

    pub fn patch_attributes(&self, source: &str, stage: ShaderStage, has_geometry: bool, inputs: InputAvailability) -> Result<String, TransformError> {
        self.transform(source, &Patch::Attributes(AttributeParameters { stage, has_geometry, inputs }))
    }

    pub fn patch_terrain(&self, source: &str, stage: ShaderStage) -> Result<String, TransformError> {
        self.transform(source, &Patch::Terrain { stage })
    }

    pub fn patch_composite_depth(&self, source: &str) -> Result<String, TransformError> {
        self.transform(source, &Patch::CompositeDepth)
    }

    /// Patches every present stage of a program
    ///
    /// `patch_for_stage` selects the patch for each stage. The first failing
    /// stage aborts the program; the error names the program and the stage.
    pub fn patch_program(&self, program: &ProgramSource, patch_for_stage: impl Fn(ShaderStage) -> Patch) -> Result<PatchedSources, ProgramPatchError> {
        let mut patched = PatchedSources::default();

        for stage in ShaderStage::ALL {
            let source = match stage {
                ShaderStage::Vertex => program.vertex.as_deref(),
                ShaderStage::Geometry => program.geometry.as_deref(),
                ShaderStage::Fragment => program.fragment.as_deref(),
            };
            let Some(source) = source else {
                continue;
            };

            let output = self.transform(source, &patch_for_stage(stage)).map_err(|source| ProgramPatchError {
                program: program.name.clone(),
                stage,
                source,
            })?;
            *patched.slot(stage) = Some(output);
        }

        Ok(patched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendergraph::ProgramDirectives;

    const DEPTH_SCENARIO: &str = "uniform float centerDepthSmooth; void main(){ x = centerDepthSmooth; }";

    fn all_patches() -> Vec<Patch> {
        vec![
            Patch::Attributes(AttributeParameters {
                stage: ShaderStage::Vertex,
                has_geometry: false,
                inputs: InputAvailability {
                    texture: false,
                    lightmap: true,
                    overlay: true,
                },
            }),
            Patch::Terrain { stage: ShaderStage::Vertex },
            Patch::CompositeDepth,
        ]
    }

    #[test]
    fn test_composite_depth_scenario() {
        let patcher = TransformPatcher::new();
        let output = patcher.patch_composite_depth(DEPTH_SCENARIO).unwrap();

        assert_eq!(
            output,
            "uniform sampler2D iris_centerDepthSmooth;\nvoid main(){x=texture(iris_centerDepthSmooth,vec2(0.5)).r;}\n"
        );

        // The output uses the reserved prefix, so the text-level entry point rejects it,
        // while the routine itself leaves its own output unchanged
        assert!(matches!(patcher.patch_composite_depth(&output), Err(TransformError::ReservedIdentifier { .. })));
        let tree = parse(&output).unwrap();
        assert_eq!(Patch::CompositeDepth.apply(tree.clone()), tree);
    }

    #[test]
    fn test_reserved_prefixes_rejected_for_every_patch() {
        let patcher = TransformPatcher::new();
        let sources = [
            ("uniform float centerDepthSmooth; float iris_secret; void main(){ x = centerDepthSmooth; }", "iris_secret"),
            ("void irisMainHelper(){} void main(){ gl_Position = ftransform(); }", "irisMainHelper"),
        ];

        for patch in all_patches() {
            for (source, violation) in sources {
                assert_eq!(
                    patcher.transform(source, &patch),
                    Err(TransformError::ReservedIdentifier { name: violation.to_string() }),
                    "patch {patch} accepted {source}"
                );
            }
        }
    }

    #[test]
    fn test_disallowed_directive_rejected() {
        let patcher = TransformPatcher::new();
        let result = patcher.patch_terrain("#version 120\n#ifdef FOO\nvoid main(){}\n#endif\n", ShaderStage::Vertex);
        assert_eq!(
            result,
            Err(TransformError::DisallowedDirective {
                directive: "#ifdef".to_string(),
                line: 2,
            })
        );
    }

    #[test]
    fn test_patch_program() {
        let patcher = TransformPatcher::new();
        let mut program = ProgramSource::new("composite", ProgramDirectives::default());
        program.vertex = Some("void main(){ gl_Position = ftransform(); }".to_string());
        program.fragment = Some(DEPTH_SCENARIO.to_string());

        let patched = patcher.patch_program(&program, |_| Patch::CompositeDepth).unwrap();
        assert_eq!(patched.get(ShaderStage::Vertex), Some("void main(){gl_Position=ftransform();}\n"));
        assert!(patched.get(ShaderStage::Geometry).is_none());
        assert!(patched.get(ShaderStage::Fragment).unwrap().contains("iris_centerDepthSmooth"));

        program.fragment = Some("void main(){ x = 1.0 @ 2.0; }".to_string());
        let err = patcher.patch_program(&program, |_| Patch::CompositeDepth).unwrap_err();
        assert_eq!(err.program, "composite");
        assert_eq!(err.stage, ShaderStage::Fragment);
        assert!(matches!(err.source, TransformError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_shader_stage_parsing() {
        assert_eq!("Fragment".parse::<ShaderStage>(), Ok(ShaderStage::Fragment));
        assert_eq!("vsh".parse::<ShaderStage>(), Ok(ShaderStage::Vertex));
        assert!("compute".parse::<ShaderStage>().is_err());
        assert_eq!(ShaderStage::Geometry.to_string(), "geometry");
    }

    #[test]
    fn test_patcher_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TransformPatcher>();

        let patcher = TransformPatcher::new();
        let outputs: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| patcher.patch_composite_depth(DEPTH_SCENARIO))).collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });
        assert!(outputs.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
