//! Error types for shader pack compilation
//!
//! Lowering errors are configuration errors: they abort lowering for the whole
//! pack. Transform errors are source errors: they abort only the program whose
//! source failed to patch.

use crate::rendergraph::TextureSize;
use crate::transform::ShaderStage;

/// Errors raised while lowering a shader pack into a render graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoweringError {
    /// A program declared a draw buffer outside the color target registry
    #[error("program '{program}' tried to write to an unavailable color target with index {index}; only {available} color targets are available")]
    DrawBufferOutOfRange { program: String, index: u32, available: u32 },

    /// Two draw buffers of one program resolve to targets of different sizes
    #[error(
        "color target size mismatch in program '{program}' when resolving draw buffer array {draw_buffers:?}: color target index {index} uses size {size} mismatching with the current picked size {picked}"
    )]
    SizeMismatch {
        program: String,
        draw_buffers: Vec<u32>,
        index: u32,
        size: TextureSize,
        picked: TextureSize,
    },

    /// An explicit flip directive referenced a color target that does not exist
    #[error("explicit flip in {context} references color target {index}; only {available} color targets are available")]
    FlipOutOfRange { context: String, index: u32, available: u32 },

    /// A program requested mipmapped sampling of a color target that does not exist
    #[error("program '{program}' requested mipmaps for color target {index}; only {available} color targets are available")]
    MipmapTargetOutOfRange { program: String, index: u32, available: u32 },

    /// A program requires a sampler or image that nothing binds
    #[error("program '{program}' requires binding '{name}', which could not be resolved")]
    UnresolvedBinding { program: String, name: String },
}

/// Errors raised while parsing, validating or rewriting shader source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// The source is not syntactically valid
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax { line: usize, column: usize, message: String },

    /// The source still contains a preprocessor directive that should have been expanded
    #[error("unparsed preprocessor directives such as '{directive}' may not be present at this stage of shader processing (line {line})")]
    DisallowedDirective { directive: String, line: usize },

    /// The source uses an identifier from the internal namespace
    #[error("detected a potential reference to unstable and internal shader interfaces (iris_ and irisMain), which isn't supported; violation: {name}")]
    ReservedIdentifier { name: String },
}

/// A transform error attributed to the program and stage it came from
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to patch {stage} source of program '{program}': {source}")]
pub struct ProgramPatchError {
    pub program: String,
    pub stage: ShaderStage,
    #[source]
    pub source: TransformError,
}

/// Errors from the end-to-end pack compilation helpers
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("invalid pack manifest: {0}")]
    Manifest(#[from] serde_norway::Error),
    #[error("failed to load shader source: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Lowering(#[from] LoweringError),
}
