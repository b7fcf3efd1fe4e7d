//! Chunk-renderer terrain adaptation
//!
//! The chunk renderer feeds terrain through a packed vertex format and its own
//! matrix uniforms instead of the fixed-function built-ins. Each referenced
//! built-in is substituted and the declarations it needs are injected once.

use super::ShaderStage;
use super::ast::TranslationUnit;
use super::edit::{self, InjectionPoint};
use super::index::IdentifierIndex;

const POSITION: &str = "in vec3 iris_Position;";
const CHUNK_OFFSET: &str = "uniform vec3 iris_ChunkOffset;";
const COLOR: &str = "in vec4 iris_Color;";
const UV0: &str = "in vec2 iris_UV0;";
const UV2: &str = "in ivec2 iris_UV2;";
const NORMAL: &str = "in vec3 iris_Normal;";
const MODEL_VIEW: &str = "uniform mat4 iris_ModelViewMatrix;";
const PROJECTION: &str = "uniform mat4 iris_ProjectionMatrix;";
const NORMAL_MATRIX: &str = "uniform mat3 iris_NormalMatrix;";

/// One fixed-function built-in and its terrain replacement
struct Replacement {
    builtin: &'static str,
    /// Replace `builtin()` calls instead of references
    call: bool,
    vertex_only: bool,
    expression: &'static str,
    declarations: &'static [&'static str],
}

const REPLACEMENTS: &[Replacement] = &[
    Replacement {
        builtin: "gl_Vertex",
        call: false,
        vertex_only: true,
        expression: "vec4(iris_Position + iris_ChunkOffset, 1.0)",
        declarations: &[POSITION, CHUNK_OFFSET],
    },
    Replacement {
        builtin: "gl_Color",
        call: false,
        vertex_only: true,
        expression: "iris_Color",
        declarations: &[COLOR],
    },
    Replacement {
        builtin: "gl_MultiTexCoord0",
        call: false,
        vertex_only: true,
        expression: "vec4(iris_UV0, 0.0, 1.0)",
        declarations: &[UV0],
    },
    Replacement {
        builtin: "gl_MultiTexCoord1",
        call: false,
        vertex_only: true,
        expression: "vec4(iris_UV2, 0.0, 1.0)",
        declarations: &[UV2],
    },
    Replacement {
        builtin: "gl_Normal",
        call: false,
        vertex_only: true,
        expression: "iris_Normal",
        declarations: &[NORMAL],
    },
    Replacement {
        builtin: "ftransform",
        call: true,
        vertex_only: true,
        expression: "iris_ProjectionMatrix * iris_ModelViewMatrix * vec4(iris_Position + iris_ChunkOffset, 1.0)",
        declarations: &[PROJECTION, MODEL_VIEW, POSITION, CHUNK_OFFSET],
    },
    Replacement {
        builtin: "gl_ModelViewMatrix",
        call: false,
        vertex_only: false,
        expression: "iris_ModelViewMatrix",
        declarations: &[MODEL_VIEW],
    },
    Replacement {
        builtin: "gl_ProjectionMatrix",
        call: false,
        vertex_only: false,
        expression: "iris_ProjectionMatrix",
        declarations: &[PROJECTION],
    },
    Replacement {
        builtin: "gl_ModelViewProjectionMatrix",
        call: false,
        vertex_only: false,
        expression: "iris_ProjectionMatrix * iris_ModelViewMatrix",
        declarations: &[PROJECTION, MODEL_VIEW],
    },
    Replacement {
        builtin: "gl_NormalMatrix",
        call: false,
        vertex_only: false,
        expression: "iris_NormalMatrix",
        declarations: &[NORMAL_MATRIX],
    },
];

/// Substitutes fixed-function built-ins with the chunk renderer's interface
pub fn transform(mut unit: TranslationUnit, stage: ShaderStage) -> TranslationUnit {
    let index = IdentifierIndex::build(&unit);
    let mut needed: Vec<&'static str> = Vec::new();

    for replacement in REPLACEMENTS {
        if replacement.vertex_only && stage != ShaderStage::Vertex {
            continue;
        }
        if !index.has(replacement.builtin) {
            continue;
        }

        let expression = edit::snippet(replacement.expression);
        let replaced = if replacement.call {
            edit::replace_calls(&mut unit, replacement.builtin, &expression)
        } else {
            edit::replace_references(&mut unit, replacement.builtin, &expression)
        };

        if replaced > 0 {
            for declaration in replacement.declarations {
                if !needed.contains(declaration) {
                    needed.push(declaration);
                }
            }
        }
    }

    let declarations = needed.into_iter().flat_map(edit::declarations).collect::<Vec<_>>();
    edit::inject(&mut unit, InjectionPoint::BeforeDeclarations, declarations);
    unit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::parser::parse;
    use crate::transform::printer::print;

    #[test]
    fn test_vertex_builtins_are_replaced() {
        let unit = parse("#version 120\nvarying vec4 color;\nvoid main(){ color = gl_Color; gl_Position = ftransform(); vec4 p = gl_ModelViewMatrix * gl_Vertex; }").unwrap();
        let output = print(&transform(unit, ShaderStage::Vertex));

        assert_eq!(
            output,
            "#version 120\n\
             in vec3 iris_Position;\n\
             uniform vec3 iris_ChunkOffset;\n\
             in vec4 iris_Color;\n\
             uniform mat4 iris_ProjectionMatrix;\n\
             uniform mat4 iris_ModelViewMatrix;\n\
             varying vec4 color;\n\
             void main(){color=iris_Color;gl_Position=(iris_ProjectionMatrix*iris_ModelViewMatrix*vec4(iris_Position+iris_ChunkOffset,1.0));\
             vec4 p=iris_ModelViewMatrix*vec4(iris_Position+iris_ChunkOffset,1.0);}\n"
        );
    }

    #[test]
    fn test_fragment_only_replaces_matrices() {
        let unit = parse("void main(){ vec3 n = gl_NormalMatrix * gl_Normal; mat4 m = gl_ModelViewProjectionMatrix; }").unwrap();
        let output = print(&transform(unit, ShaderStage::Fragment));

        assert_eq!(
            output,
            "uniform mat4 iris_ProjectionMatrix;\n\
             uniform mat4 iris_ModelViewMatrix;\n\
             uniform mat3 iris_NormalMatrix;\n\
             void main(){vec3 n=iris_NormalMatrix*gl_Normal;mat4 m=(iris_ProjectionMatrix*iris_ModelViewMatrix);}\n"
        );
    }

    #[test]
    fn test_unreferenced_builtins_inject_nothing() {
        let unit = parse("out vec4 color; void main(){ color = vec4(1.0); }").unwrap();
        assert_eq!(transform(unit.clone(), ShaderStage::Vertex), unit);
    }
}
