//! Vertex attribute adaptation
//!
//! Maps the legacy `gl_MultiTexCoordN` attributes onto what the renderer
//! actually supplies for the program, and plumbs the entity overlay color
//! through every stage when overlays are available.

use super::ast::TranslationUnit;
use super::edit::{self, InjectionPoint};
use super::index::IdentifierIndex;
use super::{AttributeParameters, ShaderStage};

const LIGHTMAP_COORDS: &[&str] = &["gl_MultiTexCoord1", "gl_MultiTexCoord2"];
const UNUSED_COORDS: &[&str] = &["gl_MultiTexCoord4", "gl_MultiTexCoord5", "gl_MultiTexCoord6", "gl_MultiTexCoord7"];
const EMPTY_COORD: &str = "vec4(0.0, 0.0, 0.0, 1.0)";
/// Full-bright lightmap coordinate used when no lightmap is bound
const FULL_BRIGHT_LIGHTMAP: &str = "vec4(240.0, 240.0, 0.0, 1.0)";
const MID_TEX_COORD: &str = "mc_midTexCoord";
const ENTITY_COLOR: &str = "entityColor";

/// Rewrites attribute accesses for the given stage and input availability
pub fn transform(mut unit: TranslationUnit, parameters: &AttributeParameters) -> TranslationUnit {
    let index = IdentifierIndex::build(&unit);

    if parameters.stage == ShaderStage::Vertex {
        patch_texture_coordinates(&mut unit, &index, parameters);
    }

    if parameters.inputs.overlay {
        patch_overlay(&mut unit, parameters);
    }

    unit
}

fn patch_texture_coordinates(unit: &mut TranslationUnit, index: &IdentifierIndex, parameters: &AttributeParameters) {
    let inputs = &parameters.inputs;

    let mut uses_lightmap = false;
    for coord in LIGHTMAP_COORDS.iter().filter(|coord| index.has(coord)) {
        if inputs.lightmap {
            uses_lightmap |= edit::replace_references(unit, coord, &edit::snippet("vec4(iris_UV2, 0.0, 1.0)")) > 0;
        } else {
            edit::replace_references(unit, coord, &edit::snippet(FULL_BRIGHT_LIGHTMAP));
        }
    }
    if uses_lightmap {
        edit::inject(unit, InjectionPoint::BeforeDeclarations, edit::declarations("in ivec2 iris_UV2;"));
    }

    if !inputs.texture && index.has("gl_MultiTexCoord0") {
        edit::replace_references(unit, "gl_MultiTexCoord0", &edit::snippet(EMPTY_COORD));
    }

    if index.has("gl_MultiTexCoord3") {
        if !index.has(MID_TEX_COORD) {
            edit::inject(unit, InjectionPoint::BeforeDeclarations, edit::declarations("in vec4 mc_midTexCoord;"));
        }
        edit::rename(unit, "gl_MultiTexCoord3", MID_TEX_COORD);
    }

    for coord in UNUSED_COORDS.iter().filter(|coord| index.has(coord)) {
        edit::replace_references(unit, coord, &edit::snippet(EMPTY_COORD));
    }
}

fn patch_overlay(unit: &mut TranslationUnit, parameters: &AttributeParameters) {
    edit::remove_variable(unit, "vec4", ENTITY_COLOR);

    match parameters.stage {
        ShaderStage::Vertex => {
            edit::inject(
                unit,
                InjectionPoint::BeforeDeclarations,
                edit::declarations("uniform sampler2D iris_overlay; in ivec2 iris_UV1; out vec4 entityColor;"),
            );
            edit::wrap_main(
                unit,
                &edit::snippet("vec4 overlayColor = texelFetch(iris_overlay, iris_UV1, 0); entityColor = vec4(overlayColor.rgb, 1.0 - overlayColor.a);"),
            );
        }
        ShaderStage::Geometry => {
            edit::inject(unit, InjectionPoint::BeforeDeclarations, edit::declarations("out vec4 entityColorGS; in vec4 entityColor[];"));
            edit::wrap_main(unit, &edit::snippet("entityColorGS = entityColor[0];"));
        }
        ShaderStage::Fragment if parameters.has_geometry => {
            edit::inject(unit, InjectionPoint::BeforeDeclarations, edit::declarations("in vec4 entityColorGS;"));
            edit::rename(unit, ENTITY_COLOR, "entityColorGS");
        }
        ShaderStage::Fragment => {
            edit::inject(unit, InjectionPoint::BeforeDeclarations, edit::declarations("in vec4 entityColor;"));
        }
    }
}
