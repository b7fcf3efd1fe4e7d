//! Legacy `centerDepthSmooth` uniform rewrite
//!
//! Older packs read the smoothed center depth as a float uniform. It is now
//! provided as a 1x1 texture, so the uniform becomes a sampler and every
//! read becomes a texture sample.

use std::sync::LazyLock;

use super::ast::{ExternalDeclaration, TranslationUnit};
use super::edit::{self, InjectionPoint};
use super::lexer::Token;

const CENTER_DEPTH_SMOOTH: &str = "centerDepthSmooth";

static CENTER_DEPTH_UNIFORM: LazyLock<ExternalDeclaration> = LazyLock::new(|| edit::declarations("uniform float centerDepthSmooth;").remove(0));
static CENTER_DEPTH_SAMPLER: LazyLock<Vec<ExternalDeclaration>> = LazyLock::new(|| edit::declarations("uniform sampler2D iris_centerDepthSmooth;"));
static CENTER_DEPTH_SAMPLE: LazyLock<Vec<Token>> = LazyLock::new(|| edit::snippet("texture(iris_centerDepthSmooth, vec2(0.5)).r"));

/// Replaces the `centerDepthSmooth` float uniform with a sampled texture
///
/// A no-op unless the exact declaration `uniform float centerDepthSmooth;`
/// is present, so applying it to its own output changes nothing.
pub fn transform(mut unit: TranslationUnit) -> TranslationUnit {
    if !edit::remove_matching(&mut unit, &CENTER_DEPTH_UNIFORM) {
        return unit;
    }

    edit::inject(&mut unit, InjectionPoint::BeforeDeclarations, CENTER_DEPTH_SAMPLER.iter().cloned());
    edit::replace_references(&mut unit, CENTER_DEPTH_SMOOTH, &CENTER_DEPTH_SAMPLE);
    unit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::parser::parse;
    use crate::transform::printer::print;

    #[test]
    fn test_rewrites_uniform_to_sampler() {
        let unit = parse("uniform float centerDepthSmooth; void main(){ x = centerDepthSmooth; }").unwrap();
        let output = transform(unit);

        assert_eq!(
            print(&output),
            "uniform sampler2D iris_centerDepthSmooth;\nvoid main(){x=texture(iris_centerDepthSmooth,vec2(0.5)).r;}\n"
        );
    }

    #[test]
    fn test_reapplying_is_a_no_op() {
        let once = transform(parse("#version 120\nuniform float centerDepthSmooth;\nfloat f(){ return centerDepthSmooth * 2.0; }").unwrap());
        let twice = transform(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_absent_declaration_is_a_no_op() {
        // A differently typed uniform does not match the legacy shape
        let unit = parse("uniform vec2 centerDepthSmooth; void main(){ x = centerDepthSmooth.x; }").unwrap();
        assert_eq!(transform(unit.clone()), unit);
    }

    #[test]
    fn test_local_declarator_names_are_kept() {
        let unit = parse("uniform float centerDepthSmooth; void main(){ float a = 1.0, centerDepthSmooth = 2.0; x = a; }").unwrap();
        assert_eq!(
            print(&transform(unit)),
            "uniform sampler2D iris_centerDepthSmooth;\nvoid main(){float a=1.0,centerDepthSmooth=2.0;x=a;}\n"
        );
    }

    #[test]
    fn test_injects_after_extensions() {
        let unit = parse("#version 330\n#extension GL_ARB_foo : enable\nuniform vec3 sunPosition;\nuniform float centerDepthSmooth;\n").unwrap();
        assert_eq!(
            print(&transform(unit)),
            "#version 330\n#extension GL_ARB_foo : enable\nuniform sampler2D iris_centerDepthSmooth;\nuniform vec3 sunPosition;\n"
        );
    }
}
