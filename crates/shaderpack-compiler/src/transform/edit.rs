//! Structural edits shared by the rewrite routines
//!
//! Every edit works on the parsed tree: declarations are matched by shape,
//! injected at fixed anchors, and identifier references are substituted with
//! replacement token sequences.

use super::ast::{Declaration, ExternalDeclaration, FunctionDefinition, FunctionPrototype, TranslationUnit};
use super::lexer::{Token, TokenKind, is_builtin_type, tokenize_snippet};
use super::parser::parse_declarations;

/// Where injected declarations are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionPoint {
    /// After any leading `#extension` and `#pragma` lines, before all other declarations
    BeforeDeclarations,
    /// After every existing declaration
    End,
}

/// Parses a fixed declaration template
///
/// Templates are compile-time constants, so a parse failure is a bug.
pub(crate) fn declarations(source: &str) -> Vec<ExternalDeclaration> {
    parse_declarations(source).unwrap_or_else(|err| panic!("invalid declaration template {source:?}: {err}"))
}

/// Tokenizes a fixed expression or statement template
pub(crate) fn snippet(source: &str) -> Vec<Token> {
    tokenize_snippet(source).unwrap_or_else(|err| panic!("invalid token template {source:?}: {err}"))
}

/// Removes every declaration that structurally equals `template`
///
/// # Returns
/// Whether anything was removed
pub fn remove_matching(unit: &mut TranslationUnit, template: &ExternalDeclaration) -> bool {
    let before = unit.declarations.len();
    unit.declarations.retain(|declaration| declaration != template);
    unit.declarations.len() != before
}

/// Removes global variable declarators named `name` with the given type
///
/// A declaration left with no declarators is dropped entirely.
///
/// # Returns
/// The number of declarators removed
pub fn remove_variable(unit: &mut TranslationUnit, type_name: &str, name: &str) -> usize {
    let mut removed = 0;

    unit.declarations.retain_mut(|declaration| {
        let ExternalDeclaration::Declaration(Declaration::Variables { ty, declarators, .. }) = declaration else {
            return true;
        };
        if !(ty.len() == 1 && ty[0].text == type_name) {
            return true;
        }
        let before = declarators.len();
        declarators.retain(|declarator| declarator.name != name);
        removed += before - declarators.len();
        !declarators.is_empty()
    });

    removed
}

/// Inserts declarations at an anchor, keeping their relative order
pub fn inject(unit: &mut TranslationUnit, point: InjectionPoint, declarations: impl IntoIterator<Item = ExternalDeclaration>) {
    let at = match point {
        InjectionPoint::BeforeDeclarations => unit
            .declarations
            .iter()
            .position(|declaration| !matches!(declaration, ExternalDeclaration::Extension { .. } | ExternalDeclaration::Pragma(_)))
            .unwrap_or(unit.declarations.len()),
        InjectionPoint::End => unit.declarations.len(),
    };
    unit.declarations.splice(at..at, declarations);
}

/// Returns true when `tokens` form a primary or postfix expression
///
/// Such expressions can replace an identifier without parentheses: a single
/// token, or a word followed only by calls, subscripts and member accesses.
fn is_postfix_expression(tokens: &[Token]) -> bool {
    let Some(first) = tokens.first() else {
        return false;
    };

    let mut i = if first.is_word() {
        1
    } else if first.is_punct("(") {
        match close_of(tokens, 0) {
            Some(close) => close + 1,
            None => return false,
        }
    } else {
        return false;
    };

    while i < tokens.len() {
        let token = &tokens[i];
        if token.is_punct("(") || token.is_punct("[") {
            match close_of(tokens, i) {
                Some(close) => i = close + 1,
                None => return false,
            }
        } else if token.is_punct(".") && tokens.get(i + 1).is_some_and(Token::is_word) {
            i += 2;
        } else {
            return false;
        }
    }

    true
}

fn close_of(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.is_punct("(") || token.is_punct("[") {
            depth += 1;
        } else if token.is_punct(")") || token.is_punct("]") {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn parenthesized(replacement: &[Token]) -> Vec<Token> {
    if is_postfix_expression(replacement) {
        return replacement.to_vec();
    }
    let mut tokens = Vec::with_capacity(replacement.len() + 2);
    tokens.push(Token::punct("("));
    tokens.extend(replacement.iter().cloned());
    tokens.push(Token::punct(")"));
    tokens
}

/// Returns true when the identifier at `i` is an expression reference
///
/// Excludes member names after `.`, function calls, and names declared by
/// local declarations, including the later declarators of `float a, b;`.
fn is_reference(tokens: &[Token], i: usize) -> bool {
    let previous = i.checked_sub(1).map(|p| &tokens[p]);
    if previous.is_some_and(|previous| previous.is_punct(".") || previous.is_type_name()) {
        return false;
    }
    if previous.is_some_and(|previous| previous.is_punct(",")) && is_later_declarator(tokens, i) {
        return false;
    }
    !tokens.get(i + 1).is_some_and(|next| next.is_punct("("))
}

/// Returns true when the identifier at `i`, preceded by a top-level `,`,
/// names a declarator of a local declaration statement
fn is_later_declarator(tokens: &[Token], i: usize) -> bool {
    let mut depth = 0usize;
    let mut start = 0;

    for p in (0..i).rev() {
        let token = &tokens[p];
        if token.is_punct(")") || token.is_punct("]") {
            depth += 1;
        } else if token.is_punct("(") || token.is_punct("[") {
            if depth > 0 {
                depth -= 1;
                continue;
            }
            // Only the init clause of a `for` header can declare
            if p > 0 && tokens[p - 1].is_keyword("for") {
                start = p + 1;
                break;
            }
            return false;
        } else if depth == 0 && (token.is_punct(";") || token.is_punct("{") || token.is_punct("}")) {
            start = p + 1;
            break;
        }
    }

    let mut s = start;
    while s < i && tokens[s].kind == TokenKind::Keyword && !is_builtin_type(&tokens[s].text) {
        s += 1;
    }
    if s >= i || !tokens[s].is_type_name() {
        return false;
    }
    s += 1;
    if tokens.get(s).is_some_and(|token| token.is_punct("[")) {
        match close_of(tokens, s) {
            Some(close) => s = close + 1,
            None => return false,
        }
    }
    s < i && tokens[s].is_identifier()
}

/// Replaces every expression reference to `name` with `replacement`
///
/// The replacement is parenthesized unless it is a primary or postfix
/// expression.
///
/// # Returns
/// The number of references replaced
pub fn replace_references(unit: &mut TranslationUnit, name: &str, replacement: &[Token]) -> usize {
    let replacement = parenthesized(replacement);
    let mut replaced = 0;

    unit.for_each_token_sequence_mut(|tokens| {
        let mut i = 0;
        while i < tokens.len() {
            if tokens[i].is_identifier_named(name) && is_reference(tokens, i) {
                tokens.splice(i..=i, replacement.iter().cloned());
                i += replacement.len();
                replaced += 1;
            } else {
                i += 1;
            }
        }
    });

    replaced
}

/// Replaces every zero-argument call `name()` with `replacement`
///
/// # Returns
/// The number of calls replaced
pub fn replace_calls(unit: &mut TranslationUnit, name: &str, replacement: &[Token]) -> usize {
    let replacement = parenthesized(replacement);
    let mut replaced = 0;

    unit.for_each_token_sequence_mut(|tokens| {
        let mut i = 0;
        while i + 2 < tokens.len() {
            let is_call = tokens[i].is_identifier_named(name) && tokens[i + 1].is_punct("(") && tokens[i + 2].is_punct(")");
            let is_member = i > 0 && tokens[i - 1].is_punct(".");
            if is_call && !is_member {
                tokens.splice(i..i + 3, replacement.iter().cloned());
                i += replacement.len();
                replaced += 1;
            } else {
                i += 1;
            }
        }
    });

    replaced
}

/// Renames every occurrence of an identifier, declared names included
pub fn rename(unit: &mut TranslationUnit, from: &str, to: &str) {
    unit.for_each_declared_name_mut(|name| {
        if name == from {
            *name = to.to_string();
        }
    });
    unit.for_each_token_sequence_mut(|tokens| {
        for token in tokens.iter_mut().filter(|token| token.is_identifier_named(from)) {
            token.text = to.to_string();
        }
    });
}

/// Renames `main` to `irisMain` and appends a new `main` running `prelude` first
///
/// Does nothing when the unit defines no `main`.
///
/// # Returns
/// Whether `main` was wrapped
pub fn wrap_main(unit: &mut TranslationUnit, prelude: &[Token]) -> bool {
    let Some(main) = unit.function_mut("main") else {
        return false;
    };
    main.prototype.name = "irisMain".to_string();

    let mut body = prelude.to_vec();
    body.extend(snippet("irisMain();"));
    unit.declarations.push(ExternalDeclaration::Function(FunctionDefinition {
        prototype: FunctionPrototype {
            return_type: vec![Token::word("void")],
            name: "main".to_string(),
            parameters: Vec::new(),
        },
        body,
    }));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::parser::parse;
    use crate::transform::printer::print;

    fn patched(source: &str, edit: impl FnOnce(&mut TranslationUnit)) -> String {
        let mut unit = parse(source).unwrap();
        edit(&mut unit);
        print(&unit)
    }

    #[test]
    fn test_remove_matching_and_inject() {
        let output = patched("#extension GL_ARB_foo : enable\nuniform float a;\nuniform float b;\n", |unit| {
            assert!(remove_matching(unit, &declarations("uniform float a;")[0]));
            assert!(!remove_matching(unit, &declarations("uniform int b;")[0]));
            inject(unit, InjectionPoint::BeforeDeclarations, declarations("in vec2 uv;"));
            inject(unit, InjectionPoint::End, declarations("out vec4 color;"));
        });

        assert_eq!(output, "#extension GL_ARB_foo : enable\nin vec2 uv;\nuniform float b;\nout vec4 color;\n");
    }

    #[test]
    fn test_remove_variable_keeps_other_declarators() {
        let output = patched("in vec4 entityColor, other;\nout vec4 entityColor;\nin vec3 entityColor;\n", |unit| {
            assert_eq!(remove_variable(unit, "vec4", "entityColor"), 2);
        });
        assert_eq!(output, "in vec4 other;\nin vec3 entityColor;\n");
    }

    #[test]
    fn test_replace_references_skips_members_calls_and_declarations() {
        let output = patched("void main(){ float depth = depth * 2.0; v.depth = depth(); x = depth; }", |unit| {
            assert_eq!(replace_references(unit, "depth", &snippet("a+b")), 2);
        });
        assert_eq!(output, "void main(){float depth=(a+b)*2.0;v.depth=depth();x=(a+b);}\n");
    }

    #[test]
    fn test_replace_references_skips_later_declarators() {
        let output = patched("void main(){ float a = f(b, depth), depth = 1.0; y = a, depth; for (int i = 0, depth = 2; i < depth; i++) {} }", |unit| {
            assert_eq!(replace_references(unit, "depth", &snippet("q")), 3);
        });
        assert_eq!(output, "void main(){float a=f(b,q),depth=1.0;y=a,q;for(int i=0,depth=2;i<q;i++){}}\n");
    }

    #[test]
    fn test_postfix_replacements_are_not_parenthesized() {
        assert!(is_postfix_expression(&snippet("texture(s, vec2(0.5)).r")));
        assert!(is_postfix_expression(&snippet("a[0].xy")));
        assert!(is_postfix_expression(&snippet("(a+b).x")));
        assert!(!is_postfix_expression(&snippet("a*b")));
        assert!(!is_postfix_expression(&snippet("-a")));
    }

    #[test]
    fn test_replace_calls_and_rename() {
        let output = patched("void main(){ gl_Position = ftransform(); }", |unit| {
            assert_eq!(replace_calls(unit, "ftransform", &snippet("p*m")), 1);
            rename(unit, "gl_Position", "pos");
        });
        assert_eq!(output, "void main(){pos=(p*m);}\n");
    }

    #[test]
    fn test_wrap_main() {
        let output = patched("void main(){ color = c; }", |unit| {
            assert!(wrap_main(unit, &snippet("c = vec4(1.0);")));
        });
        assert_eq!(output, "void irisMain(){color=c;}\nvoid main(){c=vec4(1.0);irisMain();}\n");

        let mut unit = parse("void helper(){}").unwrap();
        assert!(!wrap_main(&mut unit, &[]));
    }
}
