//! GLSL parser
//!
//! Groups tokens into external declarations and classifies each group. Only
//! `#version`, `#extension` and `#pragma` may survive preprocessing; any other
//! directive means the source was not fully preprocessed and is rejected.

use super::ast::{Declaration, Declarator, ExternalDeclaration, FunctionDefinition, FunctionPrototype, Qualifier, TranslationUnit, VersionStatement};
use super::lexer::{Lexeme, Spanned, Token, TokenKind, tokenize};
use crate::error::TransformError;
use crate::predefined::PARSED_DIRECTIVES;

/// Qualifier keywords that may prefix a declaration
const QUALIFIER_KEYWORDS: &[&str] = &[
    "attribute", "buffer", "centroid", "coherent", "const", "flat", "highp", "in", "inout", "invariant", "lowp", "mediump", "noperspective", "out", "patch", "precise", "readonly",
    "restrict", "sample", "shared", "smooth", "uniform", "varying", "volatile", "writeonly",
];

/// Parses a complete shader source into a translation unit
pub fn parse(source: &str) -> Result<TranslationUnit, TransformError> {
    Parser::new(tokenize(source)?).translation_unit()
}

/// Parses a fragment of external declarations, such as an injection template
pub fn parse_declarations(source: &str) -> Result<Vec<ExternalDeclaration>, TransformError> {
    let unit = parse(source)?;
    if unit.version.is_some() {
        return Err(syntax(1, 1, "unexpected #version in declaration fragment"));
    }
    Ok(unit.declarations)
}

fn syntax(line: usize, column: usize, message: impl Into<String>) -> TransformError {
    TransformError::Syntax {
        line,
        column,
        message: message.into(),
    }
}

fn is_open(token: &Token) -> bool {
    token.is_punct("(") || token.is_punct("[") || token.is_punct("{")
}

fn closing_for(open: &str) -> &'static str {
    match open {
        "(" => ")",
        "[" => "]",
        _ => "}",
    }
}

/// Returns the index of the token closing the delimiter opened at `open`
fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if is_open(token) {
            depth += 1;
        } else if token.is_punct(")") || token.is_punct("]") || token.is_punct("}") {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Splits tokens at depth-zero commas
fn split_top_level_commas(tokens: &[Token]) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if is_open(token) {
            depth += 1;
        } else if token.is_punct(")") || token.is_punct("]") || token.is_punct("}") {
            depth -= 1;
        } else if depth == 0 && token.is_punct(",") {
            parts.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// A run of tokens forming one external declaration
struct Group {
    tokens: Vec<Token>,
    line: usize,
    column: usize,
    /// True when the group was terminated by a function body's closing brace
    is_function: bool,
}

struct Parser {
    lexemes: std::vec::IntoIter<Spanned>,
}

impl Parser {
    fn new(lexemes: Vec<Spanned>) -> Self {
        Self { lexemes: lexemes.into_iter() }
    }

    fn translation_unit(mut self) -> Result<TranslationUnit, TransformError> {
        let mut unit = TranslationUnit::default();
        let mut seen_anything = false;

        while let Some(spanned) = self.lexemes.next() {
            match spanned.lexeme {
                Lexeme::Directive { name, body } => {
                    if name.is_empty() {
                        continue;
                    }
                    if name == "version" {
                        if seen_anything {
                            return Err(syntax(spanned.line, spanned.column, "#version must occur before anything else"));
                        }
                        unit.version = Some(parse_version(&body, spanned.line, spanned.column)?);
                    } else if !PARSED_DIRECTIVES.contains(&name.as_str()) {
                        return Err(TransformError::DisallowedDirective {
                            directive: format!("#{name}"),
                            line: spanned.line,
                        });
                    } else if name == "extension" {
                        let (extension, behavior) = body
                            .split_once(':')
                            .ok_or_else(|| syntax(spanned.line, spanned.column, "expected '#extension name : behavior'"))?;
                        unit.declarations.push(ExternalDeclaration::Extension {
                            name: extension.trim().to_string(),
                            behavior: behavior.trim().to_string(),
                        });
                    } else {
                        unit.declarations.push(ExternalDeclaration::Pragma(body));
                    }
                }
                Lexeme::Token(token) => {
                    let group = self.group(token, spanned.line, spanned.column)?;
                    unit.declarations.push(classify(group)?);
                }
            }
            seen_anything = true;
        }

        Ok(unit)
    }

    /// Collects tokens up to a depth-zero `;` or the closing brace of a function body
    fn group(&mut self, first: Token, line: usize, column: usize) -> Result<Group, TransformError> {
        let mut tokens = Vec::new();
        // For each open delimiter: its text and whether it opens a function body
        let mut open: Vec<(String, bool)> = Vec::new();
        let mut next = Some((first, line, column));

        while let Some((token, token_line, token_column)) = next {
            if is_open(&token) {
                let opens_body = token.is_punct("{") && open.is_empty() && tokens.last().is_some_and(|last: &Token| last.is_punct(")"));
                open.push((token.text.clone(), opens_body));
            } else if token.is_punct(")") || token.is_punct("]") || token.is_punct("}") {
                match open.pop() {
                    Some((opened, opens_body)) if closing_for(&opened) == token.text => {
                        if opens_body {
                            tokens.push(token);
                            return Ok(Group {
                                tokens,
                                line,
                                column,
                                is_function: true,
                            });
                        }
                    }
                    _ => return Err(syntax(token_line, token_column, format!("unbalanced '{}'", token.text))),
                }
            } else if token.is_punct(";") && open.is_empty() {
                tokens.push(token);
                return Ok(Group {
                    tokens,
                    line,
                    column,
                    is_function: false,
                });
            }
            tokens.push(token);

            next = match self.lexemes.next() {
                Some(Spanned {
                    lexeme: Lexeme::Token(token),
                    line,
                    column,
                }) => Some((token, line, column)),
                Some(Spanned {
                    lexeme: Lexeme::Directive { name, .. },
                    line,
                    column,
                }) => return Err(syntax(line, column, format!("preprocessor directive '#{name}' inside a declaration"))),
                None => None,
            };
        }

        Err(syntax(line, column, "unexpected end of input in declaration"))
    }
}

fn parse_version(body: &str, line: usize, column: usize) -> Result<VersionStatement, TransformError> {
    let mut parts = body.split_whitespace();
    let number = parts
        .next()
        .and_then(|number| number.parse::<u32>().ok())
        .ok_or_else(|| syntax(line, column, format!("invalid #version '{body}'")))?;
    let profile = parts.next().map(str::to_string);
    if parts.next().is_some() {
        return Err(syntax(line, column, format!("invalid #version '{body}'")));
    }
    Ok(VersionStatement { number, profile })
}

fn classify(group: Group) -> Result<ExternalDeclaration, TransformError> {
    let Group {
        mut tokens,
        line,
        column,
        is_function,
    } = group;

    if is_function {
        let body_open = body_open(&tokens).ok_or_else(|| syntax(line, column, "function definition without a body"))?;
        let body = tokens[body_open + 1..tokens.len() - 1].to_vec();
        tokens.truncate(body_open);
        let prototype = parse_prototype(&tokens).ok_or_else(|| syntax(line, column, "malformed function prototype"))?;
        return Ok(ExternalDeclaration::Function(FunctionDefinition { prototype, body }));
    }

    tokens.pop();
    if tokens.is_empty() {
        return Ok(ExternalDeclaration::Empty);
    }

    Ok(ExternalDeclaration::Declaration(classify_declaration(tokens)))
}

/// Returns the index of the `{` matching the closing `}` of a function group
fn body_open(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().rev() {
        if token.is_punct("}") {
            depth += 1;
        } else if token.is_punct("{") {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Words and array brackets, or an inline `struct` specifier
fn is_return_type(tokens: &[Token]) -> bool {
    if tokens.first().is_some_and(|token| token.is_keyword("struct")) {
        return tokens.last().is_some_and(|token| token.is_punct("}") || token.is_word());
    }
    tokens.iter().all(|token| token.is_word() || token.is_punct("[") || token.is_punct("]"))
}

fn parse_prototype(tokens: &[Token]) -> Option<FunctionPrototype> {
    let open = tokens.iter().position(|token| token.is_punct("("))?;
    if open < 2 || matching_close(tokens, open)? != tokens.len() - 1 {
        return None;
    }
    let name = &tokens[open - 1];
    let return_type = &tokens[..open - 1];
    if !name.is_identifier() || !is_return_type(return_type) {
        return None;
    }
    Some(FunctionPrototype {
        return_type: return_type.to_vec(),
        name: name.text.clone(),
        parameters: tokens[open + 1..tokens.len() - 1].to_vec(),
    })
}

fn classify_declaration(tokens: Vec<Token>) -> Declaration {
    if tokens.first().is_some_and(|token| token.is_keyword("precision")) {
        return Declaration::Precision(tokens);
    }

    let Some((qualifiers, rest_start)) = parse_qualifiers(&tokens) else {
        return Declaration::Other(tokens);
    };
    let rest = &tokens[rest_start..];

    if rest.is_empty() {
        return Declaration::Qualifiers { qualifiers, names: Vec::new() };
    }

    if !qualifiers.is_empty() {
        let parts = split_top_level_commas(rest);
        if parts.iter().all(|part| part.len() == 1 && part[0].is_identifier()) {
            let names = parts.iter().map(|part| part[0].text.clone()).collect();
            return Declaration::Qualifiers { qualifiers, names };
        }

        if let Some(block) = parse_block(&qualifiers, rest) {
            return block;
        }
    }

    if let Some(prototype) = parse_prototype(rest) {
        if qualifiers.is_empty() {
            return Declaration::Prototype(prototype);
        }
    }

    match parse_variables(rest) {
        Some((ty, declarators)) => Declaration::Variables { qualifiers, ty, declarators },
        None => Declaration::Other(tokens),
    }
}

/// Parses leading qualifiers, returning them with the index of the first other token
fn parse_qualifiers(tokens: &[Token]) -> Option<(Vec<Qualifier>, usize)> {
    let mut qualifiers = Vec::new();
    let mut i = 0;

    while let Some(token) = tokens.get(i) {
        if token.is_keyword("layout") {
            let open = i + 1;
            if !tokens.get(open).is_some_and(|token| token.is_punct("(")) {
                return None;
            }
            let close = matching_close(tokens, open)?;
            qualifiers.push(Qualifier::Layout(tokens[open + 1..close].to_vec()));
            i = close + 1;
        } else if token.kind == TokenKind::Keyword && QUALIFIER_KEYWORDS.contains(&token.text.as_str()) {
            qualifiers.push(Qualifier::Keyword(token.text.clone()));
            i += 1;
        } else {
            break;
        }
    }

    Some((qualifiers, i))
}

fn parse_block(qualifiers: &[Qualifier], rest: &[Token]) -> Option<Declaration> {
    let name = rest.first().filter(|token| token.is_identifier())?;
    if !rest.get(1).is_some_and(|token| token.is_punct("{")) {
        return None;
    }
    let close = matching_close(rest, 1)?;
    let instance = match &rest[close + 1..] {
        [] => None,
        declarator => Some(parse_declarator(declarator)?),
    };
    Some(Declaration::Block {
        qualifiers: qualifiers.to_vec(),
        name: name.text.clone(),
        fields: rest[2..close].to_vec(),
        instance,
    })
}

/// Parses `type declarator, declarator, ...`
fn parse_variables(rest: &[Token]) -> Option<(Vec<Token>, Vec<Declarator>)> {
    let mut type_end = if rest.first()?.is_keyword("struct") {
        let open = rest.iter().position(|token| token.is_punct("{"))?;
        matching_close(rest, open)? + 1
    } else if rest[0].is_type_name() {
        1
    } else {
        return None;
    };

    while rest.get(type_end).is_some_and(|token| token.is_punct("[")) {
        type_end = matching_close(rest, type_end)? + 1;
    }

    let ty = rest[..type_end].to_vec();
    let declarators = &rest[type_end..];
    if declarators.is_empty() {
        // A bare struct definition declares no variables
        return ty.first().is_some_and(|token| token.is_keyword("struct")).then(|| (ty, Vec::new()));
    }

    let declarators = split_top_level_commas(declarators).into_iter().map(parse_declarator).collect::<Option<Vec<_>>>()?;
    Some((ty, declarators))
}

/// Parses `name [array]... [= initializer]`
fn parse_declarator(tokens: &[Token]) -> Option<Declarator> {
    let name = tokens.first().filter(|token| token.is_identifier())?;
    let mut i = 1;
    while tokens.get(i).is_some_and(|token| token.is_punct("[")) {
        i = matching_close(tokens, i)? + 1;
    }
    let initializer = match tokens.get(i) {
        None => None,
        Some(token) if token.is_punct("=") && tokens.len() > i + 1 => Some(tokens[i + 1..].to_vec()),
        Some(_) => return None,
    };
    Some(Declarator {
        name: name.text.clone(),
        array: tokens[1..i].to_vec(),
        initializer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::lexer::tokenize_snippet;

    fn declaration(source: &str) -> Declaration {
        match parse_declarations(source).unwrap().remove(0) {
            ExternalDeclaration::Declaration(declaration) => declaration,
            other => panic!("expected a declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_version_and_directives() {
        let unit = parse("#version 330 core\n#extension GL_ARB_shader_texture_lod : require\n#pragma optimize(on)\nvoid main() {}").unwrap();

        assert_eq!(
            unit.version,
            Some(VersionStatement {
                number: 330,
                profile: Some("core".to_string()),
            })
        );
        assert_eq!(
            unit.declarations[0],
            ExternalDeclaration::Extension {
                name: "GL_ARB_shader_texture_lod".to_string(),
                behavior: "require".to_string(),
            }
        );
        assert_eq!(unit.declarations[1], ExternalDeclaration::Pragma("optimize(on)".to_string()));
        assert!(matches!(unit.declarations[2], ExternalDeclaration::Function(_)));
    }

    #[test]
    fn test_disallowed_directive() {
        assert_eq!(
            parse("uniform float a;\n#define FOO 1\n"),
            Err(TransformError::DisallowedDirective {
                directive: "#define".to_string(),
                line: 2,
            })
        );
        assert!(matches!(parse("#ifdef FOO\n#endif\n"), Err(TransformError::DisallowedDirective { .. })));
    }

    #[test]
    fn test_misplaced_version_and_directive() {
        assert!(matches!(parse("float a;\n#version 120\n"), Err(TransformError::Syntax { line: 2, .. })));
        assert!(matches!(parse("void main() {\n#pragma unroll\n}"), Err(TransformError::Syntax { line: 2, .. })));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse("void main() { x = (1; }"), Err(TransformError::Syntax { .. })));
        assert!(matches!(parse("uniform float a"), Err(TransformError::Syntax { .. })));
        assert!(matches!(parse("float a = b);"), Err(TransformError::Syntax { .. })));
    }

    #[test]
    fn test_parse_variables() {
        let parsed = declaration("uniform highp float a, b[2] = float[](1.0, 2.0);");
        let Declaration::Variables { qualifiers, ty, declarators } = parsed else {
            panic!("expected variables");
        };

        assert_eq!(qualifiers, vec![Qualifier::Keyword("uniform".to_string()), Qualifier::Keyword("highp".to_string())]);
        assert_eq!(ty, tokenize_snippet("float").unwrap());
        assert_eq!(declarators.len(), 2);
        assert_eq!(declarators[0], Declarator::new("a"));
        assert_eq!(declarators[1].name, "b");
        assert_eq!(declarators[1].array, tokenize_snippet("[2]").unwrap());
        assert_eq!(declarators[1].initializer, Some(tokenize_snippet("float[](1.0, 2.0)").unwrap()));
    }

    #[test]
    fn test_parse_layout_block_and_qualifiers() {
        let Declaration::Variables { qualifiers, .. } = declaration("layout(location = 0) out vec4 color;") else {
            panic!("expected variables");
        };
        assert_eq!(qualifiers[0], Qualifier::Layout(tokenize_snippet("location = 0").unwrap()));

        let Declaration::Block { name, fields, instance, .. } = declaration("uniform Matrices { mat4 mvp; } matrices;") else {
            panic!("expected block");
        };
        assert_eq!(name, "Matrices");
        assert_eq!(fields, tokenize_snippet("mat4 mvp;").unwrap());
        assert_eq!(instance, Some(Declarator::new("matrices")));

        assert_eq!(
            declaration("invariant gl_Position;"),
            Declaration::Qualifiers {
                qualifiers: vec![Qualifier::Keyword("invariant".to_string())],
                names: vec!["gl_Position".to_string()],
            }
        );
        assert!(matches!(declaration("layout(local_size_x = 8) in;"), Declaration::Qualifiers { names, .. } if names.is_empty()));
    }

    #[test]
    fn test_parse_prototype_struct_and_precision() {
        assert!(matches!(declaration("vec3 shade(vec3 color, float amount);"), Declaration::Prototype(p) if p.name == "shade"));
        assert!(matches!(declaration("precision mediump float;"), Declaration::Precision(_)));

        let Declaration::Variables { ty, declarators, .. } = declaration("struct Light { vec3 pos; float power; } lights[4];") else {
            panic!("expected struct variables");
        };
        assert!(ty[0].is_keyword("struct"));
        assert_eq!(declarators[0].name, "lights");
    }

    #[test]
    fn test_parse_function_definition() {
        let unit = parse("float luma(vec3 c) { return dot(c, vec3(0.299, 0.587, 0.114)); }\n;").unwrap();
        let ExternalDeclaration::Function(function) = &unit.declarations[0] else {
            panic!("expected function");
        };

        assert_eq!(function.prototype.name, "luma");
        assert_eq!(function.prototype.return_type, tokenize_snippet("float").unwrap());
        assert_eq!(function.prototype.parameters, tokenize_snippet("vec3 c").unwrap());
        assert_eq!(function.body[0], Token::word("return"));
        assert_eq!(unit.declarations[1], ExternalDeclaration::Empty);
    }

    #[test]
    fn test_parse_function_with_struct_return_type() {
        let unit = parse("struct L { vec3 c; } mk(){ L l; return l; }").unwrap();
        let ExternalDeclaration::Function(function) = &unit.declarations[0] else {
            panic!("expected function");
        };

        assert_eq!(function.prototype.name, "mk");
        assert_eq!(function.prototype.return_type, tokenize_snippet("struct L { vec3 c; }").unwrap());
        assert!(function.prototype.parameters.is_empty());
        assert_eq!(function.body, tokenize_snippet("L l; return l;").unwrap());
    }

    #[test]
    fn test_templates_match_structurally() {
        let template = parse_declarations("uniform float centerDepthSmooth;").unwrap();
        let source = parse("uniform   float\ncenterDepthSmooth ; // comment").unwrap();
        assert_eq!(source.declarations, template);
    }
}
