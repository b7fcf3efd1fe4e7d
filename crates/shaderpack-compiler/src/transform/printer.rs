//! Compact GLSL printer
//!
//! Writes one external declaration per line with the minimum whitespace that
//! keeps the token stream unchanged when it is lexed again.

use super::ast::{ExternalDeclaration, TranslationUnit};
use super::lexer::{Token, TokenKind, would_fuse};

/// Prints a translation unit back to compact source text
pub fn print(unit: &TranslationUnit) -> String {
    let mut output = String::new();

    if let Some(version) = &unit.version {
        output.push_str(&format!("#version {}", version.number));
        if let Some(profile) = &version.profile {
            output.push(' ');
            output.push_str(profile);
        }
        output.push('\n');
    }

    let mut tokens = Vec::new();
    for declaration in &unit.declarations {
        match declaration {
            ExternalDeclaration::Extension { name, behavior } => output.push_str(&format!("#extension {name} : {behavior}")),
            ExternalDeclaration::Pragma(body) => output.push_str(&format!("#pragma {body}")),
            ExternalDeclaration::Declaration(declaration) => {
                tokens.clear();
                declaration.write_tokens(&mut tokens);
                output.push_str(&print_tokens(&tokens));
            }
            ExternalDeclaration::Function(function) => {
                tokens.clear();
                function.write_tokens(&mut tokens);
                output.push_str(&print_tokens(&tokens));
            }
            ExternalDeclaration::Empty => output.push(';'),
        }
        output.push('\n');
    }

    output
}

/// Joins tokens, inserting a space only where two tokens would otherwise merge
pub fn print_tokens(tokens: &[Token]) -> String {
    let mut output = String::new();
    let mut previous: Option<&Token> = None;

    for token in tokens {
        if previous.is_some_and(|previous| needs_space(previous, token)) {
            output.push(' ');
        }
        output.push_str(&token.text);
        previous = Some(token);
    }

    output
}

fn needs_space(left: &Token, right: &Token) -> bool {
    if left.is_word() && right.is_word() {
        return true;
    }
    // `1.` followed by `.x` or a number followed by a member access
    if left.kind == TokenKind::Number && right.text.starts_with('.') {
        return true;
    }
    match (left.text.chars().last(), right.text.chars().next()) {
        (Some(l), Some(r)) if left.kind == TokenKind::Punct && right.kind == TokenKind::Punct => would_fuse(l, r),
        (Some(l), Some(r)) if left.kind == TokenKind::Punct && right.kind == TokenKind::Number => l == '.' && r.is_ascii_digit(),
        _ => false,
    }
}
