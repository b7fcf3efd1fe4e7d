//! GLSL syntax tree
//!
//! The tree is structured down to external declarations, declarators and
//! function prototypes. Expressions and statements stay as token sequences;
//! the rewrites only ever edit declarations and substitute identifiers.

use super::lexer::Token;

/// `#version <number> [profile]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionStatement {
    pub number: u32,
    pub profile: Option<String>,
}

/// A parsed shader stage source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationUnit {
    pub version: Option<VersionStatement>,
    pub declarations: Vec<ExternalDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalDeclaration {
    /// `#extension name : behavior`
    Extension { name: String, behavior: String },
    /// `#pragma body`
    Pragma(String),
    Declaration(Declaration),
    Function(FunctionDefinition),
    /// A stray `;`
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualifier {
    Keyword(String),
    /// Tokens between the parentheses of `layout(...)`
    Layout(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declarator {
    pub name: String,
    /// Array suffix tokens including brackets, e.g. `[ 4 ]`
    pub array: Vec<Token>,
    pub initializer: Option<Vec<Token>>,
}

impl Declarator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            array: Vec::new(),
            initializer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionPrototype {
    /// Qualifiers and return type
    pub return_type: Vec<Token>,
    pub name: String,
    /// Tokens between the parameter list parentheses
    pub parameters: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    pub prototype: FunctionPrototype,
    /// Tokens between the outer braces of the body
    pub body: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// `qualifiers type name [= init], ...;`
    Variables {
        qualifiers: Vec<Qualifier>,
        /// Type tokens, including a struct body or an array suffix on the type
        ty: Vec<Token>,
        declarators: Vec<Declarator>,
    },
    /// `qualifiers BlockName { fields } [instance];`
    Block {
        qualifiers: Vec<Qualifier>,
        name: String,
        fields: Vec<Token>,
        instance: Option<Declarator>,
    },
    /// `precision highp float;`, tokens without the semicolon
    Precision(Vec<Token>),
    Prototype(FunctionPrototype),
    /// Qualifiers applied to existing names, e.g. `invariant gl_Position;` or `layout(...) in;`
    Qualifiers { qualifiers: Vec<Qualifier>, names: Vec<String> },
    /// Any other declaration, tokens without the semicolon
    Other(Vec<Token>),
}

fn push_word(out: &mut Vec<Token>, text: &str) {
    out.push(Token::word(text));
}

fn push_punct(out: &mut Vec<Token>, text: &str) {
    out.push(Token::punct(text));
}

fn write_qualifiers(qualifiers: &[Qualifier], out: &mut Vec<Token>) {
    for qualifier in qualifiers {
        match qualifier {
            Qualifier::Keyword(keyword) => push_word(out, keyword),
            Qualifier::Layout(tokens) => {
                push_word(out, "layout");
                push_punct(out, "(");
                out.extend(tokens.iter().cloned());
                push_punct(out, ")");
            }
        }
    }
}

impl Declarator {
    fn write_tokens(&self, out: &mut Vec<Token>) {
        out.push(Token::identifier(self.name.clone()));
        out.extend(self.array.iter().cloned());
        if let Some(initializer) = &self.initializer {
            push_punct(out, "=");
            out.extend(initializer.iter().cloned());
        }
    }
}

impl FunctionPrototype {
    fn write_tokens(&self, out: &mut Vec<Token>) {
        out.extend(self.return_type.iter().cloned());
        out.push(Token::identifier(self.name.clone()));
        push_punct(out, "(");
        out.extend(self.parameters.iter().cloned());
        push_punct(out, ")");
    }
}

impl Declaration {
    /// Appends the tokens of this declaration, including the trailing `;`
    pub fn write_tokens(&self, out: &mut Vec<Token>) {
        match self {
            Declaration::Variables { qualifiers, ty, declarators } => {
                write_qualifiers(qualifiers, out);
                out.extend(ty.iter().cloned());
                for (i, declarator) in declarators.iter().enumerate() {
                    if i > 0 {
                        push_punct(out, ",");
                    }
                    declarator.write_tokens(out);
                }
            }
            Declaration::Block {
                qualifiers,
                name,
                fields,
                instance,
            } => {
                write_qualifiers(qualifiers, out);
                out.push(Token::identifier(name.clone()));
                push_punct(out, "{");
                out.extend(fields.iter().cloned());
                push_punct(out, "}");
                if let Some(instance) = instance {
                    instance.write_tokens(out);
                }
            }
            Declaration::Precision(tokens) | Declaration::Other(tokens) => out.extend(tokens.iter().cloned()),
            Declaration::Prototype(prototype) => prototype.write_tokens(out),
            Declaration::Qualifiers { qualifiers, names } => {
                write_qualifiers(qualifiers, out);
                for (i, name) in names.iter().enumerate() {
                    if i > 0 {
                        push_punct(out, ",");
                    }
                    out.push(Token::identifier(name.clone()));
                }
            }
        }
        push_punct(out, ";");
    }
}

impl FunctionDefinition {
    pub fn write_tokens(&self, out: &mut Vec<Token>) {
        self.prototype.write_tokens(out);
        push_punct(out, "{");
        out.extend(self.body.iter().cloned());
        push_punct(out, "}");
    }
}

impl TranslationUnit {
    /// Calls `visit` for every identifier occurrence, names included
    pub fn visit_identifiers(&self, mut visit: impl FnMut(&str)) {
        let mut tokens = Vec::new();
        for declaration in &self.declarations {
            tokens.clear();
            match declaration {
                ExternalDeclaration::Declaration(declaration) => declaration.write_tokens(&mut tokens),
                ExternalDeclaration::Function(function) => function.write_tokens(&mut tokens),
                _ => continue,
            }
            tokens.iter().filter(|token| token.is_identifier()).for_each(|token| visit(&token.text));
        }
    }

    /// Calls `edit` for every token sequence in which expressions can appear
    ///
    /// This covers initializers, array sizes, layout arguments, block fields,
    /// parameter lists and function bodies, but not declared names.
    pub fn for_each_token_sequence_mut(&mut self, mut edit: impl FnMut(&mut Vec<Token>)) {
        for declaration in &mut self.declarations {
            match declaration {
                ExternalDeclaration::Declaration(declaration) => declaration.for_each_token_sequence_mut(&mut edit),
                ExternalDeclaration::Function(function) => {
                    edit(&mut function.prototype.parameters);
                    edit(&mut function.body);
                }
                _ => {}
            }
        }
    }

    /// Calls `edit` for every declared name: variables, blocks, instances and functions
    pub fn for_each_declared_name_mut(&mut self, mut edit: impl FnMut(&mut String)) {
        for declaration in &mut self.declarations {
            match declaration {
                ExternalDeclaration::Declaration(Declaration::Variables { declarators, .. }) => declarators.iter_mut().for_each(|declarator| edit(&mut declarator.name)),
                ExternalDeclaration::Declaration(Declaration::Block { name, instance, .. }) => {
                    edit(name);
                    if let Some(instance) = instance {
                        edit(&mut instance.name);
                    }
                }
                ExternalDeclaration::Declaration(Declaration::Prototype(prototype)) => edit(&mut prototype.name),
                ExternalDeclaration::Declaration(Declaration::Qualifiers { names, .. }) => names.iter_mut().for_each(&mut edit),
                ExternalDeclaration::Function(function) => edit(&mut function.prototype.name),
                _ => {}
            }
        }
    }

    /// Returns the definition of a function by name
    pub fn function_mut(&mut self, name: &str) -> Option<&mut FunctionDefinition> {
        self.declarations.iter_mut().find_map(|declaration| match declaration {
            ExternalDeclaration::Function(function) if function.prototype.name == name => Some(function),
            _ => None,
        })
    }
}

impl Declaration {
    fn for_each_token_sequence_mut(&mut self, edit: &mut impl FnMut(&mut Vec<Token>)) {
        let qualifiers = match self {
            Declaration::Variables { qualifiers, ty, declarators } => {
                edit(ty);
                for declarator in declarators {
                    edit(&mut declarator.array);
                    if let Some(initializer) = &mut declarator.initializer {
                        edit(initializer);
                    }
                }
                qualifiers
            }
            Declaration::Block {
                qualifiers, fields, instance, ..
            } => {
                edit(fields);
                if let Some(instance) = instance {
                    edit(&mut instance.array);
                }
                qualifiers
            }
            Declaration::Qualifiers { qualifiers, .. } => qualifiers,
            Declaration::Prototype(prototype) => {
                edit(&mut prototype.parameters);
                return;
            }
            Declaration::Precision(_) => return,
            Declaration::Other(tokens) => {
                edit(tokens);
                return;
            }
        };

        for qualifier in qualifiers {
            if let Qualifier::Layout(tokens) = qualifier {
                edit(tokens);
            }
        }
    }
}
