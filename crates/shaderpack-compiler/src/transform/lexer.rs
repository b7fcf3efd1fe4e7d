//! GLSL tokenizer
//!
//! Splits preprocessed GLSL source into tokens and line directives. Comments
//! are dropped. Token equality ignores source positions so that parsed
//! templates can be compared structurally against author code.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::TransformError;

static BUILTIN_TYPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(void|bool|int|uint|float|double|atomic_uint|[biud]?vec[234]|d?mat[234](x[234])?|[iu]?(sampler|image|texture)(1D|2D|3D|Cube|2DRect|Buffer)\w*)$")
        .expect("valid builtin type pattern")
});

/// Reserved words that are not type names
const KEYWORDS: &[&str] = &[
    "attribute", "break", "buffer", "case", "centroid", "coherent", "const", "continue", "default", "discard", "do", "else", "false", "flat", "for", "highp", "if", "in", "inout",
    "invariant", "layout", "lowp", "mediump", "noperspective", "out", "patch", "precise", "precision", "readonly", "restrict", "return", "sample", "shared", "smooth", "struct",
    "subroutine", "switch", "true", "uniform", "varying", "volatile", "while", "writeonly",
];

/// Punctuators, longest first so the first match is the longest one
const PUNCTUATORS: &[&str] = &[
    "<<=", ">>=", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "^^", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "+", "-", "*", "/", "%", "<", ">", "=", "!", "&",
    "|", "^", "~", "?", ":", ";", ",", ".", "(", ")", "[", "]", "{", "}",
];

/// Returns true for built-in type names such as `vec4` or `sampler2D`
pub fn is_builtin_type(name: &str) -> bool {
    BUILTIN_TYPE_PATTERN.is_match(name)
}

/// Returns true when `text` is a strict prefix of some punctuator or starts a comment
pub(crate) fn would_fuse(left: char, right: char) -> bool {
    let joined: String = [left, right].iter().collect();
    joined == "//" || joined == "/*" || PUNCTUATORS.iter().any(|punct| punct.starts_with(joined.as_str()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    /// Reserved word or built-in type name
    Keyword,
    Number,
    Punct,
}

/// A GLSL token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }

    /// Creates a word token, classifying it as keyword or identifier
    pub fn word(text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = if KEYWORDS.contains(&text.as_str()) || is_builtin_type(&text) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        Self { kind, text }
    }

    pub fn identifier(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Identifier, text)
    }

    pub fn punct(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Punct, text)
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    pub fn is_identifier_named(&self, name: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == name
    }

    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == text
    }

    /// Identifiers, keywords and numbers
    pub fn is_word(&self) -> bool {
        self.kind != TokenKind::Punct
    }

    /// A token that can name a type: a built-in type or a user identifier
    pub fn is_type_name(&self) -> bool {
        self.kind == TokenKind::Identifier || (self.kind == TokenKind::Keyword && is_builtin_type(&self.text))
    }
}

/// A lexed item: an ordinary token or a whole preprocessor line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lexeme {
    Token(Token),
    /// `#name body`, with line continuations joined
    Directive { name: String, body: String },
}

/// A lexeme with the 1-based position where it starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub lexeme: Lexeme,
    pub line: usize,
    pub column: usize,
}

struct Lexer<'a> {
    chars: Vec<char>,
    source: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            source,
            offset: 0,
            line: 1,
            column: 1,
            at_line_start: true,
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.offset + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.offset += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> TransformError {
        TransformError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    fn run(mut self) -> Result<Vec<Spanned>, TransformError> {
        let mut lexemes = Vec::new();

        while let Some(c) = self.peek(0) {
            let (line, column) = (self.line, self.column);

            if c.is_whitespace() {
                self.bump();
                continue;
            }

            if c == '/' && self.peek(1) == Some('/') {
                while self.peek(0).is_some_and(|c| c != '\n') {
                    self.bump();
                }
                continue;
            }

            if c == '/' && self.peek(1) == Some('*') {
                self.skip_block_comment(line, column)?;
                continue;
            }

            if c == '#' {
                if !self.at_line_start {
                    return Err(self.error(line, column, "'#' must start a preprocessor line"));
                }
                let lexeme = self.directive();
                lexemes.push(Spanned { lexeme, line, column });
                continue;
            }

            self.at_line_start = false;

            let token = if c.is_ascii_alphabetic() || c == '_' {
                Token::word(self.take_while(|c| c.is_ascii_alphanumeric() || c == '_'))
            } else if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|c| c.is_ascii_digit())) {
                Token::new(TokenKind::Number, self.number())
            } else if let Some(punct) = self.punctuator() {
                Token::punct(punct)
            } else {
                return Err(self.error(line, column, format!("unexpected character '{c}'")));
            };

            lexemes.push(Spanned {
                lexeme: Lexeme::Token(token),
                line,
                column,
            });
        }

        Ok(lexemes)
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek(0).filter(|c| predicate(*c)) {
            text.push(c);
            self.bump();
        }
        text
    }

    fn skip_block_comment(&mut self, line: usize, column: usize) -> Result<(), TransformError> {
        let at_line_start = self.at_line_start;
        self.bump();
        self.bump();
        loop {
            match self.peek(0) {
                Some('*') if self.peek(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    // A comment does not end the leading whitespace of a line
                    self.at_line_start = at_line_start || self.at_line_start;
                    return Ok(());
                }
                Some(_) => {
                    self.bump();
                }
                None => return Err(self.error(line, column, "unterminated block comment")),
            }
        }
    }

    fn number(&mut self) -> String {
        let mut text = String::new();

        if self.peek(0) == Some('0') && matches!(self.peek(1), Some('x' | 'X')) {
            text.push_str(&self.take_while(|c| c == '0' || c == 'x' || c == 'X'));
            text.push_str(&self.take_while(|c| c.is_ascii_hexdigit()));
        } else {
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
            if self.peek(0) == Some('.') {
                self.bump();
                text.push('.');
                text.push_str(&self.take_while(|c| c.is_ascii_digit()));
            }
            let exponent_digit = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());
            if matches!(self.peek(0), Some('e' | 'E'))
                && (exponent_digit(self.peek(1)) || (matches!(self.peek(1), Some('+' | '-')) && exponent_digit(self.peek(2))))
            {
                text.extend(self.bump());
                if matches!(self.peek(0), Some('+' | '-')) {
                    text.extend(self.bump());
                }
                text.push_str(&self.take_while(|c| c.is_ascii_digit()));
            }
        }

        if matches!((self.peek(0), self.peek(1)), (Some('l'), Some('f')) | (Some('L'), Some('F'))) {
            text.extend(self.bump());
            text.extend(self.bump());
        } else if matches!(self.peek(0), Some('u' | 'U' | 'f' | 'F')) {
            text.extend(self.bump());
        }

        text
    }

    fn punctuator(&mut self) -> Option<&'static str> {
        let punct = PUNCTUATORS
            .iter()
            .find(|punct| punct.chars().enumerate().all(|(i, c)| self.peek(i) == Some(c)))
            .copied()?;
        for _ in 0..punct.len() {
            self.bump();
        }
        Some(punct)
    }

    fn directive(&mut self) -> Lexeme {
        self.bump();
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            if c == '\\' && self.peek(1) == Some('\n') {
                self.bump();
                self.bump();
                text.push(' ');
                continue;
            }
            if c == '\n' {
                break;
            }
            text.push(c);
            self.bump();
        }

        if let Some(comment) = text.find("//") {
            text.truncate(comment);
        }

        let text = text.trim();
        let name_len = text.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).unwrap_or(text.len());
        let (name, body) = text.split_at(name_len);

        Lexeme::Directive {
            name: name.to_string(),
            body: body.trim().to_string(),
        }
    }
}

/// Splits GLSL source into lexemes with their positions
///
/// # Errors
/// Returns a syntax error for characters outside the GLSL alphabet, a `#`
/// that does not start a line, or an unterminated block comment.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, TransformError> {
    let lexer = Lexer::new(source);
    tracing::trace!(chars = lexer.source.len(), "tokenizing shader source");
    lexer.run()
}

/// Tokenizes a directive-free snippet into plain tokens
pub fn tokenize_snippet(source: &str) -> Result<Vec<Token>, TransformError> {
    tokenize(source)?
        .into_iter()
        .map(|spanned| match spanned.lexeme {
            Lexeme::Token(token) => Ok(token),
            Lexeme::Directive { name, .. } => Err(TransformError::Syntax {
                line: spanned.line,
                column: spanned.column,
                message: format!("unexpected directive '#{name}'"),
            }),
        })
        .collect()
}
