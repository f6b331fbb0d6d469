use std::fmt;

use logos::{Lexer, Logos};
use serde::Serialize;

use crate::span::SourceLocation;

/// Problems found inside a single token by a lexer callback. Drained by
/// [`tokenize`](super::tokenize) after every token.
#[derive(Debug, Clone, Default)]
pub struct LexExtras {
    /// Decoded text of the last string literal.
    pub text: Option<String>,
    pub faults: Vec<LexFault>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexFault {
    pub offset: usize,
    pub message: &'static str,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[logos(extras = LexExtras)]
#[logos(skip r"[ \t\r]+")]
pub enum TokenKind {
    // Keywords
    #[token("program")]
    Program,
    #[token("device")]
    Device,
    #[token("const")]
    Const,
    #[token("buffer")]
    Buffer,
    #[token("let")]
    Let,
    #[token("loop")]
    Loop,
    #[token("endloop")]
    Endloop,
    #[token("in")]
    In,
    #[token("out")]
    Out,
    #[token("include")]
    Include,
    #[token("transfer")]
    Transfer,
    #[token("store")]
    Store,
    #[token("wait")]
    Wait,
    #[token("region")]
    Region,
    #[token("extends")]
    Extends,
    #[token("type_family")]
    TypeFamily,
    #[token("opcode")]
    Opcode,
    #[token("topology")]
    Topology,
    #[token("mandatory")]
    Mandatory,
    #[token("extended")]
    Extended,
    #[token("spec_version")]
    SpecVersion,

    // Element types
    #[token("i4")]
    I4,
    #[token("i8")]
    I8,
    #[token("i16")]
    I16,
    #[token("i32")]
    I32,
    #[token("u8")]
    U8,
    #[token("u16")]
    U16,
    #[token("u32")]
    U32,
    #[token("f16")]
    F16,
    #[token("bf16")]
    Bf16,
    #[token("tf32")]
    Tf32,
    #[token("f32")]
    F32,
    #[token("f64")]
    F64,
    #[token("bool")]
    Bool,

    // Memory levels
    #[token("DDR")]
    Ddr,
    #[token("L2")]
    L2,
    #[token("L1")]
    L1,

    // Attribute keywords
    #[token("size")]
    Size,
    #[token("align")]
    Align,
    #[token("elem")]
    Elem,
    #[token("shape")]
    Shape,
    #[token("layout")]
    Layout,
    #[token("strides")]
    Strides,
    #[token("quant")]
    Quant,
    #[token("deps")]
    Deps,
    #[token("async")]
    Async,
    #[token("sync")]
    Sync,

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("mod")]
    Mod,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token("=")]
    Equals,
    #[token("@")]
    At,
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,

    // Literals
    #[regex(r"[0-9]+")]
    IntLit,
    // A float needs a digit after the '.', so `0..T` stays INT DOTDOT IDENT.
    #[regex(r"[0-9]+\.[0-9]+", lex_exponent)]
    FloatLit,
    #[token("\"", lex_string)]
    StringLit,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[token("\n")]
    Newline,

    // Comments (skipped by tokenize)
    #[regex(r"#[^\n]*")]
    Comment,

    /// Appended by `tokenize`; never produced by the scanner.
    Eof,
}

/// Consume an optional `[eE][+-]?[0-9]+` suffix after the fractional part.
/// A marker without digits is reported but the token keeps what was read.
fn lex_exponent(lex: &mut Lexer<TokenKind>) -> bool {
    let rest = lex.remainder().as_bytes();
    if !matches!(rest.first(), Some(b'e' | b'E')) {
        return true;
    }
    let mut marker = 1;
    if matches!(rest.get(1), Some(b'+' | b'-')) {
        marker += 1;
    }
    let digits = rest[marker..].iter().take_while(|b| b.is_ascii_digit()).count();
    lex.bump(marker + digits);
    if digits == 0 {
        let offset = lex.span().end;
        lex.extras.faults.push(LexFault {
            offset,
            message: "Expected digits after exponent in float literal",
        });
    }
    true
}

/// Scan a string body after the opening quote. The decoded lexeme (quotes
/// included, closing quote only when present) goes to `extras.text`.
fn lex_string(lex: &mut Lexer<TokenKind>) -> bool {
    let open = lex.span().start;
    let rest = lex.remainder();
    let mut text = String::from("\"");
    let mut consumed = rest.len();
    let mut closed = false;
    let mut chars = rest.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                text.push('"');
                consumed = i + 1;
                closed = true;
                break;
            }
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, '\\')) => text.push('\\'),
                Some((_, '"')) => text.push('"'),
                Some((_, other)) => {
                    text.push('\\');
                    text.push(other);
                }
                None => {
                    lex.extras.faults.push(LexFault {
                        offset: open + 1 + rest.len(),
                        message: "Unterminated escape in string literal",
                    });
                    break;
                }
            },
            '\n' => {
                // The newline belongs to the broken literal.
                lex.extras.faults.push(LexFault {
                    offset: open,
                    message: "Unterminated string literal (newline in string)",
                });
                consumed = i + 1;
                closed = true;
                break;
            }
            _ => text.push(c),
        }
    }

    if !closed {
        lex.extras.faults.push(LexFault { offset: open, message: "Unterminated string literal" });
    }
    lex.bump(consumed);
    lex.extras.text = Some(text);
    true
}

impl TokenKind {
    /// Upper-case kind name, as printed by `nemc lex`.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Program => "PROGRAM",
            TokenKind::Device => "DEVICE",
            TokenKind::Const => "CONST",
            TokenKind::Buffer => "BUFFER",
            TokenKind::Let => "LET",
            TokenKind::Loop => "LOOP",
            TokenKind::Endloop => "ENDLOOP",
            TokenKind::In => "IN",
            TokenKind::Out => "OUT",
            TokenKind::Include => "INCLUDE",
            TokenKind::Transfer => "TRANSFER",
            TokenKind::Store => "STORE",
            TokenKind::Wait => "WAIT",
            TokenKind::Region => "REGION",
            TokenKind::Extends => "EXTENDS",
            TokenKind::TypeFamily => "TYPE_FAMILY",
            TokenKind::Opcode => "OPCODE",
            TokenKind::Topology => "TOPOLOGY",
            TokenKind::Mandatory => "MANDATORY",
            TokenKind::Extended => "EXTENDED",
            TokenKind::SpecVersion => "SPEC_VERSION",
            TokenKind::I4 => "I4",
            TokenKind::I8 => "I8",
            TokenKind::I16 => "I16",
            TokenKind::I32 => "I32",
            TokenKind::U8 => "U8",
            TokenKind::U16 => "U16",
            TokenKind::U32 => "U32",
            TokenKind::F16 => "F16",
            TokenKind::Bf16 => "BF16",
            TokenKind::Tf32 => "TF32",
            TokenKind::F32 => "F32",
            TokenKind::F64 => "F64",
            TokenKind::Bool => "BOOL",
            TokenKind::Ddr => "DDR",
            TokenKind::L2 => "L2",
            TokenKind::L1 => "L1",
            TokenKind::Size => "SIZE",
            TokenKind::Align => "ALIGN",
            TokenKind::Elem => "ELEM",
            TokenKind::Shape => "SHAPE",
            TokenKind::Layout => "LAYOUT",
            TokenKind::Strides => "STRIDES",
            TokenKind::Quant => "QUANT",
            TokenKind::Deps => "DEPS",
            TokenKind::Async => "ASYNC",
            TokenKind::Sync => "SYNC",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Star => "STAR",
            TokenKind::Slash => "SLASH",
            TokenKind::Mod => "MOD",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LBracket => "LBRACKET",
            TokenKind::RBracket => "RBRACKET",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::Colon => "COLON",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Comma => "COMMA",
            TokenKind::Dot => "DOT",
            TokenKind::DotDot => "DOTDOT",
            TokenKind::Equals => "EQUALS",
            TokenKind::At => "AT",
            TokenKind::LAngle => "LANGLE",
            TokenKind::RAngle => "RANGLE",
            TokenKind::IntLit => "INT_LIT",
            TokenKind::FloatLit => "FLOAT_LIT",
            TokenKind::StringLit => "STRING_LIT",
            TokenKind::Ident => "IDENT",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Comment => "COMMENT",
            TokenKind::Eof => "EOF",
        }
    }

    pub fn is_elem_type(self) -> bool {
        matches!(
            self,
            TokenKind::I4
                | TokenKind::I8
                | TokenKind::I16
                | TokenKind::I32
                | TokenKind::U8
                | TokenKind::U16
                | TokenKind::U32
                | TokenKind::F16
                | TokenKind::Bf16
                | TokenKind::Tf32
                | TokenKind::F32
                | TokenKind::F64
                | TokenKind::Bool
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(self, TokenKind::IntLit | TokenKind::FloatLit | TokenKind::StringLit | TokenKind::Ident)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::IntLit => write!(f, "integer"),
            TokenKind::FloatLit => write!(f, "float"),
            TokenKind::StringLit => write!(f, "string"),
            TokenKind::Ident => write!(f, "identifier"),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Comment => write!(f, "comment"),
            TokenKind::Eof => write!(f, "end of file"),
            other => write!(f, "'{}'", other.spelling()),
        }
    }
}

impl TokenKind {
    /// Source text of a fixed token. Literal kinds have none and return "".
    pub fn spelling(self) -> &'static str {
        match self {
            TokenKind::Program => "program",
            TokenKind::Device => "device",
            TokenKind::Const => "const",
            TokenKind::Buffer => "buffer",
            TokenKind::Let => "let",
            TokenKind::Loop => "loop",
            TokenKind::Endloop => "endloop",
            TokenKind::In => "in",
            TokenKind::Out => "out",
            TokenKind::Include => "include",
            TokenKind::Transfer => "transfer",
            TokenKind::Store => "store",
            TokenKind::Wait => "wait",
            TokenKind::Region => "region",
            TokenKind::Extends => "extends",
            TokenKind::TypeFamily => "type_family",
            TokenKind::Opcode => "opcode",
            TokenKind::Topology => "topology",
            TokenKind::Mandatory => "mandatory",
            TokenKind::Extended => "extended",
            TokenKind::SpecVersion => "spec_version",
            TokenKind::I4 => "i4",
            TokenKind::I8 => "i8",
            TokenKind::I16 => "i16",
            TokenKind::I32 => "i32",
            TokenKind::U8 => "u8",
            TokenKind::U16 => "u16",
            TokenKind::U32 => "u32",
            TokenKind::F16 => "f16",
            TokenKind::Bf16 => "bf16",
            TokenKind::Tf32 => "tf32",
            TokenKind::F32 => "f32",
            TokenKind::F64 => "f64",
            TokenKind::Bool => "bool",
            TokenKind::Ddr => "DDR",
            TokenKind::L2 => "L2",
            TokenKind::L1 => "L1",
            TokenKind::Size => "size",
            TokenKind::Align => "align",
            TokenKind::Elem => "elem",
            TokenKind::Shape => "shape",
            TokenKind::Layout => "layout",
            TokenKind::Strides => "strides",
            TokenKind::Quant => "quant",
            TokenKind::Deps => "deps",
            TokenKind::Async => "async",
            TokenKind::Sync => "sync",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Mod => "mod",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::DotDot => "..",
            TokenKind::Equals => "=",
            TokenKind::At => "@",
            TokenKind::LAngle => "<",
            TokenKind::RAngle => ">",
            TokenKind::Newline => "\n",
            TokenKind::IntLit
            | TokenKind::FloatLit
            | TokenKind::StringLit
            | TokenKind::Ident
            | TokenKind::Comment
            | TokenKind::Eof => "",
        }
    }
}

/// Returns true if `s` lexes as a single reserved word.
pub fn is_keyword(s: &str) -> bool {
    let mut lex = TokenKind::lexer(s);
    let Some(Ok(kind)) = lex.next() else {
        return false;
    };
    lex.span().len() == s.len() && kind.spelling().starts_with(|c: char| c.is_ascii_alphabetic())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, location: SourceLocation) -> Self {
        Self { kind, lexeme: lexeme.into(), location }
    }
}

/// How a token is named in "found ..." messages.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::StringLit => write!(f, "string {}", self.lexeme),
            kind if kind.is_literal() => write!(f, "{kind} '{}'", self.lexeme),
            kind => write!(f, "{kind}"),
        }
    }
}
