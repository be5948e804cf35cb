//! Token definitions for the formula lexer
//!
//! Two layers: a raw `logos`-derived token for the character-level classes,
//! and the full [`TokenKind`] the parser consumes, where identifiers have
//! been classified against the keyword, section, built-in variable and
//! built-in function tables.

use logos::Logos;

/// Raw character-level token classes.
///
/// Whitespace, `;` comments and `\`-before-newline line splices are
/// skipped; a physical newline is a token because the grammar treats it
/// as a statement terminator.
// The skip class covers blanks, `;` comments to end of line, and the
// `\`-newline line splice.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\f]+|;[^\r\n]*|\\\r?\n")]
pub(crate) enum RawToken {
    #[regex(r"\r?\n")]
    Newline,

    // A literal with no decimal point and no exponent stays an integer.
    #[regex(r"[0-9]+")]
    Integer,
    #[regex(r"([0-9]+\.[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+")]
    Number,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[token("\"")]
    Quote,

    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("==")]
    Equal,
    #[token("!=")]
    NotEqual,
    #[token("&&")]
    LogicalAnd,
    #[token("||")]
    LogicalOr,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Multiply,
    #[token("/")]
    Divide,
    #[token("^")]
    Power,
    #[token("=")]
    Assign,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("|")]
    Modulus,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
}

/// Classified token kinds as the parser sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    EndOfInput,
    Invalid,

    // Literals and names
    Integer,
    Number,
    Str,
    Identifier,

    // Operators and punctuation
    Plus,
    Minus,
    Multiply,
    Divide,
    Power,
    Assign,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    LogicalAnd,
    LogicalOr,
    Modulus,
    OpenParen,
    CloseParen,
    Comma,
    Colon,
    Terminator,

    // Keywords
    If,
    Elseif,
    Else,
    Endif,
    True,
    False,
    Param,
    EndParam,
    /// `bool`, `int`, `float`, `complex`, `color` in parameter blocks
    TypeIdent,

    // Section names (the trailing ':' is consumed as part of the token)
    Global,
    Builtin,
    Init,
    Loop,
    Bailout,
    PerturbInit,
    PerturbLoop,
    Default,
    Switch,

    // Built-in variables
    P1,
    P2,
    P3,
    P4,
    P5,
    Pixel,
    LastSqr,
    Rand,
    Pi,
    E,
    MaxIter,
    ScreenMax,
    ScreenPixel,
    WhiteSquare,
    IsMand,
    Center,
    MagXMag,
    RotSkew,

    // Built-in functions
    Sin,
    Cos,
    Sinh,
    Cosh,
    Cosxx,
    Tan,
    Cotan,
    Tanh,
    Cotanh,
    Sqr,
    Sqrt,
    Log,
    Exp,
    Abs,
    Conj,
    Real,
    Imag,
    Flip,
    Fn1,
    Fn2,
    Fn3,
    Fn4,
    Srand,
    Asin,
    Acos,
    Asinh,
    Acosh,
    Atan,
    Atanh,
    Cabs,
    Floor,
    Ceil,
    Trunc,
    Round,
    Ident,
    One,
    Zero,
}

impl TokenKind {
    pub fn is_section(self) -> bool {
        matches!(
            self,
            TokenKind::Global
                | TokenKind::Builtin
                | TokenKind::Init
                | TokenKind::Loop
                | TokenKind::Bailout
                | TokenKind::PerturbInit
                | TokenKind::PerturbLoop
                | TokenKind::Default
                | TokenKind::Switch
        )
    }

    pub fn is_builtin_var(self) -> bool {
        matches!(
            self,
            TokenKind::P1
                | TokenKind::P2
                | TokenKind::P3
                | TokenKind::P4
                | TokenKind::P5
                | TokenKind::Pixel
                | TokenKind::LastSqr
                | TokenKind::Rand
                | TokenKind::Pi
                | TokenKind::E
                | TokenKind::MaxIter
                | TokenKind::ScreenMax
                | TokenKind::ScreenPixel
                | TokenKind::WhiteSquare
                | TokenKind::IsMand
                | TokenKind::Center
                | TokenKind::MagXMag
                | TokenKind::RotSkew
        )
    }

    pub fn is_builtin_fn(self) -> bool {
        matches!(
            self,
            TokenKind::Sin
                | TokenKind::Cos
                | TokenKind::Sinh
                | TokenKind::Cosh
                | TokenKind::Cosxx
                | TokenKind::Tan
                | TokenKind::Cotan
                | TokenKind::Tanh
                | TokenKind::Cotanh
                | TokenKind::Sqr
                | TokenKind::Sqrt
                | TokenKind::Log
                | TokenKind::Exp
                | TokenKind::Abs
                | TokenKind::Conj
                | TokenKind::Real
                | TokenKind::Imag
                | TokenKind::Flip
                | TokenKind::Fn1
                | TokenKind::Fn2
                | TokenKind::Fn3
                | TokenKind::Fn4
                | TokenKind::Srand
                | TokenKind::Asin
                | TokenKind::Acos
                | TokenKind::Asinh
                | TokenKind::Acosh
                | TokenKind::Atan
                | TokenKind::Atanh
                | TokenKind::Cabs
                | TokenKind::Floor
                | TokenKind::Ceil
                | TokenKind::Trunc
                | TokenKind::Round
                | TokenKind::Ident
                | TokenKind::One
                | TokenKind::Zero
        )
    }
}

/// Keyword table, consulted first and in every mode.
pub(crate) const KEYWORDS: &[(&str, TokenKind)] = &[
    ("if", TokenKind::If),
    ("elseif", TokenKind::Elseif),
    ("else", TokenKind::Else),
    ("endif", TokenKind::Endif),
];

/// Extension-mode keywords.
pub(crate) const EXTENSION_KEYWORDS: &[(&str, TokenKind)] = &[
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("param", TokenKind::Param),
    ("endparam", TokenKind::EndParam),
];

/// Parameter block type names, extension mode only.
pub(crate) const TYPE_IDENTS: &[&str] = &["bool", "int", "float", "complex", "color"];

/// Section names, extension mode only. Recognised as a section token only
/// when a ':' immediately follows; the colon is part of the token.
pub(crate) const SECTION_NAMES: &[(&str, TokenKind)] = &[
    ("global", TokenKind::Global),
    ("builtin", TokenKind::Builtin),
    ("init", TokenKind::Init),
    ("loop", TokenKind::Loop),
    ("bailout", TokenKind::Bailout),
    ("perturbinit", TokenKind::PerturbInit),
    ("perturbloop", TokenKind::PerturbLoop),
    ("default", TokenKind::Default),
    ("switch", TokenKind::Switch),
];

pub(crate) const BUILTIN_VARS: &[(&str, TokenKind)] = &[
    ("p1", TokenKind::P1),
    ("p2", TokenKind::P2),
    ("p3", TokenKind::P3),
    ("p4", TokenKind::P4),
    ("p5", TokenKind::P5),
    ("pixel", TokenKind::Pixel),
    ("lastsqr", TokenKind::LastSqr),
    ("rand", TokenKind::Rand),
    ("pi", TokenKind::Pi),
    ("e", TokenKind::E),
    ("maxit", TokenKind::MaxIter),
    ("scrnmax", TokenKind::ScreenMax),
    ("scrnpix", TokenKind::ScreenPixel),
    ("whitesq", TokenKind::WhiteSquare),
    ("ismand", TokenKind::IsMand),
    ("center", TokenKind::Center),
    ("magxmag", TokenKind::MagXMag),
    ("rotskew", TokenKind::RotSkew),
];

pub(crate) const BUILTIN_FNS: &[(&str, TokenKind)] = &[
    ("sin", TokenKind::Sin),
    ("cos", TokenKind::Cos),
    ("sinh", TokenKind::Sinh),
    ("cosh", TokenKind::Cosh),
    ("cosxx", TokenKind::Cosxx),
    ("tan", TokenKind::Tan),
    ("cotan", TokenKind::Cotan),
    ("tanh", TokenKind::Tanh),
    ("cotanh", TokenKind::Cotanh),
    ("sqr", TokenKind::Sqr),
    ("sqrt", TokenKind::Sqrt),
    ("log", TokenKind::Log),
    ("exp", TokenKind::Exp),
    ("abs", TokenKind::Abs),
    ("conj", TokenKind::Conj),
    ("real", TokenKind::Real),
    ("imag", TokenKind::Imag),
    ("flip", TokenKind::Flip),
    ("fn1", TokenKind::Fn1),
    ("fn2", TokenKind::Fn2),
    ("fn3", TokenKind::Fn3),
    ("fn4", TokenKind::Fn4),
    ("srand", TokenKind::Srand),
    ("asin", TokenKind::Asin),
    ("acos", TokenKind::Acos),
    ("asinh", TokenKind::Asinh),
    ("acosh", TokenKind::Acosh),
    ("atan", TokenKind::Atan),
    ("atanh", TokenKind::Atanh),
    ("cabs", TokenKind::Cabs),
    ("floor", TokenKind::Floor),
    ("ceil", TokenKind::Ceil),
    ("trunc", TokenKind::Trunc),
    ("round", TokenKind::Round),
    ("ident", TokenKind::Ident),
    ("one", TokenKind::One),
    ("zero", TokenKind::Zero),
];

/// Is `name` reserved as a built-in variable or function? Such names are
/// not valid assignment targets unless the parser option allows it.
pub fn is_builtin_name(name: &str) -> bool {
    BUILTIN_VARS.iter().any(|(n, _)| *n == name) || BUILTIN_FNS.iter().any(|(n, _)| *n == name)
}

/// Optional token payload.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TokenValue<'a> {
    #[default]
    None,
    Number(f64),
    Integer(i64),
    Str(&'a str),
}

/// A classified token with its payload and source extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub value: TokenValue<'a>,
    /// Byte offset of the token start
    pub position: usize,
    /// Byte length of the token text
    pub length: usize,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, position: usize, length: usize) -> Self {
        Self {
            kind,
            value: TokenValue::None,
            position,
            length,
        }
    }

    /// String payload, for identifiers, strings and built-in names.
    pub fn text(&self) -> &'a str {
        match self.value {
            TokenValue::Str(s) => s,
            _ => "",
        }
    }

    /// Numeric payload of a `Number` token.
    pub fn number(&self) -> f64 {
        match self.value {
            TokenValue::Number(n) => n,
            TokenValue::Integer(n) => n as f64,
            _ => 0.0,
        }
    }

    /// Numeric payload of an `Integer` token.
    pub fn integer(&self) -> i64 {
        match self.value {
            TokenValue::Integer(n) => n,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_name_lookup() {
        assert!(is_builtin_name("pixel"));
        assert!(is_builtin_name("flip"));
        assert!(!is_builtin_name("z"));
    }

    #[test]
    fn test_kind_predicates() {
        assert!(TokenKind::Loop.is_section());
        assert!(TokenKind::Pixel.is_builtin_var());
        assert!(TokenKind::Sin.is_builtin_fn());
        assert!(!TokenKind::Identifier.is_section());
        assert!(!TokenKind::Sin.is_builtin_var());
    }

    #[test]
    fn test_table_sizes() {
        assert_eq!(BUILTIN_VARS.len(), 18);
        assert_eq!(BUILTIN_FNS.len(), 36);
        assert_eq!(SECTION_NAMES.len(), 9);
    }
}
