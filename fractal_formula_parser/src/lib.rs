//! fractal_formula_parser
//!
//! Lexer, recursive descent parser and AST for the fractal formula
//! language. A formula is either a legacy one-liner
//! (`init_stmts : iter_stmts`, last statement is the bailout) or a
//! sectionised text with `init:` / `loop:` / `bailout:` style headers.
//!
//! # Example
//!
//! ```
//! use fractal_formula_parser::{parse, Options};
//!
//! let sections = parse("z = pixel : z = z*z + pixel, |z| > 4", &Options::default())
//!     .expect("parse failed");
//! assert!(sections.initialize.is_some());
//! assert!(sections.iterate.is_some());
//! assert!(sections.bailout.is_some());
//! ```

pub mod ast;
pub mod error;
pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod token;

pub use ast::{BinaryOp, Expr, FormulaSections, Node, Section, SettingValue, UnaryOp, Visitor};
pub use error::{Diagnostic, ErrorCode};
pub use formatter::format_node;
pub use lexer::Lexer;
pub use parser::{parse, Options, Parser};
pub use span::{SourceLocation, SourceMap};
pub use token::{Token, TokenKind, TokenValue};
