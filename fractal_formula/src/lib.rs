//! fractal_formula
//!
//! Compiler and evaluators for the fractal formula language. A parsed
//! formula's sections can be evaluated by a tree-walking interpreter or
//! by a cranelift JIT emitting native code over packed complex doubles;
//! both share the symbol table through which the caller supplies inputs
//! and reads outputs.
//!
//! # Example
//!
//! ```
//! use fractal_formula::{create_formula, Complex, Options, Section};
//!
//! let mut formula =
//!     create_formula("z = pixel : z = z*z + pixel, |z| > 4", &Options::default()).unwrap();
//! formula.set_value("pixel", Complex::new(0.25, 0.0));
//! formula.interpret(Section::Initialize).unwrap();
//! let z = formula.get_value("z");
//! assert_eq!(z, Complex::new(0.25, 0.0));
//! ```

pub mod entries;
pub mod formula;
pub mod interpreter;
pub mod jit;
pub mod shader;
pub mod simplifier;
pub mod symbols;

pub use entries::{load_formula_entries, FormulaEntry};
pub use formula::{create_formula, Formula, FormulaError};
pub use interpreter::interpret;
pub use jit::{JitError, JitProgram};
pub use shader::emit_shader;
pub use simplifier::simplify;
pub use symbols::{SymbolTable, RESULT_SLOT};

pub use fractal_formula_parser::ast::Section;
pub use fractal_formula_parser::parser::Options;
pub use fractal_formula_runtime::Complex;
