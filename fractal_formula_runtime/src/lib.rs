//! fractal_formula_runtime
//!
//! Shared runtime for the fractal formula compiler: the complex-double
//! value type and the built-in function registry. Both the tree-walking
//! interpreter and the JIT-compiled code call into this crate, so the
//! scalar intrinsics use the C ABI.

pub mod complex;
pub mod functions;

pub use complex::Complex;
pub use functions::{evaluate, lookup_complex, lookup_real, ComplexFn, FunctionError, RealFn};
