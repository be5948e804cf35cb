//! Built-in function registry
//!
//! Maps the language's function names onto scalar and complex
//! implementations. The scalar entry points use the C ABI so the JIT can
//! bind them as call targets; the interpreter calls the same pointers
//! through [`evaluate`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::complex::Complex;

/// Scalar built-in, callable from JIT-compiled code.
pub type RealFn = extern "C" fn(f64) -> f64;
/// Complex built-in, interpreter only.
pub type ComplexFn = fn(Complex) -> Complex;

/// Function evaluation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FunctionError {
    #[error("function '{0}' not found")]
    UnknownFunction(String),
}

/// Seed cell for `srand`. The original seeded the process-wide C library
/// generator; the seed is confined here instead. Reads of the `rand`
/// variable remain symbol-table lookups supplied by the host.
static RAND_SEED: AtomicU64 = AtomicU64::new(0);

pub extern "C" fn seed_random(arg: f64) -> f64 {
    RAND_SEED.store(arg as i64 as u64, Ordering::Relaxed);
    0.0
}

pub fn random_seed() -> u64 {
    RAND_SEED.load(Ordering::Relaxed)
}

mod real {
    pub extern "C" fn sin(x: f64) -> f64 {
        x.sin()
    }
    pub extern "C" fn cos(x: f64) -> f64 {
        x.cos()
    }
    pub extern "C" fn tan(x: f64) -> f64 {
        x.tan()
    }
    pub extern "C" fn cotan(x: f64) -> f64 {
        x.cos() / x.sin()
    }
    pub extern "C" fn sinh(x: f64) -> f64 {
        x.sinh()
    }
    pub extern "C" fn cosh(x: f64) -> f64 {
        x.cosh()
    }
    pub extern "C" fn tanh(x: f64) -> f64 {
        x.tanh()
    }
    pub extern "C" fn cotanh(x: f64) -> f64 {
        x.cosh() / x.sinh()
    }
    // TODO: correct for a complex argument z=x+iy: cos(x)cosh(y) + i sin(x)sinh(y)
    pub extern "C" fn cosxx(x: f64) -> f64 {
        x.cos() * x.cosh()
    }
    pub extern "C" fn asin(x: f64) -> f64 {
        x.asin()
    }
    pub extern "C" fn acos(x: f64) -> f64 {
        x.acos()
    }
    pub extern "C" fn atan(x: f64) -> f64 {
        x.atan()
    }
    pub extern "C" fn asinh(x: f64) -> f64 {
        x.asinh()
    }
    pub extern "C" fn acosh(x: f64) -> f64 {
        x.acosh()
    }
    pub extern "C" fn atanh(x: f64) -> f64 {
        x.atanh()
    }
    pub extern "C" fn sqr(x: f64) -> f64 {
        x * x
    }
    pub extern "C" fn sqrt(x: f64) -> f64 {
        x.sqrt()
    }
    pub extern "C" fn log(x: f64) -> f64 {
        x.ln()
    }
    pub extern "C" fn exp(x: f64) -> f64 {
        x.exp()
    }
    pub extern "C" fn abs(x: f64) -> f64 {
        x.abs()
    }
    pub extern "C" fn cabs(x: f64) -> f64 {
        x.abs()
    }
    pub extern "C" fn conj(x: f64) -> f64 {
        -x
    }
    pub extern "C" fn real(x: f64) -> f64 {
        x
    }
    pub extern "C" fn imag(x: f64) -> f64 {
        -x
    }
    pub extern "C" fn flip(x: f64) -> f64 {
        -x
    }
    pub extern "C" fn floor(x: f64) -> f64 {
        x.floor()
    }
    pub extern "C" fn ceil(x: f64) -> f64 {
        x.ceil()
    }
    pub extern "C" fn trunc(x: f64) -> f64 {
        x.trunc()
    }
    pub extern "C" fn round(x: f64) -> f64 {
        x.round()
    }
    pub extern "C" fn ident(x: f64) -> f64 {
        x
    }
    pub extern "C" fn one(_x: f64) -> f64 {
        1.0
    }
    pub extern "C" fn zero(_x: f64) -> f64 {
        0.0
    }
}

/// Exponentiation helper bound into JIT-compiled code for `^`.
pub extern "C" fn pow(x: f64, y: f64) -> f64 {
    x.powf(y)
}

mod cplx {
    use crate::complex::Complex;

    pub fn abs(z: Complex) -> Complex {
        z.abs()
    }
    pub fn conj(z: Complex) -> Complex {
        Complex::new(z.re, -z.im)
    }
    pub fn flip(z: Complex) -> Complex {
        Complex::new(z.im, z.re)
    }
    pub fn ident(z: Complex) -> Complex {
        z
    }
    pub fn one(_z: Complex) -> Complex {
        Complex::ONE
    }
    pub fn zero(_z: Complex) -> Complex {
        Complex::ZERO
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    real: Option<RealFn>,
    complex: Option<ComplexFn>,
}

static FUNCTIONS: Lazy<BTreeMap<&'static str, Entry>> = Lazy::new(|| {
    let scalar = |f: RealFn| Entry {
        real: Some(f),
        complex: None,
    };
    let both = |f: RealFn, c: ComplexFn| Entry {
        real: Some(f),
        complex: Some(c),
    };
    BTreeMap::from([
        ("abs", both(real::abs, cplx::abs)),
        ("acos", scalar(real::acos)),
        ("acosh", scalar(real::acosh)),
        ("asin", scalar(real::asin)),
        ("asinh", scalar(real::asinh)),
        ("atan", scalar(real::atan)),
        ("atanh", scalar(real::atanh)),
        ("cabs", scalar(real::cabs)),
        ("ceil", scalar(real::ceil)),
        ("conj", both(real::conj, cplx::conj)),
        ("cos", scalar(real::cos)),
        ("cosh", scalar(real::cosh)),
        ("cosxx", scalar(real::cosxx)),
        ("cotan", scalar(real::cotan)),
        ("cotanh", scalar(real::cotanh)),
        ("exp", scalar(real::exp)),
        ("flip", both(real::flip, cplx::flip)),
        ("floor", scalar(real::floor)),
        ("fn1", scalar(real::ident)),
        ("fn2", scalar(real::ident)),
        ("fn3", scalar(real::ident)),
        ("fn4", scalar(real::ident)),
        ("ident", both(real::ident, cplx::ident)),
        ("imag", scalar(real::imag)),
        ("log", scalar(real::log)),
        ("one", both(real::one, cplx::one)),
        ("real", scalar(real::real)),
        ("round", scalar(real::round)),
        ("sin", scalar(real::sin)),
        ("sinh", scalar(real::sinh)),
        ("sqr", scalar(real::sqr)),
        ("sqrt", scalar(real::sqrt)),
        ("srand", scalar(seed_random)),
        ("tan", scalar(real::tan)),
        ("tanh", scalar(real::tanh)),
        ("trunc", scalar(real::trunc)),
        ("zero", both(real::zero, cplx::zero)),
    ])
});

/// Look up the scalar implementation of a built-in.
pub fn lookup_real(name: &str) -> Option<RealFn> {
    FUNCTIONS.get(name).and_then(|entry| entry.real)
}

/// Look up the complex implementation of a built-in.
pub fn lookup_complex(name: &str) -> Option<ComplexFn> {
    FUNCTIONS.get(name).and_then(|entry| entry.complex)
}

/// Iterate the names and scalar entry points, for JIT symbol binding.
pub fn scalar_functions() -> impl Iterator<Item = (&'static str, RealFn)> {
    FUNCTIONS
        .iter()
        .filter_map(|(name, entry)| entry.real.map(|f| (*name, f)))
}

/// Evaluate a built-in on a complex argument. A complex implementation
/// wins; otherwise the scalar implementation is applied to the real part
/// and the imaginary part of the result is zero.
pub fn evaluate(name: &str, value: Complex) -> Result<Complex, FunctionError> {
    if let Some(f) = lookup_complex(name) {
        return Ok(f(value));
    }
    if let Some(f) = lookup_real(name) {
        return Ok(Complex::new(f(value.re), 0.0));
    }
    Err(FunctionError::UnknownFunction(name.to_string()))
}
