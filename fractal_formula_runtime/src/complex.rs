//! Complex-double arithmetic
//!
//! The formula language computes over pairs of 64-bit IEEE doubles. The
//! JIT keeps a value of this type packed in one 128-bit register (real in
//! the low lane, imaginary in the high lane), so the layout here is fixed.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// A complex number as a pair of 64-bit doubles.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const ZERO: Complex = Complex { re: 0.0, im: 0.0 };
    pub const ONE: Complex = Complex { re: 1.0, im: 0.0 };

    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// The source language's `|z|` operator: `re^2 + im^2`, not the
    /// mathematical absolute value.
    pub fn modulus_sqr(self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    /// Componentwise absolute value.
    pub fn abs(self) -> Self {
        Self::new(self.re.abs(), self.im.abs())
    }

    pub fn exp(self) -> Self {
        let exp_re = self.re.exp();
        Self::new(exp_re * self.im.cos(), exp_re * self.im.sin())
    }

    /// Principal branch logarithm. A negative-zero imaginary part is
    /// treated as positive zero so the branch cut is stable. `log 0` is
    /// the caller's problem.
    pub fn log(self) -> Self {
        let magnitude = (self.re * self.re + self.im * self.im).sqrt();
        let im = if self.im == 0.0 { 0.0 } else { self.im };
        Self::new(magnitude.ln(), im.atan2(self.re))
    }

    /// `0^0 = 1`, `0^w = 0` for `w != 0`, otherwise `exp(w * log z)`.
    pub fn pow(self, exponent: Complex) -> Self {
        if self == Complex::ZERO {
            return if exponent == Complex::ZERO {
                Complex::ONE
            } else {
                Complex::ZERO
            };
        }
        (exponent * self.log()).exp()
    }

    /// Lexicographic order: real part first, imaginary part breaks ties.
    /// This is a map-keying order, not a mathematical one; NaN components
    /// are not valid keys.
    pub fn total_cmp(&self, other: &Complex) -> Ordering {
        self.re
            .total_cmp(&other.re)
            .then_with(|| self.im.total_cmp(&other.im))
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.re, self.im)
    }
}

impl From<f64> for Complex {
    fn from(re: f64) -> Self {
        Self::new(re, 0.0)
    }
}

impl Add for Complex {
    type Output = Complex;

    fn add(self, rhs: Complex) -> Complex {
        Complex::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Sub for Complex {
    type Output = Complex;

    fn sub(self, rhs: Complex) -> Complex {
        Complex::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl Mul for Complex {
    type Output = Complex;

    fn mul(self, rhs: Complex) -> Complex {
        Complex::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

impl Div for Complex {
    type Output = Complex;

    fn div(self, rhs: Complex) -> Complex {
        let denom = rhs.re * rhs.re + rhs.im * rhs.im;
        Complex::new(
            (self.re * rhs.re + self.im * rhs.im) / denom,
            (self.im * rhs.re - self.re * rhs.im) / denom,
        )
    }
}

impl Neg for Complex {
    type Output = Complex;

    fn neg(self) -> Complex {
        Complex::new(-self.re, -self.im)
    }
}

impl AddAssign for Complex {
    fn add_assign(&mut self, rhs: Complex) {
        *self = *self + rhs;
    }
}

impl SubAssign for Complex {
    fn sub_assign(&mut self, rhs: Complex) {
        *self = *self - rhs;
    }
}

impl MulAssign for Complex {
    fn mul_assign(&mut self, rhs: Complex) {
        *self = *self * rhs;
    }
}

impl DivAssign for Complex {
    fn div_assign(&mut self, rhs: Complex) {
        *self = *self / rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add() {
        let sum = Complex::new(1.0, 2.0) + Complex::new(3.0, 4.0);
        assert_eq!(sum, Complex::new(4.0, 6.0));
    }

    #[test]
    fn test_multiply() {
        // (1 + 2i)(3 + 4i) = -5 + 10i
        let product = Complex::new(1.0, 2.0) * Complex::new(3.0, 4.0);
        assert_eq!(product, Complex::new(-5.0, 10.0));
    }

    #[test]
    fn test_divide() {
        // (1 + 2i) / (3 + 4i) = (11 + 2i) / 25
        let quotient = Complex::new(1.0, 2.0) / Complex::new(3.0, 4.0);
        assert_eq!(quotient, Complex::new(11.0 / 25.0, 2.0 / 25.0));
    }

    #[test]
    fn test_divide_halves() {
        let quotient = Complex::new(1.0, 1.0) / Complex::new(2.0, 2.0);
        assert_eq!(quotient, Complex::new(0.5, 0.0));
    }

    #[test]
    fn test_modulus_sqr() {
        assert_eq!(Complex::new(-3.0, -2.0).modulus_sqr(), 13.0);
    }

    #[test]
    fn test_exp_of_zero() {
        assert_eq!(Complex::ZERO.exp(), Complex::ONE);
    }

    #[test]
    fn test_log_negative_real() {
        let log = Complex::new(-1.0, 0.0).log();
        assert!((log.re - 0.0).abs() < 1e-12);
        assert!((log.im - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn test_log_negative_zero_imaginary() {
        // -0.0 imaginary normalises to the positive branch
        let log = Complex::new(-1.0, -0.0).log();
        assert!((log.im - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn test_pow_zero_base() {
        assert_eq!(Complex::ZERO.pow(Complex::ZERO), Complex::ONE);
        assert_eq!(Complex::ZERO.pow(Complex::new(2.0, 0.0)), Complex::ZERO);
    }

    #[test]
    fn test_pow_real() {
        let result = Complex::new(2.0, 0.0).pow(Complex::new(3.0, 0.0));
        assert!((result.re - 8.0).abs() < 1e-12);
        assert!(result.im.abs() < 1e-12);
    }

    #[test]
    fn test_total_cmp_lexicographic() {
        let a = Complex::new(1.0, 5.0);
        let b = Complex::new(2.0, 0.0);
        let c = Complex::new(1.0, 6.0);
        assert_eq!(a.total_cmp(&b), Ordering::Less);
        assert_eq!(a.total_cmp(&c), Ordering::Less);
        assert_eq!(a.total_cmp(&a), Ordering::Equal);
    }
}
