//! Symbol table shared by the interpreter and the JIT
//!
//! Maps identifier names to complex values. The table outlives every
//! evaluator call; the caller seeds inputs and reads outputs through it.
//! `_result` is the reserved slot the JIT writes each section result to.

use std::collections::BTreeMap;

use fractal_formula_runtime::Complex;

/// Reserved write-back slot name.
pub const RESULT_SLOT: &str = "_result";

/// Identifier → complex value mapping, preseeded with `e`, `pi` and the
/// `_result` slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable {
    values: BTreeMap<String, Complex>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut values = BTreeMap::new();
        values.insert("e".to_string(), Complex::new(1.0_f64.exp(), 0.0));
        values.insert("pi".to_string(), Complex::new(0.0_f64.atan2(-1.0), 0.0));
        values.insert(RESULT_SLOT.to_string(), Complex::ZERO);
        Self { values }
    }

    /// Unknown identifiers read as `(0,0)`; never an error.
    pub fn get(&self, name: &str) -> Complex {
        self.values.get(name).copied().unwrap_or_default()
    }

    pub fn set(&mut self, name: &str, value: Complex) {
        self.values.insert(name.to_string(), value);
    }

    /// Read a symbol, inserting `(0,0)` if it was absent. The JIT uses
    /// this when snapshotting referenced symbols into its data section.
    pub fn get_or_insert(&mut self, name: &str) -> Complex {
        *self.values.entry(name.to_string()).or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Complex)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preseeded() {
        let symbols = SymbolTable::new();
        assert!((symbols.get("e").re - std::f64::consts::E).abs() < 1e-15);
        assert!((symbols.get("pi").re - std::f64::consts::PI).abs() < 1e-15);
        assert_eq!(symbols.get(RESULT_SLOT), Complex::ZERO);
    }

    #[test]
    fn test_unknown_reads_zero() {
        let symbols = SymbolTable::new();
        assert_eq!(symbols.get("nope"), Complex::ZERO);
    }

    #[test]
    fn test_set_get() {
        let mut symbols = SymbolTable::new();
        symbols.set("z", Complex::new(1.0, 2.0));
        assert_eq!(symbols.get("z"), Complex::new(1.0, 2.0));
    }

    #[test]
    fn test_get_or_insert() {
        let mut symbols = SymbolTable::new();
        assert_eq!(symbols.get_or_insert("w"), Complex::ZERO);
        assert!(symbols.contains("w"));
    }
}
