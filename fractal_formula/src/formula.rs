//! Formula facade
//!
//! Owns a parsed formula's sections and its symbol table, and evaluates
//! sections through either the interpreter or the JIT. The symbol table
//! is the caller's channel for inputs and outputs; the JIT snapshots it
//! at compile time and writes results back after every run.

use thiserror::Error;

use fractal_formula_parser::ast::{Expr, FormulaSections, Section};
use fractal_formula_parser::parser;
use fractal_formula_runtime::{Complex, FunctionError};

use crate::interpreter::interpret;
use crate::jit::{self, JitError, JitProgram};
use crate::symbols::SymbolTable;

/// Formula evaluation error
#[derive(Debug, Error)]
pub enum FormulaError {
    #[error(transparent)]
    Function(#[from] FunctionError),
    #[error(transparent)]
    Jit(#[from] JitError),
    #[error("section cannot be evaluated")]
    InvalidSection,
    #[error("formula has not been compiled")]
    NotCompiled,
}

/// A parsed formula with its evaluation state.
#[derive(Debug)]
pub struct Formula {
    sections: FormulaSections,
    symbols: SymbolTable,
    jit: Option<JitProgram>,
}

impl Formula {
    pub fn new(sections: FormulaSections) -> Self {
        Self {
            sections,
            symbols: SymbolTable::new(),
            jit: None,
        }
    }

    /// Parse a formula text; `None` if the parser recorded any error.
    pub fn parse(text: &str, options: &parser::Options) -> Option<Self> {
        parser::parse(text, options).map(Self::new)
    }

    pub fn set_value(&mut self, name: &str, value: Complex) {
        self.symbols.set(name, value);
    }

    /// Unknown names read as `(0,0)`.
    pub fn get_value(&self, name: &str) -> Complex {
        self.symbols.get(name)
    }

    pub fn section(&self, section: Section) -> Option<&Expr> {
        self.sections.get(section)
    }

    pub fn sections(&self) -> &FormulaSections {
        &self.sections
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Evaluate a section with the tree-walking interpreter. A missing
    /// section yields `(0,0)`; the metadata sections are not evaluatable.
    pub fn interpret(&mut self, section: Section) -> Result<Complex, FormulaError> {
        match section {
            Section::PerImage
            | Section::Initialize
            | Section::Iterate
            | Section::Bailout
            | Section::PerturbInitialize
            | Section::PerturbIterate => {}
            Section::Builtin | Section::Default | Section::Switch => {
                return Err(FormulaError::InvalidSection)
            }
        }
        let Some(expr) = self.sections.get(section).cloned() else {
            return Ok(Complex::ZERO);
        };
        Ok(interpret(&expr, &mut self.symbols)?)
    }

    /// JIT-compile the initialize / iterate / bailout sections. Symbol
    /// values already set are baked into the data section.
    pub fn compile(&mut self) -> Result<(), FormulaError> {
        let program = jit::compile_sections(&self.sections, &mut self.symbols)?;
        self.jit = Some(program);
        Ok(())
    }

    /// Run a compiled section and return its result. The host symbol
    /// table reflects all assignments after the call.
    pub fn run(&mut self, section: Section) -> Result<Complex, FormulaError> {
        let Some(program) = &self.jit else {
            return Err(FormulaError::NotCompiled);
        };
        match section {
            Section::Initialize | Section::Iterate | Section::Bailout => {
                Ok(program.run(section, &mut self.symbols))
            }
            _ => Err(FormulaError::InvalidSection),
        }
    }
}

/// Parse a formula text into an evaluatable [`Formula`].
pub fn create_formula(text: &str, options: &parser::Options) -> Option<Formula> {
    Formula::parse(text, options)
}
