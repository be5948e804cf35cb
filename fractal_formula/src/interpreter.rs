//! Tree-walking interpreter
//!
//! Evaluates an expression against the caller's symbol table. Semantics
//! shared with the JIT: truthiness is `re != 0`, relationals other than
//! equality compare real parts, `&&`/`||` short-circuit and normalise to
//! `(1,0)`/`(0,0)`, unknown identifiers read `(0,0)`. Exponentiation is
//! the one divergence: the interpreter computes the full complex power,
//! the JIT only the real one.

use fractal_formula_parser::ast::{BinaryOp, Expr, Node, UnaryOp};
use fractal_formula_runtime::{functions, Complex, FunctionError};

use crate::symbols::SymbolTable;

fn truthy(value: Complex) -> bool {
    value.re != 0.0
}

fn bool_value(condition: bool) -> Complex {
    if condition {
        Complex::ONE
    } else {
        Complex::ZERO
    }
}

/// Evaluate `expr`, reading and writing `symbols`. The only failure is an
/// unknown function name.
pub fn interpret(expr: &Expr, symbols: &mut SymbolTable) -> Result<Complex, FunctionError> {
    eval(expr, symbols)
}

fn eval(node: &Node, symbols: &mut SymbolTable) -> Result<Complex, FunctionError> {
    match node {
        Node::Literal(value) => Ok(*value),

        Node::Identifier(name) => Ok(symbols.get(name)),

        Node::UnaryOp { op, operand } => {
            let value = eval(operand, symbols)?;
            Ok(match op {
                UnaryOp::Plus => value,
                UnaryOp::Neg => -value,
                UnaryOp::Mod => Complex::new(value.modulus_sqr(), 0.0),
            })
        }

        Node::BinaryOp { op, left, right } => eval_binary(*op, left, right, symbols),

        Node::FunctionCall { name, arg } => {
            let value = eval(arg, symbols)?;
            functions::evaluate(name, value)
        }

        Node::Assignment {
            variable,
            expression,
        } => {
            let value = eval(expression, symbols)?;
            symbols.set(variable, value);
            Ok(value)
        }

        Node::If {
            condition,
            then_block,
            else_block,
        } => {
            if truthy(eval(condition, symbols)?) {
                match then_block {
                    Some(block) => eval(block, symbols),
                    None => Ok(Complex::ONE),
                }
            } else {
                match else_block {
                    Some(block) => eval(block, symbols),
                    None => Ok(Complex::ZERO),
                }
            }
        }

        Node::StatementSeq(statements) => {
            let mut result = Complex::ZERO;
            for statement in statements {
                result = eval(statement, symbols)?;
            }
            Ok(result)
        }

        // settings and parameter blocks carry metadata, not code
        Node::Setting { .. } | Node::ParamBlock { .. } => Ok(Complex::ZERO),
    }
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    symbols: &mut SymbolTable,
) -> Result<Complex, FunctionError> {
    if op == BinaryOp::And {
        let lhs = eval(left, symbols)?;
        if !truthy(lhs) {
            return Ok(Complex::ZERO);
        }
        let rhs = eval(right, symbols)?;
        return Ok(bool_value(truthy(rhs)));
    }
    if op == BinaryOp::Or {
        let lhs = eval(left, symbols)?;
        if truthy(lhs) {
            return Ok(Complex::ONE);
        }
        let rhs = eval(right, symbols)?;
        return Ok(bool_value(truthy(rhs)));
    }

    let lhs = eval(left, symbols)?;
    let rhs = eval(right, symbols)?;
    Ok(match op {
        BinaryOp::Add => lhs + rhs,
        BinaryOp::Sub => lhs - rhs,
        BinaryOp::Mul => lhs * rhs,
        BinaryOp::Div => lhs / rhs,
        BinaryOp::Pow => lhs.pow(rhs),
        BinaryOp::Less => bool_value(lhs.re < rhs.re),
        BinaryOp::LessEqual => bool_value(lhs.re <= rhs.re),
        BinaryOp::Greater => bool_value(lhs.re > rhs.re),
        BinaryOp::GreaterEqual => bool_value(lhs.re >= rhs.re),
        BinaryOp::Equal => bool_value(lhs == rhs),
        BinaryOp::NotEqual => bool_value(lhs != rhs),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    })
}
