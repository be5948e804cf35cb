//! Constant-folding simplifier
//!
//! A visitor that rebuilds a minimally simplified tree: literal
//! arithmetic folds, unary plus unwraps, single-statement sequences
//! unwrap, and a run of consecutive pure-literal statements collapses to
//! its last element. The pass is idempotent.

use fractal_formula_parser::ast::{BinaryOp, Expr, Node, SettingValue, UnaryOp, Visitor};
use fractal_formula_runtime::Complex;

struct Simplifier {
    result: Vec<Expr>,
}

impl Simplifier {
    fn new() -> Self {
        Self { result: Vec::new() }
    }

    fn reduce(&mut self, expr: &Expr) -> Expr {
        expr.visit(self);
        self.result
            .pop()
            .unwrap_or_else(|| Node::sequence(Vec::new()))
    }
}

impl Visitor for Simplifier {
    fn literal(&mut self, value: Complex) {
        self.result.push(Node::literal(value));
    }

    fn identifier(&mut self, name: &str) {
        self.result.push(Node::identifier(name));
    }

    fn unary_op(&mut self, op: UnaryOp, operand: &Expr) {
        let operand = self.reduce(operand);
        match (op, &*operand) {
            // unary plus is the identity
            (UnaryOp::Plus, _) => self.result.push(operand),
            (UnaryOp::Neg, Node::Literal(value)) => self.result.push(Node::literal(-*value)),
            _ => self.result.push(Node::unary(op, operand)),
        }
    }

    fn binary_op(&mut self, op: BinaryOp, left: &Expr, right: &Expr) {
        let left = self.reduce(left);
        let right = self.reduce(right);
        if let (Node::Literal(lhs), Node::Literal(rhs)) = (&*left, &*right) {
            let folded = match op {
                BinaryOp::Add => Some(*lhs + *rhs),
                BinaryOp::Sub => Some(*lhs - *rhs),
                BinaryOp::Mul => Some(*lhs * *rhs),
                BinaryOp::Div => Some(*lhs / *rhs),
                _ => None,
            };
            if let Some(value) = folded {
                self.result.push(Node::literal(value));
                return;
            }
        }
        self.result.push(Node::binary(left, op, right));
    }

    fn function_call(&mut self, name: &str, arg: &Expr) {
        let arg = self.reduce(arg);
        self.result.push(Node::call(name, arg));
    }

    fn assignment(&mut self, variable: &str, expression: &Expr) {
        let expression = self.reduce(expression);
        self.result.push(Node::assignment(variable, expression));
    }

    fn if_statement(
        &mut self,
        condition: &Expr,
        then_block: Option<&Expr>,
        else_block: Option<&Expr>,
    ) {
        let condition = self.reduce(condition);
        let then_block = then_block.map(|block| self.reduce(block));
        let else_block = else_block.map(|block| self.reduce(block));
        self.result.push(std::rc::Rc::new(Node::If {
            condition,
            then_block,
            else_block,
        }));
    }

    fn statement_seq(&mut self, statements: &[Expr]) {
        if statements.len() == 1 {
            let only = self.reduce(&statements[0]);
            self.result.push(only);
            return;
        }

        // drop every pure literal that is immediately shadowed by another
        let mut kept: Vec<Expr> = Vec::new();
        let mut was_literal = false;
        for statement in statements {
            let statement = self.reduce(statement);
            let is_literal = statement.is_literal();
            if was_literal && is_literal {
                if let Some(last) = kept.last_mut() {
                    *last = statement;
                }
            } else {
                kept.push(statement);
                was_literal = is_literal;
            }
        }
        // a collapse can leave a single survivor; unwrap it like the
        // single-statement case above so the pass stays idempotent
        if kept.len() == 1 {
            if let Some(only) = kept.pop() {
                self.result.push(only);
                return;
            }
        }
        self.result.push(Node::sequence(kept));
    }

    fn setting(&mut self, key: &str, value: &SettingValue) {
        self.result.push(Node::setting(key, value.clone()));
    }

    fn param_block(&mut self, param_type: Option<&str>, name: &str, body: Option<&Expr>) {
        self.result.push(std::rc::Rc::new(Node::ParamBlock {
            param_type: param_type.map(str::to_string),
            name: name.to_string(),
            body: body.cloned(),
        }));
    }
}

/// Rebuild `expr` with constants folded and dead literals dropped.
pub fn simplify(expr: &Expr) -> Expr {
    Simplifier::new().reduce(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fold_add() {
        let expr = Node::binary(Node::literal(1.0), BinaryOp::Add, Node::literal(2.0));
        assert_eq!(*simplify(&expr), Node::Literal(Complex::new(3.0, 0.0)));
    }

    #[test]
    fn test_fold_nested() {
        // (1 + 2) * (4 - 1) = 9
        let expr = Node::binary(
            Node::binary(Node::literal(1.0), BinaryOp::Add, Node::literal(2.0)),
            BinaryOp::Mul,
            Node::binary(Node::literal(4.0), BinaryOp::Sub, Node::literal(1.0)),
        );
        assert_eq!(*simplify(&expr), Node::Literal(Complex::new(9.0, 0.0)));
    }

    #[test]
    fn test_fold_complex_literals() {
        let expr = Node::binary(
            Node::literal(Complex::new(1.0, 1.0)),
            BinaryOp::Mul,
            Node::literal(Complex::new(2.0, 2.0)),
        );
        assert_eq!(*simplify(&expr), Node::Literal(Complex::new(0.0, 4.0)));
    }

    #[test]
    fn test_unary_plus_unwraps() {
        let expr = Node::unary(UnaryOp::Plus, Node::identifier("z"));
        assert_eq!(*simplify(&expr), Node::Identifier("z".to_string()));
    }

    #[test]
    fn test_negate_literal() {
        let expr = Node::unary(UnaryOp::Neg, Node::literal(5.0));
        assert_eq!(*simplify(&expr), Node::Literal(Complex::new(-5.0, 0.0)));
    }

    #[test]
    fn test_modulus_not_folded() {
        let expr = Node::unary(UnaryOp::Mod, Node::literal(3.0));
        assert!(matches!(
            &*simplify(&expr),
            Node::UnaryOp {
                op: UnaryOp::Mod,
                ..
            }
        ));
    }

    #[test]
    fn test_single_statement_unwraps() {
        let expr = Node::sequence(vec![Node::binary(
            Node::literal(1.0),
            BinaryOp::Add,
            Node::literal(1.0),
        )]);
        assert_eq!(*simplify(&expr), Node::Literal(Complex::new(2.0, 0.0)));
    }

    #[test]
    fn test_dead_literals_dropped() {
        // 1, 2, z=3, 4, 5 -> 1 is kept (run head), 2 shadows it... the
        // run [1, 2] keeps only 2, then z=3, then [4, 5] keeps only 5
        let expr = Node::sequence(vec![
            Node::literal(1.0),
            Node::literal(2.0),
            Node::assignment("z", Node::literal(3.0)),
            Node::literal(4.0),
            Node::literal(5.0),
        ]);
        let simplified = simplify(&expr);
        let Node::StatementSeq(statements) = &*simplified else {
            panic!("expected a statement sequence");
        };
        assert_eq!(statements.len(), 3);
        assert_eq!(*statements[0], Node::Literal(Complex::new(2.0, 0.0)));
        assert!(matches!(&*statements[1], Node::Assignment { .. }));
        assert_eq!(*statements[2], Node::Literal(Complex::new(5.0, 0.0)));
    }

    #[test]
    fn test_idempotent() {
        let expr = Node::sequence(vec![
            Node::literal(1.0),
            Node::literal(2.0),
            Node::binary(Node::literal(3.0), BinaryOp::Mul, Node::identifier("z")),
        ]);
        let once = simplify(&expr);
        let twice = simplify(&once);
        assert_eq!(once, twice);
    }
}
