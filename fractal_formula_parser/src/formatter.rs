//! Node formatter
//!
//! Renders an AST one node per line for tests and debugging output.

use fractal_formula_runtime::Complex;

use crate::ast::{BinaryOp, Expr, SettingValue, UnaryOp, Visitor};

struct NodeFormatter {
    out: String,
}

impl NodeFormatter {
    fn new() -> Self {
        Self { out: String::new() }
    }
}

impl Visitor for NodeFormatter {
    fn literal(&mut self, value: Complex) {
        if value.im == 0.0 {
            self.out.push_str(&format!("number:{}\n", value.re));
        } else {
            self.out
                .push_str(&format!("number:({},{})\n", value.re, value.im));
        }
    }

    fn identifier(&mut self, name: &str) {
        self.out.push_str(&format!("identifier:{name}\n"));
    }

    fn unary_op(&mut self, op: UnaryOp, operand: &Expr) {
        self.out.push_str(&format!("unary_op:{}\n", op.symbol()));
        operand.visit(self);
    }

    fn binary_op(&mut self, op: BinaryOp, left: &Expr, right: &Expr) {
        self.out.push_str(&format!("binary_op:{}\n", op.symbol()));
        left.visit(self);
        right.visit(self);
    }

    fn function_call(&mut self, name: &str, arg: &Expr) {
        self.out.push_str(&format!("function_call:{name}(\n"));
        arg.visit(self);
        self.out.push_str(")\n");
    }

    fn assignment(&mut self, variable: &str, expression: &Expr) {
        self.out.push_str(&format!("assignment:{variable}\n"));
        expression.visit(self);
    }

    fn if_statement(
        &mut self,
        condition: &Expr,
        then_block: Option<&Expr>,
        else_block: Option<&Expr>,
    ) {
        self.out.push_str("if_statement:(\n");
        condition.visit(self);
        self.out.push_str(") {\n");
        if let Some(then_block) = then_block {
            then_block.visit(self);
        }
        if let Some(else_block) = else_block {
            self.out.push_str("} else {\n");
            else_block.visit(self);
        }
        self.out.push_str("} endif\n");
    }

    fn statement_seq(&mut self, statements: &[Expr]) {
        self.out
            .push_str(&format!("statement_seq:{} {{\n", statements.len()));
        for statement in statements {
            statement.visit(self);
        }
        self.out.push_str("}\n");
    }

    fn setting(&mut self, key: &str, value: &SettingValue) {
        self.out.push_str(&format!("setting:{key}="));
        match value {
            SettingValue::Int(v) => self.out.push_str(&v.to_string()),
            SettingValue::Float(v) => self.out.push_str(&v.to_string()),
            SettingValue::Complex(v) => self.out.push_str(&format!("({},{})", v.re, v.im)),
            SettingValue::Str(v) => self.out.push_str(&format!("\"{v}\"")),
            SettingValue::Bool(v) => self.out.push_str(if *v { "true" } else { "false" }),
            SettingValue::Enum(v) | SettingValue::SwitchRef(v) => self.out.push_str(v),
            SettingValue::StrList(values) => self.out.push_str(&values.join(" ")),
            SettingValue::Expr(expr) => {
                self.out.push_str("{\n");
                expr.visit(self);
                self.out.push('}');
            }
        }
        self.out.push('\n');
    }

    fn param_block(&mut self, param_type: Option<&str>, name: &str, body: Option<&Expr>) {
        self.out.push_str(&format!(
            "param_block:{},{name} {{\n",
            param_type.unwrap_or("")
        ));
        if let Some(body) = body {
            body.visit(self);
        }
        self.out.push_str("}\n");
    }
}

/// Format an expression tree, one node per line.
pub fn format_node(expr: &Expr) -> String {
    let mut formatter = NodeFormatter::new();
    expr.visit(&mut formatter);
    formatter.out
}
