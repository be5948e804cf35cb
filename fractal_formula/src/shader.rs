//! GLSL compute-shader emitter
//!
//! An example [`Visitor`] implementation: pretty-prints a formula's
//! sections as a GLSL compute shader. Complex values map to `vec2`
//! (x = real, y = imaginary) and operators map onto a fixed preamble of
//! `c_*` helper functions. The output is meant as a starting point for a
//! GPU renderer, not a drop-in shader.

use std::collections::BTreeSet;
use std::fmt::Write;

use fractal_formula_parser::ast::{
    BinaryOp, Expr, FormulaSections, Node, SettingValue, UnaryOp, Visitor,
};
use fractal_formula_parser::token;
use fractal_formula_runtime::Complex;

const WORKGROUP_SIZE: u32 = 8;

struct GlslEmitter {
    out: String,
    indent: usize,
}

fn glsl_float(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

impl GlslEmitter {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn indent(&self) -> String {
        "    ".repeat(self.indent)
    }

    /// Render one expression inline.
    fn expression(&mut self, expr: &Expr) {
        expr.visit(self);
    }

    /// Render a statement (or a block of them) at the current indent.
    fn statement(&mut self, expr: &Expr) {
        match &**expr {
            Node::StatementSeq(statements) => {
                for statement in statements {
                    self.statement(statement);
                }
            }
            Node::If {
                condition,
                then_block,
                else_block,
            } => {
                let _ = write!(self.out, "{}if ((", self.indent());
                self.expression(condition);
                self.out.push_str(").x != 0.0) {\n");
                self.indent += 1;
                if let Some(block) = then_block {
                    self.statement(block);
                }
                self.indent -= 1;
                if let Some(block) = else_block {
                    let _ = writeln!(self.out, "{}}} else {{", self.indent());
                    self.indent += 1;
                    self.statement(block);
                    self.indent -= 1;
                }
                let _ = writeln!(self.out, "{}}}", self.indent());
            }
            _ => {
                let _ = write!(self.out, "{}", self.indent());
                self.expression(expr);
                self.out.push_str(";\n");
            }
        }
    }
}

impl Visitor for GlslEmitter {
    fn literal(&mut self, value: Complex) {
        let _ = write!(
            self.out,
            "vec2({}, {})",
            glsl_float(value.re),
            glsl_float(value.im)
        );
    }

    fn identifier(&mut self, name: &str) {
        self.out.push_str(name);
    }

    fn unary_op(&mut self, op: UnaryOp, operand: &Expr) {
        match op {
            UnaryOp::Plus => self.expression(operand),
            UnaryOp::Neg => {
                self.out.push_str("(-");
                self.expression(operand);
                self.out.push(')');
            }
            UnaryOp::Mod => {
                self.out.push_str("vec2(c_mag_sqr(");
                self.expression(operand);
                self.out.push_str("), 0.0)");
            }
        }
    }

    fn binary_op(&mut self, op: BinaryOp, left: &Expr, right: &Expr) {
        match op {
            BinaryOp::Add | BinaryOp::Sub => {
                self.out.push('(');
                self.expression(left);
                self.out
                    .push_str(if op == BinaryOp::Add { " + " } else { " - " });
                self.expression(right);
                self.out.push(')');
            }
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => {
                self.out.push_str(match op {
                    BinaryOp::Mul => "c_mul(",
                    BinaryOp::Div => "c_div(",
                    _ => "c_pow(",
                });
                self.expression(left);
                self.out.push_str(", ");
                self.expression(right);
                self.out.push(')');
            }
            BinaryOp::Equal | BinaryOp::NotEqual => {
                self.out.push('(');
                self.expression(left);
                self.out
                    .push_str(if op == BinaryOp::Equal { " == " } else { " != " });
                self.expression(right);
                self.out.push_str(" ? vec2(1.0, 0.0) : vec2(0.0, 0.0))");
            }
            BinaryOp::Less
            | BinaryOp::LessEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual => {
                self.out.push_str("((");
                self.expression(left);
                self.out.push_str(").x ");
                self.out.push_str(match op {
                    BinaryOp::Less => "<",
                    BinaryOp::LessEqual => "<=",
                    BinaryOp::Greater => ">",
                    _ => ">=",
                });
                self.out.push_str(" (");
                self.expression(right);
                self.out.push_str(").x ? vec2(1.0, 0.0) : vec2(0.0, 0.0))");
            }
            BinaryOp::And | BinaryOp::Or => {
                self.out.push_str("(((");
                self.expression(left);
                self.out.push_str(").x != 0.0) ");
                self.out
                    .push_str(if op == BinaryOp::And { "&&" } else { "||" });
                self.out.push_str(" ((");
                self.expression(right);
                self.out
                    .push_str(").x != 0.0) ? vec2(1.0, 0.0) : vec2(0.0, 0.0))");
            }
        }
    }

    fn function_call(&mut self, name: &str, arg: &Expr) {
        match name {
            "sin" | "cos" | "sinh" | "cosh" | "tan" | "cotan" | "tanh" | "cotanh" | "exp"
            | "log" | "sqrt" | "sqr" | "conj" | "flip" => {
                let _ = write!(self.out, "c_{name}(");
                self.expression(arg);
                self.out.push(')');
            }
            "abs" => {
                // componentwise, which GLSL does natively on vec2
                self.out.push_str("abs(");
                self.expression(arg);
                self.out.push(')');
            }
            "cabs" => {
                self.out.push_str("vec2(c_abs(");
                self.expression(arg);
                self.out.push_str("), 0.0)");
            }
            "real" => {
                self.out.push_str("vec2((");
                self.expression(arg);
                self.out.push_str(").x, 0.0)");
            }
            "imag" => {
                self.out.push_str("vec2((");
                self.expression(arg);
                self.out.push_str(").y, 0.0)");
            }
            "ident" | "fn1" | "fn2" | "fn3" | "fn4" => self.expression(arg),
            "one" => self.out.push_str("vec2(1.0, 0.0)"),
            "zero" | "srand" => self.out.push_str("vec2(0.0, 0.0)"),
            "floor" | "ceil" | "trunc" | "round" | "asin" | "acos" | "atan" | "asinh"
            | "acosh" | "atanh" | "cosxx" => {
                let glsl = if name == "cosxx" { "cos" } else { name };
                let _ = write!(self.out, "vec2({glsl}((");
                self.expression(arg);
                self.out.push_str(").x), 0.0)");
            }
            _ => {
                let _ = write!(self.out, "c_{name}(");
                self.expression(arg);
                self.out.push(')');
            }
        }
    }

    fn assignment(&mut self, variable: &str, expression: &Expr) {
        let _ = write!(self.out, "{variable} = ");
        self.expression(expression);
    }

    fn if_statement(
        &mut self,
        condition: &Expr,
        then_block: Option<&Expr>,
        else_block: Option<&Expr>,
    ) {
        // expression position: select between the branch results
        self.out.push_str("((");
        self.expression(condition);
        self.out.push_str(").x != 0.0 ? ");
        match then_block {
            Some(block) => self.expression(block),
            None => self.out.push_str("vec2(1.0, 0.0)"),
        }
        self.out.push_str(" : ");
        match else_block {
            Some(block) => self.expression(block),
            None => self.out.push_str("vec2(0.0, 0.0)"),
        }
        self.out.push(')');
    }

    fn statement_seq(&mut self, statements: &[Expr]) {
        for (index, statement) in statements.iter().enumerate() {
            if index > 0 {
                self.out.push_str(", ");
            }
            self.expression(statement);
        }
    }

    fn setting(&mut self, key: &str, _value: &SettingValue) {
        let _ = write!(self.out, "/* setting {key} */");
    }

    fn param_block(&mut self, _param_type: Option<&str>, name: &str, _body: Option<&Expr>) {
        let _ = write!(self.out, "/* param {name} */");
    }
}

/// Collect user variables assigned anywhere in the formula, so the shader
/// can declare them.
fn collect_assigned(node: &Node, names: &mut BTreeSet<String>) {
    match node {
        Node::Assignment {
            variable,
            expression,
        } => {
            if !token::is_builtin_name(variable) {
                names.insert(variable.clone());
            }
            collect_assigned(expression, names);
        }
        Node::UnaryOp { operand, .. } => collect_assigned(operand, names),
        Node::BinaryOp { left, right, .. } => {
            collect_assigned(left, names);
            collect_assigned(right, names);
        }
        Node::FunctionCall { arg, .. } => collect_assigned(arg, names),
        Node::If {
            condition,
            then_block,
            else_block,
        } => {
            collect_assigned(condition, names);
            if let Some(block) = then_block {
                collect_assigned(block, names);
            }
            if let Some(block) = else_block {
                collect_assigned(block, names);
            }
        }
        Node::StatementSeq(statements) => {
            for statement in statements {
                collect_assigned(statement, names);
            }
        }
        Node::Literal(_) | Node::Identifier(_) | Node::Setting { .. } | Node::ParamBlock { .. } => {
        }
    }
}

fn preamble() -> String {
    let mut out = String::new();
    out.push_str("#version 450\n\n");
    let _ = writeln!(
        out,
        "layout(local_size_x = {WORKGROUP_SIZE}, local_size_y = {WORKGROUP_SIZE}) in;"
    );
    out.push_str("layout(rgba32f, binding = 0) uniform image2D output_image;\n\n");

    out.push_str("layout(std140, binding = 1) uniform FractalParams {\n");
    out.push_str("    vec2 p1;\n");
    out.push_str("    vec2 p2;\n");
    out.push_str("    vec2 p3;\n");
    out.push_str("    vec2 p4;\n");
    out.push_str("    vec2 p5;\n");
    out.push_str("    vec2 center;\n");
    out.push_str("    vec2 view_size;\n");
    out.push_str("    uvec2 resolution;\n");
    out.push_str("    uint maxit;\n");
    out.push_str("};\n\n");

    out.push_str("const float pi = 3.14159265358979323846;\n");
    out.push_str("const float e = 2.71828182845904523536;\n\n");

    out.push_str("// complex helpers: vec2 = real + imag * i\n");
    out.push_str("vec2 c_mul(vec2 a, vec2 b) {\n");
    out.push_str("    return vec2(a.x * b.x - a.y * b.y, a.x * b.y + a.y * b.x);\n");
    out.push_str("}\n");
    out.push_str("vec2 c_div(vec2 a, vec2 b) {\n");
    out.push_str("    float denom = b.x * b.x + b.y * b.y;\n");
    out.push_str(
        "    return vec2((a.x * b.x + a.y * b.y) / denom, (a.y * b.x - a.x * b.y) / denom);\n",
    );
    out.push_str("}\n");
    out.push_str("float c_mag_sqr(vec2 z) { return z.x * z.x + z.y * z.y; }\n");
    out.push_str("float c_abs(vec2 z) { return sqrt(c_mag_sqr(z)); }\n");
    out.push_str("vec2 c_conj(vec2 z) { return vec2(z.x, -z.y); }\n");
    out.push_str("vec2 c_flip(vec2 z) { return vec2(z.y, z.x); }\n");
    out.push_str("vec2 c_sqr(vec2 z) { return vec2(z.x * z.x - z.y * z.y, 2.0 * z.x * z.y); }\n");
    out.push_str("vec2 c_exp(vec2 z) {\n");
    out.push_str("    float m = exp(z.x);\n");
    out.push_str("    return vec2(m * cos(z.y), m * sin(z.y));\n");
    out.push_str("}\n");
    out.push_str("vec2 c_log(vec2 z) { return vec2(log(c_abs(z)), atan(z.y, z.x)); }\n");
    out.push_str("vec2 c_pow(vec2 z, vec2 w) { return c_exp(c_mul(w, c_log(z))); }\n");
    out.push_str("vec2 c_sqrt(vec2 z) { return c_pow(z, vec2(0.5, 0.0)); }\n");
    out.push_str("vec2 c_sin(vec2 z) { return vec2(sin(z.x) * cosh(z.y), cos(z.x) * sinh(z.y)); }\n");
    out.push_str(
        "vec2 c_cos(vec2 z) { return vec2(cos(z.x) * cosh(z.y), -sin(z.x) * sinh(z.y)); }\n",
    );
    out.push_str("vec2 c_tan(vec2 z) { return c_div(c_sin(z), c_cos(z)); }\n");
    out.push_str("vec2 c_cotan(vec2 z) { return c_div(c_cos(z), c_sin(z)); }\n");
    out.push_str(
        "vec2 c_sinh(vec2 z) { return vec2(sinh(z.x) * cos(z.y), cosh(z.x) * sin(z.y)); }\n",
    );
    out.push_str(
        "vec2 c_cosh(vec2 z) { return vec2(cosh(z.x) * cos(z.y), sinh(z.x) * sin(z.y)); }\n",
    );
    out.push_str("vec2 c_tanh(vec2 z) { return c_div(c_sinh(z), c_cosh(z)); }\n");
    out.push_str("vec2 c_cotanh(vec2 z) { return c_div(c_cosh(z), c_sinh(z)); }\n\n");
    out
}

/// Emit a complete compute shader from the formula's sections.
pub fn emit_shader(sections: &FormulaSections) -> String {
    let mut emitter = GlslEmitter::new();
    emitter.out.push_str(&preamble());

    let mut variables = BTreeSet::new();
    for section in [
        &sections.per_image,
        &sections.initialize,
        &sections.iterate,
        &sections.bailout,
    ]
    .into_iter()
    .flatten()
    {
        collect_assigned(section, &mut variables);
    }

    emitter.out.push_str("void main() {\n");
    emitter.indent = 1;
    emitter
        .out
        .push_str("    ivec2 coord = ivec2(gl_GlobalInvocationID.xy);\n");
    emitter.out.push_str(
        "    if (coord.x >= int(resolution.x) || coord.y >= int(resolution.y)) return;\n",
    );
    emitter
        .out
        .push_str("    vec2 uv = (vec2(coord) + 0.5) / vec2(resolution) - 0.5;\n");
    emitter
        .out
        .push_str("    vec2 pixel = center + uv * view_size;\n");
    for name in &variables {
        let _ = writeln!(emitter.out, "    vec2 {name} = vec2(0.0, 0.0);");
    }
    emitter.out.push('\n');

    if let Some(per_image) = &sections.per_image {
        emitter.statement(per_image);
    }
    if let Some(initialize) = &sections.initialize {
        emitter.statement(initialize);
    }

    emitter.out.push_str("    uint iter = 0u;\n");
    emitter.out.push_str("    for (; iter < maxit; ++iter) {\n");
    emitter.indent = 2;
    if let Some(iterate) = &sections.iterate {
        emitter.statement(iterate);
    }
    if let Some(bailout) = &sections.bailout {
        let _ = write!(emitter.out, "{}if ((", emitter.indent());
        emitter.expression(bailout);
        emitter.out.push_str(").x != 0.0) break;\n");
    }
    emitter.indent = 1;
    emitter.out.push_str("    }\n\n");

    emitter
        .out
        .push_str("    float shade = float(iter) / float(maxit);\n");
    emitter
        .out
        .push_str("    imageStore(output_image, coord, vec4(shade, shade, shade, 1.0));\n");
    emitter.out.push_str("}\n");
    emitter.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractal_formula_parser::parser::{self, Options};

    fn shader_for(text: &str) -> String {
        let sections = parser::parse(text, &Options::default()).expect("formula parses");
        emit_shader(&sections)
    }

    #[test]
    fn test_mandelbrot_shader() {
        let shader = shader_for("z = pixel : z = z*z + pixel, |z| > 4");
        assert!(shader.contains("#version 450"));
        assert!(shader.contains("z = c_mul(z, z) + pixel") || shader.contains("z = (c_mul(z, z) + pixel)"));
        assert!(shader.contains("vec2 z = vec2(0.0, 0.0);"));
        assert!(shader.contains("c_mag_sqr(z)"));
        assert!(shader.contains("break;"));
        assert!(shader.contains("imageStore"));
    }

    #[test]
    fn test_function_mapping() {
        let shader = shader_for("z = sin(z) + flip(pixel) : |z| > 4");
        assert!(shader.contains("c_sin(z)"));
        assert!(shader.contains("c_flip(pixel)"));
    }

    #[test]
    fn test_if_lowering() {
        let shader = shader_for("if (z > 1)\nz = 0\nendif : |z| > 4");
        assert!(shader.contains("if (("));
    }
}
