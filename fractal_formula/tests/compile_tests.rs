//! JIT tests
//!
//! The same semantics as the interpreter, checked through compiled code,
//! plus the data-section and write-back behaviour: symbol values are
//! snapshotted at compile time and every referenced symbol is copied
//! back to the host table after each run.

use fractal_formula::{create_formula, Complex, Formula, FormulaError, Options, Section};

fn parse_formula(text: &str) -> Formula {
    create_formula(text, &Options::default())
        .unwrap_or_else(|| panic!("'{text}' should parse"))
}

fn compiled(text: &str) -> Formula {
    let mut formula = parse_formula(text);
    formula.compile().expect("formula compiles");
    formula
}

/// Pure expressions where the interpreter and the JIT must agree.
static AGREEMENT_CASES: &[(&str, &str, f64, f64)] = &[
    ("one", "1", 1.0, 0.0),
    ("two", "2", 2.0, 0.0),
    ("identifierE", "e", std::f64::consts::E, 0.0),
    ("unknownIdentifierIsZero", "a", 0.0, 0.0),
    ("add", "1.1+1.3", 2.4, 0.0),
    ("subtract", "1.5-2.2", -0.7, 0.0),
    ("multiply", "2.2*3.1", 6.82, 0.0),
    ("divide", "6.4/2.0", 3.2, 0.0),
    ("avogadroDivide", "6.02e23/2", 3.01e23, 0.0),
    ("unaryNegate", "-(-1.6)", 1.6, 0.0),
    ("addAddAdd", "1.1+2.2+3.3", 6.6, 0.0),
    ("mulMulMul", "2.2*2.2*2.2", 10.648, 0.0),
    ("addMulAdd", "1.1+2.2*3.3+4.4", 12.76, 0.0),
    ("power", "2^3", 8.0, 0.0),
    ("chainedPower", "2^3^2", 64.0, 0.0),
    ("powerPrecedence", "2*3^2", 18.0, 0.0),
    ("modulus", "|-3.0 + flip(-2)|", 13.0, 0.0),
    ("compareLessFalse", "4<3", 0.0, 0.0),
    ("compareLessTrue", "3<4", 1.0, 0.0),
    ("compareLessEqualEquality", "3<=3", 1.0, 0.0),
    ("compareLessEqualFalse", "3<=2", 0.0, 0.0),
    ("compareGreaterTrue", "4>3", 1.0, 0.0),
    ("compareGreaterFalse", "3>4", 0.0, 0.0),
    ("compareGreaterEqualEquality", "3>=3", 1.0, 0.0),
    ("compareEqualTrue", "3==3", 1.0, 0.0),
    ("compareEqualFalse", "3==4", 0.0, 0.0),
    ("compareNotEqualTrue", "3!=4", 1.0, 0.0),
    ("compareNotEqualFalse", "3!=3", 0.0, 0.0),
    ("logicalAndTrue", "1&&1", 1.0, 0.0),
    ("logicalAndFalse", "1&&0", 0.0, 0.0),
    ("logicalOrTrue", "1||0", 1.0, 0.0),
    ("logicalOrFalse", "0||0", 0.0, 0.0),
    ("flip", "flip(1)", 0.0, 1.0),
    ("complexAdd", "1+flip(1)", 1.0, 1.0),
    ("complexSubtract", "1-flip(1)", 1.0, -1.0),
    ("complexMultiply", "flip(1)*flip(1)", -1.0, 0.0),
    ("complexMultiplyFull", "(1+flip(2))*(3+flip(4))", -5.0, 10.0),
    ("complexDivideScalar", "(1+flip(1))/2", 0.5, 0.5),
    ("complexDivide", "(1+flip(1))/(2+flip(2))", 0.5, 0.0),
    ("realDivideComplex", "2/(1+flip(1))", 1.0, -1.0),
    ("conjugate", "conj(2+flip(3))", 2.0, -3.0),
    ("identity", "ident(2+flip(3))", 2.0, 3.0),
    ("complexLiteral", "(1.5, -0.5)", 1.5, -0.5),
    ("sinFn", "sin(1)", 0.8414709848078965, 0.0),
    ("cosFn", "cos(1)", 0.5403023058681398, 0.0),
    ("sqrtFn", "sqrt(9)", 3.0, 0.0),
    ("sqrFn", "sqr(3)", 9.0, 0.0),
    ("expFn", "exp(1)", std::f64::consts::E, 0.0),
    ("logFn", "log(e)", 1.0, 0.0),
    ("absFn", "abs(-3)", 3.0, 0.0),
    ("cabsFn", "cabs(-4)", 4.0, 0.0),
    ("floorFn", "floor(2.7)", 2.0, 0.0),
    ("ceilFn", "ceil(2.2)", 3.0, 0.0),
    ("truncFn", "trunc(2.9)", 2.0, 0.0),
    ("roundFn", "round(2.5)", 3.0, 0.0),
    ("oneFn", "one(9)", 1.0, 0.0),
    ("zeroFn", "zero(9)", 0.0, 0.0),
    ("srandFn", "srand(7)", 0.0, 0.0),
    ("modulusConjunctive", "|(1 < 2) && (2 < 3)|", 1.0, 0.0),
];

#[test]
fn test_interpreter_and_jit_agree() {
    for &(name, text, re, im) in AGREEMENT_CASES {
        let mut formula = parse_formula(text);
        let interpreted = formula
            .interpret(Section::Bailout)
            .unwrap_or_else(|err| panic!("{name}: interpret: {err}"));

        let mut formula = parse_formula(text);
        formula
            .compile()
            .unwrap_or_else(|err| panic!("{name}: compile: {err}"));
        let ran = formula
            .run(Section::Bailout)
            .unwrap_or_else(|err| panic!("{name}: run: {err}"));

        for (label, result) in [("interpreted", interpreted), ("compiled", ran)] {
            assert!(
                (result.re - re).abs() < 1e-8,
                "{name} ({label}): real {} != {re}",
                result.re
            );
            assert!(
                (result.im - im).abs() < 1e-8,
                "{name} ({label}): imaginary {} != {im}",
                result.im
            );
        }
    }
}

#[test]
fn test_run_before_compile_fails() {
    let mut formula = parse_formula("1");
    assert!(matches!(
        formula.run(Section::Bailout),
        Err(FormulaError::NotCompiled)
    ));
}

#[test]
fn test_symbol_snapshot_taken_at_compile_time() {
    let mut formula = parse_formula("z");
    formula.set_value("z", Complex::new(1.0, 2.0));
    formula.compile().unwrap();
    // changing the host value after compilation does not reach the
    // baked data section, and the write-back restores the snapshot
    formula.set_value("z", Complex::new(2.0, 4.0));

    let result = formula.run(Section::Bailout).unwrap();

    assert_eq!(result, Complex::new(1.0, 2.0));
    assert_eq!(formula.get_value("z"), Complex::new(1.0, 2.0));
}

#[test]
fn test_operands_survive_arithmetic() {
    let mut formula = parse_formula("z+q");
    formula.set_value("z", Complex::new(1.0, 2.0));
    formula.set_value("q", Complex::new(2.0, 4.0));
    formula.compile().unwrap();

    let result = formula.run(Section::Bailout).unwrap();

    assert_eq!(result, Complex::new(3.0, 6.0));
    assert_eq!(formula.get_value("z"), Complex::new(1.0, 2.0));
    assert_eq!(formula.get_value("q"), Complex::new(2.0, 4.0));
}

#[test]
fn test_assignment_writes_back() {
    let mut formula = compiled("q = 2 + 3");
    let result = formula.run(Section::Bailout).unwrap();
    assert_eq!(result, Complex::new(5.0, 0.0));
    assert_eq!(formula.get_value("q"), Complex::new(5.0, 0.0));
}

#[test]
fn test_assignment_stores_real_lane() {
    // the store to a symbol slot covers only the low lane; the
    // expression value itself keeps both lanes
    let mut formula = compiled("z = flip(2)");
    let result = formula.run(Section::Bailout).unwrap();
    assert_eq!(result, Complex::new(0.0, 2.0));
    assert_eq!(formula.get_value("z"), Complex::ZERO);
}

#[test]
fn test_formula_initialize() {
    let mut formula = parse_formula("z=pixel:z=z*z+pixel,|z|>4");
    formula.set_value("pixel", Complex::new(4.4, 0.0));
    formula.set_value("z", Complex::new(100.0, 0.0));
    formula.compile().unwrap();

    let result = formula.run(Section::Initialize).unwrap();

    assert_eq!(result, Complex::new(4.4, 0.0));
    assert_eq!(formula.get_value("pixel"), Complex::new(4.4, 0.0));
    assert_eq!(formula.get_value("z"), Complex::new(4.4, 0.0));
}

#[test]
fn test_formula_iterate() {
    let mut formula = parse_formula("z=pixel:z=z*z+pixel,|z|>4");
    formula.set_value("pixel", Complex::new(4.4, 0.0));
    formula.set_value("z", Complex::new(2.0, 0.0));
    formula.compile().unwrap();

    let result = formula.run(Section::Iterate).unwrap();

    assert!((result.re - 8.4).abs() < 1e-12);
    assert_eq!(result.im, 0.0);
    assert!((formula.get_value("z").re - 8.4).abs() < 1e-12);
    assert_eq!(formula.get_value("pixel"), Complex::new(4.4, 0.0));
}

#[test]
fn test_formula_bailout_false() {
    let mut formula = parse_formula("z=pixel:z=z*z+pixel,|z|>4");
    formula.set_value("z", Complex::new(2.0, 0.0));
    formula.compile().unwrap();

    let result = formula.run(Section::Bailout).unwrap();

    assert_eq!(result, Complex::ZERO);
    assert_eq!(formula.get_value("z"), Complex::new(2.0, 0.0));
}

#[test]
fn test_formula_bailout_true() {
    let mut formula = parse_formula("z=pixel:z=z*z+pixel,|z|>4");
    formula.set_value("pixel", Complex::new(4.4, 0.0));
    formula.set_value("z", Complex::new(8.0, 0.0));
    formula.compile().unwrap();

    let result = formula.run(Section::Bailout).unwrap();

    assert_eq!(result, Complex::new(1.0, 0.0));
    assert_eq!(formula.get_value("z"), Complex::new(8.0, 0.0));
    assert_eq!(formula.get_value("pixel"), Complex::new(4.4, 0.0));
}

#[test]
fn test_iteration_state_persists_between_runs() {
    let mut formula = parse_formula("z=pixel:z=z*z+pixel,|z|>4");
    formula.set_value("pixel", Complex::new(0.25, 0.0));
    formula.compile().unwrap();

    formula.run(Section::Initialize).unwrap();
    assert_eq!(formula.get_value("z"), Complex::new(0.25, 0.0));

    formula.run(Section::Iterate).unwrap();
    assert!((formula.get_value("z").re - 0.3125).abs() < 1e-12);

    let bailed = formula.run(Section::Bailout).unwrap();
    assert_eq!(bailed, Complex::ZERO);
}

#[test]
fn test_short_circuit_and_skips_assignment() {
    let mut formula = compiled("0 && (z=3)");
    let result = formula.run(Section::Bailout).unwrap();
    assert_eq!(result, Complex::ZERO);
    assert_eq!(formula.get_value("z"), Complex::ZERO);
}

#[test]
fn test_short_circuit_or_skips_assignment() {
    let mut formula = compiled("1 || (z=3)");
    let result = formula.run(Section::Bailout).unwrap();
    assert_eq!(result, Complex::ONE);
    assert_eq!(formula.get_value("z"), Complex::ZERO);
}

#[test]
fn test_and_evaluates_right_when_needed() {
    let mut formula = compiled("1 && (z=3)");
    let result = formula.run(Section::Bailout).unwrap();
    assert_eq!(result, Complex::ONE);
    assert_eq!(formula.get_value("z"), Complex::new(3.0, 0.0));
}

#[test]
fn test_if_empty_body_true() {
    let mut formula = compiled("if(5)\nendif");
    assert_eq!(
        formula.run(Section::Bailout).unwrap(),
        Complex::new(1.0, 0.0)
    );
}

#[test]
fn test_if_empty_body_false() {
    let mut formula = compiled("if(5<4)\nendif");
    assert_eq!(formula.run(Section::Bailout).unwrap(), Complex::ZERO);
}

#[test]
fn test_if_body_taken() {
    let mut formula = compiled("if(5)\nz=3\nendif");
    let result = formula.run(Section::Bailout).unwrap();
    assert_eq!(result, Complex::new(3.0, 0.0));
    assert_eq!(formula.get_value("z"), Complex::new(3.0, 0.0));
}

#[test]
fn test_if_body_skipped() {
    let mut formula = compiled("if(0)\nz=3\nendif");
    let result = formula.run(Section::Bailout).unwrap();
    assert_eq!(result, Complex::ZERO);
    assert_eq!(formula.get_value("z"), Complex::ZERO);
}

#[test]
fn test_elseif_chain() {
    let text = "if(0)\nz=1\nelseif(0)\nz=3\nelseif(1)\nz=4\nelse\nz=5\nendif";
    let mut formula = compiled(text);
    let result = formula.run(Section::Bailout).unwrap();
    assert_eq!(result, Complex::new(4.0, 0.0));
    assert_eq!(formula.get_value("z"), Complex::new(4.0, 0.0));
}

#[test]
fn test_statement_sequences() {
    let mut formula = compiled("3\n4\n");
    assert_eq!(
        formula.run(Section::Iterate).unwrap(),
        Complex::new(3.0, 0.0)
    );
    assert_eq!(
        formula.run(Section::Bailout).unwrap(),
        Complex::new(4.0, 0.0)
    );
}

#[test]
fn test_empty_initialize_runs_to_zero() {
    let mut formula = compiled("1");
    assert_eq!(formula.run(Section::Initialize).unwrap(), Complex::ZERO);
}

#[test]
fn test_sectionised_formula_compiles() {
    let text = "init:\nz = pixel\nloop:\nz = z*z + pixel\nbailout:\n|z| > 4\n";
    let mut formula = parse_formula(text);
    formula.set_value("pixel", Complex::new(4.4, 0.0));
    formula.compile().unwrap();

    assert_eq!(
        formula.run(Section::Initialize).unwrap(),
        Complex::new(4.4, 0.0)
    );
    let iterated = formula.run(Section::Iterate).unwrap();
    assert!((iterated.re - 23.76).abs() < 1e-10);
    assert_eq!(
        formula.run(Section::Bailout).unwrap(),
        Complex::new(1.0, 0.0)
    );
}

#[test]
fn test_constant_pool_shares_duplicates() {
    // the same literal appearing many times still evaluates correctly
    let mut formula = compiled("1.5 + 1.5 + 1.5");
    assert_eq!(
        formula.run(Section::Bailout).unwrap(),
        Complex::new(4.5, 0.0)
    );
}

#[test]
fn test_recompile_replaces_program() {
    let mut formula = parse_formula("q = 1 + 1");
    formula.compile().unwrap();
    formula.run(Section::Bailout).unwrap();
    formula.compile().unwrap();
    assert_eq!(
        formula.run(Section::Bailout).unwrap(),
        Complex::new(2.0, 0.0)
    );
}
