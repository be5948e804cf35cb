//! Formula library round trip: extract entries, parse every body

use fractal_formula::{create_formula, load_formula_entries, Options};

const LIBRARY: &str = concat!(
    "comment {\n",
    "  sample formulas for the reader tests\n",
    "}\n",
    "\n",
    "Mandelbrot {\n",
    "  z = pixel:\n",
    "  z = z*z + pixel, |z| > 4\n",
    "}\n",
    "\n",
    "Julia(XAXIS) {\n",
    "  z = pixel:\n",
    "  z = z*z + p1, |z| > 4\n",
    "}\n",
    "\n",
    "Cubic[float=y] {\n",
    "  z = pixel:\n",
    "  z = z*z*z + pixel, |z| > 4\n",
    "}\n",
);

#[test]
fn test_every_entry_parses() {
    let entries = load_formula_entries(LIBRARY.as_bytes()).unwrap();
    assert_eq!(entries.len(), 3);
    for entry in &entries {
        assert!(
            create_formula(&entry.body, &Options::default()).is_some(),
            "{} should parse",
            entry.name
        );
    }
}

#[test]
fn test_entry_metadata() {
    let entries = load_formula_entries(LIBRARY.as_bytes()).unwrap();
    assert_eq!(entries[0].name, "Mandelbrot");
    assert_eq!(entries[1].name, "Julia");
    assert_eq!(entries[1].paren_value, "XAXIS");
    assert_eq!(entries[2].name, "Cubic");
    assert_eq!(entries[2].bracket_value, "float=y");
}

#[test]
fn test_parsed_entry_evaluates() {
    use fractal_formula::{Complex, Section};

    let entries = load_formula_entries(LIBRARY.as_bytes()).unwrap();
    let mut formula = create_formula(&entries[0].body, &Options::default()).unwrap();
    formula.set_value("pixel", Complex::new(4.4, 0.0));
    formula.interpret(Section::Initialize).unwrap();
    assert_eq!(formula.get_value("z"), Complex::new(4.4, 0.0));
}
