//! Sectionised formula tests: headers, ordering, and the settings blocks

use fractal_formula_parser::ast::{Node, SettingValue};
use fractal_formula_parser::{parse, ErrorCode, Options, Parser};
use fractal_formula_runtime::Complex;
use pretty_assertions::assert_eq;

fn options() -> Options {
    Options::default()
}

#[test]
fn test_full_sectionised_formula() {
    let text = "init:\nz = pixel\nloop:\nz = z*z + pixel\nbailout:\n|z| <= 4\n";
    let sections = parse(text, &options()).expect("sectionised formula parses");
    assert!(sections.initialize.is_some());
    assert!(sections.iterate.is_some());
    assert!(sections.bailout.is_some());
    assert!(sections.per_image.is_none());
}

#[test]
fn test_global_section() {
    let sections = parse("global:\nx = 1\n", &options()).unwrap();
    assert!(sections.per_image.is_some());
}

#[test]
fn test_perturb_sections() {
    let text = "perturbinit:\nz = 0\nperturbloop:\nz = z + 1\n";
    let sections = parse(text, &options()).unwrap();
    assert!(sections.perturb_initialize.is_some());
    assert!(sections.perturb_iterate.is_some());
}

#[test]
fn test_duplicate_section() {
    let mut parser = Parser::new("init:\nz = 1\ninit:\nz = 2\n", &options());
    assert!(parser.parse().is_none());
    assert_eq!(parser.errors()[0].code, ErrorCode::DuplicateSection);
}

#[test]
fn test_section_order_enforced() {
    let mut parser = Parser::new("loop:\nz = 1\ninit:\nz = 2\n", &options());
    assert!(parser.parse().is_none());
    assert_eq!(parser.errors()[0].code, ErrorCode::InvalidSectionOrder);
}

#[test]
fn test_unknown_section_name() {
    let mut parser = Parser::new("global:\nx = 1\nfoo:\ny = 2\n", &options());
    assert!(parser.parse().is_none());
    assert!(parser
        .errors()
        .iter()
        .any(|d| d.code == ErrorCode::InvalidSection));
}

#[test]
fn test_builtin_section() {
    let sections = parse("builtin:\ntype = 2\n", &options()).unwrap();
    let Node::Setting { key, value } = &*sections.builtin.unwrap() else {
        panic!("builtin body should be a setting");
    };
    assert_eq!(key, "type");
    assert_eq!(*value, SettingValue::Int(2));
}

#[test]
fn test_builtin_section_invalid_type() {
    let mut parser = Parser::new("builtin:\ntype = 3\n", &options());
    assert!(parser.parse().is_none());
    assert_eq!(
        parser.errors()[0].code,
        ErrorCode::BuiltinSectionInvalidType
    );
}

#[test]
fn test_builtin_section_invalid_key() {
    let mut parser = Parser::new("builtin:\nkind = 1\n", &options());
    assert!(parser.parse().is_none());
    assert_eq!(parser.errors()[0].code, ErrorCode::BuiltinSectionInvalidKey);
}

#[test]
fn test_builtin_excludes_formula_sections() {
    let mut parser = Parser::new("builtin:\ntype = 1\ninit:\nz = 1\n", &options());
    assert!(parser.parse().is_none());
    assert_eq!(
        parser.errors()[0].code,
        ErrorCode::BuiltinSectionDisallowsOtherSections
    );
}

#[test]
fn test_formula_sections_exclude_builtin() {
    let mut parser = Parser::new("init:\nz = 1\nbuiltin:\ntype = 1\n", &options());
    assert!(parser.parse().is_none());
    assert_eq!(
        parser.errors()[0].code,
        ErrorCode::BuiltinSectionDisallowsOtherSections
    );
}

#[test]
fn test_default_section_settings() {
    let text = concat!(
        "default:\n",
        "title = \"Mandelbrot\"\n",
        "maxiter = 100\n",
        "magn = 1.5\n",
        "angle = 90\n",
        "center = (-0.5, 0)\n",
        "method = multipass\n",
        "rating = recommended\n",
        "perturb = true\n",
        "render = false\n",
    );
    let sections = parse(text, &options()).expect("default section parses");
    let Node::StatementSeq(settings) = &*sections.defaults.unwrap() else {
        panic!("expected a sequence of settings");
    };
    assert_eq!(settings.len(), 9);

    let Node::Setting { key, value } = &*settings[0] else {
        panic!("expected a setting");
    };
    assert_eq!(key, "title");
    assert_eq!(*value, SettingValue::Str("Mandelbrot".to_string()));

    let Node::Setting { value, .. } = &*settings[1] else {
        panic!("expected a setting");
    };
    assert_eq!(*value, SettingValue::Int(100));

    let Node::Setting { value, .. } = &*settings[4] else {
        panic!("expected a setting");
    };
    assert_eq!(*value, SettingValue::Complex(Complex::new(-0.5, 0.0)));

    let Node::Setting { value, .. } = &*settings[5] else {
        panic!("expected a setting");
    };
    assert_eq!(*value, SettingValue::Enum("multipass".to_string()));

    let Node::Setting { value, .. } = &*settings[7] else {
        panic!("expected a setting");
    };
    assert_eq!(*value, SettingValue::Bool(true));
}

#[test]
fn test_default_section_invalid_key() {
    let mut parser = Parser::new("default:\nbogus = 1\n", &options());
    assert!(parser.parse().is_none());
    assert_eq!(parser.errors()[0].code, ErrorCode::DefaultSectionInvalidKey);
}

#[test]
fn test_default_section_invalid_method() {
    let mut parser = Parser::new("default:\nmethod = sideways\n", &options());
    assert!(parser.parse().is_none());
    assert_eq!(
        parser.errors()[0].code,
        ErrorCode::DefaultSectionInvalidMethod
    );
}

#[test]
fn test_perturb_accepts_expression() {
    let sections = parse("default:\nperturb = maxiter > 100\n", &options()).unwrap();
    let Node::Setting { key, value } = &*sections.defaults.unwrap() else {
        panic!("expected a setting");
    };
    assert_eq!(key, "perturb");
    assert!(matches!(value, SettingValue::Expr(_)));
}

#[test]
fn test_precision_accepts_expression() {
    let sections = parse("default:\nprecision = maxiter / 10\n", &options()).unwrap();
    let Node::Setting { key, value } = &*sections.defaults.unwrap() else {
        panic!("expected a setting");
    };
    assert_eq!(key, "precision");
    assert!(matches!(value, SettingValue::Expr(_)));
}

#[test]
fn test_param_block_with_caption() {
    let text = "default:\nfloat param bailout_radius\ncaption = \"Radius\"\nendparam\n";
    let sections = parse(text, &options()).expect("param block parses");
    let Node::ParamBlock {
        param_type,
        name,
        body,
    } = &*sections.defaults.unwrap()
    else {
        panic!("expected a param block");
    };
    assert_eq!(param_type.as_deref(), Some("float"));
    assert_eq!(name, "bailout_radius");
    let Some(body) = body else {
        panic!("expected a body setting");
    };
    let Node::Setting { key, value } = &**body else {
        panic!("expected a setting");
    };
    assert_eq!(key, "caption");
    assert_eq!(*value, SettingValue::Str("Radius".to_string()));
}

#[test]
fn test_param_block_typed_default() {
    let text = "default:\nint param max_iterations\ndefault = 50\nendparam\n";
    let sections = parse(text, &options()).unwrap();
    let Node::ParamBlock { body, .. } = &*sections.defaults.unwrap() else {
        panic!("expected a param block");
    };
    let Node::Setting { key, value } = &**body.as_ref().unwrap() else {
        panic!("expected a setting");
    };
    assert_eq!(key, "default");
    assert_eq!(*value, SettingValue::Int(50));
}

#[test]
fn test_param_block_without_type() {
    let text = "default:\nparam seed\nendparam\n";
    let sections = parse(text, &options()).unwrap();
    let Node::ParamBlock {
        param_type, name, ..
    } = &*sections.defaults.unwrap()
    else {
        panic!("expected a param block");
    };
    assert!(param_type.is_none());
    assert_eq!(name, "seed");
}

#[test]
fn test_param_enum_list() {
    let text = "default:\nint param style\nenum = \"one\" \"two\"\nendparam\n";
    let sections = parse(text, &options()).unwrap();
    let Node::ParamBlock { body, .. } = &*sections.defaults.unwrap() else {
        panic!("expected a param block");
    };
    let Node::Setting { value, .. } = &**body.as_ref().unwrap() else {
        panic!("expected a setting");
    };
    assert_eq!(
        *value,
        SettingValue::StrList(vec!["one".to_string(), "two".to_string()])
    );
}

#[test]
fn test_switch_type() {
    let sections = parse("switch:\ntype = \"julia\"\n", &options()).unwrap();
    let Node::Setting { key, value } = &*sections.type_switch.unwrap() else {
        panic!("expected a setting");
    };
    assert_eq!(key, "type");
    assert_eq!(*value, SettingValue::Str("julia".to_string()));
}

#[test]
fn test_switch_builtin_reference() {
    let sections = parse("switch:\nseed = p1\n", &options()).unwrap();
    let Node::Setting { key, value } = &*sections.type_switch.unwrap() else {
        panic!("expected a setting");
    };
    assert_eq!(key, "seed");
    assert_eq!(*value, SettingValue::SwitchRef("p1".to_string()));
}

#[test]
fn test_switch_requires_string_for_type() {
    let mut parser = Parser::new("switch:\ntype = julia\n", &options());
    assert!(parser.parse().is_none());
    assert_eq!(parser.errors()[0].code, ErrorCode::ExpectedString);
}

#[test]
fn test_default_after_formula_sections() {
    let text = "init:\nz = pixel\nloop:\nz = z*z\nbailout:\n|z| > 4\ndefault:\nmaxiter = 250\n";
    let sections = parse(text, &options()).expect("formula with defaults parses");
    assert!(sections.defaults.is_some());
    assert!(sections.bailout.is_some());
}

#[test]
fn test_switch_must_come_last() {
    let mut parser = Parser::new("switch:\ntype = \"julia\"\ndefault:\nmaxiter = 10\n", &options());
    assert!(parser.parse().is_none());
    assert_eq!(parser.errors()[0].code, ErrorCode::InvalidSectionOrder);
}
