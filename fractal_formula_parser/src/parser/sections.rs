//! Sectionised formula parsing
//!
//! Section headers, ordering and duplicate validation, the `builtin`,
//! `default` and `switch` section bodies, and parameter blocks.

use std::rc::Rc;

use fractal_formula_runtime::Complex;

use super::Parser;
use crate::ast::{Expr, Node, SettingValue};
use crate::error::ErrorCode;
use crate::token::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingType {
    Boolean,
    Integer,
    FloatingPoint,
    ComplexPair,
    Text,
    Enumeration,
    BooleanExpression,
    IntegerExpression,
}

const DEFAULT_SETTINGS: &[(&str, SettingType)] = &[
    ("angle", SettingType::FloatingPoint),
    ("center", SettingType::ComplexPair),
    ("helpfile", SettingType::Text),
    ("helptopic", SettingType::Text),
    ("magn", SettingType::FloatingPoint),
    ("maxiter", SettingType::Integer),
    ("method", SettingType::Enumeration),
    ("periodicity", SettingType::Integer),
    ("perturb", SettingType::BooleanExpression),
    ("precision", SettingType::IntegerExpression),
    ("rating", SettingType::Enumeration),
    ("render", SettingType::Boolean),
    ("skew", SettingType::FloatingPoint),
    ("stretch", SettingType::FloatingPoint),
    ("title", SettingType::Text),
];

impl<'a> Parser<'a> {
    /// Try to parse a sectionised formula. `None` means the input is not
    /// sectionised and the legacy grammar should be used; `Some(success)`
    /// means sections were (or failed to be) parsed.
    pub(crate) fn section_formula(&mut self) -> Option<bool> {
        if self.check(TokenKind::Colon) {
            return None;
        }

        while self.curr.kind.is_section() {
            let section = self.curr.kind;
            // the lexer consumed the section name and its colon together
            self.advance();
            if !self.check(TokenKind::Terminator) {
                self.error(ErrorCode::ExpectedTerminator);
                return Some(false);
            }
            self.advance();

            match section {
                TokenKind::Builtin => {
                    if self.sections.builtin.is_some() {
                        self.error(ErrorCode::DuplicateSection);
                        return Some(false);
                    }
                    if self.sections.per_image.is_some()
                        || self.sections.initialize.is_some()
                        || self.sections.iterate.is_some()
                        || self.sections.bailout.is_some()
                    {
                        self.error(ErrorCode::BuiltinSectionDisallowsOtherSections);
                        return Some(false);
                    }
                    if self.sections.defaults.is_some() || self.sections.type_switch.is_some() {
                        self.error(ErrorCode::InvalidSectionOrder);
                        return Some(false);
                    }
                    if !self.builtin_section() {
                        return Some(false);
                    }
                }
                TokenKind::Default => {
                    if self.sections.defaults.is_some() {
                        self.error(ErrorCode::DuplicateSection);
                        return Some(false);
                    }
                    if self.sections.type_switch.is_some() {
                        self.error(ErrorCode::InvalidSectionOrder);
                        return Some(false);
                    }
                    match self.default_section() {
                        Some(result) => self.sections.defaults = Some(result),
                        None => return Some(false),
                    }
                }
                TokenKind::Switch => {
                    if self.sections.type_switch.is_some() {
                        self.error(ErrorCode::DuplicateSection);
                        return Some(false);
                    }
                    if !self.switch_section() {
                        return Some(false);
                    }
                }
                _ => {
                    if let Some(result) = self.sequence() {
                        if !self.assign_section(section, result) {
                            return Some(false);
                        }
                    }
                }
            }
        }

        // an unknown name followed by a colon parses as a trailing
        // identifier statement, leaving the colon current
        if self.check(TokenKind::Colon) {
            self.error(ErrorCode::InvalidSection);
            return Some(false);
        }

        if self.check(TokenKind::EndOfInput) {
            return Some(true);
        }

        // wasn't a section-ized formula
        None
    }

    /// Store a formula-section body, enforcing declaration order,
    /// uniqueness and builtin exclusivity.
    fn assign_section(&mut self, section: TokenKind, result: Expr) -> bool {
        let sections = &self.sections;
        let (duplicate, builtin_conflict, out_of_order) = match section {
            TokenKind::Global => (
                sections.per_image.is_some(),
                false,
                sections.builtin.is_some()
                    || sections.initialize.is_some()
                    || sections.iterate.is_some()
                    || sections.bailout.is_some()
                    || sections.perturb_initialize.is_some()
                    || sections.perturb_iterate.is_some()
                    || sections.defaults.is_some()
                    || sections.type_switch.is_some(),
            ),
            TokenKind::Init => (
                sections.initialize.is_some(),
                sections.builtin.is_some(),
                sections.iterate.is_some()
                    || sections.bailout.is_some()
                    || sections.perturb_initialize.is_some()
                    || sections.perturb_iterate.is_some()
                    || sections.defaults.is_some()
                    || sections.type_switch.is_some(),
            ),
            TokenKind::Loop => (
                sections.iterate.is_some(),
                sections.builtin.is_some(),
                sections.bailout.is_some()
                    || sections.perturb_initialize.is_some()
                    || sections.perturb_iterate.is_some()
                    || sections.defaults.is_some()
                    || sections.type_switch.is_some(),
            ),
            TokenKind::Bailout => (
                sections.bailout.is_some(),
                sections.builtin.is_some(),
                sections.perturb_initialize.is_some()
                    || sections.perturb_iterate.is_some()
                    || sections.defaults.is_some()
                    || sections.type_switch.is_some(),
            ),
            TokenKind::PerturbInit => (
                sections.perturb_initialize.is_some(),
                false,
                sections.perturb_iterate.is_some()
                    || sections.defaults.is_some()
                    || sections.type_switch.is_some(),
            ),
            TokenKind::PerturbLoop => (
                sections.perturb_iterate.is_some(),
                false,
                sections.defaults.is_some() || sections.type_switch.is_some(),
            ),
            _ => return false,
        };

        if duplicate {
            self.error(ErrorCode::DuplicateSection);
            return false;
        }
        if builtin_conflict {
            self.error(ErrorCode::BuiltinSectionDisallowsOtherSections);
            return false;
        }
        if out_of_order {
            self.error(ErrorCode::InvalidSectionOrder);
            return false;
        }

        let slot = match section {
            TokenKind::Global => &mut self.sections.per_image,
            TokenKind::Init => &mut self.sections.initialize,
            TokenKind::Loop => &mut self.sections.iterate,
            TokenKind::Bailout => &mut self.sections.bailout,
            TokenKind::PerturbInit => &mut self.sections.perturb_initialize,
            TokenKind::PerturbLoop => &mut self.sections.perturb_iterate,
            _ => return false,
        };
        *slot = Some(result);
        true
    }

    /// The `builtin:` body is exactly `type = 1` or `type = 2`.
    fn builtin_section(&mut self) -> bool {
        if !self.check(TokenKind::Identifier) {
            self.error(ErrorCode::ExpectedIdentifier);
            return false;
        }
        if self.curr_text() != "type" {
            self.error(ErrorCode::BuiltinSectionInvalidKey);
            return false;
        }
        self.advance();

        if !self.check(TokenKind::Assign) {
            self.error(ErrorCode::ExpectedAssignment);
            return false;
        }
        self.advance();

        if !self.check(TokenKind::Integer) {
            self.error(ErrorCode::ExpectedInteger);
            return false;
        }
        let value = self.curr.integer();
        self.advance();

        if value != 1 && value != 2 {
            self.error(ErrorCode::BuiltinSectionInvalidType);
            return false;
        }

        if !self.check(TokenKind::Terminator) {
            self.error(ErrorCode::ExpectedTerminator);
            return false;
        }
        self.advance();

        self.sections.builtin = Some(Node::setting("type", SettingValue::Int(value)));
        true
    }

    // ==================== default section ====================

    fn default_section(&mut self) -> Option<Expr> {
        let mut settings = Vec::new();

        loop {
            while self.check(TokenKind::Terminator) {
                self.advance();
            }
            if self.check(TokenKind::EndOfInput) || self.curr.kind.is_section() {
                break;
            }
            match self.default_setting() {
                Some(setting) => settings.push(setting),
                None => break,
            }
        }

        match settings.len() {
            0 => None,
            1 => settings.pop(),
            _ => Some(Node::sequence(settings)),
        }
    }

    fn default_setting(&mut self) -> Option<Expr> {
        if self.check_any(&[TokenKind::TypeIdent, TokenKind::Param]) {
            return self.default_param_block();
        }

        // `center` lexes as a built-in variable but is a valid setting key
        let is_center = self.check(TokenKind::Center);
        if !(self.check(TokenKind::Identifier) || is_center) {
            self.error(ErrorCode::ExpectedIdentifier);
            return None;
        }
        let name = self.curr_text().to_string();
        self.advance();

        if !self.check(TokenKind::Assign) {
            self.error(ErrorCode::ExpectedAssignment);
            return None;
        }
        self.advance();

        let Some(&(_, setting_type)) = DEFAULT_SETTINGS.iter().find(|(n, _)| *n == name) else {
            self.error(ErrorCode::DefaultSectionInvalidKey);
            return None;
        };

        match setting_type {
            SettingType::Boolean => self.default_render_setting(),
            SettingType::Integer => self.default_integer_setting(&name),
            SettingType::FloatingPoint => self.default_number_setting(&name),
            SettingType::ComplexPair => self.default_complex_setting(&name),
            SettingType::Text => self.default_string_setting(&name),
            SettingType::Enumeration => self.default_enum_setting(&name),
            SettingType::BooleanExpression => self.default_perturb_setting(),
            SettingType::IntegerExpression => self.default_precision_setting(),
        }
    }

    fn expect_setting_terminator(&mut self) -> bool {
        if !self.check(TokenKind::Terminator) {
            self.error(ErrorCode::ExpectedTerminator);
            return false;
        }
        self.advance();
        true
    }

    fn default_integer_setting(&mut self, name: &str) -> Option<Expr> {
        if !self.check(TokenKind::Integer) {
            self.error(ErrorCode::ExpectedInteger);
            return None;
        }
        let value = self.curr.integer();
        self.advance();
        if !self.expect_setting_terminator() {
            return None;
        }
        Some(Node::setting(name, SettingValue::Int(value)))
    }

    fn default_number_setting(&mut self, name: &str) -> Option<Expr> {
        let Some(value) = self.signed_literal() else {
            self.error(ErrorCode::ExpectedFloatingPoint);
            return None;
        };
        if !self.expect_setting_terminator() {
            return None;
        }
        Some(Node::setting(name, SettingValue::Float(value)))
    }

    fn default_complex_setting(&mut self, name: &str) -> Option<Expr> {
        let value = self.complex_number()?;
        if !self.expect_setting_terminator() {
            return None;
        }
        Some(Node::setting(name, SettingValue::Complex(value)))
    }

    fn default_string_setting(&mut self, name: &str) -> Option<Expr> {
        if !self.check(TokenKind::Str) {
            self.error(ErrorCode::ExpectedString);
            return None;
        }
        let value = self.curr_text().to_string();
        self.advance();
        if !self.expect_setting_terminator() {
            return None;
        }
        Some(Node::setting(name, SettingValue::Str(value)))
    }

    fn default_enum_setting(&mut self, name: &str) -> Option<Expr> {
        match name {
            "method" => self.default_method_setting(),
            "rating" => self.default_rating_setting(),
            _ => None,
        }
    }

    fn default_method_setting(&mut self) -> Option<Expr> {
        if !self.check(TokenKind::Identifier) {
            self.error(ErrorCode::ExpectedIdentifier);
            return None;
        }
        let method = self.curr_text();
        if method != "guessing" && method != "multipass" && method != "onepass" {
            self.error(ErrorCode::DefaultSectionInvalidMethod);
            return None;
        }
        let method = method.to_string();
        self.advance();
        if !self.expect_setting_terminator() {
            return None;
        }
        Some(Node::setting("method", SettingValue::Enum(method)))
    }

    fn default_rating_setting(&mut self) -> Option<Expr> {
        if !self.check(TokenKind::Identifier) {
            return None;
        }
        let rating = match self.curr_text() {
            "recommended" => "recommended",
            "average" => "average",
            "notrecommended" | "notRecommended" => "notRecommended",
            _ => return None,
        };
        self.advance();
        if !self.check(TokenKind::Terminator) {
            return None;
        }
        self.advance();
        Some(Node::setting("rating", SettingValue::Enum(rating.to_string())))
    }

    fn default_render_setting(&mut self) -> Option<Expr> {
        if !self.check_any(&[TokenKind::True, TokenKind::False]) {
            return None;
        }
        let value = self.check(TokenKind::True);
        self.advance();
        if !self.check(TokenKind::Terminator) {
            return None;
        }
        self.advance();
        Some(Node::setting("render", SettingValue::Bool(value)))
    }

    fn default_perturb_setting(&mut self) -> Option<Expr> {
        if self.check_any(&[TokenKind::True, TokenKind::False]) {
            let value = self.check(TokenKind::True);
            self.advance();
            if !self.expect_setting_terminator() {
                return None;
            }
            return Some(Node::setting("perturb", SettingValue::Bool(value)));
        }

        let expr = self.conjunctive()?;
        if !self.expect_setting_terminator() {
            return None;
        }
        Some(Node::setting("perturb", SettingValue::Expr(expr)))
    }

    fn default_precision_setting(&mut self) -> Option<Expr> {
        let expr = self.conjunctive()?;
        if !self.check(TokenKind::Terminator) {
            return None;
        }
        self.advance();
        Some(Node::setting("precision", SettingValue::Expr(expr)))
    }

    // ==================== parameter blocks ====================

    /// `[type] param NAME <terminator> [setting] endparam`
    fn default_param_block(&mut self) -> Option<Expr> {
        let mut param_type = None;
        if !self.check(TokenKind::Param) {
            if !self.check(TokenKind::TypeIdent) {
                return None;
            }
            param_type = Some(self.curr_text().to_string());
            self.advance();
        }

        if !self.check(TokenKind::Param) {
            return None;
        }
        self.advance();

        if !self.check(TokenKind::Identifier) {
            self.error(ErrorCode::ExpectedIdentifier);
            return None;
        }
        let name = self.curr_text().to_string();
        self.advance();

        if !self.check(TokenKind::Terminator) {
            self.error(ErrorCode::ExpectedTerminator);
            return None;
        }
        self.advance();

        let mut body = None;
        if self.check(TokenKind::Identifier) {
            let setting = self.curr_text().to_string();
            self.advance();

            if !self.check(TokenKind::Assign) {
                self.error(ErrorCode::ExpectedAssignment);
                return None;
            }
            self.advance();

            let value = match setting.as_str() {
                "caption" | "hint" | "text" => self.param_string(&setting),
                "default" => self.param_default(param_type.as_deref()),
                "enabled" | "visible" => self.param_bool_expr(&setting),
                "enum" => self.param_enum(),
                "expanded" | "exponential" | "selectable" => self.param_bool(&setting),
                "min" | "max" => self.param_number(param_type.as_deref(), &setting),
                _ => {
                    self.error(ErrorCode::DefaultSectionInvalidKey);
                    None
                }
            };
            body = Some(value?);
            // consume the separator after the setting value
            self.advance();
        }

        self.skip_separators();

        if !self.check(TokenKind::EndParam) {
            return None;
        }
        self.advance();

        if !self.check_any(&[TokenKind::Terminator, TokenKind::EndOfInput]) {
            return None;
        }
        self.advance();

        Some(Rc::new(Node::ParamBlock {
            param_type,
            name,
            body,
        }))
    }

    fn param_string(&mut self, name: &str) -> Option<Expr> {
        if !self.check(TokenKind::Str) {
            return None;
        }
        let body = Node::setting(name, SettingValue::Str(self.curr_text().to_string()));
        self.advance();
        Some(body)
    }

    fn param_default(&mut self, param_type: Option<&str>) -> Option<Expr> {
        match param_type {
            Some("bool") => {
                if !self.check_any(&[TokenKind::True, TokenKind::False]) {
                    return None;
                }
                let body =
                    Node::setting("default", SettingValue::Bool(self.check(TokenKind::True)));
                self.advance();
                Some(body)
            }
            Some("int") => {
                if !self.check(TokenKind::Integer) {
                    return None;
                }
                let body = Node::setting("default", SettingValue::Int(self.curr.integer()));
                self.advance();
                Some(body)
            }
            Some("float") => {
                if !self.check(TokenKind::Number) {
                    return None;
                }
                let body = Node::setting("default", SettingValue::Float(self.curr.number()));
                self.advance();
                Some(body)
            }
            Some("complex") => {
                let value = self.complex_number()?;
                Some(Node::setting("default", SettingValue::Complex(value)))
            }
            _ => None,
        }
    }

    fn param_bool_expr(&mut self, name: &str) -> Option<Expr> {
        let expr = self.conjunctive()?;
        Some(Node::setting(name, SettingValue::Expr(expr)))
    }

    fn param_enum(&mut self) -> Option<Expr> {
        let mut values = Vec::new();
        while self.check(TokenKind::Str) {
            values.push(self.curr_text().to_string());
            self.advance();
        }
        if values.is_empty() {
            return None;
        }
        Some(Node::setting("enum", SettingValue::StrList(values)))
    }

    fn param_bool(&mut self, name: &str) -> Option<Expr> {
        if !self.check_any(&[TokenKind::True, TokenKind::False]) {
            return None;
        }
        let body = Node::setting(name, SettingValue::Bool(self.check(TokenKind::True)));
        self.advance();
        Some(body)
    }

    fn param_number(&mut self, param_type: Option<&str>, name: &str) -> Option<Expr> {
        match param_type {
            Some("int") => {
                let value = self.signed_literal()?;
                Some(Node::setting(name, SettingValue::Int(value as i64)))
            }
            Some("float") => {
                let value = self.signed_literal()?;
                Some(Node::setting(name, SettingValue::Float(value)))
            }
            Some("complex") => {
                let value = self.complex_number()?;
                Some(Node::setting(name, SettingValue::Complex(value)))
            }
            _ => None,
        }
    }

    // ==================== switch section ====================

    /// The `switch:` body is one `key = value` assignment.
    fn switch_section(&mut self) -> bool {
        if !self.check(TokenKind::Identifier) {
            self.error(ErrorCode::SwitchSectionInvalidKey);
            return false;
        }
        let name = self.curr_text().to_string();
        self.advance();

        if !self.check(TokenKind::Assign) {
            self.error(ErrorCode::ExpectedAssignment);
            return false;
        }
        self.advance();

        if name == "type" {
            if !self.check(TokenKind::Str) {
                self.error(ErrorCode::ExpectedString);
                return false;
            }
            let value = self.curr_text().to_string();
            self.advance();

            if !self.check(TokenKind::Terminator) {
                self.error(ErrorCode::ExpectedTerminator);
                return false;
            }
            self.advance();

            self.sections.type_switch = Some(Node::setting(name, SettingValue::Str(value)));
            return true;
        }

        // dest_param = builtin variable or parameter reference
        if !(self.curr.kind.is_builtin_var() || self.check(TokenKind::Identifier)) {
            self.error(ErrorCode::ExpectedIdentifier);
            return false;
        }
        let value = self.curr_text().to_string();
        self.advance();

        if !self.check(TokenKind::Terminator) {
            self.error(ErrorCode::ExpectedTerminator);
            return false;
        }
        self.advance();

        self.sections.type_switch = Some(Node::setting(name, SettingValue::SwitchRef(value)));
        true
    }

    // ==================== shared literal helpers ====================

    /// An optionally signed numeric literal; no diagnostics, the caller
    /// decides whether absence is an error.
    fn signed_literal(&mut self) -> Option<f64> {
        let prefix_op = self.check_any(&[TokenKind::Plus, TokenKind::Minus]);
        if !(self.check_any(&[TokenKind::Integer, TokenKind::Number]) || prefix_op) {
            return None;
        }
        let negative = self.check(TokenKind::Minus);
        if prefix_op {
            self.advance();
        }
        if self.check_any(&[TokenKind::Integer, TokenKind::Number]) {
            let value = self.curr.number();
            self.advance();
            return Some(if negative { -value } else { value });
        }
        None
    }

    /// A complex constant for settings: a bare signed literal, or a
    /// parenthesised `re , im` pair. Diagnostics are recorded here.
    fn complex_number(&mut self) -> Option<Complex> {
        if let Some(literal) = self.signed_literal() {
            return Some(Complex::new(literal, 0.0));
        }

        if !self.check(TokenKind::OpenParen) {
            self.error(ErrorCode::ExpectedOpenParen);
            return None;
        }
        self.advance();

        let Some(re) = self.signed_literal() else {
            self.error(ErrorCode::ExpectedFloatingPoint);
            return None;
        };

        if !self.check(TokenKind::Comma) {
            self.error(ErrorCode::ExpectedComma);
            return None;
        }
        self.advance();

        let Some(im) = self.signed_literal() else {
            self.error(ErrorCode::ExpectedFloatingPoint);
            return None;
        };

        if !self.check(TokenKind::CloseParen) {
            self.error(ErrorCode::ExpectedCloseParen);
            return None;
        }
        self.advance();

        Some(Complex::new(re, im))
    }
}
