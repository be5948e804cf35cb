//! Recursive descent parser for the formula language
//!
//! Single pass with one token of look-ahead. A handful of ambiguous
//! prefixes (complex literal vs parenthesised expression, built-in
//! function call vs variable reference) are resolved by tracking consumed
//! tokens and replaying them through the lexer's push-back on rollback.
//!
//! Precedence, lowest to highest: logical, relational, assignment,
//! additive, multiplicative, unary, power. Power is left-associative:
//! `2^3^2` is `(2^3)^2 = 64`.

mod sections;

use fractal_formula_runtime::Complex;

use crate::ast::{BinaryOp, Expr, FormulaSections, Node, UnaryOp};
use crate::error::{Diagnostic, ErrorCode};
use crate::lexer::{self, Lexer};
use crate::token::{is_builtin_name, Token, TokenKind};

/// Parser options
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Downgrade assignment-to-builtin from an error to a warning.
    pub allow_builtin_assignment: bool,
    /// Recognise sections, strings and the other extensions; off for
    /// legacy one-line formulas.
    pub recognize_extensions: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            allow_builtin_assignment: true,
            recognize_extensions: true,
        }
    }
}

/// Formula parser
pub struct Parser<'a> {
    sections: FormulaSections,
    lexer: Lexer<'a>,
    curr: Token<'a>,
    tracked: Vec<Token<'a>>,
    tracking: bool,
    options: Options,
    warnings: Vec<Diagnostic>,
    errors: Vec<Diagnostic>,
}

impl std::fmt::Debug for Parser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("curr", &self.curr)
            .field("warnings", &self.warnings.len())
            .field("errors", &self.errors.len())
            .finish()
    }
}

/// Parse a formula text; `None` on any recorded error.
pub fn parse(text: &str, options: &Options) -> Option<FormulaSections> {
    Parser::new(text, options).parse()
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str, options: &Options) -> Self {
        let lexer_options = lexer::Options {
            recognize_extensions: options.recognize_extensions,
        };
        Self {
            sections: FormulaSections::default(),
            lexer: Lexer::new(text, lexer_options),
            curr: Token::new(TokenKind::EndOfInput, 0, 0),
            tracked: Vec::new(),
            tracking: false,
            options: *options,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Parse the whole formula. Returns `None` instead of a partially
    /// constructed tree whenever an error was recorded.
    pub fn parse(&mut self) -> Option<FormulaSections> {
        self.advance();
        self.skip_separators();
        if self.options.recognize_extensions {
            if let Some(success) = self.section_formula() {
                return self.finish(success);
            }
        }

        let result = if self.check(TokenKind::Colon) {
            // no init statements before the colon
            Some(Node::sequence(Vec::new()))
        } else {
            self.sequence()
        };
        let Some(result) = result else {
            return self.finish(false);
        };

        let result = if self.match_kind(TokenKind::Colon) {
            self.sections.initialize = Some(result);
            match self.sequence() {
                Some(result) => result,
                None => return self.finish(false),
            }
        } else {
            self.sections.initialize = Some(Node::sequence(Vec::new()));
            result
        };

        self.split_iterate_bailout(result);
        self.finish(true)
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    fn finish(&mut self, success: bool) -> Option<FormulaSections> {
        if success && self.errors.is_empty() {
            Some(std::mem::take(&mut self.sections))
        } else {
            None
        }
    }

    /// The last statement of a legacy formula is the bailout; whatever
    /// precedes it is the iterate section.
    fn split_iterate_bailout(&mut self, expr: Expr) {
        if let Node::StatementSeq(statements) = &*expr {
            if statements.len() > 1 {
                let mut statements = statements.clone();
                self.sections.bailout = statements.pop();
                self.sections.iterate = Some(Node::sequence(statements));
                return;
            }
        }
        self.sections.iterate = Some(Node::sequence(Vec::new()));
        self.sections.bailout = Some(expr);
    }

    // ==================== token management ====================

    pub(crate) fn advance(&mut self) {
        self.curr = self.lexer.next_token();
        if self.curr.kind == TokenKind::Invalid {
            self.error(ErrorCode::InvalidToken);
        }
        if self.tracking {
            self.tracked.push(self.curr);
        }
    }

    fn begin_tracking(&mut self) {
        self.tracked.clear();
        self.tracking = true;
    }

    fn end_tracking(&mut self) {
        self.tracked.clear();
        self.tracking = false;
    }

    /// Replay the tracked tokens through the lexer and restore the token
    /// that was current when tracking began.
    fn backtrack(&mut self, saved: Token<'a>) {
        for token in std::mem::take(&mut self.tracked) {
            self.lexer.put_token(token);
        }
        self.tracking = false;
        self.curr = saved;
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.curr.kind == kind
    }

    pub(crate) fn check_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.curr.kind)
    }

    pub(crate) fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    /// Skip comma and end-of-line separators; true if any were consumed.
    pub(crate) fn skip_separators(&mut self) -> bool {
        let mut found = false;
        while self.check_any(&[TokenKind::Comma, TokenKind::Terminator]) {
            self.advance();
            found = true;
        }
        found
    }

    pub(crate) fn warning(&mut self, code: ErrorCode) {
        self.warnings.push(Diagnostic {
            code,
            location: self.lexer.source_location(),
        });
    }

    pub(crate) fn error(&mut self, code: ErrorCode) {
        self.errors.push(Diagnostic {
            code,
            location: self.lexer.source_location(),
        });
    }

    pub(crate) fn curr_text(&self) -> &'a str {
        self.curr.text()
    }

    // ==================== statements ====================

    pub(crate) fn sequence(&mut self) -> Option<Expr> {
        self.skip_separators();
        if self.curr.kind.is_section() {
            // empty body before the next section header
            return None;
        }

        let first = self.statement()?;
        let mut seq = vec![first];

        while self.check_any(&[TokenKind::Comma, TokenKind::Terminator]) {
            self.skip_separators();
            if self.check(TokenKind::EndOfInput) || self.curr.kind.is_section() {
                break;
            }
            let Some(statement) = self.statement() else {
                break;
            };
            seq.push(statement);
        }

        if seq.len() == 1 {
            return seq.pop();
        }
        Some(Node::sequence(seq))
    }

    fn statement(&mut self) -> Option<Expr> {
        if self.check(TokenKind::If) {
            return self.if_statement();
        }
        self.conjunctive()
    }

    fn if_statement(&mut self) -> Option<Expr> {
        let result = self.if_statement_no_endif()?;
        if !self.match_kind(TokenKind::Endif) {
            self.error(ErrorCode::ExpectedEndif);
            return None;
        }
        Some(result)
    }

    fn if_statement_no_endif(&mut self) -> Option<Expr> {
        if !self.match_kind(TokenKind::If) && !self.match_kind(TokenKind::Elseif) {
            return None;
        }

        if !self.match_kind(TokenKind::OpenParen) {
            self.error(ErrorCode::ExpectedOpenParen);
            return None;
        }
        let condition = self.conjunctive()?;
        if !self.match_kind(TokenKind::CloseParen) {
            self.error(ErrorCode::ExpectedCloseParen);
            return None;
        }
        if !self.skip_separators() {
            self.error(ErrorCode::ExpectedStatementSeparator);
            return None;
        }

        let then_block = self.block();

        let else_block = if self.check(TokenKind::Elseif) {
            // an elseif chains as a nested if without its own endif
            Some(self.if_statement_no_endif()?)
        } else if self.match_kind(TokenKind::Else) {
            if !self.skip_separators() {
                self.error(ErrorCode::ExpectedStatementSeparator);
                return None;
            }
            self.block()
        } else {
            None
        };

        Some(std::rc::Rc::new(Node::If {
            condition,
            then_block,
            else_block,
        }))
    }

    /// A block inside if/elseif/else; `None` means an empty block.
    fn block(&mut self) -> Option<Expr> {
        let at_block_end =
            |p: &Self| p.check_any(&[TokenKind::Endif, TokenKind::Else, TokenKind::Elseif]);
        if at_block_end(self) {
            return None;
        }

        let mut statements = Vec::new();
        while !at_block_end(self) {
            let Some(statement) = self.statement() else {
                if statements.is_empty() {
                    return None;
                }
                break;
            };
            statements.push(statement);

            if self.check_any(&[TokenKind::Comma, TokenKind::Terminator]) {
                self.skip_separators();
                continue;
            }
            break;
        }

        match statements.len() {
            0 => None,
            1 => statements.pop(),
            _ => Some(Node::sequence(statements)),
        }
    }

    // ==================== expressions ====================

    pub(crate) fn conjunctive(&mut self) -> Option<Expr> {
        let mut left = self.comparative()?;
        while self.check_any(&[TokenKind::LogicalAnd, TokenKind::LogicalOr]) {
            let op = if self.check(TokenKind::LogicalAnd) {
                BinaryOp::And
            } else {
                BinaryOp::Or
            };
            self.advance();
            let right = self.comparative()?;
            left = Node::binary(left, op, right);
        }
        Some(left)
    }

    fn comparative(&mut self) -> Option<Expr> {
        let mut left = self.assignment()?;
        loop {
            let op = match self.curr.kind {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                TokenKind::Equal => BinaryOp::Equal,
                TokenKind::NotEqual => BinaryOp::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.assignment()?;
            left = Node::binary(left, op, right);
        }
        Some(left)
    }

    fn assignment(&mut self) -> Option<Expr> {
        let left = self.additive()?;

        // right-associative: a = b = expr binds to the right
        if self.check(TokenKind::Assign) {
            let Node::Identifier(name) = &*left else {
                self.error(ErrorCode::ExpectedIdentifier);
                return None;
            };
            if is_builtin_name(name) {
                if self.options.allow_builtin_assignment {
                    self.warning(ErrorCode::BuiltinVariableAssignment);
                } else {
                    self.error(ErrorCode::BuiltinVariableAssignment);
                    return None;
                }
            }
            let name = name.clone();
            self.advance();
            let right = self.assignment()?;
            return Some(Node::assignment(name, right));
        }

        Some(left)
    }

    fn additive(&mut self) -> Option<Expr> {
        let mut left = self.term()?;
        while self.check_any(&[TokenKind::Plus, TokenKind::Minus]) {
            let op = if self.check(TokenKind::Plus) {
                BinaryOp::Add
            } else {
                BinaryOp::Sub
            };
            self.advance();
            let right = self.term()?;
            left = Node::binary(left, op, right);
        }
        Some(left)
    }

    fn term(&mut self) -> Option<Expr> {
        let mut left = self.unary()?;
        while self.check_any(&[TokenKind::Multiply, TokenKind::Divide]) {
            let op = if self.check(TokenKind::Multiply) {
                BinaryOp::Mul
            } else {
                BinaryOp::Div
            };
            self.advance();
            let right = self.unary()?;
            left = Node::binary(left, op, right);
        }
        Some(left)
    }

    fn unary(&mut self) -> Option<Expr> {
        if self.check_any(&[TokenKind::Plus, TokenKind::Minus]) {
            let op = if self.check(TokenKind::Plus) {
                UnaryOp::Plus
            } else {
                UnaryOp::Neg
            };
            self.advance();
            // allow chaining: --1
            let operand = self.unary()?;
            return Some(Node::unary(op, operand));
        }
        self.power()
    }

    fn power(&mut self) -> Option<Expr> {
        let mut left = self.primary()?;
        while self.check(TokenKind::Power) {
            self.advance();
            let right = self.primary()?;
            left = Node::binary(left, BinaryOp::Pow, right);
        }
        Some(left)
    }

    fn primary(&mut self) -> Option<Expr> {
        if self.check(TokenKind::Invalid) {
            self.error(ErrorCode::ExpectedPrimary);
            return None;
        }

        if let Some(result) = self.number() {
            return Some(result);
        }

        match self.builtin_function() {
            Err(()) => return None,
            Ok(Some(result)) => return Some(result),
            Ok(None) => {}
        }

        if let Some(result) = self.builtin_var() {
            return Some(result);
        }

        // after the built-in checks, so legacy code using reserved names
        // as variables is detected
        if let Some(result) = self.identifier() {
            return Some(result);
        }

        if self.check(TokenKind::OpenParen) {
            self.advance();
            if let Some(expr) = self.complex_literal() {
                return Some(expr);
            }
            let expr = self.conjunctive()?;
            if self.check(TokenKind::CloseParen) {
                self.advance();
                return Some(expr);
            }
            self.error(ErrorCode::ExpectedCloseParen);
            return None;
        }

        // |expr| is the modulus operator
        if self.check(TokenKind::Modulus) {
            self.advance();
            let expr = self.conjunctive()?;
            if self.check(TokenKind::Modulus) {
                self.advance();
                return Some(Node::unary(UnaryOp::Mod, expr));
            }
            self.error(ErrorCode::ExpectedCloseModulus);
            return None;
        }

        self.error(ErrorCode::ExpectedPrimary);
        None
    }

    fn number(&mut self) -> Option<Expr> {
        if !self.check_any(&[
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Integer,
            TokenKind::Number,
        ]) {
            return None;
        }
        let negate = self.check(TokenKind::Minus);
        if self.check_any(&[TokenKind::Plus, TokenKind::Minus]) {
            // only commit to the sign when a literal follows; a bare sign
            // belongs to whoever called us
            let next = self.lexer.peek_token();
            if !matches!(next.kind, TokenKind::Integer | TokenKind::Number) {
                return None;
            }
            self.advance();
        }
        if self.check_any(&[TokenKind::Integer, TokenKind::Number]) {
            let value = self.curr.number();
            self.advance();
            return Some(Node::literal(if negate { -value } else { value }));
        }
        None
    }

    fn identifier(&mut self) -> Option<Expr> {
        if self.check(TokenKind::Identifier) {
            let result = Node::identifier(self.curr_text());
            self.advance();
            return Some(result);
        }

        // A built-in function name without a call: only usable as a plain
        // variable when builtin assignment is allowed.
        if self.curr.kind.is_builtin_fn() {
            if self.options.allow_builtin_assignment {
                let result = Node::identifier(self.curr_text());
                self.advance();
                self.warning(ErrorCode::BuiltinFunctionAssignment);
                return Some(result);
            }
            self.error(ErrorCode::BuiltinFunctionAssignment);
        }

        None
    }

    fn builtin_var(&mut self) -> Option<Expr> {
        if self.curr.kind.is_builtin_var() {
            let result = Node::identifier(self.curr_text());
            self.advance();
            return Some(result);
        }
        None
    }

    /// `Ok(Some)` means the call parsed; `Ok(None)` means not a call, any consumed
    /// tokens were pushed back; `Err` means a parse error was recorded.
    fn builtin_function(&mut self) -> Result<Option<Expr>, ()> {
        if !self.curr.kind.is_builtin_fn() {
            return Ok(None);
        }
        self.begin_tracking();
        let saved = self.curr;
        let name = self.curr_text().to_string();
        self.advance();
        match self.function_call() {
            Ok(Some(arg)) => {
                self.end_tracking();
                Ok(Some(Node::call(name, arg)))
            }
            Ok(None) => {
                // no '(' follows; treat the name as a variable reference
                self.backtrack(saved);
                Ok(None)
            }
            Err(()) => {
                self.end_tracking();
                Err(())
            }
        }
    }

    /// Parse the parenthesised argument of a function call.
    fn function_call(&mut self) -> Result<Option<Expr>, ()> {
        if !self.check(TokenKind::OpenParen) {
            return Ok(None);
        }
        self.advance();
        if let Some(expr) = self.complex_literal() {
            return Ok(Some(expr));
        }
        let Some(arg) = self.conjunctive() else {
            return Ok(None);
        };
        if self.check(TokenKind::CloseParen) {
            self.advance();
            return Ok(Some(arg));
        }
        self.error(ErrorCode::ExpectedCloseParen);
        Err(())
    }

    /// Commit to the complex-literal branch behind a track/backtrack pair.
    /// Entered with the opening paren already consumed.
    fn complex_literal(&mut self) -> Option<Expr> {
        self.begin_tracking();
        let saved = self.curr;
        if let Some(result) = self.complex() {
            self.end_tracking();
            return Some(result);
        }
        self.backtrack(saved);
        None
    }

    /// `signed_literal ',' signed_literal ')'`, consuming the close paren.
    fn complex(&mut self) -> Option<Expr> {
        let number_start = &[
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Integer,
            TokenKind::Number,
        ];
        if !self.check_any(number_start) {
            return None;
        }
        let mut negate = self.check(TokenKind::Minus);
        if self.check_any(&[TokenKind::Plus, TokenKind::Minus]) {
            self.advance();
        }
        if !self.check_any(&[TokenKind::Integer, TokenKind::Number]) {
            return None;
        }
        let mut re = self.curr.number();
        if negate {
            re = -re;
        }
        self.advance();

        if !self.check(TokenKind::Comma) {
            return None;
        }
        self.advance();

        negate = self.check(TokenKind::Minus);
        if !self.check_any(number_start) {
            return None;
        }
        if self.check_any(&[TokenKind::Plus, TokenKind::Minus]) {
            self.advance();
        }
        if !self.check_any(&[TokenKind::Integer, TokenKind::Number]) {
            return None;
        }
        let mut im = self.curr.number();
        if negate {
            im = -im;
        }
        self.advance();

        if !self.check(TokenKind::CloseParen) {
            return None;
        }
        self.advance();
        Some(Node::literal(Complex::new(re, im)))
    }
}
