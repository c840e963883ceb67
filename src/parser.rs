// ABOUTME: Recursive-descent / precedence-climbing parser: token stream to AST

use crate::ast::*;
use crate::error::PyrlError;
use crate::lexer::tokenize;
use crate::span::Span;
use crate::token::{Keyword, Operator, PerlRegex, Punct, Token, TokenKind};

/// Which block-body syntax is in force for the statement currently being
/// parsed. Nested `if`/`while`/`for` bodies inherit their enclosing style;
/// `def`, `class`, `method`/`init`, and test blocks each determine their own
/// body form from their own local syntax regardless of the enclosing style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Indented,
    Braced,
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn check_punct(&self, p: Punct) -> bool {
        matches!(self.peek(), TokenKind::Punct(x) if *x == p)
    }

    fn check_operator(&self, op: Operator) -> bool {
        matches!(self.peek(), TokenKind::Operator(x) if *x == op)
    }

    fn check_keyword(&self, k: Keyword) -> bool {
        matches!(self.peek(), TokenKind::Keyword(x) if *x == k)
    }

    fn err_unexpected(&self, expected: &str) -> PyrlError {
        let span = self.peek_span();
        let found = self.tokens[self.pos].kind_name();
        PyrlError::parse(format!("expected {}, found {}", expected, found), span)
    }

    fn expect_punct(&mut self, p: Punct) -> Result<Span, PyrlError> {
        if self.check_punct(p.clone()) {
            Ok(self.advance().span)
        } else {
            Err(self.err_unexpected(&format!("'{:?}'", p)))
        }
    }

    fn expect_keyword(&mut self, k: Keyword) -> Result<Span, PyrlError> {
        if self.check_keyword(k.clone()) {
            Ok(self.advance().span)
        } else {
            Err(self.err_unexpected(&format!("keyword '{:?}'", k)))
        }
    }

    fn expect_identifier(&mut self) -> Result<(String, Span), PyrlError> {
        if let TokenKind::Identifier(name) = self.peek().clone() {
            let span = self.advance().span;
            Ok((name, span))
        } else {
            Err(self.err_unexpected("an identifier"))
        }
    }

    fn expect_scalar_var(&mut self) -> Result<(String, Span), PyrlError> {
        if let TokenKind::ScalarVar(name) = self.peek().clone() {
            let span = self.advance().span;
            Ok((name, span))
        } else {
            Err(self.err_unexpected("a scalar variable ('$name')"))
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), TokenKind::Newline) {
            self.advance();
        }
    }

    /// Skips NEWLINE and stray ';' tokens between statements. Indented-style
    /// bodies are newline-terminated, but a ';' is accepted as an equivalent
    /// separator so the same statement can sit on one line (as braced bodies
    /// already require).
    fn skip_stmt_separators(&mut self) {
        loop {
            if matches!(self.peek(), TokenKind::Newline) || self.check_punct(Punct::Semicolon) {
                self.advance();
            } else {
                break;
            }
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, PyrlError> {
        let mut stmts = Vec::new();
        self.skip_stmt_separators();
        while !matches!(self.peek(), TokenKind::Eof) {
            stmts.push(self.parse_stmt(Style::Indented)?);
            self.skip_stmt_separators();
        }
        Ok(Program { stmts })
    }

    // ---- Block bodies ----

    fn parse_indented_body(&mut self) -> Result<Vec<Stmt>, PyrlError> {
        if !matches!(self.peek(), TokenKind::Newline) {
            return Err(self.err_unexpected("NEWLINE"));
        }
        self.skip_newlines();
        if !matches!(self.peek(), TokenKind::Indent) {
            return Err(self.err_unexpected("an indented block"));
        }
        self.advance();
        let mut stmts = Vec::new();
        loop {
            self.skip_stmt_separators();
            if matches!(self.peek(), TokenKind::Dedent) {
                self.advance();
                break;
            }
            if matches!(self.peek(), TokenKind::Eof) {
                return Err(self.err_unexpected("DEDENT"));
            }
            stmts.push(self.parse_stmt(Style::Indented)?);
        }
        Ok(stmts)
    }

    fn parse_braced_body(&mut self) -> Result<Vec<Stmt>, PyrlError> {
        self.expect_punct(Punct::LBrace)?;
        let mut stmts = Vec::new();
        loop {
            if self.check_punct(Punct::RBrace) {
                self.advance();
                break;
            }
            stmts.push(self.parse_stmt(Style::Braced)?);
            if self.check_punct(Punct::Semicolon) {
                self.advance();
                continue;
            }
            if self.check_punct(Punct::RBrace) {
                self.advance();
                break;
            }
            return Err(self.err_unexpected("';' or '}'"));
        }
        Ok(stmts)
    }

    fn parse_body(&mut self, style: Style) -> Result<Vec<Stmt>, PyrlError> {
        match style {
            Style::Indented => self.parse_indented_body(),
            Style::Braced => self.parse_braced_body(),
        }
    }

    // ---- Statements ----

    fn parse_stmt(&mut self, style: Style) -> Result<Stmt, PyrlError> {
        match self.peek().clone() {
            TokenKind::Keyword(Keyword::If) => self.parse_if(style),
            TokenKind::Keyword(Keyword::While) => self.parse_while(style),
            TokenKind::Keyword(Keyword::For) => self.parse_for(style),
            TokenKind::Keyword(Keyword::Def) => self.parse_funcdef_indented(),
            TokenKind::Keyword(Keyword::Class) => self.parse_classdef(),
            TokenKind::Keyword(Keyword::Test) => self.parse_test_block(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Print) => self.parse_print(),
            TokenKind::Keyword(Keyword::Assert) => self.parse_assert(),
            TokenKind::FuncVar(name) if !name.is_empty() && self.peek_at(1) == Some(&TokenKind::Punct(Punct::LParen)) => {
                self.parse_funcdef_anon_block()
            }
            _ => self.parse_simple_stmt(),
        }
    }

    fn parse_if(&mut self, style: Style) -> Result<Stmt, PyrlError> {
        let span = self.advance().span; // `if`
        let cond = self.parse_expr()?;
        if style == Style::Indented {
            self.expect_punct(Punct::Colon)?;
        }
        let then_body = self.parse_body(style)?;
        let mut elifs = Vec::new();
        loop {
            if style == Style::Indented {
                self.skip_newlines_lookahead_for(Keyword::Elif);
            }
            if self.check_keyword(Keyword::Elif) {
                self.advance();
                let c = self.parse_expr()?;
                if style == Style::Indented {
                    self.expect_punct(Punct::Colon)?;
                }
                let b = self.parse_body(style)?;
                elifs.push((c, b));
            } else {
                break;
            }
        }
        let else_body = if style == Style::Indented {
            self.skip_newlines_lookahead_for(Keyword::Else);
            if self.check_keyword(Keyword::Else) {
                self.advance();
                self.expect_punct(Punct::Colon)?;
                Some(self.parse_body(style)?)
            } else {
                None
            }
        } else if self.check_keyword(Keyword::Else) {
            self.advance();
            Some(self.parse_body(style)?)
        } else {
            None
        };
        Ok(Stmt::If { cond, then_body, elifs, else_body, span })
    }

    /// In indented style, `elif`/`else` appear as the next logical line at
    /// the same indentation as the `if` they continue, i.e. after the
    /// preceding body's DEDENT and any blank lines.
    fn skip_newlines_lookahead_for(&mut self, _k: Keyword) {
        self.skip_newlines();
    }

    fn parse_while(&mut self, style: Style) -> Result<Stmt, PyrlError> {
        let span = self.advance().span;
        let cond = self.parse_expr()?;
        if style == Style::Indented {
            self.expect_punct(Punct::Colon)?;
        }
        let body = self.parse_body(style)?;
        Ok(Stmt::While { cond, body, span })
    }

    fn parse_for(&mut self, style: Style) -> Result<Stmt, PyrlError> {
        let span = self.advance().span;
        let (var, _) = self.expect_scalar_var()?;
        self.expect_keyword(Keyword::In)?;
        let iter = self.parse_expr()?;
        if style == Style::Indented {
            self.expect_punct(Punct::Colon)?;
        }
        let body = self.parse_body(style)?;
        Ok(Stmt::For { var, iter, body, span })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, PyrlError> {
        let mut params = Vec::new();
        if self.check_punct(Punct::RParen) {
            return Ok(params);
        }
        loop {
            let is_vararg = self.check_operator(Operator::Star);
            if is_vararg {
                self.advance();
            }
            let (name, _) = self.expect_scalar_var()?;
            let default = if self.check_operator(Operator::Assign) {
                self.advance();
                Some(self.parse_expr()?)
            } else {
                None
            };
            params.push(Param { name, default, is_vararg });
            if self.check_punct(Punct::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        Ok(params)
    }

    fn parse_funcdef_indented(&mut self) -> Result<Stmt, PyrlError> {
        let span = self.advance().span; // `def`
        let (name, _) = self.expect_identifier()?;
        self.expect_punct(Punct::LParen)?;
        let params = self.parse_params()?;
        self.expect_punct(Punct::RParen)?;
        self.expect_punct(Punct::Colon)?;
        let body = self.parse_indented_body()?;
        Ok(Stmt::FuncDef { name, params, body, kind: FuncKind::Indented, span })
    }

    fn parse_funcdef_anon_block(&mut self) -> Result<Stmt, PyrlError> {
        let (name, span) = if let TokenKind::FuncVar(name) = self.peek().clone() {
            let span = self.advance().span;
            (name, span)
        } else {
            unreachable!("caller verified FuncVar lookahead")
        };
        self.expect_punct(Punct::LParen)?;
        let params = self.parse_params()?;
        self.expect_punct(Punct::RParen)?;
        self.expect_operator(Operator::Assign)?;
        let body = self.parse_braced_body()?;
        Ok(Stmt::FuncDef { name, params, body, kind: FuncKind::AnonBlock, span })
    }

    fn expect_operator(&mut self, op: Operator) -> Result<Span, PyrlError> {
        if self.check_operator(op.clone()) {
            Ok(self.advance().span)
        } else {
            Err(self.err_unexpected(&format!("operator '{:?}'", op)))
        }
    }

    fn parse_classdef(&mut self) -> Result<Stmt, PyrlError> {
        let span = self.advance().span; // `class`
        let (name, _) = self.expect_identifier()?;
        let parent = if self.check_keyword(Keyword::Extends) {
            self.advance();
            Some(self.expect_identifier()?.0)
        } else {
            None
        };
        let members = if self.check_punct(Punct::Colon) {
            self.advance();
            self.parse_class_members_indented()?
        } else {
            self.parse_class_members_braced()?
        };
        Ok(Stmt::ClassDef { name, parent, members, span })
    }

    fn parse_class_members_indented(&mut self) -> Result<Vec<ClassMember>, PyrlError> {
        self.skip_newlines();
        if !matches!(self.peek(), TokenKind::Indent) {
            return Err(self.err_unexpected("an indented class body"));
        }
        self.advance();
        let mut members = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek(), TokenKind::Dedent) {
                self.advance();
                break;
            }
            members.push(self.parse_class_member()?);
        }
        Ok(members)
    }

    fn parse_class_members_braced(&mut self) -> Result<Vec<ClassMember>, PyrlError> {
        self.expect_punct(Punct::LBrace)?;
        let mut members = Vec::new();
        loop {
            if self.check_punct(Punct::RBrace) {
                self.advance();
                break;
            }
            members.push(self.parse_class_member()?);
            if self.check_punct(Punct::Semicolon) {
                self.advance();
                continue;
            }
            if self.check_punct(Punct::RBrace) {
                self.advance();
                break;
            }
            return Err(self.err_unexpected("';' or '}'"));
        }
        Ok(members)
    }

    fn parse_class_member(&mut self) -> Result<ClassMember, PyrlError> {
        match self.peek().clone() {
            TokenKind::Keyword(Keyword::Prop) => {
                let span = self.advance().span;
                let (name, _) = self.expect_identifier()?;
                let default = if self.check_operator(Operator::Assign) {
                    self.advance();
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                Ok(ClassMember::Prop { name, default, span })
            }
            TokenKind::Keyword(Keyword::Method) => {
                let span = self.advance().span;
                let (name, _) = self.expect_identifier()?;
                self.expect_punct(Punct::LParen)?;
                let params = self.parse_params()?;
                self.expect_punct(Punct::RParen)?;
                self.expect_operator(Operator::Assign)?;
                let body = self.parse_braced_body()?;
                Ok(ClassMember::Method { name, params, body, is_init: false, span })
            }
            TokenKind::Keyword(Keyword::Init) => {
                let span = self.advance().span;
                self.expect_punct(Punct::LParen)?;
                let params = self.parse_params()?;
                self.expect_punct(Punct::RParen)?;
                self.expect_operator(Operator::Assign)?;
                let body = self.parse_braced_body()?;
                Ok(ClassMember::Method { name: "init".to_string(), params, body, is_init: true, span })
            }
            _ => Err(self.err_unexpected("'prop', 'method', or 'init'")),
        }
    }

    fn parse_test_block(&mut self) -> Result<Stmt, PyrlError> {
        let span = self.advance().span; // `test`
        let label = match self.peek().clone() {
            TokenKind::Str(s) => {
                self.advance();
                s
            }
            _ => return Err(self.err_unexpected("a string label")),
        };
        let body = self.parse_braced_body()?;
        Ok(Stmt::TestBlock { label, body, span })
    }

    fn parse_return(&mut self) -> Result<Stmt, PyrlError> {
        let span = self.advance().span;
        let at_terminator = matches!(self.peek(), TokenKind::Newline)
            || self.check_punct(Punct::Semicolon)
            || self.check_punct(Punct::RBrace)
            || matches!(self.peek(), TokenKind::Dedent)
            || matches!(self.peek(), TokenKind::Eof);
        let value = if at_terminator { None } else { Some(self.parse_expr()?) };
        Ok(Stmt::Return { value, span })
    }

    fn parse_print(&mut self) -> Result<Stmt, PyrlError> {
        let span = self.advance().span;
        self.expect_punct(Punct::LParen)?;
        let mut args = Vec::new();
        if !self.check_punct(Punct::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.check_punct(Punct::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect_punct(Punct::RParen)?;
        Ok(Stmt::Print { args, span })
    }

    fn parse_assert(&mut self) -> Result<Stmt, PyrlError> {
        let span = self.advance().span;
        let cond = self.parse_expr()?;
        Ok(Stmt::Assert { cond, span })
    }

    fn parse_simple_stmt(&mut self) -> Result<Stmt, PyrlError> {
        let span = self.peek_span();
        let expr = self.parse_expr()?;
        if self.check_operator(Operator::Assign) {
            self.advance();
            let target = Self::expr_to_assign_target(expr)?;
            let value = self.parse_expr()?;
            Ok(Stmt::Assign { target, value, span })
        } else {
            Ok(Stmt::ExprStmt { expr, span })
        }
    }

    fn expr_to_assign_target(expr: Expr) -> Result<AssignTarget, PyrlError> {
        match expr {
            Expr::VarRef { sigil, name, span } => Ok(AssignTarget::Var { sigil, name, span }),
            Expr::Index { collection, key, span } => Ok(AssignTarget::Index { collection, key, span }),
            Expr::Attr { obj, name, span } => Ok(AssignTarget::Attr { obj, name, span }),
            other => Err(PyrlError::parse("invalid assignment target", other.span())),
        }
    }

    // ---- Expressions (precedence climbing) ----

    pub fn parse_expr(&mut self) -> Result<Expr, PyrlError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, PyrlError> {
        let mut left = self.parse_and()?;
        while self.check_keyword(Keyword::Or) {
            let span = self.advance().span;
            let right = self.parse_and()?;
            left = Expr::Or { left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, PyrlError> {
        let mut left = self.parse_not()?;
        while self.check_keyword(Keyword::And) {
            let span = self.advance().span;
            let right = self.parse_not()?;
            left = Expr::And { left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, PyrlError> {
        if self.check_keyword(Keyword::Not) {
            let span = self.advance().span;
            let inner = self.parse_not()?;
            Ok(Expr::Not { expr: Box::new(inner), span })
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, PyrlError> {
        let left = self.parse_additive()?;
        let (compare_op, is_match) = match self.peek() {
            TokenKind::Operator(Operator::Eq) => (Some(CompareOp::Eq), false),
            TokenKind::Operator(Operator::Ne) => (Some(CompareOp::Ne), false),
            TokenKind::Operator(Operator::Lt) => (Some(CompareOp::Lt), false),
            TokenKind::Operator(Operator::Gt) => (Some(CompareOp::Gt), false),
            TokenKind::Operator(Operator::Le) => (Some(CompareOp::Le), false),
            TokenKind::Operator(Operator::Ge) => (Some(CompareOp::Ge), false),
            TokenKind::Keyword(Keyword::In) => (Some(CompareOp::In), false),
            TokenKind::Operator(Operator::Match) => (None, true),
            TokenKind::Operator(Operator::NotMatch) => (None, true),
            _ => (None, false),
        };
        if is_match {
            let negated = matches!(self.peek(), TokenKind::Operator(Operator::NotMatch));
            let span = self.advance().span;
            return self.parse_regex_rhs(left, negated, span);
        }
        if let Some(op) = compare_op {
            let span = self.advance().span;
            let right = self.parse_additive()?;
            return Ok(Expr::Compare { left: Box::new(left), op, right: Box::new(right), span });
        }
        Ok(left)
    }

    fn parse_regex_rhs(&mut self, target: Expr, negated: bool, span: Span) -> Result<Expr, PyrlError> {
        match self.peek().clone() {
            TokenKind::Regex(PerlRegex::Subst { pattern, replacement, flags }) => {
                self.advance();
                Ok(Expr::RegexSubst { target: Box::new(target), pattern, replacement, flags, span })
            }
            TokenKind::Regex(PerlRegex::Match { pattern, flags }) => {
                self.advance();
                let pattern_expr = Expr::RegexLit { pattern, flags, span };
                Ok(Expr::RegexMatch { target: Box::new(target), pattern: Box::new(pattern_expr), negated, span })
            }
            TokenKind::Regex(PerlRegex::Compiled { pattern, flags }) => {
                self.advance();
                let pattern_expr = Expr::RegexLit { pattern, flags, span };
                Ok(Expr::RegexMatch { target: Box::new(target), pattern: Box::new(pattern_expr), negated, span })
            }
            _ => {
                let pattern_expr = self.parse_additive()?;
                Ok(Expr::RegexMatch { target: Box::new(target), pattern: Box::new(pattern_expr), negated, span })
            }
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, PyrlError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Operator(Operator::Plus) => BinaryOp::Add,
                TokenKind::Operator(Operator::Minus) => BinaryOp::Sub,
                _ => break,
            };
            let span = self.advance().span;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, PyrlError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Operator(Operator::Star) => BinaryOp::Mul,
                TokenKind::Operator(Operator::Slash) => BinaryOp::Div,
                TokenKind::Operator(Operator::DoubleSlash) => BinaryOp::FloorDiv,
                TokenKind::Operator(Operator::Percent) => BinaryOp::Mod,
                _ => break,
            };
            let span = self.advance().span;
            let right = self.parse_unary()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, PyrlError> {
        let op = match self.peek() {
            TokenKind::Operator(Operator::Plus) => Some(UnaryOp::Pos),
            TokenKind::Operator(Operator::Minus) => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            let span = self.advance().span;
            let inner = self.parse_unary()?;
            Ok(Expr::Unary { op, expr: Box::new(inner), span })
        } else {
            self.parse_power()
        }
    }

    fn parse_power(&mut self) -> Result<Expr, PyrlError> {
        let base = self.parse_postfix()?;
        let is_pow = matches!(
            self.peek(),
            TokenKind::Operator(Operator::DoubleStar) | TokenKind::Operator(Operator::Caret)
        );
        if is_pow {
            let span = self.advance().span;
            let exponent = self.parse_unary()?;
            Ok(Expr::Binary { op: BinaryOp::Pow, left: Box::new(base), right: Box::new(exponent), span })
        } else {
            Ok(base)
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, PyrlError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().clone() {
                TokenKind::Punct(Punct::LParen) => {
                    let span = self.advance().span;
                    let args = self.parse_args()?;
                    self.expect_punct(Punct::RParen)?;
                    expr = Expr::Call { callee: Box::new(expr), args, span };
                }
                TokenKind::Punct(Punct::LBracket) => {
                    let span = self.advance().span;
                    let key = self.parse_expr()?;
                    self.expect_punct(Punct::RBracket)?;
                    expr = Expr::Index { collection: Box::new(expr), key: Box::new(key), span };
                }
                TokenKind::Punct(Punct::Dot) => {
                    let span = self.advance().span;
                    let (name, _) = self.expect_identifier()?;
                    if self.check_punct(Punct::LParen) {
                        self.advance();
                        let args = self.parse_args()?;
                        self.expect_punct(Punct::RParen)?;
                        expr = Expr::MethodCall { obj: Box::new(expr), name, args, span };
                    } else {
                        expr = Expr::Attr { obj: Box::new(expr), name, span };
                    }
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, PyrlError> {
        let mut args = Vec::new();
        if self.check_punct(Punct::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.check_punct(Punct::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, PyrlError> {
        let span = self.peek_span();
        match self.peek().clone() {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::Literal { value: Literal::Int(n), span })
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(Expr::Literal { value: Literal::Float(n), span })
            }
            TokenKind::Str(s) | TokenKind::RawStr(s) => {
                self.advance();
                Ok(Expr::Literal { value: Literal::Str(s), span })
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal { value: Literal::Bool(true), span })
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal { value: Literal::Bool(false), span })
            }
            TokenKind::Keyword(Keyword::None) => {
                self.advance();
                Ok(Expr::Literal { value: Literal::None, span })
            }
            TokenKind::ScalarVar(name) => {
                self.advance();
                Ok(Expr::VarRef { sigil: Sigil::Scalar, name, span })
            }
            TokenKind::ArrayVar(name) => {
                self.advance();
                Ok(Expr::VarRef { sigil: Sigil::Array, name, span })
            }
            TokenKind::HashVar(name) => {
                self.advance();
                Ok(Expr::VarRef { sigil: Sigil::Hash, name, span })
            }
            TokenKind::FuncVar(name) => {
                if name.is_empty() && self.peek_at(1) == Some(&TokenKind::Punct(Punct::LParen)) {
                    self.advance();
                    self.parse_lambda(span)
                } else {
                    self.advance();
                    Ok(Expr::VarRef { sigil: Sigil::Func, name, span })
                }
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::IdentRef { name, span })
            }
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_punct(Punct::RParen)?;
                Ok(inner)
            }
            TokenKind::Punct(Punct::LBracket) => {
                self.advance();
                let mut elems = Vec::new();
                if !self.check_punct(Punct::RBracket) {
                    loop {
                        elems.push(self.parse_expr()?);
                        if self.check_punct(Punct::Comma) {
                            self.advance();
                            continue;
                        }
                        break;
                    }
                }
                self.expect_punct(Punct::RBracket)?;
                Ok(Expr::ListLit { elems, span })
            }
            TokenKind::Punct(Punct::LBrace) => {
                self.advance();
                let mut pairs = Vec::new();
                if !self.check_punct(Punct::RBrace) {
                    loop {
                        let key = self.parse_expr()?;
                        self.expect_punct(Punct::Colon)?;
                        let value = self.parse_expr()?;
                        pairs.push((key, value));
                        if self.check_punct(Punct::Comma) {
                            self.advance();
                            continue;
                        }
                        break;
                    }
                }
                self.expect_punct(Punct::RBrace)?;
                Ok(Expr::HashLit { pairs, span })
            }
            TokenKind::Regex(PerlRegex::Match { pattern, flags })
            | TokenKind::Regex(PerlRegex::Compiled { pattern, flags }) => {
                self.advance();
                Ok(Expr::RegexLit { pattern, flags, span })
            }
            _ => Err(self.err_unexpected("an expression")),
        }
    }

    fn parse_lambda(&mut self, span: Span) -> Result<Expr, PyrlError> {
        self.expect_punct(Punct::LParen)?;
        let params = self.parse_params()?;
        self.expect_punct(Punct::RParen)?;
        self.expect_punct(Punct::Colon)?;
        let body = self.parse_expr()?;
        Ok(Expr::Lambda { params, body: Box::new(body), span })
    }
}

pub fn parse(source: &str) -> Result<Program, PyrlError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        let prog = parse("$x = 5\n").unwrap();
        assert_eq!(prog.stmts.len(), 1);
        assert!(matches!(prog.stmts[0], Stmt::Assign { .. }));
    }

    #[test]
    fn test_parse_if_indented() {
        let prog = parse("if $x > 0:\n    print($x)\n").unwrap();
        match &prog.stmts[0] {
            Stmt::If { then_body, elifs, else_body, .. } => {
                assert_eq!(then_body.len(), 1);
                assert!(elifs.is_empty());
                assert!(else_body.is_none());
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_if_elif_else_indented() {
        let src = "if $x > 0:\n    print(1)\nelif $x < 0:\n    print(2)\nelse:\n    print(3)\n";
        let prog = parse(src).unwrap();
        match &prog.stmts[0] {
            Stmt::If { elifs, else_body, .. } => {
                assert_eq!(elifs.len(), 1);
                assert!(else_body.is_some());
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_anon_block_function() {
        let src = "&reverse_string($s) = {\n    return $s\n}\n";
        let prog = parse(src).unwrap();
        match &prog.stmts[0] {
            Stmt::FuncDef { name, kind, .. } => {
                assert_eq!(name, "reverse_string");
                assert_eq!(*kind, FuncKind::AnonBlock);
            }
            other => panic!("expected FuncDef, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_class_braced() {
        let src = "class Counter { prop count = 0 ;\n  init() = { $count = 0 } ;\n  method inc() = { $count = $count + 1 } }\n";
        let prog = parse(src).unwrap();
        match &prog.stmts[0] {
            Stmt::ClassDef { name, members, .. } => {
                assert_eq!(name, "Counter");
                assert_eq!(members.len(), 3);
            }
            other => panic!("expected ClassDef, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_precedence() {
        // 2 + 3 * 4 should group as 2 + (3 * 4)
        let prog = parse("$x = 2 + 3 * 4\n").unwrap();
        match &prog.stmts[0] {
            Stmt::Assign { value, .. } => match value {
                Expr::Binary { op: BinaryOp::Add, right, .. } => {
                    assert!(matches!(**right, Expr::Binary { op: BinaryOp::Mul, .. }));
                }
                other => panic!("expected Add at top, got {:?}", other),
            },
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_power_right_associative() {
        let prog = parse("$x = 2 ** 3 ** 2\n").unwrap();
        match &prog.stmts[0] {
            Stmt::Assign { value, .. } => match value {
                Expr::Binary { op: BinaryOp::Pow, right, .. } => {
                    assert!(matches!(**right, Expr::Binary { op: BinaryOp::Pow, .. }));
                }
                other => panic!("expected Pow at top, got {:?}", other),
            },
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_index_and_assign_target() {
        let prog = parse("%u[\"email\"] = \"a@x\"\n").unwrap();
        assert!(matches!(prog.stmts[0], Stmt::Assign { target: AssignTarget::Index { .. }, .. }));
    }

    #[test]
    fn test_parse_method_call() {
        let prog = parse("$c.inc()\n").unwrap();
        match &prog.stmts[0] {
            Stmt::ExprStmt { expr: Expr::MethodCall { name, .. }, .. } => assert_eq!(name, "inc"),
            other => panic!("expected MethodCall, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_regex_match() {
        let prog = parse("if $t =~ m/world/ :\n    print(\"yes\")\n").unwrap();
        match &prog.stmts[0] {
            Stmt::If { cond, .. } => assert!(matches!(cond, Expr::RegexMatch { .. })),
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_for_braced_in_anon_block() {
        let src = "&f($s) = {\n    while $i >= 0 {\n        $i = $i - 1\n    };\n    return $i\n}\n";
        let prog = parse(src).unwrap();
        assert!(matches!(prog.stmts[0], Stmt::FuncDef { .. }));
    }

    #[test]
    fn test_parse_hash_literal() {
        let prog = parse("%u = {\"name\": \"Alice\", \"age\": 30}\n").unwrap();
        match &prog.stmts[0] {
            Stmt::Assign { value: Expr::HashLit { pairs, .. }, .. } => assert_eq!(pairs.len(), 2),
            other => panic!("expected HashLit assign, got {:?}", other),
        }
    }
}
