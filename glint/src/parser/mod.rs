//! Recursive-descent parser producing the untyped syntax tree

use crate::ast::*;
use crate::error::{CompileError, Result};
use crate::lexer::Token;

#[cfg(test)]
mod tests;

/// Parse tokens into AST
pub fn parse(_filename: &str, source: &str, tokens: Vec<(Token, Span)>) -> Result<Program> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        prev_end: 0,
        eof: source.len(),
        line_breaks: source.match_indices('\n').map(|(offset, _)| offset).collect(),
    };
    parser.program()
}

struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    /// End offset of the last consumed token
    prev_end: usize,
    eof: usize,
    /// Offsets of every `\n` in the source
    line_breaks: Vec<usize>,
}

impl Parser {
    // ------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| *s)
            .unwrap_or(Span::new(self.eof, self.eof))
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let item = self.tokens.get(self.pos).cloned();
        if let Some((_, span)) = &item {
            self.prev_end = span.end;
            self.pos += 1;
        }
        item
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<Span> {
        if self.check(token) {
            if let Some((_, span)) = self.advance() {
                return Ok(span);
            }
        }
        Err(self.unexpected(&format!("`{token}`")))
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>> {
        if let Some(Token::Ident(_)) = self.peek() {
            if let Some((Token::Ident(name), span)) = self.advance() {
                return Ok(Spanned::new(name, span));
            }
        }
        Err(self.unexpected("identifier"))
    }

    /// Whether the next token starts on the line the last consumed token ended on
    fn on_same_line(&self) -> bool {
        let next = self.current_span().start;
        let breaks_before = |offset: usize| self.line_breaks.partition_point(|&b| b < offset);
        breaks_before(self.prev_end) == breaks_before(next)
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        let found = match self.peek() {
            Some(token) => format!("`{token}`"),
            None => "end of file".to_string(),
        };
        CompileError::parser(format!("expected {expected}, found {found}"), self.current_span())
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------

    fn program(&mut self) -> Result<Program> {
        let mut members = Vec::new();
        while self.peek().is_some() {
            members.push(self.member()?);
            self.eat(&Token::Semi);
        }
        Ok(Program { members })
    }

    fn member(&mut self) -> Result<Member> {
        match self.peek() {
            Some(Token::Package) => {
                self.advance();
                Ok(Member::Package(self.expect_ident()?))
            }
            Some(Token::Load) => {
                self.advance();
                let package = self.expect_ident()?;
                let include = self.eat(&Token::Include);
                Ok(Member::Load { package, include })
            }
            Some(Token::Var) => Ok(Member::Global(self.var_decl()?)),
            Some(Token::Function) => Ok(Member::Function(self.function()?)),
            _ => Err(self.unexpected("`package`, `load`, `var` or `function`")),
        }
    }

    fn function(&mut self) -> Result<FunctionDecl> {
        let start = self.expect(&Token::Function)?.start;
        let name = self.expect_ident()?;

        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                let name = self.expect_ident()?;
                let ty = self.type_clause()?;
                params.push(Param { name, ty });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;

        let ret_ty = if matches!(self.peek(), Some(Token::Ident(_))) {
            Some(self.type_clause()?)
        } else {
            None
        };

        if !self.check(&Token::LBrace) {
            return Err(self.unexpected("function body"));
        }
        let body = self.statement()?;

        Ok(FunctionDecl {
            name,
            params,
            ret_ty,
            body,
            span: self.span_from(start),
        })
    }

    fn type_clause(&mut self) -> Result<Spanned<TypeClause>> {
        let name = self.expect_ident()?;
        let start = name.span.start;
        let mut clause = TypeClause::named(name.node);
        if self.eat(&Token::LBracket) {
            clause.subtypes.push(self.type_clause()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(Spanned::new(clause, self.span_from(start)))
    }

    fn var_decl(&mut self) -> Result<VarDecl> {
        let start = self.expect(&Token::Var)?.start;
        let name = self.expect_ident()?;
        let ty = if matches!(self.peek(), Some(Token::Ident(_))) {
            Some(self.type_clause()?)
        } else {
            None
        };
        let init = if self.eat(&Token::Arrow) {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(VarDecl {
            name,
            ty,
            init,
            span: self.span_from(start),
        })
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// A statement followed by an optional `;`
    fn statement(&mut self) -> Result<Spanned<Stmt>> {
        let stmt = self.statement_inner()?;
        self.eat(&Token::Semi);
        Ok(stmt)
    }

    fn statement_inner(&mut self) -> Result<Spanned<Stmt>> {
        let start = self.current_span().start;
        let node = match self.peek() {
            Some(Token::Var) => Stmt::Declaration(self.var_decl()?),
            Some(Token::Return) => {
                self.advance();
                // a value must start on the `return` line
                let value = if self.starts_expression() && self.on_same_line() {
                    Some(self.expression()?)
                } else {
                    None
                };
                Stmt::Return(value)
            }
            Some(Token::While) => {
                self.advance();
                let cond = self.parenthesized()?;
                let body = Box::new(self.statement()?);
                Stmt::While { cond, body }
            }
            Some(Token::For) => {
                self.advance();
                self.expect(&Token::LParen)?;
                let init = Box::new(self.simple_statement()?);
                self.expect(&Token::Semi)?;
                let cond = self.expression()?;
                self.expect(&Token::Semi)?;
                let action = Box::new(self.simple_statement()?);
                self.expect(&Token::RParen)?;
                let body = Box::new(self.statement()?);
                Stmt::For {
                    init,
                    cond,
                    action,
                    body,
                }
            }
            Some(Token::From) => {
                self.advance();
                let iterator = self.expect_ident()?;
                self.expect(&Token::Arrow)?;
                let lower = self.expression()?;
                self.expect(&Token::To)?;
                let upper = self.expression()?;
                let body = Box::new(self.statement()?);
                Stmt::FromTo {
                    iterator,
                    lower,
                    upper,
                    body,
                }
            }
            Some(Token::Loop) => {
                self.advance();
                let count = self.parenthesized()?;
                let body = Box::new(self.statement()?);
                Stmt::Loop { count, body }
            }
            Some(Token::Break) => {
                self.advance();
                Stmt::Break
            }
            Some(Token::Continue) => {
                self.advance();
                Stmt::Continue
            }
            Some(Token::If) => {
                self.advance();
                let cond = self.parenthesized()?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if self.eat(&Token::Else) {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                }
            }
            Some(Token::LBrace) => {
                self.advance();
                let mut stmts = Vec::new();
                while !self.check(&Token::RBrace) {
                    if self.peek().is_none() {
                        return Err(self.unexpected("`}`"));
                    }
                    stmts.push(self.statement()?);
                }
                self.expect(&Token::RBrace)?;
                Stmt::Block(stmts)
            }
            _ => Stmt::Expr(self.expression()?.node),
        };
        Ok(Spanned::new(node, self.span_from(start)))
    }

    /// Declaration or expression, as allowed in a `for` header
    fn simple_statement(&mut self) -> Result<Spanned<Stmt>> {
        if self.check(&Token::Var) {
            let decl = self.var_decl()?;
            let span = decl.span;
            Ok(Spanned::new(Stmt::Declaration(decl), span))
        } else {
            Ok(self.expression()?.map(Stmt::Expr))
        }
    }

    fn parenthesized(&mut self) -> Result<Spanned<Expr>> {
        self.expect(&Token::LParen)?;
        let expr = self.expression()?;
        self.expect(&Token::RParen)?;
        Ok(expr)
    }

    fn starts_expression(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Number(_)
                    | Token::StringLit(_)
                    | Token::Ident(_)
                    | Token::True
                    | Token::False
                    | Token::Make
                    | Token::LParen
                    | Token::Minus
                    | Token::Plus
                    | Token::Bang
            )
        )
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expression(&mut self) -> Result<Spanned<Expr>> {
        let target = self.binary(0)?;
        if self.eat(&Token::Arrow) {
            let value = self.expression()?;
            let span = target.span.merge(value.span);
            return Ok(Spanned::new(
                Expr::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                },
                span,
            ));
        }
        Ok(target)
    }

    /// Precedence climbing over the binary operator levels
    fn binary(&mut self, level: usize) -> Result<Spanned<Expr>> {
        if level == BINARY_LEVELS {
            return self.unary();
        }
        let mut left = self.binary(level + 1)?;
        while let Some(op) = self.peek().and_then(|t| binary_op(t, level)) {
            self.advance();
            let right = self.binary(level + 1)?;
            let span = left.span.merge(right.span);
            left = Spanned::new(
                Expr::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Spanned<Expr>> {
        let op = match self.peek() {
            Some(Token::Minus) => UnOp::Neg,
            Some(Token::Plus) => UnOp::Plus,
            Some(Token::Bang) => UnOp::Not,
            _ => return self.postfix(),
        };
        let start = self.advance().map(|(_, s)| s.start).unwrap_or(self.eof);
        let operand = self.unary()?;
        Ok(Spanned::new(
            Expr::Unary {
                op,
                operand: Box::new(operand),
            },
            self.span_from(start),
        ))
    }

    fn postfix(&mut self) -> Result<Spanned<Expr>> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(&Token::RBracket)?;
                let span = self.span_from(expr.span.start);
                expr = Spanned::new(
                    Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else if self.eat(&Token::Dot) {
                let name = self.expect_ident()?;
                let args = self.arguments(&Token::LParen, &Token::RParen)?;
                let span = self.span_from(expr.span.start);
                expr = Spanned::new(
                    Expr::MethodCall {
                        receiver: Box::new(expr),
                        name,
                        args,
                    },
                    span,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Spanned<Expr>> {
        let start = self.current_span().start;
        let node = match self.peek().cloned() {
            Some(Token::Number(text)) => {
                self.advance();
                Expr::Literal(Literal::Number(text))
            }
            Some(Token::StringLit(text)) => {
                self.advance();
                Expr::Literal(Literal::String(text))
            }
            Some(Token::True) => {
                self.advance();
                Expr::Literal(Literal::Bool(true))
            }
            Some(Token::False) => {
                self.advance();
                Expr::Literal(Literal::Bool(false))
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&Token::RParen)?;
                Expr::Paren(Box::new(inner))
            }
            Some(Token::Make) => {
                self.advance();
                let ty = self.type_clause()?;
                if self.eat(&Token::LParen) {
                    let length = self.expression()?;
                    self.expect(&Token::RParen)?;
                    Expr::MakeArray {
                        ty,
                        length: Some(Box::new(length)),
                        elements: None,
                    }
                } else if self.check(&Token::LBrace) {
                    let elements = self.arguments(&Token::LBrace, &Token::RBrace)?;
                    Expr::MakeArray {
                        ty,
                        length: None,
                        elements: Some(elements),
                    }
                } else {
                    return Err(self.unexpected("`(` or `{` after array type"));
                }
            }
            Some(Token::Ident(_)) => {
                let first = self.expect_ident()?;
                if self.check(&Token::ColonColon) && matches!(self.peek_at(1), Some(Token::Ident(_))) {
                    self.advance();
                    let name = self.expect_ident()?;
                    let args = self.arguments(&Token::LParen, &Token::RParen)?;
                    Expr::Call {
                        package: Some(first),
                        name,
                        args,
                    }
                } else if self.check(&Token::LParen) {
                    let args = self.arguments(&Token::LParen, &Token::RParen)?;
                    Expr::Call {
                        package: None,
                        name: first,
                        args,
                    }
                } else {
                    Expr::Name(first.node)
                }
            }
            _ => return Err(self.unexpected("expression")),
        };
        Ok(Spanned::new(node, self.span_from(start)))
    }

    /// Comma-separated expressions between `open` and `close`
    fn arguments(&mut self, open: &Token, close: &Token) -> Result<Vec<Spanned<Expr>>> {
        self.expect(open)?;
        let mut args = Vec::new();
        if !self.check(close) {
            loop {
                args.push(self.expression()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(close)?;
        Ok(args)
    }
}

/// Number of binary precedence levels
const BINARY_LEVELS: usize = 6;

/// Operator for `token` at precedence `level`, loosest binding first
fn binary_op(token: &Token, level: usize) -> Option<BinOp> {
    let op = match (level, token) {
        (0, Token::PipePipe) => BinOp::Or,
        (1, Token::AmpAmp) => BinOp::And,
        (2, Token::EqEq) => BinOp::Eq,
        (2, Token::NotEq) => BinOp::Ne,
        (3, Token::Lt) => BinOp::Lt,
        (3, Token::Gt) => BinOp::Gt,
        (3, Token::LtEq) => BinOp::Le,
        (3, Token::GtEq) => BinOp::Ge,
        (4, Token::Plus) => BinOp::Add,
        (4, Token::Minus) => BinOp::Sub,
        (5, Token::Star) => BinOp::Mul,
        (5, Token::Slash) => BinOp::Div,
        (5, Token::Percent) => BinOp::Rem,
        _ => return None,
    };
    Some(op)
}
