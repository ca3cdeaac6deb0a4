use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    lexer::lex,
    span::Span,
    token::{Token, TokenKind},
    types::{TypeAnnotation, TypeExpr},
};
use std::rc::Rc;

pub fn parse_program(source: &str) -> Result<Program, SyntaxErrors> {
    let tokens = lex(source).map_err(SyntaxErrors::from)?;
    Parser::new(tokens).parse()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Program, SyntaxErrors> {
        let mut statements = Vec::new();

        while !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(Program { statements })
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        if self.check(TokenKind::Import) {
            return self.parse_import().map(Statement::Import);
        }
        if self.check(TokenKind::Fn) && self.peek_is_identifier_at(1) {
            self.advance();
            let decl = self.parse_function_decl(true)?;
            return Ok(Statement::Function(FunctionStmt { decl }));
        }
        if self.matches(TokenKind::Let) {
            return self.parse_let().map(Statement::Let);
        }
        if self.matches(TokenKind::If) {
            return self.parse_if().map(Statement::If);
        }
        if self.matches(TokenKind::While) {
            return self.parse_while().map(Statement::While);
        }
        if self.matches(TokenKind::For) {
            return self.parse_for().map(Statement::For);
        }
        if self.matches(TokenKind::Return) {
            return self.parse_return().map(Statement::Return);
        }
        if self.check(TokenKind::Break) {
            let span = self.advance().span;
            self.expect(TokenKind::Semi)?;
            return Ok(Statement::Break(span));
        }
        if self.check(TokenKind::Continue) {
            let span = self.advance().span;
            self.expect(TokenKind::Semi)?;
            return Ok(Statement::Continue(span));
        }
        if self.check(TokenKind::LBrace) {
            return self.parse_block().map(Statement::Block);
        }

        self.parse_expression_statement()
    }

    fn parse_import(&mut self) -> Result<ImportStmt, SyntaxError> {
        let start = self.expect(TokenKind::Import)?.span.start;
        let name = self.expect_identifier("Expected module name after 'import'")?;
        let end = self.expect(TokenKind::Semi)?.span.end;
        Ok(ImportStmt {
            module: name.name,
            span: Span::new(start, end),
        })
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, SyntaxError> {
        let expr = self.parse_expression()?;
        if self.matches(TokenKind::Eq) {
            let target_span = expr_span(&expr);
            if !is_assign_target(&expr) {
                return Err(SyntaxError::new("Invalid assignment target", target_span)
                    .with_help("Only names, properties and indexed elements can be assigned to"));
            }
            let value = self.parse_expression()?;
            let end = self.expect(TokenKind::Semi)?.span.end;
            return Ok(Statement::Assign(AssignStmt {
                target: expr,
                value,
                span: Span::new(target_span.start, end),
            }));
        }
        self.expect(TokenKind::Semi)?;
        Ok(Statement::Expr(ExprStmt { expr }))
    }

    fn parse_let(&mut self) -> Result<LetStmt, SyntaxError> {
        let start = self
            .previous_span()
            .map(|s| s.start)
            .unwrap_or_else(|| self.current_span_start());
        let name = self.expect_identifier("Expected binding name after 'let'")?;
        let ty = if self.matches(TokenKind::Colon) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expression()?;
        let end = self.expect(TokenKind::Semi)?.span.end;
        Ok(LetStmt {
            name: name.name,
            ty,
            value,
            span: Span::new(start, end),
        })
    }

    fn parse_function_decl(&mut self, named: bool) -> Result<Rc<FunctionDecl>, SyntaxError> {
        let start = self
            .previous_span()
            .map(|s| s.start)
            .unwrap_or_else(|| self.current_span_start());
        let name = if named {
            Some(self.expect_identifier("Expected function name")?.name)
        } else {
            None
        };
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let ident = self.expect_identifier("Expected parameter name")?;
                let ty = if self.matches(TokenKind::Colon) {
                    Some(self.parse_type_annotation()?)
                } else {
                    None
                };
                params.push(Param {
                    name: ident.name,
                    ty,
                    span: ident.span,
                });
                if self.matches(TokenKind::Comma) {
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        let returns = if self.matches(TokenKind::Colon) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        let end = body.span.end;
        Ok(Rc::new(FunctionDecl {
            name,
            params,
            returns,
            body,
            span: Span::new(start, end),
        }))
    }

    fn parse_if(&mut self) -> Result<IfStmt, SyntaxError> {
        let start = self
            .previous_span()
            .map(|s| s.start)
            .unwrap_or_else(|| self.current_span_start());
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let then_branch = self.parse_block()?;
        let mut end = then_branch.span.end;
        let else_branch = if self.matches(TokenKind::Elif) {
            let nested = self.parse_if()?;
            end = nested.span.end;
            Some(ElseBranch::Elif(Box::new(nested)))
        } else if self.matches(TokenKind::Else) {
            let block = self.parse_block()?;
            end = block.span.end;
            Some(ElseBranch::Else(block))
        } else {
            None
        };
        Ok(IfStmt {
            condition,
            then_branch,
            else_branch,
            span: Span::new(start, end),
        })
    }

    fn parse_while(&mut self) -> Result<WhileStmt, SyntaxError> {
        let start = self
            .previous_span()
            .map(|s| s.start)
            .unwrap_or_else(|| self.current_span_start());
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        let body_end = body.span.end;
        Ok(WhileStmt {
            condition,
            body,
            span: Span::new(start, body_end),
        })
    }

    fn parse_for(&mut self) -> Result<ForStmt, SyntaxError> {
        let start = self
            .previous_span()
            .map(|s| s.start)
            .unwrap_or_else(|| self.current_span_start());
        self.expect(TokenKind::LParen)?;
        let binding = self.expect_identifier("Expected loop binding")?;
        self.expect(TokenKind::In)?;
        let iterable = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        let body_end = body.span.end;
        Ok(ForStmt {
            binding: binding.name,
            iterable,
            body,
            span: Span::new(start, body_end),
        })
    }

    fn parse_return(&mut self) -> Result<ReturnStmt, SyntaxError> {
        let start = self
            .previous_span()
            .map(|s| s.start)
            .unwrap_or_else(|| self.current_span_start());
        if self.check(TokenKind::Semi) {
            let end = self.advance().span.end;
            return Ok(ReturnStmt {
                value: None,
                span: Span::new(start, end),
            });
        }
        let value = self.parse_expression()?;
        let end = self.expect(TokenKind::Semi)?.span.end;
        Ok(ReturnStmt {
            value: Some(value),
            span: Span::new(start, end),
        })
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(Block {
            statements,
            span: Span::new(start, end),
        })
    }

    fn parse_type_annotation(&mut self) -> Result<TypeAnnotation, SyntaxError> {
        let ident = self.expect_identifier("Expected type name")?;
        match TypeExpr::from_name(&ident.name) {
            Some(ty) => Ok(TypeAnnotation {
                ty,
                span: ident.span,
            }),
            None => Err(
                SyntaxError::new(format!("Unknown type name `{}`", ident.name), ident.span)
                    .with_help(
                        "Valid type names: number, string, bool, null, array, object, function, any",
                    ),
            ),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        let condition = self.parse_binary(0)?;
        if self.matches(TokenKind::Question) {
            let then_value = self.parse_expression()?;
            self.expect(TokenKind::Colon)?;
            // Parsing the else arm as a full expression makes `?:` chains
            // right-associative.
            let else_value = self.parse_expression()?;
            let span = expr_span(&condition).union(expr_span(&else_value));
            return Ok(Expr::Ternary {
                condition: Box::new(condition),
                then_value: Box::new(then_value),
                else_value: Box::new(else_value),
                span,
            });
        }
        Ok(condition)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;

        loop {
            let (op, prec) = match self.current_binary_op() {
                Some(info) => info,
                None => break,
            };
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            let span = expr_span(&left).union(expr_span(&right));
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn current_binary_op(&self) -> Option<(BinaryOp, u8)> {
        let kind = self.peek_kind()?;
        let info = match kind {
            TokenKind::PipePipe => (BinaryOp::Or, 1),
            TokenKind::AmpersandAmpersand => (BinaryOp::And, 2),
            TokenKind::EqEq => (BinaryOp::Eq, 3),
            TokenKind::BangEq => (BinaryOp::NotEq, 3),
            TokenKind::Lt => (BinaryOp::Lt, 4),
            TokenKind::LtEq => (BinaryOp::LtEq, 4),
            TokenKind::Gt => (BinaryOp::Gt, 4),
            TokenKind::GtEq => (BinaryOp::GtEq, 4),
            TokenKind::Plus => (BinaryOp::Add, 5),
            TokenKind::Minus => (BinaryOp::Sub, 5),
            TokenKind::Star => (BinaryOp::Mul, 6),
            TokenKind::Slash => (BinaryOp::Div, 6),
            TokenKind::Percent => (BinaryOp::Rem, 6),
            _ => return None,
        };
        Some(info)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.check(TokenKind::Minus) {
            let op_span = self.advance().span;
            let expr = self.parse_unary()?;
            let span = op_span.union(expr_span(&expr));
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
                span,
            });
        }
        if self.check(TokenKind::Plus) {
            let op_span = self.advance().span;
            let expr = self.parse_unary()?;
            let span = op_span.union(expr_span(&expr));
            return Ok(Expr::Unary {
                op: UnaryOp::Pos,
                expr: Box::new(expr),
                span,
            });
        }
        if self.check(TokenKind::Bang) {
            let op_span = self.advance().span;
            let expr = self.parse_unary()?;
            let span = op_span.union(expr_span(&expr));
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
                span,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.matches(TokenKind::LParen) {
                let span_start = expr_span(&expr).start;
                let mut args = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        args.push(self.parse_expression()?);
                        if self.matches(TokenKind::Comma) {
                            continue;
                        }
                        break;
                    }
                }
                let end = self.expect(TokenKind::RParen)?.span.end;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    span: Span::new(span_start, end),
                };
                continue;
            }
            if self.matches(TokenKind::Dot) {
                let field = self.expect_identifier("Expected property name after '.'")?;
                let span = expr_span(&expr).union(field.span);
                expr = Expr::FieldAccess {
                    base: Box::new(expr),
                    field: field.name,
                    span,
                };
                continue;
            }
            if self.matches(TokenKind::LBracket) {
                let start = expr_span(&expr).start;
                let index = self.parse_expression()?;
                let end = self.expect(TokenKind::RBracket)?.span.end;
                expr = Expr::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                    span: Span::new(start, end),
                };
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        if self.matches(TokenKind::Fn) {
            let decl = self.parse_function_decl(false)?;
            return Ok(Expr::Function(FunctionExpr { decl }));
        }
        if self.check(TokenKind::LBracket) {
            return self.parse_array_literal();
        }
        if self.check(TokenKind::LBrace) {
            return self.parse_object_literal();
        }

        match self.peek_kind() {
            Some(TokenKind::Identifier(_)) => {
                let ident = self.expect_identifier("Expected identifier")?;
                Ok(Expr::Identifier(ident))
            }
            Some(TokenKind::Number(_)) => {
                let token = self.advance();
                match token.kind {
                    TokenKind::Number(value) => Ok(Expr::Literal(Literal::Number(value, token.span))),
                    _ => unreachable!(),
                }
            }
            Some(TokenKind::String(_)) => {
                let token = self.advance();
                match token.kind {
                    TokenKind::String(value) => Ok(Expr::Literal(Literal::String(value, token.span))),
                    _ => unreachable!(),
                }
            }
            Some(TokenKind::True) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Bool(true, span)))
            }
            Some(TokenKind::False) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Bool(false, span)))
            }
            Some(TokenKind::Null) => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Null(span)))
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            _ => Err(self.error_here("Unexpected token in expression")),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.expect(TokenKind::LBracket)?.span.start;
        let mut items = Vec::new();
        if !self.check(TokenKind::RBracket) {
            loop {
                items.push(self.parse_expression()?);
                if self.matches(TokenKind::Comma) {
                    if self.check(TokenKind::RBracket) {
                        break; // trailing comma
                    }
                    continue;
                }
                break;
            }
        }
        let end = self.expect(TokenKind::RBracket)?.span.end;
        Ok(Expr::ArrayLiteral(items, Span::new(start, end)))
    }

    fn parse_object_literal(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        let mut entries = Vec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                let (key, key_span) = match self.peek_kind() {
                    Some(TokenKind::Identifier(_)) => {
                        let ident = self.expect_identifier("Expected property key")?;
                        (ident.name, ident.span)
                    }
                    Some(TokenKind::String(_)) => {
                        let token = self.advance();
                        match token.kind {
                            TokenKind::String(value) => (value, token.span),
                            _ => unreachable!(),
                        }
                    }
                    _ => return Err(self.error_here("Expected property key")),
                };
                self.expect(TokenKind::Colon)?;
                let value = self.parse_expression()?;
                let span = key_span.union(expr_span(&value));
                entries.push(ObjectEntry { key, value, span });
                if self.matches(TokenKind::Comma) {
                    if self.check(TokenKind::RBrace) {
                        break; // trailing comma
                    }
                    continue;
                }
                break;
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(Expr::ObjectLiteral {
            entries,
            span: Span::new(start, end),
        })
    }

    fn synchronize(&mut self) {
        while !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                return;
            }
            match self.peek_kind() {
                Some(
                    TokenKind::Fn
                    | TokenKind::Let
                    | TokenKind::Import
                    | TokenKind::If
                    | TokenKind::While
                    | TokenKind::For
                    | TokenKind::Return
                    | TokenKind::Break
                    | TokenKind::Continue
                    | TokenKind::RBrace,
                ) => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_is_identifier_at(&self, offset: usize) -> bool {
        matches!(
            self.tokens.get(self.pos + offset).map(|t| &t.kind),
            Some(TokenKind::Identifier(_))
        )
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(&kind)
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!("Expected {}", describe_token(&kind))))
        }
    }

    fn expect_identifier(&mut self, msg: &str) -> Result<Identifier, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(_)) => {
                let token = self.advance();
                match token.kind {
                    TokenKind::Identifier(name) => Ok(Identifier {
                        name,
                        span: token.span,
                    }),
                    _ => unreachable!(),
                }
            }
            _ => Err(self.error_here(msg)),
        }
    }

    fn previous_span(&self) -> Option<Span> {
        if self.pos == 0 {
            None
        } else {
            self.tokens.get(self.pos - 1).map(|t| t.span)
        }
    }

    fn current_span_start(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.start)
            .unwrap_or(0)
    }

    fn error_here(&self, msg: impl Into<String>) -> SyntaxError {
        let span = self
            .tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(Span::empty);
        SyntaxError::new(msg, span)
    }
}

fn is_assign_target(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Identifier(_) | Expr::FieldAccess { .. } | Expr::Index { .. }
    )
}

fn describe_token(kind: &TokenKind) -> String {
    let text = match kind {
        TokenKind::Semi => "';'",
        TokenKind::Colon => "':'",
        TokenKind::Comma => "','",
        TokenKind::Eq => "'='",
        TokenKind::LParen => "'('",
        TokenKind::RParen => "')'",
        TokenKind::LBrace => "'{'",
        TokenKind::RBrace => "'}'",
        TokenKind::LBracket => "'['",
        TokenKind::RBracket => "']'",
        TokenKind::In => "'in'",
        TokenKind::Import => "'import'",
        other => return format!("{other:?}"),
    };
    text.to_string()
}
