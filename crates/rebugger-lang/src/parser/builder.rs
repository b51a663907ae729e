//! Recursive-descent parser building span-carrying [`Expr`] trees from tokens

use std::rc::Rc;

use crate::ast::{BinaryOp, Call, Expr, ExprKind, FunctionDef, KwParam, Param, Signature, Span, TypeParam, UnaryOp};
use crate::error::{ParseError, ParseResult};
use crate::parser::lexer::{PositionedToken, Token};

/// Words that cannot be used as identifiers
const KEYWORDS: &[&str] = &[
    "function", "end", "if", "elseif", "else", "while", "for", "in", "begin", "let", "return", "module",
    "where", "true", "false", "nothing", "try", "catch", "break", "continue",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Parser state over a token slice terminated by `Token::Eof`
pub struct AstBuilder<'a> {
    tokens: &'a [PositionedToken],
    pos: usize,
    /// Greater than zero while inside `()` or `[]`, where newlines are insignificant
    ignore_newlines: usize,
    /// End offset of the last consumed token
    prev_end: usize,
}

impl<'a> AstBuilder<'a> {
    pub fn new(tokens: &'a [PositionedToken]) -> Self {
        Self { tokens, pos: 0, ignore_newlines: 0, prev_end: 0 }
    }

    //-------------------------------------------------------------------------
    // Token stream helpers
    //-------------------------------------------------------------------------

    fn peek(&mut self) -> &'a PositionedToken {
        if self.ignore_newlines > 0 {
            while self.tokens[self.pos].token == Token::Newline {
                self.pos += 1;
            }
        }
        &self.tokens[self.pos]
    }

    /// Look `n` significant tokens ahead without consuming anything
    fn peek_at(&mut self, n: usize) -> &'a PositionedToken {
        let mut idx = self.pos;
        let mut seen = 0;
        loop {
            let tok = &self.tokens[idx];
            if tok.token == Token::Eof {
                return tok;
            }
            if !(self.ignore_newlines > 0 && tok.token == Token::Newline) {
                if seen == n {
                    return tok;
                }
                seen += 1;
            }
            idx += 1;
        }
    }

    fn advance(&mut self) -> &'a PositionedToken {
        let tok = self.peek();
        if tok.token != Token::Eof {
            self.pos += 1;
        }
        self.prev_end = tok.span.end;
        tok
    }

    fn at(&mut self, token: &Token) -> bool {
        &self.peek().token == token
    }

    fn at_keyword(&mut self, word: &str) -> bool {
        self.peek().token.is_keyword(word)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_newlines(&mut self) {
        while self.tokens[self.pos].token == Token::Newline {
            self.pos += 1;
        }
    }

    fn error_at(&self, tok: &PositionedToken, message: impl Into<String>) -> ParseError {
        if tok.token == Token::Eof {
            ParseError::unexpected_eof(message, tok.location.line, tok.location.column)
        } else {
            ParseError::syntax_error(message, tok.location.line, tok.location.column)
        }
    }

    fn expect(&mut self, token: Token, context: &str) -> ParseResult<&'a PositionedToken> {
        let tok = self.peek();
        if tok.token == token {
            Ok(self.advance())
        } else {
            Err(self.error_at(
                tok,
                format!("expected {} {}, found {}", token.describe(), context, tok.token.describe()),
            ))
        }
    }

    fn expect_keyword(&mut self, word: &str, context: &str) -> ParseResult<&'a PositionedToken> {
        let tok = self.peek();
        if tok.token.is_keyword(word) {
            Ok(self.advance())
        } else {
            Err(self.error_at(tok, format!("expected '{}' to close {}, found {}", word, context, tok.token.describe())))
        }
    }

    fn expect_ident(&mut self, context: &str) -> ParseResult<(String, Span)> {
        let tok = self.peek();
        match &tok.token {
            Token::Ident(name) if !is_keyword(name) => {
                self.advance();
                Ok((name.clone(), tok.span))
            }
            other => Err(self.error_at(tok, format!("expected identifier {}, found {}", context, other.describe()))),
        }
    }

    /// Run `f` with newline sensitivity switched off (inside delimiters)
    fn delimited<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        self.ignore_newlines += 1;
        let result = f(self);
        self.ignore_newlines -= 1;
        result
    }

    //-------------------------------------------------------------------------
    // Blocks and statements
    //-------------------------------------------------------------------------

    /// Parse a whole program
    pub fn parse_program(&mut self) -> ParseResult<Vec<Expr>> {
        let items = self.parse_block(&[])?;
        let tok = self.peek();
        if tok.token != Token::Eof {
            return Err(self.error_at(tok, format!("unexpected {}", tok.token.describe())));
        }
        Ok(items)
    }

    /// Parse statements until one of `terminators` (not consumed) or end of input
    fn parse_block(&mut self, terminators: &[&str]) -> ParseResult<Vec<Expr>> {
        let saved = self.ignore_newlines;
        self.ignore_newlines = 0;
        let result = self.parse_block_inner(terminators);
        self.ignore_newlines = saved;
        result
    }

    fn parse_block_inner(&mut self, terminators: &[&str]) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        loop {
            while matches!(self.peek().token, Token::Newline | Token::Semicolon) {
                self.advance();
            }
            let tok = self.peek();
            match &tok.token {
                Token::Eof if terminators.is_empty() => break,
                Token::Eof => {
                    return Err(self.error_at(tok, format!("'{}'", terminators.join("' or '"))));
                }
                Token::Ident(word) if terminators.contains(&word.as_str()) => break,
                _ => {}
            }
            items.push(self.parse_expr()?);
            let next = self.peek();
            match &next.token {
                Token::Newline | Token::Semicolon | Token::Eof => {}
                Token::Ident(word) if terminators.contains(&word.as_str()) => {}
                other => {
                    return Err(self.error_at(next, format!("expected newline or ';' after expression, found {}", other.describe())));
                }
            }
        }
        Ok(items)
    }

    /// Parse a block and wrap it in a `Block` node spanning `start..end`
    fn block_expr(&mut self, terminators: &[&str], start: usize) -> ParseResult<Expr> {
        let items = self.parse_block(terminators)?;
        let span = match (items.first(), items.last()) {
            (Some(first), Some(last)) => first.span.to(last.span),
            _ => Span::new(start, start),
        };
        Ok(Expr::new(ExprKind::Block(items), span))
    }

    //-------------------------------------------------------------------------
    // Operators
    //-------------------------------------------------------------------------

    /// Parse an expression, including assignment
    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        let lhs = self.parse_or()?;
        if self.at(&Token::Assign) {
            let tok = self.advance();
            check_assignable(&lhs).map_err(|msg| self.error_at(tok, msg))?;
            self.skip_newlines();
            let rhs = self.parse_expr()?;
            let span = lhs.span.to(rhs.span);
            return Ok(Expr::new(ExprKind::Assign(Box::new(lhs), Box::new(rhs)), span));
        }
        Ok(lhs)
    }

    fn binary_loop(
        &mut self,
        next: fn(&mut Self) -> ParseResult<Expr>,
        op_for: fn(&Token) -> Option<BinaryOp>,
    ) -> ParseResult<Expr> {
        let mut lhs = next(self)?;
        while let Some(op) = op_for(&self.peek().token) {
            self.advance();
            self.skip_newlines();
            let rhs = next(self)?;
            let span = lhs.span.to(rhs.span);
            lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span);
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        self.binary_loop(Self::parse_and, |t| (t == &Token::OrOr).then_some(BinaryOp::Or))
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        self.binary_loop(Self::parse_comparison, |t| (t == &Token::AndAnd).then_some(BinaryOp::And))
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        self.binary_loop(Self::parse_range, |t| match t {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::Ne),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn parse_range(&mut self) -> ParseResult<Expr> {
        let lo = self.parse_additive()?;
        if self.eat(&Token::Colon) {
            let hi = self.parse_additive()?;
            let span = lo.span.to(hi.span);
            return Ok(Expr::new(ExprKind::Range(Box::new(lo), Box::new(hi)), span));
        }
        Ok(lo)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        self.binary_loop(Self::parse_multiplicative, |t| match t {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        self.binary_loop(Self::parse_unary, |t| match t {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek().token {
            Token::Minus => UnaryOp::Neg,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_power(),
        };
        let start = self.advance().span.start;
        let operand = self.parse_unary()?;
        let span = Span::new(start, operand.span.end);
        Ok(Expr::new(ExprKind::Unary(op, Box::new(operand)), span))
    }

    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_postfix()?;
        if self.eat(&Token::Caret) {
            let exponent = self.parse_unary()?;
            let span = base.span.to(exponent.span);
            return Ok(Expr::new(ExprKind::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)), span));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().token {
                Token::LParen => {
                    self.advance();
                    let (args, kwargs) = self.delimited(Self::parse_call_args)?;
                    let span = Span::new(expr.span.start, self.prev_end);
                    expr = Expr::new(ExprKind::Call(Call { func: Box::new(expr), args, kwargs }), span);
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.delimited(|p| {
                        let index = p.parse_expr()?;
                        p.expect(Token::RBracket, "to close index")?;
                        Ok(index)
                    })?;
                    let span = Span::new(expr.span.start, self.prev_end);
                    expr = Expr::new(ExprKind::Index(Box::new(expr), Box::new(index)), span);
                }
                Token::Dot => {
                    self.advance();
                    let (name, name_span) = self.expect_ident("after '.'")?;
                    let span = Span::new(expr.span.start, name_span.end);
                    expr = Expr::new(ExprKind::Field(Box::new(expr), name), span);
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Arguments after `(` up to and including `)`
    fn parse_call_args(&mut self) -> ParseResult<(Vec<Expr>, Vec<(String, Expr)>)> {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        let mut keywords_only = false;
        loop {
            if self.eat(&Token::RParen) {
                return Ok((args, kwargs));
            }
            if self.eat(&Token::Semicolon) {
                keywords_only = true;
                continue;
            }
            let is_kw = matches!(&self.peek().token, Token::Ident(name) if !is_keyword(name))
                && self.peek_at(1).token == Token::Assign;
            if is_kw {
                let (name, _) = self.expect_ident("for keyword argument")?;
                self.advance(); // '='
                kwargs.push((name, self.parse_or()?));
            } else if keywords_only {
                let tok = self.peek();
                return Err(self.error_at(tok, "only keyword arguments may follow ';'"));
            } else {
                args.push(self.parse_or()?);
            }
            if !self.eat(&Token::Comma) {
                match self.peek().token {
                    Token::RParen | Token::Semicolon => {}
                    _ => {
                        let tok = self.peek();
                        return Err(self.error_at(tok, format!("expected ',' or ')' in call, found {}", tok.token.describe())));
                    }
                }
            }
        }
    }

    //-------------------------------------------------------------------------
    // Primary expressions
    //-------------------------------------------------------------------------

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let tok = self.peek();
        let literal = |kind| Ok(Expr::new(kind, tok.span));
        match &tok.token {
            Token::Int(n) => {
                self.advance();
                literal(ExprKind::Int(*n))
            }
            Token::Float(x) => {
                self.advance();
                literal(ExprKind::Float(*x))
            }
            Token::Str(s) => {
                self.advance();
                literal(ExprKind::Str(s.clone()))
            }
            Token::LParen => self.parse_paren(),
            Token::LBracket => self.parse_array(),
            Token::Macro(name) if name == "eval" => self.parse_eval_macro(),
            Token::Ident(word) => match word.as_str() {
                "true" | "false" | "nothing" => {
                    self.advance();
                    literal(match word.as_str() {
                        "true" => ExprKind::Bool(true),
                        "false" => ExprKind::Bool(false),
                        _ => ExprKind::Nothing,
                    })
                }
                "function" => self.parse_function(),
                "if" => self.parse_if(),
                "while" => self.parse_while(),
                "for" => self.parse_for(),
                "begin" => {
                    self.advance();
                    let block = self.block_expr(&["end"], tok.span.end)?;
                    self.expect_keyword("end", "'begin' block")?;
                    Ok(Expr::new(block.kind, Span::new(tok.span.start, self.prev_end)))
                }
                "let" => self.parse_let(),
                "try" => self.parse_try(),
                "return" => self.parse_return(),
                "break" => {
                    self.advance();
                    literal(ExprKind::Break)
                }
                "continue" => {
                    self.advance();
                    literal(ExprKind::Continue)
                }
                "module" => self.parse_module(),
                w if is_keyword(w) => Err(self.error_at(tok, format!("unexpected keyword '{}'", w))),
                _ => {
                    self.advance();
                    literal(ExprKind::Ident(word.clone()))
                }
            },
            other => Err(self.error_at(tok, format!("unexpected {}", other.describe()))),
        }
    }

    fn parse_paren(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span.start;
        self.delimited(|p| {
            if p.eat(&Token::RParen) {
                return Ok(Expr::new(ExprKind::Tuple(Vec::new()), Span::new(start, p.prev_end)));
            }
            let first = p.parse_expr()?;
            if p.eat(&Token::RParen) {
                return Ok(first);
            }
            let mut items = vec![first];
            while p.eat(&Token::Comma) {
                if p.at(&Token::RParen) {
                    break;
                }
                items.push(p.parse_expr()?);
            }
            let close = p.expect(Token::RParen, "to close tuple")?;
            let span = Span::new(start, p.prev_end);
            if !items.iter().any(|e| matches!(e.kind, ExprKind::Assign(..))) {
                return Ok(Expr::new(ExprKind::Tuple(items), span));
            }
            // `(k = v, ...)` is a named tuple
            let mut fields = Vec::with_capacity(items.len());
            for item in items {
                match item.kind {
                    ExprKind::Assign(target, value) => match target.kind {
                        ExprKind::Ident(name) => fields.push((name, *value)),
                        _ => return Err(p.error_at(close, "named tuple field must be a name")),
                    },
                    _ => return Err(p.error_at(close, "cannot mix named and positional tuple elements")),
                }
            }
            Ok(Expr::new(ExprKind::NamedTuple(fields), span))
        })
    }

    fn parse_array(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span.start;
        self.delimited(|p| {
            let mut items = Vec::new();
            while !p.eat(&Token::RBracket) {
                items.push(p.parse_or()?);
                if !p.eat(&Token::Comma) {
                    p.expect(Token::RBracket, "to close array")?;
                    break;
                }
            }
            Ok(Expr::new(ExprKind::Array(items), Span::new(start, p.prev_end)))
        })
    }

    fn parse_eval_macro(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span.start;
        let (module, _) = self.expect_ident("naming the module for @eval")?;
        let body = self.parse_expr()?;
        let span = Span::new(start, body.span.end);
        Ok(Expr::new(ExprKind::EvalIn(module, Box::new(body)), span))
    }

    fn parse_if(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span.start;
        let mut branches = Vec::new();
        let mut otherwise = None;
        let cond = self.parse_expr()?;
        let body = self.block_expr(&["elseif", "else", "end"], cond.span.end)?;
        branches.push((cond, body));
        loop {
            if self.at_keyword("elseif") {
                self.advance();
                let cond = self.parse_expr()?;
                let body = self.block_expr(&["elseif", "else", "end"], cond.span.end)?;
                branches.push((cond, body));
            } else if self.at_keyword("else") {
                let at = self.advance().span.end;
                otherwise = Some(Box::new(self.block_expr(&["end"], at)?));
                break;
            } else {
                break;
            }
        }
        self.expect_keyword("end", "'if' block")?;
        Ok(Expr::new(ExprKind::If(branches, otherwise), Span::new(start, self.prev_end)))
    }

    fn parse_while(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span.start;
        let cond = self.parse_expr()?;
        let body = self.block_expr(&["end"], cond.span.end)?;
        self.expect_keyword("end", "'while' loop")?;
        Ok(Expr::new(ExprKind::While(Box::new(cond), Box::new(body)), Span::new(start, self.prev_end)))
    }

    fn parse_for(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span.start;
        let (var, _) = self.expect_ident("as loop variable")?;
        if !(self.at_keyword("in") || self.at(&Token::Assign)) {
            let tok = self.peek();
            return Err(self.error_at(tok, format!("expected 'in' after loop variable, found {}", tok.token.describe())));
        }
        self.advance();
        let iter = self.parse_expr()?;
        let body = self.block_expr(&["end"], iter.span.end)?;
        self.expect_keyword("end", "'for' loop")?;
        Ok(Expr::new(ExprKind::For(var, Box::new(iter), Box::new(body)), Span::new(start, self.prev_end)))
    }

    fn parse_let(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span.start;
        let mut bindings = Vec::new();
        while !matches!(self.peek().token, Token::Newline | Token::Semicolon | Token::Eof) {
            let pattern = self.parse_or()?;
            let tok = self.peek();
            check_pattern(&pattern).map_err(|msg| self.error_at(tok, msg))?;
            self.expect(Token::Assign, "in let binding")?;
            let value = self.parse_or()?;
            bindings.push((pattern, value));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let body = self.block_expr(&["end"], self.prev_end)?;
        self.expect_keyword("end", "'let' block")?;
        Ok(Expr::new(ExprKind::Let(bindings, Box::new(body)), Span::new(start, self.prev_end)))
    }

    fn parse_try(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span.start;
        let body = self.block_expr(&["catch", "end"], self.prev_end)?;
        let mut binding = None;
        let handler = if self.at_keyword("catch") {
            self.advance();
            if let Token::Ident(name) = &self.tokens[self.pos].token {
                if !is_keyword(name) {
                    binding = Some(name.clone());
                    self.advance();
                }
            }
            self.block_expr(&["end"], self.prev_end)?
        } else {
            Expr::new(ExprKind::Block(Vec::new()), Span::new(self.prev_end, self.prev_end))
        };
        self.expect_keyword("end", "'try' block")?;
        Ok(Expr::new(
            ExprKind::Try { body: Box::new(body), binding, handler: Box::new(handler) },
            Span::new(start, self.prev_end),
        ))
    }

    fn parse_return(&mut self) -> ParseResult<Expr> {
        let tok = self.advance();
        let ends_here = match &self.peek().token {
            Token::Newline | Token::Semicolon | Token::Eof | Token::RParen => true,
            Token::Ident(w) => matches!(w.as_str(), "end" | "else" | "elseif" | "catch"),
            _ => false,
        };
        if ends_here {
            return Ok(Expr::new(ExprKind::Return(None), tok.span));
        }
        let value = self.parse_expr()?;
        let span = tok.span.to(value.span);
        Ok(Expr::new(ExprKind::Return(Some(Box::new(value))), span))
    }

    fn parse_module(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span.start;
        let (name, _) = self.expect_ident("naming the module")?;
        let items = self.parse_block(&["end"])?;
        self.expect_keyword("end", "'module' block")?;
        Ok(Expr::new(ExprKind::Module(name, items), Span::new(start, self.prev_end)))
    }

    //-------------------------------------------------------------------------
    // Function definitions
    //-------------------------------------------------------------------------

    fn parse_function(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span.start;
        let (name, _) = self.expect_ident("naming the function")?;
        self.expect(Token::LParen, "to open the parameter list")?;
        let (params, kwparams) = self.delimited(Self::parse_params)?;

        let mut type_params = Vec::new();
        while self.at_keyword("where") {
            self.advance();
            if self.eat(&Token::LBrace) {
                self.delimited(|p| {
                    while !p.eat(&Token::RBrace) {
                        type_params.push(p.parse_type_param()?);
                        if !p.eat(&Token::Comma) {
                            p.expect(Token::RBrace, "to close 'where' clause")?;
                            break;
                        }
                    }
                    Ok(())
                })?;
            } else {
                type_params.push(self.parse_type_param()?);
            }
        }

        let body = self.parse_block(&["end"])?;
        let end_tok = self.expect_keyword("end", "function definition")?;
        let body_span = match (body.first(), body.last()) {
            (Some(first), Some(last)) => first.span.to(last.span),
            _ => Span::new(end_tok.span.start, end_tok.span.start),
        };
        let span = Span::new(start, end_tok.span.end);
        let def = FunctionDef { name, signature: Signature { params, kwparams, type_params }, body, span, body_span };
        Ok(Expr::new(ExprKind::Function(Rc::new(def)), span))
    }

    /// Parameters after `(` up to and including `)`
    fn parse_params(&mut self) -> ParseResult<(Vec<Param>, Vec<KwParam>)> {
        let mut params = Vec::new();
        let mut kwparams = Vec::new();
        let mut keywords = false;
        loop {
            if self.eat(&Token::RParen) {
                return Ok((params, kwparams));
            }
            if self.eat(&Token::Semicolon) {
                keywords = true;
                continue;
            }
            if keywords {
                let (name, _) = self.expect_ident("for keyword parameter")?;
                let annotation = if self.eat(&Token::DoubleColon) { Some(self.parse_type_name()?) } else { None };
                let variadic = self.eat(&Token::Ellipsis);
                let default = if self.eat(&Token::Assign) { Some(self.parse_or()?) } else { None };
                kwparams.push(KwParam { name, annotation, default, variadic });
            } else {
                let name = if self.at(&Token::DoubleColon) { None } else { Some(self.expect_ident("for parameter")?.0) };
                let annotation = if self.eat(&Token::DoubleColon) { Some(self.parse_type_name()?) } else { None };
                let variadic = self.eat(&Token::Ellipsis);
                let default = if self.eat(&Token::Assign) { Some(self.parse_or()?) } else { None };
                params.push(Param { name, annotation, default, variadic });
            }
            if !self.eat(&Token::Comma) {
                match self.peek().token {
                    Token::RParen | Token::Semicolon => {}
                    _ => {
                        let tok = self.peek();
                        return Err(self.error_at(tok, format!("expected ',' or ')' in parameter list, found {}", tok.token.describe())));
                    }
                }
            }
        }
    }

    fn parse_type_name(&mut self) -> ParseResult<String> {
        let (name, _) = self.expect_ident("as type annotation")?;
        if self.at(&Token::LBrace) {
            let tok = self.peek();
            return Err(self.error_at(tok, format!("parametric type annotation '{}{{...}}' is not supported", name)));
        }
        Ok(name)
    }

    fn parse_type_param(&mut self) -> ParseResult<TypeParam> {
        let (name, _) = self.expect_ident("as type parameter")?;
        let bound = if self.eat(&Token::Subtype) { Some(self.parse_type_name()?) } else { None };
        Ok(TypeParam { name, bound })
    }
}

fn check_assignable(target: &Expr) -> Result<(), String> {
    match &target.kind {
        ExprKind::Ident(_) | ExprKind::Index(..) => Ok(()),
        ExprKind::Tuple(_) => check_pattern(target),
        _ => Err("invalid assignment target".to_string()),
    }
}

/// Binding patterns: a name or a (possibly empty) tuple of names
fn check_pattern(pattern: &Expr) -> Result<(), String> {
    match &pattern.kind {
        ExprKind::Ident(_) => Ok(()),
        ExprKind::Tuple(items) if items.iter().all(|i| matches!(i.kind, ExprKind::Ident(_))) => Ok(()),
        _ => Err("binding pattern must be a name or a tuple of names".to_string()),
    }
}
