/*

 ▄▄▄▄    ██▓    ▄▄▄       ▄████▄   ██ ▄█▀ ██▀███   █    ██   ██████  ██░ ██
▓█████▄ ▓██▒   ▒████▄    ▒██▀ ▀█   ██▄█▒ ▓██ ▒ ██▒ ██  ▓██▒▒██    ▒ ▓██░ ██▒
▒██▒ ▄██▒██░   ▒██  ▀█▄  ▒▓█    ▄ ▓███▄░ ▓██ ░▄█ ▒▓██  ▒██░░ ▓██▄   ▒██▀▀██░
▒██░█▀  ▒██░   ░██▄▄▄▄██ ▒▓▓▄ ▄██▒▓██ █▄ ▒██▀▀█▄  ▓▓█  ░██░  ▒   ██▒░▓█ ░██
░▓█  ▀█▓░██████▒▓█   ▓██▒▒ ▓███▀ ░▒██▒ █▄░██▓ ▒██▒▒▒█████▓ ▒██████▒▒░▓█▒░██▓
░▒▓███▀▒░ ▒░▓  ░▒▒   ▓▒█░░ ░▒ ▒  ░▒ ▒▒ ▓▒░ ▒▓ ░▒▓░░▒▓▒ ▒ ▒ ▒ ▒▓▒ ▒ ░ ▒ ░░▒░▒
▒░▒   ░ ░ ░ ▒  ░ ▒   ▒▒ ░  ░  ▒   ░ ░▒ ▒░  ░▒ ░ ▒░░░▒░ ░ ░ ░ ░▒  ░ ░ ▒ ░▒░ ░
 ░    ░   ░ ░    ░   ▒   ░        ░ ░░ ░   ░░   ░  ░░░ ░ ░ ░  ░  ░   ░  ░░ ░
 ░          ░  ░     ░  ░░ ░      ░  ░      ░        ░           ░   ░  ░  ░
      ░                  ░
Copyright (C) 2026, Blackrush LLC, All Rights Reserved
Created by Erik Olson, Tarpon Springs, Florida
For more information, visit BlackrushDrive.com

MIT License

Copyright (c) 2026 Erik Lee Olson for Blackrush, LLC

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.

*/

//! Pratt parser for ISB statements with per-statement error recovery.
//!
//! Statement-position `lhs = rhs` is an assignment; `=` inside expressions is
//! equality. Malformed statements append a diagnostic and recovery resumes at
//! the next newline. Running out of tokens mid-statement reports
//! `UnexpectedEndOfStream`, which the incremental driver reads as "needs more
//! lines".

use isb_ast::{BinOp, Expr, Program, Stmt};
use isb_common::{DiagnosticBag, ErrorCode, IsbError, Result, TextRange};
use isb_lexer::{Lexer, Literal, Token, TokenKind};

pub fn parse(src: &str, bag: &mut DiagnosticBag) -> Program {
    let tokens = match Lexer::new(src).tokenize() {
        Ok(t) => t,
        Err(e) => {
            bag.report_err(e);
            return Vec::new();
        }
    };
    Parser::new(tokens).parse_program(bag)
}

struct Parser { tokens: Vec<Token>, i: usize }

impl Parser {
    fn new(tokens: Vec<Token>) -> Self { Self { tokens, i: 0 } }

    fn parse_program(&mut self, bag: &mut DiagnosticBag) -> Program {
        let mut stmts = Vec::new();
        loop {
            while self.match_k(TokenKind::Newline) {}
            if self.check(TokenKind::Eof) { break; }
            let line = self.peek_line();
            match self.parse_stmt() {
                Ok(s) => {
                    stmts.push(Stmt::Line(line));
                    stmts.push(s);
                }
                Err(e) => {
                    let end_of_stream = e.code == ErrorCode::UnexpectedEndOfStream;
                    bag.report_err(e);
                    if end_of_stream { break; }
                    self.recover();
                }
            }
        }
        stmts
    }

    // Skip to the next statement boundary after a parse error.
    fn recover(&mut self) {
        loop {
            match self.peek_kind() {
                Some(TokenKind::Eof) | None => break,
                Some(TokenKind::Newline) => { self.next(); break; }
                _ => { self.next(); }
            }
        }
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        if self.match_k(TokenKind::If) { return self.parse_if(); }
        if self.match_k(TokenKind::For) { return self.parse_for(); }
        if self.match_k(TokenKind::While) { return self.parse_while(); }
        if self.match_k(TokenKind::Sub) { return self.parse_sub(); }

        if self.match_k(TokenKind::Goto) {
            let name = self.expect_ident()?;
            self.terminate_stmt()?;
            return Ok(Stmt::Goto(name));
        }

        if self.check(TokenKind::Ident) {
            // Label definition: `name:` alone begins the statement
            if self.peek_kind_at(1) == Some(TokenKind::Colon) {
                let name = self.expect_ident()?;
                let _ = self.next(); // ':'
                self.terminate_stmt()?;
                return Ok(Stmt::Label(name));
            }

            // Try `name [indices...] = expr`; rewind to an expression
            // statement when no '=' follows.
            let save_i = self.i;
            let name = self.expect_ident()?;
            let mut indices = Vec::new();
            while self.match_k(TokenKind::LBracket) {
                indices.push(self.parse_expr_bp(0)?);
                self.expect(TokenKind::RBracket)?;
            }
            if self.match_k(TokenKind::Assign) {
                let value = self.parse_expr_bp(0)?;
                self.terminate_stmt()?;
                return Ok(Stmt::Assign { name, indices, value });
            }
            self.i = save_i;
        }

        let e = self.parse_expr_bp(0)?;
        self.terminate_stmt()?;
        Ok(Stmt::ExprStmt(e))
    }

    // Accept a newline OR EOF after a statement
    fn terminate_stmt(&mut self) -> Result<()> {
        if self.match_k(TokenKind::Newline) { return Ok(()); }
        if self.check(TokenKind::Eof) { return Ok(()); }
        Err(self.err_here(ErrorCode::UnexpectedToken, "expected end of statement"))
    }

    // Body statements until one of `ends` is consumed; returns the body and
    // which terminator closed it.
    fn parse_block(&mut self, ends: &[TokenKind]) -> Result<(Vec<Stmt>, TokenKind)> {
        let mut body = Vec::new();
        loop {
            while self.match_k(TokenKind::Newline) {}
            if let Some(k) = self.peek_kind() {
                if ends.contains(&k) {
                    self.next();
                    return Ok((body, k));
                }
            }
            if self.check(TokenKind::Eof) {
                return Err(IsbError::of(ErrorCode::UnexpectedEndOfStream, self.peek_range()));
            }
            let line = self.peek_line();
            let s = self.parse_stmt()?;
            body.push(Stmt::Line(line));
            body.push(s);
        }
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let cond = self.parse_expr_bp(0)?;
        self.expect(TokenKind::Then)?;
        let (body, mut term) =
            self.parse_block(&[TokenKind::ElseIf, TokenKind::Else, TokenKind::EndIf])?;
        let mut arms = vec![(cond, body)];
        while term == TokenKind::ElseIf {
            let c = self.parse_expr_bp(0)?;
            self.expect(TokenKind::Then)?;
            let (b, t) =
                self.parse_block(&[TokenKind::ElseIf, TokenKind::Else, TokenKind::EndIf])?;
            arms.push((c, b));
            term = t;
        }
        let else_body = if term == TokenKind::Else {
            let (b, _) = self.parse_block(&[TokenKind::EndIf])?;
            Some(b)
        } else {
            None
        };
        self.terminate_stmt()?;
        Ok(Stmt::If { arms, else_body })
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        let var = self.expect_ident()?;
        self.expect(TokenKind::Assign)?;
        let start = self.parse_expr_bp(0)?;
        self.expect(TokenKind::To)?;
        let end = self.parse_expr_bp(0)?;
        let step = if self.match_k(TokenKind::Step) { Some(self.parse_expr_bp(0)?) } else { None };
        let (body, _) = self.parse_block(&[TokenKind::EndFor])?;
        self.terminate_stmt()?;
        Ok(Stmt::For { var, start, end, step, body })
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        let cond = self.parse_expr_bp(0)?;
        let (body, _) = self.parse_block(&[TokenKind::EndWhile])?;
        self.terminate_stmt()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_sub(&mut self) -> Result<Stmt> {
        let name = self.expect_ident()?;
        let (body, _) = self.parse_block(&[TokenKind::EndSub])?;
        self.terminate_stmt()?;
        Ok(Stmt::Sub { name, body })
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.parse_prefix()?;
        loop {
            let (op, lbp, rbp) = match self.peek_binop_bp() { Some(t) => t, None => break };
            if lbp < min_bp { break; }
            self.next(); // consume operator
            let rhs = self.parse_expr_bp(rbp)?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        if self.match_k(TokenKind::Minus) {
            let e = self.parse_expr_bp(80)?;
            return Ok(Expr::UnaryNeg(Box::new(e)));
        }
        match self.peek_kind() {
            Some(TokenKind::Number) => {
                let t = self.next().unwrap();
                match t.literal {
                    Some(Literal::Num(n)) => Ok(Expr::Number(n)),
                    _ => Err(IsbError::new(ErrorCode::UnexpectedToken, t.range, "number literal missing")),
                }
            }
            Some(TokenKind::String) => {
                let t = self.next().unwrap();
                match t.literal {
                    Some(Literal::Str(s)) => Ok(Expr::Str(s)),
                    _ => Err(IsbError::new(ErrorCode::UnexpectedToken, t.range, "string literal missing")),
                }
            }
            Some(TokenKind::Ident) => {
                let name = self.next().unwrap().lexeme;
                if self.match_k(TokenKind::LParen) {
                    let mut args = Vec::new();
                    if !self.check(TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr_bp(0)?);
                            if !self.match_k(TokenKind::Comma) { break; }
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    return Ok(Expr::Call { name, args });
                }
                if self.check(TokenKind::LBracket) {
                    let mut indices = Vec::new();
                    while self.match_k(TokenKind::LBracket) {
                        indices.push(self.parse_expr_bp(0)?);
                        self.expect(TokenKind::RBracket)?;
                    }
                    return Ok(Expr::Index { name, indices });
                }
                Ok(Expr::Var(name))
            }
            Some(TokenKind::LParen) => {
                self.next();
                let e = self.parse_expr_bp(0)?;
                self.expect(TokenKind::RParen)?;
                Ok(e)
            }
            Some(TokenKind::Eof) | None => {
                Err(IsbError::of(ErrorCode::UnexpectedEndOfStream, self.peek_range()))
            }
            other => Err(self.err_here(
                ErrorCode::UnexpectedToken,
                format!("unexpected token in expression: {:?}", other),
            )),
        }
    }

    fn peek_binop_bp(&self) -> Option<(BinOp, u8, u8)> {
        match self.peek_kind()? {
            // logical (lowest precedence)
            TokenKind::Or => Some((BinOp::Or, 20, 21)),
            TokenKind::And => Some((BinOp::And, 30, 31)),
            // relational; '=' is equality in expression position
            TokenKind::Assign => Some((BinOp::Eq, 40, 41)),
            TokenKind::NotEq => Some((BinOp::Ne, 40, 41)),
            TokenKind::Lt => Some((BinOp::Lt, 40, 41)),
            TokenKind::LtEq => Some((BinOp::Le, 40, 41)),
            TokenKind::Gt => Some((BinOp::Gt, 40, 41)),
            TokenKind::GtEq => Some((BinOp::Ge, 40, 41)),
            // additive
            TokenKind::Plus => Some((BinOp::Add, 50, 51)),
            TokenKind::Minus => Some((BinOp::Sub, 50, 51)),
            // multiplicative
            TokenKind::Star => Some((BinOp::Mul, 60, 61)),
            TokenKind::Slash => Some((BinOp::Div, 60, 61)),
            TokenKind::Mod => Some((BinOp::Mod, 60, 61)),
            _ => None,
        }
    }

    // small helpers
    fn expect(&mut self, k: TokenKind) -> Result<Token> {
        if self.check(k.clone()) { return Ok(self.next().unwrap()); }
        if self.check(TokenKind::Eof) {
            return Err(IsbError::of(ErrorCode::UnexpectedEndOfStream, self.peek_range()));
        }
        Err(self.err_here(ErrorCode::UnexpectedToken, format!("expected {:?}", k)))
    }

    fn expect_ident(&mut self) -> Result<String> {
        if self.check(TokenKind::Ident) { return Ok(self.next().unwrap().lexeme); }
        if self.check(TokenKind::Eof) {
            return Err(IsbError::of(ErrorCode::UnexpectedEndOfStream, self.peek_range()));
        }
        Err(self.err_here(ErrorCode::UnexpectedToken, "expected identifier"))
    }

    fn err_here(&self, code: ErrorCode, message: impl Into<String>) -> IsbError {
        IsbError::new(code, self.peek_range(), message)
    }

    fn check(&self, k: TokenKind) -> bool { self.peek_kind() == Some(k) }
    fn match_k(&mut self, k: TokenKind) -> bool {
        if self.check(k) { self.next(); true } else { false }
    }
    fn peek_kind(&self) -> Option<TokenKind> { self.tokens.get(self.i).map(|t| t.kind.clone()) }
    fn peek_kind_at(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.i + n).map(|t| t.kind.clone())
    }
    fn peek_range(&self) -> TextRange {
        self.tokens.get(self.i).map(|t| t.range).unwrap_or_default()
    }
    fn peek_line(&self) -> u32 {
        self.tokens.get(self.i).map(|t| t.range.start.line).unwrap_or(0)
    }
    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.i).cloned();
        if t.is_some() { self.i += 1; }
        t
    }
}
