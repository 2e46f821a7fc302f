use isb_common::{ErrorCode, IsbError, Result, TextPosition, TextRange};
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Single-char
    LParen, RParen, LBracket, RBracket, Comma, Dot, Colon,
    Plus, Minus, Star, Slash,
    Lt, Gt, Assign, // '<' '>' '='
    // Two-char
    NotEq, LtEq, GtEq, // '<>' '<=' '>='
    // Statement terminator
    Newline,
    // Literals / identifiers
    Ident, Number, String,
    // Keywords
    If, Then, Else, ElseIf, EndIf,
    For, To, Step, EndFor,
    While, EndWhile,
    Sub, EndSub,
    Goto,
    And, Or, Mod,
    Eof,
}

#[derive(Debug, Clone)]
pub enum Literal { Num(Decimal), Str(String) }

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub range: TextRange,
}

pub struct Lexer<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    cur: Option<char>,
    pos: usize,
    start: usize,
    line: u32,
    column: u32,
    start_pos: TextPosition,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        let mut l = Self {
            src,
            chars: src.chars(),
            cur: None,
            pos: 0,
            start: 0,
            line: 0,
            column: 0,
            start_pos: TextPosition::default(),
        };
        l.advance();
        l
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut out = Vec::new();
        loop {
            let t = self.next_token()?;
            let eof = t.kind == TokenKind::Eof;
            out.push(t);
            if eof { break; }
        }
        Ok(out)
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_ws_and_comments();
        self.start = self.pos;
        self.start_pos = TextPosition::new(self.line, self.column);
        let ch = match self.cur { Some(c) => c, None => return Ok(self.make(TokenKind::Eof)) };
        match ch {
            '\n' => { self.advance(); Ok(self.make(TokenKind::Newline)) }
            '(' => { self.advance(); Ok(self.make(TokenKind::LParen)) }
            ')' => { self.advance(); Ok(self.make(TokenKind::RParen)) }
            '[' => { self.advance(); Ok(self.make(TokenKind::LBracket)) }
            ']' => { self.advance(); Ok(self.make(TokenKind::RBracket)) }
            ',' => { self.advance(); Ok(self.make(TokenKind::Comma)) }
            '.' => { self.advance(); Ok(self.make(TokenKind::Dot)) }
            ':' => { self.advance(); Ok(self.make(TokenKind::Colon)) }
            '+' => { self.advance(); Ok(self.make(TokenKind::Plus)) }
            '-' => { self.advance(); Ok(self.make(TokenKind::Minus)) }
            '*' => { self.advance(); Ok(self.make(TokenKind::Star)) }
            '/' => { self.advance(); Ok(self.make(TokenKind::Slash)) }
            '=' => { self.advance(); Ok(self.make(TokenKind::Assign)) }
            '<' => {
                self.advance();
                if self.match_char('=') { Ok(self.make(TokenKind::LtEq)) }
                else if self.match_char('>') { Ok(self.make(TokenKind::NotEq)) }
                else { Ok(self.make(TokenKind::Lt)) }
            }
            '>' => { self.advance(); if self.match_char('=') { Ok(self.make(TokenKind::GtEq)) } else { Ok(self.make(TokenKind::Gt)) } }
            '"' => self.string(),
            c if c.is_ascii_digit() => self.number(),
            c if is_ident_start(c) => self.ident_or_kw(),
            _ => Err(IsbError::new(
                ErrorCode::UnexpectedToken,
                self.range_here(),
                format!("unexpected character '{}'", ch),
            )),
        }
    }

    fn string(&mut self) -> Result<Token> {
        // opening quote already in cur at entry
        self.advance();
        let mut s = String::new();
        let mut closed = false;
        while let Some(c) = self.cur {
            if c == '"' { self.advance(); closed = true; break; }
            if c == '\\' {
                self.advance();
                match self.cur {
                    Some('"') => { s.push('"'); self.advance(); }
                    Some('\\') => { s.push('\\'); self.advance(); }
                    Some(c2) => { s.push(c2); self.advance(); }
                    None => break,
                }
            } else { s.push(c); self.advance(); }
        }
        if !closed {
            return Err(IsbError::of(ErrorCode::UnexpectedEndOfStream, self.range_here()));
        }
        let mut tok = self.make(TokenKind::String);
        tok.literal = Some(Literal::Str(s));
        Ok(tok)
    }

    fn number(&mut self) -> Result<Token> {
        while self.cur.map_or(false, |c| c.is_ascii_digit()) { self.advance(); }
        if self.cur == Some('.') && self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
            while self.cur.map_or(false, |c| c.is_ascii_digit()) { self.advance(); }
        }
        let lex = &self.src[self.start..self.pos];
        let n = Decimal::from_str(lex).map_err(|e| IsbError::new(
            ErrorCode::UnexpectedToken,
            self.range_here(),
            format!("invalid number '{}': {}", lex, e),
        ))?;
        let mut tok = self.make(TokenKind::Number);
        tok.literal = Some(Literal::Num(n));
        Ok(tok)
    }

    fn ident_or_kw(&mut self) -> Result<Token> {
        while self.cur.map_or(false, is_ident_continue) { self.advance(); }
        let lex = &self.src[self.start..self.pos];
        let kind = match &*lex.to_ascii_uppercase() {
            "IF" => TokenKind::If,
            "THEN" => TokenKind::Then,
            "ELSE" => TokenKind::Else,
            "ELSEIF" => TokenKind::ElseIf,
            "ENDIF" => TokenKind::EndIf,
            "FOR" => TokenKind::For,
            "TO" => TokenKind::To,
            "STEP" => TokenKind::Step,
            "ENDFOR" => TokenKind::EndFor,
            "WHILE" => TokenKind::While,
            "ENDWHILE" => TokenKind::EndWhile,
            "SUB" => TokenKind::Sub,
            "ENDSUB" => TokenKind::EndSub,
            "GOTO" => TokenKind::Goto,
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "MOD" => TokenKind::Mod,
            _ => TokenKind::Ident,
        };
        Ok(self.make(kind))
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            match self.cur {
                // newline is a token, not whitespace
                Some(c) if c.is_whitespace() && c != '\n' => { self.advance(); }
                Some('\'') => {
                    while let Some(c) = self.cur { if c == '\n' { break; } self.advance(); }
                }
                _ => break,
            }
        }
    }

    fn make(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            lexeme: self.src[self.start..self.pos].to_string(),
            literal: None,
            range: self.range_here(),
        }
    }

    fn range_here(&self) -> TextRange {
        TextRange::new(self.start_pos, TextPosition::new(self.line, self.column))
    }

    // `pos` is the byte offset of `cur`; `line`/`column` are 0-based.
    fn advance(&mut self) {
        if let Some(c) = self.cur {
            self.pos += c.len_utf8();
            if c == '\n' { self.line += 1; self.column = 0; } else { self.column += 1; }
        }
        self.cur = self.chars.next();
    }

    fn match_char(&mut self, want: char) -> bool {
        if self.cur == Some(want) { self.advance(); true } else { false }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }
}

fn is_ident_start(c: char) -> bool { c.is_ascii_alphabetic() || c == '_' }
fn is_ident_continue(c: char) -> bool { c.is_ascii_alphanumeric() || c == '_' }
