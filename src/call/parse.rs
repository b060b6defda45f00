// ABOUTME: Tokenizer and recursive-descent parser for the restricted call-expression grammar.
// ABOUTME: Produces spanned top-level statements so callers can recover exact source text.

use crate::error::CallParseError;

/// Byte range into the parsed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn slice<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }
}

/// An expression in the call grammar. Only literals, names, and calls exist.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Call(CallExpr),
    Name(String),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
}

/// `name(args)`, where `name` may be dotted.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub name: String,
    pub args: Vec<Arg>,
}

/// A single argument. `raw` is the argument value's exact source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub keyword: Option<String>,
    pub value: Expr,
    pub raw: String,
}

/// A top-level expression statement and where it sits in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub expr: Expr,
    pub span: Span,
}

impl Statement {
    pub fn as_call(&self) -> Option<&CallExpr> {
        match &self.expr {
            Expr::Call(call) => Some(call),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Equals,
    Dot,
    Minus,
    Star,
    Semicolon,
    Newline,
    Other(char),
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    span: Span,
}

/// Parse `src` into its top-level statements.
///
/// Statements are separated by newlines or `;`. Newlines inside brackets are
/// insignificant, and `#` starts a comment that runs to the end of the line.
pub fn parse_program(src: &str) -> Result<Vec<Statement>, CallParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
    };
    parser.program()
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn tokenize(mut self) -> Result<Vec<Token>, CallParseError> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;

        while let Some(c) = self.peek() {
            let start = self.pos;
            let kind = match c {
                ' ' | '\t' | '\r' | '\x0c' => {
                    self.bump();
                    continue;
                }
                '\\' if matches!(self.peek_second(), Some('\n') | Some('\r')) => {
                    self.bump();
                    if self.bump() == Some('\r') && self.peek() == Some('\n') {
                        self.bump();
                    }
                    continue;
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                    continue;
                }
                '\n' => {
                    self.bump();
                    if depth > 0 {
                        continue;
                    }
                    TokenKind::Newline
                }
                '"' | '\'' => TokenKind::Str(self.string(false)?),
                '0'..='9' => self.number()?,
                '.' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => self.number()?,
                c if c == '_' || c.is_alphabetic() => {
                    let ident = self.ident();
                    if is_string_prefix(&ident) && matches!(self.peek(), Some('"') | Some('\'')) {
                        let raw = ident.contains(['r', 'R']);
                        TokenKind::Str(self.string(raw)?)
                    } else {
                        TokenKind::Ident(ident)
                    }
                }
                _ => {
                    self.bump();
                    match c {
                        '(' => {
                            depth += 1;
                            TokenKind::LParen
                        }
                        '[' => {
                            depth += 1;
                            TokenKind::LBracket
                        }
                        '{' => {
                            depth += 1;
                            TokenKind::LBrace
                        }
                        ')' => {
                            depth = depth.saturating_sub(1);
                            TokenKind::RParen
                        }
                        ']' => {
                            depth = depth.saturating_sub(1);
                            TokenKind::RBracket
                        }
                        '}' => {
                            depth = depth.saturating_sub(1);
                            TokenKind::RBrace
                        }
                        ',' => TokenKind::Comma,
                        ':' => TokenKind::Colon,
                        '=' => TokenKind::Equals,
                        '.' => TokenKind::Dot,
                        '-' => TokenKind::Minus,
                        '*' => TokenKind::Star,
                        ';' => TokenKind::Semicolon,
                        other => TokenKind::Other(other),
                    }
                }
            };
            tokens.push(Token {
                kind,
                span: Span {
                    start,
                    end: self.pos,
                },
            });
        }

        Ok(tokens)
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                self.bump();
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_string()
    }

    fn number(&mut self) -> Result<TokenKind, CallParseError> {
        let start = self.pos;
        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '+' || c == '-')
                && (prev == 'e' || prev == 'E')
                && !self.src[start..self.pos].starts_with("0x")
                && !self.src[start..self.pos].starts_with("0X");
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                prev = c;
                self.bump();
            } else {
                break;
            }
        }

        let text: String = self.src[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let invalid = || CallParseError::new(format!("invalid number literal `{}`", text), start);

        let radix = match text.get(..2) {
            Some("0x") | Some("0X") => Some(16),
            Some("0o") | Some("0O") => Some(8),
            Some("0b") | Some("0B") => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            return i64::from_str_radix(&text[2..], radix)
                .map(TokenKind::Int)
                .map_err(|_| invalid());
        }
        if text.contains(['.', 'e', 'E']) {
            return text
                .parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| invalid());
        }
        text.parse::<i64>().map(TokenKind::Int).map_err(|_| invalid())
    }

    /// Lex a quoted string starting at the current quote character.
    fn string(&mut self, raw: bool) -> Result<String, CallParseError> {
        let start = self.pos;
        let unterminated = || CallParseError::new("unterminated string literal", start);
        let quote = self.bump().ok_or_else(unterminated)?;
        let triple = self.peek() == Some(quote) && self.peek_second() == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }

        let mut value = String::new();
        loop {
            let c = self.bump().ok_or_else(unterminated)?;
            match c {
                '\\' if raw => {
                    value.push('\\');
                    if let Some(next) = self.bump() {
                        value.push(next);
                    }
                }
                '\\' => self.escape(&mut value, start)?,
                c if c == quote => {
                    if !triple {
                        break;
                    }
                    if self.peek() == Some(quote) && self.peek_second() == Some(quote) {
                        self.bump();
                        self.bump();
                        break;
                    }
                    value.push(c);
                }
                '\n' if !triple => return Err(unterminated()),
                c => value.push(c),
            }
        }
        Ok(value)
    }

    fn escape(&mut self, value: &mut String, start: usize) -> Result<(), CallParseError> {
        let Some(c) = self.bump() else {
            return Err(CallParseError::new("unterminated string literal", start));
        };
        match c {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            '0' => value.push('\0'),
            '\\' | '\'' | '"' => value.push(c),
            '\n' => {}
            'x' => value.push(self.hex_escape(2, start)?),
            'u' => value.push(self.hex_escape(4, start)?),
            'U' => value.push(self.hex_escape(8, start)?),
            other => {
                value.push('\\');
                value.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, digits: usize, start: usize) -> Result<char, CallParseError> {
        let invalid = || CallParseError::new("invalid escape sequence", start);
        let end = self.pos + digits;
        let hex = self.src.get(self.pos..end).ok_or_else(invalid)?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| invalid())?;
        self.pos = end;
        char::from_u32(code).ok_or_else(invalid)
    }
}

fn is_string_prefix(ident: &str) -> bool {
    matches!(
        ident.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn program(&mut self) -> Result<Vec<Statement>, CallParseError> {
        let mut statements = Vec::new();
        loop {
            while matches!(
                self.peek_kind(0),
                Some(TokenKind::Newline) | Some(TokenKind::Semicolon)
            ) {
                self.pos += 1;
            }
            if self.pos >= self.tokens.len() {
                break;
            }

            let (expr, span) = self.expr()?;
            match self.peek_kind(0) {
                None | Some(TokenKind::Newline) | Some(TokenKind::Semicolon) => {}
                Some(_) => return Err(self.error_here("expected end of statement")),
            }
            statements.push(Statement { expr, span });
        }
        Ok(statements)
    }

    fn peek_kind(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Result<Token, CallParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| CallParseError::new("unexpected end of input", self.src.len()))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Span, CallParseError> {
        if self.peek_kind(0) == Some(&kind) {
            let token = self.advance()?;
            Ok(token.span)
        } else {
            Err(self.error_here(&format!("expected {}", what)))
        }
    }

    fn error_here(&self, message: &str) -> CallParseError {
        let offset = self
            .tokens
            .get(self.pos)
            .map(|t| t.span.start)
            .unwrap_or(self.src.len());
        CallParseError::new(message, offset)
    }

    fn expr(&mut self) -> Result<(Expr, Span), CallParseError> {
        let token = self.advance()?;
        let start = token.span.start;
        let mut end = token.span.end;

        let expr = match token.kind {
            TokenKind::Ident(name) if name == "True" => Expr::Bool(true),
            TokenKind::Ident(name) if name == "False" => Expr::Bool(false),
            TokenKind::Ident(name) if name == "None" => Expr::None,
            TokenKind::Ident(name) => {
                let mut dotted = name;
                while self.peek_kind(0) == Some(&TokenKind::Dot) {
                    self.pos += 1;
                    match self.advance()? {
                        Token {
                            kind: TokenKind::Ident(part),
                            span,
                        } => {
                            dotted.push('.');
                            dotted.push_str(&part);
                            end = span.end;
                        }
                        _ => {
                            self.pos -= 1;
                            return Err(self.error_here("expected identifier after '.'"));
                        }
                    }
                }
                if self.peek_kind(0) == Some(&TokenKind::LParen) {
                    self.pos += 1;
                    let (args, close) = self.call_args()?;
                    end = close.end;
                    if matches!(
                        self.peek_kind(0),
                        Some(TokenKind::LParen) | Some(TokenKind::LBracket) | Some(TokenKind::Dot)
                    ) {
                        return Err(self.error_here("chained calls are not supported"));
                    }
                    Expr::Call(CallExpr { name: dotted, args })
                } else {
                    Expr::Name(dotted)
                }
            }
            TokenKind::Str(mut value) => {
                // Adjacent literals concatenate.
                while let Some(TokenKind::Str(next)) = self.peek_kind(0) {
                    value.push_str(next);
                    end = self.tokens[self.pos].span.end;
                    self.pos += 1;
                }
                Expr::Str(value)
            }
            TokenKind::Int(value) => Expr::Int(value),
            TokenKind::Float(value) => Expr::Float(value),
            TokenKind::Minus => {
                let operand = self.advance()?;
                end = operand.span.end;
                match operand.kind {
                    TokenKind::Int(value) => Expr::Int(value.checked_neg().ok_or_else(|| {
                        CallParseError::new("integer literal out of range", start)
                    })?),
                    TokenKind::Float(value) => Expr::Float(-value),
                    _ => {
                        self.pos -= 1;
                        return Err(self.error_here("expected number after '-'"));
                    }
                }
            }
            TokenKind::LParen => {
                if self.peek_kind(0) == Some(&TokenKind::RParen) {
                    end = self.advance()?.span.end;
                    Expr::Tuple(Vec::new())
                } else {
                    let (first, _) = self.expr()?;
                    if self.peek_kind(0) == Some(&TokenKind::RParen) {
                        end = self.advance()?.span.end;
                        first
                    } else {
                        let mut items = vec![first];
                        while self.peek_kind(0) == Some(&TokenKind::Comma) {
                            self.pos += 1;
                            if self.peek_kind(0) == Some(&TokenKind::RParen) {
                                break;
                            }
                            items.push(self.expr()?.0);
                        }
                        end = self.expect(TokenKind::RParen, "')'")?.end;
                        Expr::Tuple(items)
                    }
                }
            }
            TokenKind::LBracket => {
                let (items, close) = self.sequence(TokenKind::RBracket, "']'")?;
                end = close.end;
                Expr::List(items)
            }
            TokenKind::LBrace => {
                let (pairs, close) = self.dict_entries()?;
                end = close.end;
                Expr::Dict(pairs)
            }
            _ => {
                self.pos -= 1;
                return Err(self.error_here("unexpected token"));
            }
        };

        Ok((expr, Span { start, end }))
    }

    /// Parse arguments after the opening parenthesis, through the closing one.
    fn call_args(&mut self) -> Result<(Vec<Arg>, Span), CallParseError> {
        let mut args: Vec<Arg> = Vec::new();
        loop {
            if self.peek_kind(0) == Some(&TokenKind::RParen) {
                let close = self.advance()?;
                return Ok((args, close.span));
            }
            if self.peek_kind(0) == Some(&TokenKind::Star) {
                return Err(self.error_here("star arguments are not supported"));
            }

            let keyword = match (self.peek_kind(0), self.peek_kind(1)) {
                (Some(TokenKind::Ident(name)), Some(TokenKind::Equals)) => {
                    let name = name.clone();
                    self.pos += 2;
                    Some(name)
                }
                _ => None,
            };
            let arg_start = self.pos;
            let (value, span) = self.expr()?;

            match &keyword {
                Some(name) => {
                    if args.iter().any(|a| a.keyword.as_deref() == Some(name.as_str())) {
                        return Err(CallParseError::new(
                            format!("keyword argument repeated: {}", name),
                            self.tokens[arg_start].span.start,
                        ));
                    }
                }
                None if args.iter().any(|a| a.keyword.is_some()) => {
                    return Err(CallParseError::new(
                        "positional argument follows keyword argument",
                        span.start,
                    ));
                }
                None => {}
            }

            args.push(Arg {
                keyword,
                value,
                raw: span.slice(self.src).to_string(),
            });

            match self.advance()? {
                Token {
                    kind: TokenKind::Comma,
                    ..
                } => continue,
                Token {
                    kind: TokenKind::RParen,
                    span,
                } => return Ok((args, span)),
                _ => {
                    self.pos -= 1;
                    return Err(self.error_here("expected ',' or ')'"));
                }
            }
        }
    }

    fn sequence(
        &mut self,
        close: TokenKind,
        what: &str,
    ) -> Result<(Vec<Expr>, Span), CallParseError> {
        let mut items = Vec::new();
        loop {
            if self.peek_kind(0) == Some(&close) {
                let token = self.advance()?;
                return Ok((items, token.span));
            }
            items.push(self.expr()?.0);
            if self.peek_kind(0) == Some(&TokenKind::Comma) {
                self.pos += 1;
            } else {
                let span = self.expect(close.clone(), what)?;
                return Ok((items, span));
            }
        }
    }

    fn dict_entries(&mut self) -> Result<(Vec<(Expr, Expr)>, Span), CallParseError> {
        let mut pairs = Vec::new();
        loop {
            if self.peek_kind(0) == Some(&TokenKind::RBrace) {
                let token = self.advance()?;
                return Ok((pairs, token.span));
            }
            let key = self.expr()?.0;
            self.expect(TokenKind::Colon, "':'")?;
            let value = self.expr()?.0;
            pairs.push((key, value));
            if self.peek_kind(0) == Some(&TokenKind::Comma) {
                self.pos += 1;
            } else {
                let span = self.expect(TokenKind::RBrace, "'}'")?;
                return Ok((pairs, span));
            }
        }
    }
}
