//! Recursive descent parser for probsh command lines.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! command     ::= COMMAND argument*
//! argument    ::= IDENT | unary
//! expression  ::= or
//! or          ::= and ("||" and)*
//! and         ::= bitor ("&&" bitor)*
//! bitor       ::= xor ("|" xor)*
//! xor         ::= bitand ("^" bitand)*
//! bitand      ::= equality ("&" equality)*
//! equality    ::= relational (("==" | "!=") relational)*
//! relational  ::= shift (("<" | "<=" | ">" | ">=") shift)*
//! shift       ::= additive (("<<" | ">>") additive)*
//! additive    ::= multiplicative (("+" | "-") multiplicative)*
//! multiplicative ::= unary (("*" | "/" | "%") unary)*
//! unary       ::= ("+" | "-" | "~" | "!")* primary
//! primary     ::= INTEGER | STRING | VARIABLE | "(" expression ")"
//! ```
//!
//! Every level is left-associative; stacked unary operators apply
//! innermost-first (`~-1` negates, then inverts). The parser never
//! panics: it accumulates [`ParseError`]s and returns them all.

use crate::ast::{ArgExpr, BinaryOp, CommandExpr, Expr, UnaryOp};
use crate::lexer::{self, CommandTokens, LexError, Spanned, Token};
use logos::Span;

/// A parse error with the span it applies to.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

/// A lexical or syntactic error; the two are reported together.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntaxError {
    #[error("{}", .0.token)]
    Lex(Spanned<LexError>),
    #[error(transparent)]
    Parse(ParseError),
}

impl SyntaxError {
    pub fn span(&self) -> Span {
        match self {
            SyntaxError::Lex(e) => e.span.clone(),
            SyntaxError::Parse(e) => e.span.clone(),
        }
    }
}

/// Lex and parse a full `:command arg...` line.
pub fn parse_command_line(line: &str) -> Result<CommandExpr, Vec<SyntaxError>> {
    let tokens = lexer::tokenize_command(line)
        .map_err(|errors| errors.into_iter().map(SyntaxError::Lex).collect::<Vec<_>>())?;
    parse_command(&tokens)
        .map_err(|errors| errors.into_iter().map(SyntaxError::Parse).collect())
}

/// Lex and parse a bare expression, e.g. the argument of `:print`.
pub fn parse_expression_line(source: &str) -> Result<Expr, Vec<SyntaxError>> {
    let tokens = lexer::tokenize_expression(source)
        .map_err(|errors| errors.into_iter().map(SyntaxError::Lex).collect::<Vec<_>>())?;
    parse_expression(&tokens)
        .map_err(|errors| errors.into_iter().map(SyntaxError::Parse).collect())
}

/// Parse a token stream as a single expression.
pub fn parse_expression(tokens: &[Spanned<Token>]) -> Result<Expr, Vec<ParseError>> {
    let mut parser = Parser::new(tokens);
    let expr = parser.expression();
    if !parser.at_end() && parser.errors.is_empty() {
        parser.error_here("unexpected input after expression");
    }
    parser.finish(expr)
}

/// Parse a lexed command line into its syntax tree.
pub fn parse_command(tokens: &CommandTokens) -> Result<CommandExpr, Vec<ParseError>> {
    let mut parser = Parser::new(&tokens.args);
    let mut args = Vec::new();
    while !parser.at_end() {
        // A bare identifier is an argument on its own; identifiers cannot
        // start an expression, so there is no ambiguity.
        if let Some(Token::Ident(name)) = parser.peek() {
            let name = name.clone();
            parser.advance();
            args.push(ArgExpr::Ident(name));
            continue;
        }
        match parser.unary() {
            Some(expr) => args.push(ArgExpr::Expr(expr)),
            None => break,
        }
    }
    if parser.errors.is_empty() {
        Ok(CommandExpr {
            name: tokens.name.token.clone(),
            args,
        })
    } else {
        Err(parser.errors)
    }
}

struct Parser<'t> {
    tokens: &'t [Spanned<Token>],
    pos: usize,
    errors: Vec<ParseError>,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Spanned<Token>]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<&Spanned<Token>> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// The span of the current token, or a zero-width span at the end of
    /// input.
    fn span_here(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(t) => t.span.clone(),
            None => {
                let end = self.tokens.last().map(|t| t.span.end).unwrap_or(0);
                end..end
            }
        }
    }

    fn error_here(&mut self, message: impl Into<String>) {
        self.errors.push(ParseError {
            message: message.into(),
            span: self.span_here(),
        });
    }

    fn finish(self, expr: Option<Expr>) -> Result<Expr, Vec<ParseError>> {
        match expr {
            Some(expr) if self.errors.is_empty() => Ok(expr),
            _ => {
                let mut errors = self.errors;
                if errors.is_empty() {
                    errors.push(ParseError {
                        message: "expected an expression".to_string(),
                        span: 0..0,
                    });
                }
                Err(errors)
            }
        }
    }

    /// Parse one left-associative level: `next (ops[i] next)*`.
    fn binary_level(
        &mut self,
        ops: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> Option<Expr>,
    ) -> Option<Expr> {
        let mut lhs = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.peek() == Some(token) {
                    self.advance();
                    let rhs = next(self)?;
                    lhs = Expr::binary(*op, lhs, rhs);
                    continue 'outer;
                }
            }
            break;
        }
        Some(lhs)
    }

    fn expression(&mut self) -> Option<Expr> {
        self.logical_or()
    }

    fn logical_or(&mut self) -> Option<Expr> {
        self.binary_level(&[(Token::OrOr, BinaryOp::Or)], Self::logical_and)
    }

    fn logical_and(&mut self) -> Option<Expr> {
        self.binary_level(&[(Token::AndAnd, BinaryOp::And)], Self::bitwise_or)
    }

    fn bitwise_or(&mut self) -> Option<Expr> {
        self.binary_level(&[(Token::Pipe, BinaryOp::BitOr)], Self::bitwise_xor)
    }

    fn bitwise_xor(&mut self) -> Option<Expr> {
        self.binary_level(&[(Token::Caret, BinaryOp::BitXor)], Self::bitwise_and)
    }

    fn bitwise_and(&mut self) -> Option<Expr> {
        self.binary_level(&[(Token::Amp, BinaryOp::BitAnd)], Self::equality)
    }

    fn equality(&mut self) -> Option<Expr> {
        self.binary_level(
            &[(Token::EqEq, BinaryOp::Eq), (Token::Ne, BinaryOp::Ne)],
            Self::relational,
        )
    }

    fn relational(&mut self) -> Option<Expr> {
        self.binary_level(
            &[
                (Token::Le, BinaryOp::Le),
                (Token::Ge, BinaryOp::Ge),
                (Token::Lt, BinaryOp::Lt),
                (Token::Gt, BinaryOp::Gt),
            ],
            Self::shift,
        )
    }

    fn shift(&mut self) -> Option<Expr> {
        self.binary_level(
            &[(Token::Shl, BinaryOp::Shl), (Token::Shr, BinaryOp::Shr)],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Option<Expr> {
        self.binary_level(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Option<Expr> {
        self.binary_level(
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Option<Expr> {
        let mut ops = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => UnaryOp::Pos,
                Some(Token::Minus) => UnaryOp::Neg,
                Some(Token::Tilde) => UnaryOp::Invert,
                Some(Token::Bang) => UnaryOp::Not,
                _ => break,
            };
            self.advance();
            ops.push(op);
        }
        let mut expr = self.primary()?;
        for op in ops.into_iter().rev() {
            expr = Expr::unary(op, expr);
        }
        Some(expr)
    }

    fn primary(&mut self) -> Option<Expr> {
        match self.peek() {
            Some(Token::Integer(n)) => {
                let n = n.clone();
                self.advance();
                Some(Expr::Integer(n))
            }
            Some(Token::String(s)) => {
                let s = s.clone();
                self.advance();
                Some(Expr::String(s))
            }
            Some(Token::Variable(name)) => {
                let name = name.clone();
                self.advance();
                Some(Expr::Variable(name))
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.expression()?;
                if self.peek() == Some(&Token::RParen) {
                    self.advance();
                    Some(Expr::Paren(Box::new(inner)))
                } else {
                    self.error_here("expected ')'");
                    None
                }
            }
            Some(token) => {
                let message = format!("expected an expression, found {}", describe(token));
                self.error_here(message);
                None
            }
            None => {
                self.error_here("expected an expression, found end of input");
                None
            }
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Shl => "'<<'".to_string(),
        Token::Shr => "'>>'".to_string(),
        Token::Le => "'<='".to_string(),
        Token::Ge => "'>='".to_string(),
        Token::EqEq => "'=='".to_string(),
        Token::Ne => "'!='".to_string(),
        Token::AndAnd => "'&&'".to_string(),
        Token::OrOr => "'||'".to_string(),
        Token::Lt => "'<'".to_string(),
        Token::Gt => "'>'".to_string(),
        Token::Bang => "'!'".to_string(),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::Percent => "'%'".to_string(),
        Token::Amp => "'&'".to_string(),
        Token::Pipe => "'|'".to_string(),
        Token::Caret => "'^'".to_string(),
        Token::Tilde => "'~'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::Ident(name) => format!("identifier '{}'", name),
        Token::Integer(_) => "integer literal".to_string(),
        Token::String(_) => "string literal".to_string(),
        Token::Variable(name) => format!("variable '${}'", name),
    }
}
