//! Lexer for probsh command lines.
//!
//! Converts source text into a stream of tokens using the logos lexer
//! generator. Lexing happens in two modes:
//!
//! - **Command mode**: the start of a line, where only whitespace and a
//!   `:name` command are recognized. Anything else is an error, which is
//!   what keeps raw assembly input from colliding with shell syntax.
//! - **Argument mode**: everything after the command name, where the full
//!   expression token set applies.
//!
//! Token rules worth knowing:
//!
//! - Integers: `0x` prefix means hex, a leading `0` followed by more digits
//!   means octal, anything else is decimal. A bare `ff` is an identifier,
//!   not a hex literal; write `0xff`.
//! - Strings: double-quoted with C-style escapes. Unknown escapes are kept
//!   verbatim, so `"foo\z"` is the five characters `foo\z`.
//! - Operators use first-match: `<<` before `<=` before `<`.

use logos::{Logos, Span};
use num_bigint::BigInt;
use num_traits::Num;

/// A token with its span in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(token: T, span: Span) -> Self {
        Self { token, span }
    }
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Eq, Default, thiserror::Error)]
pub enum LexError {
    #[default]
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("unexpected input: {0:?}")]
    UnexpectedInput(String),
    #[error("invalid integer literal: {0:?}")]
    InvalidIntegerLiteral(String),
    #[error("expected a command starting with ':'")]
    ExpectedCommand,
}

/// Tokens recognized at the very start of a line.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\n]+")]
pub enum CommandToken {
    /// `:name`, possibly empty (`:` alone names the empty command).
    #[regex(r":[a-zA-Z_0-9]*", |lex| lex.slice()[1..].to_string())]
    Command(String),
}

/// Tokens recognized in argument position.
///
/// Variant order matters for logos priority: two-character operators must
/// win over their one-character prefixes.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,

    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    /// Identifiers win over integers on ties, so `ff` and `bad` are names.
    #[regex(r"[a-zA-Z_][a-zA-Z_0-9]*", |lex| lex.slice().to_string(), priority = 3)]
    Ident(String),

    #[regex(r"(0x)?[0-9a-fA-F]+", lex_integer, priority = 2)]
    Integer(BigInt),

    #[regex(r#""(\\.|[^"\\])*""#, lex_string)]
    String(String),

    #[regex(r"\$[a-zA-Z_0-9]+", |lex| lex.slice()[1..].to_string())]
    Variable(String),
}

fn lex_integer(lex: &mut logos::Lexer<'_, Token>) -> Result<BigInt, LexError> {
    let slice = lex.slice();
    let (digits, radix) = if let Some(hex) = slice.strip_prefix("0x") {
        (hex, 16)
    } else if slice.len() > 1 && slice.starts_with('0') {
        (&slice[1..], 8)
    } else {
        (slice, 10)
    };
    BigInt::from_str_radix(digits, radix)
        .map_err(|_| LexError::InvalidIntegerLiteral(slice.to_string()))
}

fn lex_string(lex: &mut logos::Lexer<'_, Token>) -> String {
    let slice = lex.slice();
    // Strip the surrounding quotes; the regex guarantees they are there.
    unescape(&slice[1..slice.len() - 1])
}

/// Decode C-style escape sequences.
///
/// Recognizes `\0 \a \b \t \n \v \f \r \\ \" \' \xHH \uHHHH`. An escape
/// that doesn't decode (unknown letter, bad hex digits) is passed through
/// verbatim, backslash included.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(&esc) = chars.peek() else {
            out.push('\\');
            break;
        };
        match esc {
            '0' => out.push('\0'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'v' => out.push('\u{0b}'),
            'f' => out.push('\u{0c}'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            'x' | 'u' => {
                let len = if esc == 'x' { 2 } else { 4 };
                let rest = chars.clone().skip(1).take(len).collect::<String>();
                let decoded = if rest.len() == len {
                    u32::from_str_radix(&rest, 16).ok().and_then(char::from_u32)
                } else {
                    None
                };
                match decoded {
                    Some(c) => {
                        out.push(c);
                        for _ in 0..len {
                            chars.next();
                        }
                        chars.next();
                        continue;
                    }
                    None => out.push('\\'),
                }
            }
            _ => out.push('\\'),
        }
        // For simple escapes we consumed only the backslash so far.
        if matches!(
            esc,
            '0' | 'a' | 'b' | 't' | 'n' | 'v' | 'f' | 'r' | '\\' | '"' | '\''
        ) {
            chars.next();
        }
        // Unknown escapes leave the peeked character for the next round.
    }
    out
}

/// A lexed command line: the command name plus its argument tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandTokens {
    pub name: Spanned<String>,
    pub args: Vec<Spanned<Token>>,
}

/// Tokenize a full command line.
///
/// The line must start with `:name`; the lexer then switches to argument
/// mode for the rest of the line. All lexical errors are collected rather
/// than stopping at the first one.
pub fn tokenize_command(line: &str) -> Result<CommandTokens, Vec<Spanned<LexError>>> {
    let mut lexer = CommandToken::lexer(line);
    let name = match lexer.next() {
        Some(Ok(CommandToken::Command(name))) => Spanned::new(name, lexer.span()),
        Some(Err(_)) => {
            return Err(vec![Spanned::new(LexError::ExpectedCommand, lexer.span())]);
        }
        None => {
            return Err(vec![Spanned::new(LexError::ExpectedCommand, 0..line.len())]);
        }
    };

    let lexer = lexer.morph::<Token>();
    let (args, errors) = drain(lexer);
    if errors.is_empty() {
        Ok(CommandTokens { name, args })
    } else {
        Err(errors)
    }
}

/// Tokenize a bare expression (no leading command).
pub fn tokenize_expression(source: &str) -> Result<Vec<Spanned<Token>>, Vec<Spanned<LexError>>> {
    let (tokens, errors) = drain(Token::lexer(source));
    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

fn drain(mut lexer: logos::Lexer<'_, Token>) -> (Vec<Spanned<Token>>, Vec<Spanned<LexError>>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(Spanned::new(token, span)),
            Err(LexError::UnexpectedCharacter) => {
                errors.push(Spanned::new(
                    LexError::UnexpectedInput(lexer.slice().to_string()),
                    span,
                ));
            }
            Err(err) => errors.push(Spanned::new(err, span)),
        }
    }
    (tokens, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize_expression(source)
            .expect("lexing should succeed")
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    fn one_integer(source: &str) -> BigInt {
        match tokens(source).as_slice() {
            [Token::Integer(n)] => n.clone(),
            other => panic!("expected a single integer, got {:?}", other),
        }
    }

    fn one_string(source: &str) -> String {
        match tokens(source).as_slice() {
            [Token::String(s)] => s.clone(),
            other => panic!("expected a single string, got {:?}", other),
        }
    }

    #[test]
    fn test_integer_radix_detection() {
        assert_eq!(one_integer("10"), BigInt::from(10));
        assert_eq!(one_integer("0x10"), BigInt::from(16));
        assert_eq!(one_integer("010"), BigInt::from(8));
        assert_eq!(one_integer("0"), BigInt::from(0));
        assert_eq!(one_integer("0xdeadbeef"), BigInt::from(0xdeadbeefu32));
    }

    #[test]
    fn test_invalid_octal_digit() {
        let errors = tokenize_expression("09").unwrap_err();
        assert_eq!(
            errors[0].token,
            LexError::InvalidIntegerLiteral("09".to_string())
        );
    }

    #[test]
    fn test_bare_hex_digits_are_an_identifier() {
        assert_eq!(tokens("ff"), vec![Token::Ident("ff".to_string())]);
        assert_eq!(tokens("x10"), vec![Token::Ident("x10".to_string())]);
    }

    #[test]
    fn test_two_char_operators_win() {
        assert_eq!(tokens("<<"), vec![Token::Shl]);
        assert_eq!(tokens("<= <"), vec![Token::Le, Token::Lt]);
        assert_eq!(tokens("1<<2"), vec![
            Token::Integer(BigInt::from(1)),
            Token::Shl,
            Token::Integer(BigInt::from(2)),
        ]);
        assert_eq!(tokens("!!="), vec![Token::Bang, Token::Ne]);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(one_string(r#""foo\tbar""#), "foo\tbar");
        assert_eq!(one_string(r#""\x41""#), "A");
        assert_eq!(one_string(r#""A""#), "A");
        assert_eq!(one_string(r#""say \"hi\"""#), "say \"hi\"");
    }

    #[test]
    fn test_unknown_escapes_pass_through_verbatim() {
        assert_eq!(one_string(r#""foo\z""#), "foo\\z");
        assert_eq!(one_string(r#""foo\xzz""#), "foo\\xzz");
        assert_eq!(one_string(r#""foo\u12""#), "foo\\u12");
    }

    #[test]
    fn test_variable() {
        assert_eq!(tokens("$rax"), vec![Token::Variable("rax".to_string())]);
        assert_eq!(tokens("$_0"), vec![Token::Variable("_0".to_string())]);
    }

    #[test]
    fn test_command_mode_rejects_non_commands() {
        let errors = tokenize_command("mov eax, 1").unwrap_err();
        assert_eq!(errors[0].token, LexError::ExpectedCommand);
    }

    #[test]
    fn test_command_mode_then_argument_mode() {
        let lexed = tokenize_command(":memory $rsp 16").unwrap();
        assert_eq!(lexed.name.token, "memory");
        assert_eq!(lexed.args.len(), 2);
        assert_eq!(lexed.args[0].token, Token::Variable("rsp".to_string()));
        assert_eq!(lexed.args[1].token, Token::Integer(BigInt::from(16)));
    }

    #[test]
    fn test_empty_command_name() {
        let lexed = tokenize_command(":").unwrap();
        assert_eq!(lexed.name.token, "");
        assert!(lexed.args.is_empty());
    }

    #[test]
    fn test_errors_accumulate() {
        let errors = tokenize_expression("1 @ 2 ` 3").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].token, LexError::UnexpectedInput("@".to_string()));
        assert_eq!(errors[1].token, LexError::UnexpectedInput("`".to_string()));
    }
}
