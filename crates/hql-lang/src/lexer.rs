//! HQL lexer using logos.
//!
//! Keywords are case-insensitive, as in HQL. Whitespace is skipped; use the
//! [`tokenizer`](crate::tokenizer) when the exact text has to be preserved.

use crate::error::ParseError;
use crate::span::Span;
use logos::Logos;
use std::fmt;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[token("select", ignore(ascii_case))]
    Select,
    #[token("from", ignore(ascii_case))]
    From,
    #[token("where", ignore(ascii_case))]
    Where,
    #[token("as", ignore(ascii_case))]
    As,
    #[token("distinct", ignore(ascii_case))]
    Distinct,
    #[token("new", ignore(ascii_case))]
    New,
    #[token("update", ignore(ascii_case))]
    Update,
    #[token("delete", ignore(ascii_case))]
    Delete,
    #[token("set", ignore(ascii_case))]
    Set,
    #[token("order", ignore(ascii_case))]
    Order,
    #[token("group", ignore(ascii_case))]
    Group,
    #[token("by", ignore(ascii_case))]
    By,
    #[token("having", ignore(ascii_case))]
    Having,
    #[token("asc", ignore(ascii_case))]
    Asc,
    #[token("desc", ignore(ascii_case))]
    Desc,
    #[token("join", ignore(ascii_case))]
    Join,
    #[token("left", ignore(ascii_case))]
    Left,
    #[token("inner", ignore(ascii_case))]
    Inner,
    #[token("outer", ignore(ascii_case))]
    Outer,
    #[token("fetch", ignore(ascii_case))]
    Fetch,

    #[token("and", ignore(ascii_case))]
    And,
    #[token("or", ignore(ascii_case))]
    Or,
    #[token("not", ignore(ascii_case))]
    Not,
    #[token("in", ignore(ascii_case))]
    In,
    #[token("like", ignore(ascii_case))]
    Like,
    #[token("escape", ignore(ascii_case))]
    Escape,
    #[token("is", ignore(ascii_case))]
    Is,
    #[token("null", ignore(ascii_case))]
    Null,
    #[token("between", ignore(ascii_case))]
    Between,
    #[token("true", ignore(ascii_case))]
    True,
    #[token("false", ignore(ascii_case))]
    False,

    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// Single-quoted string; `''` inside stands for one quote.
    #[regex(r"'([^']|'')*'", |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].replace("''", "'")
    })]
    Str(String),

    #[regex(r"[0-9]+[lL]?", |lex| lex.slice().trim_end_matches(['l', 'L']).parse::<i64>().ok())]
    Int(i64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?[dDfF]?", |lex| {
        lex.slice().trim_end_matches(['d', 'D', 'f', 'F']).parse::<f64>().ok()
    })]
    Float(f64),

    #[regex(r":[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice()[1..].to_string())]
    NamedParam(String),

    /// `?` (legacy positional) or `?N` (ordinal).
    #[regex(r"\?[0-9]*", |lex| Some(lex.slice()[1..].parse::<u32>().ok()))]
    PositionalParam(Option<u32>),

    #[token("=")]
    Eq,
    #[token("<>")]
    #[token("!=")]
    #[token("^=")]
    Ne,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("||")]
    Concat,

    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
}

impl Token {
    /// Spelling of a keyword token, used when a keyword appears where an
    /// identifier is expected (for example `a.order` or `a.size`).
    pub fn keyword_text(&self) -> Option<&'static str> {
        use Token::*;
        let text = match self {
            Select => "select",
            From => "from",
            Where => "where",
            As => "as",
            Distinct => "distinct",
            New => "new",
            Update => "update",
            Delete => "delete",
            Set => "set",
            Order => "order",
            Group => "group",
            By => "by",
            Having => "having",
            Asc => "asc",
            Desc => "desc",
            Join => "join",
            Left => "left",
            Inner => "inner",
            Outer => "outer",
            Fetch => "fetch",
            And => "and",
            Or => "or",
            Not => "not",
            In => "in",
            Like => "like",
            Escape => "escape",
            Is => "is",
            Null => "null",
            Between => "between",
            True => "true",
            False => "false",
            _ => return None,
        };
        Some(text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(keyword) = self.keyword_text() {
            return f.write_str(keyword);
        }
        match self {
            Token::Ident(name) => write!(f, "identifier '{}'", name),
            Token::Str(s) => write!(f, "string '{}'", s),
            Token::Int(i) => write!(f, "{}", i),
            Token::Float(x) => write!(f, "{}", x),
            Token::NamedParam(name) => write!(f, ":{}", name),
            Token::PositionalParam(Some(n)) => write!(f, "?{}", n),
            Token::PositionalParam(None) => f.write_str("?"),
            Token::Eq => f.write_str("="),
            Token::Ne => f.write_str("<>"),
            Token::Gt => f.write_str(">"),
            Token::Ge => f.write_str(">="),
            Token::Lt => f.write_str("<"),
            Token::Le => f.write_str("<="),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Concat => f.write_str("||"),
            Token::Dot => f.write_str("."),
            Token::Comma => f.write_str(","),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// A token with its span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Tokenize a whole query, failing on the first unrecognised character.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span: Span = lexer.span().into();
        match result {
            Ok(token) => tokens.push(SpannedToken { token, span }),
            Err(()) => {
                return Err(ParseError::new(
                    format!("unexpected character sequence '{}'", lexer.slice()),
                    span,
                ));
            }
        }
    }

    Ok(tokens)
}
