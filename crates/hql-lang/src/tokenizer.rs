//! Lossless tokenization of raw query text.
//!
//! Unlike the [`lexer`](crate::lexer), which drops whitespace and classifies
//! keywords, this splitter keeps every character. Each delimiter character is
//! returned as its own token, so joining the tokens gives back the original
//! string byte for byte. The query splitter relies on that to rewrite class
//! names in place.

/// Whitespace characters recognised in query text.
pub const WHITESPACE: &str = " \n\r\x0C\t";

/// Characters that end an HQL word.
pub const HQL_SEPARATORS: &str = " \n\r\x0C\t,()=<>&|+-=/*'^![]#~\\";

/// Separator between the segments of a property path.
pub const PATH_SEPARATORS: &str = ".";

/// Prefix of a named parameter.
pub const HQL_VARIABLE_PREFIX: &str = ":";

/// Delimiters used when scanning for polymorphic class references.
pub const CLASS_NAME_DELIMITERS: &str = " \n\r\x0C\t(),";

/// Split `text` on any character of `delimiters`, keeping the delimiters.
///
/// Runs of non-delimiter characters become one token; every delimiter
/// character becomes a token of its own.
pub fn split<'a>(delimiters: &str, text: &'a str) -> Vec<&'a str> {
    let mut tokens = Vec::new();
    let mut word_start = None;

    for (i, ch) in text.char_indices() {
        if delimiters.contains(ch) {
            if let Some(start) = word_start.take() {
                tokens.push(&text[start..i]);
            }
            tokens.push(&text[i..i + ch.len_utf8()]);
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }

    if let Some(start) = word_start {
        tokens.push(&text[start..]);
    }

    tokens
}

/// True if `token` is a single whitespace character (or empty).
pub fn is_whitespace(token: &str) -> bool {
    WHITESPACE.contains(token)
}

/// True if `token` names a query parameter such as `:name`.
pub fn is_hql_variable(token: &str) -> bool {
    token.starts_with(HQL_VARIABLE_PREFIX)
}

/// True if the first character of `token` may begin an identifier.
pub fn is_identifier_start(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
}
